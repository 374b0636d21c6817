//! Periodic jobs run from cron through the CLI.
//!
//! Both jobs take the evaluation time as an argument, report what they did
//! (or would do with `dry_run`), and keep going when a single row fails.

pub mod recurring;
pub mod tasks;
