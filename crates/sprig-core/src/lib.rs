//! # sprig-core
//!
//! Core types shared across all Sprig crates.
//!
//! - Entity structs for the farm's domain objects (recipes, crops, orders, ...)
//! - Stage and status enums with transition tables
//! - Growth schedule math (stage durations, harvest dates, tray counts)
//! - Lot number normalization rules
//! - ID prefix constants
//! - Cross-cutting error types

pub mod entities;
pub mod enums;
pub mod errors;
pub mod growth;
pub mod ids;
pub mod lot;
