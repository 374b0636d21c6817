//! Stage, status, and kind enums for Sprig.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`.
//! Enums with a lifecycle provide `allowed_next_states()` so the storage layer
//! can enforce valid transitions.

use chrono::{Datelike, Days, Months, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// CropStage
// ---------------------------------------------------------------------------

/// Growing stage of a single tray.
///
/// ```text
/// soaking → germination → blackout → light → harvested
///                       → light (recipes without blackout)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CropStage {
    Soaking,
    Germination,
    Blackout,
    Light,
    Harvested,
}

impl CropStage {
    /// All stages in growing order.
    pub const ALL: [Self; 5] = [
        Self::Soaking,
        Self::Germination,
        Self::Blackout,
        Self::Light,
        Self::Harvested,
    ];

    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Soaking => &[Self::Germination],
            Self::Germination => &[Self::Blackout, Self::Light],
            Self::Blackout => &[Self::Light],
            Self::Light => &[Self::Harvested],
            Self::Harvested => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    /// Column holding the timestamp at which a crop entered this stage.
    #[must_use]
    pub const fn timestamp_column(self) -> &'static str {
        match self {
            Self::Soaking => "soaking_at",
            Self::Germination => "germination_at",
            Self::Blackout => "blackout_at",
            Self::Light => "light_at",
            Self::Harvested => "harvested_at",
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Soaking => "soaking",
            Self::Germination => "germination",
            Self::Blackout => "blackout",
            Self::Light => "light",
            Self::Harvested => "harvested",
        }
    }
}

impl fmt::Display for CropStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// OrderStatus
// ---------------------------------------------------------------------------

/// Status of a customer order.
///
/// ```text
/// draft → pending → confirmed → growing → ready → delivered
///   ↘        ↘          ↘          ↘
///                cancelled
/// template (recurring order; only spawns child orders)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Template,
    Draft,
    Pending,
    Confirmed,
    Growing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    #[allow(clippy::match_same_arms)]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Pending, Self::Cancelled],
            Self::Pending => &[Self::Confirmed, Self::Cancelled],
            Self::Confirmed => &[Self::Growing, Self::Cancelled],
            Self::Growing => &[Self::Ready, Self::Cancelled],
            Self::Ready => &[Self::Delivered],
            Self::Template | Self::Delivered | Self::Cancelled => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Growing => "growing",
            Self::Ready => "ready",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RecurringFrequency
// ---------------------------------------------------------------------------

/// How often a recurring order template spawns a child order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecurringFrequency {
    Weekly,
    Biweekly,
    Monthly,
}

impl RecurringFrequency {
    /// The `n`th occurrence of a series starting on `anchor` (`n = 0` is `anchor`).
    ///
    /// Monthly occurrences are counted from the anchor, so a series starting
    /// Jan 31 runs Feb 28, Mar 31, Apr 30. Returns `None` past chrono's range.
    #[must_use]
    pub fn occurrence(self, anchor: NaiveDate, n: u32) -> Option<NaiveDate> {
        match self {
            Self::Weekly => anchor.checked_add_days(Days::new(7 * u64::from(n))),
            Self::Biweekly => anchor.checked_add_days(Days::new(14 * u64::from(n))),
            Self::Monthly => anchor.checked_add_months(Months::new(n)),
        }
    }

    /// First occurrence of the series anchored at `anchor` strictly after `date`.
    #[must_use]
    pub fn next_after(self, anchor: NaiveDate, date: NaiveDate) -> Option<NaiveDate> {
        if date < anchor {
            return Some(anchor);
        }
        let elapsed = match self {
            Self::Weekly => (date - anchor).num_days() / 7,
            Self::Biweekly => (date - anchor).num_days() / 14,
            Self::Monthly => {
                i64::from(date.year() - anchor.year()) * 12 + i64::from(date.month())
                    - i64::from(anchor.month())
            }
        };
        let mut n = u32::try_from(elapsed).ok()?;
        loop {
            let candidate = self.occurrence(anchor, n)?;
            if candidate > date {
                return Some(candidate);
            }
            n = n.checked_add(1)?;
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
        }
    }
}

impl fmt::Display for RecurringFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CropPlanStatus
// ---------------------------------------------------------------------------

/// Status of a crop plan.
///
/// ```text
/// draft → approved → planted → completed
///   ↘         ↘
///     cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CropPlanStatus {
    Draft,
    Approved,
    Planted,
    Completed,
    Cancelled,
}

impl CropPlanStatus {
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Draft => &[Self::Approved, Self::Cancelled],
            Self::Approved => &[Self::Planted, Self::Cancelled],
            Self::Planted => &[Self::Completed],
            Self::Completed | Self::Cancelled => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Planted => "planted",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CropPlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ConsumableType
// ---------------------------------------------------------------------------

/// Kind of inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConsumableType {
    Seed,
    Soil,
    Packaging,
    Other,
}

impl ConsumableType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::Soil => "soil",
            Self::Packaging => "packaging",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ConsumableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CropTaskKind
// ---------------------------------------------------------------------------

/// What a scheduled crop task does when it comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CropTaskKind {
    /// Move a soaking batch into germination.
    EndSoaking,
    /// Move a batch to its next growing stage.
    AdvanceStage,
    /// Reminder that a batch under light is ready to harvest.
    HarvestDue,
}

impl CropTaskKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EndSoaking => "end_soaking",
            Self::AdvanceStage => "advance_stage",
            Self::HarvestDue => "harvest_due",
        }
    }
}

impl fmt::Display for CropTaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
