//! Commitment-backed habit incentive ledger.
//!
//! A user locks a fixed stake against each of their active habits for the
//! current day (`prepare_day`), records completion with `check_in`, and a
//! later settlement pass resolves every funded (habit, day) pair exactly
//! once: checked-in stakes become rewards, missed stakes are forfeited to
//! the treasury. Rewards can optionally be routed to a pluggable
//! [`StakingAdapter`] that generates external yield.

#![deny(unsafe_code)]

pub mod adapter;
pub mod clock;
pub mod error;
pub mod events;
pub mod funding;
pub mod ledger;
pub mod registry;
pub mod settlement;
pub mod status;
pub mod tracker;
pub mod types;

pub use adapter::StakingAdapter;
pub use clock::{EpochClock, ManualClock, SystemClock};
pub use error::TrackerError;
pub use events::{EventLog, TrackerEvent};
pub use funding::DayPreparation;
pub use ledger::BalanceLedger;
pub use registry::HabitRegistry;
pub use status::{DailyStatusStore, DayFlags, DayStatus, StatusMask};
pub use tracker::{HabitTracker, TrackerConfig};
pub use types::{
    Amount, BalanceBucket, EpochId, Habit, HabitId, MoveTarget, UserBalances, UserId,
    DEFAULT_STAKE_PER_DAY, EXTERNAL_SINK_TAG, MAX_HABIT_ID, SECONDS_PER_EPOCH, UNIT,
};
