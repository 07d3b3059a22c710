use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TrackerError;

/// Native-currency amount in base units. One whole unit is [`UNIT`] base units.
pub type Amount = u128;

/// Day-granularity epoch number, `floor(unix_seconds / 86_400)`.
pub type EpochId = u64;

/// Per-user habit identifier, assigned sequentially starting at 1.
pub type HabitId = u32;

/// Base units per whole currency unit.
pub const UNIT: Amount = 1_000_000_000_000_000_000;

/// Stake locked per habit per day unless overridden in the tracker config.
pub const DEFAULT_STAKE_PER_DAY: Amount = 10 * UNIT;

/// Seconds in one epoch. A day is exactly this long, always.
pub const SECONDS_PER_EPOCH: i64 = 86_400;

/// Highest assignable habit id. Every habit's daily status must fit inside
/// one 256-bit mask, with the bit index equal to the habit id.
pub const MAX_HABIT_ID: HabitId = 255;

/// Minimum habit text length in bytes.
pub const MIN_HABIT_TEXT_LEN: usize = 3;

/// Maximum habit text length in bytes.
pub const MAX_HABIT_TEXT_LEN: usize = 32;

/// Wire tag for the external withdrawal sink in [`MoveTarget`].
pub const EXTERNAL_SINK_TAG: u8 = 3;

/// Opaque account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single registered habit. Archiving is one-way; habits are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Habit {
    pub text: String,
    pub created_at_epoch: EpochId,
    pub archived: bool,
}

/// Per-user balance buckets plus the active habit counter.
///
/// `deposit + blocked + claimable` only changes through external
/// deposit/withdraw and adapter flows; internal moves conserve it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBalances {
    pub deposit: Amount,
    pub blocked: Amount,
    pub claimable: Amount,
    pub active_habit_count: u32,
}

impl UserBalances {
    /// Sum of the three buckets.
    pub fn total(&self) -> Amount {
        self.deposit + self.blocked + self.claimable
    }
}

/// The three buckets a user's funds can sit in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceBucket {
    Deposit,
    Blocked,
    Claimable,
}

impl BalanceBucket {
    /// Stable wire tag: 0 = deposit, 1 = blocked, 2 = claimable.
    pub fn tag(self) -> u8 {
        match self {
            Self::Deposit => 0,
            Self::Blocked => 1,
            Self::Claimable => 2,
        }
    }
}

impl TryFrom<u8> for BalanceBucket {
    type Error = TrackerError;

    fn try_from(tag: u8) -> Result<Self, TrackerError> {
        match tag {
            0 => Ok(Self::Deposit),
            1 => Ok(Self::Blocked),
            2 => Ok(Self::Claimable),
            _ => Err(TrackerError::InvalidBalanceType { tag }),
        }
    }
}

impl fmt::Display for BalanceBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Deposit => "deposit",
            Self::Blocked => "blocked",
            Self::Claimable => "claimable",
        };
        f.write_str(name)
    }
}

/// Destination of a balance move: another bucket of the same user, or the
/// external withdrawal sink (funds leave the ledger).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveTarget {
    Bucket(BalanceBucket),
    External,
}

impl MoveTarget {
    /// Stable wire tag; the external sink uses [`EXTERNAL_SINK_TAG`].
    pub fn tag(self) -> u8 {
        match self {
            Self::Bucket(bucket) => bucket.tag(),
            Self::External => EXTERNAL_SINK_TAG,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self, TrackerError> {
        if tag == EXTERNAL_SINK_TAG {
            Ok(Self::External)
        } else {
            Ok(Self::Bucket(BalanceBucket::try_from(tag)?))
        }
    }
}
