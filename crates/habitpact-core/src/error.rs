use thiserror::Error;

use crate::types::{Amount, EpochId, HabitId};

/// Tracker operation errors.
///
/// Single operations are all-or-nothing: any of these aborts the call with
/// no balance or bitmap change. Batch operations (`prepare_day`,
/// `settle_all`) absorb the per-item skip conditions instead of raising
/// them.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Amount, available: Amount },

    #[error("amount must be non-zero")]
    InvalidAmount,

    #[error("unknown balance bucket tag {tag}")]
    InvalidBalanceType { tag: u8 },

    #[error("epoch {epoch} is not the current epoch {current}")]
    InvalidEpoch { epoch: EpochId, current: EpochId },

    #[error("treasury account must be non-empty")]
    InvalidTreasury,

    #[error("invalid staking adapter: {0}")]
    InvalidStakingAdapter(String),

    #[error("habit {0} not found")]
    HabitNotFound(HabitId),

    #[error("habit {0} is already archived")]
    HabitAlreadyArchived(HabitId),

    #[error("habit text too long: {len} bytes (max 32)")]
    HabitTextTooLong { len: usize },

    #[error("habit text too short: {len} bytes (min 3)")]
    HabitTextTooShort { len: usize },

    #[error("habit id {0} exceeds the status bitmap capacity (max 255)")]
    HabitIdTooLarge(HabitId),

    #[error("habit {habit_id} already checked in for epoch {epoch}")]
    AlreadyCheckedIn { habit_id: HabitId, epoch: EpochId },

    #[error("habit {habit_id} already settled for epoch {epoch}")]
    AlreadySettled { habit_id: HabitId, epoch: EpochId },

    #[error("epoch {0} has not finished yet")]
    CannotSettleCurrentDay(EpochId),

    #[error("habit {habit_id} was not funded for epoch {epoch}")]
    DayNotFunded { habit_id: HabitId, epoch: EpochId },

    #[error("operation restricted to the owner account")]
    OnlyOwner,

    #[error("external transfer failed: {0}")]
    TransferFailed(String),

    #[error("invalid batch: {0}")]
    InvalidBatchSize(String),
}
