use crate::error::TrackerError;
use crate::types::{Amount, UserId};

/// Pluggable reward-routing staking adapter.
///
/// The settlement engine forwards successful stakes here when an adapter is
/// configured; with no adapter, rewards land in the user's claimable bucket
/// instead. Implementations hold principal per user and may accrue yield on
/// it over time; the tracker only ever talks through this interface.
pub trait StakingAdapter: Send + Sync {
    /// Short stable identifier, used in logs and adapter-changed events.
    fn name(&self) -> &'static str;

    /// Hold `amount` of principal on the user's behalf.
    fn stake(&self, user: &UserId, amount: Amount) -> Result<(), TrackerError>;

    /// Release `amount` of the user's principal; returns the amount released.
    fn unstake(&self, user: &UserId, amount: Amount) -> Result<Amount, TrackerError>;

    /// Pay out all yield accrued for the user; returns the amount claimed,
    /// zero when nothing is pending.
    fn claim_rewards(&self, user: &UserId) -> Result<Amount, TrackerError>;

    /// Yield accrued for the user so far.
    fn pending_rewards(&self, user: &UserId) -> Amount;

    /// Principal currently held for the user.
    fn staked_amount(&self, user: &UserId) -> Amount;
}
