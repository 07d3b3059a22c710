//! Staking adapter implementations for habitpact.
//!
//! The settlement engine only ever talks through the
//! [`StakingAdapter`] interface; everything here is a concrete routing
//! target for settled rewards. `MockStakingRewards` mirrors the reward
//! model the original deployment uses for local networks: a fixed
//! per-second rate accruing linearly on each user's staked principal,
//! paid from a pre-funded reward pool.

#![deny(unsafe_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{info, warn};

use habitpact_core::{Amount, EpochClock, StakingAdapter, TrackerError, UserId, UNIT};

/// One user's position in the mock staking pool.
#[derive(Debug, Default, Clone)]
struct StakePosition {
    staked: Amount,
    accrued: Amount,
    last_update: i64,
}

impl StakePosition {
    /// Fold elapsed time into `accrued` and move the checkpoint forward.
    fn accrue(&mut self, rate_per_second: Amount, now: i64) {
        self.accrued += self.earned_since_checkpoint(rate_per_second, now);
        self.last_update = now;
    }

    fn pending(&self, rate_per_second: Amount, now: i64) -> Amount {
        self.accrued + self.earned_since_checkpoint(rate_per_second, now)
    }

    // staked * rate * elapsed can exceed 128 bits; the division goes first.
    fn earned_since_checkpoint(&self, rate_per_second: Amount, now: i64) -> Amount {
        let elapsed = now.saturating_sub(self.last_update);
        if elapsed <= 0 || self.staked == 0 {
            return 0;
        }
        self.staked * rate_per_second / UNIT * elapsed as Amount
    }
}

#[derive(Debug, Default)]
struct PoolState {
    reward_pool: Amount,
    positions: HashMap<UserId, StakePosition>,
}

/// Deterministic staking-rewards double.
///
/// Yield accrues linearly: `staked * rate_per_second * elapsed / UNIT` per
/// user, checkpointed on every mutation. Claims are capped by the funded
/// reward pool; anything the pool cannot cover stays accrued.
pub struct MockStakingRewards {
    rate_per_second: Amount,
    clock: Arc<dyn EpochClock>,
    state: Mutex<PoolState>,
}

impl MockStakingRewards {
    /// `rate_per_second` is yield per second per whole staked unit, in base
    /// units (the original local deployment uses 3.5e13).
    pub fn new(
        rate_per_second: Amount,
        clock: Arc<dyn EpochClock>,
    ) -> Result<Self, TrackerError> {
        if rate_per_second == 0 {
            return Err(TrackerError::InvalidStakingAdapter(
                "rate_per_second must be non-zero".to_string(),
            ));
        }
        Ok(Self {
            rate_per_second,
            clock,
            state: Mutex::new(PoolState::default()),
        })
    }

    /// Top up the reward pool the way the deployment scripts pre-fund it.
    pub fn fund(&self, amount: Amount) {
        let mut state = self.lock_state();
        state.reward_pool += amount;
        info!(amount, pool = state.reward_pool, "reward pool funded");
    }

    pub fn reward_pool(&self) -> Amount {
        self.lock_state().reward_pool
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StakingAdapter for MockStakingRewards {
    fn name(&self) -> &'static str {
        "mock-staking-rewards"
    }

    fn stake(&self, user: &UserId, amount: Amount) -> Result<(), TrackerError> {
        if amount == 0 {
            return Err(TrackerError::InvalidAmount);
        }
        let now = self.clock.unix_now();
        let mut state = self.lock_state();
        let position = state.positions.entry(user.clone()).or_default();
        position.accrue(self.rate_per_second, now);
        position.staked += amount;
        info!(%user, amount, staked = position.staked, "staked");
        Ok(())
    }

    fn unstake(&self, user: &UserId, amount: Amount) -> Result<Amount, TrackerError> {
        if amount == 0 {
            return Err(TrackerError::InvalidAmount);
        }
        let now = self.clock.unix_now();
        let mut state = self.lock_state();
        let position = state.positions.entry(user.clone()).or_default();
        position.accrue(self.rate_per_second, now);
        if position.staked < amount {
            return Err(TrackerError::InsufficientBalance {
                required: amount,
                available: position.staked,
            });
        }
        position.staked -= amount;
        info!(%user, amount, staked = position.staked, "unstaked");
        Ok(amount)
    }

    fn claim_rewards(&self, user: &UserId) -> Result<Amount, TrackerError> {
        let now = self.clock.unix_now();
        let mut state = self.lock_state();
        let pool = state.reward_pool;
        let position = state.positions.entry(user.clone()).or_default();
        position.accrue(self.rate_per_second, now);

        let payout = position.accrued.min(pool);
        if payout < position.accrued {
            warn!(%user, accrued = position.accrued, pool, "reward pool cannot cover accrued yield");
        }
        position.accrued -= payout;
        state.reward_pool -= payout;
        if payout > 0 {
            info!(%user, payout, "rewards claimed");
        }
        Ok(payout)
    }

    fn pending_rewards(&self, user: &UserId) -> Amount {
        let now = self.clock.unix_now();
        let state = self.lock_state();
        state
            .positions
            .get(user)
            .map(|position| position.pending(self.rate_per_second, now))
            .unwrap_or(0)
    }

    fn staked_amount(&self, user: &UserId) -> Amount {
        self.lock_state()
            .positions
            .get(user)
            .map(|position| position.staked)
            .unwrap_or(0)
    }
}

/// Deterministic failing adapter useful for chaos testing.
///
/// Every mutating call fails with `TransferFailed`; settlement and claims
/// must leave ledger state untouched when that happens.
pub struct FailingAdapter {
    reason: String,
}

impl FailingAdapter {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl StakingAdapter for FailingAdapter {
    fn name(&self) -> &'static str {
        "failing-adapter"
    }

    fn stake(&self, _user: &UserId, _amount: Amount) -> Result<(), TrackerError> {
        Err(TrackerError::TransferFailed(self.reason.clone()))
    }

    fn unstake(&self, _user: &UserId, _amount: Amount) -> Result<Amount, TrackerError> {
        Err(TrackerError::TransferFailed(self.reason.clone()))
    }

    fn claim_rewards(&self, _user: &UserId) -> Result<Amount, TrackerError> {
        Err(TrackerError::TransferFailed(self.reason.clone()))
    }

    fn pending_rewards(&self, _user: &UserId) -> Amount {
        0
    }

    fn staked_amount(&self, _user: &UserId) -> Amount {
        0
    }
}
