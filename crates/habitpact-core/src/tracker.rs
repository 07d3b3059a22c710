use std::sync::Arc;

use tracing::{debug, info};

use crate::adapter::StakingAdapter;
use crate::clock::{EpochClock, SystemClock};
use crate::error::TrackerError;
use crate::events::{EventLog, TrackerEvent};
use crate::ledger::BalanceLedger;
use crate::registry::HabitRegistry;
use crate::status::{DailyStatusStore, DayFlags, DayStatus};
use crate::types::{
    Amount, BalanceBucket, EpochId, Habit, HabitId, MoveTarget, UserBalances, UserId,
    DEFAULT_STAKE_PER_DAY,
};

/// Construction parameters for a [`HabitTracker`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Account allowed to run administrative operations.
    pub owner: UserId,
    /// Destination of forfeited stakes.
    pub treasury: UserId,
    /// Fixed stake locked per habit per day, identical for all users.
    pub stake_per_day: Amount,
}

impl TrackerConfig {
    pub fn new(owner: UserId, treasury: UserId) -> Self {
        Self {
            owner,
            treasury,
            stake_per_day: DEFAULT_STAKE_PER_DAY,
        }
    }

    pub fn with_stake_per_day(mut self, stake_per_day: Amount) -> Self {
        self.stake_per_day = stake_per_day;
        self
    }
}

/// The commitment-backed incentive ledger.
///
/// Single-writer state machine: every public operation runs to completion
/// before the next is observed, and nothing suspends mid-operation. Callers
/// are identified explicitly by [`UserId`]; users can only mutate their own
/// balances and habits, while settlement of past epochs is open to anyone
/// on a user's behalf.
pub struct HabitTracker {
    owner: UserId,
    treasury: UserId,
    stake_per_day: Amount,
    clock: Arc<dyn EpochClock>,
    adapter: Option<Arc<dyn StakingAdapter>>,
    pub(crate) ledger: BalanceLedger,
    pub(crate) registry: HabitRegistry,
    pub(crate) status: DailyStatusStore,
    pub(crate) events: EventLog,
    treasury_received: Amount,
}

impl HabitTracker {
    /// Build a tracker on the real wall clock.
    pub fn new(config: TrackerConfig) -> Result<Self, TrackerError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build a tracker with an explicit clock (tests, demos).
    pub fn with_clock(
        config: TrackerConfig,
        clock: Arc<dyn EpochClock>,
    ) -> Result<Self, TrackerError> {
        if config.treasury.as_str().trim().is_empty() {
            return Err(TrackerError::InvalidTreasury);
        }
        if config.stake_per_day == 0 {
            return Err(TrackerError::InvalidAmount);
        }

        Ok(Self {
            owner: config.owner,
            treasury: config.treasury,
            stake_per_day: config.stake_per_day,
            clock,
            adapter: None,
            ledger: BalanceLedger::new(),
            registry: HabitRegistry::new(),
            status: DailyStatusStore::new(),
            events: EventLog::new(),
            treasury_received: 0,
        })
    }

    // ── Administrative operations ───────────────────────────────────

    /// Replace (or clear) the staking adapter. Owner only.
    pub fn set_staking_adapter(
        &mut self,
        caller: &UserId,
        adapter: Option<Arc<dyn StakingAdapter>>,
    ) -> Result<(), TrackerError> {
        self.require_owner(caller)?;

        let old_adapter = self.adapter.as_ref().map(|a| a.name().to_string());
        let new_adapter = adapter.as_ref().map(|a| a.name().to_string());
        info!(?old_adapter, ?new_adapter, "staking adapter updated");

        self.adapter = adapter;
        self.events.record(TrackerEvent::StakingAdapterUpdated {
            old_adapter,
            new_adapter,
        });
        Ok(())
    }

    /// Hand the owner capability to another account. Owner only.
    pub fn transfer_ownership(
        &mut self,
        caller: &UserId,
        new_owner: UserId,
    ) -> Result<(), TrackerError> {
        self.require_owner(caller)?;
        info!(old_owner = %self.owner, %new_owner, "ownership transferred");
        self.owner = new_owner;
        Ok(())
    }

    // ── Ledger operations ───────────────────────────────────────────

    /// External deposit into the caller's deposit bucket.
    pub fn deposit(&mut self, user: &UserId, amount: Amount) -> Result<(), TrackerError> {
        if amount == 0 {
            return Err(TrackerError::InvalidAmount);
        }
        self.ledger.credit(user, BalanceBucket::Deposit, amount);
        info!(%user, amount, "deposit received");
        self.events.record(TrackerEvent::Deposited {
            user: user.clone(),
            amount,
        });
        Ok(())
    }

    /// Move funds between the caller's buckets, or out to the external sink.
    ///
    /// This is the only balance-mutating primitive; funding, settlement,
    /// claims and withdrawal are all specific calls to it.
    pub fn move_balance(
        &mut self,
        user: &UserId,
        from: BalanceBucket,
        to: MoveTarget,
        amount: Amount,
    ) -> Result<(), TrackerError> {
        self.ledger.transfer(user, from, to, amount)?;
        debug!(%user, %from, to = to.tag(), amount, "balance moved");
        self.events.record(TrackerEvent::BalanceMoved {
            user: user.clone(),
            from: from.tag(),
            to: to.tag(),
            amount,
        });
        Ok(())
    }

    /// [`Self::move_balance`] over raw wire tags (0 = deposit, 1 = blocked,
    /// 2 = claimable, 3 = external sink).
    pub fn move_balance_tagged(
        &mut self,
        user: &UserId,
        from: u8,
        to: u8,
        amount: Amount,
    ) -> Result<(), TrackerError> {
        let from = BalanceBucket::try_from(from)?;
        let to = MoveTarget::from_tag(to)?;
        self.move_balance(user, from, to, amount)
    }

    /// Withdraw from the deposit bucket to the caller's external wallet.
    pub fn withdraw(&mut self, user: &UserId, amount: Amount) -> Result<(), TrackerError> {
        self.move_balance(user, BalanceBucket::Deposit, MoveTarget::External, amount)
    }

    /// Pull accrued yield from the adapter into the claimable bucket.
    /// Returns the amount claimed; zero (not an error) when nothing is
    /// pending or no adapter is configured.
    pub fn claim_yield_rewards(&mut self, user: &UserId) -> Result<Amount, TrackerError> {
        let Some(adapter) = self.adapter.clone() else {
            return Ok(0);
        };
        let claimed = adapter.claim_rewards(user)?;
        if claimed > 0 {
            self.ledger.credit(user, BalanceBucket::Claimable, claimed);
            info!(%user, claimed, adapter = adapter.name(), "yield rewards claimed");
        }
        Ok(claimed)
    }

    /// Claim everything in one call: adapter yield, adapter-held principal,
    /// and the claimable bucket, all transferred out to the caller's
    /// external wallet. Returns the total paid out; zero when every source
    /// is empty.
    pub fn claim_all(&mut self, user: &UserId) -> Result<Amount, TrackerError> {
        if let Some(adapter) = self.adapter.clone() {
            // Each recovery is credited as soon as the adapter releases it,
            // so a failure later in the sequence cannot drop funds the
            // adapter has already paid out.
            let claimed = adapter.claim_rewards(user)?;
            if claimed > 0 {
                self.ledger.credit(user, BalanceBucket::Claimable, claimed);
            }
            let staked = adapter.staked_amount(user);
            if staked > 0 {
                let unstaked = adapter.unstake(user, staked)?;
                self.ledger.credit(user, BalanceBucket::Claimable, unstaked);
            }
            if claimed > 0 || staked > 0 {
                debug!(%user, claimed, staked, "adapter funds recovered into claimable");
            }
        }

        let payout = self.ledger.balances(user).claimable;
        if payout > 0 {
            self.move_balance(user, BalanceBucket::Claimable, MoveTarget::External, payout)?;
            info!(%user, payout, "claimed all rewards");
        }
        Ok(payout)
    }

    // ── Habit registry operations ───────────────────────────────────

    /// Register a new habit for the caller and return its id.
    pub fn create_habit(&mut self, user: &UserId, text: &str) -> Result<HabitId, TrackerError> {
        let epoch = self.clock.epoch_now();
        let habit_id = self.registry.create(user, text, epoch)?;
        self.ledger.increment_active_habits(user);
        info!(%user, habit_id, text, "habit created");
        self.events.record(TrackerEvent::HabitCreated {
            user: user.clone(),
            habit_id,
            text: text.to_string(),
        });
        Ok(habit_id)
    }

    /// Archive one of the caller's habits. One-way.
    pub fn archive_habit(&mut self, user: &UserId, habit_id: HabitId) -> Result<(), TrackerError> {
        self.registry.archive(user, habit_id)?;
        self.ledger.decrement_active_habits(user);
        info!(%user, habit_id, "habit archived");
        self.events.record(TrackerEvent::HabitArchived {
            user: user.clone(),
            habit_id,
        });
        Ok(())
    }

    // ── Read-only queries ───────────────────────────────────────────

    pub fn epoch_now(&self) -> EpochId {
        self.clock.epoch_now()
    }

    pub fn stake_per_day(&self) -> Amount {
        self.stake_per_day
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    pub fn treasury(&self) -> &UserId {
        &self.treasury
    }

    /// Cumulative amount forfeited to the treasury.
    pub fn treasury_received(&self) -> Amount {
        self.treasury_received
    }

    pub fn staking_adapter(&self) -> Option<Arc<dyn StakingAdapter>> {
        self.adapter.clone()
    }

    pub fn balances(&self, user: &UserId) -> UserBalances {
        self.ledger.balances(user)
    }

    /// Total habit ids ever assigned to the user.
    pub fn habit_count(&self, user: &UserId) -> u32 {
        self.registry.habit_count(user)
    }

    pub fn habit(&self, user: &UserId, habit_id: HabitId) -> Option<&Habit> {
        self.registry.get(user, habit_id)
    }

    /// Packed funded/checked/settled masks for one (user, epoch).
    pub fn day(&self, user: &UserId, epoch: EpochId) -> DayStatus {
        self.status.day(user, epoch)
    }

    /// Decoded per-habit flags for one (user, epoch, habit).
    pub fn day_flags(&self, user: &UserId, epoch: EpochId, habit_id: HabitId) -> DayFlags {
        self.status.flags(user, epoch, habit_id)
    }

    pub fn events(&self) -> &[TrackerEvent] {
        self.events.events()
    }

    pub fn event_log(&self) -> &EventLog {
        &self.events
    }

    // ── Internal helpers shared with the engines ────────────────────

    pub(crate) fn require_owner(&self, caller: &UserId) -> Result<(), TrackerError> {
        if caller != &self.owner {
            return Err(TrackerError::OnlyOwner);
        }
        Ok(())
    }

    pub(crate) fn require_current_epoch(&self, epoch: EpochId) -> Result<(), TrackerError> {
        let current = self.clock.epoch_now();
        if epoch != current {
            return Err(TrackerError::InvalidEpoch { epoch, current });
        }
        Ok(())
    }

    pub(crate) fn record_treasury_payment(&mut self, amount: Amount) {
        self.treasury_received += amount;
    }
}
