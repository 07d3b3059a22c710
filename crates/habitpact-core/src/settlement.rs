use tracing::{info, warn};

use crate::error::TrackerError;
use crate::events::TrackerEvent;
use crate::tracker::HabitTracker;
use crate::types::{BalanceBucket, EpochId, HabitId, MoveTarget, UserId, MAX_HABIT_ID};

impl HabitTracker {
    /// Resolve one funded habit for a past epoch, exactly once.
    ///
    /// Checked-in habits take the success path: the stake moves from the
    /// blocked bucket into claimable, or is forwarded to the staking
    /// adapter when one is configured. Habits without a check-in forfeit
    /// the stake to the treasury. Anyone may settle on a user's behalf
    /// once the epoch has passed.
    pub fn settle(
        &mut self,
        user: &UserId,
        epoch: EpochId,
        habit_id: HabitId,
    ) -> Result<(), TrackerError> {
        self.require_past_epoch(epoch)?;
        self.settle_resolved(user, epoch, habit_id)
    }

    /// Settle every funded, unsettled habit of `user` for a past epoch,
    /// performing at most `max_count` settlements.
    ///
    /// Habits that are not funded or already settled are skipped silently;
    /// the bitmaps themselves are the resumption checkpoint, so repeated
    /// calls pick up where the previous one stopped. Returns the number of
    /// settlements performed.
    pub fn settle_all(
        &mut self,
        user: &UserId,
        epoch: EpochId,
        max_count: u32,
    ) -> Result<u32, TrackerError> {
        require_batch_size(max_count)?;
        self.require_past_epoch(epoch)?;
        self.settle_day_inner(user, epoch, max_count)
    }

    /// Settle explicit (epoch, habit) pairs, skipping pairs that are not
    /// funded or already settled. Every epoch in the list must be in the
    /// past. Returns the number of settlements performed.
    pub fn settle_batch(
        &mut self,
        user: &UserId,
        epochs: &[EpochId],
        habit_ids: &[HabitId],
    ) -> Result<u32, TrackerError> {
        if epochs.is_empty() || epochs.len() != habit_ids.len() {
            return Err(TrackerError::InvalidBatchSize(format!(
                "got {} epochs and {} habit ids",
                epochs.len(),
                habit_ids.len()
            )));
        }

        let mut settled_count = 0;
        for (&epoch, &habit_id) in epochs.iter().zip(habit_ids) {
            self.require_past_epoch(epoch)?;
            let flags = self.status.flags(user, epoch, habit_id);
            if !flags.funded || flags.settled {
                continue;
            }
            self.settle_resolved(user, epoch, habit_id)?;
            settled_count += 1;
        }
        Ok(settled_count)
    }

    /// Owner escape hatch: settle without the past-epoch requirement.
    ///
    /// The original deployment tooling documents this as testing-only; it
    /// is deliberately gated on the owner capability here so the current
    /// day cannot be settled out from under a user by arbitrary callers.
    pub fn force_settle(
        &mut self,
        caller: &UserId,
        user: &UserId,
        epoch: EpochId,
        habit_id: HabitId,
    ) -> Result<(), TrackerError> {
        self.require_owner(caller)?;
        warn!(%caller, %user, epoch, habit_id, "force settle bypasses the past-epoch check");
        self.settle_resolved(user, epoch, habit_id)
    }

    /// Owner escape hatch over a whole day, bounded by `max_count`.
    pub fn force_settle_day(
        &mut self,
        caller: &UserId,
        user: &UserId,
        epoch: EpochId,
        max_count: u32,
    ) -> Result<u32, TrackerError> {
        self.require_owner(caller)?;
        require_batch_size(max_count)?;
        warn!(%caller, %user, epoch, "force settling day");
        self.settle_day_inner(user, epoch, max_count)
    }

    /// Owner escape hatch across every epoch from `start_epoch` through
    /// today, bounded by `max_settlements` in total.
    pub fn force_settle_all_epochs(
        &mut self,
        caller: &UserId,
        user: &UserId,
        start_epoch: EpochId,
        max_settlements: u32,
    ) -> Result<u32, TrackerError> {
        self.require_owner(caller)?;
        require_batch_size(max_settlements)?;

        let mut remaining = max_settlements;
        let mut total = 0;
        for epoch in start_epoch..=self.epoch_now() {
            if remaining == 0 {
                break;
            }
            let settled = self.settle_day_inner(user, epoch, remaining)?;
            total += settled;
            remaining -= settled;
        }
        Ok(total)
    }

    fn settle_day_inner(
        &mut self,
        user: &UserId,
        epoch: EpochId,
        max_count: u32,
    ) -> Result<u32, TrackerError> {
        let mut settled_count = 0;
        for habit_id in 1..=self.registry.habit_count(user) {
            if settled_count == max_count {
                break;
            }
            let flags = self.status.flags(user, epoch, habit_id);
            if !flags.funded || flags.settled {
                continue;
            }
            self.settle_resolved(user, epoch, habit_id)?;
            settled_count += 1;
        }
        Ok(settled_count)
    }

    /// Core transition, with the epoch precondition already resolved by the
    /// caller. The `settled` bit is set as the final step; the precondition
    /// check on it is what makes re-entry fail closed instead of paying
    /// twice.
    fn settle_resolved(
        &mut self,
        user: &UserId,
        epoch: EpochId,
        habit_id: HabitId,
    ) -> Result<(), TrackerError> {
        if habit_id > MAX_HABIT_ID {
            return Err(TrackerError::HabitIdTooLarge(habit_id));
        }
        if self.registry.get(user, habit_id).is_none() {
            return Err(TrackerError::HabitNotFound(habit_id));
        }

        let flags = self.status.flags(user, epoch, habit_id);
        if !flags.funded {
            return Err(TrackerError::DayNotFunded { habit_id, epoch });
        }
        if flags.settled {
            return Err(TrackerError::AlreadySettled { habit_id, epoch });
        }

        let stake = self.stake_per_day();
        if flags.checked {
            match self.staking_adapter() {
                Some(adapter) => {
                    // The funded precondition guarantees the stake is still
                    // blocked; verify before touching the adapter so a
                    // failed stake call leaves everything untouched.
                    let blocked = self.ledger.balances(user).blocked;
                    if blocked < stake {
                        return Err(TrackerError::InsufficientBalance {
                            required: stake,
                            available: blocked,
                        });
                    }
                    adapter.stake(user, stake)?;
                    self.ledger
                        .transfer(user, BalanceBucket::Blocked, MoveTarget::External, stake)?;
                    self.events.record(TrackerEvent::BalanceMoved {
                        user: user.clone(),
                        from: BalanceBucket::Blocked.tag(),
                        to: MoveTarget::External.tag(),
                        amount: stake,
                    });
                    info!(%user, habit_id, epoch, reward = stake, adapter = adapter.name(),
                        "settled success, reward staked");
                }
                None => {
                    self.ledger.transfer(
                        user,
                        BalanceBucket::Blocked,
                        MoveTarget::Bucket(BalanceBucket::Claimable),
                        stake,
                    )?;
                    self.events.record(TrackerEvent::BalanceMoved {
                        user: user.clone(),
                        from: BalanceBucket::Blocked.tag(),
                        to: BalanceBucket::Claimable.tag(),
                        amount: stake,
                    });
                    info!(%user, habit_id, epoch, reward = stake, "settled success");
                }
            }
            self.status.mark_settled(user, epoch, habit_id);
            self.events.record(TrackerEvent::SettledSuccess {
                user: user.clone(),
                habit_id,
                epoch,
                reward: stake,
            });
        } else {
            self.ledger
                .transfer(user, BalanceBucket::Blocked, MoveTarget::External, stake)?;
            self.record_treasury_payment(stake);
            self.events.record(TrackerEvent::BalanceMoved {
                user: user.clone(),
                from: BalanceBucket::Blocked.tag(),
                to: MoveTarget::External.tag(),
                amount: stake,
            });
            self.status.mark_settled(user, epoch, habit_id);
            info!(%user, habit_id, epoch, slashed = stake, treasury = %self.treasury(),
                "settled fail, stake forfeited");
            self.events.record(TrackerEvent::SettledFail {
                user: user.clone(),
                habit_id,
                epoch,
                slashed: stake,
            });
        }
        Ok(())
    }

    fn require_past_epoch(&self, epoch: EpochId) -> Result<(), TrackerError> {
        if epoch >= self.epoch_now() {
            return Err(TrackerError::CannotSettleCurrentDay(epoch));
        }
        Ok(())
    }
}

fn require_batch_size(max_count: u32) -> Result<(), TrackerError> {
    if max_count == 0 {
        return Err(TrackerError::InvalidBatchSize(
            "max_count must be non-zero".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::tracker::TrackerConfig;
    use crate::types::UNIT;
    use std::sync::Arc;

    fn owner() -> UserId {
        UserId::new("owner")
    }

    fn alice() -> UserId {
        UserId::new("alice")
    }

    fn setup() -> (HabitTracker, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_at(1_700_000_000));
        let tracker = HabitTracker::with_clock(
            TrackerConfig::new(owner(), UserId::new("treasury"))
                .with_stake_per_day(10 * UNIT),
            clock.clone(),
        )
        .unwrap();
        (tracker, clock)
    }

    /// Deposit, one habit, funded today; returns the funded epoch.
    fn funded_habit(tracker: &mut HabitTracker) -> (HabitId, EpochId) {
        tracker.deposit(&alice(), 100 * UNIT).unwrap();
        let id = tracker.create_habit(&alice(), "Exercise").unwrap();
        let epoch = tracker.epoch_now();
        tracker.prepare_day(&alice(), epoch).unwrap();
        (id, epoch)
    }

    #[test]
    fn checked_in_stake_becomes_claimable() {
        let (mut tracker, clock) = setup();
        let (id, epoch) = funded_habit(&mut tracker);
        tracker.check_in(&alice(), id, epoch).unwrap();

        clock.advance_days(1);
        tracker.settle(&alice(), epoch, id).unwrap();

        let balances = tracker.balances(&alice());
        assert_eq!(balances.deposit, 90 * UNIT);
        assert_eq!(balances.blocked, 0);
        assert_eq!(balances.claimable, 10 * UNIT);
        assert!(tracker.day_flags(&alice(), epoch, id).settled);
        assert!(tracker.events().iter().any(|event| matches!(
            event,
            TrackerEvent::SettledSuccess { reward, .. } if *reward == 10 * UNIT
        )));
    }

    #[test]
    fn missed_stake_is_forfeited_to_treasury() {
        let (mut tracker, clock) = setup();
        let (id, epoch) = funded_habit(&mut tracker);

        clock.advance_days(1);
        tracker.settle(&alice(), epoch, id).unwrap();

        let balances = tracker.balances(&alice());
        assert_eq!(balances.deposit, 90 * UNIT);
        assert_eq!(balances.blocked, 0);
        assert_eq!(balances.claimable, 0);
        assert_eq!(tracker.treasury_received(), 10 * UNIT);
        assert!(tracker.events().iter().any(|event| matches!(
            event,
            TrackerEvent::SettledFail { slashed, .. } if *slashed == 10 * UNIT
        )));
    }

    #[test]
    fn settlement_is_exactly_once() {
        let (mut tracker, clock) = setup();
        let (id, epoch) = funded_habit(&mut tracker);
        tracker.check_in(&alice(), id, epoch).unwrap();

        clock.advance_days(1);
        tracker.settle(&alice(), epoch, id).unwrap();
        assert!(matches!(
            tracker.settle(&alice(), epoch, id),
            Err(TrackerError::AlreadySettled { .. })
        ));
        // Balance effect happened exactly once.
        assert_eq!(tracker.balances(&alice()).claimable, 10 * UNIT);
    }

    #[test]
    fn the_current_day_cannot_be_settled() {
        let (mut tracker, _clock) = setup();
        let (id, epoch) = funded_habit(&mut tracker);
        tracker.check_in(&alice(), id, epoch).unwrap();

        assert!(matches!(
            tracker.settle(&alice(), epoch, id),
            Err(TrackerError::CannotSettleCurrentDay(_))
        ));
        assert!(matches!(
            tracker.settle_all(&alice(), epoch, 10),
            Err(TrackerError::CannotSettleCurrentDay(_))
        ));
    }

    #[test]
    fn unfunded_days_cannot_be_settled() {
        let (mut tracker, clock) = setup();
        tracker.deposit(&alice(), 100 * UNIT).unwrap();
        let id = tracker.create_habit(&alice(), "Exercise").unwrap();
        let epoch = tracker.epoch_now();

        clock.advance_days(1);
        assert!(matches!(
            tracker.settle(&alice(), epoch, id),
            Err(TrackerError::DayNotFunded { .. })
        ));
    }

    #[test]
    fn settle_all_is_bounded_and_resumable() {
        let (mut tracker, clock) = setup();
        tracker.deposit(&alice(), 100 * UNIT).unwrap();
        for text in ["Exercise", "Read", "Meditate"] {
            tracker.create_habit(&alice(), text).unwrap();
        }
        let epoch = tracker.epoch_now();
        tracker.prepare_day(&alice(), epoch).unwrap();
        tracker.check_in(&alice(), 2, epoch).unwrap();

        clock.advance_days(1);
        assert_eq!(tracker.settle_all(&alice(), epoch, 2).unwrap(), 2);
        assert_eq!(tracker.settle_all(&alice(), epoch, 2).unwrap(), 1);
        assert_eq!(tracker.settle_all(&alice(), epoch, 2).unwrap(), 0);

        let balances = tracker.balances(&alice());
        assert_eq!(balances.claimable, 10 * UNIT);
        assert_eq!(tracker.treasury_received(), 20 * UNIT);
    }

    #[test]
    fn settle_all_rejects_a_zero_batch() {
        let (mut tracker, clock) = setup();
        let (_, epoch) = funded_habit(&mut tracker);
        clock.advance_days(1);
        assert!(matches!(
            tracker.settle_all(&alice(), epoch, 0),
            Err(TrackerError::InvalidBatchSize(_))
        ));
    }

    #[test]
    fn settle_batch_settles_pairs_across_epochs() {
        let (mut tracker, clock) = setup();
        tracker.deposit(&alice(), 100 * UNIT).unwrap();
        let id = tracker.create_habit(&alice(), "Exercise").unwrap();

        let first = tracker.epoch_now();
        tracker.prepare_day(&alice(), first).unwrap();
        tracker.check_in(&alice(), id, first).unwrap();

        clock.advance_days(1);
        let second = tracker.epoch_now();
        tracker.prepare_day(&alice(), second).unwrap();

        clock.advance_days(1);
        let settled = tracker
            .settle_batch(&alice(), &[first, second], &[id, id])
            .unwrap();
        assert_eq!(settled, 2);
        assert_eq!(tracker.balances(&alice()).claimable, 10 * UNIT);
        assert_eq!(tracker.treasury_received(), 10 * UNIT);

        // Already-settled pairs are silent skips.
        assert_eq!(
            tracker
                .settle_batch(&alice(), &[first, second], &[id, id])
                .unwrap(),
            0
        );
    }

    #[test]
    fn settle_batch_validates_its_shape() {
        let (mut tracker, _clock) = setup();
        assert!(matches!(
            tracker.settle_batch(&alice(), &[], &[]),
            Err(TrackerError::InvalidBatchSize(_))
        ));
        assert!(matches!(
            tracker.settle_batch(&alice(), &[1, 2], &[1]),
            Err(TrackerError::InvalidBatchSize(_))
        ));
    }

    #[test]
    fn force_settle_is_owner_gated() {
        let (mut tracker, _clock) = setup();
        let (id, epoch) = funded_habit(&mut tracker);
        tracker.check_in(&alice(), id, epoch).unwrap();

        assert!(matches!(
            tracker.force_settle(&alice(), &alice(), epoch, id),
            Err(TrackerError::OnlyOwner)
        ));

        // The owner can settle the current day.
        tracker.force_settle(&owner(), &alice(), epoch, id).unwrap();
        assert_eq!(tracker.balances(&alice()).claimable, 10 * UNIT);
    }

    #[test]
    fn force_settle_day_matches_settler_behavior() {
        let (mut tracker, _clock) = setup();
        let (id, epoch) = funded_habit(&mut tracker);
        tracker.check_in(&alice(), id, epoch).unwrap();

        let settled = tracker
            .force_settle_day(&owner(), &alice(), epoch, 10)
            .unwrap();
        assert_eq!(settled, 1);
        assert_eq!(tracker.balances(&alice()).claimable, 10 * UNIT);
    }

    #[test]
    fn force_settle_all_epochs_walks_to_today() {
        let (mut tracker, clock) = setup();
        tracker.deposit(&alice(), 100 * UNIT).unwrap();
        let id = tracker.create_habit(&alice(), "Exercise").unwrap();

        let first = tracker.epoch_now();
        tracker.prepare_day(&alice(), first).unwrap();
        clock.advance_days(1);
        let second = tracker.epoch_now();
        tracker.prepare_day(&alice(), second).unwrap();
        tracker.check_in(&alice(), id, second).unwrap();

        let settled = tracker
            .force_settle_all_epochs(&owner(), &alice(), first, 10)
            .unwrap();
        assert_eq!(settled, 2);
        assert_eq!(tracker.treasury_received(), 10 * UNIT);
        assert_eq!(tracker.balances(&alice()).claimable, 10 * UNIT);
    }

    #[test]
    fn check_in_after_settlement_fails_closed() {
        let (mut tracker, _clock) = setup();
        let (id, epoch) = funded_habit(&mut tracker);

        tracker.force_settle(&owner(), &alice(), epoch, id).unwrap();
        assert!(matches!(
            tracker.check_in(&alice(), id, epoch),
            Err(TrackerError::AlreadySettled { .. })
        ));
    }
}
