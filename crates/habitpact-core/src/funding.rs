use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::TrackerError;
use crate::events::TrackerEvent;
use crate::tracker::HabitTracker;
use crate::types::{BalanceBucket, EpochId, HabitId, MoveTarget, UserId, MAX_HABIT_ID};

/// Outcome of one `prepare_day` batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPreparation {
    pub funded_count: u32,
    pub insufficient_count: u32,
}

impl HabitTracker {
    /// Lock today's stake for every active habit of the caller.
    ///
    /// Only the current epoch can be funded. The batch is tolerant per
    /// habit: one with insufficient deposit balance is counted and skipped,
    /// never aborting the rest; already-funded habits are skipped silently,
    /// which makes the call safely repeatable within the day.
    pub fn prepare_day(
        &mut self,
        user: &UserId,
        epoch: EpochId,
    ) -> Result<DayPreparation, TrackerError> {
        self.require_current_epoch(epoch)?;

        let stake = self.stake_per_day();
        let active_ids: Vec<HabitId> = self
            .registry
            .habits(user)
            .iter()
            .enumerate()
            .filter(|(_, habit)| !habit.archived)
            .map(|(index, _)| index as HabitId + 1)
            .collect();

        let mut outcome = DayPreparation::default();
        for habit_id in active_ids {
            if self.status.flags(user, epoch, habit_id).funded {
                continue;
            }
            match self.ledger.transfer(
                user,
                BalanceBucket::Deposit,
                MoveTarget::Bucket(BalanceBucket::Blocked),
                stake,
            ) {
                Ok(()) => {
                    self.status.mark_funded(user, epoch, habit_id);
                    self.events.record(TrackerEvent::BalanceMoved {
                        user: user.clone(),
                        from: BalanceBucket::Deposit.tag(),
                        to: BalanceBucket::Blocked.tag(),
                        amount: stake,
                    });
                    outcome.funded_count += 1;
                }
                Err(TrackerError::InsufficientBalance { .. }) => {
                    warn!(%user, habit_id, epoch, "deposit balance too low to fund habit");
                    outcome.insufficient_count += 1;
                }
                Err(other) => return Err(other),
            }
        }

        info!(
            %user,
            epoch,
            funded = outcome.funded_count,
            insufficient = outcome.insufficient_count,
            "day prepared"
        );
        self.events.record(TrackerEvent::DayPrepared {
            user: user.clone(),
            epoch,
            funded_count: outcome.funded_count,
            insufficient_count: outcome.insufficient_count,
        });
        Ok(outcome)
    }

    /// Record today's check-in for one habit. Pure bit flip, no balance
    /// movement.
    pub fn check_in(
        &mut self,
        user: &UserId,
        habit_id: HabitId,
        epoch: EpochId,
    ) -> Result<(), TrackerError> {
        self.require_current_epoch(epoch)?;
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
        if flags.checked {
            return Err(TrackerError::AlreadyCheckedIn { habit_id, epoch });
        }

        self.status.mark_checked(user, epoch, habit_id);
        info!(%user, habit_id, epoch, "checked in");
        self.events.record(TrackerEvent::CheckedIn {
            user: user.clone(),
            habit_id,
            epoch,
        });
        Ok(())
    }
}
