use std::collections::HashMap;

use crate::error::TrackerError;
use crate::types::{Amount, BalanceBucket, MoveTarget, UserBalances, UserId};

/// Per-user balance buckets and the single transfer primitive.
///
/// Every higher-level operation (funding, settlement, claims, withdrawal)
/// is expressed through [`BalanceLedger::transfer`]; nothing else mutates
/// bucket balances. Moves between buckets conserve the user's total; moves
/// to the external sink remove funds from the ledger.
#[derive(Debug, Default, Clone)]
pub struct BalanceLedger {
    balances: HashMap<UserId, UserBalances>,
}

impl BalanceLedger {
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    /// Current balances for a user; all-zero if the user is unknown.
    pub fn balances(&self, user: &UserId) -> UserBalances {
        self.balances.get(user).copied().unwrap_or_default()
    }

    /// Sum of the user's three buckets.
    pub fn total(&self, user: &UserId) -> Amount {
        self.balances(user).total()
    }

    /// Move `amount` from one bucket to another bucket of the same user, or
    /// out to the external sink.
    pub(crate) fn transfer(
        &mut self,
        user: &UserId,
        from: BalanceBucket,
        to: MoveTarget,
        amount: Amount,
    ) -> Result<(), TrackerError> {
        if amount == 0 {
            return Err(TrackerError::InvalidAmount);
        }

        let state = self.balances.entry(user.clone()).or_default();
        let source = bucket_mut(state, from);
        if *source < amount {
            return Err(TrackerError::InsufficientBalance {
                required: amount,
                available: *source,
            });
        }

        *source -= amount;
        if let MoveTarget::Bucket(destination) = to {
            *bucket_mut(state, destination) += amount;
        }
        Ok(())
    }

    /// Credit a bucket with funds arriving from outside the ledger
    /// (external deposit, adapter payout).
    pub(crate) fn credit(&mut self, user: &UserId, bucket: BalanceBucket, amount: Amount) {
        let state = self.balances.entry(user.clone()).or_default();
        *bucket_mut(state, bucket) += amount;
    }

    pub(crate) fn increment_active_habits(&mut self, user: &UserId) {
        let state = self.balances.entry(user.clone()).or_default();
        state.active_habit_count += 1;
    }

    pub(crate) fn decrement_active_habits(&mut self, user: &UserId) {
        let state = self.balances.entry(user.clone()).or_default();
        state.active_habit_count = state.active_habit_count.saturating_sub(1);
    }
}

fn bucket_mut(state: &mut UserBalances, bucket: BalanceBucket) -> &mut Amount {
    match bucket {
        BalanceBucket::Deposit => &mut state.deposit,
        BalanceBucket::Blocked => &mut state.blocked,
        BalanceBucket::Claimable => &mut state.claimable,
    }
}
