//! End-to-end flows through the public tracker surface, with no staking
//! adapter configured (rewards fall back to the claimable bucket).

use std::sync::Arc;

use habitpact_core::{
    HabitTracker, ManualClock, TrackerConfig, TrackerError, TrackerEvent, UserId, UNIT,
};

fn owner() -> UserId {
    UserId::new("owner")
}

fn alice() -> UserId {
    UserId::new("alice")
}

fn bob() -> UserId {
    UserId::new("bob")
}

fn setup() -> (HabitTracker, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::starting_at(1_700_000_000));
    let tracker = HabitTracker::with_clock(
        TrackerConfig::new(owner(), UserId::new("treasury")).with_stake_per_day(10 * UNIT),
        clock.clone(),
    )
    .expect("valid config");
    (tracker, clock)
}

#[test]
fn checked_in_day_settles_into_claimable() {
    let (mut tracker, clock) = setup();

    tracker.deposit(&alice(), 100 * UNIT).unwrap();
    let habit_id = tracker.create_habit(&alice(), "Exercise").unwrap();
    assert_eq!(habit_id, 1);

    let epoch = tracker.epoch_now();
    let prepared = tracker.prepare_day(&alice(), epoch).unwrap();
    assert_eq!(prepared.funded_count, 1);

    let balances = tracker.balances(&alice());
    assert_eq!(balances.deposit, 90 * UNIT);
    assert_eq!(balances.blocked, 10 * UNIT);

    tracker.check_in(&alice(), habit_id, epoch).unwrap();

    clock.advance_days(1);
    let settled = tracker.settle_all(&alice(), epoch, 10).unwrap();
    assert_eq!(settled, 1);

    let balances = tracker.balances(&alice());
    assert_eq!(balances.deposit, 90 * UNIT);
    assert_eq!(balances.blocked, 0);
    assert_eq!(balances.claimable, 10 * UNIT);
    assert!(tracker.events().iter().any(|event| matches!(
        event,
        TrackerEvent::SettledSuccess { reward, .. } if *reward == 10 * UNIT
    )));

    let day = tracker.day(&alice(), epoch);
    assert_eq!(day.funded.count_ones(), 1);
    assert_eq!(day.checked.count_ones(), 1);
    assert_eq!(day.settled.count_ones(), 1);
    assert_eq!(tracker.day_flags(&alice(), epoch, habit_id).bits(), 0b111);

    // Nothing in the ledger left the protocol.
    assert_eq!(tracker.treasury_received(), 0);
}

#[test]
fn missed_day_forfeits_the_stake_entirely() {
    let (mut tracker, clock) = setup();

    tracker.deposit(&bob(), 100 * UNIT).unwrap();
    let habit_id = tracker.create_habit(&bob(), "Exercise").unwrap();

    let epoch = tracker.epoch_now();
    tracker.prepare_day(&bob(), epoch).unwrap();
    // No check-in.

    clock.advance_days(1);
    tracker.settle_all(&bob(), epoch, 10).unwrap();

    let balances = tracker.balances(&bob());
    assert_eq!(balances.deposit, 90 * UNIT);
    assert_eq!(balances.blocked, 0);
    assert_eq!(balances.claimable, 0);
    assert_eq!(balances.total(), 90 * UNIT);
    assert_eq!(tracker.treasury_received(), 10 * UNIT);
    assert!(tracker.events().iter().any(|event| matches!(
        event,
        TrackerEvent::SettledFail { slashed, .. } if *slashed == 10 * UNIT
    )));

    assert!(matches!(
        tracker.settle(&bob(), epoch, habit_id),
        Err(TrackerError::AlreadySettled { .. })
    ));
}

#[test]
fn a_week_of_mixed_days_adds_up() {
    let (mut tracker, clock) = setup();
    tracker.deposit(&alice(), 100 * UNIT).unwrap();
    let habit_id = tracker.create_habit(&alice(), "Exercise").unwrap();

    let mut checked_days = 0u32;
    for day in 0..7 {
        let epoch = tracker.epoch_now();
        tracker.prepare_day(&alice(), epoch).unwrap();
        if day % 2 == 0 {
            tracker.check_in(&alice(), habit_id, epoch).unwrap();
            checked_days += 1;
        }
        clock.advance_days(1);
        tracker.settle_all(&alice(), epoch, 10).unwrap();
    }

    let balances = tracker.balances(&alice());
    assert_eq!(balances.deposit, 30 * UNIT);
    assert_eq!(balances.claimable, u128::from(checked_days) * 10 * UNIT);
    assert_eq!(
        tracker.treasury_received(),
        u128::from(7 - checked_days) * 10 * UNIT
    );

    let payout = tracker.claim_all(&alice()).unwrap();
    assert_eq!(payout, 40 * UNIT);
    assert_eq!(tracker.balances(&alice()).claimable, 0);
}

#[test]
fn users_do_not_interfere() {
    let (mut tracker, clock) = setup();
    tracker.deposit(&alice(), 50 * UNIT).unwrap();
    tracker.deposit(&bob(), 50 * UNIT).unwrap();
    let a = tracker.create_habit(&alice(), "Exercise").unwrap();
    tracker.create_habit(&bob(), "Read").unwrap();

    let epoch = tracker.epoch_now();
    tracker.prepare_day(&alice(), epoch).unwrap();
    tracker.prepare_day(&bob(), epoch).unwrap();
    tracker.check_in(&alice(), a, epoch).unwrap();

    clock.advance_days(1);
    tracker.settle_all(&alice(), epoch, 10).unwrap();
    tracker.settle_all(&bob(), epoch, 10).unwrap();

    assert_eq!(tracker.balances(&alice()).claimable, 10 * UNIT);
    assert_eq!(tracker.balances(&bob()).claimable, 0);
    assert_eq!(tracker.treasury_received(), 10 * UNIT);
}

#[test]
fn anyone_may_settle_past_epochs_on_a_users_behalf() {
    // Settlement takes the settled user explicitly; there is no caller
    // restriction once the epoch has passed, matching the open settlement
    // design. Only force settlement is owner-gated.
    let (mut tracker, clock) = setup();
    tracker.deposit(&alice(), 100 * UNIT).unwrap();
    let habit_id = tracker.create_habit(&alice(), "Exercise").unwrap();
    let epoch = tracker.epoch_now();
    tracker.prepare_day(&alice(), epoch).unwrap();
    tracker.check_in(&alice(), habit_id, epoch).unwrap();

    clock.advance_days(1);
    tracker.settle(&alice(), epoch, habit_id).unwrap();
    assert_eq!(tracker.balances(&alice()).claimable, 10 * UNIT);

    assert!(matches!(
        tracker.force_settle(&bob(), &alice(), epoch, habit_id),
        Err(TrackerError::OnlyOwner)
    ));
}
