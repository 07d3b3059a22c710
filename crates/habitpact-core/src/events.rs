use serde::{Deserialize, Serialize};

use crate::types::{Amount, EpochId, HabitId, UserId};

/// Everything observable the tracker does, in emission order.
///
/// Balance mutations always appear as `BalanceMoved` with the exact bucket
/// pair (wire tags 0/1/2, external sink 3) alongside the higher-level event
/// that caused them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackerEvent {
    Deposited {
        user: UserId,
        amount: Amount,
    },
    BalanceMoved {
        user: UserId,
        from: u8,
        to: u8,
        amount: Amount,
    },
    HabitCreated {
        user: UserId,
        habit_id: HabitId,
        text: String,
    },
    HabitArchived {
        user: UserId,
        habit_id: HabitId,
    },
    DayPrepared {
        user: UserId,
        epoch: EpochId,
        funded_count: u32,
        insufficient_count: u32,
    },
    CheckedIn {
        user: UserId,
        habit_id: HabitId,
        epoch: EpochId,
    },
    SettledSuccess {
        user: UserId,
        habit_id: HabitId,
        epoch: EpochId,
        reward: Amount,
    },
    SettledFail {
        user: UserId,
        habit_id: HabitId,
        epoch: EpochId,
        slashed: Amount,
    },
    StakingAdapterUpdated {
        old_adapter: Option<String>,
        new_adapter: Option<String>,
    },
}

impl TrackerEvent {
    /// The user this event belongs to, if any.
    pub fn user(&self) -> Option<&UserId> {
        match self {
            Self::Deposited { user, .. }
            | Self::BalanceMoved { user, .. }
            | Self::HabitCreated { user, .. }
            | Self::HabitArchived { user, .. }
            | Self::DayPrepared { user, .. }
            | Self::CheckedIn { user, .. }
            | Self::SettledSuccess { user, .. }
            | Self::SettledFail { user, .. } => Some(user),
            Self::StakingAdapterUpdated { .. } => None,
        }
    }
}

/// Append-only event log.
///
/// No in-place mutation APIs are exposed; every state transition becomes an
/// additional record.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<TrackerEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub(crate) fn record(&mut self, event: TrackerEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[TrackerEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events belonging to one user, in emission order.
    pub fn for_user<'a>(&'a self, user: &'a UserId) -> impl Iterator<Item = &'a TrackerEvent> {
        self.events
            .iter()
            .filter(move |event| event.user() == Some(user))
    }
}
