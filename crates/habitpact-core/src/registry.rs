use std::collections::HashMap;

use crate::error::TrackerError;
use crate::types::{
    EpochId, Habit, HabitId, UserId, MAX_HABIT_ID, MAX_HABIT_TEXT_LEN, MIN_HABIT_TEXT_LEN,
};

/// Per-user habit registry with monotonically assigned ids.
///
/// Ids start at 1 and are never reused; the habit at index `i` of a user's
/// list has id `i + 1`. Archiving is one-way and keeps the slot, so ids of
/// archived habits stay resolvable forever.
#[derive(Debug, Default, Clone)]
pub struct HabitRegistry {
    habits: HashMap<UserId, Vec<Habit>>,
}

impl HabitRegistry {
    pub fn new() -> Self {
        Self {
            habits: HashMap::new(),
        }
    }

    /// Register a new habit and return its id.
    pub(crate) fn create(
        &mut self,
        user: &UserId,
        text: &str,
        epoch: EpochId,
    ) -> Result<HabitId, TrackerError> {
        let len = text.len();
        if len < MIN_HABIT_TEXT_LEN {
            return Err(TrackerError::HabitTextTooShort { len });
        }
        if len > MAX_HABIT_TEXT_LEN {
            return Err(TrackerError::HabitTextTooLong { len });
        }

        let list = self.habits.entry(user.clone()).or_default();
        let next_id = list.len() as HabitId + 1;
        if next_id > MAX_HABIT_ID {
            return Err(TrackerError::HabitIdTooLarge(next_id));
        }

        list.push(Habit {
            text: text.to_string(),
            created_at_epoch: epoch,
            archived: false,
        });
        Ok(next_id)
    }

    /// Archive a habit. One-way; there is no unarchive.
    pub(crate) fn archive(&mut self, user: &UserId, habit_id: HabitId) -> Result<(), TrackerError> {
        let index = habit_id
            .checked_sub(1)
            .ok_or(TrackerError::HabitNotFound(habit_id))? as usize;
        let habit = self
            .habits
            .get_mut(user)
            .and_then(|list| list.get_mut(index))
            .ok_or(TrackerError::HabitNotFound(habit_id))?;

        if habit.archived {
            return Err(TrackerError::HabitAlreadyArchived(habit_id));
        }
        habit.archived = true;
        Ok(())
    }

    /// Look up a habit by id.
    pub fn get(&self, user: &UserId, habit_id: HabitId) -> Option<&Habit> {
        let index = habit_id.checked_sub(1)? as usize;
        self.habits.get(user)?.get(index)
    }

    /// Total ids ever assigned to this user (the registry counter).
    pub fn habit_count(&self, user: &UserId) -> u32 {
        self.habits.get(user).map(|list| list.len() as u32).unwrap_or(0)
    }

    /// All habits of a user in id order; index `i` holds id `i + 1`.
    pub fn habits(&self, user: &UserId) -> &[Habit] {
        self.habits.get(user).map(Vec::as_slice).unwrap_or(&[])
    }
}
