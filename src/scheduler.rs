//! Virtual-time timer queue.
//!
//! Components never sleep. They schedule a command value and the owner of
//! the queue runs it once the clock reaches its deadline. Timers with equal
//! deadlines fire in the order they were scheduled.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TimerId(u64);

#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    queue: BTreeMap<(Duration, TimerId), T>,
    deadlines: HashMap<TimerId, Duration>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed since the scheduler was created.
    pub const fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, task: impl Into<T>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let deadline = self.now.saturating_add(delay);
        self.queue.insert((deadline, id), task.into());
        self.deadlines.insert(id, deadline);
        id
    }

    /// Drops a pending timer. Returns `false` if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(deadline) => self.queue.remove(&(deadline, id)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Pops the earliest timer due at or before `until` and moves the clock
    /// to its deadline.
    pub fn pop_due(&mut self, until: Duration) -> Option<T> {
        let entry = self.queue.first_entry()?;
        let (deadline, id) = *entry.key();
        if deadline > until {
            return None;
        }
        let task = entry.remove();
        self.deadlines.remove(&id);
        self.now = self.now.max(deadline);
        Some(task)
    }

    /// Moves the clock forward without firing anything. The clock never
    /// goes backwards.
    pub fn advance_to(&mut self, at: Duration) {
        self.now = self.now.max(at);
    }
}

#[cfg(test)]
mod tests {
    use super::Scheduler;
    use std::time::Duration;

    #[test]
    fn pops_in_deadline_then_insertion_order() {
        let mut timers: Scheduler<&str> = Scheduler::new();
        timers.schedule(Duration::from_millis(20), "late");
        timers.schedule(Duration::from_millis(10), "first");
        timers.schedule(Duration::from_millis(10), "second");

        let until = Duration::from_millis(15);
        assert_eq!(timers.pop_due(until), Some("first"));
        assert_eq!(timers.pop_due(until), Some("second"));
        assert_eq!(timers.pop_due(until), None);
        assert_eq!(timers.now(), Duration::from_millis(10));
        assert_eq!(timers.next_deadline(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut timers: Scheduler<u8> = Scheduler::new();
        let id = timers.schedule(Duration::from_secs(1), 1);
        assert!(timers.is_pending(id));
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));
        assert_eq!(timers.pending(), 0);
        assert_eq!(timers.pop_due(Duration::from_secs(5)), None);
    }

    #[test]
    fn delays_are_relative_to_current_time() {
        let mut timers: Scheduler<u8> = Scheduler::new();
        timers.advance_to(Duration::from_secs(3));
        timers.advance_to(Duration::from_secs(1));
        timers.schedule(Duration::from_secs(2), 7);
        assert_eq!(timers.next_deadline(), Some(Duration::from_secs(5)));
    }
}
