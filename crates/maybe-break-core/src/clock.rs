//! Virtual-time timer queue.
//!
//! The queue does not own a thread or read the system clock. Time only moves
//! when the owner pops due timers up to a target instant and then calls
//! [`TimerQueue::advance_to`]. The daemon drives it from a one-second
//! interval; tests drive it directly, so every schedule is reproducible.
//!
//! ## Usage
//!
//! ```
//! use std::time::Duration;
//! use maybe_break_core::clock::TimerQueue;
//!
//! let mut timers = TimerQueue::new();
//! let tick = timers.schedule_repeating(Duration::from_secs(1), "tick");
//! let target = timers.now() + Duration::from_secs(3);
//! let mut fired = 0;
//! while let Some((id, _)) = timers.pop_due(target) {
//!     assert_eq!(id, tick);
//!     fired += 1;
//! }
//! timers.advance_to(target);
//! assert_eq!(fired, 3);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Smallest accepted repeat interval. A zero interval would never let the
/// clock move past the deadline.
const MIN_REPEAT: Duration = Duration::from_millis(1);

/// Handle to a scheduled timer. Stays valid across repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Entry<T> {
    id: TimerId,
    payload: T,
    every: Option<Duration>,
}

/// Ordered set of one-shot and repeating timers over a virtual clock.
///
/// Timers with the same deadline fire in the order they were (re)armed.
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    now: Duration,
    next_id: u64,
    next_seq: u64,
    pending: BTreeMap<(Duration, u64), Entry<T>>,
    index: HashMap<TimerId, (Duration, u64)>,
}

impl<T: Clone> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            next_seq: 0,
            pending: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    /// Virtual time elapsed since the queue was created.
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Schedule `payload` to fire once, `delay` from now.
    pub fn schedule_once(&mut self, delay: Duration, payload: T) -> TimerId {
        let id = self.allocate_id();
        self.insert(
            self.now.saturating_add(delay),
            Entry {
                id,
                payload,
                every: None,
            },
        );
        id
    }

    /// Schedule `payload` to fire every `every`, first firing one interval
    /// from now.
    pub fn schedule_repeating(&mut self, every: Duration, payload: T) -> TimerId {
        let every = every.max(MIN_REPEAT);
        let id = self.allocate_id();
        self.insert(
            self.now.saturating_add(every),
            Entry {
                id,
                payload,
                every: Some(every),
            },
        );
        id
    }

    /// Cancel a timer. Returns `false` if it already fired or was canceled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.index.remove(&id) {
            Some(key) => {
                self.pending.remove(&key);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.index.contains_key(&id)
    }

    /// Next firing instant of a pending timer.
    pub fn deadline(&self, id: TimerId) -> Option<Duration> {
        self.index.get(&id).map(|(at, _)| *at)
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.keys().next().map(|(at, _)| *at)
    }

    /// Pop the earliest timer due at or before `until`.
    ///
    /// The clock moves to the timer's deadline before it is returned, and a
    /// repeating timer is re-armed before the caller handles it, so a handler
    /// may cancel it.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, T)> {
        let key = *self.pending.keys().next()?;
        if key.0 > until {
            return None;
        }
        let entry = self.pending.remove(&key)?;
        self.now = self.now.max(key.0);

        match entry.every {
            Some(every) => {
                let id = entry.id;
                let payload = entry.payload.clone();
                self.insert(key.0.saturating_add(every), entry);
                Some((id, payload))
            }
            None => {
                self.index.remove(&entry.id);
                Some((entry.id, entry.payload))
            }
        }
    }

    /// Move the clock forward. Never moves it backwards.
    pub fn advance_to(&mut self, to: Duration) {
        self.now = self.now.max(to);
    }

    fn allocate_id(&mut self) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert(&mut self, at: Duration, entry: Entry<T>) {
        let key = (at, self.next_seq);
        self.next_seq += 1;
        self.index.insert(entry.id, key);
        self.pending.insert(key, entry);
    }
}

impl<T: Clone> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn drain(timers: &mut TimerQueue<&'static str>, by: u64) -> Vec<&'static str> {
        let target = timers.now() + secs(by);
        let mut fired = Vec::new();
        while let Some((_, payload)) = timers.pop_due(target) {
            fired.push(payload);
        }
        timers.advance_to(target);
        fired
    }

    #[test]
    fn one_shot_fires_once_at_deadline() {
        let mut timers = TimerQueue::new();
        let id = timers.schedule_once(secs(3), "once");
        assert_eq!(timers.deadline(id), Some(secs(3)));

        assert!(drain(&mut timers, 2).is_empty());
        assert_eq!(drain(&mut timers, 1), vec!["once"]);
        assert!(!timers.is_pending(id));
        assert!(drain(&mut timers, 10).is_empty());
    }

    #[test]
    fn repeating_rearms_until_canceled() {
        let mut timers = TimerQueue::new();
        let id = timers.schedule_repeating(secs(2), "tick");
        assert_eq!(drain(&mut timers, 7), vec!["tick", "tick", "tick"]);
        assert_eq!(timers.deadline(id), Some(secs(8)));

        assert!(timers.cancel(id));
        assert!(drain(&mut timers, 10).is_empty());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut timers = TimerQueue::new();
        let id = timers.schedule_once(secs(1), "x");
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id));

        let fired = timers.schedule_once(secs(1), "y");
        drain(&mut timers, 1);
        assert!(!timers.cancel(fired));
    }

    #[test]
    fn same_deadline_fires_in_arm_order() {
        let mut timers = TimerQueue::new();
        timers.schedule_once(secs(5), "first");
        timers.schedule_once(secs(5), "second");
        timers.schedule_once(secs(4), "earlier");
        assert_eq!(drain(&mut timers, 5), vec!["earlier", "first", "second"]);
    }

    #[test]
    fn clock_tracks_popped_deadline() {
        let mut timers = TimerQueue::new();
        timers.schedule_once(secs(2), "a");
        let (_, _) = timers.pop_due(secs(10)).unwrap();
        assert_eq!(timers.now(), secs(2));
        timers.advance_to(secs(10));
        assert_eq!(timers.now(), secs(10));
        timers.advance_to(secs(4));
        assert_eq!(timers.now(), secs(10));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let mut timers = TimerQueue::new();
        timers.schedule_repeating(Duration::ZERO, "spin");
        let fired = drain(&mut timers, 0);
        assert!(fired.is_empty());
        assert_eq!(timers.next_deadline(), Some(MIN_REPEAT));
    }

    #[test]
    fn huge_delay_saturates_instead_of_overflowing() {
        let mut timers = TimerQueue::new();
        timers.advance_to(secs(3));
        let far = timers.schedule_once(Duration::MAX, "far");
        assert_eq!(timers.deadline(far), Some(Duration::MAX));
        assert!(timers.pop_due(secs(1_000_000)).is_none());
    }
}
