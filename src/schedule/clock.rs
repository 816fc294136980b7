//! Reference discrete-event schedule.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::{ScheduledAction, Scheduler};

/// A pending one-time action.
struct Entry {
    at: f64,
    seq: u64,
    action: ScheduledAction,
}

// BinaryHeap is a max-heap; invert so the earliest (time, seq) pops first.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .total_cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

/// Single-threaded discrete-event schedule.
///
/// Each call to [`Schedule::execute`] advances the clock to the earliest
/// pending time and runs every action registered for that time, including
/// actions those actions schedule for the same time.
pub struct Schedule {
    now: Cell<f64>,
    next_seq: Cell<u64>,
    pending: RefCell<BinaryHeap<Entry>>,
}

impl Schedule {
    /// Create a schedule starting at time 0.
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    /// Create a schedule starting at `start`.
    pub fn starting_at(start: f64) -> Self {
        Self {
            now: Cell::new(start),
            next_seq: Cell::new(0),
            pending: RefCell::new(BinaryHeap::new()),
        }
    }

    /// Current tick count (alias of [`Scheduler::now`]).
    #[must_use]
    pub fn tick_count(&self) -> f64 {
        self.now.get()
    }

    /// Number of actions waiting to run.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Time of the earliest pending action.
    #[must_use]
    pub fn next_time(&self) -> Option<f64> {
        self.pending.borrow().peek().map(|e| e.at)
    }

    /// Advance to the next scheduled time and run everything due.
    ///
    /// Returns the new time, or `None` if nothing was pending.
    pub fn execute(&self) -> Option<f64> {
        let at = self.next_time()?;
        if at > self.now.get() {
            self.now.set(at);
        }
        let now = self.now.get();

        loop {
            let due = self.take_due(now);
            if due.is_empty() {
                break;
            }
            tracing::trace!(time = now, actions = due.len(), "executing scheduled actions");
            for action in due {
                action();
            }
        }

        Some(now)
    }

    /// Run ticks until the next pending time would exceed `end`.
    ///
    /// Returns the number of ticks executed.
    pub fn execute_until(&self, end: f64) -> usize {
        let mut ticks = 0;
        while self.next_time().is_some_and(|t| t <= end) {
            self.execute();
            ticks += 1;
        }
        ticks
    }

    /// Pop every action due at or before `now`, releasing the heap borrow
    /// before any of them runs.
    fn take_due(&self, now: f64) -> Vec<ScheduledAction> {
        let mut pending = self.pending.borrow_mut();
        let mut due = Vec::new();
        while pending.peek().is_some_and(|e| e.at <= now) {
            if let Some(entry) = pending.pop() {
                due.push(entry.action);
            }
        }
        due
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schedule")
            .field("now", &self.now.get())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl Scheduler for Schedule {
    fn now(&self) -> f64 {
        self.now.get()
    }

    fn schedule_one_time(&self, at: f64, action: ScheduledAction) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        self.pending.borrow_mut().push(Entry { at, seq, action });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> ScheduledAction {
        let log = log.clone();
        Box::new(move || log.borrow_mut().push(label))
    }

    #[test]
    fn test_empty_schedule_does_not_advance() {
        let schedule = Schedule::new();
        assert_eq!(schedule.execute(), None);
        assert_eq!(schedule.tick_count(), 0.0);
    }

    #[test]
    fn test_runs_in_time_then_registration_order() {
        let schedule = Schedule::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        schedule.schedule_one_time(2.0, recorder(&log, "late"));
        schedule.schedule_one_time(1.0, recorder(&log, "first"));
        schedule.schedule_one_time(1.0, recorder(&log, "second"));

        assert_eq!(schedule.execute(), Some(1.0));
        assert_eq!(*log.borrow(), vec!["first", "second"]);

        assert_eq!(schedule.execute(), Some(2.0));
        assert_eq!(*log.borrow(), vec!["first", "second", "late"]);
        assert_eq!(schedule.pending_count(), 0);
    }

    #[test]
    fn test_same_time_reschedule_runs_in_same_tick() {
        let schedule = Rc::new(Schedule::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_log = log.clone();
        let handle = schedule.clone();
        schedule.schedule_one_time(
            1.0,
            Box::new(move || {
                inner_log.borrow_mut().push("outer");
                handle.schedule_one_time(1.0, recorder(&inner_log, "inner"));
            }),
        );

        schedule.execute();
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn test_past_times_run_now() {
        let schedule = Schedule::starting_at(5.0);
        let log = Rc::new(RefCell::new(Vec::new()));
        schedule.schedule_one_time(1.0, recorder(&log, "past"));

        assert_eq!(schedule.execute(), Some(5.0));
        assert_eq!(*log.borrow(), vec!["past"]);
    }

    #[test]
    fn test_execute_until() {
        let schedule = Schedule::new();
        for t in [1.0, 2.0, 3.0, 4.0] {
            schedule.schedule_one_time(t, Box::new(|| ()));
        }

        assert_eq!(schedule.execute_until(2.5), 2);
        assert_eq!(schedule.tick_count(), 2.0);
        assert_eq!(schedule.next_time(), Some(3.0));
    }
}
