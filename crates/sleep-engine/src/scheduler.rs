//! Periodic task scheduling behind an injectable clock.
//!
//! Tasks are plain values; the owner of the simulation state polls
//! [`Scheduler::pop_due`] and dispatches each firing itself, so every
//! mutation happens on a single owner.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    SensorTick,
    ConnectionTick,
    SampleTick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub handle: TaskHandle,
    pub task: Task,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("interval must be positive, got {0} ms")]
    InvalidInterval(i64),
    #[error("clock failure: {0}")]
    Clock(String),
}

pub trait Scheduler {
    fn now(&self) -> DateTime<Utc>;

    /// First firing happens one interval from now.
    fn schedule_periodic(&mut self, every: Duration, task: Task)
        -> Result<TaskHandle, SchedulerError>;

    /// Returns false if the handle was unknown or already cancelled.
    fn cancel(&mut self, handle: TaskHandle) -> bool;

    fn is_scheduled(&self, handle: TaskHandle) -> bool;

    /// Earliest due firing, if any. Ties go to the task registered first.
    fn pop_due(&mut self) -> Result<Option<Fired>, SchedulerError>;
}

#[derive(Debug, Clone)]
struct Entry {
    handle: TaskHandle,
    task: Task,
    every: Duration,
    next_due: DateTime<Utc>,
}

/// Bookkeeping shared by the virtual and wall-clock schedulers.
#[derive(Debug, Clone, Default)]
struct TaskTable {
    entries: Vec<Entry>,
    last_handle: u64,
}

impl TaskTable {
    fn insert(
        &mut self,
        now: DateTime<Utc>,
        every: Duration,
        task: Task,
    ) -> Result<TaskHandle, SchedulerError> {
        if every <= Duration::zero() {
            return Err(SchedulerError::InvalidInterval(every.num_milliseconds()));
        }
        self.last_handle += 1;
        let handle = TaskHandle(self.last_handle);
        self.entries.push(Entry {
            handle,
            task,
            every,
            next_due: now + every,
        });
        Ok(handle)
    }

    fn remove(&mut self, handle: TaskHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.handle != handle);
        self.entries.len() != before
    }

    fn contains(&self, handle: TaskHandle) -> bool {
        self.entries.iter().any(|e| e.handle == handle)
    }

    fn pop_due(&mut self, horizon: DateTime<Utc>) -> Option<Fired> {
        let entry = self
            .entries
            .iter_mut()
            .filter(|e| e.next_due <= horizon)
            .min_by_key(|e| (e.next_due, e.handle))?;
        let fired = Fired {
            handle: entry.handle,
            task: entry.task,
            at: entry.next_due,
        };
        entry.next_due = entry.next_due + entry.every;
        Some(fired)
    }
}

/// Manually advanced clock for tests and fast simulation.
///
/// [`VirtualScheduler::advance`] only moves the horizon; `now` walks forward
/// to each firing as it is popped and settles on the horizon once nothing
/// else is due.
#[derive(Debug, Clone)]
pub struct VirtualScheduler {
    now: DateTime<Utc>,
    horizon: DateTime<Utc>,
    table: TaskTable,
}

impl VirtualScheduler {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: start,
            horizon: start,
            table: TaskTable::default(),
        }
    }

    pub fn advance(&mut self, by: Duration) {
        if by > Duration::zero() {
            self.horizon = self.horizon + by;
        }
    }

    pub fn horizon(&self) -> DateTime<Utc> {
        self.horizon
    }
}

impl Scheduler for VirtualScheduler {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn schedule_periodic(
        &mut self,
        every: Duration,
        task: Task,
    ) -> Result<TaskHandle, SchedulerError> {
        self.table.insert(self.now, every, task)
    }

    fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.table.remove(handle)
    }

    fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.table.contains(handle)
    }

    fn pop_due(&mut self) -> Result<Option<Fired>, SchedulerError> {
        match self.table.pop_due(self.horizon) {
            Some(fired) => {
                self.now = fired.at;
                Ok(Some(fired))
            }
            None => {
                self.now = self.horizon;
                Ok(None)
            }
        }
    }
}

/// Scheduler driven by the system clock.
#[derive(Debug, Clone, Default)]
pub struct WallScheduler {
    table: TaskTable,
}

impl WallScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Scheduler for WallScheduler {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn schedule_periodic(
        &mut self,
        every: Duration,
        task: Task,
    ) -> Result<TaskHandle, SchedulerError> {
        self.table.insert(Utc::now(), every, task)
    }

    fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.table.remove(handle)
    }

    fn is_scheduled(&self, handle: TaskHandle) -> bool {
        self.table.contains(handle)
    }

    fn pop_due(&mut self) -> Result<Option<Fired>, SchedulerError> {
        Ok(self.table.pop_due(Utc::now()))
    }
}
