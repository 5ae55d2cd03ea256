//! Periodic alarm scheduling
//!
//! The controller never sleeps or spawns. It asks a [`Scheduler`] to
//! deliver an [`AlarmMessage`] every `interval` and keeps the returned
//! [`TimerHandle`] so it can cancel the timer when its phase ends.
//!
//! Two schedulers ship with the crate: [`ManualScheduler`], a virtual clock
//! that hands out due alarms on request, and [`TokioScheduler`], which
//! delivers alarms into a tokio channel from background interval tasks.

use std::collections::{BTreeMap, HashMap};

use tokio::{sync::mpsc, task::JoinHandle};
use web_time::Duration;

use crate::AlarmMessage;

/// Smallest period a scheduler will honour
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Handle to a scheduled repeating alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

/// Source of periodic alarms
pub trait Scheduler {
    /// Delivers `alarm` every `interval`, first after one full interval
    fn schedule_repeating(&mut self, alarm: AlarmMessage, interval: Duration) -> TimerHandle;

    /// Stops a timer; cancelling an already cancelled timer does nothing
    fn cancel(&mut self, handle: TimerHandle);
}

#[derive(Debug, Clone, Copy)]
struct ScheduledAlarm {
    alarm: AlarmMessage,
    interval: Duration,
    due: Duration,
}

/// Virtual clock scheduler
///
/// Time only moves when the owner pulls alarms with
/// [`ManualScheduler::pop_due`] or calls [`ManualScheduler::advance_to`].
/// Alarms due at the same instant are delivered in scheduling order.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<u64, ScheduledAlarm>,
}

impl ManualScheduler {
    /// Creates a scheduler whose clock reads zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of timers that have not been cancelled
    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    /// Delivers the earliest alarm due at or before `deadline`
    ///
    /// The clock moves to the alarm's due time and the timer is rearmed
    /// one interval later. Returns `None` when nothing is due.
    pub fn pop_due(&mut self, deadline: Duration) -> Option<AlarmMessage> {
        let id = self
            .timers
            .iter()
            .filter(|(_, timer)| timer.due <= deadline)
            .min_by_key(|(id, timer)| (timer.due, **id))
            .map(|(id, _)| *id)?;

        let timer = self.timers.get_mut(&id)?;
        self.now = timer.due;
        timer.due += timer.interval;

        Some(timer.alarm)
    }

    /// Moves the clock forward to `deadline` without delivering anything
    pub fn advance_to(&mut self, deadline: Duration) {
        self.now = self.now.max(deadline);
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&mut self, alarm: AlarmMessage, interval: Duration) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;

        let interval = interval.max(MIN_INTERVAL);
        self.timers.insert(
            id,
            ScheduledAlarm {
                alarm,
                interval,
                due: self.now + interval,
            },
        );

        TimerHandle(id)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.timers.remove(&handle.0);
    }
}

/// Scheduler backed by tokio interval tasks
///
/// Each timer is a spawned task that sends its alarm into the channel given
/// at construction. Cancelling aborts the task. Must be used from within a
/// tokio runtime.
#[derive(Debug)]
pub struct TokioScheduler {
    sender: mpsc::UnboundedSender<AlarmMessage>,
    next_id: u64,
    tasks: HashMap<u64, JoinHandle<()>>,
}

impl TokioScheduler {
    /// Creates a scheduler delivering into `sender`
    pub fn new(sender: mpsc::UnboundedSender<AlarmMessage>) -> Self {
        Self {
            sender,
            next_id: 0,
            tasks: HashMap::new(),
        }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&mut self, alarm: AlarmMessage, interval: Duration) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;

        let interval = interval.max(MIN_INTERVAL);
        let sender = self.sender.clone();
        let task = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            loop {
                ticker.tick().await;
                if sender.send(alarm).is_err() {
                    break;
                }
            }
        });

        self.tasks.retain(|_, task| !task.is_finished());
        self.tasks.insert(id, task);

        TimerHandle(id)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle.0) {
            task.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for task in self.tasks.values() {
            task.abort();
        }
    }
}
