//! Main-context schedulers.
//!
//! - [`TokioScheduler`] runs tasks on a Tokio runtime after a real delay.
//!   The simulator binary uses it.
//! - [`ManualScheduler`] queues tasks on a virtual clock that tests advance
//!   explicitly, so debounce timing is deterministic.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;

use crate::application::platform::{MainTask, MainThreadScheduler};

/// Runs tasks on a Tokio runtime.
#[derive(Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Uses the runtime of the calling task.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl MainThreadScheduler for TokioScheduler {
    fn schedule_after(&self, delay: Duration, task: MainTask) {
        self.handle.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            task();
        });
    }
}

struct QueuedTask {
    due: Duration,
    seq: u64,
    task: MainTask,
}

#[derive(Default)]
struct Queue {
    now: Duration,
    next_seq: u64,
    tasks: Vec<QueuedTask>,
}

/// A virtual-clock scheduler for tests.
///
/// Tasks run only inside [`advance`](Self::advance) or
/// [`run_until_idle`](Self::run_until_idle), in due-time order, FIFO for
/// equal due times.  Tasks may schedule further tasks.
#[derive(Default)]
pub struct ManualScheduler {
    queue: Mutex<Queue>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of tasks not yet run.
    pub fn pending(&self) -> usize {
        self.queue().tasks.len()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.queue().now
    }

    /// Advances the virtual clock by `by`, running every task that falls due.
    /// Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.queue().now + by;
        let mut ran = 0;
        while let Some(task) = self.pop_due(target) {
            task();
            ran += 1;
        }
        self.queue().now = target;
        ran
    }

    /// Runs tasks until the queue is empty, jumping the clock as needed.
    /// Returns the number of tasks run.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let next_due = self.queue().tasks.iter().map(|t| t.due).min();
            match next_due {
                Some(due) => {
                    let now = self.now();
                    ran += self.advance(due.saturating_sub(now));
                }
                None => return ran,
            }
        }
    }

    /// Removes the earliest task due at or before `target`, moving the clock
    /// to its due time.  The lock is released before the task runs.
    fn pop_due(&self, target: Duration) -> Option<MainTask> {
        let mut queue = self.queue();
        let index = queue
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= target)
            .min_by_key(|(_, t)| (t.due, t.seq))
            .map(|(i, _)| i)?;
        let queued = queue.tasks.swap_remove(index);
        queue.now = queue.now.max(queued.due);
        Some(queued.task)
    }
}

impl MainThreadScheduler for ManualScheduler {
    fn schedule_after(&self, delay: Duration, task: MainTask) {
        let mut queue = self.queue();
        let due = queue.now + delay;
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.tasks.push(QueuedTask { due, seq, task });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn push(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> MainTask {
        let log = Arc::clone(log);
        Box::new(move || log.lock().unwrap().push(name))
    }

    #[test]
    fn test_manual_scheduler_runs_only_due_tasks() {
        // Arrange
        let scheduler = ManualScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        scheduler.schedule_after(Duration::from_millis(100), push(&log, "restore"));
        scheduler.schedule(push(&log, "detach"));

        // Act
        let ran = scheduler.advance(Duration::from_millis(50));

        // Assert
        assert_eq!(ran, 1);
        assert_eq!(*log.lock().unwrap(), vec!["detach"]);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.now(), Duration::from_millis(50));
    }

    #[test]
    fn test_manual_scheduler_orders_by_due_time_then_fifo() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        scheduler.schedule_after(Duration::from_millis(20), push(&log, "c"));
        scheduler.schedule_after(Duration::from_millis(10), push(&log, "a"));
        scheduler.schedule_after(Duration::from_millis(10), push(&log, "b"));

        scheduler.run_until_idle();

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(scheduler.now(), Duration::from_millis(20));
    }

    #[test]
    fn test_manual_scheduler_runs_tasks_scheduled_by_tasks() {
        let scheduler = Arc::new(ManualScheduler::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let (s, l) = (Arc::clone(&scheduler), Arc::clone(&log));
        scheduler.schedule(Box::new(move || {
            l.lock().unwrap().push("first");
            s.schedule_after(Duration::from_millis(5), push(&l, "second"));
        }));

        let ran = scheduler.run_until_idle();

        assert_eq!(ran, 2);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_tokio_scheduler_runs_task_after_delay() {
        // Arrange
        let scheduler = TokioScheduler::current();
        let (tx, rx) = tokio::sync::oneshot::channel();

        // Act
        scheduler.schedule_after(
            Duration::from_millis(10),
            Box::new(move || {
                let _ = tx.send(());
            }),
        );

        // Assert
        tokio::time::timeout(Duration::from_secs(2), rx)
            .await
            .expect("task must run before the timeout")
            .expect("sender must not be dropped");
    }
}
