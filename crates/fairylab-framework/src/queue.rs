//! The deferred task queue and its background drain.
//!
//! The queue has its own lock, separate from the kernel lock. A drain swaps
//! the whole batch out first, so tasks pushed while the batch runs land in
//! the fresh queue and wait for the next cycle.

use std::sync::Arc;

use fairylab_core::{Call, Task};
use parking_lot::Mutex;
use tracing::debug;

use crate::kernel::Fairylab;

/// A task waiting to be replayed against its producing plugin.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedTask {
    pub plugin: String,
    pub task: Task,
}

/// Shared FIFO of deferred tasks.
#[derive(Debug, Clone, Default)]
pub struct TaskQueue {
    inner: Arc<Mutex<Vec<QueuedTask>>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, plugin: impl Into<String>, task: Task) {
        self.inner.lock().push(QueuedTask {
            plugin: plugin.into(),
            task,
        });
    }

    /// Swaps the current batch out, leaving an empty queue behind.
    pub fn take(&self) -> Vec<QueuedTask> {
        std::mem::take(&mut *self.inner.lock())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

/// Runs one background cycle.
///
/// The kernel lock is taken per task rather than for the whole batch, so a
/// slow task does not hold off a tick or a message pass for longer than its
/// own run. Returns the number of tasks dispatched.
pub fn drain(kernel: &Mutex<Fairylab>, queue: &TaskQueue) -> usize {
    let batch = queue.take();
    let count = batch.len();
    if count > 0 {
        debug!(count, "Draining task queue");
    }
    for QueuedTask { plugin, task } in batch {
        kernel.lock().dispatch(&plugin, Call::Task(task), None);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_swaps_batch() {
        let queue = TaskQueue::new();
        queue.push("a", Task::new("one"));
        queue.push("b", Task::new("two"));

        let clone = queue.clone();
        let batch = clone.take();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].plugin, "a");
        assert_eq!(batch[1].task.target, "two");
        assert!(queue.is_empty());

        queue.push("a", Task::new("three"));
        assert_eq!(clone.len(), 1);
    }
}
