//! Bounded task queue and worker pool.
//!
//! The queue is an explicit object constructed at engine startup, not
//! process-global state. Submissions go through a bounded channel; a
//! shared receiver guarded by a mutex guarantees each task is dequeued at
//! most once. Workers poll with a timeout so they observe the shutdown
//! flag promptly, and a panicking coordinator invocation still lands its
//! task in the failed state.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::coordinator::Coordinator;
use crate::error::{Result, TaskError};
use crate::store::StatsStore;
use crate::task::{TaskRecord, TaskStatus};

/// Producer side of the bounded task queue.
pub struct TaskQueue {
    sender: SyncSender<TaskRecord>,
}

impl TaskQueue {
    /// Create a queue with the given capacity, returning the producer
    /// handle and the receiver for a worker pool to drain.
    pub fn bounded(capacity: usize) -> (Self, Receiver<TaskRecord>) {
        let (sender, receiver) = sync_channel(capacity);
        (Self { sender }, receiver)
    }

    /// Enqueue a task without blocking. A full or closed queue is a
    /// submission error, not a silent drop.
    pub fn submit(&self, task: TaskRecord) -> Result<()> {
        match self.sender.try_send(task) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(task)) => Err(TaskError::QueueUnavailable(format!(
                "queue full, rejecting task {}",
                task.task_id
            ))),
            Err(TrySendError::Disconnected(task)) => Err(TaskError::QueueUnavailable(format!(
                "queue closed, rejecting task {}",
                task.task_id
            ))),
        }
    }
}

/// Long-lived worker threads draining the queue.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Spawn `workers` threads that each pull tasks and run the
    /// coordinator synchronously, one task at a time.
    pub fn start(
        workers: usize,
        poll_timeout: Duration,
        receiver: Receiver<TaskRecord>,
        coordinator: Arc<Coordinator>,
        store: Arc<dyn StatsStore>,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers)
            .map(|worker_id| {
                let receiver = Arc::clone(&receiver);
                let coordinator = Arc::clone(&coordinator);
                let store = Arc::clone(&store);
                let shutdown = Arc::clone(&shutdown);
                thread::Builder::new()
                    .name(format!("datascope-worker-{worker_id}"))
                    .spawn(move || {
                        worker_loop(
                            worker_id,
                            poll_timeout,
                            &receiver,
                            &coordinator,
                            store.as_ref(),
                            &shutdown,
                        );
                    })
                    .unwrap_or_else(|e| panic!("failed to spawn worker thread: {e}"))
            })
            .collect();

        info!("Worker pool started with {} workers", workers);
        Self { handles, shutdown }
    }

    /// Signal shutdown and join all workers. In-flight tasks finish;
    /// queued tasks not yet dequeued are abandoned in `pending`.
    pub fn shutdown(self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for handle in self.handles {
            if handle.join().is_err() {
                error!("Worker thread panicked outside task execution");
            }
        }
        info!("Worker pool shut down");
    }
}

fn worker_loop(
    worker_id: usize,
    poll_timeout: Duration,
    receiver: &Mutex<Receiver<TaskRecord>>,
    coordinator: &Coordinator,
    store: &dyn StatsStore,
    shutdown: &AtomicBool,
) {
    debug!("Worker {} started", worker_id);
    while !shutdown.load(Ordering::SeqCst) {
        // Holding the lock across the timed wait keeps dequeue single-
        // consumer: a task can reach exactly one worker.
        let next = receiver.lock().recv_timeout(poll_timeout);
        match next {
            Ok(task) => {
                debug!("Worker {} picked up task {}", worker_id, task.task_id);
                let outcome = catch_unwind(AssertUnwindSafe(|| coordinator.run(&task)));
                if outcome.is_err() {
                    warn!(
                        "Worker {} caught a panic while running task {}",
                        worker_id, task.task_id
                    );
                    if let Err(e) = store.set_status(
                        &task.task_id,
                        TaskStatus::Failed,
                        "Internal error: worker panicked during analysis",
                    ) {
                        error!("Could not mark panicked task {} failed: {}", task.task_id, e);
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("Worker {} exiting", worker_id);
}
