use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error, info, warn};

use crate::error::WorkerError;
use crate::jobs::executor::Executor;
use crate::worker::task::ConversionTask;

/// Fixed set of OS threads executing conversion tasks.
///
/// The queue is unbounded so that submitting never blocks the dispatching
/// caller. Outcomes are not returned; they land in the Job State Store.
pub struct WorkerPool {
    task_sender: Sender<ConversionTask>,
    task_receiver: Receiver<ConversionTask>,
    executor: Arc<Executor>,
    workers: Vec<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers.len())
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

impl WorkerPool {
    pub fn new(executor: Arc<Executor>, worker_count: usize) -> Result<Self, WorkerError> {
        if worker_count == 0 {
            return Err(WorkerError::SpawnFailed(
                "worker_count must be > 0".to_string(),
            ));
        }

        let (task_sender, task_receiver) = unbounded::<ConversionTask>();
        let shutdown = Arc::new(AtomicBool::new(false));

        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let task_rx = task_receiver.clone();
            let shutdown_flag = Arc::clone(&shutdown);
            let worker_executor = Arc::clone(&executor);

            let handle = thread::Builder::new()
                .name(format!("mediaconv-worker-{}", worker_id))
                .spawn(move || run_worker(worker_id, task_rx, shutdown_flag, worker_executor))
                .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

            workers.push(handle);
        }

        info!("Started {} workers", worker_count);

        Ok(Self {
            task_sender,
            task_receiver,
            executor,
            workers,
            shutdown,
        })
    }

    pub fn submit(&self, task: ConversionTask) -> Result<(), WorkerError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(WorkerError::ChannelClosed);
        }

        self.task_sender
            .send(task)
            .map_err(|_| WorkerError::ChannelClosed)
    }

    /// Number of tasks waiting for a worker.
    pub fn queued(&self) -> usize {
        self.task_sender.len()
    }

    /// Stops workers after their current task. Tasks still queued are not
    /// executed; their rows are marked `failed`.
    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Closes the queue and joins every worker. Without a prior
    /// [`shutdown`](Self::shutdown) all queued tasks are executed first.
    pub fn wait(self) {
        drop(self.task_sender);

        for (i, worker) in self.workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        // Anything that slipped in after the workers drained.
        abandon_queued(&self.task_receiver, &self.executor, "Worker pool");

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

fn run_worker(
    worker_id: usize,
    task_receiver: Receiver<ConversionTask>,
    shutdown: Arc<AtomicBool>,
    executor: Arc<Executor>,
) {
    debug!("Worker {} started", worker_id);

    loop {
        if shutdown.load(Ordering::Relaxed) {
            debug!("Worker {} received shutdown signal", worker_id);
            abandon_queued(&task_receiver, &executor, &format!("Worker {}", worker_id));
            break;
        }

        match task_receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(task) => {
                debug!(
                    "Worker {} processing task {} ({} {})",
                    worker_id, task.id, task.item_id, task.variant
                );
                executor.execute(task);
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                continue;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                debug!("Worker {} task channel disconnected", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}

fn abandon_queued(task_receiver: &Receiver<ConversionTask>, executor: &Executor, owner: &str) {
    let mut abandoned = 0;
    for task in task_receiver.try_iter() {
        executor.abandon(task);
        abandoned += 1;
    }
    if abandoned > 0 {
        warn!("{} abandoned {} queued tasks", owner, abandoned);
    }
}
