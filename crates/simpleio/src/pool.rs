use std::{
    io,
    panic::{self, AssertUnwindSafe},
    thread::{self, JoinHandle},
};

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;
use tracing::{event, Level};

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size pool of worker threads.
///
/// Every worker has its own queue, so a batch submitted through `invoke_all` puts task `i` on
/// worker `i % size`. With one task per worker each worker runs exactly one task, and no worker
/// can steal a sibling's task.
pub struct WorkerPool {
    workers: Vec<Worker>,
}

struct Worker {
    sender: Option<Sender<Task>>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` worker threads.
    pub fn new(size: usize) -> Result<Self, PoolError> {
        let mut pool = Self {
            workers: Vec::with_capacity(size),
        };

        for index in 0..size {
            let (sender, receiver) = crossbeam_channel::unbounded();
            let handle = thread::Builder::new()
                .name(format!("simpleio-worker-{}", index))
                .spawn(move || run_worker(index, receiver))
                .map_err(PoolError::Spawn)?;

            pool.workers.push(Worker {
                sender: Some(sender),
                handle: Some(handle),
            });
        }

        event!(Level::DEBUG, size, "worker pool started");
        Ok(pool)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.workers.iter().all(|w| w.sender.is_none())
    }

    /// Run all tasks on the pool and block until every one of them has finished.
    ///
    /// The returned slots are in submission order. A slot is `None` if its task panicked and
    /// never produced a value.
    pub fn invoke_all<F, T>(&self, tasks: Vec<F>) -> Result<Vec<Option<T>>, PoolError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.workers.is_empty() || self.is_shut_down() {
            return Err(PoolError::ShutDown);
        }

        let count = tasks.len();
        let (result_sender, result_receiver) = crossbeam_channel::bounded(count);

        for (index, task) in tasks.into_iter().enumerate() {
            let worker = &self.workers[index % self.workers.len()];
            let sender = worker.sender.as_ref().ok_or(PoolError::ShutDown)?;

            let result_sender = result_sender.clone();
            let task: Task = Box::new(move || {
                let value = task();
                // The receiver outlives every task of the batch
                let _ = result_sender.send((index, value));
            });

            sender.send(task).map_err(|_| PoolError::ShutDown)?;
        }

        // Only task-held senders are left, the loop below ends once all tasks are done
        drop(result_sender);

        let mut results: Vec<Option<T>> = (0..count).map(|_| None).collect();
        for (index, value) in result_receiver.iter() {
            results[index] = Some(value);
        }

        Ok(results)
    }

    /// Stop accepting tasks, and wait for the workers to finish what they already have.
    pub fn shutdown(&mut self) {
        for worker in &mut self.workers {
            worker.sender.take();
        }

        for (index, worker) in self.workers.iter_mut().enumerate() {
            let Some(handle) = worker.handle.take() else {
                continue;
            };

            if handle.join().is_err() {
                event!(Level::ERROR, worker = index, "worker thread panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(index: usize, receiver: Receiver<Task>) {
    event!(Level::TRACE, worker = index, "worker started");

    for task in receiver.iter() {
        // A panicking task loses its result, the worker stays available
        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
            event!(Level::ERROR, worker = index, "task panicked");
        }
    }

    event!(Level::TRACE, worker = index, "worker stopped");
}

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("failed to spawn worker thread")]
    Spawn(#[source] io::Error),
    #[error("worker pool is shut down")]
    ShutDown,
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::{Arc, Barrier},
    };

    use super::*;

    #[test]
    fn invoke_all_returns_results_in_order() {
        let pool = WorkerPool::new(3).unwrap();

        let tasks: Vec<_> = (0..3).map(|i| move || i * 10).collect();
        let results = pool.invoke_all(tasks).unwrap();

        assert_eq!(results, vec![Some(0), Some(10), Some(20)]);
    }

    #[test]
    fn each_worker_runs_one_task_concurrently() {
        let pool = WorkerPool::new(4).unwrap();

        // Every task waits for all others, this only completes if they run in parallel
        let barrier = Arc::new(Barrier::new(4));
        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let barrier = barrier.clone();
                move || {
                    barrier.wait();
                    thread::current().name().map(str::to_owned)
                }
            })
            .collect();
        let results = pool.invoke_all(tasks).unwrap();

        let names: HashSet<_> = results.into_iter().flatten().flatten().collect();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn panicking_task_leaves_empty_slot() {
        let pool = WorkerPool::new(2).unwrap();

        let tasks: Vec<Box<dyn FnOnce() -> u32 + Send>> = vec![
            Box::new(|| 1u32),
            Box::new(|| -> u32 { panic!("task failure") }),
        ];
        let results = pool.invoke_all(tasks).unwrap();
        assert_eq!(results, vec![Some(1), None]);

        // The worker survived the panic
        let tasks: Vec<_> = (0..2).map(|i| move || i).collect();
        let results = pool.invoke_all(tasks).unwrap();
        assert_eq!(results, vec![Some(0), Some(1)]);
    }

    #[test]
    fn shut_down_pool_rejects_tasks() {
        let mut pool = WorkerPool::new(1).unwrap();
        pool.shutdown();

        assert!(pool.is_shut_down());
        let result = pool.invoke_all(vec![|| 1]);
        assert!(matches!(result, Err(PoolError::ShutDown)));
    }

    #[test]
    fn empty_batch_completes() {
        let pool = WorkerPool::new(1).unwrap();

        let tasks: Vec<fn() -> u32> = Vec::new();
        let results = pool.invoke_all(tasks).unwrap();
        assert!(results.is_empty());
    }
}
