use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

enum Slot<T> {
    Pending,
    Running,
    Completed(T),
    Failed(String),
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs the export orchestrator in the background while an HTTP surface
/// (out of scope here) returns the task id immediately. Two modes: `inline`
/// runs the closure synchronously on the calling thread (debug); `thread`
/// dispatches to a fixed-size pool of workers owned by this instance via a
/// channel/queue, not a process-wide thread-pool singleton. Cancellation is
/// not supported — an export either completes or fails.
pub struct TaskRunner<T> {
    slots: Arc<Mutex<HashMap<String, Slot<T>>>>,
    sender: Option<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    inline: bool,
}

impl<T: Send + Clone + 'static> TaskRunner<T> {
    pub fn inline() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            sender: None,
            workers: Vec::new(),
            inline: true,
        }
    }

    /// A fixed-size worker pool of `workers` threads, each pulling from one
    /// shared job queue.
    pub fn thread_pool(workers: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|_| {
                let receiver = Arc::clone(&receiver);
                thread::spawn(move || loop {
                    let job = { receiver.lock().expect("task queue poisoned").recv() };
                    match job {
                        Ok(job) => job(),
                        Err(_) => break, // sender dropped: shut down
                    }
                })
            })
            .collect();

        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            sender: Some(sender),
            workers: handles,
            inline: false,
        }
    }

    /// Submit `f` for execution, returning its task id immediately (either
    /// the caller-supplied `task_id` or a generated UUID).
    pub fn submit(
        &self,
        f: impl FnOnce() -> Result<T, String> + Send + 'static,
        task_id: Option<String>,
    ) -> String {
        let id = task_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        self.slots.lock().unwrap().insert(id.clone(), Slot::Pending);

        let slots = Arc::clone(&self.slots);
        let job_id = id.clone();
        let job: Job = Box::new(move || {
            {
                let mut guard = slots.lock().unwrap();
                guard.insert(job_id.clone(), Slot::Running);
            }
            let outcome = f();
            let mut guard = slots.lock().unwrap();
            let slot = match outcome {
                Ok(value) => Slot::Completed(value),
                Err(err) => Slot::Failed(err),
            };
            guard.insert(job_id, slot);
        });

        if self.inline {
            job();
        } else {
            self.sender
                .as_ref()
                .expect("thread_pool runner always has a sender")
                .send(job)
                .expect("worker pool still running");
        }
        id
    }

    pub fn status(&self, task_id: &str) -> Option<TaskStatus> {
        self.slots.lock().unwrap().get(task_id).map(|slot| match slot {
            Slot::Pending => TaskStatus::Pending,
            Slot::Running => TaskStatus::Running,
            Slot::Completed(_) => TaskStatus::Completed,
            Slot::Failed(_) => TaskStatus::Failed,
        })
    }

    /// Block until `task_id` completes or fails, or `timeout` elapses.
    pub fn result(&self, task_id: &str, timeout: Option<Duration>) -> Result<T, String> {
        let deadline = timeout.map(|d| Instant::now() + d);
        loop {
            {
                let guard = self.slots.lock().unwrap();
                match guard.get(task_id) {
                    Some(Slot::Completed(value)) => return Ok(value.clone()),
                    Some(Slot::Failed(err)) => return Err(err.clone()),
                    Some(_) => {}
                    None => return Err(format!("unknown task '{task_id}'")),
                }
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(format!("timed out waiting for task '{task_id}'"));
            }
            thread::sleep(Duration::from_millis(5));
        }
    }
}

impl<T> Drop for TaskRunner<T> {
    fn drop(&mut self) {
        self.sender.take(); // close the channel so workers see Err(_) and exit
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_runner_completes_synchronously() {
        let runner: TaskRunner<i32> = TaskRunner::inline();
        let id = runner.submit(|| Ok(42), None);
        assert_eq!(runner.status(&id), Some(TaskStatus::Completed));
        assert_eq!(runner.result(&id, None), Ok(42));
    }

    #[test]
    fn thread_pool_runner_eventually_completes() {
        let runner: TaskRunner<i32> = TaskRunner::thread_pool(2);
        let id = runner.submit(
            || {
                thread::sleep(Duration::from_millis(10));
                Ok(7)
            },
            None,
        );
        assert_eq!(runner.result(&id, Some(Duration::from_secs(2))), Ok(7));
    }

    #[test]
    fn failed_task_surfaces_its_error() {
        let runner: TaskRunner<i32> = TaskRunner::inline();
        let id = runner.submit(|| Err("boom".to_string()), None);
        assert_eq!(runner.status(&id), Some(TaskStatus::Failed));
        assert_eq!(runner.result(&id, None), Err("boom".to_string()));
    }

    #[test]
    fn unknown_task_id_is_an_error() {
        let runner: TaskRunner<i32> = TaskRunner::inline();
        assert!(runner.result("nonexistent", Some(Duration::from_millis(10))).is_err());
    }
}
