use tokio::task::JoinHandle;
use std::collections::HashMap;
use std::time::Duration;
use crate::error::{Error, Result};
use tracing::{info, error, warn};

/// Tracks the service's long-running background tasks.
///
/// ## Usage
/// ```rust,ignore
/// let mut supervisor = TaskSupervisor::new();
/// supervisor.spawn("scheduler", async move { scheduler.run(shutdown_rx).await });
///
/// // periodically while serving
/// supervisor.check_health()?;
///
/// // on shutdown, after signalling the tasks to stop
/// supervisor.shutdown(Duration::from_secs(30)).await;
/// ```
pub struct TaskSupervisor {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        TaskSupervisor {
            tasks: HashMap::new(),
        }
    }

    pub fn spawn<F>(&mut self, name: impl Into<String>, future: F) -> &mut Self
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let handle = tokio::spawn(future);

        info!("Spawned background task: {}", name);
        self.tasks.insert(name, handle);
        self
    }

    /// Errors if any task has already ended; ended tasks are forgotten.
    pub fn check_health(&mut self) -> Result<()> {
        let finished: Vec<String> = self.tasks.iter()
            .filter(|(_, handle)| handle.is_finished())
            .map(|(name, _)| name.clone())
            .collect();

        if finished.is_empty() {
            return Ok(());
        }

        for name in &finished {
            self.tasks.remove(name);
        }

        Err(Error::TaskFailed(format!("Tasks terminated unexpectedly: {:?}", finished)))
    }

    pub fn active_task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Waits up to `grace` for each task to finish on its own, then aborts it.
    pub async fn shutdown(&mut self, grace: Duration) {
        info!("Waiting for {} background tasks", self.tasks.len());

        for (name, mut handle) in self.tasks.drain() {
            match tokio::time::timeout(grace, &mut handle).await {
                Ok(Ok(())) => info!("Task {} finished", name),
                Ok(Err(e)) => error!("Task {} failed: {}", name, e),
                Err(_) => {
                    warn!("Task {} did not stop within {:?}; aborting", name, grace);
                    handle.abort();
                }
            }
        }
    }
}

impl Default for TaskSupervisor {
    fn default() -> Self {
        Self::new()
    }
}
