// ABOUTME: Fixed-interval background health polling over every registered project
// ABOUTME: Explicit start/stop lifecycle with a cancellation token and join handle

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::health::{HealthMonitor, HealthStatus};
use crate::projects::ProjectStorage;

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PollerError {
    #[error("Health poller is already running")]
    AlreadyRunning,
    #[error("Health poller did not stop within {0:?}")]
    StopTimeout(Duration),
}

pub struct HealthPoller {
    monitor: Arc<HealthMonitor>,
    projects: Arc<ProjectStorage>,
    interval: Duration,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl HealthPoller {
    pub fn new(monitor: Arc<HealthMonitor>, projects: Arc<ProjectStorage>, interval: Duration) -> Self {
        Self {
            monitor,
            projects,
            interval,
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    pub fn start(&mut self) -> Result<(), PollerError> {
        if self.task_handle.is_some() {
            return Err(PollerError::AlreadyRunning);
        }

        // A stopped poller's token stays cancelled; each run gets its own
        self.cancellation = CancellationToken::new();
        let monitor = self.monitor.clone();
        let projects = self.projects.clone();
        let cancel = self.cancellation.clone();
        let interval = self.interval;

        info!(interval_secs = interval.as_secs(), "Starting health poller");
        self.task_handle = Some(tokio::spawn(async move {
            poll_worker(monitor, projects, interval, cancel).await;
        }));
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), PollerError> {
        let Some(handle) = self.task_handle.take() else {
            return Ok(());
        };
        self.cancellation.cancel();

        match tokio::time::timeout(STOP_TIMEOUT, handle).await {
            Ok(Ok(())) => {
                info!("Health poller stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!("Health poller task ended abnormally: {}", e);
                Ok(())
            }
            Err(_) => Err(PollerError::StopTimeout(STOP_TIMEOUT)),
        }
    }
}

impl Drop for HealthPoller {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

async fn poll_worker(
    monitor: Arc<HealthMonitor>,
    projects: Arc<ProjectStorage>,
    interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {
                poll_once(&monitor, &projects, &cancel).await;
            }
        }
    }
}

/// Check every project once, sequentially. Returns how many were active.
pub async fn poll_once(
    monitor: &HealthMonitor,
    projects: &ProjectStorage,
    cancel: &CancellationToken,
) -> usize {
    let list = match projects.list_projects().await {
        Ok(list) => list,
        Err(e) => {
            warn!("Health poll skipped, could not list projects: {}", e);
            return 0;
        }
    };

    let mut active = 0;
    for project in &list {
        if cancel.is_cancelled() {
            break;
        }
        let result = monitor.check_and_record(project, cancel).await;
        if result.status == HealthStatus::Active {
            active += 1;
        }
    }

    debug!(total = list.len(), active, "Health poll finished");
    active
}
