//! Interval scheduler
//!
//! Owns one background thread that runs a job once per interval, starting one
//! interval after `start`. `stop` wakes the thread and joins it; a job already
//! running finishes first. Nothing guards against a manual sync overlapping a
//! scheduled one.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SyncResult;

pub const DEFAULT_INTERVAL_MINS: u64 = 60;
pub const STATUS_FILE: &str = "scheduler.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub interval_secs: u64,
    pub next_sync: Option<DateTime<Utc>>,
}

pub struct Scheduler {
    interval: Duration,
    next_run: Arc<Mutex<Option<DateTime<Utc>>>>,
    status_file: Option<PathBuf>,
    worker: Option<(Sender<()>, JoinHandle<()>)>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_run: Arc::new(Mutex::new(None)),
            status_file: None,
            worker: None,
        }
    }

    /// Mirror status into `path` so another process can report it.
    pub fn with_status_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.status_file = Some(path.into());
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// A worker that exited on its own, e.g. after a panicking job, is not running.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|(_, handle)| !handle.is_finished())
    }

    /// Start the timer thread. Returns `false` if it is already running.
    pub fn start<F>(&mut self, mut job: F) -> bool
    where
        F: FnMut() + Send + 'static,
    {
        if self.is_running() {
            warn!("Scheduler is already running");
            return false;
        }
        if let Some((_, dead)) = self.worker.take() {
            if dead.join().is_err() {
                warn!("Previous scheduler thread panicked");
            }
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let interval = self.interval;
        let next_run = Arc::clone(&self.next_run);
        let status_file = self.status_file.clone();
        let interval_secs = interval.as_secs();

        set_next(&next_run, Some(next_after(interval)));

        let handle = thread::spawn(move || {
            let _exit = ExitGuard {
                next_run: Arc::clone(&next_run),
                status_file: status_file.clone(),
                interval_secs,
            };
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        debug!("Scheduled sync starting");
                        job();
                        let next = next_after(interval);
                        set_next(&next_run, Some(next));
                        if let Some(path) = &status_file {
                            persist(path, &SchedulerStatus {
                                running: true,
                                interval_secs,
                                next_sync: Some(next),
                            });
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        info!("Scheduler started, syncing every {}s", interval_secs);
        self.worker = Some((stop_tx, handle));
        self.write_status();
        true
    }

    /// Stop the timer thread. Returns `false` if it was not running.
    pub fn stop(&mut self) -> bool {
        let Some((stop_tx, handle)) = self.worker.take() else {
            return false;
        };
        // A send error means the thread already exited.
        let _ = stop_tx.send(());
        if handle.join().is_err() {
            warn!("Scheduler thread panicked");
        }
        set_next(&self.next_run, None);
        self.write_status();
        info!("Scheduler stopped");
        true
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.is_running(),
            interval_secs: self.interval.as_secs(),
            next_sync: self.next_run.lock().map(|g| *g).unwrap_or(None),
        }
    }

    fn write_status(&self) {
        if let Some(path) = &self.status_file {
            persist(path, &self.status());
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Marks the scheduler stopped when the worker exits, including by unwinding.
struct ExitGuard {
    next_run: Arc<Mutex<Option<DateTime<Utc>>>>,
    status_file: Option<PathBuf>,
    interval_secs: u64,
}

impl Drop for ExitGuard {
    fn drop(&mut self) {
        set_next(&self.next_run, None);
        if let Some(path) = &self.status_file {
            persist(path, &SchedulerStatus {
                running: false,
                interval_secs: self.interval_secs,
                next_sync: None,
            });
        }
    }
}

fn next_after(interval: Duration) -> DateTime<Utc> {
    let step = chrono::Duration::from_std(interval).unwrap_or_else(|_| chrono::Duration::zero());
    Utc::now() + step
}

fn set_next(slot: &Mutex<Option<DateTime<Utc>>>, value: Option<DateTime<Utc>>) {
    if let Ok(mut guard) = slot.lock() {
        *guard = value;
    }
}

fn persist(path: &Path, status: &SchedulerStatus) {
    let result = serde_json::to_string_pretty(status)
        .map_err(std::io::Error::other)
        .and_then(|json| {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, json)
        });
    if let Err(e) = result {
        warn!("Failed to write scheduler status to {}: {}", path.display(), e);
    }
}

/// Status left behind by a scheduler in another process, if any.
pub fn read_status_file(path: &Path) -> SyncResult<Option<SchedulerStatus>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}
