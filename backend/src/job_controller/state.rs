//! Tracks background import jobs and lets clients cancel them.
//!
//! A batch started through `POST /api/imports/{kind}/jobs` runs on the blocking pool, outside
//! the request that scheduled it (see `backend/src/services/imports/jobs.rs`). This module
//! keeps what clients need to follow such a batch after that request has returned.
//!
//! The main components are:
//! - `JobsState`: clonable handle injected into the Actix app data in `main.rs`. It holds the
//!   status of every job and the cancellation token of every job still running.
//! - `JobUpdate`: a status change sent by a worker over the MPSC channel.
//! - `start_job_updater`: long-running task that applies `JobUpdate`s to the shared map.
//!
//! Workers never write the maps directly; they only send updates, so a status can be read
//! at any time without waiting on the import itself.

use common::jobs::JobStatus;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

/// Capacity of the update channel. Workers block on a full channel rather than drop updates.
const UPDATE_BUFFER: usize = 100;

/// Shared state of all background import jobs.
///
/// Created once in `main.rs` and shared with every handler as `web::Data`. Cloning it is
/// cheap: every field is a handle to the same maps and channel.
#[derive(Clone)]
pub struct JobsState {
    /// Job ID to its latest status. Finished jobs stay here so clients can still poll them.
    ///
    /// Read by `GET /api/imports/jobs/{job_id}`; written only by [`start_job_updater`] and by
    /// [`JobsState::register`] when a job is created.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,

    /// Tokens of jobs that have not finished yet; removed by the updater on the final status.
    ///
    /// A job absent from this map but present in `jobs` has already committed, failed or
    /// rolled back, and can no longer be cancelled.
    pub cancellations: Arc<RwLock<HashMap<String, CancellationToken>>>,

    /// Sender side of the update channel.
    ///
    /// Each scheduled batch clones it to report progress from the blocking pool
    /// (`blocking_send`) and its final status from the async task that awaited it.
    pub tx: mpsc::Sender<JobUpdate>,
}

/// A status change for one job, sent through `JobsState.tx` and applied by
/// [`start_job_updater`].
#[derive(Debug)]
pub struct JobUpdate {
    /// The job being updated.
    pub(crate) job_id: String,
    /// Its new status. A final status (`Completed`, `Failed`, `Cancelled`) is never replaced.
    pub(crate) status: JobStatus,
}

impl JobUpdate {
    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
        }
    }
}

/// What [`JobsState::cancel`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The token was tripped. The job rolls back at its next check.
    Requested,
    /// The job exists but has already reached a final status.
    AlreadyFinished,
    NotFound,
}

impl JobsState {
    /// Creates the state and the receiver to hand to [`start_job_updater`].
    pub fn new() -> (Self, mpsc::Receiver<JobUpdate>) {
        let (tx, rx) = mpsc::channel(UPDATE_BUFFER);
        let state = Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            cancellations: Arc::new(RwLock::new(HashMap::new())),
            tx,
        };
        (state, rx)
    }

    /// Registers a new `Pending` job and returns its ID and cancellation token.
    pub async fn register(&self) -> (String, CancellationToken) {
        let job_id = uuid::Uuid::new_v4().to_string();
        let token = CancellationToken::new();
        self.jobs
            .write()
            .await
            .insert(job_id.clone(), JobStatus::Pending);
        self.cancellations
            .write()
            .await
            .insert(job_id.clone(), token.clone());
        (job_id, token)
    }

    /// Latest known status, or `None` for an unknown ID.
    pub async fn status(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.read().await.get(job_id).cloned()
    }

    /// Asks a running job to stop. The job reports `Cancelled` once it has rolled back.
    ///
    /// A batch that has already started its commit completes anyway and reports
    /// `Completed`; cancellation is only honoured before that point.
    pub async fn cancel(&self, job_id: &str) -> CancelOutcome {
        if let Some(token) = self.cancellations.read().await.get(job_id) {
            token.cancel();
            log::info!("cancellation requested for job {job_id}");
            return CancelOutcome::Requested;
        }
        if self.jobs.read().await.contains_key(job_id) {
            CancelOutcome::AlreadyFinished
        } else {
            CancelOutcome::NotFound
        }
    }
}

/// Applies updates until every sender is dropped.
///
/// Spawn it once as a long-running task (see `main.rs`). Each update takes the write lock on
/// `jobs`; a final status also drops the job's cancellation token.
///
/// Once a job reaches a final status later updates for it are ignored, so a stray progress
/// message can never overwrite a result.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = state.jobs.write().await;
        if jobs.get(&update.job_id).is_some_and(JobStatus::is_finished) {
            log::debug!("ignoring update for finished job {}", update.job_id);
            continue;
        }
        if update.status.is_finished() {
            state.cancellations.write().await.remove(&update.job_id);
        }
        jobs.insert(update.job_id, update.status);
    }
}
