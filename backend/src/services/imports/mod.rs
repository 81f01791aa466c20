//! Spreadsheet import endpoints.
//!
//! - `POST /api/imports/{kind}?mode=strict|upsert`: multipart upload with a `file` field. The
//!   batch runs to completion before the response, which carries the `BatchResult`. A batch
//!   still running after `import.timeout_secs` is cancelled and rolled back.
//! - `POST /api/imports/{kind}/jobs?mode=...`: same upload, but the batch runs in the
//!   background; the response is `{ "job_id": ... }`.
//! - `GET /api/imports/jobs/{job_id}`: current `JobStatus` of a background batch.
//! - `POST /api/imports/jobs/{job_id}/cancel`: asks a running batch to roll back.
//!
//! `{kind}` is `instructors`, `departments` or `subjects`. `mode` falls back to
//! `import.default_mode` when omitted. The legacy `/upload`, `/upload_departments` and
//! `/upload_subjects` paths are registered at the root by [`configure_legacy_routes`].

mod jobs;
mod upload;

use crate::config::ImportConfig;
use crate::import::decoder::{ColumnCasing, SheetFormat};
use crate::import::error::ImportError;
use crate::import::store::Store;
use crate::import::ImportPipeline;
use actix_web::web::{get, post, scope, ServiceConfig};
use actix_web::Scope;
use common::model::import::{BatchResult, EntityKind, WriteMode};
use common::requests::ImportQuery;
use tokio_util::sync::CancellationToken;

const API_PATH: &str = "/api/imports";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/jobs/{job_id}", get().to(jobs::status))
        .route("/jobs/{job_id}/cancel", post().to(jobs::cancel))
        .route("/{kind}", post().to(upload::process))
        .route("/{kind}/jobs", post().to(jobs::schedule))
}

pub fn configure_legacy_routes(cfg: &mut ServiceConfig) {
    cfg.route("/upload", post().to(upload::legacy_instructors))
        .route("/upload_departments", post().to(upload::legacy_departments))
        .route("/upload_subjects", post().to(upload::legacy_subjects));
}

/// An uploaded file held in memory.
#[derive(Debug)]
pub(crate) struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Everything a worker thread needs to run one batch.
pub(crate) struct ImportRequest {
    kind: EntityKind,
    mode: WriteMode,
    casing: ColumnCasing,
    format: SheetFormat,
    bytes: Vec<u8>,
}

impl ImportRequest {
    pub fn new(
        kind: EntityKind,
        query: &ImportQuery,
        settings: &ImportConfig,
        upload: Upload,
    ) -> Self {
        Self {
            kind,
            mode: query.mode.unwrap_or(settings.default_mode),
            casing: settings.column_casing,
            format: SheetFormat::from_filename(&upload.filename),
            bytes: upload.bytes,
        }
    }

    /// Blocking; run it on `spawn_blocking`.
    pub fn run(
        &self,
        store: &dyn Store,
        token: &CancellationToken,
        progress: impl Fn(usize) + Send + 'static,
    ) -> Result<BatchResult, ImportError> {
        ImportPipeline::new(store, self.kind, self.mode)
            .with_casing(self.casing)
            .on_progress(progress)
            .run(&self.bytes, self.format, token)
    }
}
