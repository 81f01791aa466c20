//! HTTP surface. Each sub-module exposes `configure_routes()` returning its Actix `Scope`.
//!
//! - `imports`: spreadsheet uploads, synchronous or as background jobs, plus the legacy
//!   `/upload*` paths.
//! - `instructors`, `departments`, `subjects`, `availability`: plain CRUD over the
//!   reference-data tables.

pub mod availability;
pub mod departments;
pub mod error;
pub mod imports;
pub mod instructors;
pub mod subjects;

use crate::config::ImportConfig;
use crate::db::SqliteStore;
use actix_web::{web, HttpResponse, Responder};
use error::ApiError;
use rusqlite::Connection;
use serde_json::json;
use std::sync::Arc;

/// Shared by all handlers through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub import: ImportConfig,
}

/// Runs `f` on a fresh connection on the blocking thread pool.
pub(crate) async fn with_connection<T, F>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Connection) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.store);
    web::block(move || {
        let conn = store.connection()?;
        f(&conn)
    })
    .await?
}

pub(crate) fn message(text: &str) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": text }))
}

pub async fn home() -> impl Responder {
    message("Welcome to the Timetable API")
}


#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};
    use serde_json::Value;

    #[actix_web::test]
    async fn home_greets() {
        let app = test::init_service(App::new().route("/", web::get().to(home))).await;

        let req = test::TestRequest::get().uri("/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["message"], "Welcome to the Timetable API");
    }
}
