use super::{ImportRequest, Upload};
use crate::import::error::ImportError;
use crate::services::error::ApiError;
use crate::services::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use common::model::import::EntityKind;
use common::requests::ImportQuery;
use futures_util::StreamExt;
use log::warn;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub(crate) async fn process(
    kind: web::Path<EntityKind>,
    query: web::Query<ImportQuery>,
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    import_now(kind.into_inner(), query.into_inner(), state, payload).await
}

pub(crate) async fn legacy_instructors(
    query: web::Query<ImportQuery>,
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    import_now(EntityKind::Instructor, query.into_inner(), state, payload).await
}

pub(crate) async fn legacy_departments(
    query: web::Query<ImportQuery>,
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    import_now(EntityKind::Department, query.into_inner(), state, payload).await
}

pub(crate) async fn legacy_subjects(
    query: web::Query<ImportQuery>,
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    import_now(EntityKind::Subject, query.into_inner(), state, payload).await
}

/// Runs one batch on the blocking pool and answers with its `BatchResult`.
async fn import_now(
    kind: EntityKind,
    query: ImportQuery,
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let upload = read_upload(payload, state.import.max_upload_bytes).await?;
    let request = ImportRequest::new(kind, &query, &state.import, upload);
    let store = Arc::clone(&state.store);
    let timeout = Duration::from_secs(state.import.timeout_secs);

    let result = run_with_deadline(timeout, move |token| request.run(&*store, token, |_| {}))
        .await
        .inspect_err(|e| {
            if matches!(e, ApiError::Import(ImportError::Cancelled)) {
                warn!("import of {kind} was cancelled after {timeout:?}");
            }
        })?;
    Ok(HttpResponse::Ok().json(result))
}

/// Runs `work` on the blocking pool with a fresh cancellation token.
///
/// If the caller goes away the future is dropped, and the drop guard cancels the token. On
/// timeout the token is cancelled and the work is still awaited, so the outcome always
/// reflects whether it committed.
pub(crate) async fn run_with_deadline<T, F>(timeout: Duration, work: F) -> Result<T, ApiError>
where
    F: FnOnce(&CancellationToken) -> Result<T, ImportError> + Send + 'static,
    T: Send + 'static,
{
    let token = CancellationToken::new();
    let _cancel_on_drop = token.clone().drop_guard();
    let worker_token = token.clone();
    let mut handle = tokio::task::spawn_blocking(move || work(&worker_token));

    let joined = match tokio::time::timeout(timeout, &mut handle).await {
        Ok(joined) => joined,
        Err(_) => {
            token.cancel();
            handle.await
        }
    };
    Ok(joined.map_err(|e| ApiError::Blocking(e.to_string()))??)
}

/// Reads the `file` field of a multipart upload into memory. Other fields are skipped.
pub(crate) async fn read_upload(mut payload: Multipart, limit: usize) -> Result<Upload, ApiError> {
    let mut upload: Option<Upload> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| ApiError::BadRequest(e.to_string()))?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        if name.as_deref() != Some("file") {
            while let Some(chunk) = field.next().await {
                chunk.map_err(|e| ApiError::BadRequest(e.to_string()))?;
            }
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
            .unwrap_or_default();
        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| ApiError::BadRequest(e.to_string()))?;
            if bytes.len() + chunk.len() > limit {
                return Err(ApiError::TooLarge(limit));
            }
            bytes.extend_from_slice(&chunk);
        }
        upload = Some(Upload { filename, bytes });
    }

    upload.ok_or_else(|| ApiError::BadRequest("Missing file".into()))
}

#[cfg(test)]
mod tests {
    use crate::db::{departments, instructors};
    use crate::import::fixtures::workbook;
    use crate::services::imports::testing::upload_request;
    use crate::services::imports::{configure_legacy_routes, configure_routes};
    use crate::services::testing::app_state;
    use super::run_with_deadline;
    use crate::import::error::ImportError;
    use crate::services::error::ApiError;
    use crate::services::AppState;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App, ResponseError};
    use serde_json::Value;
    use std::time::Duration;
    use tokio::sync::oneshot;
    use tokio_util::sync::CancellationToken;

    macro_rules! init_app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .service(configure_routes())
                    .configure(configure_legacy_routes),
            )
            .await
        };
    }

    fn seed_department(state: &AppState, name: &str) {
        departments::insert(&state.store.connection().unwrap(), name).unwrap();
    }

    #[actix_web::test]
    async fn csv_departments_import_reports_counts() {
        let (_dir, state) = app_state();
        let app = init_app!(state);

        let req = upload_request(
            "/api/imports/departments",
            "departments.csv",
            b"DEPT_NAME\nCS\nMath\n CS \n\n",
        )
        .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["accepted_count"], 2);
        assert_eq!(body["dropped_duplicates"], 1);
        assert_eq!(body["mode"], "upsert");
    }

    #[actix_web::test]
    async fn strict_instructor_import_with_unknown_department_is_rejected() {
        let (_dir, state) = app_state();
        seed_department(&state, "CS");
        let store = state.store.clone();
        let app = init_app!(state);
        let payload = workbook(&[
            &["id_number", "instructor_name", "dept"],
            &["1", "A", "CS"],
            &["2", "C", "NOPE"],
        ]);

        let req = upload_request("/api/imports/instructors?mode=strict", "staff.xlsx", &payload)
            .to_request();
        let response = test::call_service(&app, req).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["error"], "referential_integrity_error");
        assert_eq!(body["missing_references"], serde_json::json!(["NOPE"]));
        assert!(instructors::list(&store.connection().unwrap())
            .unwrap()
            .is_empty());
    }

    #[actix_web::test]
    async fn legacy_upload_path_imports_instructors_in_default_mode() {
        let (_dir, state) = app_state();
        seed_department(&state, "CS");
        let app = init_app!(state);
        let payload = workbook(&[
            &["ID_NUMBER", "NAME", "DEPT"],
            &["1", "A", "CS"],
            &["2", "C", "NOPE"],
        ]);

        let req = upload_request("/upload", "staff.xlsx", &payload).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["kind"], "instructors");
        assert_eq!(body["accepted_count"], 1);
        assert_eq!(body["rejected_keys"], serde_json::json!(["NOPE"]));
    }

    #[actix_web::test]
    async fn missing_columns_are_a_bad_request() {
        let (_dir, state) = app_state();
        let app = init_app!(state);

        let req = upload_request("/upload_subjects", "subjects.csv", b"title\nAlgebra\n").to_request();
        let response = test::call_service(&app, req).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["missing_columns"], serde_json::json!(["subject_name"]));
        assert_eq!(body["found_columns"], serde_json::json!(["title"]));
    }

    #[actix_web::test]
    async fn oversized_upload_is_refused() {
        let (_dir, mut state) = app_state();
        state.import.max_upload_bytes = 8;
        let app = init_app!(state);

        let req = upload_request(
            "/api/imports/subjects",
            "subjects.csv",
            b"subject_name\nAlgebra\n",
        )
        .to_request();

        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[actix_web::test]
    async fn unknown_kind_is_not_routed() {
        let (_dir, state) = app_state();
        let app = init_app!(state);

        let req = upload_request("/api/imports/rooms", "rooms.csv", b"room\nA1\n").to_request();

        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }

    /// Blocks until its token is cancelled, like a batch on a stalled store.
    fn stalled_batch(
        seen: oneshot::Sender<()>,
    ) -> impl FnOnce(&CancellationToken) -> Result<(), ImportError> + Send + 'static {
        move |token: &CancellationToken| {
            while !token.is_cancelled() {
                std::thread::sleep(Duration::from_millis(1));
            }
            let _ = seen.send(());
            Err(ImportError::Cancelled)
        }
    }

    #[actix_web::test]
    async fn overdue_batch_is_cancelled_and_answers_conflict() {
        let (seen_tx, seen_rx) = oneshot::channel();

        let err = run_with_deadline(Duration::from_millis(20), stalled_batch(seen_tx))
            .await
            .unwrap_err();

        assert!(
            matches!(err, ApiError::Import(ImportError::Cancelled)),
            "got {err:?}"
        );
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(seen_rx.await.is_ok(), "worker should observe the cancellation");
    }

    #[actix_web::test]
    async fn dropped_request_cancels_its_batch() {
        let (seen_tx, seen_rx) = oneshot::channel();

        let request = actix_web::rt::spawn(run_with_deadline(
            Duration::from_secs(60),
            stalled_batch(seen_tx),
        ));
        tokio::time::sleep(Duration::from_millis(20)).await;
        request.abort();

        let seen = tokio::time::timeout(Duration::from_secs(5), seen_rx).await;
        assert!(
            matches!(seen, Ok(Ok(()))),
            "worker should stop once the request is gone"
        );
    }

    #[actix_web::test]
    async fn zero_timeout_never_loses_a_finished_batch() {
        let (_dir, mut state) = app_state();
        state.import.timeout_secs = 0;
        let store = state.store.clone();
        let app = init_app!(state);

        let req = upload_request("/upload_departments", "departments.csv", b"dept_name\nCS\n")
            .to_request();
        let response = test::call_service(&app, req).await;
        let stored = departments::list(&store.connection().unwrap()).unwrap();

        match response.status() {
            StatusCode::OK => assert_eq!(stored.len(), 1),
            StatusCode::CONFLICT => assert!(stored.is_empty()),
            other => panic!("unexpected status {other}"),
        }
    }
}
