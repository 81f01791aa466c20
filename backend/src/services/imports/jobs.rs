use super::upload::read_upload;
use super::ImportRequest;
use crate::import::error::ImportError;
use crate::job_controller::state::{CancelOutcome, JobUpdate, JobsState};
use crate::services::error::ApiError;
use crate::services::{message, AppState};
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use common::jobs::JobStatus;
use common::model::import::EntityKind;
use common::requests::ImportQuery;
use serde_json::json;
use std::sync::Arc;

/// Starts a background import and returns its job ID at once.
pub(crate) async fn schedule(
    kind: web::Path<EntityKind>,
    query: web::Query<ImportQuery>,
    state: web::Data<AppState>,
    jobs: web::Data<JobsState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let upload = read_upload(payload, state.import.max_upload_bytes).await?;
    let request = ImportRequest::new(kind.into_inner(), &query, &state.import, upload);
    let (job_id, token) = jobs.register().await;

    let store = Arc::clone(&state.store);
    let tx = jobs.tx.clone();
    let id = job_id.clone();
    tokio::spawn(async move {
        let progress_tx = tx.clone();
        let progress_id = id.clone();
        let handle = tokio::task::spawn_blocking(move || {
            request.run(&*store, &token, move |written| {
                let written = u32::try_from(written).unwrap_or(u32::MAX);
                let _ = progress_tx
                    .blocking_send(JobUpdate::new(&progress_id, JobStatus::InProgress(written)));
            })
        });

        let status = match handle.await {
            Ok(Ok(result)) => JobStatus::Completed(result),
            Ok(Err(ImportError::Cancelled)) => JobStatus::Cancelled,
            Ok(Err(e)) => JobStatus::Failed(e.to_string()),
            Err(join_err) => JobStatus::Failed(format!("join error: {join_err}")),
        };
        if tx.send(JobUpdate::new(id.clone(), status)).await.is_err() {
            log::warn!("job updater is gone; final status of {id} lost");
        }
    });

    log::info!("scheduled import job {job_id}");
    Ok(HttpResponse::Accepted().json(json!({ "job_id": job_id })))
}

pub(crate) async fn status(
    job_id: web::Path<String>,
    jobs: web::Data<JobsState>,
) -> Result<HttpResponse, ApiError> {
    match jobs.status(&job_id).await {
        Some(status) => Ok(HttpResponse::Ok().json(status)),
        None => Err(ApiError::NotFound("Job ID not found".into())),
    }
}

pub(crate) async fn cancel(
    job_id: web::Path<String>,
    jobs: web::Data<JobsState>,
) -> Result<HttpResponse, ApiError> {
    match jobs.cancel(&job_id).await {
        CancelOutcome::Requested => Ok(message("Cancellation requested")),
        CancelOutcome::AlreadyFinished => {
            Err(ApiError::Conflict("Job has already finished".into()))
        }
        CancelOutcome::NotFound => Err(ApiError::NotFound("Job ID not found".into())),
    }
}

#[cfg(test)]
mod tests {
    use crate::db::departments;
    use crate::job_controller::state::{start_job_updater, JobsState};
    use crate::services::imports::configure_routes;
    use crate::services::imports::testing::upload_request;
    use crate::services::testing::app_state;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use serde_json::Value;
    use std::time::Duration;

    #[actix_web::test]
    async fn background_job_completes_and_reports_its_result() {
        let (_dir, state) = app_state();
        let store = state.store.clone();
        let (jobs, rx) = JobsState::new();
        tokio::spawn(start_job_updater(jobs.clone(), rx));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .app_data(web::Data::new(jobs))
                .service(configure_routes()),
        )
        .await;

        let req = upload_request(
            "/api/imports/departments/jobs",
            "departments.csv",
            b"dept_name\nCS\nMath\n",
        )
        .to_request();
        let response = test::call_service(&app, req).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body: Value = test::read_body_json(response).await;
        let job_id = body["job_id"].as_str().unwrap().to_string();

        let mut finished = None;
        for _ in 0..200 {
            let req = test::TestRequest::get()
                .uri(&format!("/api/imports/jobs/{job_id}"))
                .to_request();
            let status: Value = test::call_and_read_body_json(&app, req).await;
            if status.get("Completed").is_some() {
                finished = Some(status);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let finished = finished.expect("job should complete");
        assert_eq!(finished["Completed"]["accepted_count"], 2);
        assert_eq!(departments::list(&store.connection().unwrap()).unwrap().len(), 2);

        let req = test::TestRequest::post()
            .uri(&format!("/api/imports/jobs/{job_id}/cancel"))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CONFLICT
        );
    }

    #[actix_web::test]
    async fn unknown_job_is_not_found() {
        let (_dir, state) = app_state();
        let (jobs, _rx) = JobsState::new();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .app_data(web::Data::new(jobs))
                .service(configure_routes()),
        )
        .await;

        for req in [
            test::TestRequest::get().uri("/api/imports/jobs/nope"),
            test::TestRequest::post().uri("/api/imports/jobs/nope/cancel"),
        ] {
            assert_eq!(
                test::call_service(&app, req.to_request()).await.status(),
                StatusCode::NOT_FOUND
            );
        }
    }
}
