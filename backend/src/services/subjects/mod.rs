use super::error::ApiError;
use super::{message, with_connection, AppState};
use crate::db::subjects;
use actix_web::web::{self, delete, get, post, put, scope};
use actix_web::{HttpResponse, Scope};
use common::model::subject::Subject;

const API_PATH: &str = "/subjects";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list))
        .route("", post().to(create))
        .route("/{subject_name}", put().to(rename))
        .route("/{subject_name}", delete().to(remove))
}

async fn list(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let all = with_connection(&state, |conn| Ok(subjects::list(conn)?)).await?;
    Ok(HttpResponse::Ok().json(all))
}

async fn create(
    state: web::Data<AppState>,
    body: web::Json<Subject>,
) -> Result<HttpResponse, ApiError> {
    let subject_name = body.into_inner().subject_name.trim().to_string();
    if subject_name.is_empty() {
        return Err(ApiError::BadRequest("Subject name is required".into()));
    }
    with_connection(&state, move |conn| Ok(subjects::insert(conn, &subject_name)?)).await?;
    Ok(message("Subject added successfully"))
}

/// The new name must be non-empty and differ from the old one, and the old subject must exist.
async fn rename(
    state: web::Data<AppState>,
    subject_name: web::Path<String>,
    body: web::Json<Subject>,
) -> Result<HttpResponse, ApiError> {
    let subject_name = subject_name.into_inner();
    let new_name = body.into_inner().subject_name.trim().to_string();
    if new_name.is_empty() {
        return Err(ApiError::BadRequest("New subject name is required".into()));
    }
    if new_name == subject_name {
        return Err(ApiError::BadRequest(
            "New subject name must be different from the old one".into(),
        ));
    }

    with_connection(&state, move |conn| {
        if !subjects::exists(conn, &subject_name)? {
            return Err(ApiError::NotFound("Subject not found".into()));
        }
        if subjects::rename(conn, &subject_name, &new_name)? == 0 {
            return Err(ApiError::BadRequest(
                "No changes made. Subject name may be the same.".into(),
            ));
        }
        Ok(())
    })
    .await?;
    Ok(message("Subject updated successfully"))
}

async fn remove(
    state: web::Data<AppState>,
    subject_name: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let subject_name = subject_name.into_inner();
    let removed =
        with_connection(&state, move |conn| Ok(subjects::delete(conn, &subject_name)?)).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("Subject not found".into()));
    }
    Ok(message("Subject deleted successfully"))
}
