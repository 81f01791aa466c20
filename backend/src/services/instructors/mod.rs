//! CRUD for instructors under `/instructor`.
//!
//! A create or update naming an unknown department is refused by the store's foreign key and
//! answered with `409 Conflict`.

use super::error::ApiError;
use super::{message, with_connection, AppState};
use crate::db::instructors;
use actix_web::web::{self, delete, get, post, put, scope};
use actix_web::{HttpResponse, Scope};
use common::model::instructor::Instructor;

const API_PATH: &str = "/instructor";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list))
        .route("", post().to(create))
        .route("/{id_number}", put().to(update))
        .route("/{id_number}", delete().to(remove))
}

async fn list(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let all = with_connection(&state, |conn| Ok(instructors::list(conn)?)).await?;
    Ok(HttpResponse::Ok().json(all))
}

async fn create(
    state: web::Data<AppState>,
    body: web::Json<Instructor>,
) -> Result<HttpResponse, ApiError> {
    let instructor = body.into_inner();
    if instructor.id_number.trim().is_empty() {
        return Err(ApiError::BadRequest("Instructor ID is required".into()));
    }
    with_connection(&state, move |conn| Ok(instructors::insert(conn, &instructor)?)).await?;
    Ok(message("Instructor added successfully"))
}

async fn update(
    state: web::Data<AppState>,
    id_number: web::Path<String>,
    body: web::Json<Instructor>,
) -> Result<HttpResponse, ApiError> {
    let id_number = id_number.into_inner();
    let instructor = body.into_inner();
    let changed = with_connection(&state, move |conn| {
        Ok(instructors::update(conn, &id_number, &instructor)?)
    })
    .await?;
    if changed == 0 {
        return Err(ApiError::NotFound("Instructor not found".into()));
    }
    Ok(message("Instructor updated successfully"))
}

async fn remove(
    state: web::Data<AppState>,
    id_number: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let id_number = id_number.into_inner();
    let removed =
        with_connection(&state, move |conn| Ok(instructors::delete(conn, &id_number)?)).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("Instructor not found".into()));
    }
    Ok(message("Instructor deleted successfully"))
}
