//! Instructor availability under `/availability`, keyed by instructor name and start date.

use super::error::ApiError;
use super::{message, with_connection, AppState};
use crate::db::availability;
use actix_web::web::{self, delete, get, post, put, scope};
use actix_web::{HttpResponse, Scope};
use chrono::NaiveDate;
use common::model::availability::Availability;
use common::requests::AvailabilityStatusUpdate;

const API_PATH: &str = "/availability";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(create))
        .route("/{instructor_name}", get().to(list))
        .route("/{instructor_name}/{start_date}", put().to(update))
        .route("/{instructor_name}/{start_date}", delete().to(remove))
}

async fn list(
    state: web::Data<AppState>,
    instructor_name: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let instructor_name = instructor_name.into_inner();
    let entries = with_connection(&state, move |conn| {
        Ok(availability::list_for(conn, &instructor_name)?)
    })
    .await?;
    Ok(HttpResponse::Ok().json(entries))
}

async fn create(
    state: web::Data<AppState>,
    body: web::Json<Availability>,
) -> Result<HttpResponse, ApiError> {
    let entry = body.into_inner();
    with_connection(&state, move |conn| Ok(availability::insert(conn, &entry)?)).await?;
    Ok(message("Availability added successfully"))
}

async fn update(
    state: web::Data<AppState>,
    path: web::Path<(String, NaiveDate)>,
    body: web::Json<AvailabilityStatusUpdate>,
) -> Result<HttpResponse, ApiError> {
    let (instructor_name, start_date) = path.into_inner();
    let status = body.into_inner().status;
    let changed = with_connection(&state, move |conn| {
        Ok(availability::update_status(
            conn,
            &instructor_name,
            start_date,
            &status,
        )?)
    })
    .await?;
    if changed == 0 {
        return Err(ApiError::NotFound("Availability not found".into()));
    }
    Ok(message("Availability updated successfully"))
}

async fn remove(
    state: web::Data<AppState>,
    path: web::Path<(String, NaiveDate)>,
) -> Result<HttpResponse, ApiError> {
    let (instructor_name, start_date) = path.into_inner();
    let removed = with_connection(&state, move |conn| {
        Ok(availability::delete(conn, &instructor_name, start_date)?)
    })
    .await?;
    if removed == 0 {
        return Err(ApiError::NotFound("Availability not found".into()));
    }
    Ok(message("Availability deleted successfully"))
}
