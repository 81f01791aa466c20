//! CRUD for departments under `/departments`.
//!
//! Creating an existing department succeeds without change. Renames cascade to the
//! instructors that reference the department; deleting a referenced department is refused.

use super::error::ApiError;
use super::{message, with_connection, AppState};
use crate::db::departments;
use actix_web::web::{self, delete, get, post, put, scope};
use actix_web::{HttpResponse, Scope};
use serde::Deserialize;

const API_PATH: &str = "/departments";

#[derive(Deserialize)]
pub struct DepartmentBody {
    #[serde(default)]
    pub dept_name: String,
}

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list))
        .route("", post().to(create))
        .route("/{dept_name}", put().to(rename))
        .route("/{dept_name}", delete().to(remove))
}

async fn list(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let all = with_connection(&state, |conn| Ok(departments::list(conn)?)).await?;
    Ok(HttpResponse::Ok().json(all))
}

async fn create(
    state: web::Data<AppState>,
    body: web::Json<DepartmentBody>,
) -> Result<HttpResponse, ApiError> {
    let dept_name = body.into_inner().dept_name.trim().to_string();
    if dept_name.is_empty() {
        return Err(ApiError::BadRequest("Department name is required".into()));
    }
    with_connection(&state, move |conn| Ok(departments::insert(conn, &dept_name)?)).await?;
    Ok(message("Department added successfully"))
}

async fn rename(
    state: web::Data<AppState>,
    dept_name: web::Path<String>,
    body: web::Json<DepartmentBody>,
) -> Result<HttpResponse, ApiError> {
    let dept_name = dept_name.into_inner();
    let new_name = body.into_inner().dept_name.trim().to_string();
    if new_name.is_empty() {
        return Err(ApiError::BadRequest("New department name is required".into()));
    }
    let changed = with_connection(&state, move |conn| {
        Ok(departments::rename(conn, &dept_name, &new_name)?)
    })
    .await?;
    if changed == 0 {
        return Err(ApiError::NotFound("Department not found".into()));
    }
    Ok(message("Department updated successfully"))
}

async fn remove(
    state: web::Data<AppState>,
    dept_name: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let dept_name = dept_name.into_inner();
    let removed =
        with_connection(&state, move |conn| Ok(departments::delete(conn, &dept_name)?)).await?;
    if removed == 0 {
        return Err(ApiError::NotFound("Department not found".into()));
    }
    Ok(message("Department deleted successfully"))
}
