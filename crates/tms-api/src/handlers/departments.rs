//! Department administration (admin only)

use crate::error::AppError;
use crate::handlers::{MessageResponse, PageQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tms_core::{Department, DepartmentPage, NewDepartment};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DepartmentRequest {
    #[validate(length(min = 2, message = "must be at least 2 characters"))]
    pub name: String,
    #[validate(length(min = 1, message = "is required"))]
    pub division: String,
}

impl From<DepartmentRequest> for NewDepartment {
    fn from(request: DepartmentRequest) -> Self {
        NewDepartment {
            name: request.name.trim().to_string(),
            division: request.division.trim().to_string(),
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/departments",
    tag = "departments",
    request_body = DepartmentRequest,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
    )
)]
pub async fn create_department(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DepartmentRequest>,
) -> Result<(StatusCode, Json<Department>), AppError> {
    request.validate()?;
    let department = state.departments.create(request.into()).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/departments",
    tag = "departments",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of departments", body = DepartmentPage),
    )
)]
pub async fn list_departments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<DepartmentPage>, AppError> {
    Ok(Json(state.departments.list(query.to_request()).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/departments/{id}",
    tag = "departments",
    params(("id" = i64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department", body = Department),
        (status = 404, description = "Not found", body = crate::error::ApiError),
    )
)]
pub async fn get_department(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Department>, AppError> {
    Ok(Json(state.departments.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/departments/{id}",
    tag = "departments",
    params(("id" = i64, Path, description = "Department ID")),
    request_body = DepartmentRequest,
    responses(
        (status = 200, description = "Department updated", body = Department),
        (status = 404, description = "Not found", body = crate::error::ApiError),
    )
)]
pub async fn update_department(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(request): Json<DepartmentRequest>,
) -> Result<Json<Department>, AppError> {
    request.validate()?;
    Ok(Json(state.departments.update(id, request.into()).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/departments/{id}",
    tag = "departments",
    params(("id" = i64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Department deleted", body = MessageResponse),
        (status = 400, description = "Department still has staff", body = crate::error::ApiError),
        (status = 404, description = "Not found", body = crate::error::ApiError),
    )
)]
pub async fn delete_department(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    state.departments.delete(id).await?;
    Ok(Json(MessageResponse::new("Department deleted")))
}
