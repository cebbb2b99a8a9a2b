//! Courses and training plans
//!
//! Both kinds share these handlers; the router attaches the
//! [`ProgramKind`] of each mount point as a request extension.

use crate::error::AppError;
use crate::handlers::{MessageResponse, PageQuery};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use tms_core::{NewProgram, Program, ProgramKind, ProgramPage, ProgramPatch, ProgramType};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgramRequest {
    #[validate(length(min = 3, message = "must be at least 3 characters"))]
    pub name: String,
    pub speaker_institute: Option<String>,
    #[serde(rename = "type")]
    pub program_type: ProgramType,
    #[validate(length(min = 1, message = "is required"))]
    pub category: String,
    pub date: NaiveDate,
    pub content: Option<String>,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub number_of_days: i32,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub number_of_hours: Option<i32>,
    pub location: Option<String>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub total_cost: Option<i64>,
    pub budget_code: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "must not be negative"))]
    pub number_of_person: i32,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub cost_per_person: Option<i64>,
}

impl From<ProgramRequest> for NewProgram {
    fn from(r: ProgramRequest) -> Self {
        NewProgram {
            name: r.name.trim().to_string(),
            speaker_institute: r.speaker_institute,
            program_type: r.program_type,
            category: r.category.trim().to_string(),
            date: r.date,
            content: r.content,
            number_of_days: r.number_of_days,
            number_of_hours: r.number_of_hours,
            location: r.location,
            total_cost: r.total_cost,
            budget_code: r.budget_code,
            number_of_person: r.number_of_person,
            cost_per_person: r.cost_per_person,
        }
    }
}

/// Partial update; omitted fields keep their value
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgramPatchRequest {
    #[validate(length(min = 3, message = "must be at least 3 characters"))]
    pub name: Option<String>,
    pub speaker_institute: Option<String>,
    #[serde(rename = "type")]
    pub program_type: Option<ProgramType>,
    #[validate(length(min = 1, message = "is required"))]
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub content: Option<String>,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub number_of_days: Option<i32>,
    #[validate(range(min = 1, message = "must be at least 1"))]
    pub number_of_hours: Option<i32>,
    pub location: Option<String>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub total_cost: Option<i64>,
    pub budget_code: Option<String>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub number_of_person: Option<i32>,
    #[validate(range(min = 0, message = "must not be negative"))]
    pub cost_per_person: Option<i64>,
}

impl From<ProgramPatchRequest> for ProgramPatch {
    fn from(r: ProgramPatchRequest) -> Self {
        ProgramPatch {
            name: r.name,
            speaker_institute: r.speaker_institute,
            program_type: r.program_type,
            category: r.category,
            date: r.date,
            content: r.content,
            number_of_days: r.number_of_days,
            number_of_hours: r.number_of_hours,
            location: r.location,
            total_cost: r.total_cost,
            budget_code: r.budget_code,
            number_of_person: r.number_of_person,
            cost_per_person: r.cost_per_person,
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/{kind}",
    tag = "programs",
    params(("kind" = String, Path, description = "`courses` or `training-plans`")),
    request_body = ProgramRequest,
    responses(
        (status = 201, description = "Program created", body = Program),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
    )
)]
pub async fn create_program(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<ProgramKind>,
    Json(request): Json<ProgramRequest>,
) -> Result<(StatusCode, Json<Program>), AppError> {
    request.validate()?;
    let program = state.programs(kind).create(request.into()).await?;
    Ok((StatusCode::CREATED, Json(program)))
}

/// List programs; also mounted read-only for managers and staff
#[utoipa::path(
    get,
    path = "/api/v1/{group}/{kind}",
    tag = "programs",
    params(
        ("group" = String, Path, description = "`admin`, `manager` or `staff`"),
        ("kind" = String, Path, description = "`courses` or `training-plans`"),
        PageQuery
    ),
    responses(
        (status = 200, description = "One page of programs, newest date first", body = ProgramPage),
    )
)]
pub async fn list_programs(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<ProgramKind>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProgramPage>, AppError> {
    Ok(Json(state.programs(kind).list(query.to_request()).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/{group}/{kind}/{id}",
    tag = "programs",
    params(
        ("group" = String, Path, description = "`admin`, `manager` or `staff`"),
        ("kind" = String, Path, description = "`courses` or `training-plans`"),
        ("id" = i64, Path, description = "Program ID")
    ),
    responses(
        (status = 200, description = "Program", body = Program),
        (status = 404, description = "Not found", body = crate::error::ApiError),
    )
)]
pub async fn get_program(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<ProgramKind>,
    Path(id): Path<i64>,
) -> Result<Json<Program>, AppError> {
    Ok(Json(state.programs(kind).get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/{kind}/{id}",
    tag = "programs",
    params(
        ("kind" = String, Path, description = "`courses` or `training-plans`"),
        ("id" = i64, Path, description = "Program ID")
    ),
    request_body = ProgramPatchRequest,
    responses(
        (status = 200, description = "Program updated", body = Program),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 404, description = "Not found", body = crate::error::ApiError),
    )
)]
pub async fn update_program(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<ProgramKind>,
    Path(id): Path<i64>,
    Json(request): Json<ProgramPatchRequest>,
) -> Result<Json<Program>, AppError> {
    request.validate()?;
    Ok(Json(state.programs(kind).update(id, request.into()).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/{kind}/{id}",
    tag = "programs",
    params(
        ("kind" = String, Path, description = "`courses` or `training-plans`"),
        ("id" = i64, Path, description = "Program ID")
    ),
    responses(
        (status = 200, description = "Program deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = crate::error::ApiError),
    )
)]
pub async fn delete_program(
    State(state): State<Arc<AppState>>,
    Extension(kind): Extension<ProgramKind>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    state.programs(kind).delete(id).await?;
    Ok(Json(MessageResponse::new(format!(
        "{} deleted",
        kind.label()
    ))))
}
