//! User provisioning by administrators and department heads

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::handlers::{MessageResponse, PageQuery};
use crate::services::NewAccount;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tms_core::{Role, UserPage, UserProfile, UserStatus, UserUpdate};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[serde(rename = "employeeID")]
    #[validate(length(min = 1, message = "is required"))]
    pub employee_id: String,
    #[serde(default)]
    pub phone: String,
    #[validate(length(min = 1, message = "is required"))]
    pub position: String,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
    /// Ignored for managers, who always create in their own department
    #[serde(default)]
    pub department_id: i64,
    /// Admin only; managers always create Staff
    pub role: Option<Role>,
    /// Defaults to Active
    pub status: Option<UserStatus>,
}

impl CreateUserRequest {
    fn into_account(self) -> (NewAccount, Option<Role>) {
        let role = self.role;
        (
            NewAccount {
                name: self.name,
                email: self.email,
                employee_id: self.employee_id,
                phone: self.phone,
                position: self.position,
                password: self.password,
                department_id: self.department_id,
                status: self.status.unwrap_or_default(),
            },
            role,
        )
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserProfile),
        (status = 400, description = "Invalid input or duplicate account", body = crate::error::ApiError),
    )
)]
pub async fn admin_create_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedUser>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    request.validate()?;
    let (account, role) = request.into_account();
    let user = state
        .users
        .create_by_admin(account, role.unwrap_or(Role::Staff), admin.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Full replacement of the editable account fields
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 2, max = 52, message = "must be 2 to 52 characters"))]
    pub name: String,
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,
    #[serde(rename = "employeeID")]
    #[validate(length(min = 1, max = 52, message = "must be 1 to 52 characters"))]
    pub employee_id: String,
    #[serde(default)]
    #[validate(length(max = 20, message = "must be at most 20 characters"))]
    pub phone: String,
    #[validate(range(min = 1, message = "is required"))]
    pub department_id: i64,
    pub role: Role,
    #[validate(length(min = 1, max = 100, message = "must be 1 to 100 characters"))]
    pub position: String,
    pub status: UserStatus,
}

impl From<UpdateUserRequest> for UserUpdate {
    fn from(request: UpdateUserRequest) -> Self {
        UserUpdate {
            department_id: request.department_id,
            name: request.name,
            email: request.email,
            employee_id: request.employee_id,
            phone: request.phone,
            role: request.role,
            status: request.status,
            position: request.position,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User with department", body = UserProfile),
        (status = 404, description = "Not found", body = crate::error::ApiError),
    )
)]
pub async fn admin_get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.users.get(id).await?))
}

/// Deactivating an account or changing its role signs it out everywhere
#[utoipa::path(
    put,
    path = "/api/v1/admin/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UserProfile),
        (status = 400, description = "Invalid input or duplicate account", body = crate::error::ApiError),
        (status = 404, description = "Not found", body = crate::error::ApiError),
    )
)]
pub async fn admin_update_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserProfile>, AppError> {
    request.validate()?;
    Ok(Json(
        state
            .users
            .update_by_admin(id, request.into(), admin.user_id)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/{id}",
    tag = "users",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 404, description = "Not found", body = crate::error::ApiError),
    )
)]
pub async fn admin_delete_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    let certificates = state.certificates.list_own(id).await?;
    state.users.delete_by_admin(id, admin.user_id).await?;
    state.certificates.discard_files(&certificates).await;
    Ok(Json(MessageResponse::new("User deleted")))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "users",
    params(PageQuery),
    responses((status = 200, description = "One page of users", body = UserPage))
)]
pub async fn admin_list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserPage>, AppError> {
    Ok(Json(state.users.list(query.to_request()).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/manager/users",
    tag = "users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Staff member created in the manager's department", body = UserProfile),
        (status = 400, description = "Invalid input or duplicate account", body = crate::error::ApiError),
    )
)]
pub async fn manager_create_user(
    State(state): State<Arc<AppState>>,
    Extension(manager): Extension<AuthenticatedUser>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    request.validate()?;
    let (account, _) = request.into_account();
    let user = state
        .users
        .create_by_manager(account, manager.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[utoipa::path(
    get,
    path = "/api/v1/manager/users",
    tag = "users",
    params(PageQuery),
    responses((status = 200, description = "Users of the manager's department", body = UserPage))
)]
pub async fn manager_list_users(
    State(state): State<Arc<AppState>>,
    Extension(manager): Extension<AuthenticatedUser>,
    Query(query): Query<PageQuery>,
) -> Result<Json<UserPage>, AppError> {
    Ok(Json(
        state
            .users
            .list_for_manager(manager.user_id, query.to_request())
            .await?,
    ))
}
