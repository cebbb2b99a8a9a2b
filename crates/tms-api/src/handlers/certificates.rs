//! Certificate upload (staff) and approval (admin)

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::handlers::{MessageResponse, PageQuery};
use crate::services::UploadedFile;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use tms_core::{Certificate, CertificatePage};
use utoipa::ToSchema;

/// Multipart form accepted by the upload endpoint
#[allow(dead_code)]
#[derive(ToSchema)]
#[schema(rename_all = "camelCase")]
pub struct CertificateUploadForm {
    training_name: String,
    description: Option<String>,
    /// JPEG, PNG or PDF, at most 5 MiB
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/api/v1/staff/certificates",
    tag = "certificates",
    request_body(content = CertificateUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Certificate stored, pending approval", body = Certificate),
        (status = 400, description = "Missing field, bad file type or file too large", body = crate::error::ApiError),
    )
)]
pub async fn upload_certificate(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Certificate>), AppError> {
    let mut training_name = None;
    let mut description = None;
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("trainingName") => training_name = Some(field.text().await?),
            Some("description") => description = Some(field.text().await?),
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?;
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    let training_name = training_name
        .ok_or_else(|| AppError::BadRequest("Training name is required".to_string()))?;
    let file = file.ok_or_else(|| AppError::BadRequest("Certificate file is required".to_string()))?;

    let certificate = state
        .certificates
        .upload(user.user_id, training_name, description, file)
        .await?;
    Ok((StatusCode::CREATED, Json(certificate)))
}

#[utoipa::path(
    get,
    path = "/api/v1/staff/certificates",
    tag = "certificates",
    responses((status = 200, description = "The caller's certificates", body = [Certificate]))
)]
pub async fn list_own_certificates(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<Vec<Certificate>>, AppError> {
    Ok(Json(state.certificates.list_own(user.user_id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/staff/certificates/{id}",
    tag = "certificates",
    params(("id" = i64, Path, description = "Certificate ID")),
    responses(
        (status = 200, description = "Certificate deleted", body = MessageResponse),
        (status = 403, description = "Not the owner", body = crate::error::ApiError),
        (status = 404, description = "Not found", body = crate::error::ApiError),
    )
)]
pub async fn delete_own_certificate(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    state.certificates.delete_own(user.user_id, id).await?;
    Ok(Json(MessageResponse::new("Certificate deleted")))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/certificates",
    tag = "certificates",
    params(PageQuery),
    responses((status = 200, description = "Certificates awaiting review", body = CertificatePage))
)]
pub async fn list_pending_certificates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CertificatePage>, AppError> {
    Ok(Json(state.certificates.list_pending(query.to_request()).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/certificates/{id}/approve",
    tag = "certificates",
    params(("id" = i64, Path, description = "Certificate ID")),
    responses(
        (status = 200, description = "Certificate approved", body = Certificate),
        (status = 400, description = "Certificate is not pending", body = crate::error::ApiError),
        (status = 404, description = "Not found", body = crate::error::ApiError),
    )
)]
pub async fn approve_certificate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Certificate>, AppError> {
    Ok(Json(state.certificates.approve(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/admin/certificates/{id}/reject",
    tag = "certificates",
    params(("id" = i64, Path, description = "Certificate ID")),
    responses(
        (status = 200, description = "Certificate rejected and removed", body = MessageResponse),
        (status = 400, description = "Certificate is not pending", body = crate::error::ApiError),
        (status = 404, description = "Not found", body = crate::error::ApiError),
    )
)]
pub async fn reject_certificate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    state.certificates.reject(id).await?;
    Ok(Json(MessageResponse::new("Certificate rejected")))
}
