//! Certificate upload and approval workflow
//!
//! The blob is written before the row and removed again if the insert
//! fails. On deletion the row goes first; a blob that cannot be removed
//! afterwards is only logged.

use std::sync::Arc;
use tms_core::{
    Certificate, CertificateRepository, CertificateStatus, NewCertificate, PageRequest, Paginated,
    Storage,
};

use crate::error::AppError;

/// Largest accepted upload (5 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// A file received from a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// File extension for an accepted content type
fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "application/pdf" => Some("pdf"),
        _ => None,
    }
}

#[derive(Clone)]
pub struct CertificateService {
    repo: Arc<dyn CertificateRepository>,
    storage: Arc<dyn Storage>,
    max_upload_bytes: usize,
}

impl CertificateService {
    pub fn new(
        repo: Arc<dyn CertificateRepository>,
        storage: Arc<dyn Storage>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            repo,
            storage,
            max_upload_bytes,
        }
    }

    pub async fn upload(
        &self,
        user_id: i64,
        training_name: String,
        description: Option<String>,
        file: UploadedFile,
    ) -> Result<Certificate, AppError> {
        if training_name.trim().is_empty() {
            return Err(AppError::BadRequest("Training name is required".to_string()));
        }
        let extension = extension_for(&file.content_type).ok_or_else(|| {
            AppError::BadRequest("Only JPEG, PNG or PDF files are allowed".to_string())
        })?;
        if file.bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }
        if file.bytes.len() > self.max_upload_bytes {
            return Err(AppError::BadRequest(format!(
                "File exceeds the {} byte limit",
                self.max_upload_bytes
            )));
        }

        let path = format!(
            "certificates/user_{user_id}/{}-{}.{extension}",
            chrono::Utc::now().timestamp(),
            uuid::Uuid::new_v4()
        );
        let locator = self
            .storage
            .put(&path, &file.bytes, &file.content_type)
            .await?;

        let inserted = self
            .repo
            .create(NewCertificate {
                user_id,
                training_name: training_name.trim().to_string(),
                image: locator.clone(),
                description: description.filter(|d| !d.trim().is_empty()),
            })
            .await;

        match inserted {
            Ok(certificate) => {
                tracing::info!(
                    certificate_id = certificate.id,
                    user_id,
                    original_name = ?file.file_name,
                    "Certificate uploaded"
                );
                Ok(certificate)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&locator).await {
                    tracing::warn!(locator = %locator, error = %cleanup, "Failed to remove orphaned upload");
                }
                Err(e.into())
            }
        }
    }

    pub async fn list_own(&self, user_id: i64) -> Result<Vec<Certificate>, AppError> {
        Ok(self.repo.list_by_user(user_id).await?)
    }

    pub async fn delete_own(&self, user_id: i64, id: i64) -> Result<(), AppError> {
        let certificate = self.find(id).await?;
        if certificate.user_id != user_id {
            return Err(AppError::Forbidden(
                "You can only delete your own certificates".to_string(),
            ));
        }
        self.remove(certificate).await
    }

    pub async fn list_pending(
        &self,
        page: PageRequest,
    ) -> Result<Paginated<Certificate>, AppError> {
        let (items, total) = self.repo.list_pending(page).await?;
        Ok(Paginated::new(items, total, page))
    }

    pub async fn approve(&self, id: i64) -> Result<Certificate, AppError> {
        let mut certificate = self.pending(id).await?;
        if !self
            .repo
            .update_status(id, CertificateStatus::Approved)
            .await?
        {
            return Err(AppError::NotFound("Certificate not found".to_string()));
        }
        certificate.status = CertificateStatus::Approved;
        tracing::info!(certificate_id = id, "Certificate approved");
        Ok(certificate)
    }

    /// Rejection discards the row and its file
    pub async fn reject(&self, id: i64) -> Result<(), AppError> {
        let certificate = self.pending(id).await?;
        self.remove(certificate).await?;
        tracing::info!(certificate_id = id, "Certificate rejected");
        Ok(())
    }

    /// Remove the files of certificates whose rows are already gone
    pub async fn discard_files(&self, certificates: &[Certificate]) {
        for certificate in certificates {
            if let Err(e) = self.storage.delete(&certificate.image).await {
                tracing::warn!(locator = %certificate.image, error = %e, "Failed to delete certificate file");
            }
        }
    }

    async fn find(&self, id: i64) -> Result<Certificate, AppError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Certificate not found".to_string()))
    }

    async fn pending(&self, id: i64) -> Result<Certificate, AppError> {
        let certificate = self.find(id).await?;
        if certificate.status != CertificateStatus::Pending {
            return Err(AppError::BadRequest(
                "certificate is not pending".to_string(),
            ));
        }
        Ok(certificate)
    }

    async fn remove(&self, certificate: Certificate) -> Result<(), AppError> {
        if !self.repo.delete(certificate.id).await? {
            return Err(AppError::NotFound("Certificate not found".to_string()));
        }
        if let Err(e) = self.storage.delete(&certificate.image).await {
            tracing::warn!(locator = %certificate.image, error = %e, "Failed to delete certificate file");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tms_core::{LocalStorage, MemoryStore};

    fn setup(dir: &tempfile::TempDir) -> (Arc<MemoryStore>, CertificateService) {
        let store = Arc::new(MemoryStore::new());
        let storage = Arc::new(LocalStorage::new(dir.path()));
        let service = CertificateService::new(store.clone(), storage, DEFAULT_MAX_UPLOAD_BYTES);
        (store, service)
    }

    fn png() -> UploadedFile {
        UploadedFile {
            file_name: Some("cert.png".to_string()),
            content_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    fn stored_files(dir: &tempfile::TempDir, user_id: i64) -> usize {
        std::fs::read_dir(dir.path().join(format!("certificates/user_{user_id}")))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_upload_stores_file_and_row() {
        let dir = tempfile::tempdir().unwrap();
        let (_store, service) = setup(&dir);

        let cert = service
            .upload(7, "First Aid".to_string(), None, png())
            .await
            .unwrap();

        assert_eq!(cert.status, CertificateStatus::Pending);
        assert!(cert.image.contains("certificates/user_7/"));
        assert!(cert.image.ends_with(".png"));
        assert_eq!(stored_files(&dir, 7), 1);
    }

    #[tokio::test]
    async fn test_upload_rejects_type_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let (_store, service) = setup(&dir);

        let mut gif = png();
        gif.content_type = "image/gif".to_string();
        assert!(matches!(
            service.upload(7, "First Aid".to_string(), None, gif).await,
            Err(AppError::BadRequest(_))
        ));

        let mut big = png();
        big.bytes = vec![0; DEFAULT_MAX_UPLOAD_BYTES + 1];
        assert!(matches!(
            service.upload(7, "First Aid".to_string(), None, big).await,
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(stored_files(&dir, 7), 0);
    }

    #[tokio::test]
    async fn test_failed_insert_removes_blob() {
        let dir = tempfile::tempdir().unwrap();
        let (store, service) = setup(&dir);

        store.set_failing(true);
        let result = service.upload(7, "First Aid".to_string(), None, png()).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(stored_files(&dir, 7), 0);
    }

    #[tokio::test]
    async fn test_delete_own_checks_owner() {
        let dir = tempfile::tempdir().unwrap();
        let (_store, service) = setup(&dir);
        let cert = service
            .upload(7, "First Aid".to_string(), None, png())
            .await
            .unwrap();

        assert!(matches!(
            service.delete_own(8, cert.id).await,
            Err(AppError::Forbidden(_))
        ));
        service.delete_own(7, cert.id).await.unwrap();
        assert_eq!(stored_files(&dir, 7), 0);
        assert!(matches!(
            service.delete_own(7, cert.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_approval_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let (_store, service) = setup(&dir);
        let first = service
            .upload(7, "First Aid".to_string(), None, png())
            .await
            .unwrap();
        let second = service
            .upload(7, "Forklift".to_string(), Some("Level 2".to_string()), png())
            .await
            .unwrap();

        let pending = service.list_pending(PageRequest::default()).await.unwrap();
        assert_eq!(pending.meta.total_items, 2);

        let approved = service.approve(first.id).await.unwrap();
        assert_eq!(approved.status, CertificateStatus::Approved);

        match service.approve(first.id).await {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "certificate is not pending"),
            other => panic!("expected BadRequest, got {other:?}"),
        }
        assert!(service.reject(first.id).await.is_err());

        service.reject(second.id).await.unwrap();
        let own = service.list_own(7).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].id, first.id);
    }
}
