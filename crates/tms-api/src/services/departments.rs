//! Department reads through the cache, writes with prefix invalidation

use std::sync::Arc;
use tms_cache::{keys, CacheAside};
use tms_core::{Department, DepartmentRepository, NewDepartment, PageRequest, Paginated};

use crate::error::AppError;

#[derive(Clone)]
pub struct DepartmentService {
    repo: Arc<dyn DepartmentRepository>,
    cache: CacheAside,
}

impl DepartmentService {
    pub fn new(repo: Arc<dyn DepartmentRepository>, cache: CacheAside) -> Self {
        Self { repo, cache }
    }

    pub async fn get(&self, id: i64) -> Result<Department, AppError> {
        let key = keys::id_key(keys::DEPARTMENT, id);
        self.cache
            .get_or_load(&key, || async move {
                self.repo
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound("Department not found".to_string()))
            })
            .await
    }

    pub async fn list(&self, page: PageRequest) -> Result<Paginated<Department>, AppError> {
        let key = keys::page_key(keys::DEPARTMENT, page.page, page.size);
        self.cache
            .get_or_load(&key, || async move {
                let (items, total) = self.repo.list(page).await?;
                Ok::<_, AppError>(Paginated::new(items, total, page))
            })
            .await
    }

    pub async fn create(&self, department: NewDepartment) -> Result<Department, AppError> {
        let created = self.repo.create(department).await?;
        self.cache.invalidate_kind(keys::DEPARTMENT).await;
        tracing::info!(department_id = created.id, name = %created.name, "Department created");
        Ok(created)
    }

    pub async fn update(&self, id: i64, department: NewDepartment) -> Result<Department, AppError> {
        let updated = self
            .repo
            .update(id, department)
            .await?
            .ok_or_else(|| AppError::NotFound("Department not found".to_string()))?;
        self.cache.invalidate_kind(keys::DEPARTMENT).await;
        Ok(updated)
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.repo.delete(id).await? {
            return Err(AppError::NotFound("Department not found".to_string()));
        }
        self.cache.invalidate_kind(keys::DEPARTMENT).await;
        tracing::info!(department_id = id, "Department deleted");
        Ok(())
    }

    /// Drop cached departments after a change that moves staff counts
    pub async fn staff_changed(&self) {
        self.cache.invalidate_kind(keys::DEPARTMENT).await;
    }
}
