//! Courses and training plans
//!
//! One service instance per [`ProgramKind`]; each kind has its own cache
//! namespace, so a course write never evicts cached training plans.

use std::sync::Arc;
use tms_cache::{keys, CacheAside};
use tms_core::{
    NewProgram, PageRequest, Paginated, Program, ProgramKind, ProgramPatch, ProgramRepository,
};

use crate::error::AppError;

/// Field rules shared by create and patch
fn check_program(program: &NewProgram) -> Result<(), AppError> {
    let mut problems = Vec::new();

    if program.name.trim().chars().count() < 3 {
        problems.push("name: must be at least 3 characters");
    }
    if program.category.trim().is_empty() {
        problems.push("category: is required");
    }
    if program.number_of_days < 1 {
        problems.push("numberOfDays: must be at least 1");
    }
    if matches!(program.number_of_hours, Some(h) if h < 1) {
        problems.push("numberOfHours: must be at least 1");
    }
    if program.number_of_person < 0 {
        problems.push("numberOfPerson: must not be negative");
    }
    if matches!(program.total_cost, Some(c) if c < 0) {
        problems.push("totalCost: must not be negative");
    }
    if matches!(program.cost_per_person, Some(c) if c < 0) {
        problems.push("costPerPerson: must not be negative");
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(problems.join("; ")))
    }
}

fn as_new(program: &Program) -> NewProgram {
    NewProgram {
        name: program.name.clone(),
        speaker_institute: program.speaker_institute.clone(),
        program_type: program.program_type,
        category: program.category.clone(),
        date: program.date,
        content: program.content.clone(),
        number_of_days: program.number_of_days,
        number_of_hours: program.number_of_hours,
        location: program.location.clone(),
        total_cost: program.total_cost,
        budget_code: program.budget_code.clone(),
        number_of_person: program.number_of_person,
        cost_per_person: program.cost_per_person,
    }
}

const UPDATE_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct ProgramService {
    kind: ProgramKind,
    repo: Arc<dyn ProgramRepository>,
    cache: CacheAside,
}

impl ProgramService {
    pub fn new(kind: ProgramKind, repo: Arc<dyn ProgramRepository>, cache: CacheAside) -> Self {
        Self { kind, repo, cache }
    }

    fn not_found(&self) -> AppError {
        AppError::NotFound(format!("{} not found", self.kind.label()))
    }

    pub async fn get(&self, id: i64) -> Result<Program, AppError> {
        let key = keys::id_key(self.kind.as_str(), id);
        self.cache
            .get_or_load(&key, || async move {
                self.repo
                    .find_by_id(self.kind, id)
                    .await?
                    .ok_or_else(|| self.not_found())
            })
            .await
    }

    pub async fn list(&self, page: PageRequest) -> Result<Paginated<Program>, AppError> {
        let key = keys::page_key(self.kind.as_str(), page.page, page.size);
        self.cache
            .get_or_load(&key, || async move {
                let (items, total) = self.repo.list(self.kind, page).await?;
                Ok::<_, AppError>(Paginated::new(items, total, page))
            })
            .await
    }

    pub async fn create(&self, program: NewProgram) -> Result<Program, AppError> {
        check_program(&program)?;
        let created = self.repo.create(self.kind, program).await?;
        self.cache.invalidate_kind(self.kind.as_str()).await;
        tracing::info!(kind = self.kind.as_str(), id = created.id, "Program created");
        Ok(created)
    }

    /// Apply a partial update; the merged record must still pass validation.
    ///
    /// The write is conditional on the row being unchanged since it was read,
    /// so a concurrent patch makes this one re-read and reapply.
    pub async fn update(&self, id: i64, patch: ProgramPatch) -> Result<Program, AppError> {
        for _ in 0..UPDATE_ATTEMPTS {
            let mut program = self
                .repo
                .find_by_id(self.kind, id)
                .await?
                .ok_or_else(|| self.not_found())?;

            patch.clone().apply(&mut program);
            check_program(&as_new(&program))?;

            if let Some(stored) = self.repo.update(self.kind, &program).await? {
                self.cache.invalidate_kind(self.kind.as_str()).await;
                return Ok(stored);
            }
            tracing::debug!(kind = self.kind.as_str(), id, "Program changed during update, retrying");
        }

        Err(AppError::BadRequest(format!(
            "{} is being modified, try again",
            self.kind.label()
        )))
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.repo.delete(self.kind, id).await? {
            return Err(self.not_found());
        }
        self.cache.invalidate_kind(self.kind.as_str()).await;
        tracing::info!(kind = self.kind.as_str(), id, "Program deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tms_cache::{MemoryCache, DEFAULT_TTL};
    use tms_core::{MemoryStore, ProgramType};

    fn sample(name: &str) -> NewProgram {
        NewProgram {
            name: name.to_string(),
            speaker_institute: Some("Institute of Safety".to_string()),
            program_type: ProgramType::InHouse,
            category: "Safety".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            content: None,
            number_of_days: 2,
            number_of_hours: Some(12),
            location: Some("Bangkok".to_string()),
            total_cost: Some(20_000),
            budget_code: None,
            number_of_person: 10,
            cost_per_person: Some(2_000),
        }
    }

    fn setup() -> (MemoryCache, ProgramService, ProgramService) {
        let store = Arc::new(MemoryStore::new());
        let cache = MemoryCache::default();
        let aside = CacheAside::new(Arc::new(cache.clone()), DEFAULT_TTL);
        let courses = ProgramService::new(ProgramKind::Course, store.clone(), aside.clone());
        let plans = ProgramService::new(ProgramKind::TrainingPlan, store, aside);
        (cache, courses, plans)
    }

    #[tokio::test]
    async fn test_patch_is_visible_after_cached_read() {
        let (_cache, courses, _plans) = setup();
        let created = courses.create(sample("Fire Safety")).await.unwrap();
        assert_eq!(courses.get(created.id).await.unwrap().number_of_days, 2);

        let patch = ProgramPatch {
            number_of_days: Some(3),
            ..Default::default()
        };
        courses.update(created.id, patch).await.unwrap();

        let reread = courses.get(created.id).await.unwrap();
        assert_eq!(reread.number_of_days, 3);
        assert_eq!(reread.name, "Fire Safety");
    }

    #[tokio::test]
    async fn test_kinds_have_separate_namespaces() {
        let (cache, courses, plans) = setup();
        plans.create(sample("Leadership 101")).await.unwrap();
        plans.list(PageRequest::default()).await.unwrap();
        courses.list(PageRequest::default()).await.unwrap();

        courses.create(sample("Excel Basics")).await.unwrap();

        assert!(cache.contains(&keys::page_key(keys::TRAINING_PLAN, 1, 10)).await);
        assert!(!cache.contains(&keys::page_key(keys::COURSE, 1, 10)).await);
    }

    #[tokio::test]
    async fn test_validation_rejects_bad_program() {
        let (_cache, courses, _plans) = setup();

        let mut bad = sample("AB");
        bad.number_of_days = 0;
        bad.category = " ".to_string();

        match courses.create(bad).await {
            Err(AppError::Validation(details)) => {
                assert!(details.contains("name"));
                assert!(details.contains("numberOfDays"));
                assert!(details.contains("category"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_patch_cannot_break_invariants() {
        let (_cache, courses, _plans) = setup();
        let created = courses.create(sample("Fire Safety")).await.unwrap();

        let patch = ProgramPatch {
            total_cost: Some(-1),
            ..Default::default()
        };
        assert!(matches!(
            courses.update(created.id, patch).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(courses.get(created.id).await.unwrap().total_cost, Some(20_000));
    }

    #[tokio::test]
    async fn test_update_returns_stored_timestamp() {
        let (_cache, courses, _plans) = setup();
        let created = courses.create(sample("Fire Safety")).await.unwrap();

        let patch = ProgramPatch {
            location: Some("Chiang Mai".to_string()),
            ..Default::default()
        };
        let updated = courses.update(created.id, patch).await.unwrap();

        assert_ne!(updated.updated_at, created.updated_at);
        assert_eq!(courses.get(created.id).await.unwrap().updated_at, updated.updated_at);
    }

    /// Lands a competing write right before the first conditional update
    struct CompetingWriter {
        inner: Arc<MemoryStore>,
        pending: AtomicBool,
    }

    #[async_trait]
    impl ProgramRepository for CompetingWriter {
        async fn create(&self, kind: ProgramKind, program: NewProgram) -> tms_core::Result<Program> {
            ProgramRepository::create(&*self.inner, kind, program).await
        }

        async fn find_by_id(&self, kind: ProgramKind, id: i64) -> tms_core::Result<Option<Program>> {
            ProgramRepository::find_by_id(&*self.inner, kind, id).await
        }

        async fn list(
            &self,
            kind: ProgramKind,
            page: PageRequest,
        ) -> tms_core::Result<(Vec<Program>, i64)> {
            ProgramRepository::list(&*self.inner, kind, page).await
        }

        async fn update(
            &self,
            kind: ProgramKind,
            program: &Program,
        ) -> tms_core::Result<Option<Program>> {
            if self.pending.swap(false, Ordering::SeqCst) {
                let mut other = ProgramRepository::find_by_id(&*self.inner, kind, program.id)
                    .await?
                    .unwrap();
                other.name = "Fire Safety Advanced".to_string();
                ProgramRepository::update(&*self.inner, kind, &other).await?;
            }
            ProgramRepository::update(&*self.inner, kind, program).await
        }

        async fn delete(&self, kind: ProgramKind, id: i64) -> tms_core::Result<bool> {
            ProgramRepository::delete(&*self.inner, kind, id).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_patches_both_apply() {
        let store = Arc::new(MemoryStore::new());
        let repo = Arc::new(CompetingWriter {
            inner: store,
            pending: AtomicBool::new(false),
        });
        let aside = CacheAside::new(Arc::new(MemoryCache::default()), DEFAULT_TTL);
        let courses = ProgramService::new(ProgramKind::Course, repo.clone(), aside);

        let created = courses.create(sample("Fire Safety")).await.unwrap();
        repo.pending.store(true, Ordering::SeqCst);

        let patch = ProgramPatch {
            number_of_days: Some(4),
            ..Default::default()
        };
        let updated = courses.update(created.id, patch).await.unwrap();

        assert_eq!(updated.name, "Fire Safety Advanced");
        assert_eq!(updated.number_of_days, 4);
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let (_cache, courses, _plans) = setup();
        match courses.delete(404).await {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "Course not found"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }
}
