//! Application state shared across handlers

use std::sync::Arc;
use std::time::Instant;

use tms_cache::CacheAside;
use tms_core::{AppConfig, ProgramKind, Repositories, Storage};

use crate::auth::{CookieConfig, JwtConfig, PasswordConfig, SessionManager};
use crate::middleware::HttpMetrics;
use crate::services::{
    CertificateService, DepartmentService, ProgramService, UserService,
};

pub struct AppState {
    pub config: AppConfig,
    pub repos: Repositories,
    pub cache: CacheAside,
    pub sessions: SessionManager,
    pub departments: DepartmentService,
    pub courses: ProgramService,
    pub training_plans: ProgramService,
    pub users: UserService,
    pub certificates: CertificateService,
    pub jwt_config: JwtConfig,
    pub cookies: CookieConfig,
    pub metrics: HttpMetrics,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Wire every service from its collaborators
    pub fn new(
        config: AppConfig,
        repos: Repositories,
        cache: CacheAside,
        storage: Arc<dyn Storage>,
        password_config: PasswordConfig,
    ) -> Result<Self, prometheus::Error> {
        let jwt_config = JwtConfig::from_auth_config(&config.auth);
        let cookies = CookieConfig::from_auth_config(&config.auth);

        let sessions = SessionManager::new(
            repos.users.clone(),
            repos.refresh_tokens.clone(),
            jwt_config.clone(),
            config.auth.refresh_token_ttl_days,
        )
        .with_password_config(password_config.clone());

        let departments = DepartmentService::new(repos.departments.clone(), cache.clone());
        let courses = ProgramService::new(ProgramKind::Course, repos.programs.clone(), cache.clone());
        let training_plans =
            ProgramService::new(ProgramKind::TrainingPlan, repos.programs.clone(), cache.clone());
        let users = UserService::new(
            repos.users.clone(),
            repos.departments.clone(),
            repos.refresh_tokens.clone(),
            departments.clone(),
            password_config,
        );
        let certificates = CertificateService::new(
            repos.certificates.clone(),
            storage,
            config.storage.max_upload_bytes,
        );

        Ok(Self {
            config,
            repos,
            cache,
            sessions,
            departments,
            courses,
            training_plans,
            users,
            certificates,
            jwt_config,
            cookies,
            metrics: HttpMetrics::new()?,
            start_time: Instant::now(),
        })
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn programs(&self, kind: ProgramKind) -> &ProgramService {
        match kind {
            ProgramKind::Course => &self.courses,
            ProgramKind::TrainingPlan => &self.training_plans,
        }
    }
}
