//! TMS Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the training
//! management system:
//! - Users, roles and refresh-token session rows
//! - Departments, training programs (courses / training plans), certificates
//! - Pagination helpers shared by every listing endpoint
//! - Repository traits with PostgreSQL and in-process implementations
//! - Blob storage for certificate files
//! - Configuration management

pub mod config;
pub mod memory;
pub mod models;
pub mod pagination;
pub mod repository;
pub mod storage;
pub mod store;

pub use config::{
    AppConfig, AppEnvironment, AuthConfig, CacheConfig, ConfigError, DatabaseConfig,
    LoggingConfig, ServerConfig, StorageConfig,
};
pub use memory::MemoryStore;
pub use models::{
    Certificate, CertificateStatus, CreatedBy, Department, DepartmentSummary, NewCertificate,
    NewDepartment, NewProgram, NewRefreshToken, NewUser, Program, ProgramKind, ProgramPatch,
    ProgramType, RefreshToken, Role, User, UserProfile, UserStatus, UserUpdate, EMAIL_TAKEN,
    EMPLOYEE_ID_TAKEN,
};
pub use pagination::{
    CertificatePage, DepartmentPage, PageRequest, Paginated, PaginationMeta, ProgramPage, UserPage,
};
pub use repository::{
    CertificateRepository, DepartmentRepository, ProgramRepository, RefreshTokenRepository,
    Repositories, StoreHealth, UserRepository,
};
pub use storage::{LocalStorage, Storage, StorageError};
pub use store::PgStore;

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for TMS operations
#[derive(Error, Debug)]
pub enum TmsError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TmsError>;
