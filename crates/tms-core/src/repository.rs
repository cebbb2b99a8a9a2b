//! Repository traits
//!
//! These are the store-of-record seams the services call into. The
//! PostgreSQL implementation lives in [`crate::store`], the in-process one in
//! [`crate::memory`].

use crate::models::{
    Certificate, CertificateStatus, Department, NewCertificate, NewDepartment, NewProgram,
    NewRefreshToken, NewUser, Program, ProgramKind, RefreshToken, Role, User, UserUpdate,
};
use crate::pagination::PageRequest;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// User lookups and inserts (the credential half of the credential store)
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user with their department summary
    async fn find_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Login lookup, scoped to the role of the endpoint
    async fn find_by_email_and_role(&self, email: &str, role: Role) -> Result<Option<User>>;

    async fn exists_by_email(&self, email: &str) -> Result<bool>;

    async fn exists_by_employee_id(&self, employee_id: &str) -> Result<bool>;

    async fn exists_with_role(&self, role: Role) -> Result<bool>;

    /// Insert a user. A duplicate email or employee id fails with
    /// `Conflict(EMAIL_TAKEN)` or `Conflict(EMPLOYEE_ID_TAKEN)`.
    async fn create(&self, user: NewUser) -> Result<User>;

    /// Overwrite the editable fields; `None` when the user does not exist.
    /// Duplicates fail the same way as [`UserRepository::create`].
    async fn update(&self, id: i64, user: UserUpdate) -> Result<Option<User>>;

    /// Remove the user together with their tokens and certificates
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn list(&self, page: PageRequest) -> Result<(Vec<User>, i64)>;

    async fn list_by_department(
        &self,
        department_id: i64,
        page: PageRequest,
    ) -> Result<(Vec<User>, i64)>;
}

/// Refresh-token rows (the session half of the credential store)
#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>>;

    /// Revoke every live token of the user and insert `token`, atomically
    async fn replace_for_user(&self, token: NewRefreshToken) -> Result<RefreshToken>;

    /// Revoke `old_id` only if it is still live, then insert `token`, atomically.
    ///
    /// Returns `None` without inserting when `old_id` was already revoked;
    /// this conditional revoke is the serialization point for concurrent
    /// refreshes of the same token.
    async fn rotate(&self, old_id: i64, token: NewRefreshToken) -> Result<Option<RefreshToken>>;

    /// Conditional revoke; true iff this call flipped the flag
    async fn revoke_if_active(&self, id: i64) -> Result<bool>;

    /// Revoke by token digest, returns the number of rows touched
    async fn revoke_by_hash(&self, token_hash: &str) -> Result<u64>;

    /// End every session of the user
    async fn revoke_all_for_user(&self, user_id: i64) -> Result<u64>;
}

#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    async fn create(&self, department: NewDepartment) -> Result<Department>;

    /// Department with its current staff count
    async fn find_by_id(&self, id: i64) -> Result<Option<Department>>;

    async fn list(&self, page: PageRequest) -> Result<(Vec<Department>, i64)>;

    /// Returns `None` when the department does not exist
    async fn update(&self, id: i64, department: NewDepartment) -> Result<Option<Department>>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Courses and training plans, selected by [`ProgramKind`]
#[async_trait]
pub trait ProgramRepository: Send + Sync {
    async fn create(&self, kind: ProgramKind, program: NewProgram) -> Result<Program>;

    async fn find_by_id(&self, kind: ProgramKind, id: i64) -> Result<Option<Program>>;

    async fn list(&self, kind: ProgramKind, page: PageRequest) -> Result<(Vec<Program>, i64)>;

    /// Write `program` back only if the stored row still carries
    /// `program.updated_at`. Returns the stored row with its new timestamp,
    /// or `None` when the row is gone or was changed in between.
    async fn update(&self, kind: ProgramKind, program: &Program) -> Result<Option<Program>>;

    async fn delete(&self, kind: ProgramKind, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait CertificateRepository: Send + Sync {
    async fn create(&self, certificate: NewCertificate) -> Result<Certificate>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Certificate>>;

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Certificate>>;

    async fn list_pending(&self, page: PageRequest) -> Result<(Vec<Certificate>, i64)>;

    async fn update_status(&self, id: i64, status: CertificateStatus) -> Result<bool>;

    async fn delete(&self, id: i64) -> Result<bool>;
}

/// Liveness probe for the store of record
#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<()>;
}

/// Every repository the services need, behind trait objects
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub refresh_tokens: Arc<dyn RefreshTokenRepository>,
    pub departments: Arc<dyn DepartmentRepository>,
    pub programs: Arc<dyn ProgramRepository>,
    pub certificates: Arc<dyn CertificateRepository>,
    pub health: Arc<dyn StoreHealth>,
}

impl Repositories {
    /// Use one store for every repository
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + RefreshTokenRepository
            + DepartmentRepository
            + ProgramRepository
            + CertificateRepository
            + StoreHealth
            + 'static,
    {
        Self {
            users: store.clone(),
            refresh_tokens: store.clone(),
            departments: store.clone(),
            programs: store.clone(),
            certificates: store.clone(),
            health: store,
        }
    }
}
