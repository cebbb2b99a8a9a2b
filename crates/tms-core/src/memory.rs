//! In-process store
//!
//! Implements every repository trait over a single `RwLock`, so each call is
//! atomic with respect to the others. Used by the test suites and for local
//! runs without PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use crate::models::{
    Certificate, CertificateStatus, Department, DepartmentSummary, NewCertificate, NewDepartment,
    NewProgram, NewRefreshToken, NewUser, Program, ProgramKind, RefreshToken, Role, User,
    UserStatus, UserUpdate, EMAIL_TAKEN, EMPLOYEE_ID_TAKEN,
};
use crate::pagination::PageRequest;
use crate::repository::{
    CertificateRepository, DepartmentRepository, ProgramRepository, RefreshTokenRepository,
    StoreHealth, UserRepository,
};
use crate::{Result, TmsError};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<i64, User>,
    refresh_tokens: BTreeMap<i64, RefreshToken>,
    departments: BTreeMap<i64, Department>,
    courses: BTreeMap<i64, Program>,
    training_plans: BTreeMap<i64, Program>,
    certificates: BTreeMap<i64, Certificate>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn programs(&self, kind: ProgramKind) -> &BTreeMap<i64, Program> {
        match kind {
            ProgramKind::Course => &self.courses,
            ProgramKind::TrainingPlan => &self.training_plans,
        }
    }

    fn programs_mut(&mut self, kind: ProgramKind) -> &mut BTreeMap<i64, Program> {
        match kind {
            ProgramKind::Course => &mut self.courses,
            ProgramKind::TrainingPlan => &mut self.training_plans,
        }
    }

    fn staff_count(&self, department_id: i64) -> i64 {
        self.users
            .values()
            .filter(|u| u.department_id == department_id)
            .count() as i64
    }

    fn department_with_count(&self, id: i64) -> Option<Department> {
        self.departments.get(&id).map(|d| Department {
            total_staff: self.staff_count(id),
            ..d.clone()
        })
    }

    /// Refresh the embedded department name
    fn hydrate_user(&self, user: &User) -> User {
        let mut user = user.clone();
        user.department = self.departments.get(&user.department_id).map(|d| DepartmentSummary {
            id: d.id,
            name: d.name.clone(),
        });
        user
    }

    fn hydrate_certificate(&self, certificate: &Certificate) -> Certificate {
        let mut certificate = certificate.clone();
        certificate.user_name = self.users.get(&certificate.user_id).map(|u| u.name.clone());
        certificate
    }

    /// Unique email and employee id, ignoring the row being edited
    fn check_unique(&self, email: &str, employee_id: &str, except: Option<i64>) -> Result<()> {
        let others = self.users.values().filter(|u| Some(u.id) != except);
        for user in others {
            if user.email == email {
                return Err(TmsError::Conflict(EMAIL_TAKEN.to_string()));
            }
            if user.employee_id == employee_id {
                return Err(TmsError::Conflict(EMPLOYEE_ID_TAKEN.to_string()));
            }
        }
        Ok(())
    }

    fn insert_token(&mut self, token: NewRefreshToken) -> RefreshToken {
        let id = self.next_id();
        let row = RefreshToken {
            id,
            user_id: token.user_id,
            token_hash: token.token_hash,
            expires_at: token.expires_at,
            created_at: Utc::now(),
            revoked: false,
        };
        self.refresh_tokens.insert(id, row.clone());
        row
    }
}

fn page_of<T: Clone>(items: impl Iterator<Item = T>, page: PageRequest) -> (Vec<T>, i64) {
    let all: Vec<T> = items.collect();
    let total = all.len() as i64;
    let slice = all
        .into_iter()
        .skip(page.offset() as usize)
        .take(page.size as usize)
        .collect();
    (slice, total)
}

/// In-process implementation of every repository
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a database error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(TmsError::DatabaseError("store unavailable".to_string()))
        } else {
            Ok(())
        }
    }

    /// Overwrite a token's expiry
    pub async fn set_token_expiry(&self, token_hash: &str, expires_at: DateTime<Utc>) -> bool {
        let mut tables = self.tables.write().await;
        match tables
            .refresh_tokens
            .values_mut()
            .find(|t| t.token_hash == token_hash)
        {
            Some(token) => {
                token.expires_at = expires_at;
                true
            }
            None => false,
        }
    }

    pub async fn set_user_status(&self, user_id: i64, status: UserStatus) -> bool {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user_id) {
            Some(user) => {
                user.status = status;
                true
            }
            None => false,
        }
    }

    /// Number of non-revoked tokens the user holds
    pub async fn live_token_count(&self, user_id: i64) -> usize {
        self.tables
            .read()
            .await
            .refresh_tokens
            .values()
            .filter(|t| t.user_id == user_id && !t.revoked)
            .count()
    }

    pub async fn remove_user(&self, user_id: i64) -> bool {
        self.tables.write().await.users.remove(&user_id).is_some()
    }
}

// ============================================================================
// Users
// ============================================================================

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|u| tables.hydrate_user(u)))
    }

    async fn find_by_email_and_role(&self, email: &str, role: Role) -> Result<Option<User>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email == email && u.role == role)
            .map(|u| tables.hydrate_user(u)))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        self.check()?;
        Ok(self.tables.read().await.users.values().any(|u| u.email == email))
    }

    async fn exists_by_employee_id(&self, employee_id: &str) -> Result<bool> {
        self.check()?;
        Ok(self
            .tables
            .read()
            .await
            .users
            .values()
            .any(|u| u.employee_id == employee_id))
    }

    async fn exists_with_role(&self, role: Role) -> Result<bool> {
        self.check()?;
        Ok(self.tables.read().await.users.values().any(|u| u.role == role))
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        self.check()?;
        let mut tables = self.tables.write().await;

        tables.check_unique(&user.email, &user.employee_id, None)?;
        if !tables.departments.contains_key(&user.department_id) {
            return Err(TmsError::Conflict(
                "Failed to create user: department does not exist".to_string(),
            ));
        }

        let id = tables.next_id();
        let now = Utc::now();
        let row = User {
            id,
            department_id: user.department_id,
            department: None,
            name: user.name,
            email: user.email,
            employee_id: user.employee_id,
            phone: user.phone,
            password_hash: user.password_hash,
            role: user.role,
            status: user.status,
            position: user.position,
            created_by: user.created_by,
            created_by_id: user.created_by_id,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, row.clone());
        Ok(tables.hydrate_user(&row))
    }

    async fn update(&self, id: i64, user: UserUpdate) -> Result<Option<User>> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&id) {
            return Ok(None);
        }
        tables.check_unique(&user.email, &user.employee_id, Some(id))?;
        if !tables.departments.contains_key(&user.department_id) {
            return Err(TmsError::Conflict(
                "Failed to update user: department does not exist".to_string(),
            ));
        }

        let Some(row) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        row.department_id = user.department_id;
        row.name = user.name;
        row.email = user.email;
        row.employee_id = user.employee_id;
        row.phone = user.phone;
        row.role = user.role;
        row.status = user.status;
        row.position = user.position;
        row.updated_at = Utc::now();
        let row = row.clone();
        Ok(Some(tables.hydrate_user(&row)))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.refresh_tokens.retain(|_, t| t.user_id != id);
        tables.certificates.retain(|_, c| c.user_id != id);
        Ok(true)
    }

    async fn list(&self, page: PageRequest) -> Result<(Vec<User>, i64)> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(page_of(
            tables.users.values().map(|u| tables.hydrate_user(u)),
            page,
        ))
    }

    async fn list_by_department(
        &self,
        department_id: i64,
        page: PageRequest,
    ) -> Result<(Vec<User>, i64)> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(page_of(
            tables
                .users
                .values()
                .filter(|u| u.department_id == department_id)
                .map(|u| tables.hydrate_user(u)),
            page,
        ))
    }
}

// ============================================================================
// Refresh tokens
// ============================================================================

#[async_trait]
impl RefreshTokenRepository for MemoryStore {
    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
        self.check()?;
        Ok(self
            .tables
            .read()
            .await
            .refresh_tokens
            .values()
            .find(|t| t.token_hash == token_hash)
            .cloned())
    }

    async fn replace_for_user(&self, token: NewRefreshToken) -> Result<RefreshToken> {
        self.check()?;
        let mut tables = self.tables.write().await;
        for row in tables.refresh_tokens.values_mut() {
            if row.user_id == token.user_id {
                row.revoked = true;
            }
        }
        Ok(tables.insert_token(token))
    }

    async fn rotate(&self, old_id: i64, token: NewRefreshToken) -> Result<Option<RefreshToken>> {
        self.check()?;
        let mut tables = self.tables.write().await;
        match tables.refresh_tokens.get_mut(&old_id) {
            Some(old) if !old.revoked => old.revoked = true,
            _ => return Ok(None),
        }
        Ok(Some(tables.insert_token(token)))
    }

    async fn revoke_if_active(&self, id: i64) -> Result<bool> {
        self.check()?;
        let mut tables = self.tables.write().await;
        match tables.refresh_tokens.get_mut(&id) {
            Some(row) if !row.revoked => {
                row.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_by_hash(&self, token_hash: &str) -> Result<u64> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let mut touched = 0;
        for row in tables.refresh_tokens.values_mut() {
            if row.token_hash == token_hash && !row.revoked {
                row.revoked = true;
                touched += 1;
            }
        }
        Ok(touched)
    }

    async fn revoke_all_for_user(&self, user_id: i64) -> Result<u64> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let mut touched = 0;
        for row in tables.refresh_tokens.values_mut() {
            if row.user_id == user_id && !row.revoked {
                row.revoked = true;
                touched += 1;
            }
        }
        Ok(touched)
    }
}

// ============================================================================
// Departments
// ============================================================================

#[async_trait]
impl DepartmentRepository for MemoryStore {
    async fn create(&self, department: NewDepartment) -> Result<Department> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let row = Department {
            id,
            name: department.name,
            division: department.division,
            total_staff: 0,
        };
        tables.departments.insert(id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Department>> {
        self.check()?;
        Ok(self.tables.read().await.department_with_count(id))
    }

    async fn list(&self, page: PageRequest) -> Result<(Vec<Department>, i64)> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(page_of(
            tables
                .departments
                .keys()
                .filter_map(|id| tables.department_with_count(*id)),
            page,
        ))
    }

    async fn update(&self, id: i64, department: NewDepartment) -> Result<Option<Department>> {
        self.check()?;
        let mut tables = self.tables.write().await;
        match tables.departments.get_mut(&id) {
            Some(row) => {
                row.name = department.name;
                row.division = department.division;
            }
            None => return Ok(None),
        }
        Ok(tables.department_with_count(id))
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if tables.staff_count(id) > 0 {
            return Err(TmsError::Conflict(
                "Failed to delete department: record is still referenced".to_string(),
            ));
        }
        Ok(tables.departments.remove(&id).is_some())
    }
}

// ============================================================================
// Programs
// ============================================================================

#[async_trait]
impl ProgramRepository for MemoryStore {
    async fn create(&self, kind: ProgramKind, program: NewProgram) -> Result<Program> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let now = Utc::now();
        let row = Program {
            id,
            name: program.name,
            speaker_institute: program.speaker_institute,
            program_type: program.program_type,
            category: program.category,
            date: program.date,
            content: program.content,
            number_of_days: program.number_of_days,
            number_of_hours: program.number_of_hours,
            location: program.location,
            total_cost: program.total_cost,
            budget_code: program.budget_code,
            number_of_person: program.number_of_person,
            cost_per_person: program.cost_per_person,
            created_at: now,
            updated_at: now,
        };
        tables.programs_mut(kind).insert(id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, kind: ProgramKind, id: i64) -> Result<Option<Program>> {
        self.check()?;
        Ok(self.tables.read().await.programs(kind).get(&id).cloned())
    }

    async fn list(&self, kind: ProgramKind, page: PageRequest) -> Result<(Vec<Program>, i64)> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut all: Vec<Program> = tables.programs(kind).values().cloned().collect();
        all.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(page_of(all.into_iter(), page))
    }

    async fn update(&self, kind: ProgramKind, program: &Program) -> Result<Option<Program>> {
        self.check()?;
        let mut tables = self.tables.write().await;
        match tables.programs_mut(kind).get_mut(&program.id) {
            Some(row) if row.updated_at == program.updated_at => {
                *row = Program {
                    created_at: row.created_at,
                    updated_at: Utc::now(),
                    ..program.clone()
                };
                Ok(Some(row.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, kind: ProgramKind, id: i64) -> Result<bool> {
        self.check()?;
        Ok(self
            .tables
            .write()
            .await
            .programs_mut(kind)
            .remove(&id)
            .is_some())
    }
}

// ============================================================================
// Certificates
// ============================================================================

#[async_trait]
impl CertificateRepository for MemoryStore {
    async fn create(&self, certificate: NewCertificate) -> Result<Certificate> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let now = Utc::now();
        let row = Certificate {
            id,
            user_id: certificate.user_id,
            user_name: None,
            training_name: certificate.training_name,
            image: certificate.image,
            description: certificate.description,
            status: CertificateStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        tables.certificates.insert(id, row.clone());
        Ok(tables.hydrate_certificate(&row))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Certificate>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .certificates
            .get(&id)
            .map(|c| tables.hydrate_certificate(c)))
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Certificate>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .certificates
            .values()
            .rev()
            .filter(|c| c.user_id == user_id)
            .map(|c| tables.hydrate_certificate(c))
            .collect())
    }

    async fn list_pending(&self, page: PageRequest) -> Result<(Vec<Certificate>, i64)> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(page_of(
            tables
                .certificates
                .values()
                .filter(|c| c.status == CertificateStatus::Pending)
                .map(|c| tables.hydrate_certificate(c)),
            page,
        ))
    }

    async fn update_status(&self, id: i64, status: CertificateStatus) -> Result<bool> {
        self.check()?;
        let mut tables = self.tables.write().await;
        match tables.certificates.get_mut(&id) {
            Some(row) => {
                row.status = status;
                row.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        self.check()?;
        Ok(self.tables.write().await.certificates.remove(&id).is_some())
    }
}

#[async_trait]
impl StoreHealth for MemoryStore {
    async fn ping(&self) -> Result<()> {
        self.check()
    }
}
