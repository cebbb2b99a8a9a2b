//! PostgreSQL store of record
//!
//! Implements every repository trait with SQLx against PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;

use crate::models::{
    Certificate, CertificateStatus, CreatedBy, Department, DepartmentSummary, NewCertificate,
    NewDepartment, NewProgram, NewRefreshToken, NewUser, Program, ProgramKind, ProgramType,
    RefreshToken, Role, User, UserStatus, UserUpdate, EMAIL_TAKEN, EMPLOYEE_ID_TAKEN,
};
use crate::pagination::PageRequest;
use crate::repository::{
    CertificateRepository, DepartmentRepository, ProgramRepository, RefreshTokenRepository,
    StoreHealth, UserRepository,
};
use crate::{Result, TmsError};

/// Schema bootstrap, safe to run repeatedly
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS departments (
    id          BIGSERIAL PRIMARY KEY,
    name        VARCHAR(100) NOT NULL,
    division    VARCHAR(100) NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS users (
    id              BIGSERIAL PRIMARY KEY,
    department_id   BIGINT NOT NULL REFERENCES departments(id),
    name            VARCHAR(52) NOT NULL,
    password_hash   TEXT NOT NULL,
    email           VARCHAR(52) NOT NULL UNIQUE,
    employee_id     VARCHAR(52) NOT NULL UNIQUE,
    phone           VARCHAR(20) NOT NULL DEFAULT '',
    role            VARCHAR(32) NOT NULL DEFAULT 'Staff',
    status          VARCHAR(16) NOT NULL DEFAULT 'Active',
    position        VARCHAR(100) NOT NULL DEFAULT '',
    created_by      VARCHAR(16) NOT NULL DEFAULT 'self',
    created_by_id   BIGINT,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS refresh_tokens (
    id          BIGSERIAL PRIMARY KEY,
    user_id     BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    token_hash  VARCHAR(128) NOT NULL UNIQUE,
    expires_at  TIMESTAMPTZ NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    revoked     BOOLEAN NOT NULL DEFAULT FALSE
);
CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user ON refresh_tokens(user_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_refresh_tokens_live_user
    ON refresh_tokens(user_id) WHERE revoked = FALSE;

CREATE TABLE IF NOT EXISTS courses (
    id                  BIGSERIAL PRIMARY KEY,
    name                VARCHAR(52) NOT NULL,
    speaker_institute   TEXT,
    program_type        VARCHAR(32) NOT NULL,
    category            TEXT NOT NULL,
    date                DATE NOT NULL,
    content             TEXT,
    number_of_days      INT NOT NULL DEFAULT 1,
    number_of_hours     INT,
    location            TEXT,
    total_cost          BIGINT,
    budget_code         VARCHAR(52),
    number_of_person    INT NOT NULL DEFAULT 0,
    cost_per_person     BIGINT,
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS training_plans (LIKE courses INCLUDING ALL);

CREATE TABLE IF NOT EXISTS certificates (
    id              BIGSERIAL PRIMARY KEY,
    user_id         BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    training_name   VARCHAR(255) NOT NULL,
    image           TEXT NOT NULL,
    description     TEXT,
    status          VARCHAR(16) NOT NULL DEFAULT 'Pending',
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_certificates_user ON certificates(user_id);
"#;

const USER_SELECT: &str = r#"
    SELECT u.id, u.department_id, d.name AS department_name, u.name, u.email,
           u.employee_id, u.phone, u.password_hash, u.role, u.status, u.position,
           u.created_by, u.created_by_id, u.created_at, u.updated_at
    FROM users u
    LEFT JOIN departments d ON d.id = u.department_id
"#;

const TOKEN_COLUMNS: &str = "id, user_id, token_hash, expires_at, created_at, revoked";

const PROGRAM_COLUMNS: &str = r#"id, name, speaker_institute, program_type, category, date,
    content, number_of_days, number_of_hours, location, total_cost, budget_code,
    number_of_person, cost_per_person, created_at, updated_at"#;

const CERTIFICATE_SELECT: &str = r#"
    SELECT c.id, c.user_id, u.name AS user_name, c.training_name, c.image,
           c.description, c.status, c.created_at, c.updated_at
    FROM certificates c
    LEFT JOIN users u ON u.id = c.user_id
"#;

/// PostgreSQL store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store connection
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| TmsError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create tables and indexes if they are missing
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to initialise schema"))?;
        Ok(())
    }
}

/// Map a SQLx error, surfacing constraint violations as conflicts
fn db_error(context: &'static str) -> impl Fn(sqlx::Error) -> TmsError {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            TmsError::Conflict(format!("{context}: duplicate value"))
        }
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            TmsError::Conflict(format!("{context}: record is still referenced"))
        }
        _ => TmsError::DatabaseError(format!("{context}: {e}")),
    }
}

/// Like [`db_error`], but names the taken email or employee id
fn user_write_error(context: &'static str) -> impl Fn(sqlx::Error) -> TmsError {
    move |e| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                match db.constraint() {
                    Some(c) if c.contains("employee_id") => {
                        return TmsError::Conflict(EMPLOYEE_ID_TAKEN.to_string())
                    }
                    Some(c) if c.contains("email") => {
                        return TmsError::Conflict(EMAIL_TAKEN.to_string())
                    }
                    _ => {}
                }
            }
        }
        db_error(context)(e)
    }
}

/// Take the user's row lock for the rest of the transaction
async fn lock_user(conn: &mut sqlx::PgConnection, user_id: i64) -> Result<()> {
    sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(db_error("Failed to lock user"))?;
    Ok(())
}

fn corrupt(field: &str, value: &str) -> TmsError {
    TmsError::DatabaseError(format!("Unexpected {field} value in database: {value}"))
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    department_id: i64,
    department_name: Option<String>,
    name: String,
    email: String,
    employee_id: String,
    phone: String,
    password_hash: String,
    role: String,
    status: String,
    position: String,
    created_by: String,
    created_by_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = TmsError;

    fn try_from(row: UserRow) -> Result<Self> {
        let role = Role::parse(&row.role).ok_or_else(|| corrupt("role", &row.role))?;
        let status = UserStatus::parse(&row.status).ok_or_else(|| corrupt("status", &row.status))?;

        Ok(User {
            id: row.id,
            department_id: row.department_id,
            department: row.department_name.map(|name| DepartmentSummary {
                id: row.department_id,
                name,
            }),
            name: row.name,
            email: row.email,
            employee_id: row.employee_id,
            phone: row.phone,
            password_hash: row.password_hash,
            role,
            status,
            position: row.position,
            created_by: CreatedBy::parse(&row.created_by),
            created_by_id: row.created_by_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn users_from_rows(rows: Vec<UserRow>) -> Result<Vec<User>> {
    rows.into_iter().map(User::try_from).collect()
}

#[derive(Debug, FromRow)]
struct RefreshTokenRow {
    id: i64,
    user_id: i64,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    revoked: bool,
}

impl From<RefreshTokenRow> for RefreshToken {
    fn from(row: RefreshTokenRow) -> Self {
        RefreshToken {
            id: row.id,
            user_id: row.user_id,
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            created_at: row.created_at,
            revoked: row.revoked,
        }
    }
}

#[derive(Debug, FromRow)]
struct DepartmentRow {
    id: i64,
    name: String,
    division: String,
    total_staff: i64,
}

impl From<DepartmentRow> for Department {
    fn from(row: DepartmentRow) -> Self {
        Department {
            id: row.id,
            name: row.name,
            division: row.division,
            total_staff: row.total_staff,
        }
    }
}

#[derive(Debug, FromRow)]
struct ProgramRow {
    id: i64,
    name: String,
    speaker_institute: Option<String>,
    program_type: String,
    category: String,
    date: NaiveDate,
    content: Option<String>,
    number_of_days: i32,
    number_of_hours: Option<i32>,
    location: Option<String>,
    total_cost: Option<i64>,
    budget_code: Option<String>,
    number_of_person: i32,
    cost_per_person: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProgramRow> for Program {
    type Error = TmsError;

    fn try_from(row: ProgramRow) -> Result<Self> {
        let program_type = ProgramType::parse(&row.program_type)
            .ok_or_else(|| corrupt("program_type", &row.program_type))?;

        Ok(Program {
            id: row.id,
            name: row.name,
            speaker_institute: row.speaker_institute,
            program_type,
            category: row.category,
            date: row.date,
            content: row.content,
            number_of_days: row.number_of_days,
            number_of_hours: row.number_of_hours,
            location: row.location,
            total_cost: row.total_cost,
            budget_code: row.budget_code,
            number_of_person: row.number_of_person,
            cost_per_person: row.cost_per_person,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct CertificateRow {
    id: i64,
    user_id: i64,
    user_name: Option<String>,
    training_name: String,
    image: String,
    description: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CertificateRow> for Certificate {
    type Error = TmsError;

    fn try_from(row: CertificateRow) -> Result<Self> {
        let status = CertificateStatus::parse(&row.status)
            .ok_or_else(|| corrupt("certificate status", &row.status))?;

        Ok(Certificate {
            id: row.id,
            user_id: row.user_id,
            user_name: row.user_name,
            training_name: row.training_name,
            image: row.image,
            description: row.description,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ============================================================================
// Users
// ============================================================================

#[async_trait]
impl UserRepository for PgStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{USER_SELECT} WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("Failed to fetch user"))?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_email_and_role(&self, email: &str, role: Role) -> Result<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("{USER_SELECT} WHERE u.email = $1 AND u.role = $2"))
                .bind(email)
                .bind(role.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to fetch user"))?;

        row.map(User::try_from).transpose()
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to check email"))
    }

    async fn exists_by_employee_id(&self, employee_id: &str) -> Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE employee_id = $1)")
            .bind(employee_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to check employee id"))
    }

    async fn exists_with_role(&self, role: Role) -> Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE role = $1)")
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to check role"))
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO users (
                department_id, name, password_hash, email, employee_id, phone,
                role, status, position, created_by, created_by_id
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(user.department_id)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(&user.employee_id)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(&user.position)
        .bind(user.created_by.as_str())
        .bind(user.created_by_id)
        .fetch_one(&self.pool)
        .await
        .map_err(user_write_error("Failed to create user"))?;

        UserRepository::find_by_id(self, id)
            .await?
            .ok_or_else(|| TmsError::DatabaseError("Created user vanished".to_string()))
    }

    async fn update(&self, id: i64, user: UserUpdate) -> Result<Option<User>> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                department_id = $1, name = $2, email = $3, employee_id = $4, phone = $5,
                role = $6, status = $7, position = $8, updated_at = NOW()
            WHERE id = $9
            "#,
        )
        .bind(user.department_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.employee_id)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(&user.position)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(user_write_error("Failed to update user"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        UserRepository::find_by_id(self, id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete user"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, page: PageRequest) -> Result<(Vec<User>, i64)> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("{USER_SELECT} ORDER BY u.id LIMIT $1 OFFSET $2"))
                .bind(page.size)
                .bind(page.offset())
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("Failed to list users"))?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count users"))?;

        Ok((users_from_rows(rows)?, total))
    }

    async fn list_by_department(
        &self,
        department_id: i64,
        page: PageRequest,
    ) -> Result<(Vec<User>, i64)> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "{USER_SELECT} WHERE u.department_id = $1 ORDER BY u.id LIMIT $2 OFFSET $3"
        ))
        .bind(department_id)
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list department users"))?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE department_id = $1")
            .bind(department_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count department users"))?;

        Ok((users_from_rows(rows)?, total))
    }
}

// ============================================================================
// Refresh tokens
// ============================================================================

#[async_trait]
impl RefreshTokenRepository for PgStore {
    async fn find_by_hash(&self, token_hash: &str) -> Result<Option<RefreshToken>> {
        let row: Option<RefreshTokenRow> = sqlx::query_as(&format!(
            "SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE token_hash = $1"
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch refresh token"))?;

        Ok(row.map(RefreshToken::from))
    }

    async fn replace_for_user(&self, token: NewRefreshToken) -> Result<RefreshToken> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to open transaction"))?;

        // Logins and rotations of one user queue on the user row
        lock_user(&mut *tx, token.user_id).await?;

        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND revoked = FALSE")
            .bind(token.user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("Failed to revoke refresh tokens"))?;

        let row: RefreshTokenRow = sqlx::query_as(&format!(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3) RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to store refresh token"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit refresh token"))?;

        Ok(row.into())
    }

    async fn rotate(&self, old_id: i64, token: NewRefreshToken) -> Result<Option<RefreshToken>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(db_error("Failed to open transaction"))?;

        lock_user(&mut *tx, token.user_id).await?;

        // Row lock makes a concurrent rotation of the same token wait and then match nothing
        let revoked = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1 AND revoked = FALSE",
        )
        .bind(old_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("Failed to revoke refresh token"))?
        .rows_affected();

        if revoked == 0 {
            tx.rollback()
                .await
                .map_err(db_error("Failed to roll back rotation"))?;
            return Ok(None);
        }

        let row: RefreshTokenRow = sqlx::query_as(&format!(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at) VALUES ($1, $2, $3) RETURNING {TOKEN_COLUMNS}"
        ))
        .bind(token.user_id)
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("Failed to store refresh token"))?;

        tx.commit()
            .await
            .map_err(db_error("Failed to commit rotation"))?;

        Ok(Some(row.into()))
    }

    async fn revoke_if_active(&self, id: i64) -> Result<bool> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1 AND revoked = FALSE")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_error("Failed to revoke refresh token"))?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_by_hash(&self, token_hash: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = TRUE WHERE token_hash = $1 AND revoked = FALSE",
        )
        .bind(token_hash)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to revoke refresh token"))?;

        Ok(result.rows_affected())
    }

    async fn revoke_all_for_user(&self, user_id: i64) -> Result<u64> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = $1 AND revoked = FALSE")
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(db_error("Failed to revoke refresh tokens"))?;

        Ok(result.rows_affected())
    }
}

// ============================================================================
// Departments
// ============================================================================

const DEPARTMENT_SELECT: &str = r#"
    SELECT d.id, d.name, d.division, COUNT(u.id) AS total_staff
    FROM departments d
    LEFT JOIN users u ON u.department_id = d.id
"#;

#[async_trait]
impl DepartmentRepository for PgStore {
    async fn create(&self, department: NewDepartment) -> Result<Department> {
        let row: DepartmentRow = sqlx::query_as(
            r#"
            INSERT INTO departments (name, division)
            VALUES ($1, $2)
            RETURNING id, name, division, 0::BIGINT AS total_staff
            "#,
        )
        .bind(&department.name)
        .bind(&department.division)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create department"))?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Department>> {
        let row: Option<DepartmentRow> =
            sqlx::query_as(&format!("{DEPARTMENT_SELECT} WHERE d.id = $1 GROUP BY d.id"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to fetch department"))?;

        Ok(row.map(Department::from))
    }

    async fn list(&self, page: PageRequest) -> Result<(Vec<Department>, i64)> {
        let rows: Vec<DepartmentRow> = sqlx::query_as(&format!(
            "{DEPARTMENT_SELECT} GROUP BY d.id ORDER BY d.id LIMIT $1 OFFSET $2"
        ))
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list departments"))?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM departments")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count departments"))?;

        Ok((rows.into_iter().map(Department::from).collect(), total))
    }

    async fn update(&self, id: i64, department: NewDepartment) -> Result<Option<Department>> {
        let result = sqlx::query(
            "UPDATE departments SET name = $1, division = $2, updated_at = NOW() WHERE id = $3",
        )
        .bind(&department.name)
        .bind(&department.division)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(db_error("Failed to update department"))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        DepartmentRepository::find_by_id(self, id).await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM departments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete department"))?;

        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Programs
// ============================================================================

#[async_trait]
impl ProgramRepository for PgStore {
    async fn create(&self, kind: ProgramKind, program: NewProgram) -> Result<Program> {
        let row: ProgramRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO {table} (
                name, speaker_institute, program_type, category, date, content,
                number_of_days, number_of_hours, location, total_cost, budget_code,
                number_of_person, cost_per_person
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {PROGRAM_COLUMNS}
            "#,
            table = kind.table()
        ))
        .bind(&program.name)
        .bind(&program.speaker_institute)
        .bind(program.program_type.as_str())
        .bind(&program.category)
        .bind(program.date)
        .bind(&program.content)
        .bind(program.number_of_days)
        .bind(program.number_of_hours)
        .bind(&program.location)
        .bind(program.total_cost)
        .bind(&program.budget_code)
        .bind(program.number_of_person)
        .bind(program.cost_per_person)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create program"))?;

        row.try_into()
    }

    async fn find_by_id(&self, kind: ProgramKind, id: i64) -> Result<Option<Program>> {
        let row: Option<ProgramRow> = sqlx::query_as(&format!(
            "SELECT {PROGRAM_COLUMNS} FROM {} WHERE id = $1",
            kind.table()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to fetch program"))?;

        row.map(Program::try_from).transpose()
    }

    async fn list(&self, kind: ProgramKind, page: PageRequest) -> Result<(Vec<Program>, i64)> {
        let rows: Vec<ProgramRow> = sqlx::query_as(&format!(
            "SELECT {PROGRAM_COLUMNS} FROM {} ORDER BY date DESC, id DESC LIMIT $1 OFFSET $2",
            kind.table()
        ))
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list programs"))?;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", kind.table()))
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("Failed to count programs"))?;

        let programs = rows
            .into_iter()
            .map(Program::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok((programs, total))
    }

    async fn update(&self, kind: ProgramKind, program: &Program) -> Result<Option<Program>> {
        let row: Option<ProgramRow> = sqlx::query_as(&format!(
            r#"
            UPDATE {} SET
                name = $1, speaker_institute = $2, program_type = $3, category = $4,
                date = $5, content = $6, number_of_days = $7, number_of_hours = $8,
                location = $9, total_cost = $10, budget_code = $11,
                number_of_person = $12, cost_per_person = $13, updated_at = NOW()
            WHERE id = $14 AND updated_at = $15
            RETURNING {PROGRAM_COLUMNS}
            "#,
            kind.table()
        ))
        .bind(&program.name)
        .bind(&program.speaker_institute)
        .bind(program.program_type.as_str())
        .bind(&program.category)
        .bind(program.date)
        .bind(&program.content)
        .bind(program.number_of_days)
        .bind(program.number_of_hours)
        .bind(&program.location)
        .bind(program.total_cost)
        .bind(&program.budget_code)
        .bind(program.number_of_person)
        .bind(program.cost_per_person)
        .bind(program.id)
        .bind(program.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("Failed to update program"))?;

        row.map(Program::try_from).transpose()
    }

    async fn delete(&self, kind: ProgramKind, id: i64) -> Result<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete program"))?;

        Ok(result.rows_affected() > 0)
    }
}

// ============================================================================
// Certificates
// ============================================================================

#[async_trait]
impl CertificateRepository for PgStore {
    async fn create(&self, certificate: NewCertificate) -> Result<Certificate> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO certificates (user_id, training_name, image, description, status)
            VALUES ($1, $2, $3, $4, 'Pending')
            RETURNING id
            "#,
        )
        .bind(certificate.user_id)
        .bind(&certificate.training_name)
        .bind(&certificate.image)
        .bind(&certificate.description)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("Failed to create certificate"))?;

        CertificateRepository::find_by_id(self, id)
            .await?
            .ok_or_else(|| TmsError::DatabaseError("Created certificate vanished".to_string()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Certificate>> {
        let row: Option<CertificateRow> =
            sqlx::query_as(&format!("{CERTIFICATE_SELECT} WHERE c.id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("Failed to fetch certificate"))?;

        row.map(Certificate::try_from).transpose()
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Certificate>> {
        let rows: Vec<CertificateRow> = sqlx::query_as(&format!(
            "{CERTIFICATE_SELECT} WHERE c.user_id = $1 ORDER BY c.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list certificates"))?;

        rows.into_iter().map(Certificate::try_from).collect()
    }

    async fn list_pending(&self, page: PageRequest) -> Result<(Vec<Certificate>, i64)> {
        let rows: Vec<CertificateRow> = sqlx::query_as(&format!(
            "{CERTIFICATE_SELECT} WHERE c.status = 'Pending' ORDER BY c.created_at LIMIT $1 OFFSET $2"
        ))
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("Failed to list pending certificates"))?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM certificates WHERE status = 'Pending'")
                .fetch_one(&self.pool)
                .await
                .map_err(db_error("Failed to count pending certificates"))?;

        let items = rows
            .into_iter()
            .map(Certificate::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok((items, total))
    }

    async fn update_status(&self, id: i64, status: CertificateStatus) -> Result<bool> {
        let result =
            sqlx::query("UPDATE certificates SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(status.as_str())
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_error("Failed to update certificate"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM certificates WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("Failed to delete certificate"))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl StoreHealth for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_error("Database ping failed"))?;
        Ok(())
    }
}
