//! Domain models for the training management system
//!
//! This module defines the records persisted by the repositories:
//! - User: employee account with role and status
//! - RefreshToken: server-side session credential (stored hashed)
//! - Department: organisational unit with a derived staff count
//! - Program: a course or a training plan (both share one shape)
//! - Certificate: uploaded training certificate awaiting approval
//!
//! Serialized field names follow the web client's camelCase contract.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================================
// Roles and status
// ============================================================================

/// User role
///
/// Closed set of system roles. Each role has its own login endpoint and its
/// own protected route group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    /// HR administrator
    #[serde(rename = "Hr(admin)")]
    Admin,
    /// Department head
    #[serde(rename = "DepartmentHead(manager)")]
    Manager,
    /// Regular employee
    #[serde(rename = "Staff")]
    Staff,
}

impl Role {
    /// Wire / database representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Hr(admin)",
            Role::Manager => "DepartmentHead(manager)",
            Role::Staff => "Staff",
        }
    }

    /// Parse from either the wire name or a short lowercase name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Hr(admin)" => Some(Role::Admin),
            "DepartmentHead(manager)" => Some(Role::Manager),
            "Staff" => Some(Role::Staff),
            _ => match s.to_lowercase().as_str() {
                "admin" => Some(Role::Admin),
                "manager" => Some(Role::Manager),
                "staff" => Some(Role::Staff),
                _ => None,
            },
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account status; only active users may authenticate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Inactive => "Inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Active" => Some(UserStatus::Active),
            "Inactive" => Some(UserStatus::Inactive),
            _ => None,
        }
    }
}

/// Who created a user account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CreatedBy {
    #[default]
    #[serde(rename = "self")]
    SelfRegistered,
    Admin,
    Manager,
}

impl CreatedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreatedBy::SelfRegistered => "self",
            CreatedBy::Admin => "admin",
            CreatedBy::Manager => "manager",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => CreatedBy::Admin,
            "manager" => CreatedBy::Manager,
            _ => CreatedBy::SelfRegistered,
        }
    }
}

// ============================================================================
// Users
// ============================================================================

/// Compact department reference embedded in user projections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DepartmentSummary {
    pub id: i64,
    pub name: String,
}

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub department_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<DepartmentSummary>,
    pub name: String,
    pub email: String,
    #[serde(rename = "employeeID")]
    pub employee_id: String,
    pub phone: String,
    /// Argon2id PHC string, never serialized
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    pub position: String,
    pub created_by: CreatedBy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }

    /// Convert to the projection returned by the API
    pub fn to_profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            employee_id: self.employee_id.clone(),
            phone: self.phone.clone(),
            role: self.role,
            status: self.status,
            position: self.position.clone(),
            department_id: self.department_id,
            department: self.department.clone(),
        }
    }
}

/// Public user representation (no credentials)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(rename = "employeeID")]
    pub employee_id: String,
    pub phone: String,
    pub role: Role,
    pub status: UserStatus,
    pub position: String,
    pub department_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<DepartmentSummary>,
}

/// Insert payload for a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub department_id: i64,
    pub name: String,
    pub email: String,
    pub employee_id: String,
    pub phone: String,
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    pub position: String,
    pub created_by: CreatedBy,
    pub created_by_id: Option<i64>,
}

/// Admin edit of an existing account; the password is not touched
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub department_id: i64,
    pub name: String,
    pub email: String,
    pub employee_id: String,
    pub phone: String,
    pub role: Role,
    pub status: UserStatus,
    pub position: String,
}

/// Conflict message when another account holds the email
pub const EMAIL_TAKEN: &str = "Email already registered";
/// Conflict message when another account holds the employee id
pub const EMPLOYEE_ID_TAKEN: &str = "Employee ID already registered";

// ============================================================================
// Refresh tokens
// ============================================================================

/// Refresh token row
///
/// Valid iff `!revoked && now < expires_at`. The raw token only ever lives
/// in the client's cookie; the row keeps its SHA-256 digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub revoked: bool,
}

impl RefreshToken {
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_valid(&self) -> bool {
        !self.revoked && !self.is_expired()
    }
}

/// Insert payload for a refresh token
#[derive(Debug, Clone)]
pub struct NewRefreshToken {
    pub user_id: i64,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Departments
// ============================================================================

/// Department with its derived staff count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: i64,
    pub name: String,
    pub division: String,
    pub total_staff: i64,
}

#[derive(Debug, Clone)]
pub struct NewDepartment {
    pub name: String,
    pub division: String,
}

// ============================================================================
// Training programs
// ============================================================================

/// The two program tables share one record shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    Course,
    TrainingPlan,
}

impl ProgramKind {
    /// Cache namespace and log label
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramKind::Course => "course",
            ProgramKind::TrainingPlan => "training-plan",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            ProgramKind::Course => "courses",
            ProgramKind::TrainingPlan => "training_plans",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProgramKind::Course => "Course",
            ProgramKind::TrainingPlan => "Training plan",
        }
    }
}

/// Delivery format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ProgramType {
    #[serde(rename = "In-house")]
    InHouse,
    #[serde(rename = "Public")]
    Public,
    #[serde(rename = "OJT")]
    OnTheJob,
    #[serde(rename = "Self-learning")]
    SelfLearning,
    #[serde(rename = "Online/Virtual")]
    Online,
}

impl ProgramType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgramType::InHouse => "In-house",
            ProgramType::Public => "Public",
            ProgramType::OnTheJob => "OJT",
            ProgramType::SelfLearning => "Self-learning",
            ProgramType::Online => "Online/Virtual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "In-house" => Some(ProgramType::InHouse),
            "Public" => Some(ProgramType::Public),
            "OJT" => Some(ProgramType::OnTheJob),
            "Self-learning" => Some(ProgramType::SelfLearning),
            "Online/Virtual" => Some(ProgramType::Online),
            _ => None,
        }
    }
}

/// Course or training plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker_institute: Option<String>,
    #[serde(rename = "type")]
    pub program_type: ProgramType,
    pub category: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub number_of_days: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_hours: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_code: Option<String>,
    pub number_of_person: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_per_person: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProgram {
    pub name: String,
    pub speaker_institute: Option<String>,
    pub program_type: ProgramType,
    pub category: String,
    pub date: NaiveDate,
    pub content: Option<String>,
    pub number_of_days: i32,
    pub number_of_hours: Option<i32>,
    pub location: Option<String>,
    pub total_cost: Option<i64>,
    pub budget_code: Option<String>,
    pub number_of_person: i32,
    pub cost_per_person: Option<i64>,
}

/// Partial update; `None` keeps the stored value
#[derive(Debug, Clone, Default)]
pub struct ProgramPatch {
    pub name: Option<String>,
    pub speaker_institute: Option<String>,
    pub program_type: Option<ProgramType>,
    pub category: Option<String>,
    pub date: Option<NaiveDate>,
    pub content: Option<String>,
    pub number_of_days: Option<i32>,
    pub number_of_hours: Option<i32>,
    pub location: Option<String>,
    pub total_cost: Option<i64>,
    pub budget_code: Option<String>,
    pub number_of_person: Option<i32>,
    pub cost_per_person: Option<i64>,
}

impl ProgramPatch {
    pub fn apply(self, program: &mut Program) {
        if let Some(v) = self.name {
            program.name = v;
        }
        if let Some(v) = self.speaker_institute {
            program.speaker_institute = Some(v);
        }
        if let Some(v) = self.program_type {
            program.program_type = v;
        }
        if let Some(v) = self.category {
            program.category = v;
        }
        if let Some(v) = self.date {
            program.date = v;
        }
        if let Some(v) = self.content {
            program.content = Some(v);
        }
        if let Some(v) = self.number_of_days {
            program.number_of_days = v;
        }
        if let Some(v) = self.number_of_hours {
            program.number_of_hours = Some(v);
        }
        if let Some(v) = self.location {
            program.location = Some(v);
        }
        if let Some(v) = self.total_cost {
            program.total_cost = Some(v);
        }
        if let Some(v) = self.budget_code {
            program.budget_code = Some(v);
        }
        if let Some(v) = self.number_of_person {
            program.number_of_person = v;
        }
        if let Some(v) = self.cost_per_person {
            program.cost_per_person = Some(v);
        }
        program.updated_at = Utc::now();
    }
}

// ============================================================================
// Certificates
// ============================================================================

/// Approval state of an uploaded certificate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum CertificateStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Pending => "Pending",
            CertificateStatus::Approved => "Approved",
            CertificateStatus::Rejected => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(CertificateStatus::Pending),
            "Approved" => Some(CertificateStatus::Approved),
            "Rejected" => Some(CertificateStatus::Rejected),
            _ => None,
        }
    }
}

/// Uploaded certificate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: i64,
    pub user_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    pub training_name: String,
    /// Storage locator of the uploaded file
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: CertificateStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCertificate {
    pub user_id: i64,
    pub training_name: String,
    pub image: String,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_role_wire_names() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"Hr(admin)\"");
        assert_eq!(
            serde_json::to_string(&Role::Manager).unwrap(),
            "\"DepartmentHead(manager)\""
        );
        assert_eq!(Role::parse("Staff"), Some(Role::Staff));
        assert_eq!(Role::parse("MANAGER"), Some(Role::Manager));
        assert_eq!(Role::parse("editor"), None);
    }

    #[test]
    fn test_refresh_token_validity() {
        let now = Utc::now();
        let mut token = RefreshToken {
            id: 1,
            user_id: 7,
            token_hash: "digest".to_string(),
            expires_at: now + Duration::days(7),
            created_at: now,
            revoked: false,
        };
        assert!(token.is_valid());

        token.expires_at = now;
        assert!(token.is_expired_at(now));
        assert!(!token.is_valid());

        token.expires_at = now + Duration::days(1);
        token.revoked = true;
        assert!(!token.is_valid());
    }

    #[test]
    fn test_user_profile_hides_password() {
        let now = Utc::now();
        let user = User {
            id: 3,
            department_id: 1,
            department: Some(DepartmentSummary {
                id: 1,
                name: "HR".to_string(),
            }),
            name: "Somchai".to_string(),
            email: "somchai@co.com".to_string(),
            employee_id: "E003".to_string(),
            phone: String::new(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Staff,
            status: UserStatus::Active,
            position: "Engineer".to_string(),
            created_by: CreatedBy::SelfRegistered,
            created_by_id: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["employeeID"], "E003");
        assert_eq!(json["createdBy"], "self");

        let profile = serde_json::to_value(user.to_profile()).unwrap();
        assert_eq!(profile["department"]["name"], "HR");
        assert_eq!(profile["role"], "Staff");
    }

    #[test]
    fn test_program_patch_keeps_unset_fields() {
        let now = Utc::now();
        let mut program = Program {
            id: 1,
            name: "Forklift safety".to_string(),
            speaker_institute: None,
            program_type: ProgramType::InHouse,
            category: "Safety".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            content: None,
            number_of_days: 1,
            number_of_hours: Some(6),
            location: None,
            total_cost: None,
            budget_code: None,
            number_of_person: 0,
            cost_per_person: None,
            created_at: now,
            updated_at: now,
        };

        ProgramPatch {
            name: Some("Forklift safety II".to_string()),
            number_of_days: Some(2),
            ..Default::default()
        }
        .apply(&mut program);

        assert_eq!(program.name, "Forklift safety II");
        assert_eq!(program.number_of_days, 2);
        assert_eq!(program.number_of_hours, Some(6));
        assert_eq!(program.program_type, ProgramType::InHouse);

        let json = serde_json::to_value(&program).unwrap();
        assert_eq!(json["type"], "In-house");
        assert_eq!(json["numberOfDays"], 2);
    }
}
