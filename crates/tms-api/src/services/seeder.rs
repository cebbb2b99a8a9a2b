//! Bootstrap administrator account

use std::sync::Arc;
use tms_core::{
    CreatedBy, DepartmentRepository, NewDepartment, NewUser, Role, UserRepository, UserStatus,
};

use crate::auth::password::{hash_password_with_config, PasswordConfig};
use crate::error::AppError;

pub const SEED_ADMIN_EMAIL: &str = "admin@company.com";
pub const SEED_ADMIN_EMPLOYEE_ID: &str = "ADMIN001";
pub const DEFAULT_SEED_PASSWORD: &str = "admin123";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Created { user_id: i64 },
    AlreadyPresent,
}

/// Create the system administrator unless an admin already exists
pub async fn ensure_admin(
    users: &Arc<dyn UserRepository>,
    departments: &Arc<dyn DepartmentRepository>,
    password: &str,
    password_config: &PasswordConfig,
) -> Result<SeedOutcome, AppError> {
    if users.exists_with_role(Role::Admin).await? {
        tracing::info!("Admin account already present, skipping seed");
        return Ok(SeedOutcome::AlreadyPresent);
    }

    let department_id = match departments.find_by_id(1).await? {
        Some(department) => department.id,
        None => {
            departments
                .create(NewDepartment {
                    name: "Human Resources".to_string(),
                    division: "Corporate".to_string(),
                })
                .await?
                .id
        }
    };

    let admin = users
        .create(NewUser {
            department_id,
            name: "System Admin".to_string(),
            email: SEED_ADMIN_EMAIL.to_string(),
            employee_id: SEED_ADMIN_EMPLOYEE_ID.to_string(),
            phone: String::new(),
            password_hash: hash_password_with_config(password, password_config)?,
            role: Role::Admin,
            status: UserStatus::Active,
            position: "HR Administrator".to_string(),
            created_by: CreatedBy::SelfRegistered,
            created_by_id: None,
        })
        .await?;

    tracing::info!(user_id = admin.id, email = SEED_ADMIN_EMAIL, "Seeded admin account");
    Ok(SeedOutcome::Created { user_id: admin.id })
}
