//! Accounts: self-registration, admin / manager provisioning and admin edits
//!
//! Duplicate emails and employee ids are checked up front for a precise
//! message; a concurrent insert that slips past the check still fails in the
//! store with the same message.

use std::sync::Arc;
use tms_core::{
    CreatedBy, DepartmentRepository, NewUser, PageRequest, Paginated, RefreshTokenRepository,
    Role, UserProfile, UserRepository, UserStatus, UserUpdate, EMAIL_TAKEN, EMPLOYEE_ID_TAKEN,
};

use super::departments::DepartmentService;
use crate::audit::{audit_log, AuditEvent, RequestContext};
use crate::auth::password::{hash_password_with_config, PasswordConfig};
use crate::error::AppError;

/// Account fields common to every creation path
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub employee_id: String,
    pub phone: String,
    pub position: String,
    pub password: String,
    pub department_id: i64,
    pub status: UserStatus,
}

impl NewAccount {
    fn has_required_fields(&self) -> bool {
        !(self.name.trim().is_empty()
            || self.email.trim().is_empty()
            || self.employee_id.trim().is_empty()
            || self.position.trim().is_empty()
            || self.password.is_empty()
            || self.department_id <= 0)
    }
}

fn required_fields_error() -> AppError {
    AppError::BadRequest("All required fields must be filled".to_string())
}

fn user_not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

#[derive(Clone)]
pub struct UserService {
    users: Arc<dyn UserRepository>,
    departments: Arc<dyn DepartmentRepository>,
    refresh_tokens: Arc<dyn RefreshTokenRepository>,
    department_cache: DepartmentService,
    password_config: PasswordConfig,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        departments: Arc<dyn DepartmentRepository>,
        refresh_tokens: Arc<dyn RefreshTokenRepository>,
        department_cache: DepartmentService,
        password_config: PasswordConfig,
    ) -> Self {
        Self {
            users,
            departments,
            refresh_tokens,
            department_cache,
            password_config,
        }
    }

    /// Public sign-up for the manager and staff roles
    pub async fn register(
        &self,
        mut account: NewAccount,
        confirm_password: &str,
        role: Role,
        ctx: &RequestContext,
    ) -> Result<UserProfile, AppError> {
        let email = account.email.clone();
        account.status = UserStatus::Active;

        let result = async {
            if role == Role::Admin {
                return Err(AppError::Forbidden(
                    "Administrators cannot self-register".to_string(),
                ));
            }
            if !account.has_required_fields() {
                return Err(required_fields_error());
            }
            if account.password != confirm_password {
                return Err(AppError::BadRequest("Passwords do not match".to_string()));
            }
            self.insert(account, role, CreatedBy::SelfRegistered, None).await
        }
        .await;

        match &result {
            Ok(profile) => audit_log(&AuditEvent::RegistrationSuccess {
                user_id: profile.id,
                email: profile.email.clone(),
                role: role.as_str().to_string(),
                ip_address: ctx.ip_address.clone(),
            }),
            Err(e) => audit_log(&AuditEvent::RegistrationFailure {
                email,
                reason: e.to_string(),
                ip_address: ctx.ip_address.clone(),
            }),
        }

        result
    }

    /// Admin provisioning: any role, any existing department
    pub async fn create_by_admin(
        &self,
        account: NewAccount,
        role: Role,
        admin_id: i64,
    ) -> Result<UserProfile, AppError> {
        if !account.has_required_fields() {
            return Err(required_fields_error());
        }
        self.insert(account, role, CreatedBy::Admin, Some(admin_id))
            .await
    }

    /// Manager provisioning: always Staff, always in the manager's department
    pub async fn create_by_manager(
        &self,
        mut account: NewAccount,
        manager_id: i64,
    ) -> Result<UserProfile, AppError> {
        let manager = self
            .users
            .find_by_id(manager_id)
            .await?
            .ok_or_else(user_not_found)?;

        account.department_id = manager.department_id;
        if !account.has_required_fields() {
            return Err(required_fields_error());
        }
        self.insert(account, Role::Staff, CreatedBy::Manager, Some(manager_id))
            .await
    }

    pub async fn get(&self, id: i64) -> Result<UserProfile, AppError> {
        let user = self.users.find_by_id(id).await?.ok_or_else(user_not_found)?;
        Ok(user.to_profile())
    }

    /// Admin edit. Deactivation or a role change ends every session of the
    /// account; access tokens already issued run out on their own.
    pub async fn update_by_admin(
        &self,
        id: i64,
        edit: UserUpdate,
        admin_id: i64,
    ) -> Result<UserProfile, AppError> {
        let edit = UserUpdate {
            name: edit.name.trim().to_string(),
            email: edit.email.trim().to_lowercase(),
            employee_id: edit.employee_id.trim().to_string(),
            position: edit.position.trim().to_string(),
            ..edit
        };
        if edit.name.is_empty()
            || edit.email.is_empty()
            || edit.employee_id.is_empty()
            || edit.position.is_empty()
            || edit.department_id <= 0
        {
            return Err(required_fields_error());
        }

        let before = self.users.find_by_id(id).await?.ok_or_else(user_not_found)?;
        if self.departments.find_by_id(edit.department_id).await?.is_none() {
            return Err(AppError::BadRequest(
                "Invalid department selected".to_string(),
            ));
        }

        let updated = self
            .users
            .update(id, edit)
            .await?
            .ok_or_else(user_not_found)?;
        self.department_cache.staff_changed().await;

        let reason = if updated.status != UserStatus::Active {
            Some("account deactivated")
        } else if updated.role != before.role {
            Some("role changed")
        } else {
            None
        };
        if let Some(reason) = reason {
            let revoked = self.refresh_tokens.revoke_all_for_user(id).await?;
            audit_log(&AuditEvent::SessionsRevoked {
                user_id: id,
                admin_id,
                reason: reason.to_string(),
                revoked,
            });
        }

        tracing::info!(user_id = id, admin_id, status = updated.status.as_str(), "User updated");
        Ok(updated.to_profile())
    }

    /// Remove the account; its sessions and certificate rows go with it
    pub async fn delete_by_admin(&self, id: i64, admin_id: i64) -> Result<(), AppError> {
        if !self.users.delete(id).await? {
            return Err(user_not_found());
        }
        self.department_cache.staff_changed().await;
        tracing::info!(user_id = id, admin_id, "User deleted");
        Ok(())
    }

    pub async fn list(&self, page: PageRequest) -> Result<Paginated<UserProfile>, AppError> {
        let (users, total) = self.users.list(page).await?;
        Ok(Paginated::new(users, total, page).map(|u| u.to_profile()))
    }

    /// Users sharing the manager's department
    pub async fn list_for_manager(
        &self,
        manager_id: i64,
        page: PageRequest,
    ) -> Result<Paginated<UserProfile>, AppError> {
        let manager = self
            .users
            .find_by_id(manager_id)
            .await?
            .ok_or_else(user_not_found)?;

        let (users, total) = self
            .users
            .list_by_department(manager.department_id, page)
            .await?;
        Ok(Paginated::new(users, total, page).map(|u| u.to_profile()))
    }

    async fn insert(
        &self,
        account: NewAccount,
        role: Role,
        created_by: CreatedBy,
        created_by_id: Option<i64>,
    ) -> Result<UserProfile, AppError> {
        let email = account.email.trim().to_lowercase();
        let employee_id = account.employee_id.trim().to_string();

        if self.users.exists_by_email(&email).await? {
            return Err(AppError::BadRequest(EMAIL_TAKEN.to_string()));
        }
        if self.users.exists_by_employee_id(&employee_id).await? {
            return Err(AppError::BadRequest(EMPLOYEE_ID_TAKEN.to_string()));
        }
        if self.departments.find_by_id(account.department_id).await?.is_none() {
            return Err(AppError::BadRequest(
                "Invalid department selected".to_string(),
            ));
        }

        let password_hash = hash_password_with_config(&account.password, &self.password_config)?;

        let user = self
            .users
            .create(NewUser {
                department_id: account.department_id,
                name: account.name.trim().to_string(),
                email,
                employee_id,
                phone: account.phone,
                password_hash,
                role,
                status: account.status,
                position: account.position.trim().to_string(),
                created_by,
                created_by_id,
            })
            .await?;

        self.department_cache.staff_changed().await;
        tracing::info!(user_id = user.id, role = %role, created_by = created_by.as_str(), "User created");

        Ok(user.to_profile())
    }
}
