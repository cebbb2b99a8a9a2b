//! API route definitions

use crate::auth::{auth_middleware, require_any_role};
use crate::handlers::{auth, certificates, departments, health, programs, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post, put},
    Extension, Router,
};
use std::sync::Arc;
use tms_core::{ProgramKind, Role};

/// Full CRUD over one program kind
fn program_admin_routes(kind: ProgramKind) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/",
            get(programs::list_programs).post(programs::create_program),
        )
        .route(
            "/:id",
            get(programs::get_program)
                .put(programs::update_program)
                .delete(programs::delete_program),
        )
        .layer(Extension(kind))
}

fn program_read_routes(kind: ProgramKind) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(programs::list_programs))
        .route("/:id", get(programs::get_program))
        .layer(Extension(kind))
}

/// Create API v1 routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/auth/admin/login", post(auth::admin_login_handler))
        .route("/auth/manager/login", post(auth::manager_login_handler))
        .route("/auth/staff/login", post(auth::staff_login_handler))
        .route("/auth/manager/register", post(auth::manager_register_handler))
        .route("/auth/staff/register", post(auth::staff_register_handler))
        .route("/auth/refresh", post(auth::refresh_handler))
        .route("/auth/logout", post(auth::logout_handler));

    let session_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/healthchecker", get(health::healthchecker))
        .route(
            "/departments",
            get(departments::list_departments).post(departments::create_department),
        )
        .route(
            "/departments/:id",
            get(departments::get_department)
                .put(departments::update_department)
                .delete(departments::delete_department),
        )
        .route(
            "/users",
            get(users::admin_list_users).post(users::admin_create_user),
        )
        .route(
            "/users/:id",
            get(users::admin_get_user)
                .put(users::admin_update_user)
                .delete(users::admin_delete_user),
        )
        .route(
            "/certificates",
            get(certificates::list_pending_certificates),
        )
        .route(
            "/certificates/:id/approve",
            put(certificates::approve_certificate),
        )
        .route(
            "/certificates/:id/reject",
            put(certificates::reject_certificate),
        )
        .nest("/courses", program_admin_routes(ProgramKind::Course))
        .nest(
            "/training-plans",
            program_admin_routes(ProgramKind::TrainingPlan),
        )
        .route_layer(middleware::from_fn(require_any_role(&[Role::Admin])))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let manager_routes = Router::new()
        .route("/healthchecker", get(health::healthchecker))
        .route(
            "/users",
            get(users::manager_list_users).post(users::manager_create_user),
        )
        .nest("/courses", program_read_routes(ProgramKind::Course))
        .nest(
            "/training-plans",
            program_read_routes(ProgramKind::TrainingPlan),
        )
        .route_layer(middleware::from_fn(require_any_role(&[Role::Manager])))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let staff_routes = Router::new()
        .route("/healthchecker", get(health::healthchecker))
        .route(
            "/certificates",
            get(certificates::list_own_certificates).post(certificates::upload_certificate),
        )
        .route(
            "/certificates/:id",
            axum::routing::delete(certificates::delete_own_certificate),
        )
        .nest("/courses", program_read_routes(ProgramKind::Course))
        .nest(
            "/training-plans",
            program_read_routes(ProgramKind::TrainingPlan),
        )
        .route_layer(middleware::from_fn(require_any_role(&[Role::Staff])))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .nest("/admin", admin_routes)
        .nest("/manager", manager_routes)
        .nest("/staff", staff_routes)
}
