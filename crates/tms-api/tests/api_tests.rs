//! API Integration Tests
//!
//! Every test drives the full router over the in-memory store and cache.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tms_api::auth::jwt::generate_access_token_at;
use tms_api::auth::{hash_token, PasswordConfig};
use tms_api::services::{ensure_admin, DEFAULT_SEED_PASSWORD, SEED_ADMIN_EMAIL};
use tms_api::{create_router_for_testing, create_test_app, TestApp};
use tms_core::{DepartmentRepository, NewDepartment, Role, UserRepository};
use tower::ServiceExt;

/// Helper to create a test request
fn create_json_request(
    method: &str,
    uri: &str,
    cookies: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(cookies) = cookies {
        builder = builder.header(header::COOKIE, cookies);
    }

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Value of a cookie set by `response`, if any
fn set_cookie(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(n, _)| *n == name)
        .map(|(_, value)| value.to_string())
}

struct Session {
    access: String,
    refresh: String,
}

impl Session {
    fn cookies(&self) -> String {
        format!("access_token={}; refresh_token={}", self.access, self.refresh)
    }

    fn refresh_cookie(&self) -> String {
        format!("refresh_token={}", self.refresh)
    }
}

async fn seed_admin(app: &TestApp) {
    ensure_admin(
        &app.state.repos.users,
        &app.state.repos.departments,
        DEFAULT_SEED_PASSWORD,
        &PasswordConfig::fast(),
    )
    .await
    .unwrap();
}

async fn login(app: &TestApp, role: &str, email: &str, password: &str) -> Response {
    send(
        &app.router,
        create_json_request(
            "POST",
            &format!("/api/v1/auth/{role}/login"),
            None,
            Some(json!({ "email": email, "password": password })),
        ),
    )
    .await
}

async fn login_session(app: &TestApp, role: &str, email: &str, password: &str) -> Session {
    let response = login(app, role, email, password).await;
    assert_eq!(response.status(), StatusCode::OK);
    Session {
        access: set_cookie(&response, "access_token").expect("access cookie"),
        refresh: set_cookie(&response, "refresh_token").expect("refresh cookie"),
    }
}

async fn admin_session(app: &TestApp) -> Session {
    seed_admin(app).await;
    login_session(app, "admin", SEED_ADMIN_EMAIL, DEFAULT_SEED_PASSWORD).await
}

fn registration(email: &str, employee_id: &str) -> Value {
    json!({
        "name": "Jane Doe",
        "employeeID": employee_id,
        "email": email,
        "departmentId": 1,
        "position": "Engineer",
        "phone": "555-0100",
        "password": "secret123",
        "confirmPassword": "secret123"
    })
}

async fn register_staff(app: &TestApp, email: &str, employee_id: &str) -> Response {
    send(
        &app.router,
        create_json_request(
            "POST",
            "/api/v1/auth/staff/register",
            None,
            Some(registration(email, employee_id)),
        ),
    )
    .await
}

async fn refresh(app: &TestApp, cookie: &str) -> Response {
    send(
        &app.router,
        create_json_request("POST", "/api/v1/auth/refresh", Some(cookie), None),
    )
    .await
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let response = send(&app, create_json_request("GET", "/health", None, None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_follows_store() {
    let app = create_test_app();

    let response = send(&app.router, create_json_request("GET", "/ready", None, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ready"], true);

    app.store.set_failing(true);
    let response = send(&app.router, create_json_request("GET", "/ready", None, None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = create_router_for_testing();

    send(&app, create_json_request("GET", "/health", None, None)).await;
    let response = send(&app, create_json_request("GET", "/metrics", None, None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("tms_http_requests_total"));
    assert!(text.contains("tms_cache_hits"));
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = create_router_for_testing();

    let response = send(&app, create_json_request("GET", "/health", None, None)).await;

    assert_eq!(
        response.headers().get("x-content-type-options").unwrap(),
        "nosniff"
    );
    assert!(response.headers().get("strict-transport-security").is_none());
}

// =============================================================================
// Session Lifecycle Tests
// =============================================================================

#[tokio::test]
async fn test_login_sets_cookies_and_me_works() {
    let app = create_test_app();
    seed_admin(&app).await;

    let response = login(&app, "admin", SEED_ADMIN_EMAIL, DEFAULT_SEED_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);

    let access = set_cookie(&response, "access_token").unwrap();
    assert!(set_cookie(&response, "refresh_token").is_some());
    let json = body_json(response).await;
    assert_eq!(json["message"], "Login successful");
    assert_eq!(json["user"]["email"], SEED_ADMIN_EMAIL);
    assert_eq!(json["user"]["role"], "Hr(admin)");
    assert!(json["user"].get("passwordHash").is_none());

    let me = send(
        &app.router,
        create_json_request(
            "GET",
            "/api/v1/auth/me",
            Some(&format!("access_token={access}")),
            None,
        ),
    )
    .await;
    assert_eq!(me.status(), StatusCode::OK);
    assert_eq!(body_json(me).await["email"], SEED_ADMIN_EMAIL);
}

#[tokio::test]
async fn test_bearer_header_accepted() {
    let app = create_test_app();
    let session = admin_session(&app).await;

    let request = Request::builder()
        .uri("/api/v1/auth/me")
        .header(header::AUTHORIZATION, format!("Bearer {}", session.access))
        .body(Body::empty())
        .unwrap();
    let response = send(&app.router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_wrong_role_matches_wrong_password() {
    let app = create_test_app();
    seed_admin(&app).await;

    let wrong_role = login(&app, "staff", SEED_ADMIN_EMAIL, DEFAULT_SEED_PASSWORD).await;
    let wrong_password = login(&app, "admin", SEED_ADMIN_EMAIL, "not-the-password").await;
    let unknown = login(&app, "admin", "nobody@company.com", DEFAULT_SEED_PASSWORD).await;

    assert_eq!(wrong_role.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);

    let a = body_json(wrong_role).await;
    let b = body_json(wrong_password).await;
    let c = body_json(unknown).await;
    assert_eq!(a, b);
    assert_eq!(b, c);
    assert_eq!(a["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_login_rejects_malformed_email() {
    let app = create_test_app();

    let response = login(&app, "admin", "not-an-email", "whatever").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_login_keeps_single_live_refresh_token() {
    let app = create_test_app();
    seed_admin(&app).await;

    let first = login_session(&app, "admin", SEED_ADMIN_EMAIL, DEFAULT_SEED_PASSWORD).await;
    let _second = login_session(&app, "admin", SEED_ADMIN_EMAIL, DEFAULT_SEED_PASSWORD).await;

    let admin = app
        .state
        .repos
        .users
        .find_by_email_and_role(SEED_ADMIN_EMAIL, Role::Admin)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(app.store.live_token_count(admin.id).await, 1);

    // The first session's refresh token died with the second login
    let response = refresh(&app, &first.refresh_cookie()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rotates_and_rejects_reuse() {
    let app = create_test_app();
    let session = admin_session(&app).await;

    let response = refresh(&app, &session.refresh_cookie()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = set_cookie(&response, "refresh_token").unwrap();
    assert_ne!(rotated, session.refresh);
    assert!(body_json(response).await["accessToken"].is_string());

    // Replaying the consumed token fails and clears both cookies
    let replay = refresh(&app, &session.refresh_cookie()).await;
    assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(set_cookie(&replay, "refresh_token").as_deref(), Some(""));
    assert_eq!(set_cookie(&replay, "access_token").as_deref(), Some(""));

    // The rotated token is still good
    let response = refresh(&app, &format!("refresh_token={rotated}")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_concurrent_refresh_has_one_winner() {
    let app = create_test_app();
    let session = admin_session(&app).await;
    let cookie = session.refresh_cookie();

    let (a, b) = tokio::join!(refresh(&app, &cookie), refresh(&app, &cookie));

    let mut statuses = [a.status(), b.status()];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::UNAUTHORIZED]);
}

#[tokio::test]
async fn test_expired_refresh_token_rejected() {
    let app = create_test_app();
    let session = admin_session(&app).await;

    let expired = chrono::Utc::now() - chrono::Duration::days(1);
    assert!(
        app.store
            .set_token_expiry(&hash_token(&session.refresh), expired)
            .await
    );

    let response = refresh(&app, &session.refresh_cookie()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookie(&response, "refresh_token").is_some_and(|v| v.is_empty()));
}

#[tokio::test]
async fn test_refresh_without_cookie() {
    let app = create_test_app();

    let response = send(
        &app.router,
        create_json_request("POST", "/api/v1/auth/refresh", None, None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let app = create_test_app();
    let session = admin_session(&app).await;

    for cookie in [Some(session.cookies()), Some(session.cookies()), None] {
        let response = send(
            &app.router,
            create_json_request("POST", "/api/v1/auth/logout", cookie.as_deref(), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(set_cookie(&response, "access_token").as_deref(), Some(""));
        assert_eq!(
            body_json(response).await["message"],
            "Logged out successfully"
        );
    }

    // The revoked refresh token no longer works
    let response = refresh(&app, &session.refresh_cookie()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Authorization Gate Tests
// =============================================================================

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = create_router_for_testing();

    let response = send(
        &app,
        create_json_request("GET", "/api/v1/admin/healthchecker", None, None),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Authentication required");
}

#[tokio::test]
async fn test_expired_access_token_is_unauthorized() {
    let app = create_test_app();
    seed_admin(&app).await;

    let issued_at = chrono::Utc::now().timestamp() - 2 * 60 * 60;
    let token = generate_access_token_at(&app.state.jwt_config, 1, Role::Admin, issued_at).unwrap();

    let response = send(
        &app.router,
        create_json_request(
            "GET",
            "/api/v1/admin/healthchecker",
            Some(&format!("access_token={token}")),
            None,
        ),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_gate() {
    let app = create_test_app();
    let admin = admin_session(&app).await;

    let response = send(
        &app.router,
        create_json_request(
            "GET",
            "/api/v1/admin/healthchecker",
            Some(&admin.cookies()),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "Training Plan API is running"
    );

    assert_eq!(
        register_staff(&app, "jane@company.com", "EMP100").await.status(),
        StatusCode::CREATED
    );
    let staff = login_session(&app, "staff", "jane@company.com", "secret123").await;

    let response = send(
        &app.router,
        create_json_request(
            "GET",
            "/api/v1/admin/departments",
            Some(&staff.cookies()),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app.router,
        create_json_request(
            "GET",
            "/api/v1/staff/healthchecker",
            Some(&staff.cookies()),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Registration Tests
// =============================================================================

#[tokio::test]
async fn test_registration_errors() {
    let app = create_test_app();
    seed_admin(&app).await;

    let mut mismatch = registration("a@company.com", "EMP1");
    mismatch["confirmPassword"] = json!("different");
    let response = send(
        &app.router,
        create_json_request("POST", "/api/v1/auth/staff/register", None, Some(mismatch)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Passwords do not match");

    let response = send(
        &app.router,
        create_json_request(
            "POST",
            "/api/v1/auth/manager/register",
            None,
            Some(json!({ "email": "b@company.com" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "All required fields must be filled"
    );

    assert_eq!(
        register_staff(&app, "c@company.com", "EMP3").await.status(),
        StatusCode::CREATED
    );
    let duplicate = register_staff(&app, "C@company.com", "EMP4").await;
    assert_eq!(duplicate.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(duplicate).await["message"], "Email already registered");

    let mut bad_department = registration("d@company.com", "EMP5");
    bad_department["departmentId"] = json!(999);
    let response = send(
        &app.router,
        create_json_request("POST", "/api/v1/auth/staff/register", None, Some(bad_department)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "Invalid department selected"
    );
}

// =============================================================================
// User Administration Tests
// =============================================================================

fn user_edit(email: &str, employee_id: &str, status: &str) -> Value {
    json!({
        "name": "Jane Doe",
        "employeeID": employee_id,
        "email": email,
        "phone": "555-0100",
        "departmentId": 1,
        "role": "Staff",
        "position": "Engineer",
        "status": status
    })
}

async fn admin_user_request(
    app: &TestApp,
    admin: &Session,
    method: &str,
    id: i64,
    body: Option<Value>,
) -> Response {
    send(
        &app.router,
        create_json_request(
            method,
            &format!("/api/v1/admin/users/{id}"),
            Some(&admin.cookies()),
            body,
        ),
    )
    .await
}

#[tokio::test]
async fn test_deactivated_user_loses_access() {
    let app = create_test_app();
    let admin = admin_session(&app).await;

    let registered = register_staff(&app, "jane@company.com", "EMP1").await;
    assert_eq!(registered.status(), StatusCode::CREATED);
    let user_id = body_json(registered).await["user"]["id"].as_i64().unwrap();
    let staff = login_session(&app, "staff", "jane@company.com", "secret123").await;

    let response = admin_user_request(&app, &admin, "GET", user_id, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "Active");

    let response = admin_user_request(
        &app,
        &admin,
        "PUT",
        user_id,
        Some(user_edit("jane@company.com", "EMP1", "Inactive")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "Inactive");

    let response = refresh(&app, &staff.refresh_cookie()).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = login(&app, "staff", "jane@company.com", "secret123").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Invalid credentials");

    // Reactivation lets the user back in
    let response = admin_user_request(
        &app,
        &admin,
        "PUT",
        user_id,
        Some(user_edit("jane@company.com", "EMP1", "Active")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    login_session(&app, "staff", "jane@company.com", "secret123").await;
}

#[tokio::test]
async fn test_admin_create_with_status_then_delete() {
    let app = create_test_app();
    let admin = admin_session(&app).await;

    let mut body = registration("idle@company.com", "EMP2");
    body["status"] = json!("Inactive");
    let response = send(
        &app.router,
        create_json_request("POST", "/api/v1/admin/users", Some(&admin.cookies()), Some(body)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["status"], "Inactive");
    let user_id = created["id"].as_i64().unwrap();

    let response = login(&app, "staff", "idle@company.com", "secret123").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = admin_user_request(&app, &admin, "DELETE", user_id, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "User deleted");

    let response = admin_user_request(&app, &admin, "GET", user_id, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = admin_user_request(&app, &admin, "DELETE", user_id, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_update_rejects_taken_email() {
    let app = create_test_app();
    let admin = admin_session(&app).await;
    register_staff(&app, "first@company.com", "EMP1").await;
    let second = register_staff(&app, "second@company.com", "EMP2").await;
    let second_id = body_json(second).await["user"]["id"].as_i64().unwrap();

    let response = admin_user_request(
        &app,
        &admin,
        "PUT",
        second_id,
        Some(user_edit("first@company.com", "EMP2", "Active")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Email already registered");

    let response = admin_user_request(
        &app,
        &admin,
        "PUT",
        second_id,
        Some(user_edit("second@company.com", "EMP2", "Retired")),
    )
    .await;
    assert!(response.status().is_client_error());
}

// =============================================================================
// Cached CRUD Tests
// =============================================================================

async fn list_departments(app: &TestApp, session: &Session) -> Value {
    let response = send(
        &app.router,
        create_json_request(
            "GET",
            "/api/v1/admin/departments",
            Some(&session.cookies()),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn test_create_department_then_list() {
    let app = create_test_app();
    let admin = admin_session(&app).await;

    let response = send(
        &app.router,
        create_json_request(
            "POST",
            "/api/v1/admin/departments",
            Some(&admin.cookies()),
            Some(json!({ "name": "HR", "division": "Corporate" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["name"], "HR");
    assert_eq!(created["totalStaff"], 0);

    let listing = list_departments(&app, &admin).await;
    let names: Vec<&str> = listing["items"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["name"].as_str())
        .collect();
    assert!(names.contains(&"HR"));
    assert_eq!(listing["meta"]["totalItems"], 2);
}

#[tokio::test]
async fn test_listing_served_from_cache_until_write() {
    let app = create_test_app();
    let admin = admin_session(&app).await;

    assert_eq!(list_departments(&app, &admin).await["meta"]["totalItems"], 1);

    // A row written behind the service's back stays invisible while cached
    DepartmentRepository::create(
        app.store.as_ref(),
        NewDepartment {
            name: "Sentinel".to_string(),
            division: "Hidden".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(list_departments(&app, &admin).await["meta"]["totalItems"], 1);

    // A write through the API invalidates the namespace
    let response = send(
        &app.router,
        create_json_request(
            "POST",
            "/api/v1/admin/departments",
            Some(&admin.cookies()),
            Some(json!({ "name": "Finance", "division": "Corporate" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(list_departments(&app, &admin).await["meta"]["totalItems"], 3);
}

#[tokio::test]
async fn test_cache_failure_degrades_to_store() {
    let app = create_test_app();
    let admin = admin_session(&app).await;

    app.cache.set_failing(true);

    assert_eq!(list_departments(&app, &admin).await["meta"]["totalItems"], 1);
    let response = send(
        &app.router,
        create_json_request(
            "POST",
            "/api/v1/admin/departments",
            Some(&admin.cookies()),
            Some(json!({ "name": "Finance", "division": "Corporate" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(list_departments(&app, &admin).await["meta"]["totalItems"], 2);
}

#[tokio::test]
async fn test_department_not_found_and_validation() {
    let app = create_test_app();
    let admin = admin_session(&app).await;

    let response = send(
        &app.router,
        create_json_request(
            "GET",
            "/api/v1/admin/departments/999",
            Some(&admin.cookies()),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app.router,
        create_json_request(
            "POST",
            "/api/v1/admin/departments",
            Some(&admin.cookies()),
            Some(json!({ "name": "X", "division": "" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_course_crud_and_read_only_for_staff() {
    let app = create_test_app();
    let admin = admin_session(&app).await;

    let response = send(
        &app.router,
        create_json_request(
            "POST",
            "/api/v1/admin/courses",
            Some(&admin.cookies()),
            Some(json!({
                "name": "Rust Basics",
                "type": "In-house",
                "category": "Technical",
                "date": "2026-03-01",
                "numberOfDays": 2,
                "numberOfPerson": 10
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let course = body_json(response).await;
    let id = course["id"].as_i64().unwrap();

    let response = send(
        &app.router,
        create_json_request(
            "PUT",
            &format!("/api/v1/admin/courses/{id}"),
            Some(&admin.cookies()),
            Some(json!({ "location": "Room 4" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["location"], "Room 4");
    assert_eq!(updated["name"], "Rust Basics");

    // Training plans are a separate namespace
    let response = send(
        &app.router,
        create_json_request(
            "GET",
            &format!("/api/v1/admin/training-plans/{id}"),
            Some(&admin.cookies()),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    register_staff(&app, "jane@company.com", "EMP100").await;
    let staff = login_session(&app, "staff", "jane@company.com", "secret123").await;

    let response = send(
        &app.router,
        create_json_request(
            "GET",
            "/api/v1/staff/courses",
            Some(&staff.cookies()),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["items"][0]["location"], "Room 4");

    let response = send(
        &app.router,
        create_json_request(
            "DELETE",
            &format!("/api/v1/staff/courses/{id}"),
            Some(&staff.cookies()),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// =============================================================================
// Certificate Tests
// =============================================================================

fn multipart_upload(cookies: &str, training_name: &str, content_type: &str) -> Request<Body> {
    let boundary = "tms-test-boundary";
    let body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"trainingName\"\r\n\r\n\
         {training_name}\r\n\
         --{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"cert.png\"\r\n\
         Content-Type: {content_type}\r\n\r\n\
         not-really-a-png\r\n\
         --{boundary}--\r\n"
    );

    Request::builder()
        .method("POST")
        .uri("/api/v1/staff/certificates")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .header(header::COOKIE, cookies)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_certificate_upload_and_approval() {
    let app = create_test_app();
    let admin = admin_session(&app).await;
    register_staff(&app, "jane@company.com", "EMP100").await;
    let staff = login_session(&app, "staff", "jane@company.com", "secret123").await;

    let response = send(
        &app.router,
        multipart_upload(&staff.cookies(), "First Aid", "image/png"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let certificate = body_json(response).await;
    assert_eq!(certificate["status"], "Pending");
    assert_eq!(certificate["trainingName"], "First Aid");
    let id = certificate["id"].as_i64().unwrap();

    let response = send(
        &app.router,
        create_json_request(
            "GET",
            "/api/v1/admin/certificates",
            Some(&admin.cookies()),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["meta"]["totalItems"], 1);

    let response = send(
        &app.router,
        create_json_request(
            "PUT",
            &format!("/api/v1/admin/certificates/{id}/approve"),
            Some(&admin.cookies()),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "Approved");

    let response = send(
        &app.router,
        create_json_request(
            "GET",
            "/api/v1/staff/certificates",
            Some(&staff.cookies()),
            None,
        ),
    )
    .await;
    assert_eq!(body_json(response).await[0]["status"], "Approved");
}

#[tokio::test]
async fn test_certificate_rejects_unsupported_type() {
    let app = create_test_app();
    seed_admin(&app).await;
    register_staff(&app, "jane@company.com", "EMP100").await;
    let staff = login_session(&app, "staff", "jane@company.com", "secret123").await;

    let response = send(
        &app.router,
        multipart_upload(&staff.cookies(), "First Aid", "text/plain"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
