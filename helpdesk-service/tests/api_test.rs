mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::{test_app, TestApp};
use helpdesk_service::build_router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn router(app: &TestApp) -> Router {
    build_router(app.state.clone()).unwrap()
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(router: &Router, company: &str, email: &str) -> String {
    let (status, body) = send(
        router,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "company_name": company,
            "name": "Owner",
            "email": email,
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["user"]["role"], "MANAGER");
    body["access_token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = test_app();
    let (status, body) = send(&router(&app), Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_register_then_login() {
    let app = test_app();
    let router = router(&app);
    register(&router, "Acme", "alice@acme.com").await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "alice@acme.com", "password": "password123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["email"], "alice@acme.com");

    let (status, body) = send(
        &router,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "alice@acme.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, body) = send(
        &router,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "company_name": "Acme Again",
            "email": "ALICE@acme.com",
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "email_already_exists");
}

#[tokio::test]
async fn test_protected_routes_require_a_token() {
    let app = test_app();
    let router = router(&app);

    let (status, body) = send(&router, Method::GET, "/tickets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthenticated");

    let (status, _) = send(&router, Method::GET, "/users", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ticket_routes_map_policy_outcomes() {
    let app = test_app();
    let router = router(&app);
    let alice = register(&router, "Acme", "alice@acme.com").await;
    let mallory = register(&router, "Globex", "mallory@globex.com").await;

    let (status, ticket) = send(
        &router,
        Method::POST,
        "/tickets",
        Some(&alice),
        Some(json!({
            "title": "Login broken",
            "description": "500 on submit",
            "priority": "HIGH",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ticket["status"], "OPEN");
    let id = ticket["id"].as_str().unwrap();

    let (status, body) = send(
        &router,
        Method::GET,
        &format!("/tickets/{}", id),
        Some(&mallory),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = send(
        &router,
        Method::PATCH,
        &format!("/tickets/{}/status", id),
        Some(&alice),
        Some(json!({ "status": "RESOLVED" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_status");

    let (status, body) = send(
        &router,
        Method::PATCH,
        &format!("/tickets/{}/status", id),
        Some(&alice),
        Some(json!({ "status": "IN_PROGRESS" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "IN_PROGRESS");

    let (status, page) = send(
        &router,
        Method::GET,
        "/tickets?status=IN_PROGRESS&page_size=5",
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["page_size"], 5);

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("/tickets/{}/comments", id),
        Some(&alice),
        Some(json!({ "content": "On it", "parent_id": uuid::Uuid::new_v4() })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_parent");

    let (status, _) = send(
        &router,
        Method::DELETE,
        &format!("/tickets/{}", id),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_invitation_round_trip_over_http() {
    let app = test_app();
    let router = router(&app);
    let alice = register(&router, "Acme", "alice@acme.com").await;

    let (status, invitation) = send(
        &router,
        Method::POST,
        "/invitations",
        Some(&alice),
        Some(json!({ "email": "dave@acme.com", "role": "DEVELOPER" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = invitation["token"].as_str().unwrap().to_string();
    assert_eq!(app.notifier.last().map(|e| e.token), Some(token.clone()));

    let (status, body) = send(
        &router,
        Method::POST,
        "/invitations",
        Some(&alice),
        Some(json!({ "email": "dave@acme.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "pending_invitation_exists");

    let (status, details) = send(
        &router,
        Method::GET,
        &format!("/invitations/validate?token={}", token),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["organization"]["name"], "Acme");

    let accept = json!({
        "token": token,
        "email": "dave@acme.com",
        "name": "Dave",
        "password": "password123",
    });
    let (status, session) = send(
        &router,
        Method::POST,
        "/invitations/accept",
        None,
        Some(accept.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["user"]["role"], "DEVELOPER");

    let dave = session["access_token"].as_str().unwrap().to_string();
    let (status, users) = send(&router, Method::GET, "/users", Some(&dave), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().map(Vec::len), Some(2));

    let (status, body) = send(
        &router,
        Method::POST,
        "/invitations",
        Some(&dave),
        Some(json!({ "email": "erin@acme.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_manager");

    let (status, body) = send(&router, Method::POST, "/invitations/accept", None, Some(accept))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "already_accepted");
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let app = test_app();
    let router = router(&app);

    let (status, _) = send(
        &router,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({
            "company_name": "Acme",
            "email": "not-an-email",
            "password": "password123",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(
        &router,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "alice@acme.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
