//! API integration tests.

use axum::Router;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

mod common;
use common::{TEST_LOCKOUT_THRESHOLD, test_app, test_app_with_mailbox, test_app_with_token, test_app_with_user_token};

/// Build a request with an optional bearer token and JSON body.
fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri).method(method);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&value).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Fire a request against the app and decode the response body as JSON.
async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn register_body(email: &str, nickname: &str) -> Value {
    json!({
        "email": email,
        "password": "Secret*123",
        "nickname": nickname,
    })
}

/// Test that health endpoint works without authentication.
#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app().await;

    let (status, body) = send(&app, request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_first_registration_becomes_admin() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/auth/register",
            None,
            Some(register_body("first@example.com", "firstuser")),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["email"], "first@example.com");
    assert_eq!(body["role"], "ADMIN");
    assert_eq!(body["nickname"], "firstuser");
    // The admin projection never carries credentials or URL fields.
    assert!(body.get("password_hash").is_none());
    assert!(body.get("profile_picture_url").is_none());
}

#[tokio::test]
async fn test_registration_validation_and_conflicts() {
    let app = test_app().await;

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/auth/register",
            None,
            Some(register_body("dup@example.com", "dupuser")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Same email again is a conflict.
    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/auth/register",
            None,
            Some(register_body("dup@example.com", "othernick")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    // Malformed email.
    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/auth/register",
            None,
            Some(register_body("not-an-email", "nickname1")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Short password.
    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"email": "short@example.com", "password": "tiny"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_login_success_and_rejection() {
    let app = test_app().await;

    // First user is auto-verified and can log in immediately.
    send(
        &app,
        request(
            Method::POST,
            "/auth/register",
            None,
            Some(register_body("login@example.com", "loginuser")),
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "login@example.com", "password": "Secret*123"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
    assert_eq!(body["token_type"], "bearer");

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "login@example.com", "password": "wrong"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "ghost@example.com", "password": "Secret*123"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_email_verification_flow() {
    let (app, mailbox) = test_app_with_mailbox().await;

    // Claim the admin seat so the next registration needs verification.
    send(
        &app,
        request(
            Method::POST,
            "/auth/register",
            None,
            Some(register_body("admin@example.com", "adminuser")),
        ),
    )
    .await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/auth/register",
            None,
            Some(register_body("pending@example.com", "pendinguser")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["role"], "ANONYMOUS");

    // Unverified accounts cannot log in yet.
    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "pending@example.com", "password": "Secret*123"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // The verification email went out exactly once for the pending user.
    let sent = mailbox.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "pending@example.com");

    // A wrong token is rejected.
    let bad_uri = format!("/auth/verify-email/{}/definitely-wrong", sent[0].user_id);
    let (status, _) = send(&app, request(Method::GET, &bad_uri, None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // The mailed token verifies the address.
    let uri = format!("/auth/verify-email/{}/{}", sent[0].user_id, sent[0].token);
    let (status, body) = send(&app, request(Method::GET, &uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Email verified successfully");

    // The token is single-use.
    let (status, _) = send(&app, request(Method::GET, &uri, None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // And the account can now log in.
    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "pending@example.com", "password": "Secret*123"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_account_lockout() {
    let app = test_app().await;

    send(
        &app,
        request(
            Method::POST,
            "/auth/register",
            None,
            Some(register_body("lock@example.com", "lockeduser")),
        ),
    )
    .await;

    for _ in 0..TEST_LOCKOUT_THRESHOLD {
        let (status, _) = send(
            &app,
            request(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({"email": "lock@example.com", "password": "wrong"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // Locked accounts are refused even with the right password.
    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "lock@example.com", "password": "Secret*123"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("locked"));
}

#[tokio::test]
async fn test_user_management_requires_elevated_role() {
    let app = test_app().await;

    let (status, _) = send(&app, request(Method::GET, "/users", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        request(Method::GET, "/users", Some("not-a-real-token"), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // An authenticated but non-elevated user is forbidden.
    let (app, user_token) = test_app_with_user_token().await;
    let (status, _) = send(&app, request(Method::GET, "/users", Some(&user_token), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/users",
            Some(&user_token),
            Some(register_body("sneak@example.com", "sneakuser")),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_crud_roundtrip() {
    let (app, token) = test_app_with_token().await;

    // Create
    let (status, created) = send(
        &app,
        request(
            Method::POST,
            "/users",
            Some(&token),
            Some(json!({
                "email": "crud@example.com",
                "password": "Secret*123",
                "nickname": "cruduser",
                "first_name": "Cru",
                "last_name": "Dee",
                "role": "MANAGER",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["role"], "MANAGER");
    let id = created["id"].as_str().unwrap().to_string();

    // Read
    let (status, fetched) = send(
        &app,
        request(Method::GET, &format!("/users/{}", id), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["email"], "crud@example.com");
    assert_eq!(fetched["first_name"], "Cru");

    // Update
    let (status, updated) = send(
        &app,
        request(
            Method::PUT,
            &format!("/users/{}", id),
            Some(&token),
            Some(json!({"bio": "updated bio", "last_name": "Dactyl"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["bio"], "updated bio");
    assert_eq!(updated["last_name"], "Dactyl");

    // Delete
    let (status, _) = send(
        &app,
        request(Method::DELETE, &format!("/users/{}", id), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        request(Method::GET, &format!("/users/{}", id), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_listing_pagination() {
    let (app, token) = test_app_with_token().await;

    for n in 0..4 {
        send(
            &app,
            request(
                Method::POST,
                "/users",
                Some(&token),
                Some(register_body(
                    &format!("listed{}@example.com", n),
                    &format!("listed{}", n),
                )),
            ),
        )
        .await;
    }

    // 4 created plus the seeded admin.
    let (status, body) = send(
        &app,
        request(Method::GET, "/users?page=1&size=3", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 5);
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["size"], 3);

    let (status, body) = send(
        &app,
        request(Method::GET, "/users?page=0&size=3", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_public_search_filters() {
    let (app, token) = test_app_with_token().await;

    send(
        &app,
        request(
            Method::POST,
            "/users",
            Some(&token),
            Some(json!({
                "email": "john@example.com",
                "password": "Secret*123",
                "nickname": "johnalpha",
                "first_name": "John",
                "last_name": "Alpha",
                "bio": "python dev",
                "role": "AUTHENTICATED",
            })),
        ),
    )
    .await;
    send(
        &app,
        request(
            Method::POST,
            "/users",
            Some(&token),
            Some(json!({
                "email": "jane@example.com",
                "password": "Secret*123",
                "nickname": "janebeta",
                "first_name": "Jane",
                "last_name": "Beta",
                "bio": "golang dev",
                "role": "AUTHENTICATED",
            })),
        ),
    )
    .await;

    // Free text matches bios, without auth.
    let (status, body) = send(&app, request(Method::GET, "/users/search?q=python", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    let emails: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["email"].as_str().unwrap())
        .collect();
    assert_eq!(emails, vec!["john@example.com"]);

    // Role filter returns only matching roles.
    let (status, body) = send(&app, request(Method::GET, "/users/search?role=ADMIN", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    for item in body["items"].as_array().unwrap() {
        assert_eq!(item["role"], "ADMIN");
    }

    // Role and free text combine with AND.
    let (_, body) = send(
        &app,
        request(
            Method::GET,
            "/users/search?q=python&role=AUTHENTICATED",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(body["total"], 1);

    let (_, body) = send(
        &app,
        request(Method::GET, "/users/search?q=python&role=ADMIN", None, None),
    )
    .await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn test_public_search_pagination_is_stable() {
    let (app, token) = test_app_with_token().await;

    // Admin-created users default to ANONYMOUS, so filtering on that role
    // excludes the seeded admin and leaves exactly 15 records.
    for n in 0..15 {
        send(
            &app,
            request(
                Method::POST,
                "/users",
                Some(&token),
                Some(register_body(
                    &format!("page{}@example.com", n),
                    &format!("pageuser{}", n),
                )),
            ),
        )
        .await;
    }

    let mut seen = std::collections::HashSet::new();
    for page in 1..=3 {
        let uri = format!("/users/search?role=ANONYMOUS&page={}&size=5", page);
        let (status, body) = send(&app, request(Method::GET, &uri, None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 15);
        assert_eq!(body["page"], page);
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 5);
        for item in items {
            // Pages must not overlap.
            assert!(seen.insert(item["id"].as_str().unwrap().to_string()));
        }
    }
    assert_eq!(seen.len(), 15);

    // Past the last page: empty items, same total.
    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/users/search?role=ANONYMOUS&page=4&size=5",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["items"].as_array().unwrap().is_empty());
    assert_eq!(body["total"], 15);
}

#[tokio::test]
async fn test_public_search_projection_and_padding() {
    let (app, token) = test_app_with_token().await;

    // No nickname at all: the public view pads, the admin view does not.
    let (_, created) = send(
        &app,
        request(
            Method::POST,
            "/users",
            Some(&token),
            Some(json!({"email": "bare@example.com", "password": "Secret*123"})),
        ),
    )
    .await;
    assert!(created["nickname"].is_null());
    let id = created["id"].as_str().unwrap();

    let (status, body) = send(&app, request(Method::GET, "/users/search?q=bare", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let item = &body["items"][0];
    assert_eq!(item["nickname"], "___");
    assert!(item.get("profile_picture_url").is_some());
    assert!(item.get("is_professional").is_some());
    // Never leak write-side fields through the public view.
    assert!(item.get("password_hash").is_none());
    assert!(item.get("verification_token").is_none());

    let (_, admin_view) = send(
        &app,
        request(Method::GET, &format!("/users/{}", id), Some(&token), None),
    )
    .await;
    assert!(admin_view["nickname"].is_null());
    assert!(admin_view.get("profile_picture_url").is_none());
}

#[tokio::test]
async fn test_public_search_rejects_bad_parameters() {
    let app = test_app().await;

    for uri in [
        "/users/search?sort=password_hash",
        "/users/search?sort=id",
        "/users/search?order=ascending",
        "/users/search?role=SUPERUSER",
    ] {
        let (status, _) = send(&app, request(Method::GET, uri, None, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "expected 400 for {}", uri);
    }

    for uri in [
        "/users/search?page=0",
        "/users/search?size=0",
        "/users/search?size=101",
    ] {
        let (status, body) = send(&app, request(Method::GET, uri, None, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "expected 400 for {}", uri);
        assert_eq!(body["code"], "BAD_REQUEST");
    }
}

#[tokio::test]
async fn test_public_search_sorting() {
    let (app, token) = test_app_with_token().await;

    for (email, nickname) in [
        ("carol@example.com", "carol"),
        ("alice@example.com", "alice"),
        ("bob@example.com", "bob"),
    ] {
        send(
            &app,
            request(
                Method::POST,
                "/users",
                Some(&token),
                Some(register_body(email, nickname)),
            ),
        )
        .await;
    }

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/users/search?role=ANONYMOUS&sort=email&order=asc",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let emails: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["email"].as_str().unwrap())
        .collect();
    assert_eq!(
        emails,
        vec!["alice@example.com", "bob@example.com", "carol@example.com"]
    );
}

#[tokio::test]
async fn test_me_returns_own_record() {
    let (app, token) = test_app_with_token().await;

    let (status, body) = send(&app, request(Method::GET, "/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "admin@roster.test");
    assert_eq!(body["role"], "ADMIN");

    let (status, _) = send(&app, request(Method::GET, "/me", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
