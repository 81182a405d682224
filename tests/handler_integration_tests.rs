mod common;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use common::{PASSWORD, app_state};
use serde_json::{Value, json};
use social_graph::create_router;
use tower::ServiceExt;

// --- Request helpers ---

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Registers `tag` and logs in, returning (user id, access token).
async fn sign_up(app: &Router, tag: &str) -> (i64, String) {
    let (status, user) = send(
        app,
        Method::POST,
        "/users",
        None,
        Some(json!({
            "email": format!("{tag}@example.com"),
            "user_tag": tag,
            "password": PASSWORD,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(user.get("password").is_none());

    let (status, login) = send(
        app,
        Method::POST,
        "/auth",
        None,
        Some(json!({ "user_tag": tag, "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    (
        user["id"].as_i64().unwrap(),
        login["token"].as_str().unwrap().to_string(),
    )
}

// --- Tests ---

#[tokio::test]
async fn test_health_is_public() {
    let app = create_router(app_state());
    let (status, _) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_protected_routes_need_a_token() {
    let app = create_router(app_state());

    let (status, body) = send(&app, Method::GET, "/posts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing bearer token");

    let (status, _) = send(&app, Method::GET, "/users", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_login_and_own_profile() {
    let app = create_router(app_state());
    let (alice, token) = sign_up(&app, "alice").await;
    let (_, other) = sign_up(&app, "bobby").await;

    let (status, own) = send(&app, Method::GET, &format!("/users/{alice}"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(own["email"], "alice@example.com");

    let (status, public) =
        send(&app, Method::GET, &format!("/users/{alice}"), Some(&other), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(public.get("email").is_none());
    assert_eq!(public["user_tag"], "alice");

    let (status, _) = send(&app, Method::GET, "/users/tag/alice", Some(&other), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_bad_login_maps_to_status_codes() {
    let app = create_router(app_state());
    sign_up(&app, "alice").await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth",
        None,
        Some(json!({ "user_tag": "alice", "password": "Nope1234!" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth",
        None,
        Some(json!({ "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_post_like_and_comment_flow() {
    let app = create_router(app_state());
    let (_, alice) = sign_up(&app, "alice").await;
    let (_, bobby) = sign_up(&app, "bobby").await;

    let (status, post) = send(
        &app,
        Method::POST,
        "/posts",
        Some(&alice),
        Some(json!({ "content": "hello world" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_id = post["id"].as_i64().unwrap();

    let likes = format!("/posts/{post_id}/likes");
    let (status, _) = send(&app, Method::POST, &likes, Some(&bobby), None).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, Method::POST, &likes, Some(&bobby), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Like already exists");

    let (status, _) = send(
        &app,
        Method::POST,
        "/posts",
        Some(&bobby),
        Some(json!({ "content": "nice", "parent_post_id": post_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, post) =
        send(&app, Method::GET, &format!("/posts/{post_id}"), Some(&bobby), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["likes_count"], 1);
    assert_eq!(post["comments_count"], 1);

    let (status, comments) = send(
        &app,
        Method::GET,
        &format!("/posts/{post_id}/comments?order_by=asc"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comments.as_array().unwrap().len(), 1);

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/posts/{post_id}"),
        Some(&bobby),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::DELETE, &likes, Some(&bobby), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_private_group_over_http() {
    let app = create_router(app_state());
    let (_, owner) = sign_up(&app, "owner").await;
    let (member_id, member) = sign_up(&app, "member").await;

    let (status, group) = send(
        &app,
        Method::POST,
        "/groups",
        Some(&owner),
        Some(json!({ "name": "club", "is_private": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = group["id"].as_i64().unwrap();

    let (status, _) = send(&app, Method::GET, &format!("/groups/{group_id}"), Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, listed) = send(&app, Method::GET, "/groups", Some(&member), None).await;
    assert!(listed.as_array().unwrap().is_empty());

    let requests = format!("/groups/{group_id}/join-requests");
    let (status, _) = send(&app, Method::POST, &requests, Some(&member), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, waiting) = send(&app, Method::GET, &requests, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(waiting[0]["user_tag"], "member");
    assert!(waiting[0].get("email").is_none());

    let decision = format!("/groups/{group_id}/join-requests/{member_id}");
    let (status, _) = send(
        &app,
        Method::PUT,
        &decision,
        Some(&member),
        Some(json!({ "accept": true })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, membership) = send(
        &app,
        Method::PUT,
        &decision,
        Some(&owner),
        Some(json!({ "accept": true })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(membership["user_id"], member_id);

    let (status, members) = send(
        &app,
        Method::GET,
        &format!("/groups/{group_id}/members"),
        Some(&member),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_list_routes() {
    let app = create_router(app_state());
    let (_, alice) = sign_up(&app, "alice").await;
    let (bobby_id, bobby) = sign_up(&app, "bobby").await;

    let (status, list) = send(
        &app,
        Method::POST,
        "/lists",
        Some(&alice),
        Some(json!({ "name": "reading" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let list_id = list["id"].as_i64().unwrap();

    let member = format!("/lists/{list_id}/users/{bobby_id}");
    let (status, _) = send(&app, Method::POST, &member, Some(&bobby), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::POST, &member, Some(&alice), None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/lists/{list_id}/follower"),
        Some(&bobby),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, followers) = send(
        &app,
        Method::GET,
        &format!("/lists/{list_id}/follower"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(followers[0]["id"], bobby_id);

    let (status, _) = send(&app, Method::DELETE, &format!("/lists/{list_id}"), Some(&alice), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_logout_revokes_refresh_token() {
    let app = create_router(app_state());
    sign_up(&app, "alice").await;

    let (_, login) = send(
        &app,
        Method::POST,
        "/auth",
        None,
        Some(json!({ "email": "alice@example.com", "password": PASSWORD })),
    )
    .await;
    let token = login["token"].as_str().unwrap();
    let refresh = json!({ "refresh_token": login["refresh_token"] });

    let (status, fresh) = send(&app, Method::POST, "/auth/token", None, Some(refresh.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert!(fresh["token"].is_string());

    let (status, _) = send(&app, Method::DELETE, "/auth", Some(token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::POST, "/auth/token", None, Some(refresh)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = create_router(app_state());
    let (status, doc) = send(&app, Method::GET, "/api-docs/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/groups/{id}/join-requests/{user_id}"].is_object());
}
