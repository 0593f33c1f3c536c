//! End-to-end tests over the HTTP surface, driving the router in-process.

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chatline::{db, rooms::{Connection, ServerEvent}, router, AppState, Config};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app() -> (Router, AppState) {
    let db_pool = db::connect("sqlite::memory:", 1).await.unwrap();
    db::init_schema(&db_pool).await.unwrap();
    let state = AppState::new(db_pool, Config { password_cost: 4, ..Config::default() });
    (router(state.clone()), state)
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(body) => Body::from(body.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

async fn register(app: &Router, name: &str, mobile: &str) -> String {
    let (status, user) = call(
        app,
        Method::POST,
        "/api/register",
        Some(json!({ "name": name, "mobileNumber": mobile, "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{user}");
    user["id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn direct_chat_message_reaches_live_participant() {
    let (app, state) = app().await;
    let a = register(&app, "A", "111").await;
    let b = register(&app, "B", "222").await;

    let (status, chat) = call(&app, Method::POST, "/api/chats", Some(json!({ "participants": [a, b], "isGroup": false }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let c1 = chat["id"].as_str().unwrap().to_owned();

    let (bob, mut bob_rx) = Connection::new(None);
    state.rooms.subscribe(&bob, c1.parse().unwrap());

    let (status, sent) = call(
        &app,
        Method::POST,
        "/api/messages",
        Some(json!({ "chatId": c1, "senderId": a, "content": "hi", "type": "text" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{sent}");
    assert_eq!(sent["status"], "sent");
    assert_eq!(sent["content"], "hi");

    let ServerEvent::NewMessage(live) = bob_rx.try_recv().unwrap() else {
        panic!("expected new_message");
    };
    assert_eq!(serde_json::to_value(&live).unwrap(), sent);

    let (status, chats) = call(&app, Method::GET, &format!("/api/chats?userId={b}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(chats.as_array().unwrap().len(), 1);
    assert_eq!(chats[0]["id"], c1);
    assert_eq!(chats[0]["unreadCount"], 0);
    assert_eq!(chats[0]["lastMessage"]["content"], "hi");

    let (_, history) = call(&app, Method::GET, &format!("/api/messages?chat_id={c1}"), None).await;
    assert_eq!(history, json!([sent]));
}

#[tokio::test]
async fn creating_a_direct_chat_twice_returns_the_same_id() {
    let (app, _) = app().await;
    let a = register(&app, "A", "111").await;
    let b = register(&app, "B", "222").await;

    let (first_status, first) = call(&app, Method::POST, "/api/chats", Some(json!({ "participants": [a, b] }))).await;
    let (second_status, second) = call(&app, Method::POST, "/api/chats", Some(json!({ "participants": [b, a] }))).await;

    assert_eq!(first_status, StatusCode::CREATED);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first["id"], second["id"]);
}

#[tokio::test]
async fn duplicate_mobile_number_conflicts() {
    let (app, _) = app().await;
    register(&app, "A", "111").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/register",
        Some(json!({ "name": "Imposter", "mobile_number": "111", "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict_error");
}

#[tokio::test]
async fn login_and_user_listing() {
    let (app, _) = app().await;
    let a = register(&app, "A", "111").await;
    let b = register(&app, "B", "222").await;

    let (status, body) = call(&app, Method::POST, "/api/login", Some(json!({ "mobileNumber": "111", "password": "bad" }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "auth_error");

    let (status, user) = call(&app, Method::POST, "/api/login", Some(json!({ "mobileNumber": "111", "password": "pw" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["id"], a);
    assert_eq!(user["status"], "online");
    assert!(user.get("password").is_none());

    let (_, users) = call(&app, Method::GET, &format!("/api/users?current_user_id={a}"), None).await;
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["id"], b);

    let (status, body) = call(&app, Method::PUT, "/api/profile", Some(json!({ "id": b, "name": "Bea" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
}

#[tokio::test]
async fn malformed_requests_are_validation_errors() {
    let (app, _) = app().await;
    let a = register(&app, "A", "111").await;

    let (status, body) = call(&app, Method::POST, "/api/chats", Some(json!({ "participants": [a] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");

    let (status, body) = call(&app, Method::POST, "/api/messages", Some(json!({ "chatId": "nope" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");

    let (status, body) = call(&app, Method::GET, "/api/messages", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn sending_to_a_missing_chat_is_not_found() {
    let (app, _) = app().await;
    let a = register(&app, "A", "111").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/messages",
        Some(json!({ "chatId": uuid_like(), "senderId": a, "content": "hi", "type": "text" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found_error");
}

fn uuid_like() -> String {
    "0190b6a2-7c3e-7000-8000-000000000000".to_owned()
}

#[tokio::test]
async fn health_check() {
    let (app, _) = app().await;
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn socket_with_malformed_user_id_is_a_validation_error() {
    let (app, _) = app().await;

    let (status, body) = call(&app, Method::GET, "/ws?userId=nope", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");
}
