use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use lobbychat::{db::Store, router, App, AppState, Config};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app() -> Router {
    router(AppState::new(Store::in_memory().await.unwrap()))
}

async fn call(app: &Router, method: Method, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        req = req.header("user", user);
    }
    let req = match body {
        Some(body) => req
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1_000_000).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn join(app: &Router, name: &str) -> StatusCode {
    call(app, Method::POST, "/participants", None, Some(json!({ "name": name }))).await.0
}

#[tokio::test]
async fn register_send_and_read_back() {
    let app = app().await;

    assert_eq!(join(&app, "Ana").await, StatusCode::CREATED);
    assert_eq!(join(&app, "Ana").await, StatusCode::CONFLICT);

    let (status, sent) = call(
        &app,
        Method::POST,
        "/messages",
        Some("Ana"),
        Some(json!({ "to": "Todos", "text": "hi", "type": "message" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["from"], "Ana");

    let (status, list) = call(&app, Method::GET, "/messages?user=Ana", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert!(list.len() >= 2);
    assert_eq!(list[0]["type"], "status");
    assert_eq!(list[0]["text"], "entered the room");
    assert_eq!(list[1]["text"], "hi");
    assert_eq!(list[1]["type"], "message");
    assert_eq!(list[1]["id"], sent["id"]);
}

#[tokio::test]
async fn participant_endpoints() {
    let app = app().await;

    assert_eq!(join(&app, "   ").await, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = call(&app, Method::POST, "/participants", None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = call(&app, Method::POST, "/participants", None, Some(json!({ "name": 7 }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    join(&app, "Ana").await;
    join(&app, "Bia").await;
    let (status, list) = call(&app, Method::GET, "/participants", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let mut names: Vec<_> = list.as_array().unwrap().iter().map(|p| p["name"].as_str().unwrap().to_owned()).collect();
    names.sort();
    assert_eq!(names, ["Ana", "Bia"]);
    assert!(list[0]["lastStatus"].is_i64());

    assert_eq!(call(&app, Method::POST, "/status", Some("Ana"), None).await.0, StatusCode::OK);
    assert_eq!(call(&app, Method::POST, "/status", Some("Zed"), None).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn send_rejections() {
    let app = app().await;
    join(&app, "Ana").await;

    let cases = [
        (Some("Ana"), json!({ "to": "Todos", "text": "hi", "type": "status" })),
        (Some("Ana"), json!({ "to": "Todos", "text": "hi", "type": "shout" })),
        (Some("Ana"), json!({ "to": "Todos", "text": "<b></b>", "type": "message" })),
        (Some("Ana"), json!({ "text": "hi", "type": "message" })),
        (Some("Zed"), json!({ "to": "Todos", "text": "hi", "type": "message" })),
        (None, json!({ "to": "Todos", "text": "hi", "type": "message" })),
    ];
    for (user, body) in cases {
        let (status, err) = call(&app, Method::POST, "/messages", user, Some(body.clone())).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
        assert_eq!(err["status"], 422);
    }
}

#[tokio::test]
async fn limit_and_visibility() {
    let app = app().await;
    join(&app, "Ana").await;
    join(&app, "Bia").await;
    join(&app, "Caio").await;

    let send = |user: &'static str, to: &'static str, text: &'static str, kind: &'static str| {
        let app = app.clone();
        async move {
            call(&app, Method::POST, "/messages", Some(user), Some(json!({ "to": to, "text": text, "type": kind }))).await.0
        }
    };
    assert_eq!(send("Ana", "Bia", "psst", "private_message").await, StatusCode::CREATED);
    assert_eq!(send("Caio", "Todos", "hello all", "message").await, StatusCode::CREATED);

    let (_, caio) = call(&app, Method::GET, "/messages", Some("Caio"), None).await;
    assert!(caio.as_array().unwrap().iter().all(|m| m["text"] != "psst"));

    let (status, bia) = call(&app, Method::GET, "/messages?limit=2", Some("Bia"), None).await;
    assert_eq!(status, StatusCode::OK);
    let texts: Vec<_> = bia.as_array().unwrap().iter().map(|m| m["text"].as_str().unwrap()).collect();
    assert_eq!(texts, ["psst", "hello all"]);

    let (status, all) = call(&app, Method::GET, "/messages?limit=5000000000", Some("Bia"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, unlimited) = call(&app, Method::GET, "/messages", Some("Bia"), None).await;
    assert_eq!(all, unlimited);

    for bad in ["0", "-1", "abc"] {
        let (status, _) = call(&app, Method::GET, &format!("/messages?limit={bad}"), Some("Bia"), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
    assert_eq!(call(&app, Method::GET, "/messages", None, None).await.0, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn edit_and_delete_ownership() {
    let app = app().await;
    join(&app, "Ana").await;
    join(&app, "Bia").await;

    let (_, sent) = call(
        &app,
        Method::POST,
        "/messages",
        Some("Ana"),
        Some(json!({ "to": "Todos", "text": "hi", "type": "message" })),
    )
    .await;
    let uri = format!("/messages/{}", sent["id"].as_str().unwrap());
    let edit = json!({ "to": "Bia", "text": "edited", "type": "private_message" });

    assert_eq!(call(&app, Method::PUT, &uri, Some("Bia"), Some(edit.clone())).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(call(&app, Method::PUT, &uri, Some("Zed"), Some(edit.clone())).await.0, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(call(&app, Method::PUT, "/messages/nope", Some("Ana"), Some(edit.clone())).await.0, StatusCode::NOT_FOUND);
    assert_eq!(call(&app, Method::PUT, &uri, Some("Ana"), Some(edit)).await.0, StatusCode::OK);

    let (_, bia) = call(&app, Method::GET, "/messages", Some("Bia"), None).await;
    let edited = bia.as_array().unwrap().iter().find(|m| m["id"] == sent["id"]).unwrap().clone();
    assert_eq!(edited["text"], "edited");
    assert_eq!(edited["from"], "Ana");
    assert_eq!(edited["time"], sent["time"]);

    assert_eq!(call(&app, Method::DELETE, &uri, Some("Bia"), None).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(call(&app, Method::DELETE, &uri, Some("Ana"), None).await.0, StatusCode::OK);
    assert_eq!(call(&app, Method::DELETE, &uri, Some("Ana"), None).await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn app_context_starts_and_shuts_down() {
    let config = Config {
        reap_interval: std::time::Duration::from_millis(20),
        idle_threshold: std::time::Duration::from_secs(0),
        ..Config::default()
    };
    let store = Store::in_memory().await.unwrap();
    let app = App::with_store(store.clone(), &config);

    assert_eq!(join(&app.router(), "Ana").await, StatusCode::CREATED);
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;

    let (_, left) = call(&app.router(), Method::GET, "/messages", Some("Ana"), None).await;
    assert!(left.as_array().unwrap().iter().any(|m| m["text"] == "left the room"));

    app.shutdown().await;
}

#[tokio::test]
async fn encoded_markup_never_turns_into_tags() {
    let app = app().await;
    assert_eq!(join(&app, "Ana").await, StatusCode::CREATED);

    let (status, escaped) = call(&app, Method::POST, "/participants", None, Some(json!({ "name": "&lt;i&gt;Ana" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(escaped["name"], "&lt;i&gt;Ana");

    // the raw-tag spelling cleans down to the existing "Ana"
    assert_eq!(join(&app, "<i>Ana</i>").await, StatusCode::CONFLICT);

    assert_eq!(call(&app, Method::POST, "/status", Some("&lt;i&gt;Ana"), None).await.0, StatusCode::OK);

    let (status, sent) = call(
        &app,
        Method::POST,
        "/messages",
        Some("&lt;i&gt;Ana"),
        Some(json!({ "to": "Todos", "text": "&lt;script&gt;alert(1)&lt;/script&gt;", "type": "message" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(sent["from"], "&lt;i&gt;Ana");
    assert_eq!(sent["text"], "&lt;script&gt;alert(1)&lt;/script&gt;");

    // only the escaped participant wrote it, so only they may delete it
    let uri = format!("/messages/{}", sent["id"].as_str().unwrap());
    assert_eq!(call(&app, Method::DELETE, &uri, Some("Ana"), None).await.0, StatusCode::UNAUTHORIZED);
    assert_eq!(call(&app, Method::DELETE, &uri, Some("&lt;i&gt;Ana"), None).await.0, StatusCode::OK);
}
