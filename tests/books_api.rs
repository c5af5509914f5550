//! End-to-end tests for the `/books` resource, driven in-process.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use bookshelf_app::App;
use bookshelf_db::{create_pool, DbConfig};
use bookshelf_kernel::settings::Settings;
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY: &str = "SecretKey";

async fn app_with(settings: Settings) -> Router {
    let pool = create_pool(&DbConfig::in_memory()).await.unwrap();
    let app = App::with_pool(settings, pool).await.unwrap();
    app.migrate().await.unwrap();
    app.router()
}

async fn app() -> Router {
    app_with(Settings::default()).await
}

fn clean_code() -> Value {
    json!({
        "isbn": "978-1132350884",
        "title": "Clean Code",
        "author": "Robert Martin",
        "shortDescription": "desc",
        "pageCount": 464
    })
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    key: Option<&str>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header(header::AUTHORIZATION, key);
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    app.clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create(app: &Router, body: Value) -> Response {
    send(app, Method::POST, "/books", Some(body), Some(API_KEY)).await
}

#[tokio::test]
async fn create_returns_created_with_location() {
    let app = app().await;

    let response = create(&app, clean_code()).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "/books/978-1132350884"
    );
    assert_eq!(json_body(response).await, clean_code());

    let response = send(&app, Method::GET, "/books/978-1132350884", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, clean_code());
}

#[tokio::test]
async fn create_without_api_key_is_unauthorized() {
    let app = app().await;

    let response = send(&app, Method::POST, "/books", Some(clean_code()), None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        Method::POST,
        "/books",
        Some(clean_code()),
        Some("NotTheKey"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, Method::GET, "/books/978-1132350884", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_with_invalid_isbn_is_rejected() {
    let app = app().await;
    let mut body = clean_code();
    body["isbn"] = json!("978-1132350884-x");

    let response = create(&app, body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!([{"field": "isbn", "message": "Invalid ISBN-13 value"}])
    );

    let response = send(&app, Method::GET, "/books", None, None).await;
    assert_eq!(json_body(response).await, json!([]));
}

#[tokio::test]
async fn isbn_with_leading_zero_block_is_rejected() {
    let app = app().await;
    let mut body = clean_code();
    body["isbn"] = json!("978-0132350884");

    let response = create(&app, body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!([{"field": "isbn", "message": "Invalid ISBN-13 value"}])
    );
    let response = send(&app, Method::GET, "/books/978-0132350884", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn null_fields_are_reported_as_violations() {
    let app = app().await;
    let mut body = clean_code();
    body["isbn"] = Value::Null;
    body["title"] = Value::Null;
    body["author"] = Value::Null;

    let response = create(&app, body).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!([
            {"field": "isbn", "message": "Invalid ISBN-13 value"},
            {"field": "title", "message": "must not be empty"},
            {"field": "author", "message": "must not be empty"}
        ])
    );
}

#[tokio::test]
async fn create_reports_every_violation() {
    let app = app().await;

    let response = create(&app, json!({ "isbn": "978-1132350884", "pageCount": 0 })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let fields: Vec<String> = json_body(response)
        .await
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(fields, vec!["title", "shortDescription", "author", "pageCount"]);
}

#[tokio::test]
async fn duplicate_create_is_rejected_and_keeps_original() {
    let app = app().await;
    assert_eq!(create(&app, clean_code()).await.status(), StatusCode::CREATED);

    let mut again = clean_code();
    again["title"] = json!("Cleaner Code");
    let response = create(&app, again).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!([{"field": "isbn", "message": "Already exists"}])
    );

    let response = send(&app, Method::GET, "/books/978-1132350884", None, None).await;
    assert_eq!(json_body(response).await["title"], "Clean Code");
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = app().await;

    let response = send(
        &app,
        Method::POST,
        "/books",
        Some(json!({ "isbn": "978-1132350884", "pageCount": "many" })),
        Some(API_KEY),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"]["code"], "bad_request");
}

#[tokio::test]
async fn get_unknown_isbn_is_not_found() {
    let app = app().await;

    let response = send(&app, Method::GET, "/books/unknown-isbn", None, None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_and_search_by_title() {
    let app = app().await;
    create(&app, clean_code()).await;
    let mut other = clean_code();
    other["isbn"] = json!("978-1000000001");
    other["title"] = json!("Test Title");
    create(&app, other.clone()).await;

    let response = send(&app, Method::GET, "/books", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 2);

    let response = send(&app, Method::GET, "/books?searchTerm=st%20Tit", None, None).await;
    assert_eq!(json_body(response).await, json!([other]));

    let response = send(&app, Method::GET, "/books?searchTerm=zzz", None, None).await;
    assert_eq!(json_body(response).await, json!([]));

    let response = send(&app, Method::GET, "/books?searchTerm=%20%20", None, None).await;
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn search_folds_non_ascii_titles() {
    let app = app().await;
    create(&app, clean_code()).await;
    let mut uber = clean_code();
    uber["isbn"] = json!("978-1000000003");
    uber["title"] = json!("Über Straße");
    create(&app, uber.clone()).await;

    let response = send(&app, Method::GET, "/books?searchTerm=%C3%BCBER", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!([uber]));
}

#[tokio::test]
async fn update_replaces_record_using_path_isbn() {
    let app = app().await;
    create(&app, clean_code()).await;

    let mut changed = clean_code();
    changed["isbn"] = json!("978-9999999999");
    changed["title"] = json!("Clean Code, 2nd ed");
    changed["releaseDate"] = json!("2025-01-01T00:00:00Z");

    let response = send(
        &app,
        Method::PUT,
        "/books/978-1132350884",
        Some(changed),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["isbn"], "978-1132350884");
    assert_eq!(body["title"], "Clean Code, 2nd ed");

    let response = send(&app, Method::GET, "/books/978-1132350884", None, None).await;
    let stored = json_body(response).await;
    assert_eq!(stored["title"], "Clean Code, 2nd ed");
    assert!(stored["releaseDate"].is_string());

    let response = send(&app, Method::GET, "/books/978-9999999999", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_unknown_isbn_is_not_found() {
    let app = app().await;

    let response = send(
        &app,
        Method::PUT,
        "/books/978-1132350884",
        Some(clean_code()),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = send(&app, Method::GET, "/books", None, None).await;
    assert_eq!(json_body(response).await, json!([]));
}

#[tokio::test]
async fn update_with_invalid_fields_is_rejected() {
    let app = app().await;
    create(&app, clean_code()).await;

    let mut changed = clean_code();
    changed["author"] = json!("");
    let response = send(
        &app,
        Method::PUT,
        "/books/978-1132350884",
        Some(changed),
        None,
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await,
        json!([{"field": "author", "message": "must not be empty"}])
    );
}

#[tokio::test]
async fn delete_removes_book() {
    let app = app().await;
    create(&app, clean_code()).await;

    let response = send(&app, Method::DELETE, "/books/978-1132350884", None, None).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, Method::GET, "/books/978-1132350884", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, Method::DELETE, "/books/978-1132350884", None, None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn configured_protection_covers_update_and_delete() {
    let mut settings = Settings::default();
    settings.auth.protected_operations = vec![
        "create".to_string(),
        "update".to_string(),
        "delete".to_string(),
    ];
    let app = app_with(settings).await;
    create(&app, clean_code()).await;

    let response = send(
        &app,
        Method::PUT,
        "/books/978-1132350884",
        Some(clean_code()),
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, Method::DELETE, "/books/978-1132350884", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(
        &app,
        Method::DELETE,
        "/books/978-1132350884",
        None,
        Some(API_KEY),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&app, Method::GET, "/books", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn migrations_run_once() {
    let pool = create_pool(&DbConfig::in_memory()).await.unwrap();
    let app = App::with_pool(Settings::default(), pool).await.unwrap();

    assert_eq!(app.migrate().await.unwrap(), 1);
    assert_eq!(app.migrate().await.unwrap(), 0);
}
