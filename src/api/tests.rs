use super::*;
use crate::storage::{
    InMemoryMovieStore, Movie, MovieFilter, MovieRepository, StorageError, StorageResult,
};
use async_trait::async_trait;
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn test_app() -> Router {
    router(AppState::new(Arc::new(InMemoryMovieStore::new())))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    app.clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Store whose every call fails, for exercising error mapping
struct BrokenStore;

#[async_trait]
impl MovieRepository for BrokenStore {
    async fn find_all(&self, _: &MovieFilter) -> StorageResult<Vec<Movie>> {
        Err(StorageError::Decode("moviedetail.votes: expected i64".into()))
    }

    async fn find_one(&self, _: &MovieFilter) -> StorageResult<Movie> {
        Err(StorageError::Timeout {
            operation: "find_one",
        })
    }

    async fn insert(&self, _: &Movie) -> StorageResult<String> {
        Err(StorageError::Insert("not primary".into()))
    }

    async fn delete_one(&self, _: &MovieFilter) -> StorageResult<u64> {
        Err(StorageError::Delete("not primary".into()))
    }

    async fn increment_vote(&self, _: &MovieFilter) -> StorageResult<i64> {
        Err(StorageError::Vote("write conflict".into()))
    }

    async fn ping(&self) -> StorageResult<()> {
        Err(StorageError::Connect("no servers".into()))
    }
}

#[tokio::test]
async fn inception_scenario() {
    let app = test_app();

    let response = send(
        &app,
        "POST",
        "/movies/Inception",
        Some(json!({"director": "Nolan", "genre": "Sci-Fi", "releaseYear": 2010})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"director": "Nolan", "genre": "Sci-Fi", "releaseYear": 2010, "votes": 0})
    );

    let response = send(&app, "GET", "/movies/inception", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "title": "inception",
            "moviedetail": {"director": "Nolan", "genre": "Sci-Fi", "releaseYear": 2010, "votes": 0}
        })
    );

    for expected in 1..=3 {
        let response = send(&app, "GET", "/movies/inception/vote", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"title": "inception", "votes": expected})
        );
    }

    let response = send(&app, "GET", "/movies/INCEPTION", None).await;
    assert_eq!(body_json(response).await["moviedetail"]["votes"], 3);
}

#[tokio::test]
async fn list_is_keyed_by_lowercase_title() {
    let app = test_app();

    send(&app, "POST", "/movies/Heat", Some(json!({"director": "Mann"}))).await;
    send(&app, "POST", "/movies/ALIEN", Some(json!({"genre": "Horror"}))).await;
    send(&app, "POST", "/movies/arrival", Some(json!({}))).await;
    send(&app, "DELETE", "/movies/arrival", None).await;

    let response = send(&app, "GET", "/movies", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "alien": {"genre": "Horror", "votes": 0},
            "heat": {"director": "Mann", "votes": 0}
        })
    );
}

#[tokio::test]
async fn empty_list_is_an_empty_object() {
    let response = send(&test_app(), "GET", "/movies", None).await;
    assert_eq!(body_json(response).await, json!({}));
}

#[tokio::test]
async fn delete_reports_count() {
    let app = test_app();

    let response = send(&app, "DELETE", "/movies/heat", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"count": 0}));

    send(&app, "POST", "/movies/heat", Some(json!({"director": "Mann"}))).await;

    let response = send(&app, "DELETE", "/movies/Heat", None).await;
    assert_eq!(body_json(response).await, json!({"count": 1}));

    let response = send(&app, "GET", "/movies/heat", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({"error": "movie not found"}));
}

#[tokio::test]
async fn vote_on_unknown_title_creates_it() {
    let app = test_app();

    let response = send(&app, "GET", "/movies/Dune/vote", None).await;
    assert_eq!(body_json(response).await, json!({"title": "dune", "votes": 1}));

    let response = send(&app, "GET", "/movies/dune", None).await;
    assert_eq!(
        body_json(response).await,
        json!({"title": "dune", "moviedetail": {"votes": 1}})
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_vote_requests_all_count() {
    let app = test_app();
    send(&app, "POST", "/movies/heat", Some(json!({"votes": 5}))).await;

    let requests: Vec<_> = (0..25)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move { send(&app, "GET", "/movies/heat/vote", None).await.status() })
        })
        .collect();
    for request in requests {
        assert_eq!(request.await.unwrap(), StatusCode::OK);
    }

    let response = send(&app, "GET", "/movies/heat", None).await;
    assert_eq!(body_json(response).await["moviedetail"]["votes"], 30);
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let app = test_app();

    let response = send(
        &app,
        "POST",
        "/movies/heat",
        Some(json!({"releaseYear": "nineteen ninety-five"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/movies/heat")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was written.
    let response = send(&app, "GET", "/movies/heat", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn store_failures_become_json_errors() {
    let app = router(AppState::new(Arc::new(BrokenStore)));

    let response = send(&app, "POST", "/movies/heat", Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({"error": "insert failed"}));

    let response = send(&app, "GET", "/movies", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await, json!({"error": "internal error"}));

    let response = send(&app, "GET", "/movies/heat", None).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await, json!({"error": "store unavailable"}));

    let response = send(&app, "DELETE", "/movies/heat", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = send(&app, "GET", "/movies/heat/vote", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn diagnostics_are_plain_text() {
    let app = test_app();

    let response = send(&app, "GET", "/ok", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    assert_eq!(body_text(response).await, "OK!\n");

    let response = send(&app, "GET", "/version", None).await;
    assert_eq!(
        body_text(response).await,
        format!("API v{}\n", env!("CARGO_PKG_VERSION"))
    );

    let response = send(&app, "GET", "/cpu", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("OS: "));
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/movies")
                .header(header::ORIGIN, "http://example.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

#[tokio::test]
async fn unknown_routes_and_methods_are_rejected() {
    let app = test_app();

    let response = send(&app, "GET", "/nope", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, "PUT", "/movies/heat", Some(json!({}))).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
