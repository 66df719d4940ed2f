use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use tally_analytics_events::EventsPlugin;
use tally_analytics_funnels::FunnelsPlugin;
use tally_core::plugin::PluginManager;
use tally_database::test_utils::TestDatabase;

async fn build_app(db: Arc<DatabaseConnection>) -> Router {
    let mut manager = PluginManager::new();
    manager.service_context().register_service(db);
    manager.register_plugin(Box::new(EventsPlugin));
    manager.register_plugin(Box::new(FunnelsPlugin));
    manager.initialize_plugins().await.unwrap();
    manager.build_application()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_funnel_crud_and_conversion() {
    let test_db = TestDatabase::new().await.unwrap();
    let app = build_app(test_db.connection_arc()).await;

    let (status, created) = send(
        &app,
        json_request(
            "POST",
            "/api/funnels",
            json!({
                "name": "Signup",
                "steps": [
                    {"step_number": 1, "event_type": "page_view"},
                    {"step_number": 2, "event_type": "sign_up"}
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    for (session, event_type) in [("a", "page_view"), ("b", "page_view"), ("c", "page_view"), ("a", "sign_up"), ("b", "sign_up")] {
        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/events",
                json!({
                    "session_id": session,
                    "event_type": event_type,
                    "occurred_at": "2025-02-10T08:00:00Z"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, report) = send(
        &app,
        get(&format!(
            "/api/funnels/{}/conversion?start_date=2025-02-01&end_date=2025-02-28",
            id
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["funnel_name"], "Signup");
    assert_eq!(report["window"], json!({"start": "2025-02-01", "end": "2025-02-28"}));
    assert_eq!(report["steps"][0]["conversion_rate"], json!(100.0));
    assert_eq!(report["steps"][1]["unique_sessions"], 2);
    assert_eq!(report["steps"][1]["conversion_rate"], json!(66.67));
    assert_eq!(report["overall_conversion_rate"], json!(66.67));

    let (status, page) = send(&app, get("/api/funnels?page_size=500")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["page_size"], 100);
    assert_eq!(page["funnels"][0]["step_count"], 2);

    let (status, replaced) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/funnels/{}", id),
            json!({
                "name": "Signup v2",
                "steps": [{"step_number": 1, "event_type": "sign_up"}]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["steps"].as_array().unwrap().len(), 1);

    let delete = Request::delete(format!("/api/funnels/{}", id))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get(&format!("/api/funnels/{}", id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_funnel_conversion_is_404_problem() {
    let test_db = TestDatabase::new().await.unwrap();
    let app = build_app(test_db.connection_arc()).await;

    let response = app
        .clone()
        .oneshot(get(
            "/api/funnels/999/conversion?start_date=2025-01-01&end_date=2025-01-31",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers()["content-type"],
        "application/problem+json"
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let problem: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(problem["title"], "Funnel Not Found");
    assert_eq!(problem["error_code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_inverted_window_is_400() {
    let test_db = TestDatabase::new().await.unwrap();
    let app = build_app(test_db.connection_arc()).await;

    let (status, problem) = send(
        &app,
        json_request(
            "POST",
            "/api/funnels/preview?start_date=2025-03-01&end_date=2025-02-01",
            json!({"steps": [{"step_number": 1, "event_type": "a"}]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(problem["error_code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_infrastructure_failure_is_500_with_generic_detail() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_errors([DbErr::Custom("FATAL: password authentication failed".into())])
        .into_connection();
    let app = build_app(Arc::new(db)).await;

    let (status, problem) = send(
        &app,
        get("/api/funnels/1/conversion?start_date=2025-01-01&end_date=2025-01-31"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(problem["error_code"], "INTERNAL_SERVER_ERROR");
    assert!(!problem.to_string().contains("password"));
}

#[tokio::test]
async fn test_openapi_document_lists_funnel_routes() {
    let mut manager = PluginManager::new();
    manager.register_plugin(Box::new(EventsPlugin));
    manager.register_plugin(Box::new(FunnelsPlugin));

    let doc = manager.get_unified_openapi().unwrap();
    for path in [
        "/events",
        "/funnels",
        "/funnels/{funnel_id}",
        "/funnels/{funnel_id}/conversion",
        "/funnels/preview",
    ] {
        assert!(doc.paths.paths.contains_key(path), "missing {}", path);
    }
}
