//! Router smoke tests over the in-memory store.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use db::MemoryStore;
use engine::{EngineConfig, FixedClock, ScheduleEngine, ScheduleRules};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{router, AppState};

fn app() -> Router {
    let today = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
    let engine = ScheduleEngine::new(
        Arc::new(MemoryStore::new()),
        Arc::new(ScheduleRules::default()),
        EngineConfig::default(),
        Arc::new(FixedClock(today)),
    );
    router(AppState::new(engine))
}

async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn plan_then_complete_by_step_id() {
    let app = app();
    let project = Uuid::new_v4();

    let (status, planned) = call(
        &app,
        Method::POST,
        &format!("/api/v1/projects/{project}/plan"),
        Some(json!({ "start_date": "2024-03-04" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(planned["items"].as_array().unwrap().len(), 19);

    let (status, summary) = call(
        &app,
        Method::POST,
        &format!("/api/v1/projects/{project}/steps/preparation-terrain/complete"),
        Some(json!({ "actual_days": 3 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // Planned end 03-05, finished 03-06.
    assert_eq!(summary["days_ahead"], json!(-1));

    let schedule_uri = format!("/api/v1/projects/{project}/schedule");
    let (status, schedule) = call(&app, Method::GET, &schedule_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(schedule[0]["step_id"], json!("preparation-terrain"));
    assert_eq!(schedule[0]["status"], json!("completed"));
    assert_eq!(schedule[0]["end_date"], json!("2024-03-06"));
}

#[tokio::test]
async fn completion_without_body_uses_one_day() {
    let app = app();
    let project = Uuid::new_v4();

    let (status, summary) = call(
        &app,
        Method::POST,
        &format!("/api/v1/projects/{project}/steps/gypse/complete"),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["items"][0]["actual_days"], json!(1));
}

#[tokio::test]
async fn error_statuses() {
    let app = app();
    let project = Uuid::new_v4();

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/v1/schedule/{}/complete", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/v1/projects/{project}/steps/sauna/complete"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/v1/projects/{project}/steps/gypse/complete"),
        Some(json!({ "actual_days": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/v1/projects/{project}/steps/gypse/complete"),
        Some(json!({ "actual_days": i32::MAX })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let dismiss_uri = format!("/api/v1/alerts/{}/dismiss", Uuid::new_v4());
    let (status, _) = call(&app, Method::POST, &dismiss_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn alerts_can_be_dismissed_and_listed_again() {
    let app = app();
    let project = Uuid::new_v4();
    call(
        &app,
        Method::POST,
        &format!("/api/v1/projects/{project}/plan"),
        Some(json!({ "start_date": "2024-03-04" })),
    )
    .await;

    let alerts_uri = format!("/api/v1/projects/{project}/alerts");
    let (_, alerts) = call(&app, Method::GET, &alerts_uri, None).await;
    let total = alerts.as_array().unwrap().len();
    assert!(total > 0);
    let first = alerts[0]["id"].as_str().unwrap().to_string();

    let dismiss_uri = format!("/api/v1/alerts/{first}/dismiss");
    let (status, _) = call(&app, Method::POST, &dismiss_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, visible) = call(&app, Method::GET, &alerts_uri, None).await;
    assert_eq!(visible.as_array().unwrap().len(), total - 1);
    let all_uri = format!("{alerts_uri}?include_dismissed=true");
    let (_, all) = call(&app, Method::GET, &all_uri, None).await;
    assert_eq!(all.as_array().unwrap().len(), total);
}

#[tokio::test]
async fn planned_project_has_no_conflicts() {
    let app = app();
    let project = Uuid::new_v4();
    call(
        &app,
        Method::POST,
        &format!("/api/v1/projects/{project}/plan"),
        Some(json!({ "start_date": "2024-03-04" })),
    )
    .await;

    let conflicts_uri = format!("/api/v1/projects/{project}/conflicts");
    let (status, reports) = call(&app, Method::GET, &conflicts_uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reports, json!([]));
}
