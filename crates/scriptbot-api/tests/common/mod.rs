//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use scriptbot_bus::Publisher;
use scriptbot_core::clock::Clock;
use scriptbot_script::domain::graph::ScriptPolicy;
use scriptbot_script::domain::repository::{BotRepository, ParticipantRepository};
use scriptbot_store::{
    InMemoryBotRepository, InMemoryParticipantRepository, PgBotRepository,
    PgParticipantRepository,
};
use scriptbot_test_support::{FixedClock, RecordingPublisher};
use sqlx::PgPool;
use tower::ServiceExt;

use scriptbot_api::routes;
use scriptbot_api::state::AppState;

/// Operator used by the administrative requests.
pub const OWNER: i64 = 10;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

fn build(
    bots: Arc<dyn BotRepository>,
    participants: Arc<dyn ParticipantRepository>,
    publisher: Arc<dyn Publisher>,
) -> Router {
    let app_state = AppState::new(
        fixed_clock(),
        bots,
        participants,
        publisher,
        ScriptPolicy::default(),
    );
    routes::router().with_state(app_state)
}

/// Build the full app router over in-memory stores. The returned publisher
/// records everything the app publishes.
pub fn build_memory_app() -> (Router, Arc<RecordingPublisher>) {
    let publisher = Arc::new(RecordingPublisher::new());
    let app = build(
        Arc::new(InMemoryBotRepository::new()),
        Arc::new(InMemoryParticipantRepository::new()),
        publisher.clone(),
    );
    (app, publisher)
}

/// Build the full app router over the PostgreSQL stores.
pub fn build_pg_app(pool: PgPool) -> (Router, Arc<RecordingPublisher>) {
    let publisher = Arc::new(RecordingPublisher::new());
    let app = build(
        Arc::new(PgBotRepository::new(pool.clone())),
        Arc::new(PgParticipantRepository::new(pool)),
        publisher.clone(),
    );
    (app, publisher)
}

/// The survey used across integration tests: a greeting, a name question
/// and a color selection.
pub fn survey() -> serde_json::Value {
    serde_json::json!({
        "name": "Survey",
        "token": "123:abc",
        "entry_points": [
            { "key": "start", "state": 1 },
            { "key": "colors", "state": 3 }
        ],
        "blocks": [
            {
                "state": 1, "next_state": 2, "title": "Greeting", "text": "Hello!",
                "type": "message"
            },
            {
                "state": 2, "next_state": 3, "title": "Name", "text": "Your name?",
                "type": "question"
            },
            {
                "state": 3, "next_state": 3, "title": "Color", "text": "Pick a color",
                "type": "selection",
                "options": [
                    { "text": "red", "next": 4 },
                    { "text": "blue", "next": 4 }
                ]
            },
            { "state": 4, "next_state": 0, "title": "Bye", "text": "Thanks!", "type": "message" }
        ]
    })
}

/// Send a request and return the status with the JSON body. An empty body
/// reads as `null`, a non-JSON body (framework rejections) as a string.
pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    owner: Option<i64>,
    body: Option<&serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(owner) = owner {
        builder = builder.header("x-owner-id", owner.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&body_bytes).into_owned())
        })
    };

    (status, json)
}

/// Send an administrative POST with a JSON body.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, Some(OWNER), Some(body)).await
}

/// Send an administrative request without a body.
pub async fn admin(app: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, method, uri, Some(OWNER), None).await
}

/// Send an end-user request to the participant routes.
pub async fn user_post(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    send(app, "POST", uri, None, Some(body)).await
}

/// Send an administrative GET.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    send(app, "GET", uri, Some(OWNER), None).await
}

/// Create the survey bot and return its id.
pub async fn create_survey(app: Router) -> String {
    let (status, json) = post_json(app, "/api/v1/bots", &survey()).await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["bot_id"].as_str().unwrap().to_owned()
}
