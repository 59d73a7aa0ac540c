//! Routes for end-user interaction with a bot's script.
//!
//! `entry` and `process` are the two interpreter entry points: the channel
//! side calls them with the end user's command or reply. The participant
//! read-out is administrative and requires the owner header.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use scriptbot_script::application::command_handlers;
use scriptbot_script::application::query_handlers::{self, ParticipantView};
use scriptbot_script::domain::commands;
use scriptbot_script::domain::interpreter::Message;
use scriptbot_script::domain::participant::Answer;

use crate::error::ApiError;
use crate::extract::OwnerId;
use crate::state::AppState;

/// Request body for POST /{bot_id}/participants/{user_id}/entry.
#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    /// Entry point key.
    pub key: String,
}

/// Request body for POST /{bot_id}/participants/{user_id}/process.
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    /// Literal user input.
    pub text: String,
}

/// Response body for an entry.
#[derive(Debug, Serialize)]
pub struct EntryResponse {
    /// Messages published to the end user, in order.
    pub messages: Vec<Message>,
}

/// Response body for processed input.
#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    /// Messages published to the end user, in order.
    pub messages: Vec<Message>,
    /// The answer recorded for the input, if any.
    pub answer: Option<Answer>,
}

/// POST /{bot_id}/participants/{user_id}/entry
#[instrument(skip(state, request), fields(key = %request.key))]
async fn enter(
    State(state): State<AppState>,
    Path((bot_id, user_id)): Path<(Uuid, i64)>,
    Json(request): Json<EntryRequest>,
) -> Result<Json<EntryResponse>, ApiError> {
    let command = commands::EnterScript {
        correlation_id: Uuid::new_v4(),
        bot_id,
        user_id,
        key: request.key,
    };

    info!(correlation_id = %command.correlation_id, "handling entry");

    let messages = command_handlers::handle_enter(
        &command,
        state.bots.as_ref(),
        state.participants.as_ref(),
        state.publisher.as_ref(),
    )
    .await?;

    Ok(Json(EntryResponse { messages }))
}

/// POST /{bot_id}/participants/{user_id}/process
#[instrument(skip(state, request))]
async fn process(
    State(state): State<AppState>,
    Path((bot_id, user_id)): Path<(Uuid, i64)>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let command = commands::ProcessInput {
        correlation_id: Uuid::new_v4(),
        bot_id,
        user_id,
        text: request.text,
    };

    info!(correlation_id = %command.correlation_id, "handling input");

    let transition = command_handlers::handle_process(
        &command,
        state.bots.as_ref(),
        state.participants.as_ref(),
        state.publisher.as_ref(),
    )
    .await?;

    Ok(Json(ProcessResponse {
        messages: transition.messages,
        answer: transition.answer,
    }))
}

/// GET /{bot_id}/participants/{user_id}
#[instrument(skip(state), fields(owner_id = owner.0))]
async fn get_participant(
    State(state): State<AppState>,
    owner: OwnerId,
    Path((bot_id, user_id)): Path<(Uuid, i64)>,
) -> Result<Json<ParticipantView>, ApiError> {
    let view = query_handlers::get_participant(
        bot_id,
        owner.0,
        user_id,
        state.bots.as_ref(),
        state.participants.as_ref(),
    )
    .await?;
    Ok(Json(view))
}

/// Returns the router for participant interaction.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{bot_id}/participants/{user_id}", get(get_participant))
        .route("/{bot_id}/participants/{user_id}/entry", post(enter))
        .route("/{bot_id}/participants/{user_id}/process", post(process))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use scriptbot_core::clock::Clock;
    use scriptbot_script::domain::aggregates::Bot;
    use scriptbot_script::domain::graph::ScriptPolicy;
    use scriptbot_script::domain::repository::BotRepository;
    use scriptbot_script::domain::script::{Block, EntryPoint};
    use scriptbot_store::{InMemoryBotRepository, InMemoryParticipantRepository};
    use scriptbot_test_support::{FixedClock, RecordingPublisher};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct Fixture {
        state: AppState,
        publisher: Arc<RecordingPublisher>,
        bot_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
        let bots = Arc::new(InMemoryBotRepository::new());
        let publisher = Arc::new(RecordingPublisher::new());

        let bot = Bot::new(
            Uuid::new_v4(),
            10,
            "Survey".to_owned(),
            "123:abc".to_owned(),
            vec![EntryPoint::new("start", 1)],
            vec![
                Block::message(1, 2, "Welcome", "Welcome!"),
                Block::question(2, 0, "Name", "Your name?"),
            ],
            ScriptPolicy::default(),
            now,
        )
        .unwrap();
        bots.create(&bot).await.unwrap();

        Fixture {
            state: AppState::new(
                clock,
                bots,
                Arc::new(InMemoryParticipantRepository::new()),
                publisher.clone(),
                ScriptPolicy::default(),
            ),
            publisher,
            bot_id: bot.id,
        }
    }

    async fn post(state: AppState, uri: &str, body: &Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();

        let response = router().with_state(state).oneshot(request).await.unwrap();
        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body_bytes).unwrap())
    }

    #[tokio::test]
    async fn test_entry_returns_and_publishes_messages() {
        // Arrange
        let fx = fixture().await;

        // Act
        let (status, json) = post(
            fx.state.clone(),
            &format!("/{}/participants/501/entry", fx.bot_id),
            &json!({ "key": "start" }),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["messages"][0]["text"], "Welcome!");
        assert_eq!(json["messages"][1]["text"], "Your name?");
        let published: Vec<String> = fx.publisher.messages().into_iter().map(|m| m.text).collect();
        assert_eq!(published, vec!["Welcome!", "Your name?"]);
    }

    #[tokio::test]
    async fn test_entry_with_unknown_key_returns_404() {
        let fx = fixture().await;

        let (status, json) = post(
            fx.state,
            &format!("/{}/participants/501/entry", fx.bot_id),
            &json!({ "key": "nope" }),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "entry_not_found");
    }

    #[tokio::test]
    async fn test_process_records_answer() {
        // Arrange
        let fx = fixture().await;
        let base = format!("/{}/participants/501", fx.bot_id);
        post(fx.state.clone(), &format!("{base}/entry"), &json!({ "key": "start" })).await;

        // Act
        let (status, json) = post(
            fx.state.clone(),
            &format!("{base}/process"),
            &json!({ "text": "Ivan" }),
        )
        .await;

        // Assert
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["answer"]["text"], "Ivan");
        assert_eq!(json["answer"]["state"], 2);
        assert!(json["messages"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_process_rejects_empty_input() {
        let fx = fixture().await;
        let base = format!("/{}/participants/501", fx.bot_id);
        post(fx.state.clone(), &format!("{base}/entry"), &json!({ "key": "start" })).await;

        let (status, json) = post(fx.state, &format!("{base}/process"), &json!({ "text": "" })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "invalid_input");
    }
}
