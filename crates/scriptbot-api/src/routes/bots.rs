//! Routes for bot administration.
//!
//! Every route here acts on behalf of the operator named by the
//! `X-Owner-Id` header and fails with 403 on bots owned by someone else.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use scriptbot_script::application::query_handlers::{self, BotView};
use scriptbot_script::application::command_handlers;
use scriptbot_script::domain::aggregates::BotStatus;
use scriptbot_script::domain::commands;
use scriptbot_script::domain::report::AnswersTable;
use scriptbot_script::domain::script::{Block, EntryPoint, Mailing};

use crate::error::ApiError;
use crate::extract::OwnerId;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateBotRequest {
    /// Identifier to create the bot under; generated when absent.
    #[serde(default)]
    pub bot_id: Option<Uuid>,
    /// Display name.
    pub name: String,
    /// Channel credential.
    pub token: String,
    /// Entry points of the script.
    pub entry_points: Vec<EntryPoint>,
    /// Blocks of the script.
    pub blocks: Vec<Block>,
}

/// Request body for PUT /{bot_id}/script.
#[derive(Debug, Deserialize)]
pub struct SetScriptRequest {
    /// Replacement entry points.
    pub entry_points: Vec<EntryPoint>,
    /// Replacement blocks.
    pub blocks: Vec<Block>,
}

/// Response body for lifecycle commands.
#[derive(Debug, Serialize)]
pub struct LifecycleResponse {
    /// The bot addressed.
    pub bot_id: Uuid,
    /// Status recorded after the command.
    pub status: BotStatus,
}

/// Response body for POST /{bot_id}/mailings/{name}/send.
#[derive(Debug, Serialize)]
pub struct SendMailingResponse {
    /// Participants that received the mailing.
    pub reached: usize,
}

/// POST /
#[instrument(skip(state, request), fields(owner_id = owner.0))]
async fn create_bot(
    State(state): State<AppState>,
    owner: OwnerId,
    Json(request): Json<CreateBotRequest>,
) -> Result<(StatusCode, Json<BotView>), ApiError> {
    let command = commands::CreateBot {
        correlation_id: Uuid::new_v4(),
        bot_id: request.bot_id.unwrap_or_else(Uuid::new_v4),
        owner_id: owner.0,
        name: request.name,
        token: request.token,
        entry_points: request.entry_points,
        blocks: request.blocks,
    };

    let bot = command_handlers::handle_create_bot(
        &command,
        state.clock.as_ref(),
        state.policy,
        state.bots.as_ref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(BotView::from(&bot))))
}

/// GET /
#[instrument(skip(state), fields(owner_id = owner.0))]
async fn list_bots(
    State(state): State<AppState>,
    owner: OwnerId,
) -> Result<Json<Vec<BotView>>, ApiError> {
    let views = query_handlers::list_bots_by_owner(owner.0, state.bots.as_ref()).await?;
    Ok(Json(views))
}

/// GET /{bot_id}
#[instrument(skip(state), fields(owner_id = owner.0))]
async fn get_bot(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(bot_id): Path<Uuid>,
) -> Result<Json<BotView>, ApiError> {
    let view = query_handlers::get_bot_by_id(bot_id, owner.0, state.bots.as_ref()).await?;
    Ok(Json(view))
}

/// DELETE /{bot_id}
#[instrument(skip(state), fields(owner_id = owner.0))]
async fn delete_bot(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(bot_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let command = commands::DeleteBot {
        correlation_id: Uuid::new_v4(),
        bot_id,
        owner_id: owner.0,
    };

    command_handlers::handle_delete_bot(
        &command,
        state.bots.as_ref(),
        state.participants.as_ref(),
        state.publisher.as_ref(),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /{bot_id}/script
#[instrument(skip(state, request), fields(owner_id = owner.0))]
async fn set_script(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(bot_id): Path<Uuid>,
    Json(request): Json<SetScriptRequest>,
) -> Result<Json<BotView>, ApiError> {
    let command = commands::SetScript {
        correlation_id: Uuid::new_v4(),
        bot_id,
        owner_id: owner.0,
        entry_points: request.entry_points,
        blocks: request.blocks,
    };

    let bot = command_handlers::handle_set_script(
        &command,
        state.clock.as_ref(),
        state.policy,
        state.bots.as_ref(),
    )
    .await?;

    Ok(Json(BotView::from(&bot)))
}

/// POST /{bot_id}/mailings
#[instrument(skip(state, mailing), fields(owner_id = owner.0, mailing = %mailing.name))]
async fn add_mailing(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(bot_id): Path<Uuid>,
    Json(mailing): Json<Mailing>,
) -> Result<(StatusCode, Json<BotView>), ApiError> {
    let command = commands::AddMailing {
        correlation_id: Uuid::new_v4(),
        bot_id,
        owner_id: owner.0,
        mailing,
    };

    let bot =
        command_handlers::handle_add_mailing(&command, state.clock.as_ref(), state.bots.as_ref())
            .await?;

    Ok((StatusCode::CREATED, Json(BotView::from(&bot))))
}

/// POST /{bot_id}/mailings/{name}/send
#[instrument(skip(state), fields(owner_id = owner.0))]
async fn send_mailing(
    State(state): State<AppState>,
    owner: OwnerId,
    Path((bot_id, name)): Path<(Uuid, String)>,
) -> Result<Json<SendMailingResponse>, ApiError> {
    let command = commands::SendMailing {
        correlation_id: Uuid::new_v4(),
        bot_id,
        owner_id: owner.0,
        name,
    };

    let reached = command_handlers::handle_send_mailing(
        &command,
        state.bots.as_ref(),
        state.participants.as_ref(),
        state.publisher.as_ref(),
    )
    .await?;

    Ok(Json(SendMailingResponse { reached }))
}

/// POST /{bot_id}/start
#[instrument(skip(state), fields(owner_id = owner.0))]
async fn start_bot(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(bot_id): Path<Uuid>,
) -> Result<Json<LifecycleResponse>, ApiError> {
    let command = commands::StartBot {
        correlation_id: Uuid::new_v4(),
        bot_id,
        owner_id: owner.0,
    };

    command_handlers::handle_start_bot(
        &command,
        state.clock.as_ref(),
        state.bots.as_ref(),
        state.publisher.as_ref(),
    )
    .await?;

    Ok(Json(LifecycleResponse {
        bot_id,
        status: BotStatus::Started,
    }))
}

/// POST /{bot_id}/stop
#[instrument(skip(state), fields(owner_id = owner.0))]
async fn stop_bot(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(bot_id): Path<Uuid>,
) -> Result<Json<LifecycleResponse>, ApiError> {
    let command = commands::StopBot {
        correlation_id: Uuid::new_v4(),
        bot_id,
        owner_id: owner.0,
    };

    command_handlers::handle_stop_bot(
        &command,
        state.clock.as_ref(),
        state.bots.as_ref(),
        state.publisher.as_ref(),
    )
    .await?;

    Ok(Json(LifecycleResponse {
        bot_id,
        status: BotStatus::Stopped,
    }))
}

/// GET /{bot_id}/answers
#[instrument(skip(state), fields(owner_id = owner.0))]
async fn get_answers(
    State(state): State<AppState>,
    owner: OwnerId,
    Path(bot_id): Path<Uuid>,
) -> Result<Json<AnswersTable>, ApiError> {
    let table = query_handlers::get_answers_table(
        bot_id,
        owner.0,
        state.bots.as_ref(),
        state.participants.as_ref(),
    )
    .await?;
    Ok(Json(table))
}

/// Returns the router for bot administration.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_bot).get(list_bots))
        .route("/{bot_id}", get(get_bot).delete(delete_bot))
        .route("/{bot_id}/script", put(set_script))
        .route("/{bot_id}/mailings", post(add_mailing))
        .route("/{bot_id}/mailings/{name}/send", post(send_mailing))
        .route("/{bot_id}/start", post(start_bot))
        .route("/{bot_id}/stop", post(stop_bot))
        .route("/{bot_id}/answers", get(get_answers))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use scriptbot_bus::Publisher;
    use scriptbot_core::clock::Clock;
    use scriptbot_script::domain::graph::ScriptPolicy;
    use scriptbot_script::domain::repository::BotRepository;
    use scriptbot_store::{InMemoryBotRepository, InMemoryParticipantRepository};
    use scriptbot_test_support::{
        FailingBotRepository, FailingPublisher, FixedClock, RecordingPublisher,
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app_state_with(bots: Arc<dyn BotRepository>, publisher: Arc<dyn Publisher>) -> AppState {
        let clock: Arc<dyn Clock> =
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()));
        AppState::new(
            clock,
            bots,
            Arc::new(InMemoryParticipantRepository::new()),
            publisher,
            ScriptPolicy::default(),
        )
    }

    fn test_app_state() -> AppState {
        app_state_with(
            Arc::new(InMemoryBotRepository::new()),
            Arc::new(RecordingPublisher::new()),
        )
    }

    fn survey() -> Value {
        json!({
            "name": "Survey",
            "token": "123:abc",
            "entry_points": [{ "key": "start", "state": 1 }],
            "blocks": [
                { "state": 1, "next_state": 0, "title": "Name", "text": "Your name?", "type": "question" }
            ]
        })
    }

    fn request(method: &str, uri: &str, owner: Option<i64>, body: Option<&Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(owner) = owner {
            builder = builder.header("x-owner-id", owner.to_string());
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body_bytes).unwrap()
    }

    #[tokio::test]
    async fn test_create_bot_returns_201_with_view() {
        // Arrange
        let app = router().with_state(test_app_state());

        // Act
        let response = app
            .oneshot(request("POST", "/", Some(10), Some(&survey())))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::CREATED);
        let json = json_body(response).await;
        assert_eq!(json["name"], "Survey");
        assert_eq!(json["status"], "stopped");
        assert!(json.get("token").is_none());
        Uuid::parse_str(json["bot_id"].as_str().unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_create_bot_without_owner_header_returns_400() {
        let app = router().with_state(test_app_state());

        let response = app
            .oneshot(request("POST", "/", None, Some(&survey())))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"], "invalid_input");
    }

    #[tokio::test]
    async fn test_create_bot_with_unreachable_block_returns_422() {
        // Arrange
        let app = router().with_state(test_app_state());
        let mut body = survey();
        body["blocks"]
            .as_array_mut()
            .unwrap()
            .push(json!({ "state": 9, "next_state": 0, "title": "Orphan", "text": "orphan", "type": "message" }));

        // Act
        let response = app
            .oneshot(request("POST", "/", Some(10), Some(&body)))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = json_body(response).await;
        assert_eq!(json["error"], "unused_block");
    }

    #[tokio::test]
    async fn test_get_bot_returns_404_for_unknown_bot() {
        let app = router().with_state(test_app_state());

        let response = app
            .oneshot(request("GET", &format!("/{}", Uuid::new_v4()), Some(10), None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["error"], "bot_not_found");
    }

    #[tokio::test]
    async fn test_start_bot_returns_503_when_bus_is_down() {
        // Arrange
        let state = app_state_with(
            Arc::new(InMemoryBotRepository::new()),
            Arc::new(FailingPublisher),
        );
        let created = router()
            .with_state(state.clone())
            .oneshot(request("POST", "/", Some(10), Some(&survey())))
            .await
            .unwrap();
        let bot_id = json_body(created).await["bot_id"].as_str().unwrap().to_owned();

        // Act
        let response = router()
            .with_state(state.clone())
            .oneshot(request("POST", &format!("/{bot_id}/start"), Some(10), None))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let bot = state
            .bots
            .get(Uuid::parse_str(&bot_id).unwrap())
            .await
            .unwrap();
        assert_eq!(bot.status(), BotStatus::Failed);
    }

    #[tokio::test]
    async fn test_list_bots_returns_500_when_store_fails() {
        let state = app_state_with(
            Arc::new(FailingBotRepository),
            Arc::new(RecordingPublisher::new()),
        );
        let app = router().with_state(state);

        let response = app.oneshot(request("GET", "/", Some(10), None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["error"], "infrastructure_error");
    }
}
