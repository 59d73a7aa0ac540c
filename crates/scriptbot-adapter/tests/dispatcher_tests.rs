//! Tests for `Dispatcher` and `RunnerRegistry` over the in-memory bus.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scriptbot_adapter::{AdapterError, ChannelClient, Dispatcher, RunnerRegistry};
use scriptbot_bus::{Envelope, InMemoryBus, LifecycleCommand, OutboundMessage, Publisher, RunnerCommand};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Open { bot_id: String, token: String },
    Close { bot_id: String },
    Send { token: String, user_id: i64, text: String },
}

#[derive(Debug, Default)]
struct RecordingChannelClient {
    calls: Mutex<Vec<Call>>,
    cancels: Mutex<Vec<CancellationToken>>,
}

impl RecordingChannelClient {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelClient for RecordingChannelClient {
    async fn open(&self, bot_id: &str, token: &str, cancel: CancellationToken) -> Result<(), AdapterError> {
        self.calls.lock().unwrap().push(Call::Open {
            bot_id: bot_id.to_owned(),
            token: token.to_owned(),
        });
        self.cancels.lock().unwrap().push(cancel);
        Ok(())
    }

    async fn close(&self, bot_id: &str) -> Result<(), AdapterError> {
        self.calls.lock().unwrap().push(Call::Close {
            bot_id: bot_id.to_owned(),
        });
        Ok(())
    }

    async fn send(
        &self,
        token: &str,
        user_id: i64,
        text: &str,
        _buttons: &[String],
    ) -> Result<(), AdapterError> {
        self.calls.lock().unwrap().push(Call::Send {
            token: token.to_owned(),
            user_id,
            text: text.to_owned(),
        });
        Ok(())
    }
}

fn registry(client: &Arc<RecordingChannelClient>) -> RunnerRegistry {
    let client: Arc<dyn ChannelClient> = client.clone();
    RunnerRegistry::new(client, CancellationToken::new())
}

#[tokio::test]
async fn test_start_is_idempotent() {
    // Arrange
    let client = Arc::new(RecordingChannelClient::default());
    let mut registry = registry(&client);

    // Act
    registry.start("bot-1", "t1").await.unwrap();
    registry.start("bot-1", "t1").await.unwrap();

    // Assert
    assert!(registry.is_running("bot-1"));
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test]
async fn test_stop_unknown_bot_is_reported() {
    let client = Arc::new(RecordingChannelClient::default());
    let mut registry = registry(&client);

    let result = registry.stop("ghost").await;

    assert!(matches!(result, Err(AdapterError::RunnerNotFound(id)) if id == "ghost"));
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_stop_cancels_the_session() {
    let client = Arc::new(RecordingChannelClient::default());
    let mut registry = registry(&client);
    registry.start("bot-1", "t1").await.unwrap();

    registry.stop("bot-1").await.unwrap();

    assert!(!registry.is_running("bot-1"));
    assert!(client.cancels.lock().unwrap()[0].is_cancelled());
    assert_eq!(
        client.calls().last(),
        Some(&Call::Close {
            bot_id: "bot-1".to_owned()
        })
    );
}

#[tokio::test]
async fn test_dispatcher_delivers_in_order_and_drops_messages_for_stopped_bots() {
    // Arrange
    let client = Arc::new(RecordingChannelClient::default());
    let (bus, subscriber) = InMemoryBus::channel();
    let dispatcher = Dispatcher::new(Box::new(subscriber), registry(&client));
    let bot_id = Uuid::new_v4();
    let other = Uuid::new_v4();

    bus.publish(vec![LifecycleCommand::start(bot_id, "secret").into()])
        .await
        .unwrap();
    bus.publish(vec![
        OutboundMessage::new(bot_id, 7, "one", Vec::new()).into(),
        OutboundMessage::new(other, 7, "lost", Vec::new()).into(),
        OutboundMessage::new(bot_id, 7, "two", vec!["a".to_owned()]).into(),
    ])
    .await
    .unwrap();
    bus.publish(vec![LifecycleCommand::stop(other).into()])
        .await
        .unwrap();
    drop(bus);

    // Act: the bus is closed, so `run` returns once everything is consumed.
    dispatcher.run(CancellationToken::new()).await.unwrap();

    // Assert
    let bot = bot_id.to_string();
    assert_eq!(
        client.calls(),
        vec![
            Call::Open {
                bot_id: bot.clone(),
                token: "secret".to_owned(),
            },
            Call::Send {
                token: "secret".to_owned(),
                user_id: 7,
                text: "one".to_owned(),
            },
            Call::Send {
                token: "secret".to_owned(),
                user_id: 7,
                text: "two".to_owned(),
            },
            Call::Close { bot_id: bot },
        ]
    );
}

#[tokio::test]
async fn test_dispatch_start_without_token_fails() {
    let client = Arc::new(RecordingChannelClient::default());
    let (_bus, subscriber) = InMemoryBus::channel();
    let mut dispatcher = Dispatcher::new(Box::new(subscriber), registry(&client));

    let result = dispatcher
        .dispatch(Envelope::Lifecycle(LifecycleCommand {
            bot_uuid: "bot-1".to_owned(),
            command: RunnerCommand::Start,
            token: None,
        }))
        .await;

    assert!(matches!(result, Err(AdapterError::MissingToken(_))));
    assert!(!dispatcher.registry().is_running("bot-1"));
}

#[tokio::test]
async fn test_run_returns_when_shutdown_fires() {
    let client = Arc::new(RecordingChannelClient::default());
    let (_bus, subscriber) = InMemoryBus::channel();
    let dispatcher = Dispatcher::new(Box::new(subscriber), registry(&client));
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    dispatcher.run(shutdown).await.unwrap();

    assert!(client.calls().is_empty());
}
