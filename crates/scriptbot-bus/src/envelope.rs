//! Bus payloads.
//!
//! Field names are part of the wire contract with channel adapters and must
//! not change.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BusError;

// ---------------------------------------------------------------------------
// OutboundMessage
// ---------------------------------------------------------------------------

/// A chat message the adapter must deliver to one end user.
///
/// `buttons` is empty for plain messages and holds the option labels, in
/// script order, for selection prompts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// The bot that sends the message.
    pub bot_uuid: String,
    /// The receiving end user.
    pub user_id: i64,
    /// Message body.
    pub text: String,
    /// Reply buttons.
    #[serde(default)]
    pub buttons: Vec<String>,
}

impl OutboundMessage {
    /// Builds a message addressed to `user_id` on behalf of `bot_id`.
    pub fn new(bot_id: Uuid, user_id: i64, text: impl Into<String>, buttons: Vec<String>) -> Self {
        Self {
            bot_uuid: bot_id.to_string(),
            user_id,
            text: text.into(),
            buttons,
        }
    }
}

// ---------------------------------------------------------------------------
// LifecycleCommand
// ---------------------------------------------------------------------------

/// Instruction for the adapter's runner of a bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerCommand {
    /// Open the bot's live channel session.
    Start,
    /// Close the bot's live channel session.
    Stop,
}

/// Start/stop command for a bot's channel session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleCommand {
    /// The bot whose runner is addressed.
    pub bot_uuid: String,
    /// What the runner should do.
    pub command: RunnerCommand,
    /// Channel credential, present on `start`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl LifecycleCommand {
    /// Builds a `start` command carrying the channel credential.
    pub fn start(bot_id: Uuid, token: impl Into<String>) -> Self {
        Self {
            bot_uuid: bot_id.to_string(),
            command: RunnerCommand::Start,
            token: Some(token.into()),
        }
    }

    /// Builds a `stop` command.
    #[must_use]
    pub fn stop(bot_id: Uuid) -> Self {
        Self {
            bot_uuid: bot_id.to_string(),
            command: RunnerCommand::Stop,
            token: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Bus topic an envelope travels on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    /// Outbound chat messages.
    Messages,
    /// Runner lifecycle commands.
    Runners,
}

impl Topic {
    /// Stable topic name used by persistent transports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Messages => "messages",
            Self::Runners => "runners",
        }
    }

    /// Parses a stored topic name.
    ///
    /// # Errors
    ///
    /// Returns `BusError::UnknownTopic` for names this build does not know.
    pub fn parse(name: &str) -> Result<Self, BusError> {
        match name {
            "messages" => Ok(Self::Messages),
            "runners" => Ok(Self::Runners),
            other => Err(BusError::UnknownTopic(other.to_owned())),
        }
    }
}

/// Anything that can travel over the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// A chat message for one end user.
    Message(OutboundMessage),
    /// A runner lifecycle command.
    Lifecycle(LifecycleCommand),
}

impl Envelope {
    /// The topic this envelope is published on.
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            Self::Message(_) => Topic::Messages,
            Self::Lifecycle(_) => Topic::Runners,
        }
    }

    /// Ordering key: messages are ordered per bot and user, lifecycle
    /// commands per bot.
    #[must_use]
    pub fn destination(&self) -> String {
        match self {
            Self::Message(message) => format!("{}:{}", message.bot_uuid, message.user_id),
            Self::Lifecycle(command) => command.bot_uuid.clone(),
        }
    }

    /// Serializes the payload (without the topic).
    ///
    /// # Errors
    ///
    /// Returns `BusError::Serialization` if encoding fails.
    pub fn to_payload(&self) -> Result<serde_json::Value, BusError> {
        let value = match self {
            Self::Message(message) => serde_json::to_value(message)?,
            Self::Lifecycle(command) => serde_json::to_value(command)?,
        };
        Ok(value)
    }

    /// Rebuilds an envelope from a stored topic name and payload.
    ///
    /// # Errors
    ///
    /// Returns `BusError::UnknownTopic` or `BusError::Serialization` when the
    /// stored row cannot be decoded.
    pub fn from_parts(topic: &str, payload: serde_json::Value) -> Result<Self, BusError> {
        match Topic::parse(topic)? {
            Topic::Messages => Ok(Self::Message(serde_json::from_value(payload)?)),
            Topic::Runners => Ok(Self::Lifecycle(serde_json::from_value(payload)?)),
        }
    }
}

impl From<OutboundMessage> for Envelope {
    fn from(message: OutboundMessage) -> Self {
        Self::Message(message)
    }
}

impl From<LifecycleCommand> for Envelope {
    fn from(command: LifecycleCommand) -> Self {
        Self::Lifecycle(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outbound_message_uses_stable_field_names() {
        // Arrange
        let bot_id = Uuid::new_v4();
        let message = OutboundMessage::new(bot_id, 42, "Pick one", vec!["3".into(), "4".into()]);

        // Act
        let payload = Envelope::from(message).to_payload().unwrap();

        // Assert
        assert_eq!(
            payload,
            json!({
                "bot_uuid": bot_id.to_string(),
                "user_id": 42,
                "text": "Pick one",
                "buttons": ["3", "4"],
            })
        );
    }

    #[test]
    fn test_plain_message_serializes_empty_buttons_array() {
        let message = OutboundMessage::new(Uuid::new_v4(), 1, "hello", Vec::new());

        let payload = serde_json::to_value(&message).unwrap();

        assert_eq!(payload["buttons"], json!([]));
    }

    #[test]
    fn test_lifecycle_command_serializes_lowercase_command() {
        let bot_id = Uuid::new_v4();

        let stop = serde_json::to_value(LifecycleCommand::stop(bot_id)).unwrap();
        let start = serde_json::to_value(LifecycleCommand::start(bot_id, "secret")).unwrap();

        assert_eq!(stop, json!({ "bot_uuid": bot_id.to_string(), "command": "stop" }));
        assert_eq!(start["command"], "start");
        assert_eq!(start["token"], "secret");
    }

    #[test]
    fn test_from_parts_decodes_stored_rows() {
        let bot_id = Uuid::new_v4();
        let payload = json!({ "bot_uuid": bot_id.to_string(), "command": "start", "token": "t" });

        let envelope = Envelope::from_parts("runners", payload).unwrap();

        assert_eq!(envelope, Envelope::Lifecycle(LifecycleCommand::start(bot_id, "t")));
        assert_eq!(envelope.topic(), Topic::Runners);
    }

    #[test]
    fn test_from_parts_rejects_unknown_topic() {
        let result = Envelope::from_parts("billing", json!({}));

        match result {
            Err(BusError::UnknownTopic(name)) => assert_eq!(name, "billing"),
            other => panic!("expected UnknownTopic, got {other:?}"),
        }
    }

    #[test]
    fn test_destination_orders_messages_per_user() {
        let bot_id = Uuid::new_v4();
        let to_one = Envelope::from(OutboundMessage::new(bot_id, 1, "a", Vec::new()));
        let to_two = Envelope::from(OutboundMessage::new(bot_id, 2, "a", Vec::new()));

        assert_ne!(to_one.destination(), to_two.destination());
        assert_eq!(
            Envelope::from(LifecycleCommand::stop(bot_id)).destination(),
            bot_id.to_string()
        );
    }
}
