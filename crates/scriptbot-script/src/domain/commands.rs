//! Commands for the Script Authoring & Interpretation context.

use scriptbot_core::command::Command;
use uuid::Uuid;

use super::script::{Block, EntryPoint, Mailing};

/// Command to create a bot with its script.
#[derive(Debug, Clone)]
pub struct CreateBot {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Identifier of the new bot.
    pub bot_id: Uuid,
    /// The operator creating the bot.
    pub owner_id: i64,
    /// Display name.
    pub name: String,
    /// Channel credential.
    pub token: String,
    /// Entry points of the script.
    pub entry_points: Vec<EntryPoint>,
    /// Blocks of the script.
    pub blocks: Vec<Block>,
}

impl Command for CreateBot {
    fn command_type(&self) -> &'static str {
        "script.create_bot"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn bot_id(&self) -> Uuid {
        self.bot_id
    }
}

/// Command to replace a bot's entry points and blocks.
#[derive(Debug, Clone)]
pub struct SetScript {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The bot to update.
    pub bot_id: Uuid,
    /// The operator issuing the command.
    pub owner_id: i64,
    /// New entry points.
    pub entry_points: Vec<EntryPoint>,
    /// New blocks.
    pub blocks: Vec<Block>,
}

impl Command for SetScript {
    fn command_type(&self) -> &'static str {
        "script.set_script"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn bot_id(&self) -> Uuid {
        self.bot_id
    }
}

/// Command to add a mailing to a bot.
#[derive(Debug, Clone)]
pub struct AddMailing {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The bot to update.
    pub bot_id: Uuid,
    /// The operator issuing the command.
    pub owner_id: i64,
    /// The mailing to add.
    pub mailing: Mailing,
}

impl Command for AddMailing {
    fn command_type(&self) -> &'static str {
        "script.add_mailing"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn bot_id(&self) -> Uuid {
        self.bot_id
    }
}

/// Command to deliver a mailing to every participant it addresses.
#[derive(Debug, Clone)]
pub struct SendMailing {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The bot owning the mailing.
    pub bot_id: Uuid,
    /// The operator issuing the command.
    pub owner_id: i64,
    /// Name of the mailing.
    pub name: String,
}

impl Command for SendMailing {
    fn command_type(&self) -> &'static str {
        "script.send_mailing"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn bot_id(&self) -> Uuid {
        self.bot_id
    }
}

/// Command to open a bot's channel session.
#[derive(Debug, Clone)]
pub struct StartBot {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The bot to start.
    pub bot_id: Uuid,
    /// The operator issuing the command.
    pub owner_id: i64,
}

impl Command for StartBot {
    fn command_type(&self) -> &'static str {
        "script.start_bot"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn bot_id(&self) -> Uuid {
        self.bot_id
    }
}

/// Command to close a bot's channel session.
#[derive(Debug, Clone)]
pub struct StopBot {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The bot to stop.
    pub bot_id: Uuid,
    /// The operator issuing the command.
    pub owner_id: i64,
}

impl Command for StopBot {
    fn command_type(&self) -> &'static str {
        "script.stop_bot"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn bot_id(&self) -> Uuid {
        self.bot_id
    }
}

/// Command to delete a bot and its participants.
#[derive(Debug, Clone)]
pub struct DeleteBot {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The bot to delete.
    pub bot_id: Uuid,
    /// The operator issuing the command.
    pub owner_id: i64,
}

impl Command for DeleteBot {
    fn command_type(&self) -> &'static str {
        "script.delete_bot"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn bot_id(&self) -> Uuid {
        self.bot_id
    }
}

/// Command to (re-)enter a script at an entry point for one end user.
#[derive(Debug, Clone)]
pub struct EnterScript {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The bot the user talks to.
    pub bot_id: Uuid,
    /// The end user.
    pub user_id: i64,
    /// Entry point key.
    pub key: String,
}

impl Command for EnterScript {
    fn command_type(&self) -> &'static str {
        "script.enter"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn bot_id(&self) -> Uuid {
        self.bot_id
    }
}

/// Command to feed one piece of end-user input into the script.
#[derive(Debug, Clone)]
pub struct ProcessInput {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The bot the user talks to.
    pub bot_id: Uuid,
    /// The end user.
    pub user_id: i64,
    /// Literal user input.
    pub text: String,
}

impl Command for ProcessInput {
    fn command_type(&self) -> &'static str {
        "script.process"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn bot_id(&self) -> Uuid {
        self.bot_id
    }
}
