//! Command abstractions.

use uuid::Uuid;

/// Trait that all commands implement.
///
/// Every command in this system targets exactly one bot, so the bot id is
/// part of the contract and ends up on the handler's tracing span.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;

    /// The bot this command operates on.
    fn bot_id(&self) -> Uuid;
}
