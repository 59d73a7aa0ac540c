//! Command handlers for the Script Authoring & Interpretation context.
//!
//! This module contains application-level command handler functions that
//! orchestrate domain logic: load the aggregate, execute the command inside
//! the repository's update scope, then publish the resulting envelopes.
//!
//! Publishing happens after the state commit. A publish failure is returned
//! to the caller, but the committed state stays advanced; wrap the publisher
//! in an `OutboxPublisher` to retry instead.

use scriptbot_bus::{Envelope, LifecycleCommand, OutboundMessage, Publisher};
use scriptbot_core::clock::Clock;
use scriptbot_core::command::Command;
use scriptbot_core::error::DomainError;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::aggregates::{Bot, BotStatus};
use crate::domain::commands::{
    AddMailing, CreateBot, DeleteBot, EnterScript, ProcessInput, SendMailing, SetScript, StartBot,
    StopBot,
};
use crate::domain::graph::ScriptPolicy;
use crate::domain::interpreter::{self, Message, Transition};
use crate::domain::participant::Participant;
use crate::domain::repository::{BotRepository, ParticipantRepository};
use crate::domain::script::Mailing;

fn announce(command: &dyn Command) {
    info!(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id(),
        bot_id = %command.bot_id(),
        "handling command"
    );
}

/// Publishes `messages` for one end user as a single ordered batch.
async fn publish_messages(
    publisher: &dyn Publisher,
    bot_id: Uuid,
    user_id: i64,
    messages: &[Message],
) -> Result<(), DomainError> {
    if messages.is_empty() {
        return Ok(());
    }
    let batch: Vec<Envelope> = messages
        .iter()
        .map(|message| {
            Envelope::from(OutboundMessage::new(
                bot_id,
                user_id,
                message.text.clone(),
                message.buttons.clone(),
            ))
        })
        .collect();

    publisher.publish(batch).await.map_err(|e| {
        warn!(
            %bot_id,
            user_id,
            error = %e,
            "participant state committed but outbound messages were not published"
        );
        DomainError::from(e)
    })
}

/// Handles the `CreateBot` command: validates the script and persists the
/// new, stopped bot.
///
/// # Errors
///
/// Returns script validation errors, `DomainError::InvalidInput`, or
/// `DomainError::BotAlreadyExists` if the id is taken.
#[instrument(skip_all, fields(bot_id = %command.bot_id))]
pub async fn handle_create_bot(
    command: &CreateBot,
    clock: &dyn Clock,
    policy: ScriptPolicy,
    bots: &dyn BotRepository,
) -> Result<Bot, DomainError> {
    announce(command);

    let bot = Bot::new(
        command.bot_id,
        command.owner_id,
        command.name.clone(),
        command.token.clone(),
        command.entry_points.clone(),
        command.blocks.clone(),
        policy,
        clock.now(),
    )?;
    bots.create(&bot).await?;

    Ok(bot)
}

/// Handles the `SetScript` command: validates the replacement script and
/// swaps it in under the bot's update scope. The previous script survives
/// any failure.
///
/// # Errors
///
/// Returns `DomainError::BotNotFound`, `DomainError::PermissionDenied`, or a
/// script validation error.
#[instrument(skip_all, fields(bot_id = %command.bot_id))]
pub async fn handle_set_script(
    command: &SetScript,
    clock: &dyn Clock,
    policy: ScriptPolicy,
    bots: &dyn BotRepository,
) -> Result<Bot, DomainError> {
    announce(command);

    let owner_id = command.owner_id;
    let entry_points = command.entry_points.clone();
    let blocks = command.blocks.clone();
    let now = clock.now();

    let result = bots
        .update(
            command.bot_id,
            Box::new(move |bot: &mut Bot| {
                bot.ensure_owner(owner_id)?;
                bot.set_script(entry_points, blocks, policy, now)
            }),
        )
        .await;

    if let Err(e) = &result {
        if e.is_script_error() {
            warn!(error = %e, "script rejected, previous script kept");
        }
    }
    result
}

/// Handles the `AddMailing` command.
///
/// # Errors
///
/// Returns `DomainError::BotNotFound`, `DomainError::PermissionDenied`, or a
/// mailing validation error.
#[instrument(skip_all, fields(bot_id = %command.bot_id))]
pub async fn handle_add_mailing(
    command: &AddMailing,
    clock: &dyn Clock,
    bots: &dyn BotRepository,
) -> Result<Bot, DomainError> {
    announce(command);

    let owner_id = command.owner_id;
    let mailing = command.mailing.clone();
    let now = clock.now();

    bots.update(
        command.bot_id,
        Box::new(move |bot: &mut Bot| {
            bot.ensure_owner(owner_id)?;
            bot.add_mailing(mailing, now)
        }),
    )
    .await
}

/// Handles the `StartBot` command: publishes a `start` lifecycle command and
/// records the outcome as the bot's status.
///
/// # Errors
///
/// Returns `DomainError::BotNotFound`, `DomainError::PermissionDenied`, or
/// `DomainError::Publish` (after marking the bot `Failed`).
#[instrument(skip_all, fields(bot_id = %command.bot_id))]
pub async fn handle_start_bot(
    command: &StartBot,
    clock: &dyn Clock,
    bots: &dyn BotRepository,
    publisher: &dyn Publisher,
) -> Result<(), DomainError> {
    announce(command);

    let bot = bots.get(command.bot_id).await?;
    bot.ensure_owner(command.owner_id)?;

    let start = LifecycleCommand::start(bot.id, bot.token());
    if let Err(e) = publisher.publish(vec![start.into()]).await {
        error!(error = %e, "failed to publish start command");
        bots.update_status(bot.id, BotStatus::Failed, clock.now())
            .await?;
        return Err(e.into());
    }

    bots.update_status(bot.id, BotStatus::Started, clock.now())
        .await
}

/// Handles the `StopBot` command: publishes a `stop` lifecycle command and
/// marks the bot `Stopped`.
///
/// # Errors
///
/// Returns `DomainError::BotNotFound`, `DomainError::PermissionDenied`, or
/// `DomainError::Publish` (status unchanged).
#[instrument(skip_all, fields(bot_id = %command.bot_id))]
pub async fn handle_stop_bot(
    command: &StopBot,
    clock: &dyn Clock,
    bots: &dyn BotRepository,
    publisher: &dyn Publisher,
) -> Result<(), DomainError> {
    announce(command);

    let bot = bots.get(command.bot_id).await?;
    bot.ensure_owner(command.owner_id)?;

    publisher
        .publish(vec![LifecycleCommand::stop(bot.id).into()])
        .await?;

    bots.update_status(bot.id, BotStatus::Stopped, clock.now())
        .await
}

/// Handles the `DeleteBot` command: stops a running bot, then deletes it
/// together with its participants.
///
/// # Errors
///
/// Returns `DomainError::BotNotFound`, `DomainError::PermissionDenied`, or
/// `DomainError::Publish` (nothing deleted).
#[instrument(skip_all, fields(bot_id = %command.bot_id))]
pub async fn handle_delete_bot(
    command: &DeleteBot,
    bots: &dyn BotRepository,
    participants: &dyn ParticipantRepository,
    publisher: &dyn Publisher,
) -> Result<(), DomainError> {
    announce(command);

    let bot = bots.get(command.bot_id).await?;
    bot.ensure_owner(command.owner_id)?;

    if bot.status() == BotStatus::Started {
        publisher
            .publish(vec![LifecycleCommand::stop(bot.id).into()])
            .await?;
    }

    participants.delete_by_bot(bot.id).await?;
    bots.delete(bot.id).await
}

/// Handles the `EnterScript` command: re-enters the script at the requested
/// entry point for one end user and publishes the resulting messages.
///
/// # Errors
///
/// Returns `DomainError::BotNotFound`, `DomainError::EntryNotFound`,
/// `DomainError::RunawayScript`, persistence errors, or
/// `DomainError::Publish` after the state was committed.
#[instrument(skip_all, fields(bot_id = %command.bot_id, user_id = command.user_id))]
pub async fn handle_enter(
    command: &EnterScript,
    bots: &dyn BotRepository,
    participants: &dyn ParticipantRepository,
    publisher: &dyn Publisher,
) -> Result<Vec<Message>, DomainError> {
    announce(command);

    let bot = bots.get(command.bot_id).await?;
    let script = bot.script();
    let key = command.key.as_str();

    let transition = participants
        .update_or_create(
            command.bot_id,
            command.user_id,
            Box::new(move |participant: &mut Participant| -> Result<Transition, DomainError> {
                let messages = interpreter::entry(script, participant, key)?;
                Ok(Transition {
                    messages,
                    answer: None,
                })
            }),
        )
        .await?;

    publish_messages(publisher, command.bot_id, command.user_id, &transition.messages).await?;
    Ok(transition.messages)
}

/// Handles the `ProcessInput` command: feeds the input into the script,
/// records the captured answer together with the new state, and publishes
/// the resulting messages.
///
/// # Errors
///
/// Returns `DomainError::BotNotFound`, `DomainError::InvalidInput`,
/// `DomainError::BlockNotFound`, `DomainError::RunawayScript`, persistence
/// errors, or `DomainError::Publish` after the state was committed.
#[instrument(skip_all, fields(bot_id = %command.bot_id, user_id = command.user_id))]
pub async fn handle_process(
    command: &ProcessInput,
    bots: &dyn BotRepository,
    participants: &dyn ParticipantRepository,
    publisher: &dyn Publisher,
) -> Result<Transition, DomainError> {
    announce(command);

    let bot = bots.get(command.bot_id).await?;
    let script = bot.script();
    let text = command.text.as_str();

    let transition = participants
        .update_or_create(
            command.bot_id,
            command.user_id,
            Box::new(move |participant: &mut Participant| -> Result<Transition, DomainError> {
                let transition = interpreter::process(script, participant, text)?;
                if let Some(answer) = &transition.answer {
                    participant.record_answer(answer.clone());
                }
                Ok(transition)
            }),
        )
        .await?;

    publish_messages(publisher, command.bot_id, command.user_id, &transition.messages).await?;
    Ok(transition)
}

/// Re-enters the mailing's entry point for one participant, provided it is
/// still parked at the mailing's required state once its scope is held.
/// Returns `None` when the participant moved on in the meantime.
async fn enter_if_parked(
    bot: &Bot,
    mailing: &Mailing,
    user_id: i64,
    participants: &dyn ParticipantRepository,
) -> Result<Option<Vec<Message>>, DomainError> {
    let script = bot.script();
    let mut entered = false;
    let entered_flag = &mut entered;

    let transition = participants
        .update_or_create(
            bot.id,
            user_id,
            Box::new(move |participant: &mut Participant| -> Result<Transition, DomainError> {
                if participant.current_state() != mailing.required_state {
                    return Ok(Transition::default());
                }
                *entered_flag = true;
                let messages = interpreter::entry(script, participant, &mailing.entry_key)?;
                Ok(Transition {
                    messages,
                    answer: None,
                })
            }),
        )
        .await?;

    Ok(entered.then_some(transition.messages))
}

/// Handles the `SendMailing` command: re-enters the mailing's entry point
/// for every participant parked at its required state.
///
/// Each participant is handled in its own update scope; a failure for one
/// participant is logged and does not stop the others.
///
/// Returns the number of participants that received the mailing.
///
/// # Errors
///
/// Returns `DomainError::BotNotFound`, `DomainError::PermissionDenied`,
/// `DomainError::MailingNotFound`, or a persistence error while listing
/// participants.
#[instrument(skip_all, fields(bot_id = %command.bot_id, mailing = %command.name))]
pub async fn handle_send_mailing(
    command: &SendMailing,
    bots: &dyn BotRepository,
    participants: &dyn ParticipantRepository,
    publisher: &dyn Publisher,
) -> Result<usize, DomainError> {
    announce(command);

    let bot = bots.get(command.bot_id).await?;
    bot.ensure_owner(command.owner_id)?;
    let mailing = bot
        .mailing(&command.name)
        .ok_or_else(|| DomainError::MailingNotFound(command.name.clone()))?;

    let audience = participants.list_by_bot(bot.id).await?;
    let mut reached = 0;
    for participant in audience
        .iter()
        .filter(|participant| participant.current_state() == mailing.required_state)
    {
        let user_id = participant.user_id();
        match enter_if_parked(&bot, mailing, user_id, participants).await {
            Ok(Some(messages)) => {
                if publish_messages(publisher, bot.id, user_id, &messages)
                    .await
                    .is_ok()
                {
                    reached += 1;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(user_id, error = %e, "mailing entry failed for participant"),
        }
    }

    info!(reached, "mailing delivered");
    Ok(reached)
}

/// Re-publishes `start` for every bot recorded as `Started`, so a restarted
/// adapter reopens their channel sessions.
///
/// Returns the number of bots resumed.
///
/// # Errors
///
/// Returns a persistence error or `DomainError::Publish`.
#[instrument(skip_all)]
pub async fn handle_resume_started_bots(
    bots: &dyn BotRepository,
    publisher: &dyn Publisher,
) -> Result<usize, DomainError> {
    let started = bots.list_by_status(BotStatus::Started).await?;
    if started.is_empty() {
        return Ok(0);
    }

    let batch: Vec<Envelope> = started
        .iter()
        .map(|bot| LifecycleCommand::start(bot.id, bot.token()).into())
        .collect();
    publisher.publish(batch).await?;

    info!(count = started.len(), "resumed started bots");
    Ok(started.len())
}
