//! Tests for the script query handlers.

use chrono::{TimeZone, Utc};
use scriptbot_core::error::DomainError;
use scriptbot_script::application::command_handlers::{handle_create_bot, handle_enter, handle_process};
use scriptbot_script::application::query_handlers::{
    get_answers_table, get_bot_by_id, get_participant, list_bots_by_owner,
};
use scriptbot_script::domain::commands::{CreateBot, EnterScript, ProcessInput};
use scriptbot_script::domain::graph::ScriptPolicy;
use scriptbot_script::domain::script::{Block, EntryPoint};
use scriptbot_store::{InMemoryBotRepository, InMemoryParticipantRepository};
use scriptbot_test_support::{FailingBotRepository, FixedClock, RecordingPublisher};
use uuid::Uuid;

const OWNER: i64 = 10;

async fn create_names_bot(bots: &InMemoryBotRepository) -> Uuid {
    let bot_id = Uuid::new_v4();
    handle_create_bot(
        &CreateBot {
            correlation_id: Uuid::new_v4(),
            bot_id,
            owner_id: OWNER,
            name: "Names".to_owned(),
            token: "secret-token".to_owned(),
            entry_points: vec![EntryPoint::new("start", 1)],
            blocks: vec![
                Block::question(1, 2, "First name", "Your first name?"),
                Block::question(2, 3, "Last name", "Your last name?"),
                Block::message(3, 0, "Bye", "Thanks"),
            ],
        },
        &FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()),
        ScriptPolicy::default(),
        bots,
    )
    .await
    .unwrap();
    bot_id
}

async fn answer(
    bots: &InMemoryBotRepository,
    participants: &InMemoryParticipantRepository,
    bot_id: Uuid,
    user_id: i64,
    texts: &[&str],
) {
    let publisher = RecordingPublisher::new();
    handle_enter(
        &EnterScript {
            correlation_id: Uuid::new_v4(),
            bot_id,
            user_id,
            key: "start".to_owned(),
        },
        bots,
        participants,
        &publisher,
    )
    .await
    .unwrap();
    for text in texts {
        handle_process(
            &ProcessInput {
                correlation_id: Uuid::new_v4(),
                bot_id,
                user_id,
                text: (*text).to_owned(),
            },
            bots,
            participants,
            &publisher,
        )
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn test_get_answers_table_lists_every_participant() {
    // Arrange
    let bots = InMemoryBotRepository::new();
    let participants = InMemoryParticipantRepository::new();
    let bot_id = create_names_bot(&bots).await;
    answer(&bots, &participants, bot_id, 1002, &["John"]).await;
    answer(&bots, &participants, bot_id, 1001, &["Ivan", "Ivanov"]).await;

    // Act
    let table = get_answers_table(bot_id, OWNER, &bots, &participants)
        .await
        .unwrap();

    // Assert
    assert_eq!(table.head, vec!["UserID", "First name", "Last name"]);
    assert_eq!(
        table.body,
        vec![
            vec!["1001".to_owned(), "Ivan".to_owned(), "Ivanov".to_owned()],
            vec!["1002".to_owned(), "John".to_owned(), String::new()],
        ]
    );
}

#[tokio::test]
async fn test_get_answers_table_requires_owner() {
    let bots = InMemoryBotRepository::new();
    let participants = InMemoryParticipantRepository::new();
    let bot_id = create_names_bot(&bots).await;

    let result = get_answers_table(bot_id, OWNER + 1, &bots, &participants).await;

    assert!(matches!(result, Err(DomainError::PermissionDenied(_))));
}

#[tokio::test]
async fn test_get_bot_by_id_hides_token() {
    // Arrange
    let bots = InMemoryBotRepository::new();
    let bot_id = create_names_bot(&bots).await;

    // Act
    let view = get_bot_by_id(bot_id, OWNER, &bots).await.unwrap();

    // Assert
    assert_eq!(view.bot_id, bot_id);
    assert_eq!(view.blocks.len(), 3);
    let json = serde_json::to_string(&view).unwrap();
    assert!(!json.contains("secret-token"));
}

#[tokio::test]
async fn test_list_bots_by_owner_filters_by_owner() {
    let bots = InMemoryBotRepository::new();
    create_names_bot(&bots).await;
    create_names_bot(&bots).await;

    assert_eq!(list_bots_by_owner(OWNER, &bots).await.unwrap().len(), 2);
    assert!(list_bots_by_owner(OWNER + 1, &bots).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_get_participant_returns_state_and_answers() {
    let bots = InMemoryBotRepository::new();
    let participants = InMemoryParticipantRepository::new();
    let bot_id = create_names_bot(&bots).await;
    answer(&bots, &participants, bot_id, 7, &["Ivan"]).await;

    let view = get_participant(bot_id, OWNER, 7, &bots, &participants)
        .await
        .unwrap();

    assert_eq!(view.current_state, 2);
    assert_eq!(view.answers.len(), 1);
    assert_eq!(view.answers[0].text, "Ivan");
}

#[tokio::test]
async fn test_get_participant_unknown_user_is_not_found() {
    let bots = InMemoryBotRepository::new();
    let participants = InMemoryParticipantRepository::new();
    let bot_id = create_names_bot(&bots).await;

    let result = get_participant(bot_id, OWNER, 99, &bots, &participants).await;

    assert!(matches!(
        result,
        Err(DomainError::ParticipantNotFound { user_id: 99, .. })
    ));
}

#[tokio::test]
async fn test_get_bot_by_id_propagates_repository_failure() {
    let result = get_bot_by_id(Uuid::new_v4(), OWNER, &FailingBotRepository).await;

    assert!(matches!(result, Err(DomainError::Infrastructure(_))));
}
