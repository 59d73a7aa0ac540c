//! Answers table: one row per participant, one column per answerable block.

use serde::Serialize;

use super::participant::Participant;
use super::script::Script;

/// Header of the first column.
pub const USER_ID_COLUMN: &str = "UserID";

/// Tabular projection of every participant's answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswersTable {
    /// `"UserID"` followed by the titles of question and selection blocks.
    pub head: Vec<String>,
    /// One row per participant.
    pub body: Vec<Vec<String>>,
}

/// Builds the answers table.
///
/// Columns follow ascending block state and rows ascending user id, so the
/// output does not depend on how blocks or participants were stored.
/// Unanswered cells are empty strings.
#[must_use]
pub fn build_answers_table(script: &Script, participants: &[Participant]) -> AnswersTable {
    let columns: Vec<_> = script.blocks().filter(|block| !block.is_message()).collect();

    let mut head = Vec::with_capacity(columns.len() + 1);
    head.push(USER_ID_COLUMN.to_owned());
    head.extend(columns.iter().map(|block| block.title.clone()));

    let mut rows: Vec<&Participant> = participants.iter().collect();
    rows.sort_by_key(|participant| participant.user_id());

    let body = rows
        .into_iter()
        .map(|participant| {
            let mut row = Vec::with_capacity(columns.len() + 1);
            row.push(participant.user_id().to_string());
            row.extend(columns.iter().map(|block| {
                participant
                    .answer_at(block.state)
                    .map(|answer| answer.text.clone())
                    .unwrap_or_default()
            }));
            row
        })
        .collect();

    AnswersTable { head, body }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::graph::ScriptPolicy;
    use crate::domain::participant::Answer;
    use crate::domain::script::{Block, EntryPoint};
    use uuid::Uuid;

    const IVAN: i64 = 1001;
    const JOHN: i64 = 1002;

    fn names_script(blocks: Vec<Block>) -> Script {
        Script::new(vec![EntryPoint::new("start", 1)], blocks, ScriptPolicy::default()).unwrap()
    }

    fn participant(bot_id: Uuid, user_id: i64, answers: &[(u32, &str)]) -> Participant {
        Participant::restore(
            bot_id,
            user_id,
            0,
            answers
                .iter()
                .map(|(state, text)| Answer::new(user_id, *state, *text).unwrap())
                .collect(),
        )
    }

    #[test]
    fn test_build_answers_table_is_deterministic() {
        // Arrange: blocks and participants supplied in reverse order.
        let script = names_script(vec![
            Block::question(2, 0, "Last name", "Your last name?"),
            Block::question(1, 2, "First name", "Your first name?"),
        ]);
        let bot_id = Uuid::new_v4();
        let participants = vec![
            participant(bot_id, JOHN, &[(1, "John")]),
            participant(bot_id, IVAN, &[(1, "Ivan"), (2, "Ivanov")]),
        ];

        // Act
        let table = build_answers_table(&script, &participants);

        // Assert
        assert_eq!(table.head, vec!["UserID", "First name", "Last name"]);
        assert_eq!(
            table.body,
            vec![
                vec![IVAN.to_string(), "Ivan".to_owned(), "Ivanov".to_owned()],
                vec![JOHN.to_string(), "John".to_owned(), String::new()],
            ]
        );
    }

    #[test]
    fn test_message_blocks_get_no_column() {
        let script = names_script(vec![
            Block::message(1, 2, "Welcome", "Hi!"),
            Block::question(2, 0, "Name", "Your name?"),
        ]);

        let table = build_answers_table(&script, &[]);

        assert_eq!(table.head, vec!["UserID", "Name"]);
        assert!(table.body.is_empty());
    }
}
