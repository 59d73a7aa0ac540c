//! `PostgreSQL` implementation of the `ParticipantRepository` trait.
//!
//! `update_or_create` makes sure the participant row exists, then locks it
//! with `SELECT ... FOR UPDATE` for the rest of the transaction. The row lock
//! serializes mutations of one participant; rows of other participants stay
//! free. Answers are rewritten wholesale from the mutated participant before
//! commit.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use scriptbot_core::error::DomainError;
use scriptbot_script::domain::interpreter::Transition;
use scriptbot_script::domain::participant::{Answer, Participant};
use scriptbot_script::domain::repository::{ParticipantMutation, ParticipantRepository};

use crate::infrastructure;

fn state_from_column(value: i64) -> Result<u32, DomainError> {
    u32::try_from(value)
        .map_err(|_| DomainError::Infrastructure(format!("state {value} out of range")))
}

fn answer_from_row(user_id: i64, row: &PgRow) -> Result<Answer, DomainError> {
    let state: i64 = row.try_get("state").map_err(infrastructure)?;
    Ok(Answer {
        user_id,
        state: state_from_column(state)?,
        text: row.try_get("text").map_err(infrastructure)?,
    })
}

/// PostgreSQL-backed participant repository.
#[derive(Debug, Clone)]
pub struct PgParticipantRepository {
    pool: PgPool,
}

impl PgParticipantRepository {
    /// Creates a new `PgParticipantRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lock_or_create(
        tx: &mut Transaction<'_, Postgres>,
        bot_id: Uuid,
        user_id: i64,
    ) -> Result<Participant, DomainError> {
        sqlx::query(
            "INSERT INTO participants (bot_id, user_id, current_state) VALUES ($1, $2, 0) \
             ON CONFLICT (bot_id, user_id) DO NOTHING",
        )
        .bind(bot_id)
        .bind(user_id)
        .execute(&mut **tx)
        .await
        .map_err(infrastructure)?;

        let current_state: i64 = sqlx::query(
            "SELECT current_state FROM participants WHERE bot_id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(bot_id)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(infrastructure)?
        .try_get("current_state")
        .map_err(infrastructure)?;

        let answers = sqlx::query(
            "SELECT state, text FROM answers WHERE bot_id = $1 AND user_id = $2 ORDER BY state",
        )
        .bind(bot_id)
        .bind(user_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(infrastructure)?
        .iter()
        .map(|row| answer_from_row(user_id, row))
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Participant::restore(
            bot_id,
            user_id,
            state_from_column(current_state)?,
            answers,
        ))
    }

    async fn save(
        tx: &mut Transaction<'_, Postgres>,
        participant: &Participant,
    ) -> Result<(), DomainError> {
        let bot_id = participant.bot_id();
        let user_id = participant.user_id();

        sqlx::query("UPDATE participants SET current_state = $3 WHERE bot_id = $1 AND user_id = $2")
            .bind(bot_id)
            .bind(user_id)
            .bind(i64::from(participant.current_state()))
            .execute(&mut **tx)
            .await
            .map_err(infrastructure)?;

        sqlx::query("DELETE FROM answers WHERE bot_id = $1 AND user_id = $2")
            .bind(bot_id)
            .bind(user_id)
            .execute(&mut **tx)
            .await
            .map_err(infrastructure)?;

        for answer in participant.answers() {
            sqlx::query("INSERT INTO answers (bot_id, user_id, state, text) VALUES ($1, $2, $3, $4)")
                .bind(bot_id)
                .bind(user_id)
                .bind(i64::from(answer.state))
                .bind(&answer.text)
                .execute(&mut **tx)
                .await
                .map_err(infrastructure)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ParticipantRepository for PgParticipantRepository {
    async fn update_or_create(
        &self,
        bot_id: Uuid,
        user_id: i64,
        mutate: ParticipantMutation<'_>,
    ) -> Result<Transition, DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;
        let mut participant = Self::lock_or_create(&mut tx, bot_id, user_id).await?;

        // Dropping the transaction on error rolls back the row insert too.
        let transition = mutate(&mut participant)?;
        Self::save(&mut tx, &participant).await?;
        tx.commit().await.map_err(infrastructure)?;

        Ok(transition)
    }

    async fn get(&self, bot_id: Uuid, user_id: i64) -> Result<Participant, DomainError> {
        let row = sqlx::query(
            "SELECT current_state FROM participants WHERE bot_id = $1 AND user_id = $2",
        )
        .bind(bot_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infrastructure)?
        .ok_or(DomainError::ParticipantNotFound { bot_id, user_id })?;
        let current_state: i64 = row.try_get("current_state").map_err(infrastructure)?;

        let answers = sqlx::query(
            "SELECT state, text FROM answers WHERE bot_id = $1 AND user_id = $2 ORDER BY state",
        )
        .bind(bot_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?
        .iter()
        .map(|row| answer_from_row(user_id, row))
        .collect::<Result<Vec<_>, _>>()?;

        Ok(Participant::restore(
            bot_id,
            user_id,
            state_from_column(current_state)?,
            answers,
        ))
    }

    async fn list_by_bot(&self, bot_id: Uuid) -> Result<Vec<Participant>, DomainError> {
        let rows = sqlx::query(
            "SELECT user_id, current_state FROM participants WHERE bot_id = $1 ORDER BY user_id",
        )
        .bind(bot_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?;

        let mut answers: BTreeMap<i64, Vec<Answer>> = BTreeMap::new();
        for row in sqlx::query(
            "SELECT user_id, state, text FROM answers WHERE bot_id = $1 ORDER BY user_id, state",
        )
        .bind(bot_id)
        .fetch_all(&self.pool)
        .await
        .map_err(infrastructure)?
        {
            let user_id: i64 = row.try_get("user_id").map_err(infrastructure)?;
            answers
                .entry(user_id)
                .or_default()
                .push(answer_from_row(user_id, &row)?);
        }

        rows.iter()
            .map(|row| {
                let user_id: i64 = row.try_get("user_id").map_err(infrastructure)?;
                let current_state: i64 = row.try_get("current_state").map_err(infrastructure)?;
                Ok(Participant::restore(
                    bot_id,
                    user_id,
                    state_from_column(current_state)?,
                    answers.remove(&user_id).unwrap_or_default(),
                ))
            })
            .collect()
    }

    async fn delete_by_bot(&self, bot_id: Uuid) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM participants WHERE bot_id = $1")
            .bind(bot_id)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        Ok(())
    }
}
