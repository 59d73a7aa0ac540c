//! `PostgreSQL` implementation of the `BotRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use scriptbot_core::error::DomainError;
use scriptbot_script::domain::aggregates::{Bot, BotSnapshot, BotStatus};
use scriptbot_script::domain::repository::{BotMutation, BotRepository};
use scriptbot_script::domain::script::{Block, EntryPoint, Mailing};

use crate::infrastructure;

const SELECT_BOT: &str =
    "SELECT id, owner_id, name, token, status, script, created_at, updated_at FROM bots";

/// The `script` column: everything an operator authors for a bot.
#[derive(Debug, Serialize, Deserialize)]
struct ScriptDocument {
    entry_points: Vec<EntryPoint>,
    blocks: Vec<Block>,
    #[serde(default)]
    mailings: Vec<Mailing>,
}

fn script_document(snapshot: &BotSnapshot) -> Result<serde_json::Value, DomainError> {
    let document = ScriptDocument {
        entry_points: snapshot.entry_points.clone(),
        blocks: snapshot.blocks.clone(),
        mailings: snapshot.mailings.clone(),
    };
    serde_json::to_value(document).map_err(infrastructure)
}

fn bot_from_row(row: &PgRow) -> Result<Bot, DomainError> {
    let status: String = row.try_get("status").map_err(infrastructure)?;
    let script: serde_json::Value = row.try_get("script").map_err(infrastructure)?;
    let document: ScriptDocument = serde_json::from_value(script).map_err(infrastructure)?;

    Ok(Bot::restore(BotSnapshot {
        id: row.try_get("id").map_err(infrastructure)?,
        owner_id: row.try_get("owner_id").map_err(infrastructure)?,
        name: row.try_get("name").map_err(infrastructure)?,
        token: row.try_get("token").map_err(infrastructure)?,
        status: BotStatus::parse(&status)?,
        entry_points: document.entry_points,
        blocks: document.blocks,
        mailings: document.mailings,
        created_at: row.try_get("created_at").map_err(infrastructure)?,
        updated_at: row.try_get("updated_at").map_err(infrastructure)?,
    }))
}

/// PostgreSQL-backed bot repository.
#[derive(Debug, Clone)]
pub struct PgBotRepository {
    pool: PgPool,
}

impl PgBotRepository {
    /// Creates a new `PgBotRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn save(tx: &mut Transaction<'_, Postgres>, bot: &Bot) -> Result<(), DomainError> {
        let snapshot = bot.snapshot();
        sqlx::query(
            "UPDATE bots SET name = $2, token = $3, status = $4, script = $5, updated_at = $6 \
             WHERE id = $1",
        )
        .bind(snapshot.id)
        .bind(&snapshot.name)
        .bind(&snapshot.token)
        .bind(snapshot.status.as_str())
        .bind(script_document(&snapshot)?)
        .bind(snapshot.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(infrastructure)?;
        Ok(())
    }
}

#[async_trait]
impl BotRepository for PgBotRepository {
    async fn create(&self, bot: &Bot) -> Result<(), DomainError> {
        let snapshot = bot.snapshot();
        let result = sqlx::query(
            "INSERT INTO bots (id, owner_id, name, token, status, script, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(snapshot.id)
        .bind(snapshot.owner_id)
        .bind(&snapshot.name)
        .bind(&snapshot.token)
        .bind(snapshot.status.as_str())
        .bind(script_document(&snapshot)?)
        .bind(snapshot.created_at)
        .bind(snapshot.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(DomainError::BotAlreadyExists(bot.id))
            }
            Err(e) => Err(infrastructure(e)),
        }
    }

    async fn update(&self, bot_id: Uuid, mutate: BotMutation<'_>) -> Result<Bot, DomainError> {
        let mut tx = self.pool.begin().await.map_err(infrastructure)?;

        let row = sqlx::query(&format!("{SELECT_BOT} WHERE id = $1 FOR UPDATE"))
            .bind(bot_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(infrastructure)?
            .ok_or(DomainError::BotNotFound(bot_id))?;
        let mut bot = bot_from_row(&row)?;

        // Dropping the transaction on error rolls it back.
        mutate(&mut bot)?;
        Self::save(&mut tx, &bot).await?;
        tx.commit().await.map_err(infrastructure)?;

        tracing::debug!(%bot_id, "bot updated");
        Ok(bot)
    }

    async fn update_status(
        &self,
        bot_id: Uuid,
        status: BotStatus,
        at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE bots SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(bot_id)
            .bind(status.as_str())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::BotNotFound(bot_id));
        }
        Ok(())
    }

    async fn delete(&self, bot_id: Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM bots WHERE id = $1")
            .bind(bot_id)
            .execute(&self.pool)
            .await
            .map_err(infrastructure)?;
        if result.rows_affected() == 0 {
            return Err(DomainError::BotNotFound(bot_id));
        }
        Ok(())
    }

    async fn get(&self, bot_id: Uuid) -> Result<Bot, DomainError> {
        let row = sqlx::query(&format!("{SELECT_BOT} WHERE id = $1"))
            .bind(bot_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infrastructure)?
            .ok_or(DomainError::BotNotFound(bot_id))?;
        bot_from_row(&row)
    }

    async fn list_by_owner(&self, owner_id: i64) -> Result<Vec<Bot>, DomainError> {
        let rows = sqlx::query(&format!("{SELECT_BOT} WHERE owner_id = $1 ORDER BY created_at, id"))
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;
        rows.iter().map(bot_from_row).collect()
    }

    async fn list_by_status(&self, status: BotStatus) -> Result<Vec<Bot>, DomainError> {
        let rows = sqlx::query(&format!("{SELECT_BOT} WHERE status = $1 ORDER BY created_at, id"))
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(infrastructure)?;
        rows.iter().map(bot_from_row).collect()
    }
}
