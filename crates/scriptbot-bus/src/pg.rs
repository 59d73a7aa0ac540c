//! PostgreSQL-backed bus.
//!
//! Envelopes are rows of `bus_messages`. A publish inserts its batch in one
//! transaction and notifies the `bus_messages` channel; the subscriber wakes
//! on the notification (or after its poll interval), reads undelivered rows
//! in id order and stamps `delivered_at` on acknowledgement. Rows that were
//! handed out but never acknowledged are delivered again by the next
//! subscriber, so delivery is at-least-once.
//!
//! A bus table supports one subscriber at a time; ordering relies on it.
//!
//! Row ids come from a `BIGSERIAL` and are allocated before commit. Two
//! publishers that commit out of id order can make the subscriber deliver
//! the later-committed row, with the lower id, after the other one. For a
//! single destination this needs two publishes for the same participant to
//! overlap, which only happens inside the publish-after-commit window that
//! already allows loss.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgListener;
use sqlx::{PgPool, Row};

use crate::envelope::Envelope;
use crate::error::BusError;
use crate::transport::{Delivery, Publisher, Subscriber};

/// Notification channel used to wake subscribers.
pub const NOTIFY_CHANNEL: &str = "bus_messages";

const FETCH_LIMIT: i64 = 100;

/// Publishing end of the PostgreSQL bus.
#[derive(Debug, Clone)]
pub struct PgBus {
    pool: PgPool,
}

impl PgBus {
    /// Creates a new `PgBus`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Publisher for PgBus {
    async fn publish(&self, batch: Vec<Envelope>) -> Result<(), BusError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for envelope in &batch {
            sqlx::query("INSERT INTO bus_messages (topic, destination, payload) VALUES ($1, $2, $3)")
                .bind(envelope.topic().as_str())
                .bind(envelope.destination())
                .bind(envelope.to_payload()?)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("SELECT pg_notify($1, '')")
            .bind(NOTIFY_CHANNEL)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::debug!(count = batch.len(), "published batch to bus_messages");
        Ok(())
    }
}

/// Consuming end of the PostgreSQL bus.
pub struct PgSubscriber {
    pool: PgPool,
    listener: PgListener,
    poll_interval: Duration,
    buffer: VecDeque<Delivery>,
    in_flight: Vec<i64>,
}

impl PgSubscriber {
    /// Connects a subscriber and starts listening for publish notifications.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Database` if the listener connection fails.
    pub async fn connect(pool: PgPool, poll_interval: Duration) -> Result<Self, BusError> {
        let mut listener = PgListener::connect_with(&pool).await?;
        listener.listen(NOTIFY_CHANNEL).await?;
        Ok(Self {
            pool,
            listener,
            poll_interval,
            buffer: VecDeque::new(),
            in_flight: Vec::new(),
        })
    }

    async fn fetch(&mut self) -> Result<(), BusError> {
        let rows = sqlx::query(
            "SELECT id, topic, payload FROM bus_messages \
             WHERE delivered_at IS NULL AND NOT (id = ANY($1)) \
             ORDER BY id LIMIT $2",
        )
        .bind(&self.in_flight)
        .bind(FETCH_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        for row in rows {
            let id: i64 = row.try_get("id")?;
            let topic: String = row.try_get("topic")?;
            let payload: serde_json::Value = row.try_get("payload")?;
            match Envelope::from_parts(&topic, payload) {
                Ok(envelope) => {
                    self.in_flight.push(id);
                    self.buffer.push_back(Delivery { id, envelope });
                }
                Err(e) => {
                    // Undecodable rows would block the queue forever.
                    tracing::error!(id, error = %e, "discarding undecodable bus row");
                    self.mark_delivered(id).await?;
                }
            }
        }
        Ok(())
    }

    async fn mark_delivered(&self, id: i64) -> Result<(), BusError> {
        sqlx::query("UPDATE bus_messages SET delivered_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Subscriber for PgSubscriber {
    async fn next(&mut self) -> Result<Option<Delivery>, BusError> {
        loop {
            if let Some(delivery) = self.buffer.pop_front() {
                return Ok(Some(delivery));
            }
            self.fetch().await?;
            if !self.buffer.is_empty() {
                continue;
            }
            // Either a notification or the poll interval wakes us up.
            match tokio::time::timeout(self.poll_interval, self.listener.recv()).await {
                Ok(Ok(_)) | Err(_) => {}
                Ok(Err(e)) => return Err(e.into()),
            }
        }
    }

    async fn ack(&mut self, id: i64) -> Result<(), BusError> {
        self.mark_delivered(id).await?;
        self.in_flight.retain(|in_flight| *in_flight != id);
        Ok(())
    }
}
