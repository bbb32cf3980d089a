//! PostgreSQL backend for Herald's subscription mail queue.
//!
//! Two halves:
//!
//! - [`PgMailQueue`] implements the core's `MailQueue` port. Enqueue never
//!   blocks the saving request: the notice goes over an unbounded channel
//!   to a background writer task that INSERTs it. At-least-once delivery
//!   starts at the INSERT; a notice the writer never got to (process
//!   death) is lost, which matches the fire-and-forget contract of the
//!   port.
//! - [`NoticeStore`] / [`PgNoticeStore`] is the delivery worker's side:
//!   claim a batch grouped by subscriber (so one digest mail can cover
//!   several subscriptions), then mark delivered or failed with bounded
//!   retries and a dead-letter state.
//!
//! # Database Schema
//!
//! ```sql
//! CREATE TYPE notice_status AS ENUM ('pending', 'sending', 'delivered', 'dead_letter');
//!
//! CREATE TABLE subscription_notices (
//!     id UUID PRIMARY KEY,
//!     subscription_id UUID NOT NULL,
//!     subscriber_id UUID NOT NULL,
//!     payload JSONB NOT NULL,
//!
//!     status notice_status NOT NULL DEFAULT 'pending',
//!     attempt INTEGER NOT NULL DEFAULT 1,
//!     max_retries INTEGER NOT NULL DEFAULT 3,
//!     error_message TEXT,
//!
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//!
//! CREATE INDEX idx_notices_ready ON subscription_notices (subscriber_id, created_at)
//!     WHERE status = 'pending';
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use herald_queue_postgres::PgMailQueue;
//! use sqlx::PgPool;
//!
//! let pool = PgPool::connect("postgres://localhost/archive").await?;
//! let (queue, writer) = PgMailQueue::spawn(pool.clone());
//!
//! // Use with the dispatcher
//! let dispatcher = Dispatcher::new(mailer, queue, bylines, prefs, subs);
//! ```

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::error;
use uuid::Uuid;

use herald_core::{CreationId, MailQueue, Subscription, SubscriptionNotice};

/// A pending notice claimed for delivery.
#[derive(Debug, Clone)]
pub struct ClaimedNotice {
    pub id: Uuid,
    pub subscriber_id: Uuid,
    pub payload: serde_json::Value,
    pub attempt: i32,
}

/// Whether a delivery failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Retryable,
    NonRetryable,
}

/// Worker-side operations on the notice table.
#[async_trait]
pub trait NoticeStore {
    /// Claim up to `limit` pending notices, oldest first, grouped by
    /// subscriber so a digest mail can cover several at once.
    async fn claim_batch(&self, limit: i64) -> Result<Vec<ClaimedNotice>>;

    /// Mark a notice as delivered.
    async fn mark_delivered(&self, notice_id: Uuid) -> Result<()>;

    /// Mark a notice as failed; retryable failures requeue until the
    /// retry budget runs out, then dead-letter.
    async fn mark_failed(&self, notice_id: Uuid, err: &str, kind: FailureKind) -> Result<()>;
}

/// The `MailQueue` half: non-blocking handoff to the writer task.
#[derive(Clone)]
pub struct PgMailQueue {
    tx: UnboundedSender<SubscriptionNotice>,
}

impl PgMailQueue {
    /// Spawn the background writer on the current tokio runtime and return
    /// the queue handle plus the writer's join handle. Dropping every
    /// queue handle shuts the writer down once the channel drains.
    pub fn spawn(pool: PgPool) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<SubscriptionNotice>();
        let writer = tokio::spawn(async move {
            while let Some(notice) = rx.recv().await {
                if let Err(err) = insert_notice(&pool, &notice).await {
                    // the notice is lost; surfacing is all we can do here
                    error!(
                        subscription = %notice.subscription,
                        error = %err,
                        "failed to persist subscription notice"
                    );
                }
            }
        });
        (Self { tx }, writer)
    }
}

impl MailQueue for PgMailQueue {
    fn enqueue(&self, subscription: &Subscription, creation: CreationId) -> Result<()> {
        self.tx
            .send(SubscriptionNotice::new(subscription, creation))
            .map_err(|_| anyhow::anyhow!("notice writer has shut down"))
    }
}

async fn insert_notice(pool: &PgPool, notice: &SubscriptionNotice) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO subscription_notices (id, subscription_id, subscriber_id, payload)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(notice.subscription.0)
    .bind(notice.subscriber.0)
    .bind(serde_json::to_value(notice)?)
    .execute(pool)
    .await?;
    Ok(())
}

/// PostgreSQL notice store for the delivery worker.
#[derive(Clone)]
pub struct PgNoticeStore {
    pool: PgPool,
}

impl PgNoticeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl NoticeStore for PgNoticeStore {
    /// Uses `FOR UPDATE SKIP LOCKED` so several workers can claim
    /// concurrently without stepping on each other.
    async fn claim_batch(&self, limit: i64) -> Result<Vec<ClaimedNotice>> {
        let rows = sqlx::query(
            r#"
            WITH claimable AS (
                SELECT id
                FROM subscription_notices
                WHERE status = 'pending'
                ORDER BY subscriber_id, created_at ASC
                LIMIT $1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE subscription_notices
            SET status = 'sending',
                updated_at = NOW()
            WHERE id IN (SELECT id FROM claimable)
            RETURNING id, subscriber_id, payload, attempt
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ClaimedNotice {
                id: row.get("id"),
                subscriber_id: row.get("subscriber_id"),
                payload: row.get("payload"),
                attempt: row.get("attempt"),
            })
            .collect())
    }

    async fn mark_delivered(&self, notice_id: Uuid) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE subscription_notices
            SET status = 'delivered',
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(notice_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_failed(&self, notice_id: Uuid, err: &str, kind: FailureKind) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "SELECT attempt, max_retries FROM subscription_notices WHERE id = $1 FOR UPDATE",
        )
        .bind(notice_id)
        .fetch_one(&mut *tx)
        .await?;

        let attempt: i32 = row.get("attempt");
        let max_retries: i32 = row.get("max_retries");

        match kind {
            FailureKind::Retryable if attempt < max_retries => {
                sqlx::query(
                    r#"
                    UPDATE subscription_notices
                    SET status = 'pending',
                        attempt = attempt + 1,
                        error_message = $1,
                        updated_at = NOW()
                    WHERE id = $2
                    "#,
                )
                .bind(err)
                .bind(notice_id)
                .execute(&mut *tx)
                .await?;
            }
            _ => {
                sqlx::query(
                    r#"
                    UPDATE subscription_notices
                    SET status = 'dead_letter',
                        error_message = $1,
                        updated_at = NOW()
                    WHERE id = $2
                    "#,
                )
                .bind(err)
                .bind(notice_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

/// Maintenance helpers.
impl PgNoticeStore {
    /// Clean out delivered notices older than the cutoff.
    pub async fn cleanup_delivered(&self, older_than: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            DELETE FROM subscription_notices
            WHERE status = 'delivered'
              AND updated_at < $1
            "#,
        )
        .bind(older_than)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Queue health snapshot.
    pub async fn stats(&self) -> Result<QueueStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'pending') as pending,
                COUNT(*) FILTER (WHERE status = 'sending') as sending,
                COUNT(*) FILTER (WHERE status = 'delivered') as delivered,
                COUNT(*) FILTER (WHERE status = 'dead_letter') as dead_letter
            FROM subscription_notices
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(QueueStats {
            pending: row.get("pending"),
            sending: row.get("sending"),
            delivered: row.get("delivered"),
            dead_letter: row.get("dead_letter"),
        })
    }
}

/// Notice queue statistics.
#[derive(Debug, Clone, Copy)]
pub struct QueueStats {
    pub pending: i64,
    pub sending: i64,
    pub delivered: i64,
    pub dead_letter: i64,
}
