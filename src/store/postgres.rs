use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;

use super::{MessageStore, local_midnight};
use crate::message::{InsertReceipt, Message, MessageFilter, MessageStats, MessageStatus, NewMessage};

const SELECT_COLUMNS: &str = "id, name, email, phone, company, message, service, \
     preferred_date, preferred_time, ip_address, user_agent, status, created_at";

/// PostgreSQL implementation of MessageStore
///
/// The schema is created lazily with idempotent statements, so a fresh
/// database serves its first request without a manual migration step.
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    /// Connects to the database and initializes the schema.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the messages table and its indexes if they do not exist yet.
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS contact_messages (
                id BIGSERIAL PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT,
                company TEXT,
                message TEXT NOT NULL DEFAULT '',
                service TEXT,
                preferred_date TEXT,
                preferred_time TEXT,
                ip_address TEXT,
                user_agent TEXT,
                status TEXT NOT NULL DEFAULT 'unread',
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create contact_messages table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_contact_messages_created_at \
             ON contact_messages (created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create created_at index")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_contact_messages_status \
             ON contact_messages (status)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create status index")?;

        Ok(())
    }
}

/// Row as it comes back from Postgres; status is converted separately so the
/// enum invariant is enforced in one place.
#[derive(sqlx::FromRow)]
struct MessageRow {
    id: i64,
    name: String,
    email: String,
    phone: Option<String>,
    company: Option<String>,
    message: String,
    service: Option<String>,
    preferred_date: Option<String>,
    preferred_time: Option<String>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> Result<Self> {
        let status = MessageStatus::parse(&row.status)
            .with_context(|| format!("Unknown status '{}' for message {}", row.status, row.id))?;
        Ok(Message {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            company: row.company,
            message: row.message,
            service: row.service,
            preferred_date: row.preferred_date,
            preferred_time: row.preferred_time,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            status,
            created_at: row.created_at,
        })
    }
}

fn is_undefined_table(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("42P01"))
}

#[async_trait::async_trait]
impl MessageStore for PostgresMessageStore {
    async fn insert(&self, message: &NewMessage) -> Result<InsertReceipt> {
        if message.name.trim().is_empty() || message.email.trim().is_empty() {
            bail!("name and email are required");
        }

        let row = sqlx::query(
            r#"
            INSERT INTO contact_messages
                (name, email, phone, company, message, service,
                 preferred_date, preferred_time, ip_address, user_agent, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'unread')
            RETURNING id, created_at
            "#,
        )
        .bind(&message.name)
        .bind(&message.email)
        .bind(&message.phone)
        .bind(&message.company)
        .bind(&message.message)
        .bind(&message.service)
        .bind(&message.preferred_date)
        .bind(&message.preferred_time)
        .bind(&message.ip_address)
        .bind(&message.user_agent)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert message")?;

        Ok(InsertReceipt {
            id: row.try_get("id").context("Missing id in insert receipt")?,
            created_at: row
                .try_get("created_at")
                .context("Missing created_at in insert receipt")?,
        })
    }

    async fn query(&self, filter: &MessageFilter) -> Result<Vec<Message>> {
        let search_pattern = filter
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let sql = format!(
            r#"
            SELECT {SELECT_COLUMNS}
            FROM contact_messages
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::text IS NULL
                   OR name ILIKE $2 OR email ILIKE $2 OR message ILIKE $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#
        );
        let result = sqlx::query_as::<_, MessageRow>(&sql)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(search_pattern)
        .bind(filter.effective_limit())
        .bind(filter.effective_offset())
        .fetch_all(&self.pool)
        .await;

        let rows = match result {
            Ok(rows) => rows,
            // A store that has not been initialized yet simply has no
            // messages; callers must not see this as a failure.
            Err(ref e) if is_undefined_table(e) => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to query messages"),
        };

        rows.into_iter().map(Message::try_from).collect()
    }

    async fn update_status(&self, id: i64, status: MessageStatus) -> Result<()> {
        // Zero rows affected means the id does not exist; moderation actions
        // are idempotent, so that still reports success.
        sqlx::query("UPDATE contact_messages SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .context("Failed to update message status")?;

        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM contact_messages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete message")?;

        Ok(())
    }

    async fn stats(&self) -> Result<MessageStats> {
        let now = Utc::now();
        let today_start = local_midnight(now);
        let week_start = now - chrono::Duration::days(7);

        let result = sqlx::query_as::<_, (i64, i64, i64, i64)>(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE status = 'unread'),
                   COUNT(*) FILTER (WHERE created_at >= $1),
                   COUNT(*) FILTER (WHERE created_at >= $2)
            FROM contact_messages
            "#,
        )
        .bind(today_start)
        .bind(week_start)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok((total, unread, today, week)) => Ok(MessageStats {
                total,
                unread,
                today,
                week,
            }),
            Err(ref e) if is_undefined_table(e) => Ok(MessageStats::zero()),
            Err(e) => Err(e).context("Failed to aggregate message stats"),
        }
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }
}
