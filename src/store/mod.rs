// ============================================================================
// Persistent Store
// ============================================================================
//
// Durable storage and filtered retrieval of submitted messages. The storage
// interface is a trait so the production Postgres implementation and the
// in-memory implementation (local development, tests) stay interchangeable.
//
// ============================================================================

mod memory;
mod postgres;

pub use memory::InMemoryMessageStore;
pub use postgres::PostgresMessageStore;

use anyhow::Result;
use chrono::{DateTime, Local, TimeZone, Utc};

use crate::message::{
    InsertReceipt, Message, MessageFilter, MessageStats, MessageStatus, NewMessage,
};

/// Storage interface for message rows
///
/// Failure semantics: connection problems surface as errors from these
/// methods, never panics; callers decide whether to degrade (dashboards show
/// zeros) or report a generic server error (intake).
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    /// Persists a new row with status=unread. Fails if name or email is
    /// empty or the backing store is unavailable.
    async fn insert(&self, message: &NewMessage) -> Result<InsertReceipt>;

    /// Returns rows matching the filter, newest first (created_at
    /// descending). A store whose schema does not exist yet reports an
    /// empty result, not an error.
    async fn query(&self, filter: &MessageFilter) -> Result<Vec<Message>>;

    /// Sets the status of a single row. A missing id is a successful no-op:
    /// repeated moderation actions must be idempotent.
    async fn update_status(&self, id: i64, status: MessageStatus) -> Result<()>;

    /// Removes a row by id. Same idempotence rule as `update_status`.
    async fn delete(&self, id: i64) -> Result<()>;

    /// Aggregate counters: total, unread, created since local midnight,
    /// created within the trailing 7 days.
    async fn stats(&self) -> Result<MessageStats>;

    /// Connectivity probe for the health endpoint.
    async fn ping(&self) -> Result<()>;
}

/// Start of "today" for the stats aggregation: local midnight, expressed in
/// UTC for comparison against stored timestamps.
pub(crate) fn local_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let local_now = now.with_timezone(&Local);
    let midnight = local_now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_else(|| local_now.naive_local());
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .unwrap_or(local_now)
        .with_timezone(&Utc)
}
