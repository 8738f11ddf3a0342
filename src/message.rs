use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

/// Moderation state of a stored message.
///
/// Transitions are operator-driven, one step at a time: unread -> read ->
/// archived, and any state back to unread ("mark unread"). There is no
/// terminal state; deletion removes the row regardless of state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Unread,
    Read,
    Archived,
}

impl MessageStatus {
    pub const ALL: [MessageStatus; 3] = [
        MessageStatus::Unread,
        MessageStatus::Read,
        MessageStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Unread => "unread",
            MessageStatus::Read => "read",
            MessageStatus::Archived => "archived",
        }
    }

    /// Parses a status string. Anything outside the three enumerated values
    /// is rejected; no other value is ever persisted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unread" => Some(MessageStatus::Unread),
            "read" => Some(MessageStatus::Read),
            "archived" => Some(MessageStatus::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single contact/booking form submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Store-assigned identifier, monotonic, never reused
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    /// Free-text message body, may be empty
    pub message: String,
    /// Which service line the inquiry concerns
    pub service: Option<String>,
    pub preferred_date: Option<String>,
    pub preferred_time: Option<String>,
    /// Best-effort client origin, captured at intake for audit context
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub status: MessageStatus,
    /// Set once at insert time, immutable thereafter
    pub created_at: DateTime<Utc>,
}

/// A validated submission ready to be persisted.
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub message: String,
    pub service: Option<String>,
    pub preferred_date: Option<String>,
    pub preferred_time: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Receipt returned by the store on a successful insert.
#[derive(Debug, Clone, Copy)]
pub struct InsertReceipt {
    pub id: i64,
    pub created_at: DateTime<Utc>,
}

/// Filter for listing/exporting messages.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    pub status: Option<MessageStatus>,
    /// Case-insensitive substring match against name, email or message body
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl MessageFilter {
    pub fn effective_limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Aggregate dashboard counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStats {
    pub total: i64,
    pub unread: i64,
    /// Rows created on or after local midnight
    pub today: i64,
    /// Rows created within the trailing 7 days
    pub week: i64,
}

impl MessageStats {
    /// Zero-valued stats, the degraded fallback when aggregation fails or
    /// times out.
    pub fn zero() -> Self {
        Self {
            total: 0,
            unread: 0,
            today: 0,
            week: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parse_round_trip() {
        for status in MessageStatus::ALL {
            assert_eq!(MessageStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn status_rejects_unknown_values() {
        assert_eq!(MessageStatus::parse("bogus"), None);
        assert_eq!(MessageStatus::parse("UNREAD"), None);
        assert_eq!(MessageStatus::parse(""), None);
        assert_eq!(MessageStatus::parse("all"), None);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&MessageStatus::Archived).unwrap();
        assert_eq!(json, "\"archived\"");
    }

    #[test]
    fn filter_limits_are_clamped() {
        let filter = MessageFilter {
            limit: Some(0),
            offset: Some(-5),
            ..Default::default()
        };
        assert_eq!(filter.effective_limit(), 1);
        assert_eq!(filter.effective_offset(), 0);

        let filter = MessageFilter {
            limit: Some(1_000_000),
            ..Default::default()
        };
        assert_eq!(filter.effective_limit(), MAX_PAGE_LIMIT);

        let filter = MessageFilter::default();
        assert_eq!(filter.effective_limit(), DEFAULT_PAGE_LIMIT);
    }
}
