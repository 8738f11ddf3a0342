use anyhow::{Result, bail};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use super::{MessageStore, local_midnight};
use crate::message::{InsertReceipt, Message, MessageFilter, MessageStats, MessageStatus, NewMessage};

/// In-memory implementation of MessageStore
///
/// Backs local development when DATABASE_URL is unset and serves as the test
/// double. Mirrors the Postgres implementation's observable behavior: ids are
/// monotonic and never reused, listing is newest-first, search is a
/// case-insensitive substring match over name/email/message, and
/// update/delete on a missing id succeed as no-ops.
pub struct InMemoryMessageStore {
    inner: Mutex<Inner>,
}

struct Inner {
    next_id: i64,
    rows: BTreeMap<i64, Message>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                rows: BTreeMap::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_search(message: &Message, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    message.name.to_lowercase().contains(&needle)
        || message.email.to_lowercase().contains(&needle)
        || message.message.to_lowercase().contains(&needle)
}

#[async_trait::async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn insert(&self, message: &NewMessage) -> Result<InsertReceipt> {
        if message.name.trim().is_empty() || message.email.trim().is_empty() {
            bail!("name and email are required");
        }

        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let created_at = Utc::now();

        inner.rows.insert(
            id,
            Message {
                id,
                name: message.name.clone(),
                email: message.email.clone(),
                phone: message.phone.clone(),
                company: message.company.clone(),
                message: message.message.clone(),
                service: message.service.clone(),
                preferred_date: message.preferred_date.clone(),
                preferred_time: message.preferred_time.clone(),
                ip_address: message.ip_address.clone(),
                user_agent: message.user_agent.clone(),
                status: MessageStatus::Unread,
                created_at,
            },
        );

        Ok(InsertReceipt { id, created_at })
    }

    async fn query(&self, filter: &MessageFilter) -> Result<Vec<Message>> {
        let inner = self.lock();

        let mut matches: Vec<Message> = inner
            .rows
            .values()
            .filter(|m| filter.status.map_or(true, |s| m.status == s))
            .filter(|m| {
                filter
                    .search
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .map_or(true, |s| matches_search(m, s))
            })
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        let offset = filter.effective_offset() as usize;
        let limit = filter.effective_limit() as usize;
        Ok(matches.into_iter().skip(offset).take(limit).collect())
    }

    async fn update_status(&self, id: i64, status: MessageStatus) -> Result<()> {
        let mut inner = self.lock();
        if let Some(row) = inner.rows.get_mut(&id) {
            row.status = status;
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.lock().rows.remove(&id);
        Ok(())
    }

    async fn stats(&self) -> Result<MessageStats> {
        let now = Utc::now();
        let today_start = local_midnight(now);
        let week_start = now - chrono::Duration::days(7);

        let inner = self.lock();
        let mut stats = MessageStats::zero();
        for row in inner.rows.values() {
            stats.total += 1;
            if row.status == MessageStatus::Unread {
                stats.unread += 1;
            }
            if row.created_at >= today_start {
                stats.today += 1;
            }
            if row.created_at >= week_start {
                stats.week += 1;
            }
        }
        Ok(stats)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
