// Copyright (c) Zefchain Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Transient, dismissible notifications.

use std::collections::VecDeque;

use async_graphql::SimpleObject;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::BlockBetError;

pub const DEFAULT_CAPACITY: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, async_graphql::Enum)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub transaction_hash: Option<String>,
}

#[derive(Default)]
struct Inbox {
    next_id: u64,
    items: VecDeque<Notification>,
}

/// Bounded inbox; the oldest notification is dropped once full.
pub struct NotificationCenter {
    inbox: Mutex<Inbox>,
    capacity: usize,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationCenter {
    pub fn new(capacity: usize) -> Self {
        NotificationCenter {
            inbox: Mutex::new(Inbox::default()),
            capacity: capacity.max(1),
        }
    }

    pub async fn push(
        &self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        transaction_hash: Option<String>,
    ) -> u64 {
        let mut inbox = self.inbox.lock().await;
        let id = inbox.next_id;
        inbox.next_id += 1;
        inbox.items.push_back(Notification {
            id,
            kind,
            title: title.into(),
            message: message.into(),
            transaction_hash,
        });
        while inbox.items.len() > self.capacity {
            inbox.items.pop_front();
        }
        id
    }

    /// Names the error category in the title, the detail in the message.
    pub async fn push_error(&self, error: &BlockBetError) -> u64 {
        self.push(NotificationKind::Error, error.category(), error.to_string(), None)
            .await
    }

    pub async fn dismiss(&self, id: u64) -> bool {
        let mut inbox = self.inbox.lock().await;
        let before = inbox.items.len();
        inbox.items.retain(|notification| notification.id != id);
        inbox.items.len() != before
    }

    /// Newest first.
    pub async fn list(&self) -> Vec<Notification> {
        self.inbox.lock().await.items.iter().rev().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_error_notification_names_category() {
        let center = NotificationCenter::default();
        let id = center.push_error(&BlockBetError::TransactionRejected).await;
        let list = center.list().await;
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, id);
        assert_eq!(list[0].kind, NotificationKind::Error);
        assert_eq!(list[0].title, "Transaction not signed");
    }

    #[tokio::test]
    async fn test_dismiss_and_capacity() {
        let center = NotificationCenter::new(2);
        let first = center.push(NotificationKind::Info, "a", "", None).await;
        let second = center.push(NotificationKind::Info, "b", "", None).await;
        let third = center.push(NotificationKind::Info, "c", "", None).await;

        let ids: Vec<u64> = center.list().await.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![third, second]);
        assert!(!center.dismiss(first).await);
        assert!(center.dismiss(second).await);
        assert_eq!(center.list().await.len(), 1);
    }
}
