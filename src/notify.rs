use chrono::Utc;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Notification, NotificationLevel};

pub const DEFAULT_CAPACITY: usize = 32;

/// NotificationCenter
///
/// Bounded FIFO of transient notifications waiting to be shown to the visitor.
/// When full, the oldest entry is dropped.
pub struct NotificationCenter {
    queue: Mutex<VecDeque<Notification>>,
    capacity: usize,
}

pub type NotificationState = Arc<NotificationCenter>;

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl NotificationCenter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, level: NotificationLevel, message: impl Into<String>) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            level,
            message: message.into(),
            raised_at: Utc::now(),
        };

        let mut queue = self.queue.lock();
        if queue.len() >= self.capacity {
            queue.pop_front();
        }
        queue.push_back(notification.clone());

        notification
    }

    pub fn error(&self, message: impl Into<String>) -> Notification {
        self.push(NotificationLevel::Error, message)
    }

    pub fn info(&self, message: impl Into<String>) -> Notification {
        self.push(NotificationLevel::Info, message)
    }

    /// Removes and returns everything queued, oldest first.
    pub fn drain(&self) -> Vec<Notification> {
        self.queue.lock().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
