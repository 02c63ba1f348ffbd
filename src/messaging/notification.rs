// Notifications - User-facing error and status reports
//
// Failures that must not stop the session (a file that will not decode, a busy
// device) end up here so a front end can show them.

use std::collections::VecDeque;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationCategory {
    /// Loading or decoding a sound file
    Decode,
    /// Output device and voices
    Audio,
    Transport,
    Generic,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub category: NotificationCategory,
    pub message: String,
    /// Unix timestamp in milliseconds
    pub timestamp: u64,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl Notification {
    pub fn new(level: NotificationLevel, category: NotificationCategory, message: String) -> Self {
        Self {
            level,
            category,
            message,
            timestamp: now_millis(),
        }
    }

    pub fn info(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Info, category, message)
    }

    pub fn warning(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Warning, category, message)
    }

    pub fn error(category: NotificationCategory, message: String) -> Self {
        Self::new(NotificationLevel::Error, category, message)
    }

    /// True if the notification is younger than `max_age_ms`
    pub fn is_recent(&self, max_age_ms: u64) -> bool {
        now_millis().saturating_sub(self.timestamp) < max_age_ms
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}/{:?}] {}", self.level, self.category, self.message)
    }
}

/// Bounded history of notifications, oldest dropped first
#[derive(Debug, Clone)]
pub struct NotificationLog {
    entries: VecDeque<Notification>,
    capacity: usize,
}

impl NotificationLog {
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, notification: Notification) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(notification);
    }

    pub fn latest(&self) -> Option<&Notification> {
        self.entries.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Notification> {
        self.entries
            .iter()
            .filter(|n| n.level == NotificationLevel::Error)
    }

    /// Remove and return everything logged so far
    pub fn drain(&mut self) -> Vec<Notification> {
        self.entries.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}
