// Messaging module - Notifications for the user

pub mod notification;

pub use notification::{Notification, NotificationCategory, NotificationLevel, NotificationLog};
