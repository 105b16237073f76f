//! In-app notification domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Mutation that triggered the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationAction {
    Create,
    Update,
    Delete,
}

impl NotificationAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationAction::Create => "create",
            NotificationAction::Update => "update",
            NotificationAction::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(NotificationAction::Create),
            "update" => Some(NotificationAction::Update),
            "delete" => Some(NotificationAction::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    Medium,
    High,
}

impl NotificationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Medium => "medium",
            NotificationPriority::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(NotificationPriority::Low),
            "medium" => Some(NotificationPriority::Medium),
            "high" => Some(NotificationPriority::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub message: String,
    pub action: NotificationAction,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub priority: NotificationPriority,
    /// Delivery status; always `sent` for store-backed dispatch.
    pub status: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub recipient_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub message: String,
    pub action: NotificationAction,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub priority: NotificationPriority,
}
