//! Permission-filtered notification fan-out.

use shajara_core::error::ShajaraError;
use shajara_core::models::notification::{
    CreateNotification, NotificationAction, NotificationPriority,
};
use shajara_core::models::user::PermissionAction;
use shajara_core::repository::{NotificationRepository, UserRepository};
use tracing::debug;
use uuid::Uuid;

/// Selects the recipient set: users holding the given capability on an
/// entity type.
#[derive(Debug, Clone)]
pub struct PermissionFilter {
    pub entity: String,
    pub action: PermissionAction,
}

/// A mutation event to fan out as in-app notifications.
#[derive(Debug, Clone)]
pub struct MemberEvent {
    pub sender_id: Option<Uuid>,
    pub message: String,
    pub action: NotificationAction,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub priority: NotificationPriority,
}

/// Dispatch seam. Delivery is attempted at most once per recipient;
/// callers decide how to handle failures (the member service logs and
/// continues).
pub trait Notifier: Send + Sync {
    fn notify_users_with_permission(
        &self,
        filter: &PermissionFilter,
        event: &MemberEvent,
    ) -> impl Future<Output = Result<(), ShajaraError>> + Send;
}

/// Store-backed dispatcher: one notification record per permitted user.
#[derive(Clone)]
pub struct StoreNotifier<U, N> {
    users: U,
    notifications: N,
}

impl<U, N> StoreNotifier<U, N> {
    pub fn new(users: U, notifications: N) -> Self {
        Self {
            users,
            notifications,
        }
    }
}

impl<U: UserRepository, N: NotificationRepository> Notifier for StoreNotifier<U, N> {
    async fn notify_users_with_permission(
        &self,
        filter: &PermissionFilter,
        event: &MemberEvent,
    ) -> Result<(), ShajaraError> {
        let recipients = self
            .users
            .find_with_permission(&filter.entity, filter.action)
            .await?;

        if recipients.is_empty() {
            debug!(entity = %filter.entity, "No users hold the permission, skipping dispatch");
            return Ok(());
        }

        for recipient in &recipients {
            self.notifications
                .create(CreateNotification {
                    recipient_id: recipient.id,
                    sender_id: event.sender_id,
                    message: event.message.clone(),
                    action: event.action,
                    entity_type: event.entity_type.clone(),
                    entity_id: event.entity_id,
                    priority: event.priority,
                })
                .await?;
        }

        debug!(
            count = recipients.len(),
            action = event.action.as_str(),
            "Dispatched notifications"
        );
        Ok(())
    }
}
