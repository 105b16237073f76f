//! SurrealDB implementation of [`NotificationRepository`].

use chrono::{DateTime, Utc};
use shajara_core::error::ShajaraResult;
use shajara_core::models::notification::{
    CreateNotification, Notification, NotificationAction, NotificationPriority,
};
use shajara_core::repository::{NotificationRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct NotificationRow {
    record_id: String,
    recipient_id: String,
    sender_id: Option<String>,
    message: String,
    action: String,
    entity_type: String,
    entity_id: Option<String>,
    priority: String,
    status: String,
    read: bool,
    read_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn parse_uuid(s: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(s).map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))
}

impl NotificationRow {
    fn try_into_notification(self) -> Result<Notification, DbError> {
        Ok(Notification {
            id: parse_uuid(&self.record_id)?,
            recipient_id: parse_uuid(&self.recipient_id)?,
            sender_id: self.sender_id.as_deref().map(parse_uuid).transpose()?,
            message: self.message,
            action: NotificationAction::parse(&self.action)
                .ok_or_else(|| DbError::Decode(format!("unknown action: {}", self.action)))?,
            entity_type: self.entity_type,
            entity_id: self.entity_id.as_deref().map(parse_uuid).transpose()?,
            priority: NotificationPriority::parse(&self.priority)
                .ok_or_else(|| DbError::Decode(format!("unknown priority: {}", self.priority)))?,
            status: self.status,
            read: self.read,
            read_at: self.read_at,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Notification repository.
#[derive(Clone)]
pub struct SurrealNotificationRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealNotificationRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<Notification, DbError> {
        let id_str = id.to_string();
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('notification', $id)",
            )
            .bind(("id", id_str.clone()))
            .await?;
        let rows: Vec<NotificationRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or(DbError::NotFound {
            entity: "notification".into(),
            id: id_str,
        })?;
        row.try_into_notification()
    }
}

impl<C: Connection> NotificationRepository for SurrealNotificationRepository<C> {
    async fn create(&self, input: CreateNotification) -> ShajaraResult<Notification> {
        let id = Uuid::new_v4();

        self.db
            .query(format!(
                "CREATE type::record('notification', '{id}') SET \
                 recipient_id = $recipient_id, sender_id = $sender_id, \
                 message = $message, action = $action, \
                 entity_type = $entity_type, entity_id = $entity_id, \
                 priority = $priority, read = false, read_at = NONE",
            ))
            .bind(("recipient_id", input.recipient_id.to_string()))
            .bind(("sender_id", input.sender_id.map(|s| s.to_string())))
            .bind(("message", input.message))
            .bind(("action", input.action.as_str().to_string()))
            .bind(("entity_type", input.entity_type))
            .bind(("entity_id", input.entity_id.map(|e| e.to_string())))
            .bind(("priority", input.priority.as_str().to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(self.fetch_by_id(id).await?)
    }

    async fn list_for_recipient(
        &self,
        recipient_id: Uuid,
        pagination: Pagination,
    ) -> ShajaraResult<PaginatedResult<Notification>> {
        let recipient = recipient_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM notification \
                 WHERE recipient_id = $recipient GROUP ALL",
            )
            .bind(("recipient", recipient.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM notification \
                 WHERE recipient_id = $recipient \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("recipient", recipient))
            .bind(("limit", pagination.per_page))
            .bind(("offset", pagination.offset()))
            .await
            .map_err(DbError::from)?;
        let rows: Vec<NotificationRow> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(NotificationRow::try_into_notification)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult::new(items, total, pagination))
    }

    async fn mark_read(&self, id: Uuid) -> ShajaraResult<Notification> {
        self.db
            .query(
                "UPDATE type::record('notification', $id) SET \
                 read = true, read_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(DbError::from)?;

        Ok(self.fetch_by_id(id).await?)
    }
}
