/// In-app notification records
use super::templates::InAppRecord;
use crate::{
    db::{parse_optional_timestamp, parse_timestamp, timestamp},
    error::{BoardError, BoardResult},
    ids::{NotificationId, UserId},
    pagination::{Page, PageParams},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub related_ids: serde_json::Value,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    fn from_row(row: &SqliteRow) -> BoardResult<Self> {
        let related_ids: String = row.try_get("related_ids")?;
        Ok(Notification {
            id: NotificationId(row.try_get("id")?),
            user_id: UserId(row.try_get("user_id")?),
            kind: row.try_get("kind")?,
            message: row.try_get("message")?,
            related_ids: serde_json::from_str(&related_ids)
                .map_err(|e| BoardError::Internal(format!("Invalid related_ids: {}", e)))?,
            read_at: parse_optional_timestamp(row, "read_at")?,
            created_at: parse_timestamp(row, "created_at")?,
        })
    }
}

/// `?unread_only=true`
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct NotificationFilter {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Clone)]
pub struct NotificationStore {
    db: SqlitePool,
}

impl NotificationStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn insert(&self, user_id: UserId, record: &InAppRecord) -> BoardResult<NotificationId> {
        let result = sqlx::query(
            "INSERT INTO notifications (user_id, kind, message, related_ids, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(record.kind.as_str())
        .bind(&record.message)
        .bind(record.related_ids.to_string())
        .bind(timestamp(Utc::now()))
        .execute(&self.db)
        .await?;

        Ok(NotificationId(result.last_insert_rowid()))
    }

    /// Newest first
    pub async fn list(
        &self,
        user_id: UserId,
        filter: NotificationFilter,
        page: PageParams,
    ) -> BoardResult<Page<Notification>> {
        let unread_clause = if filter.unread_only {
            " AND read_at IS NULL"
        } else {
            ""
        };

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?{}",
            unread_clause
        ))
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query(&format!(
            "SELECT id, user_id, kind, message, related_ids, read_at, created_at FROM notifications WHERE user_id = ?{} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            unread_clause
        ))
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.db)
        .await?;

        let data = rows
            .iter()
            .map(Notification::from_row)
            .collect::<BoardResult<Vec<_>>>()?;
        Ok(Page::new(data, page, total))
    }

    /// Mark one of the user's notifications read; already-read is not an error
    pub async fn mark_read(&self, user_id: UserId, id: NotificationId) -> BoardResult<()> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = COALESCE(read_at, ?) WHERE id = ? AND user_id = ?",
        )
        .bind(timestamp(Utc::now()))
        .bind(id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(BoardError::NotFound(format!("Notification {} not found", id)));
        }
        Ok(())
    }

    /// Returns how many were newly marked
    pub async fn mark_all_read(&self, user_id: UserId) -> BoardResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = ? WHERE user_id = ? AND read_at IS NULL",
        )
        .bind(timestamp(Utc::now()))
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn unread_count(&self, user_id: UserId) -> BoardResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::UserRole;
    use crate::notify::{templates::in_app, NotificationEvent};
    use crate::test_support::TestContext;

    #[tokio::test]
    async fn test_read_tracking() {
        let t = TestContext::new().await;
        let user = t.user(UserRole::JobSeeker).await;
        let other = t.user(UserRole::JobSeeker).await;
        let store = NotificationStore::new(t.ctx.db.clone());

        let first = store
            .insert(user.id, &in_app(&NotificationEvent::ProfileCompleted))
            .await
            .unwrap();
        store
            .insert(user.id, &in_app(&NotificationEvent::AccountReinstated))
            .await
            .unwrap();
        assert_eq!(store.unread_count(user.id).await.unwrap(), 2);

        // Someone else's notification is invisible
        assert!(matches!(
            store.mark_read(other.id, first).await,
            Err(BoardError::NotFound(_))
        ));

        store.mark_read(user.id, first).await.unwrap();
        store.mark_read(user.id, first).await.unwrap();
        assert_eq!(store.unread_count(user.id).await.unwrap(), 1);

        let unread = store
            .list(user.id, NotificationFilter { unread_only: true }, PageParams::default())
            .await
            .unwrap();
        assert_eq!(unread.total, 1);
        assert_eq!(unread.data[0].kind, "account_reinstated");

        assert_eq!(store.mark_all_read(user.id).await.unwrap(), 1);
        assert_eq!(store.unread_count(user.id).await.unwrap(), 0);
    }
}
