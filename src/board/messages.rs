/// Direct messages between users, read by polling
use crate::{
    account::User,
    db::{parse_optional_timestamp, parse_timestamp, timestamp},
    error::{BoardError, BoardResult},
    ids::{MessageId, UserId},
    notify::{NotificationEvent, Notifier},
    pagination::{Page, PageParams},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, body, sent_at, read_at";

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub body: String,
    pub sent_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl Message {
    fn from_row(row: &SqliteRow) -> BoardResult<Self> {
        Ok(Message {
            id: MessageId(row.try_get("id")?),
            sender_id: UserId(row.try_get("sender_id")?),
            receiver_id: UserId(row.try_get("receiver_id")?),
            body: row.try_get("body")?,
            sent_at: parse_timestamp(row, "sent_at")?,
            read_at: parse_optional_timestamp(row, "read_at")?,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMessage {
    #[validate(length(min = 1, max = 5000, message = "must be between 1 and 5000 characters"))]
    pub body: String,
}

/// One row of the inbox
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub user_id: UserId,
    pub name: String,
    pub last_message: Message,
    pub unread: i64,
}

#[derive(Clone)]
pub struct MessageManager {
    db: SqlitePool,
    notifier: Arc<Notifier>,
}

impl MessageManager {
    pub fn new(db: SqlitePool, notifier: Arc<Notifier>) -> Self {
        Self { db, notifier }
    }

    pub async fn send(&self, sender: &User, receiver_id: UserId, input: NewMessage) -> BoardResult<Message> {
        let input = NewMessage {
            body: input.body.trim().to_string(),
        };
        input.validate()?;
        if receiver_id == sender.id {
            return Err(BoardError::Validation("Cannot send a message to yourself".to_string()));
        }

        let receiver_exists: Option<i64> =
            sqlx::query_scalar("SELECT id FROM users WHERE id = ? AND deleted_at IS NULL")
                .bind(receiver_id)
                .fetch_optional(&self.db)
                .await?;
        if receiver_exists.is_none() {
            return Err(BoardError::NotFound(format!("User {} not found", receiver_id)));
        }

        let result = sqlx::query(
            "INSERT INTO messages (sender_id, receiver_id, body, sent_at) VALUES (?, ?, ?, ?)",
        )
        .bind(sender.id)
        .bind(receiver_id)
        .bind(&input.body)
        .bind(timestamp(Utc::now()))
        .execute(&self.db)
        .await?;
        let id = MessageId(result.last_insert_rowid());
        info!(message_id = %id, sender_id = %sender.id, receiver_id = %receiver_id, "message sent");

        self.notifier
            .notify_user(
                receiver_id,
                &NotificationEvent::NewMessage {
                    message_id: id,
                    sender_id: sender.id,
                    sender_name: sender.name.clone(),
                },
            )
            .await;

        self.get(id).await
    }

    async fn get(&self, id: MessageId) -> BoardResult<Message> {
        let query = format!("SELECT {} FROM messages WHERE id = ?", MESSAGE_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| BoardError::NotFound(format!("Message {} not found", id)))?;
        Message::from_row(&row)
    }

    /// Messages between the pair, newest first
    pub async fn conversation(
        &self,
        user: &User,
        other: UserId,
        page: PageParams,
    ) -> BoardResult<Page<Message>> {
        let pair = "(sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?)";

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM messages WHERE {}", pair))
            .bind(user.id)
            .bind(other)
            .bind(other)
            .bind(user.id)
            .fetch_one(&self.db)
            .await?;

        let query = format!(
            "SELECT {} FROM messages WHERE {} ORDER BY sent_at DESC, id DESC LIMIT ? OFFSET ?",
            MESSAGE_COLUMNS, pair
        );
        let rows = sqlx::query(&query)
            .bind(user.id)
            .bind(other)
            .bind(other)
            .bind(user.id)
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(&self.db)
            .await?;

        let data = rows
            .iter()
            .map(Message::from_row)
            .collect::<BoardResult<Vec<_>>>()?;
        Ok(Page::new(data, page, total))
    }

    /// Mark everything `other` sent to `user` as read
    pub async fn mark_read(&self, user: &User, other: UserId) -> BoardResult<u64> {
        let result = sqlx::query(
            "UPDATE messages SET read_at = ? WHERE receiver_id = ? AND sender_id = ? AND read_at IS NULL",
        )
        .bind(timestamp(Utc::now()))
        .bind(user.id)
        .bind(other)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected())
    }

    /// Inbox: one entry per counterpart, most recent conversation first
    pub async fn conversations(&self, user: &User) -> BoardResult<Vec<ConversationSummary>> {
        let rows = sqlx::query(
            r#"
            WITH threads AS (
                SELECT CASE WHEN sender_id = ?1 THEN receiver_id ELSE sender_id END AS other_id,
                       MAX(id) AS last_id,
                       SUM(CASE WHEN receiver_id = ?1 AND read_at IS NULL THEN 1 ELSE 0 END) AS unread
                FROM messages
                WHERE sender_id = ?1 OR receiver_id = ?1
                GROUP BY other_id
            )
            SELECT t.other_id, t.unread, u.name,
                   m.id, m.sender_id, m.receiver_id, m.body, m.sent_at, m.read_at
            FROM threads t
            JOIN messages m ON m.id = t.last_id
            JOIN users u ON u.id = t.other_id
            ORDER BY m.sent_at DESC, m.id DESC
            "#,
        )
        .bind(user.id)
        .fetch_all(&self.db)
        .await?;

        rows.iter()
            .map(|row| -> BoardResult<ConversationSummary> {
                Ok(ConversationSummary {
                    user_id: UserId(row.try_get("other_id")?),
                    name: row.try_get("name")?,
                    last_message: Message::from_row(row)?,
                    unread: row.try_get("unread")?,
                })
            })
            .collect()
    }

    pub async fn unread_count(&self, user: &User) -> BoardResult<i64> {
        let count = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE receiver_id = ? AND read_at IS NULL",
        )
        .bind(user.id)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::UserRole;
    use crate::test_support::TestContext;

    fn body(text: &str) -> NewMessage {
        NewMessage { body: text.into() }
    }

    #[tokio::test]
    async fn test_send_and_read_conversation() {
        let t = TestContext::new().await;
        let employer = t.user(UserRole::Employer).await;
        let seeker = t.user(UserRole::JobSeeker).await;

        t.ctx.messages.send(&employer, seeker.id, body("Hi there")).await.unwrap();
        t.ctx.messages.send(&employer, seeker.id, body("Are you free?")).await.unwrap();
        t.ctx.messages.send(&seeker, employer.id, body("Yes")).await.unwrap();

        assert_eq!(t.ctx.messages.unread_count(&seeker).await.unwrap(), 2);

        let thread = t
            .ctx
            .messages
            .conversation(&seeker, employer.id, PageParams::default())
            .await
            .unwrap();
        assert_eq!(thread.total, 3);
        assert_eq!(thread.data[0].body, "Yes");

        let inbox = t.ctx.messages.conversations(&seeker).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].user_id, employer.id);
        assert_eq!(inbox[0].unread, 2);

        assert_eq!(t.ctx.messages.mark_read(&seeker, employer.id).await.unwrap(), 2);
        assert_eq!(t.ctx.messages.unread_count(&seeker).await.unwrap(), 0);
        // The reply was not read by the employer yet
        assert_eq!(t.ctx.messages.unread_count(&employer).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_send_rules() {
        let t = TestContext::new().await;
        let user = t.user(UserRole::JobSeeker).await;

        assert!(matches!(
            t.ctx.messages.send(&user, user.id, body("me")).await,
            Err(BoardError::Validation(_))
        ));
        assert!(matches!(
            t.ctx.messages.send(&user, UserId(999), body("hello")).await,
            Err(BoardError::NotFound(_))
        ));
        let other = t.user(UserRole::Employer).await;
        assert!(matches!(
            t.ctx.messages.send(&user, other.id, body("   ")).await,
            Err(BoardError::InvalidFields(_))
        ));
        assert!(matches!(
            t.ctx.messages.send(&user, other.id, body(&"x".repeat(5001))).await,
            Err(BoardError::InvalidFields(_))
        ));
    }

    #[tokio::test]
    async fn test_new_message_is_in_app_only_by_default() {
        let t = TestContext::new().await;
        let sender = t.user(UserRole::Employer).await;
        let receiver = t.user(UserRole::JobSeeker).await;

        t.ctx.messages.send(&sender, receiver.id, body("Hello")).await.unwrap();
        assert!(t.mailer.sent_to(&receiver.email).is_empty());
        assert_eq!(t.ctx.notifications.unread_count(receiver.id).await.unwrap(), 1);
    }
}
