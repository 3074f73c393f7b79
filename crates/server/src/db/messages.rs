//! `PostgreSQL` contact message repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use mp_records_core::{Email, MessageId};

use super::{MessageStore, PgStore, RepositoryError, count_from};
use crate::models::Message;

#[derive(sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    email: Email,
    subject: String,
    body: String,
    read: bool,
    sent_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(r: MessageRow) -> Self {
        Self {
            id: MessageId::from_uuid(r.id),
            email: r.email,
            subject: r.subject,
            body: r.body,
            read: r.read,
            sent_at: r.sent_at,
        }
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn list_messages(&self) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, email, subject, body, read, sent_at FROM site.message
             ORDER BY sent_at DESC",
        )
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(Message::from).collect())
    }

    async fn insert_message(&self, message: &Message) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO site.message (id, email, subject, body, read, sent_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(message.id)
        .bind(&message.email)
        .bind(&message.subject)
        .bind(&message.body)
        .bind(message.read)
        .bind(message.sent_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn mark_message_read(&self, id: MessageId) -> Result<Message, RepositoryError> {
        let row = sqlx::query_as::<_, MessageRow>(
            "UPDATE site.message SET read = TRUE WHERE id = $1
             RETURNING id, email, subject, body, read, sent_at",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(Message::from).ok_or(RepositoryError::NotFound)
    }

    async fn delete_message(&self, id: MessageId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM site.message WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn count_messages(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM site.message")
            .fetch_one(self.pool())
            .await?;
        count_from(count)
    }

    async fn count_unread_messages(&self) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM site.message WHERE NOT read")
            .fetch_one(self.pool())
            .await?;
        count_from(count)
    }
}
