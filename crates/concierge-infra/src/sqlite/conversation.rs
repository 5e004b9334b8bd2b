//! SQLite conversation repository implementation.
//!
//! Implements `ConversationRepository` from `concierge-core` using sqlx with
//! split read/write pools: raw queries, private Row structs, writes on the
//! single-connection writer pool.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use sqlx::SqliteConnection;
use uuid::Uuid;

use concierge_core::chat::repository::ConversationRepository;
use concierge_types::conversation::{Conversation, Message, Role};
use concierge_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ConversationRepository`.
pub struct SqliteConversationRepository {
    pool: DatabasePool,
}

impl SqliteConversationRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ConversationRow {
    id: String,
    title: String,
    created_at: String,
    updated_at: String,
}

impl ConversationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_conversation(self, messages: Vec<Message>) -> Result<Conversation, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid conversation id: {e}")))?;

        Ok(Conversation {
            id,
            title: self.title,
            messages,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

struct MessageRow {
    id: String,
    role: String,
    content: String,
    created_at: String,
    updated_at: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let role: Role = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(Message {
            id,
            role,
            content: self.content,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width RFC 3339, so `ORDER BY updated_at` on the text column is chronological.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn map_write_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.message().contains("FOREIGN KEY") => {
            RepositoryError::NotFound
        }
        sqlx::Error::Database(ref db_err) if db_err.message().contains("UNIQUE") => {
            RepositoryError::Conflict(db_err.message().to_string())
        }
        e => RepositoryError::Query(e.to_string()),
    }
}

/// Insert one message, or refresh its content if the id is already stored.
async fn upsert_message(
    conn: &mut SqliteConnection,
    conversation_id: &Uuid,
    message: &Message,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r#"INSERT INTO messages (id, conversation_id, role, content, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?)
           ON CONFLICT(id) DO UPDATE SET content = excluded.content, updated_at = excluded.updated_at"#,
    )
    .bind(message.id.to_string())
    .bind(conversation_id.to_string())
    .bind(message.role.to_string())
    .bind(&message.content)
    .bind(format_datetime(&message.created_at))
    .bind(format_datetime(&message.updated_at))
    .execute(conn)
    .await
    .map_err(map_write_error)?;

    Ok(())
}

// ---------------------------------------------------------------------------
// ConversationRepository implementation
// ---------------------------------------------------------------------------

impl ConversationRepository for SqliteConversationRepository {
    async fn create(&self, conversation: &Conversation) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            "INSERT INTO conversations (id, title, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(conversation.id.to_string())
        .bind(&conversation.title)
        .bind(format_datetime(&conversation.created_at))
        .bind(format_datetime(&conversation.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| match map_write_error(e) {
            RepositoryError::Conflict(_) => RepositoryError::Conflict(format!(
                "conversation {} already exists",
                conversation.id
            )),
            other => other,
        })?;

        for message in &conversation.messages {
            upsert_message(&mut *tx, &conversation.id, message).await?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn update(&self, conversation: &Conversation) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let result = sqlx::query("UPDATE conversations SET title = ?, updated_at = ? WHERE id = ?")
            .bind(&conversation.title)
            .bind(format_datetime(&conversation.updated_at))
            .bind(conversation.id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        for message in &conversation.messages {
            upsert_message(&mut *tx, &conversation.id, message).await?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn append_message(
        &self,
        conversation_id: &Uuid,
        message: &Message,
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        upsert_message(&mut *tx, conversation_id, message).await?;

        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(format_datetime(&message.created_at))
            .bind(conversation_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn describe(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?")
            .bind(conversation_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let conversation_row =
            ConversationRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;

        let rows = sqlx::query("SELECT * FROM messages WHERE conversation_id = ? ORDER BY seq ASC")
            .bind(conversation_id.to_string())
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let msg_row =
                MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            messages.push(msg_row.into_message()?);
        }

        Ok(Some(conversation_row.into_conversation(messages)?))
    }

    async fn list(&self) -> Result<Vec<Conversation>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM conversations ORDER BY updated_at DESC, id DESC")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut conversations = Vec::with_capacity(rows.len());
        for row in &rows {
            let conversation_row = ConversationRow::from_row(row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            conversations.push(conversation_row.into_conversation(Vec::new())?);
        }

        Ok(conversations)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    async fn test_repo() -> (tempfile::TempDir, SqliteConversationRepository) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();
        (dir, SqliteConversationRepository::new(pool))
    }

    #[tokio::test]
    async fn create_then_describe_round_trips_messages() {
        let (_dir, repo) = test_repo().await;
        let conversation = Conversation::start("What is the weather like in Barcelona?");

        repo.create(&conversation).await.unwrap();
        let loaded = repo.describe(&conversation.id).await.unwrap().unwrap();

        assert_eq!(loaded.id, conversation.id);
        assert_eq!(loaded.title, "Untitled conversation");
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.messages[0].role, Role::User);
        assert_eq!(loaded.messages[0].content, "What is the weather like in Barcelona?");
        assert_eq!(loaded.messages[0].id, conversation.messages[0].id);
    }

    #[tokio::test]
    async fn describe_unknown_is_none() {
        let (_dir, repo) = test_repo().await;
        assert!(repo.describe(&Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_twice_conflicts() {
        let (_dir, repo) = test_repo().await;
        let conversation = Conversation::start("hi");
        repo.create(&conversation).await.unwrap();

        let err = repo.create(&conversation).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_writes_title_and_new_messages_once() {
        let (_dir, repo) = test_repo().await;
        let mut conversation = Conversation::start("hi");
        repo.create(&conversation).await.unwrap();

        conversation.title = "Greeting".to_string();
        conversation.push(Message::assistant("Hello!"));
        repo.update(&conversation).await.unwrap();
        // A second write of the same state must not duplicate rows.
        repo.update(&conversation).await.unwrap();

        let loaded = repo.describe(&conversation.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Greeting");
        let roles: Vec<Role> = loaded.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn update_unknown_is_not_found() {
        let (_dir, repo) = test_repo().await;
        let err = repo.update(&Conversation::start("hi")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn append_keeps_creation_order() {
        let (_dir, repo) = test_repo().await;
        let conversation = Conversation::start("first");
        repo.create(&conversation).await.unwrap();

        for text in ["second", "third"] {
            repo.append_message(&conversation.id, &Message::user(text))
                .await
                .unwrap();
        }

        let loaded = repo.describe(&conversation.id).await.unwrap().unwrap();
        let contents: Vec<&str> = loaded.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert!(loaded.updated_at >= conversation.updated_at);
    }

    #[tokio::test]
    async fn append_to_unknown_conversation_is_not_found() {
        let (_dir, repo) = test_repo().await;
        let err = repo
            .append_message(&Uuid::now_v7(), &Message::user("orphan"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn list_is_most_recent_first_without_messages() {
        let (_dir, repo) = test_repo().await;

        let mut older = Conversation::start("older");
        older.updated_at = Utc::now() - Duration::minutes(5);
        let newer = Conversation::start("newer");
        repo.create(&older).await.unwrap();
        repo.create(&newer).await.unwrap();

        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[1].id, older.id);
        assert!(listed.iter().all(|c| c.messages.is_empty()));
    }
}
