//! services/client/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DataService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docuchat_core::domain::{Citation, Document, DocumentStatus, Message, MessageRole, Project};
use docuchat_core::ports::{DataService, NewDocument, NewMessage, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DataService` port.
#[derive(Clone)]
pub struct SqlDataAdapter {
    pool: PgPool,
}

impl SqlDataAdapter {
    /// Creates a new `SqlDataAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ProjectRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ProjectRecord {
    fn to_domain(self) -> Project {
        Project {
            id: self.id,
            name: self.name,
            description: self.description,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(FromRow)]
struct DocumentRecord {
    id: Uuid,
    project_id: Uuid,
    name: String,
    size: i64,
    media_type: String,
    status: String,
    uploaded_at: DateTime<Utc>,
    storage_path: Option<String>,
}
impl DocumentRecord {
    fn to_domain(self) -> PortResult<Document> {
        let status = DocumentStatus::parse(&self.status).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown document status '{}'", self.status))
        })?;
        Ok(Document {
            id: self.id,
            project_id: self.project_id,
            name: self.name,
            size: self.size,
            media_type: self.media_type,
            status,
            uploaded_at: self.uploaded_at,
            storage_path: self.storage_path,
        })
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    project_id: Uuid,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
    citation_document: Option<String>,
    citation_page: Option<i32>,
}
impl MessageRecord {
    fn to_domain(self) -> PortResult<Message> {
        let role = MessageRole::parse(&self.role)
            .ok_or_else(|| PortError::Unexpected(format!("Unknown message role '{}'", self.role)))?;
        let citation = self.citation_document.map(|document| Citation {
            document,
            page: self.citation_page,
        });
        Ok(Message {
            id: self.id,
            project_id: self.project_id,
            role,
            content: self.content,
            created_at: self.created_at,
            citation,
        })
    }
}

//=========================================================================================
// `DataService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DataService for SqlDataAdapter {
    async fn list_projects(&self, owner: Uuid) -> PortResult<Vec<Project>> {
        let records = sqlx::query_as::<_, ProjectRecord>(
            "SELECT id, name, description, created_at, updated_at \
             FROM projects WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn insert_project(
        &self,
        owner: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> PortResult<Project> {
        let record = sqlx::query_as::<_, ProjectRecord>(
            "INSERT INTO projects (user_id, name, description) VALUES ($1, $2, $3) \
             RETURNING id, name, description, created_at, updated_at",
        )
        .bind(owner)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.to_domain())
    }

    async fn delete_project(&self, id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_documents(&self, project_id: Uuid) -> PortResult<Vec<Document>> {
        let records = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, project_id, name, size, media_type, status, uploaded_at, storage_path \
             FROM documents WHERE project_id = $1 ORDER BY uploaded_at DESC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn insert_document(&self, document: NewDocument) -> PortResult<Document> {
        let record = sqlx::query_as::<_, DocumentRecord>(
            "INSERT INTO documents (project_id, name, size, media_type, status, storage_path) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, project_id, name, size, media_type, status, uploaded_at, storage_path",
        )
        .bind(document.project_id)
        .bind(&document.name)
        .bind(document.size)
        .bind(&document.media_type)
        .bind(document.status.as_str())
        .bind(&document.storage_path)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        record.to_domain()
    }

    async fn update_document_status(&self, id: Uuid, status: DocumentStatus) -> PortResult<()> {
        let result = sqlx::query("UPDATE documents SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Document {} not found", id)));
        }
        Ok(())
    }

    async fn delete_document(&self, id: Uuid) -> PortResult<()> {
        sqlx::query("DELETE FROM documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn list_messages(&self, project_id: Uuid) -> PortResult<Vec<Message>> {
        let records = sqlx::query_as::<_, MessageRecord>(
            "SELECT id, project_id, role, content, created_at, citation_document, citation_page \
             FROM messages WHERE project_id = $1 ORDER BY created_at ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn insert_message(&self, message: NewMessage) -> PortResult<Message> {
        let (citation_document, citation_page) = match &message.citation {
            Some(citation) => (Some(citation.document.as_str()), citation.page),
            None => (None, None),
        };

        let record = sqlx::query_as::<_, MessageRecord>(
            "INSERT INTO messages (project_id, role, content, citation_document, citation_page) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, project_id, role, content, created_at, citation_document, citation_page",
        )
        .bind(message.project_id)
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(citation_document)
        .bind(citation_page)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        record.to_domain()
    }
}
