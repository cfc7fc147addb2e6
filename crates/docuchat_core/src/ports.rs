//! crates/docuchat_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use uuid::Uuid;

use crate::domain::{Citation, Document, DocumentStatus, Identity, Message, MessageRole, Project};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// A push stream of identity changes: `Some` on sign-in, `None` on sign-out.
pub type IdentityStream = Pin<Box<dyn Stream<Item = Option<Identity>> + Send>>;

//=========================================================================================
// New-Record Payloads
//=========================================================================================
// The data collaborator assigns durable ids and timestamps; callers hand it
// everything else.

#[derive(Debug, Clone)]
pub struct NewDocument {
    pub project_id: Uuid,
    pub name: String,
    pub size: i64,
    pub media_type: String,
    pub status: DocumentStatus,
    pub storage_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub project_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub citation: Option<Citation>,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait SessionService: Send + Sync {
    /// Returns the identity currently signed in, if any.
    async fn current_identity(&self) -> PortResult<Option<Identity>>;

    async fn sign_out(&self) -> PortResult<()>;

    /// Change notifications on sign-in/sign-out.
    fn identity_changes(&self) -> IdentityStream;
}

#[async_trait]
pub trait DataService: Send + Sync {
    // --- Projects ---
    /// All projects owned by `owner`, newest first.
    async fn list_projects(&self, owner: Uuid) -> PortResult<Vec<Project>>;

    async fn insert_project(
        &self,
        owner: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> PortResult<Project>;

    async fn delete_project(&self, id: Uuid) -> PortResult<()>;

    // --- Documents ---
    /// All documents in `project_id`, newest first.
    async fn list_documents(&self, project_id: Uuid) -> PortResult<Vec<Document>>;

    async fn insert_document(&self, document: NewDocument) -> PortResult<Document>;

    async fn update_document_status(&self, id: Uuid, status: DocumentStatus) -> PortResult<()>;

    async fn delete_document(&self, id: Uuid) -> PortResult<()>;

    // --- Messages ---
    /// The conversation log for `project_id`, oldest first.
    async fn list_messages(&self, project_id: Uuid) -> PortResult<Vec<Message>>;

    async fn insert_message(&self, message: NewMessage) -> PortResult<Message>;
}

#[async_trait]
pub trait ObjectStorageService: Send + Sync {
    /// Uploads bytes and returns the path they were stored under.
    async fn put(&self, path: &str, bytes: &[u8]) -> PortResult<String>;

    /// Best-effort bulk delete of stored objects.
    async fn remove(&self, paths: &[String]) -> PortResult<()>;
}

#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Answers a message against the named document collection.
    async fn answer(&self, collection: &str, message: &str) -> PortResult<String>;
}

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Submits a batch of documents to the remote processing endpoint for
    /// embedding. Only success or failure is reported back.
    async fn embed_documents(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        documents: &[Document],
    ) -> PortResult<()>;
}
