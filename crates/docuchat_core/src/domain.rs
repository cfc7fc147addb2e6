//! crates/docuchat_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The signed-in identity, as reported by the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
}

/// A project groups the documents and the conversation for one line of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where a document currently sits in its upload/processing lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStatus {
    Uploading,
    Processing,
    Ready,
    Error,
}

impl DocumentStatus {
    /// The lowercase label used on the wire and in the data store.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Uploading => "uploading",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Error => "error",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "uploading" => Some(DocumentStatus::Uploading),
            "processing" => Some(DocumentStatus::Processing),
            "ready" => Some(DocumentStatus::Ready),
            "error" => Some(DocumentStatus::Error),
            _ => None,
        }
    }
}

/// A document uploaded into a project.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub size: i64,
    pub media_type: String,
    pub status: DocumentStatus,
    pub uploaded_at: DateTime<Utc>,
    /// Key under which the bytes live in object storage. Absent while the
    /// record is still provisional.
    pub storage_path: Option<String>,
}

/// Who authored a message in the conversation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            _ => None,
        }
    }
}

/// Points the user at the source document an answer was drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    pub document: String,
    pub page: Option<i32>,
}

/// One entry in a project's conversation log, ordered by creation time.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub project_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub citation: Option<Citation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_round_trip() {
        for status in [
            DocumentStatus::Uploading,
            DocumentStatus::Processing,
            DocumentStatus::Ready,
            DocumentStatus::Error,
        ] {
            assert_eq!(DocumentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DocumentStatus::parse("queued"), None);
    }

    #[test]
    fn role_labels_round_trip() {
        assert_eq!(MessageRole::parse("user"), Some(MessageRole::User));
        assert_eq!(MessageRole::parse("assistant"), Some(MessageRole::Assistant));
        assert_eq!(MessageRole::parse("system"), None);
    }
}
