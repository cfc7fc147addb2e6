//! services/client/src/adapters/memory.rs
//!
//! In-memory `DataService` implementation for tests.
//!
//! Uses `Vec`s behind `std::sync::RwLock` for thread safety. Ordering relies
//! on insertion order, so "newest first" is reverse iteration and the
//! conversation log is forward iteration. Deleting a project cascades to its
//! documents and messages, matching the relational collaborator's contract.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use docuchat_core::domain::{Document, DocumentStatus, Message, Project};
use docuchat_core::ports::{DataService, NewDocument, NewMessage, PortError, PortResult};
use uuid::Uuid;

struct StoredProject {
    owner: Uuid,
    project: Project,
}

/// In-memory data store for test environments.
#[derive(Default)]
pub struct InMemoryData {
    projects: RwLock<Vec<StoredProject>>,
    documents: RwLock<Vec<Document>>,
    messages: RwLock<Vec<Message>>,
}

impl InMemoryData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of document records currently stored, for assertions on
    /// provisional-record cleanup.
    pub fn document_count(&self) -> usize {
        self.documents.read().unwrap().len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.read().unwrap().len()
    }
}

#[async_trait]
impl DataService for InMemoryData {
    async fn list_projects(&self, owner: Uuid) -> PortResult<Vec<Project>> {
        let projects = self.projects.read().unwrap();
        Ok(projects
            .iter()
            .rev()
            .filter(|s| s.owner == owner)
            .map(|s| s.project.clone())
            .collect())
    }

    async fn insert_project(
        &self,
        owner: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> PortResult<Project> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
            created_at: now,
            updated_at: now,
        };
        self.projects.write().unwrap().push(StoredProject {
            owner,
            project: project.clone(),
        });
        Ok(project)
    }

    async fn delete_project(&self, id: Uuid) -> PortResult<()> {
        self.projects.write().unwrap().retain(|s| s.project.id != id);
        self.documents.write().unwrap().retain(|d| d.project_id != id);
        self.messages.write().unwrap().retain(|m| m.project_id != id);
        Ok(())
    }

    async fn list_documents(&self, project_id: Uuid) -> PortResult<Vec<Document>> {
        let documents = self.documents.read().unwrap();
        Ok(documents
            .iter()
            .rev()
            .filter(|d| d.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn insert_document(&self, document: NewDocument) -> PortResult<Document> {
        let stored = Document {
            id: Uuid::new_v4(),
            project_id: document.project_id,
            name: document.name,
            size: document.size,
            media_type: document.media_type,
            status: document.status,
            uploaded_at: Utc::now(),
            storage_path: document.storage_path,
        };
        self.documents.write().unwrap().push(stored.clone());
        Ok(stored)
    }

    async fn update_document_status(&self, id: Uuid, status: DocumentStatus) -> PortResult<()> {
        let mut documents = self.documents.write().unwrap();
        match documents.iter_mut().find(|d| d.id == id) {
            Some(document) => {
                document.status = status;
                Ok(())
            }
            None => Err(PortError::NotFound(format!("Document {} not found", id))),
        }
    }

    async fn delete_document(&self, id: Uuid) -> PortResult<()> {
        self.documents.write().unwrap().retain(|d| d.id != id);
        Ok(())
    }

    async fn list_messages(&self, project_id: Uuid) -> PortResult<Vec<Message>> {
        let messages = self.messages.read().unwrap();
        Ok(messages
            .iter()
            .filter(|m| m.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn insert_message(&self, message: NewMessage) -> PortResult<Message> {
        let stored = Message {
            id: Uuid::new_v4(),
            project_id: message.project_id,
            role: message.role,
            content: message.content,
            created_at: Utc::now(),
            citation: message.citation,
        };
        self.messages.write().unwrap().push(stored.clone());
        Ok(stored)
    }
}
