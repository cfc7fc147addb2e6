//! services/client/src/app/documents.rs
//!
//! Per-project document state: the list with upload/processing status, the
//! name filter, and the add/remove/embedding operations. The per-file upload
//! pipeline itself lives in `upload_task`.

use crate::app::state::AppState;
use crate::app::upload_task::upload_process;
use crate::error::ClientError;
use bytes::Bytes;
use docuchat_core::domain::{Document, DocumentStatus, Identity};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, warn};
use uuid::Uuid;

/// A file handed over by the view layer for upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: String,
    pub media_type: String,
    pub bytes: Bytes,
}

pub(crate) struct DocumentsState {
    pub project_id: Option<Uuid>,
    pub documents: Vec<Document>,
    pub filter: String,
}

/// Controls the document list of the currently selected project.
pub struct DocumentController {
    state: Arc<AppState>,
    identity: Identity,
    inner: Arc<Mutex<DocumentsState>>,
}

impl DocumentController {
    pub fn new(state: Arc<AppState>, identity: Identity) -> Arc<Self> {
        Arc::new(Self {
            state,
            identity,
            inner: Arc::new(Mutex::new(DocumentsState {
                project_id: None,
                documents: Vec::new(),
                filter: String::new(),
            })),
        })
    }

    /// Loads the document list for a project, newest first. `None` means no
    /// project is selected: the list is cleared and no fetch is performed,
    /// so the view can render its distinct empty state.
    pub async fn load(&self, project_id: Option<Uuid>) -> Result<(), ClientError> {
        let Some(project_id) = project_id else {
            let mut inner = self.inner.lock().await;
            inner.project_id = None;
            inner.documents.clear();
            return Ok(());
        };

        let documents = match self.state.db.list_documents(project_id).await {
            Ok(documents) => documents,
            Err(e) => {
                error!("Error fetching documents: {:?}", e);
                self.state.notify_error("Failed to fetch documents");
                return Err(e.into());
            }
        };

        let mut inner = self.inner.lock().await;
        inner.project_id = Some(project_id);
        inner.documents = documents;
        Ok(())
    }

    pub async fn documents(&self) -> Vec<Document> {
        self.inner.lock().await.documents.clone()
    }

    /// Case-insensitive substring filter on document names, applied to the
    /// in-memory list only.
    pub async fn set_filter(&self, term: &str) {
        self.inner.lock().await.filter = term.to_string();
    }

    pub async fn filtered(&self) -> Vec<Document> {
        let inner = self.inner.lock().await;
        filter_documents(&inner.documents, &inner.filter)
    }

    /// Starts one independent upload worker per file. Workers do not block on
    /// each other; each failure removes its own provisional record and emits
    /// a notice naming the file.
    pub async fn add_files(self: &Arc<Self>, files: Vec<FileUpload>) -> Result<(), ClientError> {
        let project_id = self
            .inner
            .lock()
            .await
            .project_id
            .ok_or_else(|| ClientError::Validation("No project selected".to_string()))?;

        for file in files {
            let state = self.state.clone();
            let documents = self.inner.clone();
            let controller = Arc::clone(self);
            tokio::spawn(async move {
                match upload_process(state.clone(), documents, project_id, file).await {
                    Ok(document) => {
                        // Placeholder for the external processing pipeline:
                        // when enabled, the document is marked ready after a
                        // configured delay. A real deployment calls
                        // `complete_processing` from its completion signal.
                        if state.config.simulate_processing {
                            tokio::time::sleep(state.config.processing_delay).await;
                            if let Err(e) = controller.complete_processing(document.id).await {
                                warn!(
                                    "Failed to finish processing document {}: {:?}",
                                    document.id, e
                                );
                            }
                        }
                    }
                    Err(e) => error!("Upload worker failed: {:?}", e),
                }
            });
        }
        Ok(())
    }

    /// The external pipeline's completion signal: the document's processing
    /// finished and it is now ready for chat. The durable status is advanced
    /// first; the local view only follows a successful persist.
    pub async fn complete_processing(&self, id: Uuid) -> Result<(), ClientError> {
        if let Err(e) = self
            .state
            .db
            .update_document_status(id, DocumentStatus::Ready)
            .await
        {
            error!("Error updating document status: {:?}", e);
            self.state.notify_error("Failed to update document status");
            return Err(e.into());
        }

        let name = {
            let mut inner = self.inner.lock().await;
            inner.documents.iter_mut().find(|d| d.id == id).map(|d| {
                d.status = DocumentStatus::Ready;
                d.name.clone()
            })
        };
        if let Some(name) = name {
            self.state.notify_info(format!("{} is ready for chat.", name));
        }
        Ok(())
    }

    /// Deletes a document record, then makes a best-effort attempt to drop
    /// its stored bytes, then removes it from the local list.
    pub async fn remove(&self, id: Uuid) -> Result<(), ClientError> {
        let storage_path = {
            let inner = self.inner.lock().await;
            inner
                .documents
                .iter()
                .find(|d| d.id == id)
                .and_then(|d| d.storage_path.clone())
        };

        if let Err(e) = self.state.db.delete_document(id).await {
            error!("Error deleting document: {:?}", e);
            self.state.notify_error("Failed to delete document");
            return Err(e.into());
        }

        if let Some(path) = storage_path {
            if let Err(e) = self.state.storage.remove(&[path]).await {
                warn!("Failed to remove stored bytes for document {}: {:?}", id, e);
            }
        }

        self.inner.lock().await.documents.retain(|d| d.id != id);
        Ok(())
    }

    /// Submits every ready document to the remote embedding endpoint. Fails
    /// locally, with no network call, when nothing is ready. Statuses are
    /// never touched here.
    pub async fn request_embedding(&self) -> Result<(), ClientError> {
        let (project_id, ready) = {
            let inner = self.inner.lock().await;
            let project_id = inner
                .project_id
                .ok_or_else(|| ClientError::Validation("No project selected".to_string()))?;
            let ready: Vec<Document> = inner
                .documents
                .iter()
                .filter(|d| d.status == DocumentStatus::Ready)
                .cloned()
                .collect();
            (project_id, ready)
        };

        if ready.is_empty() {
            return Err(ClientError::NoReadyDocuments);
        }

        match self
            .state
            .embedding
            .embed_documents(project_id, self.identity.id, &ready)
            .await
        {
            Ok(()) => {
                self.state
                    .notify_info("Documents submitted for processing");
                Ok(())
            }
            Err(e) => {
                error!("Error requesting embedding: {:?}", e);
                self.state.notify_error("Failed to submit documents");
                Err(e.into())
            }
        }
    }
}

fn filter_documents(documents: &[Document], term: &str) -> Vec<Document> {
    let needle = term.to_lowercase();
    documents
        .iter()
        .filter(|d| d.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}
