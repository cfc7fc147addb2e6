//! services/client/src/app/upload_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! uploading a single file into a project.

use crate::app::documents::{DocumentsState, FileUpload};
use crate::app::state::AppState;
use chrono::Utc;
use docuchat_core::domain::{Document, DocumentStatus};
use docuchat_core::ports::{NewDocument, PortResult};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// The main asynchronous task for one file upload.
///
/// The file gets a provisional record immediately so the view shows it as
/// uploading. The bytes go to object storage first, then the durable record
/// is inserted and atomically replaces the provisional one. Any failure
/// removes the provisional record again: an upload failure must not leave an
/// orphaned database record, and an insert failure after a successful upload
/// removes the just-uploaded bytes best-effort.
pub async fn upload_process(
    state: Arc<AppState>,
    documents: Arc<Mutex<DocumentsState>>,
    project_id: Uuid,
    file: FileUpload,
) -> PortResult<Document> {
    info!("Upload started for '{}'", file.name);

    let provisional_id = Uuid::new_v4();
    let provisional = Document {
        id: provisional_id,
        project_id,
        name: file.name.clone(),
        size: file.bytes.len() as i64,
        media_type: file.media_type.clone(),
        status: DocumentStatus::Uploading,
        uploaded_at: Utc::now(),
        storage_path: None,
    };

    documents.lock().await.documents.insert(0, provisional);

    let path = format!("{}/{}-{}", project_id, provisional_id, file.name);
    let stored_path = match state.storage.put(&path, &file.bytes).await {
        Ok(stored_path) => stored_path,
        Err(e) => {
            discard_provisional(&documents, provisional_id).await;
            state.notify_error(format!("Failed to upload {}", file.name));
            return Err(e);
        }
    };

    let inserted = state
        .db
        .insert_document(NewDocument {
            project_id,
            name: file.name.clone(),
            size: file.bytes.len() as i64,
            media_type: file.media_type.clone(),
            status: DocumentStatus::Processing,
            storage_path: Some(stored_path.clone()),
        })
        .await;

    let durable = match inserted {
        Ok(durable) => durable,
        Err(e) => {
            if let Err(cleanup) = state.storage.remove(&[stored_path]).await {
                warn!(
                    "Failed to clean up uploaded bytes for '{}': {:?}",
                    file.name, cleanup
                );
            }
            discard_provisional(&documents, provisional_id).await;
            state.notify_error(format!("Failed to upload {}", file.name));
            return Err(e);
        }
    };

    // One lock acquisition: the provisional entry becomes the durable one in
    // place, so the view never sees both or neither. If the list was reloaded
    // mid-upload the provisional entry is already gone and the durable record
    // appears on the next load instead.
    {
        let mut list = documents.lock().await;
        if let Some(slot) = list.documents.iter_mut().find(|d| d.id == provisional_id) {
            *slot = durable.clone();
        }
    }

    info!("Upload finished for '{}'", file.name);
    Ok(durable)
}

async fn discard_provisional(documents: &Arc<Mutex<DocumentsState>>, id: Uuid) {
    let mut list = documents.lock().await;
    list.documents.retain(|d| d.id != id);
}
