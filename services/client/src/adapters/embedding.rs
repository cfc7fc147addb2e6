//! services/client/src/adapters/embedding.rs
//!
//! This module contains the adapter for the remote embedding service.
//! It implements the `EmbeddingService` port from the `core` crate.

use async_trait::async_trait;
use docuchat_core::domain::Document;
use docuchat_core::ports::{EmbeddingService, PortError, PortResult};
use serde::Serialize;
use uuid::Uuid;

#[derive(Serialize)]
struct EmbeddingDocument<'a> {
    id: Uuid,
    name: &'a str,
    #[serde(rename = "type")]
    media_type: &'a str,
    size: i64,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    project_id: Uuid,
    user_id: Uuid,
    documents: Vec<EmbeddingDocument<'a>>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that posts a batch of ready documents to the remote processing
/// endpoint. Only the response status is consumed; the endpoint indexes the
/// documents on its own schedule.
#[derive(Clone)]
pub struct HttpEmbeddingAdapter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpEmbeddingAdapter {
    /// Creates a new `HttpEmbeddingAdapter`.
    pub fn new(client: reqwest::Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

//=========================================================================================
// `EmbeddingService` Trait Implementation
//=========================================================================================

#[async_trait]
impl EmbeddingService for HttpEmbeddingAdapter {
    async fn embed_documents(
        &self,
        project_id: Uuid,
        user_id: Uuid,
        documents: &[Document],
    ) -> PortResult<()> {
        let request = EmbeddingRequest {
            project_id,
            user_id,
            documents: documents
                .iter()
                .map(|d| EmbeddingDocument {
                    id: d.id,
                    name: &d.name,
                    media_type: &d.media_type,
                    size: d.size,
                })
                .collect(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Embedding endpoint error {}: {}",
                status, body
            )));
        }
        Ok(())
    }
}
