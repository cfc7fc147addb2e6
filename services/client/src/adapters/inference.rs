//! services/client/src/adapters/inference.rs
//!
//! This module contains the adapter for the remote chat inference service.
//! It implements the `InferenceService` port from the `core` crate.

use async_trait::async_trait;
use docuchat_core::ports::{InferenceService, PortError, PortResult};
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct ChatRequest<'a> {
    collection: &'a str,
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    success: bool,
    response: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `InferenceService` against the remote chat
/// endpoint. The full answer arrives in one response; the incremental reveal
/// is purely a presentation concern handled by the conversation controller.
#[derive(Clone)]
pub struct HttpInferenceAdapter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpInferenceAdapter {
    /// Creates a new `HttpInferenceAdapter`.
    pub fn new(client: reqwest::Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

//=========================================================================================
// `InferenceService` Trait Implementation
//=========================================================================================

#[async_trait]
impl InferenceService for HttpInferenceAdapter {
    async fn answer(&self, collection: &str, message: &str) -> PortResult<String> {
        let request = ChatRequest {
            collection,
            message,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Inference endpoint error {}: {}",
                status, body
            )));
        }

        let answer: ChatResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if !answer.success {
            return Err(PortError::Unexpected(
                "Inference endpoint reported failure".to_string(),
            ));
        }

        Ok(answer.response)
    }
}
