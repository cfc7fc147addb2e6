//! services/client/src/adapters/storage.rs
//!
//! This module contains the adapter for the object storage collaborator.
//! It implements the `ObjectStorageService` port from the `core` crate.

use async_trait::async_trait;
use docuchat_core::ports::{ObjectStorageService, PortError, PortResult};
use serde_json::json;

use crate::adapters::auth::AccessToken;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that uploads and removes document bytes over the storage
/// collaborator's HTTP object API.
#[derive(Clone)]
pub struct HttpStorageAdapter {
    client: reqwest::Client,
    base_url: String,
    bucket: String,
    token: AccessToken,
}

impl HttpStorageAdapter {
    /// Creates a new `HttpStorageAdapter`.
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        bucket: String,
        token: AccessToken,
    ) -> Self {
        Self {
            client,
            base_url,
            bucket,
            token,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.get() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

//=========================================================================================
// `ObjectStorageService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ObjectStorageService for HttpStorageAdapter {
    async fn put(&self, path: &str, bytes: &[u8]) -> PortResult<String> {
        let url = format!("{}/object/{}/{}", self.base_url, self.bucket, path);
        let response = self
            .authorize(self.client.post(&url))
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Storage upload failed with {}: {}",
                status, body
            )));
        }

        Ok(path.to_string())
    }

    async fn remove(&self, paths: &[String]) -> PortResult<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = format!("{}/object/{}", self.base_url, self.bucket);
        let response = self
            .authorize(self.client.delete(&url))
            .json(&json!({ "prefixes": paths }))
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "Storage delete failed with {}",
                response.status()
            )));
        }
        Ok(())
    }
}
