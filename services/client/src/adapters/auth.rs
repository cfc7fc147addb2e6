//! services/client/src/adapters/auth.rs
//!
//! This module contains the adapter for the external auth provider.
//! It implements the `SessionService` port from the `core` crate.

use async_trait::async_trait;
use docuchat_core::domain::Identity;
use docuchat_core::ports::{IdentityStream, PortError, PortResult, SessionService};
use serde::Deserialize;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use uuid::Uuid;

/// The bearer token shared between the session adapter (which owns its
/// lifecycle) and the storage adapter (which attaches it to uploads).
#[derive(Clone, Default)]
pub struct AccessToken(Arc<RwLock<Option<String>>>);

impl AccessToken {
    pub fn get(&self) -> Option<String> {
        self.0.read().expect("token lock poisoned").clone()
    }

    fn set(&self, token: Option<String>) {
        *self.0.write().expect("token lock poisoned") = token;
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `SessionService` against an HTTP auth provider.
///
/// The provider owns credentials and sign-in UI; this adapter only resolves
/// an access token to an identity and broadcasts sign-in/sign-out changes.
pub struct HttpSessionAdapter {
    client: reqwest::Client,
    base_url: String,
    token: AccessToken,
    changes: watch::Sender<Option<Identity>>,
}

#[derive(Deserialize)]
struct UserResponse {
    id: Uuid,
    email: Option<String>,
}

impl HttpSessionAdapter {
    /// Creates a new `HttpSessionAdapter`.
    pub fn new(client: reqwest::Client, base_url: String, token: AccessToken) -> Self {
        let (changes, _) = watch::channel(None);
        Self {
            client,
            base_url,
            token,
            changes,
        }
    }

    /// Resolves an access token obtained out-of-band (the provider's sign-in
    /// flow) to an identity, stores the token, and broadcasts the sign-in.
    pub async fn sign_in_with_token(&self, access_token: &str) -> PortResult<Identity> {
        let identity = self.fetch_identity(access_token).await?;
        self.token.set(Some(access_token.to_string()));
        let _ = self.changes.send(Some(identity.clone()));
        Ok(identity)
    }

    async fn fetch_identity(&self, access_token: &str) -> PortResult<Identity> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(PortError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Unexpected(format!(
                "Auth provider error {}: {}",
                status, body
            )));
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        Ok(Identity {
            id: user.id,
            email: user.email.unwrap_or_default(),
        })
    }
}

//=========================================================================================
// `SessionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionService for HttpSessionAdapter {
    async fn current_identity(&self) -> PortResult<Option<Identity>> {
        let Some(token) = self.token.get() else {
            return Ok(None);
        };
        match self.fetch_identity(&token).await {
            Ok(identity) => Ok(Some(identity)),
            // An expired or revoked token means "not signed in", not a failure.
            Err(PortError::Unauthorized) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn sign_out(&self) -> PortResult<()> {
        if let Some(token) = self.token.get() {
            let response = self
                .client
                .post(format!("{}/auth/v1/logout", self.base_url))
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
            if !response.status().is_success()
                && response.status() != reqwest::StatusCode::UNAUTHORIZED
            {
                return Err(PortError::Unexpected(format!(
                    "Auth provider error {} during sign-out",
                    response.status()
                )));
            }
        }
        self.token.set(None);
        let _ = self.changes.send(None);
        Ok(())
    }

    fn identity_changes(&self) -> IdentityStream {
        let mut rx = self.changes.subscribe();
        Box::pin(async_stream::stream! {
            loop {
                let current = rx.borrow_and_update().clone();
                yield current;
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
