//! services/client/src/app/state.rs
//!
//! Defines the application's shared state: the collaborator handles and the
//! notice channel every controller reports through.

use crate::app::notify::{Notice, NoticeSender};
use crate::config::Config;
use docuchat_core::ports::{
    DataService, EmbeddingService, InferenceService, ObjectStorageService, SessionService,
};
use std::sync::Arc;
use tracing::warn;

/// The shared application state, created once at startup and handed to every
/// controller and worker task.
pub struct AppState {
    pub db: Arc<dyn DataService>,
    pub storage: Arc<dyn ObjectStorageService>,
    pub inference: Arc<dyn InferenceService>,
    pub embedding: Arc<dyn EmbeddingService>,
    pub session: Arc<dyn SessionService>,
    pub config: Arc<Config>,
    notices: NoticeSender,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<dyn DataService>,
        storage: Arc<dyn ObjectStorageService>,
        inference: Arc<dyn InferenceService>,
        embedding: Arc<dyn EmbeddingService>,
        session: Arc<dyn SessionService>,
        config: Arc<Config>,
        notices: NoticeSender,
    ) -> Arc<Self> {
        Arc::new(Self {
            db,
            storage,
            inference,
            embedding,
            session,
            config,
            notices,
        })
    }

    pub fn notify_info(&self, message: impl Into<String>) {
        self.send(Notice::Info {
            message: message.into(),
        });
    }

    pub fn notify_error(&self, message: impl Into<String>) {
        self.send(Notice::Error {
            message: message.into(),
        });
    }

    fn send(&self, notice: Notice) {
        if self.notices.send(notice).is_err() {
            // The view layer dropped its receiver; nothing left to show
            // notices to.
            warn!("Notice channel closed; dropping notification");
        }
    }
}
