//! services/client/src/app/notify.rs
//!
//! Defines the notice protocol between the controllers and the view layer.
//! Collaborator failures are never fatal; they surface here as user-visible
//! notices while local state stays at the last known-good collaborator state.

use serde::Serialize;
use tokio::sync::mpsc;

/// A user-visible notification emitted by a controller.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// Confirms that an action completed (e.g. a project was created).
    Info { message: String },

    /// Reports a failed action the user should know about. The affected
    /// in-flight flag has already been reset when this is delivered.
    Error { message: String },
}

pub type NoticeSender = mpsc::UnboundedSender<Notice>;
pub type NoticeReceiver = mpsc::UnboundedReceiver<Notice>;

/// Creates the notice channel the view layer drains.
pub fn channel() -> (NoticeSender, NoticeReceiver) {
    mpsc::unbounded_channel()
}
