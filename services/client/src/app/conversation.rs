//! services/client/src/app/conversation.rs
//!
//! Per-project conversation state: the ordered message log, the turn state
//! machine, and the send operation. The character-by-character answer reveal
//! runs in `reveal_task`.

use crate::app::reveal_task::reveal_process;
use crate::app::state::AppState;
use crate::error::ClientError;
use chrono::Utc;
use docuchat_core::domain::{Identity, Message, MessageRole};
use docuchat_core::ports::NewMessage;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

/// Greeting shown in a project with no persisted messages yet. It is never
/// written to the data store.
const GREETING: &str =
    "Hello! I'm ready to answer questions about your documents. Upload some files and start asking!";

/// The phases one conversation turn moves through.
///
/// Failures in the two middle phases fall back to `Idle` with a notice; no
/// phase skips persisting the user message before inference is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    PersistingQuestion,
    AwaitingAnswer,
    Revealing,
}

pub(crate) struct ConversationState {
    pub project_id: Option<Uuid>,
    pub messages: Vec<Message>,
    pub phase: TurnPhase,
    /// Cancels the currently running reveal worker, if any.
    pub reveal_token: CancellationToken,
}

/// Controls the conversation of the currently selected project.
pub struct ConversationController {
    state: Arc<AppState>,
    identity: Identity,
    inner: Arc<Mutex<ConversationState>>,
}

impl ConversationController {
    pub fn new(state: Arc<AppState>, identity: Identity) -> Arc<Self> {
        Arc::new(Self {
            state,
            identity,
            inner: Arc::new(Mutex::new(ConversationState {
                project_id: None,
                messages: Vec::new(),
                phase: TurnPhase::Idle,
                reveal_token: CancellationToken::new(),
            })),
        })
    }

    /// Loads the message log for a project, oldest first. An empty log gets a
    /// synthesized greeting so the view is never blank for a new project.
    /// Any reveal still running for the previous project is cancelled.
    pub async fn load(&self, project_id: Uuid) -> Result<(), ClientError> {
        let messages = match self.state.db.list_messages(project_id).await {
            Ok(messages) => messages,
            Err(e) => {
                error!("Error fetching messages: {:?}", e);
                self.state.notify_error("Failed to fetch messages");
                return Err(e.into());
            }
        };

        let mut inner = self.inner.lock().await;
        inner.reveal_token.cancel();
        inner.reveal_token = CancellationToken::new();
        inner.project_id = Some(project_id);
        inner.phase = TurnPhase::Idle;
        inner.messages = if messages.is_empty() {
            vec![Message {
                id: Uuid::new_v4(),
                project_id,
                role: MessageRole::Assistant,
                content: GREETING.to_string(),
                created_at: Utc::now(),
                citation: None,
            }]
        } else {
            messages
        };
        Ok(())
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.inner.lock().await.messages.clone()
    }

    pub async fn phase(&self) -> TurnPhase {
        self.inner.lock().await.phase
    }

    /// The mutual-exclusion signal for `send`: true from the moment a turn is
    /// accepted until its reveal has finished (or the turn failed).
    pub async fn is_responding(&self) -> bool {
        self.inner.lock().await.phase != TurnPhase::Idle
    }

    /// Cancels a reveal in flight. The worker finalizes the message to its
    /// full text before stopping, so no partial content survives teardown.
    pub async fn cancel_reveal(&self) {
        self.inner.lock().await.reveal_token.cancel();
    }

    /// Unbinds the controller from its project: used when the last project
    /// is deleted and nothing is selected anymore.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.reveal_token.cancel();
        inner.reveal_token = CancellationToken::new();
        inner.project_id = None;
        inner.messages.clear();
        inner.phase = TurnPhase::Idle;
    }

    /// Runs one conversation turn: optimistic user message, persist, remote
    /// inference, persisted assistant message revealed incrementally.
    ///
    /// Blank input, a missing project binding, or a turn already in flight
    /// reject the call without touching any state.
    pub async fn send(&self, text: &str) -> Result<(), ClientError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::Validation(
                "Message must not be empty".to_string(),
            ));
        }

        let provisional_id = Uuid::new_v4();
        let project_id = {
            let mut inner = self.inner.lock().await;
            let Some(project_id) = inner.project_id else {
                return Err(ClientError::Validation("No project selected".to_string()));
            };
            if inner.phase != TurnPhase::Idle {
                return Err(ClientError::Validation(
                    "A reply is already in progress".to_string(),
                ));
            }

            inner.messages.push(Message {
                id: provisional_id,
                project_id,
                role: MessageRole::User,
                content: text.to_string(),
                created_at: Utc::now(),
                citation: None,
            });
            inner.phase = TurnPhase::PersistingQuestion;
            project_id
        };

        let persisted = self
            .state
            .db
            .insert_message(NewMessage {
                project_id,
                role: MessageRole::User,
                content: text.to_string(),
                citation: None,
            })
            .await;

        let user_message = match persisted {
            Ok(user_message) => user_message,
            Err(e) => {
                error!("Error saving message: {:?}", e);
                let mut inner = self.inner.lock().await;
                inner.messages.retain(|m| m.id != provisional_id);
                inner.phase = TurnPhase::Idle;
                drop(inner);
                self.state.notify_error("Failed to send message");
                return Err(e.into());
            }
        };

        {
            // Promote the provisional message in place, single lock hold.
            let mut inner = self.inner.lock().await;
            if let Some(slot) = inner.messages.iter_mut().find(|m| m.id == provisional_id) {
                *slot = user_message.clone();
            }
            inner.phase = TurnPhase::AwaitingAnswer;
        }

        let collection = format!("{}_{}", self.identity.id, project_id);
        let answer = match self
            .state
            .inference
            .answer(&collection, &user_message.content)
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                error!("Error getting AI response: {:?}", e);
                self.inner.lock().await.phase = TurnPhase::Idle;
                self.state.notify_error("Failed to get a response");
                return Err(e.into());
            }
        };

        let stored = self
            .state
            .db
            .insert_message(NewMessage {
                project_id,
                role: MessageRole::Assistant,
                content: answer.clone(),
                citation: None,
            })
            .await;

        let assistant_message = match stored {
            Ok(assistant_message) => assistant_message,
            Err(e) => {
                error!("Error saving AI response: {:?}", e);
                self.inner.lock().await.phase = TurnPhase::Idle;
                self.state.notify_error("Failed to save the response");
                return Err(e.into());
            }
        };

        info!("Starting reveal for message {}", assistant_message.id);
        let reveal_token = {
            let mut inner = self.inner.lock().await;
            // The log entry starts empty; the reveal worker fills it in.
            inner.messages.push(Message {
                content: String::new(),
                ..assistant_message.clone()
            });
            inner.phase = TurnPhase::Revealing;
            inner.reveal_token = CancellationToken::new();
            inner.reveal_token.clone()
        };

        tokio::spawn(reveal_process(
            self.inner.clone(),
            assistant_message.id,
            answer,
            self.state.config.reveal_interval,
            reveal_token,
        ));

        Ok(())
    }
}
