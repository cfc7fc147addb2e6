//! services/client/src/app/reveal_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! the character-by-character reveal of an assistant answer.

use crate::app::conversation::{ConversationState, TurnPhase};
use docuchat_core::domain::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

/// The main asynchronous task for revealing an already-received answer.
///
/// The full text is known before the task starts; each tick writes one more
/// character of it into the message, located **by id** so the reveal survives
/// view re-renders and log reshuffles. The task is gracefully cancelled via a
/// `CancellationToken`; cancellation finalizes the message to the complete
/// text, so observers never see lost or duplicated characters.
pub async fn reveal_process(
    conversation: Arc<Mutex<ConversationState>>,
    message_id: Uuid,
    full_text: String,
    tick: Duration,
    cancellation_token: CancellationToken,
) {
    let chars: Vec<char> = full_text.chars().collect();
    if chars.is_empty() {
        let mut state = conversation.lock().await;
        if state.phase == TurnPhase::Revealing {
            state.phase = TurnPhase::Idle;
        }
        return;
    }

    let mut interval = tokio::time::interval(tick);
    let mut shown = 0usize;

    loop {
        interval.tick().await;

        if cancellation_token.is_cancelled() {
            info!("Reveal cancelled for message {}", message_id);
            let mut state = conversation.lock().await;
            if let Some(message) = find_message(&mut state.messages, message_id) {
                message.content = full_text.clone();
            }
            if state.phase == TurnPhase::Revealing {
                state.phase = TurnPhase::Idle;
            }
            return;
        }

        shown += 1;
        let mut state = conversation.lock().await;
        match find_message(&mut state.messages, message_id) {
            Some(message) => {
                // Rebuilding the prefix each tick keeps the write idempotent:
                // the shown content is always exactly the first `shown` chars.
                message.content = chars[..shown].iter().collect();
            }
            // The log was replaced underneath us (project switch); stop.
            None => {
                if state.phase == TurnPhase::Revealing {
                    state.phase = TurnPhase::Idle;
                }
                return;
            }
        }

        if shown == chars.len() {
            state.phase = TurnPhase::Idle;
            info!("Reveal finished for message {}", message_id);
            return;
        }
    }
}

fn find_message(messages: &mut [Message], id: Uuid) -> Option<&mut Message> {
    messages.iter_mut().find(|m| m.id == id)
}
