//! Integration tests for the conversation controller, the reveal worker, and
//! the shell's session gating, run entirely against in-process fakes.

mod common;

use bytes::Bytes;
use client_lib::app::conversation::ConversationController;
use client_lib::app::documents::{DocumentController, FileUpload};
use client_lib::app::notify::Notice;
use client_lib::app::projects::ProjectStore;
use client_lib::app::Shell;
use client_lib::error::ClientError;
use common::{drain_notices, harness, harness_with_inference, identity, test_config};
use docuchat_core::domain::{DocumentStatus, MessageRole};
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::test]
async fn empty_log_gets_a_greeting_that_is_never_persisted() {
    let h = harness(test_config(false));
    let me = identity();
    let store = ProjectStore::new(h.state.clone(), me.clone());
    let conversation = ConversationController::new(h.state.clone(), me);
    let project = store.create("Research", None).await.unwrap();

    conversation.load(project.id).await.unwrap();

    let messages = conversation.messages().await;
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, MessageRole::Assistant);
    assert!(messages[0].content.contains("Upload some files"));
    assert_eq!(h.db.inner.message_count(), 0);
}

#[tokio::test]
async fn blank_send_is_a_no_op() {
    let h = harness(test_config(false));
    let me = identity();
    let store = ProjectStore::new(h.state.clone(), me.clone());
    let conversation = ConversationController::new(h.state.clone(), me);
    let project = store.create("Research", None).await.unwrap();
    conversation.load(project.id).await.unwrap();

    let result = conversation.send("   \n ").await;
    assert!(matches!(result, Err(ClientError::Validation(_))));
    assert_eq!(conversation.messages().await.len(), 1);
    assert!(!conversation.is_responding().await);
    assert_eq!(h.db.inner.message_count(), 0);
}

#[tokio::test]
async fn send_without_a_bound_project_is_rejected() {
    let h = harness(test_config(false));
    let conversation = ConversationController::new(h.state.clone(), identity());

    let result = conversation.send("hello").await;
    assert!(matches!(result, Err(ClientError::Validation(_))));
    assert!(!conversation.is_responding().await);
}

#[tokio::test]
async fn full_turn_end_to_end() {
    let h = harness(test_config(true));
    let me = identity();
    let store = ProjectStore::new(h.state.clone(), me.clone());
    let documents = DocumentController::new(h.state.clone(), me.clone());
    let conversation = ConversationController::new(h.state.clone(), me.clone());

    let project = store.create("Research", None).await.unwrap();
    documents.load(Some(project.id)).await.unwrap();
    conversation.load(project.id).await.unwrap();

    documents
        .add_files(vec![FileUpload {
            name: "notes.pdf".to_string(),
            media_type: "application/pdf".to_string(),
            bytes: Bytes::from_static(b"%PDF-1.4 notes"),
        }])
        .await
        .unwrap();

    for _ in 0..200 {
        let listed = documents.documents().await;
        if listed.len() == 1 && listed[0].status == DocumentStatus::Ready {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(
        documents.documents().await[0].status,
        DocumentStatus::Ready
    );

    conversation.send("What is in notes.pdf?").await.unwrap();

    for _ in 0..400 {
        if !conversation.is_responding().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(!conversation.is_responding().await);

    let messages = conversation.messages().await;
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].role, MessageRole::User);
    assert_eq!(messages[1].content, "What is in notes.pdf?");
    assert_eq!(messages[2].role, MessageRole::Assistant);
    // The reveal must reproduce the collaborator's text character for
    // character.
    assert_eq!(messages[2].content, h.inference.answer);

    // One persisted user message and one persisted assistant message.
    assert_eq!(h.db.inner.message_count(), 2);

    let calls = h.inference.calls.read().unwrap().clone();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, format!("{}_{}", me.id, project.id));
}

#[tokio::test]
async fn user_persist_failure_aborts_the_turn() {
    let mut h = harness(test_config(false));
    let me = identity();
    let store = ProjectStore::new(h.state.clone(), me.clone());
    let conversation = ConversationController::new(h.state.clone(), me);
    let project = store.create("Research", None).await.unwrap();
    conversation.load(project.id).await.unwrap();

    h.db.fail_insert_message.store(true, Ordering::SeqCst);
    let result = conversation.send("hello").await;

    assert!(result.is_err());
    assert!(!conversation.is_responding().await);
    // The provisional user message was removed; the greeting is all that's
    // left, and inference was never consulted.
    assert_eq!(conversation.messages().await.len(), 1);
    assert!(h.inference.calls.read().unwrap().is_empty());
    let notices = drain_notices(&mut h.notices);
    assert!(notices
        .iter()
        .any(|n| matches!(n, Notice::Error { .. })));
}

#[tokio::test]
async fn inference_failure_keeps_the_user_message_and_no_assistant_message() {
    let h = harness(test_config(false));
    let me = identity();
    let store = ProjectStore::new(h.state.clone(), me.clone());
    let conversation = ConversationController::new(h.state.clone(), me);
    let project = store.create("Research", None).await.unwrap();
    conversation.load(project.id).await.unwrap();

    h.inference.fail.store(true, Ordering::SeqCst);
    let result = conversation.send("hello").await;

    assert!(result.is_err());
    assert!(!conversation.is_responding().await);
    let messages = conversation.messages().await;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, MessageRole::User);
    // The user message was persisted before inference was attempted.
    assert_eq!(h.db.inner.message_count(), 1);
}

#[tokio::test]
async fn reveal_is_monotonic_and_reproduces_the_text_exactly() {
    let h = harness_with_inference(
        test_config(false),
        "The summary spans several sentences so the reveal takes a while.",
    );
    let me = identity();
    let store = ProjectStore::new(h.state.clone(), me.clone());
    let conversation = ConversationController::new(h.state.clone(), me);
    let project = store.create("Research", None).await.unwrap();
    conversation.load(project.id).await.unwrap();

    conversation.send("summarize").await.unwrap();

    let full = h.inference.answer.clone();
    let mut last_len = 0usize;
    for _ in 0..1000 {
        let messages = conversation.messages().await;
        if messages.len() == 3 {
            let shown = &messages[2].content;
            // Every observation is a prefix, and it never shrinks.
            assert!(full.starts_with(shown.as_str()));
            assert!(shown.len() >= last_len);
            last_len = shown.len();
            if shown == &full && !conversation.is_responding().await {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let messages = conversation.messages().await;
    assert_eq!(messages[2].content, full);
    assert!(!conversation.is_responding().await);
}

#[tokio::test]
async fn cancelling_a_reveal_finalizes_the_message() {
    let mut config = test_config(false);
    config.reveal_interval = Duration::from_millis(10);
    let h = harness_with_inference(config, &"long answer ".repeat(50));
    let me = identity();
    let store = ProjectStore::new(h.state.clone(), me.clone());
    let conversation = ConversationController::new(h.state.clone(), me);
    let project = store.create("Research", None).await.unwrap();
    conversation.load(project.id).await.unwrap();

    conversation.send("go").await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(conversation.is_responding().await);

    conversation.cancel_reveal().await;

    for _ in 0..100 {
        if !conversation.is_responding().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let messages = conversation.messages().await;
    assert_eq!(messages[2].content, h.inference.answer);
    assert!(!conversation.is_responding().await);
}

#[tokio::test]
async fn send_is_rejected_while_a_reply_is_in_flight() {
    let mut config = test_config(false);
    config.reveal_interval = Duration::from_millis(10);
    let h = harness_with_inference(config, &"slow reveal ".repeat(30));
    let me = identity();
    let store = ProjectStore::new(h.state.clone(), me.clone());
    let conversation = ConversationController::new(h.state.clone(), me);
    let project = store.create("Research", None).await.unwrap();
    conversation.load(project.id).await.unwrap();

    conversation.send("first").await.unwrap();
    assert!(conversation.is_responding().await);

    let result = conversation.send("second").await;
    assert!(matches!(result, Err(ClientError::Validation(_))));

    conversation.cancel_reveal().await;
}

#[tokio::test]
async fn reloading_the_log_reads_back_persisted_messages_without_a_greeting() {
    let h = harness(test_config(false));
    let me = identity();
    let store = ProjectStore::new(h.state.clone(), me.clone());
    let conversation = ConversationController::new(h.state.clone(), me);
    let project = store.create("Research", None).await.unwrap();
    conversation.load(project.id).await.unwrap();

    conversation.send("hello").await.unwrap();
    for _ in 0..400 {
        if !conversation.is_responding().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    conversation.load(project.id).await.unwrap();
    let messages = conversation.messages().await;
    // The greeting was never persisted; only the real turn comes back.
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, MessageRole::User);
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[1].content, h.inference.answer);
}

#[tokio::test]
async fn shell_follows_session_changes() {
    let h = harness(test_config(false));
    let shell = Shell::new(h.state.clone());
    assert!(shell.workspace().await.is_none());

    tokio::spawn(shell.clone().run());

    let me = identity();
    h.session.sign_in(me.clone());
    for _ in 0..100 {
        if shell.workspace().await.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let workspace = shell.workspace().await.expect("workspace after sign-in");
    assert_eq!(workspace.identity.id, me.id);

    h.state.session.sign_out().await.unwrap();
    for _ in 0..100 {
        if shell.workspace().await.is_none() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(shell.workspace().await.is_none());
}

#[tokio::test]
async fn open_project_rebinds_the_conversation() {
    let h = harness(test_config(false));
    let shell = Shell::new(h.state.clone());
    let workspace = shell.activate(identity()).await.unwrap();

    let first = workspace.projects.create("Alpha", None).await.unwrap();
    let second = workspace.projects.create("Beta", None).await.unwrap();
    assert_ne!(first.id, second.id);
    shell.sync_current().await.unwrap();

    shell.open_project(first.clone()).await.unwrap();
    assert_eq!(workspace.projects.current().await.unwrap().id, first.id);

    workspace.conversation.send("hi").await.unwrap();
    for _ in 0..400 {
        if !workspace.conversation.is_responding().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let calls = h.inference.calls.read().unwrap().clone();
    assert_eq!(calls[0].0, format!("{}_{}", workspace.identity.id, first.id));
}

#[tokio::test]
async fn shell_keeps_controllers_pointed_at_the_current_project() {
    let h = harness(test_config(false));
    let shell = Shell::new(h.state.clone());
    let workspace = shell.activate(identity()).await.unwrap();

    let project = workspace.projects.create("Research", None).await.unwrap();
    shell.sync_current().await.unwrap();

    // The conversation controller is now bound: a send reaches inference.
    workspace.conversation.send("hello").await.unwrap();
    for _ in 0..400 {
        if !workspace.conversation.is_responding().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    let calls = h.inference.calls.read().unwrap().clone();
    assert_eq!(calls[0].0, format!("{}_{}", workspace.identity.id, project.id));

    // Deleting the only project unbinds everything again.
    workspace.projects.delete(project.id).await.unwrap();
    shell.sync_current().await.unwrap();
    assert!(workspace.conversation.messages().await.is_empty());
    assert!(matches!(
        workspace.conversation.send("hello").await,
        Err(ClientError::Validation(_))
    ));
}
