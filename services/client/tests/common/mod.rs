//! Shared fakes and wiring for the controller tests. All collaborators are
//! in-process: no network, no database.

#![allow(dead_code)]

use async_trait::async_trait;
use client_lib::adapters::memory::InMemoryData;
use client_lib::app::notify::{self, NoticeReceiver, Notice};
use client_lib::app::AppState;
use client_lib::config::Config;
use docuchat_core::domain::{Document, Identity};
use docuchat_core::ports::{
    DataService, EmbeddingService, IdentityStream, InferenceService, NewDocument, NewMessage,
    ObjectStorageService, PortError, PortResult, SessionService,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::watch;
use tracing::Level;
use uuid::Uuid;

pub fn identity() -> Identity {
    Identity {
        id: Uuid::new_v4(),
        email: "user@example.com".to_string(),
    }
}

pub fn test_config(simulate_processing: bool) -> Config {
    Config {
        database_url: String::new(),
        log_level: Level::INFO,
        auth_url: "http://localhost:9999".to_string(),
        storage_url: "http://localhost:9000/storage/v1".to_string(),
        storage_bucket: "documents".to_string(),
        inference_url: "http://localhost:8000/chat".to_string(),
        embedding_url: "http://localhost:8000/embed".to_string(),
        request_timeout: Duration::from_secs(5),
        reveal_interval: Duration::from_millis(1),
        simulate_processing,
        processing_delay: Duration::from_millis(20),
    }
}

/// Data collaborator with switchable insert failures, delegating everything
/// else to the in-memory store.
#[derive(Default)]
pub struct FlakyData {
    pub inner: InMemoryData,
    pub fail_insert_document: AtomicBool,
    pub fail_insert_message: AtomicBool,
}

#[async_trait]
impl DataService for FlakyData {
    async fn list_projects(
        &self,
        owner: Uuid,
    ) -> PortResult<Vec<docuchat_core::domain::Project>> {
        self.inner.list_projects(owner).await
    }

    async fn insert_project(
        &self,
        owner: Uuid,
        name: &str,
        description: Option<&str>,
    ) -> PortResult<docuchat_core::domain::Project> {
        self.inner.insert_project(owner, name, description).await
    }

    async fn delete_project(&self, id: Uuid) -> PortResult<()> {
        self.inner.delete_project(id).await
    }

    async fn list_documents(&self, project_id: Uuid) -> PortResult<Vec<Document>> {
        self.inner.list_documents(project_id).await
    }

    async fn insert_document(&self, document: NewDocument) -> PortResult<Document> {
        if self.fail_insert_document.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("insert rejected".to_string()));
        }
        self.inner.insert_document(document).await
    }

    async fn update_document_status(
        &self,
        id: Uuid,
        status: docuchat_core::domain::DocumentStatus,
    ) -> PortResult<()> {
        self.inner.update_document_status(id, status).await
    }

    async fn delete_document(&self, id: Uuid) -> PortResult<()> {
        self.inner.delete_document(id).await
    }

    async fn list_messages(
        &self,
        project_id: Uuid,
    ) -> PortResult<Vec<docuchat_core::domain::Message>> {
        self.inner.list_messages(project_id).await
    }

    async fn insert_message(
        &self,
        message: NewMessage,
    ) -> PortResult<docuchat_core::domain::Message> {
        if self.fail_insert_message.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("insert rejected".to_string()));
        }
        self.inner.insert_message(message).await
    }
}

/// Storage collaborator that records uploads and removals and can be told to
/// reject paths containing a marker.
#[derive(Default)]
pub struct FakeStorage {
    pub puts: RwLock<Vec<String>>,
    pub removed: RwLock<Vec<String>>,
    pub reject_containing: Option<String>,
}

#[async_trait]
impl ObjectStorageService for FakeStorage {
    async fn put(&self, path: &str, _bytes: &[u8]) -> PortResult<String> {
        if let Some(marker) = &self.reject_containing {
            if path.contains(marker) {
                return Err(PortError::Unexpected("storage rejected upload".to_string()));
            }
        }
        self.puts.write().unwrap().push(path.to_string());
        Ok(path.to_string())
    }

    async fn remove(&self, paths: &[String]) -> PortResult<()> {
        self.removed.write().unwrap().extend(paths.iter().cloned());
        Ok(())
    }
}

/// Inference collaborator returning a canned answer, recording each call.
pub struct FakeInference {
    pub answer: String,
    pub fail: AtomicBool,
    pub calls: RwLock<Vec<(String, String)>>,
}

impl FakeInference {
    pub fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            fail: AtomicBool::new(false),
            calls: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl InferenceService for FakeInference {
    async fn answer(&self, collection: &str, message: &str) -> PortResult<String> {
        self.calls
            .write()
            .unwrap()
            .push((collection.to_string(), message.to_string()));
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected(
                "Inference endpoint reported failure".to_string(),
            ));
        }
        Ok(self.answer.clone())
    }
}

/// Embedding collaborator that only counts invocations.
#[derive(Default)]
pub struct FakeEmbedding {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

#[async_trait]
impl EmbeddingService for FakeEmbedding {
    async fn embed_documents(
        &self,
        _project_id: Uuid,
        _user_id: Uuid,
        _documents: &[Document],
    ) -> PortResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("embedding failed".to_string()));
        }
        Ok(())
    }
}

/// Session collaborator driven directly by the tests.
pub struct FakeSession {
    changes: watch::Sender<Option<Identity>>,
}

impl FakeSession {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(None);
        Self { changes }
    }

    pub fn sign_in(&self, identity: Identity) {
        let _ = self.changes.send(Some(identity));
    }
}

#[async_trait]
impl SessionService for FakeSession {
    async fn current_identity(&self) -> PortResult<Option<Identity>> {
        Ok(self.changes.borrow().clone())
    }

    async fn sign_out(&self) -> PortResult<()> {
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

/// Everything a controller test needs, wired over fakes.
pub struct Harness {
    pub state: Arc<AppState>,
    pub db: Arc<FlakyData>,
    pub storage: Arc<FakeStorage>,
    pub inference: Arc<FakeInference>,
    pub embedding: Arc<FakeEmbedding>,
    pub session: Arc<FakeSession>,
    pub notices: NoticeReceiver,
}

pub fn harness(config: Config) -> Harness {
    let db = Arc::new(FlakyData::default());
    let storage = Arc::new(FakeStorage::default());
    let inference = Arc::new(FakeInference::new(
        "notes.pdf covers the quarterly research summary.",
    ));
    let embedding = Arc::new(FakeEmbedding::default());
    let session = Arc::new(FakeSession::new());
    let (notices_tx, notices) = notify::channel();
    let state = AppState::new(
        db.clone(),
        storage.clone(),
        inference.clone(),
        embedding.clone(),
        session.clone(),
        Arc::new(config),
        notices_tx,
    );
    Harness {
        state,
        db,
        storage,
        inference,
        embedding,
        session,
        notices,
    }
}

pub fn harness_with_inference(config: Config, answer: &str) -> Harness {
    let db = Arc::new(FlakyData::default());
    let storage = Arc::new(FakeStorage::default());
    let inference = Arc::new(FakeInference::new(answer));
    let embedding = Arc::new(FakeEmbedding::default());
    let session = Arc::new(FakeSession::new());
    let (notices_tx, notices) = notify::channel();
    let state = AppState::new(
        db.clone(),
        storage.clone(),
        inference.clone(),
        embedding.clone(),
        session.clone(),
        Arc::new(config),
        notices_tx,
    );
    Harness {
        state,
        db,
        storage,
        inference,
        embedding,
        session,
        notices,
    }
}

pub fn harness_with_storage(config: Config, storage: FakeStorage) -> Harness {
    let db = Arc::new(FlakyData::default());
    let storage = Arc::new(storage);
    let inference = Arc::new(FakeInference::new("answer"));
    let embedding = Arc::new(FakeEmbedding::default());
    let session = Arc::new(FakeSession::new());
    let (notices_tx, notices) = notify::channel();
    let state = AppState::new(
        db.clone(),
        storage.clone(),
        inference.clone(),
        embedding.clone(),
        session.clone(),
        Arc::new(config),
        notices_tx,
    );
    Harness {
        state,
        db,
        storage,
        inference,
        embedding,
        session,
        notices,
    }
}

/// Drains every notice currently queued.
pub fn drain_notices(rx: &mut NoticeReceiver) -> Vec<Notice> {
    let mut notices = Vec::new();
    while let Ok(notice) = rx.try_recv() {
        notices.push(notice);
    }
    notices
}
