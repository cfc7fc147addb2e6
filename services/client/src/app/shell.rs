//! services/client/src/app/shell.rs
//!
//! The composition root. Builds the shared `AppState` from configuration,
//! gates the controller tree on session presence, and keeps the controllers
//! in sync with the current project selection.

use crate::adapters::{
    auth::{AccessToken, HttpSessionAdapter},
    db::SqlDataAdapter,
    embedding::HttpEmbeddingAdapter,
    inference::HttpInferenceAdapter,
    storage::HttpStorageAdapter,
};
use crate::app::conversation::ConversationController;
use crate::app::documents::DocumentController;
use crate::app::notify::{self, NoticeReceiver};
use crate::app::projects::ProjectStore;
use crate::app::state::AppState;
use crate::config::Config;
use crate::error::ClientError;
use docuchat_core::domain::{Identity, Project};
use futures::StreamExt;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The controller tree for one signed-in identity. It exists exactly while
/// that identity is present; signing out tears it down.
#[derive(Clone)]
pub struct Workspace {
    pub identity: Identity,
    pub projects: Arc<ProjectStore>,
    pub documents: Arc<DocumentController>,
    pub conversation: Arc<ConversationController>,
}

/// Composes the controllers over the shared state and reacts to
/// sign-in/sign-out changes from the session collaborator.
pub struct Shell {
    state: Arc<AppState>,
    active: Mutex<Option<Workspace>>,
}

impl Shell {
    /// Builds the full application from configuration: logging, the database
    /// pool and migrations, the HTTP collaborator adapters, and the shell
    /// itself. Returns the notice stream for the view layer to drain.
    pub async fn bootstrap(config: Config) -> Result<(Arc<Self>, NoticeReceiver), ClientError> {
        let config = Arc::new(config);
        let _ = tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(
                config.log_level.to_string(),
            ))
            .with(tracing_subscriber::fmt::layer())
            .try_init();
        info!("Configuration loaded. Starting client...");

        info!("Connecting to database...");
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&config.database_url)
            .await?;
        let db_adapter = Arc::new(SqlDataAdapter::new(db_pool));
        info!("Running database migrations...");
        db_adapter.run_migrations().await?;
        info!("Database migrations complete.");

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Internal(e.to_string()))?;

        let token = AccessToken::default();
        let session = Arc::new(HttpSessionAdapter::new(
            http.clone(),
            config.auth_url.clone(),
            token.clone(),
        ));
        let storage = Arc::new(HttpStorageAdapter::new(
            http.clone(),
            config.storage_url.clone(),
            config.storage_bucket.clone(),
            token,
        ));
        let inference = Arc::new(HttpInferenceAdapter::new(
            http.clone(),
            config.inference_url.clone(),
        ));
        let embedding = Arc::new(HttpEmbeddingAdapter::new(
            http,
            config.embedding_url.clone(),
        ));

        let (notices, notice_rx) = notify::channel();
        let state = AppState::new(
            db_adapter,
            storage,
            inference,
            embedding,
            session,
            config,
            notices,
        );

        Ok((Self::new(state), notice_rx))
    }

    /// Wraps an already-built `AppState`; used by tests with fake adapters.
    pub fn new(state: Arc<AppState>) -> Arc<Self> {
        Arc::new(Self {
            state,
            active: Mutex::new(None),
        })
    }

    /// The active workspace, if an identity is signed in.
    pub async fn workspace(&self) -> Option<Workspace> {
        self.active.lock().await.clone()
    }

    /// Builds the controller tree for an identity and loads its newest
    /// project into the document and conversation controllers.
    pub async fn activate(&self, identity: Identity) -> Result<Workspace, ClientError> {
        info!("Activating workspace for {}", identity.email);
        self.deactivate().await;

        let workspace = Workspace {
            identity: identity.clone(),
            projects: ProjectStore::new(self.state.clone(), identity.clone()),
            documents: DocumentController::new(self.state.clone(), identity.clone()),
            conversation: ConversationController::new(self.state.clone(), identity),
        };
        *self.active.lock().await = Some(workspace.clone());

        workspace.projects.refresh().await?;
        self.sync_current().await?;
        Ok(workspace)
    }

    /// Tears the controller tree down, cancelling any reveal in flight.
    pub async fn deactivate(&self) {
        if let Some(workspace) = self.active.lock().await.take() {
            workspace.conversation.cancel_reveal().await;
            info!("Workspace deactivated for {}", workspace.identity.email);
        }
    }

    /// Selects a project and points the document and conversation
    /// controllers at it.
    pub async fn open_project(&self, project: Project) -> Result<(), ClientError> {
        let Some(workspace) = self.workspace().await else {
            return Err(ClientError::Validation("Not signed in".to_string()));
        };
        workspace.projects.select(Some(project)).await;
        self.sync_current().await
    }

    /// Re-points the document and conversation controllers at whatever the
    /// project store currently selects (e.g. after a create or delete).
    pub async fn sync_current(&self) -> Result<(), ClientError> {
        let Some(workspace) = self.workspace().await else {
            return Ok(());
        };
        let current = workspace.projects.current().await;
        workspace
            .documents
            .load(current.as_ref().map(|p| p.id))
            .await?;
        match current {
            Some(project) => workspace.conversation.load(project.id).await?,
            None => workspace.conversation.reset().await,
        }
        Ok(())
    }

    /// Signs out at the session collaborator and tears the workspace down.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        self.state.session.sign_out().await?;
        self.deactivate().await;
        Ok(())
    }

    /// Follows the session collaborator's sign-in/sign-out notifications,
    /// activating and deactivating the workspace to match. Runs until the
    /// change stream ends.
    pub async fn run(self: Arc<Self>) {
        let mut changes = self.state.session.identity_changes();
        while let Some(change) = changes.next().await {
            match change {
                Some(identity) => {
                    if let Err(e) = self.activate(identity).await {
                        error!("Failed to activate workspace: {:?}", e);
                    }
                }
                None => self.deactivate().await,
            }
        }
    }
}
