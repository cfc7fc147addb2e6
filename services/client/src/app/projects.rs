//! services/client/src/app/projects.rs
//!
//! Process-wide project state for the signed-in identity: the project list,
//! the current selection, and the create/select/delete operations.

use crate::app::state::AppState;
use crate::error::ClientError;
use docuchat_core::domain::{Identity, Project};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;
use uuid::Uuid;

struct ProjectsState {
    projects: Vec<Project>,
    current: Option<Project>,
}

/// Holds the projects owned by one identity, newest first, with at most one
/// of them selected as the current working context.
pub struct ProjectStore {
    state: Arc<AppState>,
    identity: Identity,
    inner: Mutex<ProjectsState>,
}

impl ProjectStore {
    pub fn new(state: Arc<AppState>, identity: Identity) -> Arc<Self> {
        Arc::new(Self {
            state,
            identity,
            inner: Mutex::new(ProjectsState {
                projects: Vec::new(),
                current: None,
            }),
        })
    }

    /// Reloads the project list from the data collaborator. If nothing is
    /// selected yet, the newest project becomes current.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let projects = match self.state.db.list_projects(self.identity.id).await {
            Ok(projects) => projects,
            Err(e) => {
                error!("Error fetching projects: {:?}", e);
                self.state.notify_error("Failed to fetch projects");
                return Err(e.into());
            }
        };

        let mut inner = self.inner.lock().await;
        if inner.current.is_none() {
            inner.current = projects.first().cloned();
        }
        inner.projects = projects;
        Ok(())
    }

    pub async fn projects(&self) -> Vec<Project> {
        self.inner.lock().await.projects.clone()
    }

    pub async fn current(&self) -> Option<Project> {
        self.inner.lock().await.current.clone()
    }

    /// Selection is purely local and always succeeds.
    pub async fn select(&self, project: Option<Project>) {
        self.inner.lock().await.current = project;
    }

    /// Persists a new project, prepends it to the list, and selects it.
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Project, ClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::Validation(
                "Project name must not be empty".to_string(),
            ));
        }

        let description = description.map(str::trim).filter(|d| !d.is_empty());
        let project = match self
            .state
            .db
            .insert_project(self.identity.id, name, description)
            .await
        {
            Ok(project) => project,
            Err(e) => {
                error!("Error creating project: {:?}", e);
                self.state.notify_error("Failed to create project");
                return Err(e.into());
            }
        };

        let mut inner = self.inner.lock().await;
        inner.projects.insert(0, project.clone());
        inner.current = Some(project.clone());
        drop(inner);

        self.state.notify_info("Project created successfully");
        Ok(project)
    }

    /// Deletes a project. If it was current, the newest remaining project
    /// (or none) becomes current. Unknown ids leave the list untouched.
    pub async fn delete(&self, id: Uuid) -> Result<(), ClientError> {
        if let Err(e) = self.state.db.delete_project(id).await {
            error!("Error deleting project: {:?}", e);
            self.state.notify_error("Failed to delete project");
            return Err(e.into());
        }

        let mut inner = self.inner.lock().await;
        inner.projects.retain(|p| p.id != id);
        if inner.current.as_ref().is_some_and(|p| p.id == id) {
            inner.current = inner.projects.first().cloned();
        }
        drop(inner);

        self.state.notify_info("Project deleted successfully");
        Ok(())
    }
}
