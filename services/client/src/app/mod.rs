pub mod conversation;
pub mod documents;
pub mod notify;
pub mod projects;
pub mod shell;
pub mod state;

mod reveal_task;
mod upload_task;

// Re-export the composition root and shared state to make them easily
// accessible to the view layer that links this library.
pub use shell::{Shell, Workspace};
pub use state::AppState;
