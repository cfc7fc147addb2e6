pub mod domain;
pub mod ports;

pub use domain::{Citation, Document, DocumentStatus, Identity, Message, MessageRole, Project};
pub use ports::{
    DataService, EmbeddingService, IdentityStream, InferenceService, NewDocument, NewMessage,
    ObjectStorageService, PortError, PortResult, SessionService,
};
