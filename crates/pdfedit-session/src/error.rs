use crate::tree::NodeId;
use pdfedit_core::{EntityId, PdfEditError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No node with id {0}")]
    NodeNotFound(NodeId),

    #[error("Node {0} is not a document")]
    NotADocument(NodeId),

    #[error("Node {0} is not a folder")]
    NotAFolder(NodeId),

    #[error("Invalid name: {0:?}")]
    InvalidName(String),

    #[error("Cannot move node {node} into {target}")]
    InvalidMove { node: NodeId, target: NodeId },

    #[error("The root folder cannot be {0}")]
    RootImmutable(&'static str),

    #[error("Document {doc} has no entity {id}")]
    EntityNotFound { doc: NodeId, id: EntityId },

    #[error("Page {page} does not exist (document {doc} has {page_count} pages)")]
    PageOutOfRange {
        doc: NodeId,
        page: u32,
        page_count: u32,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Engine(#[from] PdfEditError),

    #[error("Compose task failed: {0}")]
    ComposeTaskFailed(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
