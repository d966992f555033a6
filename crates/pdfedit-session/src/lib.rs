//! Stateful editing layer on top of `pdfedit-core`
//!
//! - `tree` / `payload` / `workspace`: folders and documents, their bytes and their edits
//! - `history`: bounded undo/redo over whole-workspace snapshots
//! - `guard`: at most one composite in flight per document
//! - `session`: the mutation API, capturing history once per action

pub mod config;
pub mod error;
pub mod guard;
pub mod history;
pub mod payload;
pub mod session;
pub mod tree;
pub mod workspace;

pub use config::SessionConfig;
pub use error::{Result, SessionError};
pub use guard::{ComposeJob, Composed, CompositeGuard};
pub use history::{History, WorkspaceSnapshot};
pub use payload::PayloadStore;
pub use session::EditSession;
pub use tree::{Node, NodeId, NodeKind, Tree, ROOT};
pub use workspace::Workspace;
