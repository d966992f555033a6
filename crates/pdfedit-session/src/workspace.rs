//! Live editing state: tree, payloads and per-document edits

use crate::error::{Result, SessionError};
use crate::payload::PayloadStore;
use crate::tree::{Node, NodeId, Tree};
use pdfedit_core::{composite_set, get_page_count, AnnotationSet, ComposeConfig, PageRotations};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workspace {
    pub(crate) tree: Tree,
    pub(crate) payloads: PayloadStore,
    pub(crate) annotations: BTreeMap<NodeId, AnnotationSet>,
    pub(crate) rotations: BTreeMap<NodeId, PageRotations>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn payloads(&self) -> &PayloadStore {
        &self.payloads
    }

    /// The document node for `id`, or an error if it is missing or a folder
    pub fn document(&self, id: NodeId) -> Result<&Node> {
        let node = self.tree.get(id)?;
        if node.is_folder() {
            return Err(SessionError::NotADocument(id));
        }
        Ok(node)
    }

    pub fn page_count(&self, id: NodeId) -> Result<u32> {
        let node = self.document(id)?;
        node.page_count().ok_or(SessionError::NotADocument(id))
    }

    /// Stored bytes of a document, without its edits
    pub fn bytes(&self, id: NodeId) -> Result<Arc<[u8]>> {
        self.document(id)?;
        self.payloads.get(id).ok_or(SessionError::NotADocument(id))
    }

    pub fn annotations(&self, id: NodeId) -> Option<&AnnotationSet> {
        self.annotations.get(&id)
    }

    pub fn rotations(&self, id: NodeId) -> Option<&PageRotations> {
        self.rotations.get(&id)
    }

    pub(crate) fn annotations_mut(&mut self, id: NodeId) -> Result<&mut AnnotationSet> {
        self.document(id)?;
        Ok(self.annotations.entry(id).or_insert_with(|| {
            let mut set = AnnotationSet::new();
            set.assign_doc_id(id);
            set
        }))
    }

    pub(crate) fn rotations_mut(&mut self, id: NodeId) -> Result<&mut PageRotations> {
        self.document(id)?;
        Ok(self.rotations.entry(id).or_default())
    }

    /// Parse `bytes` and add them as a new document under `parent`
    pub(crate) fn upload(&mut self, parent: NodeId, name: &str, bytes: Vec<u8>) -> Result<NodeId> {
        let page_count = get_page_count(&bytes)?;
        let id = self.tree.add_document(parent, name, page_count)?;
        self.payloads.insert(id, bytes);
        debug!(id, page_count, "document uploaded");
        Ok(id)
    }

    /// Delete a node and drop everything attached to the documents under it
    pub(crate) fn delete(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        let removed = self.tree.remove(id)?;
        for node_id in &removed {
            self.payloads.remove(*node_id);
            self.annotations.remove(node_id);
            self.rotations.remove(node_id);
        }
        Ok(removed)
    }

    /// Document bytes with its edits and rotations baked in
    pub fn composed_bytes(&self, id: NodeId, config: &ComposeConfig) -> Result<Vec<u8>> {
        let source = self.bytes(id)?;
        let empty_set = AnnotationSet::new();
        let empty_rotations = PageRotations::new();
        let set = self.annotations.get(&id).unwrap_or(&empty_set);
        let rotations = self.rotations.get(&id).unwrap_or(&empty_rotations);
        Ok(composite_set(&source, set, rotations, config)?)
    }
}
