//! Reference-counted document bytes keyed by node id
//!
//! Cloning the store clones `Arc`s, so every history snapshot shares the
//! buffers with the live workspace. A document deleted from the tree keeps its
//! bytes alive for as long as some snapshot still holds them.

use crate::tree::NodeId;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadStore {
    payloads: BTreeMap<NodeId, Arc<[u8]>>,
}

impl PayloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: NodeId, bytes: impl Into<Arc<[u8]>>) {
        self.payloads.insert(id, bytes.into());
    }

    pub fn get(&self, id: NodeId) -> Option<Arc<[u8]>> {
        self.payloads.get(&id).cloned()
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Arc<[u8]>> {
        self.payloads.remove(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.payloads.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Sum of payload lengths, counting shared buffers once per entry
    pub fn total_bytes(&self) -> usize {
        self.payloads.values().map(|p| p.len()).sum()
    }

    /// True when both stores hold the very same buffer for `id`
    pub fn shares(&self, other: &PayloadStore, id: NodeId) -> bool {
        match (self.payloads.get(&id), other.payloads.get(&id)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
