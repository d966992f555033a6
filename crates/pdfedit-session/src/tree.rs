//! Folder/document tree stored as an id-indexed arena
//!
//! Nodes refer to each other only by [`NodeId`], so cloning the tree for a
//! history snapshot copies indices and names, never document bytes. Ids are
//! never reused: a node deleted and later restored by undo comes back under
//! the same id.

use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type NodeId = u64;

/// Id of the folder every other node descends from
pub const ROOT: NodeId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Folder,
    Document { page_count: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    children: Vec<NodeId>,
}

impl Node {
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn page_count(&self) -> Option<u32> {
        match self.kind {
            NodeKind::Document { page_count } => Some(page_count),
            NodeKind::Folder => None,
        }
    }

    /// Child ids in insertion order (empty for documents)
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    nodes: BTreeMap<NodeId, Node>,
    next_id: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        let root = Node {
            id: ROOT,
            name: String::new(),
            parent: None,
            kind: NodeKind::Folder,
            children: Vec::new(),
        };
        Self {
            nodes: BTreeMap::from([(ROOT, root)]),
            next_id: ROOT + 1,
        }
    }

    pub fn get(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(SessionError::NodeNotFound(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn children(&self, folder: NodeId) -> Result<&[NodeId]> {
        let node = self.get(folder)?;
        if !node.is_folder() {
            return Err(SessionError::NotAFolder(folder));
        }
        Ok(node.children())
    }

    /// Every document id, in id order
    pub fn documents(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| !n.is_folder())
    }

    /// Names from the root down to `id`, joined with '/'
    pub fn path(&self, id: NodeId) -> Result<String> {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.get(node_id)?;
            if node_id != ROOT {
                parts.push(node.name.as_str());
            }
            current = node.parent;
        }
        parts.reverse();
        Ok(format!("/{}", parts.join("/")))
    }

    pub fn create_folder(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        self.insert(parent, name, NodeKind::Folder)
    }

    pub fn add_document(&mut self, parent: NodeId, name: &str, page_count: u32) -> Result<NodeId> {
        self.insert(parent, name, NodeKind::Document { page_count })
    }

    fn insert(&mut self, parent: NodeId, name: &str, kind: NodeKind) -> Result<NodeId> {
        let name = validate_name(name)?;
        self.children(parent)?;

        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            Node {
                id,
                name,
                parent: Some(parent),
                kind,
                children: Vec::new(),
            },
        );
        self.folder_mut(parent)?.children.push(id);
        Ok(id)
    }

    pub fn rename(&mut self, id: NodeId, name: &str) -> Result<()> {
        if id == ROOT {
            return Err(SessionError::RootImmutable("renamed"));
        }
        let name = validate_name(name)?;
        let node = self.nodes.get_mut(&id).ok_or(SessionError::NodeNotFound(id))?;
        node.name = name;
        Ok(())
    }

    /// Re-parent `id` under `target`, appending it to the target's children
    pub fn move_node(&mut self, id: NodeId, target: NodeId) -> Result<()> {
        if id == ROOT {
            return Err(SessionError::RootImmutable("moved"));
        }
        self.get(id)?;
        self.children(target)?;
        if self.is_ancestor_or_self(id, target) {
            return Err(SessionError::InvalidMove { node: id, target });
        }

        let old_parent = self.get(id)?.parent;
        if let Some(old_parent) = old_parent {
            self.folder_mut(old_parent)?.children.retain(|&c| c != id);
        }
        self.folder_mut(target)?.children.push(id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(target);
        }
        Ok(())
    }

    /// Remove `id` and everything under it. Returns the removed ids, `id` first.
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        if id == ROOT {
            return Err(SessionError::RootImmutable("deleted"));
        }
        let parent = self.get(id)?.parent;
        let removed = self.subtree(id)?;

        if let Some(parent) = parent {
            self.folder_mut(parent)?.children.retain(|&c| c != id);
        }
        for node_id in &removed {
            self.nodes.remove(node_id);
        }
        Ok(removed)
    }

    /// `id` followed by all of its descendants, depth first
    pub fn subtree(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            let node = self.get(node_id)?;
            out.push(node_id);
            stack.extend(node.children.iter().rev());
        }
        Ok(out)
    }

    fn is_ancestor_or_self(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes.get(&node).and_then(|n| n.parent) {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    fn folder_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        let node = self.nodes.get_mut(&id).ok_or(SessionError::NodeNotFound(id))?;
        if !node.is_folder() {
            return Err(SessionError::NotAFolder(id));
        }
        Ok(node)
    }
}

fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.contains('/') {
        return Err(SessionError::InvalidName(name.to_string()));
    }
    Ok(trimmed.to_string())
}
