//! Linear, bounded undo/redo log
//!
//! `entries[..=cursor]` are states that undo can return to. An undo from the
//! tail first records the live state, so the entry after the cursor's target
//! is always the state a redo should bring back.

use crate::payload::PayloadStore;
use crate::tree::{NodeId, Tree};
use crate::workspace::Workspace;
use pdfedit_core::{AnnotationSet, PageRotations};
use std::collections::BTreeMap;
use tracing::debug;

/// Frozen copy of a workspace.
///
/// The tree and the edit maps are copied; the payload table only clones the
/// `Arc`s, so no document bytes are duplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceSnapshot {
    tree: Tree,
    payloads: PayloadStore,
    annotations: BTreeMap<NodeId, AnnotationSet>,
    rotations: BTreeMap<NodeId, PageRotations>,
}

impl WorkspaceSnapshot {
    pub fn capture(workspace: &Workspace) -> Self {
        Self {
            tree: workspace.tree.clone(),
            payloads: workspace.payloads.clone(),
            annotations: workspace.annotations.clone(),
            rotations: workspace.rotations.clone(),
        }
    }

    /// Rebuild a live workspace, re-attaching payloads to the tree copy
    pub fn restore(&self) -> Workspace {
        Workspace {
            tree: self.tree.clone(),
            payloads: self.payloads.clone(),
            annotations: self.annotations.clone(),
            rotations: self.rotations.clone(),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn payloads(&self) -> &PayloadStore {
        &self.payloads
    }
}

#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<WorkspaceSnapshot>,
    cursor: Option<usize>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            limit: limit.max(1),
        }
    }

    /// Record `workspace` as the state before the next mutation.
    ///
    /// Drops any redo entries, then evicts the oldest entries past the limit.
    pub fn capture(&mut self, workspace: &Workspace) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.entries.truncate(keep);
        self.entries.push(WorkspaceSnapshot::capture(workspace));

        let overflow = self.entries.len().saturating_sub(self.limit);
        if overflow > 0 {
            self.entries.drain(..overflow);
            debug!(evicted = overflow, "history limit reached");
        }
        self.cursor = Some(self.entries.len() - 1);
    }

    /// Step back one state. Returns false when there is nothing to undo.
    pub fn undo(&mut self, workspace: &mut Workspace) -> bool {
        let Some(cursor) = self.cursor else {
            return false;
        };
        if cursor + 1 == self.entries.len() {
            self.entries.push(WorkspaceSnapshot::capture(workspace));
        }
        *workspace = self.entries[cursor].restore();
        self.cursor = cursor.checked_sub(1);
        debug!(cursor = ?self.cursor, entries = self.entries.len(), "undo");
        true
    }

    /// Re-apply the state an undo stepped away from. Returns false when there is none.
    pub fn redo(&mut self, workspace: &mut Workspace) -> bool {
        let target = self.cursor.map_or(1, |c| c + 2);
        let Some(snapshot) = self.entries.get(target) else {
            return false;
        };
        *workspace = snapshot.restore();
        self.cursor = Some(target - 1);
        debug!(cursor = ?self.cursor, entries = self.entries.len(), "redo");
        true
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(1, |c| c + 2) < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn entries(&self) -> &[WorkspaceSnapshot] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }
}
