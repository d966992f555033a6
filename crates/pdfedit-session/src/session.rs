//! Edit session: every user-visible mutation goes through here
//!
//! Each mutating action runs against a staged copy of the workspace. Only
//! when it succeeds is the previous state captured into history and the copy
//! committed, so exactly one history entry exists per applied action and a
//! failed action leaves both the workspace and the redo log untouched.

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::guard::{ComposeJob, Composed, CompositeGuard};
use crate::history::History;
use crate::tree::{NodeId, Tree};
use crate::workspace::Workspace;
use pdfedit_core::{
    merge_into, page_geometries, project_page, split_by_page, AnnotationSet, EntityId, ImageAnnotation,
    OverlayItem, PageRotations, TextAnnotation, TextPatch,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub struct EditSession {
    workspace: Workspace,
    history: History,
    config: SessionConfig,
    guard: Arc<CompositeGuard>,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl EditSession {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            workspace: Workspace::new(),
            history: History::new(config.history_limit),
            config,
            guard: Arc::new(CompositeGuard::new()),
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn tree(&self) -> &Tree {
        &self.workspace.tree
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Apply `action` to a staged copy and commit it with one history entry
    fn mutate<T>(
        &mut self,
        action: &'static str,
        f: impl FnOnce(&mut Workspace, &SessionConfig) -> Result<T>,
    ) -> Result<T> {
        let mut staged = self.workspace.clone();
        let out = f(&mut staged, &self.config)?;
        self.history.capture(&self.workspace);
        self.workspace = staged;
        debug!(action, history = self.history.len(), "committed");
        Ok(out)
    }

    // ============ History ============

    pub fn undo(&mut self) -> bool {
        self.history.undo(&mut self.workspace)
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo(&mut self.workspace)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ============ Tree ============

    /// Add a document. Fails without touching history if the bytes do not parse.
    pub fn upload(&mut self, parent: NodeId, name: &str, bytes: Vec<u8>) -> Result<NodeId> {
        self.mutate("upload", |ws, _| ws.upload(parent, name, bytes))
    }

    pub fn create_folder(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        self.mutate("create_folder", |ws, _| ws.tree.create_folder(parent, name))
    }

    pub fn rename(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.mutate("rename", |ws, _| ws.tree.rename(id, name))
    }

    pub fn move_node(&mut self, id: NodeId, target: NodeId) -> Result<()> {
        self.mutate("move", |ws, _| ws.tree.move_node(id, target))
    }

    /// Delete a node (folders recursively). Returns the removed ids.
    pub fn delete(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        let removed = self.mutate("delete", |ws, _| ws.delete(id))?;
        for node_id in &removed {
            self.guard.forget(*node_id);
        }
        Ok(removed)
    }

    /// Composite each input with its edits, then merge them into a new document
    #[instrument(skip(self, ids))]
    pub fn merge(&mut self, ids: &[NodeId], parent: NodeId, name: &str) -> Result<NodeId> {
        self.mutate("merge", |ws, config| {
            let inputs = ids
                .iter()
                .map(|&id| ws.composed_bytes(id, &config.compose))
                .collect::<Result<Vec<_>>>()?;
            let merged = merge_into(inputs.as_slice())?;
            let id = ws.upload(parent, name, merged)?;
            info!(inputs = ids.len(), id, "documents merged");
            Ok(id)
        })
    }

    /// Composite `id` with its edits and split it into one document per page,
    /// placed in a new folder next to the original.
    ///
    /// Returns the folder id and the page document ids in page order.
    #[instrument(skip(self))]
    pub fn split(&mut self, id: NodeId) -> Result<(NodeId, Vec<NodeId>)> {
        self.mutate("split", |ws, config| {
            let node = ws.document(id)?;
            let stem = file_stem(&node.name).to_string();
            let parent = node.parent.unwrap_or(crate::tree::ROOT);

            let composed = ws.composed_bytes(id, &config.compose)?;
            let pages = split_by_page(&composed)?;

            let folder = ws.tree.create_folder(parent, &format!("{stem} (split)"))?;
            let mut docs = Vec::with_capacity(pages.len());
            for (i, bytes) in pages.into_iter().enumerate() {
                docs.push(ws.upload(folder, &format!("{stem}-page-{}.pdf", i + 1), bytes)?);
            }
            info!(pages = docs.len(), folder, "document split");
            Ok((folder, docs))
        })
    }

    // ============ Page rotation ============

    /// Add `delta` degrees (clockwise) to a page's display rotation
    pub fn rotate_page(&mut self, doc: NodeId, page: u32, delta: i64) -> Result<()> {
        self.mutate("rotate", |ws, _| {
            check_page(ws, doc, page)?;
            ws.rotations_mut(doc)?.rotate(page, delta);
            Ok(())
        })
    }

    // ============ Annotations ============

    pub fn add_annotation(&mut self, doc: NodeId, annotation: TextAnnotation) -> Result<EntityId> {
        self.mutate("add_annotation", |ws, _| {
            check_page(ws, doc, annotation.page)?;
            Ok(ws.annotations_mut(doc)?.add_annotation(annotation))
        })
    }

    pub fn update_annotation(
        &mut self,
        doc: NodeId,
        id: EntityId,
        f: impl FnOnce(&mut TextAnnotation),
    ) -> Result<()> {
        self.mutate("update_annotation", |ws, _| {
            found(ws.annotations_mut(doc)?.update_annotation(id, f), doc, id)
        })
    }

    pub fn remove_annotation(&mut self, doc: NodeId, id: EntityId) -> Result<()> {
        self.mutate("remove_annotation", |ws, _| {
            found(ws.annotations_mut(doc)?.remove_annotation(id), doc, id)
        })
    }

    pub fn add_patch(&mut self, doc: NodeId, mut patch: TextPatch) -> Result<EntityId> {
        patch.doc_id = doc;
        self.mutate("add_patch", |ws, _| {
            check_page(ws, doc, patch.page)?;
            Ok(ws.annotations_mut(doc)?.add_patch(patch))
        })
    }

    /// Edit a patch; its page and bbox stay as detected
    pub fn update_patch(
        &mut self,
        doc: NodeId,
        id: EntityId,
        f: impl FnOnce(&mut TextPatch),
    ) -> Result<()> {
        self.mutate("update_patch", |ws, _| {
            found(ws.annotations_mut(doc)?.update_patch(id, f), doc, id)
        })
    }

    pub fn remove_patch(&mut self, doc: NodeId, id: EntityId) -> Result<()> {
        self.mutate("remove_patch", |ws, _| {
            found(ws.annotations_mut(doc)?.remove_patch(id), doc, id)
        })
    }

    pub fn add_image(&mut self, doc: NodeId, image: ImageAnnotation) -> Result<EntityId> {
        self.mutate("add_image", |ws, _| {
            check_page(ws, doc, image.page)?;
            Ok(ws.annotations_mut(doc)?.add_image(image))
        })
    }

    pub fn update_image(
        &mut self,
        doc: NodeId,
        id: EntityId,
        f: impl FnOnce(&mut ImageAnnotation),
    ) -> Result<()> {
        self.mutate("update_image", |ws, _| {
            found(ws.annotations_mut(doc)?.update_image(id, f), doc, id)
        })
    }

    pub fn remove_image(&mut self, doc: NodeId, id: EntityId) -> Result<()> {
        self.mutate("remove_image", |ws, _| {
            found(ws.annotations_mut(doc)?.remove_image(id), doc, id)
        })
    }

    /// Replace a document's edits with ones imported from JSON
    pub fn import_annotations(&mut self, doc: NodeId, json: &str) -> Result<()> {
        let mut set = AnnotationSet::from_json(json)?;
        set.assign_doc_id(doc);
        self.mutate("import_annotations", |ws, _| {
            *ws.annotations_mut(doc)? = set;
            Ok(())
        })
    }

    pub fn export_annotations(&self, doc: NodeId) -> Result<String> {
        self.workspace.document(doc)?;
        let json = match self.workspace.annotations(doc) {
            Some(set) => set.to_json()?,
            None => AnnotationSet::new().to_json()?,
        };
        Ok(json)
    }

    /// Leaving edit mode drops empty annotations and reverted patches.
    ///
    /// Only records history when something was actually removed.
    pub fn exit_edit_mode(&mut self, doc: NodeId) -> Result<usize> {
        self.workspace.document(doc)?;
        let mut pruned = match self.workspace.annotations(doc) {
            Some(set) => set.clone(),
            None => return Ok(0),
        };
        let removed = pruned.prune_after_edit();
        if removed > 0 {
            self.mutate("exit_edit_mode", |ws, _| {
                *ws.annotations_mut(doc)? = pruned;
                Ok(())
            })?;
        }
        Ok(removed)
    }

    // ============ Output ============

    /// Display-space overlay boxes for one page of a document
    pub fn overlay(&self, doc: NodeId, page: u32) -> Result<Vec<OverlayItem>> {
        check_page(&self.workspace, doc, page)?;
        let geometries = page_geometries(&self.workspace.bytes(doc)?)?;
        let geometry = geometries
            .get(page as usize - 1)
            .ok_or(SessionError::PageOutOfRange {
                doc,
                page,
                page_count: geometries.len() as u32,
            })?;
        let empty_set = AnnotationSet::new();
        let empty_rotations = PageRotations::new();
        Ok(project_page(
            self.workspace.annotations(doc).unwrap_or(&empty_set),
            self.workspace.rotations(doc).unwrap_or(&empty_rotations),
            page,
            geometry,
            &self.config.compose,
        ))
    }

    /// Document bytes with every edit baked in
    pub fn export(&self, doc: NodeId) -> Result<Vec<u8>> {
        self.workspace.composed_bytes(doc, &self.config.compose)
    }

    /// Same as [`export`](Self::export), serialized per document through the composite guard
    pub async fn export_async(&self, doc: NodeId) -> Result<Composed> {
        let job = ComposeJob {
            source: self.workspace.bytes(doc)?,
            annotations: self.workspace.annotations(doc).cloned().unwrap_or_default(),
            rotations: self.workspace.rotations(doc).cloned().unwrap_or_default(),
            config: self.config.compose.clone(),
        };
        self.guard.composite_latest(doc, job).await
    }

    /// Shared handle to the composite guard, for composites issued outside the session
    pub fn guard(&self) -> Arc<CompositeGuard> {
        Arc::clone(&self.guard)
    }
}

fn check_page(ws: &Workspace, doc: NodeId, page: u32) -> Result<()> {
    let page_count = ws.page_count(doc)?;
    if page == 0 || page > page_count {
        return Err(SessionError::PageOutOfRange {
            doc,
            page,
            page_count,
        });
    }
    Ok(())
}

fn found(hit: bool, doc: NodeId, id: EntityId) -> Result<()> {
    if hit {
        Ok(())
    } else {
        Err(SessionError::EntityNotFound { doc, id })
    }
}

fn file_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.eq_ignore_ascii_case("pdf") => stem,
        _ => name,
    }
}
