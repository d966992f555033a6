//! One composite in flight per document
//!
//! Each document gets an async mutex that serializes composites and a
//! generation counter bumped on every request. A result is tagged with the
//! generation it was requested under, so a caller can tell when a newer
//! request for the same document has been issued in the meantime.

use crate::error::{Result, SessionError};
use crate::tree::NodeId;
use parking_lot::Mutex;
use pdfedit_core::{composite_set, AnnotationSet, ComposeConfig, PageRotations};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Output of a guarded composite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub bytes: Vec<u8>,
    /// Generation this request was issued under (starts at 1)
    pub generation: u64,
    /// False if a later request for the same document was issued before this one finished
    pub is_latest: bool,
}

#[derive(Debug, Default)]
struct Slot {
    running: tokio::sync::Mutex<()>,
    generation: AtomicU64,
}

/// Inputs for one guarded composite, owned so they can move to a blocking task
#[derive(Debug, Clone)]
pub struct ComposeJob {
    pub source: Arc<[u8]>,
    pub annotations: AnnotationSet,
    pub rotations: PageRotations,
    pub config: ComposeConfig,
}

#[derive(Debug, Default)]
pub struct CompositeGuard {
    slots: Mutex<HashMap<NodeId, Arc<Slot>>>,
}

impl CompositeGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, doc: NodeId) -> Arc<Slot> {
        self.slots.lock().entry(doc).or_default().clone()
    }

    /// Generation of the most recent request for `doc` (0 if none yet)
    pub fn latest_generation(&self, doc: NodeId) -> u64 {
        self.slots
            .lock()
            .get(&doc)
            .map_or(0, |slot| slot.generation.load(Ordering::SeqCst))
    }

    /// Run a composite for `doc` after any earlier one has finished
    #[instrument(skip(self, job), fields(bytes = job.source.len()))]
    pub async fn composite_latest(&self, doc: NodeId, job: ComposeJob) -> Result<Composed> {
        let slot = self.slot(doc);
        let generation = slot.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let _running = slot.running.lock().await;

        let ComposeJob {
            source,
            annotations,
            rotations,
            config,
        } = job;
        let bytes = tokio::task::spawn_blocking(move || {
            composite_set(&source, &annotations, &rotations, &config)
        })
        .await
        .map_err(|e| SessionError::ComposeTaskFailed(e.to_string()))??;

        let is_latest = slot.generation.load(Ordering::SeqCst) == generation;
        debug!(generation, is_latest, "composite finished");
        Ok(Composed {
            bytes,
            generation,
            is_latest,
        })
    }

    /// Drop the bookkeeping for a deleted document
    pub fn forget(&self, doc: NodeId) {
        self.slots.lock().remove(&doc);
    }
}
