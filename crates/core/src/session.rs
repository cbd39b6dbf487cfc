//! Marking session
//!
//! Owns the region store and enforces single-writer access to it: either
//! the interactive editing surface or an auto-detection run may mutate the
//! store, never both. The guard lives here, at the mutation entry points,
//! rather than relying on UI affordances being visually disabled; a
//! commit queued before a run started is still rejected.

use crate::detection::{DetectionProgress, RegionDetector};
use crate::document::{DocumentInfo, PageNavigator};
use crate::manipulation::{DragCommit, DragKind, DragPreview, DragSession, HitTarget, InteractionConfig};
use crate::orchestrator::{self, CancelToken, RunOutcome};
use crate::region::{NormPoint, RectNorm, Region, RegionId};
use crate::store::RegionStore;
use std::sync::{Arc, Mutex};
use std::thread;

/// Errors from session entry points
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// An auto-detection run holds the write slot; interactive edits are
    /// rejected until it finishes or is cancelled
    #[error("auto-detection is running; region edits are locked")]
    DetectionInProgress,

    /// No document is open yet
    #[error("no document is open")]
    NoDocument,
}

/// Handle to the most recent detection run
#[derive(Debug)]
struct RunHandle {
    id: u64,
    token: CancelToken,
    progress: Arc<Mutex<DetectionProgress>>,
}

#[derive(Debug, Default)]
struct SessionState {
    document: Option<DocumentInfo>,
    navigator: Option<PageNavigator>,
    store: RegionStore,
    drag: Option<DragSession>,
    detection: Option<RunHandle>,
    next_run_id: u64,
}

/// Interactive marking session for one document at a time
///
/// Cloning the session clones a handle to the same shared state. Opening
/// a new document cancels any in-flight detection run, clears the store,
/// and resets navigation; a stale run can never commit into the new
/// document's store because its run identity no longer matches.
#[derive(Debug, Clone, Default)]
pub struct MarkingSession {
    state: Arc<Mutex<SessionState>>,
    config: InteractionConfig,
}

impl MarkingSession {
    /// Create a session with default interaction configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session with a custom interaction configuration
    pub fn with_config(config: InteractionConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            config,
        }
    }

    fn detection_active(state: &SessionState) -> bool {
        match &state.detection {
            Some(handle) => {
                !handle.token.is_cancelled() && handle.progress.lock().unwrap().running
            }
            None => false,
        }
    }

    /// Replace the current document
    ///
    /// This is also the automatic cancellation hook: any in-flight
    /// detection run is cancelled and its pending effects suppressed.
    /// Existing regions are dropped; they were marked against pages of
    /// the previous document.
    pub fn open_document(&self, info: DocumentInfo) {
        let mut state = self.state.lock().unwrap();
        if let Some(handle) = state.detection.take() {
            handle.token.cancel();
        }
        state.store.clear_all();
        state.drag = None;
        state.navigator = Some(PageNavigator::new(info.page_count));
        state.document = Some(info);
    }

    /// The currently open document, if any
    pub fn document(&self) -> Option<DocumentInfo> {
        self.state.lock().unwrap().document.clone()
    }

    /// The currently viewed page (1-based)
    pub fn current_page(&self) -> Option<u32> {
        let state = self.state.lock().unwrap();
        state.navigator.as_ref().map(|nav| nav.current())
    }

    pub fn page_count(&self) -> Option<u32> {
        let state = self.state.lock().unwrap();
        state.navigator.as_ref().map(|nav| nav.page_count())
    }

    pub fn next_page(&self) -> Option<u32> {
        let mut state = self.state.lock().unwrap();
        state.navigator.as_mut().map(|nav| nav.next())
    }

    pub fn previous_page(&self) -> Option<u32> {
        let mut state = self.state.lock().unwrap();
        state.navigator.as_mut().map(|nav| nav.previous())
    }

    pub fn go_to_page(&self, page: u32) -> Option<u32> {
        let mut state = self.state.lock().unwrap();
        state.navigator.as_mut().map(|nav| nav.go_to(page))
    }

    /// Regions on one page, in insertion order
    pub fn regions_for_page(&self, page: u32) -> Vec<Region> {
        let state = self.state.lock().unwrap();
        state
            .store
            .regions_for_page(page)
            .into_iter()
            .cloned()
            .collect()
    }

    /// All regions, in insertion order
    pub fn regions(&self) -> Vec<Region> {
        self.state.lock().unwrap().store.regions().to_vec()
    }

    pub fn region_count(&self) -> usize {
        self.state.lock().unwrap().store.len()
    }

    /// The store's mutation revision; changes whenever the collection
    /// changed, for downstream cache invalidation
    pub fn store_revision(&self) -> u64 {
        self.state.lock().unwrap().store.revision()
    }

    /// JSON payload of the current collection for the extraction
    /// collaborator
    pub fn extraction_payload(&self) -> Result<String, serde_json::Error> {
        self.state.lock().unwrap().store.extraction_payload()
    }

    /// Pointer-down on the page at a normalized position
    ///
    /// Resolves what was hit (resize handle, region body, or empty
    /// canvas) and starts the corresponding drag. Replaces any drag that
    /// was somehow still live. Refused while a detection run is active.
    pub fn begin_drag(&self, point: NormPoint) -> Result<DragKind, SessionError> {
        let mut state = self.state.lock().unwrap();
        if Self::detection_active(&state) {
            return Err(SessionError::DetectionInProgress);
        }
        let page = match &state.navigator {
            Some(nav) => nav.current(),
            None => return Err(SessionError::NoDocument),
        };

        let page_regions = state.store.regions_for_page(page);
        let target =
            crate::manipulation::hit_test(&page_regions, point, self.config.handle_tolerance);

        let drag = match target {
            HitTarget::Canvas => DragSession::begin_create(page, point),
            HitTarget::Body { id, bounds } => DragSession::begin_move(page, id, bounds, point),
            HitTarget::Handle { id, bounds, handle } => {
                DragSession::begin_resize(page, id, bounds, handle, point)
            }
        };
        let kind = drag.kind();
        state.drag = Some(drag);
        Ok(kind)
    }

    /// Pointer-move during a drag; no-op when no drag is live
    pub fn update_drag(&self, point: NormPoint) {
        let mut state = self.state.lock().unwrap();
        if let Some(drag) = state.drag.as_mut() {
            drag.update_position(point);
        }
    }

    /// Candidate geometry for rendering the live drag, if one is active
    pub fn drag_preview(&self) -> Option<DragPreview> {
        let state = self.state.lock().unwrap();
        state.drag.as_ref().and_then(|drag| drag.preview())
    }

    /// Pointer-up: commit the drag
    ///
    /// The drag session is destroyed unconditionally. Returns the id of
    /// the created or updated region, `None` for an accidental click or a
    /// target that vanished, and an error when a detection run grabbed
    /// the write slot mid-drag, in which case nothing is committed.
    pub fn end_drag(&self) -> Result<Option<RegionId>, SessionError> {
        let mut state = self.state.lock().unwrap();
        let drag = match state.drag.take() {
            Some(drag) => drag,
            None => return Ok(None),
        };
        if Self::detection_active(&state) {
            return Err(SessionError::DetectionInProgress);
        }

        match drag.commit() {
            Some(DragCommit::Create { page, bounds }) => Ok(Some(state.store.add(page, bounds))),
            Some(DragCommit::Update { id, bounds }) => {
                if state.store.update_bounds(id, bounds) {
                    Ok(Some(id))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    /// Pointer-leave: destroy the drag without committing
    pub fn cancel_drag(&self) {
        self.state.lock().unwrap().drag = None;
    }

    /// Remove a region by id
    pub fn remove_region(&self, id: RegionId) -> Result<bool, SessionError> {
        let mut state = self.state.lock().unwrap();
        if Self::detection_active(&state) {
            return Err(SessionError::DetectionInProgress);
        }
        Ok(state.store.remove(id).is_some())
    }

    /// Remove a region by page-local index; `Ok(false)` when the
    /// position no longer resolves
    pub fn remove_region_at(&self, page: u32, index: usize) -> Result<bool, SessionError> {
        let mut state = self.state.lock().unwrap();
        if Self::detection_active(&state) {
            return Err(SessionError::DetectionInProgress);
        }
        Ok(state.store.remove_at(page, index).is_some())
    }

    /// Update a region's geometry by id; `Ok(false)` when the id is gone.
    /// The bounds must already satisfy the stored-rect invariant.
    pub fn update_region(&self, id: RegionId, bounds: RectNorm) -> Result<bool, SessionError> {
        let mut state = self.state.lock().unwrap();
        if Self::detection_active(&state) {
            return Err(SessionError::DetectionInProgress);
        }
        Ok(state.store.update_bounds(id, bounds))
    }

    /// Remove every region on one page
    pub fn clear_page(&self, page: u32) -> Result<usize, SessionError> {
        let mut state = self.state.lock().unwrap();
        if Self::detection_active(&state) {
            return Err(SessionError::DetectionInProgress);
        }
        Ok(state.store.clear_page(page))
    }

    /// Remove all regions
    pub fn clear_all(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().unwrap();
        if Self::detection_active(&state) {
            return Err(SessionError::DetectionInProgress);
        }
        state.store.clear_all();
        Ok(())
    }

    /// Start an auto-detection run for the open document
    ///
    /// The run walks all pages sequentially on a background thread and,
    /// on uncancelled completion, replaces the store contents with what
    /// it found. Returns immediately; poll [`MarkingSession::detection_progress`].
    pub fn start_detection<D>(&self, detector: D) -> Result<(), SessionError>
    where
        D: RegionDetector + 'static,
    {
        let prepared = self.prepare_run()?;
        let shared = Arc::clone(&self.state);
        thread::spawn(move || {
            detection_worker(
                shared,
                prepared.id,
                prepared.token,
                prepared.progress,
                detector,
            );
        });
        Ok(())
    }

    /// Acquire the write slot for a new run and register its handle
    fn prepare_run(&self) -> Result<PreparedRun, SessionError> {
        let mut state = self.state.lock().unwrap();
        if state.document.is_none() {
            return Err(SessionError::NoDocument);
        }
        if Self::detection_active(&state) {
            return Err(SessionError::DetectionInProgress);
        }

        let id = state.next_run_id;
        state.next_run_id += 1;
        let token = CancelToken::new();
        let progress = Arc::new(Mutex::new(DetectionProgress {
            running: true,
            ..Default::default()
        }));
        state.detection = Some(RunHandle {
            id,
            token: token.clone(),
            progress: Arc::clone(&progress),
        });

        Ok(PreparedRun {
            id,
            token,
            progress,
        })
    }

    /// Whether a detection run currently holds the write slot
    pub fn is_detecting(&self) -> bool {
        let state = self.state.lock().unwrap();
        Self::detection_active(&state)
    }

    /// Snapshot of the most recent run's progress
    pub fn detection_progress(&self) -> DetectionProgress {
        let state = self.state.lock().unwrap();
        match &state.detection {
            Some(handle) => handle.progress.lock().unwrap().clone(),
            None => DetectionProgress::default(),
        }
    }

    /// Cancel the in-flight run, if any, releasing the write slot
    pub fn cancel_detection(&self) {
        let state = self.state.lock().unwrap();
        if let Some(handle) = &state.detection {
            handle.token.cancel();
        }
    }
}

struct PreparedRun {
    id: u64,
    token: CancelToken,
    progress: Arc<Mutex<DetectionProgress>>,
}

/// Body of the detection thread
///
/// Runs the sequential probe loop, then finalizes under the session lock:
/// the store replacement and the run-finished signal happen together, so
/// the write slot is never observed free with a replacement still pending.
/// A run whose identity no longer matches the session's current handle
/// (the document changed) discards its result entirely.
fn detection_worker<D: RegionDetector>(
    shared: Arc<Mutex<SessionState>>,
    run_id: u64,
    token: CancelToken,
    progress: Arc<Mutex<DetectionProgress>>,
    detector: D,
) {
    let outcome = orchestrator::run_detection(&detector, &token, &progress);

    let mut state = shared.lock().unwrap();
    let still_active = state.detection.as_ref().map(|handle| handle.id) == Some(run_id);

    let mut error = None;
    match outcome {
        RunOutcome::Completed(regions) => {
            if still_active && !token.is_cancelled() {
                state.store.replace_all(regions);
            }
        }
        RunOutcome::Failed(err) => error = Some(err.to_string()),
        RunOutcome::Cancelled => {}
    }

    let mut snapshot = progress.lock().unwrap();
    snapshot.current_page = None;
    snapshot.running = false;
    snapshot.error = error;
}
