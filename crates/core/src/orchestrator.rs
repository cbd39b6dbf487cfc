//! Auto-detect orchestrator
//!
//! Walks the pages of a document in strictly ascending order, invoking the
//! injected detector once per page, and accumulates the reported regions.
//! The walk is sequential on purpose: the detector is a scarce external
//! resource, and one-call-at-a-time keeps progress monotonic and
//! deterministic. Cancellation is cooperative: the flag is checked at the
//! top of every iteration and once more after the loop, and a detector
//! call already in flight is allowed to finish with its result discarded.

use crate::detection::{DetectError, DetectionProgress, RegionDetector};
use crate::region::Region;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Cooperative cancellation flag for a detection run
///
/// Cloned handles share the flag. Cancelling is idempotent and never
/// blocks; the run observes it at its next checkpoint.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// How a detection run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// All pages probed; carries the accumulated regions, ready to
    /// replace the store contents
    Completed(Vec<Region>),

    /// The cancel flag was observed; nothing may reach the store
    Cancelled,

    /// The page-count query failed; the run never started probing
    Failed(DetectError),
}

/// Probe every page of the detector's document, in order
///
/// Progress is published into `progress` after each observable step. The
/// caller owns finalization: on return, `running` and `current_page` are
/// still whatever the loop last published, so that the store replacement
/// and the run-finished signal can happen under one lock with no window
/// where the write slot looks free before the store is settled.
///
/// Per-page failures are logged and skipped; a page is marked processed
/// exactly once whether it succeeded or not, keyed by a page-number set so
/// a retry could never double-count.
pub fn run_detection<D>(
    detector: &D,
    token: &CancelToken,
    progress: &Arc<Mutex<DetectionProgress>>,
) -> RunOutcome
where
    D: RegionDetector + ?Sized,
{
    if token.is_cancelled() {
        return RunOutcome::Cancelled;
    }

    let total = match detector.page_count() {
        Ok(count) => count,
        Err(err) => return RunOutcome::Failed(err),
    };

    progress.lock().unwrap().total_pages = total;

    let mut processed: HashSet<u32> = HashSet::new();
    let mut accumulated: Vec<Region> = Vec::new();

    for page in 1..=total {
        if token.is_cancelled() {
            return RunOutcome::Cancelled;
        }

        progress.lock().unwrap().current_page = Some(page);

        match detector.detect_page(page) {
            Ok(reports) => {
                for report in reports {
                    if report.page != page {
                        log::warn!(
                            "detector tagged a region for page {} while probing page {}; \
                             using the probed page",
                            report.page,
                            page
                        );
                    }
                    if !report.bounds.is_valid() {
                        log::debug!(
                            "dropping degenerate detected region on page {}: {:?}",
                            page,
                            report.bounds
                        );
                        continue;
                    }
                    accumulated.push(Region::new(page, report.bounds));
                }
            }
            Err(err) => {
                log::warn!("detection failed for page {}: {}", page, err);
            }
        }

        if processed.insert(page) {
            progress.lock().unwrap().processed_pages = processed.len();
        }
    }

    if token.is_cancelled() {
        return RunOutcome::Cancelled;
    }

    RunOutcome::Completed(accumulated)
}
