//! Detection contract
//!
//! The core does no image analysis of its own. Table regions are proposed
//! by an external per-page detector, injected behind the [`RegionDetector`]
//! trait; the orchestrator only sequences calls to it and collects what it
//! reports.

use crate::region::RectNorm;

/// Errors from the detection capability
#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// The page-count query failed; the whole run fails and this is the
    /// one detection error surfaced to the user.
    #[error("page count unavailable: {0}")]
    PageCount(String),

    /// A single page's detection failed. Non-fatal: the run logs it and
    /// moves on.
    #[error("detection backend error: {0}")]
    Backend(String),
}

/// A region reported by the detector for one probed page
///
/// Bounds are normalized and clamped by the backend but carry no
/// minimum-extent guarantee; the orchestrator filters degenerate reports
/// before anything reaches the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectedRegion {
    /// Page the detector claims the region is on (1-based). The probe
    /// loop treats its own page number as authoritative on mismatch.
    pub page: u32,

    pub bounds: RectNorm,
}

impl DetectedRegion {
    pub fn new(page: u32, bounds: RectNorm) -> Self {
        Self { page, bounds }
    }
}

/// External single-page detection capability
///
/// Must be safe to call repeatedly and independently per page. An empty
/// `Ok` is a valid "no regions found" and is distinct from `Err`.
/// Implementations are bound to one document by construction and must be
/// `Send` so a run can ride a background thread.
pub trait RegionDetector: Send {
    /// Total page count of the bound document. Queried exactly once, at
    /// the start of a run.
    fn page_count(&self) -> Result<u32, DetectError>;

    /// Detect table regions on one page (1-based).
    fn detect_page(&self, page: u32) -> Result<Vec<DetectedRegion>, DetectError>;
}

/// Snapshot of a detection run's progress
///
/// Published by the orchestrator after every observable step; consumers
/// poll it to drive progress UI.
#[derive(Debug, Clone, Default)]
pub struct DetectionProgress {
    /// Total pages of the run's document; 0 until the page count resolves
    pub total_pages: u32,

    /// Page currently being probed, if any
    pub current_page: Option<u32>,

    /// Number of distinct pages probed so far (success or failure)
    pub processed_pages: usize,

    /// Whether the run still holds the write slot
    pub running: bool,

    /// Set when the run failed outright (page-count query); per-page
    /// misses never appear here
    pub error: Option<String>,
}

impl DetectionProgress {
    /// Fraction of pages processed (0.0 to 1.0)
    pub fn ratio(&self) -> f32 {
        if self.total_pages == 0 {
            return 0.0;
        }
        self.processed_pages as f32 / self.total_pages as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_ratio() {
        let mut progress = DetectionProgress::default();
        assert_eq!(progress.ratio(), 0.0);

        progress.total_pages = 4;
        progress.processed_pages = 1;
        assert!((progress.ratio() - 0.25).abs() < 0.001);

        progress.processed_pages = 4;
        assert!((progress.ratio() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_detect_error_messages() {
        let err = DetectError::Backend("503 from detector".to_string());
        assert!(err.to_string().contains("503"));

        let err = DetectError::PageCount("corrupt xref".to_string());
        assert!(err.to_string().starts_with("page count unavailable"));
    }
}
