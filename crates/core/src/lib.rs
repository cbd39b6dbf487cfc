//! Table Marker Core Library
//!
//! Region geometry engine and auto-detect orchestrator for marking table
//! regions on rendered document pages.

pub mod detection;
pub mod document;
pub mod manipulation;
pub mod orchestrator;
pub mod region;
pub mod session;
pub mod store;
pub mod viewport;

pub use detection::{DetectError, DetectedRegion, DetectionProgress, RegionDetector};
pub use document::{DocumentId, DocumentInfo, PageNavigator};
pub use manipulation::{
    hit_test, resize_bounds, DragCommit, DragKind, DragPreview, DragSession, HandleType,
    HitTarget, InteractionConfig,
};
pub use orchestrator::{run_detection, CancelToken, RunOutcome};
pub use region::{NormPoint, RectNorm, Region, RegionId, MIN_EXTENT};
pub use session::{MarkingSession, SessionError};
pub use store::RegionStore;
pub use viewport::ViewBox;
