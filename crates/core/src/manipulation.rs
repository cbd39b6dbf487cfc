//! Region manipulation: handles, hit testing, and the drag state machine
//!
//! Turns raw pointer positions into one of three drag kinds (create, move,
//! resize) and derives candidate geometry from the drag without touching
//! the store. The store sees exactly one mutation per gesture, at commit.

use crate::region::{NormPoint, RectNorm, RegionId, MIN_EXTENT};

/// Resize handle on a region's bounding box
///
/// Eight handles: four corners and four edge midpoints. Corner handles
/// adjust two edges at once; edge handles adjust one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleType {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Top,
    Bottom,
    Left,
    Right,
}

impl HandleType {
    /// All handles, in hit-test precedence order
    pub const ALL: [HandleType; 8] = [
        HandleType::TopLeft,
        HandleType::TopRight,
        HandleType::BottomLeft,
        HandleType::BottomRight,
        HandleType::Top,
        HandleType::Bottom,
        HandleType::Left,
        HandleType::Right,
    ];

    /// Whether dragging this handle adjusts the top edge
    pub fn moves_top(&self) -> bool {
        matches!(self, HandleType::TopLeft | HandleType::TopRight | HandleType::Top)
    }

    /// Whether dragging this handle adjusts the bottom edge
    pub fn moves_bottom(&self) -> bool {
        matches!(
            self,
            HandleType::BottomLeft | HandleType::BottomRight | HandleType::Bottom
        )
    }

    /// Whether dragging this handle adjusts the left edge
    pub fn moves_left(&self) -> bool {
        matches!(self, HandleType::TopLeft | HandleType::BottomLeft | HandleType::Left)
    }

    /// Whether dragging this handle adjusts the right edge
    pub fn moves_right(&self) -> bool {
        matches!(self, HandleType::TopRight | HandleType::BottomRight | HandleType::Right)
    }

    /// Position of this handle on a rect's outline
    pub fn position(&self, rect: &RectNorm) -> NormPoint {
        let center = rect.center();
        match self {
            HandleType::TopLeft => NormPoint::new(rect.left, rect.top),
            HandleType::TopRight => NormPoint::new(rect.right, rect.top),
            HandleType::BottomLeft => NormPoint::new(rect.left, rect.bottom),
            HandleType::BottomRight => NormPoint::new(rect.right, rect.bottom),
            HandleType::Top => NormPoint::new(center.x, rect.top),
            HandleType::Bottom => NormPoint::new(center.x, rect.bottom),
            HandleType::Left => NormPoint::new(rect.left, center.y),
            HandleType::Right => NormPoint::new(rect.right, center.y),
        }
    }
}

/// Configuration for pointer hit testing
#[derive(Debug, Clone)]
pub struct InteractionConfig {
    /// Hit radius around a resize handle, in normalized page units
    pub handle_tolerance: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            handle_tolerance: 0.015,
        }
    }
}

impl InteractionConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the handle hit radius
    pub fn with_handle_tolerance(mut self, tolerance: f32) -> Self {
        self.handle_tolerance = tolerance;
        self
    }
}

/// What a pointer-down landed on
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitTarget {
    /// A resize handle of a region
    Handle {
        id: RegionId,
        bounds: RectNorm,
        handle: HandleType,
    },

    /// The body of a region
    Body { id: RegionId, bounds: RectNorm },

    /// Empty canvas
    Canvas,
}

/// Hit-test a pointer position against one page's regions
///
/// `regions` must be the page's regions in insertion order; later regions
/// render on top, so the test walks them back to front. For each region,
/// handles take precedence over the body.
pub fn hit_test(regions: &[&crate::region::Region], point: NormPoint, tolerance: f32) -> HitTarget {
    for region in regions.iter().rev() {
        for handle in HandleType::ALL {
            if handle.position(&region.bounds).distance_to(&point) <= tolerance {
                return HitTarget::Handle {
                    id: region.id,
                    bounds: region.bounds,
                    handle,
                };
            }
        }
        if region.bounds.contains(point) {
            return HitTarget::Body {
                id: region.id,
                bounds: region.bounds,
            };
        }
    }
    HitTarget::Canvas
}

/// Apply a resize delta to a snapshot rect
///
/// Only the edges named by the handle move. The moving edge is pinned
/// [`MIN_EXTENT`] away from the fixed opposite edge instead of inverting,
/// then every edge is clamped to [0, 1] independently. Because the
/// snapshot satisfies the stored-rect invariant, pin-then-clamp cannot
/// reintroduce a sub-minimum extent.
pub fn resize_bounds(snapshot: RectNorm, handle: HandleType, dx: f32, dy: f32) -> RectNorm {
    let mut top = snapshot.top;
    let mut left = snapshot.left;
    let mut bottom = snapshot.bottom;
    let mut right = snapshot.right;

    if handle.moves_top() {
        top += dy;
    }
    if handle.moves_bottom() {
        bottom += dy;
    }
    if handle.moves_left() {
        left += dx;
    }
    if handle.moves_right() {
        right += dx;
    }

    if right - left < MIN_EXTENT {
        if handle.moves_left() {
            left = right - MIN_EXTENT;
        } else {
            right = left + MIN_EXTENT;
        }
    }
    if bottom - top < MIN_EXTENT {
        if handle.moves_top() {
            top = bottom - MIN_EXTENT;
        } else {
            bottom = top + MIN_EXTENT;
        }
    }

    RectNorm {
        top: top.clamp(0.0, 1.0),
        left: left.clamp(0.0, 1.0),
        bottom: bottom.clamp(0.0, 1.0),
        right: right.clamp(0.0, 1.0),
    }
}

/// Kind of drag in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    /// Rubber-band creation of a new region
    Create,

    /// Translating an existing region
    Move,

    /// Adjusting one or two edges of an existing region
    Resize,
}

/// Committed result of a finished drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragCommit {
    /// Append a new region on `page`
    Create { page: u32, bounds: RectNorm },

    /// Replace the geometry of an existing region
    Update { id: RegionId, bounds: RectNorm },
}

/// Live candidate geometry for rendering during a drag
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragPreview {
    pub kind: DragKind,

    /// Target region for move/resize; `None` for create
    pub target: Option<RegionId>,

    /// Candidate bounds. For create this is the raw rubber-band box and
    /// may be below the minimum extent; for move/resize it equals what a
    /// commit at the current position would produce.
    pub bounds: RectNorm,
}

/// Transient state of a single pointer-down/pointer-up cycle
///
/// At most one session is live at a time. The session never mutates the
/// store; all feedback is re-derived from the start-of-drag snapshot and
/// the current pointer position, and [`DragSession::commit`] computes the
/// single mutation applied on pointer-up.
#[derive(Debug, Clone)]
pub struct DragSession {
    kind: DragKind,
    page: u32,
    start: NormPoint,
    current: NormPoint,
    target: Option<RegionId>,
    snapshot: Option<RectNorm>,
    handle: Option<HandleType>,
}

impl DragSession {
    /// Start a create drag from empty canvas
    pub fn begin_create(page: u32, start: NormPoint) -> Self {
        Self {
            kind: DragKind::Create,
            page,
            start,
            current: start,
            target: None,
            snapshot: None,
            handle: None,
        }
    }

    /// Start a move drag on a region body
    pub fn begin_move(page: u32, target: RegionId, snapshot: RectNorm, start: NormPoint) -> Self {
        Self {
            kind: DragKind::Move,
            page,
            start,
            current: start,
            target: Some(target),
            snapshot: Some(snapshot),
            handle: None,
        }
    }

    /// Start a resize drag on a handle
    pub fn begin_resize(
        page: u32,
        target: RegionId,
        snapshot: RectNorm,
        handle: HandleType,
        start: NormPoint,
    ) -> Self {
        Self {
            kind: DragKind::Resize,
            page,
            start,
            current: start,
            target: Some(target),
            snapshot: Some(snapshot),
            handle: Some(handle),
        }
    }

    /// Kind of this drag
    pub fn kind(&self) -> DragKind {
        self.kind
    }

    /// Page the drag is happening on
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Target region id for move/resize drags
    pub fn target(&self) -> Option<RegionId> {
        self.target
    }

    /// Update the current pointer position (self-loop transition)
    pub fn update_position(&mut self, point: NormPoint) {
        self.current = point;
    }

    /// Candidate geometry at the current pointer position
    pub fn preview(&self) -> Option<DragPreview> {
        let bounds = match self.kind {
            DragKind::Create => RectNorm::from_corners(self.start, self.current),
            DragKind::Move => {
                let snapshot = self.snapshot?;
                snapshot.translated(self.current.x - self.start.x, self.current.y - self.start.y)
            }
            DragKind::Resize => {
                let snapshot = self.snapshot?;
                let handle = self.handle?;
                resize_bounds(
                    snapshot,
                    handle,
                    self.current.x - self.start.x,
                    self.current.y - self.start.y,
                )
            }
        };
        Some(DragPreview {
            kind: self.kind,
            target: self.target,
            bounds,
        })
    }

    /// Compute the mutation this drag commits on pointer-up
    ///
    /// A create drag below the minimum extent in either axis returns
    /// `None`: an accidental click, not an error.
    pub fn commit(&self) -> Option<DragCommit> {
        let dx = self.current.x - self.start.x;
        let dy = self.current.y - self.start.y;

        match self.kind {
            DragKind::Create => {
                let bounds = RectNorm::from_corners(self.start, self.current);
                if bounds.width() > MIN_EXTENT && bounds.height() > MIN_EXTENT {
                    Some(DragCommit::Create {
                        page: self.page,
                        bounds,
                    })
                } else {
                    None
                }
            }
            DragKind::Move => {
                let id = self.target?;
                let snapshot = self.snapshot?;
                Some(DragCommit::Update {
                    id,
                    bounds: snapshot.translated(dx, dy),
                })
            }
            DragKind::Resize => {
                let id = self.target?;
                let snapshot = self.snapshot?;
                let handle = self.handle?;
                Some(DragCommit::Update {
                    id,
                    bounds: resize_bounds(snapshot, handle, dx, dy),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Region;

    fn region(page: u32, top: f32, left: f32, bottom: f32, right: f32) -> Region {
        Region::new(page, RectNorm::new(top, left, bottom, right))
    }

    #[test]
    fn test_handle_positions() {
        let rect = RectNorm::new(0.2, 0.1, 0.6, 0.5);

        let nw = HandleType::TopLeft.position(&rect);
        assert_eq!((nw.x, nw.y), (0.1, 0.2));

        let south = HandleType::Bottom.position(&rect);
        assert!((south.x - 0.3).abs() < 0.001);
        assert_eq!(south.y, 0.6);
    }

    #[test]
    fn test_hit_test_handle_before_body() {
        let r = region(1, 0.2, 0.2, 0.6, 0.6);
        let regions = vec![&r];

        // Right on the top-left corner.
        let hit = hit_test(&regions, NormPoint::new(0.2, 0.2), 0.02);
        assert!(matches!(
            hit,
            HitTarget::Handle {
                handle: HandleType::TopLeft,
                ..
            }
        ));

        // Center of the body, away from every handle.
        let hit = hit_test(&regions, NormPoint::new(0.35, 0.45), 0.02);
        assert!(matches!(hit, HitTarget::Body { id, .. } if id == r.id));
    }

    #[test]
    fn test_hit_test_canvas() {
        let r = region(1, 0.2, 0.2, 0.6, 0.6);
        let regions = vec![&r];
        let hit = hit_test(&regions, NormPoint::new(0.9, 0.9), 0.02);
        assert_eq!(hit, HitTarget::Canvas);
    }

    #[test]
    fn test_hit_test_prefers_topmost_region() {
        let below = region(1, 0.1, 0.1, 0.5, 0.5);
        let above = region(1, 0.3, 0.3, 0.7, 0.7);
        let regions = vec![&below, &above];

        // Point inside the overlap hits the later-inserted region.
        let hit = hit_test(&regions, NormPoint::new(0.4, 0.4), 0.005);
        assert!(matches!(hit, HitTarget::Body { id, .. } if id == above.id));
    }

    #[test]
    fn test_create_commit_requires_minimum_extent() {
        let mut drag = DragSession::begin_create(1, NormPoint::new(0.2, 0.2));
        drag.update_position(NormPoint::new(0.205, 0.4));
        // Wide enough vertically, but only 0.005 wide.
        assert!(drag.commit().is_none());

        drag.update_position(NormPoint::new(0.4, 0.4));
        match drag.commit() {
            Some(DragCommit::Create { page, bounds }) => {
                assert_eq!(page, 1);
                assert!(bounds.is_valid());
                assert!((bounds.width() - 0.2).abs() < 0.001);
            }
            other => panic!("expected create commit, got {:?}", other),
        }
    }

    #[test]
    fn test_create_commit_normalizes_direction() {
        // Drag up and to the left.
        let mut drag = DragSession::begin_create(3, NormPoint::new(0.8, 0.7));
        drag.update_position(NormPoint::new(0.3, 0.2));
        match drag.commit() {
            Some(DragCommit::Create { bounds, .. }) => {
                assert!((bounds.left - 0.3).abs() < 0.001);
                assert!((bounds.top - 0.2).abs() < 0.001);
                assert!((bounds.right - 0.8).abs() < 0.001);
                assert!((bounds.bottom - 0.7).abs() < 0.001);
            }
            other => panic!("expected create commit, got {:?}", other),
        }
    }

    #[test]
    fn test_move_commit_clamps_as_shift() {
        let id = RegionId::new_v4();
        let snapshot = RectNorm::new(0.2, 0.6, 0.5, 0.9);
        let mut drag = DragSession::begin_move(1, id, snapshot, NormPoint::new(0.7, 0.3));
        drag.update_position(NormPoint::new(1.0, 0.3));

        match drag.commit() {
            Some(DragCommit::Update { id: got, bounds }) => {
                assert_eq!(got, id);
                assert!((bounds.right - 1.0).abs() < 0.001);
                assert!((bounds.width() - snapshot.width()).abs() < 0.001);
                assert!((bounds.height() - snapshot.height()).abs() < 0.001);
            }
            other => panic!("expected update commit, got {:?}", other),
        }
    }

    #[test]
    fn test_resize_pins_instead_of_inverting() {
        let snapshot = RectNorm::new(0.2, 0.2, 0.6, 0.6);
        // Drag the right edge far past the left edge.
        let result = resize_bounds(snapshot, HandleType::Right, -0.9, 0.0);
        assert!((result.right - (snapshot.left + MIN_EXTENT)).abs() < 0.001);
        assert_eq!(result.left, snapshot.left);
        assert!(result.is_valid());

        // Same for the top edge dragged past the bottom.
        let result = resize_bounds(snapshot, HandleType::Top, 0.0, 0.9);
        assert!((result.top - (snapshot.bottom - MIN_EXTENT)).abs() < 0.001);
        assert_eq!(result.bottom, snapshot.bottom);
        assert!(result.is_valid());
    }

    #[test]
    fn test_resize_corner_adjusts_both_axes() {
        let snapshot = RectNorm::new(0.2, 0.2, 0.6, 0.6);
        let result = resize_bounds(snapshot, HandleType::BottomRight, 0.1, 0.2);
        assert!((result.right - 0.7).abs() < 0.001);
        assert!((result.bottom - 0.8).abs() < 0.001);
        assert_eq!(result.top, snapshot.top);
        assert_eq!(result.left, snapshot.left);
    }

    #[test]
    fn test_resize_clamps_to_page() {
        let snapshot = RectNorm::new(0.2, 0.2, 0.6, 0.6);
        let result = resize_bounds(snapshot, HandleType::BottomRight, 0.9, 0.9);
        assert_eq!(result.right, 1.0);
        assert_eq!(result.bottom, 1.0);
        assert!(result.is_valid());
    }

    #[test]
    fn test_preview_matches_commit_for_move() {
        let id = RegionId::new_v4();
        let snapshot = RectNorm::new(0.1, 0.1, 0.3, 0.3);
        let mut drag = DragSession::begin_move(1, id, snapshot, NormPoint::new(0.2, 0.2));
        drag.update_position(NormPoint::new(0.9, 0.9));

        let preview = drag.preview().unwrap();
        match drag.commit() {
            Some(DragCommit::Update { bounds, .. }) => assert_eq!(preview.bounds, bounds),
            other => panic!("expected update commit, got {:?}", other),
        }
    }

    #[test]
    fn test_create_preview_tracks_pointer() {
        let mut drag = DragSession::begin_create(1, NormPoint::new(0.5, 0.5));
        drag.update_position(NormPoint::new(0.502, 0.503));

        // Sub-minimum marquee is still previewable.
        let preview = drag.preview().unwrap();
        assert_eq!(preview.kind, DragKind::Create);
        assert!(preview.bounds.width() < MIN_EXTENT);
    }
}
