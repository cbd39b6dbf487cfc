//! Region store
//!
//! Holds the authoritative, page-tagged collection of regions. The
//! collection is insertion-ordered; mutations key by stable [`RegionId`],
//! with positional page-local lookup available as an explicit resolution
//! step for callers that address regions by their index within one page.

use crate::region::{RectNorm, Region, RegionId};

/// Insertion-ordered collection of regions with a mutation revision
///
/// Every state-changing operation bumps the revision exactly once, making
/// each mutation a discrete, externally observable event. Downstream
/// consumers (an extraction preview, for example) invalidate cached results
/// by comparing revisions instead of diffing region lists. Failed lookups
/// are silent no-ops and leave the revision untouched.
#[derive(Debug, Default)]
pub struct RegionStore {
    regions: Vec<Region>,
    revision: u64,
}

impl RegionStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mutation revision
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of regions across all pages
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// All regions in insertion order
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Get a region by id
    pub fn get(&self, id: RegionId) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == id)
    }

    /// Regions belonging to one page, in insertion order
    pub fn regions_for_page(&self, page: u32) -> Vec<&Region> {
        self.regions.iter().filter(|r| r.page == page).collect()
    }

    /// Append a new region and return its generated id
    ///
    /// The caller must supply bounds that already satisfy the stored-rect
    /// invariant; the drag and detection paths guarantee this by
    /// construction. No deduplication is performed.
    pub fn add(&mut self, page: u32, bounds: RectNorm) -> RegionId {
        let region = Region::new(page, bounds);
        let id = region.id;
        self.regions.push(region);
        self.revision += 1;
        id
    }

    /// Replace the geometry of a region in place
    ///
    /// Returns `false` (and leaves the store untouched) when the id no
    /// longer resolves. Callers treat that as an acceptable race outcome,
    /// not an error.
    pub fn update_bounds(&mut self, id: RegionId, bounds: RectNorm) -> bool {
        match self.regions.iter_mut().find(|r| r.id == id) {
            Some(region) => {
                region.bounds = bounds;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    /// Remove a region by id
    pub fn remove(&mut self, id: RegionId) -> Option<Region> {
        let index = self.regions.iter().position(|r| r.id == id)?;
        let region = self.regions.remove(index);
        self.revision += 1;
        Some(region)
    }

    /// Resolve a page-local index to a region id
    ///
    /// The index counts regions of `page` in insertion order, the same
    /// order `regions_for_page` yields. Returns `None` when out of range.
    pub fn resolve(&self, page: u32, page_local_index: usize) -> Option<RegionId> {
        self.regions
            .iter()
            .filter(|r| r.page == page)
            .nth(page_local_index)
            .map(|r| r.id)
    }

    /// Update a region addressed by page-local index; silent no-op when
    /// the position does not resolve
    pub fn update_at(&mut self, page: u32, page_local_index: usize, bounds: RectNorm) -> bool {
        match self.resolve(page, page_local_index) {
            Some(id) => self.update_bounds(id, bounds),
            None => false,
        }
    }

    /// Remove a region addressed by page-local index; silent no-op when
    /// the position does not resolve
    pub fn remove_at(&mut self, page: u32, page_local_index: usize) -> Option<Region> {
        let id = self.resolve(page, page_local_index)?;
        self.remove(id)
    }

    /// Remove every region on one page, preserving the relative order of
    /// the rest
    ///
    /// Returns the number of regions removed. Removing zero regions is a
    /// no-op and does not bump the revision.
    pub fn clear_page(&mut self, page: u32) -> usize {
        let before = self.regions.len();
        self.regions.retain(|r| r.page != page);
        let removed = before - self.regions.len();
        if removed > 0 {
            self.revision += 1;
        }
        removed
    }

    /// Remove all regions
    pub fn clear_all(&mut self) {
        if !self.regions.is_empty() {
            self.regions.clear();
            self.revision += 1;
        }
    }

    /// Atomically replace the whole collection
    ///
    /// This is the commit path of a completed detection run. Always bumps
    /// the revision, even when the new collection happens to equal the old
    /// one: run completion is an observable event.
    pub fn replace_all(&mut self, regions: Vec<Region>) {
        self.regions = regions;
        self.revision += 1;
    }

    /// Serialize the collection to the JSON array the extraction
    /// collaborator consumes
    ///
    /// The wire shape is the flat `{top,left,bottom,right,page}` record;
    /// region ids are internal and not part of the payload.
    pub fn extraction_payload(&self) -> Result<String, serde_json::Error> {
        let payload: Vec<WireRegion> = self.regions.iter().map(WireRegion::from).collect();
        serde_json::to_string(&payload)
    }
}

/// Flat region record used by the extraction payload
#[derive(serde::Serialize)]
struct WireRegion {
    top: f32,
    left: f32,
    bottom: f32,
    right: f32,
    page: u32,
}

impl From<&Region> for WireRegion {
    fn from(region: &Region) -> Self {
        Self {
            top: region.bounds.top,
            left: region.bounds.left,
            bottom: region.bounds.bottom,
            right: region.bounds.right,
            page: region.page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(top: f32, left: f32, bottom: f32, right: f32) -> RectNorm {
        RectNorm::new(top, left, bottom, right)
    }

    #[test]
    fn test_add_and_get() {
        let mut store = RegionStore::new();
        let id = store.add(1, rect(0.1, 0.1, 0.3, 0.3));

        assert_eq!(store.len(), 1);
        let region = store.get(id).unwrap();
        assert_eq!(region.page, 1);
        assert_eq!(region.bounds, rect(0.1, 0.1, 0.3, 0.3));
    }

    #[test]
    fn test_update_bounds_unknown_id_is_noop() {
        let mut store = RegionStore::new();
        store.add(1, rect(0.1, 0.1, 0.3, 0.3));
        let revision = store.revision();

        assert!(!store.update_bounds(RegionId::new_v4(), rect(0.2, 0.2, 0.4, 0.4)));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_resolve_is_page_local() {
        let mut store = RegionStore::new();
        let a = store.add(1, rect(0.1, 0.1, 0.2, 0.2));
        let b = store.add(2, rect(0.1, 0.1, 0.2, 0.2));
        let c = store.add(1, rect(0.3, 0.3, 0.4, 0.4));

        assert_eq!(store.resolve(1, 0), Some(a));
        assert_eq!(store.resolve(1, 1), Some(c));
        assert_eq!(store.resolve(2, 0), Some(b));
        assert_eq!(store.resolve(1, 2), None);
        assert_eq!(store.resolve(3, 0), None);
    }

    #[test]
    fn test_remove_at_targets_exact_region() {
        let mut store = RegionStore::new();
        store.add(1, rect(0.1, 0.1, 0.2, 0.2));
        let target = store.add(1, rect(0.3, 0.3, 0.4, 0.4));
        store.add(1, rect(0.5, 0.5, 0.6, 0.6));

        let removed = store.remove_at(1, 1).unwrap();
        assert_eq!(removed.id, target);

        let remaining = store.regions_for_page(1);
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|r| r.id != target));
    }

    #[test]
    fn test_remove_at_out_of_range_is_noop() {
        let mut store = RegionStore::new();
        store.add(1, rect(0.1, 0.1, 0.2, 0.2));
        let revision = store.revision();

        assert!(store.remove_at(1, 5).is_none());
        assert!(store.remove_at(2, 0).is_none());
        assert_eq!(store.len(), 1);
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_clear_page_preserves_other_pages_in_order() {
        let mut store = RegionStore::new();
        let p1 = store.add(1, rect(0.1, 0.1, 0.2, 0.2));
        store.add(2, rect(0.1, 0.1, 0.2, 0.2));
        store.add(2, rect(0.3, 0.3, 0.4, 0.4));
        let p3 = store.add(3, rect(0.1, 0.1, 0.2, 0.2));

        assert_eq!(store.clear_page(2), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.regions()[0].id, p1);
        assert_eq!(store.regions()[1].id, p3);
    }

    #[test]
    fn test_revision_bumps_once_per_mutation() {
        let mut store = RegionStore::new();
        assert_eq!(store.revision(), 0);

        let id = store.add(1, rect(0.1, 0.1, 0.2, 0.2));
        assert_eq!(store.revision(), 1);

        store.update_bounds(id, rect(0.2, 0.2, 0.3, 0.3));
        assert_eq!(store.revision(), 2);

        // No-ops do not bump.
        store.clear_page(7);
        assert_eq!(store.revision(), 2);

        store.clear_all();
        assert_eq!(store.revision(), 3);
        store.clear_all();
        assert_eq!(store.revision(), 3);
    }

    #[test]
    fn test_replace_all_always_bumps() {
        let mut store = RegionStore::new();
        store.replace_all(Vec::new());
        assert_eq!(store.revision(), 1);

        store.replace_all(vec![Region::new(1, rect(0.1, 0.1, 0.2, 0.2))]);
        assert_eq!(store.revision(), 2);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_extraction_payload_shape() {
        let mut store = RegionStore::new();
        store.add(2, rect(0.25, 0.1, 0.75, 0.9));

        let payload = store.extraction_payload().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&payload).unwrap();
        let first = &parsed[0];

        assert_eq!(first["page"], 2);
        assert!((first["top"].as_f64().unwrap() - 0.25).abs() < 1e-6);
        assert!((first["right"].as_f64().unwrap() - 0.9).abs() < 1e-6);
        assert!(first.get("id").is_none());
    }
}
