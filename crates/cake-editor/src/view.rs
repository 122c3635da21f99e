//! Marker view: measured dimensions + memoised marker layout.
//!
//! The view tracks three inputs that arrive asynchronously from the UI:
//!
//! - the active image (changes on upload),
//! - the image's natural size (arrives when the image finishes loading),
//! - the container size (arrives from a resize observer).
//!
//! Switching images resets the natural size to unknown *immediately*, so no
//! layout is ever computed against the previous image's aspect ratio. A late
//! load notification for an image that is no longer active is ignored.

use cake_core::model::{CakeMessage, DecorElement, WorkingState};
use cake_render::{
    ClusterConfig, PlacedMarker, ProjectionConfig, Size, hit_test_markers, place_markers,
};
use std::sync::Arc;

/// Inputs the cached layout was computed from.
#[derive(Debug, Clone)]
struct LayoutKey {
    main_toppers: Arc<Vec<DecorElement>>,
    support_elements: Arc<Vec<DecorElement>>,
    cake_messages: Arc<Vec<CakeMessage>>,
    image_size: Option<Size>,
    container: Option<Size>,
    projection: ProjectionConfig,
    clustering: ClusterConfig,
}

impl LayoutKey {
    fn matches(&self, other: &LayoutKey) -> bool {
        Arc::ptr_eq(&self.main_toppers, &other.main_toppers)
            && Arc::ptr_eq(&self.support_elements, &other.support_elements)
            && Arc::ptr_eq(&self.cake_messages, &other.cake_messages)
            && self.image_size == other.image_size
            && self.container == other.container
            && self.projection == other.projection
            && self.clustering == other.clustering
    }
}

#[derive(Debug, Default)]
pub struct MarkerView {
    image_key: Option<String>,
    image_size: Option<Size>,
    container: Option<Size>,
    projection: ProjectionConfig,
    clustering: ClusterConfig,
    cache: Option<(LayoutKey, Vec<PlacedMarker>)>,
    layouts: u64,
}

impl MarkerView {
    pub fn new(projection: ProjectionConfig, clustering: ClusterConfig) -> Self {
        Self {
            projection,
            clustering,
            ..Default::default()
        }
    }

    // ─── Inputs ──────────────────────────────────────────────────────────

    /// Switch the active image. Its natural size becomes unknown until
    /// [`image_loaded`](Self::image_loaded) reports it. Returns `true` if the
    /// active image changed.
    pub fn set_image(&mut self, key: Option<&str>) -> bool {
        if self.image_key.as_deref() == key {
            return false;
        }
        log::debug!("active image {:?} -> {key:?}", self.image_key);
        self.image_key = key.map(str::to_string);
        self.image_size = None;
        true
    }

    /// Record the natural size of a loaded image. Ignored (returns `false`)
    /// when `key` is not the active image.
    pub fn image_loaded(&mut self, key: &str, size: Size) -> bool {
        if self.image_key.as_deref() != Some(key) {
            log::debug!("ignoring load of stale image {key}");
            return false;
        }
        let size = Some(size).filter(Size::is_usable);
        if self.image_size == size {
            return false;
        }
        self.image_size = size;
        true
    }

    /// Container resize notification. Idempotent: an unchanged size is a
    /// no-op and returns `false`.
    pub fn resize(&mut self, size: Size) -> bool {
        let size = Some(size).filter(Size::is_usable);
        if self.container == size {
            return false;
        }
        self.container = size;
        true
    }

    pub fn set_config(&mut self, projection: ProjectionConfig, clustering: ClusterConfig) {
        self.projection = projection;
        self.clustering = clustering;
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn image_key(&self) -> Option<&str> {
        self.image_key.as_deref()
    }

    pub fn image_size(&self) -> Option<Size> {
        self.image_size
    }

    pub fn container(&self) -> Option<Size> {
        self.container
    }

    /// Clustered, projected markers for `working`. Recomputed from scratch
    /// whenever an element list, a dimension, or the config changed.
    pub fn markers(&mut self, working: &WorkingState) -> &[PlacedMarker] {
        let key = LayoutKey {
            main_toppers: Arc::clone(&working.main_toppers),
            support_elements: Arc::clone(&working.support_elements),
            cake_messages: Arc::clone(&working.cake_messages),
            image_size: self.image_size,
            container: self.container,
            projection: self.projection,
            clustering: self.clustering,
        };

        let stale = self
            .cache
            .as_ref()
            .is_none_or(|(cached, _)| !cached.matches(&key));
        if stale {
            let placed = place_markers(
                &working.design_items(),
                self.image_size,
                self.container,
                &self.projection,
                &self.clustering,
            );
            self.layouts += 1;
            self.cache = Some((key, placed));
        }

        self.cache
            .as_ref()
            .map(|(_, placed)| placed.as_slice())
            .unwrap_or_default()
    }

    /// Topmost marker under the pointer.
    pub fn hit_test(
        &mut self,
        working: &WorkingState,
        px: f64,
        py: f64,
        radius: f64,
    ) -> Option<PlacedMarker> {
        let container = self.container;
        let placed = self.markers(working);
        hit_test_markers(placed, container, px, py, radius).cloned()
    }

    /// How many times the layout was actually recomputed.
    pub fn layout_count(&self) -> u64 {
        self.layouts
    }
}
