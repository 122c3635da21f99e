//! Hit testing: pointer position → marker lookup.
//!
//! Walks the placed markers back-to-front (last painted = topmost) and
//! returns the first one whose hit circle contains the pointer.

use crate::cluster::PlacedMarker;
use crate::projection::Size;
use kurbo::Point;

/// Default hit radius of a marker, in container pixels.
pub const DEFAULT_HIT_RADIUS_PX: f64 = 12.0;

/// Find the topmost marker within `radius` of `(px, py)`.
///
/// Centered (unmeasured) placements are tested at the container centre and
/// are never hit while the container size is unknown.
pub fn hit_test_markers(
    placed: &[PlacedMarker],
    container: Option<Size>,
    px: f64,
    py: f64,
    radius: f64,
) -> Option<&PlacedMarker> {
    let pointer = Point::new(px, py);
    placed.iter().rev().find(|m| {
        m.placement
            .resolve(container)
            .is_some_and(|p| p.distance(pointer) <= radius)
    })
}
