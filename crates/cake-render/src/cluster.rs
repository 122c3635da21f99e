//! Marker clustering: merge markers whose projected positions overlap.
//!
//! Two grouping modes are available:
//!
//! - [`ClusterMode::Anchor`] (default): greedy single pass. Each unassigned
//!   marker becomes an anchor and absorbs every later unassigned marker
//!   within the threshold *of the anchor*. Not transitive: with markers at
//!   0, 10 and 20 px and a 15 px threshold the result is `{0, 10}` + `{20}`.
//!   This reproduces the marker layout existing users already see.
//! - [`ClusterMode::Transitive`]: connected components of the "closer than
//!   threshold" relation (union-find). The same input yields `{0, 10, 20}`.
//!
//! Clustering is recomputed from scratch on every call; there is no
//! incremental update.

use crate::projection::{Placement, ProjectionConfig, Size, project};
use cake_core::model::{DesignItem, Position};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Default merge distance in container pixels.
pub const DEFAULT_CLUSTER_THRESHOLD_PX: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterMode {
    #[default]
    Anchor,
    Transitive,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Markers strictly closer than this (in pixels) are merged.
    pub threshold_px: f64,
    pub mode: ClusterMode,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            threshold_px: DEFAULT_CLUSTER_THRESHOLD_PX,
            mode: ClusterMode::Anchor,
        }
    }
}

/// A marker ready for rendering: one element, or several merged ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClusteredMarker {
    Single {
        item: DesignItem,
        position: Position,
    },
    Cluster {
        id: String,
        /// Mean of member positions, in model space.
        position: Position,
        /// Members in input order.
        items: Vec<DesignItem>,
    },
}

impl ClusteredMarker {
    pub fn is_cluster(&self) -> bool {
        matches!(self, ClusteredMarker::Cluster { .. })
    }

    pub fn position(&self) -> Position {
        match self {
            ClusteredMarker::Single { position, .. } | ClusteredMarker::Cluster { position, .. } => {
                *position
            }
        }
    }

    /// Stable key for the rendering layer.
    pub fn key(&self) -> String {
        match self {
            ClusteredMarker::Single { item, .. } => item.id().as_str().to_string(),
            ClusteredMarker::Cluster { id, .. } => id.clone(),
        }
    }

    /// Number of design elements behind this marker.
    pub fn member_count(&self) -> usize {
        match self {
            ClusteredMarker::Single { .. } => 1,
            ClusteredMarker::Cluster { items, .. } => items.len(),
        }
    }
}

/// A clustered marker paired with its projected placement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedMarker {
    pub marker: ClusteredMarker,
    pub placement: Placement,
}

/// Group all markable items (enabled, finite position) into markers.
///
/// If either dimension is unknown every markable item comes back as its own
/// marker. Items without a position are skipped.
pub fn cluster_markers(
    items: &[DesignItem],
    image: Option<Size>,
    container: Option<Size>,
    projection: &ProjectionConfig,
    config: &ClusterConfig,
) -> Vec<ClusteredMarker> {
    let markable: Vec<(&DesignItem, Position)> = items
        .iter()
        .filter_map(|item| item.marker_position().map(|p| (item, p)))
        .collect();

    let pixels: Option<Vec<Point>> = markable
        .iter()
        .map(|(_, p)| match project(*p, image, container, projection) {
            Placement::Pixel { x, y } => Some(Point::new(x, y)),
            Placement::Centered => None,
        })
        .collect();

    let groups = match pixels {
        Some(points) if !points.is_empty() => match config.mode {
            ClusterMode::Anchor => group_by_anchor(&points, config.threshold_px),
            ClusterMode::Transitive => group_transitive(&points, config.threshold_px),
        },
        _ => (0..markable.len()).map(|i| vec![i]).collect(),
    };

    groups
        .into_iter()
        .map(|group| build_marker(&markable, &group))
        .collect()
}

/// Cluster, then project each marker's (centroid) position.
pub fn place_markers(
    items: &[DesignItem],
    image: Option<Size>,
    container: Option<Size>,
    projection: &ProjectionConfig,
    config: &ClusterConfig,
) -> Vec<PlacedMarker> {
    cluster_markers(items, image, container, projection, config)
        .into_iter()
        .map(|marker| {
            let placement = project(marker.position(), image, container, projection);
            PlacedMarker { marker, placement }
        })
        .collect()
}

fn build_marker(markable: &[(&DesignItem, Position)], group: &[usize]) -> ClusteredMarker {
    if let [only] = group {
        let (item, position) = markable[*only];
        return ClusteredMarker::Single {
            item: item.clone(),
            position,
        };
    }

    let n = group.len() as f64;
    let (sx, sy) = group.iter().fold((0.0, 0.0), |(sx, sy), &i| {
        (sx + markable[i].1.x, sy + markable[i].1.y)
    });
    let items: Vec<DesignItem> = group.iter().map(|&i| markable[i].0.clone()).collect();
    let id = format!("cluster_{}", items[0].id());
    log::debug!("clustered {} markers into {id}", items.len());

    ClusteredMarker::Cluster {
        id,
        position: Position::new(sx / n, sy / n),
        items,
    }
}

fn group_by_anchor(points: &[Point], threshold: f64) -> Vec<Vec<usize>> {
    let mut assigned = vec![false; points.len()];
    let mut groups = Vec::new();

    for i in 0..points.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;
        let mut group = vec![i];
        for j in (i + 1)..points.len() {
            if !assigned[j] && points[i].distance(points[j]) < threshold {
                assigned[j] = true;
                group.push(j);
            }
        }
        groups.push(group);
    }
    groups
}

fn group_transitive(points: &[Point], threshold: f64) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..points.len()).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            if points[i].distance(points[j]) < threshold {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    // Keep the lowest index as root so groups sort by first member.
                    let (lo, hi) = if ri < rj { (ri, rj) } else { (rj, ri) };
                    parent[hi] = lo;
                }
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut slot_of_root = vec![usize::MAX; points.len()];
    for i in 0..points.len() {
        let root = find(&mut parent, i);
        if slot_of_root[root] == usize::MAX {
            slot_of_root[root] = groups.len();
            groups.push(Vec::new());
        }
        groups[slot_of_root[root]].push(i);
    }
    groups
}
