pub mod cluster;
pub mod hit;
pub mod projection;

pub use cluster::{
    ClusterConfig, ClusterMode, ClusteredMarker, PlacedMarker, cluster_markers, place_markers,
};
pub use hit::hit_test_markers;
pub use projection::{Placement, ProjectionConfig, Size, fit_contain, project};
