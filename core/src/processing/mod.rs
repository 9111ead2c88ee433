pub mod circle_fit;
pub mod clustering;
pub mod detection;

pub use circle_fit::{CircleFit, CircleFitter};
pub use clustering::{ClusterSet, SpatialClusterer};
pub use detection::{detect_trunks, DetectedObject, DetectionPipeline};
