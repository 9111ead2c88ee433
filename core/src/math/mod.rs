pub mod geometry;
pub mod stats;

pub use geometry::{Planar, Point2};
pub use stats::StatsHelper;
