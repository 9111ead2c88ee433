use serde::{Deserialize, Serialize};

/// Planar point in scan coordinates (millimetres).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Anything that has a position in the scan plane.
pub trait Planar {
    fn position(&self) -> Point2;

    fn distance_to(&self, other: &impl Planar) -> f64 {
        self.position().distance(&other.position())
    }
}

impl Planar for Point2 {
    fn position(&self) -> Point2 {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(3.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(b.distance_to(&a), 5.0);
    }
}
