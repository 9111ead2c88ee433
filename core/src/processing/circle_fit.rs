//! Closed-form least-squares circle fit.
//!
//! The center solves the 2x2 normal equations built from first to third order
//! moments of the points. The radius is the mean distance from the points to
//! that center rather than the algebraic radius of the same system.

use crate::math::geometry::{Planar, Point2};
use crate::math::stats::StatsHelper;
use crate::prelude::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircleFit {
    pub center: Point2,
    pub radius: f64,
    /// RMS of point-to-circle distances.
    pub rms_residual: f64,
}

#[derive(Debug, Default)]
struct Moments {
    n: f64,
    x: f64,
    y: f64,
    xx: f64,
    yy: f64,
    xy: f64,
    xxx: f64,
    yyy: f64,
    xyy: f64,
    xxy: f64,
}

impl Moments {
    fn accumulate(points: &[Point2]) -> Self {
        let mut m = Moments {
            n: points.len() as f64,
            ..Default::default()
        };
        for p in points {
            let (x, y) = (p.x, p.y);
            m.x += x;
            m.y += y;
            m.xx += x * x;
            m.yy += y * y;
            m.xy += x * y;
            m.xxx += x * x * x;
            m.yyy += y * y * y;
            m.xyy += x * y * y;
            m.xxy += x * x * y;
        }
        m
    }
}

pub struct CircleFitter {
    degenerate_epsilon: f64,
}

impl CircleFitter {
    pub const MIN_POINTS: usize = 3;

    /// Relative determinant threshold below which the system is treated as singular.
    pub const DEFAULT_EPSILON: f64 = 1e-9;

    pub fn new() -> Self {
        Self::with_epsilon(Self::DEFAULT_EPSILON)
    }

    pub fn with_epsilon(degenerate_epsilon: f64) -> Self {
        Self { degenerate_epsilon }
    }

    pub fn fit<P: Planar>(&self, points: &[P]) -> CoreResult<CircleFit> {
        if points.len() < Self::MIN_POINTS {
            return Err(CoreError::NotEnoughPoints {
                required: Self::MIN_POINTS,
                actual: points.len(),
            });
        }

        let positions: Vec<Point2> = points.iter().map(Planar::position).collect();
        let m = Moments::accumulate(&positions);

        let a = m.n * m.xx - m.x * m.x;
        let b = m.n * m.xy - m.x * m.y;
        let c = m.n * m.yy - m.y * m.y;
        let d = 0.5 * (m.n * m.xyy - m.x * m.yy + m.n * m.xxx - m.x * m.xx);
        let e = 0.5 * (m.n * m.xxy - m.y * m.xx + m.n * m.yyy - m.y * m.yy);

        let det = a * c - b * b;
        // det is the product of the scatter eigenvalues, (a + c)^2 bounds it from above
        let scale = (a + c) * (a + c);
        if !det.is_finite() || det.abs() <= self.degenerate_epsilon * scale {
            return Err(CoreError::DegenerateFit { determinant: det });
        }

        let center = Point2::new((d * c - b * e) / det, (a * e - b * d) / det);
        let distances: Vec<f64> = positions.iter().map(|p| p.distance(&center)).collect();
        let radius = StatsHelper::mean(&distances);
        let residuals: Vec<f64> = distances.iter().map(|r| r - radius).collect();

        Ok(CircleFit {
            center,
            radius,
            rms_residual: StatsHelper::rms(&residuals),
        })
    }
}

impl Default for CircleFitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::f64::consts::PI;

    fn circle_points(cx: f64, cy: f64, r: f64, count: usize, span: f64) -> Vec<Point2> {
        (0..count)
            .map(|i| {
                let t = span * i as f64 / count as f64;
                Point2::new(cx + r * t.cos(), cy + r * t.sin())
            })
            .collect()
    }

    #[test]
    fn recovers_exact_circle() {
        let points = circle_points(100.0, 200.0, 50.0, 12, 2.0 * PI);
        let fit = CircleFitter::new().fit(&points).unwrap();
        assert!((fit.center.x - 100.0).abs() < 1e-3);
        assert!((fit.center.y - 200.0).abs() < 1e-3);
        assert!((fit.radius - 50.0).abs() < 1e-3);
        assert!(fit.rms_residual < 1e-6);
    }

    #[test]
    fn recovers_partial_arc_far_from_origin() {
        // a scanner only sees the near side of a trunk
        let points = circle_points(2500.0, -800.0, 180.0, 20, PI / 2.0);
        let fit = CircleFitter::new().fit(&points).unwrap();
        assert!(fit.center.distance(&Point2::new(2500.0, -800.0)) < 1e-3);
        assert!((fit.radius - 180.0).abs() < 1e-3);
    }

    #[test]
    fn tolerates_measurement_noise() {
        let mut rng = StdRng::seed_from_u64(21);
        let points: Vec<Point2> = circle_points(0.0, 1500.0, 150.0, 30, PI)
            .into_iter()
            .map(|p| Point2::new(p.x + rng.gen_range(-3.0..3.0), p.y + rng.gen_range(-3.0..3.0)))
            .collect();
        let fit = CircleFitter::new().fit(&points).unwrap();
        assert!(fit.center.distance(&Point2::new(0.0, 1500.0)) < 10.0);
        assert!((fit.radius - 150.0).abs() < 10.0);
        assert!(fit.rms_residual > 0.0);
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let points = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
        ];
        assert!(matches!(
            CircleFitter::new().fit(&points),
            Err(CoreError::DegenerateFit { .. })
        ));

        let vertical: Vec<Point2> = (0..5).map(|i| Point2::new(1200.0, i as f64 * 40.0)).collect();
        assert!(matches!(
            CircleFitter::new().fit(&vertical),
            Err(CoreError::DegenerateFit { .. })
        ));
    }

    #[test]
    fn wall_seen_through_polar_projection_is_degenerate() {
        let wall: Vec<Point2> = (0..51)
            .map(|i| {
                let (x, y): (f64, f64) = (-500.0 + i as f64 * 20.0, 3000.0);
                let (angle, distance) = (y.atan2(x), x.hypot(y));
                Point2::new(distance * angle.cos(), distance * angle.sin())
            })
            .collect();
        assert!(matches!(
            CircleFitter::new().fit(&wall),
            Err(CoreError::DegenerateFit { .. })
        ));
    }

    #[test]
    fn coincident_points_are_degenerate() {
        let points = vec![Point2::new(5.0, 5.0); 4];
        assert!(matches!(
            CircleFitter::new().fit(&points),
            Err(CoreError::DegenerateFit { .. })
        ));
    }

    #[test]
    fn needs_three_points() {
        let points = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        assert_eq!(
            CircleFitter::new().fit(&points).unwrap_err(),
            CoreError::NotEnoughPoints {
                required: 3,
                actual: 2
            }
        );
    }
}
