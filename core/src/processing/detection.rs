use crate::math::geometry::Point2;
use crate::prelude::{CoreError, CoreResult, DetectionParams, ScanRange};
use crate::processing::circle_fit::CircleFitter;
use crate::processing::clustering::SpatialClusterer;
use crate::sensor_interface::RangeSample;
use crate::telemetry::log::LogManager;
use serde::{Deserialize, Serialize};

/// Trunk candidate accepted by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    pub center: Point2,
    pub radius: f64,
    pub diameter: f64,
    #[serde(default, skip_serializing)]
    pub members: Vec<RangeSample>,
}

/// Filter, cluster and fit stage turning one scan into trunk detections.
pub struct DetectionPipeline {
    range: ScanRange,
    params: DetectionParams,
    clusterer: SpatialClusterer,
    fitter: CircleFitter,
    logger: LogManager,
}

impl DetectionPipeline {
    pub fn new(range: ScanRange, params: DetectionParams) -> CoreResult<Self> {
        range.validate()?;
        params.validate()?;
        Ok(Self {
            range,
            params,
            clusterer: SpatialClusterer::from_params(&params),
            fitter: CircleFitter::new(),
            logger: LogManager::new("detection"),
        })
    }

    pub fn range(&self) -> &ScanRange {
        &self.range
    }

    pub fn params(&self) -> &DetectionParams {
        &self.params
    }

    /// Runs detection, treating too few in-range samples as an empty scan.
    pub fn run(&self, samples: &[RangeSample]) -> Vec<DetectedObject> {
        match self.try_run(samples) {
            Ok(detections) => detections,
            Err(err) => {
                self.logger.detail(&err.to_string());
                Vec::new()
            }
        }
    }

    /// Like [`run`](Self::run) but reports `InsufficientPoints` instead of
    /// returning an empty list.
    pub fn try_run(&self, samples: &[RangeSample]) -> CoreResult<Vec<DetectedObject>> {
        let in_range: Vec<RangeSample> = samples
            .iter()
            .filter(|sample| self.range.contains(sample.distance_mm))
            .copied()
            .collect();
        if in_range.len() < self.params.min_points {
            return Err(CoreError::InsufficientPoints {
                required: self.params.min_points,
                actual: in_range.len(),
            });
        }

        let clusters = self.clusterer.cluster(&in_range);
        let mut detections = Vec::new();
        for members in clusters.collect(&in_range) {
            if members.len() < self.params.min_points {
                continue;
            }
            let fit = match self.fitter.fit(&members) {
                Ok(fit) => fit,
                Err(err) => {
                    self.logger
                        .detail(&format!("cluster of {} rejected: {}", members.len(), err));
                    continue;
                }
            };
            if !self.params.accepts_radius(fit.radius) {
                self.logger.detail(&format!(
                    "cluster of {} rejected: radius {:.1} mm outside bounds",
                    members.len(),
                    fit.radius
                ));
                continue;
            }
            detections.push(DetectedObject {
                center: fit.center,
                radius: fit.radius,
                diameter: 2.0 * fit.radius,
                members,
            });
        }

        self.logger.record(&format!(
            "{} in-range samples, {} clusters, {} detections",
            in_range.len(),
            clusters.len(),
            detections.len()
        ));
        Ok(detections)
    }
}

/// One-shot detection with explicit parameter records.
pub fn detect_trunks(
    samples: &[RangeSample],
    range: ScanRange,
    params: DetectionParams,
) -> CoreResult<Vec<DetectedObject>> {
    Ok(DetectionPipeline::new(range, params)?.run(samples))
}
