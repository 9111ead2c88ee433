use crate::workflow::config::WorkflowConfig;
use anyhow::Context;
use trunkcore::prelude::{CoreError, SensorDecoder};
use trunkcore::processing::{DetectedObject, DetectionPipeline};
use trunkcore::sensor_interface::{
    HeightMeasurement, HeightPacketDecoder, RangeSample, ScanFrameDecoder,
};

pub struct ScanCycle {
    pub samples: Vec<RangeSample>,
    pub detections: Vec<DetectedObject>,
    /// Set when too few in-range samples remained to cluster.
    pub insufficient: Option<String>,
}

pub struct HeightCycle {
    pub measurements: Vec<HeightMeasurement>,
    pub heights_mm: Vec<Option<f64>>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    pub fn execute_scan(&self, frame: &str) -> anyhow::Result<ScanCycle> {
        let decoder =
            ScanFrameDecoder::new(self.config.scan.clone()).context("configuring scan decoder")?;
        let samples = decode_with(&decoder, frame)?;

        let pipeline = DetectionPipeline::new(self.config.range, self.config.detection)
            .context("configuring detection pipeline")?;
        let (detections, insufficient) = match pipeline.try_run(&samples) {
            Ok(detections) => (detections, None),
            Err(err @ CoreError::InsufficientPoints { .. }) => (Vec::new(), Some(err.to_string())),
            Err(err) => return Err(err).context("running detection pipeline"),
        };

        Ok(ScanCycle {
            samples,
            detections,
            insufficient,
        })
    }

    pub fn execute_height(&self, packet: &[u8]) -> anyhow::Result<HeightCycle> {
        let decoder =
            HeightPacketDecoder::new(self.config.height).context("configuring height decoder")?;
        let measurements = decode_with(&decoder, packet)?;
        let heights_mm = measurements
            .iter()
            .map(|m| self.config.calibration.height_mm(m))
            .collect();

        Ok(HeightCycle {
            measurements,
            heights_mm,
        })
    }
}

fn decode_with<D: SensorDecoder>(decoder: &D, input: &D::Input) -> anyhow::Result<D::Output> {
    decoder
        .decode(input)
        .with_context(|| format!("decoding {} input", decoder.sensor_name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::scene::{build_height_packet, build_scan_frame, SceneConfig};

    #[test]
    fn runner_detects_generated_trunks() {
        let cfg = WorkflowConfig::default();
        let runner = Runner::new(cfg.clone());
        let scene = SceneConfig::default();
        let frame = build_scan_frame(&scene, &cfg.scan, 0).unwrap();

        let cycle = runner.execute_scan(&frame).unwrap();
        assert_eq!(cycle.samples.len(), cfg.scan.total_points);
        assert!(cycle.insufficient.is_none());
        assert_eq!(cycle.detections.len(), scene.trunks.len());
    }

    #[test]
    fn runner_reports_decode_failure_with_context() {
        let runner = Runner::new(WorkflowConfig::default());
        let err = runner.execute_scan("too short").err().unwrap();
        assert!(format!("{:#}", err).contains("decoding scan input"));
        assert!(err.downcast_ref::<CoreError>().is_some());
    }

    #[test]
    fn runner_flags_empty_scan_as_insufficient() {
        let cfg = WorkflowConfig::default();
        let runner = Runner::new(cfg.clone());
        let frame = ScanFrameDecoder::new(cfg.scan)
            .unwrap()
            .encode_frame(&[])
            .unwrap();

        let cycle = runner.execute_scan(&frame).unwrap();
        assert!(cycle.detections.is_empty());
        assert!(cycle.insufficient.is_some());
    }

    #[test]
    fn runner_calibrates_heights() {
        let cfg = WorkflowConfig::default();
        let runner = Runner::new(cfg.clone());
        let packet = build_height_packet(&SceneConfig::default(), &cfg.height, 0).unwrap();

        let cycle = runner.execute_height(&packet).unwrap();
        assert_eq!(cycle.measurements.len(), 12);
        assert_eq!(cycle.heights_mm.len(), 12);
        assert!(cycle.heights_mm.iter().all(Option::is_some));
    }
}
