use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use trunkcore::prelude::{DetectionParams, HeightPacketParams, ScanParams, ScanRange};
use trunkcore::sensor_interface::HeightCalibration;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub scan: ScanParams,
    pub range: ScanRange,
    pub detection: DetectionParams,
    pub height: HeightPacketParams,
    pub calibration: HeightCalibration,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config
            .validate()
            .with_context(|| format!("validating workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(
        min_range_mm: f64,
        max_range_mm: f64,
        eps_mm: f64,
        min_points: usize,
        min_radius_mm: f64,
        max_radius_mm: f64,
    ) -> Self {
        Self {
            range: ScanRange::new(min_range_mm, max_range_mm),
            detection: DetectionParams {
                eps_mm,
                min_points,
                min_radius_mm,
                max_radius_mm,
            },
            ..Default::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.scan.validate().context("scan parameters")?;
        self.range.validate().context("scan range")?;
        self.detection.validate().context("detection parameters")?;
        self.height.validate().context("height packet parameters")?;
        Ok(())
    }
}
