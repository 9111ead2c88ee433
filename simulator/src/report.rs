use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use trunkcore::processing::DetectedObject;
use trunkcore::sensor_interface::HeightMeasurement;
use trunkcore::telemetry::Metrics;

/// One line of the session report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    ScanDetections {
        cycle: usize,
        sample_count: usize,
        detections: Vec<DetectedObject>,
    },
    ScanSkipped {
        cycle: usize,
        sample_count: usize,
        reason: String,
    },
    HeightSamples {
        cycle: usize,
        measurements: Vec<HeightMeasurement>,
        heights_mm: Vec<Option<f64>>,
    },
    CycleFailed {
        cycle: usize,
        sensor: String,
        error: String,
    },
    Summary {
        processed: usize,
        errors: usize,
        detections: usize,
        last_detection_count: usize,
    },
}

impl SessionEvent {
    pub fn summary(metrics: Metrics, last_detection_count: usize) -> Self {
        SessionEvent::Summary {
            processed: metrics.processed,
            errors: metrics.errors,
            detections: metrics.detections,
            last_detection_count,
        }
    }
}

/// Appends events to a JSON-lines file.
pub struct ReportWriter {
    path: PathBuf,
    file: File,
}

impl ReportWriter {
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating report directory {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening report {}", path.display()))?;
        Ok(Self { path, file })
    }

    pub fn write(&mut self, event: &SessionEvent) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(event).context("serializing session event")?;
        line.push('\n');
        self.file
            .write_all(line.as_bytes())
            .with_context(|| format!("writing report {}", self.path.display()))
    }
}
