use crate::report::SessionEvent;
use crate::workflow::runner::Runner;
use crate::workflow::source::Frame;
use log::{info, warn};
use trunkcore::processing::DetectedObject;
use trunkcore::sensor_interface::HeightMeasurement;
use trunkcore::telemetry::{Metrics, MetricsRecorder};

/// Detections accepted during one scan cycle.
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub cycle: usize,
    pub detections: Vec<DetectedObject>,
}

/// Mutable state of one field session. Cycles are processed one at a time.
pub struct Session {
    runner: Runner,
    cycle: usize,
    last_detections: Vec<DetectedObject>,
    history: Vec<ScanRecord>,
    heights: Vec<HeightMeasurement>,
    metrics: MetricsRecorder,
}

impl Session {
    pub fn new(runner: Runner) -> Self {
        Self {
            runner,
            cycle: 0,
            last_detections: Vec::new(),
            history: Vec::new(),
            heights: Vec::new(),
            metrics: MetricsRecorder::new(),
        }
    }

    /// Detections of the most recent scan cycle; empty after a failed cycle.
    pub fn last_detections(&self) -> &[DetectedObject] {
        &self.last_detections
    }

    pub fn history(&self) -> &[ScanRecord] {
        &self.history
    }

    pub fn heights(&self) -> &[HeightMeasurement] {
        &self.heights
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot()
    }

    pub fn ingest(&mut self, frame: anyhow::Result<Frame>) -> SessionEvent {
        match frame {
            Ok(Frame::Scan(text)) => self.process_scan(&text),
            Ok(Frame::Height(bytes)) => self.process_height(&bytes),
            Err(err) => {
                let cycle = self.next_cycle();
                self.fail(cycle, "source", err)
            }
        }
    }

    pub fn process_scan(&mut self, frame: &str) -> SessionEvent {
        let cycle = self.next_cycle();
        match self.runner.execute_scan(frame) {
            Ok(scan) => {
                self.metrics.record_processed();
                if let Some(reason) = scan.insufficient {
                    self.last_detections.clear();
                    info!("cycle {}: scan skipped ({})", cycle, reason);
                    return SessionEvent::ScanSkipped {
                        cycle,
                        sample_count: scan.samples.len(),
                        reason,
                    };
                }

                self.metrics.record_detections(scan.detections.len());
                info!("cycle {}: {} trunk(s) detected", cycle, scan.detections.len());
                self.last_detections = scan.detections.clone();
                self.history.push(ScanRecord {
                    cycle,
                    detections: scan.detections.clone(),
                });
                SessionEvent::ScanDetections {
                    cycle,
                    sample_count: scan.samples.len(),
                    detections: scan.detections,
                }
            }
            Err(err) => {
                self.last_detections.clear();
                self.fail(cycle, "scan", err)
            }
        }
    }

    pub fn process_height(&mut self, packet: &[u8]) -> SessionEvent {
        let cycle = self.next_cycle();
        match self.runner.execute_height(packet) {
            Ok(height) => {
                self.metrics.record_processed();
                self.heights.extend_from_slice(&height.measurements);
                SessionEvent::HeightSamples {
                    cycle,
                    measurements: height.measurements,
                    heights_mm: height.heights_mm,
                }
            }
            Err(err) => self.fail(cycle, "height", err),
        }
    }

    fn next_cycle(&mut self) -> usize {
        let cycle = self.cycle;
        self.cycle += 1;
        cycle
    }

    fn fail(&self, cycle: usize, sensor: &str, err: anyhow::Error) -> SessionEvent {
        self.metrics.record_error();
        warn!("cycle {}: {} cycle failed: {:#}", cycle, sensor, err);
        SessionEvent::CycleFailed {
            cycle,
            sensor: sensor.to_string(),
            error: format!("{:#}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::scene::{build_height_packet, build_scan_frame, SceneConfig};
    use crate::workflow::config::WorkflowConfig;

    fn session() -> (Session, WorkflowConfig) {
        let cfg = WorkflowConfig::default();
        (Session::new(Runner::new(cfg.clone())), cfg)
    }

    #[test]
    fn successful_scan_replaces_last_detections() {
        let (mut session, cfg) = session();
        let scene = SceneConfig::default();
        let frame = build_scan_frame(&scene, &cfg.scan, 0).unwrap();

        let event = session.process_scan(&frame);
        assert!(matches!(event, SessionEvent::ScanDetections { cycle: 0, .. }));
        assert_eq!(session.last_detections().len(), scene.trunks.len());
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn failed_scan_clears_last_but_keeps_history() {
        let (mut session, cfg) = session();
        let frame = build_scan_frame(&SceneConfig::default(), &cfg.scan, 0).unwrap();
        session.process_scan(&frame);

        let event = session.process_scan(&frame[..100]);
        assert!(matches!(event, SessionEvent::CycleFailed { cycle: 1, .. }));
        assert!(session.last_detections().is_empty());
        assert_eq!(session.history().len(), 1);
        assert!(!session.history()[0].detections.is_empty());

        let metrics = session.metrics();
        assert_eq!(metrics.processed, 1);
        assert_eq!(metrics.errors, 1);
    }

    #[test]
    fn height_packets_accumulate() {
        let (mut session, cfg) = session();
        let packet = build_height_packet(&SceneConfig::default(), &cfg.height, 0).unwrap();
        session.process_height(&packet);
        session.process_height(&packet);
        assert_eq!(session.heights().len(), 24);

        let event = session.process_height(&[0x00; 195]);
        assert!(matches!(event, SessionEvent::CycleFailed { .. }));
        assert_eq!(session.heights().len(), 24);
    }

    #[test]
    fn source_errors_are_reported_as_failed_cycles() {
        let (mut session, _) = session();
        let event = session.ingest(Err(anyhow::anyhow!("device unplugged")));
        match event {
            SessionEvent::CycleFailed { sensor, error, .. } => {
                assert_eq!(sensor, "source");
                assert!(error.contains("unplugged"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
