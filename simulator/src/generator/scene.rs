use anyhow::Context;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use trunkcore::prelude::{HeightPacketParams, ScanParams};
use trunkcore::sensor_interface::{
    HeightMeasurement, HeightPacketDecoder, RangeValueCodec, ScanFrameDecoder,
};

/// Cross-section of one trunk in the scan plane, sensor at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrunkSpec {
    pub x_mm: f64,
    pub y_mm: f64,
    pub radius_mm: f64,
}

/// Configuration for generating synthetic sensor data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub trunks: Vec<TrunkSpec>,
    /// Range reported by beams that hit no trunk; 0 means no echo.
    pub background_mm: f64,
    pub noise_mm: f64,
    /// Probability that a beam returns no echo.
    pub dropout: f64,
    pub ground_distance_mm: f64,
    pub seed: u64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            trunks: vec![
                TrunkSpec {
                    x_mm: -400.0,
                    y_mm: 1500.0,
                    radius_mm: 150.0,
                },
                TrunkSpec {
                    x_mm: 700.0,
                    y_mm: 2200.0,
                    radius_mm: 220.0,
                },
            ],
            background_mm: 0.0,
            noise_mm: 4.0,
            dropout: 0.01,
            ground_distance_mm: 1200.0,
            seed: 0,
        }
    }
}

impl SceneConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading scene {}", path_ref.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing scene {}", path_ref.display()))
    }

    fn rng(&self, cycle: u64) -> StdRng {
        StdRng::seed_from_u64(self.seed.wrapping_add(cycle))
    }

    fn jitter(&self, rng: &mut StdRng) -> f64 {
        if self.noise_mm > 0.0 {
            rng.gen_range(-self.noise_mm..self.noise_mm)
        } else {
            0.0
        }
    }
}

/// Distance along the ray at `angle_rad` to the nearest trunk surface.
pub fn ray_distance(angle_rad: f64, trunks: &[TrunkSpec]) -> Option<f64> {
    let (dx, dy) = (angle_rad.cos(), angle_rad.sin());
    trunks
        .iter()
        .filter_map(|trunk| {
            let along = dx * trunk.x_mm + dy * trunk.y_mm;
            let center_sq = trunk.x_mm * trunk.x_mm + trunk.y_mm * trunk.y_mm;
            let discriminant = along * along - (center_sq - trunk.radius_mm * trunk.radius_mm);
            if discriminant < 0.0 {
                return None;
            }
            let t = along - discriminant.sqrt();
            (t > 0.0).then_some(t)
        })
        .min_by(|a, b| a.total_cmp(b))
}

fn scene_distances(config: &SceneConfig, scan: &ScanParams, rng: &mut StdRng) -> Vec<u32> {
    let max_value = f64::from(RangeValueCodec::max_value(3));
    (0..scan.total_points)
        .map(|index| {
            let angle_deg = scan.start_angle_deg + index as f64 * scan.angle_step_deg();
            let hit = ray_distance(angle_deg.to_radians(), &config.trunks);
            let dropped = config.dropout > 0.0 && rng.gen_bool(config.dropout.min(1.0));
            match hit {
                _ if dropped => 0,
                Some(distance) => (distance + config.jitter(rng)).clamp(0.0, max_value) as u32,
                None => config.background_mm.clamp(0.0, max_value) as u32,
            }
        })
        .collect()
}

pub fn build_scan_frame(config: &SceneConfig, scan: &ScanParams, cycle: u64) -> anyhow::Result<String> {
    let decoder = ScanFrameDecoder::new(scan.clone()).context("configuring frame writer")?;
    let mut rng = config.rng(cycle);
    let distances = scene_distances(config, scan, &mut rng);
    decoder
        .encode_frame(&distances)
        .with_context(|| format!("encoding synthetic scan frame {}", cycle))
}

pub fn build_height_packet(
    config: &SceneConfig,
    params: &HeightPacketParams,
    cycle: u64,
) -> anyhow::Result<Vec<u8>> {
    let encoder = HeightPacketDecoder::new(*params).context("configuring packet writer")?;
    let record_count = params
        .packet_size
        .saturating_sub(params.first_record_offset)
        .checked_div(params.record_stride)
        .context("record stride of zero")?;

    let mut rng = config.rng(cycle);
    let measurements: Vec<HeightMeasurement> = (0..record_count)
        .map(|_| {
            let distance = (config.ground_distance_mm + config.jitter(&mut rng))
                .clamp(0.0, f64::from(u16::MAX));
            HeightMeasurement {
                distance_mm: distance as u16,
                noise: rng.gen_range(0..40),
                peak_intensity: rng.gen_range(10_000..200_000),
                confidence: rng.gen_range(150..=255),
                integration_count: rng.gen_range(1..1_000),
                reference_tof: rng.gen_range(900..1_100),
                timestamp_ms: 0,
            }
        })
        .collect();

    encoder
        .encode_packet(&measurements)
        .with_context(|| format!("encoding synthetic height packet {}", cycle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;
    use trunkcore::prelude::ScanRange;
    use trunkcore::processing::detect_trunks;

    #[test]
    fn ray_hits_near_surface() {
        let trunk = TrunkSpec {
            x_mm: 0.0,
            y_mm: 1000.0,
            radius_mm: 100.0,
        };
        let distance = ray_distance(FRAC_PI_2, &[trunk]).unwrap();
        assert!((distance - 900.0).abs() < 1e-9);
        assert!(ray_distance(0.0, &[trunk]).is_none());
    }

    #[test]
    fn nearer_trunk_occludes_farther_one() {
        let near = TrunkSpec {
            x_mm: 0.0,
            y_mm: 800.0,
            radius_mm: 100.0,
        };
        let far = TrunkSpec {
            x_mm: 0.0,
            y_mm: 2000.0,
            radius_mm: 300.0,
        };
        let distance = ray_distance(FRAC_PI_2, &[far, near]).unwrap();
        assert!((distance - 700.0).abs() < 1e-9);
    }

    #[test]
    fn generated_frame_is_reproducible() {
        let scene = SceneConfig::default();
        let scan = ScanParams::default();
        let first = build_scan_frame(&scene, &scan, 4).unwrap();
        let second = build_scan_frame(&scene, &scan, 4).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), scan.expected_frame_size);
    }

    #[test]
    fn generated_scene_is_detected() {
        let scene = SceneConfig::default();
        let scan = ScanParams::default();
        let frame = build_scan_frame(&scene, &scan, 1).unwrap();
        let samples = ScanFrameDecoder::new(scan).unwrap().decode(&frame).unwrap();

        let detections =
            detect_trunks(&samples, ScanRange::default(), Default::default()).unwrap();
        assert_eq!(detections.len(), 2);
        for trunk in &scene.trunks {
            assert!(
                detections.iter().any(|d| {
                    (d.center.x - trunk.x_mm).abs() < 40.0
                        && (d.center.y - trunk.y_mm).abs() < 40.0
                        && (d.radius - trunk.radius_mm).abs() < 40.0
                }),
                "trunk {:?} not detected",
                trunk
            );
        }
    }

    #[test]
    fn height_packet_fills_every_record() {
        let params = HeightPacketParams::default();
        let packet = build_height_packet(&SceneConfig::default(), &params, 0).unwrap();
        assert_eq!(packet.len(), 195);
        assert_eq!(packet[0], 0xAA);

        let decoded = HeightPacketDecoder::new(params)
            .unwrap()
            .decode_at(&packet, 0)
            .unwrap();
        assert_eq!(decoded.len(), 12);
        assert!(decoded
            .iter()
            .all(|m| (m.distance_mm as f64 - 1200.0).abs() <= 4.0));
    }
}
