//! Scan-response frames from the scanning rangefinder.
//!
//! A standard frame is laid out as:
//! - Command echo (12 characters) + line feed
//! - Status (2 characters + checksum) + line feed
//! - Timestamp (4 characters + checksum) + line feed
//! - Data lines: 64 encoded characters + checksum + line feed, the last line shorter
//! - Trailing line feed
//!
//! The line feed at offset 12 is taken as the marker; the payload starts after
//! its third occurrence.

use crate::math::geometry::{Planar, Point2};
use crate::prelude::{CoreError, CoreResult, ScanParams, SensorDecoder};
use crate::sensor_interface::range_codec::RangeValueCodec;
use crate::telemetry::log::LogManager;
use serde::{Deserialize, Serialize};

const GROUP_WIDTH: usize = 3;
const COMMAND_ECHO: &str = "GD0044072501";
const STATUS_OK: &str = "00";
const TIMESTAMP: &str = "0000";

/// One decoded beam: polar reading plus its Cartesian projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeSample {
    pub angle_rad: f64,
    pub distance_mm: f64,
    pub x: f64,
    pub y: f64,
}

impl RangeSample {
    pub fn from_polar(angle_rad: f64, distance_mm: f64) -> Self {
        Self {
            angle_rad,
            distance_mm,
            x: distance_mm * angle_rad.cos(),
            y: distance_mm * angle_rad.sin(),
        }
    }

    pub fn angle_deg(&self) -> f64 {
        self.angle_rad.to_degrees()
    }
}

impl Planar for RangeSample {
    fn position(&self) -> Point2 {
        Point2::new(self.x, self.y)
    }
}

/// Decoder for fixed-length scan-response frames.
pub struct ScanFrameDecoder {
    params: ScanParams,
    logger: LogManager,
}

impl ScanFrameDecoder {
    pub fn new(params: ScanParams) -> CoreResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            logger: LogManager::new("scan-frame"),
        })
    }

    pub fn params(&self) -> &ScanParams {
        &self.params
    }

    /// Decodes a frame into samples ordered by increasing angle.
    pub fn decode(&self, frame: &str) -> CoreResult<Vec<RangeSample>> {
        let distances = self.decode_distances(frame)?;
        let samples: Vec<RangeSample> = distances
            .iter()
            .take(self.params.total_points)
            .enumerate()
            .map(|(index, &distance)| self.sample_at(index, f64::from(distance)))
            .collect();

        self.logger.detail(&format!(
            "decoded {} samples from {} distance groups",
            samples.len(),
            distances.len()
        ));
        Ok(samples)
    }

    /// Raw distances in frame order, before angular projection.
    pub fn decode_distances(&self, frame: &str) -> CoreResult<Vec<u32>> {
        let bytes = frame.as_bytes();
        if bytes.len() < self.params.expected_frame_size {
            return Err(CoreError::IncompleteFrame {
                expected: self.params.expected_frame_size,
                actual: bytes.len(),
            });
        }

        let payload = self.locate_payload(bytes)?;
        let data = self.reorganize(payload);

        data.chunks_exact(GROUP_WIDTH)
            .enumerate()
            .map(|(index, group)| {
                RangeValueCodec::decode(group).map_err(|err| CoreError::Format {
                    index,
                    reason: format!("distance group {}: {}", index, err),
                })
            })
            .collect()
    }

    /// Sample for beam `index`; the angle depends only on the index.
    pub fn sample_at(&self, index: usize, distance_mm: f64) -> RangeSample {
        let angle_deg = self.params.start_angle_deg + index as f64 * self.params.angle_step_deg();
        RangeSample::from_polar(angle_deg.to_radians(), distance_mm)
    }

    /// Writes a standard-layout frame carrying `distances`.
    ///
    /// Beams beyond `distances.len()` are written as 0 (no echo).
    pub fn encode_frame(&self, distances: &[u32]) -> CoreResult<String> {
        let params = &self.params;
        let line_len = params.block_data_end;
        if params.marker_offset != COMMAND_ECHO.len()
            || params.marker_count != 3
            || params.block_data_start != 0
            || params.block_len != line_len + 2
        {
            return Err(CoreError::InvalidParameter(
                "frame writer supports the standard line layout only".into(),
            ));
        }
        if distances.len() > params.total_points {
            return Err(CoreError::InvalidParameter(format!(
                "{} distances exceed {} beams",
                distances.len(),
                params.total_points
            )));
        }

        let mut data = String::with_capacity(params.total_points * GROUP_WIDTH);
        for index in 0..params.total_points {
            let distance = distances.get(index).copied().unwrap_or(0);
            data.push_str(&RangeValueCodec::encode(distance, GROUP_WIDTH)?);
        }
        let line_count = data.len().div_ceil(line_len);
        if line_count > params.block_count {
            return Err(CoreError::InvalidParameter(format!(
                "{} data lines exceed {} blocks",
                line_count, params.block_count
            )));
        }

        let mut frame = String::with_capacity(params.expected_frame_size);
        frame.push_str(COMMAND_ECHO);
        frame.push('\n');
        for field in [STATUS_OK, TIMESTAMP] {
            push_line(&mut frame, field.as_bytes());
        }
        for line in data.as_bytes().chunks(line_len) {
            push_line(&mut frame, line);
        }
        frame.push('\n');
        Ok(frame)
    }

    fn locate_payload<'a>(&self, frame: &'a [u8]) -> CoreResult<&'a [u8]> {
        let marker = frame[self.params.marker_offset];
        let marker_position = frame
            .iter()
            .enumerate()
            .filter(|(_, byte)| **byte == marker)
            .map(|(position, _)| position)
            .nth(self.params.marker_count - 1)
            .ok_or_else(|| {
                CoreError::Framing(format!(
                    "fewer than {} occurrences of marker 0x{:02X}",
                    self.params.marker_count, marker
                ))
            })?;

        let end = frame.len() - 1;
        Ok(frame.get(marker_position + 1..end).unwrap_or(&[]))
    }

    fn reorganize(&self, payload: &[u8]) -> Vec<u8> {
        let params = &self.params;
        let mut data = Vec::with_capacity(params.block_count * params.block_data_end);
        for block in 0..params.block_count {
            let base = block * params.block_len;
            let start = base + params.block_data_start;
            if start >= payload.len() {
                break;
            }
            let end = (base + params.block_data_end).min(payload.len());
            data.extend_from_slice(&payload[start..end]);
        }
        data
    }
}

impl SensorDecoder for ScanFrameDecoder {
    type Input = str;
    type Output = Vec<RangeSample>;

    fn sensor_name(&self) -> &'static str {
        "scan"
    }

    fn decode(&self, input: &str) -> CoreResult<Vec<RangeSample>> {
        ScanFrameDecoder::decode(self, input)
    }
}

fn push_line(frame: &mut String, line: &[u8]) {
    frame.extend(line.iter().map(|&b| char::from(b)));
    frame.push(char::from(RangeValueCodec::line_checksum(line)));
    frame.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder() -> ScanFrameDecoder {
        ScanFrameDecoder::new(ScanParams::default()).unwrap()
    }

    #[test]
    fn standard_frame_has_expected_length() {
        let frame = decoder().encode_frame(&[1000; 682]).unwrap();
        assert_eq!(frame.len(), 2134);
        assert_eq!(frame.as_bytes()[12], b'\n');
    }

    #[test]
    fn well_formed_frame_yields_full_scan() {
        let decoder = decoder();
        let distances: Vec<u32> = (0..682).map(|i| 500 + i as u32).collect();
        let frame = decoder.encode_frame(&distances).unwrap();

        let samples = decoder.decode(&frame).unwrap();
        assert_eq!(samples.len(), 682);
        assert_eq!(samples[0].distance_mm, 500.0);
        assert_eq!(samples[681].distance_mm, 1181.0);

        assert!((samples[0].angle_deg() + 120.0).abs() < 1e-9);
        let last = 120.0 - 240.0 / 682.0;
        assert!((samples[681].angle_deg() - last).abs() < 1e-9);
        assert!(samples
            .windows(2)
            .all(|pair| pair[0].angle_rad < pair[1].angle_rad));
    }

    #[test]
    fn samples_project_onto_plane() {
        let decoder = decoder();
        let frame = decoder.encode_frame(&[2000; 682]).unwrap();
        let samples = decoder.decode(&frame).unwrap();
        // beam 341 sits at 0 degrees
        let ahead = samples[341];
        assert!((ahead.x - 2000.0).abs() < 1e-9);
        assert!(ahead.y.abs() < 1e-9);
        for sample in &samples {
            assert!((sample.x.hypot(sample.y) - 2000.0).abs() < 1e-6);
        }
    }

    #[test]
    fn short_frame_is_incomplete() {
        let frame = decoder().encode_frame(&[1000; 682]).unwrap();
        let err = decoder().decode(&frame[..2000]).unwrap_err();
        assert_eq!(
            err,
            CoreError::IncompleteFrame {
                expected: 2134,
                actual: 2000
            }
        );
    }

    #[test]
    fn missing_markers_fail_framing() {
        let mut frame = "X".repeat(12);
        frame.push('#');
        frame.push_str(&"0".repeat(2134 - 13));
        let err = decoder().decode(&frame).unwrap_err();
        assert!(matches!(err, CoreError::Framing(_)));
    }

    #[test]
    fn invalid_character_reports_group_index() {
        let decoder = decoder();
        let frame = decoder.encode_frame(&[1000; 682]).unwrap();
        // payload starts at 23; corrupt the first character of group 2
        let mut bytes = frame.into_bytes();
        bytes[23 + 6] = b'~';
        let frame = String::from_utf8(bytes).unwrap();

        match decoder.decode(&frame).unwrap_err() {
            CoreError::Format { index, .. } => assert_eq!(index, 2),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn extra_groups_beyond_beam_count_are_dropped() {
        let params = ScanParams {
            total_points: 600,
            ..Default::default()
        };
        let wide = decoder().encode_frame(&[750; 682]).unwrap();
        let samples = ScanFrameDecoder::new(params).unwrap().decode(&wide).unwrap();
        assert_eq!(samples.len(), 600);
    }

    #[test]
    fn angles_do_not_depend_on_distances() {
        let decoder = decoder();
        let near = decoder
            .decode(&decoder.encode_frame(&[100; 682]).unwrap())
            .unwrap();
        let far = decoder
            .decode(&decoder.encode_frame(&[3000; 682]).unwrap())
            .unwrap();
        for (a, b) in near.iter().zip(&far) {
            assert_eq!(a.angle_rad, b.angle_rad);
        }
    }
}
