//! Point-sensor packet format.
//!
//! Packet format (big-endian):
//! - Start marker (1 byte, 0xAA)
//! - Header (9 bytes, not interpreted)
//! - Records (15 bytes each) until fewer than a full stride remains:
//!   - Distance (2 bytes) mm
//!   - Noise (2 bytes)
//!   - Peak intensity (4 bytes)
//!   - Confidence (1 byte)
//!   - Integration count (4 bytes)
//!   - Reference time of flight (2 bytes)

use crate::prelude::{CoreError, CoreResult, HeightPacketParams, SensorDecoder};
use crate::telemetry::log::LogManager;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

const DISTANCE: usize = 0;
const NOISE: usize = 2;
const PEAK_INTENSITY: usize = 4;
const CONFIDENCE: usize = 8;
const INTEGRATION_COUNT: usize = 9;
const REFERENCE_TOF: usize = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightMeasurement {
    pub distance_mm: u16,
    pub noise: u16,
    pub peak_intensity: u32,
    pub confidence: u8,
    pub integration_count: u32,
    pub reference_tof: u16,
    pub timestamp_ms: u64,
}

impl HeightMeasurement {
    fn parse(record: &[u8], timestamp_ms: u64) -> Self {
        Self {
            distance_mm: be_u16(record, DISTANCE),
            noise: be_u16(record, NOISE),
            peak_intensity: be_u32(record, PEAK_INTENSITY),
            confidence: record[CONFIDENCE],
            integration_count: be_u32(record, INTEGRATION_COUNT),
            reference_tof: be_u16(record, REFERENCE_TOF),
            timestamp_ms,
        }
    }

    fn write(&self, record: &mut [u8]) {
        record[DISTANCE..DISTANCE + 2].copy_from_slice(&self.distance_mm.to_be_bytes());
        record[NOISE..NOISE + 2].copy_from_slice(&self.noise.to_be_bytes());
        record[PEAK_INTENSITY..PEAK_INTENSITY + 4]
            .copy_from_slice(&self.peak_intensity.to_be_bytes());
        record[CONFIDENCE] = self.confidence;
        record[INTEGRATION_COUNT..INTEGRATION_COUNT + 4]
            .copy_from_slice(&self.integration_count.to_be_bytes());
        record[REFERENCE_TOF..REFERENCE_TOF + 2].copy_from_slice(&self.reference_tof.to_be_bytes());
    }
}

/// Linear calibration from raw distance to height, gated on confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightCalibration {
    pub mount_offset_mm: f64,
    pub scale: f64,
    pub min_confidence: u8,
}

impl Default for HeightCalibration {
    fn default() -> Self {
        Self {
            mount_offset_mm: 0.0,
            scale: 1.0,
            min_confidence: 0,
        }
    }
}

impl HeightCalibration {
    /// Calibrated height in mm, or `None` for low-confidence readings.
    pub fn height_mm(&self, measurement: &HeightMeasurement) -> Option<f64> {
        if measurement.confidence < self.min_confidence {
            return None;
        }
        Some(self.mount_offset_mm + self.scale * f64::from(measurement.distance_mm))
    }
}

pub struct HeightPacketDecoder {
    params: HeightPacketParams,
    logger: LogManager,
}

impl HeightPacketDecoder {
    pub fn new(params: HeightPacketParams) -> CoreResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            logger: LogManager::new("height-packet"),
        })
    }

    pub fn params(&self) -> &HeightPacketParams {
        &self.params
    }

    /// Decodes a packet, stamping measurements with the current wall-clock time.
    pub fn decode(&self, packet: &[u8]) -> CoreResult<Vec<HeightMeasurement>> {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        self.decode_at(packet, timestamp_ms)
    }

    pub fn decode_at(&self, packet: &[u8], timestamp_ms: u64) -> CoreResult<Vec<HeightMeasurement>> {
        let first = *packet.first().ok_or(CoreError::IncompleteData {
            expected: 1,
            actual: 0,
        })?;
        if first != self.params.start_marker {
            return Err(CoreError::Framing(format!(
                "start marker 0x{:02X}, expected 0x{:02X}",
                first, self.params.start_marker
            )));
        }

        let stride = self.params.record_stride;
        let mut measurements = Vec::new();
        let mut offset = self.params.first_record_offset;
        while offset + stride <= packet.len() {
            measurements.push(HeightMeasurement::parse(
                &packet[offset..offset + stride],
                timestamp_ms,
            ));
            offset += stride;
        }

        self.logger.detail(&format!(
            "decoded {} height records from {} bytes",
            measurements.len(),
            packet.len()
        ));
        Ok(measurements)
    }

    /// Writes measurements into a zero-filled packet of the configured size.
    pub fn encode_packet(&self, measurements: &[HeightMeasurement]) -> CoreResult<Vec<u8>> {
        let params = &self.params;
        let capacity = params
            .packet_size
            .saturating_sub(params.first_record_offset)
            / params.record_stride;
        if measurements.len() > capacity {
            return Err(CoreError::InvalidParameter(format!(
                "{} records exceed packet capacity of {}",
                measurements.len(),
                capacity
            )));
        }

        let mut packet = vec![0u8; params.packet_size.max(1)];
        packet[0] = params.start_marker;
        for (index, measurement) in measurements.iter().enumerate() {
            let offset = params.first_record_offset + index * params.record_stride;
            measurement.write(&mut packet[offset..offset + HeightPacketParams::RECORD_FIELDS_LEN]);
        }
        Ok(packet)
    }
}

impl SensorDecoder for HeightPacketDecoder {
    type Input = [u8];
    type Output = Vec<HeightMeasurement>;

    fn sensor_name(&self) -> &'static str {
        "height"
    }

    fn decode(&self, input: &[u8]) -> CoreResult<Vec<HeightMeasurement>> {
        HeightPacketDecoder::decode(self, input)
    }
}

fn be_u16(record: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([record[at], record[at + 1]])
}

fn be_u32(record: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([record[at], record[at + 1], record[at + 2], record[at + 3]])
}
