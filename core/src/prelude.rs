use serde::{Deserialize, Serialize};

/// Layout and angular geometry of a scan-response frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanParams {
    pub expected_frame_size: usize,
    pub marker_offset: usize,
    pub marker_count: usize,
    pub block_count: usize,
    pub block_len: usize,
    /// Retained span inside each block, `[block_data_start, block_data_end)`.
    pub block_data_start: usize,
    pub block_data_end: usize,
    pub total_points: usize,
    pub start_angle_deg: f64,
    pub end_angle_deg: f64,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            expected_frame_size: 2134,
            marker_offset: 12,
            marker_count: 3,
            block_count: 32,
            block_len: 66,
            block_data_start: 0,
            block_data_end: 64,
            total_points: 682,
            start_angle_deg: -120.0,
            end_angle_deg: 120.0,
        }
    }
}

impl ScanParams {
    pub fn validate(&self) -> CoreResult<()> {
        if self.total_points == 0 {
            return Err(CoreError::InvalidParameter(
                "total_points must be positive".into(),
            ));
        }
        if self.marker_count == 0 || self.marker_offset >= self.expected_frame_size {
            return Err(CoreError::InvalidParameter(format!(
                "marker offset {} outside frame of {}",
                self.marker_offset, self.expected_frame_size
            )));
        }
        if self.block_data_start >= self.block_data_end || self.block_data_end > self.block_len {
            return Err(CoreError::InvalidParameter(format!(
                "block data span [{}, {}) does not fit a {}-character block",
                self.block_data_start, self.block_data_end, self.block_len
            )));
        }
        if !self.start_angle_deg.is_finite() || !self.end_angle_deg.is_finite() {
            return Err(CoreError::InvalidParameter("scan angles must be finite".into()));
        }
        Ok(())
    }

    /// Angular step between consecutive samples, in degrees.
    pub fn angle_step_deg(&self) -> f64 {
        (self.end_angle_deg - self.start_angle_deg) / self.total_points as f64
    }
}

/// Valid distance window for samples entering clustering (exclusive bounds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanRange {
    pub min_range_mm: f64,
    pub max_range_mm: f64,
}

impl Default for ScanRange {
    fn default() -> Self {
        Self {
            min_range_mm: 20.0,
            max_range_mm: 4000.0,
        }
    }
}

impl ScanRange {
    pub fn new(min_range_mm: f64, max_range_mm: f64) -> Self {
        Self {
            min_range_mm,
            max_range_mm,
        }
    }

    pub fn contains(&self, distance_mm: f64) -> bool {
        distance_mm > self.min_range_mm && distance_mm < self.max_range_mm
    }

    pub fn validate(&self) -> CoreResult<()> {
        if !(self.min_range_mm.is_finite() && self.max_range_mm.is_finite())
            || self.min_range_mm < 0.0
            || self.min_range_mm >= self.max_range_mm
        {
            return Err(CoreError::InvalidParameter(format!(
                "scan range ({}, {}) is empty",
                self.min_range_mm, self.max_range_mm
            )));
        }
        Ok(())
    }
}

/// Clustering and acceptance thresholds for trunk detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionParams {
    pub eps_mm: f64,
    pub min_points: usize,
    pub min_radius_mm: f64,
    pub max_radius_mm: f64,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            eps_mm: 100.0,
            min_points: 5,
            min_radius_mm: 50.0,
            max_radius_mm: 500.0,
        }
    }
}

impl DetectionParams {
    pub fn validate(&self) -> CoreResult<()> {
        if !self.eps_mm.is_finite() || self.eps_mm < 0.0 {
            return Err(CoreError::InvalidParameter(format!(
                "eps must be a non-negative distance, got {}",
                self.eps_mm
            )));
        }
        if self.min_points == 0 {
            return Err(CoreError::InvalidParameter(
                "min_points must be at least 1".into(),
            ));
        }
        if self.min_radius_mm.is_nan()
            || self.max_radius_mm.is_nan()
            || self.min_radius_mm > self.max_radius_mm
        {
            return Err(CoreError::InvalidParameter(format!(
                "radius bounds [{}, {}] are inverted",
                self.min_radius_mm, self.max_radius_mm
            )));
        }
        Ok(())
    }

    pub fn accepts_radius(&self, radius_mm: f64) -> bool {
        radius_mm >= self.min_radius_mm && radius_mm <= self.max_radius_mm
    }
}

/// Binary layout of a point-sensor packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeightPacketParams {
    pub start_marker: u8,
    pub packet_size: usize,
    pub first_record_offset: usize,
    pub record_stride: usize,
}

impl Default for HeightPacketParams {
    fn default() -> Self {
        Self {
            start_marker: 0xAA,
            packet_size: 195,
            first_record_offset: 10,
            record_stride: 15,
        }
    }
}

impl HeightPacketParams {
    /// Bytes occupied by the fields of one record.
    pub const RECORD_FIELDS_LEN: usize = 15;

    pub fn validate(&self) -> CoreResult<()> {
        if self.record_stride < Self::RECORD_FIELDS_LEN {
            return Err(CoreError::InvalidParameter(format!(
                "record stride {} is shorter than the {}-byte record",
                self.record_stride,
                Self::RECORD_FIELDS_LEN
            )));
        }
        if self.first_record_offset == 0 {
            return Err(CoreError::InvalidParameter(
                "first record would overlap the start marker".into(),
            ));
        }
        Ok(())
    }
}

/// Common error type for decoding, clustering and fitting.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("framing error: {0}")]
    Framing(String),
    #[error("incomplete frame: expected at least {expected} characters, got {actual}")]
    IncompleteFrame { expected: usize, actual: usize },
    #[error("incomplete data: expected at least {expected} bytes, got {actual}")]
    IncompleteData { expected: usize, actual: usize },
    #[error("format error at index {index}: {reason}")]
    Format { index: usize, reason: String },
    #[error("not enough points: need {required}, got {actual}")]
    NotEnoughPoints { required: usize, actual: usize },
    #[error("degenerate fit: determinant {determinant:e}")]
    DegenerateFit { determinant: f64 },
    #[error("insufficient points for clustering: need {required}, got {actual}")]
    InsufficientPoints { required: usize, actual: usize },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

/// Trait shared by the sensor decoders: raw input in, structured output out.
pub trait SensorDecoder {
    type Input: ?Sized;
    type Output;

    /// Short name used in logs and reports.
    fn sensor_name(&self) -> &'static str;

    fn decode(&self, input: &Self::Input) -> CoreResult<Self::Output>;
}
