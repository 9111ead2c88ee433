//! Sensor decoding and trunk detection core.
//!
//! Scan frames from the scanning rangefinder and packets from the point
//! sensor are decoded into samples, and scan samples are clustered and
//! circle-fitted into trunk detections. Everything here is a pure function
//! of its inputs and parameter records; session state belongs to the caller.

pub mod math;
pub mod prelude;
pub mod processing;
pub mod sensor_interface;
pub mod telemetry;

pub use prelude::{
    CoreError, CoreResult, DetectionParams, HeightPacketParams, ScanParams, ScanRange,
    SensorDecoder,
};
pub use processing::{DetectedObject, DetectionPipeline};
pub use sensor_interface::{HeightMeasurement, HeightPacketDecoder, RangeSample, ScanFrameDecoder};
