pub mod height_packet;
pub mod range_codec;
pub mod scan_frame;

pub use height_packet::{HeightCalibration, HeightMeasurement, HeightPacketDecoder};
pub use range_codec::RangeValueCodec;
pub use scan_frame::{RangeSample, ScanFrameDecoder};
