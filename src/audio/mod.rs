// src/audio/mod.rs

pub mod decoder;
pub mod encoder;
pub mod frame;
pub mod types;

// Re-export commonly used items
pub use decoder::{get_stream_info, open_frame_source, FrameSource, SymphoniaFrameReader, WavFrameReader};
pub use encoder::{segment_file_name, SegmentWriter, WavSegmentWriter};
pub use frame::Frame;
pub use types::StreamInfo;
