//! Sample detection: half-wave segmentation with hysteresis thresholds

pub mod config;
pub mod extractor;
pub mod peaks;
pub mod runner;

pub use config::{CutterConfig, Thresholds};
pub use extractor::{trim_lead_in, ExtractorState, Segment, SegmentExtractor};
pub use peaks::{PeakAccumulator, SILENT_PEAK_DB};
pub use runner::{cut_file, cut_files, cut_source, FileReport, SegmentReport};
