// src/audio/encoder.rs

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};

use crate::audio::types::StreamInfo;
use crate::cutter::extractor::Segment;
use crate::error::{CutterError, Result};

/// Destination for finished samples
///
/// Called synchronously for each sample in the order they are found, so
/// numbering follows the input.
pub trait SegmentWriter {
    /// Write one sample and return where it went
    fn write_segment(&mut self, segment: &Segment) -> Result<PathBuf>;
}

/// File name for the `index`th sample cut from `stem`
///
/// `<stem>_<index>_<peak dB>_<threshold-in delay>.wav`, with the delay
/// rendered as -1 when no frame reached threshold-in.
///
/// # Example
/// ```
/// use sample_cutter::audio::segment_file_name;
///
/// assert_eq!(segment_file_name("snare", 3, -12.5, Some(17)), "snare_003_-12.50_00017.wav");
/// assert_eq!(segment_file_name("snare", 4, -7.25, None), "snare_004_-07.25_-0001.wav");
/// ```
pub fn segment_file_name(stem: &str, index: usize, peak_db: f64, threshold_in_delay: Option<usize>) -> String {
    let delay = threshold_in_delay.map_or(-1, |frames| frames as i64);
    format!("{}_{:03}_{:06.2}_{:05}.wav", stem, index, peak_db, delay)
}

/// Writes each sample to its own integer PCM WAV file
///
/// Output files share the channel count, sample rate and bit depth of the
/// input stream.
pub struct WavSegmentWriter {
    output_dir: PathBuf,
    stem: String,
    spec: WavSpec,
    next_index: usize,
}

impl WavSegmentWriter {
    /// Writer for samples cut from `input_path`, numbered from 1
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(input_path: P, output_dir: Q, info: &StreamInfo) -> Self {
        let stem = input_path
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "sample".to_string());

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            stem,
            spec: WavSpec {
                channels: info.channels,
                sample_rate: info.sample_rate,
                bits_per_sample: info.bits_per_sample,
                sample_format: SampleFormat::Int,
            },
            next_index: 1,
        }
    }

    /// Number of files written so far
    pub fn written(&self) -> usize {
        self.next_index - 1
    }
}

impl SegmentWriter for WavSegmentWriter {
    fn write_segment(&mut self, segment: &Segment) -> Result<PathBuf> {
        let file_name = segment_file_name(
            &self.stem,
            self.next_index,
            segment.peak_db,
            segment.threshold_in_delay,
        );
        let path = self.output_dir.join(&file_name);

        tracing::info!("Writing {}", file_name);
        let mut writer = WavWriter::create(&path, self.spec)
            .map_err(|e| CutterError::EncodeFailed(format!("Failed to create '{}': {}", path.display(), e)))?;

        // Lead-in first, then the sample body
        for frame in segment.frames() {
            for &value in frame.values() {
                writer
                    .write_sample(value)
                    .map_err(|e| CutterError::EncodeFailed(format!("Failed to write sample: {}", e)))?;
            }
        }

        writer
            .finalize()
            .map_err(|e| CutterError::EncodeFailed(format!("Failed to finalize WAV: {}", e)))?;

        self.next_index += 1;
        Ok(path)
    }
}
