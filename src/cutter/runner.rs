//! Per-file driver: decode, segment, write

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::audio::decoder::{get_stream_info, open_frame_source, FrameSource};
use crate::audio::encoder::{SegmentWriter, WavSegmentWriter};
use crate::audio::types::StreamInfo;
use crate::cutter::config::CutterConfig;
use crate::cutter::extractor::{Segment, SegmentExtractor};
use crate::error::Result;

/// One written sample file
#[derive(Debug, Clone, Serialize)]
pub struct SegmentReport {
    pub path: PathBuf,
    pub start_frame: u64,
    pub frames: usize,
    pub lead_in_frames: usize,
    pub peak_db: f64,
    pub threshold_in_delay: Option<usize>,
    /// Lead-in frames missing because the sample started too early
    pub lead_in_shortfall: usize,
}

/// Everything cut from one input file
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub info: StreamInfo,
    pub frames_read: u64,
    pub segments: Vec<SegmentReport>,
}

impl SegmentReport {
    fn new(path: PathBuf, segment: &Segment) -> Self {
        Self {
            path,
            start_frame: segment.start_frame,
            frames: segment.frame_count(),
            lead_in_frames: segment.lead_in.len(),
            peak_db: segment.peak_db,
            threshold_in_delay: segment.threshold_in_delay,
            lead_in_shortfall: segment.lead_in_shortfall,
        }
    }
}

/// Cut every sample out of one audio file into `output_dir`
///
/// Decoding and writing errors abort this file; samples already written
/// stay on disk.
///
/// # Example
/// ```no_run
/// use sample_cutter::cutter::{cut_file, CutterConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = cut_file("toms.wav", &CutterConfig::default(), ".")?;
/// println!("{} samples written", report.segments.len());
/// # Ok(())
/// # }
/// ```
pub fn cut_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input_path: P,
    config: &CutterConfig,
    output_dir: Q,
) -> Result<FileReport> {
    let input_path = input_path.as_ref();
    tracing::info!("Processing file {}", input_path.display());

    let mut source = open_frame_source(input_path)?;
    let info = source.info().clone();
    tracing::info!("  channels: {}", info.channels);
    tracing::info!("  sample rate: {}", info.sample_rate);
    tracing::info!("  sample size: {}", info.bits_per_sample);

    let mut writer = WavSegmentWriter::new(input_path, output_dir, &info);
    let (frames_read, segments) = cut_source(source.as_mut(), config, &mut writer)?;

    Ok(FileReport {
        input: input_path.to_path_buf(),
        info,
        frames_read,
        segments,
    })
}

/// Run a frame source through a fresh extractor into `writer`
///
/// Returns the number of frames read and a report per written sample.
pub fn cut_source<W: SegmentWriter + ?Sized>(
    source: &mut dyn FrameSource,
    config: &CutterConfig,
    writer: &mut W,
) -> Result<(u64, Vec<SegmentReport>)> {
    let mut extractor = SegmentExtractor::new(config, source.info())?;
    let mut reports = Vec::new();
    let mut frames_read = 0u64;

    while let Some(frame) = source.next_frame()? {
        frames_read += 1;
        if let Some(segment) = extractor.feed(frame) {
            let path = writer.write_segment(&segment)?;
            reports.push(SegmentReport::new(path, &segment));
        }
    }

    // Don't lose a sample that is still ringing at end of file
    if let Some(segment) = extractor.finalize() {
        let path = writer.write_segment(&segment)?;
        reports.push(SegmentReport::new(path, &segment));
    }

    tracing::debug!(
        "{} frames ({:.2}s) read, {} samples written",
        frames_read,
        source.info().frames_to_seconds(frames_read as usize),
        reports.len()
    );
    Ok((frames_read, reports))
}

/// Process several files one after another
///
/// Every input is opened and checked against the config before the first
/// one is cut, so a bad channel index or bit depth writes nothing. After
/// that, stops at the first file that fails.
pub fn cut_files<P: AsRef<Path>, Q: AsRef<Path>>(
    inputs: &[P],
    config: &CutterConfig,
    output_dir: Q,
) -> Result<Vec<FileReport>> {
    config.validate()?;
    for input in inputs {
        config.validate_for_stream(&get_stream_info(input)?)?;
    }
    inputs
        .iter()
        .map(|input| cut_file(input, config, output_dir.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::frame::Frame;
    use crate::error::CutterError;
    use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

    /// In-memory frame source
    struct VecSource {
        info: StreamInfo,
        frames: std::vec::IntoIter<Frame>,
    }

    impl FrameSource for VecSource {
        fn info(&self) -> &StreamInfo {
            &self.info
        }

        fn next_frame(&mut self) -> Result<Option<Frame>> {
            Ok(self.frames.next())
        }
    }

    /// Keeps segments in memory instead of writing files
    #[derive(Default)]
    struct CollectingWriter {
        segments: Vec<Segment>,
    }

    impl SegmentWriter for CollectingWriter {
        fn write_segment(&mut self, segment: &Segment) -> Result<PathBuf> {
            self.segments.push(segment.clone());
            Ok(PathBuf::from(format!("segment_{}", self.segments.len())))
        }
    }

    fn mono_16() -> StreamInfo {
        StreamInfo {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            format: "test".to_string(),
        }
    }

    /// Two separated hits with 300 frames of silence between them
    fn two_hits() -> Vec<i32> {
        let mut values = vec![0; 500];
        for _ in 0..2 {
            for h in 0..6 {
                let sign = if h % 2 == 0 { 1 } else { -1 };
                values.extend(std::iter::repeat(sign * 12000).take(8));
            }
            values.extend(vec![0; 300]);
        }
        values
    }

    fn quick_release() -> CutterConfig {
        CutterConfig {
            threshold_out_reached_count: 4,
            ..Default::default()
        }
    }

    fn write_test_wav(name: &str, values: &[i32]) -> PathBuf {
        write_wav(name, name, 1, values)
    }

    /// Write interleaved 16-bit `values` to `<temp>/sample_cutter_runner_<dir>/<name>.wav`
    fn write_wav(dir: &str, name: &str, channels: u16, values: &[i32]) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sample_cutter_runner_{}", dir));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.wav", name));
        let spec = WavSpec {
            channels,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for &v in values {
            writer.write_sample(v as i16).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    #[test]
    fn test_cut_source_emits_each_hit() {
        let mut source = VecSource {
            info: mono_16(),
            frames: two_hits().iter().map(|&v| Frame::new(vec![v])).collect::<Vec<_>>().into_iter(),
        };
        let mut writer = CollectingWriter::default();

        let (frames_read, reports) = cut_source(&mut source, &quick_release(), &mut writer).unwrap();
        assert_eq!(frames_read, two_hits().len() as u64);
        assert_eq!(reports.len(), 2);
        assert_eq!(writer.segments.len(), 2);
        assert_eq!(reports[0].path, PathBuf::from("segment_1"));
        assert!(reports[0].start_frame < reports[1].start_frame);
        assert_eq!(reports[0].threshold_in_delay, writer.segments[0].threshold_in_delay);
        assert_eq!(reports[0].lead_in_shortfall, 0);
    }

    #[test]
    fn test_same_input_gives_identical_segments() {
        let frames = || two_hits().iter().map(|&v| Frame::new(vec![v])).collect::<Vec<_>>();
        let mut first = CollectingWriter::default();
        let mut second = CollectingWriter::default();

        for writer in [&mut first, &mut second] {
            let mut source = VecSource {
                info: mono_16(),
                frames: frames().into_iter(),
            };
            cut_source(&mut source, &quick_release(), writer).unwrap();
        }
        assert_eq!(first.segments, second.segments);
    }

    #[test]
    fn test_report_records_lead_in_shortfall() {
        // Loud from the first frame: no lead-in available
        let mut values = Vec::new();
        for h in 0..3 {
            let sign = if h % 2 == 0 { 1 } else { -1 };
            values.extend(std::iter::repeat(sign * 12000).take(8));
        }
        values.extend(vec![0; 20]);

        let mut source = VecSource {
            info: mono_16(),
            frames: values.iter().map(|&v| Frame::new(vec![v])).collect::<Vec<_>>().into_iter(),
        };
        let mut writer = CollectingWriter::default();
        let (_, reports) = cut_source(&mut source, &quick_release(), &mut writer).unwrap();

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].lead_in_shortfall, 88);
        assert_eq!(reports[0].lead_in_frames, 0);

        let json = serde_json::to_value(&reports[0]).unwrap();
        assert_eq!(json["lead_in_shortfall"], 88);
    }

    #[test]
    fn test_invalid_config_rejected_before_reading() {
        let mut source = VecSource {
            info: mono_16(),
            frames: vec![Frame::new(vec![0])].into_iter(),
        };
        let config = CutterConfig {
            threshold_out: 0.5,
            threshold_in: 0.1,
            ..Default::default()
        };
        let mut writer = CollectingWriter::default();
        match cut_source(&mut source, &config, &mut writer) {
            Err(CutterError::InvalidConfig(_)) => (),
            _ => panic!("Expected InvalidConfig error"),
        }
        // Nothing consumed
        assert!(source.next_frame().unwrap().is_some());
    }

    #[test]
    fn test_cut_file_writes_wav_files() {
        let input = write_test_wav("two_hits", &two_hits());
        let output_dir = input.parent().unwrap().to_path_buf();

        let report = cut_file(&input, &quick_release(), &output_dir).unwrap();
        assert_eq!(report.info.channels, 1);
        assert_eq!(report.segments.len(), 2);

        for (i, segment) in report.segments.iter().enumerate() {
            let name = segment.path.file_name().unwrap().to_string_lossy().to_string();
            assert!(name.starts_with(&format!("two_hits_{:03}_", i + 1)), "unexpected name {}", name);

            let reader = WavReader::open(&segment.path).unwrap();
            assert_eq!(reader.spec().bits_per_sample, 16);
            assert_eq!(reader.duration() as usize, segment.frames);
        }

        std::fs::remove_dir_all(output_dir).ok();
    }

    #[test]
    fn test_cut_files_checks_every_input_first() {
        let stereo: Vec<i32> = two_hits().iter().flat_map(|&v| [v, v]).collect();
        let first = write_wav("precheck", "stereo", 2, &stereo);
        let second = write_wav("precheck", "mono", 1, &two_hits());
        let output_dir = std::env::temp_dir().join("sample_cutter_runner_precheck_out");
        std::fs::create_dir_all(&output_dir).unwrap();

        // Channel 1 is fine for the first file but not for the second
        let config = CutterConfig {
            zero_crossing_channel: 1,
            ..quick_release()
        };
        match cut_files(&[&first, &second], &config, &output_dir) {
            Err(CutterError::InvalidConfig(_)) => (),
            _ => panic!("Expected InvalidConfig error"),
        }
        assert_eq!(std::fs::read_dir(&output_dir).unwrap().count(), 0);

        std::fs::remove_dir_all(output_dir).ok();
        std::fs::remove_dir_all(first.parent().unwrap()).ok();
    }

    #[test]
    fn test_cut_files_stops_on_missing_input() {
        let result = cut_files(&["/no/such/input.wav"], &CutterConfig::default(), std::env::temp_dir());
        assert!(matches!(result, Err(CutterError::FileOpen { .. })));
    }
}
