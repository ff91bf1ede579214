// src/audio/decoder.rs

use hound::{SampleFormat, WavIntoSamples, WavReader};
use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use symphonia::core::audio::AudioBufferRef;
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::frame::Frame;
use crate::audio::types::StreamInfo;
use crate::error::{CutterError, Result};

/// A sequential supply of decoded frames from one input file
///
/// Frames come out one at a time in file order, however the underlying
/// decoder chunks its reads.
pub trait FrameSource {
    /// Stream parameters, known as soon as the source is opened
    fn info(&self) -> &StreamInfo;

    /// The next frame, or `None` at end of stream
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Open an audio file as a frame source
///
/// WAV files are read directly with hound. Everything else goes through
/// symphonia and must decode to integer samples.
///
/// # Example
/// ```no_run
/// use sample_cutter::audio::open_frame_source;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut source = open_frame_source("drums.wav")?;
/// println!("Channels: {}", source.info().channels);
/// while let Some(frame) = source.next_frame()? {
///     let _ = frame.peak();
/// }
/// # Ok(())
/// # }
/// ```
pub fn open_frame_source<P: AsRef<Path>>(path: P) -> Result<Box<dyn FrameSource>> {
    if is_wav_file(&path) {
        Ok(Box::new(WavFrameReader::open(path)?))
    } else {
        Ok(Box::new(SymphoniaFrameReader::open(path)?))
    }
}

/// Get the stream parameters of an audio file without reading its frames
pub fn get_stream_info<P: AsRef<Path>>(path: P) -> Result<StreamInfo> {
    Ok(open_frame_source(path)?.info().clone())
}

/// Check if a file is a WAV file by examining its extension
fn is_wav_file<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| CutterError::FileOpen {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

/// Frames decoded per read from a WAV file
const WAV_READ_FRAMES: usize = 65536;

/// Integer PCM WAV reader (hound)
///
/// Samples are read in blocks of 65536 frames and handed out
/// one frame at a time.
pub struct WavFrameReader {
    info: StreamInfo,
    samples: WavIntoSamples<BufReader<File>, i32>,
    pending: VecDeque<Frame>,
    finished: bool,
}

impl WavFrameReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = open_file(path.as_ref())?;
        let reader = WavReader::new(BufReader::new(file))?;
        let spec = reader.spec();

        match spec.sample_format {
            SampleFormat::Int => {}
            SampleFormat::Float => {
                return Err(CutterError::UnsupportedFormat(
                    "floating point WAV files are not supported".to_string(),
                ));
            }
        }
        if spec.channels == 0 {
            return Err(CutterError::DecodeFailed("WAV file has no channels".to_string()));
        }

        let info = StreamInfo {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            format: "WAV".to_string(),
        };

        Ok(Self {
            info,
            samples: reader.into_samples::<i32>(),
            pending: VecDeque::new(),
            finished: false,
        })
    }

    fn read_block(&mut self) -> Result<()> {
        let channels = self.info.channels as usize;
        let wanted = WAV_READ_FRAMES * channels;
        let samples = self
            .samples
            .by_ref()
            .take(wanted)
            .collect::<hound::Result<Vec<i32>>>()
            .map_err(|e| CutterError::DecodeFailed(format!("Failed to read samples: {}", e)))?;

        if samples.len() < wanted {
            self.finished = true;
            let partial = samples.len() % channels;
            if partial != 0 {
                tracing::warn!("Dropping truncated trailing frame ({} of {} samples)", partial, channels);
            }
        }

        self.pending.extend(Frame::from_interleaved(&samples, channels));
        Ok(())
    }
}

impl FrameSource for WavFrameReader {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.pending.is_empty() && !self.finished {
            self.read_block()?;
        }
        Ok(self.pending.pop_front())
    }
}

/// Frame reader for anything symphonia can decode to integer samples
pub struct SymphoniaFrameReader {
    info: StreamInfo,
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    pending: VecDeque<Frame>,
    finished: bool,
}

impl SymphoniaFrameReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = open_file(path)?;

        // Create a media source stream (buffered reader)
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| CutterError::DecodeFailed(format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        // Find the default audio track (skip video/subtitle tracks)
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| CutterError::DecodeFailed("No audio track found in file".to_string()))?;

        let track_id = track.id;
        let codec_name = format!("{:?}", track.codec_params.codec);

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| CutterError::DecodeFailed("Sample rate not found".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| CutterError::DecodeFailed(format!("Failed to create decoder: {}", e)))?;

        // Channel count and bit depth are taken from the first decoded
        // buffer, so the frames we hand out always match the reported depth.
        let mut pending = VecDeque::new();
        let (channels, bits_per_sample) = loop {
            let packet = format.next_packet().map_err(|e| {
                CutterError::DecodeFailed(format!("Could not read first packet: {}", e))
            })?;

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = decoder
                .decode(&packet)
                .map_err(|e| CutterError::DecodeFailed(format!("Decode error on first packet: {}", e)))?;

            break push_frames(&decoded, &mut pending)?;
        };

        Ok(Self {
            info: StreamInfo {
                channels,
                sample_rate,
                bits_per_sample,
                format: codec_name,
            },
            format,
            decoder,
            track_id,
            pending,
            finished: false,
        })
    }
}

impl FrameSource for SymphoniaFrameReader {
    fn info(&self) -> &StreamInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(Some(frame));
            }
            if self.finished {
                return Ok(None);
            }

            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    self.finished = true;
                    continue;
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.finished = true;
                    continue;
                }
                Err(e) => {
                    return Err(CutterError::DecodeFailed(format!("Failed to read packet: {}", e)));
                }
            };

            // Skip packets from other tracks (e.g., video, album art)
            if packet.track_id() != self.track_id {
                continue;
            }

            match self.decoder.decode(&packet) {
                Ok(decoded) => {
                    let (channels, _) = push_frames(&decoded, &mut self.pending)?;
                    if channels != self.info.channels {
                        return Err(CutterError::DecodeFailed(format!(
                            "Channel count changed mid-stream ({} -> {})",
                            self.info.channels, channels
                        )));
                    }
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::warn!("Skipping undecodable packet: {}", e);
                }
                Err(e) => {
                    return Err(CutterError::DecodeFailed(format!("Decode error: {}", e)));
                }
            }
        }
    }
}

/// Append the frames of a decoded buffer to `out`
///
/// Returns the buffer's channel count and bit depth. Unsigned formats are
/// re-centred around zero; floating point buffers are rejected.
fn push_frames(buffer: &AudioBufferRef, out: &mut VecDeque<Frame>) -> Result<(u16, u16)> {
    let (channels, bits) = match buffer {
        AudioBufferRef::S8(buf) => {
            extend_frames(buf.planes().planes(), |s| s as i32, out);
            (buf.spec().channels.count(), 8)
        }
        AudioBufferRef::S16(buf) => {
            extend_frames(buf.planes().planes(), |s| s as i32, out);
            (buf.spec().channels.count(), 16)
        }
        AudioBufferRef::S24(buf) => {
            extend_frames(buf.planes().planes(), |s| s.inner(), out);
            (buf.spec().channels.count(), 24)
        }
        AudioBufferRef::S32(buf) => {
            extend_frames(buf.planes().planes(), |s| s, out);
            (buf.spec().channels.count(), 32)
        }
        AudioBufferRef::U8(buf) => {
            extend_frames(buf.planes().planes(), |s| s as i32 - 128, out);
            (buf.spec().channels.count(), 8)
        }
        AudioBufferRef::U16(buf) => {
            extend_frames(buf.planes().planes(), |s| s as i32 - 32_768, out);
            (buf.spec().channels.count(), 16)
        }
        AudioBufferRef::U24(buf) => {
            extend_frames(buf.planes().planes(), |s| s.inner() as i32 - 8_388_608, out);
            (buf.spec().channels.count(), 24)
        }
        AudioBufferRef::U32(buf) => {
            extend_frames(
                buf.planes().planes(),
                |s| (s as i64 - 2_147_483_648) as i32,
                out,
            );
            (buf.spec().channels.count(), 32)
        }
        AudioBufferRef::F32(_) | AudioBufferRef::F64(_) => {
            return Err(CutterError::UnsupportedFormat(
                "codec decodes to floating point samples".to_string(),
            ));
        }
    };

    Ok((channels as u16, bits))
}

fn extend_frames<T: Copy>(planes: &[&[T]], convert: impl Fn(T) -> i32, out: &mut VecDeque<Frame>) {
    let frames = planes.first().map_or(0, |plane| plane.len());
    for i in 0..frames {
        let values: Vec<i32> = planes.iter().map(|plane| convert(plane[i])).collect();
        out.push_back(Frame::new(values));
    }
}
