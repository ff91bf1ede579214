//! Streaming segmentation of a frame sequence into samples
//!
//! Half-waves are delimited by zero-crossings on one detection channel.
//! A sample starts with the first half-wave whose peak reaches the
//! threshold-in level and ends once enough consecutive half-waves stay
//! below the threshold-out level.

use ringbuf::traits::*;
use ringbuf::HeapRb;

use crate::audio::frame::Frame;
use crate::audio::types::StreamInfo;
use crate::cutter::config::{CutterConfig, Thresholds};
use crate::cutter::peaks::PeakAccumulator;
use crate::error::Result;

/// Threshold-in delays above this (~5ms at 44.1kHz) are worth a warning
pub const LATE_THRESHOLD_IN_FRAMES: usize = 220;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorState {
    /// No candidate sample yet; quiet half-waves are dropped
    Searching,
    /// Threshold-in was reached; half-waves are collected into the sample
    Accumulating,
}

/// A finished sample, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Lead-in frames, already trimmed after the last digital silence
    pub lead_in: Vec<Frame>,

    /// The sample itself, starting at the half-wave that reached threshold-in
    pub body: Vec<Frame>,

    /// Index of the first body frame in the input stream
    pub start_frame: u64,

    /// Effective peak magnitude (see [`PeakAccumulator`])
    pub effective_peak: u32,

    /// Effective peak in dB relative to full scale
    pub peak_db: f64,

    /// Frames from the body start until a frame reaches threshold-in
    ///
    /// `None` if no single frame does; the half-wave check works on peaks
    /// held across a whole half-wave and the two can disagree.
    pub threshold_in_delay: Option<usize>,

    /// How many lead-in frames were missing from the history
    pub lead_in_shortfall: usize,
}

impl Segment {
    /// Total frames to write (lead-in + body)
    pub fn frame_count(&self) -> usize {
        self.lead_in.len() + self.body.len()
    }

    /// Frames in write order: lead-in first, then body
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.lead_in.iter().chain(self.body.iter())
    }
}

/// Frames of a lead-in window that are actually written
///
/// Everything up to and including the last all-zero frame is dropped, so
/// no digital silence ends up in front of the attack. A window without
/// any zero frame is kept whole.
pub fn trim_lead_in(window: &[Frame]) -> &[Frame] {
    match window.iter().rposition(Frame::is_zero) {
        Some(last_zero) => &window[last_zero + 1..],
        None => window,
    }
}

/// The segmentation state machine for one input stream
///
/// Feed every frame in order with [`feed`](Self::feed), then call
/// [`finalize`](Self::finalize) at end of stream.
///
/// The history that precedes the current candidate lives in a ring buffer
/// sized to the lead-in, so memory stays bounded by the lead-in plus the
/// longest sample no matter how long the silence before an attack is.
pub struct SegmentExtractor {
    channels: usize,
    zero_crossing_channel: usize,
    lead_in_frames: usize,
    max_quiet_half_waves: usize,
    thresholds: Thresholds,

    state: ExtractorState,
    /// Signed peak of the current half-wave
    running_peak: i32,
    quiet_half_waves: usize,
    /// Frames of the current candidate sample (or current half-wave while searching)
    candidate: Vec<Frame>,
    /// Frames immediately preceding `candidate`
    history: HeapRb<Frame>,
    peaks: PeakAccumulator,
    /// Frames fed since construction or the last reset
    position: u64,
}

impl SegmentExtractor {
    /// Create an extractor for a stream, validating the config against it
    pub fn new(config: &CutterConfig, info: &StreamInfo) -> Result<Self> {
        config.validate_for_stream(info)?;

        let thresholds = Thresholds::derive(config, info.bits_per_sample);
        tracing::debug!(
            "Absolute thresholds: in = {}, out = {} (full scale {})",
            thresholds.threshold_in,
            thresholds.threshold_out,
            thresholds.max_sample_value
        );

        Ok(Self {
            channels: info.channels as usize,
            zero_crossing_channel: config.zero_crossing_channel,
            lead_in_frames: config.lead_in_frames,
            max_quiet_half_waves: config.threshold_out_reached_count,
            thresholds,
            state: ExtractorState::Searching,
            running_peak: 0,
            quiet_half_waves: 0,
            candidate: Vec::new(),
            history: HeapRb::new(config.lead_in_frames.max(1)),
            peaks: PeakAccumulator::new(thresholds.max_sample_value),
            position: 0,
        })
    }

    pub fn state(&self) -> ExtractorState {
        self.state
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Frames currently held (history + candidate)
    pub fn buffered_frames(&self) -> usize {
        self.history.occupied_len() + self.candidate.len()
    }

    /// Process the next frame of the stream
    ///
    /// Returns the sample that this frame completed, if any. At most one
    /// sample can complete per frame.
    pub fn feed(&mut self, frame: Frame) -> Option<Segment> {
        assert_eq!(frame.channels(), self.channels, "frame channel count mismatch");

        // The peak is taken over all channels, so a still-loud channel
        // keeps the sample going. Its sign is fixed by the first non-zero
        // value of the half-wave.
        let frame_peak = frame.peak();
        if (self.running_peak > 0 && frame_peak > self.running_peak)
            || (self.running_peak < 0 && frame_peak < self.running_peak)
        {
            self.running_peak = frame_peak;
        }

        // Zero-crossings come from one channel only. Phase-inverted channels
        // would otherwise produce extra crossings and end samples early.
        let value = frame.value(self.zero_crossing_channel);
        let mut segment = None;
        if self.running_peak == 0 {
            // Digital silence counts as a one-frame half-wave, otherwise it
            // would pile up in front of the next attack.
            if value == 0 {
                segment = self.complete_half_wave();
            }
            self.running_peak = value;
        } else if (self.running_peak > 0 && value <= 0) || (self.running_peak < 0 && value >= 0) {
            segment = self.complete_half_wave();
            self.running_peak = value;
        }

        self.candidate.push(frame);
        self.position += 1;
        segment
    }

    /// Flush a sample that never reached threshold-out before end of stream
    ///
    /// The extractor is reset afterwards and can take a new stream.
    pub fn finalize(&mut self) -> Option<Segment> {
        let segment = match self.state {
            ExtractorState::Accumulating => {
                tracing::info!("End of stream before threshold-out, writing the pending sample");
                Some(self.build_segment())
            }
            ExtractorState::Searching => None,
        };
        self.reset();
        segment
    }

    /// Drop all state, as if freshly constructed
    pub fn reset(&mut self) {
        self.reset_candidate();
        self.running_peak = 0;
        self.position = 0;
    }

    fn complete_half_wave(&mut self) -> Option<Segment> {
        let peak = self.running_peak;
        let magnitude = peak.unsigned_abs();

        if self.state == ExtractorState::Searching {
            if magnitude < self.thresholds.threshold_in {
                // Just noise so far. Its frames may still serve as lead-in.
                self.abandon_candidate();
                return None;
            }
            tracing::debug!(
                "threshold-in reached at frame {} (peak {})",
                self.position,
                peak
            );
            self.state = ExtractorState::Accumulating;
        }

        self.peaks.add(peak);

        if magnitude < self.thresholds.threshold_out {
            self.quiet_half_waves += 1;
        } else {
            self.quiet_half_waves = 0;
        }

        if self.quiet_half_waves >= self.max_quiet_half_waves {
            let segment = self.build_segment();
            self.reset_candidate();
            return Some(segment);
        }

        None
    }

    /// Move the candidate frames into the lead-in history
    fn abandon_candidate(&mut self) {
        for frame in self.candidate.drain(..) {
            self.history.push_overwrite(frame);
        }
        self.peaks.clear();
    }

    fn reset_candidate(&mut self) {
        self.state = ExtractorState::Searching;
        self.quiet_half_waves = 0;
        self.candidate.clear();
        self.peaks.clear();
        self.history.clear();
    }

    fn build_segment(&mut self) -> Segment {
        let body = std::mem::take(&mut self.candidate);
        let start_frame = self.position - body.len() as u64;

        let held = self.history.occupied_len();
        let available = held.min(self.lead_in_frames);
        let window: Vec<Frame> = self.history.iter().skip(held - available).cloned().collect();

        let lead_in_shortfall = self.lead_in_frames - available;
        if lead_in_shortfall > 0 {
            tracing::warn!(
                "Too little data for a lead-in: {} of {} frames available",
                available,
                self.lead_in_frames
            );
        }

        let lead_in = trim_lead_in(&window).to_vec();
        if lead_in.len() < window.len() {
            tracing::info!("Just writing the last {} frames of the lead-in", lead_in.len());
        }

        let threshold_in_delay = self.threshold_in_delay(&body);

        Segment {
            lead_in,
            body,
            start_frame,
            effective_peak: self.peaks.effective_peak_value(),
            peak_db: self.peaks.effective_peak_db(),
            threshold_in_delay,
            lead_in_shortfall,
        }
    }

    fn threshold_in_delay(&self, body: &[Frame]) -> Option<usize> {
        let delay = body
            .iter()
            .position(|frame| frame.peak().unsigned_abs() >= self.thresholds.threshold_in);

        match delay {
            Some(frames) if frames < LATE_THRESHOLD_IN_FRAMES => {
                tracing::info!("threshold-in value reached after {} frames", frames);
            }
            // Usually a half-wave that hovers just off zero for a long
            // time before the attack; the sample will start with a gap.
            Some(frames) => {
                tracing::warn!("threshold-in value reached after {} frames", frames);
            }
            None => {
                tracing::warn!("threshold-in value never reached by a single frame");
            }
        }

        delay
    }
}
