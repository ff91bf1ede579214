use serde::{Deserialize, Serialize};

/// Stream parameters of one input file
///
/// Established once when the file is opened and fixed for its lifetime.
/// Every emitted sample file is written with the same parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Number of channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Valid bits per sample (e.g., 16, 24)
    pub bits_per_sample: u16,

    /// Container/codec name (e.g., "WAV", "Flac")
    pub format: String,
}

impl StreamInfo {
    /// Full-scale magnitude for this bit depth: `1 << (bits - 1)`
    ///
    /// 16-bit audio gives 32768, 24-bit gives 8388608.
    pub fn max_sample_value(&self) -> u32 {
        max_sample_value(self.bits_per_sample)
    }

    /// Duration in seconds of `frames` frames at this sample rate
    pub fn frames_to_seconds(&self, frames: usize) -> f64 {
        frames as f64 / self.sample_rate as f64
    }
}

/// Full-scale magnitude for `bits` valid bits per sample
pub fn max_sample_value(bits: u16) -> u32 {
    1u32 << (bits.clamp(1, 32) - 1)
}
