//! Cutter configuration and the absolute thresholds derived from it

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::audio::types::{max_sample_value, StreamInfo};
use crate::error::{CutterError, Result};

/// Configuration for sample extraction
///
/// Levels are fractions of full scale: the amplitude range is -1.0 to +1.0,
/// as shown by Audacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CutterConfig {
    /// Channel used for zero-crossing detection (default: 0)
    ///
    /// Peaks are still taken over all channels; only the half-wave
    /// boundaries come from this channel.
    pub zero_crossing_channel: usize,

    /// Half-wave peak level that starts a sample (default: 0.03)
    pub threshold_in: f64,

    /// Half-wave peak level below which the signal counts as quiet (default: 0.0003)
    pub threshold_out: f64,

    /// Consecutive quiet half-waves that end a sample (default: 100)
    pub threshold_out_reached_count: usize,

    /// Frames prepended before the attack (default: 88, about 2ms at 44.1kHz)
    pub lead_in_frames: usize,
}

impl Default for CutterConfig {
    fn default() -> Self {
        Self {
            zero_crossing_channel: 0,
            threshold_in: 0.03,
            threshold_out: 0.0003,
            threshold_out_reached_count: 100,
            lead_in_frames: 88,
        }
    }
}

impl CutterConfig {
    /// Load a config from a JSON file; missing keys keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| CutterError::FileOpen {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the stream-independent constraints
    pub fn validate(&self) -> Result<()> {
        if !(self.threshold_in > 0.0 && self.threshold_in <= 1.0) {
            return Err(CutterError::InvalidConfig(format!(
                "threshold-in must be > 0 and <= 1, got {}",
                self.threshold_in
            )));
        }

        if !(self.threshold_out > 0.0) {
            return Err(CutterError::InvalidConfig(format!(
                "threshold-out must be > 0, got {}",
                self.threshold_out
            )));
        }

        if self.threshold_out >= self.threshold_in {
            return Err(CutterError::InvalidConfig(format!(
                "threshold-out ({}) must be less than threshold-in ({})",
                self.threshold_out, self.threshold_in
            )));
        }

        if self.threshold_out_reached_count == 0 {
            return Err(CutterError::InvalidConfig(
                "threshold-out-reached-count must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Check the config against the stream it is about to process
    pub fn validate_for_stream(&self, info: &StreamInfo) -> Result<()> {
        self.validate()?;

        if self.zero_crossing_channel >= info.channels as usize {
            return Err(CutterError::InvalidConfig(format!(
                "zero-crossing channel {} out of range for {} channel(s)",
                self.zero_crossing_channel, info.channels
            )));
        }

        if !(2..=32).contains(&info.bits_per_sample) {
            return Err(CutterError::InvalidConfig(format!(
                "unsupported sample size: {} bits",
                info.bits_per_sample
            )));
        }

        Ok(())
    }
}

/// Absolute threshold magnitudes for one bit depth
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub max_sample_value: u32,
    pub threshold_in: u32,
    pub threshold_out: u32,
}

impl Thresholds {
    /// Scale the configured levels to `bits_per_sample`, truncating
    pub fn derive(config: &CutterConfig, bits_per_sample: u16) -> Self {
        let max_sample_value = max_sample_value(bits_per_sample);
        Self {
            max_sample_value,
            threshold_in: (max_sample_value as f64 * config.threshold_in) as u32,
            threshold_out: (max_sample_value as f64 * config.threshold_out) as u32,
        }
    }
}
