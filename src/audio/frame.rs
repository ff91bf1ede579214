// src/audio/frame.rs

/// One multichannel sample instant
///
/// Holds one integer sample per channel. All frames of a stream have the
/// same length (the stream's channel count). Frames are immutable once
/// decoded and are cloned into the extractor's buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    values: Box<[i32]>,
}

impl Frame {
    /// Build a frame from one sample per channel
    pub fn new(values: impl Into<Box<[i32]>>) -> Self {
        Self {
            values: values.into(),
        }
    }

    /// Read the `offset`th frame out of planar (per-channel) buffers
    ///
    /// Panics if `offset` is outside any of the planes.
    pub fn from_planes<P: AsRef<[i32]>>(planes: &[P], offset: usize) -> Self {
        Self::new(
            planes
                .iter()
                .map(|plane| plane.as_ref()[offset])
                .collect::<Vec<_>>(),
        )
    }

    /// Split interleaved samples ([L, R, L, R, ...]) into frames
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(samples: &[i32], channels: usize) -> Vec<Frame> {
        samples
            .chunks_exact(channels.max(1))
            .map(|chunk| Frame::new(chunk.to_vec()))
            .collect()
    }

    /// Store this frame at `offset` in planar (per-channel) buffers
    pub fn write_into<P: AsMut<[i32]>>(&self, planes: &mut [P], offset: usize) {
        assert_eq!(planes.len(), self.values.len(), "channel count mismatch");
        for (plane, &value) in planes.iter_mut().zip(self.values.iter()) {
            plane.as_mut()[offset] = value;
        }
    }

    /// The signed value with the largest magnitude across all channels
    ///
    /// Ties keep the first channel; the sign is preserved. Magnitudes are
    /// compared unsigned so `i32::MIN` can't overflow.
    pub fn peak(&self) -> i32 {
        let mut peak = 0i32;
        for &value in self.values.iter() {
            if value.unsigned_abs() > peak.unsigned_abs() {
                peak = value;
            }
        }
        peak
    }

    pub fn value(&self, channel: usize) -> i32 {
        self.values[channel]
    }

    /// True when every channel is digital silence
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0)
    }

    pub fn channels(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[i32] {
        &self.values
    }
}
