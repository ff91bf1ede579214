//! Half-wave peak bookkeeping and the effective peak estimate

use std::collections::BTreeMap;

/// Peak level reported in place of `-inf` dB when the effective peak is 0
pub const SILENT_PEAK_DB: f64 = -999.99;

/// Largest peaks ignored by the effective peak estimate
const SKIPPED_PEAKS: usize = 3;

/// Peaks averaged after the skipped ones
const AVERAGED_PEAKS: usize = 5;

/// Multiset of half-wave peak magnitudes for the current candidate sample
///
/// A short transient attack can produce a peak far above the perceived
/// loudness of a sample. The effective peak therefore ignores the 3
/// largest half-wave peaks and averages the next 5.
#[derive(Debug, Clone)]
pub struct PeakAccumulator {
    max_sample_value: u32,
    /// magnitude -> number of half-waves with that peak
    peaks: BTreeMap<u32, usize>,
    len: usize,
}

impl PeakAccumulator {
    pub fn new(max_sample_value: u32) -> Self {
        Self {
            max_sample_value,
            peaks: BTreeMap::new(),
            len: 0,
        }
    }

    pub fn clear(&mut self) {
        self.peaks.clear();
        self.len = 0;
    }

    /// Record the (signed) peak of one completed half-wave
    pub fn add(&mut self, peak: i32) {
        *self.peaks.entry(peak.unsigned_abs()).or_insert(0) += 1;
        self.len += 1;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Magnitudes, largest first, one entry per half-wave
    pub fn iter_descending(&self) -> impl Iterator<Item = u32> + '_ {
        self.peaks
            .iter()
            .rev()
            .flat_map(|(&peak, &count)| std::iter::repeat(peak).take(count))
    }

    /// Rounded mean of the 4th to 8th largest peaks, 0 if there are none
    pub fn effective_peak_value(&self) -> u32 {
        let (sum, count) = self
            .iter_descending()
            .skip(SKIPPED_PEAKS)
            .take(AVERAGED_PEAKS)
            .fold((0u64, 0u64), |(sum, count), peak| (sum + peak as u64, count + 1));

        if count == 0 {
            return 0;
        }
        (sum as f64 / count as f64).round() as u32
    }

    /// Effective peak relative to full scale, in dB
    ///
    /// Returns [`SILENT_PEAK_DB`] instead of `-inf` when the effective peak is 0.
    pub fn effective_peak_db(&self) -> f64 {
        let value = self.effective_peak_value();
        if value == 0 || self.max_sample_value == 0 {
            return SILENT_PEAK_DB;
        }
        20.0 * (value as f64 / self.max_sample_value as f64).log10()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accumulator_with(peaks: &[i32]) -> PeakAccumulator {
        let mut acc = PeakAccumulator::new(32768);
        for &p in peaks {
            acc.add(p);
        }
        acc
    }

    #[test]
    fn test_skips_three_largest_and_averages_next_five() {
        let acc = accumulator_with(&[90, 80, 70, 60, 50, 40, 30, 20, 10]);
        assert_eq!(acc.effective_peak_value(), 40);
    }

    #[test]
    fn test_insertion_order_and_sign_do_not_matter() {
        let acc = accumulator_with(&[-10, 50, -90, 30, 70, -20, 60, 80, -40]);
        assert_eq!(acc.effective_peak_value(), 40);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let acc = accumulator_with(&[100, 100, 100, 100, 100, 1, 1, 1]);
        assert_eq!(acc.len(), 8);
        assert_eq!(
            acc.iter_descending().collect::<Vec<_>>(),
            vec![100, 100, 100, 100, 100, 1, 1, 1]
        );
        // (100 + 100 + 1 + 1 + 1) / 5 = 40.6
        assert_eq!(acc.effective_peak_value(), 41);
    }

    #[test]
    fn test_short_window() {
        // Only two values after the skipped three: (20 + 10) / 2
        assert_eq!(accumulator_with(&[50, 40, 30, 20, 10]).effective_peak_value(), 15);
        // Nothing left after skipping
        assert_eq!(accumulator_with(&[50, 40, 30]).effective_peak_value(), 0);
        assert_eq!(accumulator_with(&[]).effective_peak_value(), 0);
    }

    #[test]
    fn test_rounds_half_up() {
        // (3 + 2) / 2 = 2.5
        assert_eq!(accumulator_with(&[9, 9, 9, 3, 2]).effective_peak_value(), 3);
    }

    #[test]
    fn test_min_value_does_not_overflow() {
        let acc = accumulator_with(&[i32::MIN, i32::MIN, i32::MIN, i32::MIN]);
        assert_eq!(acc.effective_peak_value(), 2_147_483_648);
    }

    #[test]
    fn test_db_of_full_scale_and_half_scale() {
        let full = accumulator_with(&[32768; 4]);
        assert!(full.effective_peak_db().abs() < 1e-9);

        let half = accumulator_with(&[16384; 4]);
        assert!((half.effective_peak_db() + 6.0206).abs() < 0.001);
    }

    #[test]
    fn test_db_sentinel_when_silent() {
        let acc = accumulator_with(&[0, 0, 0, 0]);
        let db = acc.effective_peak_db();
        assert!(db.is_finite());
        assert_eq!(db, SILENT_PEAK_DB);
    }

    #[test]
    fn test_clear() {
        let mut acc = accumulator_with(&[1, 2, 3, 4]);
        acc.clear();
        assert!(acc.is_empty());
        assert_eq!(acc.effective_peak_value(), 0);
    }
}
