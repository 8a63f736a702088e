/*
 *  peaks.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Detection of sustained over-threshold regions in a capture
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use log::{debug, info};

use crate::slices::Slice;

/// Linear ADC count to volts conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdcConversion {
    volts_per_count: f32,
}

impl AdcConversion {
    pub fn new(reference_volts: f32, bits: u8) -> Self {
        Self { volts_per_count: reference_volts / (1u32 << bits) as f32 }
    }

    #[inline]
    pub fn volts(&self, counts: u32) -> f32 {
        counts as f32 * self.volts_per_count
    }
}

/// One physical event: a merged run of over-threshold samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakRegion {
    /// Representative slice, the first over-threshold slice of the run
    pub slice: usize,
    /// First sample of the run
    pub start: usize,
    /// Last sample of the run, inclusive
    pub end: usize,
    /// `end - start + 1`, raised to the configured minimum
    pub duration: usize,
    /// Average of the representative slice in volts
    pub average_volts: f32,
}

impl PeakRegion {
    /// Unclamped length of the run in samples.
    pub fn span(&self) -> usize {
        self.end - self.start + 1
    }
}

#[derive(Debug, Clone)]
pub struct PeakDetector {
    threshold_volts: f32,
    min_duration: usize,
    conversion: AdcConversion,
}

impl PeakDetector {
    pub fn new(threshold_volts: f32, min_duration: usize, conversion: AdcConversion) -> Self {
        Self { threshold_volts, min_duration, conversion }
    }

    pub fn conversion(&self) -> &AdcConversion {
        &self.conversion
    }

    #[inline]
    fn over(&self, counts: u32) -> bool {
        self.conversion.volts(counts) > self.threshold_volts
    }

    /// Scans `slices` in order. An over-threshold slice seeds a region at its
    /// sample bounds, which then grows one sample at a time in both
    /// directions while the neighbour is also over threshold. The scan
    /// resumes past the slice holding the region's last sample, so regions
    /// never overlap and their slices strictly increase.
    pub fn detect(&self, samples: &[u16], slices: &[Slice], slice_width: usize) -> Vec<PeakRegion> {
        let collected = samples.len();
        let width = slice_width.max(1);
        let mut peaks = Vec::new();

        let mut i = 0;
        while i < slices.len() && peaks.len() < slices.len() {
            let slice_start = i * width;
            if slice_start >= collected || !self.over(slices[i].average) {
                i += 1;
                continue;
            }

            let mut start = slice_start;
            let mut end = ((i + 1) * width).min(collected) - 1;
            while start > 0 && self.over(samples[start - 1] as u32) {
                start -= 1;
            }
            while end + 1 < collected && self.over(samples[end + 1] as u32) {
                end += 1;
            }

            let region = PeakRegion {
                slice: i,
                start,
                end,
                duration: (end - start + 1).max(self.min_duration),
                average_volts: self.conversion.volts(slices[i].average),
            };
            debug!(
                "Peak at slice {}: {:.3} V, samples {}..={}, duration {}",
                region.slice, region.average_volts, region.start, region.end, region.duration
            );
            peaks.push(region);

            i = (end / width + 1).max(i + 1);
        }

        info!(
            "Found {} peaks: {}",
            peaks.len(),
            peaks.iter().map(|p| p.slice.to_string()).collect::<Vec<_>>().join(" ")
        );
        peaks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scaler::Scaler;
    use crate::slices::SliceAggregator;

    const IDLE: u16 = 2000;

    fn conversion() -> AdcConversion {
        AdcConversion::new(3.27, 12)
    }

    fn detector() -> PeakDetector {
        PeakDetector::new(2.5, 10, conversion())
    }

    fn aggregator() -> SliceAggregator {
        SliceAggregator::new(40, 2080, 50, Scaler::new(2080, 3200, 8))
    }

    fn run(samples: &[u16]) -> Vec<PeakRegion> {
        let agg = aggregator();
        let slices = agg.aggregate(samples);
        detector().detect(samples, &slices, agg.slice_width(samples.len()))
    }

    fn loud() -> u16 {
        // 2.6 V
        (2.6f32 / conversion().volts(1)).round() as u16
    }

    #[test]
    fn test_conversion() {
        let c = conversion();
        assert!((c.volts(4096) - 3.27).abs() < 1e-5);
        assert!(c.volts(3132) > 2.5);
        assert!(c.volts(3131) <= 2.5);
    }

    #[test]
    fn test_quiet_window_has_no_peaks() {
        assert!(run(&vec![IDLE; 4000]).is_empty());
    }

    #[test]
    fn test_single_burst() {
        let mut samples = vec![IDLE; 4000];
        samples[1000..=1050].fill(loud());
        let peaks = run(&samples);
        assert_eq!(peaks.len(), 1);
        let p = peaks[0];
        assert_eq!(p.slice, 1000 / 100);
        // the seed slice is always covered whole
        assert_eq!((p.start, p.end), (1000, 1099));
        assert_eq!(p.duration, 100);
        assert!(p.average_volts > 2.5);
    }

    #[test]
    fn test_burst_spanning_slices_recorded_once() {
        let mut samples = vec![IDLE; 4000];
        samples[1050..1320].fill(loud());
        let peaks = run(&samples);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].slice, 10);
        assert_eq!((peaks[0].start, peaks[0].end), (1000, 1319));
        assert_eq!(peaks[0].duration, 320);
    }

    #[test]
    fn test_expands_forward_into_next_slice() {
        let mut samples = vec![IDLE; 4000];
        // quiet readings are filtered as noise, so the loud tail alone
        // carries slice 9 over the threshold
        samples[990..1010].fill(loud());
        let peaks = run(&samples);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].slice, 9);
        assert_eq!((peaks[0].start, peaks[0].end), (900, 1009));
    }

    #[test]
    fn test_expands_backwards_across_quiet_slice_average() {
        // slice 10 is loud; slice 9 ends in a loud run too short to seed
        // anything on its own because its average is diluted
        let mut samples = vec![3000u16; 4000];
        samples[1000..1100].fill(loud());
        samples[995..1000].fill(loud());
        let peaks = run(&samples);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].slice, 10);
        assert_eq!((peaks[0].start, peaks[0].end), (995, 1099));
    }

    #[test]
    fn test_short_run_clamped_to_minimum() {
        let mut samples = vec![IDLE; 4000];
        samples[2000..2003].fill(loud());
        let agg = aggregator();
        let slices = agg.aggregate(&samples);
        let peaks = PeakDetector::new(2.5, 150, conversion()).detect(&samples, &slices, 100);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].span(), 100);
        assert_eq!(peaks[0].duration, 150);
    }

    #[test]
    fn test_two_bursts_in_one_slice_tail() {
        let mut samples = vec![IDLE; 4000];
        samples[1000..1050].fill(loud());
        samples[1080..1090].fill(loud()); // same slice, separate run
        samples[2500..2600].fill(loud());
        let peaks = run(&samples);
        assert_eq!(peaks.iter().map(|p| p.slice).collect::<Vec<_>>(), vec![10, 25]);
    }

    #[test]
    fn test_regions_ordered_and_disjoint() {
        let mut samples = vec![IDLE; 4000];
        for start in (0..4000).step_by(170) {
            let end = (start + 60).min(4000);
            samples[start..end].fill(loud());
        }
        let peaks = run(&samples);
        assert!(!peaks.is_empty());
        for pair in peaks.windows(2) {
            assert!(pair[0].slice < pair[1].slice);
            assert!(pair[0].end < pair[1].start);
        }
        assert!(peaks.len() <= 40);
    }

    #[test]
    fn test_saturated_window_is_one_region() {
        let peaks = run(&vec![loud(); 4000]);
        assert_eq!(peaks.len(), 1);
        assert_eq!((peaks[0].start, peaks[0].end), (0, 3999));
        assert_eq!(peaks[0].duration, 4000);
    }

    #[test]
    fn test_partial_window_stays_in_bounds() {
        // 437 samples: width 10, the last 37 fall past slice 39
        let mut samples = vec![IDLE; 437];
        samples[395..].fill(loud());
        let peaks = run(&samples);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].slice, 39);
        assert_eq!((peaks[0].start, peaks[0].end), (390, 436));
    }

    #[test]
    fn test_detection_is_repeatable() {
        let mut samples = vec![IDLE; 4000];
        samples[300..700].fill(loud());
        samples[3100..3150].fill(loud());
        assert_eq!(run(&samples), run(&samples));
    }
}
