/*
 *  slices.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Capture window reduction into a fixed number of graph slices
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

use std::ops::Range;

use log::debug;

use crate::scaler::Scaler;

/// One column of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slice {
    pub index: usize,
    /// Mean of the readings that cleared the noise filter, 0 if none did
    pub average: u32,
    /// Largest reading that cleared the noise filter, 0 if none did
    pub maximum: u32,
    /// Bar height in pixel rows
    pub height: u8,
}

/// Splits the collected part of a window into `count` equal slices.
///
/// The slice count never changes; a short capture only makes the slices
/// narrower. Every call recomputes from scratch.
#[derive(Debug, Clone)]
pub struct SliceAggregator {
    count: usize,
    noise_cutoff: u32,
    scaler: Scaler,
}

impl SliceAggregator {
    pub fn new(count: usize, noise_floor: u16, noise_threshold: u16, scaler: Scaler) -> Self {
        debug_assert!(count > 0);
        Self {
            count: count.max(1),
            noise_cutoff: noise_floor as u32 + noise_threshold as u32,
            scaler,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn scaler(&self) -> &Scaler {
        &self.scaler
    }

    /// Readings under `floor + threshold` are noise.
    #[inline]
    pub fn is_noise(&self, value: u16) -> bool {
        (value as u32) < self.noise_cutoff
    }

    /// Samples per slice for `collected` samples, never less than one.
    pub fn slice_width(&self, collected: usize) -> usize {
        (collected / self.count).max(1)
    }

    /// Sample range covered by slice `index`; empty once past `collected`.
    pub fn slice_range(&self, index: usize, collected: usize) -> Range<usize> {
        let width = self.slice_width(collected);
        let start = (index * width).min(collected);
        let end = ((index + 1) * width).min(collected);
        start..end
    }

    pub fn aggregate(&self, samples: &[u16]) -> Vec<Slice> {
        let collected = samples.len();
        let slices: Vec<Slice> = (0..self.count)
            .map(|index| {
                let (sum, count, maximum) = samples[self.slice_range(index, collected)]
                    .iter()
                    .filter(|&&v| !self.is_noise(v))
                    .fold((0u64, 0u64, 0u32), |(sum, n, max), &v| {
                        (sum + v as u64, n + 1, max.max(v as u32))
                    });
                let average = if count > 0 { (sum / count) as u32 } else { 0 };
                Slice { index, average, maximum, height: self.scaler.scale(average) }
            })
            .collect();

        debug!(
            "Averages: {}",
            slices.iter().map(|s| format!("{}={}", s.average, s.height)).collect::<Vec<_>>().join(" ")
        );
        slices
    }
}
