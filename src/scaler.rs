/*
 *  scaler.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  ADC reading to bar height mapping
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

/// Maps an averaged reading onto `1..=max_height` pixel rows.
///
/// Anything under the noise floor draws the one-pixel baseline, anything at
/// or above the ceiling draws a full column. In between the height grows
/// linearly, rounded half up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scaler {
    floor: u32,
    ceiling: u32,
    max_height: u8,
}

impl Scaler {
    pub fn new(floor: u16, ceiling: u16, max_height: u8) -> Self {
        debug_assert!(ceiling > floor, "ceiling must sit above the noise floor");
        debug_assert!(max_height >= 1);
        Self {
            floor: floor as u32,
            ceiling: (ceiling as u32).max(floor as u32 + 1),
            max_height: max_height.max(1),
        }
    }

    pub fn max_height(&self) -> u8 {
        self.max_height
    }

    pub fn scale(&self, average: u32) -> u8 {
        if average < self.floor {
            return 1;
        }
        let span = self.ceiling - self.floor;
        let steps = (self.max_height - 1) as u64;
        let above = (average - self.floor) as u64;
        let h = (above * steps + (span / 2) as u64) / span as u64 + 1;
        h.min(self.max_height as u64) as u8
    }
}
