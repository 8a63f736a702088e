/*
 *  constants.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Default geometry, timing and analog calibration
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

//! Global defaults used when the configuration leaves a value unset.

/// Number of samples held by one capture window.
pub const SAMPLE_CAPACITY: usize = 4000;
/// Largest window the packed capture word can index.
pub const MAX_SAMPLE_CAPACITY: usize = u16::MAX as usize;

/// Interval between two ADC reads while collecting (1 ms = 1000 Hz).
pub const SAMPLE_INTERVAL_MS: u64 = 1;

/// Minimum spacing between two accepted trigger edges.
pub const TRIGGER_DEBOUNCE_MS: u64 = 100;

/// Custom characters used for the graph (HD44780 has 8 CGRAM slots).
pub const GRAPH_CELLS: usize = 8;
/// Pixel columns per character cell, one slice per column.
pub const CELL_COLUMNS: usize = 5;
/// Pixel rows per character cell.
pub const CELL_ROWS: usize = 8;
/// Slices across the whole graph.
pub const TOTAL_SLICES: usize = GRAPH_CELLS * CELL_COLUMNS;

/// Character grid of the readout LCD.
pub const LCD_COLUMNS: u8 = 16;
pub const LCD_LINES: u8 = 2;

/// Idle ADC reading with nothing connected.
pub const ADC_NOISE_FLOOR: u16 = 2080;
/// Minimum deviation from the floor for a reading to count.
pub const ADC_NOISE_THRESHOLD: u16 = 50;
/// Reading at which the graph saturates.
pub const ADC_SATURATION: u16 = 3200;

/// ADC reference and resolution, 3.27 V over 12 bits.
pub const ADC_REFERENCE_VOLTS: f32 = 3.27;
pub const ADC_BITS: u8 = 12;

/// Slice average above which a peak is recorded.
pub const PEAK_THRESHOLD_VOLTS: f32 = 2.50;
/// Shortest reported peak (0.01 s = 10 samples at 1000 Hz).
pub const MIN_PEAK_DURATION: usize = 10;

/// Main loop idle wait between passes.
pub const REVIEW_POLL_MS: u64 = 10;
