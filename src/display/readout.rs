/*
 *  display/readout.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Numeric readouts placed around the graph on the 16x2 panel
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

//! Layout of the panel after a capture:
//!
//! ```text
//!   col 0       8      15
//! 0 [graph...]  4000/100
//! 1 2 11/2.612/2.790
//! ```

use std::fmt::{self, Write};

use arrayvec::ArrayString;

use crate::constants::LCD_COLUMNS;
use crate::peaks::PeakRegion;

/// One panel line worth of text.
pub type LcdLine = ArrayString<{ LCD_COLUMNS as usize }>;

pub const PROMPT: &str = "Press button";

/// Leftmost column of the right-hand info field on row 0.
const INFO_COLUMN: u8 = 8;

/// Text and the position it is written at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placed {
    pub row: u8,
    pub col: u8,
    pub text: LcdLine,
}

/// Appends up to the line's capacity and drops the rest.
struct Clipped<'a>(&'a mut LcdLine);

impl Write for Clipped<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.try_push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

fn line(args: fmt::Arguments<'_>) -> LcdLine {
    let mut text = LcdLine::new();
    let _ = Clipped(&mut text).write_fmt(args);
    text
}

pub fn prompt() -> Placed {
    Placed { row: 0, col: 0, text: line(format_args!("{PROMPT}")) }
}

/// `first/second` flush against the right edge of row 0, never left of
/// the info column.
pub fn slice_info(first: usize, second: usize) -> Placed {
    let text = line(format_args!("{first}/{second}"));
    let col = (LCD_COLUMNS.saturating_sub(text.len() as u8)).max(INFO_COLUMN);
    Placed { row: 0, col, text }
}

pub fn peak_count(count: usize) -> Placed {
    Placed { row: 1, col: 0, text: line(format_args!("{count}")) }
}

/// 1-based slice number, average and maximum in volts.
pub fn cursor_readout(slice: usize, average_volts: f32, maximum_volts: f32) -> Placed {
    Placed {
        row: 1,
        col: 2,
        text: line(format_args!("{:2}/{:.3}/{:.3}", slice + 1, average_volts, maximum_volts)),
    }
}

/// Blanks the info field, then shows the peak's slice and duration there.
pub fn peak_info(peak: &PeakRegion) -> [Placed; 2] {
    let blank = line(format_args!("{:width$}", "", width = (LCD_COLUMNS - INFO_COLUMN) as usize));
    [
        Placed { row: 0, col: INFO_COLUMN, text: blank },
        slice_info(peak.slice + 1, peak.duration),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_info_right_aligned() {
        let p = slice_info(4000, 100);
        assert_eq!(p.text.as_str(), "4000/100");
        assert_eq!((p.row, p.col), (0, 8));

        let p = slice_info(437, 10);
        assert_eq!(p.text.as_str(), "437/10");
        assert_eq!(p.col as usize + p.text.len(), 16);
    }

    #[test]
    fn test_long_info_starts_at_info_column() {
        let p = slice_info(65535, 1638);
        assert_eq!(p.col, 8);
    }

    #[test]
    fn test_cursor_readout_fills_row() {
        let p = cursor_readout(10, 2.6, 2.79);
        assert_eq!(p.text.as_str(), "11/2.600/2.790");
        assert_eq!(p.col as usize + p.text.len(), 16);

        let p = cursor_readout(0, 1.675, 1.7);
        assert_eq!(p.text.as_str(), " 1/1.675/1.700");
    }

    #[test]
    fn test_peak_info_blanks_field() {
        let peak = PeakRegion { slice: 9, start: 900, end: 1009, duration: 110, average_volts: 2.6 };
        let [blank, info] = peak_info(&peak);
        assert_eq!((blank.row, blank.col), (0, 8));
        assert_eq!(blank.text.as_str(), "        ");
        assert_eq!(info.text.as_str(), "10/110");
        assert_eq!(info.col, 10);
    }

    #[test]
    fn test_overlong_text_is_clipped() {
        let p = cursor_readout(10, 123456.0, 1.0);
        assert_eq!(p.text.len(), 16);
    }

    #[test]
    fn test_prompt_and_count() {
        assert_eq!(prompt().text.as_str(), "Press button");
        let p = peak_count(3);
        assert_eq!((p.row, p.col, p.text.as_str()), (1, 0, "3"));
    }
}
