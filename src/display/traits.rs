/*
 *  display/traits.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Character display sink abstraction
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

use crate::display::error::DisplayError;
use crate::display::readout::Placed;
use crate::display::render::CellBitmap;

/// A character display with up to eight user-defined glyphs.
///
/// Graph cell `n` is uploaded to glyph slot `n` and shown at row 0,
/// column `n`. Text writes clip at the right edge.
pub trait DisplaySink {
    /// Blank the whole panel
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Upload `bitmap` as glyph `cell` and show it at its graph position
    fn write_cell(&mut self, cell: u8, bitmap: &CellBitmap) -> Result<(), DisplayError>;

    /// Print `text` starting at `row`, `col`
    fn write_text(&mut self, row: u8, col: u8, text: &str) -> Result<(), DisplayError>;

    /// Character grid as (columns, lines)
    fn dimensions(&self) -> (u8, u8);

    fn write_placed(&mut self, placed: &Placed) -> Result<(), DisplayError> {
        self.write_text(placed.row, placed.col, placed.text.as_str())
    }
}

impl<T: DisplaySink + ?Sized> DisplaySink for Box<T> {
    fn clear(&mut self) -> Result<(), DisplayError> {
        (**self).clear()
    }

    fn write_cell(&mut self, cell: u8, bitmap: &CellBitmap) -> Result<(), DisplayError> {
        (**self).write_cell(cell, bitmap)
    }

    fn write_text(&mut self, row: u8, col: u8, text: &str) -> Result<(), DisplayError> {
        (**self).write_text(row, col, text)
    }

    fn dimensions(&self) -> (u8, u8) {
        (**self).dimensions()
    }
}

/// Rejects positions outside a `columns` x `lines` grid.
pub fn check_position(row: u8, col: u8, (columns, lines): (u8, u8)) -> Result<(), DisplayError> {
    if row >= lines || col >= columns {
        return Err(DisplayError::InvalidPosition { row, col });
    }
    Ok(())
}

/// Rejects glyph slots past the eighth.
pub fn check_cell(cell: u8) -> Result<(), DisplayError> {
    if cell as usize >= crate::constants::GRAPH_CELLS {
        return Err(DisplayError::InvalidCell(cell));
    }
    Ok(())
}
