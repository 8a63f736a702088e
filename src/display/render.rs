/*
 *  display/render.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Slice heights to custom character bitmaps, cursor marker included
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

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::constants::{CELL_COLUMNS, CELL_ROWS, GRAPH_CELLS};
use crate::navigation::RedrawRequest;
use crate::slices::Slice;

/// Where the cursor pixel sits within the active column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarkerPosition {
    /// Lit pixel in the top row; bars stop one row short to leave it room
    #[default]
    Top,
    /// Dark pixel punched into the bottom row of the bar
    Bottom,
}

impl MarkerPosition {
    /// Tallest bar that leaves the marker visible.
    pub fn max_height(self) -> u8 {
        match self {
            MarkerPosition::Top => CELL_ROWS as u8 - 1,
            MarkerPosition::Bottom => CELL_ROWS as u8,
        }
    }
}

/// One 5x8 custom character. Row 0 is the top; within a row, pixel column
/// `c` is bit `4 - c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellBitmap {
    rows: [u8; CELL_ROWS],
}

impl CellBitmap {
    pub fn from_rows(rows: [u8; CELL_ROWS]) -> Self {
        Self { rows: rows.map(|r| r & 0x1F) }
    }

    pub fn rows(&self) -> &[u8; CELL_ROWS] {
        &self.rows
    }

    #[inline]
    fn mask(col: usize) -> u8 {
        1 << (CELL_COLUMNS - 1 - col)
    }

    pub fn is_set(&self, row: usize, col: usize) -> bool {
        self.rows[row] & Self::mask(col) != 0
    }

    pub fn set(&mut self, row: usize, col: usize) {
        self.rows[row] |= Self::mask(col);
    }

    pub fn clear(&mut self, row: usize, col: usize) {
        self.rows[row] &= !Self::mask(col);
    }

    /// Lights the bottom `height` rows of column `col`.
    pub fn draw_bar(&mut self, col: usize, height: u8) {
        let height = (height as usize).min(CELL_ROWS);
        for row in CELL_ROWS - height..CELL_ROWS {
            self.set(row, col);
        }
    }

    /// Lit pixels in column `col`.
    pub fn column_height(&self, col: usize) -> usize {
        (0..CELL_ROWS).filter(|&row| self.is_set(row, col)).count()
    }
}

/// Draws the bar graph one character cell at a time.
#[derive(Debug, Clone)]
pub struct DisplayRenderer {
    cells: usize,
    marker: MarkerPosition,
}

impl DisplayRenderer {
    pub fn new(cells: usize, marker: MarkerPosition) -> Self {
        debug_assert!((1..=GRAPH_CELLS).contains(&cells));
        Self { cells: cells.clamp(1, GRAPH_CELLS), marker }
    }

    pub fn cells(&self) -> usize {
        self.cells
    }

    pub fn marker(&self) -> MarkerPosition {
        self.marker
    }

    #[inline]
    pub fn cell_of(slice: usize) -> usize {
        slice / CELL_COLUMNS
    }

    /// Rebuilds `cell` from scratch: one bar per slice, plus the marker when
    /// `cursor` falls inside the cell.
    pub fn render_cell(&self, cell: usize, slices: &[Slice], cursor: Option<usize>) -> CellBitmap {
        let mut bitmap = CellBitmap::default();
        let max = self.marker.max_height();
        for col in 0..CELL_COLUMNS {
            let index = cell * CELL_COLUMNS + col;
            let Some(slice) = slices.get(index) else { break };
            let height = slice.height.min(max);
            bitmap.draw_bar(col, height);
            if cursor == Some(index) {
                self.mark(&mut bitmap, col, height);
            }
        }
        bitmap
    }

    fn mark(&self, bitmap: &mut CellBitmap, col: usize, height: u8) {
        match self.marker {
            MarkerPosition::Top => bitmap.set(0, col),
            MarkerPosition::Bottom if height > 0 => bitmap.clear(CELL_ROWS - 1, col),
            MarkerPosition::Bottom => {}
        }
    }

    /// Every cell without a cursor, for the first draw after a capture.
    pub fn render_graph(&self, slices: &[Slice]) -> Vec<(usize, CellBitmap)> {
        (0..self.cells).map(|cell| (cell, self.render_cell(cell, slices, None))).collect()
    }

    /// Cells touched by a cursor move: the cursor's cell with the marker,
    /// and the previously marked cell without it when that one differs.
    pub fn redraw_cells(&self, request: &RedrawRequest, slices: &[Slice]) -> ArrayVec<(usize, CellBitmap), 2> {
        let mut out = ArrayVec::new();
        let current = Self::cell_of(request.current);
        if let Some(previous) = request.previous.map(Self::cell_of) {
            if previous != current && previous < self.cells {
                out.push((previous, self.render_cell(previous, slices, None)));
            }
        }
        if current < self.cells {
            out.push((current, self.render_cell(current, slices, Some(request.current))));
        }
        out
    }
}
