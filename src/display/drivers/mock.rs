/*
 *  display/drivers/mock.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Mock display sink for testing and running without hardware
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

use std::sync::{Arc, Mutex, MutexGuard};

use embedded_graphics::pixelcolor::BinaryColor;

use crate::constants::{GRAPH_CELLS, LCD_COLUMNS, LCD_LINES};
use crate::display::error::DisplayError;
use crate::display::lcd_frame::LcdFrame;
use crate::display::render::CellBitmap;
use crate::display::traits::{check_cell, check_position, DisplaySink};

/// Mock display sink
///
/// Keeps the panel as both a character grid and a pixel image, and counts
/// every operation. Clones share the same state, so a test can keep one
/// handle while the review loop owns the other.
#[derive(Debug, Clone)]
pub struct MockSink {
    state: Arc<Mutex<MockSinkState>>,
}

/// Internal state for the mock sink (shared for inspection in tests)
#[derive(Debug)]
pub struct MockSinkState {
    /// Number of times clear() was called
    pub clear_count: usize,
    /// Every glyph upload in order
    pub cell_writes: Vec<(u8, CellBitmap)>,
    /// Every text write in order
    pub text_writes: Vec<(u8, u8, String)>,
    /// Latest glyph in each slot
    pub glyphs: [Option<CellBitmap>; GRAPH_CELLS],
    /// Character grid, glyph slots shown as their slot digit
    pub screen: Vec<Vec<char>>,
    pub frame: LcdFrame,
    /// Simulate failures (for error testing)
    pub simulate_failure: bool,
}

impl MockSinkState {
    fn new(columns: u8, lines: u8) -> Self {
        Self {
            clear_count: 0,
            cell_writes: Vec::new(),
            text_writes: Vec::new(),
            glyphs: [None; GRAPH_CELLS],
            screen: vec![vec![' '; columns as usize]; lines as usize],
            frame: LcdFrame::new(columns, lines),
            simulate_failure: false,
        }
    }

    /// One screen line as printed characters.
    pub fn line(&self, row: usize) -> String {
        self.screen.get(row).map(|l| l.iter().collect()).unwrap_or_default()
    }

    /// `len` characters of `row` starting at `col`.
    pub fn text_at(&self, row: usize, col: usize, len: usize) -> String {
        self.line(row).chars().skip(col).take(len).collect()
    }
}

impl MockSink {
    pub fn new() -> Self {
        Self::with_size(LCD_COLUMNS, LCD_LINES)
    }

    pub fn with_size(columns: u8, lines: u8) -> Self {
        Self { state: Arc::new(Mutex::new(MockSinkState::new(columns, lines))) }
    }

    /// Get reference to state for inspection in tests
    pub fn state(&self) -> Arc<Mutex<MockSinkState>> {
        Arc::clone(&self.state)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockSinkState>, DisplayError> {
        self.state.lock().map_err(|_| DisplayError::Other("mock sink state poisoned".to_string()))
    }

    pub fn set_simulate_failure(&self, fail: bool) {
        if let Ok(mut state) = self.lock() {
            state.simulate_failure = fail;
        }
    }

    /// Count number of pixels set to On
    pub fn count_on_pixels(&self) -> usize {
        self.lock().map(|s| s.frame.count_on()).unwrap_or(0)
    }

    /// Save framebuffer to PBM file (for visual debugging)
    #[cfg(test)]
    pub fn save_to_pbm(&self, path: &str) -> std::io::Result<()> {
        use std::fs::File;
        use std::io::Write;

        let state = self.state.lock().unwrap();
        let frame = &state.frame;
        let mut file = File::create(path)?;
        writeln!(file, "P1")?;
        writeln!(file, "{} {}", frame.width(), frame.height())?;
        for (i, &pixel) in frame.as_slice().iter().enumerate() {
            write!(file, "{}", if pixel == BinaryColor::On { "1" } else { "0" })?;
            if (i + 1) % frame.width() == 0 {
                writeln!(file)?;
            } else {
                write!(file, " ")?;
            }
        }
        Ok(())
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for MockSink {
    fn clear(&mut self) -> Result<(), DisplayError> {
        let mut state = self.lock()?;
        if state.simulate_failure {
            return Err(DisplayError::Other("Simulated clear failure".to_string()));
        }
        state.clear_count += 1;
        state.screen.iter_mut().for_each(|line| line.fill(' '));
        state.frame.clear_color(BinaryColor::Off);
        Ok(())
    }

    fn write_cell(&mut self, cell: u8, bitmap: &CellBitmap) -> Result<(), DisplayError> {
        check_cell(cell)?;
        let dims = self.dimensions();
        check_position(0, cell, dims)?;
        let mut state = self.lock()?;
        if state.simulate_failure {
            return Err(DisplayError::Other("Simulated write failure".to_string()));
        }
        state.cell_writes.push((cell, *bitmap));
        state.glyphs[cell as usize] = Some(*bitmap);
        state.screen[0][cell as usize] = char::from(b'0' + cell);
        state.frame.blit_glyph(0, cell, bitmap);
        Ok(())
    }

    fn write_text(&mut self, row: u8, col: u8, text: &str) -> Result<(), DisplayError> {
        let dims = self.dimensions();
        check_position(row, col, dims)?;
        let mut state = self.lock()?;
        if state.simulate_failure {
            return Err(DisplayError::Other("Simulated write failure".to_string()));
        }
        state.text_writes.push((row, col, text.to_string()));
        let line = &mut state.screen[row as usize];
        for (slot, ch) in line.iter_mut().skip(col as usize).zip(text.chars()) {
            *slot = ch;
        }
        state.frame.print(row, col, text);
        Ok(())
    }

    fn dimensions(&self) -> (u8, u8) {
        self.lock().map(|s| s.frame.grid()).unwrap_or((LCD_COLUMNS, LCD_LINES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_sink_creation() {
        let sink = MockSink::new();
        assert_eq!(sink.dimensions(), (16, 2));
        assert_eq!(sink.count_on_pixels(), 0);
    }

    #[test]
    fn test_write_text_updates_grid_and_pixels() {
        let mut sink = MockSink::new();
        sink.write_text(0, 0, "Press button").unwrap();
        let state = sink.state();
        assert_eq!(state.lock().unwrap().line(0), "Press button    ");
        assert!(sink.count_on_pixels() > 0);
    }

    #[test]
    fn test_text_clipped_at_edge() {
        let mut sink = MockSink::new();
        sink.write_text(1, 12, "123456").unwrap();
        assert_eq!(sink.state().lock().unwrap().text_at(1, 12, 4), "1234");
    }

    #[test]
    fn test_write_cell_shows_glyph() {
        let mut sink = MockSink::new();
        let mut bitmap = CellBitmap::default();
        bitmap.draw_bar(2, 5);
        sink.write_cell(3, &bitmap).unwrap();
        let state = sink.state();
        let state = state.lock().unwrap();
        assert_eq!(state.glyphs[3], Some(bitmap));
        assert_eq!(state.line(0).chars().nth(3), Some('3'));
        assert_eq!(state.frame.count_on_in(0, 3), 5);
    }

    #[test]
    fn test_rejects_bad_positions() {
        let mut sink = MockSink::new();
        assert!(matches!(sink.write_cell(8, &CellBitmap::default()), Err(DisplayError::InvalidCell(8))));
        assert!(matches!(
            sink.write_text(2, 0, "x"),
            Err(DisplayError::InvalidPosition { row: 2, col: 0 })
        ));
        assert!(matches!(sink.write_text(0, 16, "x"), Err(DisplayError::InvalidPosition { .. })));
    }

    #[test]
    fn test_clear_blanks_everything() {
        let mut sink = MockSink::new();
        sink.write_text(0, 0, "ABC").unwrap();
        sink.clear().unwrap();
        assert_eq!(sink.count_on_pixels(), 0);
        let state = sink.state();
        assert_eq!(state.lock().unwrap().clear_count, 1);
        assert_eq!(state.lock().unwrap().line(0).trim(), "");
    }

    #[test]
    fn test_simulated_failure() {
        let mut sink = MockSink::new();
        sink.set_simulate_failure(true);
        assert!(sink.clear().is_err());
        assert!(sink.write_text(0, 0, "x").is_err());
    }

    #[test]
    fn test_clones_share_state() {
        let sink = MockSink::new();
        let mut other = sink.clone();
        other.write_text(1, 0, "7").unwrap();
        assert_eq!(sink.state().lock().unwrap().text_at(1, 0, 1), "7");
    }

    #[test]
    fn test_save_to_pbm() {
        let mut sink = MockSink::new();
        sink.write_text(0, 0, "Hi").unwrap();
        let path = std::env::temp_dir().join("sndscope_mock_sink.pbm");
        sink.save_to_pbm(path.to_str().unwrap()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("P1\n95 17\n"));
        let _ = std::fs::remove_file(path);
    }
}
