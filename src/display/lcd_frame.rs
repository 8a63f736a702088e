/*
 *  display/lcd_frame.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Pixel image of a character LCD: 5x8 glyph cells with a one pixel gap
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

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::mono_font::{ascii::FONT_5X8, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};

use crate::constants::{CELL_COLUMNS, CELL_ROWS};
use crate::display::render::CellBitmap;

/// Horizontal and vertical distance between two glyph origins.
const PITCH_X: u32 = CELL_COLUMNS as u32 + 1;
const PITCH_Y: u32 = CELL_ROWS as u32 + 1;

/// A runtime-sized monochrome framebuffer laid out as a character grid.
#[derive(Debug, Clone)]
pub struct LcdFrame {
    buf: Vec<BinaryColor>,
    columns: u8,
    lines: u8,
    w: usize,
    h: usize,
}

impl LcdFrame {
    pub fn new(columns: u8, lines: u8) -> Self {
        let w = (columns as u32 * PITCH_X).saturating_sub(1) as usize;
        let h = (lines as u32 * PITCH_Y).saturating_sub(1) as usize;
        Self { buf: vec![BinaryColor::Off; w * h], columns, lines, w, h }
    }

    pub fn width(&self) -> usize { self.w }
    pub fn height(&self) -> usize { self.h }
    pub fn grid(&self) -> (u8, u8) { (self.columns, self.lines) }

    /// Immutable raw access
    pub fn as_slice(&self) -> &[BinaryColor] { &self.buf }

    pub fn clear_color(&mut self, color: BinaryColor) {
        self.buf.fill(color);
    }

    /// Top-left pixel of the glyph at `row`, `col`.
    pub fn glyph_origin(row: u8, col: u8) -> Point {
        Point::new((col as u32 * PITCH_X) as i32, (row as u32 * PITCH_Y) as i32)
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<BinaryColor> {
        if x < self.w && y < self.h { Some(self.buf[y * self.w + x]) } else { None }
    }

    pub fn count_on(&self) -> usize {
        self.buf.iter().filter(|&&p| p == BinaryColor::On).count()
    }

    /// Lit pixels inside one glyph cell.
    pub fn count_on_in(&self, row: u8, col: u8) -> usize {
        let o = Self::glyph_origin(row, col);
        let (x0, y0) = (o.x as usize, o.y as usize);
        (y0..y0 + CELL_ROWS)
            .flat_map(|y| (x0..x0 + CELL_COLUMNS).map(move |x| (x, y)))
            .filter(|&(x, y)| self.pixel(x, y) == Some(BinaryColor::On))
            .count()
    }

    fn blank_glyph(&mut self, row: u8, col: u8) {
        let area = Rectangle::new(Self::glyph_origin(row, col), Size::new(CELL_COLUMNS as u32, CELL_ROWS as u32));
        let _ = area.into_styled(PrimitiveStyle::with_fill(BinaryColor::Off)).draw(self);
    }

    /// Paints a custom character bit for bit.
    pub fn blit_glyph(&mut self, row: u8, col: u8, bitmap: &CellBitmap) {
        let origin = Self::glyph_origin(row, col);
        let pixels = (0..CELL_ROWS).flat_map(|y| {
            (0..CELL_COLUMNS).map(move |x| {
                let color = if bitmap.is_set(y, x) { BinaryColor::On } else { BinaryColor::Off };
                Pixel(origin + Point::new(x as i32, y as i32), color)
            })
        });
        let _ = self.draw_iter(pixels);
    }

    /// Prints `text` one glyph per cell, clipped at the last column.
    pub fn print(&mut self, row: u8, col: u8, text: &str) {
        let style = MonoTextStyle::new(&FONT_5X8, BinaryColor::On);
        let mut buf = [0u8; 4];
        for (i, ch) in text.chars().enumerate() {
            let c = col as usize + i;
            if c >= self.columns as usize {
                break;
            }
            self.blank_glyph(row, c as u8);
            let glyph = ch.encode_utf8(&mut buf);
            let _ = Text::with_baseline(glyph, Self::glyph_origin(row, c as u8), style, Baseline::Top).draw(self);
        }
    }

    /// Text dump for logs, `#` for lit pixels.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.w + 1) * self.h);
        for y in 0..self.h {
            for x in 0..self.w {
                out.push(if self.buf[y * self.w + x] == BinaryColor::On { '#' } else { '.' });
            }
            out.push('\n');
        }
        out
    }

    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }
}

impl OriginDimensions for LcdFrame {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for LcdFrame {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clear_color(color);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry() {
        let frame = LcdFrame::new(16, 2);
        assert_eq!(frame.size(), Size::new(95, 17));
        assert_eq!(LcdFrame::glyph_origin(1, 2), Point::new(12, 9));
    }

    #[test]
    fn test_blit_glyph_places_bits() {
        let mut frame = LcdFrame::new(16, 2);
        let mut bitmap = CellBitmap::default();
        bitmap.draw_bar(0, 3);
        bitmap.set(0, 4);
        frame.blit_glyph(0, 1, &bitmap);
        assert_eq!(frame.count_on(), 4);
        assert_eq!(frame.pixel(6, 7), Some(BinaryColor::On));
        assert_eq!(frame.pixel(6, 4), Some(BinaryColor::Off));
        assert_eq!(frame.pixel(6, 5), Some(BinaryColor::On));
        assert_eq!(frame.pixel(10, 0), Some(BinaryColor::On));
        assert_eq!(frame.count_on_in(0, 1), 4);
        assert_eq!(frame.count_on_in(0, 0), 0);
    }

    #[test]
    fn test_print_draws_glyphs_and_clips() {
        let mut frame = LcdFrame::new(16, 2);
        frame.print(1, 14, "ABCD");
        assert!(frame.count_on_in(1, 14) > 0);
        assert!(frame.count_on_in(1, 15) > 0);
        assert_eq!(frame.count_on_in(0, 14), 0);
    }

    #[test]
    fn test_print_space_blanks_glyph() {
        let mut frame = LcdFrame::new(16, 2);
        frame.print(0, 3, "8");
        assert!(frame.count_on_in(0, 3) > 0);
        frame.print(0, 3, " ");
        assert_eq!(frame.count_on_in(0, 3), 0);
    }

    #[test]
    fn test_ascii_dump_shape() {
        let frame = LcdFrame::new(2, 1);
        let dump = frame.to_ascii();
        assert_eq!(dump.lines().count(), 8);
        assert!(dump.lines().all(|l| l.len() == 11));
    }
}
