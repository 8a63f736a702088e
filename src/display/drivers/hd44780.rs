/*
 *  display/drivers/hd44780.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  HD44780 character LCD behind a PCF8574 I2C backpack, 4-bit mode
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

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{Error as _, I2c};
use linux_embedded_hal::{Delay, I2cdev};
use log::{debug, info};

use crate::display::error::DisplayError;
use crate::display::render::CellBitmap;
use crate::display::traits::{check_cell, check_position, DisplaySink};

// HD44780 commands
const LCD_CLEAR: u8 = 0x01;
const LCD_HOME: u8 = 0x02;
const LCD_ENTRY_MODE: u8 = 0x04;
const LCD_DISPLAY_CONTROL: u8 = 0x08;
const LCD_FUNCTION_SET: u8 = 0x20;
const LCD_SET_CGRAM: u8 = 0x40;
const LCD_SET_DDRAM: u8 = 0x80;

// flags
const ENTRY_LEFT: u8 = 0x02;
const DISPLAY_ON: u8 = 0x04;
const TWO_LINE: u8 = 0x08;

// PCF8574 pin mapping: P0=RS P1=RW P2=EN P3=backlight P4..P7=D4..D7
const RS: u8 = 0x01;
const EN: u8 = 0x04;
const BACKLIGHT: u8 = 0x08;

const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

/// HD44780 driver
///
/// Works over any embedded-hal 1.0 I2C bus; on Linux open it with
/// [`Hd44780::new_i2c`].
pub struct Hd44780<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    columns: u8,
    lines: u8,
}

impl Hd44780<I2cdev, Delay> {
    /// Opens `bus` (e.g. "/dev/i2c-1") and runs the init sequence.
    pub fn new_i2c(bus: &str, address: u8, columns: u8, lines: u8) -> Result<Self, DisplayError> {
        info!("Opening HD44780 on {} at 0x{:02X}", bus, address);
        let i2c = I2cdev::new(bus)
            .map_err(|e| DisplayError::InitializationFailed(format!("Failed to open {}: {}", bus, e)))?;
        let mut lcd = Self::new(i2c, Delay, address, columns, lines);
        lcd.init()?;
        Ok(lcd)
    }
}

impl<I2C: I2c, D: DelayNs> Hd44780<I2C, D> {
    pub fn new(i2c: I2C, delay: D, address: u8, columns: u8, lines: u8) -> Self {
        Self { i2c, delay, address, columns, lines }
    }

    /// Power-on reset into 4-bit mode, two lines, display on, cursor off.
    pub fn init(&mut self) -> Result<(), DisplayError> {
        self.delay.delay_ms(50);
        self.expander_write(0)
            .map_err(|e| DisplayError::InitializationFailed(format!("No response from backpack: {}", e)))?;
        self.delay.delay_ms(1);

        // three times 8-bit mode, then switch to 4-bit
        for wait_us in [4500, 4500, 150] {
            self.write4(0x30)?;
            self.delay.delay_us(wait_us);
        }
        self.write4(0x20)?;

        self.command(LCD_FUNCTION_SET | TWO_LINE)?;
        self.command(LCD_DISPLAY_CONTROL | DISPLAY_ON)?;
        self.clear()?;
        self.command(LCD_ENTRY_MODE | ENTRY_LEFT)?;
        self.command(LCD_HOME)?;
        self.delay.delay_ms(2);
        debug!("HD44780 initialised, {}x{}", self.columns, self.lines);
        Ok(())
    }

    fn expander_write(&mut self, value: u8) -> Result<(), DisplayError> {
        self.i2c
            .write(self.address, &[value | BACKLIGHT])
            .map_err(|e| DisplayError::I2cError(format!("{:?}", e.kind())))
    }

    fn pulse_enable(&mut self, value: u8) -> Result<(), DisplayError> {
        self.expander_write(value | EN)?;
        self.delay.delay_us(1);
        self.expander_write(value & !EN)?;
        self.delay.delay_us(50);
        Ok(())
    }

    fn write4(&mut self, value: u8) -> Result<(), DisplayError> {
        self.expander_write(value)?;
        self.pulse_enable(value)
    }

    fn send(&mut self, value: u8, mode: u8) -> Result<(), DisplayError> {
        self.write4((value & 0xF0) | mode)?;
        self.write4(((value << 4) & 0xF0) | mode)
    }

    fn command(&mut self, value: u8) -> Result<(), DisplayError> {
        self.send(value, 0)
    }

    fn data(&mut self, value: u8) -> Result<(), DisplayError> {
        self.send(value, RS)
    }

    fn set_cursor(&mut self, row: u8, col: u8) -> Result<(), DisplayError> {
        check_position(row, col, (self.columns, self.lines))?;
        self.command(LCD_SET_DDRAM | (col + ROW_OFFSETS[row as usize % ROW_OFFSETS.len()]))
    }
}

impl<I2C: I2c, D: DelayNs> DisplaySink for Hd44780<I2C, D> {
    fn clear(&mut self) -> Result<(), DisplayError> {
        self.command(LCD_CLEAR)?;
        self.delay.delay_ms(2);
        Ok(())
    }

    fn write_cell(&mut self, cell: u8, bitmap: &CellBitmap) -> Result<(), DisplayError> {
        check_cell(cell)?;
        self.command(LCD_SET_CGRAM | (cell << 3))?;
        for &row in bitmap.rows() {
            self.data(row)?;
        }
        self.set_cursor(0, cell)?;
        self.data(cell)
    }

    fn write_text(&mut self, row: u8, col: u8, text: &str) -> Result<(), DisplayError> {
        self.set_cursor(row, col)?;
        let room = (self.columns - col) as usize;
        for ch in text.chars().take(room) {
            self.data(if ch.is_ascii() && !ch.is_ascii_control() { ch as u8 } else { b'?' })?;
        }
        Ok(())
    }

    fn dimensions(&self) -> (u8, u8) {
        (self.columns, self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorType, Operation};
    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};

    /// Records every byte pushed to the expander.
    #[derive(Clone, Default)]
    struct FakeBus {
        log: Arc<Mutex<Vec<(u8, u8)>>>,
    }

    impl ErrorType for FakeBus {
        type Error = Infallible;
    }

    impl I2c for FakeBus {
        fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
            let mut log = self.log.lock().unwrap();
            for op in operations {
                if let Operation::Write(bytes) = op {
                    log.extend(bytes.iter().map(|&b| (address, b)));
                }
            }
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    /// Reassembles (rs, byte) transfers from the latched nibbles.
    fn decode(log: &[(u8, u8)]) -> Vec<(bool, u8)> {
        let nibbles: Vec<u8> = log.iter().map(|&(_, b)| b).filter(|b| b & EN != 0).collect();
        nibbles.chunks(2).map(|p| (p[0] & RS != 0, (p[0] & 0xF0) | (p[1] >> 4))).collect()
    }

    fn lcd() -> (Hd44780<FakeBus, NoDelay>, FakeBus) {
        let bus = FakeBus::default();
        let mut lcd = Hd44780::new(bus.clone(), NoDelay, 0x27, 16, 2);
        lcd.init().unwrap();
        bus.log.lock().unwrap().clear();
        (lcd, bus)
    }

    #[test]
    fn test_init_sequence() {
        let bus = FakeBus::default();
        let mut lcd = Hd44780::new(bus.clone(), NoDelay, 0x27, 16, 2);
        lcd.init().unwrap();
        let log = bus.log.lock().unwrap();
        assert!(log.iter().all(|&(addr, b)| addr == 0x27 && b & BACKLIGHT != 0));
        let latched: Vec<u8> = log.iter().map(|&(_, b)| b).filter(|b| b & EN != 0).collect();
        let upper: Vec<u8> = latched[..4].iter().map(|b| b & 0xF0).collect();
        assert_eq!(upper, vec![0x30, 0x30, 0x30, 0x20]);
        let commands = decode(&log[13..]);
        assert_eq!(
            commands,
            vec![(false, 0x28), (false, 0x0C), (false, 0x01), (false, 0x06), (false, 0x02)]
        );
    }

    #[test]
    fn test_write_cell_uploads_and_places_glyph() {
        let (mut lcd, bus) = lcd();
        let bitmap = CellBitmap::from_rows([0, 1, 2, 3, 4, 5, 6, 0x1F]);
        lcd.write_cell(2, &bitmap).unwrap();
        let sent = decode(&bus.log.lock().unwrap());
        let mut expected = vec![(false, 0x40 | (2 << 3))];
        expected.extend(bitmap.rows().iter().map(|&r| (true, r)));
        expected.push((false, 0x80 | 2));
        expected.push((true, 2));
        assert_eq!(sent, expected);
    }

    #[test]
    fn test_write_text_second_row_and_clip() {
        let (mut lcd, bus) = lcd();
        lcd.write_text(1, 14, "abc").unwrap();
        let sent = decode(&bus.log.lock().unwrap());
        assert_eq!(sent, vec![(false, 0x80 | 0x40 | 14), (true, b'a'), (true, b'b')]);
    }

    #[test]
    fn test_rejects_bad_cell_and_position() {
        let (mut lcd, _) = lcd();
        assert!(matches!(lcd.write_cell(8, &CellBitmap::default()), Err(DisplayError::InvalidCell(8))));
        assert!(matches!(lcd.write_text(2, 0, "x"), Err(DisplayError::InvalidPosition { .. })));
    }

    #[test]
    fn test_non_ascii_replaced() {
        let (mut lcd, bus) = lcd();
        lcd.write_text(0, 0, "é").unwrap();
        let sent = decode(&bus.log.lock().unwrap());
        assert_eq!(sent.last(), Some(&(true, b'?')));
    }
}
