/*
 *  display/factory.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Display sink construction from configuration
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

use log::info;

use crate::config::{BusConfig, DisplaySettings, DriverKind};
use crate::constants::{LCD_COLUMNS, LCD_LINES};
use crate::display::drivers::hd44780::Hd44780;
use crate::display::drivers::mock::MockSink;
use crate::display::error::DisplayError;
use crate::display::traits::DisplaySink;

/// Type alias for boxed display sink trait objects
pub type BoxedSink = Box<dyn DisplaySink + Send>;

/// Factory for creating display sinks from configuration
pub struct DisplaySinkFactory;

impl DisplaySinkFactory {
    /// Create the configured sink, initialised and ready for text.
    pub fn create_from_settings(settings: &DisplaySettings) -> Result<BoxedSink, DisplayError> {
        match (&settings.driver, &settings.bus) {
            (DriverKind::Mock, _) => {
                info!("Using mock display, {}x{}", LCD_COLUMNS, LCD_LINES);
                Ok(Box::new(MockSink::new()))
            }
            (DriverKind::Hd44780, BusConfig::I2c { bus, address }) => {
                Ok(Box::new(Hd44780::new_i2c(bus, *address, LCD_COLUMNS, LCD_LINES)?))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Settings};

    #[test]
    fn test_default_is_mock() {
        let settings = Settings::resolve(&Config::default());
        let sink = DisplaySinkFactory::create_from_settings(&settings.display).unwrap();
        assert_eq!(sink.dimensions(), (16, 2));
    }

    #[test]
    fn test_missing_bus_device_fails_init() {
        let mut settings = Settings::resolve(&Config::default()).display;
        settings.driver = DriverKind::Hd44780;
        settings.bus = BusConfig::I2c { bus: "/dev/nonexistent-i2c".into(), address: 0x27 };
        assert!(matches!(
            DisplaySinkFactory::create_from_settings(&settings),
            Err(DisplayError::InitializationFailed(_))
        ));
    }
}
