/*
 *  input/gpio.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Raspberry Pi GPIO interrupts for the trigger, encoder and next-peak
 *  button
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

use std::sync::Arc;

use log::info;
use rppal::gpio::{Gpio, InputPin, Level, Trigger};

use super::{Edge, EdgeSource, EventDispatcher, MonotonicClock, RawEdge};
use crate::config::GpioPins;

fn edge_of(level: Level) -> Edge {
    match level {
        Level::Low => Edge::Falling,
        Level::High => Edge::Rising,
    }
}

/// Keeps the interrupt-armed pins alive; dropping it stops the callbacks.
pub struct GpioEdges {
    _trigger: InputPin,
    _encoder_clk: InputPin,
    _next_peak: InputPin,
}

impl GpioEdges {
    /// Pulls every input up and installs edge callbacks that forward into
    /// `dispatcher`. The encoder's DT level is read inside the CLK callback.
    pub fn start(
        pins: &GpioPins,
        dispatcher: Arc<EventDispatcher>,
        clock: MonotonicClock,
    ) -> Result<Self, rppal::gpio::Error> {
        let gpio = Gpio::new()?;

        let mut trigger = gpio.get(pins.trigger)?.into_input_pullup();
        let d = dispatcher.clone();
        trigger.set_async_interrupt(Trigger::Both, move |level| {
            d.handle_edge(RawEdge { source: EdgeSource::Trigger, edge: edge_of(level), timestamp_us: clock.now_us() });
        })?;

        let encoder_dt = gpio.get(pins.encoder_dt)?.into_input_pullup();
        let mut encoder_clk = gpio.get(pins.encoder_clk)?.into_input_pullup();
        let d = dispatcher.clone();
        encoder_clk.set_async_interrupt(Trigger::Both, move |level| {
            let source = EdgeSource::EncoderClock { clk: level == Level::High, dt: encoder_dt.is_high() };
            d.handle_edge(RawEdge { source, edge: edge_of(level), timestamp_us: clock.now_us() });
        })?;

        let mut next_peak = gpio.get(pins.next_peak)?.into_input_pullup();
        next_peak.set_async_interrupt(Trigger::FallingEdge, move |_| {
            dispatcher.handle_edge(RawEdge {
                source: EdgeSource::PeakButton,
                edge: Edge::Falling,
                timestamp_us: clock.now_us(),
            });
        })?;

        info!(
            "GPIO inputs: trigger {}, encoder clk {} dt {}, next peak {}",
            pins.trigger, pins.encoder_clk, pins.encoder_dt, pins.next_peak
        );
        Ok(Self { _trigger: trigger, _encoder_clk: encoder_clk, _next_peak: next_peak })
    }
}
