/*
 *  input/mod.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Edge events from the trigger, rotary encoder and next-peak button, and
 *  their dispatch into the capture and navigation state
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

pub mod stdin;

#[cfg(feature = "rpi")]
pub mod gpio;

use std::sync::Arc;
use std::time::Instant;

use log::debug;

use crate::capture::{CaptureController, CaptureState, TriggerOutcome};
use crate::navigation::NavMailbox;
use crate::ticker::TickService;

pub use crate::navigation::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Rising,
    Falling,
}

/// Logical origin of an edge. The encoder clock carries both phase levels
/// as read at the moment of the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeSource {
    Trigger,
    EncoderClock { clk: bool, dt: bool },
    PeakButton,
}

/// An edge as delivered by the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEdge {
    pub source: EdgeSource,
    pub edge: Edge,
    pub timestamp_us: u64,
}

/// What the core reacts to; pin identities stop at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    CaptureTrigger { edge: Edge, timestamp_us: u64 },
    EncoderRotation(Direction),
    PeakJump,
}

/// Encoder and peak button count on the falling edge only.
pub fn decode(raw: RawEdge) -> Option<InputEvent> {
    match (raw.source, raw.edge) {
        (EdgeSource::Trigger, edge) => Some(InputEvent::CaptureTrigger { edge, timestamp_us: raw.timestamp_us }),
        (EdgeSource::EncoderClock { clk, dt }, Edge::Falling) => {
            Some(InputEvent::EncoderRotation(Direction::from_phases(clk, dt)))
        }
        (EdgeSource::PeakButton, Edge::Falling) => Some(InputEvent::PeakJump),
        _ => None,
    }
}

/// Microseconds since start-up, shared by every edge source.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }

    pub fn now_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, PartialEq)]
pub enum DispatchOutcome {
    Trigger(TriggerOutcome),
    /// Navigation input accepted into the mailbox, or refused
    Navigation(bool),
}

/// Edge context entry point. Does only what fits in an interrupt handler:
/// a capture state transition or one mailbox post.
pub struct EventDispatcher {
    capture: Arc<CaptureController>,
    mailbox: Arc<NavMailbox>,
    ticks: Arc<dyn TickService>,
}

impl EventDispatcher {
    pub fn new(capture: Arc<CaptureController>, mailbox: Arc<NavMailbox>, ticks: Arc<dyn TickService>) -> Self {
        Self { capture, mailbox, ticks }
    }

    pub fn handle_edge(&self, raw: RawEdge) -> Option<DispatchOutcome> {
        decode(raw).map(|event| self.dispatch(event))
    }

    pub fn dispatch(&self, event: InputEvent) -> DispatchOutcome {
        match event {
            InputEvent::CaptureTrigger { edge, timestamp_us } => {
                let outcome = self.capture.handle_trigger(edge, timestamp_us, self.ticks.as_ref());
                if outcome == TriggerOutcome::Started {
                    self.mailbox.disarm();
                }
                DispatchOutcome::Trigger(outcome)
            }
            InputEvent::EncoderRotation(direction) => {
                DispatchOutcome::Navigation(self.navigable() && self.mailbox.post_rotation(direction))
            }
            InputEvent::PeakJump => {
                DispatchOutcome::Navigation(self.navigable() && self.mailbox.post_peak_jump())
            }
        }
    }

    fn navigable(&self) -> bool {
        let collecting = self.capture.state() == CaptureState::Collecting;
        if collecting {
            debug!("Navigation input while collecting, dropped");
        }
        !collecting
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticker::ManualTicker;
    use std::time::Duration;

    fn dispatcher() -> (EventDispatcher, Arc<CaptureController>, Arc<NavMailbox>) {
        let capture = Arc::new(CaptureController::new(10, Duration::from_millis(1), Duration::from_millis(100)));
        let mailbox = Arc::new(NavMailbox::new());
        let d = EventDispatcher::new(capture.clone(), mailbox.clone(), Arc::new(ManualTicker::default()));
        (d, capture, mailbox)
    }

    fn edge(source: EdgeSource, edge: Edge) -> RawEdge {
        RawEdge { source, edge, timestamp_us: 0 }
    }

    #[test]
    fn test_decode_trigger_both_edges() {
        assert!(matches!(
            decode(edge(EdgeSource::Trigger, Edge::Rising)),
            Some(InputEvent::CaptureTrigger { edge: Edge::Rising, .. })
        ));
        assert!(matches!(
            decode(edge(EdgeSource::Trigger, Edge::Falling)),
            Some(InputEvent::CaptureTrigger { edge: Edge::Falling, .. })
        ));
    }

    #[test]
    fn test_decode_encoder_falling_only() {
        let clk = EdgeSource::EncoderClock { clk: false, dt: true };
        assert_eq!(decode(edge(clk, Edge::Falling)), Some(InputEvent::EncoderRotation(Direction::Clockwise)));
        assert_eq!(decode(edge(clk, Edge::Rising)), None);
        let clk = EdgeSource::EncoderClock { clk: false, dt: false };
        assert_eq!(decode(edge(clk, Edge::Falling)), Some(InputEvent::EncoderRotation(Direction::CounterClockwise)));
    }

    #[test]
    fn test_decode_peak_button() {
        assert_eq!(decode(edge(EdgeSource::PeakButton, Edge::Falling)), Some(InputEvent::PeakJump));
        assert_eq!(decode(edge(EdgeSource::PeakButton, Edge::Rising)), None);
    }

    #[test]
    fn test_navigation_refused_until_armed() {
        let (d, _, mailbox) = dispatcher();
        assert_eq!(d.dispatch(InputEvent::PeakJump), DispatchOutcome::Navigation(false));
        mailbox.arm();
        assert_eq!(d.dispatch(InputEvent::PeakJump), DispatchOutcome::Navigation(true));
    }

    #[test]
    fn test_start_disarms_navigation() {
        let (d, capture, mailbox) = dispatcher();
        mailbox.arm();
        let out = d.dispatch(InputEvent::CaptureTrigger { edge: Edge::Falling, timestamp_us: 1_000 });
        assert_eq!(out, DispatchOutcome::Trigger(TriggerOutcome::Started));
        assert_eq!(capture.state(), CaptureState::Collecting);
        assert!(!mailbox.is_armed());
        assert_eq!(
            d.dispatch(InputEvent::EncoderRotation(Direction::Clockwise)),
            DispatchOutcome::Navigation(false)
        );
    }

    #[test]
    fn test_navigation_refused_while_collecting_even_if_armed() {
        let (d, capture, mailbox) = dispatcher();
        capture.start(&ManualTicker::default());
        mailbox.arm();
        assert_eq!(
            d.dispatch(InputEvent::EncoderRotation(Direction::Clockwise)),
            DispatchOutcome::Navigation(false)
        );
        assert!(!mailbox.is_dirty());
    }

    #[test]
    fn test_clock_is_monotonic() {
        let clock = MonotonicClock::new();
        let a = clock.now_us();
        let b = clock.now_us();
        assert!(b >= a);
    }
}
