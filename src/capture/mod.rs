/*
 *  capture/mod.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Capture state machine: Idle -> Collecting -> Complete -> Idle
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

pub mod debounce;
pub mod window;

use std::time::Duration;

use log::{debug, error, warn};

use crate::input::Edge;
use crate::source::SampleSource;
use crate::ticker::{TickError, TickService};

pub use debounce::Debouncer;
pub use window::SampleWindow;

/// Lifecycle of one capture cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    /// Waiting for the trigger; the last window (if any) has been consumed
    Idle,
    /// Tick context is filling the window
    Collecting,
    /// Window is full or was stopped early; waiting for the main loop
    Complete,
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// One sample appended
    Sampled,
    /// Window reached capacity on this tick
    Completed,
    /// Not collecting (stopped, or a late tick); the tick source should disarm
    Idle,
}

/// What a trigger edge did
#[derive(Debug, PartialEq)]
pub enum TriggerOutcome {
    Started,
    Stopped,
    /// Edge arrived inside the debounce interval and was dropped
    Debounced,
    /// Edge was not legal in the current state
    Ignored,
    /// Arming the tick source failed; capture stays idle
    TickFailed(TickError),
}

/// Owns the sample window for the duration of a cycle and moves it through
/// its states in response to trigger edges and ticks.
///
/// `start`/`stop`/`handle_trigger` run in the edge context, `tick` in the
/// tick context; both only touch atomics. Ticks must be delivered by a
/// single context so that two ticks never race on the same slot.
pub struct CaptureController {
    window: SampleWindow,
    debounce: Debouncer,
    sample_interval: Duration,
}

impl CaptureController {
    pub fn new(capacity: usize, sample_interval: Duration, debounce: Duration) -> Self {
        Self {
            window: SampleWindow::new(capacity),
            debounce: Debouncer::new(debounce),
            sample_interval,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.window.load().state
    }

    pub fn capacity(&self) -> usize {
        self.window.capacity()
    }

    /// Samples written in the current (or last) cycle.
    pub fn collected(&self) -> usize {
        self.window.len()
    }

    /// Debounces a trigger edge, then presses (falling) start and releases
    /// (rising) stop.
    pub fn handle_trigger(&self, edge: Edge, timestamp_us: u64, ticks: &dyn TickService) -> TriggerOutcome {
        if !self.debounce.accept(timestamp_us) {
            return TriggerOutcome::Debounced;
        }
        debug!("Trigger {:?} at {}us", edge, timestamp_us);
        match edge {
            Edge::Falling => self.start(ticks),
            Edge::Rising => self.stop(ticks),
        }
    }

    pub fn start(&self, ticks: &dyn TickService) -> TriggerOutcome {
        let current = self.window.load();
        match current.state {
            CaptureState::Idle => {}
            CaptureState::Collecting => {
                debug!("Capture already running, ignoring start");
                return TriggerOutcome::Ignored;
            }
            CaptureState::Complete => {
                debug!("Previous capture not yet reviewed, ignoring start");
                return TriggerOutcome::Ignored;
            }
        }

        // Idle: no tick publishes while we clear
        self.window.clear();
        let collecting = current.next_cycle();
        if self.window.transition(current, collecting).is_err() {
            warn!("Capture state changed under start, ignoring");
            return TriggerOutcome::Ignored;
        }

        if let Err(e) = ticks.arm(self.sample_interval) {
            error!("Failed to start sample timer: {}", e);
            let rollback = collecting.with_state(CaptureState::Idle);
            if self.window.transition(collecting, rollback).is_err() {
                // a stop slipped in; leave its Complete alone
                warn!("Capture stopped while arming failed");
            }
            return TriggerOutcome::TickFailed(e);
        }

        debug!("Data collection started ({} samples every {:?})", self.capacity(), self.sample_interval);
        TriggerOutcome::Started
    }

    /// Ends collection early. Safe against a tick in flight: whichever
    /// compare-and-swap lands first wins, the loser re-reads.
    pub fn stop(&self, ticks: &dyn TickService) -> TriggerOutcome {
        let mut current = self.window.load();
        loop {
            if current.state != CaptureState::Collecting {
                debug!("No data collection to stop");
                return TriggerOutcome::Ignored;
            }
            match self.window.transition(current, current.with_state(CaptureState::Complete)) {
                Ok(()) => break,
                Err(found) => current = found,
            }
        }
        ticks.disarm();
        debug!("Trigger released, collection stopped at {} samples", current.index);
        TriggerOutcome::Stopped
    }

    /// Appends one reading. A tick that finds the capture no longer
    /// collecting, or loses the race with a stop, writes nothing visible.
    pub fn tick(&self, source: &mut dyn SampleSource) -> TickOutcome {
        let current = self.window.load();
        if current.state != CaptureState::Collecting {
            return TickOutcome::Idle;
        }

        if current.index >= self.window.capacity() {
            return match self.window.transition(current, current.with_state(CaptureState::Complete)) {
                Ok(()) => TickOutcome::Completed,
                Err(_) => TickOutcome::Idle,
            };
        }

        self.window.write_slot(current.index, source.read());
        let mut next = current.advanced();
        let full = next.index == self.window.capacity();
        if full {
            next = next.with_state(CaptureState::Complete);
        }
        match self.window.transition(current, next) {
            Ok(()) if full => TickOutcome::Completed,
            Ok(()) => TickOutcome::Sampled,
            Err(_) => TickOutcome::Idle,
        }
    }

    /// Main loop copy of the completed window. Returns the sample count.
    pub fn snapshot_into(&self, out: &mut Vec<u16>) -> usize {
        debug_assert_ne!(self.state(), CaptureState::Collecting);
        self.window.copy_into(out)
    }

    /// Hands the consumed window back so a new trigger may start.
    pub fn finish_cycle(&self) -> bool {
        let current = self.window.load();
        if current.state != CaptureState::Complete {
            return false;
        }
        self.window
            .transition(current, current.with_state(CaptureState::Idle))
            .is_ok()
    }
}
