/*
 *  navigation.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Slice cursor and peak navigation driven by the rotary encoder and the
 *  next-peak button
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

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

use log::debug;

use crate::peaks::PeakRegion;

/// Rotation sense of one encoder detent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    /// Two-bit quadrature decode from the pin levels sampled at the clock
    /// edge: differing levels turn clockwise, matching levels the other way.
    #[inline]
    pub fn from_phases(clk: bool, dt: bool) -> Self {
        if clk != dt { Direction::Clockwise } else { Direction::CounterClockwise }
    }

    #[inline]
    pub fn step(self) -> i32 {
        match self {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => -1,
        }
    }
}

/// Which slices the next redraw has to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedrawRequest {
    pub current: usize,
    /// Slice the cursor was last drawn on, if any
    pub previous: Option<usize>,
    /// Selected peak, if a jump has happened this cycle
    pub peak: Option<usize>,
}

/// Cursor state for one review cycle. Owned by the main loop; the edge
/// context reaches it only through [`NavMailbox`].
#[derive(Debug, Clone, Default)]
pub struct NavigationController {
    slice_count: usize,
    current: usize,
    previous: Option<usize>,
    peak: Option<usize>,
    active: bool,
    dirty: bool,
}

impl NavigationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables navigation over `slice_count` slices with the cursor at the
    /// first slice and no peak selected.
    pub fn arm(&mut self, slice_count: usize) {
        debug_assert!(slice_count > 0);
        *self = Self {
            slice_count: slice_count.max(1),
            active: true,
            ..Self::default()
        };
    }

    pub fn disarm(&mut self) {
        self.active = false;
        self.dirty = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn previous(&self) -> Option<usize> {
        self.previous
    }

    pub fn peak(&self) -> Option<usize> {
        self.peak
    }

    pub fn rotate(&mut self, direction: Direction) -> bool {
        self.rotate_by(direction.step())
    }

    /// Moves by a net displacement, saturating at both ends.
    pub fn rotate_by(&mut self, delta: i32) -> bool {
        if !self.active || delta == 0 {
            return false;
        }
        let last = self.slice_count as i64 - 1;
        self.current = (self.current as i64 + delta as i64).clamp(0, last) as usize;
        self.dirty = true;
        debug!("Encoder slice {}", self.current);
        true
    }

    /// Cycles to the next peak and puts the cursor on its slice. A no-op
    /// when the capture had no peaks.
    pub fn jump_to_next_peak(&mut self, peaks: &[PeakRegion]) -> bool {
        if !self.active || peaks.is_empty() {
            return false;
        }
        let next = match self.peak {
            Some(p) => (p + 1) % peaks.len(),
            None => 0,
        };
        self.peak = Some(next);
        self.current = peaks[next].slice.min(self.slice_count - 1);
        self.dirty = true;
        debug!("Moved to peak {} at slice {}, duration {}", next, self.current, peaks[next].duration);
        true
    }

    /// The redraw the display still owes, if any. Stays pending until
    /// [`confirm_redraw`](Self::confirm_redraw), so a failed draw is
    /// retried against the cell that still carries the marker.
    pub fn redraw_request(&self) -> Option<RedrawRequest> {
        if !self.active || !self.dirty {
            return None;
        }
        Some(RedrawRequest { current: self.current, previous: self.previous, peak: self.peak })
    }

    /// Records `request` as drawn: its slice is the one to restore next time.
    pub fn confirm_redraw(&mut self, request: RedrawRequest) {
        self.previous = Some(request.current);
        self.dirty = self.current != request.current || self.peak != request.peak;
    }
}

/// Input collected by the mailbox since the main loop last looked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingInput {
    /// Net encoder displacement
    pub rotation: i32,
    /// Next-peak presses
    pub peak_jumps: u32,
}

/// Single-slot handoff from the edge context to the main loop.
///
/// Rotations coalesce into a net displacement and peak presses into a
/// count, so nothing is lost while the main loop is busy drawing. The dirty
/// flag is raised by the producer after its counter update and lowered only
/// by [`take`](NavMailbox::take), ahead of draining the counters.
#[derive(Debug, Default)]
pub struct NavMailbox {
    armed: AtomicBool,
    rotation: AtomicI32,
    peak_jumps: AtomicU32,
    dirty: AtomicBool,
}

impl NavMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Opens the mailbox for a new review cycle, dropping stale input.
    pub fn arm(&self) {
        self.rotation.store(0, Ordering::Relaxed);
        self.peak_jumps.store(0, Ordering::Relaxed);
        self.dirty.store(false, Ordering::Relaxed);
        self.armed.store(true, Ordering::Release);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    pub fn post_rotation(&self, direction: Direction) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.rotation.fetch_add(direction.step(), Ordering::AcqRel);
        self.dirty.store(true, Ordering::Release);
        true
    }

    pub fn post_peak_jump(&self) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.peak_jumps.fetch_add(1, Ordering::AcqRel);
        self.dirty.store(true, Ordering::Release);
        true
    }

    /// Drains whatever has been posted.
    ///
    /// The flag comes down before the counters are swapped out. A post whose
    /// counter update misses this drain orders its flag store after ours, so
    /// the next call picks it up.
    pub fn take(&self) -> Option<PendingInput> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return None;
        }
        let input = PendingInput {
            rotation: self.rotation.swap(0, Ordering::AcqRel),
            peak_jumps: self.peak_jumps.swap(0, Ordering::AcqRel),
        };
        (input != PendingInput::default()).then_some(input)
    }
}
