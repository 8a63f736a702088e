/*
 *  capture/window.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Fixed capacity sample window shared between the tick context and the
 *  main loop
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

use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};

use super::CaptureState;
use crate::constants::MAX_SAMPLE_CAPACITY;

const INDEX_BITS: u32 = 16;
const GENERATION_BITS: u32 = 14;
const INDEX_MASK: u32 = (1 << INDEX_BITS) - 1;
const GENERATION_MASK: u32 = (1 << GENERATION_BITS) - 1;
const STATE_SHIFT: u32 = INDEX_BITS + GENERATION_BITS;

/// Capture state, cycle generation and write index packed in one word so a
/// single compare-and-swap moves all three together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CaptureWord {
    pub state: CaptureState,
    pub generation: u16,
    pub index: usize,
}

impl CaptureWord {
    pub fn pack(self) -> u32 {
        let state = match self.state {
            CaptureState::Idle => 0u32,
            CaptureState::Collecting => 1,
            CaptureState::Complete => 2,
        };
        (state << STATE_SHIFT)
            | ((self.generation as u32 & GENERATION_MASK) << INDEX_BITS)
            | (self.index as u32 & INDEX_MASK)
    }

    pub fn unpack(word: u32) -> Self {
        let state = match word >> STATE_SHIFT {
            1 => CaptureState::Collecting,
            2 => CaptureState::Complete,
            _ => CaptureState::Idle,
        };
        Self {
            state,
            generation: ((word >> INDEX_BITS) & GENERATION_MASK) as u16,
            index: (word & INDEX_MASK) as usize,
        }
    }

    /// Same cycle, different state.
    pub fn with_state(self, state: CaptureState) -> Self {
        Self { state, ..self }
    }

    /// Same cycle, index advanced by one sample.
    pub fn advanced(self) -> Self {
        Self { index: self.index + 1, ..self }
    }

    /// First word of the following cycle.
    pub fn next_cycle(self) -> Self {
        Self {
            state: CaptureState::Collecting,
            generation: ((self.generation as u32 + 1) & GENERATION_MASK) as u16,
            index: 0,
        }
    }
}

/// Raw amplitude readings of one capture cycle.
///
/// Slots at or beyond the published write index belong to the tick context;
/// slots below it are only read. Samples are stored relaxed and published
/// by the release half of the word's compare-and-swap.
pub struct SampleWindow {
    slots: Box<[AtomicU16]>,
    word: AtomicU32,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0 && capacity <= MAX_SAMPLE_CAPACITY);
        let capacity = capacity.clamp(1, MAX_SAMPLE_CAPACITY);
        let slots = (0..capacity).map(|_| AtomicU16::new(0)).collect();
        let idle = CaptureWord { state: CaptureState::Idle, generation: 0, index: 0 };
        Self { slots, word: AtomicU32::new(idle.pack()) }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Samples published so far in the current (or last) cycle.
    pub fn len(&self) -> usize {
        self.load().index
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True between completion and the main loop handing the window back.
    pub fn is_ready(&self) -> bool {
        self.load().state == CaptureState::Complete
    }

    pub(crate) fn load(&self) -> CaptureWord {
        CaptureWord::unpack(self.word.load(Ordering::Acquire))
    }

    /// Moves from `from` to `to`, or reports the word that was found instead.
    pub(crate) fn transition(&self, from: CaptureWord, to: CaptureWord) -> Result<(), CaptureWord> {
        self.word
            .compare_exchange(from.pack(), to.pack(), Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(CaptureWord::unpack)
    }

    pub(crate) fn clear(&self) {
        for slot in self.slots.iter() {
            slot.store(0, Ordering::Relaxed);
        }
    }

    pub(crate) fn write_slot(&self, index: usize, value: u16) {
        self.slots[index].store(value, Ordering::Relaxed);
    }

    /// Copies the published samples into `out`, returning how many there were.
    pub fn copy_into(&self, out: &mut Vec<u16>) -> usize {
        let published = self.len();
        out.clear();
        out.extend(self.slots[..published].iter().map(|s| s.load(Ordering::Relaxed)));
        published
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_round_trip() {
        let word = CaptureWord { state: CaptureState::Collecting, generation: 0x2ABC, index: 4000 };
        assert_eq!(CaptureWord::unpack(word.pack()), word);
    }

    #[test]
    fn test_generation_wraps() {
        let word = CaptureWord { state: CaptureState::Idle, generation: GENERATION_MASK as u16, index: 12 };
        let next = word.next_cycle();
        assert_eq!(next.generation, 0);
        assert_eq!(next.index, 0);
        assert_eq!(next.state, CaptureState::Collecting);
    }

    #[test]
    fn test_new_window_is_idle_and_empty() {
        let window = SampleWindow::new(16);
        assert_eq!(window.capacity(), 16);
        assert!(window.is_empty());
        assert!(!window.is_ready());
        assert_eq!(window.load().state, CaptureState::Idle);
    }

    #[test]
    fn test_stale_transition_is_refused() {
        let window = SampleWindow::new(4);
        let idle = window.load();
        let collecting = idle.next_cycle();
        window.transition(idle, collecting).unwrap();

        // a writer still holding the idle word must not win
        let found = window.transition(idle, idle.with_state(CaptureState::Complete)).unwrap_err();
        assert_eq!(found, collecting);
    }

    #[test]
    fn test_copy_into_only_sees_published_slots() {
        let window = SampleWindow::new(4);
        let idle = window.load();
        let collecting = idle.next_cycle();
        window.transition(idle, collecting).unwrap();

        window.write_slot(0, 100);
        window.transition(collecting, collecting.advanced()).unwrap();
        window.write_slot(1, 200); // not yet published

        let mut out = Vec::new();
        assert_eq!(window.copy_into(&mut out), 1);
        assert_eq!(out, vec![100]);
    }
}
