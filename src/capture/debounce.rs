/*
 *  capture/debounce.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Minimum interval gate for the capture trigger
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

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::debug;

const NEVER: u64 = u64::MAX;

/// Rejects edges that arrive sooner than `interval` after the last accepted
/// one. Rejected edges are dropped, never queued.
#[derive(Debug)]
pub struct Debouncer {
    interval_us: u64,
    last_accepted_us: AtomicU64,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_us: interval.as_micros() as u64,
            last_accepted_us: AtomicU64::new(NEVER),
        }
    }

    /// Returns true and records `now_us` when the edge may pass.
    pub fn accept(&self, now_us: u64) -> bool {
        let last = self.last_accepted_us.load(Ordering::Acquire);
        if last != NEVER {
            let elapsed = now_us.saturating_sub(last);
            if elapsed < self.interval_us {
                debug!("Debounce rejected: {}us", elapsed);
                return false;
            }
        }
        self.last_accepted_us
            .compare_exchange(last, now_us, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
