/*
 *  ticker.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Periodic tick service driving the sample window
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
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, info};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::capture::{CaptureController, TickOutcome};
use crate::source::SampleSource;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TickError {
    #[error("tick service is not running")]
    Unavailable,
    #[error("invalid tick interval {0:?}")]
    InvalidInterval(Duration),
}

/// Start/cancel a periodic callback. Both calls come from the edge context
/// and must not block.
pub trait TickService: Send + Sync {
    fn arm(&self, interval: Duration) -> Result<(), TickError>;
    fn disarm(&self);
}

/// Tick context backed by a tokio task. The task owns the sample source and
/// calls `CaptureController::tick` once per interval while armed; it parks
/// itself as soon as a tick reports the capture is no longer collecting.
pub struct TokioTicker {
    control: watch::Sender<Option<Duration>>,
}

impl TokioTicker {
    pub fn spawn(capture: Arc<CaptureController>, source: Box<dyn SampleSource>) -> (Self, JoinHandle<()>) {
        let (control, rx) = watch::channel(None);
        let handle = tokio::spawn(run_ticks(capture, source, rx));
        (Self { control }, handle)
    }
}

impl TickService for TokioTicker {
    fn arm(&self, interval: Duration) -> Result<(), TickError> {
        if interval.is_zero() {
            return Err(TickError::InvalidInterval(interval));
        }
        self.control.send(Some(interval)).map_err(|_| TickError::Unavailable)
    }

    fn disarm(&self) {
        self.control.send_replace(None);
    }
}

async fn run_ticks(
    capture: Arc<CaptureController>,
    mut source: Box<dyn SampleSource>,
    mut control: watch::Receiver<Option<Duration>>,
) {
    let mut parked = true;
    loop {
        if parked {
            if control.changed().await.is_err() {
                debug!("Tick service shut down");
                return;
            }
        }

        let Some(period) = *control.borrow_and_update() else {
            parked = true;
            continue;
        };
        parked = false;

        let mut timer = tokio::time::interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = 0usize;

        loop {
            tokio::select! {
                changed = control.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    // re-read: either re-armed or disarmed
                    break;
                }
                _ = timer.tick() => {
                    match capture.tick(source.as_mut()) {
                        TickOutcome::Sampled => ticks += 1,
                        TickOutcome::Completed => {
                            info!("Sample timer finished after {} ticks", ticks + 1);
                            parked = true;
                            break;
                        }
                        TickOutcome::Idle => {
                            debug!("Late tick after stop, parking");
                            parked = true;
                            break;
                        }
                    }
                }
            }
        }
    }
}

/// Tick service for tests and offline replay: records arming, never ticks
/// by itself. Call `CaptureController::tick` by hand.
#[derive(Debug, Default)]
pub struct ManualTicker {
    armed_us: AtomicU64,
    failing: AtomicBool,
}

impl ManualTicker {
    /// A ticker whose `arm` fails until `set_failing(false)`.
    pub fn failing() -> Self {
        let ticker = Self::default();
        ticker.set_failing(true);
        ticker
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Release);
    }

    /// Interval of the current arming, if armed.
    pub fn armed(&self) -> Option<Duration> {
        match self.armed_us.load(Ordering::Acquire) {
            0 => None,
            us => Some(Duration::from_micros(us)),
        }
    }
}

impl TickService for ManualTicker {
    fn arm(&self, interval: Duration) -> Result<(), TickError> {
        if self.failing.load(Ordering::Acquire) {
            return Err(TickError::Unavailable);
        }
        if interval.is_zero() {
            return Err(TickError::InvalidInterval(interval));
        }
        self.armed_us.store(interval.as_micros() as u64, Ordering::Release);
        Ok(())
    }

    fn disarm(&self) {
        self.armed_us.store(0, Ordering::Release);
    }
}
