/*
 *  main.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Wires the capture, tick, input and review contexts together and runs
 *  until signalled
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
use std::time::Duration;

use anyhow::Context;
use chrono::Local;
use env_logger::Env;
use log::{error, info, warn};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::MissedTickBehavior;

use sndscope::capture::CaptureController;
use sndscope::config::{self, Settings};
use sndscope::constants::REVIEW_POLL_MS;
use sndscope::display::DisplaySinkFactory;
use sndscope::input::{self, EventDispatcher, MonotonicClock};
use sndscope::navigation::NavMailbox;
use sndscope::review::ReviewLoop;
use sndscope::source::{ReplaySource, SampleSource, SimulatedSource};
use sndscope::ticker::{TickService, TokioTicker};

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Asynchronously waits for a SIGINT, SIGTERM, or SIGHUP signal.
async fn signal_handler() -> Result<(), Box<dyn std::error::Error>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

fn sample_source(settings: &Settings) -> anyhow::Result<Box<dyn SampleSource>> {
    if let Some(path) = settings.replay.as_ref() {
        let replay = ReplaySource::from_file(path)
            .with_context(|| format!("loading replay file {}", path.display()))?;
        info!("Replaying {} readings from {}", replay.len(), path.display());
        return Ok(Box::new(replay));
    }
    let seed = settings.seed.unwrap_or_else(rand::random);
    info!("Simulated input, seed {}", seed);
    Ok(Box::new(SimulatedSource::new(seed, settings.simulation.clone())))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load().context("loading configuration")?;
    let settings = Settings::resolve(&cfg);

    env_logger::Builder::from_env(Env::default().default_filter_or(settings.log_level.as_str()))
        .format_timestamp_secs()
        .init();

    info!("sndscope v{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);
    info!("Started {}", Local::now().format("%Y-%m-%d %H:%M:%S"));
    info!(
        "Capture {} samples every {:?}, {} slices, debounce {:?}",
        settings.capture.capacity,
        settings.capture.sample_interval,
        settings.slice_count(),
        settings.capture.debounce
    );

    let capture = Arc::new(CaptureController::new(
        settings.capture.capacity,
        settings.capture.sample_interval,
        settings.capture.debounce,
    ));
    let (ticker, tick_task) = TokioTicker::spawn(capture.clone(), sample_source(&settings)?);
    let ticker = Arc::new(ticker);

    let mailbox = Arc::new(NavMailbox::new());
    let dispatcher = Arc::new(EventDispatcher::new(capture.clone(), mailbox.clone(), ticker.clone()));
    let clock = MonotonicClock::new();

    #[cfg(feature = "rpi")]
    let _gpio = input::gpio::GpioEdges::start(&settings.gpio, dispatcher.clone(), clock)
        .context("configuring GPIO inputs")?;

    let keyboard = tokio::spawn(input::stdin::run(dispatcher.clone(), clock));

    let sink = DisplaySinkFactory::create_from_settings(&settings.display).context("opening display")?;
    let mut review = ReviewLoop::new(
        sink,
        capture.clone(),
        mailbox,
        settings.aggregator(),
        settings.detector(),
        settings.renderer(),
    );
    review.greet().context("writing start-up screen")?;

    let mut poll = tokio::time::interval(Duration::from_millis(REVIEW_POLL_MS));
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = signal_handler();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                if let Err(e) = res {
                    warn!("Signal handling failed: {}", e);
                }
                break;
            }
            _ = poll.tick() => {
                if let Err(e) = review.step() {
                    error!("Display update failed: {}", e);
                }
            }
        }
    }

    ticker.disarm();
    tick_task.abort();
    keyboard.abort();
    info!("Shutdown after {} capture cycles", review.cycles());
    Ok(())
}
