/*
 *  input/stdin.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Keyboard stand-in for the trigger, encoder and next-peak button
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

//! Each character of a line typed on stdin becomes one edge:
//!
//! | key      | edge                                   |
//! |----------|----------------------------------------|
//! | `p`      | trigger pressed (falling)              |
//! | `r`      | trigger released (rising)              |
//! | `+`, `>` | encoder detent clockwise               |
//! | `-`, `<` | encoder detent counter-clockwise       |
//! | `n`      | next-peak button                       |

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{DispatchOutcome, Edge, EdgeSource, EventDispatcher, MonotonicClock, RawEdge};

/// Maps one key to the edges a real control would have produced.
pub fn key_edges(key: char) -> &'static [(EdgeSource, Edge)] {
    match key {
        'p' | 'P' => &[(EdgeSource::Trigger, Edge::Falling)],
        'r' | 'R' => &[(EdgeSource::Trigger, Edge::Rising)],
        '+' | '>' => &[
            (EdgeSource::EncoderClock { clk: false, dt: true }, Edge::Falling),
            (EdgeSource::EncoderClock { clk: true, dt: true }, Edge::Rising),
        ],
        '-' | '<' => &[
            (EdgeSource::EncoderClock { clk: false, dt: false }, Edge::Falling),
            (EdgeSource::EncoderClock { clk: true, dt: false }, Edge::Rising),
        ],
        'n' | 'N' => &[
            (EdgeSource::PeakButton, Edge::Falling),
            (EdgeSource::PeakButton, Edge::Rising),
        ],
        _ => &[],
    }
}

/// Reads stdin until EOF, dispatching each key as edges.
pub async fn run(dispatcher: Arc<EventDispatcher>, clock: MonotonicClock) {
    info!("Keys: p=press r=release +/-=rotate n=next peak");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("stdin closed, keyboard input stopped");
                return;
            }
            Err(e) => {
                warn!("stdin read failed: {}", e);
                return;
            }
        };
        for key in line.chars() {
            for &(source, edge) in key_edges(key) {
                let raw = RawEdge { source, edge, timestamp_us: clock.now_us() };
                if let Some(DispatchOutcome::Navigation(false)) = dispatcher.handle_edge(raw) {
                    debug!("Key {:?} ignored, nothing to navigate", key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{decode, InputEvent};
    use crate::navigation::Direction;

    fn events(key: char) -> Vec<InputEvent> {
        key_edges(key)
            .iter()
            .filter_map(|&(source, edge)| decode(RawEdge { source, edge, timestamp_us: 0 }))
            .collect()
    }

    #[test]
    fn test_rotation_keys_decode_to_one_detent() {
        assert_eq!(events('+'), vec![InputEvent::EncoderRotation(Direction::Clockwise)]);
        assert_eq!(events('<'), vec![InputEvent::EncoderRotation(Direction::CounterClockwise)]);
    }

    #[test]
    fn test_peak_key_is_one_press() {
        assert_eq!(events('n'), vec![InputEvent::PeakJump]);
    }

    #[test]
    fn test_unknown_key_ignored() {
        assert!(key_edges('x').is_empty());
    }
}
