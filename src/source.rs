/*
 *  source.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Pull based amplitude sources read once per tick
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

use std::fs;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ConfigError;

/// One ADC reading per call, in the converter's native resolution.
pub trait SampleSource: Send {
    fn read(&mut self) -> u16;
}

/// Shape of the signal produced by [`SimulatedSource`].
#[derive(Debug, Clone)]
pub struct SimulationProfile {
    /// Resting reading of the input
    pub idle: u16,
    /// Maximum deviation around `idle` while resting
    pub jitter: u16,
    /// Reading held during a burst
    pub burst_level: u16,
    /// Chance per sample that a burst starts
    pub burst_chance: f64,
    /// Burst length in samples, inclusive bounds
    pub burst_len: (usize, usize),
    /// Full scale of the simulated converter
    pub max_value: u16,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            idle: 2080,
            jitter: 40,
            burst_level: 3300,
            burst_chance: 0.002,
            burst_len: (20, 120),
            max_value: 4095,
        }
    }
}

/// Noisy idle signal with occasional loud bursts, for running without an
/// analog front end.
pub struct SimulatedSource {
    rng: StdRng,
    profile: SimulationProfile,
    burst_left: usize,
}

impl SimulatedSource {
    pub fn new(seed: u64, profile: SimulationProfile) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), profile, burst_left: 0 }
    }
}

impl SampleSource for SimulatedSource {
    fn read(&mut self) -> u16 {
        let p = &self.profile;
        if self.burst_left == 0 && self.rng.random_bool(p.burst_chance.clamp(0.0, 1.0)) {
            let (lo, hi) = p.burst_len;
            self.burst_left = self.rng.random_range(lo.max(1)..=hi.max(lo.max(1)));
        }

        let (base, spread) = if self.burst_left > 0 {
            self.burst_left -= 1;
            (p.burst_level, p.jitter / 2)
        } else {
            (p.idle, p.jitter)
        };
        let offset = self.rng.random_range(-(spread as i32)..=spread as i32);
        (base as i32 + offset).clamp(0, p.max_value as i32) as u16
    }
}

/// Plays back a recorded list of readings, wrapping at the end.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    samples: Vec<u16>,
    pos: usize,
}

impl ReplaySource {
    pub fn new(samples: Vec<u16>) -> Self {
        Self { samples, pos: 0 }
    }

    /// Reads whitespace separated readings; `#` starts a comment.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let mut samples = Vec::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.split('#').next().unwrap_or("");
            for field in line.split_whitespace() {
                let value = field.parse::<u16>().map_err(|e| {
                    ConfigError::Validation(format!("{}:{}: bad sample {:?}: {}", path.display(), n + 1, field, e))
                })?;
                samples.push(value);
            }
        }
        if samples.is_empty() {
            return Err(ConfigError::Validation(format!("{}: no samples", path.display())));
        }
        Ok(Self::new(samples))
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl SampleSource for ReplaySource {
    fn read(&mut self) -> u16 {
        if self.samples.is_empty() {
            return 0;
        }
        let value = self.samples[self.pos];
        self.pos = (self.pos + 1) % self.samples.len();
        value
    }
}
