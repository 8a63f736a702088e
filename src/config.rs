/*
 *  config.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Layered configuration: defaults, YAML file, command line
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

use clap::{ArgAction, Parser, ValueEnum, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};
use thiserror::Error;

use crate::constants::*;
use crate::display::render::{DisplayRenderer, MarkerPosition};
use crate::peaks::{AdcConversion, PeakDetector};
use crate::scaler::Scaler;
use crate::slices::SliceAggregator;
use crate::source::SimulationProfile;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration. Every field is optional so files and the
/// command line only need to name what they change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>, // e.g., "info" | "debug"
    /// Recorded readings to play back instead of the simulated input
    pub replay: Option<PathBuf>,
    pub capture: Option<CaptureConfig>,
    pub analysis: Option<AnalysisConfig>,
    pub display: Option<DisplayConfig>,
    pub gpio: Option<GpioConfig>,
    pub simulation: Option<SimulationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CaptureConfig {
    pub capacity: Option<usize>,
    pub sample_interval_ms: Option<u64>,
    pub debounce_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisConfig {
    pub noise_floor: Option<u16>,
    pub noise_threshold: Option<u16>,
    pub saturation_ceiling: Option<u16>,
    pub reference_volts: Option<f32>,
    pub adc_bits: Option<u8>,
    pub peak_threshold_volts: Option<f32>,
    pub min_peak_duration: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    /// Graph cells, five slices each
    pub cells: Option<usize>,
    pub marker: Option<MarkerPosition>,
    pub driver: Option<DriverKind>,
    pub bus: Option<BusConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GpioConfig {
    pub trigger: Option<u8>,
    pub encoder_clk: Option<u8>,
    pub encoder_dt: Option<u8>,
    pub next_peak: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SimulationConfig {
    pub seed: Option<u64>,
    pub idle: Option<u16>,
    pub jitter: Option<u16>,
    pub burst_level: Option<u16>,
    pub burst_chance: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BusConfig {
    I2c {
        bus: String, // e.g. "/dev/i2c-1"
        address: u8, // PCF8574 backpacks sit at 0x27 or 0x3F
    },
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfig::I2c { bus: "/dev/i2c-1".to_string(), address: 0x27 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Records into memory, logs the screen
    #[default]
    Mock,
    /// 16x2 character LCD behind a PCF8574 I2C backpack
    Hd44780,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone, Default)]
#[command(name = "sndscope", about = "Signal capture and peak review", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Samples per capture window
    #[arg(long)]
    pub capacity: Option<usize>,
    #[arg(long)]
    pub debounce_ms: Option<u64>,
    #[arg(long, value_enum)]
    pub driver: Option<DriverKind>,
    /// Play back readings from FILE instead of simulating the input
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub replay: Option<PathBuf>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();
    let cfg = load_with(&cli)?;

    if cli.dump_config {
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Layers defaults, the YAML file and `cli`, then validates.
pub fn load_with(cli: &Cli) -> Result<Config, ConfigError> {
    let mut cfg = Config::default();

    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            merge(&mut cfg, read_yaml(p)?);
        } else {
            return Err(ConfigError::Validation(format!("Config file not found: {}", p.display())));
        }
    } else if let Some(p) = find_config_file() {
        merge(&mut cfg, read_yaml(&p)?);
    }

    apply_cli_overrides(&mut cfg, cli);
    validate(&cfg)?;
    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    if let Some(home) = home_dir() {
        let p = home.join(".config/sndscope/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/sndscope.yaml");
        if p.exists() { return Some(p) }
    }
    for candidate in &["sndscope.yaml", "config/sndscope.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

pub fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
pub fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    if src.replay.is_some()    { dst.replay = src.replay; }
    match (&mut dst.capture, src.capture) {
        (None, Some(c)) => dst.capture = Some(c),
        (Some(d), Some(s)) => merge_capture(d, s),
        _ => {}
    }
    match (&mut dst.analysis, src.analysis) {
        (None, Some(c)) => dst.analysis = Some(c),
        (Some(d), Some(s)) => merge_analysis(d, s),
        _ => {}
    }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
    match (&mut dst.gpio, src.gpio) {
        (None, Some(c)) => dst.gpio = Some(c),
        (Some(d), Some(s)) => merge_gpio(d, s),
        _ => {}
    }
    match (&mut dst.simulation, src.simulation) {
        (None, Some(c)) => dst.simulation = Some(c),
        (Some(d), Some(s)) => merge_simulation(d, s),
        _ => {}
    }
}

fn merge_capture(dst: &mut CaptureConfig, src: CaptureConfig) {
    if src.capacity.is_some()           { dst.capacity = src.capacity; }
    if src.sample_interval_ms.is_some() { dst.sample_interval_ms = src.sample_interval_ms; }
    if src.debounce_ms.is_some()        { dst.debounce_ms = src.debounce_ms; }
}

fn merge_analysis(dst: &mut AnalysisConfig, src: AnalysisConfig) {
    if src.noise_floor.is_some()          { dst.noise_floor = src.noise_floor; }
    if src.noise_threshold.is_some()      { dst.noise_threshold = src.noise_threshold; }
    if src.saturation_ceiling.is_some()   { dst.saturation_ceiling = src.saturation_ceiling; }
    if src.reference_volts.is_some()      { dst.reference_volts = src.reference_volts; }
    if src.adc_bits.is_some()             { dst.adc_bits = src.adc_bits; }
    if src.peak_threshold_volts.is_some() { dst.peak_threshold_volts = src.peak_threshold_volts; }
    if src.min_peak_duration.is_some()    { dst.min_peak_duration = src.min_peak_duration; }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.cells.is_some()  { dst.cells = src.cells; }
    if src.marker.is_some() { dst.marker = src.marker; }
    if src.driver.is_some() { dst.driver = src.driver; }
    if src.bus.is_some()    { dst.bus = src.bus; }
}

fn merge_gpio(dst: &mut GpioConfig, src: GpioConfig) {
    if src.trigger.is_some()     { dst.trigger = src.trigger; }
    if src.encoder_clk.is_some() { dst.encoder_clk = src.encoder_clk; }
    if src.encoder_dt.is_some()  { dst.encoder_dt = src.encoder_dt; }
    if src.next_peak.is_some()   { dst.next_peak = src.next_peak; }
}

fn merge_simulation(dst: &mut SimulationConfig, src: SimulationConfig) {
    if src.seed.is_some()         { dst.seed = src.seed; }
    if src.idle.is_some()         { dst.idle = src.idle; }
    if src.jitter.is_some()       { dst.jitter = src.jitter; }
    if src.burst_level.is_some()  { dst.burst_level = src.burst_level; }
    if src.burst_chance.is_some() { dst.burst_chance = src.burst_chance; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some() { cfg.log_level = cli.log_level.clone(); }
    if cli.replay.is_some()    { cfg.replay = cli.replay.clone(); }

    if cli.capacity.is_some() || cli.debounce_ms.is_some() {
        let capture = cfg.capture.get_or_insert_with(CaptureConfig::default);
        if cli.capacity.is_some()    { capture.capacity = cli.capacity; }
        if cli.debounce_ms.is_some() { capture.debounce_ms = cli.debounce_ms; }
    }
    if cli.driver.is_some() {
        cfg.display.get_or_insert_with(DisplayConfig::default).driver = cli.driver;
    }
}

/// Range checks on whatever has been set; unset fields take known-good
/// defaults later.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(capture) = cfg.capture.as_ref() {
        if let Some(n) = capture.capacity {
            if n == 0 || n > MAX_SAMPLE_CAPACITY {
                return Err(ConfigError::Validation(format!(
                    "capture capacity must be 1..={}", MAX_SAMPLE_CAPACITY
                )));
            }
        }
        if capture.sample_interval_ms == Some(0) {
            return Err(ConfigError::Validation("capture sample_interval_ms must be > 0".into()));
        }
    }

    if let Some(analysis) = cfg.analysis.as_ref() {
        let floor = analysis.noise_floor.unwrap_or(ADC_NOISE_FLOOR);
        let ceiling = analysis.saturation_ceiling.unwrap_or(ADC_SATURATION);
        if ceiling <= floor {
            return Err(ConfigError::Validation(format!(
                "saturation_ceiling ({ceiling}) must be above noise_floor ({floor})"
            )));
        }
        if let Some(v) = analysis.reference_volts {
            if !(v > 0.0) {
                return Err(ConfigError::Validation("reference_volts must be > 0".into()));
            }
        }
        if let Some(bits) = analysis.adc_bits {
            if !(1..=16).contains(&bits) {
                return Err(ConfigError::Validation("adc_bits must be 1..=16".into()));
            }
        }
        if let Some(v) = analysis.peak_threshold_volts {
            if !(v > 0.0) {
                return Err(ConfigError::Validation("peak_threshold_volts must be > 0".into()));
            }
        }
        if analysis.min_peak_duration == Some(0) {
            return Err(ConfigError::Validation("min_peak_duration must be >= 1".into()));
        }
    }

    if let Some(display) = cfg.display.as_ref() {
        if let Some(cells) = display.cells {
            if cells == 0 || cells > GRAPH_CELLS {
                return Err(ConfigError::Validation(format!("display cells must be 1..={}", GRAPH_CELLS)));
            }
        }
        if let Some(BusConfig::I2c { address, .. }) = display.bus.as_ref() {
            if *address > 0x7F {
                return Err(ConfigError::Validation("I2C address must be 7-bit".into()));
            }
        }
    }

    if let Some(sim) = cfg.simulation.as_ref() {
        if let Some(p) = sim.burst_chance {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Validation("simulation burst_chance must be 0..=1".into()));
            }
        }
    }
    Ok(())
}

/// BCM pin numbers of the front panel inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioPins {
    pub trigger: u8,
    pub encoder_clk: u8,
    pub encoder_dt: u8,
    pub next_peak: u8,
}

impl Default for GpioPins {
    fn default() -> Self {
        Self { trigger: 21, encoder_clk: 5, encoder_dt: 4, next_peak: 3 }
    }
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub capacity: usize,
    pub sample_interval: Duration,
    pub debounce: Duration,
}

#[derive(Debug, Clone)]
pub struct AnalysisSettings {
    pub noise_floor: u16,
    pub noise_threshold: u16,
    pub saturation_ceiling: u16,
    pub reference_volts: f32,
    pub adc_bits: u8,
    pub peak_threshold_volts: f32,
    pub min_peak_duration: usize,
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub cells: usize,
    pub marker: MarkerPosition,
    pub driver: DriverKind,
    pub bus: BusConfig,
}

/// A validated [`Config`] with every default filled in.
#[derive(Debug, Clone)]
pub struct Settings {
    pub log_level: String,
    pub replay: Option<PathBuf>,
    pub seed: Option<u64>,
    pub capture: CaptureSettings,
    pub analysis: AnalysisSettings,
    pub display: DisplaySettings,
    pub gpio: GpioPins,
    pub simulation: SimulationProfile,
}

impl Settings {
    pub fn resolve(cfg: &Config) -> Self {
        let capture = cfg.capture.clone().unwrap_or_default();
        let analysis = cfg.analysis.clone().unwrap_or_default();
        let display = cfg.display.clone().unwrap_or_default();
        let gpio = cfg.gpio.clone().unwrap_or_default();
        let sim = cfg.simulation.clone().unwrap_or_default();
        let pins = GpioPins::default();
        let profile = SimulationProfile::default();

        Self {
            log_level: cfg.log_level.clone().unwrap_or_else(|| "info".to_string()),
            replay: cfg.replay.clone(),
            seed: sim.seed,
            capture: CaptureSettings {
                capacity: capture.capacity.unwrap_or(SAMPLE_CAPACITY),
                sample_interval: Duration::from_millis(capture.sample_interval_ms.unwrap_or(SAMPLE_INTERVAL_MS)),
                debounce: Duration::from_millis(capture.debounce_ms.unwrap_or(TRIGGER_DEBOUNCE_MS)),
            },
            analysis: AnalysisSettings {
                noise_floor: analysis.noise_floor.unwrap_or(ADC_NOISE_FLOOR),
                noise_threshold: analysis.noise_threshold.unwrap_or(ADC_NOISE_THRESHOLD),
                saturation_ceiling: analysis.saturation_ceiling.unwrap_or(ADC_SATURATION),
                reference_volts: analysis.reference_volts.unwrap_or(ADC_REFERENCE_VOLTS),
                adc_bits: analysis.adc_bits.unwrap_or(ADC_BITS),
                peak_threshold_volts: analysis.peak_threshold_volts.unwrap_or(PEAK_THRESHOLD_VOLTS),
                min_peak_duration: analysis.min_peak_duration.unwrap_or(MIN_PEAK_DURATION),
            },
            display: DisplaySettings {
                cells: display.cells.unwrap_or(GRAPH_CELLS),
                marker: display.marker.unwrap_or_default(),
                driver: display.driver.unwrap_or_default(),
                bus: display.bus.unwrap_or_default(),
            },
            gpio: GpioPins {
                trigger: gpio.trigger.unwrap_or(pins.trigger),
                encoder_clk: gpio.encoder_clk.unwrap_or(pins.encoder_clk),
                encoder_dt: gpio.encoder_dt.unwrap_or(pins.encoder_dt),
                next_peak: gpio.next_peak.unwrap_or(pins.next_peak),
            },
            simulation: SimulationProfile {
                idle: sim.idle.unwrap_or(profile.idle),
                jitter: sim.jitter.unwrap_or(profile.jitter),
                burst_level: sim.burst_level.unwrap_or(profile.burst_level),
                burst_chance: sim.burst_chance.unwrap_or(profile.burst_chance),
                ..profile
            },
        }
    }

    pub fn slice_count(&self) -> usize {
        self.display.cells * CELL_COLUMNS
    }

    pub fn aggregator(&self) -> SliceAggregator {
        let a = &self.analysis;
        let scaler = Scaler::new(a.noise_floor, a.saturation_ceiling, self.display.marker.max_height());
        SliceAggregator::new(self.slice_count(), a.noise_floor, a.noise_threshold, scaler)
    }

    pub fn detector(&self) -> PeakDetector {
        let a = &self.analysis;
        PeakDetector::new(
            a.peak_threshold_volts,
            a.min_peak_duration,
            AdcConversion::new(a.reference_volts, a.adc_bits),
        )
    }

    pub fn renderer(&self) -> DisplayRenderer {
        DisplayRenderer::new(self.display.cells, self.display.marker)
    }
}
