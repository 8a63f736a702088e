/*
 *  review.rs
 *
 *  sndscope - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  Main loop pass: analyse a finished capture, then follow the encoder
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

use log::{debug, info};

use crate::capture::{CaptureController, CaptureState};
use crate::display::readout;
use crate::display::render::DisplayRenderer;
use crate::display::{DisplayError, DisplaySink};
use crate::navigation::{NavMailbox, NavigationController, PendingInput, RedrawRequest};
use crate::peaks::{PeakDetector, PeakRegion};
use crate::slices::{Slice, SliceAggregator};
use crate::timing::ScopedTimer;

/// Everything derived from one captured window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    pub collected: usize,
    pub slice_width: usize,
    pub slices: Vec<Slice>,
    pub peaks: Vec<PeakRegion>,
}

/// What one [`ReviewLoop::step`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// A completed capture was analysed and drawn
    pub analyzed: bool,
    /// Navigation was shut off because a new capture started
    pub suspended: bool,
    /// The cursor readout and its cells were redrawn
    pub redrawn: bool,
}

/// The single cooperative main loop. Owns the navigation state and the
/// display; reaches the capture and the edge context only through atomics.
pub struct ReviewLoop<S: DisplaySink> {
    sink: S,
    capture: Arc<CaptureController>,
    mailbox: Arc<NavMailbox>,
    aggregator: SliceAggregator,
    detector: PeakDetector,
    renderer: DisplayRenderer,
    navigation: NavigationController,
    samples: Vec<u16>,
    analysis: Analysis,
    cycles: u64,
}

impl<S: DisplaySink> ReviewLoop<S> {
    pub fn new(
        sink: S,
        capture: Arc<CaptureController>,
        mailbox: Arc<NavMailbox>,
        aggregator: SliceAggregator,
        detector: PeakDetector,
        renderer: DisplayRenderer,
    ) -> Self {
        debug_assert!(aggregator.count() <= renderer.cells() * crate::constants::CELL_COLUMNS);
        let samples = Vec::with_capacity(capture.capacity());
        Self {
            sink,
            capture,
            mailbox,
            aggregator,
            detector,
            renderer,
            navigation: NavigationController::new(),
            samples,
            analysis: Analysis::default(),
            cycles: 0,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn navigation(&self) -> &NavigationController {
        &self.navigation
    }

    pub fn analysis(&self) -> &Analysis {
        &self.analysis
    }

    pub fn slices(&self) -> &[Slice] {
        &self.analysis.slices
    }

    pub fn peaks(&self) -> &[PeakRegion] {
        &self.analysis.peaks
    }

    /// Completed review cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Start-up screen.
    pub fn greet(&mut self) -> Result<(), DisplayError> {
        self.sink.clear()?;
        self.sink.write_placed(&readout::prompt())
    }

    /// Slices and peaks of `samples`. Pure: the same window always gives
    /// the same answer.
    pub fn analyze(&self, samples: &[u16]) -> Analysis {
        let _timer = ScopedTimer::new("analyze");
        let collected = samples.len();
        let slice_width = self.aggregator.slice_width(collected);
        let slices = self.aggregator.aggregate(samples);
        let peaks = self.detector.detect(samples, &slices, slice_width);
        Analysis { collected, slice_width, slices, peaks }
    }

    /// One pass of the main loop.
    pub fn step(&mut self) -> Result<StepOutcome, DisplayError> {
        let mut outcome = StepOutcome::default();

        match self.capture.state() {
            CaptureState::Complete => {
                self.review_capture()?;
                outcome.analyzed = true;
            }
            CaptureState::Collecting if self.navigation.is_active() => {
                debug!("New capture running, navigation off");
                self.navigation.disarm();
                self.mailbox.disarm();
                outcome.suspended = true;
            }
            _ => {}
        }

        if let Some(input) = self.mailbox.take() {
            self.apply(input);
        }
        if let Some(request) = self.navigation.redraw_request() {
            self.redraw(&request)?;
            self.navigation.confirm_redraw(request);
            outcome.redrawn = true;
        }
        Ok(outcome)
    }

    fn review_capture(&mut self) -> Result<(), DisplayError> {
        self.navigation.disarm();
        self.mailbox.disarm();

        let collected = self.capture.snapshot_into(&mut self.samples);
        let analysis = self.analyze(&self.samples[..collected]);
        info!(
            "Effective samples count: {}; slice length {}; {} peaks",
            analysis.collected,
            analysis.slice_width,
            analysis.peaks.len()
        );

        self.sink.clear()?;
        for (cell, bitmap) in self.renderer.render_graph(&analysis.slices) {
            self.sink.write_cell(cell as u8, &bitmap)?;
        }
        self.sink.write_placed(&readout::slice_info(analysis.collected, analysis.slice_width))?;
        self.sink.write_placed(&readout::peak_count(analysis.peaks.len()))?;

        self.analysis = analysis;
        self.navigation.arm(self.aggregator.count());
        self.mailbox.arm();
        self.capture.finish_cycle();
        self.cycles += 1;
        Ok(())
    }

    fn apply(&mut self, input: PendingInput) {
        if input.rotation != 0 {
            self.navigation.rotate_by(input.rotation);
        }
        for _ in 0..input.peak_jumps {
            self.navigation.jump_to_next_peak(&self.analysis.peaks);
        }
    }

    fn redraw(&mut self, request: &RedrawRequest) -> Result<(), DisplayError> {
        let conversion = self.detector.conversion();
        if let Some(slice) = self.analysis.slices.get(request.current) {
            let text = readout::cursor_readout(
                request.current,
                conversion.volts(slice.average),
                conversion.volts(slice.maximum),
            );
            self.sink.write_placed(&text)?;
        }
        if let Some(peak) = request.peak.and_then(|i| self.analysis.peaks.get(i)) {
            for text in readout::peak_info(peak) {
                self.sink.write_placed(&text)?;
            }
        }
        for (cell, bitmap) in self.renderer.redraw_cells(request, &self.analysis.slices) {
            self.sink.write_cell(cell as u8, &bitmap)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Settings};
    use crate::display::MockSink;
    use crate::navigation::Direction;
    use crate::source::ReplaySource;
    use crate::ticker::ManualTicker;
    use std::time::Duration;

    struct Rig {
        review: ReviewLoop<MockSink>,
        sink: MockSink,
        capture: Arc<CaptureController>,
        mailbox: Arc<NavMailbox>,
        ticks: ManualTicker,
    }

    fn rig(capacity: usize) -> Rig {
        let settings = Settings::resolve(&Config::default());
        let capture = Arc::new(CaptureController::new(capacity, Duration::from_millis(1), Duration::from_millis(100)));
        let mailbox = Arc::new(NavMailbox::new());
        let sink = MockSink::new();
        let review = ReviewLoop::new(
            sink.clone(),
            capture.clone(),
            mailbox.clone(),
            settings.aggregator(),
            settings.detector(),
            settings.renderer(),
        );
        Rig { review, sink, capture, mailbox, ticks: ManualTicker::default() }
    }

    fn fill(rig: &Rig, samples: Vec<u16>) {
        let mut source = ReplaySource::new(samples);
        rig.capture.start(&rig.ticks);
        while rig.capture.state() == CaptureState::Collecting {
            rig.capture.tick(&mut source);
        }
    }

    fn burst_window() -> Vec<u16> {
        let mut samples = vec![2000u16; 4000];
        samples[1000..=1050].fill(3256); // ~2.6 V
        samples
    }

    #[test]
    fn test_idle_step_does_nothing() {
        let mut rig = rig(4000);
        rig.review.greet().unwrap();
        assert_eq!(rig.review.step().unwrap(), StepOutcome::default());
        assert_eq!(rig.sink.state().lock().unwrap().text_at(0, 0, 12), "Press button");
    }

    #[test]
    fn test_complete_capture_is_analysed_once() {
        let mut rig = rig(4000);
        fill(&rig, burst_window());
        let outcome = rig.review.step().unwrap();
        assert!(outcome.analyzed);
        assert_eq!(rig.capture.state(), CaptureState::Idle);
        assert_eq!(rig.review.peaks().len(), 1);
        assert_eq!(rig.review.peaks()[0].slice, 10);
        assert!(rig.review.navigation().is_active());
        assert!(rig.mailbox.is_armed());
        assert!(!rig.review.step().unwrap().analyzed);
        assert_eq!(rig.review.cycles(), 1);

        let state = rig.sink.state();
        let state = state.lock().unwrap();
        assert_eq!(state.text_at(0, 8, 8), "4000/100");
        assert_eq!(state.text_at(1, 0, 1), "1");
        assert_eq!(state.glyphs.iter().filter(|g| g.is_some()).count(), 8);
    }

    #[test]
    fn test_rotation_redraws_readout_and_cell() {
        let mut rig = rig(4000);
        fill(&rig, burst_window());
        rig.review.step().unwrap();
        let writes_before = rig.sink.state().lock().unwrap().cell_writes.len();

        for _ in 0..10 {
            rig.mailbox.post_rotation(Direction::Clockwise);
        }
        let outcome = rig.review.step().unwrap();
        assert!(outcome.redrawn);
        assert_eq!(rig.review.navigation().current(), 10);
        assert!(!rig.mailbox.is_dirty());

        let state = rig.sink.state();
        let state = state.lock().unwrap();
        assert!(state.text_at(1, 2, 14).starts_with("11/"));
        // first redraw has no previous cell to restore
        assert_eq!(state.cell_writes.len(), writes_before + 1);
        assert_eq!(state.cell_writes.last().unwrap().0, 2);
        assert!(state.cell_writes.last().unwrap().1.is_set(0, 0));
    }

    #[test]
    fn test_failed_cross_cell_redraw_is_repaired() {
        let mut rig = rig(4000);
        fill(&rig, vec![2000; 4000]);
        rig.review.step().unwrap();
        for _ in 0..2 {
            rig.mailbox.post_rotation(Direction::Clockwise);
        }
        rig.review.step().unwrap();

        rig.sink.set_simulate_failure(true);
        for _ in 0..5 {
            rig.mailbox.post_rotation(Direction::Clockwise);
        }
        assert!(rig.review.step().is_err());
        assert!(rig.review.navigation().is_dirty());

        rig.sink.set_simulate_failure(false);
        assert!(rig.review.step().unwrap().redrawn);
        assert_eq!(rig.review.navigation().current(), 7);
        {
            let state = rig.sink.state();
            let state = state.lock().unwrap();
            assert!(!state.glyphs[0].unwrap().is_set(0, 2));
            assert!(state.glyphs[1].unwrap().is_set(0, 2));
        }

        rig.mailbox.post_rotation(Direction::Clockwise);
        rig.review.step().unwrap();
        let state = rig.sink.state();
        let state = state.lock().unwrap();
        assert!(state.text_at(1, 2, 14).starts_with(" 9/"));
        assert_eq!(state.glyphs[0].unwrap().rows()[0], 0);
        assert!(state.glyphs[1].unwrap().is_set(0, 3));
    }

    #[test]
    fn test_peak_jump_shows_peak_info() {
        let mut rig = rig(4000);
        fill(&rig, burst_window());
        rig.review.step().unwrap();
        rig.mailbox.post_peak_jump();
        rig.review.step().unwrap();
        assert_eq!(rig.review.navigation().current(), 10);
        assert_eq!(rig.review.navigation().peak(), Some(0));
        let state = rig.sink.state();
        let state = state.lock().unwrap();
        assert_eq!(state.text_at(0, 8, 8), "  11/100");
    }

    #[test]
    fn test_peak_jump_without_peaks_changes_nothing() {
        let mut rig = rig(4000);
        fill(&rig, vec![2000; 4000]);
        rig.review.step().unwrap();
        rig.mailbox.post_peak_jump();
        let outcome = rig.review.step().unwrap();
        assert!(!outcome.redrawn);
        assert_eq!(rig.review.navigation().current(), 0);
        assert!(!rig.mailbox.is_dirty());
    }

    #[test]
    fn test_new_capture_suspends_navigation() {
        let mut rig = rig(100);
        fill(&rig, vec![2000; 100]);
        rig.review.step().unwrap();
        assert!(rig.review.navigation().is_active());

        rig.capture.start(&rig.ticks);
        let outcome = rig.review.step().unwrap();
        assert!(outcome.suspended);
        assert!(!rig.review.navigation().is_active());
        assert!(!rig.mailbox.post_rotation(Direction::Clockwise));
    }

    #[test]
    fn test_empty_capture() {
        let mut rig = rig(4000);
        rig.capture.start(&rig.ticks);
        rig.capture.stop(&rig.ticks);
        rig.review.step().unwrap();
        let analysis = rig.review.analysis();
        assert_eq!(analysis.collected, 0);
        assert_eq!(analysis.slice_width, 1);
        assert!(analysis.peaks.is_empty());
        assert!(analysis.slices.iter().all(|s| s.height == 1));
    }

    #[test]
    fn test_analyze_is_idempotent() {
        let rig = rig(4000);
        let samples = burst_window();
        assert_eq!(rig.review.analyze(&samples), rig.review.analyze(&samples));
    }

    #[test]
    fn test_display_error_propagates_and_retries() {
        let mut rig = rig(100);
        fill(&rig, vec![2000; 100]);
        rig.sink.set_simulate_failure(true);
        assert!(rig.review.step().is_err());
        assert_eq!(rig.capture.state(), CaptureState::Complete);
        rig.sink.set_simulate_failure(false);
        assert!(rig.review.step().unwrap().analyzed);
    }
}
