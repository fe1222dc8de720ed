/// Interactive session - routes pointer, scroll and configuration input
/// through the viewport and fractal decoder into selection and playback
use tracing::info;

use crate::config::{GridConfig, TimeSignature};
use crate::error::Result;
use crate::fractal::Address;
use crate::viewport::{Point, Viewport};

pub mod clock;
pub mod playback;
pub mod selection;

use playback::{NoteTrigger, PlaybackEngine, PlaybackEvent, Scheduler, TimerHandle};
use selection::{PointerState, Selection};

pub struct Sequencer {
    config: GridConfig,
    viewport: Viewport,
    pointer: PointerState,
    selection: Selection,
    playback: PlaybackEngine,
    panning: bool,
    previewing: bool,
    last_screen: Point,
}

impl Sequencer {
    pub fn new(config: GridConfig) -> Self {
        let mut playback = PlaybackEngine::new(config.tick_interval());
        playback.set_looping(config.looping);
        Self {
            viewport: Viewport::new(config.canvas_size()),
            config,
            pointer: PointerState::default(),
            selection: Selection::default(),
            playback,
            panning: false,
            previewing: false,
            last_screen: Point::default(),
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn playback(&self) -> &PlaybackEngine {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackEngine {
        &mut self.playback
    }

    /// Digits currently drawn as nested boxes.
    pub fn revealed(&self) -> &[u8] {
        self.playback.revealed()
    }

    pub fn is_panning(&self) -> bool {
        self.panning
    }

    pub fn is_previewing(&self) -> bool {
        self.previewing
    }

    // ── Pointer input ─────────────────────────────────────────────

    pub fn pointer_moved(&mut self, screen: Point, scheduler: &mut dyn Scheduler) {
        let world = self.viewport.screen_to_world(screen);
        self.pointer.update(world, &self.config);

        if self.panning {
            self.viewport
                .pan(screen.x - self.last_screen.x, screen.y - self.last_screen.y);
        } else if self.previewing {
            self.preview_at(world, scheduler);
        }
        self.last_screen = screen;
    }

    pub fn pan_pressed(&mut self, screen: Point) {
        self.panning = true;
        self.last_screen = screen;
    }

    pub fn pan_released(&mut self) {
        self.panning = false;
    }

    /// Start a commit drag. Playback stops and the address under the
    /// pointer is previewed in full until release.
    pub fn commit_pressed(&mut self, screen: Point, scheduler: &mut dyn Scheduler) {
        self.previewing = true;
        self.last_screen = screen;
        let world = self.viewport.screen_to_world(screen);
        self.pointer.update(world, &self.config);
        self.preview_at(world, scheduler);
    }

    /// Finish a commit drag and play the selected measure.
    pub fn commit_released(&mut self, scheduler: &mut dyn Scheduler) {
        if !self.previewing {
            return;
        }
        self.previewing = false;
        if let Some(world) = self.pointer.world() {
            self.commit_at(world, scheduler);
        }
    }

    /// Commit the measure containing a world point and start playback.
    pub fn commit_at(&mut self, world: Point, scheduler: &mut dyn Scheduler) {
        self.selection = Selection::at(world, &self.config);
        info!(
            coords = %self.selection.coords_text(),
            notes = %self.selection.address(),
            "measure committed"
        );
        self.playback
            .commit(self.selection.address().clone(), scheduler);
        self.playback.start(scheduler);
    }

    fn preview_at(&mut self, world: Point, scheduler: &mut dyn Scheduler) {
        self.selection = Selection::at(world, &self.config);
        self.playback
            .preview(self.selection.address().clone(), scheduler);
    }

    pub fn scroll(&mut self, steps: i32, pivot: Point) {
        self.viewport.scroll(steps, pivot);
    }

    // ── Transport ─────────────────────────────────────────────────

    pub fn play(&mut self, scheduler: &mut dyn Scheduler) -> bool {
        self.playback.start(scheduler)
    }

    pub fn stop(&mut self, scheduler: &mut dyn Scheduler) {
        self.playback.stop(scheduler);
    }

    pub fn on_tick(
        &mut self,
        handle: TimerHandle,
        scheduler: &mut dyn Scheduler,
        trigger: &mut dyn NoteTrigger,
    ) -> Vec<PlaybackEvent> {
        self.playback.on_tick(handle, scheduler, trigger)
    }

    /// Drop the selection and everything drawn for it.
    pub fn clear(&mut self, scheduler: &mut dyn Scheduler) {
        self.playback.clear(scheduler);
        self.selection.clear();
        self.previewing = false;
    }

    /// Clear, then return the view to its initial placement.
    pub fn reset(&mut self, scheduler: &mut dyn Scheduler) {
        self.clear(scheduler);
        self.panning = false;
        self.viewport.reset();
        info!(canvas_size = self.config.canvas_size(), "view reset");
    }

    // ── Configuration ─────────────────────────────────────────────

    /// Changing the measure length changes what every address means, so
    /// playback, selection and view are all reset.
    pub fn set_notes_per_measure(
        &mut self,
        notes_per_measure: u32,
        scheduler: &mut dyn Scheduler,
    ) -> Result<()> {
        if notes_per_measure == self.config.notes_per_measure() {
            return Ok(());
        }
        self.config.set_notes_per_measure(notes_per_measure)?;
        self.playback.clear(scheduler);
        self.playback
            .set_interval(self.config.tick_interval(), scheduler);
        self.selection.clear();
        self.pointer.clear();
        self.panning = false;
        self.previewing = false;
        self.viewport = Viewport::new(self.config.canvas_size());
        info!(
            notes_per_measure,
            canvas_size = self.config.canvas_size(),
            "measure length changed"
        );
        Ok(())
    }

    pub fn set_time_signature(
        &mut self,
        signature: TimeSignature,
        scheduler: &mut dyn Scheduler,
    ) -> Result<()> {
        let notes = signature.notes_per_measure()?;
        self.set_notes_per_measure(notes, scheduler)
    }

    pub fn set_bpm(&mut self, bpm: u32, scheduler: &mut dyn Scheduler) -> Result<()> {
        self.config.set_bpm(bpm)?;
        self.playback
            .set_interval(self.config.tick_interval(), scheduler);
        info!(bpm, interval_ms = self.config.tick_interval_ms(), "tempo changed");
        Ok(())
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.config.looping = looping;
        self.playback.set_looping(looping);
    }

    // ── Export ────────────────────────────────────────────────────

    pub fn selection_coords_text(&self) -> String {
        self.selection.coords_text()
    }

    pub fn selection_notes_text(&self) -> String {
        self.selection.notes_text()
    }

    pub fn hover_label(&self) -> String {
        self.pointer.label()
    }

    pub fn selection_label(&self) -> String {
        self.selection.label()
    }

    pub fn hover_address(&self) -> &Address {
        self.pointer.address()
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(GridConfig::default())
    }
}
