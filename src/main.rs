#[cfg(feature = "gui")]
use std::path::PathBuf;
#[cfg(feature = "gui")]
use std::time::Instant;

#[cfg(feature = "gui")]
use eframe::egui;
#[cfg(feature = "gui")]
use tracing::{info, warn};

#[cfg(feature = "gui")]
use fractal_drums::{
    config::{MAX_BPM, MAX_NOTES_PER_MEASURE, MIN_BPM, MIN_NOTES_PER_MEASURE},
    render::Rgba,
    viewport::{DEFAULT_VIEW_HEIGHT, DEFAULT_VIEW_WIDTH},
    AudioOutput, DrumKit, DrumSamples, FrameClock, MidiOutputDevice, NoteSymbol, NoteTrigger,
    PlaybackEvent, Point, Scene, Sequencer,
};

#[cfg(feature = "gui")]
fn main() -> Result<(), eframe::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let kit = load_kit(std::env::args().nth(1).map(PathBuf::from));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([840.0, 820.0])
            .with_title("Fractal Drums"),
        ..Default::default()
    };

    eframe::run_native(
        "Fractal Drums",
        options,
        Box::new(|_cc| Ok(Box::new(FractalApp::new(kit)))),
    )
}

#[cfg(not(feature = "gui"))]
fn main() {
    eprintln!("This binary requires the 'gui' feature to be enabled");
    std::process::exit(1);
}

/// Kit from the command line, falling back to the bundled layout.
#[cfg(feature = "gui")]
fn load_kit(path: Option<PathBuf>) -> DrumKit {
    let Some(path) = path else {
        return DrumKit::default();
    };
    match DrumKit::load(&path) {
        Ok(kit) => match path.parent() {
            Some(dir) => kit.rebased(dir),
            None => kit,
        },
        Err(e) => {
            warn!("{}, using default kit", e);
            DrumKit::default()
        }
    }
}

/// Sends every cue to both outputs.
#[cfg(feature = "gui")]
struct Outputs<'a> {
    audio: &'a mut AudioOutput,
    midi: &'a mut MidiOutputDevice,
}

#[cfg(feature = "gui")]
impl NoteTrigger for Outputs<'_> {
    fn trigger(&mut self, symbol: NoteSymbol) {
        self.audio.trigger(symbol);
        self.midi.trigger(symbol);
    }
}

#[cfg(feature = "gui")]
struct FractalApp {
    sequencer: Sequencer,
    clock: FrameClock,
    audio_output: AudioOutput,
    midi_output: MidiOutputDevice,

    // UI state
    available_midi_ports: Vec<String>,
    selected_port: Option<usize>,
    last_frame: Instant,
    status: Option<String>,
}

#[cfg(feature = "gui")]
impl FractalApp {
    fn new(kit: DrumKit) -> Self {
        let samples = DrumSamples::load(&kit);
        let audio_output = match AudioOutput::new(samples.clone()) {
            Ok(output) => output,
            Err(e) => {
                warn!("{}, continuing without sound", e);
                AudioOutput::disabled(samples)
            }
        };

        Self {
            sequencer: Sequencer::default(),
            clock: FrameClock::new(),
            audio_output,
            midi_output: MidiOutputDevice::new(),
            available_midi_ports: MidiOutputDevice::available_ports(),
            selected_port: None,
            last_frame: Instant::now(),
            status: None,
        }
    }

    fn advance_clock(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;

        for handle in self.clock.advance(delta) {
            let mut outputs = Outputs {
                audio: &mut self.audio_output,
                midi: &mut self.midi_output,
            };
            let events = self
                .sequencer
                .on_tick(handle, &mut self.clock, &mut outputs);
            for event in events {
                if event == PlaybackEvent::Finished {
                    info!("measure finished");
                }
            }
        }
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let (clear, play, reset, stop) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::C),
                i.key_pressed(egui::Key::P),
                i.key_pressed(egui::Key::R),
                i.key_pressed(egui::Key::S),
            )
        });
        if clear {
            self.sequencer.clear(&mut self.clock);
        }
        if play {
            self.sequencer.play(&mut self.clock);
        }
        if reset {
            self.sequencer.reset(&mut self.clock);
        }
        if stop {
            self.sequencer.stop(&mut self.clock);
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        // MIDI Port Selection
        let mut selected_port_changed = None;
        ui.horizontal(|ui| {
            ui.label("MIDI Output:");
            if self.available_midi_ports.is_empty() {
                ui.label("No MIDI ports available");
            } else {
                egui::ComboBox::from_label("")
                    .selected_text(
                        self.selected_port
                            .and_then(|i| self.available_midi_ports.get(i))
                            .map(String::as_str)
                            .unwrap_or("Select port..."),
                    )
                    .show_ui(ui, |ui| {
                        for (i, port_name) in self.available_midi_ports.iter().enumerate() {
                            if ui
                                .selectable_label(self.selected_port == Some(i), port_name)
                                .clicked()
                            {
                                selected_port_changed = Some(i);
                            }
                        }
                    });
            }
        });

        if let Some(port_idx) = selected_port_changed {
            match self.midi_output.connect(port_idx) {
                Ok(()) => self.selected_port = Some(port_idx),
                Err(e) => self.status = Some(e.to_string()),
            }
        }

        ui.add_space(6.0);

        // Transport controls
        ui.horizontal(|ui| {
            if self.sequencer.playback().is_running() {
                if ui.button("⏸ Stop").clicked() {
                    self.sequencer.stop(&mut self.clock);
                }
            } else if ui.button("▶ Play").clicked() {
                self.sequencer.play(&mut self.clock);
            }
            if ui.button("Clear").clicked() {
                self.sequencer.clear(&mut self.clock);
            }
            if ui.button("Reset view").clicked() {
                self.sequencer.reset(&mut self.clock);
            }

            let mut looping = self.sequencer.config().looping;
            if ui.checkbox(&mut looping, "Loop").changed() {
                self.sequencer.set_looping(looping);
            }
        });

        ui.horizontal(|ui| {
            ui.label("Notes:");
            let mut notes = self.sequencer.config().notes_per_measure();
            if ui
                .add(egui::Slider::new(&mut notes, MIN_NOTES_PER_MEASURE..=MAX_NOTES_PER_MEASURE))
                .changed()
            {
                if let Err(e) = self.sequencer.set_notes_per_measure(notes, &mut self.clock) {
                    self.status = Some(e.to_string());
                }
            }

            ui.add_space(20.0);

            ui.label("BPM:");
            let mut bpm = self.sequencer.config().bpm();
            if ui
                .add(egui::Slider::new(&mut bpm, MIN_BPM..=MAX_BPM).step_by(1.0))
                .changed()
            {
                if let Err(e) = self.sequencer.set_bpm(bpm, &mut self.clock) {
                    self.status = Some(e.to_string());
                }
            }
        });

        ui.add_space(6.0);

        ui.label(self.sequencer.hover_label());
        ui.horizontal(|ui| {
            ui.label(self.sequencer.selection_label());
            if ui.button("Copy coords").clicked() {
                let text = self.sequencer.selection_coords_text();
                ui.output_mut(|o| o.copied_text = text);
            }
            if ui.button("Copy notes").clicked() {
                let text = self.sequencer.selection_notes_text();
                ui.output_mut(|o| o.copied_text = text);
            }
        });
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let size = egui::vec2(DEFAULT_VIEW_WIDTH as f32, DEFAULT_VIEW_HEIGHT as f32);
        let (response, painter) = ui.allocate_painter(size, egui::Sense::click_and_drag());
        let origin = response.rect.min;
        let to_local = |pos: egui::Pos2| Point::new((pos.x - origin.x) as f64, (pos.y - origin.y) as f64);

        let (pointer, pressed, released, scroll) = ui.input(|i| {
            (
                i.pointer.hover_pos(),
                (
                    i.pointer.button_pressed(egui::PointerButton::Primary),
                    i.pointer.button_pressed(egui::PointerButton::Secondary),
                ),
                (
                    i.pointer.button_released(egui::PointerButton::Primary),
                    i.pointer.button_released(egui::PointerButton::Secondary),
                ),
                i.raw_scroll_delta.y,
            )
        });

        if let Some(pos) = pointer.filter(|_| response.hovered() || response.dragged()) {
            let screen = to_local(pos);
            if pressed.0 {
                self.sequencer.pan_pressed(screen);
            }
            if pressed.1 {
                self.sequencer.commit_pressed(screen, &mut self.clock);
            }
            self.sequencer.pointer_moved(screen, &mut self.clock);
            if scroll != 0.0 {
                self.sequencer.scroll(scroll.signum() as i32, screen);
            }
        }
        if released.0 {
            self.sequencer.pan_released();
        }
        if released.1 {
            self.sequencer.commit_released(&mut self.clock);
        }

        let scene = fractal_drums::render(
            self.sequencer.viewport(),
            self.sequencer.config(),
            self.sequencer.revealed(),
            DEFAULT_VIEW_WIDTH,
            DEFAULT_VIEW_HEIGHT,
        );
        paint_scene(&painter, origin, &scene);
    }
}

#[cfg(feature = "gui")]
fn color32(c: Rgba) -> egui::Color32 {
    let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    egui::Color32::from_rgba_unmultiplied(byte(c.r), byte(c.g), byte(c.b), byte(c.a))
}

#[cfg(feature = "gui")]
fn paint_scene(painter: &egui::Painter, origin: egui::Pos2, scene: &Scene) {
    let pos = |x: f64, y: f64| origin + egui::vec2(x as f32, y as f32);
    let rect = |r: &fractal_drums::render::ScreenRect| {
        egui::Rect::from_min_size(pos(r.x, r.y), egui::vec2(r.w as f32, r.h as f32))
    };

    painter.rect_filled(painter.clip_rect(), 0.0, egui::Color32::from_gray(40));
    painter.rect_filled(rect(&scene.background), 0.0, egui::Color32::WHITE);

    for level in &scene.grid {
        let stroke = egui::Stroke::new(fractal_drums::render::GRID_LINE_WIDTH, color32(level.color));
        for line in &level.lines {
            painter.line_segment([pos(line.from.x, line.from.y), pos(line.to.x, line.to.y)], stroke);
        }
    }

    painter.rect_stroke(
        rect(&scene.border),
        0.0,
        egui::Stroke::new(fractal_drums::render::OUTLINE_WIDTH, color32(scene.border_color)),
    );

    for note in &scene.notes {
        let r = rect(&note.rect);
        painter.rect_filled(r, 0.0, color32(note.fill));
        painter.rect_stroke(
            r,
            0.0,
            egui::Stroke::new(fractal_drums::render::OUTLINE_WIDTH, color32(note.outline)),
        );
    }
}

#[cfg(feature = "gui")]
impl eframe::App for FractalApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.advance_clock();
        self.handle_keys(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Fractal Drums");
            ui.add_space(6.0);

            self.controls(ui);
            ui.add_space(6.0);
            self.canvas(ui);

            ui.separator();
            ui.label("Left drag: pan   Right drag: pick a measure   Wheel: zoom   C/P/R/S: clear/play/reset/stop");
            if !self.audio_output.is_enabled() {
                ui.colored_label(egui::Color32::YELLOW, "⚠ No audio device - sound disabled");
            }
            if let Some(status) = &self.status {
                ui.colored_label(egui::Color32::YELLOW, format!("⚠ {}", status));
            }
        });

        match self.clock.until_next_tick() {
            Some(wait) => ctx.request_repaint_after(wait),
            None => ctx.request_repaint_after(std::time::Duration::from_millis(250)),
        }
    }
}
