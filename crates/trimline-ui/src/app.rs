// crates/trimline-ui/src/app.rs
//
// TrimlineApp: one source, one timeline strip, trim + export controls.
//
// The engine's listener cannot borrow the app, so callbacks are forwarded
// over a channel and drained after the engine calls of each frame.

use std::path::PathBuf;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use eframe::egui;
use rfd::FileDialog;
use tracing::{error, info};

use trimline_core::helpers::time::{format_duration, format_timestamp};
use trimline_core::media_types::TrimPhase;
use trimline_core::{TimelineConfig, TimelineError, TimelineListener};
use trimline_media::{FfmpegBackend, TimelineEngine};

use crate::helpers::format::{file_label, middle_ellipsis};
use crate::input::GestureMapper;
use crate::paint::{paint_timeline, TextureCache};
use crate::theme::{configure_style, ACCENT, DARK_TEXT_DIM, ERROR_TEXT};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "mkv", "webm", "avi"];
/// Vertical room around the thumbnails for the playhead and the indicator.
const STRIP_PADDING: f32 = 28.0;

// ── Listener bridge ──────────────────────────────────────────────────────────

enum UiEvent {
    Position(i64),
    Range(i64, i64),
    TrimMode(bool),
    TrimComplete(Result<PathBuf, TimelineError>),
}

struct ChannelListener(Sender<UiEvent>);

impl TimelineListener for ChannelListener {
    fn on_position_changed(&mut self, position_ms: i64) {
        let _ = self.0.send(UiEvent::Position(position_ms));
    }

    fn on_trim_range_changed(&mut self, start_ms: i64, end_ms: i64) {
        let _ = self.0.send(UiEvent::Range(start_ms, end_ms));
    }

    fn on_trim_mode_changed(&mut self, active: bool) {
        let _ = self.0.send(UiEvent::TrimMode(active));
    }

    fn on_trim_complete(&mut self, result: Result<PathBuf, TimelineError>) {
        let _ = self.0.send(UiEvent::TrimComplete(result));
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

struct Status {
    text:     String,
    is_error: bool,
}

pub struct TrimlineApp {
    engine:      TimelineEngine<FfmpegBackend>,
    events:      Receiver<UiEvent>,
    textures:    TextureCache,
    gestures:    GestureMapper,
    position_ms: i64,
    trim:        Option<(i64, i64)>,
    /// Simulated playback driving `set_playhead_position`.
    playing:     bool,
    status:      Option<Status>,
}

impl TrimlineApp {
    pub fn new(
        cc:      &eframe::CreationContext<'_>,
        config:  TimelineConfig,
        backend: FfmpegBackend,
        out_dir: PathBuf,
        file:    Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        configure_style(&cc.egui_ctx);
        cc.egui_ctx.options_mut(|o| {
            o.theme_preference = egui::ThemePreference::Dark;
        });

        let (tx, events) = unbounded();
        let engine = TimelineEngine::new(config, backend, out_dir, Box::new(ChannelListener(tx)))?;
        let mut app = Self {
            engine,
            events,
            textures: TextureCache::default(),
            gestures: GestureMapper::default(),
            position_ms: 0,
            trim: None,
            playing: false,
            status: None,
        };
        if let Some(path) = file {
            app.open_source(path);
        }
        Ok(app)
    }

    fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.status = Some(Status { text: text.into(), is_error });
    }

    fn open_source(&mut self, path: PathBuf) {
        self.playing = false;
        self.trim = None;
        self.position_ms = 0;
        self.textures.clear();
        match self.engine.set_source(&path) {
            Ok(duration_ms) => {
                info!("[app] opened {}", path.display());
                self.set_status(format!("{} · {}", file_label(&path), format_duration(duration_ms)), false);
            }
            Err(e) => {
                error!("[app] {e}");
                self.set_status(e.to_string(), true);
            }
        }
    }

    fn start_export(&mut self) {
        self.playing = false;
        match self.engine.export_trim() {
            Ok(dst) => self.set_status(format!("exporting → {}", dst.display()), false),
            Err(e) => self.set_status(e.to_string(), true),
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                UiEvent::Position(ms) => self.position_ms = ms,
                UiEvent::Range(start, end) => self.trim = Some((start, end)),
                UiEvent::TrimMode(false) => self.trim = None,
                UiEvent::TrimMode(true) => {}
                UiEvent::TrimComplete(Ok(path)) => self.set_status(format!("saved {}", path.display()), false),
                UiEvent::TrimComplete(Err(e)) => self.set_status(format!("export failed: {e}"), true),
            }
        }
    }

    fn advance_playback(&mut self, dt: Duration) {
        if !self.playing {
            return;
        }
        let duration = self.engine.view().state().duration_ms;
        self.position_ms = (self.position_ms + dt.as_millis() as i64).min(duration);
        self.engine.set_playhead_position(self.position_ms);
        if self.position_ms >= duration {
            self.playing = false;
        }
    }

    fn handle_drag_and_drop(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.iter().find_map(|f| f.path.clone()));
        if let Some(path) = dropped {
            self.open_source(path);
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_centered(|ui| {
            ui.label(egui::RichText::new("✂ Trimline").strong().size(15.0).color(ACCENT));
            ui.separator();

            if ui.button("Open…").clicked() {
                if let Some(path) = FileDialog::new().add_filter("Video", VIDEO_EXTENSIONS).pick_file() {
                    self.open_source(path);
                }
            }

            let has_source = self.engine.view().has_source();
            let play_label = if self.playing { "⏸" } else { "▶" };
            if ui.add_enabled(has_source, egui::Button::new(play_label)).clicked() {
                self.playing = !self.playing;
            }

            let mut trim_on = self.engine.view().trim_range().is_some();
            if ui
                .add_enabled(has_source, egui::Button::new("Trim").selected(trim_on))
                .clicked()
            {
                trim_on = !trim_on;
                match self.engine.enable_trim_mode(trim_on) {
                    Ok(()) if trim_on => self.playing = false,
                    Ok(()) => {}
                    Err(e) => self.set_status(e.to_string(), true),
                }
            }

            let can_export = trim_on && !self.engine.is_exporting();
            if ui.add_enabled(can_export, egui::Button::new("Export")).clicked() {
                self.start_export();
            }

            ui.separator();
            let out = self.engine.output_dir().display().to_string();
            if ui
                .button(format!("Output: {}", middle_ellipsis(&out, 40)))
                .on_hover_text(&out)
                .clicked()
            {
                let picked = FileDialog::new().set_directory(self.engine.output_dir()).pick_folder();
                if let Some(dir) = picked {
                    self.engine.set_output_dir(dir);
                }
            }
        });
    }

    fn status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal_centered(|ui| {
            let duration = self.engine.view().state().duration_ms;
            ui.monospace(format!("{} / {}", format_timestamp(self.position_ms), format_timestamp(duration)));
            if let Some((start, end)) = self.trim {
                ui.separator();
                ui.monospace(format!(
                    "trim {} – {} ({})",
                    format_timestamp(start),
                    format_timestamp(end),
                    format_duration(end - start)
                ));
            }
            match self.engine.export_phase() {
                TrimPhase::Idle => {}
                phase => {
                    ui.separator();
                    ui.label(egui::RichText::new(format!("{phase:?}")).color(DARK_TEXT_DIM));
                }
            }
            if let Some(status) = &self.status {
                ui.separator();
                let color = if status.is_error { ERROR_TEXT } else { DARK_TEXT_DIM };
                ui.label(egui::RichText::new(&status.text).color(color));
            }
        });
    }
}

// ── eframe::App ───────────────────────────────────────────────────────────────

impl eframe::App for TrimlineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_drag_and_drop(ctx);
        let dt = Duration::from_secs_f32(ctx.input(|i| i.stable_dt).max(0.0).min(0.1));
        if ctx.input(|i| i.key_pressed(egui::Key::Space)) && self.engine.view().has_source() {
            self.playing = !self.playing;
        }

        let mut repaint = self.engine.pump();
        repaint |= self.engine.tick(dt);
        self.advance_playback(dt);

        egui::TopBottomPanel::top("toolbar")
            .exact_height(36.0)
            .show(ctx, |ui| self.toolbar(ui));

        egui::TopBottomPanel::bottom("status")
            .exact_height(26.0)
            .show(ctx, |ui| self.status_bar(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            let thumb_h = self.engine.view().config().thumb_height;
            let height = (thumb_h + STRIP_PADDING * 2.0).min(ui.available_height());
            let (rect, response) = ui.allocate_exact_size(
                egui::vec2(ui.available_width(), height),
                egui::Sense::click_and_drag(),
            );
            self.engine.set_viewport(rect.width(), rect.height());
            self.gestures.handle(ui, &response, rect, &mut self.engine);

            let ops = self.engine.render();
            let generation = self.engine.view().generation();
            paint_timeline(&ui.painter_at(rect), rect, &ops, &mut self.textures, generation);
        });

        self.drain_events();
        if repaint || self.playing || self.engine.view().is_animating() {
            ctx.request_repaint();
        }
    }
}
