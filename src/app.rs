use crate::backdrop::Backdrop;
use crate::braille;
use crate::color::{Rgba, Theme};
use crate::config::AppConfig;
use crate::cursor::Cursor;
use crate::error::{FieldError, Result};
use crate::export::{self, GifRecorder};
use crate::field::ParticleField;
use crate::pointer::{PointerSnapshot, PointerTracker};
use crate::presets::{Preset, PresetManager};
use crate::settings::FieldSettings;
use crate::surface::Surface;
use image::RgbaImage;
use ratatui::layout::Rect;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Viewport px per exported pixel in GIF recordings
pub const RECORD_SCALE: f32 = 0.5;
/// Longest recording started from the keyboard
pub const MAX_RECORD_FRAMES: usize = 1800;
/// How long a status line stays visible
const STATUS_TTL: Duration = Duration::from_secs(4);
/// Largest frame delta fed to the cursor springs and backdrop clock
const MAX_FRAME_DT: f32 = 0.25;

/// Focus state for parameter editing in the sidebar.
/// Params are visited in `PARAMS` order, then the controls box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    None,
    CellSize,
    ConnectRadius,
    DecayRate,
    Density,
    Fps,
    Influence,
    Jitter,
    MaxParticles,
    Preset,
    PxPerDot,
    Repel,
    Retain,
    Theme,
    // Controls box (not a param)
    Controls,
}

/// Parameters in display order
const PARAMS: [Focus; 13] = [
    Focus::CellSize,
    Focus::ConnectRadius,
    Focus::DecayRate,
    Focus::Density,
    Focus::Fps,
    Focus::Influence,
    Focus::Jitter,
    Focus::MaxParticles,
    Focus::Preset,
    Focus::PxPerDot,
    Focus::Repel,
    Focus::Retain,
    Focus::Theme,
];

impl Focus {
    /// Tab moves to the next parameter, wrapping at the end
    pub fn next(&self) -> Focus {
        match self.position() {
            Some(i) => PARAMS[(i + 1) % PARAMS.len()],
            None => PARAMS[0],
        }
    }

    /// Shift+Tab moves to the previous parameter, wrapping at the start
    pub fn prev(&self) -> Focus {
        match self.position() {
            Some(0) | None => PARAMS[PARAMS.len() - 1],
            Some(i) => PARAMS[i - 1],
        }
    }

    /// Line index in the parameters box
    pub fn line_index(&self) -> u16 {
        self.position().unwrap_or(0) as u16
    }

    /// Check if focus is on a parameter (not Controls or None)
    pub fn is_param(&self) -> bool {
        self.position().is_some()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Focus::None | Focus::Controls => "",
            Focus::CellSize => "Cell",
            Focus::ConnectRadius => "Link",
            Focus::DecayRate => "Decay",
            Focus::Density => "Density",
            Focus::Fps => "FPS",
            Focus::Influence => "Reach",
            Focus::Jitter => "Jitter",
            Focus::MaxParticles => "Max",
            Focus::Preset => "Preset",
            Focus::PxPerDot => "Dot px",
            Focus::Repel => "Repel",
            Focus::Retain => "Retain",
            Focus::Theme => "Theme",
        }
    }

    /// Every parameter in display order
    pub fn params() -> &'static [Focus] {
        &PARAMS
    }

    fn position(&self) -> Option<usize> {
        PARAMS.iter().position(|p| p == self)
    }
}

/// Everything the app needs at startup
pub struct AppOptions {
    pub config: AppConfig,
    /// Seed for the first field; reseeding draws fresh ones
    pub seed: u64,
    pub presets: PresetManager,
    pub output_dir: PathBuf,
    /// Where `save_config` and the theme preference write to
    pub config_path: Option<PathBuf>,
}

/// Main application state
pub struct App {
    pub field: ParticleField,
    pub pointer: PointerTracker,
    pub cursor: Cursor,
    pub backdrop: Backdrop,
    pub presets: PresetManager,
    pub preset_index: Option<usize>,
    pub focus: Focus,
    pub fullscreen_mode: bool,
    pub show_help: bool,
    pub help_scroll: u16,
    pub controls_scroll: u16,
    pub paused: bool,
    pub output_dir: PathBuf,
    config_path: Option<PathBuf>,
    fixed_seed: Option<u64>,
    /// Inner canvas rectangle in terminal cells, for mouse mapping
    canvas: Rect,
    recorder: Option<GifRecorder>,
    status: Option<(String, Instant)>,
    /// Seconds of backdrop animation
    backdrop_time: f32,
    last_tick: Option<Instant>,
    closed: bool,
}

impl App {
    pub fn new(canvas: Rect, options: AppOptions) -> Self {
        let AppOptions {
            config,
            seed,
            presets,
            output_dir,
            config_path,
        } = options;
        let mut settings = config.settings;
        settings.sanitize();

        let (width, height) = braille::calculate_viewport(canvas.width, canvas.height, settings.px_per_dot);
        let pointer = PointerTracker::new(Duration::from_millis(settings.idle_timeout_ms));
        let field = ParticleField::new(width, height, 1.0 / settings.px_per_dot, config.theme, settings, seed);

        Self {
            field,
            pointer,
            cursor: Cursor::new(),
            backdrop: Backdrop::new(config.blobs, config.nebula),
            presets,
            preset_index: None,
            focus: Focus::Controls,
            fullscreen_mode: false,
            show_help: false,
            help_scroll: 0,
            controls_scroll: 0,
            paused: false,
            output_dir,
            config_path,
            fixed_seed: config.seed,
            canvas,
            recorder: None,
            status: None,
            backdrop_time: 0.0,
            last_tick: None,
            closed: false,
        }
    }

    /// Produce one frame
    pub fn tick(&mut self, now: Instant) {
        let dt = self
            .last_tick
            .map(|last| now.saturating_duration_since(last).as_secs_f32().min(MAX_FRAME_DT))
            .unwrap_or(0.0);
        self.last_tick = Some(now);
        if self.paused || self.closed {
            return;
        }
        self.backdrop_time += dt;

        let snapshot = if self.field.settings.pointer_interaction {
            self.pointer.snapshot(now)
        } else {
            PointerSnapshot::idle()
        };
        self.field.frame(snapshot);

        if self.field.settings.show_cursor {
            let target = self.pointer.has_position().then(|| self.pointer.position());
            self.cursor.update(target, self.pointer.is_pressed(), dt);
            let theme = self.field.theme;
            if let Some(surface) = self.field.surface_mut() {
                self.cursor.draw(surface, theme);
            }
        }

        if self.recorder.is_some() {
            self.record_frame();
        }
    }

    fn record_frame(&mut self) {
        let result = self
            .render_image(RECORD_SCALE)
            .and_then(|image| match self.recorder.as_mut() {
                Some(recorder) => recorder.push(&image),
                None => Ok(false),
            });
        match result {
            Ok(true) => {}
            Ok(false) => self.stop_recording(),
            Err(err) => {
                log::error!("recording failed: {}", err);
                self.set_status(format!("Recording failed: {}", err));
                if let Some(recorder) = self.recorder.take() {
                    if let Err(err) = recorder.finish() {
                        log::warn!("could not close recording: {}", err);
                    }
                }
            }
        }
    }

    /// Map a terminal cell to viewport px; None outside the canvas
    pub fn cell_to_viewport(&self, column: u16, row: u16) -> Option<(f32, f32)> {
        let c = self.canvas;
        if c.width == 0 || c.height == 0 {
            return None;
        }
        if column < c.x || row < c.y || column >= c.x + c.width || row >= c.y + c.height {
            return None;
        }
        let px_per_col = self.field.width() / c.width as f32;
        let px_per_row = self.field.height() / c.height as f32;
        Some((
            (column - c.x) as f32 * px_per_col + px_per_col / 2.0,
            (row - c.y) as f32 * px_per_row + px_per_row / 2.0,
        ))
    }

    /// Mouse moved or dragged over the terminal
    pub fn on_mouse_move(&mut self, column: u16, row: u16, now: Instant) {
        if let Some((x, y)) = self.cell_to_viewport(column, row) {
            self.pointer.on_move(x, y, now);
        }
    }

    pub fn on_mouse_down(&mut self, column: u16, row: u16, now: Instant) {
        self.on_mouse_move(column, row, now);
        if self.cell_to_viewport(column, row).is_some() {
            self.pointer.on_press();
        }
    }

    pub fn on_mouse_up(&mut self) {
        self.pointer.on_release();
    }

    /// Opaque background at a viewport position: theme color plus nebula and blobs
    pub fn background_at(&self, x: f32, y: f32) -> Rgba {
        let base = self.field.theme.background();
        if !self.field.settings.show_blobs {
            return base;
        }
        self.backdrop
            .sample(x, y, self.field.width(), self.field.height(), self.backdrop_time)
            .over(&base)
    }

    /// Render the current state at `scale` pixels per viewport px
    pub fn render_image(&self, scale: f32) -> Result<RgbaImage> {
        let cursor = self.field.settings.show_cursor.then_some(&self.cursor);
        let backdrop = self.field.settings.show_blobs.then_some(&self.backdrop);
        render_image(&self.field, backdrop, self.backdrop_time, cursor, scale)
    }

    // === Actions ===

    /// Toggle pause state
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Rebuild the field from a fresh seed
    pub fn reseed(&mut self) {
        let seed = rand::random();
        self.field.reseed(seed);
        self.set_status(format!("Reseeded ({})", seed));
    }

    /// Switch dark/light and remember the preference
    pub fn toggle_theme(&mut self) {
        let theme = self.field.theme.toggle();
        self.field.set_theme(theme);
        if let Some(path) = &self.config_path {
            if let Err(err) = AppConfig::persist_theme(path, theme) {
                log::warn!("could not persist theme: {}", err);
            }
        }
    }

    pub fn toggle_pointer_interaction(&mut self) {
        self.update_settings(FieldSettings::toggle_pointer_interaction);
    }

    pub fn toggle_trails(&mut self) {
        self.update_settings(FieldSettings::toggle_trails);
    }

    pub fn toggle_connectors(&mut self) {
        self.update_settings(FieldSettings::toggle_connectors);
    }

    pub fn toggle_blobs(&mut self) {
        self.update_settings(FieldSettings::toggle_blobs);
    }

    pub fn toggle_cursor(&mut self) {
        self.update_settings(FieldSettings::toggle_cursor);
    }

    /// Toggle fullscreen mode
    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen_mode = !self.fullscreen_mode;
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
        if self.show_help {
            self.help_scroll = 0; // Reset scroll when opening
        }
    }

    /// Scroll help content up
    pub fn scroll_help_up(&mut self) {
        self.help_scroll = self.help_scroll.saturating_sub(1);
    }

    /// Scroll help content down
    pub fn scroll_help_down(&mut self, max_scroll: u16) {
        self.help_scroll = (self.help_scroll + 1).min(max_scroll);
    }

    /// Scroll controls box up
    pub fn scroll_controls_up(&mut self) {
        self.controls_scroll = self.controls_scroll.saturating_sub(1);
    }

    /// Scroll controls box down
    pub fn scroll_controls_down(&mut self, max_scroll: u16) {
        self.controls_scroll = (self.controls_scroll + 1).min(max_scroll);
    }

    /// Cycle to next focus
    pub fn next_focus(&mut self) {
        self.focus = self.focus.next();
    }

    /// Navigate to previous parameter (Shift+Tab)
    pub fn prev_focus(&mut self) {
        self.focus = self.focus.prev();
    }

    pub fn adjust_fps(&mut self, delta: i32) {
        self.update_settings(|s| s.adjust_fps(delta));
    }

    /// Handle adjusting the currently focused parameter
    pub fn adjust_focused_up(&mut self) {
        self.adjust_focused(1.0);
    }

    /// Handle adjusting the currently focused parameter
    pub fn adjust_focused_down(&mut self) {
        self.adjust_focused(-1.0);
    }

    fn adjust_focused(&mut self, sign: f32) {
        let step = sign as i32;
        match self.focus {
            Focus::None | Focus::Controls => {}
            Focus::CellSize => self.update_settings(|s| s.adjust_cell_size(5.0 * sign)),
            Focus::ConnectRadius => self.update_settings(|s| s.adjust_connect_radius(10.0 * sign)),
            Focus::DecayRate => self.update_settings(|s| s.adjust_decay_rate(0.01 * sign)),
            Focus::Density => self.update_settings(|s| s.adjust_density_divisor(sign)),
            Focus::Fps => self.adjust_fps(5 * step),
            Focus::Influence => self.update_settings(|s| s.adjust_influence_radius(25.0 * sign)),
            Focus::Jitter => self.update_settings(|s| s.adjust_curve_jitter(2.0 * sign)),
            Focus::MaxParticles => self.update_settings(|s| s.adjust_max_particles(10 * step)),
            Focus::Preset => self.cycle_preset(step),
            Focus::PxPerDot => self.update_settings(|s| s.adjust_px_per_dot(sign)),
            Focus::Repel => self.update_settings(|s| s.adjust_repel_factor(0.02 * sign)),
            Focus::Retain => self.update_settings(|s| s.adjust_velocity_retain(0.01 * sign)),
            Focus::Theme => self.toggle_theme(),
        }
    }

    /// Apply a change to the settings and propagate it
    pub fn update_settings<F: FnOnce(&mut FieldSettings)>(&mut self, change: F) {
        let mut settings = self.field.settings.clone();
        change(&mut settings);
        self.apply_settings(settings);
    }

    fn apply_settings(&mut self, settings: FieldSettings) {
        let relayout = settings.px_per_dot != self.field.settings.px_per_dot;
        self.pointer
            .set_idle_timeout(Duration::from_millis(settings.idle_timeout_ms));
        self.field.apply_settings(settings);
        if relayout {
            self.set_canvas(self.canvas);
        }
    }

    /// Step through presets; `delta` may be negative
    pub fn cycle_preset(&mut self, delta: i32) {
        let count = self.presets.len();
        if count == 0 {
            return;
        }
        let index = match self.preset_index {
            Some(i) => (i as i64 + delta as i64).rem_euclid(count as i64) as usize,
            None if delta < 0 => count - 1,
            None => 0,
        };
        if let Some(preset) = self.presets.get_wrapped(index).cloned() {
            self.preset_index = Some(index);
            self.apply_preset(&preset);
        }
    }

    /// Replace all settings with a preset's and rebuild the field
    pub fn apply_preset(&mut self, preset: &Preset) {
        self.apply_settings(preset.settings.clone());
        self.field.rebuild();
        self.set_status(format!("Preset: {}", preset.name));
        log::info!("applied preset {}", preset.name);
    }

    pub fn preset_name(&self) -> &str {
        self.preset_index
            .and_then(|i| self.presets.get_wrapped(i))
            .map(|p| p.name.as_str())
            .unwrap_or("custom")
    }

    /// Follow a change of the canvas rectangle
    pub fn set_canvas(&mut self, canvas: Rect) {
        self.canvas = canvas;
        self.pointer.reset();
        let ppd = self.field.settings.px_per_dot;
        let (width, height) = braille::calculate_viewport(canvas.width, canvas.height, ppd);
        self.field.resize(width, height, 1.0 / ppd);
    }

    /// Save a full-resolution PNG of the current frame
    pub fn snapshot(&mut self) {
        let path = export::snapshot_path(&self.output_dir, self.field.tick());
        let result = self.render_image(1.0).and_then(|image| export::save_snapshot(&path, &image));
        match result {
            Ok(()) => self.set_status(format!("Saved {}", path.display())),
            Err(err) => {
                log::error!("snapshot failed: {}", err);
                self.set_status(format!("Snapshot failed: {}", err));
            }
        }
    }

    /// Start a GIF recording, or finish the running one
    pub fn toggle_recording(&mut self) {
        if self.recorder.is_some() {
            self.stop_recording();
            return;
        }
        let path = export::recording_path(&self.output_dir, self.field.tick());
        let width = (self.field.width() * RECORD_SCALE).ceil() as u32;
        let height = (self.field.height() * RECORD_SCALE).ceil() as u32;
        match GifRecorder::create(&path, width, height, self.field.settings.fps) {
            Ok(recorder) => {
                self.recorder = Some(recorder.with_max_frames(MAX_RECORD_FRAMES));
                self.set_status(format!("Recording {}", path.display()));
            }
            Err(err) => {
                log::error!("cannot start recording: {}", err);
                self.set_status(format!("Recording failed: {}", err));
            }
        }
    }

    fn stop_recording(&mut self) {
        if let Some(recorder) = self.recorder.take() {
            let path = recorder.path().to_path_buf();
            match recorder.finish() {
                Ok(frames) => self.set_status(format!("Saved {} ({} frames)", path.display(), frames)),
                Err(err) => {
                    log::error!("recording failed: {}", err);
                    self.set_status(format!("Recording failed: {}", err));
                }
            }
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// Current state as a config document
    pub fn to_config(&self) -> AppConfig {
        AppConfig {
            theme: self.field.theme,
            settings: self.field.settings.clone(),
            blobs: self.backdrop.blobs.clone(),
            nebula: self.backdrop.nebula.clone(),
            seed: self.fixed_seed,
            ..Default::default()
        }
    }

    /// Write the config file
    pub fn save_config(&mut self) {
        let result = self
            .config_path
            .clone()
            .or_else(AppConfig::default_path)
            .ok_or(FieldError::NoConfigDir)
            .and_then(|path| self.to_config().save_to_file(&path).map(|_| path));
        match result {
            Ok(path) => {
                log::info!("saved config to {}", path.display());
                self.set_status(format!("Saved {}", path.display()));
            }
            Err(err) => {
                log::error!("saving config failed: {}", err);
                self.set_status(format!("Save failed: {}", err));
            }
        }
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some((message.into(), Instant::now()));
    }

    /// Status line if it has not expired
    pub fn status_text(&self, now: Instant) -> Option<&str> {
        self.status
            .as_ref()
            .filter(|(_, at)| now.saturating_duration_since(*at) < STATUS_TTL)
            .map(|(text, _)| text.as_str())
    }

    /// Finish any recording. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.stop_recording();
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Render a field at `scale` pixels per viewport px onto its background.
/// Without a backdrop the theme background is used.
pub fn render_image(
    field: &ParticleField,
    backdrop: Option<&Backdrop>,
    backdrop_time: f32,
    cursor: Option<&Cursor>,
    scale: f32,
) -> Result<RgbaImage> {
    let mut surface = Surface::new(field.width(), field.height(), scale)?;
    field.draw_onto(&mut surface);
    if let Some(cursor) = cursor {
        cursor.draw(&mut surface, field.theme);
    }

    Ok(composite_surface(&surface, field.theme, backdrop, backdrop_time))
}

/// Flatten a drawn surface onto the theme background and the backdrop blobs
pub fn composite_surface(
    surface: &Surface,
    theme: Theme,
    backdrop: Option<&Backdrop>,
    backdrop_time: f32,
) -> RgbaImage {
    let base = theme.background();
    let (width, height, scale) = (surface.width(), surface.height(), surface.scale());
    surface.composite(|px, py| match backdrop {
        Some(backdrop) => {
            let (x, y) = ((px as f32 + 0.5) / scale, (py as f32 + 0.5) / scale);
            backdrop.sample(x, y, width, height, backdrop_time).over(&base)
        }
        None => base,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn canvas() -> Rect {
        Rect::new(22, 1, 100, 30)
    }

    fn test_app(dir: &std::path::Path) -> App {
        App::new(
            canvas(),
            AppOptions {
                config: AppConfig::default(),
                seed: 7,
                presets: PresetManager::with_dir(None),
                output_dir: dir.join("out"),
                config_path: Some(dir.join("config.json")),
            },
        )
    }

    #[test]
    fn test_focus_cycles() {
        assert_eq!(Focus::Controls.next(), Focus::CellSize);
        assert_eq!(Focus::Theme.next(), Focus::CellSize);
        assert_eq!(Focus::CellSize.prev(), Focus::Theme);
        assert_eq!(Focus::None.prev(), Focus::Theme);
        assert_eq!(Focus::Fps.line_index(), 4);
        assert!(!Focus::Controls.is_param());

        let mut focus = Focus::CellSize;
        for _ in 0..PARAMS.len() {
            focus = focus.next();
        }
        assert_eq!(focus, Focus::CellSize);
    }

    #[test]
    fn test_params_box_follows_display_order() {
        let params = Focus::params();
        assert_eq!(params.first(), Some(&Focus::CellSize));
        assert_eq!(params.last(), Some(&Focus::Theme));
        for (i, focus) in params.iter().enumerate() {
            assert_eq!(focus.line_index(), i as u16);
            assert!(!focus.label().is_empty());
            assert_eq!(focus.next(), params[(i + 1) % params.len()]);
        }
    }

    #[test]
    fn test_viewport_follows_canvas() {
        let dir = tempdir().unwrap();
        let app = test_app(dir.path());
        // 100 cols * 2 dots * 4 px, 30 rows * 4 dots * 4 px
        assert_eq!((app.field.width(), app.field.height()), (800.0, 480.0));
        assert_eq!(app.field.particles.len(), 80);
        assert_eq!(app.field.surface().unwrap().pixel_width(), 200);
    }

    #[test]
    fn test_mouse_maps_into_viewport() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        assert_eq!(app.cell_to_viewport(22, 1), Some((4.0, 8.0)));
        assert_eq!(app.cell_to_viewport(121, 30), Some((796.0, 472.0)));
        assert_eq!(app.cell_to_viewport(5, 5), None);
        assert_eq!(app.cell_to_viewport(122, 5), None);

        let now = Instant::now();
        app.on_mouse_move(72, 16, now);
        assert!(app.pointer.is_active(now));
        assert_eq!(app.pointer.position(), (404.0, 248.0));
    }

    #[test]
    fn test_tick_advances_unless_paused() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        let start = Instant::now();
        app.tick(start);
        assert_eq!(app.field.tick(), 1);

        app.toggle_pause();
        app.tick(start + Duration::from_millis(16));
        assert_eq!(app.field.tick(), 1);
    }

    #[test]
    fn test_adjust_focused_param() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.focus = Focus::ConnectRadius;
        app.adjust_focused_up();
        assert_eq!(app.field.settings.connect_radius, 110.0);

        app.focus = Focus::MaxParticles;
        app.adjust_focused_down();
        assert_eq!(app.field.settings.max_particles, 140);
        // Viewport supports 80, so the population is unchanged
        assert_eq!(app.field.particles.len(), 80);
    }

    #[test]
    fn test_dot_scale_change_relayouts() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.focus = Focus::PxPerDot;
        app.adjust_focused_down();
        assert_eq!(app.field.settings.px_per_dot, 3.0);
        assert_eq!((app.field.width(), app.field.height()), (600.0, 360.0));
        for p in &app.field.particles {
            assert!(p.x < 600.0 && p.y < 360.0);
        }
    }

    #[test]
    fn test_presets_cycle_and_wrap() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        assert_eq!(app.preset_name(), "custom");

        app.cycle_preset(1);
        assert_eq!(app.preset_name(), "Ambient");
        app.cycle_preset(-1);
        assert_eq!(app.preset_name(), "Minimal");
        assert!(!app.field.settings.draw_connectors);
        assert_eq!(app.field.tick(), 0);
    }

    #[test]
    fn test_theme_toggle_persists() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.toggle_theme();
        assert_eq!(app.field.theme, Theme::Light);

        let saved = AppConfig::load_from_file(&dir.path().join("config.json")).unwrap();
        assert_eq!(saved.theme, Theme::Light);
    }

    #[test]
    fn test_save_config_writes_current_state() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.toggle_trails();
        app.save_config();

        let saved = AppConfig::load_from_file(&dir.path().join("config.json")).unwrap();
        assert!(!saved.settings.draw_trails);
        assert!(app.status_text(Instant::now()).unwrap().starts_with("Saved"));
    }

    #[test]
    fn test_snapshot_writes_png() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.tick(Instant::now());
        app.snapshot();

        let path = export::snapshot_path(&dir.path().join("out"), 1);
        let image = image::open(&path).unwrap();
        assert_eq!((image.width(), image.height()), (800, 480));
    }

    #[test]
    fn test_recording_and_idempotent_shutdown() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        app.toggle_recording();
        assert!(app.is_recording());

        let start = Instant::now();
        for i in 0..3 {
            app.tick(start + Duration::from_millis(16 * i));
        }
        app.shutdown();
        app.shutdown();
        assert!(!app.is_recording());
        let path = export::recording_path(&dir.path().join("out"), 0);
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.last(), Some(&0x3B));
        assert!(app.status_text(Instant::now()).unwrap_or_default().starts_with("Saved"));
    }

    #[test]
    fn test_background_includes_blobs() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        let start = Instant::now();
        app.tick(start);
        app.tick(start + Duration::from_millis(200));
        app.tick(start + Duration::from_millis(400));

        let bg = Theme::Dark.background();
        let (x, y) = (0.2 * 800.0, 0.25 * 480.0);
        assert_ne!(app.background_at(x, y), bg.with_alpha(1.0));

        app.toggle_blobs();
        assert_eq!(app.background_at(x, y), bg);
    }

    #[test]
    fn test_background_includes_nebula_after_delay() {
        let dir = tempdir().unwrap();
        let mut app = test_app(dir.path());
        let bg = Theme::Dark.background();
        // Top-right corner lies outside every blob
        let (x, y) = (790.0, 10.0);

        let start = Instant::now();
        app.tick(start);
        app.tick(start + Duration::from_millis(200));
        assert_eq!(app.background_at(x, y), bg);

        for ms in [400, 600, 800, 1000] {
            app.tick(start + Duration::from_millis(ms));
        }
        assert_ne!(app.background_at(x, y), bg);
        assert_eq!(app.to_config().nebula, Some(crate::backdrop::default_nebula()));
    }
}
