mod app;
mod backdrop;
mod braille;
mod color;
mod config;
mod cursor;
mod error;
mod export;
mod field;
mod flow_field;
mod particle;
mod pointer;
mod presets;
mod scheduler;
mod settings;
mod surface;
mod ui;

use anyhow::{bail, Context, Result};
use app::{App, AppOptions, Focus};
use backdrop::Backdrop;
use clap::Parser;
use color::Theme;
use config::AppConfig;
use crossterm::{
    cursor::Show,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
        MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use export::GifRecorder;
use field::ParticleField;
use pointer::PointerSnapshot;
use presets::{Preset, PresetManager};
use ratatui::{backend::CrosstermBackend, layout::Rect, Terminal};
use scheduler::{FixedRateScheduler, FrameScheduler, ManualStepper};
use std::io;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "ambient-field")]
#[command(about = "Ambient particle flow-field renderer in the terminal")]
struct Args {
    // === Field ===
    /// Color theme (dark, light)
    #[arg(long)]
    theme: Option<String>,

    /// Random seed for the particle set
    #[arg(long)]
    seed: Option<u64>,

    /// Start from a named preset (built-in or user)
    #[arg(long)]
    preset: Option<String>,

    /// Config file to load (default: <config dir>/ambient-field/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frames per second (10-120)
    #[arg(long)]
    fps: Option<u32>,

    /// Viewport px per Braille dot (1-8)
    #[arg(long = "px-per-dot")]
    px_per_dot: Option<f32>,

    // === Toggles ===
    /// Ignore the mouse
    #[arg(long = "no-pointer")]
    no_pointer: bool,

    /// Draw particles without trails
    #[arg(long = "no-trails")]
    no_trails: bool,

    /// Skip the connector curves
    #[arg(long = "no-connectors")]
    no_connectors: bool,

    /// Hide the backdrop (gradient blobs and nebula)
    #[arg(long = "no-blobs")]
    no_blobs: bool,

    /// Hide the spring cursor
    #[arg(long = "no-cursor")]
    no_cursor: bool,

    // === Output ===
    /// Directory for snapshots and recordings
    #[arg(long = "output-dir", default_value = ".")]
    output_dir: PathBuf,

    /// Render frames to a GIF without opening the terminal UI
    #[arg(long)]
    headless: bool,

    /// Frames to render in headless mode
    #[arg(long, default_value = "300")]
    frames: usize,

    /// Headless viewport width in px
    #[arg(long, default_value = "800")]
    width: f32,

    /// Headless viewport height in px
    #[arg(long, default_value = "600")]
    height: f32,

    /// Headless GIF path (default: <output dir>/ambient-field-000000.gif)
    #[arg(long)]
    record: Option<PathBuf>,

    /// Save the resulting settings as a user preset and exit
    #[arg(long = "save-preset")]
    save_preset: Option<String>,

    // === Logging ===
    /// Write logs to this file (the terminal UI logs nowhere otherwise)
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_theme(s: &str) -> Result<Theme> {
    match s.to_lowercase().as_str() {
        "dark" | "d" => Ok(Theme::Dark),
        "light" | "l" => Ok(Theme::Light),
        other => bail!("unknown theme '{}' (expected dark or light)", other),
    }
}

fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Logs go to stderr in headless mode, to `--log-file` otherwise, and are
/// silenced when the terminal UI owns the screen without a log file
fn init_logging(args: &Args) -> Result<()> {
    let level = if args.headless || args.log_file.is_some() {
        level_for(args.verbose)
    } else {
        "off"
    };
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level));
    if !args.headless {
        if let Some(path) = &args.log_file {
            let file = std::fs::File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
    }
    builder.init();
    Ok(())
}

/// Merge config file, preset and command line into one config
fn resolve_config(args: &Args, presets: &PresetManager) -> Result<(AppConfig, Option<PathBuf>)> {
    let (mut config, config_path) = match &args.config {
        Some(path) => {
            let config = AppConfig::load_from_file(path)
                .with_context(|| format!("cannot load config {}", path.display()))?;
            (config, Some(path.clone()))
        }
        None => {
            let path = AppConfig::default_path();
            let config = path.as_deref().map(AppConfig::load_or_default).unwrap_or_default();
            (config, path)
        }
    };

    if let Some(name) = &args.preset {
        config.settings = presets.require(name)?.settings.clone();
    }
    if let Some(theme) = &args.theme {
        config.theme = parse_theme(theme)?;
    }

    let settings = &mut config.settings;
    if let Some(fps) = args.fps {
        settings.fps = fps;
    }
    if let Some(px_per_dot) = args.px_per_dot {
        settings.px_per_dot = px_per_dot;
    }
    if args.no_pointer {
        settings.pointer_interaction = false;
    }
    if args.no_trails {
        settings.draw_trails = false;
    }
    if args.no_connectors {
        settings.draw_connectors = false;
    }
    if args.no_blobs {
        settings.show_blobs = false;
    }
    if args.no_cursor {
        settings.show_cursor = false;
    }
    settings.sanitize();

    Ok((config, config_path))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let mut presets = PresetManager::new();
    let (config, config_path) = resolve_config(&args, &presets)?;

    if let Some(name) = &args.save_preset {
        let preset = Preset::new(name.as_str(), "Saved from the command line", config.settings.clone());
        let path = presets.save_preset(preset)?;
        println!("Saved preset '{}' to {}", name, path.display());
        return Ok(());
    }

    let seed = args.seed.or(config.seed).unwrap_or_else(rand::random);
    log::info!("starting with seed {} and theme {}", seed, config.theme.name());

    if args.headless {
        return run_headless(&args, config, seed);
    }

    // Setup terminal
    let mut guard = TerminalGuard::enter()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    // Get initial terminal size and create app
    let size = terminal.size()?;
    let canvas = ui::get_canvas_rect(Rect::new(0, 0, size.width, size.height), false);
    let mut app = App::new(
        canvas,
        AppOptions {
            config,
            seed,
            presets,
            output_dir: args.output_dir.clone(),
            config_path,
        },
    );

    // Run the app
    let res = run_app(&mut terminal, &mut app);

    // Cleanup
    app.shutdown();
    guard.restore()?;
    terminal.show_cursor()?;

    res.context("terminal loop failed")
}

/// Raw mode, alternate screen and mouse capture; undone exactly once
struct TerminalGuard {
    active: bool,
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut guard = Self { active: true };
        if let Err(err) = execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture) {
            guard.restore()?;
            return Err(err);
        }
        Ok(guard)
    }

    fn restore(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        disable_raw_mode()?;
        execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen, Show)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let mut scheduler = FixedRateScheduler::new(app.field.settings.fps, Instant::now());

    while !scheduler.is_cancelled() {
        let now = Instant::now();
        if scheduler.take_due(now) {
            app.tick(now);
            terminal.draw(|frame| ui::render(frame, app))?;
        }
        scheduler.set_fps(app.field.settings.fps);

        // Poll for events until the next frame is due
        let timeout = scheduler.time_until_due(Instant::now());
        if !event::poll(timeout)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => {
                // Only process Press events
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Handle Ctrl+C
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    scheduler.cancel();
                    continue;
                }

                match key.code {
                    // System controls
                    KeyCode::Char('q') | KeyCode::Char('Q') => scheduler.cancel(),
                    KeyCode::Char(' ') => app.toggle_pause(),
                    KeyCode::Char('r') | KeyCode::Char('R') => app.reseed(),
                    KeyCode::Char('t') | KeyCode::Char('T') => {
                        app.toggle_theme();
                        app.focus = Focus::Theme;
                    }
                    KeyCode::Char('v') | KeyCode::Char('V') => {
                        app.toggle_fullscreen();
                        let size = terminal.size()?;
                        app.set_canvas(ui::get_canvas_rect(
                            Rect::new(0, 0, size.width, size.height),
                            app.fullscreen_mode,
                        ));
                    }
                    KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::Char('?') => app.toggle_help(),

                    // Layers
                    KeyCode::Char('p') | KeyCode::Char('P') => app.toggle_pointer_interaction(),
                    KeyCode::Char('l') | KeyCode::Char('L') => app.toggle_trails(),
                    KeyCode::Char('k') | KeyCode::Char('K') => app.toggle_connectors(),
                    KeyCode::Char('b') | KeyCode::Char('B') => app.toggle_blobs(),
                    KeyCode::Char('u') | KeyCode::Char('U') => app.toggle_cursor(),

                    // Output
                    KeyCode::Char('s') | KeyCode::Char('S') => app.snapshot(),
                    KeyCode::Char('g') | KeyCode::Char('G') => app.toggle_recording(),
                    KeyCode::Char('w') | KeyCode::Char('W') => app.save_config(),

                    KeyCode::Char('[') => {
                        app.cycle_preset(-1);
                        app.focus = Focus::Preset;
                    }
                    KeyCode::Char(']') => {
                        app.cycle_preset(1);
                        app.focus = Focus::Preset;
                    }
                    KeyCode::Char('+') | KeyCode::Char('=') => {
                        app.adjust_fps(5);
                        app.focus = Focus::Fps;
                    }
                    KeyCode::Char('-') | KeyCode::Char('_') => {
                        app.adjust_fps(-5);
                        app.focus = Focus::Fps;
                    }

                    // Navigation
                    KeyCode::Tab => app.next_focus(),
                    KeyCode::BackTab => app.prev_focus(),
                    KeyCode::Up => {
                        if app.show_help {
                            app.scroll_help_up();
                        } else if app.focus.is_param() {
                            app.adjust_focused_up();
                        } else {
                            app.scroll_controls_up();
                        }
                    }
                    KeyCode::Down => {
                        if app.show_help {
                            app.scroll_help_down(ui::HELP_CONTENT_LINES);
                        } else if app.focus.is_param() {
                            app.adjust_focused_down();
                        } else {
                            let term_size = terminal.size()?;
                            let visible = ui::get_controls_visible_lines(term_size.height);
                            app.scroll_controls_down(ui::CONTROLS_CONTENT_LINES.saturating_sub(visible));
                        }
                    }
                    KeyCode::Esc => {
                        if app.show_help {
                            app.toggle_help();
                        } else if app.focus.is_param() {
                            app.focus = Focus::Controls;
                        }
                    }
                    _ => {}
                }
            }
            Event::Mouse(mouse) => handle_mouse(app, mouse),
            Event::Resize(width, height) => {
                app.set_canvas(ui::get_canvas_rect(Rect::new(0, 0, width, height), app.fullscreen_mode));
            }
            _ => {}
        }
    }

    Ok(())
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let now = Instant::now();
    match mouse.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(_) => app.on_mouse_move(mouse.column, mouse.row, now),
        MouseEventKind::Down(_) => app.on_mouse_down(mouse.column, mouse.row, now),
        MouseEventKind::Up(_) => app.on_mouse_up(),
        _ => {}
    }
}

/// Render `--frames` frames straight into a GIF
fn run_headless(args: &Args, config: AppConfig, seed: u64) -> Result<()> {
    let mut field = ParticleField::new(args.width, args.height, 1.0, config.theme, config.settings, seed);
    let Some(surface) = field.surface() else {
        bail!("viewport {}x{} px is too large to render", args.width, args.height);
    };
    let (width, height) = (surface.pixel_width(), surface.pixel_height());

    let path = args
        .record
        .clone()
        .unwrap_or_else(|| export::recording_path(&args.output_dir, 0));
    let fps = field.settings.fps;
    let mut recorder = GifRecorder::create(&path, width, height, fps)?;
    let backdrop = Backdrop::new(config.blobs, config.nebula);

    let frame_time = 1.0 / fps as f32;
    let mut backdrop_time = 0.0;
    let mut failure = None;
    let mut stepper = ManualStepper::new(args.frames);
    scheduler::run_until_cancelled(&mut stepper, |_| {
        field.frame(PointerSnapshot::idle());
        backdrop_time += frame_time;

        let Some(surface) = field.surface() else {
            return false;
        };
        let backdrop = field.settings.show_blobs.then_some(&backdrop);
        let image = app::composite_surface(surface, field.theme, backdrop, backdrop_time);
        match recorder.push(&image) {
            Ok(more) => more,
            Err(err) => {
                failure = Some(err);
                false
            }
        }
    });

    if let Some(err) = failure {
        return Err(err).with_context(|| format!("recording {} failed", path.display()));
    }
    let frames = recorder
        .finish()
        .with_context(|| format!("recording {} failed", path.display()))?;
    println!("Wrote {} frames to {}", frames, path.display());
    Ok(())
}
