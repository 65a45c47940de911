use crate::app::{App, Focus};
use crate::braille;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use std::time::Instant;

const SIDEBAR_WIDTH: u16 = 24;

/// Max scroll for help content (generous to account for text wrapping on small screens)
pub const HELP_CONTENT_LINES: u16 = 50;

/// Number of lines in controls content
pub const CONTROLS_CONTENT_LINES: u16 = 18;

// UI color scheme
const BORDER_COLOR: Color = Color::Cyan;
const HIGHLIGHT_COLOR: Color = Color::Yellow;
const TEXT_COLOR: Color = Color::White;
const DIM_TEXT_COLOR: Color = Color::Gray;
const RECORD_COLOR: Color = Color::Red;

/// Creates a standard styled block with rounded borders
fn styled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
        .title(title)
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if app.fullscreen_mode {
        render_canvas(frame, area, app);
    } else {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(area);

        render_sidebar(frame, layout[0], app);
        render_canvas(frame, layout[1], app);
    }

    if app.show_help {
        render_help_overlay(frame, area, app);
    }
}

/// Inner canvas rectangle (excluding borders) for a terminal of `frame_area`
pub fn get_canvas_rect(frame_area: Rect, fullscreen: bool) -> Rect {
    let offset = if fullscreen { 0 } else { SIDEBAR_WIDTH.min(frame_area.width) };
    Rect {
        x: frame_area.x + offset + 1,
        y: frame_area.y + 1,
        width: frame_area.width.saturating_sub(offset + 2),
        height: frame_area.height.saturating_sub(2),
    }
}

/// Number of visible lines in the controls box for a terminal height
pub fn get_controls_visible_lines(terminal_height: u16) -> u16 {
    // Status (6) and parameters (15) sit above; minus the box borders
    terminal_height.saturating_sub(6 + 15 + 2)
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6),  // Status
            Constraint::Length(15), // Parameters
            Constraint::Min(5),     // Controls
        ])
        .split(area);

    render_status_box(frame, sections[0], app);
    render_params_box(frame, sections[1], app);
    render_controls_box(frame, sections[2], app);
}

fn render_status_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Ambient Field ");
    let stats = app.field.last_stats();

    let (state_text, state_color) = if app.field.surface().is_none() {
        ("NO SURFACE", RECORD_COLOR)
    } else if app.paused {
        ("PAUSED", HIGHLIGHT_COLOR)
    } else {
        ("RUNNING", BORDER_COLOR)
    };

    let mut state = vec![Span::styled(state_text, Style::default().fg(state_color))];
    if app.is_recording() {
        state.push(Span::styled("  ● REC", Style::default().fg(RECORD_COLOR)));
    }

    let status_line = app
        .status_text(Instant::now())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{} theme", app.field.theme.name()));

    let content = vec![
        Line::from(Span::styled(
            format!("{} particles", app.field.particles.len()),
            Style::default().fg(TEXT_COLOR),
        )),
        Line::from(Span::styled(
            format!("{} links  t{}", stats.connections, app.field.tick()),
            Style::default().fg(TEXT_COLOR),
        )),
        Line::from(state),
        Line::from(Span::styled(status_line, Style::default().fg(DIM_TEXT_COLOR))),
    ];

    let paragraph = Paragraph::new(content).block(block);
    frame.render_widget(paragraph, area);
}

fn param_value(app: &App, focus: Focus) -> String {
    let s = &app.field.settings;
    match focus {
        Focus::None | Focus::Controls => String::new(),
        Focus::CellSize => format!("{:.0}px", s.cell_size),
        Focus::ConnectRadius => format!("{:.0}px", s.connect_radius),
        Focus::DecayRate => format!("{:.2}", s.decay_rate),
        Focus::Density => format!("1/{:.0}px", s.density_divisor),
        Focus::Fps => format!("{}", s.fps),
        Focus::Influence => format!("{:.0}px", s.influence_radius),
        Focus::Jitter => format!("{:.0}px", s.curve_jitter),
        Focus::MaxParticles => format!("{}", s.max_particles),
        Focus::Preset => app.preset_name().to_string(),
        Focus::PxPerDot => format!("{:.0}", s.px_per_dot),
        Focus::Repel => format!("{:.2}", s.repel_factor),
        Focus::Retain => format!("{:.2}", s.velocity_retain),
        Focus::Theme => app.field.theme.name().to_string(),
    }
}

fn render_params_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Parameters ");

    let make_line = |focus: Focus| {
        let focused = app.focus == focus;
        let prefix = if focused { "> " } else { "  " };
        let style = if focused {
            Style::default().fg(HIGHLIGHT_COLOR)
        } else {
            Style::default().fg(TEXT_COLOR)
        };
        Line::from(Span::styled(
            format!("{}{}: {}", prefix, focus.label(), param_value(app, focus)),
            style,
        ))
    };

    let content: Vec<Line> = Focus::params().iter().map(|&focus| make_line(focus)).collect();

    // Calculate scroll to keep focused item visible based on actual area
    let focus_line = app.focus.line_index();
    let visible_height = area.height.saturating_sub(2); // minus borders
    let content_height = content.len() as u16;

    let scroll = if visible_height == 0 || visible_height >= content_height {
        0 // No scrolling needed
    } else if focus_line >= visible_height {
        // Scroll to show focused line at bottom of visible area
        focus_line.saturating_sub(visible_height - 1)
    } else {
        0 // Focus is within first visible lines
    };

    let paragraph = Paragraph::new(content).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

fn render_controls_box(frame: &mut Frame, area: Rect, app: &App) {
    let key_style = Style::default().fg(HIGHLIGHT_COLOR);
    let desc_style = Style::default().fg(DIM_TEXT_COLOR);

    let settings = &app.field.settings;

    // Helper to create a control line
    let make_control = |key: &str, desc: String| -> Line<'_> {
        Line::from(vec![
            Span::styled(format!("{:>5}", key), key_style),
            Span::styled(format!(" {}", desc), desc_style),
        ])
    };

    let content = vec![
        make_control("Space", "pause/resume".to_string()),
        make_control("H", "help".to_string()),
        make_control("T", format!("theme: {}", app.field.theme.name())),
        make_control("R", "reseed".to_string()),
        make_control("P", format!("pointer: {}", on_off(settings.pointer_interaction))),
        make_control("L", format!("trails: {}", on_off(settings.draw_trails))),
        make_control("K", format!("links: {}", on_off(settings.draw_connectors))),
        make_control("B", format!("blobs: {}", on_off(settings.show_blobs))),
        make_control("U", format!("cursor: {}", on_off(settings.show_cursor))),
        make_control("V", "fullscreen".to_string()),
        make_control("S", "snapshot".to_string()),
        make_control("G", if app.is_recording() { "stop GIF" } else { "record GIF" }.to_string()),
        make_control("W", "save config".to_string()),
        make_control("[/]", "presets".to_string()),
        make_control("+/-", format!("fps: {}", settings.fps)),
        make_control("Tab", "select param".to_string()),
        make_control("↑/↓", "adjust".to_string()),
        make_control("Q", "quit".to_string()),
    ];

    let content_height = content.len() as u16;
    let visible_height = area.height.saturating_sub(2); // minus borders
    let max_scroll = content_height.saturating_sub(visible_height);
    let is_scrollable = max_scroll > 0;

    let title = if is_scrollable {
        " Controls (↑↓) "
    } else {
        " Controls "
    };

    let block = styled_block(title);

    let paragraph = Paragraph::new(content)
        .block(block)
        .scroll((app.controls_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_canvas(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block("");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(surface) = app.field.surface() else {
        return;
    };

    let cells = braille::render_to_braille(
        surface,
        inner.width,
        inner.height,
        app.field.settings.dot_threshold,
        |x, y| app.background_at(x, y),
    );

    let buffer = frame.buffer_mut();
    for cell in cells {
        let x = inner.x + cell.x;
        let y = inner.y + cell.y;

        if x < inner.x + inner.width && y < inner.y + inner.height {
            if let Some(target) = buffer.cell_mut((x, y)) {
                target.set_char(cell.char).set_fg(cell.fg).set_bg(cell.bg);
            }
        }
    }
}

fn render_help_overlay(frame: &mut Frame, area: Rect, app: &App) {
    // Calculate the canvas area (exclude sidebar unless fullscreen)
    let canvas_x = if app.fullscreen_mode { 0 } else { SIDEBAR_WIDTH };
    let canvas_width = if app.fullscreen_mode {
        area.width
    } else {
        area.width.saturating_sub(SIDEBAR_WIDTH)
    };

    // Center the help dialog within the canvas
    let help_width = 56.min(canvas_width.saturating_sub(4));
    let help_height = area.height.saturating_sub(4).min(40);
    let x = canvas_x + (canvas_width.saturating_sub(help_width)) / 2;
    let y = (area.height.saturating_sub(help_height)) / 2;

    let help_area = Rect {
        x: area.x + x,
        y: area.y + y,
        width: help_width,
        height: help_height,
    };

    // Clear the background
    frame.render_widget(Clear, help_area);

    let heading = |text: &'static str| Line::from(Span::styled(text, Style::default().fg(HIGHLIGHT_COLOR)));
    let item = |text: &'static str| Line::from(Span::styled(text, Style::default().fg(TEXT_COLOR)));

    let content = vec![
        Line::from(""),
        Line::from(Span::styled("AMBIENT PARTICLE FIELD", Style::default().fg(BORDER_COLOR))),
        Line::from(""),
        Line::from("Particles drift along a slowly changing flow field, leave fading trails, and link to nearby neighbours with soft curves."),
        Line::from(""),
        heading("POINTER:"),
        Line::from("Moving the mouse over the canvas pushes particles away, enlarges them and shifts their hue. The effect decays once the pointer rests for two seconds."),
        Line::from(""),
        heading("PARAMETERS (Tab, arrows):"),
        item("Cell - flow field cell size"),
        item("Link - connector radius"),
        item("Decay - how fast particles calm down"),
        item("Density - px of width per particle"),
        item("Reach / Repel - pointer radius and push"),
        item("Jitter - connector curve wobble"),
        item("Retain - velocity smoothing"),
        item("Dot px - viewport px per Braille dot"),
        Line::from(""),
        heading("TOGGLES:"),
        Line::from("T=Theme, P=Pointer, L=Trails, K=Links, B=Blobs, U=Cursor"),
        Line::from(""),
        heading("OUTPUT:"),
        Line::from("S=PNG snapshot, G=start/stop GIF, W=save config, [/]=presets"),
        Line::from(""),
        heading("PRESETS:"),
        Line::from(app.presets.preset_names().join(", ")),
        Line::from(""),
        heading("BASIC CONTROLS:"),
        Line::from("Space=Pause, R=Reseed, V=Fullscreen, +/-=FPS, Q=Quit"),
        Line::from(""),
    ];

    let content_height = content.len() as u16;
    let visible_height = help_height.saturating_sub(2); // minus borders
    let max_scroll = content_height.saturating_sub(visible_height);
    let is_scrollable = max_scroll > 0;

    // Update title to show scroll hint if scrollable
    let title = if is_scrollable {
        " Help (↑↓ scroll, H to close) "
    } else {
        " Help (H to close) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(HIGHLIGHT_COLOR))
        .title(title);

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.help_scroll, 0));

    frame.render_widget(paragraph, help_area);
}
