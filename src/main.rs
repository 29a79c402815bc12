mod app;
mod ui;

use anyhow::{Context, Result};
use app::{App, Controls, Dataset, DEFAULT_COLORS, MAX_COLORS, MIN_COLORS};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tui_choropleth::palette;

/// Rank-bucketed choropleth maps of polygon and hex GeoJSON in the terminal
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Dataset as NAME=PATH or PATH (repeatable); a demo grid is used when omitted
    #[arg(short, long = "dataset", value_name = "NAME=PATH")]
    datasets: Vec<String>,

    /// Attribute to visualize first
    #[arg(short, long)]
    attribute: Option<String>,

    /// Color palette
    #[arg(short, long, default_value = palette::DEFAULT_PALETTE)]
    palette: String,

    /// Number of colors
    #[arg(short = 'n', long, default_value_t = DEFAULT_COLORS as u8,
          value_parser = clap::value_parser!(u8).range((MIN_COLORS as i64)..=(MAX_COLORS as i64)))]
    colors: u8,

    /// Write logs to this file (the terminal belongs to the UI)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbosity: u8,
}

fn init_logging(cli: &Cli) -> Result<()> {
    let Some(path) = &cli.log_file else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    let level = match cli.verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG overrides the verbosity flag
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| anyhow::anyhow!("setting default tracing subscriber failed: {e}"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let datasets = cli
        .datasets
        .iter()
        .map(|arg| app::parse_dataset(arg))
        .collect::<Result<Vec<Dataset>>>()?;

    let palettes = palette::list_palettes();
    let palette_idx = palettes
        .iter()
        .position(|p| p.eq_ignore_ascii_case(&cli.palette))
        .with_context(|| format!("unknown palette '{}', expected one of: {}", cli.palette, palettes.join(", ")))?;

    let controls = Controls {
        dataset: 0,
        attribute: cli.attribute.clone(),
        palette: palette_idx,
        n_colors: usize::from(cli.colors),
        show_palettes: false,
    };

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;

    // Enable mouse capture
    execute!(std::io::stdout(), EnableMouseCapture)?;

    // Run the app
    let result = run(&mut terminal, datasets, controls);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Handle mouse events for panning and zooming
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Always track mouse position for cursor marker and tooltip
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        // Scroll wheel for zooming towards mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll for panning (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Click and drag to pan
        MouseEventKind::Down(MouseButton::Left) => {
            app.last_mouse = Some((mouse.column, mouse.row));
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
        }
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, datasets: Vec<Dataset>, controls: Controls) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(size.width as usize, size.height as usize, datasets, controls);
    info!(datasets = app.datasets.len(), "dashboard started");

    // Main loop
    loop {
        // Draw
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Interactions are handled one at a time; each recolor runs to completion
        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') | KeyCode::Esc => app.quit(),

                            // Pan with hjkl or arrow keys
                            KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                            KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                            KeyCode::Up | KeyCode::Char('k') => app.pan(0, -8),
                            KeyCode::Down | KeyCode::Char('j') => app.pan(0, 8),

                            // Zoom
                            KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                            KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                            // Selections
                            KeyCode::Char('d') => app.cycle_dataset(1),
                            KeyCode::Char('D') => app.cycle_dataset(-1),
                            KeyCode::Char('a') => app.cycle_attribute(1),
                            KeyCode::Char('A') => app.cycle_attribute(-1),
                            KeyCode::Char('c') => app.cycle_palette(1),
                            KeyCode::Char('C') => app.cycle_palette(-1),
                            KeyCode::Char(']') => app.adjust_colors(1),
                            KeyCode::Char('[') => app.adjust_colors(-1),

                            // Layer toggles
                            KeyCode::Char('3') => app.toggle_3d(),
                            KeyCode::Char('>') | KeyCode::Char('.') => app.adjust_elevation(1),
                            KeyCode::Char('<') | KeyCode::Char(',') => app.adjust_elevation(-1),
                            KeyCode::Char('o') | KeyCode::Char('O') => {
                                app.map_renderer.toggle_outlines();
                            }
                            KeyCode::Char('n') | KeyCode::Char('N') => {
                                app.map_renderer.toggle_no_data();
                            }
                            KeyCode::Char('p') | KeyCode::Char('P') => app.toggle_palette_preview(),

                            // Reset view, reload data
                            KeyCode::Char('r') | KeyCode::Char('0') => app.fit_view(),
                            KeyCode::Char('R') => app.reload(),

                            _ => {}
                        }
                    }
                }
                Event::Mouse(mouse) => {
                    handle_mouse(&mut app, mouse);
                }
                Event::Resize(width, height) => {
                    app.resize(width as usize, height as usize);
                }
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
