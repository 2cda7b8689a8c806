use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::DefaultTerminal;
use std::fs::File;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use research_globe::app::{App, Mode};
use research_globe::config::{Cli, Settings};
use research_globe::data::GeoSource;
use research_globe::filter::HttpResearchApi;
use research_globe::ui;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli)?;
    init_tracing(&settings)?;

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, settings);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    if let Err(err) = &result {
        tracing::error!("exiting: {err:#}");
    }
    result
}

/// Tracing goes to a file; the terminal belongs to the UI
fn init_tracing(settings: &Settings) -> Result<()> {
    let file = File::create(&settings.log_file)
        .with_context(|| format!("cannot open log file {}", settings.log_file))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run(terminal: &mut DefaultTerminal, settings: Settings) -> Result<()> {
    let api = HttpResearchApi::new(settings.api_base.clone(), settings.request_timeout())
        .context("cannot build HTTP client")?;
    tracing::info!("research service at {}", api.base());
    let geo = GeoSource::parse(&settings.geojson);

    let size = terminal.size()?;
    let mut app = App::new(settings, Arc::new(api), size.width, size.height, StdRng::from_os_rng());
    app.start(Some(geo));

    // Main loop
    loop {
        terminal.draw(|frame| ui::render(frame, &app))?;

        // ~60fps
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match app.mode {
                    Mode::Search => handle_search_key(&mut app, key),
                    Mode::Normal => handle_key(&mut app, key),
                },
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        app.tick(Instant::now());

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc => app.dismiss(),

        // Rotate with hjkl or arrow keys
        KeyCode::Left | KeyCode::Char('h') => app.rotate_left(),
        KeyCode::Right | KeyCode::Char('l') => app.rotate_right(),
        KeyCode::Up | KeyCode::Char('k') => app.rotate_up(),
        KeyCode::Down | KeyCode::Char('j') => app.rotate_down(),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        // Filters
        KeyCode::Tab => app.focus_next(),
        KeyCode::BackTab => app.focus_prev(),
        KeyCode::Char(']') | KeyCode::Char('n') => app.cycle_option(true),
        KeyCode::Char('[') | KeyCode::Char('p') => app.cycle_option(false),
        KeyCode::Char('x') => app.clear_focused(),
        KeyCode::Char('a') | KeyCode::Enter => app.apply_filters(),
        KeyCode::Char('c') => app.clear_filters(),

        // Toggles
        KeyCode::Char(' ') => app.toggle_auto_rotate(),
        KeyCode::Char('g') => app.renderer.toggle_glow(),
        KeyCode::Char('b') => app.renderer.toggle_borders(),
        KeyCode::Char('m') => app.renderer.toggle_markers(),
        KeyCode::Char('L') => app.renderer.toggle_labels(),

        KeyCode::Char('r') | KeyCode::Char('0') => app.reset_view(),
        KeyCode::Char('/') => app.start_search(),
        _ => {}
    }
}

fn handle_search_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_search(),
        KeyCode::Enter => app.search_submit(),
        KeyCode::Backspace => app.search_backspace(),
        KeyCode::Char(c) => app.search_input(c),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Moved | MouseEventKind::Drag(MouseButton::Left) => {
            app.mouse_move(mouse.column, mouse.row);
        }
        MouseEventKind::Down(MouseButton::Left) => app.mouse_down(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.mouse_up(mouse.column, mouse.row),
        MouseEventKind::ScrollUp => app.scroll(mouse.column, mouse.row, true),
        MouseEventKind::ScrollDown => app.scroll(mouse.column, mouse.row, false),
        _ => {}
    }
}
