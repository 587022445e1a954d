mod middle;
mod tui;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tracing::Level;

use gridsynth::pipeline::persistence;
use gridsynth::{AudioEngine, EngineConfig};
use middle::{InputEvent, Middle};

const LOG_ENV: &str = "GRIDSYNTH_LOG";

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

struct Args {
    config: Option<PathBuf>,
    project_dir: PathBuf,
}

// gridsynth [--config <file.json>] [project_dir]
fn parse_args() -> anyhow::Result<Args> {
    let mut config = None;
    let mut project_dir = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config needs a file path")?;
                config = Some(PathBuf::from(path));
            }
            _ => project_dir = Some(PathBuf::from(arg)),
        }
    }
    let project_dir = match project_dir {
        Some(dir) => dir,
        None => std::env::current_dir().unwrap_or_default(),
    };
    Ok(Args { config, project_dir })
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    Ok(EngineConfig::from_json_str(&json)?)
}

// stderr only, so nothing lands in the middle of the terminal UI unless asked for
fn init_tracing() {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|v| v.parse::<Level>().ok())
        .unwrap_or(Level::WARN);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> anyhow::Result<()> {
    init_tracing();
    let args = parse_args()?;
    let config = load_config(args.config.as_ref())?;

    let mut engine = AudioEngine::new(config);
    engine.init()?;

    let pattern = persistence::load_pattern(&args.project_dir).unwrap_or_default();
    let mut middle = Middle::new(engine, pattern);

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    // the look-ahead window is several frames of this, so polling here is enough
    let tick_rate = Duration::from_millis(16); // ~60fps

    loop {
        middle.tick();

        let ds = middle.display_state();
        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds);
        })?;

        for event in tui::input::poll_input(tick_rate)? {
            if event == InputEvent::Quit {
                // save before quitting
                if let Err(e) = persistence::save_pattern(&args.project_dir, middle.pattern()) {
                    tracing::warn!("could not save pattern: {e:#}");
                }
                term.clear()?;
                return Ok(());
            }
            middle.handle_input(event);
        }
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
