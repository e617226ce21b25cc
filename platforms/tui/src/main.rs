mod app;

use action::Action;
use app::App;
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::Read;
use std::path::Path;
use std::{
    error::Error,
    fs, io,
    time::{Duration, Instant},
};

const TICK_MILLIS: u64 = 100;

/// Step through busy beaver machines in the terminal.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(after_help = "EXAMPLES:
  beaver-tui machines/bb3.tm
  beaver-tui results/
  cat max0013.tm | beaver-tui")]
struct Cli {
    /// Path to a transition table file (.tm), or a directory whose .tm files are browsed.
    /// Without one, the built-in champions are shown and can be switched with the arrow keys.
    /// A table can also be piped via stdin.
    table_file: Option<String>,
}

#[derive(PartialEq)]
enum AppState {
    Running,
    ShouldQuit,
}

/// Owns the terminal and restores it on drop.
struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl Tui {
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        // Errors are ignored; there is nothing left to report them to.
        let _ = disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        );
        let _ = self.terminal.show_cursor();
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    // Load before entering the alternate screen so errors reach stderr.
    let app = match load_app(&cli) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut tui = Tui::new()?;
    run_app(&mut tui.terminal, app)?;

    Ok(())
}

/// Loads from a directory or file path, then stdin, and falls back to the built-in catalog.
fn load_app(cli: &Cli) -> Result<App, String> {
    if let Some(dir) = cli.table_file.as_deref().map(Path::new).filter(|path| path.is_dir()) {
        App::new_from_directory(dir)
    } else if let Some(file_path) = &cli.table_file {
        fs::read_to_string(file_path)
            .map_err(|e| format!("Failed to read file '{}': {}", file_path, e))
            .and_then(|content| App::new_from_table_string(file_path, &content))
    } else if atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| format!("Failed to read from stdin: {}", e))
            .and_then(|_| App::new_from_table_string("stdin", &buffer))
    } else {
        App::new_default()
    }
}

/// Redraws and polls for keys until quit. Auto-play runs a batch of steps per tick.
fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
) -> io::Result<()> {
    let tick = Duration::from_millis(TICK_MILLIS);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| app.render(f))?;

        let timeout = tick.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press
                    && handle_key_event(&mut app, key) == AppState::ShouldQuit
                {
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= tick {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}

fn handle_key_event(app: &mut App, key: KeyEvent) -> AppState {
    if let Some(action) = app.keymap.get(&key) {
        match action {
            Action::Quit => return AppState::ShouldQuit,
            Action::Reset => app.reset_machine(),
            Action::Step => app.step_machine(),
            Action::ToggleAutoPlay => app.toggle_auto_play(),
            Action::ToggleHelp => app.toggle_help(),
            Action::Faster => app.faster(),
            Action::Slower => app.slower(),
            Action::PreviousMachine => app.previous_machine(),
            Action::NextMachine => app.next_machine(),
            Action::PanLeft => app.pan(-1),
            Action::PanRight => app.pan(1),
            Action::Recenter => app.recenter(),
        }
    }
    AppState::Running
}
