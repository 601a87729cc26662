//! Quarry TUI - Terminal User Interface
//!
//! Ratatui-based terminal interface for browsing and installing plugins.

use ratatui::{
    Frame, Terminal,
    crossterm::{
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    widgets::{Block, Paragraph},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use std::path::{Path, PathBuf};

use quarry_core::config::{QuarryConfig, resolve_plugins_dir};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quarry_tui=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = QuarryConfig::load()?;
    let cwd = std::env::current_dir()?;
    let plugins_dir = resolve_plugins_dir(&cwd, config.plugins_dir.as_deref())?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the TUI
    let res = run_tui(&mut terminal, &plugins_dir);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("{err:?}");
    }

    Ok(())
}

fn run_tui(
    terminal: &mut Terminal<ratatui::backend::CrosstermBackend<std::io::Stdout>>,
    plugins_dir: &Path,
) -> anyhow::Result<()> {
    let installed = installed_files(plugins_dir);
    loop {
        terminal.draw(|f| ui(f, plugins_dir, &installed))?;

        if let Event::Key(key) = event::read()? {
            if key.code == KeyCode::Char('q') {
                return Ok(());
            }
        }
    }
}

fn installed_files(plugins_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(plugins_dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .filter(|e| e.path().is_file())
        .map(|e| e.path())
        .collect();
    files.sort();
    files
}

fn ui(f: &mut Frame, plugins_dir: &Path, installed: &[PathBuf]) {
    let area = f.area();
    let mut lines = vec![
        "Quarry - Modrinth plugin browser".to_string(),
        String::new(),
        format!("Plugins directory: {}", plugins_dir.display()),
        format!("{} plugin file(s) installed", installed.len()),
        String::new(),
    ];
    for file in installed.iter().take(10) {
        if let Some(name) = file.file_name() {
            lines.push(format!("  {}", name.to_string_lossy()));
        }
    }
    lines.push(String::new());
    lines.push("Press 'q' to quit".to_string());

    let paragraph = Paragraph::new(lines.join("\n"))
        .block(Block::bordered().title("Quarry"))
        .centered();
    f.render_widget(paragraph, area);
}
