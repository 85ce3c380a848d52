use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};

use datapulse::controller::Controller;
use datapulse::domain::{DashboardConfig, DashboardError, Message};
use datapulse::logging::init_logging;
use datapulse::model::{Model, Status};
use datapulse::samples::SampleKind;
use datapulse::theme::Theme;
use datapulse::ui::DashboardUI;

/// Terminal dashboard for CSV, TSV and JSON files.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// File to load at startup (csv, tsv, txt, json)
    file: Option<String>,

    /// Start with a sample dataset
    #[arg(long, value_enum, conflicts_with = "file")]
    sample: Option<SampleKind>,

    /// Directory exports are written to
    #[arg(long, default_value = ".")]
    export_dir: String,

    /// Color theme for this run, overrides the saved preference
    #[arg(long, value_enum)]
    theme: Option<Theme>,

    /// Preference file location
    #[arg(long)]
    preferences: Option<String>,

    /// Log file location
    #[arg(long)]
    log_file: Option<String>,

    /// Event poll time in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,
}

fn expand(path: &str) -> Result<PathBuf, DashboardError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| DashboardError::LoadingFailed(e.to_string()))
}

/// The message that loads the dataset requested on the command line.
/// Paths are expanded here so a bad path fails before the terminal is taken over.
fn startup_message(args: &Args) -> Result<Option<Message>, DashboardError> {
    Ok(match (&args.file, args.sample) {
        (Some(file), _) => Some(Message::Load(expand(file)?)),
        (None, Some(kind)) => Some(Message::LoadSample(kind)),
        (None, None) => None,
    })
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            error!("Exiting with error: {e:?}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: Args) -> Result<(), DashboardError> {
    let log_file = match &args.log_file {
        Some(path) => expand(path)?,
        None => std::env::temp_dir().join("datapulse.log"),
    };
    init_logging(&log_file)?;
    info!("Starting datapulse, logging to {:?}", log_file);

    let preferences_path = args.preferences.as_deref().map(expand).transpose()?;
    let cfg = DashboardConfig::default()
        .with_event_poll_time(args.poll_ms)
        .with_export_dir(expand(&args.export_dir)?)
        .with_preferences_path(preferences_path)
        .with_theme_override(args.theme);

    let mut model = Model::init(&cfg)?;
    let startup = startup_message(&args)?;

    // The terminal is restored on every exit path once it was initialized
    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &cfg, &mut model, startup);
    ratatui::restore();
    result?;

    info!("Bye");
    Ok(())
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    cfg: &DashboardConfig,
    model: &mut Model,
    startup: Option<Message>,
) -> Result<(), DashboardError> {
    let mut ui = DashboardUI::new(cfg);
    let controller = Controller::new(cfg);

    let size = terminal.size()?;
    model.update(Some(Message::Resize(size.width as usize, size.height as usize)))?;
    model.update(startup)?;

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // Handle events and map to a Message
        let message = controller.handle_event(model)?;
        model.update(message)?;

        // Pick up finished background reads
        model.tick();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_from_file_or_sample() {
        let args = Args::parse_from(["datapulse", "data.csv"]);
        assert_eq!(startup_message(&args).unwrap(), Some(Message::Load(PathBuf::from("data.csv"))));

        let args = Args::parse_from(["datapulse", "--sample", "orders"]);
        assert_eq!(startup_message(&args).unwrap(), Some(Message::LoadSample(SampleKind::Orders)));

        let args = Args::parse_from(["datapulse"]);
        assert_eq!(startup_message(&args).unwrap(), None);
    }

    #[test]
    fn bad_path_fails_before_terminal_setup() {
        let args = Args::parse_from(["datapulse", "$DATAPULSE_UNSET_VARIABLE/data.csv"]);
        assert!(matches!(startup_message(&args), Err(DashboardError::LoadingFailed(_))));
    }
}
