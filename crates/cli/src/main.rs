//! chartrack CLI - lab characterization progress tracker.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use chartrack_core::{format_minutes, CellKey, Date, LabConfig, SessionState};
use chartrack_progress::{daily_trend, ProgressSnapshot, ProgressSummary, ProgressTracker};
use chartrack_storage::JsonStorage;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chartrack")]
#[command(about = "Track lab characterization progress across DUTs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Storage directory for progress data
    #[arg(short, long, default_value = ".chartrack")]
    storage: std::path::PathBuf,

    /// Lab plan (JSON); defaults to the built-in plan
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start tracking daily progress
    Start,
    /// Stop tracking (history is kept)
    Stop,
    /// Mark a test as completed on a device
    Check {
        /// Test identifier
        test: String,
        /// Device identifier
        device: String,
    },
    /// Mark a test as not completed on a device
    Uncheck {
        /// Test identifier
        test: String,
        /// Device identifier
        device: String,
    },
    /// Clear every completion flag
    Reset,
    /// Show the completion matrix and overall status
    Status,
    /// Show the recorded daily completion trend
    History,
}

fn init_logging() {
    // Reports go to stdout; diagnostics stay on stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&std::path::Path>) -> Result<LabConfig> {
    let Some(path) = path else {
        return Ok(LabConfig::default());
    };

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read lab plan {}", path.display()))?;
    let config = LabConfig::from_json(&json)
        .with_context(|| format!("invalid lab plan {}", path.display()))?;
    info!("Loaded lab plan from {}", path.display());
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    let storage = JsonStorage::new(&cli.storage).await?;
    let mut tracker = ProgressTracker::new(config, storage)?;
    let today: Date = chrono::Local::now().date_naive();

    match cli.command {
        Commands::Start => {
            let record = tracker.start(today).await?;
            tracker.refresh(today).await?;
            if let Some(start) = record.start_date {
                println!("Tracking since {}", start);
            }
        }
        Commands::Stop => {
            tracker.stop().await?;
            println!("Tracking stopped");
        }
        Commands::Check { test, device } => {
            let summary = tracker.set_cell(&test, &device, true, today).await?;
            println!("Checked {}/{}", test, device);
            print_summary(&summary);
        }
        Commands::Uncheck { test, device } => {
            let summary = tracker.set_cell(&test, &device, false, today).await?;
            println!("Unchecked {}/{}", test, device);
            print_summary(&summary);
        }
        Commands::Reset => {
            tracker.reset().await?;
            tracker.refresh(today).await?;
            println!("All completion flags cleared");
        }
        Commands::Status => {
            tracker.refresh(today).await?;
            let snapshot = tracker.snapshot().await?;
            print_matrix(tracker.config(), &snapshot);
            println!();
            print_session(&snapshot);
            print_summary(&snapshot.summary);
        }
        Commands::History => {
            let snapshot = tracker.snapshot().await?;
            let trend = daily_trend(&snapshot.record);
            if trend.is_empty() {
                println!("No history recorded");
                return Ok(());
            }

            println!("Daily completion");
            for point in trend {
                println!("  {} | {:>6.2}% | {:+.2}", point.date, point.percent, point.delta);
            }
        }
    }

    Ok(())
}

fn print_matrix(config: &LabConfig, snapshot: &ProgressSnapshot) {
    let name_width = config
        .tests
        .iter()
        .map(|t| t.id.as_str().len())
        .max()
        .unwrap_or(0);

    print!("{:<name_width$} {:>8} ", "TEST", "MIN/DUT");
    for device in &config.devices {
        print!(" {:^6}", device.as_str());
    }
    println!();

    for test in &config.tests {
        print!("{:<name_width$} {:>8} ", test.id.as_str(), test.minutes);
        for device in &config.devices {
            let key = CellKey::new(test.id.clone(), device.clone());
            let mark = if snapshot.matrix.is_done(&key) { "[x]" } else { "[ ]" };
            print!(" {:^6}", mark);
        }
        println!();
    }
}

fn print_session(snapshot: &ProgressSnapshot) {
    let taken_at = snapshot.taken_at.with_timezone(&chrono::Local);
    println!("As of {}", taken_at.format("%Y-%m-%d %H:%M"));
    match (snapshot.record.state(), snapshot.record.start_date) {
        (SessionState::Started, Some(start)) => println!("Tracking since {}", start),
        _ => println!("Tracking not started"),
    }
}

fn print_summary(summary: &ProgressSummary) {
    println!("Total Project Time: {}", format_minutes(summary.total_minutes));
    println!("Completed Time:     {}", format_minutes(summary.completed_minutes));
    println!("Remaining Time:     {}", format_minutes(summary.remaining_minutes));
    println!("Completion: {:.2}%", summary.percent);
}
