use clap::Parser;
use humansize::{DECIMAL, format_size};
use radiotaper::{
    Configuration, Episode, ProgressEvent, Recorder, RecorderOptions, StopSignal, parse_duration,
};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Record live radio shows as tagged podcast episodes
#[derive(Debug, Parser)]
#[command(name = "radiotaper", version, about)]
struct Cli {
    /// Ids of the shows to record, one after another
    #[arg(required_unless_present = "list")]
    shows: Vec<String>,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the configured show length, e.g. "30m" or "1h15m"
    #[arg(short, long)]
    duration: Option<String>,

    /// List the configured shows and exit
    #[arg(long)]
    list: bool,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Installs the global tracing subscriber
///
/// `RUST_LOG` takes precedence over the verbosity flag.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Handles progress events and prints formatted output to stdout
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::Started { show_id, show_name } => {
            println!("\n=== Recording {} ({}) ===", show_name, show_id);
        }
        ProgressEvent::Capturing {
            stream_url,
            path,
            planned_duration,
        } => {
            println!("Capturing {} for {}", stream_url, format_duration(planned_duration));
            println!("  into {}", path.display());
        }
        ProgressEvent::Captured {
            actual_duration,
            filesize,
            reason,
        } => {
            println!(
                "Captured {} ({}), {}",
                format_duration(actual_duration),
                format_size(filesize, DECIMAL),
                reason
            );
        }
        ProgressEvent::Tagging { .. } => {
            println!("Adding metadata...");
        }
        ProgressEvent::Complete { path } => {
            println!("Done: {}", path.display());
        }
    }
}

/// Formats a duration as H:MM:SS
fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs();
    format!("{}:{:02}:{:02}", seconds / 3600, (seconds / 60) % 60, seconds % 60)
}

fn print_summary(episode: &Episode) {
    println!("  Title: {}", episode.name);
    if let Some(mimetype) = &episode.mimetype {
        println!("  Type: {}", mimetype);
    }
}

fn print_shows(config: &Configuration) {
    if config.shows.is_empty() {
        println!("No shows configured.");
        return;
    }

    for show in config.shows.values() {
        let station = config
            .stations
            .get(&show.station_id)
            .map(|station| station.name.as_str())
            .unwrap_or(show.station_id.as_str());
        println!(
            "{:<24} {} ({}, {})",
            show.id,
            show.name,
            station,
            format_duration(show.duration)
        );
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = match cli.config {
        Some(path) => path,
        None => match Configuration::default_path() {
            Ok(path) => path,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        },
    };

    let mut config = match Configuration::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    if cli.list {
        print_shows(&config);
        return;
    }

    if let Some(text) = &cli.duration {
        let seconds = parse_duration(text);
        if seconds == 0 {
            eprintln!("Error: Invalid duration: {}", text);
            process::exit(1);
        }
        for show_id in &cli.shows {
            if let Some(show) = config.shows.get_mut(show_id) {
                show.duration = Duration::from_secs(seconds);
            }
        }
    }

    // Ctrl-C ends the running capture early; the partial episode is still tagged.
    // A second Ctrl-C exits right away.
    let stop = StopSignal::new();
    let handler_signal = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        if handler_signal.is_raised() {
            process::exit(130);
        }
        handler_signal.raise();
    }) {
        eprintln!("Warning: Could not install Ctrl-C handler: {}", e);
    }

    let recorder = match Recorder::new(RecorderOptions::default(), stop.clone()) {
        Ok(recorder) => recorder,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut failed = false;
    for show_id in &cli.shows {
        if stop.is_raised() {
            break;
        }

        match recorder.record(&config, show_id, handle_progress_event) {
            Ok(episode) => print_summary(&episode),
            Err(e) => {
                eprintln!("\nError while recording {}: {}", show_id, e);
                failed = true;
            }
        }
    }

    if failed {
        process::exit(1);
    }
}
