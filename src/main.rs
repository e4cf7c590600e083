mod app;
mod autostart;
mod baseline;
mod calendar;
mod config;
mod data;
mod engine;
mod features;
mod insights;
mod instance;
mod notify;
mod replay;
mod session;
mod tui;
mod ui;
mod workbook;

use anyhow::{Context, Result};
use app::{App, Tracker};
use clap::Parser;
use data::{PriceSource, YahooSource};
use features::FeatureFlags;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "DOW 30 Tracker: captures Dow components at eight fixed times each session and \
             saves them to a daily workbook",
    after_help = "EXAMPLES:
    # Launch the dashboard
    cargo run --release

    # Capture without a terminal UI
    cargo run --release -- --headless

    # Backfill today's buckets once and exit
    cargo run --release -- --once --data-dir D:\\Dow30

    # Print a saved session
    cargo run --release -- --replay Sheet__07_01_2024.xlsx"
)]
struct Args {
    /// Run the capture loop without the terminal UI
    #[arg(long)]
    headless: bool,

    /// Backfill due buckets, export, and exit
    #[arg(long)]
    once: bool,

    /// Folder for workbooks, feature flags, and the log (saved to settings)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Print every bucket of a saved workbook and exit
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Start the tracker at login (Windows)
    #[arg(long)]
    enable_autostart: bool,

    /// Stop starting the tracker at login (Windows)
    #[arg(long, conflicts_with = "enable_autostart")]
    disable_autostart: bool,

    /// Feature overrides, e.g. "sparkline=on,market_sounds=off"
    #[arg(long)]
    features: Option<String>,
}

fn init_logging(data_dir: &Path, to_stdout: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("dow30_tracker=info"));

    let file_layer = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join(config::LOG_FILE))
        .map(|file| fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .ok();
    let stdout_layer = to_stdout.then(fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let settings_path = config::settings_path();
    let mut settings = config::Settings::load(&settings_path);
    if let Some(dir) = &args.data_dir {
        settings.data_dir = Some(dir.to_string_lossy().into_owned());
    }
    let data_dir = settings.resolve_data_dir();

    let interactive = !(args.headless || args.once || args.replay.is_some());
    init_logging(&data_dir, !interactive);

    if args.enable_autostart || args.disable_autostart {
        let message = if args.enable_autostart {
            autostart::enable()?
        } else {
            autostart::disable()?
        };
        println!("{}", message);
        return Ok(());
    }

    if let Some(path) = &args.replay {
        let replay = replay::load(path)?;
        print!("{}", replay::render_text(&replay));
        return Ok(());
    }

    let features_path = data_dir.join(config::FEATURES_FILE);
    let mut flags = FeatureFlags::load(&features_path);
    if let Some(overrides) = &args.features {
        flags.apply_overrides(overrides).context("invalid --features value")?;
        if let Err(e) = flags.save(&features_path) {
            warn!("Could not save feature flags: {:#}", e);
        }
    }

    let mut guard = match instance::acquire(&config::lock_path(), config::APP_PORT) {
        Ok(guard) => guard,
        Err(e) => {
            info!("{}; asking the running tracker to come forward", e);
            instance::notify_existing_instance(config::APP_PORT).await;
            return Ok(());
        }
    };

    let (tx, rx) = mpsc::unbounded_channel();
    if let Err(e) = guard.serve(tx.clone()) {
        warn!("Single-instance listener unavailable: {}", e);
    }

    let source: Arc<dyn PriceSource> = Arc::new(YahooSource::new());
    let mut tracker = Tracker::new(source, settings, settings_path, flags, data_dir.clone(), tx);
    if args.data_dir.is_some() {
        tracker.set_data_dir(data_dir);
    }
    info!(
        "{} starting; saving to {}",
        config::APP_NAME,
        tracker.engine.data_dir().display()
    );
    tracker.startup(calendar::now_eastern()).await;

    if args.once {
        println!("{}", tracker.status);
        if let Some(warning) = &tracker.warning {
            eprintln!("{}", warning);
        }
        return Ok(());
    }

    if args.headless {
        return app::run_headless(tracker, rx).await;
    }

    let mut terminal = tui::init()?;
    let mut app = App::new(tracker, rx);
    let res = app.run(&mut terminal).await;
    tui::restore()?;

    if let Err(err) = res {
        error!("Dashboard error: {:?}", err);
        return Err(err.into());
    }
    Ok(())
}
