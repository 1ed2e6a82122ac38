//! Loopr Audio Player (loopr-ap) - Main entry point
//!
//! Loads a track, then reads one command per line from stdin and prints
//! status events as they happen. See `loopr_ap::commands` for the command
//! list.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use loopr_ap::audio::{AudioSink, CpalSink, NullSink};
use loopr_ap::commands::{dispatch, Command, Reply};
use loopr_ap::playback::{EngineSnapshot, PlaybackEngine, StatusBus};
use loopr_ap::tempo::{PassthroughBackend, SoundStretchBackend, StretchBackend};
use loopr_ap::PlayerConfig;
use loopr_common::config::resolve_config_path;
use loopr_common::human_time::format_clock;
use loopr_common::{EventBus, StatusEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Status events buffered per subscriber
const STATUS_BUS_CAPACITY: usize = 256;

/// Command-line arguments for loopr-ap
#[derive(Parser, Debug)]
#[command(name = "loopr-ap")]
#[command(about = "A-B loop practice player with pitch-preserving tempo control")]
#[command(version)]
struct Args {
    /// Audio file to load at startup
    file: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "LOOPR_CONFIG")]
    config: Option<PathBuf>,

    /// Directory for saved loop regions
    #[arg(short, long, env = "LOOPR_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Output device name
    #[arg(short, long, env = "LOOPR_DEVICE")]
    device: Option<String>,

    /// Discard audio instead of opening a device
    #[arg(long)]
    null_output: bool,

    /// Disable time-stretching
    #[arg(long)]
    no_stretch: bool,

    /// Print status events as JSON lines
    #[arg(long)]
    json: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loopr_ap=info,loopr_common=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    info!(
        "Starting loopr-ap {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    // clap already folded LOOPR_CONFIG into args.config
    let resolved = resolve_config_path(args.config.as_deref(), "LOOPR_CONFIG", "loopr")
        .context("Failed to locate configuration file")?;
    if let Some((path, source)) = &resolved {
        info!("Using config file {} ({:?})", path.display(), source);
    }
    let mut config = PlayerConfig::load(resolved.as_ref().map(|(path, _)| path.as_path()))
        .context("Failed to load configuration")?;

    if let Some(dir) = args.output_dir {
        config.engine.output_dir = dir;
    }
    if let Some(device) = args.device {
        config.audio.device = Some(device);
    }
    config.audio.null_output |= args.null_output;
    if args.no_stretch {
        config.stretch.enabled = false;
    }

    if args.print_config {
        print!(
            "{}",
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?
        );
        return Ok(());
    }

    let sink = open_sink(&mut config);
    let backend: Arc<dyn StretchBackend> = if config.stretch.enabled {
        Arc::new(SoundStretchBackend::new(
            config.stretch.program.clone(),
            config.stretch.timeout(),
        ))
    } else {
        info!("Time-stretch disabled by configuration");
        Arc::new(PassthroughBackend)
    };

    let bus = Arc::new(EventBus::new(STATUS_BUS_CAPACITY));
    let printer = tokio::spawn(print_status(bus.subscribe(), args.json));

    let engine = Arc::new(
        PlaybackEngine::new(
            config.engine.clone(),
            sink,
            backend,
            Arc::new(StatusBus(Arc::clone(&bus))),
        )
        .context("Failed to initialize playback engine")?,
    );
    info!("Playback engine initialized");

    if let Some(file) = args.file {
        let loader = Arc::clone(&engine);
        // failure is reported on the status stream; keep running without a track
        let _ = tokio::task::spawn_blocking(move || loader.load(&file))
            .await
            .context("Load task panicked")?;
    }

    let output_dir = config.engine.output_dir.clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("End of input");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let command = match line.parse::<Command>() {
                    Ok(command) => command,
                    Err(e) => {
                        warn!("{}", e);
                        continue;
                    }
                };

                let worker_engine = Arc::clone(&engine);
                let dir = output_dir.clone();
                let reply = tokio::task::spawn_blocking(move || {
                    dispatch(&worker_engine, &command, &dir)
                })
                .await
                .context("Command task panicked")?;

                match reply {
                    Ok(Reply::Quit) => break,
                    Ok(Reply::Snapshot(snapshot)) => print_snapshot(&snapshot, args.json),
                    Ok(Reply::Saved(name)) => debug!("Saved {}", name),
                    Ok(Reply::Ok) => {}
                    // already on the status stream
                    Err(e) => debug!("Command failed: {}", e),
                }
            }
            _ = &mut ctrl_c => {
                info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    let stopping = Arc::clone(&engine);
    tokio::task::spawn_blocking(move || stopping.shutdown())
        .await
        .context("Shutdown task panicked")?;
    drop(engine);
    printer.abort();

    info!("Shutdown complete");
    Ok(())
}

/// Open the configured output, falling back to the silent sink.
///
/// A real device fixes the sample rate tracks are resampled to.
fn open_sink(config: &mut PlayerConfig) -> Box<dyn AudioSink> {
    if config.audio.null_output {
        info!("Using silent output");
        return Box::new(NullSink::new());
    }
    match CpalSink::open(config.audio.device.as_deref(), config.audio.buffer_size) {
        Ok(sink) => {
            config.engine.output_sample_rate = sink.sample_rate();
            Box::new(sink)
        }
        Err(e) => {
            warn!("{}; falling back to silent output", e);
            Box::new(NullSink::new())
        }
    }
}

async fn print_status(rx: broadcast::Receiver<StatusEvent>, json: bool) {
    let mut stream = BroadcastStream::new(rx);
    while let Some(item) = stream.next().await {
        match item {
            Ok(event) if json => match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize status event: {}", e),
            },
            Ok(event) => {
                let local = event.timestamp.with_timezone(&chrono::Local);
                println!("[{}] {}", local.format("%H:%M:%S"), event);
            }
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                warn!("Status printer lagged, {} events dropped", missed);
            }
        }
    }
}

fn print_snapshot(snapshot: &EngineSnapshot, json: bool) {
    if json {
        match serde_json::to_string(snapshot) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!("Failed to serialize snapshot: {}", e),
        }
        return;
    }

    let point = |p: Option<f64>| p.map_or_else(|| "--:--".to_string(), format_clock);
    println!(
        "{} {} {}/{} A={} B={} tempo={}%{}{}",
        snapshot.track_name.as_deref().unwrap_or("(no track)"),
        snapshot.state,
        format_clock(snapshot.position),
        format_clock(snapshot.duration),
        point(snapshot.point_a),
        point(snapshot.point_b),
        snapshot.tempo_percent,
        snapshot
            .adjust
            .map(|t| format!(" adjusting={}", t.label()))
            .unwrap_or_default(),
        if snapshot.processing { " processing" } else { "" },
    );
}
