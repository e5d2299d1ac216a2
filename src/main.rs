//! Pixel Stream CLI - convert videos and play them on an LED clock.

use std::fs;
use std::num::NonZeroU8;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::sync::{mpsc, watch};
use tokio::task;

use pixelstream::{
    Frame, Generator,
    container::{GRID_WIDTH, storage},
    device::{self, DeviceClient},
    playback::{Control, PlaybackSession, PlaybackSnapshot, format_clock},
    schema::{DeviceHost, StreamConfig},
    source::{SourceStatus, StreamOrigin, open_source},
};

/// Convert videos to 32x8 pixel streams and play them on an LED clock.
#[derive(Parser, Debug)]
#[command(name = "pixelstream")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a JSON configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "PIXELSTREAM_LOG_LEVEL", global = true)]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert one or more videos into pixel streams.
    Convert {
        /// Videos to convert.
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Output file, or output directory when converting several videos.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Frame rate of the generated streams.
        #[arg(short = 'r', long)]
        frame_rate: Option<NonZeroU8>,
    },

    /// Play a video or stored stream on a device.
    Play {
        /// Video or `.pxlstrm` file.
        source: PathBuf,

        /// Device address, e.g. http://192.168.1.170
        host: DeviceHost,

        /// Frame rate used if the video has to be converted.
        #[arg(short = 'r', long)]
        frame_rate: Option<NonZeroU8>,

        /// Neither read nor write the conversion cache.
        #[arg(long)]
        no_cache: bool,
    },

    /// Print what a device currently shows.
    Screen {
        /// Device address, e.g. http://192.168.1.170
        host: DeviceHost,

        /// Keep refreshing every N milliseconds until Ctrl-C.
        #[arg(short, long, value_name = "MS")]
        watch: Option<u64>,
    },

    /// Print an example configuration file.
    ExampleConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Convert {
            sources,
            output,
            frame_rate,
        } => convert(&config, sources, output, frame_rate).await,
        Command::Play {
            source,
            host,
            frame_rate,
            no_cache,
        } => {
            let mut config = config;
            if let Some(rate) = frame_rate {
                config.frame_rate = rate.get();
            }
            if no_cache {
                config.use_cache = false;
            }
            play(config, source, host).await
        }
        Command::Screen { host, watch } => screen(&config, host, watch).await,
        Command::ExampleConfig => {
            println!("{}", serde_json::to_string_pretty(&StreamConfig::default())?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<StreamConfig> {
    let Some(path) = path else {
        return Ok(StreamConfig::default());
    };

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: StreamConfig = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn convert(
    config: &StreamConfig,
    sources: Vec<PathBuf>,
    output: Option<PathBuf>,
    frame_rate: Option<NonZeroU8>,
) -> Result<()> {
    let mut generator = Generator::from_config(config).context("Invalid configuration")?;
    if let Some(rate) = frame_rate {
        generator = generator.with_frame_rate(rate);
    }

    if sources.len() > 1
        && let Some(dir) = &output
    {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let multiple = sources.len() > 1;
    let generator = Arc::new(generator);
    let mut failed = 0;

    for source in sources {
        let destination = storage::output_path(&source, output.as_deref(), multiple);
        let generator = Arc::clone(&generator);
        let job = source.clone();

        let result = task::spawn_blocking(move || -> Result<()> {
            let stream = generator.generate(&job)?;
            storage::save(&destination, &stream)?;
            Ok(())
        })
        .await
        .context("Conversion task panicked")?;

        if let Err(e) = result {
            log::error!("Failed to convert {}: {:#}", source.display(), e);
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} conversion(s) failed", failed);
    }
    Ok(())
}

async fn play(config: StreamConfig, source: PathBuf, host: DeviceHost) -> Result<()> {
    let generator = Generator::from_config(&config).context("Invalid configuration")?;
    let use_cache = config.use_cache;

    let (stream, origin) = task::spawn_blocking(move || {
        open_source(&source, &generator, use_cache, |status| match status {
            SourceStatus::Converting => log::info!("No stored stream found, converting"),
            status => log::debug!("Source: {:?}", status),
        })
    })
    .await
    .context("Loading task panicked")?
    .context("Failed to open source")?;

    match &origin {
        StreamOrigin::Stored(path) | StreamOrigin::Cached(path) => {
            log::info!("Using stored stream {}", path.display())
        }
        StreamOrigin::Converted { saved_to: Some(path) } => {
            log::info!("Cached conversion at {}", path.display())
        }
        StreamOrigin::Converted { saved_to: None } => {}
    }

    let client = DeviceClient::new(host, &config).context("Failed to create device client")?;
    log::info!("Streaming to {}", client.host());

    let session = PlaybackSession::new(Arc::new(stream), Arc::new(client), &config)
        .context("Cannot play stream")?
        .quit_at_end(true);

    let progress = task::spawn(report_progress(session.subscribe()));
    let (controls, rx) = mpsc::unbounded_channel();
    let playback = task::spawn(session.run(rx));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Interrupted, stopping playback");
            let _ = controls.send(Control::Quit);
        }
        _ = controls.closed() => {}
    }

    let summary = playback.await.context("Playback task panicked")?;
    progress.abort();
    log::info!(
        "Stopped at {} / {}",
        format_clock(summary.elapsed),
        format_clock(summary.max)
    );
    Ok(())
}

/// Log the playback position once per second of stream time.
async fn report_progress(mut snapshots: watch::Receiver<PlaybackSnapshot>) {
    let mut last_second = None;
    while snapshots.changed().await.is_ok() {
        let snapshot = *snapshots.borrow_and_update();
        let second = snapshot.elapsed.as_secs();
        if last_second != Some(second) {
            last_second = Some(second);
            log::info!(
                "{} / {} ({:.0}%)",
                format_clock(snapshot.elapsed),
                format_clock(snapshot.max),
                snapshot.progress() * 100.0
            );
        }
    }
}

async fn screen(config: &StreamConfig, host: DeviceHost, watch_ms: Option<u64>) -> Result<()> {
    let client = DeviceClient::new(host, config).context("Failed to create device client")?;

    let Some(interval) = watch_ms else {
        let frame = client.pull().await.context("Failed to read screen")?;
        print_frame(&frame);
        return Ok(());
    };
    if interval == 0 {
        bail!("Refresh interval must be positive");
    }

    let (tx, mut rx) = watch::channel(Frame::black());
    let mirror = task::spawn(device::mirror(client, Duration::from_millis(interval), tx));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                print_frame(&rx.borrow_and_update());
            }
        }
    }

    drop(rx);
    mirror.await.context("Mirror task panicked")?;
    Ok(())
}

/// Print a frame as rows of truecolor blocks.
fn print_frame(frame: &Frame) {
    let mut out = String::new();
    for row in frame.pixels().chunks(GRID_WIDTH) {
        for p in row {
            out.push_str(&format!("\x1b[48;2;{};{};{}m  ", p.r, p.g, p.b));
        }
        out.push_str("\x1b[0m\n");
    }
    print!("{out}");
}
