//! Serial Plotter - Main Entry Point
//!
//! Headless front end: lists serial ports, or runs an ingest session and
//! prints each redraw as a summary line or JSON object on stdout. Logs go to
//! stderr and, optionally, to a file.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serial_plotter::{
    config::{parse_capacity, parse_vertical_bound, PlotterConfig},
    render::{JsonLinesRenderer, SummaryRenderer},
    transport::{available_ports, ScriptedTransport, SerialTransport, SignalPattern},
    IngestSession, RedrawPolicy, Renderer, SessionConfig, StopOutcome,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Longest single wait inside the redraw loop
const PUMP_SLICE: Duration = Duration::from_millis(100);

#[derive(Parser)]
#[command(author, version, about = "Plot name/value telemetry streamed over a serial port")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// List available serial ports
    Ports,
    /// Read telemetry from a serial port
    Run(RunArgs),
    /// Read telemetry from a built-in signal generator
    Demo(DemoArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Serial port, e.g. /dev/ttyUSB0 or COM3
    #[arg(short, long)]
    port: Option<String>,

    /// Line speed
    #[arg(short, long)]
    baud: Option<u32>,

    #[command(flatten)]
    session: SessionArgs,

    /// Write the effective settings back to the config file
    #[arg(long)]
    save: bool,
}

#[derive(Args)]
struct DemoArgs {
    /// Generated lines per second
    #[arg(long, default_value_t = 200.0)]
    rate: f64,

    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Args)]
struct SessionArgs {
    /// Samples kept per series
    #[arg(long)]
    capacity: Option<String>,

    /// Clamp values to [-BOUND, BOUND]; "unbounded" disables
    #[arg(long)]
    bound: Option<String>,

    /// Redraw mode: immediate, 1/30, <n>hz, <x>ms or <x>s
    #[arg(long)]
    redraw: Option<String>,

    /// Stop after this many seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Line to send after the session starts (repeatable)
    #[arg(long)]
    send: Vec<String>,

    /// Print redraws as JSON lines instead of summaries
    #[arg(long)]
    json: bool,

    /// Log every received chunk
    #[arg(long)]
    echo_raw: bool,
}

impl SessionArgs {
    /// Overlay the command line on the file settings
    fn apply(&self, mut config: SessionConfig) -> anyhow::Result<SessionConfig> {
        if let Some(capacity) = &self.capacity {
            config.capacity = parse_capacity(capacity)?;
        }
        if let Some(bound) = &self.bound {
            config.vertical_bound = parse_vertical_bound(bound)?;
        }
        if let Some(redraw) = &self.redraw {
            config.redraw = RedrawPolicy::parse(redraw)?;
        }
        if self.echo_raw {
            config.echo_raw = true;
        }
        config.validate()?;
        Ok(config)
    }

    fn duration(&self) -> anyhow::Result<Option<Duration>> {
        self.duration
            .map(|secs| Duration::try_from_secs_f64(secs).context("invalid --duration"))
            .transpose()
    }

    fn renderer(&self) -> Box<dyn Renderer> {
        if self.json {
            Box::new(JsonLinesRenderer::new(std::io::stdout()))
        } else {
            Box::new(SummaryRenderer::new(std::io::stdout()))
        }
    }
}

fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,serial_plotter=debug"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));

    let Some(path) = log_file else {
        registry.init();
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .with_context(|| format!("log file {:?} has no file name", path))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    registry
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref())?;

    let config_path = cli.config.clone().or_else(PlotterConfig::default_path);
    let file_config = PlotterConfig::load_or_default(config_path.as_ref());

    match cli.command {
        Command::Ports => list_ports(),
        Command::Run(args) => run(args, file_config, config_path),
        Command::Demo(args) => demo(args, file_config),
    }
}

fn list_ports() -> anyhow::Result<()> {
    let ports = available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{}", port);
    }
    Ok(())
}

fn run(args: RunArgs, mut config: PlotterConfig, config_path: Option<PathBuf>) -> anyhow::Result<()> {
    if let Some(port) = args.port {
        config.serial.port = port;
    }
    if let Some(baud) = args.baud {
        config.serial.baud_rate = baud;
    }
    config.serial.validate()?;
    config.session = args.session.apply(config.session)?;

    if args.save {
        let path = config_path.context("no config directory on this platform; pass --config")?;
        config.save(&path)?;
        tracing::info!("Saved settings to {:?}", path);
    }

    tracing::info!(
        "Starting serial plotter on {} @ {} baud",
        config.serial.port,
        config.serial.baud_rate
    );
    let transport = SerialTransport::new(config.serial.clone());
    let mut session = IngestSession::new(Box::new(transport));
    drive(&mut session, config.session, &args.session)
}

fn demo(args: DemoArgs, config: PlotterConfig) -> anyhow::Result<()> {
    let session_config = args.session.apply(config.session)?;

    let (transport, handle) = ScriptedTransport::new();
    let stop = Arc::new(AtomicBool::new(false));
    let generator = handle.spawn_generator(
        vec![
            (
                "sine".to_string(),
                SignalPattern::Sine {
                    frequency: 0.5,
                    amplitude: 100.0,
                    offset: 0.0,
                },
            ),
            (
                "saw".to_string(),
                SignalPattern::Sawtooth {
                    period: 3.0,
                    amplitude: 50.0,
                },
            ),
            (
                "square".to_string(),
                SignalPattern::Square {
                    period: 2.0,
                    amplitude: 25.0,
                },
            ),
        ],
        args.rate,
        stop.clone(),
    )?;

    tracing::info!("Starting demo at {} lines/s", args.rate);
    let mut session = IngestSession::new(Box::new(transport));
    let result = drive(&mut session, session_config, &args.session);

    stop.store(true, Ordering::SeqCst);
    if generator.join().is_err() {
        tracing::warn!("Signal generator panicked");
    }
    let written = handle.written();
    if !written.is_empty() {
        tracing::info!("Demo device received: {:?}", String::from_utf8_lossy(&written));
    }
    result
}

/// Start `session`, send the requested lines, then pump redraws until the
/// duration elapses or the reader stops
fn drive(
    session: &mut IngestSession,
    config: SessionConfig,
    args: &SessionArgs,
) -> anyhow::Result<()> {
    let limit = args.duration()?;
    session.start(config)?;

    for line in &args.send {
        match session.send(line.as_bytes()) {
            Ok(n) => tracing::info!("Sent {} bytes", n),
            Err(e) if e.is_timeout() => tracing::warn!("{}", e),
            Err(e) => return Err(e.into()),
        }
    }

    let mut renderer = args.renderer();
    let started = Instant::now();
    let result = loop {
        if limit.is_some_and(|limit| started.elapsed() >= limit) {
            break Ok(());
        }
        let slice = limit.map_or(PUMP_SLICE, |limit| {
            limit.saturating_sub(started.elapsed()).min(PUMP_SLICE)
        });
        match session.pump(renderer.as_mut(), slice) {
            Ok(_) if !session.is_running() => break Ok(()),
            Ok(_) => {}
            Err(e) => break Err(e),
        }
    };

    let stats = session.stats();
    tracing::info!(
        "{} chunks, {} bytes, {} lines ({:.1}% malformed), {} redraws",
        stats.chunks_received,
        stats.bytes_received,
        stats.lines_received,
        stats.malformed_rate(),
        stats.redraws
    );
    let result = match session.stop() {
        StopOutcome::ReaderTimedOut => {
            tracing::warn!("Reader thread was detached on shutdown");
            result
        }
        StopOutcome::Failed(e) => result.and(Err(e)),
        StopOutcome::NotRunning | StopOutcome::Stopped => result,
    };
    result.context("session ended with an error")
}
