//! Network input (netaudio-in) - Main entry point
//!
//! Runs one or more network input consumers against a simulated network
//! source, ticking once per audio block period until the requested number of
//! ticks has elapsed or a shutdown signal arrives.

use std::fs::File;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use netaudio_common::events::EventBus;
use netaudio_common::Channel;
use netaudio_in::config::TomlConfig;
use netaudio_in::observer::{EventBusObserver, FanoutObserver, InputObserver, TracingObserver};
use netaudio_in::sim::SimulatedSource;
use netaudio_in::sink::LevelMeterSink;
use netaudio_in::{BlockConsumer, LocalMultiplexer, Multiplexer};
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for netaudio-in
#[derive(Parser, Debug)]
#[command(name = "netaudio-in")]
#[command(about = "Network audio input consumer driven by a simulated source")]
#[command(version)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many ticks (runs until Ctrl+C if omitted)
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Stream to subscribe to (first eligible stream if omitted)
    #[arg(short, long)]
    stream: Option<usize>,

    /// Number of consumers sharing the stream
    #[arg(long, default_value = "1")]
    consumers: usize,

    /// Print diagnostic events to stdout as JSON lines
    #[arg(long)]
    json_events: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = TomlConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config)?;

    info!(
        "Starting netaudio-in (git {}, built {}, {})",
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let sim = &config.simulation;
    let mux = Arc::new(LocalMultiplexer::with_queue_capacity(sim.streams, sim.queue_capacity));
    let mut source = SimulatedSource::new(mux.clone(), sim);

    let bus = EventBus::new(config.input.event_capacity);
    let mut observer = FanoutObserver::new().with(Arc::new(TracingObserver));
    if args.json_events {
        observer = observer.with(Arc::new(EventBusObserver::new(bus.clone())));
        spawn_json_printer(&bus);
    }
    let observer: Arc<dyn InputObserver> = Arc::new(observer);

    let mut consumers: Vec<BlockConsumer<LevelMeterSink>> = (0..args.consumers.max(1))
        .map(|_| {
            let mut input = BlockConsumer::new(LevelMeterSink::new())
                .with_observer(observer.clone())
                .with_report_every(config.input.report_every);
            input.begin();
            input.attach(mux.clone());
            input
        })
        .collect();

    let stream = match args.stream {
        Some(stream) => Some(stream),
        None => consumers[0].next_eligible_stream(None),
    };
    match stream {
        Some(stream) => {
            for input in &mut consumers {
                input
                    .try_subscribe(stream)
                    .with_context(|| format!("Failed to subscribe to stream {}", stream))?;
            }
            info!("{} consumer(s) subscribed to stream {}", consumers.len(), stream);
        }
        None => warn!("No eligible stream found, consumers will idle"),
    }

    let period = config.input.tick_period();
    info!("Tick period {:?}", period);
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut elapsed: u64 = 0;

    loop {
        if args.ticks.is_some_and(|limit| elapsed >= limit) {
            break;
        }
        tokio::select! {
            _ = interval.tick() => {
                source.step();
                for input in &mut consumers {
                    input.tick();
                }
                elapsed += 1;
            }
            _ = &mut shutdown => break,
        }
    }

    for input in &mut consumers {
        input.release();
    }

    info!(
        "Source: {} block(s) generated, {} dropped in transit, {} queue overrun(s)",
        source.generated(),
        source.dropped(),
        mux.overruns()
    );
    for input in &consumers {
        let stats = input.loss_stats();
        let meter = input.sink();
        info!(
            "{}: {} received, {} missing, loss ratio {}, last sequence {}, peak L/R {}/{}",
            input
                .consumer_id()
                .map_or_else(|| "unregistered input".to_string(), |id| id.to_string()),
            stats.received,
            stats.missing,
            stats
                .loss_ratio()
                .map_or_else(|| "n/a".to_string(), |r| format!("{:.3}%", r)),
            input.current_sequence(),
            meter.peak(Channel::Left),
            meter.peak(Channel::Right)
        );
    }
    info!(
        "Stream subscribers after release: {:?}",
        (0..mux.active_stream_count())
            .filter_map(|i| mux.stream(i).map(|d| d.subscribers))
            .collect::<Vec<_>>()
    );

    Ok(())
}

/// Install the tracing subscriber (RUST_LOG overrides the configured level)
fn init_tracing(config: &TomlConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "netaudio_in={level},netaudio_common={level}",
            level = config.logging.level
        ))
    });

    let file_layer = match &config.logging.file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

/// Print every bus event as a JSON line
fn spawn_json_printer(bus: &EventBus) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Failed to serialize event: {}", e),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("JSON event printer lagged, {} event(s) skipped", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
