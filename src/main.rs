use std::path::PathBuf;

use clap::Parser;
use pathvoice::config::EngineConfig;
use pathvoice::driver::console::{spawn_stdin_lines, ConsoleHarness};
use pathvoice::kernel::event::Event;
use pathvoice::kernel::reactor::Reactor;
use pathvoice::pathway::Pathway;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "pathvoice", about = "Voice-controlled patient pathway console")]
struct Args {
    /// TOML configuration file. Falls back to $PATHVOICE_CONFIG.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Switch the microphone on at startup.
    #[arg(long)]
    active: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so the console transcript stays readable
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = EngineConfig::resolve(args.config.as_deref())?;
    tracing::info!("Pathvoice booting (locale {})", config.locale);

    let pathway = match &config.pathway_seed {
        Some(path) => Pathway::load(path)?,
        None => Pathway::new(),
    };

    let (tx, rx) = mpsc::channel(100);
    if args.active {
        tx.send(Event::Activate).await?;
    }

    let mut harness = ConsoleHarness::new(
        spawn_stdin_lines(),
        pathway,
        std::io::stdout(),
        config.locale.clone(),
    );
    let mut reactor = Reactor::new(rx, config);

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    tracing::info!("Ready. Type :start to switch the microphone on, Ctrl+C to quit.");
    reactor.run(&mut harness, shutdown).await;

    let snapshot = reactor.telemetry.snapshot();
    tracing::info!("Session telemetry: {}", serde_json::to_string(&snapshot)?);
    drop(tx);
    Ok(())
}
