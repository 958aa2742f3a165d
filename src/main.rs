//! Binary entry point: parse the CLI, initialize logging, probe the
//! configured device, build the `Engine`, and run the Event Loop forever
//! (until EXIT or a fatal bind failure).

use clap::Parser;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

use cwdaemon_rs::config::Cli;
use cwdaemon_rs::device;
use cwdaemon_rs::engine::{Engine, QUEUE_LOW_WATERMARK};
use cwdaemon_rs::tone_engine::SoftwareToneEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let parsed_options = cli.parsed_options();
    for (key, value) in &parsed_options {
        tracing::debug!(key, value, "serial pin option");
    }

    let params = cli.to_parameters();

    let (cw_pin, ptt_pin) = device::resolve_pin_assignments(&parsed_options);
    let device = device::probe_device(&cli.cwdevice, cw_pin, ptt_pin).await;
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let tone = Box::new(SoftwareToneEngine::new(event_tx, QUEUE_LOW_WATERMARK));

    let mut engine = Engine::new(params, device, tone);
    engine.init().await?;

    let socket = UdpSocket::bind(("0.0.0.0", cli.port)).await?;
    tracing::info!(port = cli.port, device = %cli.cwdevice, "cwdaemon-rs listening");

    cwdaemon_rs::event_loop::run(socket, engine, event_rx).await?;
    Ok(())
}

fn init_logging(cli: &Cli) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.verbosity_filter()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match cli.debugfile.as_str() {
        "stdout" => builder.with_writer(std::io::stdout).init(),
        "stderr" => builder.with_writer(std::io::stderr).init(),
        path => match std::fs::File::create(path) {
            Ok(file) => builder.with_writer(file).init(),
            Err(e) => {
                builder.with_writer(std::io::stderr).init();
                tracing::warn!(path, error = %e, "failed to open debugfile, logging to stderr");
            }
        },
    }
}
