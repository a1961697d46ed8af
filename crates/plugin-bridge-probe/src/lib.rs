//! Line-oriented probe plugin for exercising a host over standard I/O.
//!
//! The probe behaves like a minimal plugin: it announces itself on start,
//! waits for `ReadyToRender`, then subscribes to the data paths and events
//! named on the command line and optionally reports a fixed height. Host
//! messages are read one JSON record per line from the reader; outbound
//! envelopes are written one JSON record per line to the writer. Data and
//! event deliveries are logged through `tracing`.

pub mod telemetry;


use std::io::{BufRead, Write};

use clap::Parser;
use plugin_bridge::transport::JsonlTransport;
use plugin_bridge::{BridgeError, DataUpdate, EventUpdate, PluginBridge, RouteOutcome};
use plugin_bridge_config::BridgeConfig;
use thiserror::Error;
use tracing::{debug, info};

/// Command-line arguments for the probe.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "plugin-bridge-probe",
    about = "Speaks the plugin frame protocol over stdin and stdout"
)]
pub struct ProbeArgs {
    /// Bridge and logging configuration.
    #[command(flatten)]
    pub bridge: BridgeConfig,
    /// Data path to subscribe to once the host is ready. Repeatable.
    #[arg(long = "subscribe", value_name = "PATH")]
    pub paths: Vec<String>,
    /// Event name to subscribe to once the host is ready. Repeatable.
    #[arg(long = "event", value_name = "NAME")]
    pub events: Vec<String>,
    /// Height in pixels to report once the host is ready.
    #[arg(long, value_name = "PIXELS")]
    pub height: Option<u32>,
}

/// Counts of host messages seen during a probe run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeSummary {
    /// Lines that decoded into a known message.
    pub routed: usize,
    /// Lines that were ignored.
    pub ignored: usize,
}

/// Errors that end a probe run.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Reading host messages failed.
    #[error("failed to read host messages: {source}")]
    Read {
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Sending a message to the host failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

/// Runs one probe session until `reader` is exhausted.
///
/// # Errors
///
/// Returns [`ProbeError::Read`] when the input cannot be read and
/// [`ProbeError::Bridge`] when an outbound message cannot be written.
pub fn run<R, W>(reader: R, writer: W, args: &ProbeArgs) -> Result<ProbeSummary, ProbeError>
where
    R: BufRead,
    W: Write,
{
    let bridge = PluginBridge::new(&args.bridge, JsonlTransport::new(writer));
    let router = bridge.router();
    bridge.on_ready(|payload| {
        info!(
            parameters = %payload.parameters(),
            resource = %payload.resource(),
            "host ready"
        );
    })?;

    let mut summary = ProbeSummary::default();
    for read in reader.lines() {
        let line = read.map_err(|source| ProbeError::Read { source })?;
        if line.trim().is_empty() {
            continue;
        }
        match router.route_json(&line) {
            RouteOutcome::Ignored => summary.ignored += 1,
            RouteOutcome::Initialised { .. } => {
                summary.routed += 1;
                subscribe_requested(&bridge, args)?;
            }
            outcome => {
                summary.routed += 1;
                debug!(?outcome, "routed host message");
            }
        }
    }
    Ok(summary)
}

fn subscribe_requested<W: Write>(
    bridge: &PluginBridge<JsonlTransport<W>>,
    args: &ProbeArgs,
) -> Result<(), BridgeError> {
    if !args.paths.is_empty() {
        bridge.subscribe(args.paths.iter().cloned(), |update: &DataUpdate| {
            info!(
                path = update.path().unwrap_or_default(),
                data = %update.data(),
                "data update"
            );
        })?;
    }
    if !args.events.is_empty() {
        bridge.on(args.events.iter().cloned(), |event: &EventUpdate| {
            info!(fields = ?event.fields(), "event update");
        })?;
    }
    if let Some(height) = args.height {
        bridge.set_height(Some(height))?;
    }
    Ok(())
}
