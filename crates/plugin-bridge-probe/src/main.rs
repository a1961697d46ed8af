//! Binary entrypoint for the plugin bridge probe.

use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use plugin_bridge_probe::{ProbeArgs, run, telemetry};
use tracing::info;

fn main() -> ExitCode {
    let args = ProbeArgs::parse();
    if let Err(error) = telemetry::initialise(&args.bridge) {
        writeln!(io::stderr().lock(), "{error}").ok();
        return ExitCode::FAILURE;
    }

    let stdin = io::stdin();
    let stdout = io::stdout();
    match run(stdin.lock(), stdout.lock(), &args) {
        Ok(summary) => {
            info!(routed = summary.routed, ignored = summary.ignored, "host closed input");
            ExitCode::SUCCESS
        }
        Err(error) => {
            writeln!(io::stderr().lock(), "{error}").ok();
            ExitCode::FAILURE
        }
    }
}
