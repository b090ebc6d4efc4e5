//! `stx` — command-line front end for the secure transport.
//!
//! Startup sequence:
//! 1. Parse arguments.
//! 2. Load and validate [`Config`] from `STX_*` environment variables.
//! 3. Initialise structured JSON logging on stderr.
//! 4. Run the subcommand and print its JSON result on stdout.
//!
//! Transport failures map to `sysexits.h` exit codes via
//! [`TransportError::exit_code`].

mod args;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use common::TransportError;
use secure_transport::{telemetry, Config};
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // -----------------------------------------------------------------------
    // 1. Arguments
    // -----------------------------------------------------------------------
    let args = args::Args::parse();

    // -----------------------------------------------------------------------
    // 2. Configuration
    // -----------------------------------------------------------------------
    let cfg = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            // Telemetry is not yet up; write to stderr directly.
            eprintln!("ERROR: configuration invalid: {e:#}");
            return ExitCode::from(78);
        }
    };

    // -----------------------------------------------------------------------
    // 3. Telemetry
    // -----------------------------------------------------------------------
    if let Err(e) = telemetry::init_telemetry(
        cfg.otel_exporter_otlp_endpoint.as_deref(),
        &cfg.log_level,
    ) {
        eprintln!("ERROR: telemetry: {e:#}");
        return ExitCode::from(70);
    }

    // -----------------------------------------------------------------------
    // 4. Command
    // -----------------------------------------------------------------------
    match commands::run(args.command, &cfg).await {
        Ok(output) => {
            println!("{output:#}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let code = match e.downcast_ref::<TransportError>() {
                Some(TransportError::SessionExpired) => {
                    eprintln!("session expired; run `stx sign-in` again");
                    TransportError::SessionExpired.exit_code()
                }
                Some(t) => t.exit_code(),
                None => 1,
            };
            error!(error = %e, exit_code = code, "command failed");
            eprintln!("ERROR: {e:#}");
            ExitCode::from(code)
        }
    }
}
