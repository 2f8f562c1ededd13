#![warn(clippy::pedantic)]

//! # goz
//!
//! `goz` wraps the `go` command so cgo code cross-compiles with Zig. It
//! downloads a pinned Zig toolchain on first use, caches it next to the Go
//! module cache, and runs go with `CGO_ENABLED=1` and `CC`/`CXX` set to
//! `zig cc` / `zig c++` for the target platform.
//!
//! ## Examples
//!
//! Build for the host:
//! ```bash
//! goz build -o app .
//! ```
//!
//! Cross-compile a stripped, upx-compressed Windows binary:
//! ```bash
//! GOOS=windows GOZ_STRIP=1 GOZ_UPX=1 goz build -o app.exe .
//! ```
//!
//! ## Logging
//!
//! Diagnostics go to stderr and are filtered by `GOZ_LOG`
//! (default `goz=warn`), e.g. `GOZ_LOG=goz=debug`.

mod commands;
mod config;
mod errors;
mod toolchain;

use anyhow::Result;
use clap::Parser;
use config::{Cli, Settings};
use errors::GozError;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "GOZ_LOG";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Handles an error and returns the appropriate exit code.
///
/// For `ProcessExitCode` errors, returns the embedded exit code without
/// printing an error message (the child already printed its output).
/// For all other errors, prints the error and returns exit code 1.
fn handle_error(e: &anyhow::Error) -> i32 {
    if let Some(GozError::ProcessExitCode { code }) = e.downcast_ref::<GozError>() {
        return *code;
    }
    eprintln!("Error: {e:?}");
    1
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("goz=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let settings = Settings::from_cli(cli)?;
    commands::go::execute(&settings).await
}
