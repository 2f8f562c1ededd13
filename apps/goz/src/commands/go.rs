//! Runs the go command with Zig as the cgo compiler.
//!
//! ## Execution Flow
//!
//! 1. **Locate** - Find or provision zig for the host
//! 2. **Environment** - Export `CGO_ENABLED=1`, `CC` and `CXX` for the target
//! 3. **Run** - Execute go with the forwarded arguments
//! 4. **Compress** - Optionally pack the produced binary with upx
//!
//! The exit code of go becomes the exit code of goz.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use tracing::debug;

use crate::commands::upx;
use crate::config::Settings;
use crate::errors::GozError;
use crate::toolchain::{Locator, ToolSpec, compiler_env};

/// go subcommands that accept build flags.
const BUILD_SUBCOMMANDS: [&str; 4] = ["build", "install", "run", "test"];

/// Flags inserted after the subcommand when stripping.
const STRIP_GO_FLAGS: [&str; 3] = ["-ldflags", "-s -w", "-trimpath"];

/// Executes go with the compiler environment set up.
///
/// # Errors
///
/// Returns an error if:
/// - zig cannot be provisioned
/// - go cannot be found or started
/// - go exits with a non-zero code (`ProcessExitCode`)
/// - upx compression was requested and fails
pub async fn execute(settings: &Settings) -> Result<()> {
    let locator = Locator::new(settings.cache.clone(), settings.platform.host);

    let zig = locator
        .locate(&ToolSpec::zig(), settings.zig.as_deref())
        .await
        .context("Failed to provision the zig toolchain")?;

    let go = find_go(&settings.go)?;
    let args = go_args(&settings.go_args, settings.strip);
    let target = settings.platform.target.to_string();

    let mut cmd = Command::new(&go);
    cmd.args(&args).env("CGO_ENABLED", "1");
    cmd.envs(compiler_env(&zig, &target, settings.strip));

    debug!(go = %go.display(), ?args, "running go");
    let status = cmd
        .status()
        .with_context(|| format!("Failed to execute go at {}", go.display()))?;

    if !status.success() {
        let code = status.code().unwrap_or(1);
        return Err(GozError::process_exit_code(code).into());
    }

    if settings.upx {
        upx::compress(settings, &locator).await?;
    }

    Ok(())
}

/// Resolves the go binary through PATH.
fn find_go(go: &Path) -> Result<PathBuf> {
    which::which(go).with_context(|| {
        format!(
            "{} not found.\n\n\
            goz runs the go command, which must be installed and on PATH.\n  \
            - Download from: https://go.dev/dl/\n  \
            - Or set GOZ_GO to the go binary path",
            go.display()
        )
    })
}

/// Returns the arguments for go, adding strip flags to build subcommands.
///
/// The flags go right after the subcommand so they precede package
/// arguments, which go requires.
pub fn go_args(args: &[OsString], strip: bool) -> Vec<OsString> {
    let mut result = args.to_vec();
    let is_build = args
        .first()
        .and_then(|a| a.to_str())
        .is_some_and(|sub| BUILD_SUBCOMMANDS.contains(&sub));

    if strip && is_build {
        result.splice(1..1, STRIP_GO_FLAGS.map(OsString::from));
    }
    result
}
