//! UPX compression of the binary produced by go.
//!
//! go does not report where it wrote its output, so the path is derived the
//! same way go names it: the `-o` value, else the first main `.go` file,
//! else the last element of the module path in `go.mod`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info};

use crate::config::Settings;
use crate::errors::GozError;
use crate::toolchain::paths::go_path;
use crate::toolchain::platform::Os;
use crate::toolchain::{Locator, ToolSpec};

static MODULE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*module\s+"?([^\s"]+)"?"#).expect("module regex is valid")
});

/// Compresses the binary go just built with `upx --lzma`.
///
/// # Errors
///
/// Returns an error if:
/// - the output name cannot be determined (`OutputNameNotFound`)
/// - no upx binary can be found or provisioned
/// - upx exits with a non-zero code (`ProcessExitCode`)
pub async fn compress(settings: &Settings, locator: &Locator) -> Result<()> {
    let exe = output_path(settings, Path::new("."))?;
    let upx = find_upx(settings.upx_bin.as_deref(), locator).await?;

    info!(exe = %exe.display(), "compressing with upx");
    let status = Command::new(&upx)
        .arg("--lzma")
        .arg(&exe)
        .status()
        .with_context(|| format!("Failed to execute upx at {}", upx.display()))?;

    if !status.success() {
        let code = status.code().unwrap_or(1);
        return Err(GozError::process_exit_code(code).into());
    }
    Ok(())
}

/// Finds upx: explicit path, then PATH, then the managed cache.
async fn find_upx(explicit: Option<&Path>, locator: &Locator) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Ok(path) = which::which("upx") {
        debug!(upx = %path.display(), "using upx from PATH");
        return Ok(path);
    }
    locator
        .locate(&ToolSpec::upx(), None)
        .await
        .context("Failed to provision upx")
}

/// Returns where go wrote its output, relative to `dir` for build commands.
///
/// # Errors
///
/// Returns `OutputNameNotFound` if no name can be derived, or an error if
/// the install directory of `go install` cannot be determined.
pub fn output_path(settings: &Settings, dir: &Path) -> Result<PathBuf, GozError> {
    let os = settings.platform.target.os;
    let install = settings.go_args.first().is_some_and(|a| a == "install");

    if !install && let Some(path) = explicit_output(&settings.go_args) {
        return Ok(dir.join(with_executable_extension(path, os)));
    }

    let name = derived_name(&settings.go_args, dir).ok_or(GozError::OutputNameNotFound)?;
    let file = with_executable_extension(name, os);
    if install {
        Ok(install_dir(settings)?.join(file))
    } else {
        Ok(dir.join(file))
    }
}

/// Directory `go install` writes binaries to.
fn install_dir(settings: &Settings) -> Result<PathBuf, GozError> {
    let bin = match settings.gobin.as_ref() {
        Some(gobin) => PathBuf::from(gobin),
        None => go_path(settings.gopath.as_ref())?.join("bin"),
    };

    let platform = settings.platform;
    if platform.host == platform.target {
        Ok(bin)
    } else {
        Ok(bin.join(format!(
            "{}_{}",
            platform.target.os.goos(),
            platform.target.arch.goarch()
        )))
    }
}

/// Returns the value of `-o`, in either `-o name` or `-o=name` form.
fn explicit_output(args: &[OsString]) -> Option<String> {
    let mut iter = args.iter().filter_map(|a| a.to_str());
    while let Some(arg) = iter.next() {
        let flag = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-'));
        if flag == Some("o") {
            return iter.next().map(str::to_string);
        }
        if let Some(value) = flag.and_then(|f| f.strip_prefix("o=")) {
            return Some(value.to_string());
        }
    }
    None
}

/// Derives the binary name from a main `.go` file or the module path.
fn derived_name(args: &[OsString], dir: &Path) -> Option<String> {
    let from_file = args
        .iter()
        .filter_map(|a| a.to_str())
        .find(|a| a.ends_with(".go") && !a.ends_with("_test.go"))
        .and_then(|a| Path::new(a).file_stem())
        .map(|stem| stem.to_string_lossy().into_owned());

    from_file.or_else(|| {
        let go_mod = std::fs::read_to_string(dir.join("go.mod")).ok()?;
        module_name(&go_mod)
    })
}

/// Returns the binary name go uses for a module: its last path element,
/// skipping a `/vN` major version suffix.
fn module_name(go_mod: &str) -> Option<String> {
    let module = MODULE_LINE.captures(go_mod)?.get(1)?.as_str();
    let mut segments = module.rsplit('/');
    let last = segments.next()?;
    let is_major_version = last
        .strip_prefix('v')
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));

    if is_major_version && let Some(parent) = segments.next() {
        return Some(parent.to_string());
    }
    Some(last.to_string())
}

fn with_executable_extension(name: String, os: Os) -> String {
    let ext = os.executable_extension();
    if ext.is_empty() || name.to_ascii_lowercase().ends_with(ext) {
        name
    } else {
        format!("{name}{ext}")
    }
}
