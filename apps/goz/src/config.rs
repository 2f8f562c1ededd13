//! Command line and environment configuration.
//!
//! Every goz option can be given as a `--goz-*` flag before the go arguments
//! or through its environment variable. Platform selection follows the go
//! command: `GOOS`/`GOARCH` pick the target, `GOHOSTOS`/`GOHOSTARCH` may
//! override the detected host.
//!
//! An empty `GOZ_*` variable counts as unset: empty paths fall back to their
//! defaults and empty switches are off.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Parser};

use crate::errors::GozError;
use crate::toolchain::paths::GOZ_HOME_ENV;
use crate::toolchain::platform::{native_goarch, native_goos};
use crate::toolchain::{CachePaths, Platform};

/// Go build wrapper using Zig as the cgo C/C++ compiler.
///
/// All arguments after the goz options are passed to the go command
/// unchanged, so `goz build -o app .` runs `go build -o app .` with `CC` and
/// `CXX` pointing at `zig cc` / `zig c++` for the target platform.
#[derive(Parser, Debug)]
#[command(
    name = "goz",
    version,
    disable_help_flag = true,
    disable_version_flag = true,
    after_help = "\
ENVIRONMENT VARIABLES:
    GOZ_ZIG                 Explicit path to the zig binary (skips download)
    GOZ_UPX_BIN             Explicit path to the upx binary
    GOZ_HOME                Tool cache directory
                            (default: $GOPATH/pkg/mod/github.com/SuSonicTH/goz)
    GOZ_STRIP               Strip symbols from Go and C code (1/0, empty is off)
    GOZ_UPX                 Compress the built binary with upx (1/0, empty is off)
    GOZ_GO                  go command to run (default: go)
    GOZ_LOG                 Log filter (default: goz=warn)
    GOOS, GOARCH            Target platform
    GOHOSTOS, GOHOSTARCH    Host platform override"
)]
pub struct Cli {
    /// Print goz help.
    #[allow(dead_code)]
    #[arg(long = "goz-help", action = ArgAction::Help)]
    help: Option<bool>,

    /// Print goz version.
    #[allow(dead_code)]
    #[arg(long = "goz-version", action = ArgAction::Version)]
    version: Option<bool>,

    /// Zig binary to use instead of the managed toolchain.
    #[arg(long = "goz-zig", env = "GOZ_ZIG", value_name = "PATH")]
    pub zig: Option<OsString>,

    /// upx binary to use instead of PATH lookup or download.
    #[arg(long = "goz-upx-bin", env = "GOZ_UPX_BIN", value_name = "PATH")]
    pub upx_bin: Option<OsString>,

    /// Tool cache directory.
    #[arg(long = "goz-home", env = GOZ_HOME_ENV, value_name = "DIR")]
    pub home: Option<OsString>,

    /// go command to run.
    #[arg(long = "goz-go", env = "GOZ_GO", value_name = "PATH")]
    pub go: Option<OsString>,

    /// Strip symbols from the Go binary and C objects.
    #[arg(
        long = "goz-strip",
        env = "GOZ_STRIP",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    pub strip: bool,

    /// Compress the built binary with upx after a successful build.
    #[arg(
        long = "goz-upx",
        env = "GOZ_UPX",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    pub upx: bool,

    /// Arguments passed to the go command.
    #[arg(
        value_name = "GO_ARGS",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub go_args: Vec<OsString>,
}

/// go command used when `GOZ_GO` is unset or empty.
const DEFAULT_GO: &str = "go";

/// Resolved settings for one goz invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    /// go command to run.
    pub go: PathBuf,
    /// Arguments for the go command, as given.
    pub go_args: Vec<OsString>,
    /// Explicit zig binary.
    pub zig: Option<PathBuf>,
    /// Explicit upx binary.
    pub upx_bin: Option<PathBuf>,
    /// Strip symbols.
    pub strip: bool,
    /// Compress the output with upx.
    pub upx: bool,
    /// Tool cache location.
    pub cache: CachePaths,
    /// Raw `GOPATH`, used for `go install` output paths.
    pub gopath: Option<OsString>,
    /// Raw `GOBIN`, used for `go install` output paths.
    pub gobin: Option<OsString>,
    /// Host and target platform.
    pub platform: Platform,
}

impl Settings {
    /// Resolves settings from parsed arguments and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the host or target platform is unsupported or the
    /// cache root cannot be determined.
    pub fn from_cli(cli: Cli) -> Result<Self, GozError> {
        Self::from_parts(cli, |key| std::env::var_os(key))
    }

    /// Resolves settings, reading Go variables through `env`.
    pub(crate) fn from_parts(
        cli: Cli,
        env: impl Fn(&str) -> Option<OsString>,
    ) -> Result<Self, GozError> {
        let var = |key: &str| env(key).filter(|v| !v.is_empty());

        let host_os = go_var(var("GOHOSTOS"), native_goos());
        let host_arch = go_var(var("GOHOSTARCH"), native_goarch());
        let target_os = go_var(var("GOOS"), &host_os);
        let target_arch = go_var(var("GOARCH"), &host_arch);
        let platform = Platform::resolve(&host_os, &host_arch, &target_os, &target_arch)?;

        let gopath = var("GOPATH");
        let home = cli.home.filter(|h| !h.is_empty());
        let cache = CachePaths::resolve(home.as_ref(), gopath.as_ref())?;

        Ok(Self {
            go: non_empty(cli.go).unwrap_or_else(|| PathBuf::from(DEFAULT_GO)),
            go_args: cli.go_args,
            zig: non_empty(cli.zig),
            upx_bin: non_empty(cli.upx_bin),
            strip: cli.strip,
            upx: cli.upx,
            cache,
            gopath,
            gobin: var("GOBIN"),
            platform,
        })
    }
}

fn go_var(value: Option<OsString>, default: &str) -> String {
    value.map_or_else(
        || default.to_string(),
        |v| v.to_string_lossy().into_owned(),
    )
}

fn non_empty(path: Option<OsString>) -> Option<PathBuf> {
    path.filter(|p| !p.is_empty()).map(PathBuf::from)
}
