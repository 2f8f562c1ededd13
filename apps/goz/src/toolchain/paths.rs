//! Cache path management for the goz toolchain.
//!
//! Provisioned tools live in a cache root shared by every goz invocation on
//! the machine. The root is chosen once per process:
//!
//! 1. `GOZ_HOME` if set
//! 2. `$GOPATH/pkg/mod/github.com/SuSonicTH/goz`
//! 3. `~/go/pkg/mod/github.com/SuSonicTH/goz`
//!
//! ## Directory Structure
//!
//! ```text
//! <cache-root>/
//!   zig-x86_64-linux-0.15.2/     # One entry per (tool, host triple, version)
//!     zig                        # Tool binary at the entry root
//!     lib/
//!   upx-x86_64-linux-5.1.0/
//!     upx
//!   .zig-x86_64-linux-0.15.2.partial/   # Staging dir, only during extraction
//! ```
//!
//! An entry directory only appears once its archive has been fully
//! extracted, so its existence means it is ready to use.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::errors::GozError;
use crate::toolchain::platform::Triple;

/// Environment variable overriding the cache root.
pub const GOZ_HOME_ENV: &str = "GOZ_HOME";

/// Path of the cache below a Go module root.
const MODULE_CACHE_DIR: [&str; 5] = ["pkg", "mod", "github.com", "SuSonicTH", "goz"];

/// Resolves the Go workspace directory.
///
/// Uses the first entry of `GOPATH` when set and non-empty, otherwise `~/go`,
/// the same default `go env GOPATH` reports.
///
/// # Errors
///
/// Returns an error if `GOPATH` is unset and the home directory is unknown.
pub fn go_path(gopath: Option<&OsString>) -> Result<PathBuf, GozError> {
    if let Some(gopath) = gopath.filter(|p| !p.is_empty())
        && let Some(first) = std::env::split_paths(gopath).find(|p| !p.as_os_str().is_empty())
    {
        return Ok(first);
    }

    dirs::home_dir().map(|home| home.join("go")).ok_or_else(|| {
        GozError::io(
            "Cannot determine home directory. Set GOPATH or GOZ_HOME environment variable.",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        )
    })
}

/// Paths of the on-disk tool cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    /// Directory holding every cache entry.
    pub root: PathBuf,
}

impl CachePaths {
    /// Resolves the cache root from `GOZ_HOME` and `GOPATH` values.
    ///
    /// Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns an error if neither variable is set and the home directory
    /// cannot be determined.
    pub fn resolve(
        goz_home: Option<&OsString>,
        gopath: Option<&OsString>,
    ) -> Result<Self, GozError> {
        if let Some(home) = goz_home.filter(|h| !h.is_empty()) {
            return Ok(Self::with_root(PathBuf::from(home)));
        }

        let root = MODULE_CACHE_DIR
            .iter()
            .fold(go_path(gopath)?, |path, part| path.join(part));
        Ok(Self::with_root(root))
    }

    /// Creates cache paths with a known root directory.
    #[must_use = "returns new paths instance without side effects"]
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    /// Returns the directory name of one cache entry: `<tool>-<triple>-<version>`.
    #[must_use = "returns the name without side effects"]
    pub fn entry_name(tool: &str, version: &str, triple: Triple) -> String {
        format!("{tool}-{triple}-{version}")
    }

    /// Returns the directory of one cache entry.
    ///
    /// Pure path joining: the same inputs always give the same path.
    #[must_use = "returns the path without side effects"]
    pub fn entry_dir(&self, tool: &str, version: &str, triple: Triple) -> PathBuf {
        self.root.join(Self::entry_name(tool, version, triple))
    }

    /// Returns the staging directory an entry is extracted into before it is
    /// moved into place.
    #[must_use = "returns the path without side effects"]
    pub fn staging_dir(&self, tool: &str, version: &str, triple: Triple) -> PathBuf {
        self.root
            .join(format!(".{}.partial", Self::entry_name(tool, version, triple)))
    }

    /// Checks whether the cache entry for a tool version and triple is present.
    #[must_use = "returns cache status without side effects"]
    pub fn is_cached(&self, tool: &str, version: &str, triple: Triple) -> bool {
        self.entry_dir(tool, version, triple).is_dir()
    }

    /// Creates the cache root and its parents if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn ensure_root(&self) -> Result<(), GozError> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            GozError::io(
                format!("Failed to create directory: {}", self.root.display()),
                e,
            )
        })
    }
}
