//! Tool binary resolution.
//!
//! [`Locator::locate`] returns the path of a provisioned tool binary,
//! downloading and unpacking the tool's release archive into the cache the
//! first time it is needed:
//!
//! 1. An explicit override path is returned as is.
//! 2. A present cache entry is used without touching the network.
//! 3. Otherwise the archive is downloaded into the cache root, extracted into
//!    a staging directory and the staging directory is renamed to the entry
//!    path. The archive is deleted whether or not extraction succeeded.
//!
//! Release archives wrap their files in one top-level directory
//! (`zig-x86_64-linux-0.15.2/zig`); when the staging directory holds exactly
//! one directory, that directory becomes the cache entry.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::GozError;
use crate::toolchain::archive::extract_archive;
use crate::toolchain::download::download_archive;
use crate::toolchain::paths::CachePaths;
use crate::toolchain::platform::Triple;
use crate::toolchain::tool::ToolSpec;

/// Finds or provisions tool binaries for one host.
#[derive(Debug, Clone)]
pub struct Locator {
    paths: CachePaths,
    host: Triple,
}

impl Locator {
    #[must_use]
    pub fn new(paths: CachePaths, host: Triple) -> Self {
        Self { paths, host }
    }

    /// Returns the cache entry directory of `tool` for this host.
    #[must_use]
    pub fn entry_dir(&self, tool: &ToolSpec) -> PathBuf {
        self.paths.entry_dir(&tool.name, &tool.version, self.host)
    }

    /// Returns the path of `tool`'s binary, provisioning it if needed.
    ///
    /// `explicit` is an operator-supplied binary; it is returned without any
    /// check and nothing is downloaded.
    ///
    /// # Errors
    ///
    /// Returns the downloader or extractor error if provisioning fails. The
    /// cache entry is left absent in that case.
    pub async fn locate(
        &self,
        tool: &ToolSpec,
        explicit: Option<&Path>,
    ) -> Result<PathBuf, GozError> {
        if let Some(path) = explicit {
            debug!(
                tool = %tool.name,
                env = %tool.override_env,
                path = %path.display(),
                "using explicit binary"
            );
            return Ok(path.to_path_buf());
        }

        let entry_dir = self.entry_dir(tool);
        if self.paths.is_cached(&tool.name, &tool.version, self.host) {
            debug!(tool = %tool.name, entry = %entry_dir.display(), "cache hit");
        } else {
            self.provision(tool, &entry_dir).await?;
        }

        Ok(entry_dir.join(tool.binary_file_name(self.host)))
    }

    /// Downloads and unpacks `tool` into `entry_dir`.
    async fn provision(&self, tool: &ToolSpec, entry_dir: &Path) -> Result<(), GozError> {
        let url = tool.archive_url(self.host)?;
        self.paths.ensure_root()?;

        let archive = download_archive(&url, &self.paths.root).await?;

        let staging = self.paths.staging_dir(&tool.name, &tool.version, self.host);
        let result = remove_dir_if_present(&staging)
            .and_then(|()| extract_archive(&archive, &staging))
            .and_then(|()| promote(&staging, entry_dir));

        if let Err(e) = std::fs::remove_file(&archive) {
            debug!(archive = %archive.display(), error = %e, "failed to remove archive");
        }

        if result.is_err() {
            let _ = std::fs::remove_dir_all(&staging);
        }
        result
    }
}

fn remove_dir_if_present(dir: &Path) -> Result<(), GozError> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(GozError::io(
            format!("Failed to remove stale directory: {}", dir.display()),
            e,
        )),
    }
}

/// Moves the extracted tree from `staging` to `entry_dir`.
///
/// If `staging` contains exactly one directory and nothing else, that
/// directory is moved and the empty staging directory removed.
fn promote(staging: &Path, entry_dir: &Path) -> Result<(), GozError> {
    let source = single_root_dir(staging)?.unwrap_or_else(|| staging.to_path_buf());
    debug!(from = %source.display(), to = %entry_dir.display(), "publishing cache entry");

    std::fs::rename(&source, entry_dir).map_err(|e| {
        GozError::io(
            format!(
                "Failed to move {} to {}",
                source.display(),
                entry_dir.display()
            ),
            e,
        )
    })?;

    if source != staging {
        let _ = std::fs::remove_dir(staging);
    }
    Ok(())
}

fn single_root_dir(dir: &Path) -> Result<Option<PathBuf>, GozError> {
    let read_err = |e| GozError::io(format!("Failed to read directory: {}", dir.display()), e);

    let mut entries = std::fs::read_dir(dir).map_err(read_err)?;
    let Some(first) = entries.next() else {
        return Ok(None);
    };
    let first = first.map_err(read_err)?;
    if entries.next().is_some() || !first.file_type().map_err(read_err)?.is_dir() {
        return Ok(None);
    }
    Ok(Some(first.path()))
}
