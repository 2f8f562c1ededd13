//! Pinned tool definitions.
//!
//! A [`ToolSpec`] describes one provisioned tool: what it is called, which
//! version is pinned, where its release archives live and which binary inside
//! the archive to run.

use crate::errors::GozError;
use crate::toolchain::archive::ArchiveFormat;
use crate::toolchain::platform::Triple;

/// Pinned Zig release.
pub const ZIG_VERSION: &str = "0.15.2";

/// Pinned UPX release.
pub const UPX_VERSION: &str = "5.1.0";

/// How a tool spells the host platform in its archive names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostNaming {
    /// The Zig triple, e.g. `x86_64-linux`.
    Triple,
    /// UPX's own names, e.g. `amd64_linux`, `win64`.
    Upx,
}

/// A tool that goz downloads and caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSpec {
    /// Short name, used in cache directory names.
    pub name: String,
    /// Pinned version string.
    pub version: String,
    /// Download URL with `{name}`, `{version}`, `{host}` and `{ext}` placeholders.
    pub url_template: String,
    /// Binary file name inside the unpacked archive, without `.exe`.
    pub binary: String,
    /// Host spelling used to fill `{host}`.
    pub host_naming: HostNaming,
    /// Environment variable naming an explicit binary for this tool.
    pub override_env: String,
}

impl ToolSpec {
    /// Creates a tool whose archives are named after the Zig host triple and
    /// whose binary can be overridden with `GOZ_<NAME>`.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        url_template: impl Into<String>,
    ) -> Self {
        let name = name.into();
        Self {
            override_env: format!("GOZ_{}", name.to_ascii_uppercase()),
            binary: name.clone(),
            name,
            version: version.into(),
            url_template: url_template.into(),
            host_naming: HostNaming::Triple,
        }
    }

    /// The Zig compiler, used as `CC`/`CXX`.
    #[must_use]
    pub fn zig() -> Self {
        Self::new(
            "zig",
            ZIG_VERSION,
            "https://ziglang.org/download/{version}/{name}-{host}-{version}{ext}",
        )
    }

    /// The UPX executable packer.
    #[must_use]
    pub fn upx() -> Self {
        Self {
            host_naming: HostNaming::Upx,
            override_env: "GOZ_UPX_BIN".to_string(),
            ..Self::new(
                "upx",
                UPX_VERSION,
                "https://github.com/upx/upx/releases/download/v{version}/{name}-{version}-{host}{ext}",
            )
        }
    }

    /// Returns the host spelling this tool uses in archive names.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` if the tool has no build for `host`.
    pub fn host_name(&self, host: Triple) -> Result<String, GozError> {
        match self.host_naming {
            HostNaming::Triple => Ok(host.to_string()),
            HostNaming::Upx => host.upx_host().map(str::to_string),
        }
    }

    /// Expands the URL template for the given host.
    ///
    /// The archive extension follows the host: `.zip` on Windows, `.tar.xz`
    /// everywhere else.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` if the tool has no build for `host`.
    pub fn archive_url(&self, host: Triple) -> Result<String, GozError> {
        let ext = ArchiveFormat::for_host(host.os).extension();
        Ok(self
            .url_template
            .replace("{name}", &self.name)
            .replace("{version}", &self.version)
            .replace("{host}", &self.host_name(host)?)
            .replace("{ext}", ext))
    }

    /// Returns the binary file name for `host`, with `.exe` on Windows.
    #[must_use]
    pub fn binary_file_name(&self, host: Triple) -> String {
        format!("{}{}", self.binary, host.os.executable_extension())
    }
}
