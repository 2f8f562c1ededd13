//! Platform resolution for the goz toolchain.
//!
//! Go names platforms with `GOOS`/`GOARCH` values (`linux`, `amd64`), Zig
//! with target triples (`x86_64-linux`). This module translates between the
//! two and also knows the archive naming used by UPX releases.
//!
//! ## Supported Platforms
//!
//! | GOOS      | GOARCH  | Triple            | UPX host      |
//! |-----------|---------|-------------------|---------------|
//! | `linux`   | `amd64` | `x86_64-linux`    | `amd64_linux` |
//! | `linux`   | `arm64` | `aarch64-linux`   | `arm64_linux` |
//! | `windows` | `amd64` | `x86_64-windows`  | `win64`       |
//! | `windows` | `arm64` | `aarch64-windows` | unsupported   |

use std::fmt;

use crate::errors::GozError;

/// Operating system of a host or target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    /// Linux
    Linux,
    /// Windows
    Windows,
}

impl Os {
    /// Parses a `GOOS` value.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` for anything but `linux` and `windows`.
    pub fn from_goos(goos: &str) -> Result<Self, GozError> {
        match goos {
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            other => Err(GozError::unsupported("GOOS", other)),
        }
    }

    /// Returns the OS component of a Zig triple.
    #[must_use = "returns the OS string without side effects"]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Windows => "windows",
        }
    }

    /// Returns the `GOOS` spelling.
    #[must_use]
    pub fn goos(self) -> &'static str {
        self.as_str()
    }

    /// Returns the executable file extension for this OS.
    ///
    /// Returns `.exe` on Windows, empty string otherwise.
    #[must_use = "returns the extension string without side effects"]
    pub fn executable_extension(self) -> &'static str {
        match self {
            Self::Windows => ".exe",
            Self::Linux => "",
        }
    }

    /// Returns whether this is the Windows family.
    #[must_use = "returns platform check result without side effects"]
    pub fn is_windows(self) -> bool {
        matches!(self, Self::Windows)
    }
}

/// CPU architecture of a host or target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    /// `amd64` in Go, `x86_64` in Zig
    X86_64,
    /// `arm64` in Go, `aarch64` in Zig
    Aarch64,
}

impl Arch {
    /// Parses a `GOARCH` value.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` for anything but `amd64` and `arm64`.
    pub fn from_goarch(goarch: &str) -> Result<Self, GozError> {
        match goarch {
            "amd64" => Ok(Self::X86_64),
            "arm64" => Ok(Self::Aarch64),
            other => Err(GozError::unsupported("GOARCH", other)),
        }
    }

    /// Returns the architecture component of a Zig triple.
    #[must_use = "returns the architecture string without side effects"]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::Aarch64 => "aarch64",
        }
    }

    /// Returns the `GOARCH` spelling.
    #[must_use]
    pub fn goarch(self) -> &'static str {
        match self {
            Self::X86_64 => "amd64",
            Self::Aarch64 => "arm64",
        }
    }
}

/// A Zig target triple such as `x86_64-linux`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Triple {
    pub arch: Arch,
    pub os: Os,
}

impl Triple {
    /// Resolves a Go `(GOOS, GOARCH)` pair into a Zig triple.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` naming whichever value has no mapping.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let triple = Triple::resolve("linux", "arm64")?;
    /// assert_eq!(triple.to_string(), "aarch64-linux");
    /// ```
    pub fn resolve(goos: &str, goarch: &str) -> Result<Self, GozError> {
        let os = Os::from_goos(goos)?;
        let arch = Arch::from_goarch(goarch)?;
        Ok(Self { arch, os })
    }

    /// Returns the host component UPX uses in its release archive names.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` when UPX publishes no build for the triple.
    pub fn upx_host(self) -> Result<&'static str, GozError> {
        match (self.os, self.arch) {
            (Os::Linux, Arch::X86_64) => Ok("amd64_linux"),
            (Os::Linux, Arch::Aarch64) => Ok("arm64_linux"),
            (Os::Windows, Arch::X86_64) => Ok("win64"),
            (Os::Windows, Arch::Aarch64) => Err(GozError::unsupported("upx host", self.to_string())),
        }
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.arch.as_str(), self.os.as_str())
    }
}

/// The host and target triples of one goz invocation.
///
/// Computed once at startup and passed to whatever needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    /// Where the provisioned tools run; selects which archive to download.
    pub host: Triple,
    /// What the C compiler emits code for; becomes the `-target` flag.
    pub target: Triple,
}

impl Platform {
    /// Resolves host and target from Go platform names.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedPlatform` if any of the four values is unsupported.
    pub fn resolve(
        host_os: &str,
        host_arch: &str,
        target_os: &str,
        target_arch: &str,
    ) -> Result<Self, GozError> {
        Ok(Self {
            host: Triple::resolve(host_os, host_arch)?,
            target: Triple::resolve(target_os, target_arch)?,
        })
    }
}

/// Returns the `GOOS` spelling of the OS this binary was built for.
///
/// Unknown systems are returned verbatim so resolution can report them.
#[must_use]
pub fn native_goos() -> &'static str {
    std::env::consts::OS
}

/// Returns the `GOARCH` spelling of the architecture this binary was built for.
///
/// Unknown architectures are returned verbatim so resolution can report them.
#[must_use]
pub fn native_goarch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => other,
    }
}
