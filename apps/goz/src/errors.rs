//! Error types for the goz wrapper.
//!
//! `GozError` covers every failure the toolchain core can report. Core
//! functions return it directly so callers can match on the variant; the
//! command layer wraps it in `anyhow::Error` with extra context.

use std::path::PathBuf;
use thiserror::Error;

/// Consolidated error type for goz operations.
#[derive(Debug, Error)]
pub enum GozError {
    /// An operating system or architecture value with no matching toolchain.
    #[error("unsupported {kind} {value:?}")]
    UnsupportedPlatform {
        /// What was being resolved (`"GOOS"`, `"GOARCH"`, `"upx host"`).
        kind: &'static str,
        /// The offending value.
        value: String,
    },

    /// The HTTP transport failed before or while receiving the response.
    #[error("download of {url} failed")]
    Network {
        /// The URL being fetched.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("bad response status {status} {reason} for {url}")]
    BadStatus {
        /// The URL being fetched.
        url: String,
        /// Numeric HTTP status code.
        status: u16,
        /// Canonical reason phrase, empty if unknown.
        reason: String,
    },

    /// The archive name does not end in a supported container suffix.
    #[error("unknown compression for file {}", path.display())]
    UnknownArchiveFormat {
        /// The archive path.
        path: PathBuf,
    },

    /// Decoding or writing an archive entry failed.
    #[error("could not extract {} from {}", entry.as_deref().unwrap_or("<archive>"), archive.display())]
    Extraction {
        /// The archive being extracted.
        archive: PathBuf,
        /// Name of the entry being processed, if one was reached.
        entry: Option<String>,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A filesystem operation outside of extraction failed.
    #[error("{message}")]
    Io {
        /// Description of the operation, including the path.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// UPX compression was requested but the output binary name is unknown.
    #[error(
        "to use upx, set an output name with -o <file>, pass a main .go file, or run inside a module with a go.mod"
    )]
    OutputNameNotFound,

    /// A child process exited with a non-zero code.
    ///
    /// The child already printed its own diagnostics, so the code is
    /// propagated without an extra message.
    #[error("process exited with code {code}")]
    ProcessExitCode {
        /// The exit code from the child.
        code: i32,
    },
}

impl GozError {
    /// Creates a new `UnsupportedPlatform` error.
    #[must_use]
    pub fn unsupported(kind: &'static str, value: impl Into<String>) -> Self {
        Self::UnsupportedPlatform {
            kind,
            value: value.into(),
        }
    }

    /// Creates a new `Io` error with a description of the failed operation.
    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Creates a new `Extraction` error for the given archive entry.
    #[must_use]
    pub fn extraction(
        archive: impl Into<PathBuf>,
        entry: Option<String>,
        source: std::io::Error,
    ) -> Self {
        Self::Extraction {
            archive: archive.into(),
            entry,
            source,
        }
    }

    /// Creates a new `ProcessExitCode` error.
    #[must_use]
    pub fn process_exit_code(code: i32) -> Self {
        Self::ProcessExitCode { code }
    }
}
