//! C and C++ compiler command lines backed by `zig cc` / `zig c++`.
//!
//! The command is kept as an argument list. It is only joined with spaces
//! when exported through `CC`/`CXX`, which the go command splits again on
//! whitespace; a zig path containing spaces therefore cannot be expressed
//! through those variables.

use std::path::Path;

use tracing::debug;

/// Linker flag that strips symbols from the output.
pub const STRIP_LINK_FLAG: &str = "-Wl,-s";

/// Which compiler driver of the toolchain to invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilerRole {
    /// `zig cc`, exported as `CC`
    Cc,
    /// `zig c++`, exported as `CXX`
    Cxx,
}

impl CompilerRole {
    /// Returns the zig subcommand for this role.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cc => "cc",
            Self::Cxx => "c++",
        }
    }

    /// Returns the environment variable the command is exported as.
    #[must_use]
    pub fn env_var(self) -> &'static str {
        match self {
            Self::Cc => "CC",
            Self::Cxx => "CXX",
        }
    }
}

/// A compiler invocation: program followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerCommand {
    args: Vec<String>,
}

impl CompilerCommand {
    /// Builds `<zig> <role> -target <triple> [-Wl,-s]`.
    #[must_use]
    pub fn new(role: CompilerRole, zig: &Path, target: &str, strip: bool) -> Self {
        let mut args = vec![
            zig.to_string_lossy().into_owned(),
            role.as_str().to_string(),
            "-target".to_string(),
            target.to_string(),
        ];
        if strip {
            args.push(STRIP_LINK_FLAG.to_string());
        }
        Self { args }
    }

    /// Returns the program and arguments as separate tokens.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns the single-space-joined form used for `CC`/`CXX`.
    #[must_use]
    pub fn to_env_value(&self) -> String {
        self.args.join(" ")
    }
}

/// Returns the `(variable, value)` pairs for both compiler roles.
#[must_use]
pub fn compiler_env(zig: &Path, target: &str, strip: bool) -> [(&'static str, String); 2] {
    [CompilerRole::Cc, CompilerRole::Cxx].map(|role| {
        let cmd = CompilerCommand::new(role, zig, target, strip);
        debug!(args = ?cmd.args(), "{}", role.env_var());
        (role.env_var(), cmd.to_env_value())
    })
}
