//! Toolchain provisioning for goz.
//!
//! ## Module Structure
//!
//! - [`platform`] - `GOOS`/`GOARCH` to Zig triple resolution
//! - [`tool`] - Pinned tool definitions (Zig, UPX)
//! - [`paths`] - Cache root and cache entry paths
//! - [`download`] - HTTP download to a temporary file
//! - [`archive`] - ZIP and tar.xz extraction
//! - [`locator`] - Cache lookup and provisioning
//! - [`compiler`] - `CC`/`CXX` command lines

pub mod archive;
pub mod compiler;
pub mod download;
pub mod locator;
pub mod paths;
pub mod platform;
pub mod tool;

pub use compiler::compiler_env;
pub use locator::Locator;
pub use paths::CachePaths;
pub use platform::Platform;
pub use tool::ToolSpec;
