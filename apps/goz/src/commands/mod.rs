//! Command modules for the goz CLI.
//!
//! - [`go`] - Run the go command with the Zig compiler environment
//! - [`upx`] - Compress the produced binary with upx

pub mod go;
pub mod upx;
