//! Configuration for the Nebula chunk packet cache.
//!
//! Settings persist to disk as RON files and can be overridden from the
//! command line via clap. Protocol gates that decide the wire layout live here
//! so they can be changed per deployment without recompiling.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{CompressionAlgorithm, CompressionConfig, Config, DebugConfig, ProtocolConfig};
pub use error::ConfigError;
