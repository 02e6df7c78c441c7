//! Command-line argument parsing for the chunk cache tooling.

use std::path::PathBuf;

use clap::Parser;

use crate::{CompressionAlgorithm, Config};

/// Nebula chunk cache command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "nebula-server", about = "Nebula chunk packet cache inspector")]
pub struct CliArgs {
    /// Client protocol version to encode for.
    #[arg(long)]
    pub protocol: Option<u32>,

    /// Minimum protocol that carries the compression algorithm byte.
    #[arg(long)]
    pub compression_prefix_min: Option<u32>,

    /// Compression algorithm (lz4, none).
    #[arg(long)]
    pub compression: Option<CompressionAlgorithm>,

    /// Number of synthetic sub-chunks to build.
    #[arg(long, default_value_t = 16)]
    pub sub_chunks: usize,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(protocol) = args.protocol {
            self.protocol.default_protocol = protocol;
        }
        if let Some(min) = args.compression_prefix_min {
            self.protocol.compression_prefix_min = min;
        }
        if let Some(algorithm) = args.compression {
            self.compression.algorithm = algorithm;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
