//! CLI argument parsing for hl7-profile

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hl7-profile")]
#[command(version)]
#[command(
    about = "Profile a corpus of HL7 v2 messages into a combined field and structure profile",
    long_about = None
)]
pub struct Cli {
    /// Directory searched recursively for message files
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output JSON file (parent directories are created)
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Decoder worker threads (default: min(cores, files, 8))
    #[arg(short = 'w', long = "workers", value_name = "N")]
    pub workers: Option<usize>,

    /// File extension to collect, without the dot
    #[arg(short = 'x', long = "extension", value_name = "EXT")]
    pub extension: Option<String>,

    /// TOML vocabulary replacing the embedded HL7 v2.5 subset
    #[arg(long = "vocabulary", value_name = "PATH", conflicts_with = "schema_dir")]
    pub vocabulary: Option<PathBuf>,

    /// Directory holding hl7_segments.json, hl7_fields.json and hl7_datatypes.json
    #[arg(long = "schema-dir", value_name = "DIR")]
    pub schema_dir: Option<PathBuf>,

    /// TOML profile configuration
    #[arg(short = 'c', long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Distinct values tracked per field before it overflows
    #[arg(long = "max-unique", value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_unique: Option<u64>,

    /// Write indented JSON (default)
    #[arg(long = "pretty", overrides_with = "compact")]
    pub pretty: bool,

    /// Write single-line JSON
    #[arg(long = "compact", overrides_with = "pretty")]
    pub compact: bool,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// True unless `--compact` was the last output style given
    pub fn pretty_output(&self) -> bool {
        !self.compact
    }
}
