//! Command-line interface for scriba
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Offline and live speech-to-text transcription
#[derive(Parser, Debug)]
#[command(
    name = "scriba",
    version = crate::version_string(),
    about = "Offline and live speech-to-text transcription"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to the Whisper model file
    #[arg(long, global = true, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcribe recorded audio files
    Batch {
        /// Files to transcribe; defaults to every *.mp3 in the input directory
        #[arg(value_name = "FILE")]
        files: Vec<PathBuf>,

        /// Overwrite existing transcripts without asking
        #[arg(long)]
        overwrite: bool,
    },

    /// Transcribe live audio from a capture device
    Live {
        /// Capture device id (e.g. hw:1,0); defaults to interactive selection
        #[arg(long, value_name = "DEVICE")]
        device: Option<String>,
    },

    /// List available audio input devices
    Devices,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn version_flag_reports_build_version() {
        use clap::CommandFactory;
        let version = Cli::command()
            .get_version()
            .map(|v| v.to_string())
            .expect("version is set");
        assert!(
            version.starts_with(env!("CARGO_PKG_VERSION")),
            "--version should report the build version, got: {}",
            version
        );
    }

    #[test]
    fn batch_parses_files_and_overwrite() {
        let cli = Cli::parse_from(["scriba", "batch", "a.mp3", "b.mp3", "--overwrite"]);
        match cli.command {
            Commands::Batch { files, overwrite } => {
                assert_eq!(files.len(), 2);
                assert!(overwrite);
            }
            other => panic!("expected Batch, got {:?}", other),
        }
    }

    #[test]
    fn live_accepts_device_flag() {
        let cli = Cli::parse_from(["scriba", "live", "--device", "hw:1,0"]);
        match cli.command {
            Commands::Live { device } => assert_eq!(device.as_deref(), Some("hw:1,0")),
            other => panic!("expected Live, got {:?}", other),
        }
    }

    #[test]
    fn global_flags_apply_to_subcommands() {
        let cli = Cli::parse_from([
            "scriba",
            "devices",
            "--config",
            "/etc/scriba.toml",
            "-vv",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/scriba.toml")));
        assert_eq!(cli.verbose, 2);
    }
}
