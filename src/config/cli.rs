//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! concarne validate pattern.yaml
//! concarne info pattern.yaml
//! concarne -v info pattern.yaml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Concarne: contextual patterns for side-information learning
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "concarne")]
#[command(version)]
#[command(about = "Inspect and validate contextual pattern configurations")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Validate a configuration file and build its pattern
    Validate(ConfigArgs),

    /// Display roles, parameters and variables of a configured pattern
    Info(ConfigArgs),
}

/// Arguments shared by commands that read a configuration file
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct ConfigArgs {
    /// Path to YAML configuration file
    #[arg(value_name = "CONFIG")]
    pub config: PathBuf,
}

/// Parse CLI arguments from an iterator (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_validate_command() {
        let cli = parse_args(["concarne", "validate", "pattern.yaml"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Validate(ConfigArgs {
                config: PathBuf::from("pattern.yaml")
            })
        );
        assert!(!cli.verbose);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_parse_info_with_global_flags() {
        let cli = parse_args(["concarne", "info", "pattern.yaml", "--verbose"]).unwrap();
        assert!(matches!(cli.command, Command::Info(_)));
        assert!(cli.verbose);

        let cli = parse_args(["concarne", "-q", "info", "pattern.yaml"]).unwrap();
        assert!(cli.quiet);
    }

    #[test]
    fn test_missing_config_argument() {
        assert!(parse_args(["concarne", "validate"]).is_err());
        assert!(parse_args(["concarne", "train", "pattern.yaml"]).is_err());
    }
}
