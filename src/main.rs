//! Concarne CLI
//!
//! Inspects pattern configuration files.
//!
//! # Usage
//!
//! ```bash
//! # Validate config and build its pattern
//! concarne validate pattern.yaml
//!
//! # Show roles, parameters and training inputs
//! concarne info pattern.yaml
//!
//! # Include tagging and loss construction logs
//! concarne -v info pattern.yaml
//! ```

use clap::Parser;
use concarne::config::{build_pattern, load_config, BuiltPattern, Cli, Command, ConfigArgs};
use concarne::pattern::Role;
use concarne::TagFilter;
use std::process::ExitCode;
use tracing::Level;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let max_level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Validate(args) => run_validate(args, cli.quiet),
        Command::Info(args) => run_info(args, cli.quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_and_build(args: &ConfigArgs) -> Result<BuiltPattern, String> {
    let spec = load_config(&args.config).map_err(|e| format!("Config error: {e}"))?;
    build_pattern(&spec).map_err(|e| format!("Build error: {e}"))
}

fn run_validate(args: ConfigArgs, quiet: bool) -> Result<(), String> {
    let built = load_and_build(&args)?;
    built.training_loss().map_err(|e| format!("Loss error: {e}"))?;

    if !quiet {
        println!("✓ Configuration is valid: {}", args.config.display());
    }
    Ok(())
}

fn run_info(args: ConfigArgs, quiet: bool) -> Result<(), String> {
    let built = load_and_build(&args)?;
    if quiet {
        return Ok(());
    }
    let pattern = &built.pattern;

    println!("Pattern: {}", pattern.name().unwrap_or("(unnamed)"));
    println!("Kind: {}", pattern.kind().name());
    println!();

    println!("Roles:");
    for role in Role::ALL {
        let params = pattern.get_params(&TagFilter::new().require(role.as_str()));
        let count: usize = params.iter().map(|p| p.len()).sum();
        println!("  {role}: {} tensors, {count} values", params.len());
    }
    println!();

    let output_shape = pattern
        .output_shape()
        .map_err(|e| format!("Shape error: {e}"))?;
    println!("Output shape: {output_shape:?}");
    println!(
        "Loss weights: target={}, context={}",
        built.weights.target_weight, built.weights.context_weight
    );

    println!("Training inputs:");
    for var in pattern.training_input_vars().into_iter().flatten() {
        println!("  {} {:?}", var.name(), var.shape());
    }

    Ok(())
}
