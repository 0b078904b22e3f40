//! dscctl - usage-control tooling for the dataspace connector
//!
//! Offline counterparts of what the connector does on every data request:
//! - compile a classified rule into its temporal formula
//! - verify a rule against a Petri net or application route
//! - render nets as GraphViz
//! - replay access scenarios through the access gate

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod files;
mod output;

use commands::{compile, dot, simulate, verify};
use crate::config::CliConfig;
use dsc_verifier::VerificationResult;

/// dscctl CLI
#[derive(Parser)]
#[command(name = "dscctl")]
#[command(about = "Usage-control policy compiler, verifier and gate simulator", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "DSC_CONFIG", global = true)]
    config: Option<String>,

    /// Log level
    #[arg(long, env = "DSC_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "DSC_LOG_JSON", global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the formula a classified rule compiles to
    Compile(compile::CompileArgs),

    /// Check a rule against a net; exits with 1 on violation
    Verify(verify::VerifyArgs),

    /// Render a net or route as GraphViz DOT
    Dot(dot::DotArgs),

    /// Run access requests from a scenario file through the gate
    Simulate(simulate::SimulateArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cli.log_level.clone().into());

    if cli.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Compile(args) => {
            println!("{}", compile::run(&args)?);
        }
        Commands::Verify(args) => {
            let result = verify::run(&args, &config.gate)?;
            println!("{}", result);
            if let VerificationResult::Violated(_) = result {
                return Ok(ExitCode::from(1));
            }
        }
        Commands::Dot(args) => {
            print!("{}", dot::run(&args)?);
        }
        Commands::Simulate(args) => {
            let report = simulate::run(&args, &config.gate).await?;
            match output::render(&report, args.output)? {
                Some(rendered) => println!("{}", rendered),
                None => println!("{}", report.to_text()),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
