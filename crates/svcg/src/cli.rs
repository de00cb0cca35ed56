//! Command line interface of the `svcg` binary
//!
//! | Command | Description |
//! |---------|-------------|
//! | `svcg graph` | Print every registered service, its state and dependencies |
//! | `svcg check` | Resolve every registered service and report failures |
//! | `svcg config` | Print the effective configuration as TOML |

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use svcg_domain::{Error, Result};
use svcg_infrastructure::config::{RuntimeConfig, to_toml};
use svcg_infrastructure::di::{Container, global};
use svcg_infrastructure::logging::{bootstrap_dispatch, init_logging};
use tracing::debug;
use tracing::instrument::WithSubscriber;

use crate::lifecycle::run_main;
use crate::services::{ConfigReader, ProgramArguments};

/// Command line interface for svcg
#[derive(Parser, Debug)]
#[command(name = "svcg")]
#[command(about = "Service graph runtime diagnostics")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the service catalog
    Graph,
    /// Resolve every registered service
    Check {
        /// Give up waiting on one service after this many milliseconds
        #[arg(long, default_value_t = 10_000)]
        timeout_ms: u64,
    },
    /// Print the effective configuration
    Config,
}

impl Cli {
    /// Arguments seeded into the container as "Program Arguments"
    pub fn program_arguments(&self) -> ProgramArguments {
        ProgramArguments {
            args: std::env::args().skip(1).collect(),
            config_path: self.config.clone(),
            verbose: self.verbose,
        }
    }
}

/// Bootstrap the process container and run the selected command
///
/// Bootstrap events go to a scoped stderr subscriber; the configured one is
/// installed once the configuration is loaded.
pub async fn run(cli: Cli) -> ExitCode {
    let bootstrapped = async {
        let container = global()?.clone();
        let config = bootstrap(&container, cli.program_arguments()).await?;
        Ok::<_, Error>((container, config))
    }
    .with_subscriber(bootstrap_dispatch(cli.verbose))
    .await;

    let (container, config) = match bootstrapped {
        Ok(bootstrapped) => bootstrapped,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("warning: {e}");
    }

    let command = cli.command;
    run_main(container, config.disposal.clone(), move |container| async move {
        execute(&container, command, &config).await
    })
    .await
}

/// Seed the program arguments and load the configuration through the container
pub async fn bootstrap(container: &Container, arguments: ProgramArguments) -> Result<RuntimeConfig> {
    arguments.provide(container)?;
    let token = container.token::<ConfigReader>()?;
    let reader = container.get(&token).await?;
    reader.config().cloned()
}

/// Run one command against a bootstrapped container
pub async fn execute(container: &Container, command: Command, config: &RuntimeConfig) -> Result<()> {
    debug!(?command, "executing");
    match command {
        Command::Graph => {
            print!("{}", container.catalog());
            Ok(())
        }
        Command::Check { timeout_ms } => check(container, Duration::from_millis(timeout_ms)).await,
        Command::Config => {
            print!("{}", to_toml(config)?);
            Ok(())
        }
    }
}

/// Resolve every registered service, printing one line per service
///
/// Fails with the first failure once every service was tried.
pub async fn check(container: &Container, timeout: Duration) -> Result<()> {
    let labels: Vec<String> = container
        .catalog()
        .labels()
        .map(str::to_string)
        .collect();

    let mut failures = Vec::new();
    for label in &labels {
        match tokio::time::timeout(timeout, container.ensure(label)).await {
            Ok(Ok(())) => println!("ok      \"{label}\""),
            Ok(Err(e)) => {
                println!("failed  \"{label}\": {e}");
                failures.push(e);
            }
            Err(_) => println!("pending \"{label}\": no completion after {}ms", timeout.as_millis()),
        }
    }

    println!(
        "{} service(s) checked, {} failed",
        labels.len(),
        failures.len()
    );
    match failures.into_iter().next() {
        Some(first) => Err(first),
        None => Ok(()),
    }
}
