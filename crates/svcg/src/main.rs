//! svcg - Entry Point
//!
//! Binary entry point for the service graph diagnostics. Lives in the `svcg`
//! facade crate next to the library so the link-time service entries of the
//! library are part of the binary.

use std::process::ExitCode;

use clap::Parser;
use svcg::cli::{Cli, run};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    run(cli).await
}
