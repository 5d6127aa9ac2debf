//! xml-harness - acceptance tests for an XML-validating editor
//!
//! Discovers XML fixtures from a folder convention, opens each one in the
//! editor and checks the reported number of validation errors.

use clap::Parser;
use xml_harness::{cli, commands::Commands, common::logging};

#[derive(Parser)]
#[command(name = "xml-harness", about = "Validate XML fixtures against an XML editor")]
#[command(version, long_about = None)]
struct Cli {
    /// Debug-level logging for this crate (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    match cli::dispatch(cli.command).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
