//! spaceprop - satellite trajectory propagation from the command line
//!
//! Reads a JSON scenario (epoch, seed state, model settings) and either
//! samples the trajectory at a fixed cadence or resolves revolution passes.

mod scenario;

use anyhow::Result;
use clap::{Parser, Subcommand};

use scenario::{PassesArgs, PropagateArgs};

#[derive(Parser, Debug)]
#[command(name = "spaceprop", version, about = "Numerical satellite trajectory propagation")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sample the trajectory at a fixed cadence
    Propagate(PropagateArgs),
    /// List revolution passes starting at the epoch revolution
    Passes(PassesArgs),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    log::debug!("{:?}", cli);

    match cli.command {
        Command::Propagate(args) => scenario::run_propagate(args),
        Command::Passes(args) => scenario::run_passes(args),
    }
}
