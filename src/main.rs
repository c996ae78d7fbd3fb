// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Command-line entry point for the motion overlay renderer.

use std::process;

use clap::Parser;

use motion_overlay::cli::args::{Cli, Commands};
use motion_overlay::cli::run::run_overlay;

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            if let Err(e) = run_overlay(&args) {
                motion_overlay::error!("{e}");
                process::exit(1);
            }
        }
    }
}
