pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use mera_core::error::Result;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Info { snap, scales } => handlers::handle_info(snap, scales),
        Commands::Outputs { base } => handlers::handle_outputs(base),
        Commands::Pack {
            snap,
            load,
            out,
            deterministic,
            min_gain,
        } => handlers::handle_pack(snap, load, out, deterministic, min_gain),
        Commands::Inspect { archive } => handlers::handle_inspect(&archive),
        Commands::Verify { archive } => handlers::handle_verify(&archive),
        Commands::Project {
            snap,
            load,
            maps,
            units,
            pixels,
            direction,
            mode,
        } => handlers::handle_project(snap, load, maps, units, pixels, direction, mode),
    }
}
