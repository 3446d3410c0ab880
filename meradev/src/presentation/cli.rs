use clap::{Args, Parser, Subcommand};
use mera_core::Family;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "meradev: RAMSES snapshot diagnostics", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Simulation directory and snapshot number.
#[derive(Args, Clone)]
pub struct SnapshotArgs {
    /// Directory holding output_NNNNN folders
    pub base: PathBuf,
    /// Snapshot number
    pub output: u32,
}

/// Subset of a snapshot to load.
#[derive(Args, Clone)]
pub struct LoadArgs {
    /// hydro, gravity, particles or clumps
    #[arg(long, default_value = "hydro")]
    pub kind: String,
    /// Variables to load (repeatable); all when omitted
    #[arg(long = "var")]
    pub vars: Vec<String>,
    #[arg(long)]
    pub lmin: Option<u8>,
    #[arg(long)]
    pub lmax: Option<u8>,
    /// Worker threads; rayon default when omitted
    #[arg(long)]
    pub threads: Option<usize>,
    /// Particle family to keep, by name or id (repeatable)
    #[arg(long = "family")]
    pub families: Vec<Family>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print snapshot metadata and component presence
    Info {
        #[command(flatten)]
        snap: SnapshotArgs,
        /// Also list every unit scale
        #[arg(long)]
        scales: bool,
    },

    /// List output directories under a simulation directory
    Outputs { base: PathBuf },

    /// Load a component and save it as a dataset archive
    Pack {
        #[command(flatten)]
        snap: SnapshotArgs,
        #[command(flatten)]
        load: LoadArgs,
        /// Archive to write
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        deterministic: bool,
        #[arg(long, default_value_t = 0.05)]
        min_gain: f32,
    },

    /// Print an archive's manifest and column layout
    Inspect { archive: PathBuf },

    /// Verify archive checksums
    Verify { archive: PathBuf },

    /// Project variables and print map totals
    Project {
        #[command(flatten)]
        snap: SnapshotArgs,
        #[command(flatten)]
        load: LoadArgs,
        /// Variables to project (repeatable)
        #[arg(long = "map", required = true)]
        maps: Vec<String>,
        /// Units, one per --map
        #[arg(long = "unit")]
        units: Vec<String>,
        #[arg(long, default_value_t = 256)]
        pixels: usize,
        #[arg(long, default_value = "z")]
        direction: String,
        /// sum, mean, max, weighted:mass or weighted:volume
        #[arg(long, default_value = "sum")]
        mode: String,
    },
}
