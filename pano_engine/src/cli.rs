use std::path::PathBuf;

use clap::Parser;
use pano_graph::Direction;

#[derive(Parser, Debug)]
#[command(
    about = "Headless walkthrough of a panorama location graph",
    version
)]
pub struct Args {
    /// Location graph JSON (location name -> asset and neighbours)
    #[arg(long, default_value = "assets/campus.json")]
    pub graph: PathBuf,

    /// Directory asset references resolve against (default: the graph's directory)
    #[arg(long)]
    pub asset_root: Option<PathBuf>,

    /// Location to start at instead of the first one declared
    #[arg(long)]
    pub start: Option<String>,

    /// Directions to walk after arriving, e.g. `front,left,behind`
    #[arg(long, value_delimiter = ',')]
    pub walk: Vec<Direction>,

    /// Optional settings preset JSON (fade timings, exposure, hit tolerance)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Swap environments instantly instead of fading
    #[arg(long)]
    pub no_transitions: bool,

    /// Path to write the navigation event log as JSON
    #[arg(long)]
    pub event_log_json: Option<PathBuf>,

    /// Give up on a step after this many milliseconds
    #[arg(long, default_value_t = 30_000)]
    pub step_timeout_ms: u64,

    /// Only validate the graph (and report dangling edges), then exit
    #[arg(long)]
    pub check: bool,
}
