use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Windowed panorama walkthrough: click the cones to move between locations",
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

    /// Optional settings preset JSON (fade timings, exposure, hit tolerance)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Swap environments instantly instead of fading
    #[arg(long)]
    pub no_transitions: bool,

    /// Initial window width in physical pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Initial window height in physical pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,
}
