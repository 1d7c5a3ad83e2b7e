//! radec2deg: print decimal-degree coordinates in sexagesimal form.

use clap::Parser;

use astrokit_tools::coords::{deg_to_dms, deg_to_hms};

#[derive(Parser, Debug)]
#[command(
    name = "radec2deg",
    version,
    about = "Convert RA and Dec in degrees to sexagesimal notation"
)]
struct Cli {
    /// Right ascension in decimal degrees
    #[arg(allow_negative_numbers = true)]
    ra: f64,

    /// Declination in decimal degrees
    #[arg(allow_negative_numbers = true)]
    dec: f64,
}

fn main() {
    let cli = Cli::parse();
    println!("{} {}", deg_to_hms(cli.ra), deg_to_dms(cli.dec));
}
