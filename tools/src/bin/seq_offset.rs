//! seq-offset: renumber sequentially-named image files.
//!
//! Strips leading zeros from the sequence number in each matching file
//! name in the current directory, subtracts an optional offset, and
//! copies the file into a scratch directory under the lowercased new
//! name.

use std::path::{Path, PathBuf};

use clap::Parser;

use astrokit_tools::seq;

#[derive(Parser, Debug)]
#[command(
    name = "seq-offset",
    version,
    about = "Copy sequentially-numbered files with an offset applied"
)]
struct Cli {
    /// Value subtracted from each file's sequence number
    #[arg(default_value_t = 0, allow_negative_numbers = true)]
    offset: i64,

    /// Destination directory for the renumbered copies
    #[arg(long, default_value = "temp")]
    dest: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let copied = seq::copy_renumbered(Path::new("."), &cli.dest, cli.offset)?;
    for (from, to) in &copied {
        println!("{} => {}", from, to.display());
    }
    Ok(())
}
