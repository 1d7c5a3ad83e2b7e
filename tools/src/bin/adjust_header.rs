//! adjust-header: batch editor for FITS primary-header keywords.
//!
//! Corrects observation times with a timezone offset (writing
//! DATE-OBS, MIDPOINT and JD), folds a legacy UT-START card into an
//! ISO 8601 DATE-OBS, and sets RA, Dec, filter, airmass, object name
//! and calibration status.

use std::path::PathBuf;

use clap::Parser;

use astrokit_tools::adjust::{adjust_batch, Options};

#[derive(Parser, Debug)]
#[command(
    name = "adjust-header",
    version,
    about = "Adjust FITS header keywords in place",
    arg_required_else_help = true
)]
struct Cli {
    /// Airmass value
    #[arg(short, long)]
    airmass: Option<String>,

    /// Calibration status; one or more of B, D, F in canonical order
    /// (B = bias, D = dark subtracted, F = flat fielded), e.g. B, BD or BDF
    #[arg(short, long)]
    calstat: Option<String>,

    /// Set legacy-style DATE-OBS (DD/MM/YYYY) from YYYY-MM-DD before
    /// other processing
    #[arg(short = 'i', long)]
    legacy_date: Option<String>,

    /// Declination (D:M:S.n or D M S.n)
    #[arg(short, long, allow_hyphen_values = true)]
    dec: Option<String>,

    /// Exposure time in seconds
    #[arg(short, long, default_value_t = 0.0)]
    exptime: f64,

    /// Photometric filter
    #[arg(short, long)]
    filter: Option<String>,

    /// Use mid-point time (if set) for DATE-OBS
    #[arg(short = 'm', long)]
    use_midpoint_for_dateobs: bool,

    /// Adjust time according to the other time options
    #[arg(short = 'j', long)]
    adjust_time: bool,

    /// Object name
    #[arg(short, long)]
    object: Option<String>,

    /// Right ascension (H:M:S.n or H M S.n)
    #[arg(short, long)]
    ra: Option<String>,

    /// Time zone offset to add to the time, in hours
    #[arg(short, long, default_value_t = 0.0, allow_negative_numbers = true)]
    tzoffset: f64,

    /// Log the before/after value of every field touched
    #[arg(short, long)]
    verbose: bool,

    /// Exit non-zero when any diagnostic was emitted (for CI-style use;
    /// the default always exits 0 so batches never fail part-way)
    #[arg(long)]
    strict: bool,

    /// FITS files to edit in place
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging();

    let options = Options {
        airmass: cli.airmass,
        calstat: cli.calstat,
        legacy_date: cli.legacy_date,
        dec: cli.dec,
        exptime: cli.exptime,
        filter: cli.filter,
        use_midpoint_for_dateobs: cli.use_midpoint_for_dateobs,
        adjust_time: cli.adjust_time,
        object: cli.object,
        ra: cli.ra,
        tz_offset: cli.tzoffset,
        verbose: cli.verbose,
    };

    let diagnostics = adjust_batch(&cli.files, &options);
    if cli.strict && diagnostics > 0 {
        anyhow::bail!("{} diagnostic(s) emitted", diagnostics);
    }
    Ok(())
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}
