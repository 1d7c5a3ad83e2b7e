//! FITS header adjustment pipeline
//!
//! Applies a fixed ordered sequence of independent field edits to the
//! primary header of each file: legacy date normalization, time
//! adjustment (DATE-OBS/MIDPOINT/JD), then object, filter, airmass,
//! calibration status, RA and Dec. Each step is a no-op when its
//! option is absent.
//!
//! Nothing here is fatal to a batch: unreadable files are reported and
//! skipped, a missing header field aborts the remaining edits of that
//! one file (mutations so far are still flushed), and validation
//! failures leave only the offending field unmodified.

use std::path::{Path, PathBuf};

use astrokit_imaging::fits::{FitsError, FitsFile, FitsHeader};
use tracing::{info, warn};

use crate::coords::{self, Sign};
use crate::timeutil;

/// The accepted calibration status codes: Bias/Dark/Flat combinations
/// in canonical letter order.
pub const CALSTAT_CODES: [&str; 5] = ["B", "BD", "BF", "DF", "BDF"];

/// Immutable per-invocation option snapshot.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub airmass: Option<String>,
    pub calstat: Option<String>,
    pub legacy_date: Option<String>,
    pub dec: Option<String>,
    pub exptime: f64,
    pub filter: Option<String>,
    pub use_midpoint_for_dateobs: bool,
    pub adjust_time: bool,
    pub object: Option<String>,
    pub ra: Option<String>,
    pub tz_offset: f64,
    pub verbose: bool,
}

/// Per-file result: how many diagnostics the edit sequence emitted.
#[derive(Debug, Clone, Copy)]
pub struct AdjustOutcome {
    pub diagnostics: usize,
}

/// Process every file in order. A file that cannot be opened is
/// reported and skipped; the batch always runs to completion. Returns
/// the total diagnostic count (feeds the CLI's `--strict` mode).
pub fn adjust_batch(paths: &[PathBuf], options: &Options) -> usize {
    let mut diagnostics = 0;
    for path in paths {
        match adjust_file(path, options) {
            Ok(outcome) => diagnostics += outcome.diagnostics,
            Err(e) => {
                warn!("** {}: {}", path.display(), e);
                diagnostics += 1;
            }
        }
    }
    diagnostics
}

/// Open one file, apply the edit sequence, flush and close.
///
/// Returns `Err` only when the file itself cannot be opened or written;
/// everything that goes wrong inside the edit sequence is a diagnostic
/// and whatever mutations succeeded are still flushed.
pub fn adjust_file(path: &Path, options: &Options) -> Result<AdjustOutcome, FitsError> {
    let mut fits = FitsFile::open(path)?;

    let diagnostics = {
        let mut editor = Editor {
            header: fits.header_mut(),
            options,
            path,
            diagnostics: 0,
        };
        if let Err(e) = editor.run() {
            warn!("** {}: {}", path.display(), e);
            editor.diagnostics += 1;
        }
        editor.diagnostics
    };

    fits.flush()?;
    Ok(AdjustOutcome { diagnostics })
}

/// One file's edit sequence. Only the editor mutates the header; each
/// step reads its own option and leaves the rest alone.
struct Editor<'a> {
    header: &'a mut FitsHeader,
    options: &'a Options,
    path: &'a Path,
    diagnostics: usize,
}

impl Editor<'_> {
    fn run(&mut self) -> Result<(), FitsError> {
        self.set_legacy_dateobs();
        self.set_times()?;
        self.set_object();
        self.set_filter();
        self.set_airmass();
        self.set_calstat();
        self.set_ra();
        self.set_dec();
        Ok(())
    }

    fn diag(&mut self, message: String) {
        warn!("{}", message);
        self.diagnostics += 1;
    }

    /// Step 1: rewrite DATE-OBS to the legacy DD/MM/YYYY convention
    /// from a YYYY-MM-DD option value, before any time adjustment.
    fn set_legacy_dateobs(&mut self) {
        let Some(raw) = &self.options.legacy_date else {
            return;
        };
        match parse_legacy_date(raw) {
            Some((year, month, day)) => {
                let previous = self.header.get("DATE-OBS").map(|v| v.to_string());
                let value = format!("{:02}/{:02}/{:04}", day, month, year);
                self.header.set_string("DATE-OBS", &value);
                if self.options.verbose {
                    info!(
                        "{}: DATE-OBS {} -> {}",
                        self.path.display(),
                        previous.as_deref().unwrap_or("<absent>"),
                        value
                    );
                }
            }
            None => self.diag(format!("format of {} not YYYY-MM-DD", raw)),
        }
    }

    /// Step 2: adjust the observation time, writing DATE-OBS, MIDPOINT
    /// and JD. Skipped entirely (with a diagnostic) when no usable
    /// source timestamp exists.
    fn set_times(&mut self) -> Result<(), FitsError> {
        if !self.options.adjust_time {
            return Ok(());
        }

        let Some(full_dateobs) = self.extract_full_dateobs()? else {
            return Ok(());
        };
        let Some(initial) = timeutil::parse_isot(&full_dateobs) else {
            self.diag(format!(
                "{}: DATE-OBS '{}' is not an ISO 8601 date-time",
                self.path.display(),
                full_dateobs
            ));
            return Ok(());
        };
        if self.options.verbose {
            info!(
                "{}: {} [start]",
                self.path.display(),
                timeutil::format_isot(initial)
            );
        }

        let adjusted = timeutil::add_hours(initial, self.options.tz_offset);

        let mut exp_time = self.options.exptime;
        if exp_time == 0.0 {
            if let Some(value) = self.header.get("EXPTIME") {
                exp_time = value.as_f64().unwrap_or(0.0);
            }
        }
        let midpoint = timeutil::add_seconds(adjusted, exp_time / 2.0);

        let new_dateobs = if self.options.use_midpoint_for_dateobs {
            info!("{}: using midpoint for DATE-OBS", self.path.display());
            timeutil::format_isot(midpoint)
        } else {
            timeutil::format_isot(adjusted)
        };
        self.header.set_string("DATE-OBS", &new_dateobs);
        if self.options.verbose {
            info!("{}: {} [adjusted]", self.path.display(), new_dateobs);
        }

        let midpoint_str = timeutil::format_isot(midpoint);
        self.header.set_string("MIDPOINT", &midpoint_str);
        if self.options.verbose {
            info!("{}: {} [midpoint]", self.path.display(), midpoint_str);
        }

        let jd = timeutil::julian_date(midpoint);
        self.header.set_f64("JD", jd);
        if self.options.verbose {
            info!("{}: {} [JD]", self.path.display(), jd);
        }

        Ok(())
    }

    /// Extract the full observation timestamp as an ISO 8601 string.
    ///
    /// When a legacy UT-START card and a DD/MM/YYYY DATE-OBS are both
    /// present they are folded together and UT-START is deleted (its
    /// information now lives in DATE-OBS). An already-ISO DATE-OBS is
    /// used as-is.
    fn extract_full_dateobs(&mut self) -> Result<Option<String>, FitsError> {
        if self.header.contains("UT-START") && self.header.contains("DATE-OBS") {
            let ut_start = self.header.require("UT-START")?.to_string();
            let dateobs = self.header.require("DATE-OBS")?.to_string();
            let fields: Vec<&str> = dateobs.split('/').collect();
            if fields.len() == 3 {
                let (dd, mm, yyyy) = (fields[0], fields[1], fields[2]);
                let full = format!("{}-{}-{}T{}", yyyy, mm, dd, ut_start);
                self.header.remove("UT-START");
                Ok(Some(full))
            } else {
                self.diag(format!(
                    "{}: DATE-OBS format not DD/MM/YYYY",
                    self.path.display()
                ));
                Ok(None)
            }
        } else if self.header.contains("DATE-OBS") {
            Ok(Some(self.header.require("DATE-OBS")?.to_string()))
        } else {
            self.diag(format!(
                "{} does not contain DATE-OBS keyword",
                self.path.display()
            ));
            Ok(None)
        }
    }

    /// Step 3: object name, verbatim.
    fn set_object(&mut self) {
        let Some(object) = &self.options.object else {
            return;
        };
        let previous = self.header.get("OBJECT").map(|v| v.to_string());
        self.header.set_string("OBJECT", object);
        if self.options.verbose {
            info!(
                "{}: OBJECT {} -> {}",
                self.path.display(),
                previous.as_deref().unwrap_or("<absent>"),
                object
            );
        }
    }

    /// Step 4: photometric filter. Always overwrites, whether or not a
    /// value was already present.
    fn set_filter(&mut self) {
        let Some(filter) = &self.options.filter else {
            return;
        };
        let previous = self.header.get("FILTER").map(|v| v.to_string());
        self.header.set_string("FILTER", filter);
        if self.options.verbose {
            info!(
                "{}: FILTER {} -> {}",
                self.path.display(),
                previous.as_deref().unwrap_or("<absent>"),
                filter
            );
        }
    }

    /// Step 5: airmass, stored as given.
    fn set_airmass(&mut self) {
        let Some(airmass) = &self.options.airmass else {
            return;
        };
        let previous = self.header.get("AIRMASS").map(|v| v.to_string());
        self.header.set_string("AIRMASS", airmass);
        if self.options.verbose {
            info!(
                "{}: AIRMASS {} -> {}",
                self.path.display(),
                previous.as_deref().unwrap_or("<absent>"),
                airmass
            );
        }
    }

    /// Step 6: calibration status, restricted to the enumerated codes.
    fn set_calstat(&mut self) {
        let Some(calstat) = &self.options.calstat else {
            return;
        };
        if !CALSTAT_CODES.contains(&calstat.as_str()) {
            self.diag(format!(
                "{}: CALSTAT must be one of B, BD, BF, DF, BDF",
                self.path.display()
            ));
            return;
        }
        let previous = self.header.get("CALSTAT").map(|v| v.to_string());
        self.header.set_string("CALSTAT", calstat);
        if self.options.verbose {
            info!(
                "{}: CALSTAT {} -> {}",
                self.path.display(),
                previous.as_deref().unwrap_or("<absent>"),
                calstat
            );
        }
    }

    /// Step 7: right ascension, reformatted to space-separated H M S.
    fn set_ra(&mut self) {
        let Some(ra) = &self.options.ra else {
            return;
        };
        match coords::parse_sexagesimal(ra, Sign::Forbidden) {
            Some(formatted) => {
                self.header.set_string("RA", &formatted);
                if self.options.verbose {
                    info!("{}: RA set to {}", self.path.display(), formatted);
                }
            }
            None => self.diag(format!("{}: invalid RA '{}'", self.path.display(), ra)),
        }
    }

    /// Step 8: declination, as RA but with an optional leading sign.
    fn set_dec(&mut self) {
        let Some(dec) = &self.options.dec else {
            return;
        };
        match coords::parse_sexagesimal(dec, Sign::Allowed) {
            Some(formatted) => {
                self.header.set_string("DEC", &formatted);
                if self.options.verbose {
                    info!("{}: DEC set to {}", self.path.display(), formatted);
                }
            }
            None => self.diag(format!("{}: invalid DEC '{}'", self.path.display(), dec)),
        }
    }
}

/// Parse an optionally-whitespace-padded `YYYY-MM-DD` (month and day
/// may be 1 or 2 digits). Returns (year, month, day). Field ranges are
/// not validated; this mirrors what the legacy convention accepted.
pub fn parse_legacy_date(input: &str) -> Option<(u32, u32, u32)> {
    let trimmed = input.trim();
    let mut fields = trimmed.split('-');
    let year = fields.next()?;
    let month = fields.next()?;
    let day = fields.next()?;
    if fields.next().is_some() {
        return None;
    }
    if year.len() != 4 || !(1..=2).contains(&month.len()) || !(1..=2).contains(&day.len()) {
        return None;
    }
    if ![year, month, day]
        .iter()
        .all(|f| f.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }
    Some((year.parse().ok()?, month.parse().ok()?, day.parse().ok()?))
}
