//! Sexagesimal coordinate parsing and formatting
//!
//! Parsing keeps the input tokens verbatim (no re-padding, fractions
//! as given) so the stored header value reproduces what the observer
//! typed; formatting from decimal degrees zero-pads in the usual
//! `HH:MM:SS.ssss` convention.

/// Whether the leading field may carry an explicit `+`/`-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Forbidden,
    Allowed,
}

/// Parse `H:M:S[.f]` (or the space-separated equivalent, optional
/// surrounding whitespace) and return the `"H M S.f"` form used for
/// the RA/DEC header keywords. Tokens are preserved verbatim.
pub fn parse_sexagesimal(input: &str, sign: Sign) -> Option<String> {
    let trimmed = input.trim();
    let tokens: Vec<&str> = if trimmed.contains(':') {
        trimmed.split(':').collect()
    } else {
        trimmed.split_whitespace().collect()
    };
    if tokens.len() != 3 {
        return None;
    }

    let lead_digits = match sign {
        Sign::Allowed => tokens[0].strip_prefix(['+', '-']).unwrap_or(tokens[0]),
        Sign::Forbidden => tokens[0],
    };
    if !is_digits(lead_digits) || !is_digits(tokens[1]) || !is_seconds(tokens[2]) {
        return None;
    }

    Some(format!("{} {} {}", tokens[0], tokens[1], tokens[2]))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_seconds(s: &str) -> bool {
    match s.split_once('.') {
        Some((whole, frac)) => is_digits(whole) && is_digits(frac),
        None => is_digits(s),
    }
}

/// Right ascension in decimal degrees to `HH:MM:SS.ssss` (of hour
/// angle). Input is wrapped into [0, 360).
pub fn deg_to_hms(ra_deg: f64) -> String {
    let (h, m, s) = split_sexagesimal(ra_deg.rem_euclid(360.0) / 15.0);
    format!("{:02}:{:02}:{:07.4}", h % 24, m, s)
}

/// Declination in decimal degrees to `+DD:MM:SS.ssss` with an explicit
/// sign.
pub fn deg_to_dms(dec_deg: f64) -> String {
    let sign = if dec_deg.is_sign_negative() { '-' } else { '+' };
    let (d, m, s) = split_sexagesimal(dec_deg.abs());
    format!("{}{:02}:{:02}:{:07.4}", sign, d, m, s)
}

/// Split a non-negative value into whole units, minutes and seconds.
/// Rounding to the printed precision happens before the split so a
/// carried 60.0000 seconds rolls into the minute field.
fn split_sexagesimal(value: f64) -> (i64, i64, f64) {
    let tenths = (value * 3600.0 * 10_000.0).round() as i64;
    let units = tenths / 36_000_000;
    let rem = tenths % 36_000_000;
    let minutes = rem / 600_000;
    let seconds = (rem % 600_000) as f64 / 10_000.0;
    (units, minutes, seconds)
}
