//! Sequential image-file renumbering
//!
//! Camera software writes zero-padded sequence numbers after a
//! digit-free prefix (`IMG0001.FIT`, `IMG0002.FIT`, ...). This module
//! strips the leading zeros, subtracts an offset from the sequence
//! number and copies each match into a destination directory under the
//! lowercased new name.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

/// A filename split into `<prefix><number>.<ext>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqName {
    pub prefix: String,
    pub number: i64,
    pub ext: String,
}

/// Split a name of the form `<non-digit prefix><digits>.<ext>`.
/// Anything after the extension is ignored, as is a name with no
/// digits or no extension.
pub fn parse_seq_name(name: &str) -> Option<SeqName> {
    let digit_start = name.find(|c: char| c.is_ascii_digit())?;
    if digit_start == 0 {
        return None;
    }
    let rest = &name[digit_start..];
    let digit_len = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let after = rest[digit_len..].strip_prefix('.')?;
    let ext_len = after
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(after.len());
    if ext_len == 0 {
        return None;
    }
    Some(SeqName {
        prefix: name[..digit_start].to_string(),
        number: rest[..digit_len].parse().ok()?,
        ext: after[..ext_len].to_string(),
    })
}

/// New (lowercased) name with the offset subtracted and leading zeros
/// dropped, or None when the name does not match the pattern.
pub fn renumbered(name: &str, offset: i64) -> Option<String> {
    let seq = parse_seq_name(name)?;
    Some(format!("{}{}.{}", seq.prefix, seq.number - offset, seq.ext).to_lowercase())
}

/// Copy every matching file in `dir` into `dest` under its renumbered
/// name. `dest` is created fresh; a stale empty one is removed first.
/// Returns the (old name, new path) pairs in name order.
pub fn copy_renumbered(
    dir: &Path,
    dest: &Path,
    offset: i64,
) -> anyhow::Result<Vec<(String, PathBuf)>> {
    if dest.exists() {
        fs::remove_dir(dest)
            .with_context(|| format!("cannot remove existing {}", dest.display()))?;
    }
    fs::create_dir(dest).with_context(|| format!("cannot create {}", dest.display()))?;

    let mut names = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("cannot read {}", dir.display()))? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();

    let mut copied = Vec::new();
    for name in names {
        let Some(new_name) = renumbered(&name, offset) else {
            debug!("{}: no sequence number, skipped", name);
            continue;
        };
        let new_path = dest.join(new_name);
        fs::copy(dir.join(&name), &new_path)
            .with_context(|| format!("cannot copy {} to {}", name, new_path.display()))?;
        copied.push((name, new_path));
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seq_name() {
        assert_eq!(
            parse_seq_name("IMG0001.fit"),
            Some(SeqName {
                prefix: "IMG".to_string(),
                number: 1,
                ext: "fit".to_string(),
            })
        );
        // Digits in the prefix are read as the sequence number, so
        // object names like this do not match.
        assert_eq!(parse_seq_name("M31-0001.fit"), None, "digits end the prefix");
        assert_eq!(parse_seq_name("0001.fit"), None, "prefix required");
        assert_eq!(parse_seq_name("flat.fit"), None, "digits required");
        assert_eq!(parse_seq_name("IMG0042"), None, "extension required");
    }

    #[test]
    fn test_parse_seq_name_takes_first_digit_run() {
        // The sequence number is the first digit run, even when more
        // digits follow in what looks like the extension.
        let seq = parse_seq_name("m31.lum001.fits").unwrap();
        assert_eq!(seq.prefix, "m");
        assert_eq!(seq.number, 31);
        assert_eq!(seq.ext, "lum001");
    }

    #[test]
    fn test_renumbered() {
        assert_eq!(renumbered("IMG0042.FIT", 0), Some("img42.fit".to_string()));
        assert_eq!(renumbered("IMG0042.FIT", 10), Some("img32.fit".to_string()));
        assert_eq!(renumbered("IMG0002.FIT", 10), Some("img-8.fit".to_string()));
        assert_eq!(renumbered("notes.txt", 0), None);
    }

    #[test]
    fn test_copy_renumbered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("IMG0011.FIT"), b"a").unwrap();
        std::fs::write(dir.path().join("IMG0012.FIT"), b"b").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"c").unwrap();

        let dest = dir.path().join("temp");
        let copied = copy_renumbered(dir.path(), &dest, 10).unwrap();

        assert_eq!(copied.len(), 2);
        assert_eq!(copied[0].0, "IMG0011.FIT");
        assert_eq!(
            std::fs::read(dest.join("img1.fit")).unwrap(),
            b"a",
            "contents copied under the renumbered name"
        );
        assert!(dest.join("img2.fit").exists());
        assert!(!dest.join("readme.txt").exists());
    }

    #[test]
    fn test_copy_renumbered_replaces_stale_empty_dest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("IMG0001.FIT"), b"a").unwrap();
        let dest = dir.path().join("temp");
        std::fs::create_dir(&dest).unwrap();

        let copied = copy_renumbered(dir.path(), &dest, 0).unwrap();
        assert_eq!(copied.len(), 1);
    }
}
