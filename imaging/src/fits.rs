//! FITS primary-header reading and in-place updating
//!
//! Implements the header portion of the FITS standard (NASA/Science
//! Office of Standards and Technology):
//! - 2880-byte blocks
//! - 80-character keyword records, keyword in columns 1-8
//! - value indicator "= " in columns 9-10, strings quoted, numbers
//!   right-justified to column 30
//!
//! Only the primary header is modelled. The data region (and any
//! extensions) is opaque: cards that were read from disk and never
//! mutated are re-emitted byte-for-byte, and the data region is left
//! untouched unless the header outgrows its original block allocation.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Length of one header record in bytes.
pub const RECORD_LEN: usize = 80;

/// Length of one FITS block in bytes (36 records).
pub const BLOCK_LEN: usize = 2880;

/// Maximum keyword length in bytes.
pub const KEYWORD_LEN: usize = 8;

/// FITS header I/O errors
#[derive(Debug, Error)]
pub enum FitsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid FITS format: {0}")]
    InvalidFormat(String),
    #[error("missing required keyword: {0}")]
    MissingKeyword(String),
}

/// FITS value types
#[derive(Debug, Clone, PartialEq)]
pub enum FitsValue {
    String(String),
    Integer(i64),
    Float(f64),
    Logical(bool),
    /// Value-less card (`KEYWORD =` with nothing after the indicator).
    Undefined,
}

impl FitsValue {
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FitsValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FitsValue::Integer(i) => Some(*i),
            FitsValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FitsValue::Float(f) => Some(*f),
            FitsValue::Integer(i) => Some(*i as f64),
            // Headers written by some acquisition software carry
            // numbers as quoted strings; accept those too.
            FitsValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FitsValue::Logical(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for FitsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitsValue::String(s) => write!(f, "{}", s),
            FitsValue::Integer(i) => write!(f, "{}", i),
            FitsValue::Float(v) => write!(f, "{}", v),
            FitsValue::Logical(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            FitsValue::Undefined => Ok(()),
        }
    }
}

/// A single header card.
///
/// Cards parsed from disk keep their original 80-byte record; it is
/// dropped on the first mutation so that unrelated cards (comments,
/// history, oddly formatted values) survive a rewrite unchanged.
#[derive(Debug, Clone)]
pub struct Card {
    keyword: String,
    value: FitsValue,
    comment: Option<String>,
    raw: Option<[u8; RECORD_LEN]>,
    has_value: bool,
}

impl Card {
    fn new(keyword: &str, value: FitsValue) -> Self {
        Card {
            keyword: keyword.trim().to_ascii_uppercase(),
            value,
            comment: None,
            raw: None,
            has_value: true,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn value(&self) -> &FitsValue {
        &self.value
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

/// FITS header: an ordered list of cards with case-insensitive
/// keyword lookup.
#[derive(Debug, Clone, Default)]
pub struct FitsHeader {
    cards: Vec<Card>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, keyword: &str) -> Option<usize> {
        let keyword = keyword.trim();
        self.cards
            .iter()
            .position(|c| c.has_value && c.keyword.eq_ignore_ascii_case(keyword))
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.find(keyword).is_some()
    }

    pub fn get(&self, keyword: &str) -> Option<&FitsValue> {
        self.find(keyword).map(|i| &self.cards[i].value)
    }

    pub fn get_string(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(|v| v.as_string())
    }

    pub fn get_i64(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(|v| v.as_i64())
    }

    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(|v| v.as_f64())
    }

    /// Lookup that treats absence as an error.
    pub fn require(&self, keyword: &str) -> Result<&FitsValue, FitsError> {
        self.get(keyword)
            .ok_or_else(|| FitsError::MissingKeyword(keyword.to_ascii_uppercase()))
    }

    /// Overwrite an existing card in place (its comment is kept) or
    /// append a new one at the end of the header.
    pub fn set(&mut self, keyword: &str, value: FitsValue) {
        match self.find(keyword) {
            Some(i) => {
                let card = &mut self.cards[i];
                card.value = value;
                card.raw = None;
            }
            None => self.cards.push(Card::new(keyword, value)),
        }
    }

    pub fn set_string(&mut self, keyword: &str, value: &str) {
        self.set(keyword, FitsValue::String(value.to_string()));
    }

    pub fn set_i64(&mut self, keyword: &str, value: i64) {
        self.set(keyword, FitsValue::Integer(value));
    }

    pub fn set_f64(&mut self, keyword: &str, value: f64) {
        self.set(keyword, FitsValue::Float(value));
    }

    pub fn set_logical(&mut self, keyword: &str, value: bool) {
        self.set(keyword, FitsValue::Logical(value));
    }

    /// Remove a card, returning its value if it was present.
    pub fn remove(&mut self, keyword: &str) -> Option<FitsValue> {
        self.find(keyword).map(|i| self.cards.remove(i).value)
    }

    /// Number of cards, commentary cards included.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }
}

/// A FITS file opened for in-place header update.
///
/// The primary header is parsed eagerly; the data region stays on
/// disk. [`FitsFile::flush`] writes the (possibly edited) header back.
/// As long as the header still fits its original block allocation only
/// the header region is rewritten, so image data and extensions are
/// preserved byte-for-byte.
#[derive(Debug)]
pub struct FitsFile {
    file: File,
    path: PathBuf,
    header: FitsHeader,
    header_blocks: usize,
}

impl FitsFile {
    /// Open `path` for update and parse its primary header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FitsError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let (header, header_blocks) = {
            let mut reader = BufReader::new(&file);
            read_header(&mut reader)?
        };
        Ok(FitsFile {
            file,
            path,
            header,
            header_blocks,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &FitsHeader {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut FitsHeader {
        &mut self.header
    }

    /// Write the header back to disk.
    ///
    /// A header that shrank keeps its original block count (extra
    /// blank records) so the data offset never moves; one that grew
    /// shifts the data region by whole blocks.
    pub fn flush(&mut self) -> Result<(), FitsError> {
        let rendered = render_header(&self.header, self.header_blocks);
        let new_blocks = rendered.len() / BLOCK_LEN;

        if new_blocks > self.header_blocks {
            tracing::debug!(
                "{}: header grew from {} to {} blocks, shifting data region",
                self.path.display(),
                self.header_blocks,
                new_blocks
            );
            let mut data = Vec::new();
            self.file
                .seek(SeekFrom::Start((self.header_blocks * BLOCK_LEN) as u64))?;
            self.file.read_to_end(&mut data)?;
            self.file.seek(SeekFrom::Start(0))?;
            self.file.write_all(&rendered)?;
            self.file.write_all(&data)?;
            self.header_blocks = new_blocks;
        } else {
            self.file.seek(SeekFrom::Start(0))?;
            self.file.write_all(&rendered)?;
        }
        self.file.flush()?;
        Ok(())
    }
}

/// Read header records until END, returning the header and the number
/// of 2880-byte blocks it occupied.
pub(crate) fn read_header<R: Read>(reader: &mut R) -> Result<(FitsHeader, usize), FitsError> {
    let mut header = FitsHeader::new();
    let mut block = [0u8; BLOCK_LEN];
    let mut blocks = 0usize;

    'blocks: loop {
        reader.read_exact(&mut block).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                FitsError::InvalidFormat("END card not found before end of file".to_string())
            } else {
                FitsError::Io(e)
            }
        })?;
        blocks += 1;

        for record in block.chunks_exact(RECORD_LEN) {
            let record: &[u8; RECORD_LEN] = record.try_into().expect("chunk is 80 bytes");
            let keyword = keyword_of(record);

            if keyword == "END" {
                break 'blocks;
            }

            if blocks == 1 && header.is_empty() && keyword != "SIMPLE" {
                return Err(FitsError::InvalidFormat(format!(
                    "first keyword is {:?}, not SIMPLE",
                    keyword
                )));
            }

            header.cards.push(parse_card(record));
        }
    }

    Ok((header, blocks))
}

fn keyword_of(record: &[u8; RECORD_LEN]) -> &str {
    std::str::from_utf8(&record[..KEYWORD_LEN])
        .unwrap_or("")
        .trim_end()
}

/// Parse one 80-byte record into a card.
///
/// Structural checks stay on the raw bytes; headers in the wild carry
/// Latin-1 bytes (degree signs and the like) and those must parse as
/// the replacement character, not break record framing.
fn parse_card(record: &[u8; RECORD_LEN]) -> Card {
    let keyword = String::from_utf8_lossy(&record[..KEYWORD_LEN])
        .trim()
        .to_string();
    let raw = Some(*record);

    // Commentary cards (COMMENT, HISTORY, blank keyword, ...) have no
    // value indicator and are only ever re-emitted verbatim.
    if record[KEYWORD_LEN] != b'=' || record[KEYWORD_LEN + 1] != b' ' {
        return Card {
            keyword,
            value: FitsValue::Undefined,
            comment: None,
            raw,
            has_value: false,
        };
    }

    let (value, comment) = parse_value(&record[KEYWORD_LEN + 2..]);
    Card {
        keyword,
        value,
        comment,
        raw,
        has_value: true,
    }
}

/// Parse the value/comment portion of a record (everything after "= ").
fn parse_value(body: &[u8]) -> (FitsValue, Option<String>) {
    let start = body.iter().position(|&b| b != b' ').unwrap_or(body.len());
    let trimmed = &body[start..];

    if trimmed.first() == Some(&b'\'') {
        return parse_string_value(trimmed);
    }

    let text = String::from_utf8_lossy(trimmed);
    let (value_part, comment) = match text.find('/') {
        Some(i) => (text[..i].trim(), non_empty(text[i + 1..].trim())),
        None => (text.trim(), None),
    };

    let value = if value_part.is_empty() {
        FitsValue::Undefined
    } else if value_part == "T" {
        FitsValue::Logical(true)
    } else if value_part == "F" {
        FitsValue::Logical(false)
    } else if let Ok(i) = value_part.parse::<i64>() {
        FitsValue::Integer(i)
    } else if let Ok(f) = value_part.replace(['D', 'd'], "E").parse::<f64>() {
        FitsValue::Float(f)
    } else {
        FitsValue::String(value_part.to_string())
    };

    (value, comment)
}

/// Parse a quoted string value, handling doubled-quote escapes.
fn parse_string_value(s: &[u8]) -> (FitsValue, Option<String>) {
    let mut out = Vec::new();
    let mut i = 1;
    while i < s.len() {
        if s[i] == b'\'' {
            if i + 1 < s.len() && s[i + 1] == b'\'' {
                out.push(b'\'');
                i += 2;
            } else {
                i += 1;
                break;
            }
        } else {
            out.push(s[i]);
            i += 1;
        }
    }

    // Trailing blanks inside the quotes are not significant.
    let value = FitsValue::String(String::from_utf8_lossy(&out).trim_end().to_string());

    let rest = &s[i..];
    let comment = rest.iter().position(|&b| b == b'/').and_then(|j| {
        non_empty(String::from_utf8_lossy(&rest[j + 1..]).trim())
    });

    (value, comment)
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Render a card to its fixed-width 80-byte record.
fn render_card(card: &Card) -> [u8; RECORD_LEN] {
    if let Some(raw) = card.raw {
        return raw;
    }

    let mut record = [b' '; RECORD_LEN];
    let keyword = card.keyword.as_bytes();
    let n = keyword.len().min(KEYWORD_LEN);
    record[..n].copy_from_slice(&keyword[..n]);

    record[8] = b'=';
    record[9] = b' ';

    let value_end = match &card.value {
        FitsValue::String(s) => {
            // Quoted, starting in column 11, embedded quotes doubled,
            // padded to the conventional 8-character minimum. At most
            // 68 characters fit between the quotes; longer values are
            // clamped so the closing quote always lands on the record.
            let mut escaped = s.replace('\'', "''");
            const MAX_CONTENT: usize = RECORD_LEN - 12;
            if escaped.len() > MAX_CONTENT {
                let mut cut = MAX_CONTENT;
                while !escaped.is_char_boundary(cut) {
                    cut -= 1;
                }
                escaped.truncate(cut);
                // Never split a doubled-quote escape in half.
                let trailing = escaped.bytes().rev().take_while(|&b| b == b'\'').count();
                if trailing % 2 == 1 {
                    escaped.pop();
                }
            }
            let text = format!("'{:<8}'", escaped);
            let bytes = text.as_bytes();
            let n = bytes.len().min(RECORD_LEN - 10);
            record[10..10 + n].copy_from_slice(&bytes[..n]);
            10 + n
        }
        FitsValue::Undefined => 30,
        value => {
            // Numbers and logicals are right-justified ending at
            // column 30.
            let text = match value {
                FitsValue::Integer(i) => i.to_string(),
                FitsValue::Float(f) => format_float(*f),
                FitsValue::Logical(b) => (if *b { "T" } else { "F" }).to_string(),
                _ => unreachable!(),
            };
            let bytes = text.as_bytes();
            let start = 30usize.saturating_sub(bytes.len()).max(10);
            let n = bytes.len().min(RECORD_LEN - start);
            record[start..start + n].copy_from_slice(&bytes[..n]);
            30
        }
    };

    if let Some(comment) = &card.comment {
        let start = value_end.max(30);
        if start + 3 < RECORD_LEN {
            record[start..start + 3].copy_from_slice(b" / ");
            let bytes = comment.as_bytes();
            let n = bytes.len().min(RECORD_LEN - start - 3);
            record[start + 3..start + 3 + n].copy_from_slice(&bytes[..n]);
        }
    }

    record
}

/// Shortest representation that round-trips and still reads back as a
/// floating-point value.
fn format_float(f: f64) -> String {
    let mut s = format!("{}", f);
    if !s.contains('.') && !s.contains('e') && !s.contains('E') {
        s.push_str(".0");
    }
    s
}

/// Render the full header: cards, END, blank padding to a block
/// boundary, then further blank blocks up to `min_blocks`.
fn render_header(header: &FitsHeader, min_blocks: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity((header.cards.len() + 1) * RECORD_LEN);
    for card in &header.cards {
        out.extend_from_slice(&render_card(card));
    }

    let mut end = [b' '; RECORD_LEN];
    end[..3].copy_from_slice(b"END");
    out.extend_from_slice(&end);

    let mut target = out.len().div_ceil(BLOCK_LEN) * BLOCK_LEN;
    if target < min_blocks * BLOCK_LEN {
        target = min_blocks * BLOCK_LEN;
    }
    out.resize(target, b' ');
    out
}
