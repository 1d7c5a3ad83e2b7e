//! Library behind the astrokit command-line utilities.
//!
//! The binaries are thin wrappers; all behaviour worth testing lives
//! here: the header-adjustment pipeline, sexagesimal coordinate
//! parsing/formatting, timestamp arithmetic and sequential-filename
//! renumbering.

pub mod adjust;
pub mod coords;
pub mod seq;
pub mod timeutil;
