//! FITS primary-header I/O for the astrokit command-line utilities.

pub mod fits;

pub use fits::{Card, FitsError, FitsFile, FitsHeader, FitsValue};
