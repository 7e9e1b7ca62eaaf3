//! This module implements the readers for the solvers' text reports. Each one
//! turns a whole report into a validated table, or says which pattern failed.
//!
//! Three styles of extraction are used, depending on the report:
//!   - a multi-line regex for the blocks of scalars in total-forces reports;
//!   - fixed character columns for the 2-D polar accumulation file;
//!   - whitespace-separated tables with named columns for strip forces.

pub mod avl;
pub(crate) mod patterns;
pub mod xfoil;

use std::path::Path;

use crate::errors::{ParseError, Result};

/// Reads a report into memory, decoding lossily since solvers sometimes write
/// odd bytes into titles.
pub fn read_report<P: AsRef<Path>>(path: P) -> Result<String> {
  let bytes = std::fs::read(path)?;
  return Ok(String::from_utf8_lossy(&bytes).into_owned());
}

/// Shorthand for a parse error about a value that wouldn't convert.
pub(crate) fn bad_value(pattern: &str, what: &str, raw: &str) -> ParseError {
  return ParseError::new(pattern, format!("could not read {} from \"{}\"", what, raw));
}
