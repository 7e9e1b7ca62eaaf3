//! This module reads the panel solver's polar accumulation file.

use log::debug;

use crate::errors::ParseError;
use crate::output::bad_value;
use crate::output::patterns::*;
use crate::tables::{AirfoilPolar, AirfoilPolarTable, Schema};
use crate::util::{fixed_column, parse_real};

/// Reads the rows after the header underline, using fixed columns.
pub fn polar(report: &str) -> Result<AirfoilPolarTable, ParseError> {
  let mut lines = report.lines();
  // first, skip everything up to and including the underline
  if !lines.any(|l| l.contains(POLAR_UNDERLINE)) {
    return Err(ParseError::new(POLAR_UNDERLINE, "no polar header found"));
  }
  let mut rows: Vec<[f64; 5]> = Vec::new();
  for line in lines.filter(|l| !l.trim().is_empty()) {
    let mut row = [0.0; 5];
    for (i, range) in POLAR_COLUMNS.iter().enumerate() {
      let name = AirfoilPolar::COLUMNS[i];
      let raw = fixed_column(line, *range)
        .ok_or_else(|| bad_value(POLAR_UNDERLINE, name, line))?;
      row[i] = parse_real(raw)
        .ok_or_else(|| bad_value(POLAR_UNDERLINE, name, line))?;
    }
    rows.push(row);
  }
  if rows.is_empty() {
    // a polar with no converged points
    return Err(ParseError::new(POLAR_UNDERLINE, "no rows after the header"));
  }
  debug!("Read {} polar point(s).", rows.len());
  return AirfoilPolarTable::from_rows(rows);
}
