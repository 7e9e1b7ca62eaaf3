//! This module reads the vortex-lattice solver's reports: the total forces
//! file (one block per run case, appended) and the strip forces file.

use log::debug;
use regex::Regex;

use crate::errors::ParseError;
use crate::output::bad_value;
use crate::output::patterns::*;
use crate::tables::{CoefficientTable, SpanwiseDistributionTable};
use crate::util::{is_dashed_line, parse_real};

/// Reads every total-forces block in a report, in file order.
pub fn total_forces(report: &str) -> Result<CoefficientTable, ParseError> {
  let pattern = total_forces_pattern();
  let re = Regex::new(&pattern)
    .map_err(|e| ParseError::new(pattern.as_str(), e.to_string()))?;
  let mut rows: Vec<[f64; 4]> = Vec::new();
  for caps in re.captures_iter(report) {
    let mut row = [0.0; 4];
    for (i, name) in ["alpha", "cl", "cd", "cm"].iter().enumerate() {
      let raw = caps.name(name).map(|m| m.as_str()).unwrap_or_default();
      row[i] = parse_real(raw).ok_or_else(|| bad_value(&pattern, name, raw))?;
    }
    rows.push(row);
  }
  if rows.is_empty() {
    return Err(ParseError::new(pattern, "no total forces block found"));
  }
  debug!("Read {} total forces block(s).", rows.len());
  return CoefficientTable::from_rows(rows);
}

/// What the strip table decoder made of a line.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum LineResponse {
  /// Nothing of interest.
  Useless,
  /// A table header was found.
  Header,
  /// The column names were read.
  Columns,
  /// A row was read.
  Data,
  /// A table ended.
  Done
}

/// Where the strip table decoder is.
#[derive(Copy, Clone, Debug)]
enum StripState {
  /// Looking for a table header.
  Searching,
  /// The header was seen, the column names come next.
  ExpectColumns,
  /// Reading rows, with these (y, chord, cl) column indexes.
  Rows(usize, usize, usize)
}

/// Decodes strip-forces tables line by line.
struct StripDecoder {
  /// Where we are.
  state: StripState,
  /// (y, chord, cl) rows across every table so far.
  rows: Vec<[f64; 3]>,
  /// Number of tables started.
  tables: usize
}

impl StripDecoder {
  /// A fresh decoder.
  fn new() -> Self {
    return Self { state: StripState::Searching, rows: Vec::new(), tables: 0 };
  }

  /// Finds the indexes of the columns we need in a column-name line.
  fn column_indexes(line: &str) -> Option<(usize, usize, usize)> {
    let mut normalized = line.to_string();
    for (from, to) in STRIP_COLUMN_ALIASES {
      normalized = normalized.replace(from, to);
    }
    let names = normalized.split_whitespace().collect::<Vec<_>>();
    let find = |col: &str| names.iter().position(|n| *n == col);
    return Some((
      find(STRIP_Y_COLUMN)?,
      find(STRIP_CHORD_COLUMN)?,
      find(STRIP_CL_COLUMN)?
    ));
  }

  /// Consumes a line.
  fn consume(&mut self, line: &str) -> Result<LineResponse, ParseError> {
    match self.state {
      StripState::Searching => {
        if line.contains(STRIP_FORCES_HEADER) {
          self.state = StripState::ExpectColumns;
          self.tables += 1;
          return Ok(LineResponse::Header);
        }
        return Ok(LineResponse::Useless);
      },
      StripState::ExpectColumns => {
        if line.trim().is_empty() {
          return Ok(LineResponse::Useless);
        }
        let (y, c, cl) = Self::column_indexes(line).ok_or_else(|| {
          ParseError::new(
            STRIP_FORCES_HEADER,
            format!("no {}/{}/{} columns in \"{}\"",
              STRIP_Y_COLUMN, STRIP_CHORD_COLUMN, STRIP_CL_COLUMN, line.trim())
          )
        })?;
        self.state = StripState::Rows(y, c, cl);
        return Ok(LineResponse::Columns);
      },
      StripState::Rows(y, c, cl) => {
        if line.trim().is_empty() || is_dashed_line(line) {
          self.state = StripState::Searching;
          return Ok(LineResponse::Done);
        }
        let values = line.split_whitespace().collect::<Vec<_>>();
        let mut row = [0.0; 3];
        for (i, (j, name)) in [
          (y, STRIP_Y_COLUMN),
          (c, STRIP_CHORD_COLUMN),
          (cl, STRIP_CL_COLUMN)
        ].into_iter().enumerate() {
          let raw = values.get(j).copied().unwrap_or_default();
          row[i] = parse_real(raw)
            .ok_or_else(|| bad_value(STRIP_FORCES_HEADER, name, line.trim()))?;
        }
        self.rows.push(row);
        return Ok(LineResponse::Data);
      }
    }
  }
}

/// Reads every strip-forces table in a report (one per surface, mirrored
/// halves included) into a single distribution sorted by spanwise location.
pub fn strip_forces(report: &str) -> Result<SpanwiseDistributionTable, ParseError> {
  let mut decoder = StripDecoder::new();
  for line in report.lines() {
    decoder.consume(line)?;
  }
  if let StripState::ExpectColumns = decoder.state {
    return Err(ParseError::new(STRIP_FORCES_HEADER, "report ends before the column names"));
  }
  if decoder.tables == 0 {
    return Err(ParseError::new(STRIP_FORCES_HEADER, "no strip forces table found"));
  }
  debug!(
    "Read {} strip(s) from {} table(s).",
    decoder.rows.len(),
    decoder.tables
  );
  return SpanwiseDistributionTable::from_rows(decoder.rows);
}
