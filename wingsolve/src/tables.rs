//! This module implements the tables handed back to callers: dense row-major
//! data with a fixed set of columns, enforced by a schema type.
//!
//! Tables are validated when they're built, so every table in existence has
//! the right width, only finite values, and rows sorted by the schema's
//! independent variable.

use std::marker::PhantomData;

use nalgebra::DMatrix;

use crate::errors::ParseError;

/// A fixed set of named columns, one of which orders the rows.
pub trait Schema {
  /// A name for error messages.
  const NAME: &'static str;
  /// The column names, in order.
  const COLUMNS: &'static [&'static str];
  /// The index of the column rows are sorted by.
  const ORDER_BY: usize;

  /// Finds a column by name.
  fn column_index(name: &str) -> Option<usize> {
    return Self::COLUMNS.iter().position(|c| *c == name);
  }
}

/// Coefficients of a whole body against angle of attack.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Coefficients;

impl Schema for Coefficients {
  const NAME: &'static str = "coefficients";
  const COLUMNS: &'static [&'static str] = &[
    "alpha",
    "lift_coefficient",
    "drag_coefficient",
    "moment_coefficient"
  ];
  const ORDER_BY: usize = 0;
}

/// A 2-D airfoil polar, which splits out the pressure drag.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AirfoilPolar;

impl Schema for AirfoilPolar {
  const NAME: &'static str = "airfoil polar";
  const COLUMNS: &'static [&'static str] = &[
    "alpha",
    "lift_coefficient",
    "drag_coefficient",
    "pressure_drag_coefficient",
    "moment_coefficient"
  ];
  const ORDER_BY: usize = 0;
}

/// Strip values along the span.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpanwiseDistribution;

impl Schema for SpanwiseDistribution {
  const NAME: &'static str = "spanwise distribution";
  const COLUMNS: &'static [&'static str] = &[
    "spanwise_location",
    "chord",
    "lift_coefficient"
  ];
  const ORDER_BY: usize = 0;
}

/// A table of real numbers following a schema.
#[derive(Clone, Debug, PartialEq)]
pub struct Table<S: Schema> {
  /// The data, one row per record.
  data: DMatrix<f64>,
  /// A free-form description of where the data came from.
  label: Option<String>,
  /// The schema marker.
  schema: PhantomData<S>
}

/// Coefficients against angle of attack.
pub type CoefficientTable = Table<Coefficients>;

/// A 2-D polar.
pub type AirfoilPolarTable = Table<AirfoilPolar>;

/// A spanwise distribution.
pub type SpanwiseDistributionTable = Table<SpanwiseDistribution>;

impl<S: Schema> Table<S> {
  /// Builds a table from rows, validating and sorting them.
  pub fn from_rows<R: AsRef<[f64]>>(
    rows: impl IntoIterator<Item = R>
  ) -> Result<Self, ParseError> {
    let width = S::COLUMNS.len();
    let mut collected: Vec<Vec<f64>> = Vec::new();
    for (i, row) in rows.into_iter().enumerate() {
      let row = row.as_ref();
      if row.len() != width {
        return Err(ParseError::new(S::NAME, format!(
          "row {} has {} values, expected {}",
          i,
          row.len(),
          width
        )));
      }
      if let Some(j) = row.iter().position(|x| !x.is_finite()) {
        return Err(ParseError::new(S::NAME, format!(
          "row {} has a non-finite {}",
          i,
          S::COLUMNS[j]
        )));
      }
      collected.push(row.to_vec());
    }
    if collected.is_empty() {
      return Err(ParseError::new(S::NAME, "no rows"));
    }
    // stable, so equal keys keep their input order
    collected.sort_by(|a, b| a[S::ORDER_BY].total_cmp(&b[S::ORDER_BY]));
    let flat = collected.concat();
    return Ok(Self {
      data: DMatrix::from_row_slice(flat.len() / width, width, &flat),
      label: None,
      schema: PhantomData
    });
  }

  /// Sets the label.
  pub fn with_label<L: Into<String>>(mut self, label: L) -> Self {
    self.label = Some(label.into());
    return self;
  }

  /// The label, if any.
  pub fn label(&self) -> Option<&str> {
    return self.label.as_deref();
  }

  /// The column names.
  pub fn columns(&self) -> &'static [&'static str] {
    return S::COLUMNS;
  }

  /// Number of rows.
  pub fn len(&self) -> usize {
    return self.data.nrows();
  }

  /// Whether there are no rows. Always false for a validated table.
  pub fn is_empty(&self) -> bool {
    return self.data.nrows() == 0;
  }

  /// Gets a whole column by name.
  pub fn column(&self, name: &str) -> Option<Vec<f64>> {
    let j = S::column_index(name)?;
    return Some(self.data.column(j).iter().copied().collect());
  }

  /// Gets a row by index.
  pub fn row(&self, i: usize) -> Option<Vec<f64>> {
    if i >= self.len() {
      return None;
    }
    return Some(self.data.row(i).iter().copied().collect());
  }

  /// Iterates over the rows.
  pub fn rows(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
    return (0..self.len()).map(|i| self.data.row(i).iter().copied().collect());
  }

  /// A single value by row index and column name.
  pub fn get(&self, i: usize, name: &str) -> Option<f64> {
    let j = S::column_index(name)?;
    return self.data.get((i, j)).copied();
  }

  /// The underlying matrix.
  pub fn matrix(&self) -> &DMatrix<f64> {
    return &self.data;
  }
}

impl AirfoilPolarTable {
  /// Drops the pressure drag column, keeping the label.
  pub fn to_coefficients(&self) -> CoefficientTable {
    let kept = [0, 1, 2, 4];
    let data = self.data.select_columns(kept.iter());
    return CoefficientTable {
      data,
      label: self.label.clone(),
      schema: PhantomData
    };
  }
}
