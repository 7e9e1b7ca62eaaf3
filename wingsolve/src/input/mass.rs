//! This module implements the mass file, which gives the solver units, gravity,
//! air density and the mass distribution needed for trimmed-flight runs.

use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::geometry::{MassProperties, Wing};
use crate::util::fmt_real;

/// Column names for the mass table.
const MASS_COLUMNS: [&str; 10] = [
  "mass", "x", "y", "z", "Ixx", "Iyy", "Izz", "Ixy", "Ixz", "Iyz"
];

/// A unit declaration: how many of the named unit one file unit is.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Unit {
  /// The scale factor.
  pub scale: f64,
  /// The unit's name.
  pub name: String
}

impl Unit {
  /// Creates a new unit.
  pub fn new<S: Into<String>>(scale: f64, name: S) -> Self {
    return Self { scale, name: name.into() };
  }
}

/// A whole mass file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MassDocument {
  /// Length unit.
  pub length: Unit,
  /// Mass unit.
  pub mass: Unit,
  /// Time unit.
  pub time: Unit,
  /// Gravitational acceleration, in file units.
  pub gravity: Option<f64>,
  /// Air density, in file units.
  pub density: Option<f64>,
  /// The point masses (or distributed components) making up the aircraft.
  pub entries: Vec<MassProperties>
}

impl MassDocument {
  /// A document in SI units with no gravity, density or entries.
  pub fn si() -> Self {
    return Self {
      length: Unit::new(1.0, "m"),
      mass: Unit::new(1.0, "kg"),
      time: Unit::new(1.0, "s"),
      gravity: None,
      density: None,
      entries: Vec::new()
    };
  }

  /// An SI document holding a wing's mass properties.
  pub fn from_wing(
    wing: &Wing,
    gravity: Option<f64>,
    density: Option<f64>
  ) -> Result<Self> {
    let props = wing.mass_properties.ok_or_else(
      || Error::config("the wing has no mass properties")
    )?;
    return Ok(Self {
      gravity,
      density,
      entries: vec![props],
      ..Self::si()
    });
  }

  /// Renders the file's contents.
  pub fn render(&self) -> String {
    let mut out: Vec<String> = vec![
      format!("Lunit = {} {}", fmt_real(self.length.scale), self.length.name),
      format!("Munit = {} {}", fmt_real(self.mass.scale), self.mass.name),
      format!("Tunit = {} {}", fmt_real(self.time.scale), self.time.name),
      String::new()
    ];
    if let Some(g) = self.gravity {
      out.push(format!("g   = {}", fmt_real(g)));
    }
    if let Some(rho) = self.density {
      out.push(format!("rho = {}", fmt_real(rho)));
    }
    if self.gravity.is_some() || self.density.is_some() {
      out.push(String::new());
    }
    let rows: Vec<Vec<String>> = self.entries
      .iter()
      .map(|e| {
        let (c, i) = (&e.center_of_gravity, &e.inertia);
        return [e.mass, c.x, c.y, c.z, i.ixx, i.iyy, i.izz, i.ixy, i.ixz, i.iyz]
          .into_iter()
          .map(fmt_real)
          .collect();
      })
      .collect();
    // pad every column to its widest value, names included
    let widths: Vec<usize> = MASS_COLUMNS
      .iter()
      .enumerate()
      .map(|(j, name)| {
        return rows.iter().map(|r| r[j].len()).fold(name.len(), usize::max);
      })
      .collect();
    let pad = |cells: Vec<String>| -> String {
      return cells
        .iter()
        .zip(widths.iter())
        .map(|(c, w)| format!("{:<w$}", c, w = *w))
        .collect::<Vec<_>>()
        .join("   ");
    };
    let header = pad(MASS_COLUMNS.iter().map(|s| s.to_string()).collect());
    out.push(format!("#  {}", header).trim_end().to_string());
    for row in rows {
      out.push(format!("   {}", pad(row)).trim_end().to_string());
    }
    let mut s = out.join("\n");
    s.push('\n');
    return s;
  }

  /// Writes the file.
  pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
    debug!("Writing mass file to {}", path.as_ref().display());
    std::fs::write(path, self.render())?;
    return Ok(());
  }
}
