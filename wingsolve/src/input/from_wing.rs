//! This module derives a geometry file from a wing: reference quantities come
//! from the planform, and per-section tuning can come from 2-D polars.

use std::f64::consts::PI;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::geometry::{ProfileDragSettings, VortexSpacing, Wing, WingSection};
use crate::input::document::*;
use crate::tables::AirfoilPolarTable;

/// Lower bound (exclusive) of the linear lift range, in degrees.
const LINEAR_ALPHA_MIN: f64 = 0.0;

/// Upper bound (exclusive) of the linear lift range, in degrees.
const LINEAR_ALPHA_MAX: f64 = 5.0;

/// Knobs for turning a wing into a geometry file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WingDocumentOptions {
  /// Case title.
  pub title: String,
  /// Name of the wing's surface.
  pub surface_name: String,
  /// Default Mach number.
  pub mach: f64,
  /// Chordwise vortex spacing.
  pub chordwise: VortexSpacing,
  /// Surface-wide spanwise vortex spacing.
  pub spanwise: VortexSpacing,
  /// Where the wing is mirrored. None makes a half-wing.
  pub mirror_plane: Option<f64>,
  /// Default profile drag coefficient.
  pub profile_drag: Option<f64>,
  /// Moment reference point. If absent, the root's quarter chord is used.
  pub reference_point: Option<Point3<f64>>
}

impl Default for WingDocumentOptions {
  fn default() -> Self {
    return Self {
      title: "wing".to_string(),
      surface_name: "Wing".to_string(),
      mach: 0.0,
      chordwise: VortexSpacing::new(12, 1.0),
      spanwise: VortexSpacing::new(20, 1.0),
      mirror_plane: Some(0.0),
      profile_drag: None,
      reference_point: None
    };
  }
}

impl ProfileDragSettings {
  /// Picks the minimum-lift, zero-incidence and maximum-lift points of a polar.
  pub fn from_polar(polar: &AirfoilPolarTable) -> Self {
    let rows = polar.rows().collect::<Vec<_>>();
    let pick = |key: &dyn Fn(&Vec<f64>) -> f64| -> (f64, f64) {
      let best = rows
        .iter()
        .min_by(|a, b| key(a).total_cmp(&key(b)))
        .map(|r| (r[1], r[2]));
      return best.unwrap_or((0.0, 0.0));
    };
    let (cl1, cd1) = pick(&|r: &Vec<f64>| r[1]);
    let (cl2, cd2) = pick(&|r: &Vec<f64>| r[0].abs());
    let (cl3, cd3) = pick(&|r: &Vec<f64>| -r[1]);
    return Self { cl1, cd1, cl2, cd2, cl3, cd3 };
  }
}

/// Lift-curve slope scaling from a polar: the least-squares slope over the
/// linear range, per radian, relative to thin airfoil theory's 2 pi. None if
/// there aren't at least two distinct angles in range.
pub fn lift_slope_scaling(polar: &AirfoilPolarTable) -> Option<f64> {
  let points = polar
    .rows()
    .filter(|r| r[0] > LINEAR_ALPHA_MIN && r[0] < LINEAR_ALPHA_MAX)
    .map(|r| (r[0].to_radians(), r[1]))
    .collect::<Vec<_>>();
  if points.len() < 2 {
    return None;
  }
  let n = points.len() as f64;
  let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
  let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
  let sxx = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum::<f64>();
  let sxy = points.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum::<f64>();
  if sxx == 0.0 {
    return None;
  }
  return Some(sxy / sxx / (2.0 * PI));
}

/// Turns a wing section into a file section, applying polar-derived tuning
/// unless the section has its own.
fn section_from(wing_section: &WingSection, polar: Option<&AirfoilPolarTable>) -> Section {
  let lift_slope_scaling = wing_section.lift_slope_scaling
    .or_else(|| polar.and_then(lift_slope_scaling));
  let profile_drag = wing_section.profile_drag
    .or_else(|| polar.map(ProfileDragSettings::from_polar));
  return Section {
    location: wing_section.location,
    chord: wing_section.chord,
    incidence: wing_section.incidence,
    spanwise: wing_section.spanwise,
    airfoil_file: wing_section.airfoil.file_name(),
    lift_slope_scaling,
    profile_drag,
    controls: wing_section.controls.clone()
  };
}

impl GeometryDocument {
  /// Describes a wing as a single surface. `section_polars` is either empty or
  /// holds one polar per section, in the same order as `wing.sections`.
  pub fn from_wing(
    wing: &Wing,
    options: &WingDocumentOptions,
    section_polars: &[AirfoilPolarTable]
  ) -> Result<Self> {
    wing.validate()?;
    if !section_polars.is_empty() && section_polars.len() != wing.sections.len() {
      return Err(Error::config(format!(
        "got {} section polars for {} sections",
        section_polars.len(),
        wing.sections.len()
      )));
    }
    // pair up before sorting, so polars follow their sections
    let mut paired = wing.sections
      .iter()
      .enumerate()
      .map(|(i, s)| (s, section_polars.get(i)))
      .collect::<Vec<_>>();
    paired.sort_by(|a, b| a.0.y().total_cmp(&b.0.y()));
    let reference_point = match options.reference_point {
      Some(p) => p,
      None => wing.root_section()?.quarter_chord()
    };
    let header = Header {
      title: options.title.clone(),
      mach: options.mach,
      y_symmetry: Symmetry::Ignore,
      z_symmetry: Symmetry::Ignore,
      z_plane: 0.0,
      reference_area: wing.planform_area()?,
      reference_chord: wing.mean_aerodynamic_chord()?,
      reference_span: wing.span()?,
      reference_point,
      profile_drag: options.profile_drag
    };
    let surface = Surface {
      spanwise: Some(options.spanwise),
      mirror: options.mirror_plane.is_some(),
      mirror_plane: options.mirror_plane,
      sections: paired
        .into_iter()
        .map(|(s, p)| section_from(s, p))
        .collect(),
      ..Surface::new(options.surface_name.clone(), options.chordwise)
    };
    return Ok(Self { header, surfaces: vec![surface], bodies: Vec::new() });
  }
}
