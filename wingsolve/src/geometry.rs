//! This module defines the geometry model: airfoils, wing sections and whole
//! wings, plus the geometric queries needed to derive reference quantities.
//!
//! Conventions: x points downstream, y spanwise (towards the right tip), z up.
//! Lengths are in whatever unit the mass file declares (metres by default) and
//! angles are in degrees. Wings are described as a half-wing, with the other
//! half obtained by mirroring.

use std::path::{Path, PathBuf};

use itertools::Itertools;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Abscissae for three-point Gauss-Legendre quadrature on [-1, 1].
const GAUSS_NODES: [f64; 3] = [-0.774_596_669_241_483_4, 0.0, 0.774_596_669_241_483_4];

/// Weights for three-point Gauss-Legendre quadrature on [-1, 1].
const GAUSS_WEIGHTS: [f64; 3] = [5.0 / 9.0, 8.0 / 9.0, 5.0 / 9.0];

/// An airfoil, known only by its name. The name resolves to a coordinate file
/// `<name>.dat` within an airfoil library directory.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Airfoil {
  /// Name of the airfoil, e.g. "s1223".
  pub name: String
}

impl Airfoil {
  /// Creates an airfoil reference from its name.
  pub fn new<S: Into<String>>(name: S) -> Self {
    return Self { name: name.into() };
  }

  /// The bare file name of this airfoil's coordinate file.
  pub fn file_name(&self) -> String {
    return format!("{}.dat", self.name);
  }
}

/// A directory containing airfoil coordinate files.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AirfoilLibrary {
  /// The directory airfoil files are looked up in.
  pub directory: PathBuf
}

impl Default for AirfoilLibrary {
  fn default() -> Self {
    return Self { directory: PathBuf::from("airfoils") };
  }
}

impl AirfoilLibrary {
  /// Creates a library pointing at a directory.
  pub fn new<P: AsRef<Path>>(directory: P) -> Self {
    return Self { directory: directory.as_ref().to_path_buf() };
  }

  /// Where an airfoil's file should be. Doesn't check it's there.
  pub fn path(&self, airfoil: &Airfoil) -> PathBuf {
    return self.directory.join(airfoil.file_name());
  }

  /// Resolves an airfoil's file, failing if it doesn't exist.
  pub fn locate(&self, airfoil: &Airfoil) -> Result<PathBuf> {
    let path = self.path(airfoil);
    if !path.is_file() {
      return Err(Error::MissingInput(path));
    }
    return Ok(path);
  }
}

/// A (count, spacing) pair for vortex distributions. The spacing parameter
/// follows the vortex-lattice solver's convention: 1.0 is cosine, 0.0 is
/// uniform, negative values are sine-like.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VortexSpacing {
  /// The number of vortices.
  pub count: usize,
  /// The spacing parameter.
  pub spacing: f64
}

impl VortexSpacing {
  /// Creates a new spacing.
  pub const fn new(count: usize, spacing: f64) -> Self {
    return Self { count, spacing };
  }
}

/// A simple profile drag polar made of three (CL, CD) breakpoints, the solver
/// interpolates parabolically between them.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProfileDragSettings {
  /// Lift coefficient at the low end, normally the minimum lift.
  pub cl1: f64,
  /// Drag coefficient matching `cl1`.
  pub cd1: f64,
  /// Lift coefficient at the middle breakpoint.
  pub cl2: f64,
  /// Drag coefficient matching `cl2`.
  pub cd2: f64,
  /// Lift coefficient at the high end, normally the maximum lift.
  pub cl3: f64,
  /// Drag coefficient matching `cl3`.
  pub cd3: f64
}

/// Direction in which a control moves on the mirrored side.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Deflection {
  /// Same direction on both sides (e.g. flaps, elevators).
  #[default]
  Normal,
  /// Opposite direction on the mirrored side (e.g. ailerons).
  Inverse
}

impl Deflection {
  /// The sign the solver expects for this duplication behaviour.
  pub const fn sign(&self) -> i64 {
    return match self {
      Self::Normal => 1,
      Self::Inverse => -1
    };
  }
}

/// A control surface hinged on a wing section.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Control {
  /// Name of the control variable.
  pub name: String,
  /// Deflection in degrees per unit of control variable.
  pub gain: f64,
  /// Chordwise hinge location as a fraction of chord.
  pub hinge_x: f64,
  /// The hinge axis vector. Zero lets the solver pick it along the hinge line.
  #[serde(default = "Vector3::zeros")]
  pub hinge_axis: Vector3<f64>,
  /// Behaviour on the mirrored side.
  #[serde(default)]
  pub deflection: Deflection
}

/// A section of the wing. Sections don't need to be stored in spanwise order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WingSection {
  /// Location of the leading edge.
  pub location: Point3<f64>,
  /// Local chord length.
  pub chord: f64,
  /// Incidence (twist) angle, in degrees.
  #[serde(default)]
  pub incidence: f64,
  /// The airfoil at this section.
  pub airfoil: Airfoil,
  /// Spanwise vortex distribution starting at this section. If absent, the
  /// surface-wide one applies.
  #[serde(default)]
  pub spanwise: Option<VortexSpacing>,
  /// Scaling factor for the lift-curve slope. Overrides any value derived from
  /// a 2-D polar.
  #[serde(default)]
  pub lift_slope_scaling: Option<f64>,
  /// Profile drag polar. Overrides any value derived from a 2-D polar.
  #[serde(default)]
  pub profile_drag: Option<ProfileDragSettings>,
  /// Control surfaces on this section.
  #[serde(default)]
  pub controls: Vec<Control>
}

impl WingSection {
  /// Creates a bare section with no tuning and no controls.
  pub fn new(
    location: Point3<f64>,
    chord: f64,
    incidence: f64,
    airfoil: Airfoil
  ) -> Self {
    return Self {
      location,
      chord,
      incidence,
      airfoil,
      spanwise: None,
      lift_slope_scaling: None,
      profile_drag: None,
      controls: Vec::new()
    };
  }

  /// The spanwise coordinate of this section.
  pub fn y(&self) -> f64 {
    return self.location.y;
  }

  /// The location of this section's quarter-chord point.
  pub fn quarter_chord(&self) -> Point3<f64> {
    return self.location + Vector3::x() * (self.chord / 4.0);
  }
}

/// Moments and products of inertia about the center of gravity.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
#[allow(missing_docs)]
pub struct Inertia {
  pub ixx: f64,
  pub iyy: f64,
  pub izz: f64,
  pub ixy: f64,
  pub ixz: f64,
  pub iyz: f64
}

/// Mass properties of a body.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MassProperties {
  /// Total mass.
  pub mass: f64,
  /// Location of the center of gravity.
  pub center_of_gravity: Point3<f64>,
  /// Inertia about the center of gravity.
  #[serde(default)]
  pub inertia: Inertia
}

impl MassProperties {
  /// Mass properties of a point mass.
  pub fn point(mass: f64, center_of_gravity: Point3<f64>) -> Self {
    return Self { mass, center_of_gravity, inertia: Inertia::default() };
  }
}

/// A wing made up of sections. Geometric quantities are always computed from
/// the current sections, nothing is cached.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Wing {
  /// The sections, in any order.
  pub sections: Vec<WingSection>,
  /// Mass properties, needed for trimmed-flight analyses.
  #[serde(default)]
  pub mass_properties: Option<MassProperties>
}

impl Wing {
  /// Creates a wing, requiring at least two sections to make a planform.
  pub fn new(sections: Vec<WingSection>) -> Result<Self> {
    let wing = Self { sections, mass_properties: None };
    wing.validate()?;
    return Ok(wing);
  }

  /// Sets the mass properties.
  pub fn with_mass(mut self, mass_properties: MassProperties) -> Self {
    self.mass_properties = Some(mass_properties);
    return self;
  }

  /// Checks the structural requirements of a wing.
  pub fn validate(&self) -> Result<()> {
    if self.sections.len() < 2 {
      return Err(Error::config(format!(
        "a wing needs at least 2 sections, this one has {}",
        self.sections.len()
      )));
    }
    if let Some(s) = self.sections.iter().find(|s| !s.location.y.is_finite()) {
      return Err(Error::config(format!(
        "section with airfoil {} has a non-finite spanwise location",
        s.airfoil.name
      )));
    }
    return Ok(());
  }

  /// Returns the sections sorted by spanwise location.
  pub fn sorted_sections(&self) -> Vec<&WingSection> {
    return self.sections
      .iter()
      .sorted_by(|a, b| a.y().total_cmp(&b.y()))
      .collect();
  }

  /// The innermost section.
  pub fn root_section(&self) -> Result<&WingSection> {
    return self.sections
      .iter()
      .min_by(|a, b| a.y().total_cmp(&b.y()))
      .ok_or_else(|| Error::config("the wing has no sections"));
  }

  /// The full wingspan, assuming the sections describe one symmetric half.
  pub fn span(&self) -> Result<f64> {
    return self.sections
      .iter()
      .map(WingSection::y)
      .reduce(f64::max)
      .map(|y| 2.0 * y)
      .ok_or_else(|| Error::config("cannot compute the span without sections"));
  }

  /// Linearly interpolates the chord at a spanwise location. Outside the
  /// sections' range, the nearest end value is held.
  pub fn chord_distribution(&self, y: f64) -> Result<f64> {
    let sorted = self.sorted_sections();
    let (first, last) = match (sorted.first(), sorted.last()) {
      (Some(f), Some(l)) => (f, l),
      _ => return Err(Error::config("cannot interpolate chords without sections"))
    };
    if y <= first.y() {
      return Ok(first.chord);
    }
    if y >= last.y() {
      return Ok(last.chord);
    }
    for (a, b) in sorted.iter().tuple_windows() {
      if y < a.y() || y > b.y() {
        continue;
      }
      // exact hits return the section's own chord
      if y == a.y() {
        return Ok(a.chord);
      }
      if y == b.y() {
        return Ok(b.chord);
      }
      let t = (y - a.y()) / (b.y() - a.y());
      return Ok(a.chord + t * (b.chord - a.chord));
    }
    // a NaN is the only way here
    return Err(Error::config(format!("cannot interpolate chord at y = {}", y)));
  }

  /// Integrates a function of the spanwise location from 0 to the semi-span,
  /// splitting the interval at every section so each piece is smooth.
  fn integrate_semispan<F: Fn(f64) -> Result<f64>>(&self, f: F) -> Result<f64> {
    self.validate()?;
    let half = self.span()? / 2.0;
    if half <= 0.0 {
      return Ok(0.0);
    }
    let knots = std::iter::once(0.0)
      .chain(
        self.sorted_sections()
          .into_iter()
          .map(WingSection::y)
          .filter(|y| *y > 0.0 && *y < half)
      )
      .chain(std::iter::once(half))
      .dedup()
      .collect::<Vec<_>>();
    let mut total = 0.0;
    for (a, b) in knots.into_iter().tuple_windows() {
      let mid = 0.5 * (a + b);
      let rad = 0.5 * (b - a);
      for (node, weight) in GAUSS_NODES.iter().zip(GAUSS_WEIGHTS.iter()) {
        total += weight * rad * f(mid + rad * node)?;
      }
    }
    return Ok(total);
  }

  /// The planform area of both halves.
  pub fn planform_area(&self) -> Result<f64> {
    return Ok(2.0 * self.integrate_semispan(|y| self.chord_distribution(y))?);
  }

  /// The mean aerodynamic chord. Zero for degenerate (zero-area) wings.
  pub fn mean_aerodynamic_chord(&self) -> Result<f64> {
    let area = self.planform_area()?;
    if area == 0.0 {
      return Ok(0.0);
    }
    let integral = self.integrate_semispan(
      |y| self.chord_distribution(y).map(|c| c * c)
    )?;
    return Ok(2.0 / area * integral);
  }

  /// The aspect ratio. Zero for degenerate (zero-area) wings.
  pub fn aspect_ratio(&self) -> Result<f64> {
    let area = self.planform_area()?;
    if area == 0.0 {
      return Ok(0.0);
    }
    return Ok(self.span()?.powi(2) / area);
  }
}
