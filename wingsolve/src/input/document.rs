//! This module implements the vortex-lattice geometry file: a header, then
//! surfaces made of sections, then bodies.

use std::collections::BTreeSet;
use std::path::Path;

use log::debug;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::geometry::{Control, ProfileDragSettings, VortexSpacing};
use crate::input::{emit_rules, fields, render, Field, Line, Rule};

/// Symmetry flags about the y = 0 or z = Zsym planes.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Symmetry {
  /// Symmetric, like a solid wall.
  Symmetric,
  /// Antisymmetric, like a free surface.
  Antisymmetric,
  /// No symmetry assumed.
  #[default]
  Ignore
}

impl Symmetry {
  /// The flag value the solver reads.
  pub const fn flag(&self) -> i64 {
    return match self {
      Self::Symmetric => 1,
      Self::Antisymmetric => -1,
      Self::Ignore => 0
    };
  }
}

/// Values for a data line made of a vector's components.
fn vector_fields(v: &Vector3<f64>) -> Vec<Field> {
  return fields([v.x, v.y, v.z]);
}

/// Values for a vortex spacing (count, then parameter).
fn spacing_fields(s: &VortexSpacing) -> Vec<Field> {
  return vec![s.count.into(), s.spacing.into()];
}

/// Values for a CDCL line.
fn drag_fields(p: &ProfileDragSettings) -> Vec<Field> {
  return fields([p.cl1, p.cd1, p.cl2, p.cd2, p.cl3, p.cd3]);
}

/// The mirror plane, if mirroring is on. Mirroring without a plane is an error.
fn mirror_rule(what: &str, mirror: bool, plane: Option<f64>) -> Result<Rule> {
  let values = match (mirror, plane) {
    (false, _) => None,
    (true, Some(y)) => Some(fields([y])),
    (true, None) => return Err(Error::config(format!(
      "{} is mirrored but has no mirror plane location",
      what
    )))
  };
  return Ok(Rule::valued("YDUPLICATE", "Ydupl", values));
}

/// The case header.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Header {
  /// Case title, the first line in the file.
  pub title: String,
  /// Default Mach number.
  pub mach: f64,
  /// Symmetry about the y = 0 plane.
  pub y_symmetry: Symmetry,
  /// Symmetry about the z = Zsym plane.
  pub z_symmetry: Symmetry,
  /// Location of the z symmetry plane.
  pub z_plane: f64,
  /// Reference area.
  pub reference_area: f64,
  /// Reference chord.
  pub reference_chord: f64,
  /// Reference span.
  pub reference_span: f64,
  /// Moment reference point.
  pub reference_point: Point3<f64>,
  /// Default profile drag coefficient added to the whole geometry.
  pub profile_drag: Option<f64>
}

impl Header {
  /// The header's lines.
  fn lines(&self, out: &mut Vec<Line>) {
    let p = &self.reference_point;
    out.push(Line::Text(self.title.clone()));
    out.push(Line::Blank);
    out.push(Line::Comment("Mach"));
    out.push(Line::Data(fields([self.mach])));
    out.push(Line::Comment("IYsym  IZsym  Zsym"));
    out.push(Line::Data(vec![
      self.y_symmetry.flag().into(),
      self.z_symmetry.flag().into(),
      self.z_plane.into()
    ]));
    out.push(Line::Comment("Sref  Cref  Bref"));
    out.push(Line::Data(fields([
      self.reference_area,
      self.reference_chord,
      self.reference_span
    ])));
    out.push(Line::Comment("Xref  Yref  Zref"));
    out.push(Line::Data(fields([p.x, p.y, p.z])));
    emit_rules(vec![
      Rule::plain("CDp", self.profile_drag.map(|cd| fields([cd])))
    ], out);
    out.push(Line::Blank);
  }
}

/// A section of a lifting surface.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Section {
  /// Leading edge location.
  pub location: Point3<f64>,
  /// Chord.
  pub chord: f64,
  /// Incidence angle, degrees.
  pub incidence: f64,
  /// Spanwise vortex spacing starting at this section.
  pub spanwise: Option<VortexSpacing>,
  /// Airfoil coordinate file name, relative to the solver's working directory.
  pub airfoil_file: String,
  /// Lift-curve slope scaling factor.
  pub lift_slope_scaling: Option<f64>,
  /// Profile drag polar.
  pub profile_drag: Option<ProfileDragSettings>,
  /// Control surfaces.
  pub controls: Vec<Control>
}

impl Section {
  /// The section's lines.
  fn lines(&self, out: &mut Vec<Line>) {
    let p = &self.location;
    let mut values = fields([p.x, p.y, p.z, self.chord, self.incidence]);
    if let Some(ref s) = self.spanwise {
      values.extend(spacing_fields(s));
    }
    out.push(Line::Keyword("SECTION"));
    out.push(Line::Comment("Xle  Yle  Zle  Chord  Ainc  [Nspanwise  Sspace]"));
    out.push(Line::Data(values));
    out.push(Line::Blank);
    let mut rules = vec![
      Rule::valued(
        "AFILE",
        "airfoil file",
        Some(vec![Field::text(self.airfoil_file.clone())])
      ),
      Rule::valued(
        "CLAF",
        "dCL/da scaling factor",
        self.lift_slope_scaling.map(|k| fields([k]))
      ),
      Rule::valued(
        "CDCL",
        "CL1  CD1  CL2  CD2  CL3  CD3",
        self.profile_drag.as_ref().map(drag_fields)
      )
    ];
    for control in self.controls.iter() {
      let mut values = vec![
        Field::text(control.name.clone()),
        control.gain.into(),
        control.hinge_x.into()
      ];
      values.extend(vector_fields(&control.hinge_axis));
      values.push(control.deflection.sign().into());
      rules.push(Rule::valued(
        "CONTROL",
        "Cname  Cgain  Xhinge  HingeVec  SgnDup",
        Some(values)
      ));
    }
    emit_rules(rules, out);
  }
}

/// A lifting surface.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Surface {
  /// Name.
  pub name: String,
  /// Chordwise vortex spacing.
  pub chordwise: VortexSpacing,
  /// Spanwise vortex spacing for the whole surface. If absent, every section
  /// has to give its own.
  pub spanwise: Option<VortexSpacing>,
  /// Whether the surface is duplicated about a y = const plane.
  pub mirror: bool,
  /// The y of the mirror plane.
  pub mirror_plane: Option<f64>,
  /// Scale factors applied to the sections.
  pub scale: Option<Vector3<f64>>,
  /// Translation applied to the sections.
  pub translate: Option<Vector3<f64>>,
  /// Incidence added to every section, degrees.
  pub incidence: Option<f64>,
  /// The surface sheds no wake.
  pub no_wake: bool,
  /// The surface isn't affected by the freestream.
  pub no_freestream: bool,
  /// The surface's loads aren't counted in the totals.
  pub no_load: bool,
  /// Profile drag polar for the whole surface.
  pub profile_drag: Option<ProfileDragSettings>,
  /// The sections, from one tip or root to the other.
  pub sections: Vec<Section>
}

impl Surface {
  /// Creates a surface with no optional keywords.
  pub fn new<S: Into<String>>(name: S, chordwise: VortexSpacing) -> Self {
    return Self {
      name: name.into(),
      chordwise,
      spanwise: None,
      mirror: false,
      mirror_plane: None,
      scale: None,
      translate: None,
      incidence: None,
      no_wake: false,
      no_freestream: false,
      no_load: false,
      profile_drag: None,
      sections: Vec::new()
    };
  }

  /// The surface's lines.
  fn lines(&self, out: &mut Vec<Line>) -> Result<()> {
    if self.sections.len() < 2 {
      return Err(Error::config(format!(
        "surface {} needs at least 2 sections, has {}",
        self.name,
        self.sections.len()
      )));
    }
    let mut values = spacing_fields(&self.chordwise);
    if let Some(ref s) = self.spanwise {
      values.extend(spacing_fields(s));
    }
    out.push(Line::Keyword("SURFACE"));
    out.push(Line::Text(self.name.clone()));
    out.push(Line::Comment("Nchordwise  Cspace  [Nspanwise  Sspace]"));
    out.push(Line::Data(values));
    out.push(Line::Blank);
    let what = format!("surface {}", self.name);
    emit_rules(vec![
      mirror_rule(&what, self.mirror, self.mirror_plane)?,
      Rule::valued("SCALE", "Xscale  Yscale  Zscale", self.scale.as_ref().map(vector_fields)),
      Rule::valued("TRANSLATE", "dX  dY  dZ", self.translate.as_ref().map(vector_fields)),
      Rule::valued("ANGLE", "dAinc", self.incidence.map(|a| fields([a]))),
      Rule::flag("NOWAKE", self.no_wake),
      Rule::flag("NOALBE", self.no_freestream),
      Rule::flag("NOLOAD", self.no_load),
      Rule::valued(
        "CDCL",
        "CL1  CD1  CL2  CD2  CL3  CD3",
        self.profile_drag.as_ref().map(drag_fields)
      )
    ], out);
    for section in self.sections.iter() {
      section.lines(out);
    }
    return Ok(());
  }
}

/// A non-lifting body, described by a shape file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Body {
  /// Name.
  pub name: String,
  /// Number of source-line nodes.
  pub node_count: usize,
  /// Node spacing parameter.
  pub node_spacing: f64,
  /// Whether the body is duplicated about a y = const plane.
  pub mirror: bool,
  /// The y of the mirror plane.
  pub mirror_plane: Option<f64>,
  /// Scale factors.
  pub scale: Option<Vector3<f64>>,
  /// Translation.
  pub translate: Option<Vector3<f64>>,
  /// Shape file name, relative to the solver's working directory.
  pub body_file: String
}

impl Body {
  /// The body's lines.
  fn lines(&self, out: &mut Vec<Line>) -> Result<()> {
    out.push(Line::Keyword("BODY"));
    out.push(Line::Text(self.name.clone()));
    out.push(Line::Comment("Nbody  Bspace"));
    out.push(Line::Data(vec![self.node_count.into(), self.node_spacing.into()]));
    out.push(Line::Blank);
    let what = format!("body {}", self.name);
    emit_rules(vec![
      mirror_rule(&what, self.mirror, self.mirror_plane)?,
      Rule::valued("SCALE", "Xscale  Yscale  Zscale", self.scale.as_ref().map(vector_fields)),
      Rule::valued("TRANSLATE", "dX  dY  dZ", self.translate.as_ref().map(vector_fields)),
      Rule::valued(
        "BFIL",
        "body file",
        Some(vec![Field::text(self.body_file.clone())])
      )
    ], out);
    return Ok(());
  }
}

/// A whole geometry file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeometryDocument {
  /// The header.
  pub header: Header,
  /// Lifting surfaces.
  pub surfaces: Vec<Surface>,
  /// Bodies.
  pub bodies: Vec<Body>
}

impl GeometryDocument {
  /// Builds the file's lines, failing on inconsistent geometry.
  pub fn lines(&self) -> Result<Vec<Line>> {
    if self.surfaces.is_empty() {
      return Err(Error::config("a geometry needs at least one surface"));
    }
    let mut out: Vec<Line> = Vec::new();
    self.header.lines(&mut out);
    for surface in self.surfaces.iter() {
      surface.lines(&mut out)?;
    }
    for body in self.bodies.iter() {
      body.lines(&mut out)?;
    }
    return Ok(out);
  }

  /// Renders the file's contents.
  pub fn render(&self) -> Result<String> {
    return Ok(render(&self.lines()?));
  }

  /// The distinct airfoil files the sections refer to.
  pub fn airfoil_files(&self) -> BTreeSet<&str> {
    return self.surfaces
      .iter()
      .flat_map(|s| s.sections.iter())
      .map(|s| s.airfoil_file.as_str())
      .collect();
  }

  /// Renders and writes the file. Nothing is written if rendering fails.
  pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
    let contents = self.render()?;
    debug!("Writing geometry file to {}", path.as_ref().display());
    std::fs::write(path, contents)?;
    return Ok(());
  }
}
