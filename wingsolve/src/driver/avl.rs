//! This module runs the vortex-lattice solver in batch mode: a fresh process
//! per run, with the whole command script piped in at once.

use std::path::PathBuf;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::{SolverBinary, SolverConfig};
use crate::driver::process::{run_batch, BatchRun};
use crate::driver::scratch::ScratchDir;
use crate::driver::{AlphaSweep, Cancellation};
use crate::errors::{Error, Result};
use crate::geometry::AirfoilLibrary;
use crate::input::{GeometryDocument, MassDocument};
use crate::output::avl::{strip_forces, total_forces};
use crate::tables::{CoefficientTable, SpanwiseDistributionTable};
use crate::util::fmt_real;

/// Solver name for messages.
const SOLVER: &str = "AVL";

/// Geometry file name in the scratch directory.
pub const GEOMETRY_FILE: &str = "wing.avl";

/// Mass file name in the scratch directory.
pub const MASS_FILE: &str = "wing.mass";

/// Total forces report name in the scratch directory.
pub const FORCES_FILE: &str = "forces.txt";

/// Strip forces report name in the scratch directory.
pub const STRIPS_FILE: &str = "strips.txt";

/// Console log name in the scratch directory.
pub const LOG_FILE: &str = "avl.log";

/// A single flight condition. An angle of attack alone runs the wing at that
/// angle. A bank angle (or no angle of attack at all) trims the wing for level
/// or banked flight instead, which needs the mass file.
#[derive(Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FlightCondition {
  /// Angle of attack, in degrees.
  pub alpha: Option<f64>,
  /// Bank angle, in degrees.
  pub bank_angle: Option<f64>,
  /// Flight speed, in file units.
  pub velocity: Option<f64>
}

impl FlightCondition {
  /// A fixed angle of attack.
  pub fn at_alpha(alpha: f64) -> Self {
    return Self { alpha: Some(alpha), ..Self::default() };
  }

  /// Whether this condition needs the trim setup.
  fn is_trimmed(&self) -> bool {
    return self.alpha.is_none() || self.bank_angle.is_some();
  }
}

/// The results of a single-condition run.
#[derive(Clone, Debug, PartialEq)]
pub struct SpanwiseAnalysis {
  /// Whole-wing coefficients (one row).
  pub totals: CoefficientTable,
  /// Strip values along the span.
  pub distribution: SpanwiseDistributionTable
}

/// The mass-file loading commands, if there's a mass file.
fn mass_commands(has_mass: bool) -> Vec<String> {
  if !has_mass {
    return Vec::new();
  }
  return vec![
    "MASS".to_string(),
    MASS_FILE.to_string(),
    "MSET".to_string(),
    "0".to_string()
  ];
}

/// The commands for a polar sweep. Every pass writes its total forces to the
/// same file; from the second pass on the solver asks whether to append to the
/// existing file, which gets answered with "A".
pub fn polar_script(angles: &[f64], has_mass: bool) -> Vec<String> {
  let mut script = mass_commands(has_mass);
  script.push("OPER".to_string());
  for (k, alpha) in angles.iter().enumerate() {
    script.push(format!("A A {}", fmt_real(*alpha)));
    script.push("X".to_string());
    script.push("FT".to_string());
    script.push(FORCES_FILE.to_string());
    if k > 0 {
      script.push("A".to_string());
    }
  }
  script.push(String::new());
  script.push("QUIT".to_string());
  return script;
}

/// The commands for one condition, ending with total and strip force reports.
pub fn condition_script(condition: &FlightCondition, has_mass: bool) -> Vec<String> {
  let mut script = mass_commands(has_mass);
  script.push("OPER".to_string());
  if condition.is_trimmed() {
    script.push("C1".to_string());
    script.push(format!("B {}", fmt_real(condition.bank_angle.unwrap_or(0.0))));
    if let Some(v) = condition.velocity {
      script.push(format!("V {}", fmt_real(v)));
    }
    script.push(String::new());
  }
  if let Some(alpha) = condition.alpha {
    script.push(format!("A A {}", fmt_real(alpha)));
  }
  script.extend([
    "X",
    "FT",
    FORCES_FILE,
    "FS",
    STRIPS_FILE,
    "",
    "QUIT"
  ].map(String::from));
  return script;
}

/// Runs the vortex-lattice solver.
#[derive(Clone, Debug)]
pub struct AvlRunner {
  /// How to run it.
  binary: SolverBinary,
  /// Where airfoil files come from.
  airfoils: AirfoilLibrary,
  /// Where scratch directories go.
  scratch_root: Option<PathBuf>,
  /// Raised to stop a run.
  cancel: Cancellation
}

impl AvlRunner {
  /// A runner using a configuration.
  pub fn new(config: &SolverConfig) -> Self {
    return Self {
      binary: config.avl.clone(),
      airfoils: config.airfoils.clone(),
      scratch_root: config.scratch_root.clone(),
      cancel: Cancellation::new()
    };
  }

  /// Uses a given cancellation flag.
  pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
    self.cancel = cancel;
    return self;
  }

  /// Runs a polar sweep, one total forces block per angle.
  pub fn polar(
    &self,
    geometry: &GeometryDocument,
    mass: Option<&MassDocument>,
    sweep: &AlphaSweep
  ) -> Result<CoefficientTable> {
    let angles = sweep.angles()?;
    info!("Running {} polar with {} angle(s)...", SOLVER, angles.len());
    let script = polar_script(&angles, mass.is_some());
    let outputs = self.run(geometry, mass, &script, &[FORCES_FILE])?;
    let table = total_forces(&outputs[0])?;
    return Ok(table.with_label(self.label(geometry)));
  }

  /// Runs a single condition and reads both the totals and the strip forces.
  pub fn spanwise(
    &self,
    geometry: &GeometryDocument,
    mass: Option<&MassDocument>,
    condition: &FlightCondition
  ) -> Result<SpanwiseAnalysis> {
    if condition.is_trimmed() && mass.is_none() {
      return Err(Error::config("trimmed or banked flight needs mass properties"));
    }
    info!("Running {} spanwise analysis...", SOLVER);
    let script = condition_script(condition, mass.is_some());
    let outputs = self.run(geometry, mass, &script, &[FORCES_FILE, STRIPS_FILE])?;
    let label = self.label(geometry);
    return Ok(SpanwiseAnalysis {
      totals: total_forces(&outputs[0])?.with_label(label.clone()),
      distribution: strip_forces(&outputs[1])?.with_label(label)
    });
  }

  /// The label for tables out of this solver.
  fn label(&self, geometry: &GeometryDocument) -> String {
    return format!("{} | 3D | {}", SOLVER, geometry.header.title);
  }

  /// Stages everything, runs the script, and returns the contents of the
  /// requested output files. The scratch directory goes away in every case.
  fn run(
    &self,
    geometry: &GeometryDocument,
    mass: Option<&MassDocument>,
    script: &[String],
    outputs: &[&str]
  ) -> Result<Vec<String>> {
    // render first, so bad geometry fails before anything touches the disk
    let geometry_text = geometry.render()?;
    let mass_text = mass.map(MassDocument::render);
    let scratch = ScratchDir::new(self.scratch_root.as_deref())?;
    for file in geometry.airfoil_files() {
      let source = self.airfoils.directory.join(file);
      scratch.stage(&source, file)?;
    }
    scratch.write(GEOMETRY_FILE, geometry_text)?;
    if let Some(text) = mass_text {
      scratch.write(MASS_FILE, text)?;
    }
    scratch.require(GEOMETRY_FILE)?;
    let script = script.join("\n") + "\n";
    debug!("{} script:\n{}", SOLVER, script);
    run_batch(&BatchRun {
      solver: SOLVER,
      binary: &self.binary,
      args: &[GEOMETRY_FILE],
      cwd: scratch.path(),
      script: &script,
      log_name: LOG_FILE
    }, &self.cancel)?;
    let contents = outputs
      .iter()
      .map(|name| scratch.read_output(name))
      .collect::<Result<Vec<_>>>()?;
    scratch.close()?;
    return Ok(contents);
  }
}
