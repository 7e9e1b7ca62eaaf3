//! This module drives the 2-D panel solver through a long-lived interactive
//! session, so several airfoils can be analysed by the same process.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::{SolverBinary, SolverConfig};
use crate::driver::process::ProcessTransport;
use crate::driver::scratch::ScratchDir;
use crate::driver::session::{PromptSession, Transport};
use crate::driver::{AlphaSweep, Cancellation};
use crate::errors::{Error, Result};
use crate::geometry::{Airfoil, AirfoilLibrary};
use crate::output::xfoil::polar;
use crate::tables::AirfoilPolarTable;
use crate::util::fmt_real;

/// Solver name for messages.
const SOLVER: &str = "XFOIL";

/// Command that ends the session.
const QUIT: &str = "QUIT";

/// Viscous analysis settings. They apply to the whole session.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViscousSettings {
  /// Chord Reynolds number.
  pub reynolds: f64,
  /// Maximum boundary layer iterations per point. Solver default if absent.
  #[serde(default)]
  pub iterations: Option<u32>
}

/// The polar file name for the n-th analysis in a session.
fn polar_file_name(n: usize) -> String {
  return format!("polar_{:03}.txt", n);
}

/// The commands for one analysis. Viscous settings are only sent when given,
/// which a session does for its first analysis.
pub fn analysis_script(
  airfoil_file: &str,
  polar_file: &str,
  sweep: &AlphaSweep,
  viscous: Option<&ViscousSettings>
) -> Result<Vec<String>> {
  let mut script = vec![
    format!("LOAD {}", airfoil_file),
    "PANE".to_string(),
    "OPER".to_string()
  ];
  if let Some(v) = viscous {
    script.push(format!("VISC {}", fmt_real(v.reynolds)));
    if let Some(n) = v.iterations {
      script.push(format!("ITER {}", n));
    }
  }
  script.push("PACC".to_string());
  script.push(polar_file.to_string());
  script.push(String::new());
  match sweep {
    AlphaSweep::List(_) => {
      for alpha in sweep.angles()? {
        script.push(format!("ALFA {}", fmt_real(alpha)));
      }
    },
    AlphaSweep::Range { start, end, step } => {
      // validates the range
      sweep.angles()?;
      script.push(format!(
        "ASEQ {} {} {}",
        fmt_real(*start),
        fmt_real(*end),
        fmt_real(*step)
      ));
    }
  }
  script.push("PACC".to_string());
  script.push(String::new());
  return Ok(script);
}

/// A running panel solver.
pub struct XfoilSession<T: Transport = ProcessTransport> {
  /// The conversation.
  session: PromptSession<T>,
  /// Where the airfoils are staged and polars written.
  scratch: ScratchDir,
  /// Where airfoil files come from.
  airfoils: AirfoilLibrary,
  /// Viscous settings, if any.
  viscous: Option<ViscousSettings>,
  /// How many analyses were run.
  analyses: usize
}

impl XfoilSession<ProcessTransport> {
  /// Starts the solver in a fresh scratch directory.
  pub fn start(
    config: &SolverConfig,
    viscous: Option<ViscousSettings>,
    cancel: Cancellation
  ) -> Result<Self> {
    let scratch = ScratchDir::new(config.scratch_root.as_deref())?;
    let transport = ProcessTransport::spawn(SOLVER, &config.xfoil, &[], scratch.path())?;
    return Self::with_transport(transport, scratch, config, viscous, cancel);
  }
}

impl<T: Transport> XfoilSession<T> {
  /// Starts a session over any transport, running in `scratch`.
  pub fn with_transport(
    transport: T,
    scratch: ScratchDir,
    config: &SolverConfig,
    viscous: Option<ViscousSettings>,
    cancel: Cancellation
  ) -> Result<Self> {
    let binary: &SolverBinary = &config.xfoil;
    let session = PromptSession::open(SOLVER, transport, binary.timeout(), cancel)?;
    info!("{} session started.", SOLVER);
    return Ok(Self {
      session,
      scratch,
      airfoils: config.airfoils.clone(),
      viscous,
      analyses: 0
    });
  }

  /// The scratch directory the solver runs in.
  pub fn scratch(&self) -> &ScratchDir {
    return &self.scratch;
  }

  /// The underlying conversation.
  pub fn session(&self) -> &PromptSession<T> {
    return &self.session;
  }

  /// The table label for an airfoil.
  fn label(&self, airfoil: &Airfoil) -> String {
    let regime = match self.viscous {
      Some(v) => format!("Re={:.3e}", v.reynolds),
      None => "Inviscid".to_string()
    };
    return format!("{} | 2D | Airfoil {} | {}", SOLVER, airfoil.name, regime);
  }

  /// Computes an airfoil's polar.
  pub fn polar(
    &mut self,
    airfoil: &Airfoil,
    sweep: &AlphaSweep
  ) -> Result<AirfoilPolarTable> {
    let source = self.airfoils.locate(airfoil)?;
    let airfoil_file = airfoil.file_name();
    self.scratch.stage(&source, &airfoil_file)?;
    let polar_file = polar_file_name(self.analyses);
    self.scratch.remove(&polar_file)?;
    let viscous = if self.analyses == 0 { self.viscous } else { None };
    let script = analysis_script(&airfoil_file, &polar_file, sweep, viscous.as_ref())?;
    info!("Running {} polar for {}...", SOLVER, airfoil.name);
    self.analyses += 1;
    for command in script.iter() {
      let answer = self.session.exchange(command)?;
      debug!("{} ->\n{}", SOLVER, answer);
    }
    let report = self.scratch.read_output(&polar_file)?;
    // the report is in memory now, so the session's directory doesn't grow
    self.scratch.remove(&polar_file)?;
    self.scratch.remove(&airfoil_file)?;
    let table = polar(&report).map_err(Error::from)?;
    return Ok(table.with_label(self.label(airfoil)));
  }

  /// Quits the solver, waits for it, and removes the scratch directory.
  pub fn close(mut self) -> Result<()> {
    let finished = self.session.finish(QUIT);
    // the directory goes away either way
    let closed = self.scratch.close();
    finished?;
    closed?;
    info!("{} session closed.", SOLVER);
    return Ok(());
  }
}
