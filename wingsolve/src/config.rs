//! This module contains the solver configuration, which is normally read from a
//! TOML file. Every field has a default, so an empty file is a valid config.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};
use crate::geometry::AirfoilLibrary;

/// How to run one solver.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SolverBinary {
  /// The executable. Looked up in PATH if it's a bare name.
  pub binary: PathBuf,
  /// Arguments placed before the ones the driver passes, e.g. when the solver
  /// is started through a wrapper.
  #[serde(default)]
  pub args: Vec<String>,
  /// If set, runs (or session exchanges) taking longer than this are killed.
  #[serde(default)]
  pub timeout_secs: Option<f64>
}

impl SolverBinary {
  /// Creates a new solver binary description with no timeout.
  pub fn new<P: AsRef<Path>>(binary: P) -> Self {
    return Self {
      binary: binary.as_ref().to_path_buf(),
      args: Vec::new(),
      timeout_secs: None
    };
  }

  /// Sets the timeout.
  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout_secs = Some(timeout.as_secs_f64());
    return self;
  }

  /// The timeout, if any. Non-positive values mean no timeout.
  pub fn timeout(&self) -> Option<Duration> {
    return self.timeout_secs
      .filter(|t| *t > 0.0)
      .and_then(|t| Duration::try_from_secs_f64(t).ok());
  }

  /// Checks the timeout is one a clock can measure.
  fn validate(&self, solver: &str) -> Result<()> {
    if let Some(t) = self.timeout_secs {
      if t > 0.0 && Duration::try_from_secs_f64(t).is_err() {
        return Err(Error::config(format!("{} timeout of {} s is out of range", solver, t)));
      }
    }
    return Ok(());
  }
}

/// Default AVL binary.
fn default_avl() -> SolverBinary {
  return SolverBinary::new("avl");
}

/// Default XFOIL binary.
fn default_xfoil() -> SolverBinary {
  return SolverBinary::new("xfoil");
}

/// Configuration for both solvers and the files they need.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
  /// The vortex-lattice solver.
  #[serde(default = "default_avl")]
  pub avl: SolverBinary,
  /// The 2-D panel solver.
  #[serde(default = "default_xfoil")]
  pub xfoil: SolverBinary,
  /// Where airfoil coordinate files are.
  pub airfoils: AirfoilLibrary,
  /// Where scratch directories are created. The system's temporary directory
  /// is used if absent.
  pub scratch_root: Option<PathBuf>
}

impl Default for SolverConfig {
  fn default() -> Self {
    return Self {
      avl: default_avl(),
      xfoil: default_xfoil(),
      airfoils: AirfoilLibrary::default(),
      scratch_root: None
    };
  }
}

impl SolverConfig {
  /// Parses a configuration from TOML text.
  pub fn from_toml(text: &str) -> Result<Self> {
    let config: Self = toml::from_str(text)
      .map_err(|e| Error::config(format!("bad solver configuration: {}", e)))?;
    config.avl.validate("avl")?;
    config.xfoil.validate("xfoil")?;
    return Ok(config);
  }

  /// Reads a configuration from a TOML file.
  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    debug!("Reading solver configuration from {}", path.display());
    let text = std::fs::read_to_string(path).map_err(|e| Error::config(
      format!("could not read {}: {}", path.display(), e)
    ))?;
    return Self::from_toml(&text);
  }
}
