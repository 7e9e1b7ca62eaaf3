//! This module contains the error types for describing wings, writing solver
//! inputs, running solvers and reading their reports back.
//!
//! Configuration and missing-input errors always come up before a solver is
//! spawned. Execution and parse errors come up after it ran. Nothing in here
//! is ever retried -- that's the caller's business.

use std::error::Error as StdError;
use std::fmt::Display;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use subprocess::PopenError;

/// Shorthand for results coming out of this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The errors that can come up anywhere in this crate.
#[derive(Debug, derive_more::From)]
pub enum Error {
  /// The geometry or the serialization request makes no sense.
  #[from(ignore)]
  Configuration(String),
  /// A file that should exist before running a solver doesn't.
  #[from(ignore)]
  MissingInput(PathBuf),
  /// The solver couldn't be run, or it didn't finish properly.
  SolverExecution(ExecutionError),
  /// The solver's output didn't look like what we expected.
  Parse(ParseError)
}

impl Error {
  /// Shorthand for a configuration error.
  pub fn config<S: Into<String>>(msg: S) -> Self {
    return Self::Configuration(msg.into());
  }
}

impl Display for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return match self {
      Self::Configuration(msg) => write!(f, "configuration error: {}", msg),
      Self::MissingInput(p) => write!(
        f,
        "missing input file at {}",
        p.display()
      ),
      Self::SolverExecution(e) => write!(f, "solver execution error: {}", e),
      Self::Parse(e) => write!(f, "parse error: {}", e),
    };
  }
}

impl StdError for Error {
  fn source(&self) -> Option<&(dyn StdError + 'static)> {
    return match self {
      Self::SolverExecution(e) => Some(e),
      Self::Parse(e) => Some(e),
      _ => None
    };
  }
}

impl From<io::Error> for Error {
  fn from(value: io::Error) -> Self {
    return Self::SolverExecution(ExecutionError::Io(value));
  }
}

/// The ways running a solver can go wrong.
#[derive(Debug)]
pub enum ExecutionError {
  /// The solver binary couldn't be spawned at all.
  Spawn {
    /// The binary we tried to run.
    binary: PathBuf,
    /// What the OS told us.
    reason: String
  },
  /// Some I/O failed while talking to the solver or handling its files.
  Io(io::Error),
  /// The solver exited, but not successfully.
  Exited {
    /// Which solver.
    solver: &'static str,
    /// Its exit status, as text.
    status: String
  },
  /// The solver took longer than it was allowed to.
  TimedOut {
    /// Which solver.
    solver: &'static str,
    /// The limit that was exceeded.
    after: Duration
  },
  /// The run was cancelled by the caller.
  Cancelled {
    /// Which solver.
    solver: &'static str
  },
  /// The solver finished but the results file isn't there.
  MissingOutput(PathBuf),
  /// The interactive session is closed, or the solver went away mid-session.
  SessionClosed {
    /// Which solver.
    solver: &'static str
  }
}

impl Display for ExecutionError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return match self {
      Self::Spawn { binary, reason } => write!(
        f,
        "could not spawn {}, reason: {}",
        binary.display(),
        reason
      ),
      Self::Io(e) => write!(f, "I/O error: {}", e),
      Self::Exited { solver, status } => write!(
        f,
        "{} exited abnormally ({})",
        solver,
        status
      ),
      Self::TimedOut { solver, after } => write!(
        f,
        "{} did not finish within {:.1} s",
        solver,
        after.as_secs_f64()
      ),
      Self::Cancelled { solver } => write!(f, "{} run was cancelled", solver),
      Self::MissingOutput(p) => write!(
        f,
        "expected results file {} was not produced",
        p.display()
      ),
      Self::SessionClosed { solver } => write!(
        f,
        "the {} session is closed",
        solver
      ),
    };
  }
}

impl StdError for ExecutionError {
  fn source(&self) -> Option<&(dyn StdError + 'static)> {
    if let Self::Io(e) = self {
      return Some(e);
    }
    return None;
  }
}

impl From<io::Error> for ExecutionError {
  fn from(value: io::Error) -> Self {
    return Self::Io(value);
  }
}

impl From<PopenError> for ExecutionError {
  fn from(value: PopenError) -> Self {
    return match value {
      PopenError::IoError(e) => Self::Io(e),
      other => Self::Io(io::Error::new(io::ErrorKind::Other, other.to_string()))
    };
  }
}

/// A solver report (or a table built from one) didn't match what we expected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
  /// The pattern, header phrase or schema that failed to match.
  pub pattern: String,
  /// What exactly went wrong.
  pub detail: String
}

impl ParseError {
  /// Creates a new parse error.
  pub fn new<P: Into<String>, D: Into<String>>(pattern: P, detail: D) -> Self {
    return Self { pattern: pattern.into(), detail: detail.into() };
  }
}

impl Display for ParseError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return write!(f, "expected \"{}\": {}", self.pattern, self.detail);
  }
}

impl StdError for ParseError {}
