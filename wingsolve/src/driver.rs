//! This module implements the solver drivers: they stage input files in a
//! scratch directory, run the solver through a scripted sequence of commands,
//! and read back the files it wrote.
//!
//! AVL is run in batch mode (one process per run, the whole script piped in at
//! once). XFOIL is kept alive in an interactive session, with each command
//! waiting for the solver's prompt before the next one goes out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

pub mod avl;
pub mod process;
pub mod scratch;
pub mod session;
pub mod xfoil;

/// How long blocking waits sleep between checks of the child, the clock and
/// the cancellation flag.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Maximum number of angles in a sweep, to catch runaway ranges.
const MAX_SWEEP_POINTS: usize = 10_000;

/// Slack, in steps, for a range end that rounding leaves just short.
const RANGE_TOLERANCE: f64 = 1e-9;

/// A flag another thread can raise to stop a running solver. Clones share the
/// same flag.
#[derive(Clone, Debug, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
  /// A new, un-raised flag.
  pub fn new() -> Self {
    return Self::default();
  }

  /// Raises the flag. Whatever is running notices within a poll interval.
  pub fn cancel(&self) {
    self.0.store(true, Ordering::SeqCst);
  }

  /// Whether the flag was raised.
  pub fn is_cancelled(&self) -> bool {
    return self.0.load(Ordering::SeqCst);
  }
}

/// Angles of attack to run, in degrees.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AlphaSweep {
  /// An explicit list, run in order.
  List(Vec<f64>),
  /// An inclusive range.
  Range {
    /// First angle.
    start: f64,
    /// Last angle.
    end: f64,
    /// Increment, with the sign pointing from start to end.
    step: f64
  }
}

impl AlphaSweep {
  /// Expands the sweep into the angles it covers.
  pub fn angles(&self) -> Result<Vec<f64>> {
    let angles = match self {
      Self::List(v) => v.clone(),
      Self::Range { start, end, step } => {
        let (start, end, step) = (*start, *end, *step);
        if !(start.is_finite() && end.is_finite() && step.is_finite()) {
          return Err(Error::config("alpha range bounds must be finite"));
        }
        if step == 0.0 || (end - start) * step < 0.0 {
          return Err(Error::config(format!(
            "alpha step {} never gets from {} to {}",
            step,
            start,
            end
          )));
        }
        // the end is inclusive but never overshot
        let steps = ((end - start) / step + RANGE_TOLERANCE).floor();
        if steps >= MAX_SWEEP_POINTS as f64 {
          return Err(Error::config(format!(
            "alpha range from {} to {} by {} has too many points",
            start,
            end,
            step
          )));
        }
        let n = steps as usize + 1;
        (0..n).map(|i| start + step * i as f64).collect()
      }
    };
    if angles.is_empty() {
      return Err(Error::config("no angles of attack to run"));
    }
    if angles.iter().any(|a| !a.is_finite()) {
      return Err(Error::config("angles of attack must be finite"));
    }
    return Ok(angles);
  }
}
