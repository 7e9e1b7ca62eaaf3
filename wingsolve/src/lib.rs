//! This library connects a wing geometry model to two external aerodynamic
//! solvers: AVL, a vortex-lattice solver for whole wings, and XFOIL, a panel
//! solver for airfoils.
//!
//! It writes the solvers' input files, drives them as child processes through
//! scripted command sequences, and reads their text reports back into tables
//! with a fixed set of columns.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]
#![allow(clippy::needless_return)]

pub mod config;
pub mod driver;
pub mod errors;
pub mod geometry;
pub mod input;
pub mod output;
pub mod tables;
pub mod util;

pub mod prelude {
  //! Re-exports the most commonly used things.
  pub use crate::config::*;
  pub use crate::driver::avl::{AvlRunner, FlightCondition, SpanwiseAnalysis};
  pub use crate::driver::xfoil::{ViscousSettings, XfoilSession};
  pub use crate::driver::{AlphaSweep, Cancellation};
  pub use crate::errors::{Error, ExecutionError, ParseError};
  pub use crate::geometry::*;
  pub use crate::input::{
    GeometryDocument,
    MassDocument,
    WingDocumentOptions
  };
  pub use crate::tables::*;
}

#[cfg(test)]
mod tests;
