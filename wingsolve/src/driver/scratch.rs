//! Per-run scratch directories. Each run gets its own, so concurrent runs never
//! share file names, and it's removed when dropped whatever happened.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::TempDir;

use crate::errors::{Error, ExecutionError, Result};

/// Prefix for scratch directory names.
const SCRATCH_PREFIX: &str = "wingsolve-";

/// A temporary working directory for one solver run or session.
#[derive(Debug)]
pub struct ScratchDir {
  /// The directory, removed on drop.
  dir: TempDir
}

impl ScratchDir {
  /// Creates a directory under `root`, or under the system's temporary
  /// directory if there's no root.
  pub fn new(root: Option<&Path>) -> Result<Self> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(SCRATCH_PREFIX);
    let dir = match root {
      Some(r) => {
        fs::create_dir_all(r)?;
        builder.tempdir_in(r)?
      },
      None => builder.tempdir()?
    };
    debug!("Created scratch directory {}", dir.path().display());
    return Ok(Self { dir });
  }

  /// The directory's path.
  pub fn path(&self) -> &Path {
    return self.dir.path();
  }

  /// Full path of a file in the directory.
  pub fn join<S: AsRef<Path>>(&self, name: S) -> PathBuf {
    return self.dir.path().join(name);
  }

  /// Writes a file into the directory.
  pub fn write<C: AsRef<[u8]>>(&self, name: &str, contents: C) -> Result<PathBuf> {
    let path = self.join(name);
    fs::write(&path, contents)?;
    return Ok(path);
  }

  /// Copies a file into the directory under a new name. A missing source is
  /// reported as missing input.
  pub fn stage(&self, source: &Path, name: &str) -> Result<PathBuf> {
    if !source.is_file() {
      return Err(Error::MissingInput(source.to_path_buf()));
    }
    let path = self.join(name);
    fs::copy(source, &path)?;
    return Ok(path);
  }

  /// Checks a file exists in the directory.
  pub fn require(&self, name: &str) -> Result<PathBuf> {
    let path = self.join(name);
    if !path.is_file() {
      return Err(Error::MissingInput(path));
    }
    return Ok(path);
  }

  /// Reads a file the solver should have written.
  pub fn read_output(&self, name: &str) -> Result<String> {
    let path = self.join(name);
    if !path.is_file() {
      return Err(ExecutionError::MissingOutput(path).into());
    }
    return crate::output::read_report(&path);
  }

  /// Removes a file if it exists, so the solver doesn't find a stale one.
  pub fn remove(&self, name: &str) -> Result<()> {
    let path = self.join(name);
    if path.exists() {
      fs::remove_file(path)?;
    }
    return Ok(());
  }

  /// Removes the directory, reporting failures instead of just logging them.
  pub fn close(self) -> Result<()> {
    let path = self.dir.path().to_path_buf();
    self.dir.close().map_err(|e| {
      warn!("Could not remove scratch directory {}: {}", path.display(), e);
      return Error::from(e);
    })?;
    debug!("Removed scratch directory {}", path.display());
    return Ok(());
  }
}
