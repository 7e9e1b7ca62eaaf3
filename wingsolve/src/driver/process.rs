//! This module handles the solver child processes themselves: spawning them,
//! feeding them, waiting on them with a deadline, and killing them when they
//! overstay.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, warn};
use subprocess::{Exec, ExitStatus, Popen, PopenError, Redirection};

use crate::config::SolverBinary;
use crate::driver::session::{Received, Transport};
use crate::driver::{Cancellation, POLL_INTERVAL};
use crate::errors::{ExecutionError, Result};

/// Size of the chunks the reader thread pulls from the solver's output.
const READ_CHUNK: usize = 4096;

/// Turns a spawn failure into an error naming the binary.
fn spawn_error(binary: &SolverBinary, e: PopenError) -> ExecutionError {
  return ExecutionError::Spawn {
    binary: binary.binary.clone(),
    reason: e.to_string()
  };
}

/// Builds the command line for a solver run in a directory.
fn command(binary: &SolverBinary, args: &[&str], cwd: &Path) -> Exec {
  return Exec::cmd(&binary.binary)
    .args(binary.args.as_slice())
    .args(args)
    .cwd(cwd);
}

/// Kills a child and reaps it, so nothing is left running or zombied.
fn kill_and_reap(popen: &mut Popen, solver: &'static str) {
  if let Err(e) = popen.kill() {
    warn!("Could not kill {}: {}", solver, e);
  }
  if let Err(e) = popen.wait() {
    warn!("Could not reap {}: {}", solver, e);
  }
}

/// Waits for a child to exit, polling so a timeout or a cancellation can kill
/// it. On either, the child is killed and reaped before returning.
pub(crate) fn wait_with_deadline(
  popen: &mut Popen,
  solver: &'static str,
  timeout: Option<Duration>,
  cancel: &Cancellation
) -> Result<ExitStatus> {
  let started = Instant::now();
  loop {
    if let Some(status) = popen.wait_timeout(POLL_INTERVAL)
      .map_err(ExecutionError::from)? {
      return Ok(status);
    }
    if cancel.is_cancelled() {
      debug!("Cancelling {}...", solver);
      kill_and_reap(popen, solver);
      return Err(ExecutionError::Cancelled { solver }.into());
    }
    if let Some(limit) = timeout {
      if started.elapsed() >= limit {
        error!("{} did not finish in time, killing it.", solver);
        kill_and_reap(popen, solver);
        return Err(ExecutionError::TimedOut { solver, after: limit }.into());
      }
    }
  }
}

/// Fails on an unsuccessful exit status.
fn check_status(solver: &'static str, status: ExitStatus) -> Result<()> {
  if status.success() {
    return Ok(());
  }
  return Err(ExecutionError::Exited {
    solver,
    status: format!("{:?}", status)
  }.into());
}

/// A batch run: everything the solver needs to do for one invocation.
pub(crate) struct BatchRun<'a> {
  /// Which solver, for messages.
  pub(crate) solver: &'static str,
  /// How to run it.
  pub(crate) binary: &'a SolverBinary,
  /// Arguments after the configured ones.
  pub(crate) args: &'a [&'a str],
  /// Working directory.
  pub(crate) cwd: &'a Path,
  /// Commands to pipe in, already newline-joined.
  pub(crate) script: &'a str,
  /// File name, in the working directory, the console output goes to.
  pub(crate) log_name: &'a str
}

/// Writes a script into a child's input on its own thread, so a solver that
/// stops reading can't hold up the caller past its deadline. The input is
/// closed when the thread is done with it.
fn feed_input(
  solver: &'static str,
  mut stdin: File,
  script: &str
) -> io::Result<JoinHandle<io::Result<()>>> {
  let script = script.to_string();
  return thread::Builder::new()
    .name(format!("{}_feeder", solver))
    .spawn(move || stdin.write_all(script.as_bytes()));
}

/// Runs a solver to completion, piping a whole script in and sending all its
/// console output to a log file.
pub(crate) fn run_batch(run: &BatchRun, cancel: &Cancellation) -> Result<()> {
  let log = File::create(run.cwd.join(run.log_name))?;
  debug!("Spawning {}...", run.solver);
  let mut popen = command(run.binary, run.args, run.cwd)
    .stdin(Redirection::Pipe)
    .stdout(Redirection::File(log))
    .stderr(Redirection::Merge)
    .popen()
    .map_err(|e| spawn_error(run.binary, e))?;
  let feeder = match popen.stdin.take() {
    Some(stdin) => match feed_input(run.solver, stdin, run.script) {
      Ok(handle) => Some(handle),
      Err(e) => {
        kill_and_reap(&mut popen, run.solver);
        return Err(ExecutionError::Io(e).into());
      }
    },
    None => None
  };
  // on timeout or cancel the child is dead, so the feeder hits a broken pipe
  // and finishes on its own
  let status = wait_with_deadline(
    &mut popen,
    run.solver,
    run.binary.timeout(),
    cancel
  )?;
  debug!("{} exited with {:?}", run.solver, status);
  if let Some(handle) = feeder {
    match handle.join() {
      Ok(Ok(())) => {},
      Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {
        warn!("{} stopped reading its input early.", run.solver);
      },
      Ok(Err(e)) => return Err(ExecutionError::Io(e).into()),
      Err(_) => warn!("The {} feeder thread panicked.", run.solver)
    }
  }
  return check_status(run.solver, status);
}

/// A running interactive solver, talked to through pipes. Output is pulled by
/// a reader thread so reads can time out.
pub struct ProcessTransport {
  /// Which solver, for messages.
  solver: &'static str,
  /// The child.
  popen: Popen,
  /// The child's input. None once closed.
  stdin: Option<File>,
  /// Chunks of output from the reader thread.
  output: Receiver<String>,
  /// The reader thread.
  reader: Option<JoinHandle<()>>
}

impl ProcessTransport {
  /// Spawns a solver in a working directory.
  pub fn spawn(
    solver: &'static str,
    binary: &SolverBinary,
    args: &[&str],
    cwd: &Path
  ) -> Result<Self> {
    debug!("Spawning {} session...", solver);
    let mut popen = command(binary, args, cwd)
      .stdin(Redirection::Pipe)
      .stdout(Redirection::Pipe)
      .stderr(Redirection::Merge)
      .popen()
      .map_err(|e| spawn_error(binary, e))?;
    let stdin = popen.stdin.take();
    let mut stdout = match popen.stdout.take() {
      Some(f) => f,
      None => {
        kill_and_reap(&mut popen, solver);
        return Err(ExecutionError::SessionClosed { solver }.into());
      }
    };
    let (tx, rx) = mpsc::channel::<String>();
    let spawned = thread::Builder::new()
      .name(format!("{}_reader", solver))
      .spawn(move || {
        let mut buf = [0u8; READ_CHUNK];
        loop {
          match stdout.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
              let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
              if tx.send(chunk).is_err() {
                break;
              }
            }
          }
        }
      });
    let reader = match spawned {
      Ok(handle) => handle,
      Err(e) => {
        kill_and_reap(&mut popen, solver);
        return Err(ExecutionError::Io(e).into());
      }
    };
    return Ok(Self {
      solver,
      popen,
      stdin,
      output: rx,
      reader: Some(reader)
    });
  }
}

impl Transport for ProcessTransport {
  fn send(&mut self, line: &str) -> io::Result<()> {
    let stdin = self.stdin.as_mut().ok_or_else(|| io::Error::new(
      io::ErrorKind::BrokenPipe,
      "input already closed"
    ))?;
    stdin.write_all(line.as_bytes())?;
    stdin.write_all(b"\n")?;
    return stdin.flush();
  }

  fn receive(&mut self, wait: Duration) -> io::Result<Received> {
    return Ok(match self.output.recv_timeout(wait) {
      Ok(chunk) => Received::Text(chunk),
      Err(RecvTimeoutError::Timeout) => Received::Nothing,
      Err(RecvTimeoutError::Disconnected) => Received::Closed
    });
  }

  fn shutdown(
    &mut self,
    timeout: Option<Duration>,
    cancel: &Cancellation
  ) -> Result<()> {
    self.stdin = None;
    let status = wait_with_deadline(&mut self.popen, self.solver, timeout, cancel)?;
    if let Some(handle) = self.reader.take() {
      if handle.join().is_err() {
        warn!("The {} reader thread panicked.", self.solver);
      }
    }
    debug!("{} session exited with {:?}", self.solver, status);
    return check_status(self.solver, status);
  }
}

impl Drop for ProcessTransport {
  fn drop(&mut self) {
    self.stdin = None;
    if self.popen.poll().is_none() {
      warn!("Killing {} session that was never shut down.", self.solver);
      kill_and_reap(&mut self.popen, self.solver);
    }
  }
}
