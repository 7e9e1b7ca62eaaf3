//! This module implements the prompt-driven conversation with an interactive
//! solver. Every command is one line, and its answer is everything the solver
//! prints until it shows a prompt again.

use std::io;
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::driver::{Cancellation, POLL_INTERVAL};
use crate::errors::{ExecutionError, Result};

/// Endings of the main command prompts, e.g. " XFOIL   c>" or "OPERv   c>".
const COMMAND_PROMPTS: [&str; 1] = ["c>"];

/// Endings of the prompts asking for a value within a command, e.g. for a file
/// name or a number.
const SUBMENU_PROMPTS: [&str; 3] = ["s>", "r>", "i>"];

/// What a read from the solver got.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Received {
  /// Some output.
  Text(String),
  /// Nothing yet.
  Nothing,
  /// The solver's output is closed; it's gone.
  Closed
}

/// A line-oriented channel to a running solver. Implemented over pipes for
/// real solvers, and by scripted fakes in tests.
pub trait Transport {
  /// Sends one line of input. The newline is added here.
  fn send(&mut self, line: &str) -> io::Result<()>;
  /// Waits up to `wait` for more output.
  fn receive(&mut self, wait: Duration) -> io::Result<Received>;
  /// Closes the input and waits for the solver to exit.
  fn shutdown(&mut self, timeout: Option<Duration>, cancel: &Cancellation) -> Result<()>;
}

/// The kinds of prompt a solver shows.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Prompt {
  /// Waiting for a command.
  Command,
  /// Waiting for a value asked for by the last command.
  Submenu
}

impl Prompt {
  /// Checks whether some output ends in a prompt.
  pub fn detect(output: &str) -> Option<Self> {
    let tail = output.trim_end();
    if COMMAND_PROMPTS.iter().any(|p| tail.ends_with(p)) {
      return Some(Self::Command);
    }
    if SUBMENU_PROMPTS.iter().any(|p| tail.ends_with(p)) {
      return Some(Self::Submenu);
    }
    return None;
  }
}

/// Where the conversation is.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
  /// The solver showed a command prompt.
  AwaitingCommand,
  /// The solver asked for a value.
  AwaitingSubmenu,
  /// The solver is gone, or the session was finished.
  Closed
}

impl From<Prompt> for SessionState {
  fn from(value: Prompt) -> Self {
    return match value {
      Prompt::Command => Self::AwaitingCommand,
      Prompt::Submenu => Self::AwaitingSubmenu
    };
  }
}

/// A conversation with an interactive solver.
pub struct PromptSession<T: Transport> {
  /// Which solver, for messages.
  solver: &'static str,
  /// The channel.
  transport: T,
  /// Where we are.
  state: SessionState,
  /// Longest wait for a prompt.
  timeout: Option<Duration>,
  /// Raised to give up waiting.
  cancel: Cancellation
}

impl<T: Transport> PromptSession<T> {
  /// Starts a conversation, reading the solver's banner up to its first prompt.
  pub fn open(
    solver: &'static str,
    transport: T,
    timeout: Option<Duration>,
    cancel: Cancellation
  ) -> Result<Self> {
    let mut session = Self {
      solver,
      transport,
      state: SessionState::AwaitingCommand,
      timeout,
      cancel
    };
    let banner = session.read_until_prompt()?;
    trace!("{} banner:\n{}", solver, banner);
    return Ok(session);
  }

  /// The current state.
  pub fn state(&self) -> SessionState {
    return self.state;
  }

  /// Sends a line, then returns everything printed up to the next prompt.
  pub fn exchange(&mut self, command: &str) -> Result<String> {
    if self.state == SessionState::Closed {
      return Err(ExecutionError::SessionClosed { solver: self.solver }.into());
    }
    debug!("{} <- {:?}", self.solver, command);
    if let Err(e) = self.transport.send(command) {
      self.state = SessionState::Closed;
      if e.kind() == io::ErrorKind::BrokenPipe {
        return Err(ExecutionError::SessionClosed { solver: self.solver }.into());
      }
      return Err(ExecutionError::Io(e).into());
    }
    return self.read_until_prompt();
  }

  /// Reads output until a prompt shows up, the solver leaves, time runs out or
  /// the session is cancelled. Anything but a prompt closes the session.
  fn read_until_prompt(&mut self) -> Result<String> {
    let started = Instant::now();
    let mut buffer = String::new();
    loop {
      if self.cancel.is_cancelled() {
        self.state = SessionState::Closed;
        return Err(ExecutionError::Cancelled { solver: self.solver }.into());
      }
      if let Some(limit) = self.timeout {
        if started.elapsed() >= limit {
          self.state = SessionState::Closed;
          return Err(ExecutionError::TimedOut {
            solver: self.solver,
            after: limit
          }.into());
        }
      }
      let received = self.transport.receive(POLL_INTERVAL).map_err(|e| {
        self.state = SessionState::Closed;
        return ExecutionError::Io(e);
      })?;
      match received {
        Received::Text(chunk) => {
          buffer.push_str(&chunk);
          if let Some(prompt) = Prompt::detect(&buffer) {
            self.state = prompt.into();
            return Ok(buffer);
          }
        },
        Received::Nothing => continue,
        Received::Closed => {
          self.state = SessionState::Closed;
          return Err(ExecutionError::SessionClosed { solver: self.solver }.into());
        }
      }
    }
  }

  /// Sends the quit command, if still possible, and waits for the solver to
  /// exit.
  pub fn finish(&mut self, quit: &str) -> Result<()> {
    if self.state != SessionState::Closed {
      debug!("{} <- {:?}", self.solver, quit);
      if let Err(e) = self.transport.send(quit) {
        warn!("Could not send {:?} to {}: {}", quit, self.solver, e);
      }
      self.state = SessionState::Closed;
    }
    return self.transport.shutdown(self.timeout, &self.cancel);
  }

  /// The underlying transport.
  pub fn transport(&self) -> &T {
    return &self.transport;
  }
}
