//! A command-line application to run airfoil and wing analyses through XFOIL
//! and AVL, writing the resulting tables as CSV.

#![allow(clippy::needless_return)]
#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use log::*;
use serde::Deserialize;
use wingsolve::prelude::*;

/// The arguments passed to the program.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about)]
struct Cli {
  /// Solver configuration file. If absent, solvers are looked up in PATH and
  /// airfoils in ./airfoils.
  #[arg(short = 'c', long = "config", global = true)]
  config: Option<PathBuf>,
  /// Output extra/debug info while running.
  #[arg(short = 'v', long = "verbose", global = true)]
  verbose: bool,
  /// Path to write output to. If absent, writes to standard output.
  #[arg(short = 'o', global = true)]
  output: Option<PathBuf>,
  /// The delimiter used in the CSV.
  #[arg(short = 'd', long = "delim", default_value = ",", global = true)]
  delim: char,
  /// What to do.
  #[command(subcommand)]
  command: Command
}

/// Angles of attack to run.
#[derive(Clone, Debug, Args)]
#[group(required = true, multiple = false)]
struct AlphaArgs {
  /// Explicit angles, comma-separated.
  #[arg(long = "alpha", value_delimiter = ',', allow_hyphen_values = true)]
  alpha: Vec<f64>,
  /// A range: start, end and step.
  #[arg(long = "range", num_args = 3, allow_hyphen_values = true)]
  range: Vec<f64>
}

impl AlphaArgs {
  /// Turns the arguments into a sweep.
  fn sweep(&self) -> AlphaSweep {
    if let [start, end, step] = self.range[..] {
      return AlphaSweep::Range { start, end, step };
    }
    return AlphaSweep::List(self.alpha.clone());
  }
}

/// The subcommands.
#[derive(Clone, Debug, Subcommand)]
enum Command {
  /// Computes the 2-D polar of an airfoil.
  Airfoil {
    /// Name of the airfoil, looked up as <name>.dat in the airfoil directory.
    name: String,
    /// Reynolds number. If absent, the analysis is inviscid.
    #[arg(long = "reynolds")]
    reynolds: Option<f64>,
    /// Maximum viscous iterations.
    #[arg(long = "iter")]
    iterations: Option<u32>,
    /// The angles.
    #[command(flatten)]
    alphas: AlphaArgs
  },
  /// Computes the 3-D polar of a wing.
  Wing {
    /// The wing description file.
    wing: PathBuf,
    /// The angles.
    #[command(flatten)]
    alphas: AlphaArgs
  },
  /// Computes the spanwise lift distribution of a wing at one condition. With
  /// no angle of attack, the wing is trimmed for level (or banked) flight.
  Spanwise {
    /// The wing description file.
    wing: PathBuf,
    /// Angle of attack.
    #[arg(long = "alpha", allow_hyphen_values = true)]
    alpha: Option<f64>,
    /// Bank angle.
    #[arg(long = "bank", allow_hyphen_values = true)]
    bank: Option<f64>,
    /// Flight speed.
    #[arg(long = "velocity")]
    velocity: Option<f64>
  },
  /// Writes the AVL input files for a wing without running anything.
  Input {
    /// The wing description file.
    wing: PathBuf,
    /// Directory to write wing.avl (and wing.mass) into.
    directory: PathBuf
  }
}

/// Settings for deriving per-section tuning from 2-D polars.
#[derive(Clone, Debug, Deserialize)]
struct SectionPolars {
  /// Reynolds number for every section.
  reynolds: f64,
  /// Maximum viscous iterations.
  #[serde(default)]
  iterations: Option<u32>,
  /// The angles to run.
  alpha: AlphaSweep
}

/// A wing description file.
#[derive(Clone, Debug, Deserialize)]
struct WingFile {
  /// How to lay out the geometry file.
  #[serde(default)]
  options: WingDocumentOptions,
  /// The wing itself.
  wing: Wing,
  /// Gravitational acceleration, for the mass file.
  #[serde(default)]
  gravity: Option<f64>,
  /// Air density, for the mass file.
  #[serde(default)]
  density: Option<f64>,
  /// If present, each section is tuned from its airfoil's polar.
  #[serde(default)]
  section_polars: Option<SectionPolars>
}

/// Shorthand for this program's results.
type CliResult<T> = Result<T, Box<dyn StdError>>;

/// Reads and checks a wing description file.
fn read_wing_file(path: &Path) -> CliResult<WingFile> {
  info!("Reading wing from {}...", path.display());
  let contents = std::fs::read_to_string(path)?;
  let file: WingFile = toml::from_str(&contents)?;
  file.wing.validate()?;
  return Ok(file);
}

/// Runs XFOIL once per distinct airfoil and returns one polar per section, in
/// the wing's section order.
fn section_polars(
  config: &SolverConfig,
  wing: &Wing,
  settings: &SectionPolars
) -> CliResult<Vec<AirfoilPolarTable>> {
  let viscous = ViscousSettings {
    reynolds: settings.reynolds,
    iterations: settings.iterations
  };
  let mut xfoil = XfoilSession::start(config, Some(viscous), Cancellation::new())?;
  let mut by_airfoil: BTreeMap<&str, AirfoilPolarTable> = BTreeMap::new();
  for section in wing.sections.iter() {
    let name = section.airfoil.name.as_str();
    if !by_airfoil.contains_key(name) {
      let polar = xfoil.polar(&section.airfoil, &settings.alpha)?;
      by_airfoil.insert(name, polar);
    }
  }
  xfoil.close()?;
  let mut polars = Vec::new();
  for section in wing.sections.iter() {
    if let Some(p) = by_airfoil.get(section.airfoil.name.as_str()) {
      polars.push(p.clone());
    }
  }
  return Ok(polars);
}

/// Builds the AVL documents for a wing file.
fn documents(
  config: &SolverConfig,
  file: &WingFile
) -> CliResult<(GeometryDocument, Option<MassDocument>)> {
  let polars = match file.section_polars {
    Some(ref settings) => section_polars(config, &file.wing, settings)?,
    None => Vec::new()
  };
  let geometry = GeometryDocument::from_wing(&file.wing, &file.options, &polars)?;
  let mass = if file.wing.mass_properties.is_some() {
    Some(MassDocument::from_wing(&file.wing, file.gravity, file.density)?)
  } else {
    None
  };
  return Ok((geometry, mass));
}

/// Writes a table as CSV, with its column names as the header.
fn write_table<S: Schema, W: Write>(
  wtr: &mut csv::Writer<W>,
  table: &Table<S>
) -> CliResult<()> {
  if let Some(label) = table.label() {
    info!("Writing {} rows of {}...", table.len(), label);
  }
  wtr.write_record(table.columns())?;
  for row in table.rows() {
    wtr.write_record(row.iter().map(|x| x.to_string()))?;
  }
  wtr.flush()?;
  return Ok(());
}

/// Does what the arguments say.
fn run(args: &Cli) -> CliResult<()> {
  let config = match args.config {
    Some(ref p) => SolverConfig::from_file(p)?,
    None => SolverConfig::default()
  };
  // init the csv writer
  let output: BufWriter<Box<dyn Write>> = BufWriter::new(
    if let Some(ref op) = args.output {
      Box::new(File::create(op)?)
    } else {
      Box::new(io::stdout())
    }
  );
  let delim_byte: u8 = u8::try_from(args.delim)
    .map_err(|_| "delimiter must be a single-byte character")?;
  let mut wtr = csv::WriterBuilder::new()
    .delimiter(delim_byte)
    .from_writer(output);
  match args.command {
    Command::Airfoil { ref name, reynolds, iterations, ref alphas } => {
      let viscous = reynolds.map(|reynolds| ViscousSettings { reynolds, iterations });
      let mut xfoil = XfoilSession::start(&config, viscous, Cancellation::new())?;
      let polar = xfoil.polar(&Airfoil::new(name.as_str()), &alphas.sweep());
      // always quit the solver, even when the analysis failed
      let closed = xfoil.close();
      write_table(&mut wtr, &polar?)?;
      closed?;
    },
    Command::Wing { ref wing, ref alphas } => {
      let file = read_wing_file(wing)?;
      let (geometry, _) = documents(&config, &file)?;
      let table = AvlRunner::new(&config).polar(&geometry, None, &alphas.sweep())?;
      write_table(&mut wtr, &table)?;
    },
    Command::Spanwise { ref wing, alpha, bank, velocity } => {
      let file = read_wing_file(wing)?;
      let (geometry, mass) = documents(&config, &file)?;
      let condition = FlightCondition { alpha, bank_angle: bank, velocity };
      let analysis = AvlRunner::new(&config)
        .spanwise(&geometry, mass.as_ref(), &condition)?;
      for row in analysis.totals.rows() {
        info!(
          "Alpha = {:.3}, CL = {:.5}, CD = {:.5}, Cm = {:.5}",
          row[0], row[1], row[2], row[3]
        );
      }
      write_table(&mut wtr, &analysis.distribution)?;
    },
    Command::Input { ref wing, ref directory } => {
      let file = read_wing_file(wing)?;
      let (geometry, mass) = documents(&config, &file)?;
      std::fs::create_dir_all(directory)?;
      geometry.write_to(directory.join("wing.avl"))?;
      if let Some(m) = mass {
        m.write_to(directory.join("wing.mass"))?;
      }
      info!("Wrote input files to {}.", directory.display());
    }
  }
  return Ok(());
}

fn main() {
  // init cli stuff
  let args = Cli::parse();
  let log_level = if args.verbose {
    LevelFilter::Debug
  } else {
    LevelFilter::Info
  };
  env_logger::builder().filter_level(log_level).init();
  if let Err(e) = run(&args) {
    error!("{}", e);
    std::process::exit(1);
  }
}
