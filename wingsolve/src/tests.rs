use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};

use crate::config::*;
use crate::driver::avl::*;
use crate::driver::scratch::ScratchDir;
use crate::driver::session::*;
use crate::driver::xfoil::*;
use crate::driver::{AlphaSweep, Cancellation};
use crate::errors::*;
use crate::geometry::*;
use crate::input::*;
use crate::output;
use crate::tables::*;
use crate::util::*;

/// AVL total forces, three run cases appended out of order.
const AVL_FORCES: &str = include_str!("../testdata/avl_forces.txt");

/// AVL strip forces for a wing and its mirrored copy.
const AVL_STRIPS: &str = include_str!("../testdata/avl_strips.txt");

/// An XFOIL polar accumulation file.
const XFOIL_POLAR: &str = include_str!("../testdata/xfoil_polar.txt");

/// A three-section half-wing, stored out of spanwise order.
fn test_wing() -> Wing {
  let section = |y: f64, chord: f64| WingSection::new(
    Point3::new(0.0, y, 0.0),
    chord,
    0.0,
    Airfoil::new("naca2412")
  );
  return Wing::new(vec![
    section(0.5, 0.4),
    section(1.25, 0.3),
    section(0.0, 0.5)
  ]).unwrap();
}

/// The same polar as the fixture.
fn test_polar() -> AirfoilPolarTable {
  return output::xfoil::polar(XFOIL_POLAR).unwrap();
}

#[test]
fn test_fmt_real() {
  assert_eq!(fmt_real(1.0), "1.0");
  assert_eq!(fmt_real(0.25), "0.25");
  assert_eq!(fmt_real(-3.0), "-3.0");
  assert_eq!(fmt_real(-0.0), "0.0");
  assert_eq!(fmt_real(100.0), "100.0");
  assert_eq!(fmt_real(1e-7), "0.0000001");
  assert!(!fmt_real(1e21).contains('e'));
}

#[test]
fn test_parse_real() {
  assert_eq!(parse_real(" 1.5 "), Some(1.5));
  assert_eq!(parse_real("-2.0D-1"), Some(-0.2));
  assert_eq!(parse_real("******"), None);
  assert_eq!(parse_real(""), None);
  assert_eq!(parse_real("NaN"), None);
}

#[test]
fn test_wing_requires_two_sections() {
  let lone = WingSection::new(Point3::origin(), 1.0, 0.0, Airfoil::new("a"));
  assert!(matches!(Wing::new(vec![lone]), Err(Error::Configuration(_))));
  assert!(matches!(Wing::new(Vec::new()), Err(Error::Configuration(_))));
}

#[test]
fn test_wing_geometry() {
  let wing = test_wing();
  assert_relative_eq!(wing.span().unwrap(), 2.5);
  assert_relative_eq!(wing.planform_area().unwrap(), 0.975, epsilon = 1e-12);
  let mac = 2.0 / 0.975 * (0.5 * 0.61 / 3.0 + 0.75 * 0.37 / 3.0);
  assert_relative_eq!(wing.mean_aerodynamic_chord().unwrap(), mac, epsilon = 1e-12);
  assert_relative_eq!(wing.aspect_ratio().unwrap(), 6.25 / 0.975, epsilon = 1e-12);
  assert_relative_eq!(wing.root_section().unwrap().chord, 0.5);
}

#[test]
fn test_lone_section_has_no_planform() {
  let mut wing = test_wing();
  wing.sections.truncate(1);
  assert!(matches!(wing.planform_area(), Err(Error::Configuration(_))));
  assert!(matches!(wing.mean_aerodynamic_chord(), Err(Error::Configuration(_))));
  assert!(matches!(wing.aspect_ratio(), Err(Error::Configuration(_))));
}

#[test]
fn test_chord_distribution() {
  let wing = test_wing();
  // exact at the sections
  for s in wing.sections.iter() {
    assert_eq!(wing.chord_distribution(s.y()).unwrap(), s.chord);
  }
  assert_relative_eq!(wing.chord_distribution(0.25).unwrap(), 0.45, epsilon = 1e-12);
  assert_relative_eq!(wing.chord_distribution(0.875).unwrap(), 0.35, epsilon = 1e-12);
  // held outside the range
  assert_eq!(wing.chord_distribution(-1.0).unwrap(), 0.5);
  assert_eq!(wing.chord_distribution(2.0).unwrap(), 0.3);
}

#[test]
fn test_geometry_ignores_storage_order() {
  let wing = test_wing();
  let mut reversed = wing.clone();
  reversed.sections.reverse();
  let mut sorted = wing.clone();
  sorted.sections.sort_by(|a, b| a.y().total_cmp(&b.y()));
  for other in [reversed, sorted] {
    assert_eq!(wing.span().unwrap(), other.span().unwrap());
    assert_relative_eq!(
      wing.planform_area().unwrap(),
      other.planform_area().unwrap(),
      epsilon = 1e-12
    );
    assert_relative_eq!(
      wing.mean_aerodynamic_chord().unwrap(),
      other.mean_aerodynamic_chord().unwrap(),
      epsilon = 1e-12
    );
  }
}

#[test]
fn test_degenerate_wing() {
  let at_root = |chord: f64| WingSection::new(
    Point3::origin(),
    chord,
    0.0,
    Airfoil::new("a")
  );
  let wing = Wing::new(vec![at_root(1.0), at_root(0.5)]).unwrap();
  assert_eq!(wing.span().unwrap(), 0.0);
  assert_eq!(wing.planform_area().unwrap(), 0.0);
  assert_eq!(wing.mean_aerodynamic_chord().unwrap(), 0.0);
  assert_eq!(wing.aspect_ratio().unwrap(), 0.0);
}

#[test]
fn test_table_validation() {
  let sorted = CoefficientTable::from_rows([
    [5.0, 1.0, 0.1, 0.0],
    [-5.0, 0.2, 0.05, 0.0],
    [0.0, 0.6, 0.07, 0.0]
  ]).unwrap();
  assert_eq!(sorted.column("alpha").unwrap(), vec![-5.0, 0.0, 5.0]);
  assert_eq!(sorted.get(2, "lift_coefficient"), Some(1.0));
  assert!(sorted.column("beta").is_none());
  let narrow = CoefficientTable::from_rows([[1.0, 2.0, 3.0]]);
  assert_eq!(narrow.unwrap_err().pattern, Coefficients::NAME);
  assert!(CoefficientTable::from_rows([[f64::NAN, 0.0, 0.0, 0.0]]).is_err());
  assert!(CoefficientTable::from_rows(Vec::<Vec<f64>>::new()).is_err());
}

#[test]
fn test_polar_projection() {
  let polar = test_polar().with_label("test");
  let coefs = polar.to_coefficients();
  assert_eq!(coefs.columns(), Coefficients::COLUMNS);
  assert_eq!(coefs.len(), polar.len());
  assert_eq!(coefs.label(), Some("test"));
  assert_eq!(coefs.column("moment_coefficient"), polar.column("moment_coefficient"));
}

#[test]
fn test_avl_total_forces() {
  let table = output::avl::total_forces(AVL_FORCES).unwrap();
  assert_eq!(table.column("alpha").unwrap(), vec![-5.0, 0.0, 5.0]);
  assert_eq!(
    table.column("lift_coefficient").unwrap(),
    vec![0.48873, 0.90117, 1.31012]
  );
  assert_eq!(
    table.column("drag_coefficient").unwrap(),
    vec![0.00712, 0.02489, 0.05431]
  );
  assert_eq!(
    table.column("moment_coefficient").unwrap(),
    vec![-0.30811, -0.25903, -0.21044]
  );
  let err = output::avl::total_forces("nothing to see here").unwrap_err();
  assert!(err.pattern.contains("CLtot"));
}

#[test]
fn test_avl_strip_forces() {
  let table = output::avl::strip_forces(AVL_STRIPS).unwrap();
  assert_eq!(table.len(), 8);
  let y = table.column("spanwise_location").unwrap();
  assert!(y.windows(2).all(|w| w[0] <= w[1]));
  assert_eq!(y[0], -1.1529);
  assert_eq!(y[7], 1.1529);
  assert_eq!(table.row(7), Some(vec![1.1529, 0.31, 0.71]));
  assert_eq!(table.row(4), Some(vec![0.0488, 0.5, 0.97]));
  let err = output::avl::strip_forces(AVL_FORCES).unwrap_err();
  assert_eq!(err.pattern, "Strip Forces referred to Strip Area, Chord");
}

#[test]
fn test_overlapping_strip_tables() {
  let columns = "    j     Xle      Yle      Zle      Chord    Area     c cl      \
    ai      cl_norm  cl       cd       cdv    cm_c/4    cm_LE  C.P.x/c";
  let row = |j: usize, y: f64| format!(
    "{:5} 0.0 {} 0.0 0.3 0.01 0.2 0.0 0.6 0.6 0.0 0.0 -0.1 -0.2 0.5",
    j,
    y
  );
  let mut report = Vec::new();
  for ys in [[0.9, 0.1, 0.5], [0.7, 0.3, 0.2]] {
    report.push(" Strip Forces referred to Strip Area, Chord".to_string());
    report.push(columns.to_string());
    for (j, y) in ys.iter().enumerate() {
      report.push(row(j + 1, *y));
    }
    report.push(String::new());
  }
  let table = output::avl::strip_forces(&report.join("\n")).unwrap();
  assert_eq!(
    table.column("spanwise_location").unwrap(),
    vec![0.1, 0.2, 0.3, 0.5, 0.7, 0.9]
  );
}

#[test]
fn test_xfoil_polar() {
  let table = test_polar();
  assert_eq!(table.column("alpha").unwrap(), vec![-2.0, 0.0, 2.0, 4.0]);
  assert_eq!(table.row(1), Some(vec![0.0, 1.1497, 0.01381, 0.00804, -0.2498]));
  let err = output::xfoil::polar("no polar\n").unwrap_err();
  assert_eq!(err.pattern, "------ --------");
  let header_only = XFOIL_POLAR.lines().take(12).collect::<Vec<_>>().join("\n");
  assert!(output::xfoil::polar(&header_only).is_err());
}

#[test]
fn test_rule_emission() {
  let mut out = Vec::new();
  emit_rules(vec![
    Rule::valued("SCALE", "Xscale  Yscale  Zscale", None),
    Rule::flag("NOWAKE", false),
    Rule::plain("CDp", None)
  ], &mut out);
  assert!(out.is_empty());
  emit_rules(vec![
    Rule::valued("ANGLE", "dAinc", Some(vec![Field::Real(2.0)])),
    Rule::flag("NOWAKE", true),
    Rule::plain("CDp", Some(vec![Field::Real(0.01)]))
  ], &mut out);
  assert_eq!(
    render(&out),
    "ANGLE\n#dAinc\n2.0\n\nNOWAKE\n\n#CDp\n0.01\n"
  );
}

#[test]
fn test_surface_optional_blocks() {
  let section = |y: f64| Section {
    location: Point3::new(0.0, y, 0.0),
    chord: 1.0,
    incidence: 0.0,
    spanwise: None,
    airfoil_file: "a.dat".to_string(),
    lift_slope_scaling: None,
    profile_drag: None,
    controls: Vec::new()
  };
  let header = Header {
    title: "bare".to_string(),
    mach: 0.0,
    y_symmetry: Symmetry::Ignore,
    z_symmetry: Symmetry::Ignore,
    z_plane: 0.0,
    reference_area: 1.0,
    reference_chord: 1.0,
    reference_span: 1.0,
    reference_point: Point3::origin(),
    profile_drag: None
  };
  let mut surface = Surface::new("S", VortexSpacing::new(8, 1.0));
  surface.sections = vec![section(0.0), section(1.0)];
  let mut doc = GeometryDocument {
    header,
    surfaces: vec![surface],
    bodies: Vec::new()
  };
  let bare = doc.render().unwrap();
  for keyword in ["YDUPLICATE", "SCALE", "TRANSLATE", "ANGLE", "NOWAKE",
    "NOALBE", "NOLOAD", "CDCL", "CLAF", "CONTROL", "#CDp", "BODY"] {
    assert!(!bare.lines().any(|l| l == keyword), "unexpected {}", keyword);
  }
  assert!(bare.lines().any(|l| l == "AFILE"));
  let surface = &mut doc.surfaces[0];
  surface.translate = Some(Vector3::new(0.5, 0.0, 0.0));
  surface.no_load = true;
  surface.sections[0].controls.push(Control {
    name: "aileron".to_string(),
    gain: 1.0,
    hinge_x: 0.75,
    hinge_axis: Vector3::zeros(),
    deflection: Deflection::Inverse
  });
  let full = doc.render().unwrap();
  assert!(full.contains("TRANSLATE\n#dX  dY  dZ\n0.5  0.0  0.0\n"));
  assert!(full.lines().any(|l| l == "NOLOAD"));
  assert!(full.contains("aileron  1.0  0.75  0.0  0.0  0.0  -1"));
  assert!(full.lines().all(|l| !l.starts_with(' ')));
}

#[test]
fn test_document_from_wing() {
  let wing = test_wing();
  let doc = GeometryDocument::from_wing(
    &wing,
    &WingDocumentOptions::default(),
    &[]
  ).unwrap();
  let header = &doc.header;
  assert_relative_eq!(header.reference_area, wing.planform_area().unwrap());
  assert_relative_eq!(header.reference_chord, wing.mean_aerodynamic_chord().unwrap());
  assert_relative_eq!(header.reference_span, 2.5);
  assert_eq!(header.reference_point, Point3::new(0.125, 0.0, 0.0));
  let text = doc.render().unwrap();
  assert!(text.contains("YDUPLICATE\n#Ydupl\n0.0\n"));
  assert!(text.contains("#IYsym  IZsym  Zsym\n0  0  0.0\n"));
  // reading the section lines back gives the sections in spanwise order
  let lines = text.lines().collect::<Vec<_>>();
  let reparsed = lines
    .iter()
    .enumerate()
    .filter(|(_, l)| **l == "SECTION")
    .map(|(i, _)| lines[i + 2]
      .split_whitespace()
      .map(|v| v.parse::<f64>().unwrap())
      .collect::<Vec<_>>())
    .collect::<Vec<_>>();
  assert_eq!(reparsed.len(), 3);
  for (values, section) in reparsed.iter().zip(wing.sorted_sections()) {
    assert_eq!(values[1], section.location.y);
    assert_eq!(values[3], section.chord);
  }
  assert_eq!(doc.airfoil_files().into_iter().collect::<Vec<_>>(), vec!["naca2412.dat"]);
}

/// The numbers on the data line after each `#<comment>` line.
fn values_after(text: &str, comment: &str) -> Vec<Vec<f64>> {
  let marker = format!("#{}", comment);
  let lines = text.lines().collect::<Vec<_>>();
  return lines
    .iter()
    .enumerate()
    .filter(|(_, l)| **l == marker)
    .map(|(i, _)| lines[i + 1]
      .split_whitespace()
      .map(|v| v.parse::<f64>().unwrap())
      .collect())
    .collect();
}

#[test]
fn test_document_values_verbatim() {
  let mut wing = test_wing();
  let drag = ProfileDragSettings {
    cl1: -0.2, cd1: 0.0125, cl2: 0.45, cd2: 0.0081, cl3: 1.35, cd3: 0.021
  };
  wing.sections[0].lift_slope_scaling = Some(0.93);
  wing.sections[0].profile_drag = Some(drag);
  let options = WingDocumentOptions {
    mach: 0.15,
    profile_drag: Some(0.0045),
    reference_point: Some(Point3::new(0.11, 0.0, -0.02)),
    ..WingDocumentOptions::default()
  };
  let mut doc = GeometryDocument::from_wing(&wing, &options, &[]).unwrap();
  doc.surfaces[0].translate = Some(Vector3::new(0.3, 0.0, 0.07));
  let text = doc.render().unwrap();
  let header = &doc.header;
  assert_eq!(values_after(&text, "Mach"), vec![vec![0.15]]);
  assert_eq!(values_after(&text, "Sref  Cref  Bref"), vec![vec![
    header.reference_area,
    header.reference_chord,
    header.reference_span
  ]]);
  assert_eq!(values_after(&text, "Xref  Yref  Zref"), vec![vec![0.11, 0.0, -0.02]]);
  assert_eq!(values_after(&text, "CDp"), vec![vec![0.0045]]);
  assert_eq!(values_after(&text, "dX  dY  dZ"), vec![vec![0.3, 0.0, 0.07]]);
  assert_eq!(values_after(&text, "dCL/da scaling factor"), vec![vec![0.93]]);
  assert_eq!(
    values_after(&text, "CL1  CD1  CL2  CD2  CL3  CD3"),
    vec![vec![-0.2, 0.0125, 0.45, 0.0081, 1.35, 0.021]]
  );
  // the tuned section is the middle one once sorted by span
  let sections = values_after(&text, "Xle  Yle  Zle  Chord  Ainc  [Nspanwise  Sspace]");
  assert_eq!(sections.len(), 3);
  assert_eq!(&sections[1][..5], &[0.0, 0.5, 0.0, 0.4, 0.0]);
  let claf = text.find("CLAF").unwrap();
  assert_eq!(text[..claf].matches("SECTION").count(), 2);
}

#[test]
fn test_section_polars() {
  let mut wing = test_wing();
  let polars = vec![test_polar(), test_polar(), test_polar()];
  let tuned = ProfileDragSettings {
    cl1: 0.1, cd1: 0.02, cl2: 0.5, cd2: 0.01, cl3: 1.0, cd3: 0.03
  };
  // the tip's own tuning wins
  wing.sections[1].profile_drag = Some(tuned);
  wing.sections[1].lift_slope_scaling = Some(0.9);
  let options = WingDocumentOptions::default();
  let doc = GeometryDocument::from_wing(&wing, &options, &polars).unwrap();
  let sections = &doc.surfaces[0].sections;
  let derived = ProfileDragSettings::from_polar(&polars[0]);
  assert_eq!(sections[0].profile_drag, Some(derived));
  assert_eq!(sections[2].profile_drag, Some(tuned));
  assert_eq!(sections[2].lift_slope_scaling, Some(0.9));
  assert_eq!(sections[0].lift_slope_scaling, lift_slope_scaling(&polars[0]));
  let short = GeometryDocument::from_wing(&wing, &options, &polars[..2]);
  assert!(matches!(short, Err(Error::Configuration(_))));
}

#[test]
fn test_polar_derived_tuning() {
  let polar = test_polar();
  let drag = ProfileDragSettings::from_polar(&polar);
  assert_eq!((drag.cl1, drag.cd1), (0.9120, 0.01425));
  assert_eq!((drag.cl2, drag.cd2), (1.1497, 0.01381));
  assert_eq!((drag.cl3, drag.cd3), (1.6012, 0.01688));
  let slope = (1.6012 - 1.3791) / 2.0_f64.to_radians();
  assert_relative_eq!(
    lift_slope_scaling(&polar).unwrap(),
    slope / (2.0 * std::f64::consts::PI),
    epsilon = 1e-9
  );
  let linear_free = AirfoilPolarTable::from_rows([
    [6.0, 1.2, 0.02, 0.01, -0.1],
    [8.0, 1.3, 0.03, 0.02, -0.1]
  ]).unwrap();
  assert_eq!(lift_slope_scaling(&linear_free), None);
}

#[test]
fn test_mirror_needs_plane() {
  let wing = test_wing();
  let mut doc = GeometryDocument::from_wing(
    &wing,
    &WingDocumentOptions::default(),
    &[]
  ).unwrap();
  doc.surfaces[0].mirror_plane = None;
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("wing.avl");
  assert!(matches!(doc.write_to(&path), Err(Error::Configuration(_))));
  assert!(!path.exists());
  doc.surfaces[0].mirror = false;
  assert!(doc.write_to(&path).is_ok());
  assert!(!fs::read_to_string(&path).unwrap().contains("YDUPLICATE"));
}

#[test]
fn test_mass_document() {
  let wing = test_wing();
  assert!(MassDocument::from_wing(&wing, None, None).is_err());
  let wing = wing.with_mass(MassProperties::point(2.0, Point3::new(0.1, 0.0, 0.0)));
  let text = MassDocument::from_wing(&wing, Some(9.81), None).unwrap().render();
  let lines = text.lines().collect::<Vec<_>>();
  assert_eq!(&lines[..3], &["Lunit = 1.0 m", "Munit = 1.0 kg", "Tunit = 1.0 s"]);
  assert_eq!(lines[4], "g   = 9.81");
  assert!(!text.contains("rho"));
  let header = lines.iter().position(|l| l.starts_with("#  mass")).unwrap();
  let row = lines[header + 1].split_whitespace().collect::<Vec<_>>();
  assert_eq!(row, vec!["2.0", "0.1", "0.0", "0.0", "0.0", "0.0", "0.0", "0.0", "0.0", "0.0"]);
  // columns line up with their names
  assert_eq!(lines[header].find("x"), lines[header + 1].find("0.1"));
}

#[test]
fn test_alpha_sweep() {
  let range = AlphaSweep::Range { start: -2.0, end: 4.0, step: 2.0 };
  assert_eq!(range.angles().unwrap(), vec![-2.0, 0.0, 2.0, 4.0]);
  let down = AlphaSweep::Range { start: 4.0, end: 0.0, step: -2.0 };
  assert_eq!(down.angles().unwrap(), vec![4.0, 2.0, 0.0]);
  let wrong_way = AlphaSweep::Range { start: 0.0, end: 4.0, step: -1.0 };
  assert!(wrong_way.angles().is_err());
  assert!(AlphaSweep::List(Vec::new()).angles().is_err());
}

#[test]
fn test_alpha_range_stops_at_end() {
  let uneven = AlphaSweep::Range { start: 0.0, end: 1.0, step: 0.4 };
  assert_eq!(uneven.angles().unwrap(), vec![0.0, 0.4, 0.8]);
  let tenths = AlphaSweep::Range { start: 0.0, end: 1.0, step: 0.1 }.angles().unwrap();
  assert_eq!(tenths.len(), 11);
  assert_relative_eq!(tenths[10], 1.0, epsilon = 1e-12);
  let widest = AlphaSweep::Range { start: 0.0, end: 9999.0, step: 1.0 };
  assert_eq!(widest.angles().unwrap().len(), 10_000);
  for end in [10_000.0, 1e300] {
    let huge = AlphaSweep::Range { start: 0.0, end, step: 1.0 };
    assert!(matches!(huge.angles(), Err(Error::Configuration(_))));
  }
}

#[test]
fn test_polar_script() {
  let script = polar_script(&[0.0, 2.0, 4.0], false);
  assert_eq!(script[0], "OPER");
  assert_eq!(script.iter().filter(|l| *l == "A").count(), 2);
  let first = script.iter().position(|l| l == "A A 0.0").unwrap();
  assert_eq!(&script[first..first + 5], &["A A 0.0", "X", "FT", "forces.txt", "A A 2.0"]);
  let second = script.iter().position(|l| l == "A A 2.0").unwrap();
  assert_eq!(&script[second..second + 5], &["A A 2.0", "X", "FT", "forces.txt", "A"]);
  assert_eq!(&script[script.len() - 2..], &["", "QUIT"]);
  let with_mass = polar_script(&[0.0], true);
  assert_eq!(&with_mass[..5], &["MASS", "wing.mass", "MSET", "0", "OPER"]);
}

#[test]
fn test_condition_script() {
  let fixed = condition_script(&FlightCondition::at_alpha(3.0), false);
  assert_eq!(fixed, vec![
    "OPER", "A A 3.0", "X", "FT", "forces.txt", "FS", "strips.txt", "", "QUIT"
  ]);
  let banked = FlightCondition { alpha: None, bank_angle: Some(30.0), velocity: Some(12.0) };
  let script = condition_script(&banked, true);
  assert_eq!(&script[4..9], &["OPER", "C1", "B 30.0", "V 12.0", ""]);
  assert!(!script.iter().any(|l| l.starts_with("A A")));
}

#[test]
fn test_prompt_detection() {
  assert_eq!(Prompt::detect("\n XFOIL   c>  "), Some(Prompt::Command));
  assert_eq!(Prompt::detect(" .OPERva   c> "), Some(Prompt::Command));
  assert_eq!(
    Prompt::detect("Enter  polar save filename  OR  <return> for no file   s> "),
    Some(Prompt::Submenu)
  );
  assert_eq!(Prompt::detect("Enter Reynolds number   r>"), Some(Prompt::Submenu));
  assert_eq!(Prompt::detect("Converged.\n"), None);
}

#[test]
fn test_config() {
  let empty = SolverConfig::from_toml("").unwrap();
  assert_eq!(empty, SolverConfig::default());
  assert_eq!(empty.avl.binary, PathBuf::from("avl"));
  let config = SolverConfig::from_toml(concat!(
    "scratch_root = \"/tmp/runs\"\n",
    "[xfoil]\n",
    "binary = \"/opt/xfoil\"\n",
    "timeout_secs = 2.5\n",
    "[airfoils]\n",
    "directory = \"foils\"\n"
  )).unwrap();
  assert_eq!(config.xfoil.timeout(), Some(Duration::from_millis(2500)));
  assert_eq!(config.avl.timeout(), None);
  assert_eq!(config.airfoils.directory, PathBuf::from("foils"));
  assert!(matches!(
    SolverConfig::from_toml("[avl]\nbinary = 3\n"),
    Err(Error::Configuration(_))
  ));
}

#[test]
fn test_config_timeout_range() {
  assert!(matches!(
    SolverConfig::from_toml("[avl]\nbinary = \"avl\"\ntimeout_secs = 1e30\n"),
    Err(Error::Configuration(_))
  ));
  let forever = SolverBinary { timeout_secs: Some(1e30), ..SolverBinary::new("avl") };
  assert_eq!(forever.timeout(), None);
  let negative = SolverConfig::from_toml("[xfoil]\nbinary = \"xfoil\"\ntimeout_secs = -1.0\n");
  assert_eq!(negative.unwrap().xfoil.timeout(), None);
}

/// A scripted stand-in for XFOIL. It answers with the prompts the real solver
/// shows and writes the fixture polar when accumulation is switched off.
struct FakeXfoil {
  /// Where the polar goes.
  dir: PathBuf,
  /// Every line sent.
  sent: Vec<String>,
  /// Output not yet read.
  pending: VecDeque<String>,
  /// Polar file being accumulated into.
  polar_file: Option<String>,
  /// Whether the next line answers the polar file prompt.
  expect_polar_name: bool,
  /// Whether the next line answers the dump file prompt.
  expect_dump_name: bool
}

impl FakeXfoil {
  /// A fake solver writing into a directory.
  fn new(dir: &Path) -> Self {
    return Self {
      dir: dir.to_path_buf(),
      sent: Vec::new(),
      pending: VecDeque::from(["\n XFOIL   Version 6.99\n\n XFOIL   c> ".to_string()]),
      polar_file: None,
      expect_polar_name: false,
      expect_dump_name: false
    };
  }
}

impl Transport for FakeXfoil {
  fn send(&mut self, line: &str) -> io::Result<()> {
    self.sent.push(line.to_string());
    let answer = if self.expect_polar_name {
      self.expect_polar_name = false;
      self.expect_dump_name = true;
      self.polar_file = Some(line.to_string());
      " Enter  polar dump filename  OR  <return> for no file   s> "
    } else if self.expect_dump_name {
      self.expect_dump_name = false;
      " Polar accumulation enabled\n .OPERva   c> "
    } else if line == "PACC" {
      match self.polar_file.take() {
        None => {
          self.expect_polar_name = true;
          " Enter  polar save filename  OR  <return> for no file   s> "
        },
        Some(name) => {
          fs::write(self.dir.join(name), XFOIL_POLAR)?;
          " Polar accumulation disabled\n .OPERva   c> "
        }
      }
    } else {
      "\n XFOIL   c> "
    };
    self.pending.push_back(answer.to_string());
    return Ok(());
  }

  fn receive(&mut self, _wait: Duration) -> io::Result<Received> {
    return Ok(match self.pending.pop_front() {
      Some(text) => Received::Text(text),
      None => Received::Nothing
    });
  }

  fn shutdown(&mut self, _timeout: Option<Duration>, _cancel: &Cancellation) -> Result<()> {
    return Ok(());
  }
}

/// Config pointing at a directory with one airfoil file in it.
fn config_with_airfoils(root: &Path) -> SolverConfig {
  let airfoils = root.join("airfoils");
  fs::create_dir_all(&airfoils).unwrap();
  fs::write(airfoils.join("naca2412.dat"), "NACA 2412\n1.0 0.0\n0.0 0.0\n1.0 0.0\n").unwrap();
  let mut config = SolverConfig::default();
  config.airfoils = AirfoilLibrary::new(&airfoils);
  config.scratch_root = Some(root.join("scratch"));
  config.xfoil = config.xfoil.with_timeout(Duration::from_secs(5));
  return config;
}

#[test]
fn test_xfoil_session_viscous_once() {
  let root = tempfile::tempdir().unwrap();
  let config = config_with_airfoils(root.path());
  let scratch = ScratchDir::new(config.scratch_root.as_deref()).unwrap();
  let fake = FakeXfoil::new(scratch.path());
  let viscous = ViscousSettings { reynolds: 200_000.0, iterations: Some(100) };
  let mut xfoil = XfoilSession::with_transport(
    fake,
    scratch,
    &config,
    Some(viscous),
    Cancellation::new()
  ).unwrap();
  let airfoil = Airfoil::new("naca2412");
  let first = xfoil.polar(&airfoil, &AlphaSweep::List(vec![0.0, 2.0])).unwrap();
  let sweep = AlphaSweep::Range { start: -2.0, end: 4.0, step: 2.0 };
  let second = xfoil.polar(&airfoil, &sweep).unwrap();
  // nothing is left behind between analyses
  assert_eq!(fs::read_dir(xfoil.scratch().path()).unwrap().count(), 0);
  assert_eq!(first.len(), 4);
  assert_eq!(first.column("alpha"), second.column("alpha"));
  assert_eq!(first.label(), Some("XFOIL | 2D | Airfoil naca2412 | Re=2.000e5"));
  let sent = &xfoil.session().transport().sent;
  assert_eq!(sent.iter().filter(|l| l.starts_with("VISC")).count(), 1);
  assert_eq!(sent.iter().filter(|l| l.starts_with("ITER")).count(), 1);
  assert_eq!(&sent[..8], &[
    "LOAD naca2412.dat", "PANE", "OPER", "VISC 200000.0", "ITER 100",
    "PACC", "polar_000.txt", ""
  ]);
  assert!(sent.contains(&"ALFA 2.0".to_string()));
  assert!(sent.contains(&"ASEQ -2.0 4.0 2.0".to_string()));
  assert!(sent.contains(&"polar_001.txt".to_string()));
  assert_eq!(xfoil.session().state(), SessionState::AwaitingCommand);
  xfoil.close().unwrap();
  let scratch_root = root.path().join("scratch");
  assert_eq!(fs::read_dir(scratch_root).unwrap().count(), 0);
}

#[test]
fn test_xfoil_missing_airfoil() {
  let root = tempfile::tempdir().unwrap();
  let config = config_with_airfoils(root.path());
  let scratch = ScratchDir::new(config.scratch_root.as_deref()).unwrap();
  let fake = FakeXfoil::new(scratch.path());
  let mut xfoil = XfoilSession::with_transport(
    fake,
    scratch,
    &config,
    None,
    Cancellation::new()
  ).unwrap();
  let result = xfoil.polar(&Airfoil::new("nope"), &AlphaSweep::List(vec![0.0]));
  assert!(matches!(result, Err(Error::MissingInput(_))));
  // nothing was sent for it
  assert!(xfoil.session().transport().sent.is_empty());
  xfoil.close().unwrap();
}

#[test]
fn test_session_closed_by_solver() {
  /// A solver that dies right after its banner.
  struct Dying(usize);
  impl Transport for Dying {
    fn send(&mut self, _line: &str) -> io::Result<()> {
      return Ok(());
    }
    fn receive(&mut self, _wait: Duration) -> io::Result<Received> {
      self.0 += 1;
      return Ok(if self.0 == 1 {
        Received::Text(" XFOIL   c> ".to_string())
      } else {
        Received::Closed
      });
    }
    fn shutdown(&mut self, _t: Option<Duration>, _c: &Cancellation) -> Result<()> {
      return Ok(());
    }
  }
  let mut session = PromptSession::open("XFOIL", Dying(0), None, Cancellation::new())
    .unwrap();
  let err = session.exchange("OPER").unwrap_err();
  assert!(matches!(
    err,
    Error::SolverExecution(ExecutionError::SessionClosed { .. })
  ));
  assert_eq!(session.state(), SessionState::Closed);
  assert!(session.exchange("OPER").is_err());
}

#[test]
fn test_session_cancelled() {
  /// A solver that never answers.
  struct Silent;
  impl Transport for Silent {
    fn send(&mut self, _line: &str) -> io::Result<()> {
      return Ok(());
    }
    fn receive(&mut self, _wait: Duration) -> io::Result<Received> {
      return Ok(Received::Nothing);
    }
    fn shutdown(&mut self, _t: Option<Duration>, _c: &Cancellation) -> Result<()> {
      return Ok(());
    }
  }
  let cancel = Cancellation::new();
  cancel.cancel();
  let opened = PromptSession::open("XFOIL", Silent, None, cancel);
  assert!(matches!(
    opened,
    Err(Error::SolverExecution(ExecutionError::Cancelled { .. }))
  ));
  let timed = PromptSession::open(
    "XFOIL",
    Silent,
    Some(Duration::from_millis(100)),
    Cancellation::new()
  );
  assert!(matches!(
    timed,
    Err(Error::SolverExecution(ExecutionError::TimedOut { .. }))
  ));
}

#[cfg(unix)]
mod fake_solver {
  //! Runs the batch driver against shell scripts standing in for AVL.

  use super::*;

  /// A wing with mass, its geometry and a runner for a fake solver script.
  fn setup(
    root: &Path,
    script: &str,
    timeout_secs: f64
  ) -> (AvlRunner, GeometryDocument, Wing) {
    let mut config = config_with_airfoils(root);
    let script_path = root.join("fake_avl.sh");
    fs::write(&script_path, script).unwrap();
    config.avl = SolverBinary {
      binary: PathBuf::from("/bin/sh"),
      args: vec![script_path.to_string_lossy().into_owned()],
      timeout_secs: Some(timeout_secs)
    };
    let wing = test_wing().with_mass(MassProperties::point(1.0, Point3::new(0.1, 0.0, 0.0)));
    let doc = GeometryDocument::from_wing(&wing, &WingDocumentOptions::default(), &[])
      .unwrap();
    return (AvlRunner::new(&config), doc, wing);
  }

  /// Puts a fixture somewhere the fake solver can copy it from.
  fn fixture(root: &Path, name: &str, contents: &str) -> String {
    let path = root.join(name);
    fs::write(&path, contents).unwrap();
    return path.to_string_lossy().into_owned();
  }

  /// Whether the scratch root has nothing in it.
  fn scratch_is_empty(root: &Path) -> bool {
    return fs::read_dir(root.join("scratch")).unwrap().next().is_none();
  }

  #[test]
  fn test_polar_run() {
    let root = tempfile::tempdir().unwrap();
    let forces = fixture(root.path(), "forces.fixture", AVL_FORCES);
    let script = format!(
      "test -f wing.avl || exit 3\ntest -f naca2412.dat || exit 4\n\
       cat > input.txt\ncp '{}' forces.txt\n",
      forces
    );
    let (runner, doc, _) = setup(root.path(), &script, 10.0);
    let sweep = AlphaSweep::List(vec![-5.0, 0.0, 5.0]);
    let table = runner.polar(&doc, None, &sweep).unwrap();
    assert_eq!(table.column("alpha").unwrap(), vec![-5.0, 0.0, 5.0]);
    assert_eq!(table.label(), Some("AVL | 3D | wing"));
    assert!(scratch_is_empty(root.path()));
  }

  #[test]
  fn test_spanwise_run() {
    let root = tempfile::tempdir().unwrap();
    let forces = fixture(root.path(), "forces.fixture", AVL_FORCES);
    let strips = fixture(root.path(), "strips.fixture", AVL_STRIPS);
    let script = format!(
      "test -f wing.mass || exit 3\ncat > /dev/null\ncp '{}' forces.txt\ncp '{}' strips.txt\n",
      forces,
      strips
    );
    let (runner, doc, wing) = setup(root.path(), &script, 10.0);
    let mass = MassDocument::from_wing(&wing, Some(9.81), Some(1.225)).unwrap();
    let level = FlightCondition::default();
    let analysis = runner.spanwise(&doc, Some(&mass), &level).unwrap();
    assert_eq!(analysis.distribution.len(), 8);
    assert_eq!(analysis.totals.len(), 3);
    assert!(scratch_is_empty(root.path()));
    // trimming needs mass, and that's known before anything runs
    assert!(matches!(
      runner.spanwise(&doc, None, &level),
      Err(Error::Configuration(_))
    ));
  }

  #[test]
  fn test_missing_output() {
    let root = tempfile::tempdir().unwrap();
    let (runner, doc, _) = setup(root.path(), "cat > /dev/null\n", 10.0);
    let result = runner.polar(&doc, None, &AlphaSweep::List(vec![0.0]));
    assert!(matches!(
      result,
      Err(Error::SolverExecution(ExecutionError::MissingOutput(_)))
    ));
    assert!(scratch_is_empty(root.path()));
  }

  #[test]
  fn test_abnormal_exit() {
    let root = tempfile::tempdir().unwrap();
    let (runner, doc, _) = setup(root.path(), "cat > /dev/null\nexit 2\n", 10.0);
    let result = runner.polar(&doc, None, &AlphaSweep::List(vec![0.0]));
    assert!(matches!(
      result,
      Err(Error::SolverExecution(ExecutionError::Exited { .. }))
    ));
    assert!(scratch_is_empty(root.path()));
  }

  #[test]
  fn test_missing_airfoil() {
    let root = tempfile::tempdir().unwrap();
    let (runner, mut doc, _) = setup(root.path(), "cat > /dev/null\n", 10.0);
    doc.surfaces[0].sections[1].airfoil_file = "missing.dat".to_string();
    let result = runner.polar(&doc, None, &AlphaSweep::List(vec![0.0]));
    assert!(matches!(result, Err(Error::MissingInput(_))));
    assert!(scratch_is_empty(root.path()));
  }

  #[test]
  fn test_timeout() {
    let root = tempfile::tempdir().unwrap();
    let (runner, doc, _) = setup(root.path(), "exec sleep 30\n", 0.3);
    let result = runner.polar(&doc, None, &AlphaSweep::List(vec![0.0]));
    assert!(matches!(
      result,
      Err(Error::SolverExecution(ExecutionError::TimedOut { .. }))
    ));
    assert!(scratch_is_empty(root.path()));
  }

  #[test]
  fn test_timeout_while_feeding_input() {
    let root = tempfile::tempdir().unwrap();
    let (runner, doc, _) = setup(root.path(), "exec sleep 30\n", 0.3);
    // far more script than a pipe buffers, sent to a solver that never reads
    let sweep = AlphaSweep::List((0..5000).map(|i| i as f64 * 0.001).collect());
    let started = std::time::Instant::now();
    let result = runner.polar(&doc, None, &sweep);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(matches!(
      result,
      Err(Error::SolverExecution(ExecutionError::TimedOut { .. }))
    ));
    assert!(scratch_is_empty(root.path()));
  }

  #[test]
  fn test_spawn_failure() {
    let root = tempfile::tempdir().unwrap();
    let (_, doc, _) = setup(root.path(), "", 10.0);
    let mut config = config_with_airfoils(root.path());
    config.avl = SolverBinary::new("/nonexistent/avl");
    let result = AvlRunner::new(&config).polar(&doc, None, &AlphaSweep::List(vec![0.0]));
    assert!(matches!(
      result,
      Err(Error::SolverExecution(ExecutionError::Spawn { .. }))
    ));
    assert!(scratch_is_empty(root.path()));
  }
}
