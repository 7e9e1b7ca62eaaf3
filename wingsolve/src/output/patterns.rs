//! Every pattern, header phrase and column layout used to read solver reports.

/// A real number as the solvers print it.
const NUM: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eEdD][-+]?\d+)?";

/// Builds the total-forces pattern.
pub(crate) fn total_forces_pattern() -> String {
  return format!(
    concat!(
      r"(?s)Alpha\s*=\s*(?P<alpha>{n})",
      r".*?Cmtot\s*=\s*(?P<cm>{n})",
      r".*?CLtot\s*=\s*(?P<cl>{n})",
      r".*?CDtot\s*=\s*(?P<cd>{n})"
    ),
    n = NUM
  );
}

/// The phrase that starts every strip-forces table.
pub(crate) const STRIP_FORCES_HEADER: &str =
  "Strip Forces referred to Strip Area, Chord";

/// A two-word column name in the strip-forces tables, and its one-word form.
pub(crate) const STRIP_COLUMN_ALIASES: [(&str, &str); 1] = [("c cl", "c_cl")];

/// Spanwise location column in the strip-forces tables.
pub(crate) const STRIP_Y_COLUMN: &str = "Yle";

/// Chord column in the strip-forces tables.
pub(crate) const STRIP_CHORD_COLUMN: &str = "Chord";

/// Local lift coefficient column in the strip-forces tables.
pub(crate) const STRIP_CL_COLUMN: &str = "cl";

/// Underline below the polar file's column names; data follows it.
pub(crate) const POLAR_UNDERLINE: &str = "------ --------";

/// Fixed character ranges of the polar file's columns, in the order of the
/// airfoil polar schema: alpha, CL, CD, CDp, CM.
pub(crate) const POLAR_COLUMNS: [(usize, usize); 5] = [
  (0, 8),
  (8, 17),
  (17, 27),
  (27, 37),
  (37, 46)
];
