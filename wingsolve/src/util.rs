//! This module implements utility functions without much need for defining
//! context or not enough of it to warrant them having their own modules.

/// Formats a real number the way the solvers like to read them: plain decimal,
/// never scientific notation, and always with a fractional part, so a one
/// comes out as "1.0" and not "1".
pub fn fmt_real(x: f64) -> String {
  let s = if x == 0.0 {
    // gets rid of negative zero
    "0".to_string()
  } else {
    format!("{}", x)
  };
  if s.contains('.') || !x.is_finite() {
    return s;
  }
  return format!("{}.0", s);
}

/// Decodes a real number printed by one of the solvers. Fortran likes to use
/// 'D' for exponents sometimes, and asterisks when a field overflows, which we
/// treat as "no number here".
pub fn parse_real(s: &str) -> Option<f64> {
  let s = s.trim();
  if s.is_empty() || s.contains('*') {
    return None;
  }
  let x = s.replace(['D', 'd'], "E").parse::<f64>().ok()?;
  return x.is_finite().then_some(x);
}

/// Checks whether a line is made up of dashes only (and spaces). Both solvers
/// use these to underline headers or to close tables.
pub fn is_dashed_line(line: &str) -> bool {
  let trimmed = line.trim();
  return trimmed.starts_with("---")
    && trimmed.chars().all(|c| c == '-' || c == ' ');
}

/// Extracts a fixed character column from a line, trimmed. Returns None if the
/// line is too short to even start the column.
pub fn fixed_column(line: &str, (start, end): (usize, usize)) -> Option<&str> {
  let end = end.min(line.len());
  if start >= end {
    return None;
  }
  return line.get(start..end).map(str::trim);
}
