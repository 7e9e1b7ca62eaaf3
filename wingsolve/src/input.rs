//! This module implements the writers for the vortex-lattice solver's input
//! files: the geometry file and the companion mass file.
//!
//! Both are built as a list of lines first and only turned into text at the
//! end. Optional keyword blocks are described by a table of rules, and one
//! emitter decides what gets written.

use std::fmt::Display;

use crate::util::fmt_real;

pub mod document;
pub mod from_wing;
pub mod mass;

pub use document::*;
pub use from_wing::{lift_slope_scaling, WingDocumentOptions};
pub use mass::*;

/// A single value on a data line.
#[derive(Clone, Debug, PartialEq, derive_more::From)]
pub enum Field {
  /// A real number, always written with a fractional part.
  Real(f64),
  /// An integer, such as a count or a flag.
  Integer(i64),
  /// Free text, such as a file or control name.
  #[from(ignore)]
  Text(String)
}

impl Field {
  /// Shorthand for a text field.
  pub fn text<S: Into<String>>(s: S) -> Self {
    return Self::Text(s.into());
  }
}

impl From<usize> for Field {
  fn from(value: usize) -> Self {
    return Self::Integer(value as i64);
  }
}

impl Display for Field {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return match self {
      Self::Real(x) => write!(f, "{}", fmt_real(*x)),
      Self::Integer(i) => write!(f, "{}", i),
      Self::Text(s) => write!(f, "{}", s)
    };
  }
}

/// Turns a list of values into fields.
pub(crate) fn fields<I, F>(values: I) -> Vec<Field>
where I: IntoIterator<Item = F>, F: Into<Field> {
  return values.into_iter().map(Into::into).collect();
}

/// A line of a solver input file.
#[derive(Clone, Debug, PartialEq)]
pub enum Line {
  /// A keyword starting a block, e.g. "SURFACE".
  Keyword(&'static str),
  /// A comment naming the fields of the next data line.
  Comment(&'static str),
  /// Data values.
  Data(Vec<Field>),
  /// Free text, such as a title.
  Text(String),
  /// A blank separator.
  Blank
}

impl Display for Line {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    return match self {
      Self::Keyword(k) => write!(f, "{}", k),
      Self::Comment(c) => write!(f, "#{}", c),
      Self::Data(values) => {
        let joined = values.iter().map(Field::to_string).collect::<Vec<_>>();
        write!(f, "{}", joined.join("  "))
      },
      Self::Text(s) => write!(f, "{}", s),
      Self::Blank => Ok(())
    };
  }
}

/// Describes an optional piece of a block. Unset rules emit nothing, so the
/// solver falls back to its own default.
#[derive(Clone, Debug, PartialEq)]
pub enum Rule {
  /// A keyword followed by a comment and a data line.
  Valued {
    /// The keyword.
    keyword: &'static str,
    /// The comment naming the values.
    comment: &'static str,
    /// The values, if set.
    fields: Option<Vec<Field>>
  },
  /// A comment and a data line with no keyword, as found in headers.
  Plain {
    /// The comment naming the values.
    comment: &'static str,
    /// The values, if set.
    fields: Option<Vec<Field>>
  },
  /// A bare keyword.
  Flag {
    /// The keyword.
    keyword: &'static str,
    /// Whether it's written.
    set: bool
  }
}

impl Rule {
  /// A valued rule.
  pub fn valued(
    keyword: &'static str,
    comment: &'static str,
    fields: Option<Vec<Field>>
  ) -> Self {
    return Self::Valued { keyword, comment, fields };
  }

  /// A keyword-less rule.
  pub fn plain(comment: &'static str, fields: Option<Vec<Field>>) -> Self {
    return Self::Plain { comment, fields };
  }

  /// A flag rule.
  pub fn flag(keyword: &'static str, set: bool) -> Self {
    return Self::Flag { keyword, set };
  }
}

/// Writes out the lines for every rule that's set, in order.
pub fn emit_rules(rules: Vec<Rule>, out: &mut Vec<Line>) {
  for rule in rules {
    match rule {
      Rule::Valued { keyword, comment, fields: Some(values) } => {
        out.push(Line::Keyword(keyword));
        out.push(Line::Comment(comment));
        out.push(Line::Data(values));
        out.push(Line::Blank);
      },
      Rule::Plain { comment, fields: Some(values) } => {
        out.push(Line::Comment(comment));
        out.push(Line::Data(values));
      },
      Rule::Flag { keyword, set: true } => {
        out.push(Line::Keyword(keyword));
        out.push(Line::Blank);
      },
      _ => continue
    }
  }
}

/// Joins lines into file contents, with a trailing newline.
pub fn render(lines: &[Line]) -> String {
  let mut s = lines.iter().map(Line::to_string).collect::<Vec<_>>().join("\n");
  s.push('\n');
  return s;
}
