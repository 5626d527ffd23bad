//! Cell values and per-column type inference.

use std::cmp::Ordering;
use std::fmt;

/// A single table value.
///
/// Numbers keep the text they were read from, so a loaded table writes back
/// exactly as it came in (`007` stays `007`, `2e3` stays `2e3`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cell {
    Number { value: f64, raw: String },
    Text(String),
}

/// The inferred type of a whole column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColumnType {
    /// Every cell parses as a number; sorts numerically.
    Numeric,
    /// At least one cell is not a number; sorts lexicographically.
    Text,
}

impl Cell {
    /// A number rendered in its shortest form.
    pub fn number(value: f64) -> Cell {
        Cell::Number {
            value,
            raw: format_number(value),
        }
    }

    /// Numeric value of the cell, parsing text cells when possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number { value, .. } => Some(*value),
            Cell::Text(s) => parse_number(s),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Cell::Number { .. })
    }

    /// Convert to the representation used by a column of type `ty`.
    pub(crate) fn coerce(self, ty: ColumnType) -> Cell {
        match (ty, self) {
            (ColumnType::Numeric, Cell::Text(raw)) => match parse_number(&raw) {
                Some(value) => Cell::Number { value, raw },
                None => Cell::Text(raw),
            },
            (ColumnType::Text, Cell::Number { raw, .. }) => Cell::Text(raw),
            (_, cell) => cell,
        }
    }

    /// Ordering used by sort, given the column type.
    pub(crate) fn compare(&self, other: &Cell, ty: ColumnType) -> Ordering {
        match ty {
            ColumnType::Numeric => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => self.as_str().cmp(other.as_str()),
            },
            ColumnType::Text => self.as_str().cmp(other.as_str()),
        }
    }

    fn as_str(&self) -> &str {
        match self {
            Cell::Number { raw, .. } => raw.as_str(),
            Cell::Text(s) => s.as_str(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::number(v)
    }
}

impl From<usize> for Cell {
    fn from(v: usize) -> Self {
        Cell::Number {
            value: v as f64,
            raw: v.to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

/// Parse a raw field as a number, tolerating surrounding whitespace.
pub fn parse_number(raw: &str) -> Option<f64> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Infer the type of a column from its raw values.
pub fn infer_column_type<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = &'a Cell>,
{
    let mut any = false;
    for cell in values {
        any = true;
        if cell.as_f64().is_none() {
            return ColumnType::Text;
        }
    }
    if any {
        ColumnType::Numeric
    } else {
        ColumnType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_display_without_trailing_zero() {
        assert_eq!(Cell::number(3.0).to_string(), "3");
        assert_eq!(Cell::number(2.5).to_string(), "2.5");
        assert_eq!(Cell::from(12usize).to_string(), "12");
        assert_eq!(Cell::Text("abc".into()).to_string(), "abc");
        assert!(Cell::number(1.0).is_number() && !Cell::from("1").is_number());
    }

    #[test]
    fn parse_number_rejects_text() {
        assert_eq!(parse_number(" 4.5 "), Some(4.5));
        assert_eq!(parse_number("-1e3"), Some(-1000.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("c1ccccc1"), None);
    }

    #[test]
    fn inference_requires_every_cell() {
        let cells = vec![Cell::from("3"), Cell::from("1"), Cell::from("2")];
        assert_eq!(infer_column_type(&cells), ColumnType::Numeric);
        let mixed = vec![Cell::from("3"), Cell::from("x")];
        assert_eq!(infer_column_type(&mixed), ColumnType::Text);
        assert_eq!(infer_column_type(&[]), ColumnType::Text);
    }

    #[test]
    fn coercion_follows_column_type() {
        assert_eq!(Cell::from("7").coerce(ColumnType::Numeric), Cell::number(7.0));
        assert_eq!(Cell::number(7.0).coerce(ColumnType::Text), Cell::from("7"));
        assert_eq!(Cell::from("x").coerce(ColumnType::Numeric), Cell::from("x"));
    }

    #[test]
    fn coercion_keeps_the_source_text() {
        let cell = Cell::from("007").coerce(ColumnType::Numeric);
        assert_eq!(cell.as_f64(), Some(7.0));
        assert_eq!(cell.to_string(), "007");
        assert_eq!(cell.coerce(ColumnType::Text), Cell::from("007"));
        let cell = Cell::from(" 2e3").coerce(ColumnType::Numeric);
        assert_eq!(cell.as_f64(), Some(2000.0));
        assert_eq!(cell.to_string(), " 2e3");
    }

    #[test]
    fn numeric_compare_is_not_lexicographic() {
        let a = Cell::number(10.0);
        let b = Cell::number(9.0);
        assert_eq!(a.compare(&b, ColumnType::Numeric), Ordering::Greater);
        assert_eq!(a.compare(&b, ColumnType::Text), Ordering::Less);
    }
}
