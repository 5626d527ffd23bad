//! Loading a [`ResultTable`] from delimited text.
//!
//! The first non-blank line names the columns and may be separated by commas,
//! tabs or spaces. Every following line is a comma-separated data row.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use ::csv::{ReaderBuilder, Trim};
use corescope_core::{CorescopeError, Result};

use crate::table::{LoadPolicy, LoadReport, ResultTable};

/// Split a header line on commas, tabs and spaces, dropping empty names.
pub fn split_header(line: &str) -> Vec<String> {
    line.split([',', '\t', ' '])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl ResultTable {
    /// Read a table from any reader.
    pub fn from_reader<R: Read>(mut reader: R, policy: LoadPolicy) -> Result<(ResultTable, LoadReport)> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let table = ResultTable::new();
        let report = table.load_text(&text, policy)?;
        Ok((table, report))
    }

    /// Read a table from a file.
    pub fn from_path(path: impl AsRef<Path>, policy: LoadPolicy) -> Result<(ResultTable, LoadReport)> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            CorescopeError::Io(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        Self::from_reader(file, policy)
    }

    /// Replace this table's contents with the parsed `text`.
    pub fn load_text(&self, text: &str, policy: LoadPolicy) -> Result<LoadReport> {
        let mut header_line = 0;
        let mut rest = text;
        let header = loop {
            let (line, tail) = match rest.find('\n') {
                Some(i) => (&rest[..i], &rest[i + 1..]),
                None => (rest, ""),
            };
            header_line += 1;
            rest = tail;
            if !line.trim().is_empty() {
                break split_header(line);
            }
            if tail.is_empty() {
                return Err(CorescopeError::Parse("table has no header line".into()));
            }
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(rest.as_bytes());

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result.map_err(|e| CorescopeError::Parse(e.to_string()))?;
            let line = header_line + record.position().map_or(rows.len() + 1, |p| p.line() as usize);
            rows.push((line, record.iter().map(str::to_string).collect()));
        }
        self.load_numbered(&header, rows, policy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cell, ColumnType};
    use std::io::Write;

    #[test]
    fn header_splits_on_mixed_delimiters() {
        assert_eq!(split_header("Name, CoreSmiles\tCoreSmarts"), vec!["Name", "CoreSmiles", "CoreSmarts"]);
        assert_eq!(split_header("a b\r"), vec!["a", "b"]);
    }

    #[test]
    fn load_text_reports_bad_rows() {
        let t = ResultTable::new();
        let report = t
            .load_text("a b c\n1,2,3\n4,5,6\n7,8\n", LoadPolicy::SkipRow)
            .unwrap();
        assert_eq!(t.row_count(), 2);
        assert_eq!(report.anomalies.len(), 1);
        assert!(matches!(report.anomalies[0], CorescopeError::LoadSchema { line: 4, .. }));
    }

    #[test]
    fn leading_blank_lines_shift_numbering() {
        let t = ResultTable::new();
        let err = t.load_text("\nx,y\n1\n", LoadPolicy::Abort).unwrap_err();
        assert!(matches!(err, CorescopeError::LoadSchema { line: 3, expected: 2, found: 1 }));
    }

    #[test]
    fn empty_input_is_a_parse_error() {
        let t = ResultTable::new();
        assert!(matches!(t.load_text("", LoadPolicy::SkipRow), Err(CorescopeError::Parse(_))));
        assert!(matches!(t.load_text("\n\n", LoadPolicy::SkipRow), Err(CorescopeError::Parse(_))));
    }

    #[test]
    fn from_reader_infers_types() {
        let input = "Name,CoreSmiles,RgroupPositions\ncore_a,c1ccccc1,0\ncore_b,C1CCCCC1,3\n";
        let (t, report) = ResultTable::from_reader(input.as_bytes(), LoadPolicy::SkipRow).unwrap();
        assert_eq!(report.rows_loaded, 2);
        assert_eq!(t.column_type(1), Some(ColumnType::Text));
        assert_eq!(t.column_type(2), Some(ColumnType::Numeric));
        assert_eq!(t.get(1, 2), Some(Cell::number(3.0)));
    }

    #[test]
    fn numbers_write_back_as_read() {
        let input = "Id,Score\n007,1.50\n010,2e3\n";
        let (t, _) = ResultTable::from_reader(input.as_bytes(), LoadPolicy::Abort).unwrap();
        assert_eq!(t.column_type(0), Some(ColumnType::Numeric));
        assert_eq!(t.get(1, 1).and_then(|c| c.as_f64()), Some(2000.0));
        assert_eq!(t.to_csv_string().unwrap(), input);

        t.sort(0, false).unwrap();
        assert_eq!(t.to_csv_string().unwrap(), "Id,Score\n010,2e3\n007,1.50\n");
    }

    #[test]
    fn from_path_reads_file() {
        let mut tmp = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(tmp, "Name\tScore").unwrap();
        writeln!(tmp, "m1, 2.5").unwrap();
        writeln!(tmp, "m2, 1").unwrap();
        tmp.flush().unwrap();

        let (t, _) = ResultTable::from_path(tmp.path(), LoadPolicy::Abort).unwrap();
        assert_eq!(t.column_names(), vec!["Name", "Score"]);
        t.sort(1, true).unwrap();
        assert_eq!(t.get(0, 0), Some(Cell::from("m2")));
    }

    #[test]
    fn from_path_missing_file_names_path() {
        let err = ResultTable::from_path("/nonexistent/table.csv", LoadPolicy::SkipRow).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/table.csv"));
    }
}
