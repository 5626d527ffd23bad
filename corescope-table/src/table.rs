//! Column store with sort-order indirection.
//!
//! Physical row storage is fixed at load time. Sorting rebuilds a permutation
//! `order[logical] = physical` that every row-addressed read goes through;
//! [`ResultTable::set_physical`] bypasses it.

use corescope_core::{CorescopeError, Result};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::cell::{infer_column_type, Cell, ColumnType};

/// What to do with a data row whose field count differs from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadPolicy {
    /// Report the row as an anomaly and continue.
    #[default]
    SkipRow,
    /// Stop at the first bad row; the table keeps its previous contents.
    Abort,
}

/// Outcome of a successful load.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub rows_loaded: usize,
    /// One [`CorescopeError::LoadSchema`] per skipped row.
    pub anomalies: Vec<CorescopeError>,
}

#[derive(Debug, Default, Clone)]
struct TableData {
    names: Vec<String>,
    columns: Vec<Vec<Cell>>,
    types: Vec<ColumnType>,
    order: Vec<usize>,
}

impl TableData {
    fn row_count(&self) -> usize {
        self.order.len()
    }

    fn check_cell(&self, physical: usize, col: usize) -> Result<()> {
        if col >= self.columns.len() {
            return Err(CorescopeError::InvalidInput(format!(
                "column {col} out of range ({} columns)",
                self.columns.len()
            )));
        }
        if physical >= self.row_count() {
            return Err(CorescopeError::InvalidInput(format!(
                "row {physical} out of range ({} rows)",
                self.row_count()
            )));
        }
        Ok(())
    }

    fn write_cell(&mut self, physical: usize, col: usize, value: Cell) -> Result<()> {
        self.check_cell(physical, col)?;
        self.columns[col][physical] = value;
        let ty = infer_column_type(&self.columns[col]);
        if ty != self.types[col] {
            debug!(column = %self.names[col], ?ty, "column type changed");
        }
        self.types[col] = ty;
        let column = std::mem::take(&mut self.columns[col]);
        self.columns[col] = column.into_iter().map(|c| c.coerce(ty)).collect();
        Ok(())
    }
}

/// A sortable table of numeric or text cells.
///
/// Reads take a shared lock; `load`, `sort` and the setters take it
/// exclusively, so the sort order never changes underneath a reader.
#[derive(Debug, Default)]
pub struct ResultTable {
    inner: RwLock<TableData>,
}

impl Clone for ResultTable {
    fn clone(&self) -> Self {
        ResultTable {
            inner: RwLock::new(self.inner.read().clone()),
        }
    }
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the table contents with `header` and `rows`.
    ///
    /// Rows are numbered from line 2, the header being line 1.
    pub fn load<S: AsRef<str>>(
        &self,
        header: &[S],
        rows: Vec<Vec<String>>,
        policy: LoadPolicy,
    ) -> Result<LoadReport> {
        let numbered = rows.into_iter().enumerate().map(|(i, r)| (i + 2, r)).collect();
        self.load_numbered(header, numbered, policy)
    }

    /// Like [`load`](Self::load) with caller-supplied line numbers.
    pub fn load_numbered<S: AsRef<str>>(
        &self,
        header: &[S],
        rows: Vec<(usize, Vec<String>)>,
        policy: LoadPolicy,
    ) -> Result<LoadReport> {
        if header.is_empty() {
            return Err(CorescopeError::InvalidInput("table header has no columns".into()));
        }
        let width = header.len();
        let mut columns: Vec<Vec<Cell>> = vec![Vec::new(); width];
        let mut report = LoadReport::default();

        for (line, fields) in rows {
            if fields.len() != width {
                let err = CorescopeError::LoadSchema {
                    line,
                    expected: width,
                    found: fields.len(),
                };
                match policy {
                    LoadPolicy::Abort => {
                        warn!(%err, "aborting table load");
                        return Err(err);
                    }
                    LoadPolicy::SkipRow => {
                        warn!(%err, "skipping table row");
                        report.anomalies.push(err);
                        continue;
                    }
                }
            }
            for (column, field) in columns.iter_mut().zip(fields) {
                column.push(Cell::Text(field));
            }
            report.rows_loaded += 1;
        }

        let types: Vec<ColumnType> = columns.iter().map(|c| infer_column_type(c)).collect();
        let columns = columns
            .into_iter()
            .zip(&types)
            .map(|(col, &ty)| col.into_iter().map(|c| c.coerce(ty)).collect())
            .collect();

        let data = TableData {
            names: header.iter().map(|h| h.as_ref().to_string()).collect(),
            columns,
            types,
            order: (0..report.rows_loaded).collect(),
        };
        debug!(
            rows = report.rows_loaded,
            columns = width,
            skipped = report.anomalies.len(),
            "table loaded"
        );
        *self.inner.write() = data;
        Ok(report)
    }

    pub fn row_count(&self) -> usize {
        self.inner.read().row_count()
    }

    pub fn column_count(&self) -> usize {
        self.inner.read().names.len()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.inner.read().names.clone()
    }

    /// Index of the first column called `name`.
    pub fn column_index_by_name(&self, name: &str) -> Option<usize> {
        self.inner.read().names.iter().position(|n| n == name)
    }

    pub fn column_type(&self, col: usize) -> Option<ColumnType> {
        self.inner.read().types.get(col).copied()
    }

    /// The current logical-to-physical row permutation.
    pub fn row_order(&self) -> Vec<usize> {
        self.inner.read().order.clone()
    }

    /// Cell at logical `row`.
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        let data = self.inner.read();
        let physical = *data.order.get(row)?;
        data.columns.get(col)?.get(physical).cloned()
    }

    /// Overwrite the cell at logical `row` and re-infer the column type.
    pub fn set(&self, row: usize, col: usize, value: impl Into<Cell>) -> Result<()> {
        let mut data = self.inner.write();
        let physical = *data.order.get(row).ok_or_else(|| {
            CorescopeError::InvalidInput(format!("row {row} out of range"))
        })?;
        data.write_cell(physical, col, value.into())
    }

    /// Overwrite the cell at physical `row`, ignoring the sort order.
    pub fn set_physical(&self, row: usize, col: usize, value: impl Into<Cell>) -> Result<()> {
        self.inner.write().write_cell(row, col, value.into())
    }

    /// Physical rows whose cell in `col` renders as `value`.
    pub fn find_physical_rows(&self, col: usize, value: &str) -> Vec<usize> {
        let data = self.inner.read();
        match data.columns.get(col) {
            Some(cells) => cells
                .iter()
                .enumerate()
                .filter(|(_, c)| c.to_string() == value)
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Re-sort rows by `col`. Physical storage is untouched.
    ///
    /// Ascending order is stable on ties; descending is its exact reverse.
    pub fn sort(&self, col: usize, ascending: bool) -> Result<()> {
        let mut data = self.inner.write();
        if col >= data.columns.len() {
            return Err(CorescopeError::InvalidInput(format!(
                "cannot sort by column {col} ({} columns)",
                data.columns.len()
            )));
        }
        let ty = data.types[col];
        let cells = &data.columns[col];
        let mut order: Vec<usize> = (0..cells.len()).collect();
        order.sort_by(|&a, &b| cells[a].compare(&cells[b], ty));
        if !ascending {
            order.reverse();
        }
        debug!(column = %data.names[col], ascending, "table sorted");
        data.order = order;
        Ok(())
    }

    /// Render header and rows, in logical order, as comma-separated text.
    pub fn to_csv_string(&self) -> Result<String> {
        let data = self.inner.read();
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer
            .write_record(&data.names)
            .map_err(|e| CorescopeError::Serialization(e.to_string()))?;
        for &physical in &data.order {
            let record: Vec<String> =
                data.columns.iter().map(|c| c[physical].to_string()).collect();
            writer
                .write_record(&record)
                .map_err(|e| CorescopeError::Serialization(e.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| CorescopeError::Serialization(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| CorescopeError::Serialization(e.to_string()))
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn load_values(values: &[i32]) -> ResultTable {
        let t = ResultTable::new();
        let rows = values.iter().map(|v| vec![v.to_string()]).collect();
        t.load(&["v"], rows, LoadPolicy::SkipRow).unwrap();
        t
    }

    proptest! {
        #[test]
        fn descending_reverses_ascending(values in proptest::collection::vec(-50i32..50, 0..40)) {
            let t = load_values(&values);
            t.sort(0, true).unwrap();
            let mut asc = t.row_order();
            t.sort(0, false).unwrap();
            let desc = t.row_order();
            asc.reverse();
            prop_assert_eq!(asc, desc);
        }

        #[test]
        fn sort_is_a_permutation_in_order(values in proptest::collection::vec(-50i32..50, 0..40)) {
            let t = load_values(&values);
            t.sort(0, true).unwrap();
            let order = t.row_order();
            let mut seen = order.clone();
            seen.sort_unstable();
            prop_assert_eq!(seen, (0..values.len()).collect::<Vec<_>>());
            for w in order.windows(2) {
                prop_assert!(values[w[0]] <= values[w[1]]);
            }
        }
    }
}
