//! Sortable result table for corescope.
//!
//! A column store whose cells are numbers or text, with the type inferred per
//! column. Sorting only rebuilds a logical-to-physical row permutation, so
//! physical row indices stay valid for point updates.
//!
//! ```
//! use corescope_table::{LoadPolicy, ResultTable};
//!
//! let (table, report) = ResultTable::from_reader(
//!     "Name,Score\na,3\nb,1\nc,2\n".as_bytes(),
//!     LoadPolicy::SkipRow,
//! )
//! .unwrap();
//! assert_eq!(report.rows_loaded, 3);
//! table.sort(1, true).unwrap();
//! assert_eq!(table.row_order(), vec![1, 2, 0]);
//! ```

pub mod cell;
pub mod reader;
pub mod table;

pub use cell::{infer_column_type, parse_number, Cell, ColumnType};
pub use reader::split_header;
pub use table::{LoadPolicy, LoadReport, ResultTable};
