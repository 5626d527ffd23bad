//! Shared primitives for the corescope molecule-set analysis engine.
//!
//! `corescope-core` is the foundation the other corescope crates build on:
//!
//! - **Error types**: [`CorescopeError`] and [`Result`], with the recoverable
//!   pattern, table-schema and missing-column failures called out as variants
//! - **Traits**: [`Annotated`] and [`Summarizable`] for named, reportable items

pub mod error;
pub mod traits;

pub use error::{CorescopeError, Result};
pub use traits::*;
