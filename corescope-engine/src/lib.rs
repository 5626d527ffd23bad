//! Substructure-driven analysis of molecule sets.
//!
//! - [`pattern`]: named SMARTS and MDL queries, core classification
//! - [`records`]: parsed molecule records and named subsets
//! - [`orchestrator`]: pattern selection, compilation, matched/unmatched split
//! - [`decompose`]: core/R-group decomposition into tagged fragments
//! - [`aggregate`]: per-core statistics and write-back into a result table
//! - [`config`]: engine and session settings
//!
//! # Example
//!
//! ```
//! use corescope_chem::NativeToolkit;
//! use corescope_engine::{
//!     parse_smiles_records, DecompositionAggregator, EngineConfig, MatchOrchestrator, PatternLibrary,
//! };
//!
//! let orch = MatchOrchestrator::new(NativeToolkit, EngineConfig::default());
//! let records = parse_smiles_records("c1ccccc1C\nc1ccccc1CC\n", orch.toolkit()).records;
//! let library = PatternLibrary::parse_smarts_file("core_phenyl c1ccccc1\n").unwrap();
//!
//! let cores = library.core_patterns();
//! let compiled = orch.build(&cores, library.substitutions());
//! let stats = DecompositionAggregator::new(orch.toolkit(), orch.config())
//!     .aggregate(&records, &compiled.matchers);
//!
//! let phenyl = &stats["core_phenyl"];
//! assert_eq!(phenyl.position_count(), 1);
//! assert_eq!(phenyl.unique_substituent_count(), 2);
//! assert_eq!(phenyl.containment, 0);
//! ```

pub mod aggregate;
pub mod config;
pub mod decompose;
pub mod orchestrator;
pub mod pattern;
pub mod records;

pub use aggregate::{
    analyze_cores, core_smarts_from_table, core_smiles_from_table, write_back, AggregateRecord,
    CoreAnalysis, DecompositionAggregator, CONTAINMENT_COLUMN, CORE_SMARTS_COLUMN,
    CORE_SMILES_COLUMN, POSITIONS_COLUMN, UNIQUE_COLUMN,
};
pub use config::{EngineConfig, SessionSettings};
pub use decompose::{core_membership, tagged_fragment, CoreDecomposer, MatchPolicy, Substituent};
pub use orchestrator::{BuildOutcome, Classification, CompiledPattern, MatchOrchestrator};
pub use pattern::{PatternDef, PatternKind, PatternLibrary};
pub use records::{
    parse_smiles_records, parse_smiles_records_from, MoleculeRecord, ParsedRecords, SearchMode,
    SubsetRepository,
};
