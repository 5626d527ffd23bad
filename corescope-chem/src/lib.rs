//! Molecule graphs and substructure queries for corescope.
//!
//! Provides the molecular graph, a SMILES reader with aromaticity
//! perception, SMARTS and MDL query compilers with named substitution
//! definitions, a VF2 substructure matcher and a canonical SMILES writer.
//! The [`Toolkit`] and [`Matcher`] traits are the seam the analysis engine
//! is written against.
//!
//! # Example
//!
//! ```
//! use corescope_chem::{NativeToolkit, PatternSource, SubstitutionDefs, Toolkit, Matcher};
//!
//! let tk = NativeToolkit;
//! let toluene = tk.parse_structure("c1ccccc1C", "toluene").unwrap();
//! let ring = tk
//!     .compile_pattern("core_benzene", &PatternSource::Smarts("c1ccccc1".into()), &SubstitutionDefs::new())
//!     .unwrap();
//! let hit = ring.first_match(&toluene).unwrap();
//! assert_eq!(hit.atoms, vec![0, 1, 2, 3, 4, 5]);
//! ```

pub mod aromatic;
pub mod canon;
pub mod element;
pub mod mdl;
pub mod molecule;
pub mod ring;
pub mod smarts;
pub mod smiles;
pub mod substitution;
pub mod toolkit;

mod lex;

pub use aromatic::{aromatic_ring_bonds, perceive_aromaticity};
pub use canon::canonical_smiles;
pub use element::{element_by_number, element_by_symbol, Element, BRIDGE_TAG, ROOT_TAG};
pub use mdl::{parse_mdl_query, split_mdl_queries};
pub use molecule::{Bond, BondOrder, MolAtom, Molecule};
pub use ring::{find_sssr, RingInfo};
pub use smarts::{parse_smarts, Match, SmartsPattern};
pub use smiles::{parse_smiles, parse_smiles_named};
pub use substitution::{expand_substitutions, SubstitutionDefs};
pub use toolkit::{Matcher, NativeToolkit, PatternSource, Toolkit};
