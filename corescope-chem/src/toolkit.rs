//! The chemistry services the analysis engine depends on, as traits.
//!
//! [`NativeToolkit`] implements them with this crate's own SMILES reader,
//! SMARTS/MDL compilers, VF2 matcher and canonicalizer.

use corescope_core::{CorescopeError, Result};

use crate::canon::canonical_smiles;
use crate::mdl::parse_mdl_query;
use crate::molecule::Molecule;
use crate::smarts::{parse_smarts, Match, SmartsPattern};
use crate::smiles::parse_smiles_named;
use crate::substitution::{expand_substitutions, SubstitutionDefs};

/// Query text in one of the supported notations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PatternSource {
    Smarts(String),
    /// A V2000 molfile block.
    MdlQuery(String),
}

impl PatternSource {
    /// The raw query text.
    pub fn text(&self) -> &str {
        match self {
            PatternSource::Smarts(s) | PatternSource::MdlQuery(s) => s,
        }
    }
}

/// A compiled substructure query.
pub trait Matcher: Send + Sync {
    /// The first embedding in match order, if any.
    fn first_match(&self, mol: &Molecule) -> Option<Match>;

    fn matches(&self, mol: &Molecule) -> bool {
        self.first_match(mol).is_some()
    }
}

impl Matcher for SmartsPattern {
    fn first_match(&self, mol: &Molecule) -> Option<Match> {
        SmartsPattern::first_match(self, mol)
    }
}

/// Structure parsing, pattern compilation and canonicalization.
pub trait Toolkit: Send + Sync {
    type Matcher: Matcher;

    /// Parse a structure string (SMILES) into a named molecule.
    fn parse_structure(&self, text: &str, name: &str) -> Result<Molecule>;

    /// Compile a named pattern, expanding `$name` references from `defs`.
    ///
    /// Failures are reported as [`CorescopeError::PatternCompile`] or
    /// [`CorescopeError::UnresolvedSubstitution`] naming the pattern.
    fn compile_pattern(
        &self,
        name: &str,
        source: &PatternSource,
        defs: &SubstitutionDefs,
    ) -> Result<Self::Matcher>;

    /// Canonical SMILES for a molecule.
    fn canonicalize(&self, mol: &Molecule) -> String;
}

/// The built-in toolkit.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeToolkit;

impl Toolkit for NativeToolkit {
    type Matcher = SmartsPattern;

    fn parse_structure(&self, text: &str, name: &str) -> Result<Molecule> {
        parse_smiles_named(text, name)
    }

    fn compile_pattern(
        &self,
        name: &str,
        source: &PatternSource,
        defs: &SubstitutionDefs,
    ) -> Result<SmartsPattern> {
        let compiled = match source {
            PatternSource::Smarts(smarts) => {
                let expanded = expand_substitutions(name, smarts, defs)?;
                parse_smarts(&expanded)
            }
            PatternSource::MdlQuery(block) => parse_mdl_query(block),
        };
        compiled.map_err(|e| match e {
            CorescopeError::Parse(reason) => CorescopeError::pattern_compile(name, reason),
            other => other,
        })
    }

    fn canonicalize(&self, mol: &Molecule) -> String {
        canonical_smiles(mol)
    }
}
