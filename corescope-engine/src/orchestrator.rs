//! Pattern selection, compilation and matched/unmatched classification.

use corescope_chem::{Matcher, SubstitutionDefs, Toolkit};
use corescope_core::{CorescopeError, Result};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::decompose::core_membership;
use crate::pattern::{PatternDef, PatternKind, PatternLibrary};
use crate::records::{MoleculeRecord, SubsetRepository};

/// A compiled pattern together with its name and kind.
#[derive(Debug, Clone)]
pub struct CompiledPattern<M> {
    pub matcher: M,
    pub name: String,
    pub kind: PatternKind,
}

/// Compiled patterns plus the ones that failed.
#[derive(Debug)]
pub struct BuildOutcome<M> {
    pub matchers: Vec<CompiledPattern<M>>,
    /// One pattern-compile error per skipped pattern.
    pub failures: Vec<CorescopeError>,
}

impl<M> BuildOutcome<M> {
    /// Names of the compiled patterns joined with `|`.
    pub fn label(&self) -> String {
        self.matchers
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join("|")
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }
}

/// Record indices split by whether any pattern matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Classification {
    pub matched: Vec<usize>,
    pub unmatched: Vec<usize>,
}

/// Turns selected patterns into matchers and runs them over molecules.
#[derive(Debug, Clone, Default)]
pub struct MatchOrchestrator<T: Toolkit> {
    toolkit: T,
    config: EngineConfig,
}

impl<T: Toolkit> MatchOrchestrator<T> {
    pub fn new(toolkit: T, config: EngineConfig) -> Self {
        MatchOrchestrator { toolkit, config }
    }

    pub fn toolkit(&self) -> &T {
        &self.toolkit
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Pick patterns by index. Out-of-range indices are ignored; without
    /// `allow_multiple` only the first valid selection is kept.
    pub fn select<'p>(
        &self,
        patterns: &'p [PatternDef],
        selection: &[usize],
        allow_multiple: bool,
    ) -> Vec<&'p PatternDef> {
        let picked = selection.iter().filter_map(|&i| patterns.get(i));
        if allow_multiple {
            picked.collect()
        } else {
            picked.take(1).collect()
        }
    }

    /// Compile each pattern, skipping (and reporting) those that fail.
    pub fn build(&self, selected: &[&PatternDef], defs: &SubstitutionDefs) -> BuildOutcome<T::Matcher> {
        let mut outcome = BuildOutcome {
            matchers: Vec::with_capacity(selected.len()),
            failures: Vec::new(),
        };
        for def in selected {
            match self.toolkit.compile_pattern(&def.name, &def.source, defs) {
                Ok(matcher) => outcome.matchers.push(CompiledPattern {
                    matcher,
                    name: def.name.clone(),
                    kind: def.kind,
                }),
                Err(e) => {
                    warn!(pattern = %def.name, %e, "skipping pattern");
                    outcome.failures.push(e);
                }
            }
        }
        if outcome.matchers.is_empty() && !selected.is_empty() {
            warn!("no pattern compiled");
        }
        outcome
    }

    /// Split `records` into those matched by at least one pattern and the rest.
    pub fn classify(
        &self,
        records: &[MoleculeRecord],
        matchers: &[CompiledPattern<T::Matcher>],
    ) -> Classification {
        if matchers.is_empty() {
            warn!("no active patterns; every molecule is unmatched");
            return Classification {
                matched: Vec::new(),
                unmatched: (0..records.len()).collect(),
            };
        }

        let hit = |rec: &MoleculeRecord| matchers.iter().any(|c| c.matcher.matches(&rec.molecule));

        #[cfg(feature = "parallel")]
        let hits: Vec<bool> = {
            use rayon::prelude::*;
            records.par_iter().map(hit).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let hits: Vec<bool> = records.iter().map(hit).collect();

        let mut result = Classification::default();
        for (i, matched) in hits.into_iter().enumerate() {
            if matched {
                result.matched.push(i);
            } else {
                result.unmatched.push(i);
            }
        }
        debug!(
            matched = result.matched.len(),
            unmatched = result.unmatched.len(),
            "classified molecules"
        );
        result
    }

    /// Atoms of `record` covered by the first embedding of any pattern in
    /// the active set.
    pub fn matched_atoms(
        &self,
        record: &MoleculeRecord,
        matchers: &[CompiledPattern<T::Matcher>],
    ) -> Vec<bool> {
        let mut covered = vec![false; record.molecule.atom_count()];
        for c in matchers {
            if let Some(hit) = c.matcher.first_match(&record.molecule) {
                for (flag, hit) in covered.iter_mut().zip(core_membership(&record.molecule, &hit)) {
                    *flag |= hit;
                }
            }
        }
        covered
    }

    /// Select, compile and classify, storing the result as the subsets
    /// `Matched : <names>` and `Didn't Match : <names>`.
    pub fn match_into_subsets(
        &self,
        repo: &mut SubsetRepository,
        library: &PatternLibrary,
        selection: &[usize],
        allow_multiple: bool,
    ) -> Result<(Classification, Vec<CorescopeError>)> {
        let patterns: Vec<PatternDef> = library.all_patterns().cloned().collect();
        let selected = self.select(&patterns, selection, allow_multiple);
        let outcome = self.build(&selected, library.substitutions());
        let result = self.classify(repo.records(), &outcome.matchers);
        if !outcome.is_empty() {
            repo.store_classification(&outcome.label(), &result)?;
        }
        Ok((result, outcome.failures))
    }

    /// Run one named pattern over every record and save the matches as a
    /// subset named after the pattern.
    pub fn search_with_core(
        &self,
        repo: &mut SubsetRepository,
        library: &PatternLibrary,
        name: &str,
    ) -> Result<Classification> {
        let def = library
            .get(name)
            .ok_or_else(|| CorescopeError::InvalidInput(format!("no pattern named '{name}'")))?;
        let matcher = self
            .toolkit
            .compile_pattern(&def.name, &def.source, library.substitutions())?;
        let compiled = [CompiledPattern {
            matcher,
            name: def.name.clone(),
            kind: def.kind,
        }];
        let result = self.classify(repo.records(), &compiled);
        repo.save_subset(name, result.matched.clone(), true)?;
        info!(pattern = name, matched = result.matched.len(), "core search finished");
        Ok(result)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::records::parse_smiles_records;
    use corescope_chem::NativeToolkit;
    use proptest::prelude::*;

    const POOL: &[&str] = &[
        "c1ccccc1", "CCO", "CCN", "c1ccncc1", "C1CCCCC1", "CC(=O)O", "Clc1ccccc1", "OCCO",
    ];
    const PATTERNS: &[&str] = &["c1ccccc1", "[OX2H]", "N", "[Cl]", "C=O", "[C"];

    proptest! {
        #[test]
        fn classify_partitions_input(
            mols in proptest::collection::vec(0..POOL.len(), 0..12),
            pats in proptest::collection::vec(0..PATTERNS.len(), 0..4),
        ) {
            let orch = MatchOrchestrator::new(NativeToolkit, EngineConfig::default());
            let text: String = mols.iter().map(|&i| format!("{}\n", POOL[i])).collect();
            let records = parse_smiles_records(&text, &NativeToolkit).records;
            let defs: Vec<PatternDef> = pats
                .iter()
                .enumerate()
                .map(|(k, &i)| PatternDef::new(format!("p{k}"), corescope_chem::PatternSource::Smarts(PATTERNS[i].into()), "core"))
                .collect();
            let refs: Vec<&PatternDef> = defs.iter().collect();
            let outcome = orch.build(&refs, &SubstitutionDefs::new());
            let result = orch.classify(&records, &outcome.matchers);

            let mut all: Vec<usize> = result.matched.iter().chain(&result.unmatched).copied().collect();
            all.sort_unstable();
            prop_assert_eq!(all, (0..records.len()).collect::<Vec<_>>());
            for i in &result.matched {
                prop_assert!(!result.unmatched.contains(i));
            }
        }
    }
}
