//! Per-core substituent statistics and their write-back into the result table.

use std::collections::{BTreeMap, BTreeSet};

use corescope_chem::{Match, Matcher, Molecule, Toolkit};
use corescope_core::{CorescopeError, Result, Summarizable};
use corescope_table::ResultTable;
use tracing::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::decompose::{CoreDecomposer, MatchPolicy};
use crate::orchestrator::{CompiledPattern, MatchOrchestrator};
use crate::pattern::{PatternKind, PatternLibrary};
use crate::records::{MoleculeRecord, SubsetRepository};

/// Output column: number of distinct substitution positions.
pub const POSITIONS_COLUMN: &str = "RgroupPositions";
/// Output column: number of distinct substituent fragments.
pub const UNIQUE_COLUMN: &str = "NumberOfUniqueRgroups";
/// Output column: number of core molecules containing the core.
pub const CONTAINMENT_COLUMN: &str = "CoreContainedIn";
/// Optional input column of core SMILES.
pub const CORE_SMILES_COLUMN: &str = "CoreSmiles";
/// Optional input column of core SMARTS.
pub const CORE_SMARTS_COLUMN: &str = "CoreSmarts";

/// What was seen for one core pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AggregateRecord {
    /// Match-order indices of core atoms that carried a substituent.
    pub positions: BTreeSet<usize>,
    /// Canonical tagged fragments.
    pub fragments: BTreeSet<String>,
    /// Core molecules the pattern matched.
    pub containment: usize,
}

impl AggregateRecord {
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn unique_substituent_count(&self) -> usize {
        self.fragments.len()
    }

    pub fn merge(&mut self, other: AggregateRecord) {
        self.positions.extend(other.positions);
        self.fragments.extend(other.fragments);
        self.containment += other.containment;
    }
}

impl Summarizable for AggregateRecord {
    fn summary(&self) -> String {
        format!(
            "{} positions, {} unique substituents, contained in {} cores",
            self.position_count(),
            self.unique_substituent_count(),
            self.containment
        )
    }
}

fn merge_maps(
    mut into: BTreeMap<String, AggregateRecord>,
    from: BTreeMap<String, AggregateRecord>,
) -> BTreeMap<String, AggregateRecord> {
    for (name, rec) in from {
        into.entry(name).or_default().merge(rec);
    }
    into
}

/// Folds decompositions over a molecule collection, per core pattern.
#[derive(Debug)]
pub struct DecompositionAggregator<'a, T: Toolkit> {
    decomposer: CoreDecomposer<'a, T>,
    core_prefix: &'a str,
    policy: MatchPolicy,
}

impl<'a, T: Toolkit> DecompositionAggregator<'a, T> {
    pub fn new(toolkit: &'a T, config: &'a EngineConfig) -> Self {
        DecompositionAggregator {
            decomposer: CoreDecomposer::new(toolkit),
            core_prefix: &config.core_prefix,
            policy: config.match_policy,
        }
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// The embedding of `matcher` in `mol` that gets decomposed.
    fn embedding<M: Matcher>(&self, matcher: &M, mol: &Molecule) -> Option<Match> {
        match self.policy {
            MatchPolicy::FirstOnly => matcher.first_match(mol),
        }
    }

    /// Statistics for every core pattern in `patterns`; other patterns are
    /// ignored. Molecules whose own name marks them as cores only count
    /// towards containment; all others are decomposed.
    pub fn aggregate(
        &self,
        records: &[MoleculeRecord],
        patterns: &[CompiledPattern<T::Matcher>],
    ) -> BTreeMap<String, AggregateRecord> {
        let cores: Vec<&CompiledPattern<T::Matcher>> =
            patterns.iter().filter(|p| p.kind == PatternKind::Core).collect();
        let empty: BTreeMap<String, AggregateRecord> = cores
            .iter()
            .map(|p| (p.name.clone(), AggregateRecord::default()))
            .collect();

        #[cfg(feature = "parallel")]
        let folded = {
            use rayon::prelude::*;
            records
                .par_iter()
                .map(|rec| self.contribution(rec, &cores))
                .reduce(BTreeMap::new, merge_maps)
        };
        #[cfg(not(feature = "parallel"))]
        let folded = records
            .iter()
            .map(|rec| self.contribution(rec, &cores))
            .fold(BTreeMap::new(), merge_maps);

        merge_maps(empty, folded)
    }

    fn contribution(
        &self,
        rec: &MoleculeRecord,
        cores: &[&CompiledPattern<T::Matcher>],
    ) -> BTreeMap<String, AggregateRecord> {
        let mut out = BTreeMap::new();
        let core_molecule = rec.kind(self.core_prefix) == PatternKind::Core;
        for core in cores {
            let entry: &mut AggregateRecord = out.entry(core.name.clone()).or_default();
            if core_molecule {
                if core.matcher.matches(&rec.molecule) {
                    entry.containment += 1;
                }
                continue;
            }
            let Some(hit) = self.embedding(&core.matcher, &rec.molecule) else {
                continue;
            };
            match self.decomposer.decompose(&rec.molecule, &hit) {
                Ok(subs) => {
                    trace!(molecule = %rec.name, core = %core.name, substituents = subs.len());
                    for s in subs {
                        entry.positions.insert(s.position);
                        entry.fragments.insert(s.fragment);
                    }
                }
                Err(e) => warn!(molecule = %rec.name, core = %core.name, %e, "decomposition failed"),
            }
        }
        out
    }
}

/// Column indices of the three output columns.
fn output_columns(table: &ResultTable) -> Result<[usize; 3]> {
    let find = |name: &str| {
        table.column_index_by_name(name).ok_or_else(|| {
            warn!(column = name, "result table lacks output column; skipping write-back");
            CorescopeError::MissingColumn(name.to_string())
        })
    };
    Ok([find(POSITIONS_COLUMN)?, find(UNIQUE_COLUMN)?, find(CONTAINMENT_COLUMN)?])
}

/// Write per-core counts into the rows whose first column names the core.
///
/// Fails with [`CorescopeError::MissingColumn`] before touching the table if
/// an output column is absent. Cores that saw no substitution position are
/// skipped. Returns the number of rows updated.
pub fn write_back(table: &ResultTable, results: &BTreeMap<String, AggregateRecord>) -> Result<usize> {
    let [pos_col, uniq_col, contained_col] = output_columns(table)?;
    let mut updated = 0;
    for (name, rec) in results {
        if rec.positions.is_empty() {
            continue;
        }
        let rows = table.find_physical_rows(0, name);
        if rows.is_empty() {
            debug!(core = %name, "no table row for core");
        }
        for row in rows {
            table.set_physical(row, pos_col, rec.position_count())?;
            table.set_physical(row, uniq_col, rec.unique_substituent_count())?;
            table.set_physical(row, contained_col, rec.containment)?;
            updated += 1;
        }
    }
    Ok(updated)
}

fn named_column(table: &ResultTable, column: &str) -> Result<Vec<(String, String)>> {
    let col = table
        .column_index_by_name(column)
        .ok_or_else(|| CorescopeError::MissingColumn(column.to_string()))?;
    let mut out = Vec::new();
    for row in 0..table.row_count() {
        let (Some(name), Some(value)) = (table.get(row, 0), table.get(row, col)) else {
            continue;
        };
        let value = value.to_string();
        if !value.trim().is_empty() {
            out.push((name.to_string(), value));
        }
    }
    Ok(out)
}

/// `(name, SMARTS)` pairs from the `CoreSmarts` column, named by column 0.
pub fn core_smarts_from_table(table: &ResultTable) -> Result<Vec<(String, String)>> {
    named_column(table, CORE_SMARTS_COLUMN)
}

/// `(name, SMILES)` pairs from the `CoreSmiles` column, named by column 0.
pub fn core_smiles_from_table(table: &ResultTable) -> Result<Vec<(String, String)>> {
    named_column(table, CORE_SMILES_COLUMN)
}

/// Result of [`analyze_cores`].
#[derive(Debug)]
pub struct CoreAnalysis {
    pub results: BTreeMap<String, AggregateRecord>,
    /// Core patterns that failed to compile.
    pub failures: Vec<CorescopeError>,
    pub rows_updated: usize,
}

/// Decompose every record against every core pattern in `library` and
/// write the counts back into `table`.
pub fn analyze_cores<T: Toolkit>(
    orchestrator: &MatchOrchestrator<T>,
    repo: &SubsetRepository,
    library: &PatternLibrary,
    table: &ResultTable,
) -> Result<CoreAnalysis> {
    output_columns(table)?;

    let cores = library.core_patterns();
    let outcome = orchestrator.build(&cores, library.substitutions());
    let aggregator = DecompositionAggregator::new(orchestrator.toolkit(), orchestrator.config());
    let results = aggregator.aggregate(repo.records(), &outcome.matchers);
    for (name, rec) in &results {
        debug!(core = %name, summary = %rec.summary(), "core aggregated");
    }
    let rows_updated = write_back(table, &results)?;
    info!(
        cores = results.len(),
        rows_updated,
        skipped = outcome.failures.len(),
        "core analysis finished"
    );
    Ok(CoreAnalysis {
        results,
        failures: outcome.failures,
        rows_updated,
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::pattern::PatternDef;
    use crate::records::parse_smiles_records;
    use corescope_chem::{NativeToolkit, PatternSource, SubstitutionDefs};
    use proptest::prelude::*;

    const POOL: &str = "\
c1ccccc1C
c1ccccc1CC
Oc1ccccc1N
c1ccccc1 core_benzene
Clc1ccc(Br)cc1
CCO
c1ccncc1C
";

    proptest! {
        #[test]
        fn aggregation_ignores_record_order(perm in Just((0..7usize).collect::<Vec<_>>()).prop_shuffle()) {
            let orch = MatchOrchestrator::new(NativeToolkit, EngineConfig::default());
            let defs = [
                PatternDef::new("core_phenyl", PatternSource::Smarts("c1ccccc1".into()), "core"),
                PatternDef::new("core_pyridine", PatternSource::Smarts("c1ccncc1".into()), "core"),
            ];
            let refs: Vec<&PatternDef> = defs.iter().collect();
            let pats = orch.build(&refs, &SubstitutionDefs::new()).matchers;
            let recs = parse_smiles_records(POOL, &NativeToolkit).records;
            let shuffled: Vec<MoleculeRecord> = perm.iter().map(|&i| recs[i].clone()).collect();

            let agg = DecompositionAggregator::new(orch.toolkit(), orch.config());
            prop_assert_eq!(agg.aggregate(&recs, &pats), agg.aggregate(&shuffled, &pats));
        }
    }
}
