//! Molecule records and named subsets of them.

use corescope_chem::{Molecule, Toolkit};
use corescope_core::{Annotated, CorescopeError, Result, Summarizable};
use tracing::{debug, warn};

use crate::orchestrator::Classification;
use crate::pattern::PatternKind;

/// One input structure, parsed once.
#[derive(Debug, Clone)]
pub struct MoleculeRecord {
    /// The SMILES as read.
    pub smiles: String,
    pub name: String,
    /// Canonical SMILES from the toolkit.
    pub canonical: String,
    pub molecule: Molecule,
}

impl MoleculeRecord {
    pub fn new<T: Toolkit>(smiles: &str, name: &str, toolkit: &T) -> Result<Self> {
        let molecule = toolkit.parse_structure(smiles, name)?;
        let canonical = toolkit.canonicalize(&molecule);
        Ok(MoleculeRecord {
            smiles: smiles.to_string(),
            name: name.to_string(),
            canonical,
            molecule,
        })
    }

    /// Classify the record by its name, as patterns are.
    pub fn kind(&self, core_prefix: &str) -> PatternKind {
        PatternKind::from_name(&self.name, core_prefix)
    }
}

impl Annotated for MoleculeRecord {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Records parsed from a SMILES file plus the lines that failed.
#[derive(Debug, Default)]
pub struct ParsedRecords {
    pub records: Vec<MoleculeRecord>,
    /// `(line number, error)` for each skipped line.
    pub failures: Vec<(usize, CorescopeError)>,
}

/// Parse SMILES file text, one structure per non-blank line.
///
/// The first token (up to a space, comma or tab) is the SMILES and the rest
/// of the line is the name. Unnamed structures are called `Mol<n>`, `n`
/// counting records from 1.
pub fn parse_smiles_records<T: Toolkit>(text: &str, toolkit: &T) -> ParsedRecords {
    parse_smiles_records_from(text, toolkit, 0)
}

/// Like [`parse_smiles_records`], numbering default names after `existing`
/// records already loaded.
pub fn parse_smiles_records_from<T: Toolkit>(text: &str, toolkit: &T, existing: usize) -> ParsedRecords {
    let mut out = ParsedRecords::default();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (smiles, rest) = match line.find([' ', ',', '\t']) {
            Some(pos) => (&line[..pos], line[pos + 1..].trim()),
            None => (line, ""),
        };
        let name = if rest.is_empty() {
            format!("Mol{}", existing + out.records.len() + 1)
        } else {
            rest.to_string()
        };
        match MoleculeRecord::new(smiles, &name, toolkit) {
            Ok(rec) => out.records.push(rec),
            Err(e) => {
                debug!(line = i + 1, %e, "skipping unparseable SMILES");
                out.failures.push((i + 1, e));
            }
        }
    }
    if !out.failures.is_empty() {
        warn!(skipped = out.failures.len(), "some SMILES lines could not be parsed");
    }
    out
}

/// How [`SubsetRepository::find_by_name`] compares names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchMode {
    #[default]
    Exact,
    Prefix,
    Contains,
}

impl SearchMode {
    fn accepts(self, name: &str, query: &str) -> bool {
        match self {
            SearchMode::Exact => name == query,
            SearchMode::Prefix => name.starts_with(query),
            SearchMode::Contains => name.contains(query),
        }
    }
}

/// All loaded records and the named subsets built from them.
///
/// Subsets hold record indices and keep their creation order.
#[derive(Debug, Clone, Default)]
pub struct SubsetRepository {
    records: Vec<MoleculeRecord>,
    subsets: Vec<(String, Vec<usize>)>,
}

impl SubsetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[MoleculeRecord] {
        &self.records
    }

    pub fn record(&self, idx: usize) -> Option<&MoleculeRecord> {
        self.records.get(idx)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append records; returns the index of the first one added.
    pub fn add_records(&mut self, records: impl IntoIterator<Item = MoleculeRecord>) -> usize {
        let first = self.records.len();
        self.records.extend(records);
        first
    }

    /// Replace the record with the same name, or append it.
    pub fn upsert_record(&mut self, record: MoleculeRecord) -> usize {
        match self.records.iter().position(|r| r.name == record.name) {
            Some(i) => {
                self.records[i] = record;
                i
            }
            None => {
                self.records.push(record);
                self.records.len() - 1
            }
        }
    }

    /// Parse `(name, smiles)` pairs, upsert them and save them as subset
    /// `subset_name`. Unparseable entries are returned and skipped.
    pub fn import_named_smiles<T: Toolkit>(
        &mut self,
        entries: &[(String, String)],
        toolkit: &T,
        subset_name: &str,
    ) -> Result<Vec<CorescopeError>> {
        let mut indices = Vec::new();
        let mut failures = Vec::new();
        for (name, smiles) in entries {
            match MoleculeRecord::new(smiles, name, toolkit) {
                Ok(rec) => indices.push(self.upsert_record(rec)),
                Err(e) => failures.push(e),
            }
        }
        self.save_subset(subset_name, indices, true)?;
        Ok(failures)
    }

    /// Store a named subset. Returns `false` without changing anything if
    /// the name exists and `overwrite` is not set.
    pub fn save_subset(&mut self, name: &str, indices: Vec<usize>, overwrite: bool) -> Result<bool> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.records.len()) {
            return Err(CorescopeError::InvalidInput(format!(
                "subset '{name}' refers to record {bad}, but only {} are loaded",
                self.records.len()
            )));
        }
        match self.subsets.iter_mut().find(|(n, _)| n == name) {
            Some(_) if !overwrite => Ok(false),
            Some((_, existing)) => {
                *existing = indices;
                Ok(true)
            }
            None => {
                self.subsets.push((name.to_string(), indices));
                Ok(true)
            }
        }
    }

    pub fn subset(&self, name: &str) -> Option<&[usize]> {
        self.subsets
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_slice())
    }

    /// The records of a subset, in subset order.
    pub fn subset_records(&self, name: &str) -> Option<Vec<&MoleculeRecord>> {
        self.subset(name)
            .map(|idx| idx.iter().filter_map(|&i| self.records.get(i)).collect())
    }

    pub fn subset_names(&self) -> Vec<&str> {
        self.subsets.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn remove_subset(&mut self, name: &str) -> bool {
        let before = self.subsets.len();
        self.subsets.retain(|(n, _)| n != name);
        self.subsets.len() != before
    }

    /// Save a classification as `Matched : <label>` and `Didn't Match : <label>`.
    pub fn store_classification(&mut self, label: &str, result: &Classification) -> Result<()> {
        self.save_subset(&format!("Matched : {label}"), result.matched.clone(), true)?;
        self.save_subset(&format!("Didn't Match : {label}"), result.unmatched.clone(), true)?;
        Ok(())
    }

    /// First record at or after `start` whose name satisfies `mode`.
    pub fn find_by_name(&self, query: &str, mode: SearchMode, start: usize) -> Option<usize> {
        self.records
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, r)| mode.accepts(&r.name, query))
            .map(|(i, _)| i)
    }
}

impl Summarizable for SubsetRepository {
    fn summary(&self) -> String {
        format!("{} molecules, {} subsets", self.records.len(), self.subsets.len())
    }
}
