//! Named query definitions.
//!
//! A [`PatternLibrary`] holds the user-visible SMARTS definitions, the MDL
//! queries and the substitution definitions that `$name` references resolve
//! against. Every full SMARTS definition doubles as a substitution
//! definition; substitution-only entries are never matched directly.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use corescope_chem::{split_mdl_queries, PatternSource, SubstitutionDefs};
use corescope_core::{Annotated, CorescopeError, Result};
use tracing::debug;

/// Whether a pattern is a scaffold whose substituents are analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PatternKind {
    Core,
    Generic,
}

impl PatternKind {
    /// Classify a name by prefix (case-sensitive).
    ///
    /// Patterns are classified once, when they are created; molecule records
    /// are classified through the same function.
    pub fn from_name(name: &str, prefix: &str) -> Self {
        if !prefix.is_empty() && name.starts_with(prefix) {
            PatternKind::Core
        } else {
            PatternKind::Generic
        }
    }
}

/// A named query.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PatternDef {
    pub name: String,
    pub source: PatternSource,
    pub kind: PatternKind,
}

impl PatternDef {
    pub fn new(name: impl Into<String>, source: PatternSource, prefix: &str) -> Self {
        let name = name.into();
        let kind = PatternKind::from_name(&name, prefix);
        PatternDef { name, source, kind }
    }

    pub fn is_core(&self) -> bool {
        self.kind == PatternKind::Core
    }
}

impl Annotated for PatternDef {
    fn name(&self) -> &str {
        &self.name
    }
}

/// SMARTS definitions, MDL queries and substitution definitions.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    smarts: Vec<PatternDef>,
    mdl: Vec<PatternDef>,
    subs: SubstitutionDefs,
    core_prefix: String,
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::new("core")
    }
}

impl PatternLibrary {
    /// An empty library whose core patterns start with `core_prefix`.
    pub fn new(core_prefix: impl Into<String>) -> Self {
        PatternLibrary {
            smarts: Vec::new(),
            mdl: Vec::new(),
            subs: SubstitutionDefs::new(),
            core_prefix: core_prefix.into(),
        }
    }

    pub fn core_prefix(&self) -> &str {
        &self.core_prefix
    }

    /// Full SMARTS definitions in insertion order.
    pub fn smarts_patterns(&self) -> &[PatternDef] {
        &self.smarts
    }

    /// MDL queries in the order they were read.
    pub fn mdl_queries(&self) -> &[PatternDef] {
        &self.mdl
    }

    pub fn substitutions(&self) -> &SubstitutionDefs {
        &self.subs
    }

    /// SMARTS definitions followed by MDL queries.
    pub fn all_patterns(&self) -> impl Iterator<Item = &PatternDef> {
        self.smarts.iter().chain(self.mdl.iter())
    }

    /// Every core pattern, SMARTS first.
    pub fn core_patterns(&self) -> Vec<&PatternDef> {
        self.all_patterns().filter(|p| p.is_core()).collect()
    }

    /// Look a user-visible pattern up by name.
    pub fn get(&self, name: &str) -> Option<&PatternDef> {
        self.all_patterns().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.smarts.len() + self.mdl.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add or replace a SMARTS definition.
    ///
    /// A new name becomes both a full and a substitution definition. An
    /// existing name is replaced wherever it is held, but only when
    /// `overwrite` is set. Returns whether the library changed.
    pub fn add_smarts_definition(&mut self, name: &str, smarts: &str, overwrite: bool) -> bool {
        let in_full = self.smarts.iter().position(|p| p.name == name);
        let in_subs = self.subs.contains(name);
        if (in_full.is_some() || in_subs) && !overwrite {
            debug!(name, "keeping existing SMARTS definition");
            return false;
        }
        match in_full {
            Some(i) => self.smarts[i].source = PatternSource::Smarts(smarts.to_string()),
            None if !in_subs => self.smarts.push(PatternDef::new(
                name,
                PatternSource::Smarts(smarts.to_string()),
                &self.core_prefix,
            )),
            None => {}
        }
        self.subs.insert(name, smarts);
        true
    }

    /// Add a substitution-only definition, replacing any previous body.
    pub fn add_substitution(&mut self, name: &str, smarts: &str) {
        if let Some(p) = self.smarts.iter_mut().find(|p| p.name == name) {
            p.source = PatternSource::Smarts(smarts.to_string());
        }
        self.subs.insert(name, smarts);
    }

    /// Parse a SMARTS definition file.
    ///
    /// Each line is `name smarts [flag flag]`, whitespace separated. A fourth
    /// field of `0` marks a substitution-only definition. Blank lines and
    /// lines starting with `#` are skipped; later lines replace earlier ones
    /// of the same name.
    pub fn parse_smarts_file(text: &str) -> Result<Self> {
        let mut lib = PatternLibrary::default();
        lib.merge_smarts_text(text)?;
        Ok(lib)
    }

    /// Add the definitions in `text` to this library. Nothing is added if
    /// any line is malformed. Returns the number of definitions read.
    pub fn merge_smarts_text(&mut self, text: &str) -> Result<usize> {
        let mut parsed = Vec::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let full = match fields.as_slice() {
                [_, _] | [_, _, _] => true,
                [_, _, _, "1"] => true,
                [_, _, _, "0"] => false,
                [_, _, _, flag] => {
                    return Err(CorescopeError::Parse(format!(
                        "SMARTS file line {}: bad definition flag '{flag}'",
                        i + 1
                    )))
                }
                _ => {
                    return Err(CorescopeError::Parse(format!(
                        "SMARTS file line {}: expected 'name smarts [flags]', found {} fields",
                        i + 1,
                        fields.len()
                    )))
                }
            };
            parsed.push((fields[0], fields[1], full));
        }

        let count = parsed.len();
        for (name, smarts, full) in parsed {
            if full {
                self.add_smarts_definition(name, smarts, true);
            } else {
                self.add_substitution(name, smarts);
            }
        }
        debug!(count, "read SMARTS definitions");
        Ok(count)
    }

    /// Read a SMARTS definition file from disk.
    pub fn read_smarts_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let text = read_text(path.as_ref())?;
        self.merge_smarts_text(&text)
    }

    /// Render the SMARTS definitions in the format [`parse_smarts_file`](Self::parse_smarts_file) reads.
    pub fn write_smarts_file(&self) -> String {
        let mut out = String::from("#\n# SMARTS definitions\n#\n# Full Definitions\n#\n");
        for p in &self.smarts {
            let _ = writeln!(out, "{}\t{}\t1\t1", p.name, p.source.text());
        }
        out.push_str("#\n# Sub-Definitions (Vector Bindings)\n#\n");
        for (name, smarts) in self.subs.iter() {
            if !self.smarts.iter().any(|p| p.name == name) {
                let _ = writeln!(out, "{name}\t{smarts}\t1\t0");
            }
        }
        out
    }

    /// Write the SMARTS definitions to `path`.
    pub fn save_smarts_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.write_smarts_file()).map_err(|e| io_error(path, e))
    }

    /// Add every query block in a multi-query MDL file.
    ///
    /// Queries are named `<file_stem>_<n>`, numbered from 1 in file order.
    /// Returns the number of queries added.
    pub fn add_mdl_queries(&mut self, text: &str, file_stem: &str) -> usize {
        let blocks = split_mdl_queries(text);
        let count = blocks.len();
        for (i, block) in blocks.into_iter().enumerate() {
            let name = format!("{file_stem}_{}", i + 1);
            self.mdl.push(PatternDef::new(name, PatternSource::MdlQuery(block), &self.core_prefix));
        }
        debug!(count, file_stem, "read MDL queries");
        count
    }

    /// Read an MDL query file, naming its queries after the file name.
    pub fn read_mdl_query_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let text = read_text(path)?;
        let stem = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "query".to_string());
        Ok(self.add_mdl_queries(&text, &stem))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> CorescopeError {
    CorescopeError::Io(std::io::Error::new(
        e.kind(),
        format!("{}: {}", path.display(), e),
    ))
}

pub(crate) fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| io_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SMARTS_FILE: &str = "\
# test definitions
core_phenyl\tc1ccccc1\t1\t1
hal   [F,Cl,Br,I]   1 0

amide C(=O)N
aryl_halide c$hal 1 1
";

    #[test]
    fn kind_from_prefix() {
        assert_eq!(PatternKind::from_name("core_phenyl", "core"), PatternKind::Core);
        assert_eq!(PatternKind::from_name("Core_phenyl", "core"), PatternKind::Generic);
        assert_eq!(PatternKind::from_name("phenyl_core", "core"), PatternKind::Generic);
        assert_eq!(PatternKind::from_name("anything", ""), PatternKind::Generic);
    }

    #[test]
    fn parse_full_and_sub_definitions() {
        let lib = PatternLibrary::parse_smarts_file(SMARTS_FILE).unwrap();
        let names: Vec<&str> = lib.smarts_patterns().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["core_phenyl", "amide", "aryl_halide"]);
        assert_eq!(lib.substitutions().len(), 4);
        assert_eq!(lib.substitutions().get("hal"), Some("[F,Cl,Br,I]"));
        assert!(lib.get("hal").is_none());
        assert_eq!(lib.core_patterns().len(), 1);
        assert!(lib.get("core_phenyl").unwrap().is_core());
    }

    #[test]
    fn malformed_lines_name_the_line() {
        let err = PatternLibrary::parse_smarts_file("ok C\nbroken\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        let err = PatternLibrary::parse_smarts_file("x C 1 2\n").unwrap_err();
        assert!(matches!(err, CorescopeError::Parse(_)));
    }

    #[test]
    fn failed_merge_leaves_library_unchanged() {
        let mut lib = PatternLibrary::parse_smarts_file(SMARTS_FILE).unwrap();
        assert!(lib.merge_smarts_text("new_one C\na b c d e\n").is_err());
        assert!(lib.get("new_one").is_none());
        assert_eq!(lib.len(), 3);
    }

    #[test]
    fn add_definition_respects_overwrite() {
        let mut lib = PatternLibrary::parse_smarts_file(SMARTS_FILE).unwrap();
        assert!(lib.add_smarts_definition("core_pyridyl", "c1ccncc1", false));
        assert_eq!(lib.substitutions().get("core_pyridyl"), Some("c1ccncc1"));

        assert!(!lib.add_smarts_definition("amide", "C(=O)[NH2]", false));
        assert_eq!(lib.get("amide").unwrap().source.text(), "C(=O)N");
        assert!(lib.add_smarts_definition("amide", "C(=O)[NH2]", true));
        assert_eq!(lib.get("amide").unwrap().source.text(), "C(=O)[NH2]");
        assert_eq!(lib.substitutions().get("amide"), Some("C(=O)[NH2]"));

        // substitution-only names stay substitution-only
        assert!(!lib.add_smarts_definition("hal", "[Cl]", false));
        assert!(lib.add_smarts_definition("hal", "[Cl]", true));
        assert!(lib.get("hal").is_none());
        assert_eq!(lib.substitutions().get("hal"), Some("[Cl]"));
    }

    #[test]
    fn written_file_reads_back() {
        let lib = PatternLibrary::parse_smarts_file(SMARTS_FILE).unwrap();
        let text = lib.write_smarts_file();
        assert!(text.contains("core_phenyl\tc1ccccc1\t1\t1"));
        assert!(text.contains("hal\t[F,Cl,Br,I]\t1\t0"));
        assert_eq!(text.matches("amide").count(), 1);

        let again = PatternLibrary::parse_smarts_file(&text).unwrap();
        assert_eq!(again.smarts_patterns(), lib.smarts_patterns());
        assert_eq!(again.substitutions(), lib.substitutions());
    }

    #[test]
    fn mdl_queries_are_numbered() {
        let block = "q\n  prog\n\n  1  0  0  0  0  0  0  0  0  0999 V2000\n    0.0000    0.0000    0.0000 C   0  0\nM  END\n";
        let text = format!("{block}$$$$\n{block}$$$$\n");
        let mut lib = PatternLibrary::new("core");
        assert_eq!(lib.add_mdl_queries(&text, "core_q.mol"), 2);
        let names: Vec<&str> = lib.mdl_queries().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["core_q.mol_1", "core_q.mol_2"]);
        assert_eq!(lib.core_patterns().len(), 2);
        assert!(matches!(lib.get("core_q.mol_2").unwrap().source, PatternSource::MdlQuery(_)));
    }

    #[test]
    fn files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("defs.smt");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(SMARTS_FILE.as_bytes()).unwrap();

        let mut lib = PatternLibrary::default();
        assert_eq!(lib.read_smarts_file(&path).unwrap(), 4);
        let out = dir.path().join("out.smt");
        lib.save_smarts_file(&out).unwrap();
        let mut back = PatternLibrary::default();
        back.read_smarts_file(&out).unwrap();
        assert_eq!(back.smarts_patterns().len(), 3);

        let missing = lib.read_smarts_file(dir.path().join("nope.smt")).unwrap_err();
        assert!(missing.to_string().contains("nope.smt"));
    }
}
