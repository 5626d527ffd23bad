//! Engine configuration and saved session inputs.

use std::path::PathBuf;

use corescope_table::LoadPolicy;

use crate::decompose::MatchPolicy;

/// Settings shared by the orchestrator, decomposer and table loader.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// How many embeddings of a core are decomposed per molecule (default: first only).
    pub match_policy: MatchPolicy,
    /// What the table loader does with malformed rows (default: skip the row).
    pub load_policy: LoadPolicy,
    /// Name prefix marking core patterns and core molecules (default: `core`).
    pub core_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_policy: MatchPolicy::FirstOnly,
            load_policy: LoadPolicy::SkipRow,
            core_prefix: "core".to_string(),
        }
    }
}

/// The four input files a session starts from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionSettings {
    pub molecule_file: Option<PathBuf>,
    pub smarts_file: Option<PathBuf>,
    pub mdl_query_file: Option<PathBuf>,
    pub data_file: Option<PathBuf>,
}

impl SessionSettings {
    /// True when no input file is set.
    pub fn is_empty(&self) -> bool {
        self.molecule_file.is_none()
            && self.smarts_file.is_none()
            && self.mdl_query_file.is_none()
            && self.data_file.is_none()
    }

    /// Fill unset fields from `other`.
    pub fn merge_missing(&mut self, other: SessionSettings) {
        self.molecule_file = self.molecule_file.take().or(other.molecule_file);
        self.smarts_file = self.smarts_file.take().or(other.smarts_file);
        self.mdl_query_file = self.mdl_query_file.take().or(other.mdl_query_file);
        self.data_file = self.data_file.take().or(other.data_file);
    }
}

#[cfg(feature = "serde")]
mod json {
    use std::fs;
    use std::path::Path;

    use corescope_core::{CorescopeError, Result};

    use super::SessionSettings;

    impl SessionSettings {
        pub fn from_json(text: &str) -> Result<Self> {
            serde_json::from_str(text).map_err(|e| CorescopeError::Serialization(e.to_string()))
        }

        pub fn to_json(&self) -> Result<String> {
            serde_json::to_string_pretty(self).map_err(|e| CorescopeError::Serialization(e.to_string()))
        }

        /// Read settings from a JSON file.
        pub fn load(path: impl AsRef<Path>) -> Result<Self> {
            let path = path.as_ref();
            let text = fs::read_to_string(path).map_err(|e| {
                CorescopeError::Io(std::io::Error::new(
                    e.kind(),
                    format!("{}: {}", path.display(), e),
                ))
            })?;
            Self::from_json(&text)
        }

        /// Write settings to a JSON file, replacing it.
        pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
            let path = path.as_ref();
            fs::write(path, self.to_json()?).map_err(|e| {
                CorescopeError::Io(std::io::Error::new(
                    e.kind(),
                    format!("{}: {}", path.display(), e),
                ))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.match_policy, MatchPolicy::FirstOnly);
        assert_eq!(cfg.load_policy, LoadPolicy::SkipRow);
        assert_eq!(cfg.core_prefix, "core");
        assert!(SessionSettings::default().is_empty());
    }

    #[test]
    fn merge_keeps_explicit_values() {
        let mut s = SessionSettings {
            molecule_file: Some("a.smi".into()),
            ..Default::default()
        };
        s.merge_missing(SessionSettings {
            molecule_file: Some("b.smi".into()),
            data_file: Some("t.csv".into()),
            ..Default::default()
        });
        assert_eq!(s.molecule_file, Some(PathBuf::from("a.smi")));
        assert_eq!(s.data_file, Some(PathBuf::from("t.csv")));
        assert!(s.smarts_file.is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn settings_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let s = SessionSettings {
            molecule_file: Some("mols.smi".into()),
            smarts_file: Some("patterns.smt".into()),
            ..Default::default()
        };
        s.save(&path).unwrap();
        assert_eq!(SessionSettings::load(&path).unwrap(), s);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn partial_json_uses_defaults() {
        let s = SessionSettings::from_json(r#"{"data_file": "t.csv"}"#).unwrap();
        assert_eq!(s.data_file, Some(PathBuf::from("t.csv")));
        assert!(s.molecule_file.is_none());
        let cfg: EngineConfig = serde_json::from_str(r#"{"core_prefix": "scaffold"}"#).unwrap();
        assert_eq!(cfg.core_prefix, "scaffold");
        assert_eq!(cfg.load_policy, LoadPolicy::SkipRow);
        assert!(SessionSettings::from_json("[").is_err());
    }
}
