//! Named SMARTS fragments that other patterns can splice in as `$name`.
//!
//! Inside a bracket atom `$name` becomes the recursive query `$(def)`;
//! in an atom position outside brackets it becomes `[$(def)]`. Definitions
//! may themselves reference other definitions.

use std::collections::BTreeMap;

use corescope_core::{CorescopeError, Result};

/// Substitution definitions keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubstitutionDefs {
    defs: BTreeMap<String, String>,
}

impl SubstitutionDefs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a definition, returning the previous text.
    pub fn insert(&mut self, name: impl Into<String>, smarts: impl Into<String>) -> Option<String> {
        self.defs.insert(name.into(), smarts.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.defs.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.defs.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.defs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

impl FromIterator<(String, String)> for SubstitutionDefs {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        SubstitutionDefs { defs: iter.into_iter().collect() }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scope {
    Bracket,
    Recursive,
    Branch,
}

fn is_name_byte(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

/// Replace every `$name` reference in `smarts` by its definition.
///
/// `pattern_name` only labels errors. An undefined reference yields
/// [`CorescopeError::UnresolvedSubstitution`]; a definition that refers back
/// to itself yields [`CorescopeError::PatternCompile`].
pub fn expand_substitutions(
    pattern_name: &str,
    smarts: &str,
    defs: &SubstitutionDefs,
) -> Result<String> {
    let mut active = Vec::new();
    expand(pattern_name, smarts, defs, &mut active)
}

fn expand<'d>(
    pattern_name: &str,
    smarts: &str,
    defs: &'d SubstitutionDefs,
    active: &mut Vec<&'d str>,
) -> Result<String> {
    let bytes = smarts.as_bytes();
    let mut out = String::with_capacity(smarts.len());
    let mut scopes: Vec<Scope> = Vec::new();
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'[' => scopes.push(Scope::Bracket),
            b']' => {
                if scopes.last() == Some(&Scope::Bracket) {
                    scopes.pop();
                }
            }
            b'(' => scopes.push(Scope::Branch),
            b')' => {
                scopes.pop();
            }
            b'$' if bytes.get(i + 1) == Some(&b'(') => {
                scopes.push(Scope::Recursive);
                i += 2;
                continue;
            }
            b'$' => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_name_byte(bytes[end]) {
                    end += 1;
                }
                if end == start {
                    return Err(CorescopeError::pattern_compile(
                        pattern_name,
                        format!("'$' without a name at position {i}"),
                    ));
                }
                let reference = &smarts[start..end];
                let Some((key, body)) = defs.defs.get_key_value(reference) else {
                    return Err(CorescopeError::UnresolvedSubstitution {
                        name: pattern_name.to_string(),
                        reference: reference.to_string(),
                    });
                };
                if active.contains(&key.as_str()) {
                    return Err(CorescopeError::pattern_compile(
                        pattern_name,
                        format!("substitution '${reference}' refers to itself"),
                    ));
                }
                active.push(key.as_str());
                let body = expand(pattern_name, body, defs, active)?;
                active.pop();

                out.push_str(&smarts[copied..i]);
                if scopes.last() == Some(&Scope::Bracket) {
                    out.push_str(&format!("$({body})"));
                } else {
                    out.push_str(&format!("[$({body})]"));
                }
                copied = end;
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    out.push_str(&smarts[copied..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs(pairs: &[(&str, &str)]) -> SubstitutionDefs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn no_references_is_identity() {
        let d = SubstitutionDefs::new();
        assert_eq!(expand_substitutions("p", "c1ccccc1[$(O)]", &d).unwrap(), "c1ccccc1[$(O)]");
    }

    #[test]
    fn bracket_and_atom_positions() {
        let d = defs(&[("hal", "[F,Cl,Br,I]")]);
        assert_eq!(
            expand_substitutions("p", "c[$hal]", &d).unwrap(),
            "c[$([F,Cl,Br,I])]"
        );
        assert_eq!(
            expand_substitutions("p", "c$hal", &d).unwrap(),
            "c[$([F,Cl,Br,I])]"
        );
        assert_eq!(
            expand_substitutions("p", "[C;!$hal]", &d).unwrap(),
            "[C;!$([F,Cl,Br,I])]"
        );
    }

    #[test]
    fn atom_position_inside_recursive_group() {
        let d = defs(&[("o", "O")]);
        assert_eq!(expand_substitutions("p", "[$(C$o)]", &d).unwrap(), "[$(C[$(O)])]");
    }

    #[test]
    fn nested_definitions() {
        let d = defs(&[("acid", "C(=O)$oh"), ("oh", "[OH]")]);
        assert_eq!(
            expand_substitutions("p", "c$acid", &d).unwrap(),
            "c[$(C(=O)[$([OH])])]"
        );
    }

    #[test]
    fn undefined_reference() {
        let err = expand_substitutions("core1", "c[$nope]", &SubstitutionDefs::new()).unwrap_err();
        match err {
            CorescopeError::UnresolvedSubstitution { name, reference } => {
                assert_eq!(name, "core1");
                assert_eq!(reference, "nope");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn cycles_are_rejected() {
        let d = defs(&[("a", "C$b"), ("b", "N$a")]);
        let err = expand_substitutions("p", "$a", &d).unwrap_err();
        assert!(matches!(err, CorescopeError::PatternCompile { .. }));
    }

    #[test]
    fn defs_collection_ops() {
        let mut d = SubstitutionDefs::new();
        assert!(d.is_empty());
        assert_eq!(d.insert("x", "C"), None);
        assert_eq!(d.insert("x", "N"), Some("C".to_string()));
        assert!(d.contains("x"));
        assert_eq!(d.get("x"), Some("N"));
        assert_eq!(d.iter().collect::<Vec<_>>(), vec![("x", "N")]);
        assert_eq!(d.remove("x"), Some("N".to_string()));
        assert_eq!(d.len(), 0);
    }
}
