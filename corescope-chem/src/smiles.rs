//! SMILES reader.

use std::collections::BTreeMap;

use corescope_core::{CorescopeError, Result};

use crate::aromatic::perceive_aromaticity;
use crate::element::element_by_number;
use crate::lex::Cursor;
use crate::molecule::{Bond, BondOrder, MolAtom, Molecule};

/// Parse a SMILES string into an unnamed `Molecule`.
pub fn parse_smiles(smiles: &str) -> Result<Molecule> {
    parse_smiles_named(smiles, "")
}

/// Parse a SMILES string into a `Molecule` with a given name.
///
/// Rings written in Kekulé form are perceived as aromatic, so `C1=CC=CC=C1`
/// and `c1ccccc1` give the same graph.
pub fn parse_smiles_named(smiles: &str, name: &str) -> Result<Molecule> {
    let smiles = smiles.trim();
    if smiles.is_empty() {
        return Err(CorescopeError::Parse("empty SMILES string".into()));
    }
    let mut reader = SmilesReader::new(smiles);
    reader.read()?;
    reader.finish()?;
    let mut mol = Molecule::new(name.to_string(), reader.atoms, reader.bonds);
    assign_implicit_hydrogens(&mut mol, &reader.bracketed);
    perceive_aromaticity(&mut mol);
    Ok(mol)
}

struct SmilesReader<'a> {
    cursor: Cursor<'a>,
    atoms: Vec<MolAtom>,
    bonds: Vec<Bond>,
    /// Bracket atoms carry their own hydrogen count.
    bracketed: Vec<bool>,
    /// Open ring closures: label -> (atom, bond order written at the opening)
    open_rings: BTreeMap<u16, (usize, Option<BondOrder>)>,
    branches: Vec<Option<usize>>,
    prev_atom: Option<usize>,
    pending_bond: Option<BondOrder>,
}

impl<'a> SmilesReader<'a> {
    fn new(input: &'a str) -> Self {
        SmilesReader {
            cursor: Cursor::new(input),
            atoms: Vec::new(),
            bonds: Vec::new(),
            bracketed: Vec::new(),
            open_rings: BTreeMap::new(),
            branches: Vec::new(),
            prev_atom: None,
            pending_bond: None,
        }
    }

    fn read(&mut self) -> Result<()> {
        while let Some(ch) = self.cursor.peek() {
            match ch {
                b'(' => {
                    self.cursor.advance();
                    if self.prev_atom.is_none() {
                        return Err(self.cursor.error("branch without preceding atom"));
                    }
                    self.branches.push(self.prev_atom);
                }
                b')' => {
                    self.cursor.advance();
                    self.prev_atom = self
                        .branches
                        .pop()
                        .ok_or_else(|| self.cursor.error("unmatched ')'"))?;
                    self.pending_bond = None;
                }
                b'-' | b'=' | b'#' | b':' => {
                    self.cursor.advance();
                    self.pending_bond = Some(match ch {
                        b'-' => BondOrder::Single,
                        b'=' => BondOrder::Double,
                        b'#' => BondOrder::Triple,
                        _ => BondOrder::Aromatic,
                    });
                }
                // cis/trans marks carry no connectivity
                b'/' | b'\\' => {
                    self.cursor.advance();
                }
                b'.' => {
                    self.cursor.advance();
                    self.prev_atom = None;
                    self.pending_bond = None;
                }
                b'%' | b'0'..=b'9' => {
                    let label = self.cursor.ring_label()?;
                    self.ring_closure(label)?;
                }
                b'[' => self.bracket_atom()?,
                _ => {
                    let (atomic_number, is_aromatic) =
                        self.cursor.organic_atom().ok_or_else(|| {
                            self.cursor
                                .error(&format!("unexpected character '{}'", ch as char))
                        })?;
                    let atom = MolAtom { is_aromatic, ..MolAtom::element(atomic_number) };
                    self.push_atom(atom, false)?;
                }
            }
        }
        Ok(())
    }

    fn bracket_atom(&mut self) -> Result<()> {
        self.cursor.expect(b'[', "to open bracket atom")?;
        let isotope = self.cursor.number();
        let (atomic_number, is_aromatic) = self
            .cursor
            .bracket_element()
            .ok_or_else(|| self.cursor.error("expected element symbol in bracket atom"))?;

        // tetrahedral marks are accepted and ignored
        while self.cursor.eat(b'@') {}

        let mut hydrogens = 0u8;
        if self.cursor.eat(b'H') {
            hydrogens = self.cursor.number().map_or(1, |n| n.min(u8::MAX as u32) as u8);
        }
        let formal_charge = self.cursor.charge();

        // atom class
        if self.cursor.eat(b':') && self.cursor.number().is_none() {
            return Err(self.cursor.error("expected atom class after ':'"));
        }
        self.cursor.expect(b']', "to close bracket atom")?;

        let atom = MolAtom {
            atomic_number,
            formal_charge,
            isotope: isotope.map(|n| n.min(u16::MAX as u32) as u16),
            is_aromatic,
            implicit_hydrogens: hydrogens,
        };
        self.push_atom(atom, true)
    }

    fn push_atom(&mut self, atom: MolAtom, bracketed: bool) -> Result<()> {
        let idx = self.atoms.len();
        self.atoms.push(atom);
        self.bracketed.push(bracketed);
        if let Some(prev) = self.prev_atom {
            let order = self.pending_bond.take();
            self.connect(prev, idx, order)?;
        }
        self.pending_bond = None;
        self.prev_atom = Some(idx);
        Ok(())
    }

    fn ring_closure(&mut self, label: u16) -> Result<()> {
        let current = self
            .prev_atom
            .ok_or_else(|| self.cursor.error("ring closure without preceding atom"))?;
        match self.open_rings.remove(&label) {
            Some((open_atom, open_order)) => {
                if open_atom == current {
                    return Err(self.cursor.error("ring closure bonds an atom to itself"));
                }
                let order = self.pending_bond.take().or(open_order);
                self.connect(open_atom, current, order)?;
            }
            None => {
                let order = self.pending_bond.take();
                self.open_rings.insert(label, (current, order));
            }
        }
        Ok(())
    }

    /// Bond two atoms; an unwritten bond between aromatic atoms is aromatic.
    fn connect(&mut self, a: usize, b: usize, written: Option<BondOrder>) -> Result<()> {
        let both_aromatic = self.atoms[a].is_aromatic && self.atoms[b].is_aromatic;
        let order = written.unwrap_or(if both_aromatic {
            BondOrder::Aromatic
        } else {
            BondOrder::Single
        });
        if self
            .bonds
            .iter()
            .any(|bd| (bd.atom1 == a && bd.atom2 == b) || (bd.atom1 == b && bd.atom2 == a))
        {
            return Err(self.cursor.error(&format!("duplicate bond between atoms {a} and {b}")));
        }
        self.bonds.push(Bond {
            atom1: a,
            atom2: b,
            order,
            is_aromatic: order == BondOrder::Aromatic,
        });
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        if !self.open_rings.is_empty() {
            let open: Vec<_> = self.open_rings.keys().collect();
            return Err(CorescopeError::Parse(format!(
                "unmatched ring closure(s): {open:?}"
            )));
        }
        if !self.branches.is_empty() {
            return Err(CorescopeError::Parse(format!(
                "{} unmatched '(' in SMILES",
                self.branches.len()
            )));
        }
        if self.pending_bond.is_some() {
            return Err(CorescopeError::Parse("dangling bond at end of SMILES".into()));
        }
        Ok(())
    }
}

/// Fill in implicit hydrogens for atoms written without brackets.
fn assign_implicit_hydrogens(mol: &mut Molecule, bracketed: &[bool]) {
    for i in 0..mol.atom_count() {
        if bracketed[i] {
            continue;
        }
        if let Some(h) = default_implicit_hydrogens(mol, i) {
            mol.atoms[i].implicit_hydrogens = h;
        }
    }
}

/// Hydrogens a bracketless atom would carry: the lowest default valence
/// that fits its explicit bonds, minus their order sum. `None` for elements
/// without default valences.
pub(crate) fn default_implicit_hydrogens(mol: &Molecule, idx: usize) -> Option<u8> {
    let atom = &mol.atoms[idx];
    let elem = element_by_number(atom.atomic_number)?;
    let base = *elem.valences.first()? as usize;
    if atom.is_aromatic {
        // one electron goes to the pi system; aromatic bonds count as sigma
        let used = mol.adjacency[idx]
            .iter()
            .map(|&(_, bi)| match mol.bonds[bi].order {
                BondOrder::Aromatic | BondOrder::Single => 1,
                BondOrder::Double => 2,
                BondOrder::Triple => 3,
            })
            .sum::<usize>()
            + 1;
        return Some(base.saturating_sub(used) as u8);
    }
    let used = mol.adjacency[idx]
        .iter()
        .map(|&(_, bi)| mol.bonds[bi].order.as_f64())
        .sum::<f64>()
        .round() as usize;
    let target = elem.valences.iter().map(|&v| v as usize).find(|&v| v >= used)?;
    Some((target - used) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_methane() {
        let mol = parse_smiles("C").unwrap();
        assert_eq!(mol.atom_count(), 1);
        assert_eq!(mol.bond_count(), 0);
        assert_eq!(mol.atoms[0].atomic_number, 6);
        assert_eq!(mol.atoms[0].implicit_hydrogens, 4);
    }

    #[test]
    fn parse_ethanol() {
        let mol = parse_smiles_named("CCO", "ethanol").unwrap();
        assert_eq!(mol.name, "ethanol");
        assert_eq!(mol.bond_count(), 2);
        let hs: Vec<u8> = mol.atoms.iter().map(|a| a.implicit_hydrogens).collect();
        assert_eq!(hs, vec![3, 2, 1]);
    }

    #[test]
    fn parse_toluene() {
        let mol = parse_smiles("c1ccccc1C").unwrap();
        assert_eq!(mol.atom_count(), 7);
        assert_eq!(mol.bond_count(), 7);
        for i in 0..6 {
            assert!(mol.atoms[i].is_aromatic);
        }
        assert_eq!(mol.atoms[0].implicit_hydrogens, 1);
        assert_eq!(mol.atoms[5].implicit_hydrogens, 0);
        assert_eq!(mol.atoms[6].implicit_hydrogens, 3);
        assert_eq!(mol.get_bond(0, 5).unwrap().order, BondOrder::Aromatic);
        assert_eq!(mol.get_bond(5, 6).unwrap().order, BondOrder::Single);
    }

    #[test]
    fn explicit_single_between_aromatic_atoms() {
        let mol = parse_smiles("c1ccccc1-c1ccccc1").unwrap();
        assert_eq!(mol.atom_count(), 12);
        assert_eq!(mol.get_bond(5, 6).unwrap().order, BondOrder::Single);
    }

    #[test]
    fn branches_and_double_bonds() {
        let mol = parse_smiles("CC(=O)O").unwrap();
        assert_eq!(mol.degree(1), 3);
        assert_eq!(mol.get_bond(1, 2).unwrap().order, BondOrder::Double);
        assert_eq!(mol.atoms[2].implicit_hydrogens, 0);
        assert_eq!(mol.atoms[3].implicit_hydrogens, 1);
    }

    #[test]
    fn hypervalent_sulfur_uses_next_valence() {
        let mol = parse_smiles("CS(=O)(=O)C").unwrap();
        assert_eq!(mol.atoms[1].implicit_hydrogens, 0);
    }

    #[test]
    fn bracket_atoms() {
        let mol = parse_smiles("[NH4+]").unwrap();
        assert_eq!(mol.atoms[0].formal_charge, 1);
        assert_eq!(mol.atoms[0].implicit_hydrogens, 4);

        let mol = parse_smiles("[13CH3][Xe]").unwrap();
        assert_eq!(mol.atoms[0].isotope, Some(13));
        assert_eq!(mol.atoms[1].atomic_number, 54);
        assert_eq!(mol.atoms[1].implicit_hydrogens, 0);

        let mol = parse_smiles("c1ccsc1").unwrap();
        assert_eq!(mol.atoms[3].implicit_hydrogens, 0);

        let mol = parse_smiles("c1cc[nH]c1").unwrap();
        assert_eq!(mol.atoms[3].implicit_hydrogens, 1);
        assert!(mol.atoms[3].is_aromatic);

        let mol = parse_smiles("[C@@H](F)(Cl)Br").unwrap();
        assert_eq!(mol.atoms[0].implicit_hydrogens, 1);
    }

    #[test]
    fn two_digit_ring_closure() {
        let mol = parse_smiles("C%10CCCCCCCCC%10").unwrap();
        assert_eq!(mol.atom_count(), 10);
        assert_eq!(mol.bond_count(), 10);
    }

    #[test]
    fn disconnected_components() {
        let mol = parse_smiles("[Na+].[Cl-]").unwrap();
        assert_eq!(mol.atom_count(), 2);
        assert_eq!(mol.bond_count(), 0);
    }

    #[test]
    fn invalid_smiles_error() {
        for bad in ["", "C(", "C1CC", "[", "C)", "(C)", "C=", "Q", "C11", "[Zz]"] {
            assert!(parse_smiles(bad).is_err(), "'{bad}' should fail");
        }
    }
}
