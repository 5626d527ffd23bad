//! Aromaticity perception.
//!
//! Each SSSR ring is tested with a Hückel electron count: every ring atom
//! must contribute a known number of pi electrons and the ring total must be
//! `4n + 2`. Rings are judged against the input bond orders only, so the
//! result does not depend on which ring is visited first. Perceived rings
//! have their atoms and bonds flagged aromatic; implicit hydrogen counts are
//! left as they were derived from the Kekulé form.

use crate::molecule::{BondOrder, Molecule};
use crate::ring::RingInfo;

/// Flag the bonds of every aromatic ring. Bonds already marked aromatic
/// stay aromatic.
pub fn aromatic_ring_bonds(mol: &Molecule) -> Vec<bool> {
    let mut aromatic: Vec<bool> = mol.bonds.iter().map(|b| b.is_aromatic).collect();
    let rings = RingInfo::perceive(mol);

    for ring in &rings.rings {
        let Some(ring_bonds) = closed_path_bonds(mol, ring) else {
            continue;
        };
        if ring_bonds.iter().all(|&b| aromatic[b]) {
            continue;
        }
        if is_aromatic_ring(mol, &rings, ring, &ring_bonds) {
            for b in ring_bonds {
                aromatic[b] = true;
            }
        }
    }
    aromatic
}

/// Perceive aromatic rings and rewrite their atoms and bonds as aromatic.
pub fn perceive_aromaticity(mol: &mut Molecule) {
    let aromatic = aromatic_ring_bonds(mol);
    for (bi, flag) in aromatic.into_iter().enumerate() {
        if !flag || mol.bonds[bi].is_aromatic {
            continue;
        }
        let (a, b) = (mol.bonds[bi].atom1, mol.bonds[bi].atom2);
        mol.bonds[bi].order = BondOrder::Aromatic;
        mol.bonds[bi].is_aromatic = true;
        mol.atoms[a].is_aromatic = true;
        mol.atoms[b].is_aromatic = true;
    }
}

fn closed_path_bonds(mol: &Molecule, ring: &[usize]) -> Option<Vec<usize>> {
    let n = ring.len();
    (0..n)
        .map(|i| mol.bond_between(ring[i], ring[(i + 1) % n]))
        .collect()
}

fn is_aromatic_ring(mol: &Molecule, rings: &RingInfo, ring: &[usize], ring_bonds: &[usize]) -> bool {
    if ring_bonds
        .iter()
        .any(|&b| mol.bonds[b].order == BondOrder::Triple)
    {
        return false;
    }
    let mut total = 0u32;
    for &atom in ring {
        match pi_electrons(mol, rings, atom) {
            Some(e) => total += e,
            None => return false,
        }
    }
    total % 4 == 2
}

/// Pi electrons one ring atom donates, or `None` if it breaks conjugation.
fn pi_electrons(mol: &Molecule, rings: &RingInfo, atom: usize) -> Option<u32> {
    let a = &mol.atoms[atom];
    let mut ring_double = false;
    let mut exo_hetero_double = false;
    let mut aromatic_bond = false;
    for &(other, bi) in &mol.adjacency[atom] {
        let bond = &mol.bonds[bi];
        if bond.is_aromatic {
            aromatic_bond = true;
        } else if bond.order == BondOrder::Double {
            if rings.is_ring_bond(bi) {
                ring_double = true;
            } else if matches!(mol.atoms[other].atomic_number, 7 | 8 | 16) {
                exo_hetero_double = true;
            } else {
                return None;
            }
        }
    }
    if ring_double {
        return Some(1);
    }

    let lone_pair = a.implicit_hydrogens > 0 || mol.degree(atom) >= 3;
    match (a.atomic_number, a.formal_charge) {
        (6, 0) if exo_hetero_double => Some(0),
        (6, 0) if aromatic_bond => Some(1),
        (6, -1) => Some(2),
        (6, 1) => Some(0),
        (7 | 15, 0) if aromatic_bond && !lone_pair => Some(1),
        (7 | 15, 0) if mol.degree(atom) + a.implicit_hydrogens as usize <= 3 => Some(2),
        (7, 1) if aromatic_bond => Some(1),
        (8 | 16 | 34, 0) if mol.degree(atom) == 2 => Some(2),
        (5, 0) => Some(0),
        // wildcard query atoms
        (0, _) if aromatic_bond => Some(1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_smiles;

    fn aromatic_atoms(smiles: &str) -> Vec<bool> {
        parse_smiles(smiles)
            .unwrap()
            .atoms
            .iter()
            .map(|a| a.is_aromatic)
            .collect()
    }

    #[test]
    fn kekule_benzene_becomes_aromatic() {
        let mol = parse_smiles("CC1=CC=CC=C1").unwrap();
        assert!(!mol.atoms[0].is_aromatic);
        assert!(mol.atoms[1..].iter().all(|a| a.is_aromatic));
        assert_eq!(mol.get_bond(1, 2).unwrap().order, BondOrder::Aromatic);
        assert_eq!(mol.get_bond(0, 1).unwrap().order, BondOrder::Single);
        assert_eq!(mol.atoms[2].implicit_hydrogens, 1);
    }

    #[test]
    fn heteroaromatic_kekule_rings() {
        assert!(aromatic_atoms("C1=CC=NC=C1").iter().all(|&a| a));
        assert!(aromatic_atoms("C1=CNC=C1").iter().all(|&a| a));
        assert!(aromatic_atoms("C1=COC=C1").iter().all(|&a| a));
        assert!(aromatic_atoms("C1=CSC=C1").iter().all(|&a| a));
    }

    #[test]
    fn fused_kekule_rings() {
        // the shared bond is single, so the right-hand ring owes its
        // double bonds partly to the left-hand ring
        assert!(aromatic_atoms("C1=CC2=CC=CC=C2C=C1").iter().all(|&a| a));
    }

    #[test]
    fn pyridone_keeps_its_carbonyl() {
        let mol = parse_smiles("O=C1C=CC=CN1").unwrap();
        assert!(!mol.atoms[0].is_aromatic);
        assert!(mol.atoms[1..].iter().all(|a| a.is_aromatic));
        assert_eq!(mol.get_bond(0, 1).unwrap().order, BondOrder::Double);
    }

    #[test]
    fn non_aromatic_rings_are_left_alone() {
        assert!(aromatic_atoms("C1=CCC=C1").iter().all(|&a| !a));
        assert!(aromatic_atoms("C1CCCCC1").iter().all(|&a| !a));
        assert!(aromatic_atoms("C1=CC=CC=CC=C1").iter().all(|&a| !a));
        assert!(aromatic_atoms("C1=CC(=C)C=C1").iter().all(|&a| !a));
    }

    #[test]
    fn aromatic_input_is_unchanged() {
        let mol = parse_smiles("c1ccc2[nH]ccc2c1").unwrap();
        let mut again = mol.clone();
        perceive_aromaticity(&mut again);
        assert_eq!(mol, again);
    }
}
