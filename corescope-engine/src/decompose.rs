//! Core/R-group decomposition.
//!
//! Given one embedding of a core pattern, every molecule atom adjacent to the
//! core (but not in it) roots one substituent. The substituent is cut out of
//! a private copy of the molecule by breadth-first search, with core atoms as
//! the boundary, and every bond that had to be cut is replaced by a tag atom:
//! Xe where the bond left the substituent's root atom, Y everywhere else.
//! The tagged fragment's canonical SMILES identifies the substituent.

use std::collections::VecDeque;

use corescope_chem::{BondOrder, Match, MolAtom, Molecule, Toolkit, BRIDGE_TAG, ROOT_TAG};
use corescope_core::Result;

/// Which core embeddings are decomposed.
///
/// Only the first embedding found is used. Embeddings that differ by the
/// core's symmetry are not distinguished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MatchPolicy {
    #[default]
    FirstOnly,
}

/// One substituent found on a core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Substituent {
    /// Index of the core atom in match order.
    pub position: usize,
    /// Canonical SMILES of the tagged fragment.
    pub fragment: String,
}

/// Splits matched molecules into core and substituents.
#[derive(Debug, Clone, Copy)]
pub struct CoreDecomposer<'a, T: Toolkit> {
    toolkit: &'a T,
}

impl<'a, T: Toolkit> CoreDecomposer<'a, T> {
    pub fn new(toolkit: &'a T) -> Self {
        CoreDecomposer { toolkit }
    }

    /// Substituents of `mol` around `core_match`, one per bond leaving the
    /// core, in match order. `mol` is never modified.
    pub fn decompose(&self, mol: &Molecule, core_match: &Match) -> Result<Vec<Substituent>> {
        let in_core = core_membership(mol, core_match);
        let mut out = Vec::new();
        for (position, &core_atom) in core_match.atoms.iter().enumerate() {
            for &(neighbor, _) in &mol.adjacency[core_atom] {
                if in_core[neighbor] {
                    continue;
                }
                let fragment = tagged_fragment(mol, neighbor, &in_core)?;
                out.push(Substituent {
                    position,
                    fragment: self.toolkit.canonicalize(&fragment),
                });
            }
        }
        Ok(out)
    }
}

/// Flags every atom of `mol` touched by `core_match`.
pub fn core_membership(mol: &Molecule, core_match: &Match) -> Vec<bool> {
    let mut in_core = vec![false; mol.atom_count()];
    for &a in &core_match.atoms {
        if let Some(flag) = in_core.get_mut(a) {
            *flag = true;
        }
    }
    in_core
}

/// Atoms reachable from `root` without entering the core.
fn reachable_from(mol: &Molecule, root: usize, in_core: &[bool]) -> Vec<bool> {
    let mut keep = vec![false; mol.atom_count()];
    let mut seen = in_core.to_vec();
    let mut queue = VecDeque::new();
    seen[root] = true;
    queue.push_back(root);

    while let Some(curr) = queue.pop_front() {
        keep[curr] = true;
        for &(neighbor, _) in &mol.adjacency[curr] {
            if !seen[neighbor] {
                seen[neighbor] = true;
                queue.push_back(neighbor);
            }
        }
    }
    keep
}

/// Cut the substituent rooted at `root` out of a copy of `mol`.
///
/// Every bond from a kept atom to a removed atom is replaced by a bond of
/// the same order to a new tag atom ([`ROOT_TAG`] on `root`, [`BRIDGE_TAG`]
/// elsewhere).
pub fn tagged_fragment(mol: &Molecule, root: usize, in_core: &[bool]) -> Result<Molecule> {
    let mut keep = reachable_from(mol, root, in_core);
    let mut fragment = mol.clone();

    let mut severed: Vec<(usize, BondOrder)> = Vec::new();
    for (atom, kept) in keep.iter().enumerate() {
        if *kept {
            continue;
        }
        for &(neighbor, bond) in &mol.adjacency[atom] {
            if keep[neighbor] {
                severed.push((neighbor, mol.bonds[bond].order));
            }
        }
    }

    for (anchor, order) in severed {
        let tag = if anchor == root { ROOT_TAG } else { BRIDGE_TAG };
        let t = fragment.add_atom(MolAtom::element(tag));
        fragment.add_bond(t, anchor, order)?;
        keep.push(true);
    }

    fragment.delete_atoms(&keep);
    Ok(fragment)
}
