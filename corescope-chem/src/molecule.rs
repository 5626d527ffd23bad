//! Molecular graph representation.
//!
//! A [`Molecule`] owns its atoms and bonds in dense vectors addressed by
//! index, with an adjacency list of `(neighbor, bond)` pairs per atom.
//! Structural edits keep the storage dense: deleting atoms compacts the
//! vectors and returns the old-to-new index remapping, so any index set built
//! against the molecule before the edit must be translated or rebuilt.

use corescope_core::{Annotated, CorescopeError, Result, Summarizable};

/// Bond order classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BondOrder {
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    /// Numeric bond order for valence calculations.
    pub fn as_f64(self) -> f64 {
        match self {
            BondOrder::Single => 1.0,
            BondOrder::Double => 2.0,
            BondOrder::Triple => 3.0,
            BondOrder::Aromatic => 1.5,
        }
    }
}

/// An atom in a molecular graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MolAtom {
    pub atomic_number: u8,
    pub formal_charge: i8,
    pub isotope: Option<u16>,
    pub is_aromatic: bool,
    pub implicit_hydrogens: u8,
}

impl MolAtom {
    /// A neutral, non-aromatic atom of the given element with no hydrogens.
    pub fn element(atomic_number: u8) -> Self {
        MolAtom {
            atomic_number,
            formal_charge: 0,
            isotope: None,
            is_aromatic: false,
            implicit_hydrogens: 0,
        }
    }
}

/// A bond between two atoms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bond {
    pub atom1: usize,
    pub atom2: usize,
    pub order: BondOrder,
    pub is_aromatic: bool,
}

impl Bond {
    /// A bond of the given order; aromatic order implies the aromatic flag.
    pub fn new(atom1: usize, atom2: usize, order: BondOrder) -> Self {
        Bond {
            atom1,
            atom2,
            order,
            is_aromatic: order == BondOrder::Aromatic,
        }
    }

    /// The endpoint opposite `atom`.
    pub fn other(&self, atom: usize) -> usize {
        if self.atom1 == atom {
            self.atom2
        } else {
            self.atom1
        }
    }
}

/// A molecular graph with atoms, bonds, and adjacency information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Molecule {
    pub name: String,
    pub atoms: Vec<MolAtom>,
    pub bonds: Vec<Bond>,
    /// adjacency[atom_idx] = Vec<(neighbor_atom_idx, bond_idx)>
    pub adjacency: Vec<Vec<(usize, usize)>>,
}

impl Molecule {
    /// Create a new molecule, building the adjacency list from atoms and bonds.
    pub fn new(name: String, atoms: Vec<MolAtom>, bonds: Vec<Bond>) -> Self {
        let adjacency = build_adjacency(atoms.len(), &bonds);
        Molecule { name, atoms, bonds, adjacency }
    }

    /// Number of atoms (graph nodes; implicit hydrogens are not counted).
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Number of bonds.
    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    /// Neighbor atom indices for a given atom.
    pub fn neighbors(&self, atom_idx: usize) -> Vec<usize> {
        self.adjacency[atom_idx].iter().map(|&(n, _)| n).collect()
    }

    /// Graph degree of an atom (number of explicit bonds).
    pub fn degree(&self, atom_idx: usize) -> usize {
        self.adjacency[atom_idx].len()
    }

    /// Index of the bond between two atoms, if any.
    pub fn bond_between(&self, a1: usize, a2: usize) -> Option<usize> {
        self.adjacency
            .get(a1)?
            .iter()
            .find(|&&(n, _)| n == a2)
            .map(|&(_, bi)| bi)
    }

    /// Find the bond between two atoms, if any.
    pub fn get_bond(&self, a1: usize, a2: usize) -> Option<&Bond> {
        self.bond_between(a1, a2).map(|bi| &self.bonds[bi])
    }

    /// Append an atom, returning its index.
    pub fn add_atom(&mut self, atom: MolAtom) -> usize {
        self.atoms.push(atom);
        self.adjacency.push(Vec::new());
        self.atoms.len() - 1
    }

    /// Append a bond, returning its index.
    ///
    /// Fails for out-of-range endpoints, self-loops and duplicate bonds.
    pub fn add_bond(&mut self, atom1: usize, atom2: usize, order: BondOrder) -> Result<usize> {
        let bond = Bond::new(atom1, atom2, order);
        let n = self.atom_count();
        if bond.atom1 >= n || bond.atom2 >= n {
            return Err(CorescopeError::InvalidInput(format!(
                "bond {}-{} references an atom outside 0..{n}",
                bond.atom1, bond.atom2
            )));
        }
        if bond.atom1 == bond.atom2 {
            return Err(CorescopeError::InvalidInput(format!(
                "self-bond on atom {}",
                bond.atom1
            )));
        }
        if self.bond_between(bond.atom1, bond.atom2).is_some() {
            return Err(CorescopeError::InvalidInput(format!(
                "atoms {} and {} are already bonded",
                bond.atom1, bond.atom2
            )));
        }
        let bi = self.bonds.len();
        self.adjacency[bond.atom1].push((bond.atom2, bi));
        self.adjacency[bond.atom2].push((bond.atom1, bi));
        self.bonds.push(bond);
        Ok(bi)
    }

    /// Delete every atom whose `keep` flag is false, together with all bonds
    /// touching it.
    ///
    /// Surviving atoms keep their relative order. The returned vector maps
    /// each old atom index to its new index, or `None` if it was deleted.
    pub fn delete_atoms(&mut self, keep: &[bool]) -> Vec<Option<usize>> {
        let mut remap = vec![None; self.atom_count()];
        let mut atoms = Vec::with_capacity(self.atom_count());
        for (old, atom) in self.atoms.drain(..).enumerate() {
            if keep.get(old).copied().unwrap_or(false) {
                remap[old] = Some(atoms.len());
                atoms.push(atom);
            }
        }

        let bonds: Vec<Bond> = self
            .bonds
            .drain(..)
            .filter_map(|bond| match (remap[bond.atom1], remap[bond.atom2]) {
                (Some(a1), Some(a2)) => Some(Bond { atom1: a1, atom2: a2, ..bond }),
                _ => None,
            })
            .collect();

        self.adjacency = build_adjacency(atoms.len(), &bonds);
        self.atoms = atoms;
        self.bonds = bonds;
        remap
    }

    /// Delete a single atom and its incident bonds.
    pub fn delete_atom(&mut self, atom_idx: usize) -> Result<Vec<Option<usize>>> {
        if atom_idx >= self.atom_count() {
            return Err(CorescopeError::InvalidInput(format!(
                "atom {atom_idx} out of range 0..{}",
                self.atom_count()
            )));
        }
        let mut keep = vec![true; self.atom_count()];
        keep[atom_idx] = false;
        Ok(self.delete_atoms(&keep))
    }

    /// Rebuild the molecule with atoms in a different order.
    ///
    /// `order[new] = old`; the result is the same graph with atom `old`
    /// moved to position `new`, and bonds listed in a matching order.
    pub fn renumbered(&self, order: &[usize]) -> Result<Molecule> {
        let n = self.atom_count();
        let mut inverse = vec![usize::MAX; n];
        if order.len() != n {
            return Err(CorescopeError::InvalidInput(format!(
                "permutation has {} entries for {n} atoms",
                order.len()
            )));
        }
        for (new, &old) in order.iter().enumerate() {
            if old >= n || inverse[old] != usize::MAX {
                return Err(CorescopeError::InvalidInput(
                    "atom order is not a permutation".into(),
                ));
            }
            inverse[old] = new;
        }

        let atoms = order.iter().map(|&old| self.atoms[old].clone()).collect();
        let mut bonds: Vec<Bond> = self
            .bonds
            .iter()
            .map(|b| Bond {
                atom1: inverse[b.atom1],
                atom2: inverse[b.atom2],
                ..b.clone()
            })
            .collect();
        bonds.sort_by_key(|b| (b.atom1.min(b.atom2), b.atom1.max(b.atom2)));
        Ok(Molecule::new(self.name.clone(), atoms, bonds))
    }

    /// Same atoms in the same order joined by the same bonds, ignoring the
    /// name and the order in which bonds were added.
    pub fn structurally_equal(&self, other: &Molecule) -> bool {
        if self.atoms != other.atoms || self.bond_count() != other.bond_count() {
            return false;
        }
        self.bonds.iter().all(|b| {
            other
                .get_bond(b.atom1, b.atom2)
                .is_some_and(|ob| ob.order == b.order && ob.is_aromatic == b.is_aromatic)
        })
    }
}

fn build_adjacency(atom_count: usize, bonds: &[Bond]) -> Vec<Vec<(usize, usize)>> {
    let mut adjacency = vec![Vec::new(); atom_count];
    for (bi, bond) in bonds.iter().enumerate() {
        adjacency[bond.atom1].push((bond.atom2, bi));
        adjacency[bond.atom2].push((bond.atom1, bi));
    }
    adjacency
}

impl Annotated for Molecule {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Summarizable for Molecule {
    fn summary(&self) -> String {
        format!(
            "{}: {} atoms, {} bonds",
            if self.name.is_empty() { "Molecule" } else { &self.name },
            self.atom_count(),
            self.bond_count()
        )
    }
}
