//! Ring perception: ring bonds, ring atoms and the smallest set of smallest
//! rings (SSSR).

use std::collections::VecDeque;

use crate::molecule::Molecule;

/// Ring facts about one molecule, computed once per match call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingInfo {
    /// SSSR rings, each a closed atom path, sorted by size.
    pub rings: Vec<Vec<usize>>,
    ring_bonds: Vec<bool>,
    ring_bond_count: Vec<usize>,
    ring_sizes: Vec<Vec<usize>>,
}

impl RingInfo {
    pub fn perceive(mol: &Molecule) -> Self {
        let ring_bonds = find_ring_bonds(mol);
        let rings = find_sssr_with(mol, &ring_bonds);

        let mut ring_bond_count = vec![0; mol.atom_count()];
        for (bi, bond) in mol.bonds.iter().enumerate() {
            if ring_bonds[bi] {
                ring_bond_count[bond.atom1] += 1;
                ring_bond_count[bond.atom2] += 1;
            }
        }

        let mut ring_sizes = vec![Vec::new(); mol.atom_count()];
        for ring in &rings {
            for &a in ring {
                ring_sizes[a].push(ring.len());
            }
        }

        RingInfo { rings, ring_bonds, ring_bond_count, ring_sizes }
    }

    pub fn is_ring_atom(&self, atom: usize) -> bool {
        self.ring_bond_count.get(atom).is_some_and(|&c| c > 0)
    }

    pub fn is_ring_bond(&self, bond: usize) -> bool {
        self.ring_bonds.get(bond).copied().unwrap_or(false)
    }

    /// Number of SSSR rings containing the atom.
    pub fn ring_count(&self, atom: usize) -> usize {
        self.ring_sizes.get(atom).map_or(0, Vec::len)
    }

    /// Number of ring bonds incident to the atom.
    pub fn ring_connectivity(&self, atom: usize) -> usize {
        self.ring_bond_count.get(atom).copied().unwrap_or(0)
    }

    /// Whether the atom lies in an SSSR ring of exactly `size` atoms.
    pub fn in_ring_of_size(&self, atom: usize, size: usize) -> bool {
        self.ring_sizes.get(atom).is_some_and(|s| s.contains(&size))
    }

    pub fn smallest_ring_size(&self, atom: usize) -> Option<usize> {
        self.ring_sizes.get(atom)?.iter().copied().min()
    }
}

/// Find the smallest set of smallest rings (SSSR) in a molecule.
pub fn find_sssr(mol: &Molecule) -> Vec<Vec<usize>> {
    find_sssr_with(mol, &find_ring_bonds(mol))
}

fn find_sssr_with(mol: &Molecule, ring_bonds: &[bool]) -> Vec<Vec<usize>> {
    let expected = mol.bond_count() as isize - mol.atom_count() as isize
        + count_components(mol) as isize;
    if expected <= 0 {
        return Vec::new();
    }

    // shortest cycle through each ring bond
    let mut rings: Vec<Vec<usize>> = Vec::new();
    for (bi, bond) in mol.bonds.iter().enumerate() {
        if !ring_bonds[bi] {
            continue;
        }
        if let Some(mut ring) = shortest_path_avoiding(mol, bond.atom1, bond.atom2, bi) {
            normalize_ring(&mut ring);
            if !rings.contains(&ring) {
                rings.push(ring);
            }
        }
    }
    rings.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    rings.truncate(expected as usize);
    rings
}

/// A bond is a ring bond when its endpoints stay connected without it.
fn find_ring_bonds(mol: &Molecule) -> Vec<bool> {
    mol.bonds
        .iter()
        .enumerate()
        .map(|(bi, b)| shortest_path_avoiding(mol, b.atom1, b.atom2, bi).is_some())
        .collect()
}

fn count_components(mol: &Molecule) -> usize {
    let n = mol.atom_count();
    let mut visited = vec![false; n];
    let mut components = 0;
    for start in 0..n {
        if visited[start] {
            continue;
        }
        components += 1;
        let mut queue = VecDeque::from([start]);
        visited[start] = true;
        while let Some(curr) = queue.pop_front() {
            for &(next, _) in &mol.adjacency[curr] {
                if !visited[next] {
                    visited[next] = true;
                    queue.push_back(next);
                }
            }
        }
    }
    components
}

/// BFS path from `start` to `end` that never uses `excluded_bond`.
fn shortest_path_avoiding(
    mol: &Molecule,
    start: usize,
    end: usize,
    excluded_bond: usize,
) -> Option<Vec<usize>> {
    let mut parent = vec![usize::MAX; mol.atom_count()];
    parent[start] = start;
    let mut queue = VecDeque::from([start]);

    while let Some(curr) = queue.pop_front() {
        if curr == end {
            let mut path = vec![end];
            let mut node = end;
            while node != start {
                node = parent[node];
                path.push(node);
            }
            path.reverse();
            return Some(path);
        }
        for &(next, bi) in &mol.adjacency[curr] {
            if bi != excluded_bond && parent[next] == usize::MAX {
                parent[next] = curr;
                queue.push_back(next);
            }
        }
    }
    None
}

/// Rotate to start at the smallest index, walking toward the smaller neighbor.
fn normalize_ring(ring: &mut [usize]) {
    let Some(min_pos) = ring.iter().enumerate().min_by_key(|&(_, &v)| v).map(|(i, _)| i) else {
        return;
    };
    ring.rotate_left(min_pos);
    let n = ring.len();
    if n > 2 && ring[n - 1] < ring[1] {
        ring[1..].reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_smiles;

    #[test]
    fn benzene_one_ring() {
        let mol = parse_smiles("c1ccccc1").unwrap();
        let rings = find_sssr(&mol);
        assert_eq!(rings, vec![vec![0, 1, 2, 3, 4, 5]]);
    }

    #[test]
    fn naphthalene_two_rings() {
        let mol = parse_smiles("c1ccc2ccccc2c1").unwrap();
        let info = RingInfo::perceive(&mol);
        assert_eq!(info.rings.len(), 2);
        assert!(info.rings.iter().all(|r| r.len() == 6));
        // fusion atoms sit in both rings
        assert_eq!(info.ring_count(3), 2);
        assert_eq!(info.ring_connectivity(3), 3);
        assert_eq!(info.ring_count(0), 1);
    }

    #[test]
    fn linker_between_rings_is_not_ring() {
        let mol = parse_smiles("C1CC1CCC1CC1").unwrap();
        let info = RingInfo::perceive(&mol);
        assert_eq!(info.rings.len(), 2);
        assert!(info.is_ring_atom(2));
        assert!(!info.is_ring_atom(3));
        assert!(!info.is_ring_atom(4));
        let linker = mol.bond_between(3, 4).unwrap();
        assert!(!info.is_ring_bond(linker));
        assert!(info.in_ring_of_size(0, 3));
        assert_eq!(info.smallest_ring_size(4), None);
    }

    #[test]
    fn acyclic_no_rings() {
        let mol = parse_smiles("CCCC").unwrap();
        let info = RingInfo::perceive(&mol);
        assert!(info.rings.is_empty());
        assert!(!info.is_ring_atom(0));
        assert!(!info.is_ring_bond(0));
    }
}
