//! Canonical SMILES generation.
//!
//! Ranks start from an atom invariant (element, degree, hydrogens, charge,
//! isotope, aromaticity) and are refined with neighbor ranks until the
//! partition stops splitting. Remaining ties are broken one atom at a time
//! and refined again, so every atom ends with a distinct rank. The writer
//! then walks the graph depth-first from the lowest rank, visiting
//! neighbors in rank order. Each connected component is ranked and written
//! on its own.
//!
//! # Example
//!
//! ```
//! use corescope_chem::{canonical_smiles, parse_smiles};
//!
//! let a = parse_smiles("OCC").unwrap();
//! let b = parse_smiles("CCO").unwrap();
//! assert_eq!(canonical_smiles(&a), canonical_smiles(&b));
//! ```

use std::collections::BTreeSet;

use crate::element::{element_by_number, is_organic_subset};
use crate::molecule::{BondOrder, Molecule};
use crate::smiles::default_implicit_hydrogens;

/// Generate a canonical SMILES string for the given molecule.
///
/// Disconnected components are written one at a time and joined with `.` in
/// sorted order, so the result does not depend on how atoms are spread
/// across components.
pub fn canonical_smiles(mol: &Molecule) -> String {
    let (component, count) = connected_components(mol);
    if count <= 1 {
        return write_component(mol);
    }
    let mut parts: Vec<String> = (0..count)
        .map(|c| {
            let keep: Vec<bool> = component.iter().map(|&k| k == c).collect();
            let mut part = mol.clone();
            part.delete_atoms(&keep);
            write_component(&part)
        })
        .collect();
    parts.sort();
    parts.join(".")
}

fn write_component(mol: &Molecule) -> String {
    let n = mol.atom_count();
    if n == 0 {
        return String::new();
    }
    let ranks = canonical_ranks(mol);
    let tree = SpanningTree::build(mol, &ranks);

    let mut writer = Writer {
        mol,
        ranks: &ranks,
        tree: &tree,
        written: vec![false; n],
        open: vec![None; mol.bond_count()],
        free: BTreeSet::new(),
        next_label: 1,
        out: String::new(),
    };
    for &root in &tree.roots {
        if !writer.out.is_empty() {
            writer.out.push('.');
        }
        writer.write_atom_tree(root, None);
    }
    writer.out
}

/// Component index of every atom, numbered in order of first appearance,
/// and the number of components.
fn connected_components(mol: &Molecule) -> (Vec<usize>, usize) {
    let n = mol.atom_count();
    let mut component = vec![usize::MAX; n];
    let mut count = 0;
    for start in 0..n {
        if component[start] != usize::MAX {
            continue;
        }
        component[start] = count;
        let mut stack = vec![start];
        while let Some(atom) = stack.pop() {
            for &(nb, _) in &mol.adjacency[atom] {
                if component[nb] == usize::MAX {
                    component[nb] = count;
                    stack.push(nb);
                }
            }
        }
        count += 1;
    }
    (component, count)
}

// ---- ranking ----

/// Distinct canonical ranks, one per atom (0 = first written).
pub fn canonical_ranks(mol: &Molecule) -> Vec<usize> {
    let n = mol.atom_count();
    let initial: Vec<_> = mol
        .atoms
        .iter()
        .enumerate()
        .map(|(i, a)| {
            (
                a.atomic_number,
                mol.degree(i),
                a.implicit_hydrogens,
                a.formal_charge,
                a.isotope.unwrap_or(0),
                a.is_aromatic,
            )
        })
        .collect();
    let mut ranks = dense_ranks(&initial);
    ranks = refine(mol, ranks);

    while class_count(&ranks) < n {
        // smallest rank shared by more than one atom; its lowest-index atom wins
        let mut seen = vec![0usize; n];
        for &r in &ranks {
            seen[r] += 1;
        }
        let Some(tied) = (0..n).find(|&r| seen[r] > 1) else {
            break;
        };
        let Some(chosen) = (0..n).find(|&i| ranks[i] == tied) else {
            break;
        };
        let split: Vec<(usize, bool)> = (0..n).map(|i| (ranks[i], i != chosen)).collect();
        ranks = refine(mol, dense_ranks(&split));
    }
    ranks
}

/// Iterate neighbor-aware ranking until the number of classes is stable.
fn refine(mol: &Molecule, mut ranks: Vec<usize>) -> Vec<usize> {
    let mut classes = class_count(&ranks);
    loop {
        let keys: Vec<(usize, Vec<(usize, BondOrder)>)> = (0..mol.atom_count())
            .map(|i| {
                let mut around: Vec<_> = mol.adjacency[i]
                    .iter()
                    .map(|&(nb, bi)| (ranks[nb], mol.bonds[bi].order))
                    .collect();
                around.sort();
                (ranks[i], around)
            })
            .collect();
        let next = dense_ranks(&keys);
        let next_classes = class_count(&next);
        if next_classes <= classes {
            return ranks;
        }
        ranks = next;
        classes = next_classes;
    }
}

/// Map each key to its position among the sorted distinct keys.
fn dense_ranks<K: Ord>(keys: &[K]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));
    let mut ranks = vec![0; keys.len()];
    let mut rank = 0;
    for w in 0..order.len() {
        if w > 0 && keys[order[w]] != keys[order[w - 1]] {
            rank += 1;
        }
        ranks[order[w]] = rank;
    }
    ranks
}

fn class_count(ranks: &[usize]) -> usize {
    ranks.iter().collect::<BTreeSet<_>>().len()
}

// ---- traversal ----

/// DFS spanning forest in rank order; bonds off the tree become ring closures.
struct SpanningTree {
    roots: Vec<usize>,
    tree_bond: Vec<bool>,
}

impl SpanningTree {
    fn build(mol: &Molecule, ranks: &[usize]) -> Self {
        let n = mol.atom_count();
        let mut visited = vec![false; n];
        let mut tree_bond = vec![false; mol.bond_count()];
        let mut roots = Vec::new();

        let mut by_rank: Vec<usize> = (0..n).collect();
        by_rank.sort_by_key(|&i| ranks[i]);
        for start in by_rank {
            if visited[start] {
                continue;
            }
            roots.push(start);
            Self::visit(mol, ranks, start, &mut visited, &mut tree_bond);
        }
        SpanningTree { roots, tree_bond }
    }

    fn visit(mol: &Molecule, ranks: &[usize], atom: usize, visited: &mut [bool], tree_bond: &mut [bool]) {
        visited[atom] = true;
        for (nb, bi) in sorted_neighbors(mol, ranks, atom) {
            if !visited[nb] {
                tree_bond[bi] = true;
                Self::visit(mol, ranks, nb, visited, tree_bond);
            }
        }
    }
}

fn sorted_neighbors(mol: &Molecule, ranks: &[usize], atom: usize) -> Vec<(usize, usize)> {
    let mut around = mol.adjacency[atom].clone();
    around.sort_by_key(|&(nb, _)| ranks[nb]);
    around
}

struct Writer<'a> {
    mol: &'a Molecule,
    ranks: &'a [usize],
    tree: &'a SpanningTree,
    written: Vec<bool>,
    /// Ring label currently held by each open ring-closure bond.
    open: Vec<Option<usize>>,
    /// Released labels, reused lowest first.
    free: BTreeSet<usize>,
    next_label: usize,
    out: String,
}

impl Writer<'_> {
    fn write_atom_tree(&mut self, atom: usize, parent_bond: Option<usize>) {
        self.written[atom] = true;
        self.write_atom(atom);

        let around = sorted_neighbors(self.mol, self.ranks, atom);

        // ring closures: close first, then open, so a label freed here is
        // not reused on the same atom
        let mut closing = Vec::new();
        for &(nb, bi) in &around {
            if self.tree.tree_bond[bi] || Some(bi) == parent_bond {
                continue;
            }
            if let Some(label) = self.open[bi].filter(|_| self.written[nb]) {
                self.write_label(label);
                self.open[bi] = None;
                closing.push(label);
            }
        }
        for &(nb, bi) in &around {
            if self.tree.tree_bond[bi] || self.written[nb] {
                continue;
            }
            let label = self.take_label();
            self.open[bi] = Some(label);
            self.write_bond(bi);
            self.write_label(label);
        }
        self.free.extend(closing);

        let children: Vec<(usize, usize)> = around
            .into_iter()
            .filter(|&(_, bi)| self.tree.tree_bond[bi] && Some(bi) != parent_bond)
            .collect();
        let last = children.len().saturating_sub(1);
        for (k, &(child, bi)) in children.iter().enumerate() {
            if k < last {
                self.out.push('(');
            }
            self.write_bond(bi);
            self.write_atom_tree(child, Some(bi));
            if k < last {
                self.out.push(')');
            }
        }
    }

    fn take_label(&mut self) -> usize {
        if let Some(label) = self.free.pop_first() {
            return label;
        }
        let label = self.next_label;
        self.next_label += 1;
        label
    }

    fn write_label(&mut self, label: usize) {
        if label < 10 {
            self.out.push_str(&label.to_string());
        } else {
            self.out.push_str(&format!("%{label:02}"));
        }
    }

    fn write_bond(&mut self, bi: usize) {
        let bond = &self.mol.bonds[bi];
        let both_aromatic =
            self.mol.atoms[bond.atom1].is_aromatic && self.mol.atoms[bond.atom2].is_aromatic;
        match bond.order {
            BondOrder::Single if both_aromatic => self.out.push('-'),
            BondOrder::Single => {}
            BondOrder::Double => self.out.push('='),
            BondOrder::Triple => self.out.push('#'),
            BondOrder::Aromatic if both_aromatic => {}
            BondOrder::Aromatic => self.out.push(':'),
        }
    }

    fn write_atom(&mut self, idx: usize) {
        let atom = &self.mol.atoms[idx];
        let symbol = element_by_number(atom.atomic_number).map_or("*", |e| e.symbol);
        let symbol = if atom.is_aromatic {
            symbol.to_ascii_lowercase()
        } else {
            symbol.to_string()
        };

        let plain = atom.formal_charge == 0
            && atom.isotope.is_none()
            && is_organic_subset(atom.atomic_number, atom.is_aromatic)
            && default_implicit_hydrogens(self.mol, idx) == Some(atom.implicit_hydrogens);
        if plain {
            self.out.push_str(&symbol);
            return;
        }

        self.out.push('[');
        if let Some(iso) = atom.isotope {
            self.out.push_str(&iso.to_string());
        }
        self.out.push_str(&symbol);
        match atom.implicit_hydrogens {
            0 => {}
            1 => self.out.push('H'),
            h => self.out.push_str(&format!("H{h}")),
        }
        match atom.formal_charge {
            0 => {}
            1 => self.out.push('+'),
            -1 => self.out.push('-'),
            c if c > 0 => self.out.push_str(&format!("+{c}")),
            c => self.out.push_str(&format!("-{}", c.unsigned_abs())),
        }
        self.out.push(']');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_smiles;

    fn canon(smiles: &str) -> String {
        canonical_smiles(&parse_smiles(smiles).unwrap())
    }

    #[test]
    fn empty_and_single_atom() {
        let mol = Molecule::new("empty".into(), vec![], vec![]);
        assert_eq!(canonical_smiles(&mol), "");
        assert_eq!(canon("C"), "C");
    }

    #[test]
    fn tagged_fragments() {
        assert_eq!(canon("C[Xe]"), "C[Xe]");
        assert_eq!(canon("[Xe]C"), "C[Xe]");
        assert_eq!(canon("[Xe]CC"), "CC[Xe]");
        assert_eq!(canon("CC[Xe]"), "CC[Xe]");
    }

    #[test]
    fn different_inputs_same_output() {
        assert_eq!(canon("OCC"), canon("CCO"));
        assert_eq!(canon("c1ccccc1C"), canon("Cc1ccccc1"));
        assert_eq!(canon("OC(=O)c1ccccc1"), canon("c1ccc(cc1)C(O)=O"));
        assert_eq!(canon("C1CC1CC1CCC1"), canon("C1CCC1CC1CC1"));
        assert_eq!(canon("[Na+].[Cl-]"), canon("[Cl-].[Na+]"));
    }

    #[test]
    fn components_are_written_in_sorted_order() {
        let mol = parse_smiles("C1CCCCC1.C1CC1.C1CC1").unwrap();
        let out = canonical_smiles(&mol);
        assert_eq!(out, "C1CC1.C1CC1.C1CCCCC1");

        // interleave the atoms of the three rings
        let order = [0, 6, 9, 1, 7, 10, 2, 8, 11, 3, 4, 5];
        let shuffled = mol.renumbered(&order).unwrap();
        assert_eq!(canonical_smiles(&shuffled), out);

        let salt = canon("CCO.c1ccccc1.[Na+]");
        let parts: Vec<&str> = salt.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts.windows(2).all(|w| w[0] <= w[1]), "{salt}");
    }

    #[test]
    fn output_reparses_to_same_canonical_form() {
        for smi in [
            "CCO",
            "c1ccc2ccccc2c1",
            "CC(C)(C)C(=O)[O-]",
            "C1CC2CCC1CC2",
            "[13CH3]C#N",
            "c1cc[nH]c1",
            "C[N+](C)(C)C",
        ] {
            let once = canon(smi);
            let twice = canon(&once);
            assert_eq!(once, twice, "{smi} -> {once} -> {twice}");
        }
    }

    #[test]
    fn unusual_hydrogen_counts_are_bracketed() {
        let mut mol = parse_smiles("CC").unwrap();
        mol.atoms[1].implicit_hydrogens = 2;
        let out = canonical_smiles(&mol);
        assert!(out.contains("[CH2]"), "{out}");
    }

    #[test]
    fn ranks_are_a_permutation() {
        let mol = parse_smiles("c1ccccc1").unwrap();
        let mut ranks = canonical_ranks(&mol);
        ranks.sort();
        assert_eq!(ranks, (0..6).collect::<Vec<_>>());
    }
}
