//! MDL molfile (V2000) queries compiled to [`SmartsPattern`]s.

use corescope_core::{CorescopeError, Result};

use crate::element::element_by_symbol;
use crate::molecule::{Bond, BondOrder, MolAtom, Molecule};
use crate::aromatic::aromatic_ring_bonds;
use crate::smarts::{AtomExpr, AtomPrimitive, BondExpr, SmartsAtom, SmartsBond, SmartsPattern};

/// Split a multi-query file into individual molfile blocks.
///
/// Blocks are separated by `$$$$` lines. Lines starting with `$` are
/// dropped (R-group and record markers) and everything after a block's
/// `M  END` line is ignored. Blank blocks are skipped.
pub fn split_mdl_queries(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();
    let mut ended = false;

    let mut flush = |current: &mut String, ended: &mut bool| {
        if !current.trim().is_empty() {
            blocks.push(std::mem::take(current));
        }
        current.clear();
        *ended = false;
    };

    for line in text.lines() {
        if line.trim_end() == "$$$$" {
            flush(&mut current, &mut ended);
            continue;
        }
        if ended || line.starts_with('$') {
            continue;
        }
        current.push_str(line);
        current.push('\n');
        if line.starts_with("M  END") {
            ended = true;
        }
    }
    flush(&mut current, &mut ended);
    blocks
}

/// Compile one V2000 molfile block into a query.
///
/// Element `A` and `*` match any atom, `Q` any heteroatom. Bond types 1-8
/// map to single, double, triple, aromatic, single-or-double,
/// single-or-aromatic, double-or-aromatic and any. Rings drawn in Kekulé
/// form are perceived as aromatic, so they match aromatic molecules.
pub fn parse_mdl_query(block: &str) -> Result<SmartsPattern> {
    let lines: Vec<&str> = block.lines().collect();
    if lines.len() < 4 {
        return Err(CorescopeError::Parse("MOL block too short".into()));
    }
    let counts = lines[3];
    if counts.contains("V3000") {
        return Err(CorescopeError::Parse("V3000 query blocks are not supported".into()));
    }
    let num_atoms = fixed_field(counts, 0..3, "atom count")?;
    let num_bonds = fixed_field(counts, 3..6, "bond count")?;

    let atom_start = 4;
    let bond_start = atom_start + num_atoms;
    if lines.len() < bond_start + num_bonds {
        return Err(CorescopeError::Parse("MOL block truncated".into()));
    }

    let mut atoms = lines[atom_start..bond_start]
        .iter()
        .map(|line| parse_atom_line(line))
        .collect::<Result<Vec<_>>>()?;
    let bonds = lines[bond_start..bond_start + num_bonds]
        .iter()
        .map(|line| parse_bond_line(line, num_atoms))
        .collect::<Result<Vec<_>>>()?;

    for line in &lines[bond_start + num_bonds..] {
        if line.starts_with("M  END") {
            break;
        }
        if line.starts_with("M  CHG") {
            apply_charges(line, &mut atoms)?;
        }
    }

    let aromatic_bonds = perceive_aromatic_bonds(&atoms, &bonds);
    let mut aromatic_atoms = vec![false; atoms.len()];
    for (bond, &aromatic) in bonds.iter().zip(&aromatic_bonds) {
        if aromatic {
            aromatic_atoms[bond.atom1] = true;
            aromatic_atoms[bond.atom2] = true;
        }
    }

    let query_atoms = atoms
        .iter()
        .zip(&aromatic_atoms)
        .map(|(atom, &aromatic)| SmartsAtom { expr: atom.to_expr(aromatic) })
        .collect();
    let query_bonds = bonds
        .iter()
        .zip(&aromatic_bonds)
        .map(|(bond, &aromatic)| SmartsBond {
            atom1: bond.atom1,
            atom2: bond.atom2,
            expr: if aromatic { BondExpr::Aromatic } else { bond.to_expr() },
        })
        .collect();
    Ok(SmartsPattern::from_parts(query_atoms, query_bonds))
}

// ---- blocks ----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryElement {
    Element(u8),
    Any,
    Hetero,
}

#[derive(Debug, Clone)]
struct QueryAtom {
    element: QueryElement,
    charge: i8,
}

impl QueryAtom {
    fn to_expr(&self, aromatic: bool) -> AtomExpr {
        let mut terms = Vec::new();
        match self.element {
            QueryElement::Element(n) => terms.push(AtomExpr::Prim(AtomPrimitive::AtomicNum(n))),
            QueryElement::Any => terms.push(AtomExpr::Prim(AtomPrimitive::Wildcard)),
            QueryElement::Hetero => terms.push(AtomExpr::Prim(AtomPrimitive::Hetero)),
        }
        if aromatic {
            terms.push(AtomExpr::Prim(AtomPrimitive::Aromatic));
        }
        if self.charge != 0 {
            terms.push(AtomExpr::Prim(AtomPrimitive::Charge(self.charge)));
        }
        if terms.len() == 1 {
            terms.remove(0)
        } else {
            AtomExpr::And(terms)
        }
    }
}

#[derive(Debug, Clone)]
struct QueryBond {
    atom1: usize,
    atom2: usize,
    bond_type: u8,
    /// Ring topology column: 0 either, 1 ring, 2 chain.
    topology: u8,
}

impl QueryBond {
    fn to_expr(&self) -> BondExpr {
        use BondExpr as B;
        let base = match self.bond_type {
            1 => B::Single,
            2 => B::Double,
            3 => B::Triple,
            4 => B::Aromatic,
            5 => B::Or(vec![B::Single, B::Double]),
            6 => B::Or(vec![B::Single, B::Aromatic]),
            7 => B::Or(vec![B::Double, B::Aromatic]),
            _ => B::Any,
        };
        match self.topology {
            1 => B::And(vec![base, B::Ring]),
            2 => B::And(vec![base, B::Not(Box::new(B::Ring))]),
            _ => base,
        }
    }
}

fn fixed_field(line: &str, cols: std::ops::Range<usize>, what: &str) -> Result<usize> {
    line.get(cols)
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| CorescopeError::Parse(format!("invalid {what} in line '{line}'")))
}

fn parse_atom_line(line: &str) -> Result<QueryAtom> {
    // x(0..10) y(10..20) z(20..30) _ symbol(31..34) mass diff(34..36) charge(36..39)
    let symbol = line
        .get(31..34.min(line.len()))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CorescopeError::Parse(format!("atom line too short: '{line}'")))?;

    let element = match symbol {
        "A" | "*" => QueryElement::Any,
        "Q" => QueryElement::Hetero,
        "D" | "T" => QueryElement::Element(1),
        _ => QueryElement::Element(
            element_by_symbol(symbol)
                .ok_or_else(|| {
                    CorescopeError::Parse(format!("unknown element '{symbol}' in MOL atom block"))
                })?
                .atomic_number,
        ),
    };

    // old-style charge code: 1=+3, 2=+2, 3=+1, 5=-1, 6=-2, 7=-3
    let charge = match line.get(36..39).and_then(|s| s.trim().parse::<u8>().ok()) {
        Some(1) => 3,
        Some(2) => 2,
        Some(3) => 1,
        Some(5) => -1,
        Some(6) => -2,
        Some(7) => -3,
        _ => 0,
    };
    Ok(QueryAtom { element, charge })
}

fn parse_bond_line(line: &str, num_atoms: usize) -> Result<QueryBond> {
    let a1 = fixed_field(line, 0..3, "bond atom")?;
    let a2 = fixed_field(line, 3..6, "bond atom")?;
    let bond_type = fixed_field(line, 6..9, "bond type")?;
    if a1 == 0 || a2 == 0 || a1 > num_atoms || a2 > num_atoms || a1 == a2 {
        return Err(CorescopeError::Parse(format!("bad bond atoms in line '{line}'")));
    }
    if !(1..=8).contains(&bond_type) {
        return Err(CorescopeError::Parse(format!("unknown bond type {bond_type}")));
    }
    let topology = line
        .get(15..18)
        .and_then(|s| s.trim().parse::<u8>().ok())
        .unwrap_or(0);
    Ok(QueryBond {
        atom1: a1 - 1,
        atom2: a2 - 1,
        bond_type: bond_type as u8,
        topology,
    })
}

/// `M  CHGnn8 aaa vvv ...`
fn apply_charges(line: &str, atoms: &mut [QueryAtom]) -> Result<()> {
    let fields: Vec<&str> = line.get(6..).unwrap_or("").split_whitespace().collect();
    let count: usize = fields
        .first()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| CorescopeError::Parse(format!("invalid M  CHG line '{line}'")))?;
    for pair in fields[1..].chunks(2).take(count) {
        let (Some(idx), Some(chg)) = (
            pair.first().and_then(|s| s.parse::<usize>().ok()),
            pair.get(1).and_then(|s| s.parse::<i8>().ok()),
        ) else {
            return Err(CorescopeError::Parse(format!("invalid M  CHG entry in '{line}'")));
        };
        let atom = idx
            .checked_sub(1)
            .and_then(|i| atoms.get_mut(i))
            .ok_or_else(|| CorescopeError::Parse(format!("M  CHG atom {idx} out of range")))?;
        atom.charge = chg;
    }
    Ok(())
}

// ---- aromaticity ----

/// Flag bonds in aromatic rings: type-4 bonds plus Kekulé rings that pass
/// the Hückel count. Query-only bond types 5-8 never close a Kekulé ring.
fn perceive_aromatic_bonds(atoms: &[QueryAtom], bonds: &[QueryBond]) -> Vec<bool> {
    let graph = Molecule::new(
        String::new(),
        atoms
            .iter()
            .map(|a| match a.element {
                QueryElement::Element(n) => MolAtom {
                    formal_charge: a.charge,
                    ..MolAtom::element(n)
                },
                _ => MolAtom::element(0),
            })
            .collect(),
        bonds
            .iter()
            .map(|b| {
                let order = match b.bond_type {
                    1 => BondOrder::Single,
                    2 => BondOrder::Double,
                    4 => BondOrder::Aromatic,
                    _ => BondOrder::Triple,
                };
                Bond::new(b.atom1, b.atom2, order)
            })
            .collect(),
    );
    aromatic_ring_bonds(&graph)
}
