//! SMARTS pattern parsing and substructure matching.
//!
//! Atom expressions follow the usual precedence: `!` binds tightest, then
//! `&` (or juxtaposition), then `,`, then the low-precedence `;`. Bond
//! expressions use the same operators. An unwritten bond matches single or
//! aromatic bonds. `$( )` recursive queries may appear anywhere a primitive
//! can; they are evaluated by an anchored search that shares the ring
//! perception of the enclosing match.

use corescope_core::{CorescopeError, Result};

use crate::lex::Cursor;
use crate::molecule::{BondOrder, Molecule};
use crate::ring::RingInfo;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A primitive atom query.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomPrimitive {
    /// `#6`, or an element symbol.
    AtomicNum(u8),
    /// `a`, or a lowercase element symbol.
    Aromatic,
    /// `A`, or an uppercase element symbol.
    Aliphatic,
    /// `D<n>`: explicit connections.
    Degree(u8),
    /// `H<n>`: total attached hydrogens.
    TotalHCount(u8),
    /// `h<n>`: implicit hydrogens.
    ImplicitHCount(u8),
    /// `+<n>` / `-<n>`.
    Charge(i8),
    /// Leading mass number in a bracket atom.
    Isotope(u16),
    /// `R` or `r` without a count: any ring atom.
    RingMember,
    /// `R<n>`: member of exactly `n` SSSR rings.
    RingCount(u8),
    /// `r<n>`: member of an SSSR ring of size `n`.
    RingSize(u8),
    /// `x<n>`: ring bonds at the atom.
    RingConnectivity(u8),
    /// `X<n>`: total connections including implicit hydrogens.
    Connectivity(u8),
    /// `v<n>`: total bond order including implicit hydrogens.
    Valence(u8),
    /// Any element other than C and H (MDL `Q`).
    Hetero,
    /// `*`
    Wildcard,
}

/// A logical atom expression.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomExpr {
    Prim(AtomPrimitive),
    And(Vec<AtomExpr>),
    Or(Vec<AtomExpr>),
    Not(Box<AtomExpr>),
    /// `$(...)`: the atom is the first atom of some match of the pattern.
    Recursive(Box<SmartsPattern>),
}

/// A bond expression.
#[derive(Debug, Clone, PartialEq)]
pub enum BondExpr {
    Single,
    Double,
    Triple,
    Aromatic,
    /// The meaning of an unwritten bond.
    SingleOrAromatic,
    Ring,
    Any,
    Not(Box<BondExpr>),
    And(Vec<BondExpr>),
    Or(Vec<BondExpr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmartsAtom {
    pub expr: AtomExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmartsBond {
    pub atom1: usize,
    pub atom2: usize,
    pub expr: BondExpr,
}

/// A compiled query graph.
#[derive(Debug, Clone, PartialEq)]
pub struct SmartsPattern {
    pub atoms: Vec<SmartsAtom>,
    pub bonds: Vec<SmartsBond>,
    adjacency: Vec<Vec<(usize, usize)>>,
}

/// One embedding of a pattern: `atoms[k]` is the molecule atom matched by
/// pattern atom `k`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Match {
    pub atoms: Vec<usize>,
}

impl SmartsPattern {
    pub(crate) fn from_parts(atoms: Vec<SmartsAtom>, bonds: Vec<SmartsBond>) -> Self {
        let mut adjacency = vec![Vec::new(); atoms.len()];
        for (bi, bond) in bonds.iter().enumerate() {
            adjacency[bond.atom1].push((bond.atom2, bi));
            adjacency[bond.atom2].push((bond.atom1, bi));
        }
        SmartsPattern { atoms, bonds, adjacency }
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    /// The first embedding found in pattern-atom order, if any.
    pub fn first_match(&self, mol: &Molecule) -> Option<Match> {
        let rings = RingInfo::perceive(mol);
        let mut search = Vf2::new(self, mol, &rings, true);
        search.run(None);
        search.matches.pop()
    }

    pub fn is_match(&self, mol: &Molecule) -> bool {
        self.first_match(mol).is_some()
    }

    /// Every embedding, including automorphic duplicates.
    pub fn all_matches(&self, mol: &Molecule) -> Vec<Match> {
        let rings = RingInfo::perceive(mol);
        let mut search = Vf2::new(self, mol, &rings, false);
        search.run(None);
        search.matches
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a SMARTS string that contains no `$name` references.
pub fn parse_smarts(smarts: &str) -> Result<SmartsPattern> {
    let smarts = smarts.trim();
    if smarts.is_empty() {
        return Err(CorescopeError::Parse("empty SMARTS string".into()));
    }
    let mut parser = SmartsParser::new(smarts);
    parser.parse()?;
    Ok(SmartsPattern::from_parts(parser.atoms, parser.bonds))
}

struct SmartsParser<'a> {
    cursor: Cursor<'a>,
    atoms: Vec<SmartsAtom>,
    bonds: Vec<SmartsBond>,
    branches: Vec<Option<usize>>,
    prev_atom: Option<usize>,
    pending_bond: Option<BondExpr>,
    open_rings: std::collections::BTreeMap<u16, (usize, Option<BondExpr>)>,
}

impl<'a> SmartsParser<'a> {
    fn new(input: &'a str) -> Self {
        SmartsParser {
            cursor: Cursor::new(input),
            atoms: Vec::new(),
            bonds: Vec::new(),
            branches: Vec::new(),
            prev_atom: None,
            pending_bond: None,
            open_rings: std::collections::BTreeMap::new(),
        }
    }

    fn parse(&mut self) -> Result<()> {
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
                b'.' => {
                    self.cursor.advance();
                    self.prev_atom = None;
                    self.pending_bond = None;
                }
                b'%' | b'0'..=b'9' => {
                    let label = self.cursor.ring_label()?;
                    self.ring_closure(label)?;
                }
                b'[' => {
                    self.cursor.advance();
                    let expr = self.bracket_expr()?;
                    self.push_atom(expr);
                }
                b'*' => {
                    self.cursor.advance();
                    self.push_atom(AtomExpr::Prim(AtomPrimitive::Wildcard));
                }
                b'a' => {
                    self.cursor.advance();
                    self.push_atom(AtomExpr::Prim(AtomPrimitive::Aromatic));
                }
                b'A' => {
                    self.cursor.advance();
                    self.push_atom(AtomExpr::Prim(AtomPrimitive::Aliphatic));
                }
                _ if is_bond_start(ch) => {
                    if self.pending_bond.is_some() {
                        return Err(self.cursor.error("two consecutive bond expressions"));
                    }
                    self.pending_bond = Some(self.bond_low_and()?);
                }
                _ => {
                    let (atomic_number, aromatic) =
                        self.cursor.organic_atom().ok_or_else(|| {
                            self.cursor
                                .error(&format!("unexpected character '{}'", ch as char))
                        })?;
                    self.push_atom(element_expr(atomic_number, aromatic));
                }
            }
        }

        if !self.open_rings.is_empty() {
            let open: Vec<_> = self.open_rings.keys().collect();
            return Err(CorescopeError::Parse(format!(
                "unmatched ring closure(s) in SMARTS: {open:?}"
            )));
        }
        if !self.branches.is_empty() {
            return Err(CorescopeError::Parse("unmatched '(' in SMARTS".into()));
        }
        if self.pending_bond.is_some() {
            return Err(CorescopeError::Parse("dangling bond at end of SMARTS".into()));
        }
        Ok(())
    }

    fn push_atom(&mut self, expr: AtomExpr) {
        let idx = self.atoms.len();
        self.atoms.push(SmartsAtom { expr });
        if let Some(prev) = self.prev_atom {
            let expr = self.pending_bond.take().unwrap_or(BondExpr::SingleOrAromatic);
            self.bonds.push(SmartsBond { atom1: prev, atom2: idx, expr });
        }
        self.pending_bond = None;
        self.prev_atom = Some(idx);
    }

    fn ring_closure(&mut self, label: u16) -> Result<()> {
        let current = self
            .prev_atom
            .ok_or_else(|| self.cursor.error("ring closure without preceding atom"))?;
        match self.open_rings.remove(&label) {
            Some((open_atom, open_bond)) => {
                if open_atom == current {
                    return Err(self.cursor.error("ring closure bonds an atom to itself"));
                }
                let expr = self
                    .pending_bond
                    .take()
                    .or(open_bond)
                    .unwrap_or(BondExpr::SingleOrAromatic);
                self.bonds.push(SmartsBond { atom1: open_atom, atom2: current, expr });
            }
            None => {
                let bond = self.pending_bond.take();
                self.open_rings.insert(label, (current, bond));
            }
        }
        Ok(())
    }

    // ---- bracket atoms ----

    /// Everything after `[` up to and including `]`.
    fn bracket_expr(&mut self) -> Result<AtomExpr> {
        // a bare hydrogen atom: [H], [H+], [2H]
        let isotope = self.cursor.number();
        let mut terms = Vec::new();
        if let Some(mass) = isotope {
            terms.push(AtomExpr::Prim(AtomPrimitive::Isotope(mass.min(u16::MAX as u32) as u16)));
        }
        if self.cursor.peek() == Some(b'H')
            && matches!(self.cursor.peek_at(1), Some(b']') | Some(b'+') | Some(b'-') | Some(b':'))
        {
            self.cursor.advance();
            terms.push(AtomExpr::Prim(AtomPrimitive::AtomicNum(1)));
            let charge = self.cursor.charge();
            if charge != 0 {
                terms.push(AtomExpr::Prim(AtomPrimitive::Charge(charge)));
            }
        } else if !(isotope.is_some() && self.cursor.peek() == Some(b']')) {
            terms.push(self.atom_low_and()?);
        }

        // atom map class
        if self.cursor.eat(b':') && self.cursor.number().is_none() {
            return Err(self.cursor.error("expected atom class after ':'"));
        }
        self.cursor.expect(b']', "to close bracket atom")?;
        Ok(if terms.len() == 1 { terms.remove(0) } else { AtomExpr::And(terms) })
    }

    fn atom_low_and(&mut self) -> Result<AtomExpr> {
        let mut terms = vec![self.atom_or()?];
        while self.cursor.eat(b';') {
            terms.push(self.atom_or()?);
        }
        Ok(collapse(terms, AtomExpr::And))
    }

    fn atom_or(&mut self) -> Result<AtomExpr> {
        let mut terms = vec![self.atom_high_and()?];
        while self.cursor.eat(b',') {
            terms.push(self.atom_high_and()?);
        }
        Ok(collapse(terms, AtomExpr::Or))
    }

    fn atom_high_and(&mut self) -> Result<AtomExpr> {
        let mut terms = vec![self.atom_not()?];
        loop {
            match self.cursor.peek() {
                Some(b'&') => {
                    self.cursor.advance();
                    terms.push(self.atom_not()?);
                }
                Some(b']') | Some(b',') | Some(b';') | Some(b':') | None => break,
                Some(_) => terms.push(self.atom_not()?),
            }
        }
        Ok(collapse(terms, AtomExpr::And))
    }

    fn atom_not(&mut self) -> Result<AtomExpr> {
        if self.cursor.eat(b'!') {
            Ok(AtomExpr::Not(Box::new(self.atom_not()?)))
        } else {
            self.atom_primitive()
        }
    }

    fn atom_primitive(&mut self) -> Result<AtomExpr> {
        use AtomPrimitive as P;
        let ch = self
            .cursor
            .peek()
            .ok_or_else(|| self.cursor.error("unexpected end of atom expression"))?;
        let prim = match ch {
            b'#' => {
                self.cursor.advance();
                let n = self
                    .cursor
                    .number()
                    .ok_or_else(|| self.cursor.error("expected atomic number after '#'"))?;
                P::AtomicNum(n.min(u8::MAX as u32) as u8)
            }
            b'$' => {
                self.cursor.advance();
                if !self.cursor.eat(b'(') {
                    return Err(self.cursor.error("unexpanded substitution reference"));
                }
                let inner = self.cursor.balanced_group()?;
                let pattern = parse_smarts(inner)?;
                return Ok(AtomExpr::Recursive(Box::new(pattern)));
            }
            b'*' => {
                self.cursor.advance();
                P::Wildcard
            }
            b'+' | b'-' => P::Charge(self.cursor.charge()),
            b'@' => {
                // chirality is not matched
                while self.cursor.eat(b'@') {}
                P::Wildcard
            }
            b'0'..=b'9' => {
                let n = self.cursor.number().unwrap_or(0);
                P::Isotope(n.min(u16::MAX as u32) as u16)
            }
            _ if ch.is_ascii_alphabetic() => return self.letter_primitive(),
            _ => {
                return Err(self
                    .cursor
                    .error(&format!("unexpected '{}' in atom expression", ch as char)))
            }
        };
        Ok(AtomExpr::Prim(prim))
    }

    /// Element symbols and the single-letter primitives. Two-letter element
    /// symbols take precedence (`Cl` is chlorine, never C plus `l`).
    fn letter_primitive(&mut self) -> Result<AtomExpr> {
        use AtomPrimitive as P;
        let ch = self.cursor.peek().unwrap_or(b' ');
        let second = self.cursor.peek_at(1);
        let two_letter = second.is_some_and(|s| s.is_ascii_lowercase())
            && element_symbol_at(ch, second).is_some();

        if !two_letter {
            let prim = match ch {
                b'D' => self.counted(P::Degree),
                b'H' => self.counted(P::TotalHCount),
                b'h' => self.counted(P::ImplicitHCount),
                b'X' => self.counted(P::Connectivity),
                b'v' => self.counted(P::Valence),
                b'R' | b'r' | b'x' => {
                    self.cursor.advance();
                    let n = self.cursor.number().map(|n| n.min(u8::MAX as u32) as u8);
                    match (ch, n) {
                        (_, Some(0)) => {
                            return Ok(AtomExpr::Not(Box::new(AtomExpr::Prim(P::RingMember))))
                        }
                        (b'R', Some(n)) => P::RingCount(n),
                        (b'r', Some(n)) => P::RingSize(n),
                        (b'x', Some(n)) => P::RingConnectivity(n),
                        _ => P::RingMember,
                    }
                }
                b'a' => {
                    self.cursor.advance();
                    P::Aromatic
                }
                b'A' => {
                    self.cursor.advance();
                    P::Aliphatic
                }
                _ => return self.element_symbol(ch),
            };
            return Ok(AtomExpr::Prim(prim));
        }
        self.element_symbol(ch)
    }

    /// A one-letter primitive with an optional count defaulting to 1.
    fn counted(&mut self, make: fn(u8) -> AtomPrimitive) -> AtomPrimitive {
        self.cursor.advance();
        make(self.cursor.number().map_or(1, |n| n.min(u8::MAX as u32) as u8))
    }

    fn element_symbol(&mut self, ch: u8) -> Result<AtomExpr> {
        let (atomic_number, aromatic) = self
            .cursor
            .bracket_element()
            .ok_or_else(|| self.cursor.error(&format!("unknown element '{}'", ch as char)))?;
        Ok(element_expr(atomic_number, aromatic))
    }

    // ---- bonds ----

    fn bond_low_and(&mut self) -> Result<BondExpr> {
        let mut terms = vec![self.bond_or()?];
        while self.cursor.eat(b';') {
            terms.push(self.bond_or()?);
        }
        Ok(collapse(terms, BondExpr::And))
    }

    fn bond_or(&mut self) -> Result<BondExpr> {
        let mut terms = vec![self.bond_high_and()?];
        while self.cursor.eat(b',') {
            terms.push(self.bond_high_and()?);
        }
        Ok(collapse(terms, BondExpr::Or))
    }

    fn bond_high_and(&mut self) -> Result<BondExpr> {
        let mut terms = vec![self.bond_not()?];
        loop {
            if self.cursor.eat(b'&') {
                terms.push(self.bond_not()?);
            } else if self.cursor.peek().is_some_and(is_bond_start) {
                terms.push(self.bond_not()?);
            } else {
                break;
            }
        }
        Ok(collapse(terms, BondExpr::And))
    }

    fn bond_not(&mut self) -> Result<BondExpr> {
        if self.cursor.eat(b'!') {
            return Ok(BondExpr::Not(Box::new(self.bond_not()?)));
        }
        let expr = match self.cursor.advance() {
            // directional bonds match as single bonds
            Some(b'-') | Some(b'/') | Some(b'\\') => BondExpr::Single,
            Some(b'=') => BondExpr::Double,
            Some(b'#') => BondExpr::Triple,
            Some(b':') => BondExpr::Aromatic,
            Some(b'~') => BondExpr::Any,
            Some(b'@') => BondExpr::Ring,
            _ => return Err(self.cursor.error("expected bond primitive")),
        };
        Ok(expr)
    }
}

fn collapse<T>(mut terms: Vec<T>, combine: fn(Vec<T>) -> T) -> T {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        combine(terms)
    }
}

fn is_bond_start(ch: u8) -> bool {
    matches!(ch, b'-' | b'=' | b'#' | b':' | b'~' | b'@' | b'!' | b'/' | b'\\')
}

/// Whether `first` and `second` spell a known element symbol.
fn element_symbol_at(first: u8, second: Option<u8>) -> Option<u8> {
    let second = second?;
    let symbol = format!("{}{}", first.to_ascii_uppercase() as char, second as char);
    crate::element::element_by_symbol(&symbol).map(|e| e.atomic_number)
}

fn element_expr(atomic_number: u8, aromatic: bool) -> AtomExpr {
    AtomExpr::And(vec![
        AtomExpr::Prim(AtomPrimitive::AtomicNum(atomic_number)),
        AtomExpr::Prim(if aromatic {
            AtomPrimitive::Aromatic
        } else {
            AtomPrimitive::Aliphatic
        }),
    ])
}

// ---------------------------------------------------------------------------
// Expression evaluation
// ---------------------------------------------------------------------------

fn eval_atom(expr: &AtomExpr, mol: &Molecule, rings: &RingInfo, atom_idx: usize) -> bool {
    match expr {
        AtomExpr::Prim(prim) => eval_atom_prim(prim, mol, rings, atom_idx),
        AtomExpr::And(terms) => terms.iter().all(|t| eval_atom(t, mol, rings, atom_idx)),
        AtomExpr::Or(terms) => terms.iter().any(|t| eval_atom(t, mol, rings, atom_idx)),
        AtomExpr::Not(inner) => !eval_atom(inner, mol, rings, atom_idx),
        AtomExpr::Recursive(sub) => {
            let mut search = Vf2::new(sub, mol, rings, true);
            search.run(Some(atom_idx));
            !search.matches.is_empty()
        }
    }
}

fn eval_atom_prim(prim: &AtomPrimitive, mol: &Molecule, rings: &RingInfo, idx: usize) -> bool {
    let atom = &mol.atoms[idx];
    let explicit_h = || {
        mol.adjacency[idx]
            .iter()
            .filter(|&&(n, _)| mol.atoms[n].atomic_number == 1)
            .count()
    };
    match *prim {
        AtomPrimitive::AtomicNum(n) => atom.atomic_number == n,
        AtomPrimitive::Aromatic => atom.is_aromatic,
        AtomPrimitive::Aliphatic => !atom.is_aromatic,
        AtomPrimitive::Degree(d) => mol.degree(idx) == d as usize,
        AtomPrimitive::TotalHCount(h) => atom.implicit_hydrogens as usize + explicit_h() == h as usize,
        AtomPrimitive::ImplicitHCount(h) => atom.implicit_hydrogens == h,
        AtomPrimitive::Charge(c) => atom.formal_charge == c,
        AtomPrimitive::Isotope(m) => atom.isotope == Some(m),
        AtomPrimitive::RingMember => rings.is_ring_atom(idx),
        AtomPrimitive::RingCount(n) => rings.ring_count(idx) == n as usize,
        AtomPrimitive::RingSize(s) => rings.in_ring_of_size(idx, s as usize),
        AtomPrimitive::RingConnectivity(x) => rings.ring_connectivity(idx) == x as usize,
        AtomPrimitive::Connectivity(x) => {
            mol.degree(idx) + atom.implicit_hydrogens as usize == x as usize
        }
        AtomPrimitive::Valence(v) => {
            let order_sum: f64 = mol.adjacency[idx]
                .iter()
                .map(|&(_, bi)| mol.bonds[bi].order.as_f64())
                .sum();
            order_sum.round() as usize + atom.implicit_hydrogens as usize == v as usize
        }
        AtomPrimitive::Hetero => !matches!(atom.atomic_number, 1 | 6),
        AtomPrimitive::Wildcard => true,
    }
}

fn eval_bond(expr: &BondExpr, mol: &Molecule, rings: &RingInfo, bond_idx: usize) -> bool {
    let bond = &mol.bonds[bond_idx];
    match expr {
        BondExpr::Single => bond.order == BondOrder::Single && !bond.is_aromatic,
        BondExpr::Double => bond.order == BondOrder::Double && !bond.is_aromatic,
        BondExpr::Triple => bond.order == BondOrder::Triple,
        BondExpr::Aromatic => bond.is_aromatic,
        BondExpr::SingleOrAromatic => bond.is_aromatic || bond.order == BondOrder::Single,
        BondExpr::Ring => rings.is_ring_bond(bond_idx),
        BondExpr::Any => true,
        BondExpr::Not(inner) => !eval_bond(inner, mol, rings, bond_idx),
        BondExpr::And(terms) => terms.iter().all(|t| eval_bond(t, mol, rings, bond_idx)),
        BondExpr::Or(terms) => terms.iter().any(|t| eval_bond(t, mol, rings, bond_idx)),
    }
}

// ---------------------------------------------------------------------------
// VF2 subgraph search
// ---------------------------------------------------------------------------

struct Vf2<'a> {
    pattern: &'a SmartsPattern,
    mol: &'a Molecule,
    rings: &'a RingInfo,
    first_only: bool,
    // core_pattern[p] = Some(t): pattern atom p is mapped to molecule atom t
    core_pattern: Vec<Option<usize>>,
    used: Vec<bool>,
    matches: Vec<Match>,
}

impl<'a> Vf2<'a> {
    fn new(pattern: &'a SmartsPattern, mol: &'a Molecule, rings: &'a RingInfo, first_only: bool) -> Self {
        Vf2 {
            pattern,
            mol,
            rings,
            first_only,
            core_pattern: vec![None; pattern.atom_count()],
            used: vec![false; mol.atom_count()],
            matches: Vec::new(),
        }
    }

    /// Search for embeddings; `anchor` pins pattern atom 0.
    fn run(&mut self, anchor: Option<usize>) {
        if self.pattern.atoms.is_empty() || self.pattern.atom_count() > self.mol.atom_count() {
            return;
        }
        match anchor {
            Some(t) => {
                if t < self.mol.atom_count() && self.feasible(0, t) {
                    self.assign(0, t);
                    self.extend(1);
                    self.unassign(0, t);
                }
            }
            None => self.extend(0),
        }
    }

    fn done(&self) -> bool {
        self.first_only && !self.matches.is_empty()
    }

    fn extend(&mut self, depth: usize) {
        if self.done() {
            return;
        }
        if depth == self.pattern.atom_count() {
            let atoms = self.core_pattern.iter().flatten().copied().collect();
            self.matches.push(Match { atoms });
            return;
        }
        for t in self.candidates(depth) {
            if self.feasible(depth, t) {
                self.assign(depth, t);
                self.extend(depth + 1);
                self.unassign(depth, t);
                if self.done() {
                    return;
                }
            }
        }
    }

    fn assign(&mut self, p: usize, t: usize) {
        self.core_pattern[p] = Some(t);
        self.used[t] = true;
    }

    fn unassign(&mut self, p: usize, t: usize) {
        self.core_pattern[p] = None;
        self.used[t] = false;
    }

    /// Unused neighbors of a mapped pattern neighbor, or every unused atom
    /// when the pattern atom starts a new component.
    fn candidates(&self, p: usize) -> Vec<usize> {
        let anchor = self.pattern.adjacency[p]
            .iter()
            .find_map(|&(pn, _)| self.core_pattern[pn]);
        match anchor {
            Some(t) => self.mol.adjacency[t]
                .iter()
                .map(|&(n, _)| n)
                .filter(|&n| !self.used[n])
                .collect(),
            None => (0..self.mol.atom_count()).filter(|&n| !self.used[n]).collect(),
        }
    }

    fn feasible(&self, p: usize, t: usize) -> bool {
        if self.used[t] {
            return false;
        }
        for &(pn, pb) in &self.pattern.adjacency[p] {
            let Some(tn) = self.core_pattern[pn] else {
                continue;
            };
            match self.mol.bond_between(t, tn) {
                Some(tb) if eval_bond(&self.pattern.bonds[pb].expr, self.mol, self.rings, tb) => {}
                _ => return false,
            }
        }
        eval_atom(&self.pattern.atoms[p].expr, self.mol, self.rings, t)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smiles::parse_smiles;

    fn hits(smarts: &str, smiles: &str) -> bool {
        parse_smarts(smarts).unwrap().is_match(&parse_smiles(smiles).unwrap())
    }

    #[test]
    fn atomic_number_and_negation() {
        assert!(hits("[#6]", "C"));
        assert!(!hits("[#6]", "N"));
        assert!(hits("[!#6]", "N"));
        assert!(!hits("[!#6]", "C"));
    }

    #[test]
    fn case_carries_aromaticity() {
        assert!(hits("c", "c1ccccc1"));
        assert!(!hits("C", "c1ccccc1"));
        assert!(hits("[c]", "c1ccccc1"));
        assert!(!hits("[C]", "c1ccccc1"));
        assert!(hits("[#6]", "c1ccccc1"));
        assert!(hits("a", "c1ccncc1"));
        assert!(!hits("A", "c1ccccc1"));
    }

    #[test]
    fn two_letter_elements_win() {
        assert!(hits("[Cl]", "CCl"));
        assert!(hits("Cl", "CCl"));
        assert!(!hits("[Cl]", "CC"));
        assert!(hits("[Xe]", "C[Xe]"));
    }

    #[test]
    fn hydrogen_counts() {
        // H is the total count, h the implicit count
        assert!(hits("[CH3]", "CC"));
        assert!(!hits("[CH4]", "CC"));
        assert!(hits("[OH]", "CO"));
        assert!(hits("[Ch3]", "CC"));
        assert!(hits("[H]", "[H]C"));
    }

    #[test]
    fn degree_connectivity_valence() {
        assert!(hits("[D3]", "CC(C)C"));
        assert!(!hits("[D4]", "CC(C)C"));
        assert!(hits("[X4]", "CC"));
        assert!(hits("[v4]", "c1ccccc1"));
        assert!(hits("[N;v3]", "CN"));
    }

    #[test]
    fn ring_primitives() {
        assert!(hits("[R]", "c1ccccc1"));
        assert!(!hits("[R]", "CC"));
        assert!(hits("[R0]", "CC"));
        assert!(hits("[r6]", "c1ccccc1"));
        assert!(!hits("[r6]", "C1CCCC1"));
        assert!(hits("[R2]", "c1ccc2ccccc2c1"));
        assert!(hits("[x3]", "c1ccc2ccccc2c1"));
        assert!(hits("C@C", "C1CC1"));
        assert!(!hits("C@C", "CCC"));
        assert!(hits("C!@C", "C1CC1CC"));
    }

    #[test]
    fn charges_and_isotopes() {
        assert!(hits("[N+]", "C[N+](C)(C)C"));
        assert!(!hits("[N+]", "CN"));
        assert!(hits("[O-]", "C[O-]"));
        assert!(hits("[13C]", "[13CH4]"));
        assert!(!hits("[13C]", "C"));
    }

    #[test]
    fn operator_precedence() {
        // ';' binds looser than ','
        assert!(hits("[C,N;H2]", "CN"));
        assert!(!hits("[C,N;H4]", "CN"));
        assert!(hits("[#7,#8]", "O"));
        assert!(!hits("[#7,#8]", "C"));
        assert!(hits("[!C&!N]", "O"));
        assert!(hits("[!!C]", "C"));
    }

    #[test]
    fn default_bond_is_single_or_aromatic() {
        assert!(hits("cc", "c1ccccc1"));
        assert!(hits("CC", "CC"));
        assert!(!hits("CC", "C=C"));
        assert!(hits("C=C", "C=C"));
        assert!(hits("C~C", "C#C"));
        assert!(hits("c:c", "c1ccccc1"));
        assert!(!hits("c-c", "c1ccccc1"));
        assert!(hits("c-c", "c1ccccc1-c1ccccc1"));
        assert!(hits("[#6]-,=[#8]", "C=O"));
    }

    #[test]
    fn recursive_queries() {
        assert!(hits("[$([OH])]", "Oc1ccccc1"));
        assert!(hits("[$(C=O);!$(C[OH])]", "CC(=O)C"));
        assert!(!hits("[$(C=O);!$(C[OH])]", "CC(=O)O"));
        // recursive primitive combined with others
        assert!(hits("[C&$(C(F)(F)F)]", "CC(F)(F)F"));
        // the recursive atom must be the anchor, not any atom
        assert!(!hits("[O;$(OC=O)]", "CO"));
    }

    #[test]
    fn first_match_is_in_pattern_atom_order() {
        let pattern = parse_smarts("c1ccccc1").unwrap();
        let mol = parse_smiles("Cc1ccccc1").unwrap();
        let m = pattern.first_match(&mol).unwrap();
        assert_eq!(m.atoms.len(), 6);
        assert_eq!(m.atoms[0], 1);
        assert!(!m.atoms.contains(&0));
    }

    #[test]
    fn all_matches_counts_embeddings() {
        let pattern = parse_smarts("[#6]").unwrap();
        let mol = parse_smiles("CCO").unwrap();
        assert_eq!(pattern.all_matches(&mol).len(), 2);
        let pattern = parse_smarts("CO").unwrap();
        assert_eq!(pattern.all_matches(&mol).len(), 1);
    }

    #[test]
    fn disconnected_pattern() {
        assert!(hits("O.N", "OCCN"));
        assert!(!hits("O.O", "OCCN"));
    }

    #[test]
    fn ring_closure_in_pattern() {
        assert!(hits("C1CCCCC1", "C1CCCCC1"));
        assert!(!hits("C1CCCCC1", "CCCCCC"));
        assert!(hits("c1ccccc1-,:[#6]", "c1ccccc1C"));
    }

    #[test]
    fn hetero_primitive() {
        let pattern = SmartsPattern::from_parts(
            vec![SmartsAtom { expr: AtomExpr::Prim(AtomPrimitive::Hetero) }],
            Vec::new(),
        );
        assert!(pattern.is_match(&parse_smiles("CO").unwrap()));
        assert!(!pattern.is_match(&parse_smiles("CC").unwrap()));
    }

    #[test]
    fn invalid_smarts_error() {
        for bad in ["", "[", "C(", "C1", "[#]", "[Zz]", "C=", "[$(C]", "[$name]", "C)", "?"] {
            assert!(parse_smarts(bad).is_err(), "'{bad}' should fail");
        }
    }
}
