//! Periodic table data and element lookup.

/// A chemical element, H through Xe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    pub atomic_number: u8,
    pub symbol: &'static str,
    /// Allowed valences for implicit-hydrogen assignment, lowest first.
    /// Empty for elements outside the SMILES organic subset.
    pub valences: &'static [u8],
}

/// Placeholder element marking a substituent's own attachment bond (Xe).
pub const ROOT_TAG: u8 = 54;

/// Placeholder element marking any other bond severed from the core (Y).
pub const BRIDGE_TAG: u8 = 39;

const fn el(atomic_number: u8, symbol: &'static str, valences: &'static [u8]) -> Element {
    Element { atomic_number, symbol, valences }
}

static ELEMENTS: [Element; 54] = [
    el(1, "H", &[1]),
    el(2, "He", &[]),
    el(3, "Li", &[]),
    el(4, "Be", &[]),
    el(5, "B", &[3]),
    el(6, "C", &[4]),
    el(7, "N", &[3, 5]),
    el(8, "O", &[2]),
    el(9, "F", &[1]),
    el(10, "Ne", &[]),
    el(11, "Na", &[]),
    el(12, "Mg", &[]),
    el(13, "Al", &[]),
    el(14, "Si", &[]),
    el(15, "P", &[3, 5]),
    el(16, "S", &[2, 4, 6]),
    el(17, "Cl", &[1]),
    el(18, "Ar", &[]),
    el(19, "K", &[]),
    el(20, "Ca", &[]),
    el(21, "Sc", &[]),
    el(22, "Ti", &[]),
    el(23, "V", &[]),
    el(24, "Cr", &[]),
    el(25, "Mn", &[]),
    el(26, "Fe", &[]),
    el(27, "Co", &[]),
    el(28, "Ni", &[]),
    el(29, "Cu", &[]),
    el(30, "Zn", &[]),
    el(31, "Ga", &[]),
    el(32, "Ge", &[]),
    el(33, "As", &[]),
    el(34, "Se", &[]),
    el(35, "Br", &[1]),
    el(36, "Kr", &[]),
    el(37, "Rb", &[]),
    el(38, "Sr", &[]),
    el(39, "Y", &[]),
    el(40, "Zr", &[]),
    el(41, "Nb", &[]),
    el(42, "Mo", &[]),
    el(43, "Tc", &[]),
    el(44, "Ru", &[]),
    el(45, "Rh", &[]),
    el(46, "Pd", &[]),
    el(47, "Ag", &[]),
    el(48, "Cd", &[]),
    el(49, "In", &[]),
    el(50, "Sn", &[]),
    el(51, "Sb", &[]),
    el(52, "Te", &[]),
    el(53, "I", &[1]),
    el(54, "Xe", &[]),
];

/// Look up an element by its symbol (e.g. "C", "Cl"). Case-sensitive.
pub fn element_by_symbol(symbol: &str) -> Option<&'static Element> {
    ELEMENTS.iter().find(|e| e.symbol == symbol)
}

/// Look up an element by its atomic number (1-based).
pub fn element_by_number(n: u8) -> Option<&'static Element> {
    if (1..=54).contains(&n) {
        Some(&ELEMENTS[(n - 1) as usize])
    } else {
        None
    }
}

/// Whether an atom may be written without brackets in SMILES.
pub fn is_organic_subset(atomic_number: u8, is_aromatic: bool) -> bool {
    if is_aromatic {
        matches!(atomic_number, 5 | 6 | 7 | 8 | 15 | 16)
    } else {
        matches!(atomic_number, 5 | 6 | 7 | 8 | 9 | 15 | 16 | 17 | 35 | 53)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_symbol_and_number() {
        let c = element_by_symbol("C").unwrap();
        assert_eq!(c.atomic_number, 6);
        assert_eq!(c.valences, &[4]);
        assert_eq!(element_by_number(17).unwrap().symbol, "Cl");
    }

    #[test]
    fn tags_are_distinct_elements() {
        assert_eq!(element_by_number(ROOT_TAG).unwrap().symbol, "Xe");
        assert_eq!(element_by_number(BRIDGE_TAG).unwrap().symbol, "Y");
        assert_ne!(ROOT_TAG, BRIDGE_TAG);
    }

    #[test]
    fn unknown_returns_none() {
        assert!(element_by_symbol("Zz").is_none());
        assert!(element_by_symbol("c").is_none());
        assert!(element_by_number(0).is_none());
        assert!(element_by_number(55).is_none());
    }

    #[test]
    fn table_is_dense() {
        for n in 1..=54u8 {
            assert_eq!(element_by_number(n).unwrap().atomic_number, n);
        }
    }

    #[test]
    fn organic_subset() {
        assert!(is_organic_subset(6, true));
        assert!(is_organic_subset(17, false));
        assert!(!is_organic_subset(17, true));
        assert!(!is_organic_subset(ROOT_TAG, false));
    }
}
