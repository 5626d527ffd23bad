//! Byte cursor shared by the SMILES and SMARTS readers.

use corescope_core::{CorescopeError, Result};

use crate::element::element_by_symbol;

pub(crate) struct Cursor<'a> {
    input: &'a [u8],
    pub(crate) pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Cursor { input: input.as_bytes(), pos: 0 }
    }

    pub(crate) fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    pub(crate) fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    pub(crate) fn advance(&mut self) -> Option<u8> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    /// Consume `ch` if it is next.
    pub(crate) fn eat(&mut self, ch: u8) -> bool {
        if self.peek() == Some(ch) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, ch: u8, context: &str) -> Result<()> {
        if self.eat(ch) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}' {context}", ch as char)))
        }
    }

    /// A run of ASCII digits, if any.
    pub(crate) fn number(&mut self) -> Option<u32> {
        let start = self.pos;
        let mut n: u32 = 0;
        while let Some(ch) = self.peek().filter(u8::is_ascii_digit) {
            n = n.saturating_mul(10).saturating_add((ch - b'0') as u32);
            self.pos += 1;
        }
        (self.pos > start).then_some(n)
    }

    /// A ring-closure label: one digit, or `%` followed by two digits.
    pub(crate) fn ring_label(&mut self) -> Result<u16> {
        if self.eat(b'%') {
            let d1 = self.advance().filter(u8::is_ascii_digit);
            let d2 = self.advance().filter(u8::is_ascii_digit);
            match (d1, d2) {
                (Some(a), Some(b)) => Ok((a - b'0') as u16 * 10 + (b - b'0') as u16),
                _ => Err(self.error("expected two digits after '%'")),
            }
        } else {
            match self.advance() {
                Some(d) if d.is_ascii_digit() => Ok((d - b'0') as u16),
                _ => Err(self.error("expected ring-closure digit")),
            }
        }
    }

    /// Text between a just-consumed `(` and its matching `)`, consuming both.
    pub(crate) fn balanced_group(&mut self) -> Result<&'a str> {
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(ch) = self.advance() {
            match ch {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        let input: &'a [u8] = self.input;
                        return std::str::from_utf8(&input[start..self.pos - 1])
                            .map_err(|_| self.error("invalid UTF-8 in group"));
                    }
                }
                _ => {}
            }
        }
        Err(CorescopeError::Parse(format!(
            "unmatched '(' opened at position {}",
            start.saturating_sub(1)
        )))
    }

    /// An organic-subset atom outside brackets: `B C N O P S F Cl Br I` or
    /// aromatic `b c n o p s`. Returns `(atomic_number, is_aromatic)`.
    pub(crate) fn organic_atom(&mut self) -> Option<(u8, bool)> {
        let ch = self.peek()?;
        let (n, aromatic, width) = match ch {
            b'C' if self.peek_at(1) == Some(b'l') => (17, false, 2),
            b'B' if self.peek_at(1) == Some(b'r') => (35, false, 2),
            b'B' => (5, false, 1),
            b'C' => (6, false, 1),
            b'N' => (7, false, 1),
            b'O' => (8, false, 1),
            b'P' => (15, false, 1),
            b'S' => (16, false, 1),
            b'F' => (9, false, 1),
            b'I' => (53, false, 1),
            b'b' => (5, true, 1),
            b'c' => (6, true, 1),
            b'n' => (7, true, 1),
            b'o' => (8, true, 1),
            b'p' => (15, true, 1),
            b's' => (16, true, 1),
            _ => return None,
        };
        self.pos += width;
        Some((n, aromatic))
    }

    /// An element symbol inside brackets. Lowercase first letters denote
    /// aromatic atoms; two-letter symbols win over one-letter ones.
    pub(crate) fn bracket_element(&mut self) -> Option<(u8, bool)> {
        let first = self.peek().filter(u8::is_ascii_alphabetic)?;
        let aromatic = first.is_ascii_lowercase();
        let upper = first.to_ascii_uppercase() as char;
        if let Some(second) = self.peek_at(1).filter(u8::is_ascii_lowercase) {
            let two = format!("{upper}{}", second as char);
            if let Some(elem) = element_by_symbol(&two) {
                self.pos += 2;
                return Some((elem.atomic_number, aromatic));
            }
        }
        let elem = element_by_symbol(&upper.to_string())?;
        self.pos += 1;
        Some((elem.atomic_number, aromatic))
    }

    /// A signed charge: `+`, `++`, `+2`, `-`, `--`, `-3`. Returns 0 if absent.
    pub(crate) fn charge(&mut self) -> i8 {
        let sign: i8 = match self.peek() {
            Some(b'+') => 1,
            Some(b'-') => -1,
            _ => return 0,
        };
        let symbol = if sign > 0 { b'+' } else { b'-' };
        self.pos += 1;
        if let Some(n) = self.number() {
            return sign.saturating_mul(n.min(i8::MAX as u32) as i8);
        }
        let mut count: i8 = 1;
        while self.eat(symbol) {
            count = count.saturating_add(1);
        }
        sign * count
    }

    pub(crate) fn error(&self, message: &str) -> CorescopeError {
        CorescopeError::Parse(format!("{message} at position {}", self.pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn organic_atoms() {
        let mut c = Cursor::new("ClBrcC");
        assert_eq!(c.organic_atom(), Some((17, false)));
        assert_eq!(c.organic_atom(), Some((35, false)));
        assert_eq!(c.organic_atom(), Some((6, true)));
        assert_eq!(c.organic_atom(), Some((6, false)));
        assert_eq!(c.peek(), None);
    }

    #[test]
    fn bracket_elements_prefer_two_letters() {
        let mut c = Cursor::new("Xe");
        assert_eq!(c.bracket_element(), Some((54, false)));
        let mut c = Cursor::new("se");
        assert_eq!(c.bracket_element(), Some((34, true)));
        let mut c = Cursor::new("nH");
        assert_eq!(c.bracket_element(), Some((7, true)));
        assert_eq!(c.peek(), Some(b'H'));
    }

    #[test]
    fn charges() {
        assert_eq!(Cursor::new("+").charge(), 1);
        assert_eq!(Cursor::new("++").charge(), 2);
        assert_eq!(Cursor::new("-2").charge(), -2);
        assert_eq!(Cursor::new("x").charge(), 0);
    }

    #[test]
    fn ring_labels_and_groups() {
        let mut c = Cursor::new("%12");
        assert_eq!(c.ring_label().unwrap(), 12);
        let mut c = Cursor::new("C(=O)N)rest");
        assert_eq!(c.balanced_group().unwrap(), "C(=O)N");
        assert_eq!(c.peek(), Some(b'r'));
        assert!(Cursor::new("C(C").balanced_group().is_err());
    }
}
