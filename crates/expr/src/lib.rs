//! Polynomials in one variable, and the scanner that reads them from
//! compact strings like `3x^2-2x+7`.
//!
//! A polynomial is an ordered list of [`Term`]s. The order is the
//! left-to-right order of the source expression; evaluation does not
//! depend on it, but diagnostics and display keep it.
//!
//! The scanner makes a single left-to-right pass and never guesses: the
//! first rule violation rejects the whole expression with a
//! [`ParseError`] carrying the byte offset of the offending character.

use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One coefficient/exponent pair: `3x^2` is `Term { coefficient: 3,
/// exponent: 2 }` and a bare constant has exponent 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub coefficient: i32,
    pub exponent: u32,
}

impl Term {
    pub fn new(coefficient: i32, exponent: u32) -> Term {
        Term {
            coefficient,
            exponent,
        }
    }

    /// The term's value at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        f64::from(self.coefficient) * x.powi(self.exponent as i32)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.coefficient < 0 {
            write!(f, "-")?;
        }
        // A unit coefficient is left implicit, except for constants.
        if self.coefficient.unsigned_abs() != 1 || self.exponent == 0 {
            write!(f, "{}", self.coefficient.unsigned_abs())?;
        }
        if self.exponent >= 1 {
            write!(f, "x")?;
        }
        if self.exponent >= 2 {
            write!(f, "^{}", self.exponent)?;
        }
        Ok(())
    }
}

/// A polynomial as an ordered sequence of terms.
///
/// Terms are not merged or sorted: `parse("x+x")` keeps two terms. The
/// sequence is immutable once built.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Polynomial {
    terms: Vec<Term>,
}

impl Polynomial {
    pub fn new(terms: Vec<Term>) -> Polynomial {
        Polynomial { terms }
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Evaluate at `x` by accumulating the terms in source order.
    ///
    /// The accumulation order is fixed so that repeated runs over the
    /// same expression produce bit-identical values.
    pub fn eval(&self, x: f64) -> f64 {
        let mut acc = 0.0;
        for term in &self.terms {
            acc += term.eval(x);
        }
        acc
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 && term.coefficient >= 0 {
                write!(f, "+")?;
            }
            write!(f, "{term}")?;
        }
        Ok(())
    }
}

/// Why an expression was rejected. Offsets are byte positions into the
/// input; the offset of a violation discovered at end of input is the
/// input's length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty expression")]
    Empty,
    #[error("unexpected character {ch:?} at offset {at}")]
    UnexpectedChar { ch: char, at: usize },
    #[error("sign with nothing to apply it to at offset {at}")]
    DanglingSign { at: usize },
    #[error("exponent marker without a variable at offset {at}")]
    CaretWithoutVariable { at: usize },
    #[error("exponent marker without digits at offset {at}")]
    MissingExponent { at: usize },
    #[error("number too large at offset {at}")]
    Overflow { at: usize },
}

/// Read a polynomial from its compact form.
///
/// The grammar is a run of terms `[sign] [digits] [x [^ digits]]`, with
/// no whitespace anywhere. Each term takes at most one sign character:
/// `3x-2` reads as `3x` followed by `-2`, while the chained signs in
/// `3x+-2` are rejected. Anything outside digits, `x`, `^`, `+` and `-`
/// is rejected.
pub fn parse(input: &str) -> Result<Polynomial, ParseError> {
    if input.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut scanner = Scanner::new(input);
    let mut terms = Vec::new();
    while scanner.peek().is_some() {
        terms.push(scanner.scan_term()?);
    }
    Ok(Polynomial { terms })
}

struct Scanner<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Scanner<'a> {
        Scanner {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn peek(&mut self) -> Option<(usize, char)> {
        self.chars.peek().copied()
    }

    /// Byte offset of the next character, or the input length at the
    /// end.
    fn offset(&mut self) -> usize {
        self.peek().map_or(self.input.len(), |(at, _)| at)
    }

    fn eat(&mut self, ch: char) -> bool {
        if matches!(self.peek(), Some((_, c)) if c == ch) {
            self.chars.next();
            return true;
        }
        false
    }

    /// A run of decimal digits, accumulated as `value * 10 + digit`.
    /// The caller has already checked that a digit is next.
    fn scan_number(&mut self) -> Result<i32, ParseError> {
        let start = self.offset();
        let mut value: i32 = 0;
        while let Some((_, ch)) = self.peek() {
            let Some(digit) = ch.to_digit(10) else {
                break;
            };
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(digit as i32))
                .ok_or(ParseError::Overflow { at: start })?;
            self.chars.next();
        }
        Ok(value)
    }

    fn scan_term(&mut self) -> Result<Term, ParseError> {
        let sign_at = self.offset();
        let sign = if self.eat('-') {
            -1
        } else {
            self.eat('+');
            1
        };

        // Coefficient digits are optional when the variable follows:
        // `x^2` means `1x^2`.
        let magnitude = match self.peek() {
            Some((_, ch)) if ch.is_ascii_digit() => Some(self.scan_number()?),
            _ => None,
        };

        let variable = self.eat('x');

        let caret_at = self.offset();
        let exponent = if self.eat('^') {
            if !variable {
                return Err(ParseError::CaretWithoutVariable { at: caret_at });
            }
            match self.peek() {
                Some((_, ch)) if ch.is_ascii_digit() => self.scan_number()? as u32,
                _ => return Err(ParseError::MissingExponent { at: self.offset() }),
            }
        } else if variable {
            1
        } else {
            0
        };

        match (magnitude, variable) {
            (Some(m), _) => Ok(Term::new(sign * m, exponent)),
            (None, true) => Ok(Term::new(sign, exponent)),
            (None, false) => match self.peek() {
                Some((at, ch)) => Err(ParseError::UnexpectedChar { ch, at }),
                None => Err(ParseError::DanglingSign { at: sign_at }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn terms(poly: &Polynomial) -> Vec<(i32, u32)> {
        poly.terms()
            .iter()
            .map(|t| (t.coefficient, t.exponent))
            .collect()
    }

    #[test]
    fn full_form() {
        let poly = parse("3x^2-2x+7").unwrap();
        assert_eq!(terms(&poly), vec![(3, 2), (-2, 1), (7, 0)]);
    }

    #[test]
    fn implicit_pieces() {
        assert_eq!(terms(&parse("x").unwrap()), vec![(1, 1)]);
        assert_eq!(terms(&parse("-x").unwrap()), vec![(-1, 1)]);
        assert_eq!(terms(&parse("-x^2").unwrap()), vec![(-1, 2)]);
        assert_eq!(terms(&parse("x^4").unwrap()), vec![(1, 4)]);
        assert_eq!(terms(&parse("42").unwrap()), vec![(42, 0)]);
        assert_eq!(terms(&parse("-0").unwrap()), vec![(0, 0)]);
    }

    #[test]
    fn signs_between_terms() {
        assert_eq!(terms(&parse("3x-2").unwrap()), vec![(3, 1), (-2, 0)]);
        assert_eq!(terms(&parse("5-x^3").unwrap()), vec![(5, 0), (-1, 3)]);
    }

    #[test]
    fn rejects_chained_signs() {
        // At most one sign character per term; a minus cannot ride on
        // a plus.
        assert_eq!(
            parse("x+-3"),
            Err(ParseError::UnexpectedChar { ch: '-', at: 2 })
        );
        assert_eq!(
            parse("3x+-2"),
            Err(ParseError::UnexpectedChar { ch: '-', at: 3 })
        );
    }

    #[test]
    fn duplicate_terms_kept_in_order() {
        assert_eq!(terms(&parse("x+x").unwrap()), vec![(1, 1), (1, 1)]);
    }

    #[test]
    fn leading_zeros_fold_into_the_value() {
        assert_eq!(terms(&parse("007x^02").unwrap()), vec![(7, 2)]);
    }

    #[test]
    fn rejects_empty() {
        assert_eq!(parse(""), Err(ParseError::Empty));
    }

    #[test]
    fn rejects_dangling_sign() {
        assert_eq!(parse("3x+"), Err(ParseError::DanglingSign { at: 2 }));
        assert_eq!(parse("-"), Err(ParseError::DanglingSign { at: 0 }));
    }

    #[test]
    fn rejects_caret_without_variable() {
        assert_eq!(parse("3^2"), Err(ParseError::CaretWithoutVariable { at: 1 }));
        assert_eq!(parse("^2"), Err(ParseError::CaretWithoutVariable { at: 0 }));
    }

    #[test]
    fn rejects_missing_exponent() {
        assert_eq!(parse("x^"), Err(ParseError::MissingExponent { at: 2 }));
        assert_eq!(parse("x^+2"), Err(ParseError::MissingExponent { at: 2 }));
    }

    #[test]
    fn rejects_stray_characters() {
        assert_eq!(
            parse("3x^2 + 1"),
            Err(ParseError::UnexpectedChar { ch: ' ', at: 4 })
        );
        assert_eq!(
            parse("2y"),
            Err(ParseError::UnexpectedChar { ch: 'y', at: 1 })
        );
    }

    #[test]
    fn rejects_overflow() {
        assert_eq!(parse("3000000000"), Err(ParseError::Overflow { at: 0 }));
        assert_eq!(parse("x^3000000000"), Err(ParseError::Overflow { at: 2 }));
    }

    #[test]
    fn eval_accumulates_terms() {
        let poly = parse("3x^2+2x").unwrap();
        assert_eq!(poly.eval(2.0), 16.0);
        assert_eq!(poly.eval(0.0), 0.0);
        assert_eq!(poly.eval(-1.0), 1.0);
    }

    #[test]
    fn display_is_compact() {
        for expr in ["3x^2-2x+7", "x", "-x^3+1", "0x^2+4", "2x-1"] {
            assert_eq!(parse(expr).unwrap().to_string(), expr);
        }
    }

    fn arb_poly() -> impl Strategy<Value = Polynomial> {
        let term = (-1000..1000i32, 0..6u32).prop_map(|(c, e)| Term::new(c, e));
        prop::collection::vec(term, 1..6).prop_map(Polynomial::new)
    }

    proptest! {
        #[test]
        fn display_then_parse_round_trips(poly in arb_poly()) {
            let reparsed = parse(&poly.to_string()).unwrap();
            prop_assert_eq!(reparsed, poly);
        }

        #[test]
        fn eval_matches_term_sum(poly in arb_poly(), x in -10.0..10.0f64) {
            let by_hand: f64 = poly.terms().iter().map(|t| t.eval(x)).sum();
            prop_assert_eq!(poly.eval(x), by_hand);
        }
    }
}
