//! Tokenizers shared by the `name = value [unit]` style dumps.

use nom::bytes::complete::{take_till, take_till1};
use nom::character::complete::{char, space0, space1};
use nom::combinator::{all_consuming, rest};
use nom::number::complete::double;
use nom::sequence::{delimited, separated_pair};
use nom::IResult;

/// A `name = rhs` pair, both sides trimmed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct Field<'a> {
    pub(crate) name: &'a str,
    pub(crate) rhs: &'a str,
}

/// The right-hand side of a field.
#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum Rhs<'a> {
    /// Exactly a number followed by a unit token.
    Measured { value: f64, unit: &'a str },
    /// Anything else, kept verbatim.
    Raw(&'a str),
}

fn name_eq_rhs(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(take_till(|c| c == '='), char('='), rest)(input)
}

fn unit(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace())(input)
}

fn measured(input: &str) -> IResult<&str, (f64, &str)> {
    all_consuming(delimited(
        space0,
        separated_pair(double, space1, unit),
        space0,
    ))(input)
}

/// Splits `text` at its first `=`.
pub(crate) fn field(text: &str) -> Option<Field<'_>> {
    let (_, (name, rhs)) = name_eq_rhs(text).ok()?;
    Some(Field {
        name: name.trim(),
        rhs: rhs.trim(),
    })
}

/// Classifies a right-hand side as a measured value or raw text.
pub(crate) fn rhs(text: &str) -> Rhs<'_> {
    match measured(text) {
        Ok((_, (value, unit))) => Rhs::Measured { value, unit },
        Err(_) => Rhs::Raw(text.trim()),
    }
}

/// Parses `token` as a float, requiring the whole token to be consumed.
pub(crate) fn number(token: &str) -> Option<f64> {
    all_consuming(double::<&str, nom::error::Error<&str>>)(token.trim())
        .ok()
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field() {
        assert_eq!(
            field("  esr = 12.5 ohm "),
            Some(Field {
                name: "esr",
                rhs: "12.5 ohm"
            })
        );
        assert_eq!(
            field("vector = a=b"),
            Some(Field {
                name: "vector",
                rhs: "a=b"
            })
        );
        assert_eq!(field("no separator"), None);
    }

    #[test]
    fn test_rhs() {
        assert_eq!(
            rhs("1e-15 F"),
            Rhs::Measured {
                value: 1e-15,
                unit: "F"
            }
        );
        assert_eq!(
            rhs("0.9  V"),
            Rhs::Measured {
                value: 0.9,
                unit: "V"
            }
        );
        assert_eq!(rhs("output_rise"), Rhs::Raw("output_rise"));
        assert_eq!(rhs("1"), Rhs::Raw("1"));
        assert_eq!(rhs("abc V"), Rhs::Raw("abc V"));
        assert_eq!(rhs("1.0 V extra"), Rhs::Raw("1.0 V extra"));
    }

    #[test]
    fn test_number() {
        assert_eq!(number("-1.2e-3"), Some(-1.2e-3));
        assert_eq!(number(" 4.5 "), Some(4.5));
        assert_eq!(number("4.5;"), None);
        assert_eq!(number(""), None);
    }
}
