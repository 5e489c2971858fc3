//! Parsers for the pieces of a unit string: atomic tokens with an optional power, numeric factors,
//! and the separators between them.

use std::str::FromStr;

use nom::branch::alt;
use nom::bytes::complete::{take_till1, take_while1};
use nom::character::complete::{char, digit1, multispace0, one_of};
use nom::combinator::{all_consuming, map_res, opt, recognize};
use nom::error::ParseError;
use nom::number::complete::recognize_float;
use nom::sequence::{delimited, pair, preceded, tuple};
use nom::IResult;

use crate::fract::Frac;

/// Parses a power written as an integer or an exact decimal, optionally signed: `2`, `-1`, `0.5`.
pub fn decimal_power(input: &str) -> IResult<&str, Frac> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            opt(pair(char('.'), digit1)),
        ))),
        Frac::from_str,
    )(input)
}

/// Parses a parenthesized power: `(1/3)`, `(-2/3)`, `(0.5)`.
pub fn paren_power(input: &str) -> IResult<&str, Frac> {
    map_res(
        delimited(
            char('('),
            ws(take_while1(|c: char| c != '(' && c != ')')),
            char(')'),
        ),
        Frac::from_str,
    )(input)
}

/// Parses the power after a `^`.
pub fn power(input: &str) -> IResult<&str, Frac> {
    alt((paren_power, decimal_power))(input)
}

/// Parses a unit name: everything up to the power marker.
pub fn unit_name(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c == '^' || c.is_whitespace())(input)
}

/// Parses a complete atomic token like `meter`, `second^-2` or `meter^(1/3)`.
pub fn atom(input: &str) -> IResult<&str, (&str, Option<Frac>)> {
    all_consuming(ws(pair(unit_name, opt(preceded(ws(char('^')), power)))))(input)
}

/// Parses a complete numeric factor like `1`, `0.001` or `1e3`.
pub fn numeric_literal(input: &str) -> IResult<&str, f64> {
    all_consuming(ws(map_res(recognize_float, f64::from_str)))(input)
}

/// A combinator that takes a parser `inner` and produces a parser that also consumes both leading
/// and trailing whitespace, returning the output of `inner`.
fn ws<'a, F: 'a, O, E: ParseError<&'a str>>(
    inner: F,
) -> impl FnMut(&'a str) -> IResult<&'a str, O, E>
where
    F: FnMut(&'a str) -> IResult<&'a str, O, E>,
{
    delimited(multispace0, inner, multispace0)
}

/// Finds the first occurrence of `sep` outside of any parentheses.
pub fn find_top_level(input: &str, sep: impl Fn(char) -> bool) -> Option<usize> {
    let mut depth = 0i32;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            c if depth == 0 && sep(c) => return Some(i),
            _ => {}
        }
    }
    None
}

/// Splits on every occurrence of `sep` outside of parentheses, dropping empty pieces.
pub fn split_top_level(input: &str, sep: impl Fn(char) -> bool) -> Vec<&str> {
    let mut pieces = vec![];
    let mut rest = input;
    while let Some(i) = find_top_level(rest, &sep) {
        pieces.push(&rest[..i]);
        // separators are all single characters, but not necessarily single bytes
        let width = rest[i..].chars().next().map_or(1, char::len_utf8);
        rest = &rest[i + width..];
    }
    pieces.push(rest);
    pieces
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frac;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_atom() {
        assert_eq!(atom("meter"), Ok(("", ("meter", None))));
        assert_eq!(atom(" s^2 "), Ok(("", ("s", Some(frac!(2))))));
        assert_eq!(atom("second^-1"), Ok(("", ("second", Some(frac!(-1))))));
        assert_eq!(atom("m^+3"), Ok(("", ("m", Some(frac!(3))))));
        assert_eq!(atom("kg^0.5"), Ok(("", ("kg", Some(frac!(1 / 2))))));
        assert_eq!(atom("meter^(1/3)"), Ok(("", ("meter", Some(frac!(1 / 3))))));
        assert_eq!(atom("meter^( -2 / 4 )"), Ok(("", ("meter", Some(frac!(-1 / 2))))));
        assert_eq!(atom("Ω"), Ok(("", ("Ω", None))));
        assert!(atom("meter^x").is_err());
        assert!(atom("meter^").is_err());
        assert!(atom("meter^2^3").is_err());
        assert!(atom("meter^(1/0)").is_err());
        assert!(atom("^2").is_err());
    }

    #[test]
    fn test_numeric_literal() {
        assert_eq!(numeric_literal("1"), Ok(("", 1.0)));
        assert_eq!(numeric_literal(" 0.001 "), Ok(("", 0.001)));
        assert_eq!(numeric_literal("1e3"), Ok(("", 1000.0)));
        assert!(numeric_literal("meter").is_err());
        assert!(numeric_literal("1m").is_err());
        assert!(numeric_literal("inf").is_err());
    }

    #[test]
    fn test_split_top_level() {
        let slash = |c: char| c == '/';
        assert_eq!(find_top_level("m / s", slash), Some(2));
        assert_eq!(find_top_level("m^(1/3)", slash), None);
        assert_eq!(find_top_level("m^(1/3) / s", slash), Some(8));
        assert_eq!(
            split_top_level("kg * m^(1 * 2) *  * s", |c| c == '*'),
            vec!["kg", "m^(1 * 2)", "s"]
        );
        assert_eq!(
            split_top_level("  kg   m^(1 / 3) ", char::is_whitespace),
            vec!["kg", "m^(1 / 3)"]
        );
        assert_eq!(split_top_level("", char::is_whitespace), Vec::<&str>::new());
    }
}
