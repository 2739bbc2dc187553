// Token-level parsers shared by every stage

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace0},
    combinator::{map, map_res, recognize},
    multi::many0_count,
    sequence::{delimited, pair},
    IResult,
};

/// Wrap a parser so it skips surrounding whitespace
pub fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Identifier: letter or underscore, then letters, digits, `_` or `-`
pub fn identifier(input: &str) -> IResult<&str, String> {
    map(
        recognize(pair(
            alt((alpha1, tag("_"))),
            many0_count(alt((alphanumeric1, tag("_"), tag("-")))),
        )),
        |s: &str| s.to_string(),
    )(input)
}

/// Double-quoted string without escapes
pub fn string_literal(input: &str) -> IResult<&str, String> {
    map(
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        |s: &str| s.to_string(),
    )(input)
}

/// Unquoted value token, e.g. `off-white`, `2015`, `3.50`
pub fn bare_word(input: &str) -> IResult<&str, String> {
    map(
        take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '.'),
        |s: &str| s.to_string(),
    )(input)
}

/// Field name or category value: quoted string or bare word
pub fn word(input: &str) -> IResult<&str, String> {
    alt((string_literal, bare_word))(input)
}

pub fn unsigned(input: &str) -> IResult<&str, usize> {
    map_res(digit1, |s: &str| s.parse::<usize>())(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        assert_eq!(identifier("off-white)").unwrap(), (")", "off-white".to_string()));
        assert!(identifier("2015").is_err());
    }

    #[test]
    fn test_string_literal() {
        let (rest, s) = string_literal(r#""Education Level", x"#).unwrap();
        assert_eq!(s, "Education Level");
        assert_eq!(rest, ", x");
        assert_eq!(string_literal(r#""""#).unwrap().1, "");
    }

    #[test]
    fn test_word_accepts_numbers_and_quotes() {
        assert_eq!(word("2015,").unwrap().1, "2015");
        assert_eq!(word("3.50)").unwrap().1, "3.50");
        assert_eq!(word(r#""3.00 - 3.49""#).unwrap().1, "3.00 - 3.49");
    }

    #[test]
    fn test_ws_and_unsigned() {
        assert_eq!(ws(unsigned)("  20 )").unwrap(), (")", 20));
    }
}
