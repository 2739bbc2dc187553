// Data-shaping stages: fields, synonyms, allow, where, select

use super::ast::{AllowStage, SynonymStage};
use super::lexer::{word, ws};
use crate::record::FieldSpec;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{map, opt, value},
    multi::{separated_list0, separated_list1},
    sequence::{preceded, separated_pair},
    IResult,
};

/// Parse the required field declarations
/// Format: fields(color: text, sellingprice: number)
pub fn parse_fields(input: &str) -> IResult<&str, Vec<FieldSpec>> {
    let (input, _) = ws(tag("fields"))(input)?;
    let (input, _) = ws(char('('))(input)?;

    let (input, fields) = separated_list1(
        ws(char(',')),
        map(
            separated_pair(
                ws(word),
                char(':'),
                ws(alt((
                    value(true, alt((tag("text"), tag("category")))),
                    value(false, tag("number")),
                ))),
            ),
            |(name, is_category)| {
                if is_category {
                    FieldSpec::category(name)
                } else {
                    FieldSpec::number(name)
                }
            },
        ),
    )(input)?;

    let (input, _) = ws(char(')'))(input)?;
    Ok((input, fields))
}

/// Parse a synonym map for one field
/// Format: synonyms(color, gray: silver, charcoal: black)
pub fn parse_synonyms(input: &str) -> IResult<&str, SynonymStage> {
    let (input, _) = ws(tag("synonyms"))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, field) = ws(word)(input)?;

    let (input, pairs) = opt(preceded(
        ws(char(',')),
        separated_list0(ws(char(',')), separated_pair(ws(word), char(':'), ws(word))),
    ))(input)?;
    let pairs = pairs.unwrap_or_default();

    let (input, _) = ws(char(')'))(input)?;
    Ok((input, SynonymStage { field, pairs }))
}

/// Parse a canonical allow-list for one field
/// Format: allow(color, white, black, "off-white")
pub fn parse_allow(input: &str) -> IResult<&str, AllowStage> {
    let (input, _) = ws(tag("allow"))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, field) = ws(word)(input)?;
    let (input, values) = opt(preceded(
        ws(char(',')),
        separated_list0(ws(char(',')), ws(word)),
    ))(input)?;
    let values = values.unwrap_or_default();
    let (input, _) = ws(char(')'))(input)?;
    Ok((input, AllowStage { field, values }))
}

/// Parse a static equality filter
/// Format: where(color: white) or where(color: white, body: SUV)
pub fn parse_where(input: &str) -> IResult<&str, Vec<(String, String)>> {
    let (input, _) = ws(tag("where"))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, pairs) = separated_list1(
        ws(char(',')),
        separated_pair(ws(word), char(':'), ws(word)),
    )(input)?;
    let (input, _) = ws(char(')'))(input)?;
    Ok((input, pairs))
}

/// Parse the selection-bridge field
/// Format: select(color)
pub fn parse_select(input: &str) -> IResult<&str, String> {
    let (input, _) = ws(tag("select"))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, field) = ws(word)(input)?;
    let (input, _) = ws(char(')'))(input)?;
    Ok((input, field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldKind;

    #[test]
    fn test_parse_fields() {
        let (_, fields) = parse_fields(r#"fields(color: text, "Education Level": category, Income: number)"#).unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1].name, "Education Level");
        assert_eq!(fields[1].kind, FieldKind::Category);
        assert_eq!(fields[2].kind, FieldKind::Number);
    }

    #[test]
    fn test_parse_fields_rejects_unknown_kind() {
        assert!(parse_fields("fields(color: date)").is_err());
        assert!(parse_fields("fields()").is_err());
    }

    #[test]
    fn test_parse_synonyms() {
        let (_, stage) = parse_synonyms("synonyms(color, gray: silver, off-white: white)").unwrap();
        assert_eq!(stage.field, "color");
        assert_eq!(
            stage.pairs,
            vec![
                ("gray".to_string(), "silver".to_string()),
                ("off-white".to_string(), "white".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_synonyms_without_pairs() {
        let (_, stage) = parse_synonyms("synonyms(color)").unwrap();
        assert!(stage.pairs.is_empty());
    }

    #[test]
    fn test_parse_allow() {
        let (_, stage) = parse_allow(r#"allow(transmission, automatic, "manual")"#).unwrap();
        assert_eq!(stage.field, "transmission");
        assert_eq!(stage.values, vec!["automatic", "manual"]);
    }

    #[test]
    fn test_parse_where_and_select() {
        let (_, pairs) = parse_where("where(color: white, body: SUV)").unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1], ("body".to_string(), "SUV".to_string()));
        let (_, field) = parse_select(" select( color ) ").unwrap();
        assert_eq!(field, "color");
    }
}
