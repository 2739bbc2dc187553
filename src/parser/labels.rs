use nom::{
    bytes::complete::tag,
    character::complete::char,
    combinator::cut,
    error::{Error, ErrorKind},
    multi::separated_list0,
    sequence::{delimited, separated_pair},
    IResult,
};
use crate::parser::ast::Labels;
use crate::parser::lexer::{identifier, string_literal, ws};

/// `labs(title: "...", subtitle: "...", x: "...", y: "...")`. Every value is quoted.
pub fn parse_labs(input: &str) -> IResult<&str, Labels> {
    let (input, _) = ws(tag("labs"))(input)?;
    let (rest, pairs) = delimited(
        ws(char('(')),
        separated_list0(
            ws(char(',')),
            separated_pair(ws(identifier), ws(char(':')), cut(ws(string_literal))),
        ),
        ws(char(')')),
    )(input)?;

    let mut labels = Labels::default();
    for (key, text) in pairs {
        let slot = match key.as_str() {
            "title" => &mut labels.title,
            "subtitle" => &mut labels.subtitle,
            "x" => &mut labels.x,
            "y" => &mut labels.y,
            _ => return Err(nom::Err::Failure(Error::new(input, ErrorKind::Tag))),
        };
        *slot = Some(text);
    }

    Ok((rest, labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labs() {
        let (_, labels) = parse_labs(r#"labs(title: "Average Selling Price by Car Color", x: "Color")"#).unwrap();
        assert_eq!(labels.title.as_deref(), Some("Average Selling Price by Car Color"));
        assert_eq!(labels.x.as_deref(), Some("Color"));
        assert_eq!(labels.y, None);
    }

    #[test]
    fn test_parse_labs_requires_quotes() {
        assert!(parse_labs("labs(title: Color)").is_err());
    }

    #[test]
    fn test_unknown_label_fails() {
        assert!(matches!(parse_labs(r#"labs(caption: "x")"#), Err(nom::Err::Failure(_))));
    }

    #[test]
    fn test_empty_labs() {
        let (rest, labels) = parse_labs("labs()").unwrap();
        assert_eq!(rest, "");
        assert_eq!(labels, Labels::default());
    }
}
