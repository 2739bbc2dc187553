// Chart stage parsers: bar, heatmap, stream, boxplot, histogram, scatter, parallel, sankey

use super::ast::{BarOrder, BarStage, BarY, ChartStage};
use super::lexer::{unsigned, word, ws};
use crate::stack::Offset;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{map, opt, value},
    error::{Error, ErrorKind},
    multi::separated_list0,
    sequence::{delimited, pair, preceded},
    IResult,
};

#[derive(Debug, Clone)]
enum Arg {
    Field(&'static str, String),
    Y(BarY),
    Order(BarOrder),
    Offset(Offset),
    Bins(usize),
    Dims(Vec<String>),
}

/// `key: word`
fn field_arg<'a>(key: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, Arg> {
    map(preceded(pair(ws(tag(key)), char(':')), ws(word)), move |v| Arg::Field(key, v))
}

/// `y: count` or `y: mean(field)`
fn bar_y_arg(input: &str) -> IResult<&str, Arg> {
    map(
        preceded(
            pair(ws(tag("y")), char(':')),
            ws(alt((
                map(preceded(tag("mean"), delimited(ws(char('(')), ws(word), char(')'))), BarY::Mean),
                value(BarY::Count, pair(tag("count"), opt(tag("()")))),
            ))),
        ),
        Arg::Y,
    )(input)
}

fn order_arg(input: &str) -> IResult<&str, Arg> {
    map(
        preceded(
            pair(ws(tag("order")), char(':')),
            ws(alt((
                value(BarOrder::Descending, tag("desc")),
                value(BarOrder::Discovery, tag("none")),
            ))),
        ),
        Arg::Order,
    )(input)
}

fn offset_arg(input: &str) -> IResult<&str, Arg> {
    map(
        preceded(
            pair(ws(tag("offset")), char(':')),
            ws(alt((
                value(Offset::Zero, tag("zero")),
                value(Offset::Silhouette, tag("silhouette")),
            ))),
        ),
        Arg::Offset,
    )(input)
}

fn bins_arg(input: &str) -> IResult<&str, Arg> {
    map(preceded(pair(ws(tag("bins")), char(':')), ws(unsigned)), Arg::Bins)(input)
}

/// `dims: [a, b, "c d"]`
fn dims_arg(input: &str) -> IResult<&str, Arg> {
    map(
        preceded(
            pair(ws(tag("dims")), char(':')),
            ws(delimited(
                char('['),
                separated_list0(ws(char(',')), ws(word)),
                char(']'),
            )),
        ),
        Arg::Dims,
    )(input)
}

/// `name( arg, arg, ... )`
fn parse_args<'a, F>(input: &'a str, name: &'static str, arg: F) -> IResult<&'a str, Vec<Arg>>
where
    F: FnMut(&'a str) -> IResult<&'a str, Arg>,
{
    let (input, _) = ws(tag(name))(input)?;
    let (input, _) = ws(char('('))(input)?;
    let (input, args) = separated_list0(ws(char(',')), arg)(input)?;
    let (input, _) = ws(char(')'))(input)?;
    Ok((input, args))
}

/// Missing required arguments are a hard failure so `alt` does not try other stages.
fn required<T>(input: &str, value: Option<T>) -> Result<T, nom::Err<Error<&str>>> {
    value.ok_or_else(|| nom::Err::Failure(Error::new(input, ErrorKind::Verify)))
}

fn take_fields(args: Vec<Arg>) -> (Vec<(&'static str, String)>, Vec<Arg>) {
    let mut fields = Vec::new();
    let mut rest = Vec::new();
    for arg in args {
        match arg {
            Arg::Field(k, v) => fields.push((k, v)),
            other => rest.push(other),
        }
    }
    (fields, rest)
}

fn field(fields: &[(&'static str, String)], key: &str) -> Option<String> {
    fields.iter().rev().find(|(k, _)| *k == key).map(|(_, v)| v.clone())
}

/// Parse a ranked/unranked bar chart
/// Format: bar(x: color, y: mean(sellingprice), order: desc)
pub fn parse_bar(input: &str) -> IResult<&str, ChartStage> {
    let (rest, args) = parse_args(input, "bar", alt((field_arg("x"), bar_y_arg, order_arg)))?;
    let (fields, others) = take_fields(args);

    let mut y = BarY::Count;
    let mut order = BarOrder::Discovery;
    for arg in others {
        match arg {
            Arg::Y(v) => y = v,
            Arg::Order(o) => order = o,
            _ => {}
        }
    }

    let x = required(input, field(&fields, "x"))?;
    Ok((rest, ChartStage::Bar(BarStage { x, y, order })))
}

/// Format: heatmap(x: make, y: body)
pub fn parse_heatmap(input: &str) -> IResult<&str, ChartStage> {
    let (rest, args) = parse_args(input, "heatmap", alt((field_arg("x"), field_arg("y"))))?;
    let (fields, _) = take_fields(args);
    Ok((
        rest,
        ChartStage::Heatmap {
            x: required(input, field(&fields, "x"))?,
            y: required(input, field(&fields, "y"))?,
        },
    ))
}

/// Format: stream(series: color, x: year, offset: silhouette)
pub fn parse_stream(input: &str) -> IResult<&str, ChartStage> {
    let (rest, args) = parse_args(
        input,
        "stream",
        alt((field_arg("series"), field_arg("x"), offset_arg)),
    )?;
    let (fields, others) = take_fields(args);
    let offset = others
        .into_iter()
        .filter_map(|a| match a {
            Arg::Offset(o) => Some(o),
            _ => None,
        })
        .last()
        .unwrap_or_default();

    Ok((
        rest,
        ChartStage::Stream {
            series: required(input, field(&fields, "series"))?,
            x: required(input, field(&fields, "x"))?,
            offset,
        },
    ))
}

/// Format: boxplot(x: color, y: sellingprice)
pub fn parse_boxplot(input: &str) -> IResult<&str, ChartStage> {
    let (rest, args) = parse_args(input, "boxplot", alt((field_arg("x"), field_arg("y"))))?;
    let (fields, _) = take_fields(args);
    Ok((
        rest,
        ChartStage::Boxplot {
            x: required(input, field(&fields, "x"))?,
            y: required(input, field(&fields, "y"))?,
        },
    ))
}

/// Format: histogram(x: "Education Level", value: Income, bins: 20)
pub fn parse_histogram(input: &str) -> IResult<&str, ChartStage> {
    let (rest, args) = parse_args(
        input,
        "histogram",
        alt((field_arg("x"), field_arg("value"), bins_arg)),
    )?;
    let (fields, others) = take_fields(args);
    let bins = others
        .into_iter()
        .filter_map(|a| match a {
            Arg::Bins(n) => Some(n),
            _ => None,
        })
        .last()
        .unwrap_or(20);

    if bins == 0 {
        return Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify)));
    }

    Ok((
        rest,
        ChartStage::Histogram {
            x: required(input, field(&fields, "x"))?,
            value: required(input, field(&fields, "value"))?,
            bins,
        },
    ))
}

/// Format: scatter(x: year, y: sellingprice, color: transmission)
pub fn parse_scatter(input: &str) -> IResult<&str, ChartStage> {
    let (rest, args) = parse_args(
        input,
        "scatter",
        alt((field_arg("x"), field_arg("y"), field_arg("color"))),
    )?;
    let (fields, _) = take_fields(args);
    Ok((
        rest,
        ChartStage::Scatter {
            x: required(input, field(&fields, "x"))?,
            y: required(input, field(&fields, "y"))?,
            color: field(&fields, "color"),
        },
    ))
}

/// Format: parallel(dims: [transmission, condition, odometer], color: transmission)
pub fn parse_parallel(input: &str) -> IResult<&str, ChartStage> {
    let (rest, args) = parse_args(input, "parallel", alt((dims_arg, field_arg("color"))))?;
    let (fields, others) = take_fields(args);
    let dims = others
        .into_iter()
        .filter_map(|a| match a {
            Arg::Dims(d) => Some(d),
            _ => None,
        })
        .last()
        .filter(|d| d.len() >= 2);

    Ok((
        rest,
        ChartStage::Parallel {
            dims: required(input, dims)?,
            color: field(&fields, "color"),
        },
    ))
}

/// Format: sankey(from: color, to: make)
pub fn parse_sankey(input: &str) -> IResult<&str, ChartStage> {
    let (rest, args) = parse_args(input, "sankey", alt((field_arg("from"), field_arg("to"))))?;
    let (fields, _) = take_fields(args);
    Ok((
        rest,
        ChartStage::Sankey {
            from: required(input, field(&fields, "from"))?,
            to: required(input, field(&fields, "to"))?,
        },
    ))
}

/// Parse any chart stage
pub fn parse_chart(input: &str) -> IResult<&str, ChartStage> {
    alt((
        parse_bar,
        parse_heatmap,
        parse_stream,
        parse_boxplot,
        parse_histogram,
        parse_scatter,
        parse_parallel,
        parse_sankey,
    ))(input)
}
