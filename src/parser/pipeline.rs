// Pipeline parser for the chart description DSL

use super::ast::{AllowStage, ChartStage, Labels, PipelineSpec, SynonymStage};
use super::chart::parse_chart;
use super::labels::parse_labs;
use super::lexer::ws;
use super::stages::{parse_allow, parse_fields, parse_select, parse_synonyms, parse_where};
use crate::record::FieldSpec;
use nom::{
    branch::alt,
    bytes::complete::tag,
    combinator::{eof, map, opt},
    error::{Error, ErrorKind},
    multi::separated_list1,
    IResult,
};

#[derive(Debug)]
enum PipelineComponent {
    Fields(Vec<FieldSpec>),
    Synonyms(SynonymStage),
    Allow(AllowStage),
    Where(Vec<(String, String)>),
    Select(String),
    Chart(ChartStage),
    Labels(Labels),
}

fn parse_pipeline_component(input: &str) -> IResult<&str, PipelineComponent> {
    alt((
        map(parse_fields, PipelineComponent::Fields),
        map(parse_synonyms, PipelineComponent::Synonyms),
        map(parse_allow, PipelineComponent::Allow),
        map(parse_where, PipelineComponent::Where),
        map(parse_select, PipelineComponent::Select),
        map(parse_labs, PipelineComponent::Labels),
        map(parse_chart, PipelineComponent::Chart),
    ))(input)
}

/// Parse a complete chart pipeline
/// Format: fields(...) | stage | ... | chart(...) | labs(...)
pub fn parse_pipeline_spec(input: &str) -> IResult<&str, PipelineSpec> {
    let (input, _) = opt(ws(tag("|")))(input)?;

    let (input, components) = separated_list1(ws(tag("|")), parse_pipeline_component)(input)?;

    let (input, _) = ws(eof)(input)?;

    let mut fields: Option<Vec<FieldSpec>> = None;
    let mut synonyms = Vec::new();
    let mut allows = Vec::new();
    let mut filters = Vec::new();
    let mut select = None;
    let mut chart = None;
    let mut labels = Labels::default();

    for comp in components {
        match comp {
            PipelineComponent::Fields(f) => {
                if fields.is_some() {
                    return Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify)));
                }
                fields = Some(f);
            }
            PipelineComponent::Synonyms(s) => synonyms.push(s),
            PipelineComponent::Allow(a) => allows.push(a),
            PipelineComponent::Where(w) => filters.extend(w),
            PipelineComponent::Select(s) => select = Some(s),
            PipelineComponent::Chart(c) => {
                if chart.is_some() {
                    return Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify)));
                }
                chart = Some(c);
            }
            // Later labs() fields override earlier ones
            PipelineComponent::Labels(l) => {
                labels.title = l.title.or(labels.title);
                labels.subtitle = l.subtitle.or(labels.subtitle);
                labels.x = l.x.or(labels.x);
                labels.y = l.y.or(labels.y);
            }
        }
    }

    let (fields, chart) = match (fields, chart) {
        (Some(fields), Some(chart)) => (fields, chart),
        _ => return Err(nom::Err::Error(Error::new(input, ErrorKind::Verify))),
    };

    Ok((
        input,
        PipelineSpec {
            fields,
            synonyms,
            allows,
            filters,
            select,
            chart,
            labels,
        },
    ))
}
