// Abstract Syntax Tree for the chart pipeline DSL

use crate::record::FieldSpec;
use crate::stack::Offset;
use serde::Serialize;

/// Complete description of one chart's pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSpec {
    pub fields: Vec<FieldSpec>,
    pub synonyms: Vec<SynonymStage>,
    pub allows: Vec<AllowStage>,
    pub filters: Vec<(String, String)>,
    /// Field the selection bridge filters on
    pub select: Option<String>,
    pub chart: ChartStage,
    pub labels: Labels,
}

/// synonyms(color, gray: silver, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymStage {
    pub field: String,
    pub pairs: Vec<(String, String)>,
}

/// allow(color, white, black, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowStage {
    pub field: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarOrder {
    #[default]
    Discovery,
    Descending,
}

/// The terminal stage: which chart, over which fields
#[derive(Debug, Clone, PartialEq)]
pub enum ChartStage {
    Bar(BarStage),
    Heatmap { x: String, y: String },
    Stream { series: String, x: String, offset: Offset },
    Boxplot { x: String, y: String },
    Histogram { x: String, value: String, bins: usize },
    Scatter { x: String, y: String, color: Option<String> },
    Parallel { dims: Vec<String>, color: Option<String> },
    Sankey { from: String, to: String },
}

/// bar(x: color, y: mean(sellingprice), order: desc)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarStage {
    pub x: String,
    pub y: BarY,
    pub order: BarOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarY {
    Count,
    Mean(String),
}

impl ChartStage {
    pub fn name(&self) -> &'static str {
        match self {
            ChartStage::Bar(_) => "bar",
            ChartStage::Heatmap { .. } => "heatmap",
            ChartStage::Stream { .. } => "stream",
            ChartStage::Boxplot { .. } => "boxplot",
            ChartStage::Histogram { .. } => "histogram",
            ChartStage::Scatter { .. } => "scatter",
            ChartStage::Parallel { .. } => "parallel",
            ChartStage::Sankey { .. } => "sankey",
        }
    }
}

/// Plot labels (title, axes)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Labels {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
}
