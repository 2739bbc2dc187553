// Immutable per-chart snapshots produced by a pipeline run

use crate::aggregate::{Aggregate, Bin, Grid, SankeyGraph, SeriesTable};
use crate::parser::ast::Labels;
use crate::record::Value;
use crate::stack::{Offset, StackedSeries};
use serde::Serialize;

/// Everything a renderer needs for one chart, computed in one pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Labels,
    /// Selection in effect when this snapshot was computed
    pub selected: Option<String>,
    pub body: ChartBody,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChartBody {
    Bar(BarChart),
    Heatmap(Grid),
    Stream(StreamChart),
    Boxplot(BoxChart),
    Histogram(HistogramChart),
    Scatter(ScatterChart),
    Parallel(ParallelChart),
    Sankey(SankeyGraph),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChart {
    pub bars: Vec<Aggregate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamChart {
    pub table: SeriesTable,
    pub layers: Vec<StackedSeries>,
    pub offset: Offset,
    /// First and last x present in the data
    pub extent: Option<(f64, f64)>,
    /// Rendered x window; equals `extent` until narrowed
    pub window: Option<(f64, f64)>,
}

impl StreamChart {
    /// Restrict the rendered x domain, clamped to the data extent.
    ///
    /// An inverted window, or one that misses the extent entirely, resets to
    /// the full extent.
    pub fn with_window(mut self, lo: f64, hi: f64) -> Self {
        self.window = match self.extent {
            Some((min, max)) if lo <= hi => {
                let (lo, hi) = (lo.max(min), hi.min(max));
                if lo <= hi { Some((lo, hi)) } else { self.extent }
            }
            _ => self.extent,
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxChart {
    /// One `Summary` aggregate per category
    pub boxes: Vec<Aggregate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramGroup {
    pub name: String,
    pub bins: Vec<Bin>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramChart {
    /// Shared by every group
    pub domain: (f64, f64),
    pub groups: Vec<HistogramGroup>,
}

impl HistogramChart {
    pub fn max_count(&self) -> u64 {
        self.groups
            .iter()
            .flat_map(|g| g.bins.iter().map(|b| b.count))
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterChart {
    pub points: Vec<Point>,
    pub x_domain: (f64, f64),
    pub y_domain: (f64, f64),
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scale", rename_all = "lowercase")]
pub enum AxisDomain {
    Band { values: Vec<String> },
    Linear { min: f64, max: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParallelAxis {
    pub name: String,
    pub domain: AxisDomain,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParallelLine {
    pub values: Vec<Value>,
    pub group: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParallelChart {
    pub axes: Vec<ParallelAxis>,
    pub lines: Vec<ParallelLine>,
    pub groups: Vec<String>,
}

impl ChartData {
    pub fn kind(&self) -> &'static str {
        match &self.body {
            ChartBody::Bar(_) => "bar",
            ChartBody::Heatmap(_) => "heatmap",
            ChartBody::Stream(_) => "stream",
            ChartBody::Boxplot(_) => "boxplot",
            ChartBody::Histogram(_) => "histogram",
            ChartBody::Scatter(_) => "scatter",
            ChartBody::Parallel(_) => "parallel",
            ChartBody::Sankey(_) => "sankey",
        }
    }

    /// True when there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        match &self.body {
            ChartBody::Bar(b) => b.bars.is_empty(),
            ChartBody::Heatmap(g) => g.cells.is_empty(),
            ChartBody::Stream(s) => s.table.x.is_empty(),
            ChartBody::Boxplot(b) => b.boxes.is_empty(),
            ChartBody::Histogram(h) => h.groups.is_empty(),
            ChartBody::Scatter(s) => s.points.is_empty(),
            ChartBody::Parallel(p) => p.lines.is_empty(),
            ChartBody::Sankey(s) => s.links.is_empty(),
        }
    }
}
