// One parameterized pipeline: coerce -> normalize -> filter -> aggregate -> layout

use crate::aggregate::{self, Statistic};
use crate::chart::{
    AxisDomain, BarChart, BoxChart, ChartBody, ChartData, HistogramChart, HistogramGroup,
    ParallelAxis, ParallelChart, ParallelLine, Point, ScatterChart, StreamChart,
};
use crate::data::Table;
use crate::error::{PipelineError, Result};
use crate::normalize::{normalize, Normalizer};
use crate::parser::{self, BarOrder, BarY, ChartStage, PipelineSpec};
use crate::record::{parse_number, FieldKind, Record, Schema, Value};
use crate::scale::{extent, pad_fraction};
use crate::selection::Selection;
use crate::stack::{Offset, Stack, StackLayout};
use tracing::{debug, info};

/// Chart stage with every field name resolved to a record slot.
#[derive(Debug, Clone, PartialEq)]
enum ChartPlan {
    Bar { x: usize, stat: Statistic, ranked: bool },
    Heatmap { x: usize, y: usize },
    Stream { series: usize, x: usize, offset: Offset },
    Boxplot { x: usize, y: usize },
    Histogram { x: usize, value: usize, bins: usize },
    Scatter { x: usize, y: usize, color: Option<usize> },
    Parallel { dims: Vec<usize>, color: Option<usize> },
    Sankey { from: usize, to: usize },
}

#[derive(Debug, Clone, PartialEq)]
enum Filter {
    Category(usize, String),
    Number(usize, f64),
}

impl Filter {
    fn keeps(&self, record: &Record) -> bool {
        match self {
            Filter::Category(slot, value) => record.category(*slot) == value,
            Filter::Number(slot, value) => record.number(*slot) == *value,
        }
    }
}

/// A validated chart description, ready to run against any table.
///
/// Running is a pure function of the table and the selection; nothing is
/// cached between runs.
#[derive(Debug, Clone)]
pub struct ChartPipeline {
    spec: PipelineSpec,
    schema: Schema,
    normalizers: Vec<Normalizer>,
    filters: Vec<Filter>,
    select: Option<usize>,
    plan: ChartPlan,
}

fn resolve(schema: &Schema, name: &str, want: Option<FieldKind>, role: &str) -> Result<usize> {
    let slot = schema.index_of(name).ok_or_else(|| {
        PipelineError::Config(format!("{} field '{}' is not declared in fields(...)", role, name))
    })?;
    if let Some(want) = want {
        if schema.kind_of(name) != Some(want) {
            let expected = match want {
                FieldKind::Category => "text",
                FieldKind::Number => "number",
            };
            return Err(PipelineError::Config(format!(
                "{} field '{}' must be declared as {}",
                role, name, expected
            )));
        }
    }
    Ok(slot)
}

impl ChartPipeline {
    /// Parse and validate a pipeline description.
    pub fn from_dsl(input: &str) -> Result<Self> {
        Self::from_spec(parser::parse_pipeline(input)?)
    }

    /// Resolve field references and build one normalizer per field.
    pub fn from_spec(spec: PipelineSpec) -> Result<Self> {
        let schema = Schema::new(spec.fields.clone());

        // Stages on the same field merge into one normalizer, in first-use order
        let mut normalizers: Vec<Normalizer> = Vec::new();
        fn normalizer_for(field: &str, normalizers: &mut Vec<Normalizer>) -> usize {
            match normalizers.iter().position(|n| n.field() == field) {
                Some(i) => i,
                None => {
                    normalizers.push(Normalizer::new(field));
                    normalizers.len() - 1
                }
            }
        }
        for stage in &spec.synonyms {
            let i = normalizer_for(&stage.field, &mut normalizers);
            let mut n = std::mem::take(&mut normalizers[i]);
            for (raw, canonical) in &stage.pairs {
                n = n.synonym(raw.as_str(), canonical.as_str());
            }
            normalizers[i] = n;
        }
        for stage in &spec.allows {
            let i = normalizer_for(&stage.field, &mut normalizers);
            let n = std::mem::take(&mut normalizers[i]);
            normalizers[i] = n.allow(stage.values.iter().cloned());
        }
        for n in &normalizers {
            n.slot(&schema)?;
            n.validate()?;
        }

        let mut filters = Vec::with_capacity(spec.filters.len());
        for (field, value) in &spec.filters {
            let slot = resolve(&schema, field, None, "where")?;
            let filter = match schema.kind_of(field) {
                Some(FieldKind::Number) => {
                    let n = parse_number(value).ok_or_else(|| {
                        PipelineError::Config(format!("where({}: {}) is not a number", field, value))
                    })?;
                    Filter::Number(slot, n)
                }
                _ => Filter::Category(slot, value.clone()),
            };
            filters.push(filter);
        }

        let select = spec
            .select
            .as_deref()
            .map(|f| resolve(&schema, f, Some(FieldKind::Category), "select"))
            .transpose()?;

        let plan = Self::plan(&schema, &spec.chart)?;
        debug!("Compiled {} pipeline over {} fields", spec.chart.name(), schema.len());

        Ok(Self { spec, schema, normalizers, filters, select, plan })
    }

    fn plan(schema: &Schema, chart: &ChartStage) -> Result<ChartPlan> {
        use FieldKind::{Category, Number};
        let plan = match chart {
            ChartStage::Bar(bar) => {
                let x = resolve(schema, &bar.x, Some(Category), "bar x")?;
                let stat = match &bar.y {
                    BarY::Count => Statistic::Count,
                    BarY::Mean(f) => Statistic::Mean(resolve(schema, f, Some(Number), "bar y")?),
                };
                ChartPlan::Bar { x, stat, ranked: bar.order == BarOrder::Descending }
            }
            ChartStage::Heatmap { x, y } => ChartPlan::Heatmap {
                x: resolve(schema, x, Some(Category), "heatmap x")?,
                y: resolve(schema, y, Some(Category), "heatmap y")?,
            },
            ChartStage::Stream { series, x, offset } => ChartPlan::Stream {
                series: resolve(schema, series, Some(Category), "stream series")?,
                x: resolve(schema, x, Some(Number), "stream x")?,
                offset: *offset,
            },
            ChartStage::Boxplot { x, y } => ChartPlan::Boxplot {
                x: resolve(schema, x, Some(Category), "boxplot x")?,
                y: resolve(schema, y, Some(Number), "boxplot y")?,
            },
            ChartStage::Histogram { x, value, bins } => ChartPlan::Histogram {
                x: resolve(schema, x, Some(Category), "histogram x")?,
                value: resolve(schema, value, Some(Number), "histogram value")?,
                bins: *bins,
            },
            ChartStage::Scatter { x, y, color } => ChartPlan::Scatter {
                x: resolve(schema, x, Some(Number), "scatter x")?,
                y: resolve(schema, y, Some(Number), "scatter y")?,
                color: color
                    .as_deref()
                    .map(|c| resolve(schema, c, Some(Category), "scatter color"))
                    .transpose()?,
            },
            ChartStage::Parallel { dims, color } => ChartPlan::Parallel {
                dims: dims
                    .iter()
                    .map(|d| resolve(schema, d, None, "parallel dimension"))
                    .collect::<Result<Vec<_>>>()?,
                color: color
                    .as_deref()
                    .map(|c| resolve(schema, c, Some(Category), "parallel color"))
                    .transpose()?,
            },
            ChartStage::Sankey { from, to } => ChartPlan::Sankey {
                from: resolve(schema, from, Some(Category), "sankey from")?,
                to: resolve(schema, to, Some(Category), "sankey to")?,
            },
        };
        Ok(plan)
    }

    pub fn spec(&self) -> &PipelineSpec {
        &self.spec
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Field the selection filters on, if this chart consumes a selection.
    pub fn select_field(&self) -> Option<&str> {
        self.spec.select.as_deref()
    }

    /// Compute a fresh snapshot. A selection is ignored unless the
    /// description declares `select(...)`.
    pub fn run(&self, table: &Table, selection: Option<&str>) -> Result<ChartData> {
        let records = self.schema.coerce(table);
        let full = normalize(records, &self.schema, &self.normalizers)?;

        let selection = Selection::with_value(self.select.and(selection));
        let filtered: Vec<Record> = full
            .iter()
            .filter(|r| self.filters.iter().all(|f| f.keeps(r)))
            .filter(|r| self.select.map_or(true, |slot| selection.matches(r.category(slot))))
            .cloned()
            .collect();

        info!(
            "Running {} pipeline: {} records, {} after filters",
            self.spec.chart.name(),
            full.len(),
            filtered.len()
        );

        let body = self.layout(&filtered, &full);
        Ok(ChartData {
            labels: self.spec.labels.clone(),
            selected: selection.get().map(str::to_string),
            body,
        })
    }

    fn layout(&self, filtered: &[Record], full: &[Record]) -> ChartBody {
        match &self.plan {
            ChartPlan::Bar { x, stat, ranked } => {
                let mut bars = aggregate::aggregate(filtered, &[*x], *stat);
                if *ranked {
                    aggregate::rank_descending(&mut bars);
                }
                ChartBody::Bar(BarChart { bars })
            }
            ChartPlan::Heatmap { x, y } => {
                ChartBody::Heatmap(aggregate::complete_grid(filtered, full, *x, *y))
            }
            ChartPlan::Stream { series, x, offset } => {
                let table = aggregate::yearly_series(filtered, *series, *x);
                let layers = Stack::new(*offset).stack(&table);
                let extent = table.extent();
                ChartBody::Stream(StreamChart { table, layers, offset: *offset, extent, window: extent })
            }
            ChartPlan::Boxplot { x, y } => ChartBody::Boxplot(BoxChart {
                boxes: aggregate::aggregate(filtered, &[*x], Statistic::Summary(*y)),
            }),
            ChartPlan::Histogram { x, value, bins } => {
                let max = filtered.iter().map(|r| r.number(*value)).fold(0.0, f64::max);
                let domain = (0.0, max);
                let groups = aggregate::distinct(filtered, *x)
                    .into_iter()
                    .map(|name| {
                        let values: Vec<f64> = filtered
                            .iter()
                            .filter(|r| r.category(*x) == name)
                            .map(|r| r.number(*value))
                            .collect();
                        let bins = aggregate::histogram(&values, *bins, domain);
                        HistogramGroup { name, bins }
                    })
                    .collect();
                ChartBody::Histogram(HistogramChart { domain, groups })
            }
            ChartPlan::Scatter { x, y, color } => {
                let points: Vec<Point> = filtered
                    .iter()
                    .map(|r| Point {
                        x: r.number(*x),
                        y: r.number(*y),
                        group: color.map(|c| r.category(c).to_string()),
                    })
                    .collect();
                let padded = |range: Option<(f64, f64)>| {
                    range.map_or((0.0, 1.0), |(lo, hi)| pad_fraction(lo, hi, 0.1))
                };
                ChartBody::Scatter(ScatterChart {
                    x_domain: padded(extent(points.iter().map(|p| p.x))),
                    y_domain: padded(extent(points.iter().map(|p| p.y))),
                    groups: color.map(|c| aggregate::distinct(filtered, c)).unwrap_or_default(),
                    points,
                })
            }
            ChartPlan::Parallel { dims, color } => {
                let axes = dims
                    .iter()
                    .map(|&slot| {
                        let field = &self.schema.fields()[slot];
                        let domain = match field.kind {
                            FieldKind::Category => AxisDomain::Band {
                                values: aggregate::distinct(filtered, slot),
                            },
                            FieldKind::Number => {
                                let (min, max) = extent(filtered.iter().map(|r| r.number(slot)))
                                    .unwrap_or((0.0, 1.0));
                                AxisDomain::Linear { min, max }
                            }
                        };
                        ParallelAxis { name: field.name.clone(), domain }
                    })
                    .collect();
                let lines = filtered
                    .iter()
                    .map(|r| ParallelLine {
                        values: dims.iter().map(|&slot| r.get(slot).clone()).collect::<Vec<Value>>(),
                        group: color.map(|c| r.category(c).to_string()),
                    })
                    .collect();
                ChartBody::Parallel(ParallelChart {
                    axes,
                    lines,
                    groups: color.map(|c| aggregate::distinct(filtered, c)).unwrap_or_default(),
                })
            }
            ChartPlan::Sankey { from, to } => {
                ChartBody::Sankey(aggregate::sankey_flows(filtered, *from, *to))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateValue;

    fn cars() -> Table {
        let headers = ["year", "make", "body", "color", "sellingprice"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = [
            ["2014", "Kia", "SUV", "white", "10000"],
            ["2015", "BMW", "Sedan", "gray", "30000"],
            ["2014", "Kia", "Sedan", "white", "20000"],
            ["2015", "BMW", "SUV", "silver", "50000"],
            ["2013", "Ford", "SUV", "", "15000"],
            ["2013", "Ford", "SUV", "—", "15000"],
            ["2014", "Kia", "SUV", "charcoal", "not-a-number"],
        ]
        .iter()
        .map(|r| r.iter().map(|s| s.to_string()).collect())
        .collect();
        Table::new(headers, rows)
    }

    const BAR: &str = "fields(color: text, sellingprice: number) \
        | synonyms(color, gray: silver, charcoal: black) \
        | allow(color, white, black, silver) \
        | bar(x: color, y: mean(sellingprice), order: desc)";

    #[test]
    fn test_ranked_mean_bar() {
        let pipeline = ChartPipeline::from_dsl(BAR).unwrap();
        let data = pipeline.run(&cars(), None).unwrap();
        let ChartBody::Bar(bar) = data.body else { panic!("Expected bar") };
        let keys: Vec<&str> = bar.bars.iter().map(|b| b.key[0].as_str()).collect();
        assert_eq!(keys, vec!["silver", "white"]);
        assert_eq!(bar.bars[0].value, AggregateValue::Mean(40000.0));
        assert_eq!(bar.bars[1].value, AggregateValue::Mean(15000.0));
    }

    #[test]
    fn test_count_conservation() {
        let pipeline = ChartPipeline::from_dsl(
            "fields(color: text) | allow(color, white, silver) | synonyms(color, gray: silver) | bar(x: color)",
        )
        .unwrap();
        let data = pipeline.run(&cars(), None).unwrap();
        let ChartBody::Bar(bar) = data.body else { panic!("Expected bar") };
        let total: u64 = bar.bars.iter().filter_map(|b| b.value.count()).sum();
        // white x2, gray->silver, silver
        assert_eq!(total, 4);
    }

    #[test]
    fn test_heatmap_grid_axes_from_full_set() {
        let pipeline = ChartPipeline::from_dsl(
            "fields(make: text, body: text, color: text) | select(color) | heatmap(x: make, y: body)",
        )
        .unwrap();
        let data = pipeline.run(&cars(), Some("white")).unwrap();
        assert_eq!(data.selected.as_deref(), Some("white"));
        let ChartBody::Heatmap(grid) = data.body else { panic!("Expected heatmap") };
        assert_eq!(grid.x_domain, vec!["Kia", "BMW", "Ford"]);
        assert_eq!(grid.cells.len(), grid.x_domain.len() * grid.y_domain.len());
        assert_eq!(grid.max_count(), 1);
        let bmw: u64 = grid
            .cells
            .iter()
            .filter(|c| c.key[0] == "BMW")
            .filter_map(|c| c.value.count())
            .sum();
        assert_eq!(bmw, 0);
    }

    #[test]
    fn test_selection_ignored_without_select_stage() {
        let pipeline = ChartPipeline::from_dsl("fields(color: text) | bar(x: color)").unwrap();
        let data = pipeline.run(&cars(), Some("white")).unwrap();
        assert_eq!(data.selected, None);
        let ChartBody::Bar(bar) = data.body else { panic!("Expected bar") };
        assert!(bar.bars.len() > 1);
    }

    #[test]
    fn test_selection_keeps_matching_records() {
        let pipeline =
            ChartPipeline::from_dsl("fields(color: text) | select(color) | bar(x: color)").unwrap();
        let data = pipeline.run(&cars(), Some("white")).unwrap();
        assert_eq!(data.selected.as_deref(), Some("white"));
        let ChartBody::Bar(bar) = data.body else { panic!("Expected bar") };
        assert_eq!(bar.bars.len(), 1);
        assert_eq!(bar.bars[0].value.count(), Some(2));
    }

    #[test]
    fn test_where_filter() {
        let pipeline = ChartPipeline::from_dsl(
            "fields(make: text, body: text, color: text) | where(color: white) | heatmap(x: make, y: body)",
        )
        .unwrap();
        let data = pipeline.run(&cars(), None).unwrap();
        let ChartBody::Heatmap(grid) = data.body else { panic!("Expected heatmap") };
        let total: u64 = grid.cells.iter().filter_map(|c| c.value.count()).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_missing_column_is_empty_chart() {
        let pipeline = ChartPipeline::from_dsl("fields(transmission: text) | bar(x: transmission)").unwrap();
        let data = pipeline.run(&cars(), None).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_undeclared_field_rejected() {
        let err = ChartPipeline::from_dsl("fields(color: text) | bar(x: make)").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let err = ChartPipeline::from_dsl("fields(color: text) | bar(x: color, y: mean(color))").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_synonym_outside_allow_list_rejected() {
        let err = ChartPipeline::from_dsl(
            "fields(color: text) | synonyms(color, gray: silver) | allow(color, white) | bar(x: color)",
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_stream_zero_filled() {
        let pipeline = ChartPipeline::from_dsl(
            "fields(color: text, year: number) | allow(color, white, silver) | stream(series: color, x: year)",
        )
        .unwrap();
        let data = pipeline.run(&cars(), None).unwrap();
        let ChartBody::Stream(stream) = data.body else { panic!("Expected stream") };
        assert_eq!(stream.table.x, vec![2014.0, 2015.0]);
        assert_eq!(stream.extent, Some((2014.0, 2015.0)));
        for series in &stream.table.series {
            assert_eq!(series.values.len(), 2);
        }
        assert_eq!(stream.layers.len(), stream.table.series.len());
    }

    #[test]
    fn test_histogram_shares_domain() {
        let pipeline = ChartPipeline::from_dsl(
            "fields(make: text, sellingprice: number) | histogram(x: make, value: sellingprice, bins: 5)",
        )
        .unwrap();
        let data = pipeline.run(&cars(), None).unwrap();
        let ChartBody::Histogram(hist) = data.body else { panic!("Expected histogram") };
        assert_eq!(hist.domain, (0.0, 50000.0));
        for group in &hist.groups {
            assert_eq!(group.bins.len(), 5);
            assert_eq!(group.bins.last().unwrap().x1, 50000.0);
        }
    }

    #[test]
    fn test_parallel_axes() {
        let pipeline = ChartPipeline::from_dsl(
            "fields(make: text, sellingprice: number) | parallel(dims: [make, sellingprice], color: make)",
        )
        .unwrap();
        let data = pipeline.run(&cars(), None).unwrap();
        let ChartBody::Parallel(p) = data.body else { panic!("Expected parallel") };
        assert_eq!(p.axes[1].domain, AxisDomain::Linear { min: 10000.0, max: 50000.0 });
        assert_eq!(p.lines.len(), 6);
        assert_eq!(p.groups, vec!["Kia", "BMW", "Ford"]);
    }

    #[test]
    fn test_run_is_deterministic() {
        let pipeline = ChartPipeline::from_dsl(
            "fields(color: text, make: text) | sankey(from: color, to: make)",
        )
        .unwrap();
        let a = pipeline.run(&cars(), None).unwrap();
        let b = pipeline.run(&cars(), None).unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }
}
