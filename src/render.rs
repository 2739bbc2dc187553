// Full-rebuild chart renderer on top of plotters

use crate::aggregate::{Aggregate, AggregateValue, FiveNumber, Grid, SankeyGraph, Side};
use crate::chart::{
    AxisDomain, BarChart, BoxChart, ChartBody, ChartData, HistogramChart, ParallelChart,
    ScatterChart, StreamChart,
};
use crate::error::{PipelineError, Result};
use crate::palette::ColorPalette;
use crate::parser::ast::Labels;
use crate::record::Value;
use crate::scale::{pad_range, BandScale, LinearScale, SequentialScale};
use crate::stack::stacked_extent;
use crate::{OutputFormat, RenderOptions};
use image::ImageEncoder;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use serde::Serialize;
use std::fmt::Display;
use std::ops::Range;
use tracing::debug;

type Chart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Pixel rectangle bound to one drawn element of one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitRegion {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
    pub key: Vec<String>,
}

impl HitRegion {
    fn from_corners(a: (i32, i32), b: (i32, i32), key: Vec<String>) -> Self {
        Self {
            x0: a.0.min(b.0),
            y0: a.1.min(b.1),
            x1: a.0.max(b.0),
            y1: a.1.max(b.1),
            key,
        }
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        (self.x0..=self.x1).contains(&x) && (self.y0..=self.y1).contains(&y)
    }

    /// Leading key component: the bar, box or node category.
    pub fn category(&self) -> &str {
        self.key.first().map(String::as_str).unwrap_or("")
    }
}

/// Encoded output of one render call plus its interaction map.
#[derive(Debug, Clone)]
pub struct Rendered {
    pub bytes: Vec<u8>,
    pub format: OutputFormat,
    pub regions: Vec<HitRegion>,
}

impl Rendered {
    /// Topmost region under a pixel.
    pub fn hit(&self, x: i32, y: i32) -> Option<&HitRegion> {
        self.regions.iter().rev().find(|r| r.contains(x, y))
    }
}

trait RenderContext<T> {
    fn context(self, what: &str) -> Result<T>;
}

impl<T, E: Display> RenderContext<T> for std::result::Result<T, E> {
    fn context(self, what: &str) -> Result<T> {
        self.map_err(|e| PipelineError::Render(format!("{}: {}", what, e)))
    }
}

/// Draw `data` from scratch. Nothing is kept between calls, and the returned
/// regions describe this snapshot only.
pub fn render(data: &ChartData, options: &RenderOptions) -> Result<Rendered> {
    if data.is_empty() {
        return Err(PipelineError::EmptyData);
    }
    let (width, height) = (options.width, options.height);
    if width == 0 || height == 0 {
        return Err(PipelineError::Render(format!("invalid canvas size {}x{}", width, height)));
    }

    let rendered = match options.format {
        OutputFormat::Svg => {
            let mut svg = String::new();
            let regions = {
                let root = SVGBackend::with_string(&mut svg, (width, height)).into_drawing_area();
                let regions = draw(&root, data)?;
                root.present().context("Failed to present drawing")?;
                regions
            };
            Rendered { bytes: svg.into_bytes(), format: OutputFormat::Svg, regions }
        }
        OutputFormat::Png => {
            let len = (width as usize)
                .checked_mul(height as usize)
                .and_then(|n| n.checked_mul(3))
                .ok_or_else(|| PipelineError::Render(format!("canvas {}x{} is too large", width, height)))?;
            let mut buffer = vec![0u8; len];
            let regions = {
                let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
                let regions = draw(&root, data)?;
                root.present().context("Failed to present drawing")?;
                regions
            };
            Rendered { bytes: encode_png(&buffer, width, height)?, format: OutputFormat::Png, regions }
        }
    };

    debug!(
        kind = data.kind(),
        bytes = rendered.bytes.len(),
        regions = rendered.regions.len(),
        "rendered chart"
    );
    Ok(rendered)
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(buffer, width, height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }
    Ok(png_bytes)
}

fn draw<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, data: &ChartData) -> Result<Vec<HitRegion>> {
    root.fill(&WHITE).context("Failed to fill background")?;

    let regions = match &data.body {
        ChartBody::Bar(bars) => draw_bars(root, data, bars)?,
        ChartBody::Heatmap(grid) => draw_heatmap(root, &data.labels, grid)?,
        ChartBody::Stream(stream) => draw_stream(root, &data.labels, stream)?,
        ChartBody::Boxplot(boxes) => draw_boxes(root, &data.labels, boxes)?,
        ChartBody::Histogram(hist) => draw_histogram(root, &data.labels, hist)?,
        ChartBody::Scatter(scatter) => draw_scatter(root, &data.labels, scatter)?,
        ChartBody::Parallel(parallel) => draw_parallel(root, &data.labels, parallel)?,
        ChartBody::Sankey(graph) => draw_sankey(root, &data.labels, graph)?,
    };

    if let Some(subtitle) = &data.labels.subtitle {
        let (_, h) = root.dim_in_pixel();
        root.draw(&Text::new(subtitle.as_str(), (10, h as i32 - 14), ("sans-serif", 12)))
            .context("Failed to draw subtitle")?;
    }

    Ok(regions)
}

fn cartesian<'a, DB: DrawingBackend>(
    root: &'a DrawingArea<DB, Shift>,
    labels: &Labels,
    x: Range<f64>,
    y: Range<f64>,
) -> Result<Chart<'a, DB>> {
    ChartBuilder::on(root)
        .margin(10)
        .caption(labels.title.as_deref().unwrap_or(""), ("sans-serif", 20))
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x, y)
        .context("Failed to build chart")
}

/// Labels integer positions with the category at that index.
fn band_labels(categories: &[String]) -> impl Fn(&f64) -> String + '_ {
    move |x: &f64| {
        let i = x.round();
        if (x - i).abs() > 1e-6 || i < 0.0 {
            return String::new();
        }
        categories.get(i as usize).cloned().unwrap_or_default()
    }
}

/// Range covering `n` unit bands centred on 0..n.
fn band_range(n: usize) -> (f64, f64) {
    (-0.5, n as f64 - 0.5)
}

fn nice_top(max: f64) -> f64 {
    LinearScale::new((0.0, max), (0.0, 1.0)).nice(10).domain.1.max(1.0)
}

fn draw_legend<'a, DB: DrawingBackend + 'a>(chart: &mut Chart<'a, DB>) -> Result<()> {
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .context("Failed to draw legend")
}

fn draw_bars<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    data: &ChartData,
    bars: &BarChart,
) -> Result<Vec<HitRegion>> {
    let categories: Vec<String> = bars.bars.iter().map(|b| b.key.join(" / ")).collect();
    let (lo, hi) = band_range(categories.len());
    let band = BandScale::new(categories.clone(), (lo, hi)).with_padding(0.2);
    let max = bars.bars.iter().map(|b| b.value.scalar()).fold(0.0, f64::max);

    let mut chart = cartesian(root, &data.labels, lo..hi, 0.0..nice_top(max))?;
    let formatter = band_labels(&categories);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(categories.len() + 1)
        .x_label_formatter(&formatter)
        .x_desc(data.labels.x.as_deref().unwrap_or(""))
        .y_desc(data.labels.y.as_deref().unwrap_or(""))
        .draw()
        .context("Failed to draw mesh")?;

    let palette = ColorPalette::category10();
    let mut regions = Vec::with_capacity(bars.bars.len());
    for (i, (bar, name)) in bars.bars.iter().zip(&categories).enumerate() {
        let x0 = band.position_at(i);
        let x1 = x0 + band.bandwidth();
        let v = bar.value.scalar();
        let fill = palette.color_for(name, i).filled();

        chart
            .draw_series([
                Rectangle::new([(x0, 0.0), (x1, v)], fill),
                Rectangle::new([(x0, 0.0), (x1, v)], BLACK.stroke_width(1)),
            ])
            .context("Failed to draw bar")?;

        regions.push(HitRegion::from_corners(
            chart.backend_coord(&(x0, v)),
            chart.backend_coord(&(x1, 0.0)),
            bar.key.clone(),
        ));
    }
    Ok(regions)
}

fn draw_heatmap<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    labels: &Labels,
    grid: &Grid,
) -> Result<Vec<HitRegion>> {
    let (x_lo, x_hi) = band_range(grid.x_domain.len());
    let (y_lo, y_hi) = band_range(grid.y_domain.len());
    let mut chart = cartesian(root, labels, x_lo..x_hi, y_lo..y_hi)?;

    let x_fmt = band_labels(&grid.x_domain);
    let y_fmt = band_labels(&grid.y_domain);
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(grid.x_domain.len() + 1)
        .y_labels(grid.y_domain.len() + 1)
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .x_desc(labels.x.as_deref().unwrap_or(""))
        .y_desc(labels.y.as_deref().unwrap_or(""))
        .draw()
        .context("Failed to draw mesh")?;

    let color = SequentialScale::new(grid.max_count() as f64);
    let ny = grid.y_domain.len();
    let mut regions = Vec::with_capacity(grid.cells.len());
    for (i, cell) in grid.cells.iter().enumerate() {
        let (xi, yi) = ((i / ny) as f64, (i % ny) as f64);
        let (r, g, b) = color.rgb(cell.value.scalar());
        let corners = [(xi - 0.5, yi - 0.5), (xi + 0.5, yi + 0.5)];
        chart
            .draw_series([
                Rectangle::new(corners, RGBColor(r, g, b).filled()),
                Rectangle::new(corners, WHITE.stroke_width(1)),
            ])
            .context("Failed to draw cell")?;
        regions.push(HitRegion::from_corners(
            chart.backend_coord(&corners[0]),
            chart.backend_coord(&corners[1]),
            cell.key.clone(),
        ));
    }
    Ok(regions)
}

fn draw_stream<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    labels: &Labels,
    stream: &StreamChart,
) -> Result<Vec<HitRegion>> {
    let x = &stream.table.x;
    let (lo, hi) = stream.window.or(stream.extent).unwrap_or((0.0, 1.0));
    let columns: Vec<usize> = (0..x.len()).filter(|&c| x[c] >= lo && x[c] <= hi).collect();

    let (x_lo, x_hi) = if lo == hi { pad_range(lo, hi) } else { (lo, hi) };
    let (y_lo, y_hi) = stacked_extent(&stream.layers).unwrap_or((0.0, 1.0));
    let (y_lo, y_hi) = if y_lo == y_hi { pad_range(y_lo, y_hi) } else { (y_lo, y_hi) };

    let mut chart = cartesian(root, labels, x_lo..x_hi, y_lo..y_hi)?;
    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_label_formatter(&|v: &f64| format!("{:.0}", v))
        .x_desc(labels.x.as_deref().unwrap_or(""))
        .y_desc(labels.y.as_deref().unwrap_or(""))
        .draw()
        .context("Failed to draw mesh")?;

    let half = if columns.len() > 1 {
        (x[columns[columns.len() - 1]] - x[columns[0]]) / (columns.len() - 1) as f64 / 2.0
    } else {
        0.5
    };

    let palette = ColorPalette::category10();
    let mut regions = Vec::new();
    for (i, layer) in stream.layers.iter().enumerate() {
        let color = palette.color_for(&layer.name, i);
        let mut outline: Vec<(f64, f64)> = columns.iter().map(|&c| (x[c], layer.intervals[c].1)).collect();
        outline.extend(columns.iter().rev().map(|&c| (x[c], layer.intervals[c].0)));

        chart
            .draw_series(std::iter::once(Polygon::new(outline, color.mix(0.85).filled())))
            .context("Failed to draw stream layer")?
            .label(layer.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));

        for &c in &columns {
            let (lower, upper) = layer.intervals[c];
            if upper <= lower {
                continue;
            }
            regions.push(HitRegion::from_corners(
                chart.backend_coord(&(x[c] - half, upper)),
                chart.backend_coord(&(x[c] + half, lower)),
                vec![layer.name.clone(), format!("{}", x[c])],
            ));
        }
    }
    draw_legend(&mut chart)?;
    Ok(regions)
}

fn draw_boxes<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    labels: &Labels,
    boxes: &BoxChart,
) -> Result<Vec<HitRegion>> {
    let summaries: Vec<(&Aggregate, FiveNumber)> = boxes
        .boxes
        .iter()
        .filter_map(|a| match a.value {
            AggregateValue::Summary(s) => Some((a, s)),
            _ => None,
        })
        .collect();
    let categories: Vec<String> = summaries.iter().map(|(a, _)| a.key.join(" / ")).collect();

    let y_min = summaries.iter().map(|(_, s)| s.min).fold(f64::INFINITY, f64::min);
    let y_max = summaries.iter().map(|(_, s)| s.max).fold(f64::NEG_INFINITY, f64::max);
    let (y_lo, y_hi) = if summaries.is_empty() { (0.0, 1.0) } else { pad_range(y_min, y_max) };
    let (x_lo, x_hi) = band_range(categories.len());
    let band = BandScale::new(categories.clone(), (x_lo, x_hi)).with_padding(0.3);

    let mut chart = cartesian(root, labels, x_lo..x_hi, y_lo..y_hi)?;
    let formatter = band_labels(&categories);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(categories.len() + 1)
        .x_label_formatter(&formatter)
        .x_desc(labels.x.as_deref().unwrap_or(""))
        .y_desc(labels.y.as_deref().unwrap_or(""))
        .draw()
        .context("Failed to draw mesh")?;

    let palette = ColorPalette::category10();
    let mut regions = Vec::with_capacity(summaries.len());
    for (i, ((agg, s), name)) in summaries.iter().zip(&categories).enumerate() {
        let center = band.center_at(i);
        let half = band.bandwidth() / 2.0;
        let cap = half * 0.4;
        let color = palette.color_for(name, i);

        chart
            .draw_series([
                PathElement::new(vec![(center, s.min), (center, s.q1)], BLACK.stroke_width(1)),
                PathElement::new(vec![(center, s.q3), (center, s.max)], BLACK.stroke_width(1)),
                PathElement::new(vec![(center - cap, s.min), (center + cap, s.min)], BLACK.stroke_width(1)),
                PathElement::new(vec![(center - cap, s.max), (center + cap, s.max)], BLACK.stroke_width(1)),
            ])
            .context("Failed to draw whiskers")?;
        chart
            .draw_series([
                Rectangle::new([(center - half, s.q1), (center + half, s.q3)], color.mix(0.7).filled()),
                Rectangle::new([(center - half, s.q1), (center + half, s.q3)], BLACK.stroke_width(1)),
            ])
            .context("Failed to draw box")?;
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(center - half, s.median), (center + half, s.median)],
                BLACK.stroke_width(2),
            )))
            .context("Failed to draw median")?;

        regions.push(HitRegion::from_corners(
            chart.backend_coord(&(center - half, s.max)),
            chart.backend_coord(&(center + half, s.min)),
            agg.key.clone(),
        ));
    }
    Ok(regions)
}

fn draw_histogram<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    labels: &Labels,
    hist: &HistogramChart,
) -> Result<Vec<HitRegion>> {
    let (lo, hi) = hist.domain;
    let (x_lo, x_hi) = if lo == hi { pad_range(lo, hi) } else { (lo, hi) };
    let mut chart = cartesian(root, labels, x_lo..x_hi, 0.0..nice_top(hist.max_count() as f64))?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc(labels.x.as_deref().unwrap_or(""))
        .y_desc(labels.y.as_deref().unwrap_or("Count"))
        .draw()
        .context("Failed to draw mesh")?;

    let palette = ColorPalette::category10();
    let mut regions = Vec::new();
    for (i, group) in hist.groups.iter().enumerate() {
        let color = palette.color_at(i);
        chart
            .draw_series(group.bins.iter().map(|b| {
                Rectangle::new([(b.x0, 0.0), (b.x1, b.count as f64)], color.mix(0.45).filled())
            }))
            .context("Failed to draw histogram bins")?
            .label(group.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));

        for bin in group.bins.iter().filter(|b| b.count > 0) {
            regions.push(HitRegion::from_corners(
                chart.backend_coord(&(bin.x0, bin.count as f64)),
                chart.backend_coord(&(bin.x1, 0.0)),
                vec![group.name.clone()],
            ));
        }
    }
    draw_legend(&mut chart)?;
    Ok(regions)
}

fn draw_scatter<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    labels: &Labels,
    scatter: &ScatterChart,
) -> Result<Vec<HitRegion>> {
    let (x0, x1) = scatter.x_domain;
    let (y0, y1) = scatter.y_domain;
    let mut chart = cartesian(root, labels, x0..x1, y0..y1)?;
    chart
        .configure_mesh()
        .x_label_formatter(&|v: &f64| format!("{:.0}", v))
        .x_desc(labels.x.as_deref().unwrap_or(""))
        .y_desc(labels.y.as_deref().unwrap_or(""))
        .draw()
        .context("Failed to draw mesh")?;

    let palette = ColorPalette::category10();
    if scatter.groups.is_empty() {
        let color = palette.color_at(0);
        chart
            .draw_series(scatter.points.iter().map(|p| Circle::new((p.x, p.y), 3, color.mix(0.6).filled())))
            .context("Failed to draw point series")?;
        return Ok(Vec::new());
    }

    for (i, group) in scatter.groups.iter().enumerate() {
        let color = palette.color_for(group, i);
        chart
            .draw_series(
                scatter
                    .points
                    .iter()
                    .filter(|p| p.group.as_deref() == Some(group.as_str()))
                    .map(|p| Circle::new((p.x, p.y), 3, color.mix(0.6).filled())),
            )
            .context("Failed to draw point series")?
            .label(group.as_str())
            .legend(move |(x, y)| Circle::new((x + 5, y), 4, color.filled()));
    }
    draw_legend(&mut chart)?;
    Ok(Vec::new())
}

/// Vertical position in [0, 1] of `value` on a parallel axis.
fn axis_position(domain: &AxisDomain, value: &Value) -> f64 {
    match (domain, value) {
        (AxisDomain::Band { values }, Value::Category(c)) => {
            let band = BandScale::new(values.clone(), (0.0, 1.0));
            band.index_of(c).map(|i| band.center_at(i)).unwrap_or(0.5)
        }
        (AxisDomain::Linear { min, max }, Value::Number(n)) => {
            LinearScale::new((*min, *max), (0.0, 1.0)).map(*n)
        }
        _ => 0.5,
    }
}

fn draw_parallel<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    labels: &Labels,
    parallel: &ParallelChart,
) -> Result<Vec<HitRegion>> {
    let names: Vec<String> = parallel.axes.iter().map(|a| a.name.clone()).collect();
    let (x_lo, x_hi) = band_range(names.len());
    let mut chart = cartesian(root, labels, x_lo..x_hi, -0.05..1.05)?;
    let formatter = band_labels(&names);
    chart
        .configure_mesh()
        .disable_mesh()
        .disable_y_axis()
        .x_labels(names.len() + 1)
        .x_label_formatter(&formatter)
        .draw()
        .context("Failed to draw mesh")?;

    let palette = ColorPalette::category10();
    let polyline = |values: &[Value]| -> Vec<(f64, f64)> {
        parallel
            .axes
            .iter()
            .zip(values)
            .enumerate()
            .map(|(i, (axis, v))| (i as f64, axis_position(&axis.domain, v)))
            .collect()
    };

    if parallel.groups.is_empty() {
        let color = palette.color_at(0);
        chart
            .draw_series(
                parallel
                    .lines
                    .iter()
                    .map(|l| PathElement::new(polyline(&l.values), color.mix(0.3).stroke_width(1))),
            )
            .context("Failed to draw lines")?;
    } else {
        for (i, group) in parallel.groups.iter().enumerate() {
            let color = palette.color_for(group, i);
            chart
                .draw_series(
                    parallel
                        .lines
                        .iter()
                        .filter(|l| l.group.as_deref() == Some(group.as_str()))
                        .map(|l| PathElement::new(polyline(&l.values), color.mix(0.3).stroke_width(1))),
                )
                .context("Failed to draw lines")?
                .label(group.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], color.stroke_width(2)));
        }
        draw_legend(&mut chart)?;
    }

    let mut regions = Vec::new();
    for (i, axis) in parallel.axes.iter().enumerate() {
        let x = i as f64;
        chart
            .draw_series(std::iter::once(PathElement::new(vec![(x, 0.0), (x, 1.0)], BLACK.stroke_width(1))))
            .context("Failed to draw axis")?;

        let ticks: Vec<(String, f64)> = match &axis.domain {
            AxisDomain::Band { values } => {
                let band = BandScale::new(values.clone(), (0.0, 1.0));
                values.iter().enumerate().map(|(j, v)| (v.clone(), band.center_at(j))).collect()
            }
            AxisDomain::Linear { min, max } => vec![(format!("{}", min), 0.0), (format!("{}", max), 1.0)],
        };
        for (text, y) in &ticks {
            chart
                .draw_series(std::iter::once(Text::new(text.clone(), (x + 0.03, *y), ("sans-serif", 12))))
                .context("Failed to draw axis label")?;
        }

        if let AxisDomain::Band { values } = &axis.domain {
            let band = BandScale::new(values.clone(), (0.0, 1.0));
            for (j, v) in values.iter().enumerate() {
                let y0 = band.position_at(j);
                regions.push(HitRegion::from_corners(
                    chart.backend_coord(&(x - 0.1, y0)),
                    chart.backend_coord(&(x + 0.1, y0 + band.bandwidth())),
                    vec![v.clone(), axis.name.clone()],
                ));
            }
        }
    }
    Ok(regions)
}

/// Vertical spans of each node, in data units, stacked top to bottom per side.
fn sankey_spans(graph: &SankeyGraph, height: f64, gap: f64) -> Vec<(f64, f64)> {
    let mut totals = vec![0u64; graph.nodes.len()];
    for link in &graph.links {
        totals[link.source] += link.value;
        totals[link.target] += link.value;
    }
    let mut spans = vec![(0.0, 0.0); graph.nodes.len()];
    for side in [Side::Source, Side::Target] {
        let mut top = height;
        for i in (0..graph.nodes.len()).filter(|&i| graph.nodes[i].side == side) {
            let bottom = top - totals[i] as f64;
            spans[i] = (bottom, top);
            top = bottom - gap;
        }
    }
    spans
}

fn draw_sankey<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    labels: &Labels,
    graph: &SankeyGraph,
) -> Result<Vec<HitRegion>> {
    const NODE_WIDTH: f64 = 0.04;
    let total: u64 = graph.links.iter().map(|l| l.value).sum();
    let per_side = |side: Side| graph.nodes.iter().filter(|n| n.side == side).count();
    let gap = total as f64 * 0.02;
    let slots = per_side(Side::Source).max(per_side(Side::Target)).saturating_sub(1);
    let height = total as f64 + gap * slots as f64;

    let mut chart = ChartBuilder::on(root)
        .margin(20)
        .caption(labels.title.as_deref().unwrap_or(""), ("sans-serif", 20))
        .build_cartesian_2d(-0.3..1.3, 0.0..height.max(1.0))
        .context("Failed to build chart")?;

    let spans = sankey_spans(graph, height, gap);
    let palette = ColorPalette::category10();
    let colors: Vec<RGBColor> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| palette.color_for(&n.name, i))
        .collect();

    // Links fill each node from the top in link order
    let mut cursor: Vec<f64> = spans.iter().map(|s| s.1).collect();
    for link in &graph.links {
        let v = link.value as f64;
        let (s_top, t_top) = (cursor[link.source], cursor[link.target]);
        cursor[link.source] -= v;
        cursor[link.target] -= v;

        let (x0, x1) = (NODE_WIDTH, 1.0 - NODE_WIDTH);
        let curve = |from: f64, to: f64, t: f64| from + (to - from) * t * t * (3.0 - 2.0 * t);
        let steps = 24;
        let mut outline: Vec<(f64, f64)> = (0..=steps)
            .map(|k| {
                let t = k as f64 / steps as f64;
                (x0 + (x1 - x0) * t, curve(s_top, t_top, t))
            })
            .collect();
        outline.extend((0..=steps).rev().map(|k| {
            let t = k as f64 / steps as f64;
            (x0 + (x1 - x0) * t, curve(s_top - v, t_top - v, t))
        }));
        chart
            .draw_series(std::iter::once(Polygon::new(outline, colors[link.source].mix(0.35).filled())))
            .context("Failed to draw link")?;
    }

    let left = TextStyle::from(("sans-serif", 12).into_font()).pos(Pos::new(HPos::Right, VPos::Center));
    let right = TextStyle::from(("sans-serif", 12).into_font()).pos(Pos::new(HPos::Left, VPos::Center));

    let mut regions = Vec::with_capacity(graph.nodes.len());
    for (i, node) in graph.nodes.iter().enumerate() {
        let (bottom, top) = spans[i];
        let (x0, x1, label_x, style) = match node.side {
            Side::Source => (0.0, NODE_WIDTH, -0.02, &left),
            Side::Target => (1.0 - NODE_WIDTH, 1.0, 1.02, &right),
        };
        chart
            .draw_series(std::iter::once(Rectangle::new([(x0, bottom), (x1, top)], colors[i].filled())))
            .context("Failed to draw node")?;
        chart
            .draw_series(std::iter::once(Text::new(
                node.name.clone(),
                (label_x, (top + bottom) / 2.0),
                style.clone(),
            )))
            .context("Failed to draw node label")?;
        regions.push(HitRegion::from_corners(
            chart.backend_coord(&(x0, top)),
            chart.backend_coord(&(x1, bottom)),
            vec![node.name.clone()],
        ));
    }
    Ok(regions)
}
