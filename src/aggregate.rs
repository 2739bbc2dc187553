use crate::record::Record;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// What to compute over each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Count,
    /// Arithmetic mean of the numeric field at this record slot
    Mean(usize),
    /// {min, q1, median, q3, max} of the numeric field at this record slot
    Summary(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FiveNumber {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateValue {
    Count(u64),
    Mean(f64),
    Summary(FiveNumber),
}

impl AggregateValue {
    /// The single number a ranked or colour-scaled view orders by.
    pub fn scalar(&self) -> f64 {
        match self {
            AggregateValue::Count(n) => *n as f64,
            AggregateValue::Mean(m) => *m,
            AggregateValue::Summary(s) => s.median,
        }
    }

    pub fn count(&self) -> Option<u64> {
        match self {
            AggregateValue::Count(n) => Some(*n),
            _ => None,
        }
    }
}

/// One statistic per distinct key combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub key: Vec<String>,
    pub value: AggregateValue,
}

/// Group record indices by the categories at `key_slots`, in discovery order.
fn group_indices(records: &[Record], key_slots: &[usize]) -> Vec<(Vec<String>, Vec<usize>)> {
    let mut position: HashMap<Vec<String>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<String>, Vec<usize>)> = Vec::new();

    for (i, record) in records.iter().enumerate() {
        let key: Vec<String> = key_slots.iter().map(|&s| record.category(s).to_string()).collect();
        match position.get(&key) {
            Some(&g) => groups[g].1.push(i),
            None => {
                position.insert(key.clone(), groups.len());
                groups.push((key, vec![i]));
            }
        }
    }
    groups
}

/// Group `records` by the (single or compound) key and compute `stat` per group.
///
/// Output order is the order in which each key was first seen.
pub fn aggregate(records: &[Record], key_slots: &[usize], stat: Statistic) -> Vec<Aggregate> {
    group_indices(records, key_slots)
        .into_iter()
        .filter_map(|(key, members)| {
            let value = match stat {
                Statistic::Count => AggregateValue::Count(members.len() as u64),
                Statistic::Mean(slot) => {
                    let values: Vec<f64> = members.iter().map(|&i| records[i].number(slot)).collect();
                    AggregateValue::Mean(mean(&values)?)
                }
                Statistic::Summary(slot) => {
                    let values: Vec<f64> = members.iter().map(|&i| records[i].number(slot)).collect();
                    AggregateValue::Summary(five_number(&values)?)
                }
            };
            Some(Aggregate { key, value })
        })
        .collect()
}

/// Stable sort, largest statistic first.
pub fn rank_descending(aggregates: &mut [Aggregate]) {
    aggregates.sort_by(|a, b| {
        b.value
            .scalar()
            .partial_cmp(&a.value.scalar())
            .unwrap_or(Ordering::Equal)
    });
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Quantile of already-sorted data using linear interpolation between ranks.
pub fn quantile(sorted_data: &[f64], p: f64) -> f64 {
    let n = sorted_data.len();
    if n == 0 { return f64::NAN; }
    if n == 1 { return sorted_data[0]; }

    let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        sorted_data[lower_idx]
    } else {
        let weight = rank - lower_idx as f64;
        sorted_data[lower_idx] * (1.0 - weight) + sorted_data[upper_idx] * weight
    }
}

pub fn five_number(values: &[f64]) -> Option<FiveNumber> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Some(FiveNumber {
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    })
}

/// Distinct categories at `slot`, in discovery order.
pub fn distinct(records: &[Record], slot: usize) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    records
        .iter()
        .map(|r| r.category(slot))
        .filter(|c| seen.insert(*c))
        .map(str::to_string)
        .collect()
}

/// Every x × y combination with its count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    pub x_domain: Vec<String>,
    pub y_domain: Vec<String>,
    /// x-major: all y values for the first x, then the next x, ...
    pub cells: Vec<Aggregate>,
}

impl Grid {
    pub fn max_count(&self) -> u64 {
        self.cells.iter().filter_map(|c| c.value.count()).max().unwrap_or(0)
    }
}

/// Count `filtered` by (x, y) over axes drawn from the `full` record set.
///
/// Combinations absent from `filtered` appear with count 0, so the grid is
/// complete even when a selection empties most cells.
pub fn complete_grid(filtered: &[Record], full: &[Record], x_slot: usize, y_slot: usize) -> Grid {
    let x_domain = distinct(full, x_slot);
    let y_domain = distinct(full, y_slot);

    let mut counts: HashMap<(&str, &str), u64> = HashMap::new();
    for r in filtered {
        *counts.entry((r.category(x_slot), r.category(y_slot))).or_default() += 1;
    }

    let cells = x_domain
        .iter()
        .flat_map(|x| {
            let counts = &counts;
            y_domain.iter().map(move |y| Aggregate {
                key: vec![x.clone(), y.clone()],
                value: AggregateValue::Count(counts.get(&(x.as_str(), y.as_str())).copied().unwrap_or(0)),
            })
        })
        .collect();

    Grid { x_domain, y_domain, cells }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    /// One value per entry of the owning table's `x` vector
    pub values: Vec<f64>,
}

impl Series {
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// Counts per (series, x), zero-filled across every observed x.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesTable {
    /// Ascending
    pub x: Vec<f64>,
    pub series: Vec<Series>,
}

impl SeriesTable {
    pub fn extent(&self) -> Option<(f64, f64)> {
        Some((*self.x.first()?, *self.x.last()?))
    }
}

/// Build per-category counts over a numeric x (usually a year).
///
/// Series are ordered by total count, largest first; ties keep discovery order.
pub fn yearly_series(records: &[Record], series_slot: usize, x_slot: usize) -> SeriesTable {
    let mut x: Vec<f64> = Vec::new();
    for r in records {
        let v = r.number(x_slot);
        if !x.iter().any(|&seen| seen == v) {
            x.push(v);
        }
    }
    x.sort_by(f64::total_cmp);

    let names = distinct(records, series_slot);
    let mut series: Vec<Series> = names
        .into_iter()
        .map(|name| Series { name, values: vec![0.0; x.len()] })
        .collect();
    let by_name: HashMap<String, usize> = series
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name.clone(), i))
        .collect();

    for r in records {
        let v = r.number(x_slot);
        let (Some(&s), Some(col)) = (by_name.get(r.category(series_slot)), x.iter().position(|&seen| seen == v)) else {
            continue;
        };
        series[s].values[col] += 1.0;
    }

    series.sort_by(|a, b| b.total().partial_cmp(&a.total()).unwrap_or(Ordering::Equal));
    SeriesTable { x, series }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bin {
    pub x0: f64,
    pub x1: f64,
    pub count: u64,
}

/// Uniform bins over `domain`; the last bin is closed on the right.
///
/// Values outside the domain are not counted.
pub fn histogram(values: &[f64], bins: usize, domain: (f64, f64)) -> Vec<Bin> {
    let bins = bins.max(1);
    let (lo, hi) = domain;
    let range = hi - lo;
    let width = if range <= 0.0 { 1.0 } else { range / bins as f64 };

    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            x0: lo + i as f64 * width,
            x1: if i + 1 == bins { hi.max(lo + width) } else { lo + (i + 1) as f64 * width },
            count: 0,
        })
        .collect();

    for &v in values {
        if !(lo..=hi).contains(&v) {
            continue;
        }
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Source,
    Target,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SankeyNode {
    pub name: String,
    pub side: Side,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SankeyLink {
    pub source: usize,
    pub target: usize,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SankeyGraph {
    pub nodes: Vec<SankeyNode>,
    pub links: Vec<SankeyLink>,
}

/// Count flows between two categorical fields.
///
/// Source and target nodes live in separate namespaces, so a value that
/// appears on both sides yields two nodes.
pub fn sankey_flows(records: &[Record], source_slot: usize, target_slot: usize) -> SankeyGraph {
    let mut nodes: Vec<SankeyNode> = Vec::new();
    let mut index: HashMap<(Side, String), usize> = HashMap::new();
    let mut node_id = |side: Side, name: &str, nodes: &mut Vec<SankeyNode>| -> usize {
        *index.entry((side, name.to_string())).or_insert_with(|| {
            nodes.push(SankeyNode { name: name.to_string(), side });
            nodes.len() - 1
        })
    };

    let mut links: Vec<SankeyLink> = Vec::new();
    for agg in aggregate(records, &[source_slot, target_slot], Statistic::Count) {
        let source = node_id(Side::Source, &agg.key[0], &mut nodes);
        let target = node_id(Side::Target, &agg.key[1], &mut nodes);
        links.push(SankeyLink { source, target, value: agg.value.count().unwrap_or(0) });
    }

    SankeyGraph { nodes, links }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    fn rec(cat: &str, other: &str, n: f64) -> Record {
        Record::new(vec![
            Value::Category(cat.to_string()),
            Value::Category(other.to_string()),
            Value::Number(n),
        ])
    }

    #[test]
    fn test_mean_of_prices() {
        let records = vec![rec("red", "", 10000.0), rec("red", "", 20000.0), rec("red", "", 30000.0)];
        let out = aggregate(&records, &[0], Statistic::Mean(2));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, AggregateValue::Mean(20000.0));
    }

    #[test]
    fn test_linear_interpolation_quantiles() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let s = five_number(&values).unwrap();
        assert_eq!(s.min, 1.0);
        assert!((s.q1 - 3.25).abs() < 1e-12);
        assert!((s.median - 5.5).abs() < 1e-12);
        assert!((s.q3 - 7.75).abs() < 1e-12);
        assert_eq!(s.max, 10.0);
    }

    #[test]
    fn test_quantile_edges() {
        assert!(quantile(&[], 0.5).is_nan());
        assert_eq!(quantile(&[4.0], 0.9), 4.0);
        assert!(five_number(&[]).is_none());
    }

    #[test]
    fn test_count_conserves_records() {
        let records = vec![
            rec("red", "a", 1.0),
            rec("blue", "a", 1.0),
            rec("red", "b", 1.0),
            rec("red", "a", 1.0),
        ];
        let out = aggregate(&records, &[0], Statistic::Count);
        let total: u64 = out.iter().filter_map(|a| a.value.count()).sum();
        assert_eq!(total, records.len() as u64);
        // discovery order
        assert_eq!(out[0].key, vec!["red"]);
        assert_eq!(out[1].key, vec!["blue"]);
    }

    #[test]
    fn test_compound_key() {
        let records = vec![rec("red", "a", 1.0), rec("red", "b", 1.0), rec("red", "a", 1.0)];
        let out = aggregate(&records, &[0, 1], Statistic::Count);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].key, vec!["red", "a"]);
        assert_eq!(out[0].value, AggregateValue::Count(2));
    }

    #[test]
    fn test_rank_descending_is_stable() {
        let mut aggs = vec![
            Aggregate { key: vec!["a".into()], value: AggregateValue::Mean(1.0) },
            Aggregate { key: vec!["b".into()], value: AggregateValue::Mean(3.0) },
            Aggregate { key: vec!["c".into()], value: AggregateValue::Mean(1.0) },
        ];
        rank_descending(&mut aggs);
        let keys: Vec<&str> = aggs.iter().map(|a| a.key[0].as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_complete_grid_fills_zeros() {
        let full = vec![rec("A", "X", 0.0), rec("B", "Y", 0.0), rec("A", "Y", 0.0)];
        let filtered = vec![rec("A", "X", 0.0), rec("A", "X", 0.0)];
        let grid = complete_grid(&filtered, &full, 0, 1);

        assert_eq!(grid.x_domain, vec!["A", "B"]);
        assert_eq!(grid.y_domain, vec!["X", "Y"]);
        assert_eq!(grid.cells.len(), 4);
        let count = |x: &str, y: &str| {
            grid.cells
                .iter()
                .find(|c| c.key == vec![x.to_string(), y.to_string()])
                .and_then(|c| c.value.count())
        };
        assert_eq!(count("A", "X"), Some(2));
        assert_eq!(count("A", "Y"), Some(0));
        assert_eq!(count("B", "X"), Some(0));
        assert_eq!(count("B", "Y"), Some(0));
        assert_eq!(grid.max_count(), 2);
    }

    #[test]
    fn test_yearly_series_zero_fill_and_order() {
        let records = vec![
            rec("manual", "", 2003.0),
            rec("automatic", "", 2001.0),
            rec("automatic", "", 2003.0),
            rec("automatic", "", 2003.0),
        ];
        let table = yearly_series(&records, 0, 2);
        assert_eq!(table.x, vec![2001.0, 2003.0]);
        assert_eq!(table.series[0].name, "automatic");
        assert_eq!(table.series[0].values, vec![1.0, 2.0]);
        assert_eq!(table.series[1].name, "manual");
        assert_eq!(table.series[1].values, vec![0.0, 1.0]);
        assert_eq!(table.extent(), Some((2001.0, 2003.0)));
    }

    #[test]
    fn test_histogram_bins() {
        let bins = histogram(&[0.0, 1.0, 5.0, 9.9, 10.0, 11.0], 2, (0.0, 10.0));
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[1].count, 3);
        assert_eq!(bins[1].x1, 10.0);
    }

    #[test]
    fn test_sankey_flows() {
        let records = vec![rec("white", "Ford", 0.0), rec("white", "Kia", 0.0), rec("black", "Ford", 0.0), rec("white", "Ford", 0.0)];
        let graph = sankey_flows(&records, 0, 1);
        let names: Vec<&str> = graph.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["white", "Ford", "Kia", "black"]);
        assert_eq!(graph.links[0], SankeyLink { source: 0, target: 1, value: 2 });
        let total: u64 = graph.links.iter().map(|l| l.value).sum();
        assert_eq!(total, 4);
    }
}
