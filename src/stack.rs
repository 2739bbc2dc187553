use crate::aggregate::SeriesTable;
use serde::Serialize;

/// Baseline placement for stacked series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Offset {
    /// Stack upward from zero
    #[default]
    Zero,
    /// Center each column around zero (stream graph)
    Silhouette,
}

/// Lower and upper bound of one series at each x.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackedSeries {
    pub name: String,
    pub intervals: Vec<(f64, f64)>,
}

/// Given grouped numeric series, return per-group stacked intervals.
pub trait StackLayout {
    fn stack(&self, table: &SeriesTable) -> Vec<StackedSeries>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Stack {
    pub offset: Offset,
}

impl Stack {
    pub fn new(offset: Offset) -> Self {
        Self { offset }
    }
}

impl StackLayout for Stack {
    fn stack(&self, table: &SeriesTable) -> Vec<StackedSeries> {
        let columns = table.x.len();
        let mut baseline: Vec<f64> = match self.offset {
            Offset::Zero => vec![0.0; columns],
            Offset::Silhouette => (0..columns)
                .map(|col| {
                    let total: f64 = table.series.iter().map(|s| s.values[col]).sum();
                    -total / 2.0
                })
                .collect(),
        };

        table
            .series
            .iter()
            .map(|s| {
                let intervals = s
                    .values
                    .iter()
                    .zip(baseline.iter_mut())
                    .map(|(&v, base)| {
                        let lower = *base;
                        *base += v;
                        (lower, *base)
                    })
                    .collect();
                StackedSeries { name: s.name.clone(), intervals }
            })
            .collect()
    }
}

/// Lowest lower bound and highest upper bound across all stacked series.
pub fn stacked_extent(stacked: &[StackedSeries]) -> Option<(f64, f64)> {
    let mut iter = stacked.iter().flat_map(|s| s.intervals.iter());
    let first = iter.next()?;
    Some(iter.fold(*first, |(lo, hi), &(a, b)| (lo.min(a), hi.max(b))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Series;

    fn table() -> SeriesTable {
        SeriesTable {
            x: vec![2001.0, 2002.0],
            series: vec![
                Series { name: "automatic".into(), values: vec![3.0, 1.0] },
                Series { name: "manual".into(), values: vec![1.0, 1.0] },
            ],
        }
    }

    #[test]
    fn test_zero_offset() {
        let stacked = Stack::new(Offset::Zero).stack(&table());
        assert_eq!(stacked[0].intervals, vec![(0.0, 3.0), (0.0, 1.0)]);
        assert_eq!(stacked[1].intervals, vec![(3.0, 4.0), (1.0, 2.0)]);
        assert_eq!(stacked_extent(&stacked), Some((0.0, 4.0)));
    }

    #[test]
    fn test_silhouette_is_centered() {
        let stacked = Stack::new(Offset::Silhouette).stack(&table());
        assert_eq!(stacked[0].intervals[0], (-2.0, 1.0));
        assert_eq!(stacked[1].intervals[0], (1.0, 2.0));
        assert_eq!(stacked_extent(&stacked), Some((-2.0, 2.0)));
    }

    #[test]
    fn test_empty_table() {
        let empty = SeriesTable { x: vec![], series: vec![] };
        let stacked = Stack::default().stack(&empty);
        assert!(stacked.is_empty());
        assert_eq!(stacked_extent(&stacked), None);
    }
}
