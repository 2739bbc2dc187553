use serde::Serialize;

/// Categorical-to-band scale: each category owns an equal step of the range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandScale {
    pub domain: Vec<String>,
    pub range: (f64, f64),
    pub padding: f64,
}

impl BandScale {
    pub fn new(domain: Vec<String>, range: (f64, f64)) -> Self {
        Self { domain, range, padding: 0.0 }
    }

    pub fn with_padding(mut self, padding: f64) -> Self {
        self.padding = padding.clamp(0.0, 1.0);
        self
    }

    pub fn step(&self) -> f64 {
        if self.domain.is_empty() {
            return 0.0;
        }
        (self.range.1 - self.range.0) / self.domain.len() as f64
    }

    pub fn bandwidth(&self) -> f64 {
        self.step() * (1.0 - self.padding)
    }

    pub fn index_of(&self, category: &str) -> Option<usize> {
        self.domain.iter().position(|c| c == category)
    }

    /// Start of the band for `category`.
    pub fn position(&self, category: &str) -> Option<f64> {
        self.index_of(category).map(|i| self.position_at(i))
    }

    pub fn position_at(&self, index: usize) -> f64 {
        let step = self.step();
        self.range.0 + index as f64 * step + step * self.padding / 2.0
    }

    pub fn center_at(&self, index: usize) -> f64 {
        self.position_at(index) + self.bandwidth() / 2.0
    }
}

/// Numeric-to-linear scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn map(&self, v: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return (r0 + r1) / 2.0;
        }
        r0 + (v - d0) / (d1 - d0) * (r1 - r0)
    }

    /// Extend the domain outward to round tick values.
    pub fn nice(mut self, ticks: usize) -> Self {
        let (lo, hi) = self.domain;
        let step = tick_step(lo, hi, ticks);
        if step > 0.0 && step.is_finite() {
            self.domain = ((lo / step).floor() * step, (hi / step).ceil() * step);
        }
        self
    }
}

/// A 1/2/5 × 10^k step giving roughly `count` ticks over [lo, hi].
pub fn tick_step(lo: f64, hi: f64, count: usize) -> f64 {
    let span = (hi - lo).abs();
    if span == 0.0 || count == 0 {
        return 0.0;
    }
    let raw = span / count as f64;
    let power = 10f64.powf(raw.log10().floor());
    let error = raw / power;
    let factor = if error >= 7.07 {
        10.0
    } else if error >= 3.16 {
        5.0
    } else if error >= 1.41 {
        2.0
    } else {
        1.0
    };
    factor * power
}

pub fn extent<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values.into_iter().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

/// Pad a range by 5%, or by ±1 when it is a single point.
pub fn pad_range(min: f64, max: f64) -> (f64, f64) {
    pad_fraction(min, max, 0.05)
}

pub fn pad_fraction(min: f64, max: f64, fraction: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = (max - min) * fraction;
        (min - padding, max + padding)
    }
}

/// Maps [0, max] onto a light-to-dark blue ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequentialScale {
    pub max: f64,
}

impl SequentialScale {
    const LOW: (f64, f64, f64) = (247.0, 251.0, 255.0);
    const HIGH: (f64, f64, f64) = (8.0, 48.0, 107.0);

    pub fn new(max: f64) -> Self {
        Self { max }
    }

    pub fn rgb(&self, v: f64) -> (u8, u8, u8) {
        let t = if self.max > 0.0 { (v / self.max).clamp(0.0, 1.0) } else { 0.0 };
        let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
        (
            lerp(Self::LOW.0, Self::HIGH.0),
            lerp(Self::LOW.1, Self::HIGH.1),
            lerp(Self::LOW.2, Self::HIGH.2),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_scale() {
        let scale = BandScale::new(vec!["a".into(), "b".into()], (0.0, 100.0)).with_padding(0.1);
        assert_eq!(scale.step(), 50.0);
        assert!((scale.bandwidth() - 45.0).abs() < 1e-9);
        assert!((scale.position("b").unwrap() - 52.5).abs() < 1e-9);
        assert!((scale.center_at(0) - 25.0).abs() < 1e-9);
        assert_eq!(scale.position("z"), None);
    }

    #[test]
    fn test_linear_scale_map_and_nice() {
        let scale = LinearScale::new((0.0, 10.0), (100.0, 0.0));
        assert_eq!(scale.map(5.0), 50.0);
        let nice = LinearScale::new((6123.0, 20877.0), (0.0, 1.0)).nice(10);
        assert_eq!(nice.domain, (6000.0, 22000.0));
    }

    #[test]
    fn test_degenerate_linear_scale() {
        let scale = LinearScale::new((3.0, 3.0), (0.0, 10.0));
        assert_eq!(scale.map(3.0), 5.0);
    }

    #[test]
    fn test_extent_and_padding() {
        assert_eq!(extent(vec![3.0, -1.0, 2.0]), Some((-1.0, 3.0)));
        assert_eq!(extent(Vec::<f64>::new()), None);
        assert_eq!(pad_range(5.0, 5.0), (4.0, 6.0));
        assert_eq!(pad_fraction(0.0, 10.0, 0.1), (-1.0, 11.0));
    }

    #[test]
    fn test_sequential_scale_endpoints() {
        let scale = SequentialScale::new(10.0);
        assert_eq!(scale.rgb(0.0), (247, 251, 255));
        assert_eq!(scale.rgb(10.0), (8, 48, 107));
        assert_eq!(SequentialScale::new(0.0).rgb(5.0), (247, 251, 255));
    }
}
