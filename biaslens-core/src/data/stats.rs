//! Descriptive statistics over numeric series.
//!
//! Conventions: sample standard deviation (n - 1), linear-interpolated
//! quantiles, bias-adjusted skewness (G1) and excess kurtosis (G2).

use crate::error::BiasError;
use serde::{Deserialize, Serialize};

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

/// Sample standard deviation. `None` for fewer than two values.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|x| (x - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Quantile with linear interpolation between closest ranks.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(quantile_sorted(&sorted, q))
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn central_sums(values: &[f64]) -> (f64, f64, f64, f64) {
    let n = values.len() as f64;
    let m = values.iter().sum::<f64>() / n;
    let (mut s2, mut s3, mut s4) = (0.0, 0.0, 0.0);
    for x in values {
        let d = x - m;
        let d2 = d * d;
        s2 += d2;
        s3 += d2 * d;
        s4 += d2 * d2;
    }
    (n, s2, s3, s4)
}

/// Variances this small relative to the data are treated as zero.
fn is_degenerate(values: &[f64], s2: f64) -> bool {
    let scale = values.iter().fold(0.0_f64, |acc, x| acc.max(x.abs())).max(1.0);
    s2 <= (scale * 1e-14).powi(2) * values.len() as f64
}

/// Bias-adjusted sample skewness. Zero for fewer than three values or no spread.
pub fn skewness(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let (n, s2, s3, _) = central_sums(values);
    if is_degenerate(values, s2) {
        return 0.0;
    }
    let m2 = s2 / n;
    let m3 = s3 / n;
    let g1 = m3 / m2.powf(1.5);
    (n * (n - 1.0)).sqrt() / (n - 2.0) * g1
}

/// Bias-adjusted excess kurtosis. Zero for fewer than four values or no spread.
pub fn kurtosis(values: &[f64]) -> f64 {
    if values.len() < 4 {
        return 0.0;
    }
    let (n, s2, _, s4) = central_sums(values);
    if is_degenerate(values, s2) {
        return 0.0;
    }
    let adj = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    let numer = n * (n + 1.0) * (n - 1.0) * s4;
    let denom = (n - 2.0) * (n - 3.0) * s2 * s2;
    numer / denom - adj
}

/// Lower and upper fences `Q1 - k*IQR` and `Q3 + k*IQR`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    pub fn compute(values: &[f64], multiplier: f64) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let q1 = quantile_sorted(&sorted, 0.25);
        let q3 = quantile_sorted(&sorted, 0.75);
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        })
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    pub fn is_outlier(&self, x: f64) -> bool {
        x < self.lower || x > self.upper
    }

    pub fn count_outliers(&self, values: &[f64]) -> usize {
        values.iter().filter(|&&x| self.is_outlier(x)).count()
    }
}

/// Equal-width histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub bin_edges: Vec<f64>,
    pub counts: Vec<usize>,
}

/// Build an equal-width histogram with `bins` bins.
///
/// The last bin is closed on the right. A constant series is binned over
/// `[v - 0.5, v + 0.5]`.
pub fn histogram(values: &[f64], bins: usize) -> Result<Histogram, BiasError> {
    if bins == 0 {
        return Err(BiasError::analysis("histogram needs at least one bin"));
    }
    if values.is_empty() {
        return Err(BiasError::analysis("histogram of an empty series"));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(BiasError::analysis("histogram range is not finite"));
    }
    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    let bin_edges: Vec<f64> = (0..=bins)
        .map(|i| if i == bins { hi } else { lo + width * i as f64 })
        .collect();
    let mut counts = vec![0usize; bins];
    for &x in values {
        let mut idx = ((x - lo) / width).floor() as usize;
        if idx >= bins {
            idx = bins - 1;
        }
        // Guard against float error at the edges.
        while idx > 0 && x < bin_edges[idx] {
            idx -= 1;
        }
        while idx + 1 < bins && x >= bin_edges[idx + 1] {
            idx += 1;
        }
        counts[idx] += 1;
    }
    Ok(Histogram { bin_edges, counts })
}

/// Pearson correlation over rows where both values are present.
///
/// `None` when fewer than two complete pairs exist or either side has no spread.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mean_median_std() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(mean(&v), Some(2.5));
        assert_eq!(median(&v), Some(2.5));
        assert!(approx(std_dev(&v).unwrap(), 1.2909944487358056));
        assert_eq!(std_dev(&[1.0]), None);
    }

    #[test]
    fn test_quantile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&v, 0.25), Some(2.0));
        assert_eq!(quantile(&[1.0, 2.0], 0.25), Some(1.25));
    }

    #[test]
    fn test_skewness_and_kurtosis() {
        let v = [1.0, 2.0, 3.0, 4.0, 10.0];
        assert!(approx(skewness(&v), 1.6970562748477143));
        assert!(approx(kurtosis(&v), 3.1519999999999992));
        assert_eq!(skewness(&[5.0; 12]), 0.0);
        assert_eq!(kurtosis(&[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_symmetric_series_has_no_skew() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!(approx(skewness(&v), 0.0));
    }

    #[test]
    fn test_iqr_bounds() {
        let v = [1.0, 2.0, 3.0, 4.0, 100.0];
        let b = IqrBounds::compute(&v, 1.5).unwrap();
        assert_eq!(b.q1, 2.0);
        assert_eq!(b.q3, 4.0);
        assert_eq!(b.upper, 7.0);
        assert_eq!(b.count_outliers(&v), 1);
    }

    #[test]
    fn test_histogram_bins() {
        let v = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let h = histogram(&v, 10).unwrap();
        assert_eq!(h.bin_edges.len(), 11);
        assert_eq!(h.counts.iter().sum::<usize>(), 11);
        assert_eq!(h.counts[9], 2); // last bin is closed
    }

    #[test]
    fn test_histogram_constant_series() {
        let h = histogram(&[3.0, 3.0, 3.0], 10).unwrap();
        assert_eq!(h.bin_edges[0], 2.5);
        assert_eq!(h.bin_edges[10], 3.5);
        assert_eq!(h.counts.iter().sum::<usize>(), 3);
    }

    #[test]
    fn test_histogram_rejects_empty() {
        assert!(histogram(&[], 10).is_err());
        assert!(histogram(&[1.0], 0).is_err());
    }

    #[test]
    fn test_pearson() {
        let xs: Vec<Option<f64>> = (0..10).map(|i| Some(i as f64)).collect();
        let ys: Vec<Option<f64>> = (0..10).map(|i| Some(-2.0 * i as f64 + 3.0)).collect();
        assert!(approx(pearson(&xs, &ys).unwrap(), -1.0));

        let flat = vec![Some(1.0); 10];
        assert_eq!(pearson(&xs, &flat), None);

        let gappy = vec![Some(1.0), None, None];
        assert_eq!(pearson(&xs[..3], &gappy), None);
    }
}
