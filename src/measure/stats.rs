//! Summary statistics across Monte Carlo runs.

use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct McStats {
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// Number of finite samples that contributed.
    pub n: usize,
    pub sigma3_low: f64,
    pub sigma3_high: f64,
    pub median: f64,
    pub p05: f64,
    pub p95: f64,
}

impl McStats {
    fn nan() -> Self {
        Self {
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            n: 0,
            sigma3_low: f64::NAN,
            sigma3_high: f64::NAN,
            median: f64::NAN,
            p05: f64::NAN,
            p95: f64::NAN,
        }
    }
}

fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    v.sort_by(f64::total_cmp);
    v
}

fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() || !(0.0..=100.0).contains(&q) {
        return f64::NAN;
    }
    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}

/// The `q`-th percentile (`0..=100`) of the finite values, interpolating
/// linearly between the two nearest ranks.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    percentile_sorted(&sorted_finite(values), q)
}

/// Mean, spread and tails of `values`, ignoring non-finite entries.
///
/// Runs that failed to measure show up as NaN and are dropped here; if none
/// remain every statistic is NaN and `n` is zero.
pub fn mc_statistics(values: &[f64]) -> McStats {
    let sorted = sorted_finite(values);
    if sorted.is_empty() {
        super::degenerate("mc_statistics", "no finite samples");
        return McStats::nan();
    }
    let n = sorted.len();
    let mean = sorted.iter().sum::<f64>() / n as f64;
    let var = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
    let std = var.sqrt();

    McStats {
        mean,
        std,
        min: sorted[0],
        max: sorted[n - 1],
        n,
        sigma3_low: mean - 3.0 * std,
        sigma3_high: mean + 3.0 * std,
        median: percentile_sorted(&sorted, 50.0),
        p05: percentile_sorted(&sorted, 5.0),
        p95: percentile_sorted(&sorted, 95.0),
    }
}

/// The worst finite value: the maximum if larger is worse, else the minimum.
pub fn worst_case(values: &[f64], higher_is_worse: bool) -> f64 {
    let sorted = sorted_finite(values);
    let pick = if higher_is_worse {
        sorted.last()
    } else {
        sorted.first()
    };
    pick.copied().unwrap_or(f64::NAN)
}
