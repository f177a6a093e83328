use serde::{Deserialize, Serialize};

use super::check_len;
use crate::error::Result;

/// Possible crossing directions.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum EdgeDir {
    Rising,
    Falling,
    Any,
}

impl EdgeDir {
    fn accepts_rise(&self) -> bool {
        matches!(self, EdgeDir::Rising | EdgeDir::Any)
    }

    fn accepts_fall(&self) -> bool {
        matches!(self, EdgeDir::Falling | EdgeDir::Any)
    }
}

fn crossing_time(t0: f64, y0: f64, t1: f64, y1: f64, level: f64) -> f64 {
    let c = (level - y0) / (y1 - y0);
    debug_assert!((0.0..=1.0).contains(&c));
    t0 + c * (t1 - t0)
}

/// Times at which `v` crosses `level`, linearly interpolated.
///
/// A rising crossing is a step from strictly below `level` to at or above
/// it, so a run of samples sitting exactly on the level counts once and a
/// waveform that starts above the level has no initial rising crossing.
pub fn find_crossings(t: &[f64], v: &[f64], level: f64, dir: EdgeDir) -> Result<Vec<f64>> {
    check_len(t, v)?;
    let mut out = Vec::new();
    for i in 1..v.len() {
        let (y0, y1) = (v[i - 1], v[i]);
        let rise = y0 < level && level <= y1;
        let fall = y0 > level && level >= y1;
        if (rise && dir.accepts_rise()) || (fall && dir.accepts_fall()) {
            out.push(crossing_time(t[i - 1], y0, t[i], y1, level));
        }
    }
    Ok(out)
}

/// `p - n`, sample by sample.
pub fn diff_to_single(p: &[f64], n: &[f64]) -> Result<Vec<f64>> {
    check_len(p, n)?;
    Ok(p.iter().zip(n).map(|(a, b)| a - b).collect())
}

/// Thresholds `v` to logic levels at the midpoint of `v_low` and `v_high`.
///
/// With `hysteresis`, the output only changes once the input moves more
/// than half the hysteresis band past the midpoint.
pub fn quantize_to_bits(v: &[f64], v_low: f64, v_high: f64, hysteresis: Option<f64>) -> Vec<u8> {
    let mid = (v_low + v_high) / 2.0;
    let half = hysteresis.unwrap_or(0.0).abs() / 2.0;
    let mut state = match v.first() {
        Some(&x) => x > mid,
        None => return Vec::new(),
    };
    v.iter()
        .map(|&x| {
            if half == 0.0 {
                state = x > mid;
            } else if x > mid + half {
                state = true;
            } else if x < mid - half {
                state = false;
            }
            u8::from(state)
        })
        .collect()
}

/// Piecewise-linear interpolation of `(xp, fp)` at `x`, clamped at the ends.
///
/// `xp` must be non-decreasing.
pub fn interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let n = xp.len().min(fp.len());
    if n == 0 {
        return f64::NAN;
    }
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[n - 1] {
        return fp[n - 1];
    }
    let idx = xp[..n].partition_point(|&xi| xi <= x);
    let (x0, x1) = (xp[idx - 1], xp[idx]);
    if x1 == x0 {
        return fp[idx];
    }
    fp[idx - 1] + (x - x0) / (x1 - x0) * (fp[idx] - fp[idx - 1])
}

/// Samples each signal a fraction `sample_offset` of a clock period after
/// every `dir` crossing of `clk`.
///
/// The threshold defaults to the midpoint of the clock swing. The last
/// edge reuses the previous period and is dropped if its sample would fall
/// past the end of the record. Fewer than two edges yields no samples.
pub fn sample_at_edges(
    t: &[f64],
    clk: &[f64],
    signals: &[&[f64]],
    dir: EdgeDir,
    threshold: Option<f64>,
    sample_offset: f64,
) -> Result<Vec<Vec<f64>>> {
    check_len(t, clk)?;
    for s in signals {
        check_len(t, s)?;
    }
    let threshold = match threshold {
        Some(th) => th,
        None => {
            let (lo, hi) = clk
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                    (lo.min(x), hi.max(x))
                });
            (lo + hi) / 2.0
        }
    };
    let edges = find_crossings(t, clk, threshold, dir)?;
    if edges.len() < 2 {
        return Ok(vec![Vec::new(); signals.len()]);
    }

    let t_end = t.last().copied().unwrap_or(f64::NEG_INFINITY);
    let mut times = Vec::with_capacity(edges.len());
    for (i, &edge) in edges.iter().enumerate() {
        if i + 1 < edges.len() {
            times.push(edge + sample_offset * (edges[i + 1] - edge));
        } else {
            let ts = edge + sample_offset * (edge - edges[i - 1]);
            if ts <= t_end {
                times.push(ts);
            }
        }
    }

    Ok(signals
        .iter()
        .map(|s| times.iter().map(|&ts| interp(ts, t, s)).collect())
        .collect())
}
