//! Settling, delay, power and related transient measurements.

use super::waveform::{find_crossings, interp, EdgeDir};
use super::{check_len, degenerate};
use crate::error::Result;

/// Fraction of the window averaged to estimate the final value.
pub const FINAL_FRACTION: f64 = 0.05;

fn mean(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() / x.len() as f64
}

/// Smallest time `t_s >= t0` after which `v` stays within `tol` of the
/// target.
///
/// The target defaults to the mean of the last [`FINAL_FRACTION`] of the
/// window. `tol` is relative, except for a zero target where it is used as
/// an absolute band.
pub fn settling_time(t: &[f64], v: &[f64], t0: f64, target: Option<f64>, tol: f64) -> Result<f64> {
    check_len(t, v)?;
    let start = t.partition_point(|&x| x < t0);
    let (tw, vw) = (&t[start..], &v[start..]);
    if vw.is_empty() {
        return Ok(degenerate("settling", "no samples in window"));
    }

    let target = target.unwrap_or_else(|| {
        let n = ((vw.len() as f64 * FINAL_FRACTION).ceil() as usize).max(1);
        mean(&vw[vw.len() - n..])
    });
    if !target.is_finite() {
        return Ok(degenerate("settling", "non-finite final value"));
    }
    let band = if target.abs() < 1e-15 {
        tol
    } else {
        tol * target.abs()
    };

    Ok(match vw.iter().rposition(|&x| (x - target).abs() > band) {
        None => tw[0],
        Some(i) if i + 1 < tw.len() => tw[i + 1],
        Some(_) => degenerate("settling", "signal never settles"),
    })
}

/// Time from the first rising crossing of `trig` through `trig_level` to the
/// next rising crossing of `targ` through `targ_level`.
pub fn delay(t: &[f64], trig: &[f64], trig_level: f64, targ: &[f64], targ_level: f64) -> Result<f64> {
    let t_trig = find_crossings(t, trig, trig_level, EdgeDir::Rising)?;
    let t_targ = find_crossings(t, targ, targ_level, EdgeDir::Rising)?;
    let Some(&t0) = t_trig.first() else {
        return Ok(degenerate("delay", "trigger never crosses"));
    };
    Ok(match t_targ.into_iter().find(|&x| x > t0) {
        Some(t1) => t1 - t0,
        None => degenerate("delay", "target never crosses after trigger"),
    })
}

/// `(1/T)·∫ v·i dt` over `[t0, t1]`, integrated with the trapezoidal rule.
pub fn average_power(t: &[f64], v: &[f64], i: &[f64], t0: f64, t1: f64) -> Result<f64> {
    check_len(t, v)?;
    check_len(t, i)?;
    let (Some(&first), Some(&last)) = (t.first(), t.last()) else {
        return Ok(degenerate("power", "empty waveform"));
    };
    if t1 <= t0 || t0 < first || t1 > last {
        return Ok(degenerate("power", "window outside the record"));
    }

    let p: Vec<f64> = v.iter().zip(i).map(|(v, i)| v * i).collect();
    let mut pts = vec![(t0, interp(t0, t, &p))];
    pts.extend(
        t.iter()
            .zip(&p)
            .filter(|(&tk, _)| tk > t0 && tk < t1)
            .map(|(&tk, &pk)| (tk, pk)),
    );
    pts.push((t1, interp(t1, t, &p)));

    let energy: f64 = pts
        .windows(2)
        .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
        .sum();
    Ok(energy / (t1 - t0))
}

/// Input-referred offset: the input at which the output first changes
/// polarity.
///
/// Both arrays are indexed by sweep point; the crossing is interpolated
/// between the two points that straddle it.
pub fn offset_from_crossing(vin_diff: &[f64], vout_diff: &[f64]) -> Result<f64> {
    check_len(vin_diff, vout_diff)?;
    let idx: Vec<f64> = (0..vout_diff.len()).map(|k| k as f64).collect();
    let crossings = find_crossings(&idx, vout_diff, 0.0, EdgeDir::Any)?;
    Ok(match crossings.first() {
        Some(&x) => interp(x, &idx, vin_diff),
        None => degenerate("offset", "output never changes polarity"),
    })
}

/// Fraction of positive decisions at each distinct input level.
///
/// Inputs within `tol` of the previous level are merged into it. The curve is
/// sorted by input.
pub fn s_curve(vin_diff: &[f64], vout_diff: &[f64], tol: f64) -> Result<Vec<(f64, f64)>> {
    check_len(vin_diff, vout_diff)?;
    let mut pts: Vec<(f64, bool)> = vin_diff
        .iter()
        .zip(vout_diff)
        .filter(|(v, o)| v.is_finite() && o.is_finite())
        .map(|(&v, &o)| (v, o > 0.0))
        .collect();
    pts.sort_by(|a, b| a.0.total_cmp(&b.0));

    // (first input, input sum, ones, count) per level.
    let mut levels: Vec<(f64, f64, usize, usize)> = Vec::new();
    for (v, one) in pts {
        match levels.last_mut() {
            Some(level) if v - level.0 <= tol => {
                level.1 += v;
                level.2 += one as usize;
                level.3 += 1;
            }
            _ => levels.push((v, v, one as usize, 1)),
        }
    }
    Ok(levels
        .into_iter()
        .map(|(_, sum, ones, n)| (sum / n as f64, ones as f64 / n as f64))
        .collect())
}

/// Offset and input-referred noise read off an S-curve.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SCurveFit {
    /// Input at the 50 % point.
    pub offset: f64,
    /// Half the spread between the 16 % and 84 % points, i.e. one Gaussian sigma.
    pub sigma: f64,
}

/// Input at which `curve` first reaches probability `p`.
fn s_curve_level(curve: &[(f64, f64)], p: f64) -> Option<f64> {
    let k = curve.iter().position(|&(_, q)| q >= p)?;
    if k == 0 {
        return None;
    }
    let ((v0, p0), (v1, p1)) = (curve[k - 1], curve[k]);
    Some(v0 + (p - p0) / (p1 - p0) * (v1 - v0))
}

/// Fits offset and noise to an S-curve from [`s_curve`].
///
/// Either figure is NaN when the curve does not span the needed probabilities.
pub fn fit_s_curve(curve: &[(f64, f64)]) -> SCurveFit {
    let offset = s_curve_level(curve, 0.5)
        .unwrap_or_else(|| degenerate("offset", "S-curve never crosses 50 %"));
    let sigma = match (s_curve_level(curve, 0.16), s_curve_level(curve, 0.84)) {
        (Some(lo), Some(hi)) => (hi - lo) / 2.0,
        _ => degenerate("noise", "S-curve does not span 16 % to 84 %"),
    };
    SCurveFit { offset, sigma }
}

/// Step on a held node caused by the switch edge at `t_edge`.
///
/// Compares the mean over `[t_edge - window, t_edge)` with the mean over
/// `[t_edge + window, t_edge + 2·window]`, skipping the transient between.
pub fn charge_injection(t: &[f64], v: &[f64], t_edge: f64, window: f64) -> Result<f64> {
    check_len(t, v)?;
    let collect = |lo: f64, hi: f64, inclusive: bool| -> Vec<f64> {
        t.iter()
            .zip(v)
            .filter(|(&tk, _)| tk >= lo && (tk < hi || (inclusive && tk == hi)))
            .map(|(_, &vk)| vk)
            .collect()
    };
    let before = collect(t_edge - window, t_edge, false);
    let after = collect(t_edge + window, t_edge + 2.0 * window, true);
    if before.is_empty() || after.is_empty() {
        return Ok(degenerate("charge_injection", "steady window is empty"));
    }
    Ok(mean(&after) - mean(&before))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn grid(n: usize, dt: f64) -> Vec<f64> {
        (0..n).map(|k| k as f64 * dt).collect()
    }

    #[test]
    fn test_exponential_settling() -> Result<()> {
        let t = grid(2001, 0.01);
        let v: Vec<f64> = t.iter().map(|x| 1.0 - (-x).exp()).collect();
        let ts = settling_time(&t, &v, 0.0, None, 0.01)?;
        // e^-t < 1 % once t > ln(100).
        assert_abs_diff_eq!(ts, 4.61, epsilon = 0.011);

        let ts = settling_time(&t, &v, 10.0, None, 0.01)?;
        assert_abs_diff_eq!(ts, 10.0, epsilon = 0.011);
        assert!(settling_time(&t, &v, 100.0, None, 0.01)?.is_nan());
        Ok(())
    }

    #[test]
    fn test_delay() -> Result<()> {
        let t = grid(11, 1.0);
        let trig: Vec<f64> = t.iter().map(|&x| if x >= 2.0 { 1.0 } else { 0.0 }).collect();
        let targ: Vec<f64> = t.iter().map(|&x| if x >= 4.0 { 1.0 } else { 0.0 }).collect();
        assert_abs_diff_eq!(delay(&t, &trig, 0.5, &targ, 0.5)?, 2.0);
        assert!(delay(&t, &targ, 0.5, &trig, 0.5)?.is_nan());
        Ok(())
    }

    #[test]
    fn test_average_power() -> Result<()> {
        let t = grid(11, 1.0);
        let v = vec![1.2; 11];
        let i = vec![1e-3; 11];
        assert_abs_diff_eq!(average_power(&t, &v, &i, 2.5, 7.0)?, 1.2e-3, epsilon = 1e-15);

        let ones = vec![1.0; 11];
        let ramp: Vec<f64> = t.iter().map(|x| x * 1e-3).collect();
        assert_abs_diff_eq!(average_power(&t, &ones, &ramp, 0.0, 10.0)?, 5e-3, epsilon = 1e-15);
        assert!(average_power(&t, &v, &i, 5.0, 5.0)?.is_nan());
        assert!(average_power(&t, &v, &i[..3], 0.0, 1.0).is_err());
        Ok(())
    }

    #[test]
    fn test_offset_from_crossing() -> Result<()> {
        let vin: Vec<f64> = (0..=20).map(|k| -0.01 + k as f64 * 0.001).collect();
        let vout: Vec<f64> = vin.iter().map(|x| (x - 0.002) * 100.0).collect();
        assert_abs_diff_eq!(offset_from_crossing(&vin, &vout)?, 0.002, epsilon = 1e-12);
        assert!(offset_from_crossing(&vin, &[1.0; 21])?.is_nan());
        Ok(())
    }

    #[test]
    fn test_s_curve_fit() -> Result<()> {
        // Linear ramp in P(one) over 8 mV centred on 1 mV; a Gaussian with the
        // same 16/84 % points has sigma 0.34 * 8 mV.
        let mut vin = Vec::new();
        let mut vout = Vec::new();
        for k in 0..11 {
            let v = -9e-3 + 2e-3 * k as f64;
            let ones = (((v - 1e-3) / 8e-3 + 0.5).clamp(0.0, 1.0) * 20.0).round() as usize;
            for j in 0..20 {
                vin.push(v);
                vout.push(if j < ones { 0.8 } else { -0.8 });
            }
        }
        let curve = s_curve(&vin, &vout, 1e-6)?;
        assert_eq!(curve.len(), 11);
        assert_abs_diff_eq!(curve[5].1, 0.5, epsilon = 1e-12);
        let fit = fit_s_curve(&curve);
        assert_abs_diff_eq!(fit.offset, 1e-3, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.sigma, 0.34 * 8e-3, epsilon = 1e-9);

        let flat = fit_s_curve(&[(0.0, 1.0), (1e-3, 1.0)]);
        assert!(flat.offset.is_nan() && flat.sigma.is_nan());
        Ok(())
    }

    #[test]
    fn test_charge_injection() -> Result<()> {
        let t = grid(101, 0.1);
        let v: Vec<f64> = t.iter().map(|&x| if x < 5.0 { 0.6 } else { 0.595 }).collect();
        assert_abs_diff_eq!(charge_injection(&t, &v, 5.0, 1.0)?, -0.005, epsilon = 1e-12);
        assert!(charge_injection(&t, &v, 9.5, 1.0)?.is_nan());
        Ok(())
    }
}
