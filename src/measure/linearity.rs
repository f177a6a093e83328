//! Code reconstruction and static linearity.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{check_len, degenerate};
use crate::error::{FridaError, Result};

/// `Σ b[i]·w[i]` for one conversion, MSB first.
pub fn redundant_bits_to_code(bits: &[u8], weights: &[u64]) -> Result<u64> {
    if bits.len() != weights.len() {
        return Err(FridaError::ShapeMismatch(bits.len(), weights.len()));
    }
    Ok(bits
        .iter()
        .zip(weights)
        .map(|(&b, &w)| u64::from(b != 0) * w)
        .sum())
}

/// Applies [`redundant_bits_to_code`] to every conversion.
pub fn codes_from_bits(conversions: &[Vec<u8>], weights: &[u64]) -> Result<Vec<u64>> {
    conversions
        .iter()
        .map(|bits| redundant_bits_to_code(bits, weights))
        .collect()
}

/// `code · v_ref / total_weight`.
pub fn code_to_voltage(code: f64, v_ref: f64, total_weight: f64) -> Result<f64> {
    if !v_ref.is_finite() {
        return Err(FridaError::Numeric(format!("reference voltage {v_ref} is not finite")));
    }
    if total_weight == 0.0 {
        return Ok(degenerate("code_to_voltage", "total weight is zero"));
    }
    Ok(code * v_ref / total_weight)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramLinearity {
    pub histogram: Vec<usize>,
    pub dnl: Vec<f64>,
    pub inl: Vec<f64>,
    pub dnl_max: f64,
    pub inl_max: f64,
    /// Empty codes between the first and last observed code.
    pub missing_codes: Vec<usize>,
    pub first_code: usize,
    pub last_code: usize,
}

/// Histogram-method INL/DNL for a linear input ramp.
///
/// DNL is taken relative to the mean count of the active range, the codes
/// from the first to the last one observed. Codes at or above `n_codes`
/// are ignored.
pub fn histogram_inl_dnl(codes: &[u64], n_codes: usize) -> HistogramLinearity {
    let mut histogram = vec![0usize; n_codes];
    for &c in codes {
        if let Some(bin) = usize::try_from(c).ok().and_then(|c| histogram.get_mut(c)) {
            *bin += 1;
        }
    }

    let first = histogram.iter().position(|&h| h > 0);
    let last = histogram.iter().rposition(|&h| h > 0);
    let (first_code, last_code) = match (first, last) {
        (Some(f), Some(l)) if f < l => (f, l),
        (f, l) => {
            degenerate("histogram_inl_dnl", "fewer than two distinct codes");
            return HistogramLinearity {
                histogram,
                dnl: vec![0.0; n_codes],
                inl: vec![0.0; n_codes],
                dnl_max: f64::NAN,
                inl_max: f64::NAN,
                missing_codes: (0..n_codes).collect(),
                first_code: f.unwrap_or(0),
                last_code: l.unwrap_or(0),
            };
        }
    };

    let active = &histogram[first_code..=last_code];
    let ideal = active.iter().sum::<usize>() as f64 / active.len() as f64;

    let mut dnl = vec![0.0; n_codes];
    for c in first_code..=last_code {
        dnl[c] = histogram[c] as f64 / ideal - 1.0;
    }
    let inl: Vec<f64> = dnl
        .iter()
        .scan(0.0, |acc, d| {
            *acc += d;
            Some(*acc)
        })
        .collect();
    let max_abs = |x: &[f64]| x.iter().fold(0.0f64, |m, v| m.max(v.abs()));

    HistogramLinearity {
        dnl_max: max_abs(&dnl[first_code..=last_code]),
        inl_max: max_abs(&inl[first_code..=last_code]),
        missing_codes: (first_code..=last_code)
            .filter(|&c| histogram[c] == 0)
            .collect(),
        histogram,
        dnl,
        inl,
        first_code,
        last_code,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointLinearity {
    pub dnl: Vec<f64>,
    pub inl: Vec<f64>,
    pub dnl_max: f64,
    pub inl_max: f64,
    /// Output step per code along the endpoint line.
    pub lsb: f64,
}

/// INL/DNL against the straight line through the first and last points.
///
/// `codes` must be sorted; gaps between codes are allowed.
pub fn endpoint_inl_dnl(codes: &[f64], outputs: &[f64]) -> Result<EndpointLinearity> {
    check_len(codes, outputs)?;
    let n = codes.len();
    if n < 2 {
        let nan = degenerate("endpoint_inl_dnl", "fewer than two points");
        return Ok(EndpointLinearity {
            dnl: Vec::new(),
            inl: Vec::new(),
            dnl_max: nan,
            inl_max: nan,
            lsb: nan,
        });
    }

    let span = codes[n - 1] - codes[0];
    let lsb = if span == 0.0 {
        0.0
    } else {
        (outputs[n - 1] - outputs[0]) / span
    };
    if lsb.abs() < 1e-15 {
        return Ok(EndpointLinearity {
            dnl: vec![0.0; n - 1],
            inl: vec![0.0; n],
            dnl_max: 0.0,
            inl_max: 0.0,
            lsb: 0.0,
        });
    }

    let dnl: Vec<f64> = (1..n)
        .map(|k| (outputs[k] - outputs[k - 1]) / (lsb * (codes[k] - codes[k - 1])) - 1.0)
        .collect();
    let inl: Vec<f64> = (0..n)
        .map(|k| (outputs[k] - (outputs[0] + (codes[k] - codes[0]) * lsb)) / lsb)
        .collect();
    let max_abs = |x: &[f64]| x.iter().fold(0.0f64, |m, v| m.max(v.abs()));

    Ok(EndpointLinearity {
        dnl_max: max_abs(&dnl),
        inl_max: max_abs(&inl),
        dnl,
        inl,
        lsb,
    })
}

/// Input level at which each new code first appears, sweeping the input
/// upwards.
pub fn find_code_transitions(v_in: &[f64], codes: &[u64]) -> Result<BTreeMap<u64, f64>> {
    if v_in.len() != codes.len() {
        return Err(FridaError::ShapeMismatch(v_in.len(), codes.len()));
    }
    let mut order: Vec<usize> = (0..v_in.len()).collect();
    order.sort_by(|&a, &b| v_in[a].total_cmp(&v_in[b]));

    let mut transitions = BTreeMap::new();
    let mut prev = match order.first() {
        Some(&i) => codes[i],
        None => return Ok(transitions),
    };
    for &i in order.iter().skip(1) {
        if codes[i] != prev {
            transitions.insert(codes[i], v_in[i]);
            prev = codes[i];
        }
    }
    Ok(transitions)
}

/// Least-squares `y = slope·x + intercept`.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mx = x[..n].iter().sum::<f64>() / n as f64;
    let my = y[..n].iter().sum::<f64>() / n as f64;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (xi, yi) in x[..n].iter().zip(&y[..n]) {
        sxy += (xi - mx) * (yi - my);
        sxx += (xi - mx) * (xi - mx);
    }
    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct StaticError {
    pub offset: f64,
    pub gain_error: f64,
    pub rms_error: f64,
    pub max_error: f64,
}

/// Offset and gain from a linear fit of `v_est` against `v_in`, plus the
/// residual after removing both.
pub fn compute_static_error(v_in: &[f64], v_est: &[f64]) -> Result<StaticError> {
    check_len(v_in, v_est)?;
    let Some((gain, offset)) = linear_fit(v_in, v_est).filter(|(g, _)| *g != 0.0) else {
        let nan = degenerate("static_error", "transfer curve cannot be fitted");
        return Ok(StaticError {
            offset: nan,
            gain_error: nan,
            rms_error: nan,
            max_error: nan,
        });
    };

    let residual: Vec<f64> = v_in
        .iter()
        .zip(v_est)
        .map(|(x, y)| x - (y - offset) / gain)
        .collect();
    Ok(StaticError {
        offset,
        gain_error: gain - 1.0,
        rms_error: (residual.iter().map(|r| r * r).sum::<f64>() / residual.len() as f64).sqrt(),
        max_error: residual.iter().fold(0.0f64, |m, r| m.max(r.abs())),
    })
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::blocks::cdac::{CdacParams, RedunStrat};

    #[test]
    fn test_code_reconstruction() -> Result<()> {
        let weights = CdacParams {
            n_dac: 11,
            n_extra: 5,
            redun_strat: RedunStrat::Subrdx2Ovly,
            ..Default::default()
        }
        .weights()?;
        let total: u64 = weights.iter().sum();
        assert_eq!(total, 2047);

        let bits = [1, 0, 1, 1, 0, 0, 1, 0, 0, 1, 0, 1, 1, 0, 0, 1];
        let code = redundant_bits_to_code(&bits, &weights)?;
        assert_eq!(code, 768 + 320 + 192 + 32 + 10 + 4 + 4 + 1);
        let v = code_to_voltage(code as f64, 1.2, total as f64)?;
        assert_abs_diff_eq!(v, 1.2 * code as f64 / 2047.0, epsilon = 1e-15);

        assert!(redundant_bits_to_code(&bits[1..], &weights).is_err());
        assert!(code_to_voltage(1.0, f64::NAN, 2047.0).is_err());
        assert!(code_to_voltage(1.0, 1.2, 0.0)?.is_nan());
        Ok(())
    }

    #[test]
    fn test_histogram_ideal_ramp() {
        let codes: Vec<u64> = (0..256).flat_map(|c| [c; 4]).collect();
        let lin = histogram_inl_dnl(&codes, 256);
        assert_eq!((lin.first_code, lin.last_code), (0, 255));
        assert!(lin.dnl_max <= 0.5);
        assert!(lin.inl_max <= 0.5);
        assert!(lin.missing_codes.is_empty());
    }

    #[test]
    fn test_histogram_missing_code() {
        let codes: Vec<u64> = (0..16).filter(|&c| c != 5).flat_map(|c| [c; 4]).collect();
        let lin = histogram_inl_dnl(&codes, 16);
        assert_eq!(lin.missing_codes, vec![5]);
        assert_abs_diff_eq!(lin.dnl[5], -1.0);
        assert_abs_diff_eq!(lin.dnl[0], 4.0 / 3.75 - 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(lin.dnl_max, 1.0);

        let empty = histogram_inl_dnl(&[], 8);
        assert!(empty.inl_max.is_nan());
    }

    #[test]
    fn test_endpoint_linearity() -> Result<()> {
        let codes: Vec<f64> = (0..5).map(f64::from).collect();
        let outputs = [0.0, 0.1, 0.25, 0.3, 0.4];
        let lin = endpoint_inl_dnl(&codes, &outputs)?;
        assert_abs_diff_eq!(lin.lsb, 0.1, epsilon = 1e-15);
        assert_abs_diff_eq!(lin.dnl[1], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(lin.dnl[2], -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(lin.inl[2], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(lin.inl_max, 0.5, epsilon = 1e-12);
        assert!(endpoint_inl_dnl(&codes[..1], &outputs[..1])?.lsb.is_nan());
        Ok(())
    }

    #[test]
    fn test_code_transitions() -> Result<()> {
        let v_in = [0.3, 0.1, 0.2, 0.4, 0.0];
        let codes = [1, 0, 1, 2, 0];
        let t = find_code_transitions(&v_in, &codes)?;
        assert_eq!(t.len(), 2);
        assert_abs_diff_eq!(t[&1], 0.2);
        assert_abs_diff_eq!(t[&2], 0.4);
        Ok(())
    }

    #[test]
    fn test_static_error() -> Result<()> {
        let v_in: Vec<f64> = (0..11).map(|k| k as f64 * 0.1).collect();
        let v_est: Vec<f64> = v_in.iter().map(|x| 1.02 * x + 0.005).collect();
        let err = compute_static_error(&v_in, &v_est)?;
        assert_abs_diff_eq!(err.offset, 0.005, epsilon = 1e-12);
        assert_abs_diff_eq!(err.gain_error, 0.02, epsilon = 1e-12);
        assert_abs_diff_eq!(err.max_error, 0.0, epsilon = 1e-12);
        assert!(compute_static_error(&[0.5; 3], &[1.0; 3])?.offset.is_nan());
        Ok(())
    }
}
