//! Capacitor weight recipes.
//!
//! Weights are in units of the unit capacitor, MSB first. Every recipe is
//! checked before it is returned: weights must be positive and
//! non-increasing, each weight may exceed the sum of the lower weights by at
//! most one unit, and the total must cover every `n_dac`-bit code.

use super::RedunStrat;

/// Weights for `n_dac` resolution on `n_dac + n_extra` capacitors.
///
/// Returns `None` for combinations the strategy cannot realize.
pub fn calc_weights(n_dac: usize, n_extra: usize, strategy: RedunStrat) -> Option<Vec<u64>> {
    if n_dac == 0 || n_dac > 32 {
        return None;
    }
    let m = n_dac + n_extra;
    let weights = match strategy {
        RedunStrat::Rdx2 => {
            if n_extra != 0 {
                return None;
            }
            binary(n_dac)
        }
        RedunStrat::Rdx2Rpt => {
            let mut w = vec![1u64 << (n_dac - 1); n_extra + 1];
            w.extend(binary(n_dac).into_iter().skip(1));
            w
        }
        RedunStrat::Subrdx2 => sub_radix(n_dac, m, |x| x.round()),
        RedunStrat::Subrdx2Lim => sub_radix(n_dac, m, |x| x.floor().max(1.0)),
        RedunStrat::Subrdx2Rdst => redistribute(n_dac, m, 1)?,
        RedunStrat::Subrdx2Ovly => redistribute(n_dac, m, 2)?,
    };
    check_weights(&weights, n_dac).then_some(weights)
}

fn binary(n: usize) -> Vec<u64> {
    (0..n).rev().map(|i| 1u64 << i).collect()
}

fn sub_radix(n_dac: usize, m: usize, quantize: impl Fn(f64) -> f64) -> Vec<u64> {
    let radix = 2f64.powf(n_dac as f64 / m as f64);
    (0..m)
        .map(|i| quantize(radix.powi((m - 1 - i) as i32)) as u64)
        .collect()
}

/// Moves `2^r` from the MSB into pairs of lower weights placed from `offset`.
fn redistribute(n_dac: usize, m: usize, offset: usize) -> Option<Vec<u64>> {
    let len = m.checked_sub(offset)?;
    let r = (n_dac.checked_sub(3)?).min(len.checked_sub(1)?);
    if r < 2 || r < (len + 1) / 2 {
        return None;
    }

    let mut weights = binary(n_dac);
    weights.resize(m, 0);
    weights[0] -= 1u64 << r;

    // Pairs 2^(r-2) down to 1; the lowest `merged` pairs become single cells.
    let merged = 2 * r - len;
    let mut redist = Vec::with_capacity(len);
    for k in (0..r - 1).rev() {
        if k < merged {
            redist.push(2u64 << k);
        } else {
            redist.extend([1u64 << k, 1u64 << k]);
        }
    }
    redist.extend([1, 1]);

    for (i, w) in redist.into_iter().enumerate() {
        weights[offset + i] += w;
    }
    Some(weights)
}

/// Checks positivity, ordering, the redundancy condition and code coverage.
pub fn check_weights(weights: &[u64], n_dac: usize) -> bool {
    if weights.is_empty() || weights.iter().any(|&w| w == 0) {
        return false;
    }
    if weights.windows(2).any(|pair| pair[0] < pair[1]) {
        return false;
    }
    let mut lower = 0u64;
    for &w in weights.iter().rev() {
        if w > lower + 1 {
            return false;
        }
        lower += w;
    }
    lower + 1 >= 1u64 << n_dac
}

/// Greedy MSB-first decomposition of `code` onto `weights`.
///
/// Exact for every code up to the weight total when the weights pass
/// [`check_weights`].
pub fn code_to_bits(weights: &[u64], code: u64) -> Vec<bool> {
    let mut remaining = code;
    weights
        .iter()
        .map(|&w| {
            let bit = w <= remaining;
            if bit {
                remaining -= w;
            }
            bit
        })
        .collect()
}

/// `Σ b[i]·w[i]`.
pub fn bits_to_code(weights: &[u64], bits: &[bool]) -> u64 {
    weights
        .iter()
        .zip(bits)
        .filter(|(_, b)| **b)
        .map(|(w, _)| *w)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_overlap_weights() {
        assert_eq!(
            calc_weights(11, 5, RedunStrat::Subrdx2Ovly),
            Some(vec![768, 512, 320, 192, 96, 64, 32, 24, 12, 10, 5, 4, 4, 2, 1, 1])
        );
    }

    #[test]
    fn test_binary_weights() {
        assert_eq!(
            calc_weights(8, 0, RedunStrat::Rdx2),
            Some(vec![128, 64, 32, 16, 8, 4, 2, 1])
        );
        assert_eq!(calc_weights(8, 2, RedunStrat::Rdx2), None);
    }

    #[test]
    fn test_repeat_weights() {
        assert_eq!(
            calc_weights(7, 2, RedunStrat::Rdx2Rpt),
            Some(vec![64, 64, 64, 32, 16, 8, 4, 2, 1])
        );
    }

    #[test]
    fn test_sub_radix_weights() {
        assert_eq!(
            calc_weights(7, 2, RedunStrat::Subrdx2),
            Some(vec![75, 44, 25, 15, 9, 5, 3, 2, 1])
        );
        let lim = calc_weights(9, 4, RedunStrat::Subrdx2Lim);
        if let Some(w) = lim {
            assert_eq!(w.len(), 13);
            assert!(check_weights(&w, 9));
        }
    }

    #[test]
    fn test_redistribution_weights() {
        let w = calc_weights(11, 5, RedunStrat::Subrdx2Rdst).unwrap();
        assert_eq!(w.len(), 16);
        assert_eq!(w[0], 768);
        assert_eq!(w.iter().sum::<u64>(), 2047);
        // Too few extra capacitors to hold the redistributed charge.
        assert_eq!(calc_weights(11, 0, RedunStrat::Subrdx2Ovly), None);
        assert_eq!(calc_weights(4, 2, RedunStrat::Subrdx2Rdst), None);
    }

    #[test]
    fn test_check_weights() {
        assert!(check_weights(&[4, 2, 1, 1], 3));
        // Gap: 8 > 1 + 2 + 1.
        assert!(!check_weights(&[8, 2, 1], 3));
        assert!(!check_weights(&[1, 2], 2));
        assert!(!check_weights(&[2, 1, 0], 2));
        // Too little total for 3 bits.
        assert!(!check_weights(&[2, 1, 1], 3));
    }

    #[test]
    fn test_code_decomposition() {
        let w = calc_weights(11, 5, RedunStrat::Subrdx2Ovly).unwrap();
        for code in [0, 1, 767, 768, 1000, 2047] {
            let bits = code_to_bits(&w, code);
            assert_eq!(bits_to_code(&w, &bits), code, "code {code}");
        }
        assert_eq!(
            code_to_bits(&[4, 2, 1], 5),
            vec![true, false, true]
        );
    }
}
