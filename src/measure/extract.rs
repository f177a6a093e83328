//! Adapter from simulator results to plain arrays.
//!
//! Simulators disagree on how they spell node names: Spectre reports
//! `xtop.dout`, ngspice `v(xtop.dout)`, Xyce `V(XTOP:DOUT)`. Lookups here
//! accept any of these spellings.

use std::collections::BTreeMap;

use crate::error::{FridaError, Result};
use crate::sim::raw::RawResult;

use super::waveform::{sample_at_edges, EdgeDir};

/// Canonical spelling of a signal name.
pub fn normalize_name(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    let inner = lower
        .strip_prefix("v(")
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(&lower);
    inner.replace(':', ".")
}

fn lookup<'a>(result: &'a RawResult, name: &str) -> Option<&'a [f64]> {
    if let Some(sig) = result.signal(name) {
        return Some(sig);
    }
    let want = normalize_name(name);
    result
        .signals
        .iter()
        .find(|(k, _)| normalize_name(k) == want)
        .map(|(_, v)| v.as_slice())
}

/// The sweep vector of a transient result.
pub fn time(result: &RawResult) -> Result<&[f64]> {
    result
        .time()
        .or_else(|| lookup(result, "time"))
        .ok_or_else(|| FridaError::Extraction("time".to_string()))
}

/// A named node voltage.
pub fn waveform<'a>(result: &'a RawResult, name: &str) -> Result<&'a [f64]> {
    let sig = lookup(result, name).ok_or_else(|| FridaError::Extraction(name.to_string()))?;
    let t = time(result)?;
    super::check_len(t, sig)?;
    Ok(sig)
}

/// Every requested signal that is present, keyed by the requested name.
pub fn waveforms<'a>(result: &'a RawResult, names: &[&str]) -> BTreeMap<String, &'a [f64]> {
    names
        .iter()
        .filter_map(|&name| match lookup(result, name) {
            Some(sig) => Some((name.to_string(), sig)),
            None => {
                log::debug!("signal {name} not in results");
                None
            }
        })
        .collect()
}

/// Branch current of a voltage source, positive into its `p` terminal.
pub fn current<'a>(result: &'a RawResult, source: &str) -> Result<&'a [f64]> {
    let candidates = [
        format!("i({source})"),
        format!("{source}#branch"),
        format!("v.{source}#branch"),
        format!("{source}:p"),
    ];
    candidates
        .iter()
        .find_map(|c| lookup(result, c))
        .ok_or_else(|| FridaError::Extraction(format!("current through {source}")))
}

/// Samples `names` at the `dir` crossings of `clock`.
///
/// See [`sample_at_edges`] for the sampling rule.
pub fn sample_at_clock(
    result: &RawResult,
    clock: &str,
    names: &[&str],
    dir: EdgeDir,
    threshold: Option<f64>,
    sample_offset: f64,
) -> Result<BTreeMap<String, Vec<f64>>> {
    let t = time(result)?;
    let clk = waveform(result, clock)?;
    let signals = names
        .iter()
        .map(|&n| waveform(result, n))
        .collect::<Result<Vec<_>>>()?;
    let samples = sample_at_edges(t, clk, &signals, dir, threshold, sample_offset)?;
    Ok(names
        .iter()
        .map(|n| n.to_string())
        .zip(samples)
        .collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use approx::assert_abs_diff_eq;

    use super::*;

    pub(crate) fn raw(sweep: &str, signals: Vec<(&str, Vec<f64>)>) -> RawResult {
        RawResult {
            signals: signals
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<HashMap<_, _>>(),
            sweep: Some(sweep.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_name_spellings() -> Result<()> {
        let r = raw(
            "TIME",
            vec![
                ("TIME", vec![0.0, 1.0]),
                ("V(XTOP:DOUT)", vec![0.1, 0.2]),
                ("v(xtop.din)", vec![0.3, 0.3]),
            ],
        );
        assert_eq!(time(&r)?, &[0.0, 1.0]);
        assert_eq!(waveform(&r, "xtop.dout")?, &[0.1, 0.2]);
        assert_eq!(waveform(&r, "V(xtop.din)")?, &[0.3, 0.3]);
        assert!(matches!(
            waveform(&r, "xtop.missing"),
            Err(FridaError::Extraction(_))
        ));

        let found = waveforms(&r, &["xtop.dout", "xtop.missing"]);
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("xtop.dout"));
        Ok(())
    }

    #[test]
    fn test_current_lookup() -> Result<()> {
        let r = raw(
            "time",
            vec![
                ("time", vec![0.0, 1.0]),
                ("v.xtop.vvdd#branch", vec![-1e-3, -2e-3]),
            ],
        );
        assert_eq!(current(&r, "xtop.vvdd")?, &[-1e-3, -2e-3]);

        let r = raw(
            "time",
            vec![("time", vec![0.0, 1.0]), ("xtop.vvdd:p", vec![1.0, 1.0])],
        );
        assert_eq!(current(&r, "xtop.vvdd")?, &[1.0, 1.0]);
        assert!(current(&r, "xtop.vclk").is_err());
        Ok(())
    }

    #[test]
    fn test_sample_at_clock() -> Result<()> {
        let t: Vec<f64> = (0..40).map(f64::from).collect();
        let clk: Vec<f64> = t
            .iter()
            .map(|&x| if (x as usize / 5) % 2 == 1 { 1.2 } else { 0.0 })
            .collect();
        let r = raw(
            "time",
            vec![("time", t.clone()), ("xtop.clk", clk), ("xtop.out", t.clone())],
        );
        let s = sample_at_clock(&r, "xtop.clk", &["xtop.out"], EdgeDir::Rising, None, 0.5)?;
        let out = &s["xtop.out"];
        assert_eq!(out.len(), 3);
        assert_abs_diff_eq!(out[0], 9.5);
        Ok(())
    }
}
