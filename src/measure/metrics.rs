//! Per-block figures of merit computed from testbench results.
//!
//! Node names follow the testbenches in [`crate::blocks`]: each DUT sits in
//! the `xtop` scope and its supply is the source `xtop.vvdd`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::Result;
use crate::sim::raw::RawResult;

use super::extract::{current, time, waveform};
use super::linearity::endpoint_inl_dnl;
use super::timing::{average_power, charge_injection, fit_s_curve, s_curve, settling_time};
use super::waveform::{diff_to_single, find_crossings, interp, EdgeDir};
use super::{degenerate, mean_finite};

/// Relative band used for every settling figure.
pub const SETTLING_TOL: f64 = 0.01;

const SUPPLY: &str = "xtop.vvdd";

/// Named scalar metrics plus optional per-code arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeasurementResult {
    pub metrics: BTreeMap<String, f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub arrays: BTreeMap<String, Vec<f64>>,
}

impl MeasurementResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.metrics.insert(name.into(), value);
    }

    pub fn insert_array(&mut self, name: impl Into<String>, values: Vec<f64>) {
        self.arrays.insert(name.into(), values);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// Rising clock edges and the period between the first two.
fn clock_edges(t: &[f64], clk: &[f64], vdd: f64) -> Result<Option<(Vec<f64>, f64)>> {
    let edges = find_crossings(t, clk, vdd / 2.0, EdgeDir::Rising)?;
    if edges.len() < 2 {
        return Ok(None);
    }
    let period = edges[1] - edges[0];
    Ok(Some((edges, period)))
}

/// Samples of `(t, v)` with `lo <= t <= hi`.
fn window(t: &[f64], v: &[f64], lo: f64, hi: f64) -> (Vec<f64>, Vec<f64>) {
    t.iter()
        .zip(v)
        .filter(|(&tk, _)| tk >= lo && tk <= hi)
        .map(|(&tk, &vk)| (tk, vk))
        .unzip()
}

/// Average supply power in watts, or NaN if the supply current was not saved.
fn supply_power(result: &RawResult, t: &[f64], vdd: f64) -> Result<f64> {
    let Ok(i) = current(result, SUPPLY) else {
        return Ok(degenerate("power", "supply current not saved"));
    };
    let (Some(&t0), Some(&t1)) = (t.first(), t.last()) else {
        return Ok(degenerate("power", "empty waveform"));
    };
    let v = match waveform(result, "xtop.vdd") {
        Ok(v) => v.to_vec(),
        Err(_) => vec![vdd; t.len()],
    };
    // Sources report current flowing into `p`, so delivered power is negative.
    Ok(average_power(t, &v, i, t0, t1)?.abs())
}

/// Common-mode steps closer than this belong to the same sweep segment.
const CM_TOL: f64 = 25e-3;
/// Differential inputs closer than this share an S-curve level.
const LEVEL_TOL: f64 = 0.1e-3;

/// Index ranges of consecutive samples at one common-mode level.
fn cm_segments(cm: &[f64]) -> Vec<std::ops::Range<usize>> {
    let mut out = Vec::new();
    let mut start = 0;
    for k in 1..=cm.len() {
        if k == cm.len() || (cm[k] - cm[start]).abs() > CM_TOL {
            out.push(start..k);
            start = k;
        }
    }
    out
}

/// Comparator offset and noise (mV), clock-to-output delay (ns), output
/// settling (ns) and supply power (µW).
///
/// The output is sampled 30 % into each clock period, while the latch is
/// still evaluating. Samples are split by input common mode; each segment's
/// S-curve gives an offset at its 50 % point and a noise sigma from its
/// 16 %/84 % spread. The scalars average the segments.
pub fn comp_metrics(result: &RawResult, vdd: f64) -> Result<MeasurementResult> {
    let t = time(result)?;
    let clk = waveform(result, "xtop.clk")?;
    let outd = diff_to_single(waveform(result, "xtop.outp")?, waveform(result, "xtop.outn")?)?;
    let (inp, inn) = (waveform(result, "xtop.inp")?, waveform(result, "xtop.inn")?);
    let vind = diff_to_single(inp, inn)?;
    let vcm: Vec<f64> = inp.iter().zip(inn).map(|(p, n)| (p + n) / 2.0).collect();

    let mut out = MeasurementResult::new();
    let Some((edges, period)) = clock_edges(t, clk, vdd)? else {
        for name in ["offset_mv", "noise_sigma_mv", "delay_ns", "settling_ns"] {
            out.insert(name, degenerate(name, "fewer than two clock edges"));
        }
        out.insert("power_uw", supply_power(result, t, vdd)? * 1e6);
        return Ok(out);
    };

    let sample_times: Vec<f64> = edges.iter().map(|e| e + 0.3 * period).collect();
    let vin_s: Vec<f64> = sample_times.iter().map(|&ts| interp(ts, t, &vind)).collect();
    let vout_s: Vec<f64> = sample_times.iter().map(|&ts| interp(ts, t, &outd)).collect();
    let cm_s: Vec<f64> = sample_times.iter().map(|&ts| interp(ts, t, &vcm)).collect();

    let mut cms = Vec::new();
    let mut offsets = Vec::new();
    let mut sigmas = Vec::new();
    for seg in cm_segments(&cm_s) {
        let fit = fit_s_curve(&s_curve(&vin_s[seg.clone()], &vout_s[seg.clone()], LEVEL_TOL)?);
        cms.push(cm_s[seg.start]);
        offsets.push(fit.offset * 1e3);
        sigmas.push(fit.sigma * 1e3);
    }
    out.insert("offset_mv", mean_finite("offset", &offsets));
    out.insert("noise_sigma_mv", mean_finite("noise", &sigmas));
    out.insert_array("vcm", cms);
    out.insert_array("offset_per_cm_mv", offsets);
    out.insert_array("noise_sigma_per_cm_mv", sigmas);
    out.insert_array("vin_diff", vin_s);
    out.insert_array("vout_diff", vout_s);

    let mag: Vec<f64> = outd.iter().map(|x| x.abs()).collect();
    let resolved = find_crossings(t, &mag, vdd / 2.0, EdgeDir::Rising)?;
    let mut delays = Vec::new();
    let mut settles = Vec::new();
    for &edge in &edges {
        if let Some(&tr) = resolved.iter().find(|&&x| x > edge && x < edge + period) {
            delays.push(tr - edge);
        }
        let (tw, vw) = window(t, &mag, edge, edge + 0.4 * period);
        if tw.len() > 1 {
            settles.push(settling_time(&tw, &vw, edge, None, SETTLING_TOL)? - edge);
        }
    }
    out.insert("delay_ns", mean_finite("delay", &delays) * 1e9);
    out.insert("settling_ns", mean_finite("settling", &settles) * 1e9);
    out.insert("power_uw", supply_power(result, t, vdd)? * 1e6);
    Ok(out)
}

/// Sampler settling (ns) during the first track phase and charge injection
/// (mV) at the first hold edge.
pub fn samp_metrics(result: &RawResult, vdd: f64) -> Result<MeasurementResult> {
    let t = time(result)?;
    let clk = waveform(result, "xtop.clk")?;
    let din = waveform(result, "xtop.din")?;
    let dout = waveform(result, "xtop.dout")?;

    let mut out = MeasurementResult::new();
    let Some((edges, period)) = clock_edges(t, clk, vdd)? else {
        out.insert("settling_ns", degenerate("settling_ns", "fewer than two clock edges"));
        out.insert(
            "charge_injection_mv",
            degenerate("charge_injection_mv", "fewer than two clock edges"),
        );
        return Ok(out);
    };

    let t_on = edges[0];
    let falls = find_crossings(t, clk, vdd / 2.0, EdgeDir::Falling)?;
    let t_off = falls
        .into_iter()
        .find(|&x| x > t_on)
        .unwrap_or(t_on + period / 2.0);

    let (tw, vw) = window(t, dout, t_on, t_off);
    let target = interp(t_off, t, din);
    let ts = settling_time(&tw, &vw, t_on, Some(target), SETTLING_TOL)?;
    out.insert("settling_ns", (ts - t_on) * 1e9);

    let inj = charge_injection(t, dout, t_off, 0.05 * period)?;
    out.insert("charge_injection_mv", inj * 1e3);
    Ok(out)
}

/// CDAC settling (ns, worst step), the settled top-plate level per code and
/// endpoint INL/DNL of those levels.
///
/// Each code is held for `t_step`; the level is read at 90 % of the hold.
pub fn cdac_metrics(result: &RawResult, t_step: f64) -> Result<MeasurementResult> {
    let t = time(result)?;
    let top = waveform(result, "xtop.top")?;
    let mut out = MeasurementResult::new();
    let (Some(&t_end), true) = (t.last(), t_step > 0.0) else {
        out.insert("settling_ns", degenerate("settling_ns", "empty record"));
        return Ok(out);
    };

    let n_steps = ((t_end / t_step).round() as usize).max(1);
    let mut levels = Vec::with_capacity(n_steps);
    let mut worst: f64 = f64::NAN;
    for k in 0..n_steps {
        let t0 = k as f64 * t_step;
        levels.push(interp(t0 + 0.9 * t_step, t, top));
        let (tw, vw) = window(t, top, t0, t0 + t_step);
        if tw.len() > 1 {
            let ts = settling_time(&tw, &vw, t0, None, SETTLING_TOL)? - t0;
            worst = if worst.is_nan() { ts } else { worst.max(ts) };
        }
    }
    out.insert("settling_ns", worst * 1e9);

    if levels.len() > 1 {
        let codes: Vec<f64> = (0..levels.len()).map(|k| k as f64).collect();
        let lin = endpoint_inl_dnl(&codes, &levels)?;
        out.insert("inl_max_lsb", lin.inl_max);
        out.insert("dnl_max_lsb", lin.dnl_max);
        out.insert("lsb_mv", lin.lsb * 1e3);
        out.insert_array("inl", lin.inl);
        out.insert_array("dnl", lin.dnl);
    }
    out.insert_array("top_levels", levels);
    Ok(out)
}
