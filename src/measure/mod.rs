//! Measurement kernel.
//!
//! Everything outside [`extract`] and [`metrics`] operates on plain `f64`
//! slices, so the same functions serve simulator output and bench data.
//! Degenerate inputs (too short, empty windows, no crossings) produce
//! `f64::NAN` and a warning instead of an error; only mismatched array
//! lengths and non-finite references are reported as errors.

use crate::error::{FridaError, Result};

pub mod extract;
pub mod linearity;
pub mod metrics;
pub mod spectrum;
pub mod stats;
pub mod timing;
pub mod waveform;

pub use extract::{current, sample_at_clock, time, waveform, waveforms};
pub use linearity::{
    code_to_voltage, compute_static_error, endpoint_inl_dnl, find_code_transitions,
    histogram_inl_dnl, redundant_bits_to_code, EndpointLinearity, HistogramLinearity,
    StaticError,
};
pub use metrics::{cdac_metrics, comp_metrics, samp_metrics, MeasurementResult};
pub use spectrum::{compute_enob_fft, SpectrumMetrics, Window};
pub use stats::{mc_statistics, percentile, worst_case, McStats};
pub use timing::{
    average_power, charge_injection, delay, fit_s_curve, offset_from_crossing, s_curve, settling_time,
    SCurveFit,
};
pub use waveform::{diff_to_single, find_crossings, interp, quantize_to_bits, sample_at_edges, EdgeDir};

pub(crate) fn check_len(a: &[f64], b: &[f64]) -> Result<()> {
    if a.len() != b.len() {
        return Err(FridaError::ShapeMismatch(a.len(), b.len()));
    }
    Ok(())
}

/// Logs why `metric` could not be computed and yields NaN.
pub(crate) fn degenerate(metric: &str, reason: &str) -> f64 {
    log::warn!("{metric}: {reason}; reporting NaN");
    f64::NAN
}

/// Mean of the finite entries of `x`, or NaN if there are none.
pub(crate) fn mean_finite(metric: &str, x: &[f64]) -> f64 {
    let finite: Vec<f64> = x.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return degenerate(metric, "no finite samples");
    }
    finite.iter().sum::<f64>() / finite.len() as f64
}
