//! Dynamic performance from a sine-wave test.

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

use super::degenerate;

/// Fewest samples for which a spectrum is attempted.
pub const MIN_SAMPLES: usize = 16;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Window {
    #[default]
    Hann,
    Hamming,
    Blackman,
    Rect,
}

impl Window {
    /// Symmetric window coefficients.
    pub fn coefficients(&self, n: usize) -> Vec<f64> {
        if n < 2 {
            return vec![1.0; n];
        }
        let m = (n - 1) as f64;
        (0..n)
            .map(|k| {
                let x = 2.0 * PI * k as f64 / m;
                match self {
                    Window::Hann => 0.5 - 0.5 * x.cos(),
                    Window::Hamming => 0.54 - 0.46 * x.cos(),
                    Window::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
                    Window::Rect => 1.0,
                }
            })
            .collect()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct SpectrumMetrics {
    pub enob: f64,
    pub sndr_db: f64,
    pub snr_db: f64,
    pub thd_db: f64,
    pub sfdr_db: f64,
    pub signal_power: f64,
    pub noise_power: f64,
}

impl SpectrumMetrics {
    fn nan() -> Self {
        Self {
            enob: f64::NAN,
            sndr_db: f64::NAN,
            snr_db: f64::NAN,
            thd_db: f64::NAN,
            sfdr_db: f64::NAN,
            signal_power: f64::NAN,
            noise_power: f64::NAN,
        }
    }
}

/// `|X[k]|²` for `k = 0..=n/2` of a real sequence.
pub fn power_spectrum(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    if n == 0 {
        return Vec::new();
    }
    let mut data: Vec<Complex64> = x.iter().map(|&re| Complex64::new(re, 0.0)).collect();
    FftPlanner::new().plan_fft_forward(n).process(&mut data);
    data.truncate(n / 2 + 1);
    data.iter().map(Complex64::norm_sqr).collect()
}

fn db(ratio: f64) -> f64 {
    10.0 * ratio.log10()
}

/// ENOB, SNDR, SNR, THD and SFDR from a Hann-windowed spectrum with the
/// first five harmonics.
pub fn compute_enob_fft(codes: &[f64], fs: f64, fin: f64) -> SpectrumMetrics {
    analyze_spectrum(codes, fs, fin, Window::Hann, 5)
}

/// Sine-wave spectral analysis of a code sequence.
///
/// The fundamental and each harmonic below Nyquist take a band of
/// `max(3, n/100)` bins to absorb window leakage. Everything else except
/// DC is noise.
pub fn analyze_spectrum(
    codes: &[f64],
    fs: f64,
    fin: f64,
    window: Window,
    n_harmonics: usize,
) -> SpectrumMetrics {
    let n = codes.len();
    if n < MIN_SAMPLES || !fs.is_finite() || fs <= 0.0 || codes.iter().any(|c| !c.is_finite()) {
        degenerate("enob", "too few samples or non-finite input");
        return SpectrumMetrics::nan();
    }

    let mean = codes.iter().sum::<f64>() / n as f64;
    let win = window.coefficients(n);
    let coherent_gain = win.iter().sum::<f64>() / n as f64;
    let windowed: Vec<f64> = codes
        .iter()
        .zip(&win)
        .map(|(c, w)| (c - mean) * w)
        .collect();
    let pwr = power_spectrum(&windowed);
    let bins = pwr.len();

    let bin_of = |f: f64| ((f * n as f64 / fs).round() as usize).min(bins - 1);
    let width = (n / 100).max(3);
    let band = |center: usize| {
        let lo = center.saturating_sub(width / 2).max(1);
        let hi = (center + width / 2 + 1).min(bins);
        lo..hi
    };

    let sig_band = band(bin_of(fin));
    let sig_pwr: f64 = pwr[sig_band.clone()].iter().sum();
    let harm_pwr: f64 = (2..=n_harmonics)
        .map(|h| h as f64 * fin)
        .take_while(|&f| f < fs / 2.0)
        .map(|f| pwr[band(bin_of(f))].iter().sum::<f64>())
        .sum();
    let total: f64 = pwr[1..].iter().sum();
    let noise_pwr = (total - sig_pwr - harm_pwr).max(1e-20);

    if sig_pwr <= 0.0 {
        degenerate("enob", "no signal power at the input frequency");
        return SpectrumMetrics::nan();
    }

    let cg2 = coherent_gain * coherent_gain;
    let (sig_pwr, harm_pwr, noise_pwr) = (sig_pwr / cg2, harm_pwr / cg2, noise_pwr / cg2);

    let max_spur = pwr
        .iter()
        .enumerate()
        .filter(|(k, _)| *k != 0 && !sig_band.contains(k))
        .fold(0.0f64, |m, (_, &p)| m.max(p))
        / cg2;

    let sndr_db = db(sig_pwr / (noise_pwr + harm_pwr));
    SpectrumMetrics {
        enob: (sndr_db - 1.76) / 6.02,
        sndr_db,
        snr_db: db(sig_pwr / noise_pwr),
        thd_db: if harm_pwr > 0.0 { db(harm_pwr / sig_pwr) } else { -120.0 },
        sfdr_db: if max_spur > 0.0 { db(sig_pwr / max_spur) } else { 120.0 },
        signal_power: sig_pwr,
        noise_power: noise_pwr,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_power_spectrum() {
        let x: Vec<f64> = (0..16).map(|k| ((k * 7) % 5) as f64 - 2.0).collect();
        let p = power_spectrum(&x);
        assert_eq!(p.len(), 9);
        let dc: f64 = x.iter().sum();
        assert_abs_diff_eq!(p[0], dc * dc, epsilon = 1e-9);
        // Parseval over the one-sided spectrum of a real sequence.
        let energy: f64 = x.iter().map(|v| v * v).sum();
        let folded = p[0] + p[8] + 2.0 * p[1..8].iter().sum::<f64>();
        assert_abs_diff_eq!(folded / 16.0, energy, epsilon = 1e-9);

        // Non-power-of-two lengths are handled too.
        let mut padded = x.clone();
        padded.push(0.0);
        let p17 = power_spectrum(&padded);
        assert_eq!(p17.len(), 9);
        assert_abs_diff_eq!(p17[0], p[0], epsilon = 1e-9);
        assert!(power_spectrum(&[]).is_empty());

        // A pure tone at bin 2 lands entirely in that bin.
        let tone: Vec<f64> = (0..16).map(|k| (2.0 * PI * 2.0 * k as f64 / 16.0).cos()).collect();
        let p = power_spectrum(&tone);
        assert_abs_diff_eq!(p[2], 64.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p[3], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_ideal_11_bit_enob() {
        let (n_bits, fs, fin) = (11u32, 10e6, 313e3);
        let half = f64::from(1u32 << (n_bits - 1));
        let amplitude = half - 1.0;
        let codes: Vec<f64> = (0..4096)
            .map(|k| (half + amplitude * (2.0 * PI * fin * k as f64 / fs).sin()).round())
            .collect();
        let m = compute_enob_fft(&codes, fs, fin);
        assert!(m.enob >= 10.9, "enob = {}", m.enob);
        assert!(m.enob < 11.5, "enob = {}", m.enob);
        assert!(m.sfdr_db > m.sndr_db);
    }

    #[test]
    fn test_degenerate_spectrum() {
        assert!(compute_enob_fft(&[1.0; 8], 1e6, 1e3).enob.is_nan());
        assert!(compute_enob_fft(&[1.0; 64], 1e6, 1e5).enob.is_nan());
    }
}
