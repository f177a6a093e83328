//! Piecewise-linear stimulus construction.

use std::sync::Arc;

use crate::schematic::Primitive;

/// A PWL voltage waveform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Waveform {
    values: Vec<(f64, f64)>,
}

impl Waveform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_initial_value(x: f64) -> Self {
        Self {
            values: vec![(0.0, x)],
        }
    }

    pub fn push(&mut self, t: f64, x: f64) {
        self.values.push((t, x));
    }

    pub fn last_t(&self) -> Option<f64> {
        self.values.last().map(|(t, _)| *t)
    }

    pub fn last_x(&self) -> Option<f64> {
        self.values.last().map(|(_, x)| *x)
    }

    /// Holds the current value until `until`, then ramps to `x` over `tr`.
    pub fn push_step(&mut self, until: f64, x: f64, tr: f64) {
        match self.last_x() {
            Some(prev) if prev == x => self.push(until + tr, x),
            Some(prev) => {
                self.push(until, prev);
                self.push(until + tr, x);
            }
            None => self.push(until, x),
        }
    }

    pub fn push_high(&mut self, until: f64, vdd: f64, tr: f64) {
        self.push_step(until, vdd, tr);
    }

    pub fn push_low(&mut self, until: f64, tf: f64) {
        self.push_step(until, 0.0, tf);
    }

    pub fn values(&self) -> &[(f64, f64)] {
        &self.values
    }

    pub fn into_primitive(self) -> Primitive {
        Primitive::Vpwl(Arc::new(self.values))
    }
}

/// A staircase from `v_start` to `v_stop` inclusive in steps of `v_step`.
///
/// Each level is held for `t_step` after an initial `t_delay`; transitions
/// take `t_rise`. Returns an empty waveform for a zero step or a step that
/// points away from `v_stop`.
pub fn generate_staircase_pwl(
    v_start: f64,
    v_stop: f64,
    v_step: f64,
    t_step: f64,
    t_rise: f64,
    t_delay: f64,
) -> Waveform {
    let mut wav = Waveform::new();
    if v_step == 0.0 || (v_stop - v_start) * v_step < 0.0 {
        return wav;
    }
    let n = ((v_stop - v_start) / v_step + 1e-9).floor() as usize + 1;
    wav.push(0.0, v_start);
    let mut t = t_delay;
    for i in 0..n {
        let v = v_start + i as f64 * v_step;
        if i > 0 {
            wav.push_step(t, v, t_rise);
            t += t_rise;
        }
        t += t_step;
    }
    wav.push(t, v_start + (n - 1) as f64 * v_step);
    wav
}

/// Renders PWL points as `t v` pairs in netlist precision.
pub fn format_pwl_points(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(t, v)| format!("{t:.12e} {v:.6e}"))
        .collect::<Vec<_>>()
        .join(" ")
}
