use std::sync::Arc;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::blocks::testbench_name;
use crate::config::Pvt;
use crate::schematic::{Direction, Primitive, PulseParams};
use crate::sim::waveform::Waveform;
use crate::sim::{Edge, Meas, Sim};
use crate::units::SiValue;

use super::*;

const T_CLK: f64 = 10e-9;
const T_CLK_HIGH: f64 = 4e-9;
const T_CLK_DELAY: f64 = 500e-12;
const T_EDGE: f64 = 100e-12;
const T_STEP: f64 = 100e-12;

/// Common-mode levels of the input ladder, in volts.
pub const CM_VOLTAGES: [f64; 5] = [0.3, 0.4, 0.5, 0.6, 0.7];

/// Differential levels of the input ladder: -10 mV to +10 mV in 2 mV steps.
pub fn diff_voltages() -> Vec<f64> {
    (0..11).map(|i| (i as f64 * 2.0 - 10.0) * 1e-3).collect()
}

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(derive(Debug))]
pub struct CompTbParams {
    #[builder(default)]
    pub pvt: Pvt,
    #[builder(default)]
    pub comp: CompParams,
    /// Hold time of each input level in seconds.
    #[builder(default = "200e-9")]
    pub t_hold: f64,
    /// Transition time between input levels in seconds.
    #[builder(default = "100e-12")]
    pub t_rise: f64,
}

impl CompTbParams {
    #[inline]
    pub fn builder() -> CompTbParamsBuilder {
        CompTbParamsBuilder::default()
    }

    pub fn new(comp: CompParams, pvt: Pvt) -> Self {
        Self {
            pvt,
            comp,
            t_hold: 200e-9,
            t_rise: 100e-12,
        }
    }
}

impl Default for CompTbParams {
    fn default() -> Self {
        Self::new(CompParams::default(), Pvt::default())
    }
}

/// Input waveforms for the `(cm, diff)` ladder and their total duration.
///
/// `inp` carries `cm + diff/2` and `inn` carries `cm - diff/2`.
pub fn input_waveforms(t_hold: f64, t_rise: f64) -> (Waveform, Waveform, f64) {
    let diffs = diff_voltages();
    let levels: Vec<(f64, f64)> = CM_VOLTAGES
        .iter()
        .flat_map(|&cm| diffs.iter().map(move |&d| (cm + d / 2.0, cm - d / 2.0)))
        .collect();

    let mut inp = Waveform::new();
    let mut inn = Waveform::new();
    let mut t = 0.0;
    for (i, (vp, vn)) in levels.iter().enumerate() {
        inp.push(t, *vp);
        inn.push(t, *vn);
        t += t_hold;
        if i + 1 < levels.len() {
            inp.push(t, *vp);
            inn.push(t, *vn);
            t += t_rise;
        }
    }
    (inp, inn, t)
}

#[derive(Serialize)]
struct Stimulus {
    t_hold: f64,
    t_rise: f64,
}

pub struct CompTb {
    name: ArcStr,
    params: CompTbParams,
}

impl Component for CompTb {
    type Params = CompTbParams;

    fn new(params: &Self::Params, _ctx: &FridaCtx) -> Result<Self> {
        let dut = module_name("comp", &params.comp)?;
        let stimulus = Stimulus {
            t_hold: params.t_hold,
            t_rise: params.t_rise,
        };
        Ok(Self {
            name: testbench_name(&dut, &params.pvt, &stimulus)?,
            params: params.clone(),
        })
    }

    fn name(&self) -> ArcStr {
        self.name.clone()
    }

    fn schematic(&self, ctx: &mut SchematicCtx) -> Result<()> {
        let vdd_val = ctx.pdk().supply.corner(self.params.pvt.v);

        let vss = ctx.port("vss", Direction::InOut);
        let vdd = ctx.signal("vdd");
        let vin_src = ctx.signal("vin_src");
        let vref_src = ctx.signal("vref_src");
        let inp = ctx.signal("inp");
        let inn = ctx.signal("inn");
        let clk = ctx.signal("clk");
        let clkb = ctx.signal("clkb");
        let outp = ctx.signal("outp");
        let outn = ctx.signal("outn");

        ctx.instantiate_primitive(Primitive::Vdc { dc: vdd_val })
            .with_connections([("p", &vdd), ("n", &vss)])
            .named("vvdd")
            .add_to(ctx);

        let (wav_p, wav_n, _) = input_waveforms(self.params.t_hold, self.params.t_rise);
        for (name, wav, node) in [("vinp", wav_p, &vin_src), ("vinn", wav_n, &vref_src)] {
            ctx.instantiate_primitive(Primitive::Vpwl(Arc::new(wav.values().to_vec())))
                .with_connections([("p", node), ("n", &vss)])
                .named(name)
                .add_to(ctx);
        }

        // 1k + 100f source impedance on each input.
        ctx.add_res("rsrc_p", SiValue::unit(1000), &vin_src, &inp);
        ctx.add_res("rsrc_n", SiValue::unit(1000), &vref_src, &inn);
        ctx.add_cap("csrc_p", SiValue::femto(100), &inp, &vss);
        ctx.add_cap("csrc_n", SiValue::femto(100), &inn, &vss);

        let clock = PulseParams {
            v1: 0.0,
            v2: vdd_val,
            delay: T_CLK_DELAY,
            rise: T_EDGE,
            fall: T_EDGE,
            width: T_CLK_HIGH,
            period: T_CLK,
        };
        ctx.instantiate_primitive(Primitive::Vpulse(clock))
            .with_connections([("p", &clk), ("n", &vss)])
            .named("vclk")
            .add_to(ctx);
        ctx.instantiate_primitive(Primitive::Vpulse(PulseParams {
            v1: vdd_val,
            v2: 0.0,
            ..clock
        }))
        .with_connections([("p", &clkb), ("n", &vss)])
        .named("vclkb")
        .add_to(ctx);

        ctx.add_cap("cload_p", SiValue::femto(10), &outp, &vss);
        ctx.add_cap("cload_n", SiValue::femto(10), &outn, &vss);

        ctx.instantiate::<Comp>(&self.params.comp)?
            .with_connections([
                ("inp", &inp),
                ("inn", &inn),
                ("outp", &outp),
                ("outn", &outn),
                ("clk", &clk),
                ("clkb", &clkb),
                ("vdd", &vdd),
                ("vss", &vss),
            ])
            .named("dut")
            .add_to(ctx);

        Ok(())
    }
}

/// Builds the comparator testbench and a transient covering the whole ladder.
pub fn sim_input(ctx: &FridaCtx, params: &CompTbParams) -> Result<Sim> {
    let tb = ctx.generate::<CompTb>(params)?;
    let (_, _, t_stop) = input_waveforms(params.t_hold, params.t_rise);
    let half = ctx.pdk().supply.corner(params.pvt.v) / 2.0;
    Ok(Sim::new(tb, params.pvt)
        .tran(t_stop, T_STEP)
        .meas(Meas::Delay {
            name: arcstr::literal!("t_delay"),
            trig: arcstr::literal!("xtop.clk"),
            trig_val: half,
            targ: arcstr::literal!("xtop.outp"),
            targ_val: half,
            edge: Edge::Rise,
        }))
}
