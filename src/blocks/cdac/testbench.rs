use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::blocks::testbench_name;
use crate::config::Pvt;
use crate::schematic::{Direction, Primitive};
use crate::sim::waveform::Waveform;
use crate::sim::Sim;

use super::*;

const T_STEP: f64 = 100e-12;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(derive(Debug))]
pub struct CdacTbParams {
    #[builder(default)]
    pub pvt: Pvt,
    #[builder(default)]
    pub cdac: CdacParams,
    /// Static input code. `None` sweeps every `n_dac`-bit code.
    #[builder(default)]
    pub code: Option<u64>,
    /// Hold time of each code in the sweep, in seconds.
    #[builder(default = "50e-9")]
    pub t_step: f64,
    #[builder(default = "100e-12")]
    pub t_rise: f64,
}

impl CdacTbParams {
    #[inline]
    pub fn builder() -> CdacTbParamsBuilder {
        CdacTbParamsBuilder::default()
    }

    pub fn new(cdac: CdacParams, pvt: Pvt) -> Self {
        Self {
            pvt,
            cdac,
            code: None,
            t_step: 50e-9,
            t_rise: 100e-12,
        }
    }

    /// Duration of the full code sweep.
    pub fn t_stop(&self) -> f64 {
        (1u64 << self.cdac.n_dac) as f64 * self.t_step
    }
}

impl Default for CdacTbParams {
    fn default() -> Self {
        Self::new(CdacParams::default(), Pvt::default())
    }
}

#[derive(Serialize)]
struct Stimulus {
    mode: String,
    t_step: f64,
    t_rise: f64,
}

/// One PWL waveform per capacitor stepping through codes `0..2^n_dac`.
pub fn code_sweep(weights: &[u64], n_dac: usize, vdd: f64, t_step: f64, t_rise: f64) -> Vec<Waveform> {
    let level = |bit: bool| if bit { vdd } else { 0.0 };
    let mut waves: Vec<Waveform> = code_to_bits(weights, 0)
        .into_iter()
        .map(|b| Waveform::with_initial_value(level(b)))
        .collect();
    for code in 1..(1u64 << n_dac) {
        let t = code as f64 * t_step;
        for (wav, bit) in waves.iter_mut().zip(code_to_bits(weights, code)) {
            wav.push_step(t, level(bit), t_rise);
        }
    }
    waves
}

pub struct CdacTb {
    name: ArcStr,
    params: CdacTbParams,
    weights: Vec<u64>,
}

impl Component for CdacTb {
    type Params = CdacTbParams;

    fn new(params: &Self::Params, _ctx: &FridaCtx) -> Result<Self> {
        let weights = params.cdac.weights()?;
        if let Some(code) = params.code {
            let max = weights.iter().sum::<u64>();
            if code > max {
                return Err(FridaError::param_invalid(
                    "cdac_tb",
                    format!("code {code} exceeds the weight total {max}"),
                ));
            }
        }
        let dut = module_name("cdac", &params.cdac)?;
        let stimulus = Stimulus {
            mode: params
                .code
                .map(|c| format!("code{c}"))
                .unwrap_or_else(|| "sweep".to_string()),
            t_step: params.t_step,
            t_rise: params.t_rise,
        };
        Ok(Self {
            name: testbench_name(&dut, &params.pvt, &stimulus)?,
            params: params.clone(),
            weights,
        })
    }

    fn name(&self) -> ArcStr {
        self.name.clone()
    }

    fn schematic(&self, ctx: &mut SchematicCtx) -> Result<()> {
        let p = &self.params;
        let vdd_val = ctx.pdk().supply.corner(p.pvt.v);

        let vss = ctx.port("vss", Direction::InOut);
        let vdd = ctx.signal("vdd");
        let top = ctx.signal("top");
        let dac = ctx.bus("dac", self.weights.len());

        ctx.instantiate_primitive(Primitive::Vdc { dc: vdd_val })
            .with_connections([("p", &vdd), ("n", &vss)])
            .named("vvdd")
            .add_to(ctx);
        ctx.add_cap("cload", SiValue::femto(100), &top, &vss);

        let sources: Vec<Primitive> = match p.code {
            Some(code) => code_to_bits(&self.weights, code)
                .into_iter()
                .map(|b| Primitive::Vdc {
                    dc: if b { vdd_val } else { 0.0 },
                })
                .collect(),
            None => code_sweep(&self.weights, p.cdac.n_dac, vdd_val, p.t_step, p.t_rise)
                .into_iter()
                .map(Waveform::into_primitive)
                .collect(),
        };
        for (i, source) in sources.into_iter().enumerate() {
            ctx.instantiate_primitive(source)
                .with_connections([("p", dac.index(i)), ("n", &vss)])
                .named(format!("vbit_{i}"))
                .add_to(ctx);
        }

        let mut dut = ctx.instantiate::<Cdac>(&p.cdac)?.with_connections([
            ("top", &top),
            ("vdd", &vdd),
            ("vss", &vss),
        ]);
        dut.connect_bus("dac", &dac);
        dut.named("dut").add_to(ctx);

        Ok(())
    }
}

/// Builds the CDAC testbench: an operating point for a static code,
/// otherwise a transient across the code sweep.
pub fn sim_input(ctx: &FridaCtx, params: &CdacTbParams) -> Result<Sim> {
    let tb = ctx.generate::<CdacTb>(params)?;
    let sim = Sim::new(tb, params.pvt).save(["xtop.top"]);
    Ok(match params.code {
        Some(_) => sim.op(),
        None => sim.tran(params.t_stop(), T_STEP),
    })
}
