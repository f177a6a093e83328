use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::blocks::testbench_name;
use crate::config::Pvt;
use crate::schematic::{Direction, Primitive, PulseParams};
use crate::sim::{Edge, Meas, Sim};
use crate::units::SiValue;

use super::*;

/// Clock period in seconds.
const T_CLK: f64 = 100e-9;
const T_EDGE: f64 = 100e-12;
const T_STOP: f64 = 500e-9;
const T_STEP: f64 = 100e-12;

#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(derive(Debug))]
pub struct SampTbParams {
    #[builder(default)]
    pub pvt: Pvt,
    #[builder(default)]
    pub samp: SampParams,
    /// Capacitance on `dout`.
    #[builder(default = "SiValue::femto(1)")]
    pub cload: SiValue,
}

impl SampTbParams {
    #[inline]
    pub fn builder() -> SampTbParamsBuilder {
        SampTbParamsBuilder::default()
    }

    pub fn new(samp: SampParams, pvt: Pvt) -> Self {
        Self {
            pvt,
            samp,
            cload: SiValue::femto(1),
        }
    }
}

impl Default for SampTbParams {
    fn default() -> Self {
        Self::new(SampParams::default(), Pvt::default())
    }
}

pub struct SampTb {
    name: ArcStr,
    params: SampTbParams,
}

impl Component for SampTb {
    type Params = SampTbParams;

    fn new(params: &Self::Params, _ctx: &FridaCtx) -> Result<Self> {
        let dut = module_name("samp", &params.samp)?;
        Ok(Self {
            name: testbench_name(&dut, &params.pvt, &params.cload)?,
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
        let din = ctx.signal("din");
        let dout = ctx.signal("dout");
        let clk = ctx.signal("clk");
        let clk_b = ctx.signal("clk_b");

        ctx.instantiate_primitive(Primitive::Vdc { dc: vdd_val })
            .with_connections([("p", &vdd), ("n", &vss)])
            .named("vvdd")
            .add_to(ctx);

        let clock = PulseParams {
            v1: 0.0,
            v2: vdd_val,
            delay: 0.0,
            rise: T_EDGE,
            fall: T_EDGE,
            width: T_CLK / 2.0,
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
        .with_connections([("p", &clk_b), ("n", &vss)])
        .named("vclk_b")
        .add_to(ctx);

        ctx.instantiate_primitive(Primitive::Vdc { dc: vdd_val / 2.0 })
            .with_connections([("p", &din), ("n", &vss)])
            .named("vdin")
            .add_to(ctx);

        ctx.add_cap("cload", self.params.cload, &dout, &vss);

        ctx.instantiate::<Samp>(&self.params.samp)?
            .with_connections([
                ("din", &din),
                ("dout", &dout),
                ("clk", &clk),
                ("clk_b", &clk_b),
                ("vdd", &vdd),
                ("vss", &vss),
            ])
            .named("dut")
            .add_to(ctx);

        Ok(())
    }
}

/// Builds the sampler testbench and its transient simulation.
pub fn sim_input(ctx: &FridaCtx, params: &SampTbParams) -> Result<Sim> {
    let tb = ctx.generate::<SampTb>(params)?;
    Ok(Sim::new(tb, params.pvt)
        .tran(T_STOP, T_STEP)
        .save(["xtop.din", "xtop.dout"])
        .meas(Meas::When {
            name: arcstr::literal!("t_settle"),
            signal: arcstr::literal!("xtop.dout"),
            reference: arcstr::literal!("xtop.din"),
            factor: 0.99,
            edge: Edge::Rise,
            count: 1,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Corner;
    use crate::pdk::PdkName;
    use crate::schematic::{Call, PrimitiveKind};
    use crate::setup_ctx;
    use crate::sim::Analysis;

    #[test]
    fn test_samp_tb_structure() -> Result<()> {
        let ctx = setup_ctx(PdkName::Tsmc28);
        let params = SampTbParams::builder()
            .pvt(Pvt::new(Corner::Typ, Corner::Slow, Corner::Typ))
            .samp(SampParams {
                switch_type: SwitchType::Tgate,
                ..Default::default()
            })
            .build()
            .unwrap();
        let sim = sim_input(&ctx, &params)?;
        let tb = &sim.tb;

        assert_eq!(tb.name, "samp_tgate_10_1_low_tb_typ_slow_typ_1f");
        assert_eq!(tb.port_bits(), vec!["vss"]);
        assert_eq!(tb.primitives(PrimitiveKind::Vpulse).count(), 2);
        match &tb.instance("vvdd").unwrap().call {
            Call::Primitive(Primitive::Vdc { dc }) => assert_eq!(*dc, 0.81),
            other => panic!("unexpected supply {other:?}"),
        }
        match &tb.instance("vdin").unwrap().call {
            Call::Primitive(Primitive::Vdc { dc }) => assert_eq!(*dc, 0.405),
            other => panic!("unexpected input {other:?}"),
        }
        assert!(matches!(tb.instance("dut").unwrap().call, Call::Module(_)));

        assert_eq!(sim.temperature(), Some(25.0));
        assert!(matches!(sim.analyses[0], Analysis::Tran(t) if t.tstop == 500e-9));
        assert_eq!(sim.meas[0].name(), "t_settle");
        Ok(())
    }

    #[test]
    fn test_samp_tb_defaults() {
        let params = SampTbParams::builder().build().unwrap();
        assert_eq!(params, SampTbParams::default());
        assert_eq!(params.cload, SiValue::femto(1));
    }
}
