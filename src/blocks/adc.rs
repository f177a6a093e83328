//! Top-level SAR ADC.
//!
//! Two sampling switches and two CDACs form the differential front end. The
//! comparator resolves the top plates and the synthesized SAR logic, kept as
//! a black box, sequences the conversion and drives the DAC codes.

use std::sync::Arc;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::blocks::cdac::{Cdac, CdacParams, RedunStrat};
use crate::blocks::comp::{Comp, CompParams};
use crate::blocks::samp::{Samp, SampParams};
use crate::blocks::Component;
use crate::error::{FridaError, Result};
use crate::netlist::module_name;
use crate::schematic::{Direction, ExternalModule, FridaCtx, Port, SchematicCtx};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdcParams {
    /// SAR cycles per conversion; one per CDAC capacitor.
    pub n_cycles: usize,
    pub cdac: CdacParams,
    pub samp: SampParams,
    pub comp: CompParams,
}

impl Default for AdcParams {
    fn default() -> Self {
        Self {
            n_cycles: 16,
            cdac: CdacParams {
                n_dac: 11,
                n_extra: 5,
                redun_strat: RedunStrat::Subrdx2Ovly,
                ..Default::default()
            },
            samp: SampParams::default(),
            comp: CompParams::default(),
        }
    }
}

fn port(name: &str, direction: Direction) -> Port {
    Port {
        name: ArcStr::from(name),
        width: None,
        direction,
    }
}

fn bus(name: &str, width: usize, direction: Direction) -> Port {
    Port {
        name: ArcStr::from(name),
        width: Some(width),
        direction,
    }
}

/// Interface of the synthesized SAR logic for `n` cycles.
pub fn salogic(n: usize) -> ExternalModule {
    use Direction::*;
    let mut ports: Vec<Port> = [
        "seq_init",
        "seq_samp",
        "seq_comp",
        "seq_update",
        "en_init",
        "en_samp_p",
        "en_samp_n",
        "en_comp",
        "en_update",
        "dac_mode",
        "dac_diffcaps",
    ]
    .into_iter()
    .map(|name| port(name, Input))
    .collect();
    for name in ["dac_astate_p", "dac_bstate_p", "dac_astate_n", "dac_bstate_n"] {
        ports.push(bus(name, n, Input));
    }
    ports.push(port("comp_out_p", Input));
    ports.push(port("comp_out_n", Input));
    for name in [
        "clk_samp_p",
        "clk_samp_p_b",
        "clk_samp_n",
        "clk_samp_n_b",
        "clk_comp",
    ] {
        ports.push(port(name, Output));
    }
    for name in [
        "dac_state_p_main",
        "dac_state_p_diff",
        "dac_state_n_main",
        "dac_state_n_diff",
    ] {
        ports.push(bus(name, n, Output));
    }
    ports.push(port("vdd_d", InOut));
    ports.push(port("vss_d", InOut));

    ExternalModule {
        name: arcstr::literal!("salogic"),
        ports,
    }
}

pub struct Adc {
    name: ArcStr,
    params: AdcParams,
}

impl Component for Adc {
    type Params = AdcParams;

    fn new(params: &Self::Params, _ctx: &FridaCtx) -> Result<Self> {
        let n_bits = params.cdac.weights()?.len();
        if n_bits != params.n_cycles {
            return Err(FridaError::param_invalid(
                "adc",
                format!(
                    "{} SAR cycles cannot drive a {n_bits}-capacitor CDAC",
                    params.n_cycles
                ),
            ));
        }
        Ok(Self {
            name: module_name("adc", params)?,
            params: *params,
        })
    }

    fn name(&self) -> ArcStr {
        self.name.clone()
    }

    fn schematic(&self, ctx: &mut SchematicCtx) -> Result<()> {
        let n = self.params.n_cycles;
        let logic = Arc::new(salogic(n));

        let vin_p = ctx.port("vin_p", Direction::Input);
        let vin_n = ctx.port("vin_n", Direction::Input);
        let mut logic_inst = ctx.instantiate_external(&logic);
        for p in logic.ports.iter().take(11) {
            let sig = ctx.port(&p.name, Direction::Input);
            logic_inst.connect(p.name.clone(), &sig);
        }
        for name in ["dac_astate_p", "dac_bstate_p", "dac_astate_n", "dac_bstate_n"] {
            let b = ctx.bus_port(name, n, Direction::Input);
            logic_inst.connect_bus(name, &b);
        }
        let dac_state_p = ctx.bus_port("dac_state_p", n, Direction::Output);
        let dac_state_n = ctx.bus_port("dac_state_n", n, Direction::Output);
        let vdd_a = ctx.port("vdd_a", Direction::InOut);
        let vss_a = ctx.port("vss_a", Direction::InOut);
        let vdd_d = ctx.port("vdd_d", Direction::InOut);
        let vss_d = ctx.port("vss_d", Direction::InOut);

        let clk_samp_p = ctx.signal("clk_samp_p");
        let clk_samp_p_b = ctx.signal("clk_samp_p_b");
        let clk_samp_n = ctx.signal("clk_samp_n");
        let clk_samp_n_b = ctx.signal("clk_samp_n_b");
        let clk_comp = ctx.signal("clk_comp");
        let comp_out_p = ctx.signal("comp_out_p");
        let comp_out_n = ctx.signal("comp_out_n");
        let top_p = ctx.signal("cdac_top_p");
        let top_n = ctx.signal("cdac_top_n");
        let diff_p = ctx.bus("dac_state_p_diff", n);
        let diff_n = ctx.bus("dac_state_n_diff", n);

        logic_inst.connect_all([
            ("comp_out_p", &comp_out_p),
            ("comp_out_n", &comp_out_n),
            ("clk_samp_p", &clk_samp_p),
            ("clk_samp_p_b", &clk_samp_p_b),
            ("clk_samp_n", &clk_samp_n),
            ("clk_samp_n_b", &clk_samp_n_b),
            ("clk_comp", &clk_comp),
            ("vdd_d", &vdd_d),
            ("vss_d", &vss_d),
        ]);
        logic_inst.connect_bus("dac_state_p_main", &dac_state_p);
        logic_inst.connect_bus("dac_state_p_diff", &diff_p);
        logic_inst.connect_bus("dac_state_n_main", &dac_state_n);
        logic_inst.connect_bus("dac_state_n_diff", &diff_n);
        logic_inst.named("salogic").add_to(ctx);

        for (suffix, top, state) in [("p", &top_p, &dac_state_p), ("n", &top_n, &dac_state_n)] {
            let mut cdac = ctx.instantiate::<Cdac>(&self.params.cdac)?.with_connections([
                ("top", top),
                ("vdd", &vdd_a),
                ("vss", &vss_a),
            ]);
            cdac.connect_bus("dac", state);
            cdac.named(format!("cdac_{suffix}")).add_to(ctx);
        }

        for (suffix, din, dout, clk, clk_b) in [
            ("p", &vin_p, &top_p, &clk_samp_p, &clk_samp_p_b),
            ("n", &vin_n, &top_n, &clk_samp_n, &clk_samp_n_b),
        ] {
            ctx.instantiate::<Samp>(&self.params.samp)?
                .with_connections([
                    ("din", din),
                    ("dout", dout),
                    ("clk", clk),
                    ("clk_b", clk_b),
                    ("vdd", &vdd_a),
                    ("vss", &vss_a),
                ])
                .named(format!("samp_{suffix}"))
                .add_to(ctx);
        }

        // The comparator reuses the inverted positive sampling clock.
        ctx.instantiate::<Comp>(&self.params.comp)?
            .with_connections([
                ("inp", &top_p),
                ("inn", &top_n),
                ("outp", &comp_out_p),
                ("outn", &comp_out_n),
                ("clk", &clk_comp),
                ("clkb", &clk_samp_p_b),
                ("vdd", &vdd_a),
                ("vss", &vss_a),
            ])
            .named("comp")
            .add_to(ctx);

        Ok(())
    }
}
