use crate::pdk::MosType;
use crate::schematic::{Direction, MosParams, Signal};
use crate::units::SiValue;

use super::*;

/// Nets shared by the preamp and latch builders.
struct CompNets {
    outp: Signal,
    outn: Signal,
    clk: Signal,
    clkb: Signal,
    vdd: Signal,
    vss: Signal,
    outp_int: Signal,
    outn_int: Signal,
}

/// Device types, rails and clock phases for one input polarity.
///
/// Everything is described for an NMOS input pair and mirrored for PMOS.
struct Polarity {
    /// Type of the input pair and the devices stacked with it.
    bot: MosType,
    /// Type of the reset loads and the devices stacked with them.
    top: MosType,
    bot_rail: Signal,
    top_rail: Signal,
    clk_on: Signal,
    clk_off: Signal,
}

impl Polarity {
    fn new(diffpair: PreampDiffpair, nets: &CompNets) -> Self {
        match diffpair {
            PreampDiffpair::NmosInput => Self {
                bot: MosType::Nmos,
                top: MosType::Pmos,
                bot_rail: nets.vss.clone(),
                top_rail: nets.vdd.clone(),
                clk_on: nets.clk.clone(),
                clk_off: nets.clkb.clone(),
            },
            PreampDiffpair::PmosInput => Self {
                bot: MosType::Pmos,
                top: MosType::Nmos,
                bot_rail: nets.vdd.clone(),
                top_rail: nets.vss.clone(),
                clk_on: nets.clkb.clone(),
                clk_off: nets.clk.clone(),
            },
        }
    }
}

impl Comp {
    pub(crate) fn schematic(&self, ctx: &mut SchematicCtx) -> Result<()> {
        let inp = ctx.port("inp", Direction::Input);
        let inn = ctx.port("inn", Direction::Input);
        let outp = ctx.port("outp", Direction::Output);
        let outn = ctx.port("outn", Direction::Output);
        let clk = ctx.port("clk", Direction::Input);
        let clkb = ctx.port("clkb", Direction::Input);
        let vdd = ctx.port("vdd", Direction::InOut);
        let vss = ctx.port("vss", Direction::InOut);

        let nets = CompNets {
            outp,
            outn,
            clk,
            clkb,
            vdd,
            vss,
            outp_int: ctx.signal("outp_int"),
            outn_int: ctx.signal("outn_int"),
        };
        let pol = Polarity::new(self.params.preamp_diffpair, &nets);

        self.preamp(ctx, &nets, &pol, &inp, &inn);
        match self.params.comp_stages {
            CompStages::SingleStage => self.single_stage_latch(ctx, &nets, &pol),
            CompStages::DoubleStage => self.double_stage_latch(ctx, &nets, &pol),
        }
        Ok(())
    }

    fn preamp(
        &self,
        ctx: &mut SchematicCtx,
        nets: &CompNets,
        pol: &Polarity,
        inp: &Signal,
        inn: &Signal,
    ) {
        let p = &self.params;
        let tail = ctx.signal("tail");

        let diff = MosParams::new(pol.bot, p.diffpair_vth, p.diffpair_w, p.diffpair_l);
        ctx.add_mos(
            "mdiff_p",
            diff.clone(),
            [&nets.outn_int, inp, &tail, &pol.bot_rail],
        );
        ctx.add_mos(
            "mdiff_n",
            diff,
            [&nets.outp_int, inn, &tail, &pol.bot_rail],
        );

        let tail_mos = MosParams::new(pol.bot, p.tail_vth, p.tail_w, p.tail_l);
        match p.preamp_bias {
            PreampBias::StdBias => {
                ctx.add_mos(
                    "mtail",
                    tail_mos,
                    [&tail, &pol.clk_on, &pol.bot_rail, &pol.bot_rail],
                );
            }
            PreampBias::DynBias => {
                let vcap = ctx.signal("vcap");
                ctx.add_mos(
                    "mtail",
                    tail_mos.clone(),
                    [&tail, &pol.clk_on, &vcap, &pol.bot_rail],
                );
                ctx.add_mos(
                    "mbias",
                    tail_mos,
                    [&vcap, &pol.clk_on, &pol.bot_rail, &pol.bot_rail],
                );
                ctx.add_cap("cbias", SiValue::femto(1), &vcap, &pol.top_rail);
            }
        }

        let rst = MosParams::new(pol.top, p.rst_vth, p.rst_w, 1);
        ctx.add_mos(
            "mrst_p",
            rst.clone(),
            [&nets.outn_int, &pol.clk_on, &pol.top_rail, &pol.top_rail],
        );
        ctx.add_mos(
            "mrst_n",
            rst,
            [&nets.outp_int, &pol.clk_on, &pol.top_rail, &pol.top_rail],
        );
    }

    fn single_stage_latch(&self, ctx: &mut SchematicCtx, nets: &CompNets, pol: &Polarity) {
        let p = &self.params;
        let top = MosParams::new(pol.top, p.latch_vth, p.latch_w, 1);
        let bot = MosParams::new(pol.bot, p.latch_vth, p.latch_w, 1);
        let (outp_int, outn_int) = (&nets.outp_int, &nets.outn_int);

        ctx.add_mos(
            "ma_p",
            top.clone(),
            [outn_int, outp_int, &pol.top_rail, &pol.top_rail],
        );
        ctx.add_mos(
            "ma_n",
            top.clone(),
            [outp_int, outn_int, &pol.top_rail, &pol.top_rail],
        );
        ctx.add_mos(
            "mb_p",
            bot.clone(),
            [outn_int, outp_int, &pol.bot_rail, &pol.bot_rail],
        );
        ctx.add_mos(
            "mb_n",
            bot,
            [outp_int, outn_int, &pol.bot_rail, &pol.bot_rail],
        );
        ctx.add_mos(
            "mlatch_rst_p",
            top.clone(),
            [outn_int, &pol.clk_on, &pol.top_rail, &pol.top_rail],
        );
        ctx.add_mos(
            "mlatch_rst_n",
            top,
            [outp_int, &pol.clk_on, &pol.top_rail, &pol.top_rail],
        );

        self.output_buffers(ctx, nets, outn_int, outp_int);
    }

    /// Regenerative latch behind the preamp, on its own virtual rails.
    ///
    /// `latch_vdd` and `latch_vss` name the rails of the NMOS-input form; for a
    /// PMOS input they sit next to vss and vdd respectively. A signalled gate
    /// is driven by the latch nodes themselves rather than by a clock.
    fn double_stage_latch(&self, ctx: &mut SchematicCtx, nets: &CompNets, pol: &Polarity) {
        let p = &self.params;
        let top = MosParams::new(pol.top, p.latch_vth, p.latch_w, 1);
        let bot = MosParams::new(pol.bot, p.latch_vth, p.latch_w, 1);

        let latch_p = ctx.signal("latch_p");
        let latch_n = ctx.signal("latch_n");
        let latch_vdd = ctx.signal("latch_vdd");
        let latch_vss = ctx.signal("latch_vss");

        ctx.add_mos(
            "mla_p",
            top.clone(),
            [&latch_n, &latch_p, &latch_vdd, &pol.top_rail],
        );
        ctx.add_mos(
            "mla_n",
            top.clone(),
            [&latch_p, &latch_n, &latch_vdd, &pol.top_rail],
        );
        ctx.add_mos(
            "mlb_p",
            bot.clone(),
            [&latch_n, &latch_p, &latch_vss, &pol.bot_rail],
        );
        ctx.add_mos(
            "mlb_n",
            bot.clone(),
            [&latch_p, &latch_n, &latch_vss, &pol.bot_rail],
        );

        ctx.add_mos(
            "mconn_p",
            bot.clone(),
            [&latch_n, &nets.outn_int, &pol.bot_rail, &pol.bot_rail],
        );
        ctx.add_mos(
            "mconn_n",
            bot.clone(),
            [&latch_p, &nets.outp_int, &pol.bot_rail, &pol.bot_rail],
        );

        // Bottom-side nodes the internal reset discharges into, one per side.
        let rst_sources = match p.latch_pwrgate_node {
            LatchPwrgateNode::External => {
                let (gate_p, gate_n) = match p.latch_pwrgate_ctl {
                    LatchPwrgateCtl::Clocked => (&pol.clk_on, &pol.clk_on),
                    LatchPwrgateCtl::Signalled => (&latch_n, &latch_p),
                };
                ctx.add_mos(
                    "mpg_ext_p",
                    top.clone(),
                    [&latch_vdd, gate_p, &pol.top_rail, &pol.top_rail],
                );
                ctx.add_mos(
                    "mpg_ext_n",
                    top.clone(),
                    [&latch_vdd, gate_n, &pol.top_rail, &pol.top_rail],
                );

                let rst_gates = match p.latch_rst_extern_ctl {
                    LatchRstExternCtl::Clocked => Some((&pol.clk_off, &pol.clk_off)),
                    LatchRstExternCtl::Signalled => Some((&latch_n, &latch_p)),
                    LatchRstExternCtl::NoReset => None,
                };
                if let Some((gate_p, gate_n)) = rst_gates {
                    ctx.add_mos(
                        "mrst_ext_p",
                        top.clone(),
                        [&latch_n, gate_p, &latch_vdd, &pol.top_rail],
                    );
                    ctx.add_mos(
                        "mrst_ext_n",
                        top,
                        [&latch_p, gate_n, &latch_vdd, &pol.top_rail],
                    );
                }

                // The bottom virtual rail is tied on through always-on devices.
                for name in ["mvss_conn_p", "mvss_conn_n"] {
                    ctx.add_mos(
                        name,
                        bot.clone(),
                        [&latch_vss, &pol.top_rail, &pol.bot_rail, &pol.bot_rail],
                    );
                }
                None
            }
            LatchPwrgateNode::Internal => {
                for name in ["mvdd_conn_p", "mvdd_conn_n"] {
                    ctx.add_mos(
                        name,
                        top.clone(),
                        [&latch_vdd, &pol.bot_rail, &pol.top_rail, &pol.top_rail],
                    );
                }
                match p.latch_pwrgate_ctl {
                    LatchPwrgateCtl::Clocked => {
                        ctx.add_mos(
                            "mpg_int",
                            bot.clone(),
                            [&latch_vss, &pol.clk_on, &pol.bot_rail, &pol.bot_rail],
                        );
                        None
                    }
                    LatchPwrgateCtl::Signalled => {
                        let vss_p = ctx.signal("latch_vss_p");
                        let vss_n = ctx.signal("latch_vss_n");
                        ctx.add_mos(
                            "mpg_int_p",
                            bot.clone(),
                            [&vss_p, &latch_p, &pol.bot_rail, &pol.bot_rail],
                        );
                        ctx.add_mos(
                            "mpg_int_n",
                            bot.clone(),
                            [&vss_n, &latch_n, &pol.bot_rail, &pol.bot_rail],
                        );
                        Some((vss_p, vss_n))
                    }
                }
            }
        };

        let (gate_p, gate_n) = match p.latch_rst_intern_ctl {
            LatchRstInternCtl::Clocked => (&pol.clk_off, &pol.clk_off),
            LatchRstInternCtl::Signalled => (&latch_n, &latch_p),
        };
        match &rst_sources {
            // Stacked on the split power gate.
            Some((vss_p, vss_n)) => {
                ctx.add_mos(
                    "mrst_int_p",
                    bot.clone(),
                    [&latch_vss, gate_p, vss_p, &pol.bot_rail],
                );
                ctx.add_mos(
                    "mrst_int_n",
                    bot,
                    [&latch_vss, gate_n, vss_n, &pol.bot_rail],
                );
            }
            None => {
                ctx.add_mos(
                    "mrst_int_p",
                    bot.clone(),
                    [&latch_n, gate_p, &latch_vss, &pol.bot_rail],
                );
                ctx.add_mos(
                    "mrst_int_n",
                    bot,
                    [&latch_p, gate_n, &latch_vss, &pol.bot_rail],
                );
            }
        }

        self.output_buffers(ctx, nets, &latch_n, &latch_p);
    }

    /// Inverters driving `outp` from `drive_p` and `outn` from `drive_n`.
    fn output_buffers(
        &self,
        ctx: &mut SchematicCtx,
        nets: &CompNets,
        drive_p: &Signal,
        drive_n: &Signal,
    ) {
        let p = &self.params;
        let pmos = MosParams::new(MosType::Pmos, p.latch_vth, p.latch_w, 1);
        let nmos = MosParams::new(MosType::Nmos, p.latch_vth, p.latch_w, 1);
        for (suffix, out, drive) in [("outp", &nets.outp, drive_p), ("outn", &nets.outn, drive_n)] {
            ctx.add_mos(
                &format!("mbuf_{suffix}_top"),
                pmos.clone(),
                [out, drive, &nets.vdd, &nets.vdd],
            );
            ctx.add_mos(
                &format!("mbuf_{suffix}_bot"),
                nmos.clone(),
                [out, drive, &nets.vss, &nets.vss],
            );
        }
    }
}
