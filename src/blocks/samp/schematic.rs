use crate::pdk::MosType;
use crate::schematic::{Direction, MosParams};

use super::*;

impl Samp {
    pub(crate) fn schematic(&self, ctx: &mut SchematicCtx) -> Result<()> {
        let SampParams {
            switch_type,
            w,
            l,
            vth,
        } = self.params;

        let din = ctx.port("din", Direction::Input);
        let dout = ctx.port("dout", Direction::Output);
        let clk = ctx.port("clk", Direction::Input);
        let clk_b = ctx.port("clk_b", Direction::Input);
        let vdd = ctx.port("vdd", Direction::InOut);
        let vss = ctx.port("vss", Direction::InOut);

        if matches!(switch_type, SwitchType::Nmos | SwitchType::Tgate) {
            ctx.add_mos(
                "mn",
                MosParams::new(MosType::Nmos, vth, w, l),
                [&dout, &clk, &din, &vss],
            );
        }
        if matches!(switch_type, SwitchType::Pmos | SwitchType::Tgate) {
            ctx.add_mos(
                "mp",
                MosParams::new(MosType::Pmos, vth, w, l),
                [&dout, &clk_b, &din, &vdd],
            );
        }

        Ok(())
    }
}
