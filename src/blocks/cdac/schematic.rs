use rust_decimal::Decimal;

use crate::pdk::MosType;
use crate::schematic::{Direction, MosParams};

use super::*;

/// Driver width multiplier for a capacitor of weight `w`.
pub(crate) fn driver_width(w: u64) -> i64 {
    ((w as f64).sqrt().round() as i64).max(1) * 10
}

impl Cdac {
    pub(crate) fn schematic(&self, ctx: &mut SchematicCtx) -> Result<()> {
        let p = &self.params;
        match p.split_strat {
            SplitStrat::NoSplit => {}
            other => log::warn!(
                "{}: split strategy {other:?} is not implemented, building without split",
                self.name
            ),
        }

        let top = ctx.port("top", Direction::Output);
        let vdd = ctx.port("vdd", Direction::InOut);
        let vss = ctx.port("vss", Direction::InOut);
        let dac = ctx.bus_port("dac", self.weights.len(), Direction::Input);

        let buf_n = MosParams::new(MosType::Nmos, p.vth, 10, 1);
        let buf_p = MosParams::new(MosType::Pmos, p.vth, 10, 1);

        for (i, &w) in self.weights.iter().enumerate() {
            let inter = ctx.signal(format!("inter_{i}"));
            let bot = ctx.signal(format!("bot_{i}"));
            let gate = dac.index(i);

            ctx.add_mos(&format!("mp_buf_{i}"), buf_p.clone(), [&inter, gate, &vdd, &vdd]);
            ctx.add_mos(&format!("mn_buf_{i}"), buf_n.clone(), [&inter, gate, &vss, &vss]);

            let drv_w = driver_width(w);
            ctx.add_mos(
                &format!("mp_drv_{i}"),
                MosParams::new(MosType::Pmos, p.vth, drv_w, 1),
                [&bot, &inter, &vdd, &vdd],
            );
            ctx.add_mos(
                &format!("mn_drv_{i}"),
                MosParams::new(MosType::Nmos, p.vth, drv_w, 1),
                [&bot, &inter, &vss, &vss],
            );

            ctx.add_cap(&format!("c_{i}"), p.unit_cap.scaled(Decimal::from(w)), &top, &bot);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_width() {
        assert_eq!(driver_width(1), 10);
        assert_eq!(driver_width(2), 10);
        assert_eq!(driver_width(12), 30);
        assert_eq!(driver_width(768), 280);
    }
}
