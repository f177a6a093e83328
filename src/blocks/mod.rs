use arcstr::ArcStr;
use serde::Serialize;

use crate::config::Pvt;
use crate::error::Result;
use crate::netlist::fingerprint;
use crate::schematic::{FridaCtx, SchematicCtx};

pub mod adc;
pub mod cdac;
pub mod comp;
pub mod samp;

/// A parameterized circuit generator.
///
/// [`Component::name`] must be unique per parameter value: it keys the
/// module cache and becomes the emitted subcircuit name.
pub trait Component: Sized {
    type Params: Serialize;

    fn new(params: &Self::Params, ctx: &FridaCtx) -> Result<Self>;

    fn name(&self) -> ArcStr;

    fn schematic(&self, ctx: &mut SchematicCtx) -> Result<()>;
}

/// Testbench module name: `{dut}_tb` followed by the corner tags and any
/// stimulus parameters.
pub(crate) fn testbench_name<E: Serialize>(dut: &str, pvt: &Pvt, extra: &E) -> Result<ArcStr> {
    let mut name = format!("{dut}_tb");
    for part in [fingerprint(pvt)?, fingerprint(extra)?] {
        if !part.is_empty() {
            name.push('_');
            name.push_str(&part);
        }
    }
    Ok(ArcStr::from(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdk::PdkName;
    use crate::setup_ctx;

    fn generate_twice<T: Component>(params: &[T::Params]) -> Result<()> {
        for p in params {
            let a = setup_ctx(PdkName::Tsmc65);
            let b = setup_ctx(PdkName::Tsmc65);
            let (ma, mb) = (a.generate::<T>(p)?, b.generate::<T>(p)?);
            assert_eq!(ma, mb);
            assert_eq!(a.rewrite(&ma)?, b.rewrite(&mb)?);
        }
        Ok(())
    }

    #[test]
    fn test_generators_are_deterministic() -> Result<()> {
        let samp = samp::variants(&Default::default());
        let comp = comp::variants(&Default::default());
        let cdac = cdac::variants(&Default::default());
        generate_twice::<samp::Samp>(&samp[..samp.len().min(4)])?;
        generate_twice::<comp::Comp>(&comp[..comp.len().min(4)])?;
        generate_twice::<cdac::Cdac>(&cdac[..cdac.len().min(4)])?;
        generate_twice::<adc::Adc>(&[adc::AdcParams::default()])?;
        Ok(())
    }
}
