use std::fmt::Write;

use crate::error::{FridaError, Result};
use crate::pdk::Include;
use crate::schematic::{Call, Instance, Module, Primitive};
use crate::sim::{Analysis, Meas, Save};
use crate::sim::waveform::format_pwl_points;
use crate::units::format_si;

use super::{ordered_nets, NetlistBackend, TOP_INSTANCE};

/// Spectre-language netlists.
pub struct SpectreBackend {
    out: String,
}

impl SpectreBackend {
    pub fn new() -> Self {
        Self {
            out: String::from("simulator lang=spectre\n"),
        }
    }

    fn analysis_inner(&mut self, analysis: &Analysis, indent: &str) -> Result<()> {
        match analysis {
            Analysis::Tran(t) => writeln!(
                self.out,
                "{indent}tran tran stop={} step={}",
                format_si(t.tstop),
                format_si(t.tstep)
            )?,
            Analysis::Op => writeln!(self.out, "{indent}dcOp dc")?,
            Analysis::MonteCarlo { config, inner } => {
                writeln!(
                    self.out,
                    "{indent}mc montecarlo numruns={} seed={} variations={} savefamilyplots=yes {{",
                    config.numruns,
                    config.seed,
                    config.variations.as_str()
                )?;
                let nested = format!("{indent}    ");
                for a in inner {
                    self.analysis_inner(a, &nested)?;
                }
                writeln!(self.out, "{indent}}}")?;
            }
        }
        Ok(())
    }
}

impl Default for SpectreBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NetlistBackend for SpectreBackend {
    fn comment(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "// {text}")?;
        Ok(())
    }

    fn include(&mut self, include: &Include) -> Result<()> {
        match &include.section {
            Some(section) => writeln!(
                self.out,
                "include \"{}\" section={section}",
                include.path.display()
            )?,
            None => writeln!(self.out, "include \"{}\"", include.path.display())?,
        }
        Ok(())
    }

    fn subcircuit(&mut self, module: &Module) -> Result<()> {
        let ports = module
            .port_bits()
            .iter()
            .map(|p| super::flat_net(p))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(self.out, "\nsubckt {} {ports}", module.name)?;
        Ok(())
    }

    fn end_subcircuit(&mut self, module: &Module) -> Result<()> {
        writeln!(self.out, "ends {}", module.name)?;
        Ok(())
    }

    fn instance(&mut self, instance: &Instance) -> Result<()> {
        let nets = ordered_nets(instance)?.join(" ");
        let name = &instance.name;
        match &instance.call {
            Call::Device(d) => {
                let params = d
                    .params
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(self.out, "    {name} ({nets}) {} {params}", d.device)?;
            }
            Call::Module(m) => writeln!(self.out, "    {name} ({nets}) {}", m.name)?,
            Call::External(e) => writeln!(self.out, "    {name} ({nets}) {}", e.name)?,
            Call::Primitive(p) => match p {
                Primitive::Capacitor { c } => {
                    writeln!(self.out, "    {name} ({nets}) capacitor c={c}")?
                }
                Primitive::Resistor { r } => {
                    writeln!(self.out, "    {name} ({nets}) resistor r={r}")?
                }
                Primitive::Vdc { dc } => writeln!(
                    self.out,
                    "    {name} ({nets}) vsource type=dc dc={}",
                    format_si(*dc)
                )?,
                Primitive::Vpulse(pulse) => writeln!(
                    self.out,
                    "    {name} ({nets}) vsource type=pulse val0={} val1={} delay={} rise={} fall={} width={} period={}",
                    format_si(pulse.v1),
                    format_si(pulse.v2),
                    format_si(pulse.delay),
                    format_si(pulse.rise),
                    format_si(pulse.fall),
                    format_si(pulse.width),
                    format_si(pulse.period),
                )?,
                Primitive::Vpwl(points) => writeln!(
                    self.out,
                    "    {name} ({nets}) vsource type=pwl wave=[ {} ]",
                    format_pwl_points(points)
                )?,
                Primitive::Mos(_) => {
                    return Err(FridaError::NetlistFormat(format!(
                        "MOS `{name}` was not mapped to a PDK device"
                    )))
                }
            },
        }
        Ok(())
    }

    fn top(&mut self, tb: &Module) -> Result<()> {
        let nets = tb
            .port_bits()
            .iter()
            .map(|p| if p.as_str() == "vss" { "0".to_string() } else { super::flat_net(p) })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(self.out, "\n{TOP_INSTANCE} ({nets}) {}", tb.name)?;
        Ok(())
    }

    fn temperature(&mut self, temp: f64) -> Result<()> {
        writeln!(self.out, "tempOption options temp={temp}")?;
        Ok(())
    }

    fn save(&mut self, save: &Save) -> Result<()> {
        match save {
            Save::All => writeln!(self.out, "saveOptions options save=all")?,
            Save::Signals(signals) => writeln!(self.out, "save {}", signals.join(" "))?,
        }
        Ok(())
    }

    fn analysis(&mut self, analysis: &Analysis) -> Result<()> {
        self.analysis_inner(analysis, "")
    }

    fn measurement(&mut self, meas: &Meas) -> Result<()> {
        // Spectre has no inline measurements; results are measured from the PSF data.
        log::debug!("measurement {} is computed after simulation", meas.name());
        Ok(())
    }

    fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::samp::{Samp, SampParams};
    use crate::netlist::write_hierarchy;
    use crate::pdk::PdkName;
    use crate::setup_ctx;
    use crate::sim::{MonteCarloConfig, TranAnalysis};

    #[test]
    fn test_samp_subckt() -> Result<()> {
        let ctx = setup_ctx(PdkName::Tsmc28);
        let module = ctx.rewrite(&ctx.generate::<Samp>(&SampParams::default())?)?;
        let mut backend = SpectreBackend::new();
        write_hierarchy(&mut backend, &module)?;
        let out = backend.finish();
        assert!(out.contains("subckt samp_nmos_10_1_low din dout clk clk_b vdd vss\n"));
        assert!(out.contains("    mn (dout clk din vss) nch_lvt_mac w=400n l=30n nf=1 m=1\n"));
        assert!(out.contains("ends samp_nmos_10_1_low\n"));
        Ok(())
    }

    #[test]
    fn test_nested_monte_carlo() -> Result<()> {
        let mut backend = SpectreBackend::new();
        backend.analysis(&Analysis::MonteCarlo {
            config: MonteCarloConfig::default(),
            inner: vec![Analysis::Tran(TranAnalysis {
                tstop: 500e-9,
                tstep: 100e-12,
            })],
        })?;
        assert_eq!(
            backend.finish(),
            "simulator lang=spectre\n\
             mc montecarlo numruns=10 seed=12345 variations=mismatch savefamilyplots=yes {\n    \
             tran tran stop=500n step=100p\n\
             }\n"
        );
        Ok(())
    }
}
