use std::fmt::Write;

use crate::error::{FridaError, Result};
use crate::pdk::Include;
use crate::schematic::{Call, DeviceKind, Instance, Module, Primitive};
use crate::sim::waveform::format_pwl_points;
use crate::sim::{Analysis, Meas, Save, Simulator};
use crate::units::format_si;

use super::{flat_net, ordered_nets, NetlistBackend, TOP_INSTANCE};

/// SPICE netlists for ngspice and Xyce.
///
/// Element names take the letter their kind requires unless they already
/// start with it, so `mn` stays `mn` while a module instance `dut` becomes
/// `Xdut`.
pub struct SpiceBackend {
    out: String,
    simulator: Simulator,
    standalone: bool,
}

fn element_name(prefix: char, name: &str) -> String {
    match name.chars().next() {
        Some(c) if c.eq_ignore_ascii_case(&prefix) => name.to_string(),
        _ => format!("{prefix}{name}"),
    }
}

fn node_voltage(signal: &str) -> String {
    format!("V({signal})")
}

impl SpiceBackend {
    /// A complete simulation deck, terminated by `.end`.
    pub fn new(simulator: Simulator) -> Self {
        Self {
            out: String::new(),
            simulator,
            standalone: true,
        }
    }

    /// A subcircuit library with no title line or `.end`.
    pub fn library() -> Self {
        Self {
            out: String::new(),
            simulator: Simulator::Ngspice,
            standalone: false,
        }
    }

    fn title_if_empty(&mut self, text: &str) -> Result<bool> {
        // The first line of a SPICE deck is always the title.
        if self.standalone && self.out.is_empty() {
            writeln!(self.out, "* {text}")?;
            return Ok(true);
        }
        Ok(false)
    }
}

impl NetlistBackend for SpiceBackend {
    fn comment(&mut self, text: &str) -> Result<()> {
        if !self.title_if_empty(text)? {
            writeln!(self.out, "* {text}")?;
        }
        Ok(())
    }

    fn include(&mut self, include: &Include) -> Result<()> {
        match &include.section {
            Some(section) => writeln!(self.out, ".lib \"{}\" {section}", include.path.display())?,
            None => writeln!(self.out, ".include \"{}\"", include.path.display())?,
        }
        Ok(())
    }

    fn subcircuit(&mut self, module: &Module) -> Result<()> {
        let ports = module
            .port_bits()
            .iter()
            .map(|p| flat_net(p))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(self.out, "\n.subckt {} {ports}", module.name)?;
        Ok(())
    }

    fn end_subcircuit(&mut self, module: &Module) -> Result<()> {
        writeln!(self.out, ".ends {}", module.name)?;
        Ok(())
    }

    fn instance(&mut self, instance: &Instance) -> Result<()> {
        let nets = ordered_nets(instance)?.join(" ");
        let name = instance.name.as_str();
        match &instance.call {
            Call::Device(d) => {
                let prefix = match d.kind {
                    DeviceKind::Model => 'M',
                    DeviceKind::Subckt => 'X',
                };
                let params = d
                    .params
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(
                    self.out,
                    "{} {nets} {} {params}",
                    element_name(prefix, name),
                    d.device
                )?;
            }
            Call::Module(m) => {
                writeln!(self.out, "{} {nets} {}", element_name('X', name), m.name)?
            }
            Call::External(e) => {
                writeln!(self.out, "{} {nets} {}", element_name('X', name), e.name)?
            }
            Call::Primitive(p) => match p {
                Primitive::Capacitor { c } => {
                    writeln!(self.out, "{} {nets} {c}", element_name('C', name))?
                }
                Primitive::Resistor { r } => {
                    writeln!(self.out, "{} {nets} {r}", element_name('R', name))?
                }
                Primitive::Vdc { dc } => writeln!(
                    self.out,
                    "{} {nets} DC {}",
                    element_name('V', name),
                    format_si(*dc)
                )?,
                Primitive::Vpulse(pulse) => writeln!(
                    self.out,
                    "{} {nets} PULSE({} {} {} {} {} {} {})",
                    element_name('V', name),
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
                    "{} {nets} PWL({})",
                    element_name('V', name),
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
            .map(|p| if p.as_str() == "vss" { "0".to_string() } else { flat_net(p) })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(self.out, "\n{TOP_INSTANCE} {nets} {}", tb.name)?;
        Ok(())
    }

    fn temperature(&mut self, temp: f64) -> Result<()> {
        match self.simulator {
            Simulator::Xyce => writeln!(self.out, ".options device temp={temp}")?,
            _ => writeln!(self.out, ".temp {temp}")?,
        }
        Ok(())
    }

    fn save(&mut self, save: &Save) -> Result<()> {
        // Xyce writes every node to the rawfile requested with `-r`.
        if self.simulator == Simulator::Xyce {
            return Ok(());
        }
        match save {
            Save::All => writeln!(self.out, ".save all")?,
            Save::Signals(signals) => writeln!(
                self.out,
                ".save {}",
                signals.iter().map(|s| node_voltage(s)).collect::<Vec<_>>().join(" ")
            )?,
        }
        Ok(())
    }

    fn analysis(&mut self, analysis: &Analysis) -> Result<()> {
        match analysis {
            Analysis::Tran(t) => writeln!(
                self.out,
                ".tran {} {}",
                format_si(t.tstep),
                format_si(t.tstop)
            )?,
            Analysis::Op => writeln!(self.out, ".op")?,
            Analysis::MonteCarlo { .. } => {
                return Err(FridaError::Config(format!(
                    "{} netlists cannot express Monte Carlo analyses",
                    self.simulator
                )))
            }
        }
        Ok(())
    }

    fn measurement(&mut self, meas: &Meas) -> Result<()> {
        match meas {
            Meas::When {
                name,
                signal,
                reference,
                factor,
                edge,
                count,
            } => writeln!(
                self.out,
                ".meas tran {name} WHEN {}='{factor}*{}' {}={count}",
                node_voltage(signal),
                node_voltage(reference),
                edge.as_str()
            )?,
            Meas::Delay {
                name,
                trig,
                trig_val,
                targ,
                targ_val,
                edge,
            } => writeln!(
                self.out,
                ".meas tran {name} TRIG {} VAL={trig_val} {edge}=1 TARG {} VAL={targ_val} {edge}=1",
                node_voltage(trig),
                node_voltage(targ),
                edge = edge.as_str()
            )?,
        }
        Ok(())
    }

    fn finish(mut self) -> String {
        if self.standalone {
            self.out.push_str(".end\n");
        }
        self.out
    }
}
