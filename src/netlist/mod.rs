//! Netlist and DUT export.
//!
//! Simulation netlists go through a [`NetlistBackend`]: model includes for
//! the process corner, every subcircuit leaves first, the top-level `xtop`
//! instance, then options, saves, analyses and measurements. DUT exports
//! write the subcircuits alone, or a YAML or structural Verilog view.

use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{FridaError, Result};
use crate::pdk::{Include, Pdk};
use crate::schematic::{FridaCtx, Instance, Module};
use crate::sim::{Analysis, Meas, Save, Sim, Simulator};

pub mod naming;
mod spectre;
mod spice;
mod verilog;
mod yaml;

pub use naming::{fingerprint, module_name, params_to_filename};
pub use spectre::SpectreBackend;
pub use spice::SpiceBackend;

/// Instance name of the testbench in every simulation netlist.
pub const TOP_INSTANCE: &str = "xtop";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DutFormat {
    Spectre,
    Ngspice,
    Yaml,
    Verilog,
}

impl DutFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DutFormat::Spectre => "scs",
            DutFormat::Ngspice => "sp",
            DutFormat::Yaml => "yaml",
            DutFormat::Verilog => "v",
        }
    }

    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext {
            "scs" => Ok(DutFormat::Spectre),
            "sp" => Ok(DutFormat::Ngspice),
            "yaml" => Ok(DutFormat::Yaml),
            "v" => Ok(DutFormat::Verilog),
            _ => Err(FridaError::Config(format!(
                "no DUT format for file extension `{ext}`"
            ))),
        }
    }

    /// Formats that carry only the DUT and cannot drive a simulator.
    pub fn is_dut_only(&self) -> bool {
        matches!(self, DutFormat::Yaml | DutFormat::Verilog)
    }
}

impl Display for DutFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DutFormat::Spectre => "spectre",
            DutFormat::Ngspice => "ngspice",
            DutFormat::Yaml => "yaml",
            DutFormat::Verilog => "verilog",
        };
        write!(f, "{s}")
    }
}

impl FromStr for DutFormat {
    type Err = FridaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "spectre" => Ok(DutFormat::Spectre),
            "ngspice" | "spice" => Ok(DutFormat::Ngspice),
            "yaml" => Ok(DutFormat::Yaml),
            "verilog" => Ok(DutFormat::Verilog),
            _ => Err(FridaError::Config(format!(
                "unknown netlist format `{s}`; expected one of spectre, ngspice, yaml, verilog"
            ))),
        }
    }
}

/// Simulator-specific netlist syntax.
pub trait NetlistBackend {
    fn comment(&mut self, text: &str) -> Result<()>;
    fn include(&mut self, include: &Include) -> Result<()>;
    fn subcircuit(&mut self, module: &Module) -> Result<()>;
    fn end_subcircuit(&mut self, module: &Module) -> Result<()>;
    fn instance(&mut self, instance: &Instance) -> Result<()>;
    /// Instantiates the testbench as [`TOP_INSTANCE`] with `vss` on ground.
    fn top(&mut self, tb: &Module) -> Result<()>;
    fn temperature(&mut self, temp: f64) -> Result<()>;
    fn save(&mut self, save: &Save) -> Result<()>;
    fn analysis(&mut self, analysis: &Analysis) -> Result<()>;
    fn measurement(&mut self, meas: &Meas) -> Result<()>;
    fn finish(self) -> String;
}

/// Writes every module below `module`, callees before callers.
pub fn write_hierarchy<B: NetlistBackend + ?Sized>(
    backend: &mut B,
    module: &Arc<Module>,
) -> Result<()> {
    for m in module.dependency_order() {
        backend.subcircuit(&m)?;
        for inst in m.instances.iter() {
            backend.instance(inst)?;
        }
        backend.end_subcircuit(&m)?;
    }
    Ok(())
}

/// Net names as written to SPICE-family netlists: `name[i]` becomes `name_i`.
pub(crate) fn flat_net(net: &str) -> String {
    match net.strip_suffix(']').and_then(|s| s.split_once('[')) {
        Some((base, idx)) => format!("{base}_{idx}"),
        None => net.to_string(),
    }
}

/// Pins of `instance` in call order, mapped to their nets.
pub(crate) fn ordered_nets(instance: &Instance) -> Result<Vec<String>> {
    instance
        .call
        .pins()
        .iter()
        .map(|pin| {
            instance.net(pin).map(|n| flat_net(n)).ok_or_else(|| {
                FridaError::NetlistFormat(format!(
                    "pin `{pin}` of `{}` is unconnected",
                    instance.name
                ))
            })
        })
        .collect()
}

fn render_sim<B: NetlistBackend>(mut backend: B, sim: &Sim, tb: &Arc<Module>, pdk: &Pdk) -> Result<String> {
    backend.comment(&format!(
        "{} at {} / {} / {}, pdk {}",
        sim.name(),
        sim.pvt.p,
        sim.pvt.v,
        sim.pvt.t,
        pdk.name
    ))?;
    for include in pdk.includes(sim.pvt.p)? {
        backend.include(&include)?;
    }
    if sim.is_monte_carlo() {
        let mc = pdk.mc_include()?.ok_or_else(|| {
            FridaError::Config(format!("PDK {} has no Monte Carlo models", pdk.name))
        })?;
        backend.include(&mc)?;
    }

    write_hierarchy(&mut backend, tb)?;
    backend.top(tb)?;

    if let Some(temp) = sim.temperature() {
        backend.temperature(temp)?;
    }
    for save in sim.saves.iter() {
        backend.save(save)?;
    }
    for analysis in sim.analyses.iter() {
        backend.analysis(analysis)?;
    }
    for meas in sim.meas.iter() {
        backend.measurement(meas)?;
    }
    Ok(backend.finish())
}

/// Rewrites the testbench through the active PDK and renders a full netlist.
pub fn netlist_sim(ctx: &FridaCtx, sim: &Sim, simulator: Simulator) -> Result<String> {
    if sim.is_monte_carlo() && !simulator.supports_monte_carlo() {
        return Err(FridaError::Config(format!(
            "{simulator} netlists cannot express Monte Carlo analyses"
        )));
    }
    let tb = ctx.rewrite(&sim.tb)?;
    let pdk = ctx.pdk();
    match simulator {
        Simulator::Spectre => render_sim(SpectreBackend::new(), sim, &tb, pdk),
        Simulator::Ngspice | Simulator::Xyce => {
            render_sim(SpiceBackend::new(simulator), sim, &tb, pdk)
        }
    }
}

/// Writes `contents` next to `path` and renames it into place.
pub fn write_atomic(path: impl AsRef<Path>, contents: &str) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, contents)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn write_sim_netlist(
    ctx: &FridaCtx,
    sim: &Sim,
    simulator: Simulator,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let netlist = netlist_sim(ctx, sim, simulator)?;
    write_atomic(path, &netlist)?;
    log::debug!("wrote {simulator} netlist {path:?}");
    Ok(())
}

/// Renders an already rewritten module in a DUT-only form.
pub fn render_module(module: &Arc<Module>, pdk: &Pdk, format: DutFormat) -> Result<String> {
    let header = format!("{} for pdk {}", module.name, pdk.name);
    match format {
        DutFormat::Spectre => {
            let mut backend = SpectreBackend::new();
            backend.comment(&header)?;
            write_hierarchy(&mut backend, module)?;
            Ok(backend.finish())
        }
        DutFormat::Ngspice => {
            let mut backend = SpiceBackend::library();
            backend.comment(&header)?;
            write_hierarchy(&mut backend, module)?;
            Ok(backend.finish())
        }
        DutFormat::Yaml => yaml::render(module, pdk),
        DutFormat::Verilog => verilog::render(module),
    }
}

pub fn write_module_to_file(
    module: &Arc<Module>,
    pdk: &Pdk,
    format: DutFormat,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let contents = render_module(module, pdk, format)?;
    write_atomic(path, &contents)?;
    log::debug!("wrote {format} export of {} to {path:?}", module.name);
    Ok(())
}
