//! Structural Verilog view of a module hierarchy.
//!
//! Bus bits (`name[i]`) are regrouped into vectors, so every bus port and
//! bus signal is declared once with its range and connected with a
//! concatenation.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tera::Context;

use crate::error::Result;
use crate::schematic::{Call, Direction, Instance, Module, Port, Primitive};
use crate::TEMPLATES;

#[derive(Serialize)]
struct VerilogPort {
    dir: &'static str,
    range: Option<String>,
    name: String,
}

#[derive(Serialize)]
struct VerilogWire {
    range: Option<String>,
    name: String,
}

#[derive(Serialize)]
struct VerilogConn {
    pin: String,
    net: String,
}

#[derive(Serialize)]
struct VerilogInstance {
    cell: String,
    name: String,
    conns: Vec<VerilogConn>,
}

#[derive(Serialize)]
struct VerilogModule {
    name: String,
    blackbox: bool,
    ports: Vec<VerilogPort>,
    wires: Vec<VerilogWire>,
    instances: Vec<VerilogInstance>,
}

#[derive(Serialize)]
struct VerilogParams {
    top: String,
    modules: Vec<VerilogModule>,
}

/// Splits `name[i]` into `("name", i)`.
fn split_bit(name: &str) -> Option<(&str, usize)> {
    let (base, idx) = name.strip_suffix(']')?.split_once('[')?;
    Some((base, idx.parse().ok()?))
}

fn range(width: Option<usize>) -> Option<String> {
    width.map(|w| format!("[{}:0]", w.saturating_sub(1)))
}

fn dir(direction: Direction) -> &'static str {
    match direction {
        Direction::Input => "input",
        Direction::Output => "output",
        Direction::InOut => "inout",
    }
}

fn ports(ports: &[Port]) -> Vec<VerilogPort> {
    ports
        .iter()
        .map(|p| VerilogPort {
            dir: dir(p.direction),
            range: range(p.width),
            name: p.name.to_string(),
        })
        .collect()
}

/// Collapses per-bit signals into one wire per bus.
fn wires(signals: &[arcstr::ArcStr]) -> Vec<VerilogWire> {
    let mut out: Vec<VerilogWire> = Vec::new();
    let mut buses: BTreeMap<String, usize> = BTreeMap::new();
    for s in signals {
        match split_bit(s) {
            Some((base, i)) => {
                let width = buses.entry(base.to_string()).or_insert(0);
                *width = (*width).max(i + 1);
            }
            None => out.push(VerilogWire {
                range: None,
                name: s.to_string(),
            }),
        }
    }
    out.extend(buses.into_iter().map(|(name, width)| VerilogWire {
        range: range(Some(width)),
        name,
    }));
    out
}

fn cell_name(call: &Call) -> String {
    match call {
        Call::Device(d) => d.device.to_string(),
        Call::Module(m) => m.name.to_string(),
        Call::External(e) => e.name.to_string(),
        Call::Primitive(p) => match p {
            Primitive::Mos(_) => "mos",
            Primitive::Capacitor { .. } => "capacitor",
            Primitive::Resistor { .. } => "resistor",
            Primitive::Vdc { .. } => "vdc",
            Primitive::Vpulse(_) => "vpulse",
            Primitive::Vpwl(_) => "vpwl",
        }
        .to_string(),
    }
}

/// Connections grouped by pin; bus pins become MSB-first concatenations.
fn conns(inst: &Instance) -> Vec<VerilogConn> {
    let mut order: Vec<String> = Vec::new();
    let mut scalars: BTreeMap<String, String> = BTreeMap::new();
    let mut buses: BTreeMap<String, BTreeMap<usize, String>> = BTreeMap::new();
    for (pin, net) in inst.conns.iter() {
        let key = match split_bit(pin) {
            Some((base, i)) => {
                buses
                    .entry(base.to_string())
                    .or_default()
                    .insert(i, net.to_string());
                base.to_string()
            }
            None => {
                scalars.insert(pin.to_string(), net.to_string());
                pin.to_string()
            }
        };
        if !order.contains(&key) {
            order.push(key);
        }
    }
    order
        .into_iter()
        .map(|pin| {
            let net = match buses.remove(&pin) {
                Some(bits) => format!(
                    "{{{}}}",
                    bits.into_values().rev().collect::<Vec<_>>().join(", ")
                ),
                None => scalars.remove(&pin).unwrap_or_default(),
            };
            VerilogConn { pin, net }
        })
        .collect()
}

pub(super) fn render(module: &Arc<Module>) -> Result<String> {
    let mut modules: Vec<VerilogModule> = module
        .externals()
        .iter()
        .map(|e| VerilogModule {
            name: e.name.to_string(),
            blackbox: true,
            ports: ports(&e.ports),
            wires: Vec::new(),
            instances: Vec::new(),
        })
        .collect();
    modules.extend(module.dependency_order().iter().map(|m| VerilogModule {
        name: m.name.to_string(),
        blackbox: false,
        ports: ports(&m.ports),
        wires: wires(&m.signals),
        instances: m
            .instances
            .iter()
            .map(|inst| VerilogInstance {
                cell: cell_name(&inst.call),
                name: inst.name.to_string(),
                conns: conns(inst),
            })
            .collect(),
    }));

    let params = VerilogParams {
        top: module.name.to_string(),
        modules,
    };
    Ok(TEMPLATES.render("dut.v", &Context::from_serialize(params)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::adc::{Adc, AdcParams};
    use crate::blocks::cdac::{Cdac, CdacParams};
    use crate::pdk::PdkName;
    use crate::setup_ctx;

    #[test]
    fn test_split_bit() {
        assert_eq!(split_bit("dac[10]"), Some(("dac", 10)));
        assert_eq!(split_bit("dac"), None);
        assert_eq!(split_bit("dac[x]"), None);
    }

    #[test]
    fn test_cdac_verilog() -> Result<()> {
        let ctx = setup_ctx(PdkName::Generic);
        let module = ctx.rewrite(&ctx.generate::<Cdac>(&CdacParams::default())?)?;
        let text = render(&module)?;
        assert!(text.contains(&format!("module {} (", module.name)));
        assert!(text.contains("input [7:0] dac"));
        assert!(text.contains("nmos_lvt mn_buf_0 (.d(inter_0), .g(dac[0]), .s(vss), .b(vss));"));
        assert!(text.contains("endmodule"));
        Ok(())
    }

    #[test]
    fn test_adc_verilog() -> Result<()> {
        let ctx = setup_ctx(PdkName::Generic);
        let module = ctx.rewrite(&ctx.generate::<Adc>(&AdcParams::default())?)?;
        let text = render(&module)?;
        assert!(text.contains("(* blackbox *)\nmodule salogic ("));
        assert!(text.contains("wire [15:0] dac_state_p_diff;"));
        assert!(text.contains(".dac({dac_state_p[15], "));
        // Black boxes first, the top last.
        let top = text.rfind("module adc_").unwrap();
        assert!(text.find("module salogic").unwrap() < top);
        Ok(())
    }
}
