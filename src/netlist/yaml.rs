//! Language-neutral circuit export.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::Result;
use crate::pdk::Pdk;
use crate::schematic::{Call, Module, Port, Primitive};

#[derive(Serialize)]
struct CircuitDoc<'a> {
    top: &'a str,
    pdk: &'a str,
    externals: Vec<ExternalDoc<'a>>,
    modules: Vec<ModuleDoc<'a>>,
}

#[derive(Serialize)]
struct ExternalDoc<'a> {
    name: &'a str,
    ports: &'a [Port],
}

#[derive(Serialize)]
struct ModuleDoc<'a> {
    name: &'a str,
    ports: &'a [Port],
    signals: Vec<&'a str>,
    instances: Vec<InstanceDoc<'a>>,
}

#[derive(Serialize)]
struct InstanceDoc<'a> {
    name: &'a str,
    of: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
    conns: Vec<(&'a str, &'a str)>,
}

fn instance_doc(inst: &crate::schematic::Instance) -> InstanceDoc<'_> {
    let mut params = BTreeMap::new();
    let (of, kind) = match &inst.call {
        Call::Device(d) => {
            for (k, v) in d.params.iter() {
                params.insert(k.to_string(), v.to_string());
            }
            (d.device.to_string(), "device")
        }
        Call::Module(m) => (m.name.to_string(), "module"),
        Call::External(e) => (e.name.to_string(), "external"),
        Call::Primitive(p) => {
            let of = match p {
                Primitive::Mos(_) => "mos",
                Primitive::Capacitor { c } => {
                    params.insert("c".to_string(), c.to_string());
                    "capacitor"
                }
                Primitive::Resistor { r } => {
                    params.insert("r".to_string(), r.to_string());
                    "resistor"
                }
                Primitive::Vdc { dc } => {
                    params.insert("dc".to_string(), dc.to_string());
                    "vdc"
                }
                Primitive::Vpulse(_) => "vpulse",
                Primitive::Vpwl(_) => "vpwl",
            };
            (of.to_string(), "primitive")
        }
    };
    InstanceDoc {
        name: &inst.name,
        of,
        kind,
        params,
        conns: inst
            .conns
            .iter()
            .map(|(p, n)| (p.as_str(), n.as_str()))
            .collect(),
    }
}

pub(super) fn render(module: &Arc<Module>, pdk: &Pdk) -> Result<String> {
    let externals = module.externals();
    let order = module.dependency_order();
    let doc = CircuitDoc {
        top: &module.name,
        pdk: pdk.name.as_str(),
        externals: externals
            .iter()
            .map(|e| ExternalDoc {
                name: &e.name,
                ports: &e.ports,
            })
            .collect(),
        modules: order
            .iter()
            .map(|m| ModuleDoc {
                name: &m.name,
                ports: &m.ports,
                signals: m.signals.iter().map(|s| s.as_str()).collect(),
                instances: m.instances.iter().map(instance_doc).collect(),
            })
            .collect(),
    };
    Ok(serde_yaml::to_string(&doc)?)
}
