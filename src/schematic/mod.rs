//! Device-level circuit model.
//!
//! A [`Module`] owns its ports, internal signals and instances. Instances
//! call a generic [`Primitive`], a PDK [`DeviceCall`], a child [`Module`] or
//! an [`ExternalModule`]. All connections are stored per bit: bus ports
//! expand to `name[i]` pins.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::bus_bit;
use crate::pdk::{MosType, MosVth};
use crate::units::SiValue;

pub mod context;
pub mod rewrite;

pub use context::{Bus, FridaCtx, SchematicCtx, Signal};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
    InOut,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Port {
    pub name: ArcStr,
    /// `None` for a scalar port.
    pub width: Option<usize>,
    pub direction: Direction,
}

impl Port {
    pub fn bits(&self) -> Vec<ArcStr> {
        match self.width {
            None => vec![self.name.clone()],
            Some(width) => (0..width)
                .map(|i| ArcStr::from(bus_bit(&self.name, i)))
                .collect(),
        }
    }
}

/// Generic MOS parameters.
///
/// Dimensions are resolved against the active PDK during rewrite; see
/// [`crate::units::scale_dimension`].
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MosParams {
    pub tp: Option<MosType>,
    pub vth: Option<MosVth>,
    pub w: Option<SiValue>,
    pub l: Option<SiValue>,
    pub nf: Option<u32>,
    pub mult: Option<u32>,
}

impl MosParams {
    /// A device sized in multiples of the PDK minimum width and length.
    pub fn new(tp: MosType, vth: MosVth, w: i64, l: i64) -> Self {
        Self {
            tp: Some(tp),
            vth: Some(vth),
            w: Some(SiValue::unit(w)),
            l: Some(SiValue::unit(l)),
            nf: None,
            mult: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseParams {
    pub v1: f64,
    pub v2: f64,
    pub delay: f64,
    pub rise: f64,
    pub fall: f64,
    pub width: f64,
    pub period: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Mos,
    Capacitor,
    Resistor,
    Vdc,
    Vpulse,
    Vpwl,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Mos(MosParams),
    Capacitor { c: SiValue },
    Resistor { r: SiValue },
    Vdc { dc: f64 },
    Vpulse(PulseParams),
    /// Piecewise-linear voltage source given as `(t, v)` points.
    Vpwl(Arc<Vec<(f64, f64)>>),
}

const MOS_PINS: [&str; 4] = ["d", "g", "s", "b"];
const TWO_TERMINAL_PINS: [&str; 2] = ["p", "n"];

impl Primitive {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Mos(_) => PrimitiveKind::Mos,
            Primitive::Capacitor { .. } => PrimitiveKind::Capacitor,
            Primitive::Resistor { .. } => PrimitiveKind::Resistor,
            Primitive::Vdc { .. } => PrimitiveKind::Vdc,
            Primitive::Vpulse(_) => PrimitiveKind::Vpulse,
            Primitive::Vpwl(_) => PrimitiveKind::Vpwl,
        }
    }

    pub fn pins(&self) -> &'static [&'static str] {
        match self {
            Primitive::Mos(_) => &MOS_PINS,
            _ => &TWO_TERMINAL_PINS,
        }
    }
}

fn float_bits(x: f64) -> u64 {
    if x == 0.0 {
        0
    } else {
        x.to_bits()
    }
}

// Primitive calls key the rewrite memo, so they hash by value.
impl Eq for Primitive {}

impl Hash for Primitive {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Primitive::Mos(p) => p.hash(state),
            Primitive::Capacitor { c } => c.hash(state),
            Primitive::Resistor { r } => r.hash(state),
            Primitive::Vdc { dc } => float_bits(*dc).hash(state),
            Primitive::Vpulse(p) => {
                for x in [p.v1, p.v2, p.delay, p.rise, p.fall, p.width, p.period] {
                    float_bits(x).hash(state);
                }
            }
            Primitive::Vpwl(points) => {
                for (t, v) in points.iter() {
                    float_bits(*t).hash(state);
                    float_bits(*v).hash(state);
                }
            }
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// A compact model card, instantiated with an `M` line in SPICE.
    Model,
    /// A subcircuit wrapper, instantiated with an `X` line in SPICE.
    Subckt,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Dim(SiValue),
    Int(i64),
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Dim(v) => write!(f, "{v}"),
            ParamValue::Int(i) => write!(f, "{i}"),
        }
    }
}

/// A PDK-specific device instance call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DeviceCall {
    pub device: ArcStr,
    pub kind: DeviceKind,
    pub params: Vec<(ArcStr, ParamValue)>,
}

impl DeviceCall {
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }
}

/// A black-box cell with a declared interface and no body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalModule {
    pub name: ArcStr,
    pub ports: Vec<Port>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Primitive(Primitive),
    Device(Arc<DeviceCall>),
    Module(Arc<Module>),
    External(Arc<ExternalModule>),
}

impl Call {
    /// Pin names, one per connected bit.
    pub fn pins(&self) -> Vec<ArcStr> {
        match self {
            Call::Primitive(p) => p.pins().iter().map(|&s| ArcStr::from(s)).collect(),
            Call::Device(_) => MOS_PINS.iter().map(|&s| ArcStr::from(s)).collect(),
            Call::Module(m) => m.port_bits(),
            Call::External(e) => e.ports.iter().flat_map(Port::bits).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub name: ArcStr,
    pub call: Call,
    /// `(pin, net)` pairs.
    pub conns: Vec<(ArcStr, ArcStr)>,
}

impl Instance {
    pub fn new(call: Call) -> Self {
        Self {
            name: ArcStr::new(),
            call,
            conns: Vec::new(),
        }
    }

    pub fn connect(&mut self, pin: impl Into<ArcStr>, signal: &Signal) {
        let pin = pin.into();
        self.conns.retain(|(p, _)| *p != pin);
        self.conns.push((pin, signal.name().clone()));
    }

    pub fn connect_all<'a>(&mut self, conns: impl IntoIterator<Item = (&'a str, &'a Signal)>) {
        for (pin, signal) in conns {
            self.connect(pin, signal);
        }
    }

    /// Connects every bit of bus port `pin` to the matching bit of `bus`.
    pub fn connect_bus(&mut self, pin: &str, bus: &Bus) {
        for (i, signal) in bus.iter().enumerate() {
            self.connect(bus_bit(pin, i), signal);
        }
    }

    pub fn set_name(&mut self, name: impl Into<ArcStr>) {
        self.name = name.into();
    }

    pub fn named(mut self, name: impl Into<ArcStr>) -> Self {
        self.set_name(name);
        self
    }

    pub fn with_connections<'a>(
        mut self,
        conns: impl IntoIterator<Item = (&'a str, &'a Signal)>,
    ) -> Self {
        self.connect_all(conns);
        self
    }

    pub fn add_to(self, ctx: &mut SchematicCtx) {
        ctx.add_instance(self);
    }

    /// Net connected to `pin`, if any.
    pub fn net(&self, pin: &str) -> Option<&ArcStr> {
        self.conns
            .iter()
            .find(|(p, _)| p.as_str() == pin)
            .map(|(_, n)| n)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: ArcStr,
    pub ports: Vec<Port>,
    pub signals: Vec<ArcStr>,
    pub instances: Vec<Instance>,
}

impl Module {
    pub fn port_bits(&self) -> Vec<ArcStr> {
        self.ports.iter().flat_map(Port::bits).collect()
    }

    pub fn instance(&self, name: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.name.as_str() == name)
    }

    /// This module and every module below it, callees before callers.
    pub fn dependency_order(self: &Arc<Self>) -> Vec<Arc<Module>> {
        fn visit(m: &Arc<Module>, seen: &mut HashSet<ArcStr>, out: &mut Vec<Arc<Module>>) {
            if !seen.insert(m.name.clone()) {
                return;
            }
            for inst in m.instances.iter() {
                if let Call::Module(child) = &inst.call {
                    visit(child, seen, out);
                }
            }
            out.push(m.clone());
        }
        let mut out = Vec::new();
        visit(self, &mut HashSet::new(), &mut out);
        out
    }

    /// External modules referenced anywhere in the hierarchy.
    pub fn externals(self: &Arc<Self>) -> Vec<Arc<ExternalModule>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for m in self.dependency_order() {
            for inst in m.instances.iter() {
                if let Call::External(e) = &inst.call {
                    if seen.insert(e.name.clone()) {
                        out.push(e.clone());
                    }
                }
            }
        }
        out
    }

    /// Instances in this module (not its children) that call a primitive of `kind`.
    pub fn primitives(&self, kind: PrimitiveKind) -> impl Iterator<Item = &Instance> {
        self.instances.iter().filter(move |i| match &i.call {
            Call::Primitive(p) => p.kind() == kind,
            _ => false,
        })
    }

    /// Instances in this module that call a PDK device.
    pub fn devices(&self) -> impl Iterator<Item = (&Instance, &Arc<DeviceCall>)> {
        self.instances.iter().filter_map(|i| match &i.call {
            Call::Device(d) => Some((i, d)),
            _ => None,
        })
    }
}
