use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use arcstr::ArcStr;

use super::rewrite::PdkRewriter;
use super::{
    Call, DeviceCall, Direction, ExternalModule, Instance, Module, MosParams, Port, Primitive,
};
use crate::blocks::Component;
use crate::bus_bit;
use crate::error::{FridaError, Result};
use crate::netlist::{write_module_to_file, DutFormat};
use crate::pdk::Pdk;
use crate::units::SiValue;

/// Generation context.
///
/// Owns the active PDK and every generator cache. Caches are keyed by module
/// name (which encodes the parameter fingerprint) or by primitive value, and
/// are cleared whenever the PDK changes.
pub struct FridaCtx {
    pdk: Arc<Pdk>,
    modules: RefCell<HashMap<ArcStr, Arc<Module>>>,
    rewritten: RefCell<HashMap<ArcStr, Arc<Module>>>,
    devices: RefCell<HashMap<Primitive, Arc<DeviceCall>>>,
}

impl FridaCtx {
    pub fn new(pdk: Pdk) -> Self {
        Self {
            pdk: Arc::new(pdk),
            modules: RefCell::new(HashMap::new()),
            rewritten: RefCell::new(HashMap::new()),
            devices: RefCell::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn pdk(&self) -> &Arc<Pdk> {
        &self.pdk
    }

    /// Switches the active PDK, dropping every cached module and device call.
    pub fn set_pdk(&mut self, pdk: Pdk) {
        log::info!("switching PDK from {} to {}", self.pdk.name, pdk.name);
        self.invalidate_caches();
        self.pdk = Arc::new(pdk);
    }

    pub fn invalidate_caches(&mut self) {
        let modules = self.modules.get_mut();
        let rewritten = self.rewritten.get_mut();
        let devices = self.devices.get_mut();
        log::debug!(
            "invalidating {} modules, {} rewritten modules, {} device calls",
            modules.len(),
            rewritten.len(),
            devices.len()
        );
        modules.clear();
        rewritten.clear();
        devices.clear();
    }

    pub fn cached_modules(&self) -> usize {
        self.modules.borrow().len() + self.rewritten.borrow().len()
    }

    pub fn cached_devices(&self) -> usize {
        self.devices.borrow().len()
    }

    /// Builds the generic module for `T` with the given parameters.
    ///
    /// Identical parameters return the same [`Arc`].
    pub fn generate<T: Component>(&self, params: &T::Params) -> Result<Arc<Module>> {
        let component = T::new(params, self)?;
        let name = component.name();

        let cached = self.modules.borrow().get(&name).cloned();
        if let Some(module) = cached {
            return Ok(module);
        }

        let mut ctx = SchematicCtx::new(self, name.clone());
        component.schematic(&mut ctx)?;
        let module = Arc::new(ctx.finish()?);
        self.modules.borrow_mut().insert(name, module.clone());
        Ok(module)
    }

    /// Replaces every generic primitive below `module` with the active PDK's devices.
    pub fn rewrite(&self, module: &Arc<Module>) -> Result<Arc<Module>> {
        let mut modules = self.rewritten.borrow_mut();
        let mut devices = self.devices.borrow_mut();
        PdkRewriter::new(&self.pdk, &mut modules, &mut devices).rewrite(module)
    }

    /// Generates, rewrites and writes `T` to `path`.
    ///
    /// The format follows the file extension.
    pub fn write_schematic_to_file<T: Component>(
        &self,
        params: &T::Params,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let path = path.as_ref();
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| FridaError::NetlistFormat(format!("no extension on {path:?}")))
            .and_then(DutFormat::from_extension)?;
        let module = self.rewrite(&self.generate::<T>(params)?)?;
        write_module_to_file(&module, &self.pdk, format, path)
    }
}

/// A named net in the module under construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signal(ArcStr);

impl Signal {
    pub fn new(name: impl Into<ArcStr>) -> Self {
        Self(name.into())
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bus {
    name: ArcStr,
    bits: Vec<Signal>,
}

impl Bus {
    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// Panics if `i` is out of range, like slice indexing.
    #[inline]
    pub fn index(&self, i: usize) -> &Signal {
        &self.bits[i]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Signal> {
        self.bits.iter()
    }
}

/// Builder for a single module body.
pub struct SchematicCtx<'a> {
    inner: &'a FridaCtx,
    name: ArcStr,
    ports: Vec<Port>,
    signals: Vec<ArcStr>,
    instances: Vec<Instance>,
}

impl<'a> SchematicCtx<'a> {
    fn new(inner: &'a FridaCtx, name: ArcStr) -> Self {
        Self {
            inner,
            name,
            ports: Vec::new(),
            signals: Vec::new(),
            instances: Vec::new(),
        }
    }

    #[inline]
    pub fn pdk(&self) -> &Pdk {
        &self.inner.pdk
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    pub fn port(&mut self, name: &str, direction: Direction) -> Signal {
        let name = ArcStr::from(name);
        self.ports.push(Port {
            name: name.clone(),
            width: None,
            direction,
        });
        Signal(name)
    }

    pub fn bus_port(&mut self, name: &str, width: usize, direction: Direction) -> Bus {
        let name = ArcStr::from(name);
        self.ports.push(Port {
            name: name.clone(),
            width: Some(width),
            direction,
        });
        Bus {
            bits: (0..width).map(|i| Signal::new(bus_bit(&name, i))).collect(),
            name,
        }
    }

    pub fn signal(&mut self, name: impl Into<ArcStr>) -> Signal {
        let name = name.into();
        self.signals.push(name.clone());
        Signal(name)
    }

    pub fn bus(&mut self, name: &str, width: usize) -> Bus {
        let bits = (0..width)
            .map(|i| self.signal(bus_bit(name, i)))
            .collect();
        Bus {
            name: ArcStr::from(name),
            bits,
        }
    }

    pub fn instantiate<T: Component>(&mut self, params: &T::Params) -> Result<Instance> {
        let module = self.inner.generate::<T>(params)?;
        Ok(Instance::new(Call::Module(module)))
    }

    pub fn instantiate_primitive(&self, primitive: Primitive) -> Instance {
        Instance::new(Call::Primitive(primitive))
    }

    pub fn instantiate_external(&self, module: &Arc<ExternalModule>) -> Instance {
        Instance::new(Call::External(module.clone()))
    }

    pub fn add_instance(&mut self, instance: Instance) {
        self.instances.push(instance);
    }

    /// Adds a generic MOS connected as `[d, g, s, b]`.
    pub fn add_mos(&mut self, name: &str, params: MosParams, conns: [&Signal; 4]) {
        let [d, g, s, b] = conns;
        let mut mos = self.instantiate_primitive(Primitive::Mos(params));
        mos.connect_all([("d", d), ("g", g), ("s", s), ("b", b)]);
        mos.set_name(name);
        self.add_instance(mos);
    }

    pub fn add_cap(&mut self, name: &str, c: SiValue, p: &Signal, n: &Signal) {
        self.instantiate_primitive(Primitive::Capacitor { c })
            .with_connections([("p", p), ("n", n)])
            .named(name)
            .add_to(self);
    }

    pub fn add_res(&mut self, name: &str, r: SiValue, p: &Signal, n: &Signal) {
        self.instantiate_primitive(Primitive::Resistor { r })
            .with_connections([("p", p), ("n", n)])
            .named(name)
            .add_to(self);
    }

    /// Checks connectivity and produces the finished module.
    pub fn finish(self) -> Result<Module> {
        let err = |reason: String| FridaError::Connection {
            module: self.name.clone(),
            reason,
        };

        let mut nets = HashSet::new();
        for port in self.ports.iter() {
            for bit in port.bits() {
                if !nets.insert(bit.clone()) {
                    return Err(err(format!("duplicate net `{bit}`")));
                }
            }
        }
        for signal in self.signals.iter() {
            if !nets.insert(signal.clone()) {
                return Err(err(format!("duplicate net `{signal}`")));
            }
        }

        let mut names = HashSet::new();
        for inst in self.instances.iter() {
            if inst.name.is_empty() {
                return Err(err("unnamed instance".to_string()));
            }
            if !names.insert(inst.name.clone()) {
                return Err(err(format!("duplicate instance `{}`", inst.name)));
            }
            let pins = inst.call.pins();
            for pin in pins.iter() {
                if inst.net(pin).is_none() {
                    return Err(err(format!("pin `{pin}` of `{}` is unconnected", inst.name)));
                }
            }
            for (pin, net) in inst.conns.iter() {
                if !pins.contains(pin) {
                    return Err(err(format!("`{}` has no pin `{pin}`", inst.name)));
                }
                if !nets.contains(net) {
                    return Err(err(format!(
                        "`{}` connects `{pin}` to undeclared net `{net}`",
                        inst.name
                    )));
                }
            }
        }

        Ok(Module {
            name: self.name,
            ports: self.ports,
            signals: self.signals,
            instances: self.instances,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdk::{MosType, MosVth, PdkName};

    struct Inverter {
        name: ArcStr,
        params: (i64, i64),
    }

    impl Component for Inverter {
        type Params = (i64, i64);

        fn new(params: &Self::Params, _ctx: &FridaCtx) -> Result<Self> {
            Ok(Self {
                name: arcstr::format!("inv_{}_{}", params.0, params.1),
                params: *params,
            })
        }

        fn name(&self) -> ArcStr {
            self.name.clone()
        }

        fn schematic(&self, ctx: &mut SchematicCtx) -> Result<()> {
            let din = ctx.port("din", Direction::Input);
            let dout = ctx.port("dout", Direction::Output);
            let vdd = ctx.port("vdd", Direction::InOut);
            let vss = ctx.port("vss", Direction::InOut);
            let (nw, pw) = self.params;
            ctx.add_mos(
                "mn",
                MosParams::new(MosType::Nmos, MosVth::Std, nw, 1),
                [&dout, &din, &vss, &vss],
            );
            ctx.add_mos(
                "mp",
                MosParams::new(MosType::Pmos, MosVth::Std, pw, 1),
                [&dout, &din, &vdd, &vdd],
            );
            Ok(())
        }
    }

    struct Chain;

    impl Component for Chain {
        type Params = ();

        fn new(_params: &Self::Params, _ctx: &FridaCtx) -> Result<Self> {
            Ok(Self)
        }

        fn name(&self) -> ArcStr {
            arcstr::literal!("chain")
        }

        fn schematic(&self, ctx: &mut SchematicCtx) -> Result<()> {
            let din = ctx.port("din", Direction::Input);
            let dout = ctx.port("dout", Direction::Output);
            let vdd = ctx.port("vdd", Direction::InOut);
            let vss = ctx.port("vss", Direction::InOut);
            let mid = ctx.signal("mid");
            for (name, a, y) in [("xinv0", &din, &mid), ("xinv1", &mid, &dout)] {
                ctx.instantiate::<Inverter>(&(2, 4))?
                    .with_connections([("din", a), ("dout", y), ("vdd", &vdd), ("vss", &vss)])
                    .named(name)
                    .add_to(ctx);
            }
            Ok(())
        }
    }

    fn child(module: &Module, name: &str) -> Arc<Module> {
        match &module.instance(name).unwrap().call {
            Call::Module(m) => m.clone(),
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn test_generate_is_cached() -> Result<()> {
        let ctx = FridaCtx::new(PdkName::Generic.descriptor());
        let a = ctx.generate::<Chain>(&())?;
        let b = ctx.generate::<Chain>(&())?;
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&child(&a, "xinv0"), &child(&a, "xinv1")));
        assert_eq!(ctx.cached_modules(), 2);
        Ok(())
    }

    #[test]
    fn test_rewrite_memoizes_devices() -> Result<()> {
        let ctx = FridaCtx::new(PdkName::Tsmc65.descriptor());
        let module = ctx.rewrite(&ctx.generate::<Chain>(&())?)?;
        let inv = child(&module, "xinv0");
        let (_, mn) = inv.devices().find(|(i, _)| i.name == "mn").unwrap();
        assert_eq!(mn.device, "nch");

        let other = ctx.rewrite(&ctx.generate::<Inverter>(&(2, 8))?)?;
        let (_, mn_other) = other.devices().find(|(i, _)| i.name == "mn").unwrap();
        assert!(Arc::ptr_eq(mn, mn_other));
        assert_eq!(ctx.cached_devices(), 3);
        Ok(())
    }

    #[test]
    fn test_rewrite_is_idempotent() -> Result<()> {
        let ctx = FridaCtx::new(PdkName::Ihp130.descriptor());
        let once = ctx.rewrite(&ctx.generate::<Chain>(&())?)?;
        let twice = ctx.rewrite(&once)?;
        assert_eq!(once, twice);
        Ok(())
    }

    #[test]
    fn test_set_pdk_invalidates_caches() -> Result<()> {
        let mut ctx = FridaCtx::new(PdkName::Tsmc65.descriptor());
        ctx.rewrite(&ctx.generate::<Chain>(&())?)?;
        assert!(ctx.cached_devices() > 0);

        ctx.set_pdk(PdkName::Tower180.descriptor());
        assert_eq!(ctx.cached_modules(), 0);
        assert_eq!(ctx.cached_devices(), 0);

        let module = ctx.rewrite(&ctx.generate::<Chain>(&())?)?;
        let inv = child(&module, "xinv1");
        let names: Vec<_> = inv.devices().map(|(_, d)| d.device.to_string()).collect();
        assert_eq!(names, vec!["n18", "p18"]);
        Ok(())
    }

    #[test]
    fn test_unconnected_pin_is_rejected() {
        struct Broken;
        impl Component for Broken {
            type Params = ();
            fn new(_params: &(), _ctx: &FridaCtx) -> Result<Self> {
                Ok(Self)
            }
            fn name(&self) -> ArcStr {
                arcstr::literal!("broken")
            }
            fn schematic(&self, ctx: &mut SchematicCtx) -> Result<()> {
                let a = ctx.port("a", Direction::InOut);
                ctx.instantiate_primitive(Primitive::Capacitor {
                    c: SiValue::femto(1),
                })
                .with_connections([("p", &a)])
                .named("c0")
                .add_to(ctx);
                Ok(())
            }
        }

        let ctx = FridaCtx::new(PdkName::Generic.descriptor());
        assert!(matches!(
            ctx.generate::<Broken>(&()),
            Err(FridaError::Connection { .. })
        ));
    }
}
