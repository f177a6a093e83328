//! Generic-to-PDK hierarchy rewrite.

use std::collections::HashMap;
use std::sync::Arc;

use arcstr::ArcStr;

use super::{Call, DeviceCall, Instance, Module, Primitive};
use crate::error::Result;
use crate::pdk::Pdk;

/// Post-order visitor that maps primitives through the PDK's rewrite table.
///
/// Device calls are memoized by primitive value and finished modules by
/// name, so a primitive that appears many times maps to a single shared
/// [`DeviceCall`]. Calls that are already PDK devices or external cells are
/// left alone, which makes a second pass a no-op.
pub struct PdkRewriter<'a> {
    pdk: &'a Pdk,
    modules: &'a mut HashMap<ArcStr, Arc<Module>>,
    devices: &'a mut HashMap<Primitive, Arc<DeviceCall>>,
}

impl<'a> PdkRewriter<'a> {
    pub fn new(
        pdk: &'a Pdk,
        modules: &'a mut HashMap<ArcStr, Arc<Module>>,
        devices: &'a mut HashMap<Primitive, Arc<DeviceCall>>,
    ) -> Self {
        Self {
            pdk,
            modules,
            devices,
        }
    }

    pub fn rewrite(&mut self, module: &Arc<Module>) -> Result<Arc<Module>> {
        if let Some(done) = self.modules.get(&module.name) {
            return Ok(done.clone());
        }

        let instances = module
            .instances
            .iter()
            .map(|inst| {
                Ok(Instance {
                    name: inst.name.clone(),
                    call: self.rewrite_call(&inst.call)?,
                    conns: inst.conns.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let out = Arc::new(Module {
            name: module.name.clone(),
            ports: module.ports.clone(),
            signals: module.signals.clone(),
            instances,
        });
        log::debug!("rewrote {} for {}", module.name, self.pdk.name);
        self.modules.insert(module.name.clone(), out.clone());
        Ok(out)
    }

    fn rewrite_call(&mut self, call: &Call) -> Result<Call> {
        match call {
            Call::Primitive(prim) => match self.pdk.rewrite_table().get(prim.kind()) {
                Some(map) => Ok(Call::Device(self.device(prim, map)?)),
                None => Ok(call.clone()),
            },
            Call::Module(child) => Ok(Call::Module(self.rewrite(child)?)),
            Call::Device(_) | Call::External(_) => Ok(call.clone()),
        }
    }

    fn device(
        &mut self,
        prim: &Primitive,
        map: crate::pdk::RewriteFn,
    ) -> Result<Arc<DeviceCall>> {
        if let Some(device) = self.devices.get(prim) {
            return Ok(device.clone());
        }
        let device = Arc::new(map(self.pdk, prim)?);
        self.devices.insert(prim.clone(), device.clone());
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdk::{MosType, MosVth, PdkName};
    use crate::schematic::{Direction, MosParams, Port};
    use crate::units::SiValue;
    use crate::error::FridaError;

    fn mos(name: &str, params: MosParams) -> Instance {
        let mut inst = Instance::new(Call::Primitive(Primitive::Mos(params)));
        inst.set_name(name);
        for pin in ["d", "g", "s", "b"] {
            inst.conns.push((ArcStr::from(pin), arcstr::literal!("a")));
        }
        inst
    }

    fn leaf(instances: Vec<Instance>) -> Arc<Module> {
        Arc::new(Module {
            name: arcstr::literal!("leaf"),
            ports: vec![Port {
                name: arcstr::literal!("a"),
                width: None,
                direction: Direction::InOut,
            }],
            signals: Vec::new(),
            instances,
        })
    }

    #[test]
    fn test_passives_pass_through() -> Result<()> {
        let pdk = PdkName::Tsmc28.descriptor();
        let mut cap = Instance::new(Call::Primitive(Primitive::Capacitor {
            c: SiValue::femto(10),
        }));
        cap.set_name("c0");
        let module = leaf(vec![
            cap.clone(),
            mos("m0", MosParams::new(MosType::Pmos, MosVth::High, 4, 2)),
        ]);

        let (mut modules, mut devices) = (HashMap::new(), HashMap::new());
        let out = PdkRewriter::new(&pdk, &mut modules, &mut devices).rewrite(&module)?;
        assert_eq!(out.instances[0], cap);
        match &out.instances[1].call {
            Call::Device(d) => assert_eq!(d.device, "pch_hvt_mac"),
            other => panic!("unexpected call {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_missing_device_fails() {
        let pdk = PdkName::Ihp130.descriptor();
        let module = leaf(vec![mos(
            "m0",
            MosParams::new(MosType::Nmos, MosVth::High, 1, 1),
        )]);
        let (mut modules, mut devices) = (HashMap::new(), HashMap::new());
        let res = PdkRewriter::new(&pdk, &mut modules, &mut devices).rewrite(&module);
        assert!(matches!(res, Err(FridaError::PdkDeviceMissing { .. })));
        assert!(devices.is_empty());
    }
}
