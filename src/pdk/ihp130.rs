//! IHP SG13G2 130nm BiCMOS open PDK.
//!
//! The low-voltage core devices come in a single threshold flavor, so both
//! `Low` and `Std` map to `sg13_lv_*`. The 3.3V I/O devices are reachable
//! through [`Pdk::hv_device`].

use std::collections::HashMap;
use std::path::PathBuf;

use crate::config::SupplyVals;
use crate::units::SiValue;

use super::{
    DeviceSpec, IncludeRule, MosType, MosVth, ParamShape, Pdk, PdkName, RewriteTable,
};

pub const PDK_ROOT: &str = "/home/kcaisley/libs/IHP-Open-PDK/ihp-sg13g2";

pub fn descriptor() -> Pdk {
    let devices = HashMap::from([
        ((MosType::Nmos, MosVth::Low), DeviceSpec::subckt("sg13_lv_nmos")),
        ((MosType::Nmos, MosVth::Std), DeviceSpec::subckt("sg13_lv_nmos")),
        ((MosType::Pmos, MosVth::Low), DeviceSpec::subckt("sg13_lv_pmos")),
        ((MosType::Pmos, MosVth::Std), DeviceSpec::subckt("sg13_lv_pmos")),
    ]);

    let hv = |name| DeviceSpec {
        l_min: Some(SiValue::nano(450)),
        ..DeviceSpec::subckt(name)
    };
    let hv_devices = HashMap::from([
        (MosType::Nmos, hv("sg13_hv_nmos")),
        (MosType::Pmos, hv("sg13_hv_pmos")),
    ]);

    Pdk {
        name: PdkName::Ihp130,
        w_min: SiValue::nano(350),
        l_min: SiValue::nano(130),
        supply: SupplyVals::new(1.08, 1.2, 1.32),
        default_w_mult: 1,
        default_l_mult: 1,
        shape: ParamShape {
            fingers: "ng",
            ..ParamShape::WLNFM
        },
        root: PathBuf::from(PDK_ROOT),
        model_dir: PathBuf::from("libs.tech/ngspice/models"),
        devices,
        hv_devices,
        includes: vec![IncludeRule::per_corner("cornerMOSlv.lib", "tt", "ff", "ss")],
        mc_include: None,
        rewrite: RewriteTable::mos_only(),
    }
}

/// Include rule for the HV device models, added by callers that use them.
pub fn hv_include() -> IncludeRule {
    IncludeRule::per_corner("cornerMOShv.lib", "tt", "ff", "ss")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Corner;

    #[test]
    fn test_hv_devices() -> crate::error::Result<()> {
        let mut pdk = descriptor();
        assert_eq!(pdk.hv_device(MosType::Pmos)?.name, "sg13_hv_pmos");
        assert_eq!(
            pdk.hv_device(MosType::Nmos)?.l_min,
            Some(SiValue::nano(450))
        );

        pdk.includes.push(hv_include());
        let includes = pdk.includes(Corner::Typ)?;
        assert_eq!(includes.len(), 2);
        assert!(includes[1].path.ends_with("cornerMOShv.lib"));
        assert!(includes[0]
            .path
            .starts_with("/home/kcaisley/libs/IHP-Open-PDK/ihp-sg13g2"));
        Ok(())
    }
}
