//! Technology-neutral PDK for quick netlist checks.
//!
//! Devices are plain SPICE models with no include files, so netlists built
//! against it are only useful with a user-supplied model card.

use std::path::PathBuf;

use crate::config::SupplyVals;
use crate::schematic::DeviceKind;
use crate::units::SiValue;

use super::{catalog, MosType, MosVth, ParamShape, Pdk, PdkName, RewriteTable};

pub fn descriptor() -> Pdk {
    use MosType::*;
    use MosVth::*;

    Pdk {
        name: PdkName::Generic,
        w_min: SiValue::nano(100),
        l_min: SiValue::nano(100),
        supply: SupplyVals::new(1.08, 1.2, 1.32),
        default_w_mult: 10,
        default_l_mult: 1,
        shape: ParamShape::WLNFM,
        root: PathBuf::new(),
        model_dir: PathBuf::new(),
        devices: catalog(
            DeviceKind::Model,
            [
                (Nmos, Low, "nmos_lvt"),
                (Nmos, Std, "nmos"),
                (Nmos, High, "nmos_hvt"),
                (Pmos, Low, "pmos_lvt"),
                (Pmos, Std, "pmos"),
                (Pmos, High, "pmos_hvt"),
            ],
        ),
        hv_devices: Default::default(),
        includes: Vec::new(),
        mc_include: None,
        rewrite: RewriteTable::mos_only(),
    }
}
