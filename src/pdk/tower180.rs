//! Tower 180nm (TS18IS).
//!
//! Simulations need two includes: the global BSIM section first, then the
//! FET file at the process corner.

use std::path::PathBuf;

use crate::config::SupplyVals;
use crate::schematic::DeviceKind;
use crate::units::SiValue;

use super::{catalog, IncludeRule, MosType, MosVth, ParamShape, Pdk, PdkName, RewriteTable};

pub const PDK_ROOT: &str = "/eda/kits/TOWER/ts18is_Rev_6.3.6";

pub fn descriptor() -> Pdk {
    use MosType::*;
    use MosVth::*;

    Pdk {
        name: PdkName::Tower180,
        w_min: SiValue::nano(220),
        l_min: SiValue::nano(180),
        supply: SupplyVals::new(1.62, 1.8, 1.98),
        default_w_mult: 10,
        default_l_mult: 1,
        shape: ParamShape::WLNFM,
        root: PathBuf::from(PDK_ROOT),
        model_dir: PathBuf::from("HOTCODE/models/ts18sl/v5.6.00/spectre"),
        devices: catalog(
            DeviceKind::Model,
            [
                (Nmos, Low, "n18lvt"),
                (Nmos, Std, "n18"),
                (Nmos, High, "n18hvt"),
                (Pmos, Low, "p18lvt"),
                (Pmos, Std, "p18"),
                (Pmos, High, "p18hvt"),
            ],
        ),
        hv_devices: Default::default(),
        includes: vec![
            IncludeRule::fixed("global.scs", "BSIM"),
            IncludeRule::per_corner("fet.scs", "NOM", "FAST", "SLOW"),
        ],
        mc_include: Some(IncludeRule::fixed("fet.scs", "STAT")),
        rewrite: RewriteTable::mos_only(),
    }
}
