use std::path::PathBuf;

use crate::config::SupplyVals;
use crate::schematic::DeviceKind;
use crate::units::SiValue;

use super::{catalog, IncludeRule, MosType, MosVth, ParamShape, Pdk, PdkName, RewriteTable};

pub const PDK_ROOT: &str = "/eda/kits/TSMC/65LP/2024/V1.7A_1/1p9m6x1z1u";

pub fn descriptor() -> Pdk {
    use MosType::*;
    use MosVth::*;

    Pdk {
        name: PdkName::Tsmc65,
        w_min: SiValue::nano(120),
        l_min: SiValue::nano(60),
        supply: SupplyVals::new(1.08, 1.2, 1.32),
        default_w_mult: 10,
        default_l_mult: 1,
        shape: ParamShape::WLNFM,
        root: PathBuf::from(PDK_ROOT),
        model_dir: PathBuf::from("models/spectre"),
        devices: catalog(
            DeviceKind::Model,
            [
                (Nmos, Low, "nch_lvt"),
                (Nmos, Std, "nch"),
                (Nmos, High, "nch_hvt"),
                (Pmos, Low, "pch_lvt"),
                (Pmos, Std, "pch"),
                (Pmos, High, "pch_hvt"),
            ],
        ),
        hv_devices: Default::default(),
        includes: vec![IncludeRule::per_corner(
            "toplevel.scs",
            "tt_lib",
            "ff_lib",
            "ss_lib",
        )],
        mc_include: Some(IncludeRule::fixed("toplevel.scs", "mc_lib")),
        rewrite: RewriteTable::mos_only(),
    }
}
