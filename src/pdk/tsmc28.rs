//! TSMC 28nm HPC+.
//!
//! Corner sections use the `a` (all devices) naming: `att_pt`, `aff_pf`,
//! `ass_ps`. The `_mac` devices are subcircuit wrappers.

use std::path::PathBuf;

use crate::config::SupplyVals;
use crate::schematic::DeviceKind;
use crate::units::SiValue;

use super::{catalog, IncludeRule, MosType, MosVth, ParamShape, Pdk, PdkName, RewriteTable};

pub const PDK_ROOT: &str = "/eda/kits/TSMC/28HPC+/2023_v1.1";

pub fn descriptor() -> Pdk {
    use MosType::*;
    use MosVth::*;

    Pdk {
        name: PdkName::Tsmc28,
        w_min: SiValue::nano(40),
        l_min: SiValue::nano(30),
        supply: SupplyVals::new(0.81, 0.9, 0.99),
        default_w_mult: 10,
        default_l_mult: 1,
        shape: ParamShape::WLNFM,
        root: PathBuf::from(PDK_ROOT),
        model_dir: PathBuf::from("pdk/1P9M_5X1Y1Z1U_UT_AlRDL/cdsPDK/models/spectre"),
        devices: catalog(
            DeviceKind::Subckt,
            [
                (Nmos, Low, "nch_lvt_mac"),
                (Nmos, Std, "nch_svt_mac"),
                (Nmos, High, "nch_hvt_mac"),
                (Pmos, Low, "pch_lvt_mac"),
                (Pmos, Std, "pch_svt_mac"),
                (Pmos, High, "pch_hvt_mac"),
            ],
        ),
        hv_devices: Default::default(),
        includes: vec![IncludeRule::per_corner(
            "toplevel.scs",
            "att_pt",
            "aff_pf",
            "ass_ps",
        )],
        mc_include: Some(IncludeRule::fixed("toplevel.scs", "local_mc")),
        rewrite: RewriteTable::mos_only(),
    }
}

