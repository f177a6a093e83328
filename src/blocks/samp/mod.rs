use arcstr::ArcStr;
use itertools::iproduct;
use serde::{Deserialize, Serialize};

use crate::blocks::Component;
use crate::error::{FridaError, Result};
use crate::netlist::module_name;
use crate::pdk::MosVth;
use crate::schematic::{FridaCtx, SchematicCtx};

mod schematic;
pub mod testbench;

pub use testbench::{sim_input, SampTb, SampTbParams};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchType {
    Nmos,
    Pmos,
    Tgate,
}

impl SwitchType {
    pub const ALL: [SwitchType; 3] = [SwitchType::Nmos, SwitchType::Pmos, SwitchType::Tgate];
}

/// Sampling switch parameters.
///
/// `w` and `l` are multiples of the PDK's minimum width and length.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampParams {
    pub switch_type: SwitchType,
    pub w: i64,
    pub l: i64,
    pub vth: MosVth,
}

impl Default for SampParams {
    fn default() -> Self {
        Self {
            switch_type: SwitchType::Nmos,
            w: 10,
            l: 1,
            vth: MosVth::Low,
        }
    }
}

impl SampParams {
    pub fn is_valid(&self) -> bool {
        self.w > 0 && self.l > 0
    }
}

/// Sweep axes for [`variants`]; `None` selects the default list.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampAxes {
    pub switch_type: Option<Vec<SwitchType>>,
    pub w: Option<Vec<i64>>,
    pub l: Option<Vec<i64>>,
    pub vth: Option<Vec<MosVth>>,
}

/// Valid parameter combinations, in axis order.
pub fn variants(axes: &SampAxes) -> Vec<SampParams> {
    let switch_types = axes
        .switch_type
        .clone()
        .unwrap_or_else(|| SwitchType::ALL.to_vec());
    let vths = axes
        .vth
        .clone()
        .unwrap_or_else(|| vec![MosVth::Low, MosVth::Std]);
    let ws = axes.w.clone().unwrap_or_else(|| vec![5, 10, 20, 40]);
    let ls = axes.l.clone().unwrap_or_else(|| vec![1, 2]);

    iproduct!(switch_types, vths, ws, ls)
        .map(|(switch_type, vth, w, l)| SampParams {
            switch_type,
            w,
            l,
            vth,
        })
        .filter(SampParams::is_valid)
        .collect()
}

pub struct Samp {
    name: ArcStr,
    params: SampParams,
}

impl Component for Samp {
    type Params = SampParams;

    fn new(params: &Self::Params, _ctx: &FridaCtx) -> Result<Self> {
        if !params.is_valid() {
            return Err(FridaError::param_invalid(
                "samp",
                format!("device sizes must be positive, got w={} l={}", params.w, params.l),
            ));
        }
        Ok(Self {
            name: module_name("samp", params)?,
            params: *params,
        })
    }

    fn name(&self) -> ArcStr {
        self.name.clone()
    }

    fn schematic(&self, ctx: &mut SchematicCtx) -> Result<()> {
        self.schematic(ctx)
    }
}
