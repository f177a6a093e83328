use arcstr::ArcStr;
use itertools::iproduct;
use serde::{Deserialize, Serialize};

use crate::blocks::Component;
use crate::error::{FridaError, Result};
use crate::netlist::module_name;
use crate::pdk::MosVth;
use crate::schematic::{FridaCtx, SchematicCtx};
use crate::units::SiValue;

mod schematic;
pub mod testbench;
pub mod weights;

pub use testbench::{sim_input, CdacTb, CdacTbParams};
pub use weights::{bits_to_code, calc_weights, check_weights, code_to_bits};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedunStrat {
    Rdx2,
    Subrdx2,
    Subrdx2Lim,
    Subrdx2Rdst,
    Rdx2Rpt,
    Subrdx2Ovly,
}

impl RedunStrat {
    pub const ALL: [RedunStrat; 6] = [
        RedunStrat::Rdx2,
        RedunStrat::Subrdx2,
        RedunStrat::Subrdx2Lim,
        RedunStrat::Subrdx2Rdst,
        RedunStrat::Rdx2Rpt,
        RedunStrat::Subrdx2Ovly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RedunStrat::Rdx2 => "rdx2",
            RedunStrat::Subrdx2 => "subrdx2",
            RedunStrat::Subrdx2Lim => "subrdx2lim",
            RedunStrat::Subrdx2Rdst => "subrdx2rdst",
            RedunStrat::Rdx2Rpt => "rdx2rpt",
            RedunStrat::Subrdx2Ovly => "subrdx2ovly",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitStrat {
    NoSplit,
    VdivSplit,
    DiffcapSplit,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapType {
    #[serde(rename = "cap_mom1")]
    Mom1,
    #[serde(rename = "cap_mom2")]
    Mom2,
    #[serde(rename = "cap_mom3")]
    Mom3,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CdacParams {
    /// DAC resolution in bits.
    pub n_dac: usize,
    /// Capacitors beyond `n_dac`, used for redundancy.
    pub n_extra: usize,
    pub redun_strat: RedunStrat,
    pub split_strat: SplitStrat,
    pub cap_type: CapType,
    pub vth: MosVth,
    pub unit_cap: SiValue,
}

impl Default for CdacParams {
    fn default() -> Self {
        Self {
            n_dac: 8,
            n_extra: 0,
            redun_strat: RedunStrat::Rdx2,
            split_strat: SplitStrat::NoSplit,
            cap_type: CapType::Mom1,
            vth: MosVth::Low,
            unit_cap: SiValue::femto(1),
        }
    }
}

impl CdacParams {
    /// Capacitor weights, MSB first.
    pub fn weights(&self) -> Result<Vec<u64>> {
        calc_weights(self.n_dac, self.n_extra, self.redun_strat).ok_or_else(|| {
            FridaError::WeightsUndefined {
                n_dac: self.n_dac,
                n_extra: self.n_extra,
                strategy: self.redun_strat.as_str().to_string(),
            }
        })
    }

    /// Number of physical capacitors, and so the width of the `dac` bus.
    #[inline]
    pub fn n_bits(&self) -> usize {
        self.n_dac + self.n_extra
    }
}

/// Binary weighting has no extra capacitors; every other strategy needs some.
pub fn is_valid_cdac_params(p: &CdacParams) -> bool {
    let extra_ok = match p.redun_strat {
        RedunStrat::Rdx2 => p.n_extra == 0,
        _ => p.n_extra > 0,
    };
    extra_ok && p.weights().is_ok()
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdacAxes {
    pub n_dac: Option<Vec<usize>>,
    pub n_extra: Option<Vec<usize>>,
    pub redun_strat: Option<Vec<RedunStrat>>,
    pub split_strat: Option<Vec<SplitStrat>>,
}

pub fn variants(axes: &CdacAxes) -> Vec<CdacParams> {
    let n_dacs = axes.n_dac.clone().unwrap_or_else(|| vec![7, 9, 11]);
    let n_extras = axes.n_extra.clone().unwrap_or_else(|| vec![0, 2, 4]);
    let strats = axes
        .redun_strat
        .clone()
        .unwrap_or_else(|| RedunStrat::ALL.to_vec());
    let splits = axes
        .split_strat
        .clone()
        .unwrap_or_else(|| vec![SplitStrat::NoSplit]);

    iproduct!(n_dacs, n_extras, strats, splits)
        .map(|(n_dac, n_extra, redun_strat, split_strat)| CdacParams {
            n_dac,
            n_extra,
            redun_strat,
            split_strat,
            ..Default::default()
        })
        .filter(is_valid_cdac_params)
        .collect()
}

pub struct Cdac {
    name: ArcStr,
    params: CdacParams,
    weights: Vec<u64>,
}

impl Component for Cdac {
    type Params = CdacParams;

    fn new(params: &Self::Params, _ctx: &FridaCtx) -> Result<Self> {
        let weights = params.weights()?;
        if !is_valid_cdac_params(params) {
            return Err(FridaError::param_invalid(
                "cdac",
                format!(
                    "{} does not accept n_extra={}",
                    params.redun_strat.as_str(),
                    params.n_extra
                ),
            ));
        }
        Ok(Self {
            name: module_name("cdac", params)?,
            params: *params,
            weights,
        })
    }

    fn name(&self) -> ArcStr {
        self.name.clone()
    }

    fn schematic(&self, ctx: &mut SchematicCtx) -> Result<()> {
        self.schematic(ctx)
    }
}
