//! Process design kit descriptors.
//!
//! A [`Pdk`] owns everything the generators need to know about a technology:
//! minimum dimensions, supplies, the MOS device catalog, model library
//! includes per corner, and the table used to rewrite generic primitives
//! into technology devices.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use arcstr::ArcStr;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::config::{Corner, SupplyVals};
use crate::error::{FridaError, Result};
use crate::schematic::{DeviceCall, DeviceKind, MosParams, ParamValue, Primitive, PrimitiveKind};
use crate::units::{scale_dimension, SiValue};

pub mod generic;
pub mod ihp130;
pub mod tower180;
pub mod tsmc28;
pub mod tsmc65;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MosType {
    Nmos,
    Pmos,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MosVth {
    Low,
    Std,
    High,
}

impl MosType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MosType::Nmos => "nmos",
            MosType::Pmos => "pmos",
        }
    }

    /// The complementary device type.
    pub fn flip(&self) -> Self {
        match self {
            MosType::Nmos => MosType::Pmos,
            MosType::Pmos => MosType::Nmos,
        }
    }
}

impl MosVth {
    pub const ALL: [MosVth; 3] = [MosVth::Low, MosVth::Std, MosVth::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            MosVth::Low => "low",
            MosVth::Std => "std",
            MosVth::High => "high",
        }
    }
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PdkName {
    Generic,
    Ihp130,
    Tsmc65,
    Tsmc28,
    Tower180,
}

impl PdkName {
    pub const ALL: [PdkName; 5] = [
        PdkName::Generic,
        PdkName::Ihp130,
        PdkName::Tsmc65,
        PdkName::Tsmc28,
        PdkName::Tower180,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PdkName::Generic => "generic",
            PdkName::Ihp130 => "ihp130",
            PdkName::Tsmc65 => "tsmc65",
            PdkName::Tsmc28 => "tsmc28",
            PdkName::Tower180 => "tower180",
        }
    }

    /// Builds the descriptor, honoring a `FRIDA_PDK_ROOT_<NAME>` override.
    pub fn descriptor(&self) -> Pdk {
        let pdk = match self {
            PdkName::Generic => generic::descriptor(),
            PdkName::Ihp130 => ihp130::descriptor(),
            PdkName::Tsmc65 => tsmc65::descriptor(),
            PdkName::Tsmc28 => tsmc28::descriptor(),
            PdkName::Tower180 => tower180::descriptor(),
        };
        let var = format!("FRIDA_PDK_ROOT_{}", self.as_str().to_ascii_uppercase());
        match std::env::var_os(var) {
            Some(root) => pdk.with_root(root),
            None => pdk,
        }
    }
}

impl Display for PdkName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PdkName {
    type Err = FridaError;

    fn from_str(s: &str) -> Result<Self> {
        PdkName::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                FridaError::Config(format!(
                    "unknown PDK `{s}`; available: {}",
                    PdkName::ALL.iter().map(|p| p.as_str()).join(", ")
                ))
            })
    }
}

/// Names of the instance parameters a PDK's MOS devices accept.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParamShape {
    pub w: &'static str,
    pub l: &'static str,
    pub fingers: &'static str,
    pub mult: &'static str,
}

impl ParamShape {
    pub const WLNFM: ParamShape = ParamShape {
        w: "w",
        l: "l",
        fingers: "nf",
        mult: "m",
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSpec {
    pub name: ArcStr,
    pub kind: DeviceKind,
    /// Minimum length, when it differs from the PDK's `L_MIN`.
    pub l_min: Option<SiValue>,
}

impl DeviceSpec {
    pub fn model(name: &'static str) -> Self {
        Self {
            name: ArcStr::from(name),
            kind: DeviceKind::Model,
            l_min: None,
        }
    }

    pub fn subckt(name: &'static str) -> Self {
        Self {
            name: ArcStr::from(name),
            kind: DeviceKind::Subckt,
            l_min: None,
        }
    }
}

/// A model library include: a file and an optional section.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Include {
    pub path: PathBuf,
    pub section: Option<ArcStr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sections {
    None,
    Fixed(ArcStr),
    PerCorner(Vec<(Corner, ArcStr)>),
}

/// One entry of a PDK's include list, relative to its model directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeRule {
    pub file: PathBuf,
    pub sections: Sections,
}

impl IncludeRule {
    pub fn fixed(file: &str, section: &'static str) -> Self {
        Self {
            file: PathBuf::from(file),
            sections: Sections::Fixed(ArcStr::from(section)),
        }
    }

    pub fn per_corner(file: &str, typ: &'static str, fast: &'static str, slow: &'static str) -> Self {
        Self {
            file: PathBuf::from(file),
            sections: Sections::PerCorner(vec![
                (Corner::Typ, ArcStr::from(typ)),
                (Corner::Fast, ArcStr::from(fast)),
                (Corner::Slow, ArcStr::from(slow)),
            ]),
        }
    }

    fn resolve(&self, model_dir: &Path, corner: Corner, pdk: PdkName) -> Result<Include> {
        let section = match &self.sections {
            Sections::None => None,
            Sections::Fixed(s) => Some(s.clone()),
            Sections::PerCorner(map) => Some(
                map.iter()
                    .find(|(c, _)| *c == corner)
                    .map(|(_, s)| s.clone())
                    .ok_or_else(|| {
                        FridaError::Config(format!(
                            "PDK {pdk} has no model section for corner {corner} in {:?}",
                            self.file
                        ))
                    })?,
            ),
        };
        Ok(Include {
            path: model_dir.join(&self.file),
            section,
        })
    }
}

pub type RewriteFn = fn(&Pdk, &Primitive) -> Result<DeviceCall>;

/// Dispatch table from primitive kind to its technology mapping.
///
/// Kinds without an entry pass through the rewrite unchanged.
#[derive(Clone)]
pub struct RewriteTable {
    entries: HashMap<PrimitiveKind, RewriteFn>,
}

impl RewriteTable {
    pub fn mos_only() -> Self {
        let mut entries: HashMap<PrimitiveKind, RewriteFn> = HashMap::new();
        entries.insert(PrimitiveKind::Mos, rewrite_mos);
        Self { entries }
    }

    #[inline]
    pub fn get(&self, kind: PrimitiveKind) -> Option<RewriteFn> {
        self.entries.get(&kind).copied()
    }
}

impl std::fmt::Debug for RewriteTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

fn rewrite_mos(pdk: &Pdk, prim: &Primitive) -> Result<DeviceCall> {
    match prim {
        Primitive::Mos(params) => pdk.mos_call(params),
        other => Err(FridaError::NetlistFormat(format!(
            "MOS rewrite applied to {:?} primitive",
            other.kind()
        ))),
    }
}

#[derive(Debug, Clone)]
pub struct Pdk {
    pub name: PdkName,
    pub w_min: SiValue,
    pub l_min: SiValue,
    pub supply: SupplyVals,
    pub default_w_mult: i64,
    pub default_l_mult: i64,
    pub shape: ParamShape,
    pub root: PathBuf,
    pub model_dir: PathBuf,
    pub devices: HashMap<(MosType, MosVth), DeviceSpec>,
    pub hv_devices: HashMap<MosType, DeviceSpec>,
    pub includes: Vec<IncludeRule>,
    pub mc_include: Option<IncludeRule>,
    pub rewrite: RewriteTable,
}

impl Pdk {
    #[inline]
    pub fn vdd(&self) -> f64 {
        self.supply.nom
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    #[inline]
    pub fn model_path(&self) -> PathBuf {
        self.root.join(&self.model_dir)
    }

    #[inline]
    pub fn rewrite_table(&self) -> &RewriteTable {
        &self.rewrite
    }

    pub fn device(&self, tp: MosType, vth: MosVth) -> Result<&DeviceSpec> {
        self.devices
            .get(&(tp, vth))
            .ok_or_else(|| FridaError::PdkDeviceMissing {
                pdk: ArcStr::from(self.name.as_str()),
                tp: tp.as_str().to_string(),
                vth: vth.as_str().to_string(),
                available: self
                    .devices
                    .keys()
                    .sorted()
                    .map(|(t, v)| format!("({}, {})", t.as_str(), v.as_str()))
                    .join(", "),
            })
    }

    /// High-voltage I/O device of the given type, if the PDK has one.
    pub fn hv_device(&self, tp: MosType) -> Result<&DeviceSpec> {
        self.hv_devices.get(&tp).ok_or_else(|| FridaError::PdkDeviceMissing {
            pdk: ArcStr::from(self.name.as_str()),
            tp: tp.as_str().to_string(),
            vth: "hv".to_string(),
            available: self
                .hv_devices
                .keys()
                .sorted()
                .map(|t| format!("({}, hv)", t.as_str()))
                .join(", "),
        })
    }

    /// Maps a generic MOS primitive to this PDK's device call.
    pub fn mos_call(&self, params: &MosParams) -> Result<DeviceCall> {
        let tp = params.tp.unwrap_or(MosType::Nmos);
        let vth = params.vth.unwrap_or(MosVth::Std);
        let spec = self.device(tp, vth)?;

        let w = scale_dimension(params.w, self.w_min, self.default_w_mult);
        let l = scale_dimension(
            params.l,
            spec.l_min.unwrap_or(self.l_min),
            self.default_l_mult,
        );

        Ok(DeviceCall {
            device: spec.name.clone(),
            kind: spec.kind,
            params: vec![
                (ArcStr::from(self.shape.w), ParamValue::Dim(w)),
                (ArcStr::from(self.shape.l), ParamValue::Dim(l)),
                (
                    ArcStr::from(self.shape.fingers),
                    ParamValue::Int(params.nf.unwrap_or(1) as i64),
                ),
                (
                    ArcStr::from(self.shape.mult),
                    ParamValue::Int(params.mult.unwrap_or(1) as i64),
                ),
            ],
        })
    }

    /// Model includes for a process corner, in emission order.
    pub fn includes(&self, corner: Corner) -> Result<Vec<Include>> {
        let model_dir = self.model_path();
        self.includes
            .iter()
            .map(|rule| rule.resolve(&model_dir, corner, self.name))
            .collect()
    }

    /// Statistical model include used for Monte Carlo runs.
    pub fn mc_include(&self) -> Result<Option<Include>> {
        self.mc_include
            .as_ref()
            .map(|rule| rule.resolve(&self.model_path(), Corner::Typ, self.name))
            .transpose()
    }

    /// Checks that every include for `corner` exists on disk.
    pub fn verify_includes(&self, corner: Corner) -> Result<()> {
        for include in self.includes(corner)? {
            if !include.path.exists() {
                return Err(FridaError::Config(format!(
                    "missing model file for {}: {:?}",
                    self.name, include.path
                )));
            }
        }
        Ok(())
    }
}

/// The six regular-threshold catalog entries shared by most PDKs.
pub(crate) fn catalog(
    kind: DeviceKind,
    names: [(MosType, MosVth, &'static str); 6],
) -> HashMap<(MosType, MosVth), DeviceSpec> {
    names
        .into_iter()
        .map(|(tp, vth, name)| {
            (
                (tp, vth),
                DeviceSpec {
                    name: ArcStr::from(name),
                    kind,
                    l_min: None,
                },
            )
        })
        .collect()
}
