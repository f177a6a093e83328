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

pub use testbench::{sim_input, CompTb, CompTbParams};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreampDiffpair {
    #[serde(rename = "nmosinput")]
    NmosInput,
    #[serde(rename = "pmosinput")]
    PmosInput,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PreampBias {
    #[serde(rename = "stdbias")]
    StdBias,
    #[serde(rename = "dynbias")]
    DynBias,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompStages {
    #[serde(rename = "singlestage")]
    SingleStage,
    #[serde(rename = "doublestage")]
    DoubleStage,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatchPwrgateCtl {
    Clocked,
    Signalled,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatchPwrgateNode {
    External,
    Internal,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatchRstExternCtl {
    Clocked,
    Signalled,
    NoReset,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatchRstInternCtl {
    Clocked,
    Signalled,
}

impl PreampDiffpair {
    pub const ALL: [PreampDiffpair; 2] = [PreampDiffpair::NmosInput, PreampDiffpair::PmosInput];
}

impl PreampBias {
    pub const ALL: [PreampBias; 2] = [PreampBias::StdBias, PreampBias::DynBias];
}

impl CompStages {
    pub const ALL: [CompStages; 2] = [CompStages::SingleStage, CompStages::DoubleStage];
}

impl LatchPwrgateCtl {
    pub const ALL: [LatchPwrgateCtl; 2] = [LatchPwrgateCtl::Clocked, LatchPwrgateCtl::Signalled];
}

impl LatchPwrgateNode {
    pub const ALL: [LatchPwrgateNode; 2] = [LatchPwrgateNode::External, LatchPwrgateNode::Internal];
}

impl LatchRstExternCtl {
    pub const ALL: [LatchRstExternCtl; 3] = [
        LatchRstExternCtl::Clocked,
        LatchRstExternCtl::Signalled,
        LatchRstExternCtl::NoReset,
    ];
}

impl LatchRstInternCtl {
    pub const ALL: [LatchRstInternCtl; 2] =
        [LatchRstInternCtl::Clocked, LatchRstInternCtl::Signalled];
}

/// Comparator topology and sizing.
///
/// Widths and lengths are multiples of the PDK minimum dimensions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompParams {
    pub preamp_diffpair: PreampDiffpair,
    pub preamp_bias: PreampBias,
    pub comp_stages: CompStages,
    pub latch_pwrgate_ctl: LatchPwrgateCtl,
    pub latch_pwrgate_node: LatchPwrgateNode,
    pub latch_rst_extern_ctl: LatchRstExternCtl,
    pub latch_rst_intern_ctl: LatchRstInternCtl,

    pub diffpair_w: i64,
    pub diffpair_l: i64,
    pub diffpair_vth: MosVth,

    pub tail_w: i64,
    pub tail_l: i64,
    pub tail_vth: MosVth,

    pub rst_w: i64,
    pub rst_vth: MosVth,

    pub latch_w: i64,
    pub latch_vth: MosVth,
}

impl Default for CompParams {
    fn default() -> Self {
        Self {
            preamp_diffpair: PreampDiffpair::NmosInput,
            preamp_bias: PreampBias::StdBias,
            comp_stages: CompStages::SingleStage,
            latch_pwrgate_ctl: LatchPwrgateCtl::Clocked,
            latch_pwrgate_node: LatchPwrgateNode::External,
            latch_rst_extern_ctl: LatchRstExternCtl::Clocked,
            latch_rst_intern_ctl: LatchRstInternCtl::Clocked,
            diffpair_w: 40,
            diffpair_l: 1,
            diffpair_vth: MosVth::Low,
            tail_w: 20,
            tail_l: 2,
            tail_vth: MosVth::Std,
            rst_w: 20,
            rst_vth: MosVth::Low,
            latch_w: 20,
            latch_vth: MosVth::Low,
        }
    }
}

/// Whether the latch control fields form a buildable topology.
///
/// A single-stage comparator ignores the latch fields, so only the canonical
/// all-clocked external form is accepted. A double-stage comparator with an
/// internal power gate has no external reset.
pub fn is_valid_comp_params(p: &CompParams) -> bool {
    match p.comp_stages {
        CompStages::SingleStage => {
            p.latch_pwrgate_ctl == LatchPwrgateCtl::Clocked
                && p.latch_pwrgate_node == LatchPwrgateNode::External
                && p.latch_rst_extern_ctl == LatchRstExternCtl::Clocked
                && p.latch_rst_intern_ctl == LatchRstInternCtl::Clocked
        }
        CompStages::DoubleStage => {
            p.latch_pwrgate_node == LatchPwrgateNode::External
                || p.latch_rst_extern_ctl == LatchRstExternCtl::NoReset
        }
    }
}

fn sizes_valid(p: &CompParams) -> bool {
    [
        p.diffpair_w,
        p.diffpair_l,
        p.tail_w,
        p.tail_l,
        p.rst_w,
        p.latch_w,
    ]
    .iter()
    .all(|&x| x > 0)
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompAxes {
    pub preamp_diffpair: Option<Vec<PreampDiffpair>>,
    pub preamp_bias: Option<Vec<PreampBias>>,
    pub comp_stages: Option<Vec<CompStages>>,
    pub latch_pwrgate_ctl: Option<Vec<LatchPwrgateCtl>>,
    pub latch_pwrgate_node: Option<Vec<LatchPwrgateNode>>,
    pub latch_rst_extern_ctl: Option<Vec<LatchRstExternCtl>>,
    pub latch_rst_intern_ctl: Option<Vec<LatchRstInternCtl>>,
    pub diffpair_w: Option<Vec<i64>>,
}

fn axis<T: Copy>(values: &Option<Vec<T>>, all: &[T]) -> Vec<T> {
    values.clone().unwrap_or_else(|| all.to_vec())
}

/// Valid comparator variants.
///
/// Single-stage entries use the canonical latch fields whatever the latch
/// axes hold; double-stage entries take every valid combination of them.
pub fn variants(axes: &CompAxes) -> Vec<CompParams> {
    let diffpairs = axis(&axes.preamp_diffpair, &PreampDiffpair::ALL);
    let biases = axis(&axes.preamp_bias, &PreampBias::ALL);
    let stages = axis(&axes.comp_stages, &CompStages::ALL);
    let widths = axes.diffpair_w.clone().unwrap_or_else(|| vec![40, 80]);
    let latches: Vec<_> = iproduct!(
        axis(&axes.latch_pwrgate_ctl, &LatchPwrgateCtl::ALL),
        axis(&axes.latch_pwrgate_node, &LatchPwrgateNode::ALL),
        axis(&axes.latch_rst_extern_ctl, &LatchRstExternCtl::ALL),
        axis(&axes.latch_rst_intern_ctl, &LatchRstInternCtl::ALL)
    )
    .collect();

    let mut out = Vec::new();
    for (preamp_diffpair, preamp_bias, comp_stages, diffpair_w) in
        iproduct!(diffpairs, biases, stages, widths)
    {
        let base = CompParams {
            preamp_diffpair,
            preamp_bias,
            comp_stages,
            diffpair_w,
            ..Default::default()
        };
        let candidates = match comp_stages {
            CompStages::SingleStage => vec![base],
            CompStages::DoubleStage => latches
                .iter()
                .map(|&(ctl, node, ext, int)| CompParams {
                    latch_pwrgate_ctl: ctl,
                    latch_pwrgate_node: node,
                    latch_rst_extern_ctl: ext,
                    latch_rst_intern_ctl: int,
                    ..base
                })
                .collect(),
        };
        out.extend(
            candidates
                .into_iter()
                .filter(|p| is_valid_comp_params(p) && sizes_valid(p)),
        );
    }
    out
}

pub struct Comp {
    name: ArcStr,
    params: CompParams,
}

impl Component for Comp {
    type Params = CompParams;

    fn new(params: &Self::Params, _ctx: &FridaCtx) -> Result<Self> {
        if !is_valid_comp_params(params) {
            return Err(FridaError::param_invalid(
                "comp",
                format!(
                    "latch configuration {:?}/{:?}/{:?}/{:?} is not valid for {:?}",
                    params.latch_pwrgate_ctl,
                    params.latch_pwrgate_node,
                    params.latch_rst_extern_ctl,
                    params.latch_rst_intern_ctl,
                    params.comp_stages
                ),
            ));
        }
        if !sizes_valid(params) {
            return Err(FridaError::param_invalid(
                "comp",
                "device sizes must be positive",
            ));
        }
        Ok(Self {
            name: module_name("comp", params)?,
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

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::pdk::{MosType, PdkName};
    use crate::schematic::{Call, Primitive, PrimitiveKind};
    use crate::setup_ctx;

    #[test]
    fn test_validity_matrix() {
        let mut valid = 0;
        for (ctl, node, ext, int) in iproduct!(
            LatchPwrgateCtl::ALL,
            LatchPwrgateNode::ALL,
            LatchRstExternCtl::ALL,
            LatchRstInternCtl::ALL
        ) {
            for comp_stages in CompStages::ALL {
                let p = CompParams {
                    comp_stages,
                    latch_pwrgate_ctl: ctl,
                    latch_pwrgate_node: node,
                    latch_rst_extern_ctl: ext,
                    latch_rst_intern_ctl: int,
                    ..Default::default()
                };
                if is_valid_comp_params(&p) {
                    valid += 1;
                }
            }
        }
        // 1 single-stage form; double-stage: 2*3*2 external + 2*1*2 internal.
        assert_eq!(valid, 1 + 12 + 4);
    }

    #[test]
    fn test_variants() {
        let all = variants(&CompAxes::default());
        // Per (diffpair, bias, width): one single-stage and every valid double-stage latch.
        assert_eq!(all.len(), 2 * 2 * 2 * (1 + 16));
        assert!(all.iter().all(is_valid_comp_params));
        assert_eq!(all[0], CompParams::default());
        assert_eq!(all[1].comp_stages, CompStages::SingleStage);
        assert_eq!(all[1].diffpair_w, 80);
        assert_eq!(
            all[2],
            CompParams {
                comp_stages: CompStages::DoubleStage,
                ..Default::default()
            }
        );
        let double: HashSet<_> = all
            .iter()
            .filter(|p| p.comp_stages == CompStages::DoubleStage)
            .map(|p| {
                (
                    p.latch_pwrgate_ctl,
                    p.latch_pwrgate_node,
                    p.latch_rst_extern_ctl,
                    p.latch_rst_intern_ctl,
                )
            })
            .collect();
        assert_eq!(double.len(), 16);
    }

    #[test]
    fn test_latch_axes_restrict_double_stage() {
        let axes = CompAxes {
            preamp_diffpair: Some(vec![PreampDiffpair::NmosInput]),
            preamp_bias: Some(vec![PreampBias::StdBias]),
            diffpair_w: Some(vec![40]),
            latch_pwrgate_node: Some(vec![LatchPwrgateNode::Internal]),
            latch_pwrgate_ctl: Some(vec![LatchPwrgateCtl::Signalled]),
            ..Default::default()
        };
        let all = variants(&axes);
        // Single stage keeps its canonical latch; internal gates admit only NoReset.
        assert_eq!(all.len(), 1 + 2);
        assert_eq!(all[0], CompParams::default());
        assert!(all[1..]
            .iter()
            .all(|p| p.latch_rst_extern_ctl == LatchRstExternCtl::NoReset));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let ctx = setup_ctx(PdkName::Generic);
        let p = CompParams {
            latch_rst_extern_ctl: LatchRstExternCtl::NoReset,
            ..Default::default()
        };
        assert!(matches!(
            ctx.generate::<Comp>(&p),
            Err(FridaError::ParameterInvalid { .. })
        ));
    }

    fn mos_type(module: &crate::schematic::Module, name: &str) -> MosType {
        match &module.instance(name).unwrap().call {
            Call::Primitive(Primitive::Mos(p)) => p.tp.unwrap(),
            other => panic!("unexpected call {other:?}"),
        }
    }

    fn net<'a>(module: &'a crate::schematic::Module, name: &str, pin: &str) -> &'a str {
        module
            .instance(name)
            .unwrap_or_else(|| panic!("no instance {name}"))
            .net(pin)
            .unwrap()
            .as_str()
    }

    fn double_stage(
        ctl: LatchPwrgateCtl,
        node: LatchPwrgateNode,
        ext: LatchRstExternCtl,
        int: LatchRstInternCtl,
    ) -> CompParams {
        CompParams {
            comp_stages: CompStages::DoubleStage,
            latch_pwrgate_ctl: ctl,
            latch_pwrgate_node: node,
            latch_rst_extern_ctl: ext,
            latch_rst_intern_ctl: int,
            ..Default::default()
        }
    }

    const PORTS: [&str; 8] = ["inp", "inn", "outp", "outn", "clk", "clkb", "vdd", "vss"];

    #[test]
    fn test_single_stage_topology() -> Result<()> {
        let ctx = setup_ctx(PdkName::Generic);
        let comp = ctx.generate::<Comp>(&CompParams::default())?;
        assert_eq!(comp.port_bits(), PORTS.to_vec());
        assert_eq!(comp.primitives(PrimitiveKind::Mos).count(), 15);
        assert_eq!(mos_type(&comp, "mdiff_p"), MosType::Nmos);
        assert_eq!(mos_type(&comp, "mrst_p"), MosType::Pmos);
        // Resets precharge while the tail is off.
        for name in ["mtail", "mrst_p", "mrst_n", "mlatch_rst_p", "mlatch_rst_n"] {
            assert_eq!(net(&comp, name, "g"), "clk", "{name}");
        }
        assert_eq!(net(&comp, "mrst_p", "s"), "vdd");
        assert_eq!(net(&comp, "mtail", "s"), "vss");
        Ok(())
    }

    #[test]
    fn test_pmos_input_mirrors_rails_and_clocks() -> Result<()> {
        let ctx = setup_ctx(PdkName::Generic);
        let pmos = ctx.generate::<Comp>(&CompParams {
            preamp_diffpair: PreampDiffpair::PmosInput,
            preamp_bias: PreampBias::DynBias,
            ..Default::default()
        })?;
        assert_eq!(pmos.port_bits(), PORTS.to_vec());
        assert_eq!(mos_type(&pmos, "mdiff_p"), MosType::Pmos);
        assert_eq!(mos_type(&pmos, "mrst_p"), MosType::Nmos);
        assert_eq!(mos_type(&pmos, "ma_p"), MosType::Nmos);
        assert_eq!(mos_type(&pmos, "mb_p"), MosType::Pmos);
        assert_eq!(mos_type(&pmos, "mbuf_outp_top"), MosType::Pmos);
        for name in ["mtail", "mbias", "mrst_p", "mrst_n", "mlatch_rst_p", "mlatch_rst_n"] {
            assert_eq!(net(&pmos, name, "g"), "clkb", "{name}");
        }
        assert_eq!(net(&pmos, "mrst_p", "s"), "vss");
        assert_eq!(net(&pmos, "mbias", "s"), "vdd");
        assert_eq!(net(&pmos, "mdiff_p", "b"), "vdd");
        assert_eq!(net(&pmos, "cbias", "n"), "vss");
        Ok(())
    }

    #[test]
    fn test_double_stage_topology() -> Result<()> {
        let ctx = setup_ctx(PdkName::Tsmc65);
        let p = double_stage(
            LatchPwrgateCtl::Clocked,
            LatchPwrgateNode::Internal,
            LatchRstExternCtl::NoReset,
            LatchRstInternCtl::Clocked,
        );
        let comp = ctx.generate::<Comp>(&p)?;
        assert_eq!(comp.port_bits(), PORTS.to_vec());
        for name in ["mla_p", "mlb_n", "mconn_p", "mvdd_conn_p", "mpg_int", "mrst_int_n"] {
            assert!(comp.instance(name).is_some(), "{name}");
        }
        assert!(comp.signals.iter().any(|s| s == "latch_vdd"));
        assert_eq!(net(&comp, "mpg_int", "g"), "clk");
        assert_eq!(net(&comp, "mpg_int", "d"), "latch_vss");
        assert_eq!(net(&comp, "mrst_int_p", "g"), "clkb");
        assert_eq!(net(&comp, "mvdd_conn_p", "g"), "vss");
        let rewritten = ctx.rewrite(&comp)?;
        assert_eq!(rewritten.devices().count(), 20);
        Ok(())
    }

    #[test]
    fn test_pmos_double_stage_rails_conduct() -> Result<()> {
        let ctx = setup_ctx(PdkName::Generic);
        let ext = ctx.generate::<Comp>(&CompParams {
            preamp_diffpair: PreampDiffpair::PmosInput,
            comp_stages: CompStages::DoubleStage,
            ..Default::default()
        })?;
        // PMOS devices tied from vdd with their gate on vss are always on.
        assert_eq!(mos_type(&ext, "mvss_conn_p"), MosType::Pmos);
        assert_eq!(net(&ext, "mvss_conn_p", "g"), "vss");
        assert_eq!(net(&ext, "mvss_conn_p", "s"), "vdd");
        assert_eq!(mos_type(&ext, "mpg_ext_p"), MosType::Nmos);
        assert_eq!(net(&ext, "mpg_ext_p", "s"), "vss");
        assert_eq!(net(&ext, "mpg_ext_p", "g"), "clkb");
        assert_eq!(net(&ext, "mrst_ext_p", "g"), "clk");
        assert_eq!(net(&ext, "mrst_int_p", "g"), "clk");

        let int = ctx.generate::<Comp>(&CompParams {
            preamp_diffpair: PreampDiffpair::PmosInput,
            ..double_stage(
                LatchPwrgateCtl::Clocked,
                LatchPwrgateNode::Internal,
                LatchRstExternCtl::NoReset,
                LatchRstInternCtl::Clocked,
            )
        })?;
        assert_eq!(mos_type(&int, "mvdd_conn_p"), MosType::Nmos);
        assert_eq!(net(&int, "mvdd_conn_p", "g"), "vdd");
        assert_eq!(net(&int, "mvdd_conn_p", "s"), "vss");
        assert_eq!(mos_type(&int, "mpg_int"), MosType::Pmos);
        assert_eq!(net(&int, "mpg_int", "g"), "clkb");
        assert_eq!(net(&int, "mpg_int", "s"), "vdd");
        Ok(())
    }

    #[test]
    fn test_pwrgate_ctl_options() -> Result<()> {
        let ctx = setup_ctx(PdkName::Generic);
        let gen = |ctl, node, ext| {
            ctx.generate::<Comp>(&double_stage(ctl, node, ext, LatchRstInternCtl::Clocked))
        };

        let clocked = gen(
            LatchPwrgateCtl::Clocked,
            LatchPwrgateNode::External,
            LatchRstExternCtl::Clocked,
        )?;
        let signalled = gen(
            LatchPwrgateCtl::Signalled,
            LatchPwrgateNode::External,
            LatchRstExternCtl::Clocked,
        )?;
        assert_eq!(net(&clocked, "mpg_ext_p", "g"), "clk");
        assert_eq!(net(&clocked, "mpg_ext_n", "g"), "clk");
        assert_eq!(net(&signalled, "mpg_ext_p", "g"), "latch_n");
        assert_eq!(net(&signalled, "mpg_ext_n", "g"), "latch_p");
        assert_eq!(clocked.port_bits(), signalled.port_bits());

        let int_clocked = gen(
            LatchPwrgateCtl::Clocked,
            LatchPwrgateNode::Internal,
            LatchRstExternCtl::NoReset,
        )?;
        let int_signalled = gen(
            LatchPwrgateCtl::Signalled,
            LatchPwrgateNode::Internal,
            LatchRstExternCtl::NoReset,
        )?;
        assert!(int_clocked.instance("mpg_int").is_some());
        assert!(int_signalled.instance("mpg_int").is_none());
        assert_eq!(net(&int_signalled, "mpg_int_p", "g"), "latch_p");
        assert_eq!(net(&int_signalled, "mpg_int_p", "d"), "latch_vss_p");
        // The internal reset stacks on the split gate.
        assert_eq!(net(&int_signalled, "mrst_int_p", "d"), "latch_vss");
        assert_eq!(net(&int_signalled, "mrst_int_p", "s"), "latch_vss_p");
        assert_eq!(net(&int_signalled, "mrst_int_n", "s"), "latch_vss_n");
        Ok(())
    }

    #[test]
    fn test_pwrgate_node_options() -> Result<()> {
        let ctx = setup_ctx(PdkName::Generic);
        let ext = ctx.generate::<Comp>(&double_stage(
            LatchPwrgateCtl::Clocked,
            LatchPwrgateNode::External,
            LatchRstExternCtl::NoReset,
            LatchRstInternCtl::Clocked,
        ))?;
        let int = ctx.generate::<Comp>(&double_stage(
            LatchPwrgateCtl::Clocked,
            LatchPwrgateNode::Internal,
            LatchRstExternCtl::NoReset,
            LatchRstInternCtl::Clocked,
        ))?;
        for name in ["mpg_ext_p", "mpg_ext_n", "mvss_conn_p", "mvss_conn_n"] {
            assert!(ext.instance(name).is_some(), "{name}");
            assert!(int.instance(name).is_none(), "{name}");
        }
        for name in ["mvdd_conn_p", "mvdd_conn_n", "mpg_int"] {
            assert!(ext.instance(name).is_none(), "{name}");
            assert!(int.instance(name).is_some(), "{name}");
        }
        assert_eq!(net(&ext, "mpg_ext_p", "d"), "latch_vdd");
        assert_eq!(net(&ext, "mvss_conn_p", "g"), "vdd");
        assert_eq!(net(&int, "mpg_int", "s"), "vss");
        Ok(())
    }

    #[test]
    fn test_rst_extern_options() -> Result<()> {
        let ctx = setup_ctx(PdkName::Generic);
        let gen = |ext| {
            ctx.generate::<Comp>(&double_stage(
                LatchPwrgateCtl::Clocked,
                LatchPwrgateNode::External,
                ext,
                LatchRstInternCtl::Clocked,
            ))
        };
        let clocked = gen(LatchRstExternCtl::Clocked)?;
        let signalled = gen(LatchRstExternCtl::Signalled)?;
        let none = gen(LatchRstExternCtl::NoReset)?;

        assert_eq!(net(&clocked, "mrst_ext_p", "g"), "clkb");
        assert_eq!(net(&clocked, "mrst_ext_p", "s"), "latch_vdd");
        assert_eq!(mos_type(&clocked, "mrst_ext_p"), MosType::Pmos);
        assert_eq!(net(&signalled, "mrst_ext_p", "g"), "latch_n");
        assert_eq!(net(&signalled, "mrst_ext_n", "g"), "latch_p");
        assert!(none.instance("mrst_ext_p").is_none());
        assert_eq!(
            clocked.primitives(PrimitiveKind::Mos).count(),
            none.primitives(PrimitiveKind::Mos).count() + 2
        );
        Ok(())
    }

    #[test]
    fn test_rst_intern_options() -> Result<()> {
        let ctx = setup_ctx(PdkName::Generic);
        let gen = |int| {
            ctx.generate::<Comp>(&double_stage(
                LatchPwrgateCtl::Clocked,
                LatchPwrgateNode::External,
                LatchRstExternCtl::Clocked,
                int,
            ))
        };
        let clocked = gen(LatchRstInternCtl::Clocked)?;
        let signalled = gen(LatchRstInternCtl::Signalled)?;
        assert_eq!(net(&clocked, "mrst_int_p", "g"), "clkb");
        assert_eq!(net(&clocked, "mrst_int_p", "s"), "latch_vss");
        assert_eq!(net(&signalled, "mrst_int_p", "g"), "latch_n");
        assert_eq!(net(&signalled, "mrst_int_n", "g"), "latch_p");
        assert_eq!(mos_type(&signalled, "mrst_int_p"), MosType::Nmos);
        Ok(())
    }

    #[test]
    fn test_every_latch_variant_is_distinct() -> Result<()> {
        let ctx = setup_ctx(PdkName::Generic);
        let axes = CompAxes {
            preamp_diffpair: Some(vec![PreampDiffpair::NmosInput]),
            preamp_bias: Some(vec![PreampBias::StdBias]),
            comp_stages: Some(vec![CompStages::DoubleStage]),
            diffpair_w: Some(vec![40]),
            ..Default::default()
        };
        let mut seen = Vec::new();
        for p in variants(&axes) {
            let comp = ctx.generate::<Comp>(&p)?;
            let body = (comp.signals.clone(), comp.instances.clone());
            assert!(!seen.contains(&body), "{p:?} duplicates another variant");
            seen.push(body);
        }
        assert_eq!(seen.len(), 16);
        Ok(())
    }
}
