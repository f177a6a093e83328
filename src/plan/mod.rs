//! Variant planning and flow execution.
//!
//! A [`RunPlan`] lists the parameter variants of every requested block.
//! [`execute_plan`] writes one netlist per variant, optionally runs the
//! simulator on each and reduces the results to metrics.

use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use serde::Serialize;
use serde_json::Value;

use crate::blocks::adc::{Adc, AdcParams};
use crate::blocks::cdac::{self, Cdac, CdacParams, CdacTbParams};
use crate::blocks::comp::{self, Comp, CompParams, CompTbParams};
use crate::blocks::samp::{self, Samp, SampParams, SampTbParams};
use crate::cli::progress::StepContext;
use crate::config::{Pvt, RunConfig};
use crate::error::FridaError;
use crate::measure::metrics::{cdac_metrics, comp_metrics, samp_metrics};
use crate::measure::MeasurementResult;
use crate::netlist::{params_to_filename, write_module_to_file, write_sim_netlist, DutFormat};
use crate::paths::{out_netlist, out_sim_dir};
use crate::pdk::PdkName;
use crate::schematic::{FridaCtx, Module};
use crate::sim::executor::{run_batch, Executor, LocalExecutor, SimJob, SimOutcome};
use crate::sim::remote::RemoteExecutor;
use crate::sim::{Analysis, MonteCarloConfig, Sim, Simulator};
use crate::Result;

/// Variants kept by [`Mode::Min`].
pub const MIN_VARIANTS: usize = 10;

/// Errors listed in a run summary before the rest are elided.
pub const MAX_LISTED_ERRORS: usize = 5;

/// How far a run goes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
pub enum Flow {
    Netlist,
    Simulate,
    Measure,
}

impl Display for Flow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Flow::Netlist => "netlist",
            Flow::Simulate => "simulate",
            Flow::Measure => "measure",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Mode {
    /// The first [`MIN_VARIANTS`] variants.
    Min,
    /// The full cartesian product.
    Max,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum BlockKind {
    Samp,
    Comp,
    Cdac,
    Adc,
    All,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Samp => "samp",
            BlockKind::Comp => "comp",
            BlockKind::Cdac => "cdac",
            BlockKind::Adc => "adc",
            BlockKind::All => "all",
        }
    }

    /// The concrete blocks this selection covers.
    pub fn expand(&self) -> Vec<BlockKind> {
        match self {
            BlockKind::All => vec![
                BlockKind::Samp,
                BlockKind::Comp,
                BlockKind::Cdac,
                BlockKind::Adc,
            ],
            other => vec![*other],
        }
    }

    /// Blocks without a testbench are exported as a DUT only.
    pub fn has_testbench(&self) -> bool {
        !matches!(self, BlockKind::Adc | BlockKind::All)
    }
}

impl Display for BlockKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum TaskKey {
    GeneratePlan,
    GenerateNetlist,
    RunSimulations,
    MeasureResults,
}

pub fn select_variants<T>(mut variants: Vec<T>, mode: Mode) -> Vec<T> {
    if mode == Mode::Min {
        variants.truncate(MIN_VARIANTS);
    }
    variants
}

fn wrap_analyses(analyses: Vec<Analysis>, config: &MonteCarloConfig) -> Vec<Analysis> {
    analyses
        .into_iter()
        .map(|a| match a {
            Analysis::Tran(_) => Analysis::MonteCarlo {
                config: config.clone(),
                inner: vec![a],
            },
            other => other,
        })
        .collect()
}

/// Wraps every transient analysis of `sim` in a Monte Carlo sweep.
///
/// A simulation that already has a Monte Carlo analysis is returned
/// unchanged.
pub fn wrap_monte_carlo(mut sim: Sim, config: &MonteCarloConfig) -> Sim {
    if sim.is_monte_carlo() {
        return sim;
    }
    sim.analyses = wrap_analyses(std::mem::take(&mut sim.analyses), config);
    sim
}

/// Unique values of each parameter field across `variants`, in first-seen
/// order. Fields keep their declaration order.
pub type ParamAxes = Vec<(String, Vec<Value>)>;

pub fn get_param_axes<P: Serialize>(variants: &[P]) -> Result<ParamAxes> {
    let mut axes: ParamAxes = Vec::new();
    for v in variants {
        let Value::Object(map) = serde_json::to_value(v)? else {
            continue;
        };
        for (field, value) in map {
            let idx = match axes.iter().position(|(f, _)| *f == field) {
                Some(idx) => idx,
                None => {
                    axes.push((field, Vec::new()));
                    axes.len() - 1
                }
            };
            let values = &mut axes[idx].1;
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    Ok(axes)
}

/// Variants of one block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockVariants {
    Samp(Vec<SampParams>),
    Comp(Vec<CompParams>),
    Cdac(Vec<CdacParams>),
    Adc(Vec<AdcParams>),
}

impl BlockVariants {
    pub fn kind(&self) -> BlockKind {
        match self {
            BlockVariants::Samp(_) => BlockKind::Samp,
            BlockVariants::Comp(_) => BlockKind::Comp,
            BlockVariants::Cdac(_) => BlockKind::Cdac,
            BlockVariants::Adc(_) => BlockKind::Adc,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            BlockVariants::Samp(v) => v.len(),
            BlockVariants::Comp(v) => v.len(),
            BlockVariants::Cdac(v) => v.len(),
            BlockVariants::Adc(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn axes(&self) -> Result<ParamAxes> {
        match self {
            BlockVariants::Samp(v) => get_param_axes(v),
            BlockVariants::Comp(v) => get_param_axes(v),
            BlockVariants::Cdac(v) => get_param_axes(v),
            BlockVariants::Adc(v) => get_param_axes(v),
        }
    }
}

/// Everything a run needs besides the generation context.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub flow: Flow,
    pub pdk: PdkName,
    pub simulator: Simulator,
    /// Export DUTs in this format instead of writing testbench netlists.
    pub dut_format: Option<DutFormat>,
    pub pvt: Pvt,
    pub montecarlo: Option<MonteCarloConfig>,
    pub timeout: Option<Duration>,
    pub sim_server: Option<String>,
    pub jobs: usize,
    pub blocks: Vec<BlockVariants>,
}

/// CLI-level choices that shape a [`RunPlan`].
#[derive(Debug, Clone)]
pub struct PlanOptions {
    pub flow: Flow,
    pub mode: Mode,
    pub block: BlockKind,
    pub pdk: PdkName,
    pub simulator: Simulator,
    pub dut_format: Option<DutFormat>,
    pub montecarlo: bool,
    pub sim_server: Option<String>,
    pub jobs: Option<usize>,
}

pub fn generate_plan(opts: &PlanOptions, config: &RunConfig) -> Result<RunPlan> {
    if opts.montecarlo && !opts.simulator.supports_monte_carlo() {
        bail!(FridaError::Config(format!(
            "Monte Carlo analyses require spectre, not {}",
            opts.simulator
        )));
    }
    if opts.flow > Flow::Netlist && opts.dut_format.is_some() {
        bail!(FridaError::Config(
            "DUT-only exports cannot be simulated; drop the format or use --flow netlist".into()
        ));
    }

    let blocks = opts
        .block
        .expand()
        .into_iter()
        .map(|kind| match kind {
            BlockKind::Samp => {
                BlockVariants::Samp(select_variants(samp::variants(&config.samp), opts.mode))
            }
            BlockKind::Comp => {
                BlockVariants::Comp(select_variants(comp::variants(&config.comp), opts.mode))
            }
            BlockKind::Cdac => {
                BlockVariants::Cdac(select_variants(cdac::variants(&config.cdac), opts.mode))
            }
            BlockKind::Adc | BlockKind::All => BlockVariants::Adc(vec![AdcParams::default()]),
        })
        .collect();

    let jobs = opts
        .jobs
        .or(config.sim.jobs)
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, |n| n.get()));

    Ok(RunPlan {
        flow: opts.flow,
        pdk: opts.pdk,
        simulator: opts.simulator,
        dut_format: opts.dut_format,
        pvt: config.pvt,
        montecarlo: opts.montecarlo.then(|| config.montecarlo.clone()),
        timeout: config.sim.timeout_secs.map(Duration::from_secs),
        sim_server: opts.sim_server.clone(),
        jobs,
        blocks,
    })
}

/// Where and how [`run_netlist_variants`] writes its artifacts.
#[derive(Debug, Clone)]
pub struct NetlistOptions {
    pub outdir: PathBuf,
    pub simulator: Simulator,
    pub dut_format: Option<DutFormat>,
    pub montecarlo: Option<MonteCarloConfig>,
    pub timeout: Option<Duration>,
    /// Keep the simulation descriptions in the outcome.
    pub return_sims: bool,
}

#[derive(Debug, Default)]
pub struct NetlistOutcome {
    pub written: Vec<PathBuf>,
    /// One job per testbench netlist; empty for DUT exports.
    pub jobs: Vec<SimJob>,
    pub sims: Vec<Sim>,
    pub errors: Vec<String>,
    pub wall_time: Duration,
}

pub type BuildSim<'a, P> = &'a dyn Fn(&FridaCtx, &P) -> crate::error::Result<Sim>;
pub type BuildDut<'a, P> = &'a dyn Fn(&FridaCtx, &P) -> crate::error::Result<Arc<Module>>;

/// Writes one netlist per variant, in order.
///
/// A variant that fails to build is logged and recorded in the outcome;
/// errors that indicate a broken configuration abort the whole batch.
pub fn run_netlist_variants<P: Serialize>(
    ctx: &FridaCtx,
    block: &str,
    variants: &[P],
    build_sim: BuildSim<'_, P>,
    build_dut: Option<BuildDut<'_, P>>,
    opts: &NetlistOptions,
) -> Result<NetlistOutcome> {
    let start = Instant::now();
    if let Some(format) = opts.dut_format {
        if opts.return_sims {
            bail!(FridaError::Config(format!(
                "{format} exports carry no simulation to return"
            )));
        }
        if build_dut.is_none() {
            bail!(FridaError::Config(format!(
                "{block} has no DUT builder for {format} export"
            )));
        }
    }
    std::fs::create_dir_all(&opts.outdir)
        .with_context(|| format!("failed to create {:?}", opts.outdir))?;

    let pdk = ctx.pdk().name;
    let mut outcome = NetlistOutcome::default();
    for (i, params) in variants.iter().enumerate() {
        let res = params_to_filename(block, params, pdk).and_then(|stem| {
            match (opts.dut_format, build_dut) {
                (Some(format), Some(build_dut)) => {
                    let dut = ctx.rewrite(&build_dut(ctx, params)?)?;
                    let path = opts.outdir.join(format!("{stem}.{}", format.extension()));
                    write_module_to_file(&dut, ctx.pdk(), format, &path)?;
                    outcome.written.push(path);
                }
                _ => {
                    let mut sim = build_sim(ctx, params)?;
                    if let Some(mc) = &opts.montecarlo {
                        sim = wrap_monte_carlo(sim, mc);
                    }
                    if let Some(timeout) = opts.timeout {
                        sim.set_timeout(timeout);
                    }
                    let path = out_netlist(&opts.outdir, &stem, opts.simulator);
                    write_sim_netlist(ctx, &sim, opts.simulator, &path)?;
                    outcome.jobs.push(SimJob {
                        name: stem.clone(),
                        simulator: opts.simulator,
                        netlist: path.clone(),
                        work_dir: out_sim_dir(&opts.outdir, &stem),
                        timeout: sim.timeout(),
                    });
                    outcome.written.push(path);
                    if opts.return_sims {
                        outcome.sims.push(sim);
                    }
                }
            }
            Ok(())
        });

        match res {
            Ok(()) => {}
            Err(e) if e.is_fatal() => {
                return Err(e).with_context(|| format!("{block} variant {i}"));
            }
            Err(e) => {
                log::warn!("skipping {block} variant {i}: {e}");
                outcome.errors.push(format!("variant {i}: {e}"));
            }
        }
    }
    outcome.wall_time = start.elapsed();
    log::info!(
        "wrote {} {block} netlists to {:?} in {:?}",
        outcome.written.len(),
        opts.outdir,
        outcome.wall_time
    );
    Ok(outcome)
}

/// Formats the table printed after a block's netlists are written.
#[allow(clippy::too_many_arguments)]
pub fn format_netlist_summary(
    flow: Flow,
    block: &str,
    pdk: PdkName,
    count: usize,
    axes: &ParamAxes,
    wall_time: Duration,
    outdir: &Path,
    errors: &[String],
) -> String {
    const WIDTH: usize = 80;
    const MIN_COL: usize = 12;
    let rule = "-".repeat(WIDTH);
    let mut out = Vec::new();

    out.push(String::new());
    out.push(format!("Flow:       {flow}"));
    out.push(format!("Block:      {block}"));
    out.push(format!("Tech:       {pdk}"));
    out.push(format!("OutDir:     {}", outdir.display()));
    out.push(rule.clone());

    if !axes.is_empty() {
        let widths: Vec<usize> = axes
            .iter()
            .map(|(name, values)| {
                MIN_COL
                    .max(name.len())
                    .max(format!("{}x", values.len()).len())
            })
            .collect();
        let header: Vec<String> = axes
            .iter()
            .zip(&widths)
            .map(|((name, _), w)| format!("{name:<w$}"))
            .collect();
        let counts: Vec<String> = axes
            .iter()
            .zip(&widths)
            .map(|((_, values), w)| format!("{:<w$}", format!("{}x", values.len())))
            .collect();
        out.push(header.join(" ").trim_end().to_string());
        out.push(rule.clone());
        out.push(counts.join(" ").trim_end().to_string());
        out.push(rule);
    }

    out.push(format!("Result:      {count} netlists generated"));
    out.push(format!(
        "Wall Time:   {:.1}ms",
        wall_time.as_secs_f64() * 1000.0
    ));
    if errors.is_empty() {
        out.push("Errors:      [none]".to_string());
    } else {
        out.push(format!("Errors:      {} errors", errors.len()));
        for e in errors.iter().take(MAX_LISTED_ERRORS) {
            out.push(format!("             - {e}"));
        }
        if errors.len() > MAX_LISTED_ERRORS {
            out.push(format!(
                "             ... and {} more",
                errors.len() - MAX_LISTED_ERRORS
            ));
        }
    }
    out.push(String::new());
    out.join("\n")
}

#[allow(clippy::too_many_arguments)]
pub fn print_netlist_summary(
    flow: Flow,
    block: &str,
    pdk: PdkName,
    count: usize,
    axes: &ParamAxes,
    wall_time: Duration,
    outdir: &Path,
    errors: &[String],
) {
    println!(
        "{}",
        format_netlist_summary(flow, block, pdk, count, axes, wall_time, outdir, errors)
    );
}

/// Per-block result of [`execute_plan`].
#[derive(Debug)]
pub struct BlockReport {
    pub kind: BlockKind,
    pub outdir: PathBuf,
    pub axes: ParamAxes,
    pub netlist: NetlistOutcome,
    pub sim_errors: Vec<String>,
    pub metrics: BTreeMap<String, MeasurementResult>,
}

impl BlockReport {
    pub fn print_summary(&self, flow: Flow, pdk: PdkName) {
        let mut errors = self.netlist.errors.clone();
        errors.extend(self.sim_errors.iter().cloned());
        print_netlist_summary(
            flow,
            self.kind.as_str(),
            pdk,
            self.netlist.written.len(),
            &self.axes,
            self.netlist.wall_time,
            &self.outdir,
            &errors,
        );
    }
}

pub struct ExecutePlanParams<'a> {
    pub work_dir: &'a Path,
    pub plan: &'a RunPlan,
    pub tasks: &'a HashSet<TaskKey>,
    pub ctx: Option<&'a mut StepContext>,
}

macro_rules! try_finish_task {
    ( $ctx:expr, $task:expr ) => {
        if let Some(ctx) = $ctx.as_mut() {
            ctx.finish($task);
        }
    };
}

fn netlist_block(
    fctx: &FridaCtx,
    plan: &RunPlan,
    variants: &BlockVariants,
    outdir: &Path,
) -> Result<NetlistOutcome> {
    let pvt = plan.pvt;
    let kind = variants.kind();
    let dut_format = match (plan.dut_format, kind.has_testbench()) {
        (Some(f), _) => Some(f),
        (None, true) => None,
        // Blocks without a testbench follow the simulator's dialect.
        (None, false) => Some(match plan.simulator {
            Simulator::Spectre => DutFormat::Spectre,
            Simulator::Ngspice | Simulator::Xyce => DutFormat::Ngspice,
        }),
    };
    let opts = NetlistOptions {
        outdir: outdir.to_path_buf(),
        simulator: plan.simulator,
        dut_format,
        montecarlo: plan.montecarlo.clone(),
        timeout: plan.timeout,
        return_sims: false,
    };
    let block = kind.as_str();
    match variants {
        BlockVariants::Samp(v) => {
            let build_sim: BuildSim<'_, SampParams> =
                &|c, p| samp::sim_input(c, &SampTbParams::new(*p, pvt));
            let build_dut: BuildDut<'_, SampParams> = &|c, p| c.generate::<Samp>(p);
            run_netlist_variants(fctx, block, v, build_sim, Some(build_dut), &opts)
        }
        BlockVariants::Comp(v) => {
            let build_sim: BuildSim<'_, CompParams> =
                &|c, p| comp::sim_input(c, &CompTbParams::new(*p, pvt));
            let build_dut: BuildDut<'_, CompParams> = &|c, p| c.generate::<Comp>(p);
            run_netlist_variants(fctx, block, v, build_sim, Some(build_dut), &opts)
        }
        BlockVariants::Cdac(v) => {
            let build_sim: BuildSim<'_, CdacParams> =
                &|c, p| cdac::sim_input(c, &CdacTbParams::new(*p, pvt));
            let build_dut: BuildDut<'_, CdacParams> = &|c, p| c.generate::<Cdac>(p);
            run_netlist_variants(fctx, block, v, build_sim, Some(build_dut), &opts)
        }
        BlockVariants::Adc(v) => {
            let build_sim: BuildSim<'_, AdcParams> = &|_, _| {
                Err(FridaError::Config(
                    "the adc has no testbench; export it as a DUT".into(),
                ))
            };
            let build_dut: BuildDut<'_, AdcParams> = &|c, p| c.generate::<Adc>(p);
            run_netlist_variants(fctx, block, v, build_sim, Some(build_dut), &opts)
        }
    }
}

fn measure_job(
    kind: BlockKind,
    job: &SimJob,
    vdd: f64,
) -> crate::error::Result<MeasurementResult> {
    let raw = job.load_result()?;
    match kind {
        BlockKind::Samp => samp_metrics(&raw, vdd),
        BlockKind::Comp => comp_metrics(&raw, vdd),
        BlockKind::Cdac => cdac_metrics(&raw, CdacTbParams::default().t_step),
        BlockKind::Adc | BlockKind::All => Err(FridaError::Config(format!(
            "no metrics are defined for {kind}"
        ))),
    }
}

/// Runs `jobs` and returns the successful outcomes plus per-job errors.
fn simulate(
    executor: &dyn Executor,
    jobs: &[SimJob],
    max_jobs: usize,
) -> Result<(Vec<(SimJob, SimOutcome)>, Vec<String>)> {
    for job in jobs {
        std::fs::create_dir_all(&job.work_dir)?;
    }
    let results = run_batch(executor, jobs, max_jobs)?;
    let mut done = Vec::new();
    let mut errors = Vec::new();
    for (job, res) in jobs.iter().zip(results) {
        match res {
            Ok(outcome) => done.push((job.clone(), outcome)),
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                log::warn!("{e}");
                errors.push(e.to_string());
            }
        }
    }
    Ok((done, errors))
}

pub fn execute_plan(fctx: &FridaCtx, params: ExecutePlanParams) -> Result<Vec<BlockReport>> {
    let ExecutePlanParams {
        work_dir,
        plan,
        mut ctx,
        ..
    } = params;

    std::fs::create_dir_all(work_dir)?;

    let mut reports = Vec::with_capacity(plan.blocks.len());
    for variants in plan.blocks.iter() {
        let kind = variants.kind();
        let outdir = work_dir.join(kind.as_str());
        let netlist = netlist_block(fctx, plan, variants, &outdir)?;
        reports.push(BlockReport {
            kind,
            outdir,
            axes: variants.axes()?,
            netlist,
            sim_errors: Vec::new(),
            metrics: BTreeMap::new(),
        });
    }
    try_finish_task!(ctx, TaskKey::GenerateNetlist);

    if plan.flow == Flow::Netlist {
        return Ok(reports);
    }

    let local;
    let remote;
    let executor: &dyn Executor = match &plan.sim_server {
        Some(target) => {
            remote = RemoteExecutor::new(target)?;
            log::info!("simulating on {}", remote.target());
            &remote
        }
        None => {
            local = LocalExecutor::new();
            &local
        }
    };

    let mut finished = Vec::with_capacity(reports.len());
    for report in reports.iter_mut() {
        let (done, errors) = simulate(executor, &report.netlist.jobs, plan.jobs)?;
        report.sim_errors = errors;
        finished.push(done);
    }
    try_finish_task!(ctx, TaskKey::RunSimulations);

    if plan.flow == Flow::Simulate {
        return Ok(reports);
    }

    let vdd = fctx.pdk().supply.corner(plan.pvt.v);
    for (report, done) in reports.iter_mut().zip(finished) {
        if !report.kind.has_testbench() {
            continue;
        }
        for (job, outcome) in done {
            if plan.montecarlo.is_some() {
                log::warn!(
                    "{}: Monte Carlo results are not reduced to metrics",
                    outcome.name
                );
                continue;
            }
            match measure_job(report.kind, &job, vdd) {
                Ok(m) => {
                    report.metrics.insert(job.name.clone(), m);
                }
                Err(e) => {
                    log::warn!("{}: {e}", job.name);
                    report.sim_errors.push(format!("{}: {e}", job.name));
                }
            }
        }
        let path = report.outdir.join("metrics.json");
        std::fs::write(&path, serde_json::to_string_pretty(&report.metrics)?)
            .with_context(|| format!("failed to write {path:?}"))?;
        log::info!("wrote {path:?}");
    }
    try_finish_task!(ctx, TaskKey::MeasureResults);

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::blocks::samp::{SampAxes, SwitchType};
    use crate::pdk::MosVth;
    use crate::setup_ctx;
    use crate::sim::TranAnalysis;

    fn samp_axes() -> SampAxes {
        SampAxes {
            switch_type: Some(vec![SwitchType::Nmos]),
            w: Some(vec![5, 10]),
            l: Some(vec![1]),
            vth: Some(vec![MosVth::Low]),
        }
    }

    #[test]
    fn test_select_variants() {
        let v: Vec<usize> = (0..25).collect();
        assert_eq!(select_variants(v.clone(), Mode::Min), (0..10).collect::<Vec<_>>());
        assert_eq!(select_variants(v.clone(), Mode::Max), v);
        assert_eq!(select_variants(vec![1, 2], Mode::Min), vec![1, 2]);
    }

    #[test]
    fn test_wrap_monte_carlo_is_idempotent() -> Result<()> {
        let ctx = setup_ctx(PdkName::Generic);
        let sim = samp::sim_input(&ctx, &SampTbParams::default())?;
        let config = MonteCarloConfig::default();
        let once = wrap_monte_carlo(sim, &config);
        assert!(once.is_monte_carlo());
        assert_eq!(
            once.tran_analysis(),
            Some(&TranAnalysis {
                tstop: 500e-9,
                tstep: 100e-12
            })
        );
        let twice = wrap_monte_carlo(once.clone(), &config);
        assert_eq!(once, twice);
        Ok(())
    }

    #[test]
    fn test_param_axes() -> Result<()> {
        let variants = samp::variants(&samp_axes());
        let axes = get_param_axes(&variants)?;
        let names: Vec<&str> = axes.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["switch_type", "w", "l", "vth"]);
        assert_eq!(axes[1].1, vec![Value::from(5), Value::from(10)]);
        assert_eq!(axes[2].1.len(), 1);
        Ok(())
    }

    #[test]
    fn test_netlist_summary() {
        let axes: ParamAxes = vec![
            ("w".to_string(), vec![Value::from(5), Value::from(10)]),
            ("switch_type".to_string(), vec![Value::from("nmos")]),
        ];
        let errors: Vec<String> = (0..7).map(|i| format!("variant {i}: bad")).collect();
        let s = format_netlist_summary(
            Flow::Netlist,
            "samp",
            PdkName::Ihp130,
            3,
            &axes,
            Duration::from_millis(12),
            Path::new("build/samp"),
            &errors,
        );
        assert!(s.contains("Block:      samp"));
        assert!(s.contains("Tech:       ihp130"));
        assert!(s.contains("w            switch_type"));
        assert!(s.contains("2x           1x"));
        assert!(s.contains("Result:      3 netlists generated"));
        assert!(s.contains("Wall Time:   12.0ms"));
        assert!(s.contains("Errors:      7 errors"));
        assert!(s.contains("- variant 4: bad"));
        assert!(!s.contains("- variant 5: bad"));
        assert!(s.contains("... and 2 more"));
    }

    #[test]
    fn test_run_netlist_variants() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let ctx = setup_ctx(PdkName::Generic);
        let variants = samp::variants(&samp_axes());
        let opts = NetlistOptions {
            outdir: dir.path().to_path_buf(),
            simulator: Simulator::Ngspice,
            dut_format: None,
            montecarlo: None,
            timeout: Some(Duration::from_secs(60)),
            return_sims: true,
        };
        let outcome = run_netlist_variants(
            &ctx,
            "samp",
            &variants,
            &|c, p| samp::sim_input(c, &SampTbParams::new(*p, Pvt::default())),
            None,
            &opts,
        )?;
        assert_eq!(outcome.written.len(), 2);
        assert_eq!(outcome.jobs.len(), 2);
        assert_eq!(outcome.sims.len(), 2);
        assert!(outcome.errors.is_empty());
        for (path, job) in outcome.written.iter().zip(&outcome.jobs) {
            assert!(path.exists());
            assert_eq!(path.extension().and_then(|e| e.to_str()), Some("sp"));
            assert!(job.name.ends_with("_generic"));
            assert_eq!(job.timeout, Some(Duration::from_secs(60)));
        }
        Ok(())
    }

    #[test]
    fn test_variant_errors_do_not_abort() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let ctx = setup_ctx(PdkName::Generic);
        let variants = samp::variants(&samp_axes());
        let opts = NetlistOptions {
            outdir: dir.path().to_path_buf(),
            simulator: Simulator::Spectre,
            dut_format: None,
            montecarlo: None,
            timeout: None,
            return_sims: false,
        };
        let outcome = run_netlist_variants(
            &ctx,
            "samp",
            &variants,
            &|c, p: &SampParams| {
                if p.w == 5 {
                    return Err(FridaError::param_invalid("samp", "w too small"));
                }
                samp::sim_input(c, &SampTbParams::new(*p, Pvt::default()))
            },
            None,
            &opts,
        )?;
        assert_eq!(outcome.written.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("w too small"));
        Ok(())
    }

    #[test]
    fn test_fatal_errors_abort() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let ctx = setup_ctx(PdkName::Generic);
        let variants = samp::variants(&samp_axes());
        let opts = NetlistOptions {
            outdir: dir.path().to_path_buf(),
            simulator: Simulator::Ngspice,
            dut_format: None,
            montecarlo: Some(MonteCarloConfig::default()),
            timeout: None,
            return_sims: false,
        };
        let res = run_netlist_variants(
            &ctx,
            "samp",
            &variants,
            &|c, p| samp::sim_input(c, &SampTbParams::new(*p, Pvt::default())),
            None,
            &opts,
        );
        assert!(res.is_err());
        Ok(())
    }

    #[test]
    fn test_dut_export() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let ctx = setup_ctx(PdkName::Generic);
        let variants = samp::variants(&samp_axes());
        let mut opts = NetlistOptions {
            outdir: dir.path().to_path_buf(),
            simulator: Simulator::Spectre,
            dut_format: Some(DutFormat::Yaml),
            montecarlo: None,
            timeout: None,
            return_sims: false,
        };
        let build_sim: BuildSim<'_, SampParams> =
            &|c, p| samp::sim_input(c, &SampTbParams::new(*p, Pvt::default()));
        let build_dut: BuildDut<'_, SampParams> = &|c, p| c.generate::<Samp>(p);

        let outcome =
            run_netlist_variants(&ctx, "samp", &variants, build_sim, Some(build_dut), &opts)?;
        assert_eq!(outcome.written.len(), 2);
        assert!(outcome.jobs.is_empty());
        for path in &outcome.written {
            assert_eq!(path.extension().and_then(|e| e.to_str()), Some("yaml"));
            assert!(!fs::read_to_string(path)?.is_empty());
        }

        // DUT formats need a DUT builder and cannot return simulations.
        assert!(run_netlist_variants(&ctx, "samp", &variants, build_sim, None, &opts).is_err());
        opts.return_sims = true;
        assert!(
            run_netlist_variants(&ctx, "samp", &variants, build_sim, Some(build_dut), &opts)
                .is_err()
        );
        Ok(())
    }

    #[test]
    fn test_generate_plan() -> Result<()> {
        let mut config = RunConfig::default();
        config.samp = samp_axes();
        config.sim.timeout_secs = Some(30);
        let mut opts = PlanOptions {
            flow: Flow::Netlist,
            mode: Mode::Min,
            block: BlockKind::All,
            pdk: PdkName::Ihp130,
            simulator: Simulator::Spectre,
            dut_format: None,
            montecarlo: true,
            sim_server: None,
            jobs: Some(2),
        };
        let plan = generate_plan(&opts, &config)?;
        let kinds: Vec<BlockKind> = plan.blocks.iter().map(BlockVariants::kind).collect();
        assert_eq!(
            kinds,
            vec![BlockKind::Samp, BlockKind::Comp, BlockKind::Cdac, BlockKind::Adc]
        );
        assert_eq!(plan.blocks[0].len(), 2);
        assert!(plan.blocks.iter().all(|b| b.len() <= MIN_VARIANTS));
        assert_eq!(plan.montecarlo, Some(MonteCarloConfig::default()));
        assert_eq!(plan.timeout, Some(Duration::from_secs(30)));
        assert_eq!(plan.jobs, 2);

        opts.simulator = Simulator::Xyce;
        assert!(generate_plan(&opts, &config).is_err());

        opts.montecarlo = false;
        opts.flow = Flow::Simulate;
        opts.dut_format = Some(DutFormat::Verilog);
        assert!(generate_plan(&opts, &config).is_err());
        Ok(())
    }

    #[test]
    fn test_execute_netlist_flow() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let fctx = setup_ctx(PdkName::Generic);
        let plan = RunPlan {
            flow: Flow::Netlist,
            pdk: PdkName::Generic,
            simulator: Simulator::Ngspice,
            dut_format: None,
            pvt: Pvt::default(),
            montecarlo: None,
            timeout: None,
            sim_server: None,
            jobs: 1,
            blocks: vec![
                BlockVariants::Samp(samp::variants(&samp_axes())),
                BlockVariants::Adc(vec![AdcParams::default()]),
            ],
        };
        let tasks = HashSet::new();
        let reports = execute_plan(
            &fctx,
            ExecutePlanParams {
                work_dir: dir.path(),
                plan: &plan,
                tasks: &tasks,
                ctx: None,
            },
        )?;
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].netlist.jobs.len(), 2);
        assert!(reports[0].outdir.ends_with("samp"));
        // The ADC is exported in the simulator's dialect without a job.
        assert_eq!(reports[1].netlist.written.len(), 1);
        assert!(reports[1].netlist.jobs.is_empty());
        assert_eq!(
            reports[1].netlist.written[0]
                .extension()
                .and_then(|e| e.to_str()),
            Some("sp")
        );
        Ok(())
    }
}
