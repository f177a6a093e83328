use std::collections::HashSet;
use std::fs::canonicalize;
use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;

use crate::cli::args::Args;
use crate::cli::progress::StepContext;
use crate::config::{parse_run_config, RunConfig};
use crate::netlist::DutFormat;
use crate::plan::{
    execute_plan, generate_plan, BlockKind, ExecutePlanParams, Flow, PlanOptions, TaskKey,
};
use crate::setup_ctx;
use crate::Result;

pub mod args;
pub mod progress;

pub const BANNER: &str = r"
 ________  ________  ___  ________  ________
|\  _____\|\   __  \|\  \|\   ___ \|\   __  \
\ \  \__/ \ \  \|\  \ \  \ \  \_|\ \ \  \|\  \
 \ \   __\ \ \   _  _\ \  \ \  \ \\ \ \   __  \
  \ \  \_|  \ \  \\  \\ \  \ \  \_\\ \ \  \ \  \
   \ \__\    \ \__\\ _\\ \__\ \_______\ \__\ \__\
    \|__|     \|__|\|__|\|__|\|_______|\|__|\|__|

FRIDA v0.1
";

/// Tasks enabled by a flow, beyond plan and netlist generation.
pub fn flow_tasks(flow: Flow) -> HashSet<TaskKey> {
    let mut tasks = HashSet::from([TaskKey::GeneratePlan, TaskKey::GenerateNetlist]);
    if flow >= Flow::Simulate {
        tasks.insert(TaskKey::RunSimulations);
    }
    if flow >= Flow::Measure {
        tasks.insert(TaskKey::MeasureResults);
    }
    tasks
}

/// Removes the per-block output directories of a previous run.
fn clean_outdir(outdir: &Path, block: BlockKind) -> Result<()> {
    for kind in block.expand() {
        let dir = outdir.join(kind.as_str());
        if dir.is_dir() {
            log::info!("removing {dir:?}");
            std::fs::remove_dir_all(&dir).with_context(|| format!("failed to remove {dir:?}"))?;
        }
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let args = Args::parse();

    println!("{BANNER}");

    let config = match &args.config {
        Some(path) => {
            let config_path = canonicalize(path)?;
            println!("Reading configuration file...\n");
            let config = parse_run_config(&config_path)
                .with_context(|| format!("failed to parse {config_path:?}"))?;
            println!("Configuration file: {:?}", &config_path);
            config
        }
        None => RunConfig::default(),
    };

    let dut_format = args
        .netlist_fmt
        .as_deref()
        .map(DutFormat::from_str)
        .transpose()?;

    println!("Run parameters:");
    println!("\tFlow: {}", args.flow);
    println!("\tTechnology: {}", args.tech);
    println!("\tSimulator: {}", args.simulator);
    println!("\tBlocks: {}", args.block);
    if let Some(fmt) = dut_format {
        println!("\tDUT format: {fmt}");
    }
    println!();

    let mut fctx = setup_ctx(args.tech);
    if let Some(root) = config.pdk_roots.get(args.tech.as_str()) {
        fctx.set_pdk(args.tech.descriptor().with_root(root));
    }

    let tasks = flow_tasks(args.flow);
    let mut ctx = StepContext::new(&tasks);

    let opts = PlanOptions {
        flow: args.flow,
        mode: args.mode,
        block: args.block,
        pdk: args.tech,
        simulator: args.simulator,
        dut_format,
        montecarlo: args.montecarlo.is_yes(),
        sim_server: args.sim_server.clone(),
        jobs: args.jobs,
    };
    let plan = ctx.check(generate_plan(&opts, &config))?;
    ctx.finish(TaskKey::GeneratePlan);

    if args.clean.is_yes() {
        ctx.check(clean_outdir(&args.outdir, args.block))?;
    }
    std::fs::create_dir_all(&args.outdir)?;
    let work_dir = canonicalize(&args.outdir)?;

    let res = execute_plan(
        &fctx,
        ExecutePlanParams {
            work_dir: &work_dir,
            plan: &plan,
            tasks: &tasks,
            ctx: Some(&mut ctx),
        },
    );
    let reports = ctx.check(res)?;

    for report in reports.iter() {
        report.print_summary(plan.flow, plan.pdk);
    }
    println!("Artifacts saved to: {:?}\n", &work_dir);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_work_dir;

    #[test]
    fn test_flow_tasks() {
        assert!(!flow_tasks(Flow::Netlist).contains(&TaskKey::RunSimulations));
        let tasks = flow_tasks(Flow::Simulate);
        assert!(tasks.contains(&TaskKey::RunSimulations));
        assert!(!tasks.contains(&TaskKey::MeasureResults));
        assert_eq!(flow_tasks(Flow::Measure).len(), 4);
    }

    #[test]
    fn test_clean_outdir_keeps_other_blocks() -> Result<()> {
        let outdir = test_work_dir("test_clean_outdir");
        std::fs::create_dir_all(outdir.join("samp"))?;
        std::fs::create_dir_all(outdir.join("cdac"))?;
        std::fs::write(outdir.join("samp/old.scs"), "")?;

        clean_outdir(&outdir, BlockKind::Samp)?;
        assert!(!outdir.join("samp").exists());
        assert!(outdir.join("cdac").exists());

        clean_outdir(&outdir, BlockKind::All)?;
        assert!(!outdir.join("cdac").exists());
        Ok(())
    }
}
