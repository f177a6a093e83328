use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::pdk::PdkName;
use crate::plan::{BlockKind, Flow, Mode};
use crate::sim::Simulator;

/// `yes`/`no` switch, spelled out on the command line.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn is_yes(&self) -> bool {
        *self == YesNo::Yes
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about,
    help_template(
        "{before-help}{name} {version}\n{author-with-newline}{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}"
    )
)]
pub struct Args {
    /// How far to take each variant.
    #[arg(long, value_enum, default_value_t = Flow::Netlist)]
    pub flow: Flow,

    /// `min` keeps the first 10 variants per block, `max` the full sweep.
    #[arg(long, value_enum, default_value_t = Mode::Min)]
    pub mode: Mode,

    /// Wrap transient analyses in a Monte Carlo sweep.
    #[arg(long, value_enum, default_value_t = YesNo::No)]
    pub montecarlo: YesNo,

    /// Target technology.
    #[arg(long, value_enum, default_value_t = PdkName::Ihp130)]
    pub tech: PdkName,

    /// Netlist dialect and simulator.
    #[arg(long, value_enum, default_value_t = Simulator::Spectre)]
    pub simulator: Simulator,

    /// Remove the block output directories before writing.
    #[arg(long, value_enum, default_value_t = YesNo::No)]
    pub clean: YesNo,

    /// Simulation server as `host[:port]`; simulators run locally if unset.
    #[arg(long, value_name = "HOST[:PORT]")]
    pub sim_server: Option<String>,

    /// Blocks to generate.
    #[arg(long, value_enum, default_value_t = BlockKind::All)]
    pub block: BlockKind,

    /// Export DUTs only, as spectre, ngspice (or spice), yaml or verilog.
    #[arg(long, value_name = "FORMAT")]
    pub netlist_fmt: Option<String>,

    /// Directory to which output files should be saved.
    #[arg(short, long, default_value = "build")]
    pub outdir: PathBuf,

    /// Path to TOML configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Maximum number of simulations in flight.
    #[arg(short, long)]
    pub jobs: Option<usize>,
}
