//! Simulation descriptions.
//!
//! A [`Sim`] pairs a generic testbench module with its analyses, options,
//! save directives and measurements. Netlisters turn it into simulator input;
//! executors run that input.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::config::Pvt;
use crate::error::{FridaError, Result};
use crate::schematic::Module;

pub mod executor;
pub mod raw;
pub mod remote;
pub mod waveform;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Simulator {
    Spectre,
    Ngspice,
    Xyce,
}

impl Simulator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Simulator::Spectre => "spectre",
            Simulator::Ngspice => "ngspice",
            Simulator::Xyce => "xyce",
        }
    }

    /// Netlist file extension, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Simulator::Spectre => "scs",
            Simulator::Ngspice | Simulator::Xyce => "sp",
        }
    }

    pub fn supports_monte_carlo(&self) -> bool {
        matches!(self, Simulator::Spectre)
    }
}

impl Display for Simulator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Simulator {
    type Err = FridaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "spectre" => Ok(Simulator::Spectre),
            "ngspice" => Ok(Simulator::Ngspice),
            "xyce" => Ok(Simulator::Xyce),
            _ => Err(FridaError::Config(format!(
                "unknown simulator `{s}`; expected one of spectre, ngspice, xyce"
            ))),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranAnalysis {
    /// Stop time in seconds.
    pub tstop: f64,
    /// Suggested time step in seconds.
    pub tstep: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variations {
    Mismatch,
    Process,
    All,
}

impl Variations {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variations::Mismatch => "mismatch",
            Variations::Process => "process",
            Variations::All => "all",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    pub numruns: usize,
    pub seed: u64,
    pub variations: Variations,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            numruns: 10,
            seed: 12345,
            variations: Variations::Mismatch,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    Tran(TranAnalysis),
    Op,
    /// Monte Carlo sweep around the enclosed analyses.
    MonteCarlo {
        config: MonteCarloConfig,
        inner: Vec<Analysis>,
    },
}

impl Analysis {
    pub fn name(&self) -> &'static str {
        match self {
            Analysis::Tran(_) => "tran",
            Analysis::Op => "op",
            Analysis::MonteCarlo { .. } => "mc",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum SimOption {
    /// Circuit temperature in degrees Celsius.
    Temp(f64),
    /// Wall-clock limit enforced by the executor; not netlisted.
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Save {
    All,
    Signals(Vec<ArcStr>),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Edge {
    Rise,
    Fall,
    Cross,
}

impl Edge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Edge::Rise => "RISE",
            Edge::Fall => "FALL",
            Edge::Cross => "CROSS",
        }
    }
}

/// A simulator-side transient measurement.
#[derive(Debug, Clone, PartialEq)]
pub enum Meas {
    /// Time at which `signal` reaches `factor * reference`.
    When {
        name: ArcStr,
        signal: ArcStr,
        reference: ArcStr,
        factor: f64,
        edge: Edge,
        count: usize,
    },
    /// Time from `trig` crossing `trig_val` to `targ` crossing `targ_val`.
    Delay {
        name: ArcStr,
        trig: ArcStr,
        trig_val: f64,
        targ: ArcStr,
        targ_val: f64,
        edge: Edge,
    },
}

impl Meas {
    pub fn name(&self) -> &ArcStr {
        match self {
            Meas::When { name, .. } | Meas::Delay { name, .. } => name,
        }
    }
}

/// A complete simulation input for one testbench.
#[derive(Debug, Clone, PartialEq)]
pub struct Sim {
    pub tb: Arc<Module>,
    pub pvt: Pvt,
    pub analyses: Vec<Analysis>,
    pub options: Vec<SimOption>,
    pub saves: Vec<Save>,
    pub meas: Vec<Meas>,
}

impl Sim {
    /// A simulation of `tb` at `pvt` with a temperature option and save-all.
    pub fn new(tb: Arc<Module>, pvt: Pvt) -> Self {
        Self {
            tb,
            pvt,
            analyses: Vec::new(),
            options: vec![SimOption::Temp(pvt.temperature())],
            saves: vec![Save::All],
            meas: Vec::new(),
        }
    }

    pub fn tran(mut self, tstop: f64, tstep: f64) -> Self {
        self.analyses.push(Analysis::Tran(TranAnalysis { tstop, tstep }));
        self
    }

    pub fn op(mut self) -> Self {
        self.analyses.push(Analysis::Op);
        self
    }

    pub fn save<S: Into<ArcStr>>(mut self, signals: impl IntoIterator<Item = S>) -> Self {
        self.saves
            .push(Save::Signals(signals.into_iter().map(Into::into).collect()));
        self
    }

    pub fn meas(mut self, meas: Meas) -> Self {
        self.meas.push(meas);
        self
    }

    pub fn name(&self) -> &ArcStr {
        &self.tb.name
    }

    pub fn temperature(&self) -> Option<f64> {
        self.options.iter().find_map(|o| match o {
            SimOption::Temp(t) => Some(*t),
            _ => None,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.options.iter().find_map(|o| match o {
            SimOption::Timeout(d) => Some(*d),
            _ => None,
        })
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.options.retain(|o| !matches!(o, SimOption::Timeout(_)));
        self.options.push(SimOption::Timeout(timeout));
    }

    pub fn is_monte_carlo(&self) -> bool {
        self.analyses
            .iter()
            .any(|a| matches!(a, Analysis::MonteCarlo { .. }))
    }

    /// The first transient analysis, looking inside Monte Carlo wrappers.
    pub fn tran_analysis(&self) -> Option<&TranAnalysis> {
        fn find(analyses: &[Analysis]) -> Option<&TranAnalysis> {
            analyses.iter().find_map(|a| match a {
                Analysis::Tran(t) => Some(t),
                Analysis::MonteCarlo { inner, .. } => find(inner),
                Analysis::Op => None,
            })
        }
        find(&self.analyses)
    }
}
