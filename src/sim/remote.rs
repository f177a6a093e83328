//! Client for a remote SpiceSimulator gRPC server.
//!
//! Each job is one `RunSimulation` call carrying the full deck. The server
//! streams simulator output back until a message with `done` set reports the
//! exit code.

use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Runtime;
use tonic::transport::Channel;

use super::executor::{Executor, SimJob, SimOutcome};
use super::Simulator;
use crate::error::{FridaError, Result};

pub mod rpc {
    tonic::include_proto!("spice_simulator");
}

use rpc::spice_simulator_client::SpiceSimulatorClient;
use rpc::{Flavour, SimulationRequest};

pub const DEFAULT_PORT: u16 = 50051;

/// Appends the default port to a bare host name.
pub fn normalize_target(target: &str) -> String {
    let clean = target.trim();
    if clean.contains(':') {
        clean.to_string()
    } else {
        format!("{clean}:{DEFAULT_PORT}")
    }
}

impl From<Simulator> for Flavour {
    fn from(value: Simulator) -> Self {
        match value {
            Simulator::Spectre => Flavour::Spectre,
            Simulator::Ngspice => Flavour::Ngspice,
            Simulator::Xyce => Flavour::Xyce,
        }
    }
}

/// Runs jobs on a remote server, blocking on a private runtime.
#[derive(Debug, Clone)]
pub struct RemoteExecutor {
    target: String,
    runtime: Arc<Runtime>,
}

impl RemoteExecutor {
    pub fn new(target: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            target: normalize_target(target),
            runtime: Arc::new(runtime),
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    async fn connect(&self) -> Result<SpiceSimulatorClient<Channel>> {
        SpiceSimulatorClient::connect(format!("http://{}", self.target))
            .await
            .map_err(|e| {
                FridaError::SimulatorUnavailable(format!("cannot reach {}: {e}", self.target))
            })
    }

    /// Streams the server's output into `out` and returns the reported exit
    /// code, if the server sent one.
    async fn simulate(
        &self,
        job: &SimJob,
        request: SimulationRequest,
        out: &mut File,
    ) -> Result<Option<i32>> {
        let failed = |reason: String| FridaError::SimulatorFailed {
            name: job.name.clone(),
            reason,
        };

        let mut client = self.connect().await?;
        let mut stream = client
            .run_simulation(request)
            .await
            .map_err(|s| failed(format!("{}: {}", self.target, s.message())))?
            .into_inner();

        while let Some(response) = stream
            .message()
            .await
            .map_err(|s| failed(format!("stream from {} broke: {}", self.target, s.message())))?
        {
            for text in response.output.lines() {
                log::info!("remote[{}]: {text}", job.name);
                writeln!(out, "{text}")?;
            }
            if response.done {
                return Ok(Some(response.exit_code));
            }
        }
        Ok(None)
    }
}

impl Executor for RemoteExecutor {
    fn run(&self, job: &SimJob) -> Result<SimOutcome> {
        let failed = |reason: String| FridaError::SimulatorFailed {
            name: job.name.clone(),
            reason,
        };

        let request = SimulationRequest {
            simulator: Flavour::from(job.simulator).into(),
            name: job.name.clone(),
            netlist: std::fs::read_to_string(&job.netlist)?,
        };

        std::fs::create_dir_all(&job.work_dir)?;
        let paths = job.paths();
        let mut out = File::create(&paths.stdout_path)?;

        let start = Instant::now();
        let exit_code = self.runtime.block_on(async {
            let run = self.simulate(job, request, &mut out);
            match job.timeout {
                Some(limit) => tokio::time::timeout(limit, run)
                    .await
                    .map_err(|_| failed(format!("timed out after {limit:?}")))?,
                None => run.await,
            }
        })?;

        match exit_code {
            None => Err(failed(format!(
                "{} returned no completion message",
                self.target
            ))),
            Some(0) => Ok(SimOutcome {
                name: job.name.clone(),
                paths,
                elapsed: start.elapsed(),
            }),
            Some(code) => Err(failed(format!("remote simulation exited with code {code}"))),
        }
    }
}
