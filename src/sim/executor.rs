//! Batch simulator execution.

use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use super::raw::{read_psf, read_rawfile, RawResult};
use super::Simulator;
use crate::error::{FridaError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// One netlist ready to simulate.
#[derive(Debug, Clone, PartialEq)]
pub struct SimJob {
    pub name: String,
    pub simulator: Simulator,
    pub netlist: PathBuf,
    /// Directory for logs and raw results.
    pub work_dir: PathBuf,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimPaths {
    pub raw_output: PathBuf,
    pub log_path: PathBuf,
    pub stdout_path: PathBuf,
    pub stderr_path: PathBuf,
}

impl SimJob {
    pub fn paths(&self) -> SimPaths {
        let raw_output = match self.simulator {
            Simulator::Spectre => self.work_dir.join(format!("{}.psf", self.name)),
            Simulator::Ngspice | Simulator::Xyce => self.work_dir.join(format!("{}.raw", self.name)),
        };
        SimPaths {
            raw_output,
            log_path: self.work_dir.join(format!("{}.log", self.name)),
            stdout_path: self.work_dir.join(format!("{}.out", self.name)),
            stderr_path: self.work_dir.join(format!("{}.err", self.name)),
        }
    }

    /// Reads the transient result once the job has finished.
    pub fn load_result(&self) -> Result<RawResult> {
        let paths = self.paths();
        match self.simulator {
            // Spectre names the file after the analysis.
            Simulator::Spectre => read_psf(paths.raw_output.join("tran.tran.tran")),
            Simulator::Ngspice | Simulator::Xyce => read_rawfile(paths.raw_output),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimOutcome {
    pub name: String,
    pub paths: SimPaths,
    pub elapsed: Duration,
}

pub trait Executor: Sync {
    fn run(&self, job: &SimJob) -> Result<SimOutcome>;
}

/// Runs simulators as local child processes.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor {
    cancelled: Arc<AtomicBool>,
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that terminates every running and pending job when set.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    fn command(&self, job: &SimJob, paths: &SimPaths) -> Command {
        match job.simulator {
            Simulator::Spectre => {
                let mut cmd = Command::new("spectre");
                cmd.arg("-64")
                    .arg("+aps")
                    .arg("-format")
                    .arg("psfbin")
                    .arg(&job.netlist)
                    .arg("-raw")
                    .arg(&paths.raw_output)
                    .arg("=log")
                    .arg(&paths.log_path);
                cmd
            }
            Simulator::Ngspice => {
                let mut cmd = Command::new("ngspice");
                cmd.arg("-b")
                    .arg("-r")
                    .arg(&paths.raw_output)
                    .arg("-o")
                    .arg(&paths.log_path)
                    .arg(&job.netlist);
                cmd
            }
            Simulator::Xyce => {
                let mut cmd = Command::new("Xyce");
                cmd.arg("-r")
                    .arg(&paths.raw_output)
                    .arg("-l")
                    .arg(&paths.log_path)
                    .arg(&job.netlist);
                cmd
            }
        }
    }

    fn wait(&self, job: &SimJob, child: &mut std::process::Child) -> Result<ExitStatus> {
        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            let timed_out = job.timeout.map_or(false, |t| start.elapsed() > t);
            if timed_out || self.cancelled.load(Ordering::Relaxed) {
                child.kill()?;
                child.wait()?;
                let reason = if timed_out {
                    format!("timed out after {:?}", job.timeout.unwrap_or_default())
                } else {
                    "cancelled".to_string()
                };
                return Err(FridaError::SimulatorFailed {
                    name: job.name.clone(),
                    reason,
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Executor for LocalExecutor {
    fn run(&self, job: &SimJob) -> Result<SimOutcome> {
        let binary = simulator_binary(job.simulator);
        if find_in_path(binary).is_none() {
            return Err(FridaError::SimulatorUnavailable(format!(
                "`{binary}` not found in PATH and no simulation server configured"
            )));
        }
        if self.cancelled.load(Ordering::Relaxed) {
            return Err(FridaError::SimulatorFailed {
                name: job.name.clone(),
                reason: "cancelled".to_string(),
            });
        }

        std::fs::create_dir_all(&job.work_dir)?;
        let paths = job.paths();
        let out_file = File::create(&paths.stdout_path)?;
        let err_file = File::create(&paths.stderr_path)?;

        log::info!("launching {} for {}", job.simulator, job.name);
        let start = Instant::now();
        let mut child = self
            .command(job, &paths)
            .stdout(out_file)
            .stderr(err_file)
            .current_dir(&job.work_dir)
            .spawn()?;
        let status = self.wait(job, &mut child)?;
        let elapsed = start.elapsed();
        log::info!("{} exited with {status} after {elapsed:?}", job.name);

        if !status.success() {
            return Err(FridaError::SimulatorFailed {
                name: job.name.clone(),
                reason: format!(
                    "{} exited unsuccessfully ({status}); see {:?}",
                    job.simulator, paths.stderr_path
                ),
            });
        }

        Ok(SimOutcome {
            name: job.name.clone(),
            paths,
            elapsed,
        })
    }
}

pub fn simulator_binary(simulator: Simulator) -> &'static str {
    match simulator {
        Simulator::Spectre => "spectre",
        Simulator::Ngspice => "ngspice",
        Simulator::Xyce => "Xyce",
    }
}

pub fn find_in_path(binary: impl AsRef<OsStr>) -> Option<PathBuf> {
    let binary = binary.as_ref();
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(binary))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.metadata()
            .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

/// Runs `jobs` with at most `max_jobs` in flight, preserving input order.
pub fn run_batch<E: Executor + ?Sized>(
    executor: &E,
    jobs: &[SimJob],
    max_jobs: usize,
) -> Result<Vec<Result<SimOutcome>>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_jobs.max(1))
        .build()
        .map_err(|e| FridaError::Config(format!("cannot build simulation pool: {e}")))?;
    Ok(pool.install(|| jobs.par_iter().map(|job| executor.run(job)).collect()))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    impl Executor for Recorder {
        fn run(&self, job: &SimJob) -> Result<SimOutcome> {
            self.seen.lock().unwrap().push(job.name.clone());
            if job.name.ends_with('1') {
                return Err(FridaError::SimulatorFailed {
                    name: job.name.clone(),
                    reason: "exit 1".to_string(),
                });
            }
            Ok(SimOutcome {
                name: job.name.clone(),
                paths: job.paths(),
                elapsed: Duration::ZERO,
            })
        }
    }

    fn job(name: &str) -> SimJob {
        SimJob {
            name: name.to_string(),
            simulator: Simulator::Ngspice,
            netlist: PathBuf::from(format!("{name}.sp")),
            work_dir: PathBuf::from("/tmp/frida"),
            timeout: None,
        }
    }

    #[test]
    fn test_batch_preserves_order() -> Result<()> {
        let recorder = Recorder {
            seen: Mutex::new(Vec::new()),
        };
        let jobs: Vec<_> = (0..4).map(|i| job(&format!("sim{i}"))).collect();
        let results = run_batch(&recorder, &jobs, 2)?;
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().name, "sim0");
        assert!(matches!(
            results[1],
            Err(FridaError::SimulatorFailed { .. })
        ));
        assert_eq!(results[3].as_ref().unwrap().name, "sim3");
        assert_eq!(recorder.seen.lock().unwrap().len(), 4);
        Ok(())
    }

    #[test]
    fn test_paths() {
        let paths = job("samp").paths();
        assert_eq!(paths.raw_output, PathBuf::from("/tmp/frida/samp.raw"));
        assert_eq!(paths.stderr_path, PathBuf::from("/tmp/frida/samp.err"));
    }

    #[test]
    fn test_missing_binary() {
        let mut j = job("x");
        j.simulator = Simulator::Xyce;
        if find_in_path("Xyce").is_none() {
            assert!(matches!(
                LocalExecutor::new().run(&j),
                Err(FridaError::SimulatorUnavailable(_))
            ));
        }
    }
}
