use std::path::{Path, PathBuf};

use crate::sim::Simulator;

pub fn out_spice(work_dir: impl AsRef<Path>, name: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{name}.sp"))
}

pub fn out_netlist(work_dir: impl AsRef<Path>, name: &str, simulator: Simulator) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join(format!("{name}.{}", simulator.extension()))
}

/// Per-run directory for simulator logs and raw results.
pub fn out_sim_dir(work_dir: impl AsRef<Path>, name: &str) -> PathBuf {
    PathBuf::from(work_dir.as_ref()).join("sim").join(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_paths() {
        assert_eq!(
            out_netlist("build", "samp_nmos_10_1_low_tb_generic", Simulator::Spectre),
            PathBuf::from("build/samp_nmos_10_1_low_tb_generic.scs")
        );
        assert_eq!(out_spice("build", "x"), PathBuf::from("build/x.sp"));
        assert_eq!(out_sim_dir("build", "x"), PathBuf::from("build/sim/x"));
    }
}
