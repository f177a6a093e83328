use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::blocks::cdac::CdacAxes;
use crate::blocks::comp::CompAxes;
use crate::blocks::samp::SampAxes;
use crate::error::Result;
use crate::sim::MonteCarloConfig;

pub mod pvt;

pub use pvt::{temper, Corner, Pvt, SupplyVals};

/// Optional overrides for a flow run, read from a TOML file.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub pvt: Pvt,
    pub samp: SampAxes,
    pub comp: CompAxes,
    pub cdac: CdacAxes,
    pub montecarlo: MonteCarloConfig,
    pub sim: SimSettings,
    /// PDK install roots keyed by PDK name.
    pub pdk_roots: HashMap<String, PathBuf>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Per-simulation wall clock limit in seconds.
    pub timeout_secs: Option<u64>,
    /// Maximum number of concurrent local simulations.
    pub jobs: Option<usize>,
}

pub fn parse_run_config(path: impl AsRef<Path>) -> Result<RunConfig> {
    let contents = fs::read_to_string(path)?;
    let data = toml::from_str(&contents)?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::samp::SwitchType;

    #[test]
    fn test_parse_run_config() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("frida.toml");
        fs::write(
            &path,
            r#"
[pvt]
p = "fast"
v = "typ"
t = "slow"

[samp]
switch_type = ["nmos", "tgate"]
w = [5, 10]

[montecarlo]
numruns = 50

[sim]
timeout_secs = 600

[pdk_roots]
ihp130 = "/opt/pdks/ihp-sg13g2"
"#,
        )?;
        let config = parse_run_config(&path)?;
        assert_eq!(config.pvt, Pvt::new(Corner::Fast, Corner::Typ, Corner::Slow));
        assert_eq!(
            config.samp.switch_type,
            Some(vec![SwitchType::Nmos, SwitchType::Tgate])
        );
        assert_eq!(config.samp.w, Some(vec![5, 10]));
        assert_eq!(config.samp.l, None);
        assert_eq!(config.montecarlo.numruns, 50);
        assert_eq!(config.montecarlo.seed, 12345);
        assert_eq!(config.sim.timeout_secs, Some(600));
        assert_eq!(
            config.pdk_roots.get("ihp130"),
            Some(&PathBuf::from("/opt/pdks/ihp-sg13g2"))
        );
        Ok(())
    }
}
