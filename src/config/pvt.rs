use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FridaError;

/// A corner on one of the process, voltage or temperature axes.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Corner {
    Slow,
    #[default]
    Typ,
    Fast,
}

impl Corner {
    pub const ALL: [Corner; 3] = [Corner::Slow, Corner::Typ, Corner::Fast];

    pub fn as_str(&self) -> &'static str {
        match self {
            Corner::Slow => "slow",
            Corner::Typ => "typ",
            Corner::Fast => "fast",
        }
    }
}

impl Display for Corner {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Corner {
    type Err = FridaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "slow" | "ss" => Ok(Corner::Slow),
            "typ" | "tt" => Ok(Corner::Typ),
            "fast" | "ff" => Ok(Corner::Fast),
            _ => Err(FridaError::Config(format!(
                "unknown corner `{s}`; expected one of slow, typ, fast"
            ))),
        }
    }
}

/// Process, voltage and temperature corners.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pvt {
    pub p: Corner,
    pub v: Corner,
    pub t: Corner,
}

impl Pvt {
    pub fn new(p: Corner, v: Corner, t: Corner) -> Self {
        Self { p, v, t }
    }

    /// Simulation temperature in degrees Celsius.
    #[inline]
    pub fn temperature(&self) -> f64 {
        temper(self.t)
    }
}

pub fn temper(t: Corner) -> f64 {
    match t {
        Corner::Slow => -40.0,
        Corner::Typ => 25.0,
        Corner::Fast => 125.0,
    }
}

/// Supply voltages for each voltage corner.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyVals {
    pub min: f64,
    pub nom: f64,
    pub max: f64,
}

impl SupplyVals {
    pub const fn new(min: f64, nom: f64, max: f64) -> Self {
        Self { min, nom, max }
    }

    pub fn corner(&self, v: Corner) -> f64 {
        match v {
            Corner::Slow => self.min,
            Corner::Typ => self.nom,
            Corner::Fast => self.max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_maps() {
        let supply = SupplyVals::new(0.81, 0.9, 0.99);
        assert_eq!(supply.corner(Corner::Slow), 0.81);
        assert_eq!(supply.corner(Corner::Fast), 0.99);
        assert_eq!(Pvt::default().temperature(), 25.0);
        assert_eq!(temper(Corner::Slow), -40.0);
        assert_eq!(temper(Corner::Fast), 125.0);
    }

    #[test]
    fn test_unknown_corner() {
        assert_eq!("TT".parse::<Corner>().unwrap(), Corner::Typ);
        assert!(matches!(
            "nominal".parse::<Corner>(),
            Err(FridaError::Config(_))
        ));
    }
}
