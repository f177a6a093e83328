//! SI-prefixed quantities.
//!
//! Device dimensions carry two meanings: a value with the [`SiPrefix::Unit`]
//! prefix is a multiplier of the PDK's minimum dimension, anything else is an
//! absolute length. [`scale_dimension`] is the single place that resolves them.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{FridaError, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SiPrefix {
    Femto,
    Pico,
    Nano,
    Micro,
    Milli,
    Unit,
    Kilo,
}

impl SiPrefix {
    const DISPLAY_ORDER: [SiPrefix; 7] = [
        SiPrefix::Kilo,
        SiPrefix::Unit,
        SiPrefix::Milli,
        SiPrefix::Micro,
        SiPrefix::Nano,
        SiPrefix::Pico,
        SiPrefix::Femto,
    ];

    pub fn multiplier(&self) -> Decimal {
        match self {
            SiPrefix::Femto => Decimal::new(1, 15),
            SiPrefix::Pico => Decimal::new(1, 12),
            SiPrefix::Nano => Decimal::new(1, 9),
            SiPrefix::Micro => Decimal::new(1, 6),
            SiPrefix::Milli => Decimal::new(1, 3),
            SiPrefix::Unit => Decimal::ONE,
            SiPrefix::Kilo => Decimal::new(1000, 0),
        }
    }

    /// Suffix understood by Spectre and SPICE alike.
    pub fn symbol(&self) -> &'static str {
        match self {
            SiPrefix::Femto => "f",
            SiPrefix::Pico => "p",
            SiPrefix::Nano => "n",
            SiPrefix::Micro => "u",
            SiPrefix::Milli => "m",
            SiPrefix::Unit => "",
            SiPrefix::Kilo => "k",
        }
    }

    fn from_symbol(s: &str) -> Option<Self> {
        Some(match s {
            "f" => SiPrefix::Femto,
            "p" => SiPrefix::Pico,
            "n" => SiPrefix::Nano,
            "u" => SiPrefix::Micro,
            "m" => SiPrefix::Milli,
            "" => SiPrefix::Unit,
            "k" => SiPrefix::Kilo,
            _ => return None,
        })
    }
}

/// A decimal number with an SI prefix.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SiValue {
    number: Decimal,
    prefix: SiPrefix,
}

impl SiValue {
    #[inline]
    pub fn new(number: impl Into<Decimal>, prefix: SiPrefix) -> Self {
        Self {
            number: number.into(),
            prefix,
        }
    }

    /// A dimensionless value, read as a multiplier by [`scale_dimension`].
    #[inline]
    pub fn unit(number: impl Into<Decimal>) -> Self {
        Self::new(number, SiPrefix::Unit)
    }

    #[inline]
    pub fn nano(number: impl Into<Decimal>) -> Self {
        Self::new(number, SiPrefix::Nano)
    }

    #[inline]
    pub fn femto(number: impl Into<Decimal>) -> Self {
        Self::new(number, SiPrefix::Femto)
    }

    pub fn from_f64(value: f64) -> Result<Self> {
        let number = Decimal::from_f64(value)
            .ok_or_else(|| FridaError::Numeric(format!("cannot represent {value}")))?;
        Ok(Self::unit(number))
    }

    #[inline]
    pub fn number(&self) -> Decimal {
        self.number
    }

    #[inline]
    pub fn prefix(&self) -> SiPrefix {
        self.prefix
    }

    #[inline]
    pub fn is_unit(&self) -> bool {
        self.prefix == SiPrefix::Unit
    }

    /// The absolute value in base units.
    pub fn value(&self) -> Decimal {
        self.number * self.prefix.multiplier()
    }

    pub fn to_f64(&self) -> f64 {
        self.value().to_f64().unwrap_or(f64::NAN)
    }

    pub fn scaled(&self, by: impl Into<Decimal>) -> Self {
        Self {
            number: self.number * by.into(),
            prefix: self.prefix,
        }
    }
}

impl From<i64> for SiValue {
    fn from(value: i64) -> Self {
        Self::unit(value)
    }
}

impl Display for SiValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let value = self.value();
        if value.is_zero() {
            return write!(f, "0");
        }
        for prefix in SiPrefix::DISPLAY_ORDER {
            let scaled = value / prefix.multiplier();
            if scaled.abs() >= Decimal::ONE || prefix == SiPrefix::Femto {
                return write!(f, "{}{}", scaled.normalize(), prefix.symbol());
            }
        }
        unreachable!("femto always terminates the search")
    }
}

impl FromStr for SiValue {
    type Err = FridaError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_ascii_alphabetic() && c != 'e' && c != 'E')
            .unwrap_or(s.len());
        let (num, suffix) = s.split_at(split);
        let prefix = SiPrefix::from_symbol(suffix)
            .ok_or_else(|| FridaError::Config(format!("unknown SI suffix in `{s}`")))?;
        let number = if num.contains(['e', 'E']) {
            Decimal::from_scientific(num)
        } else {
            Decimal::from_str(num)
        }
        .map_err(|e| FridaError::Config(format!("invalid number `{s}`: {e}")))?;
        Ok(Self::new(number, prefix))
    }
}

impl Serialize for SiValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SiValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(i64),
            Str(String),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Int(i) => Ok(SiValue::unit(i)),
            Repr::Str(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Resolves a device dimension against a PDK minimum.
///
/// `None` selects `default_mult` multiples of `min_dim`; a dimensionless value
/// is a multiplier of `min_dim`; a physically prefixed value is returned as is.
pub fn scale_dimension(value: Option<SiValue>, min_dim: SiValue, default_mult: i64) -> SiValue {
    match value {
        None => min_dim.scaled(default_mult),
        Some(v) if v.is_unit() => min_dim.scaled(v.number()),
        Some(v) => v,
    }
}

/// Formats a float with an SI suffix, falling back to scientific notation.
pub fn format_si(value: f64) -> String {
    match SiValue::from_f64(value) {
        Ok(v) => v.to_string(),
        Err(_) => format!("{value:e}"),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_scale_dimension() {
        let w_min = SiValue::nano(350);

        let absolute = scale_dimension(Some(SiValue::nano(350)), w_min, 1);
        assert_eq!(absolute, SiValue::nano(350));

        let mult = scale_dimension(Some(SiValue::from(3)), w_min, 1);
        assert_eq!(mult.value(), dec!(0.00000105));
        assert_eq!(mult.to_string(), "1.05u");

        let default = scale_dimension(None, w_min, 10);
        assert_eq!(default.value(), dec!(0.0000035));
    }

    #[test]
    fn test_display_and_parse() -> std::result::Result<(), Box<dyn std::error::Error>> {
        assert_eq!(SiValue::femto(1).to_string(), "1f");
        assert_eq!(SiValue::nano(3500).to_string(), "3.5u");
        assert_eq!(SiValue::unit(0).to_string(), "0");
        assert_eq!(SiValue::new(100, SiPrefix::Milli).to_string(), "100m");

        let v: SiValue = "350n".parse()?;
        assert_eq!(v, SiValue::nano(350));
        let v: SiValue = "10".parse()?;
        assert!(v.is_unit());
        let v: SiValue = "1e-9".parse()?;
        assert_eq!(v.value(), dec!(0.000000001));
        assert!("3x".parse::<SiValue>().is_err());
        Ok(())
    }

    #[test]
    fn test_serde_forms() -> std::result::Result<(), Box<dyn std::error::Error>> {
        #[derive(Deserialize)]
        struct Dims {
            w: SiValue,
            l: SiValue,
        }
        let dims: Dims = toml::from_str("w = 4\nl = \"180n\"")?;
        assert_eq!(dims.w, SiValue::unit(4));
        assert_eq!(dims.l, SiValue::nano(180));
        assert_eq!(serde_json::to_string(&SiValue::femto(1))?, "\"1f\"");
        Ok(())
    }
}
