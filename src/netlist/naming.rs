//! Parameter fingerprints for module names and artifact files.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::pdk::PdkName;

const HASH_LEN: usize = 8;

fn sanitize(s: &str) -> String {
    s.to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.')
        .collect()
}

fn short_hash(value: &Value) -> Result<String> {
    let digest = Sha256::digest(serde_json::to_string(value)?.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(HASH_LEN);
    Ok(hex)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("none".to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Lower-cased field values joined by underscores, in declaration order.
///
/// Nested records and lists collapse to `{field}_{hash}` so that composite
/// parameters still yield short, stable names.
pub fn fingerprint<P: Serialize>(params: &P) -> Result<String> {
    let value = serde_json::to_value(params)?;
    let parts = match &value {
        Value::Object(map) => map
            .iter()
            .map(|(field, v)| match scalar(v) {
                Some(s) => Ok(sanitize(&s)),
                None => Ok(format!("{}_{}", sanitize(field), short_hash(v)?)),
            })
            .collect::<Result<Vec<_>>>()?,
        Value::Null => Vec::new(),
        other => match scalar(other) {
            Some(s) => vec![sanitize(&s)],
            None => vec![short_hash(other)?],
        },
    };
    Ok(parts.into_iter().filter(|s| !s.is_empty()).collect::<Vec<_>>().join("_"))
}

/// Subcircuit name for a block instance: `{block}_{fingerprint}`.
pub fn module_name<P: Serialize>(block: &str, params: &P) -> Result<arcstr::ArcStr> {
    let fp = fingerprint(params)?;
    Ok(if fp.is_empty() {
        arcstr::ArcStr::from(block)
    } else {
        arcstr::format!("{block}_{fp}")
    })
}

/// Artifact file stem: `{block}_{fingerprint}_{pdk}`.
pub fn params_to_filename<P: Serialize>(block: &str, params: &P, pdk: PdkName) -> Result<String> {
    Ok(format!("{}_{pdk}", module_name(block, params)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Inner {
        a: i64,
    }

    #[derive(Serialize)]
    struct Outer {
        kind: &'static str,
        n: usize,
        value: Option<f64>,
        inner: Inner,
    }

    #[test]
    fn test_fingerprint() -> Result<()> {
        let params = Outer {
            kind: "Sub-Radix*2",
            n: 4,
            value: None,
            inner: Inner { a: 1 },
        };
        let fp = fingerprint(&params)?;
        let parts: Vec<_> = fp.split('_').collect();
        assert_eq!(&parts[..4], &["subradix2", "4", "none", "inner"]);
        assert_eq!(parts[4].len(), HASH_LEN);

        let again = fingerprint(&params)?;
        assert_eq!(fp, again);

        let other = Outer {
            inner: Inner { a: 2 },
            ..params
        };
        assert_ne!(fingerprint(&other)?, fp);
        Ok(())
    }

    #[test]
    fn test_filename() -> Result<()> {
        assert_eq!(params_to_filename("adc", &(), PdkName::Generic)?, "adc_generic");
        Ok(())
    }
}
