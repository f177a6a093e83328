use arcstr::ArcStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FridaError {
    #[error("invalid parameters for {block}: {reason}")]
    ParameterInvalid { block: ArcStr, reason: String },

    #[error("PDK {pdk} has no device for type={tp}, vth={vth}; available: {available}")]
    PdkDeviceMissing {
        pdk: ArcStr,
        tp: String,
        vth: String,
        available: String,
    },

    #[error("CDAC weights undefined for n_dac={n_dac}, n_extra={n_extra}, strategy={strategy}")]
    WeightsUndefined {
        n_dac: usize,
        n_extra: usize,
        strategy: String,
    },

    #[error("netlist format error: {0}")]
    NetlistFormat(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid connection in {module}: {reason}")]
    Connection { module: ArcStr, reason: String },

    #[error("simulator unavailable: {0}")]
    SimulatorUnavailable(String),

    #[error("simulation {name} failed: {reason}")]
    SimulatorFailed { name: String, reason: String },

    #[error("signal not found in results: {0}")]
    Extraction(String),

    #[error("array shapes do not match: {0} vs {1}")]
    ShapeMismatch(usize, usize),

    #[error("numeric error: {0}")]
    Numeric(String),

    #[error("formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error rendering template: {0}")]
    Template(#[from] tera::Error),

    #[error("error serializing/deserializing JSON: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("error serializing YAML: {0}")]
    YamlSerialization(#[from] serde_yaml::Error),

    #[error("error parsing TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("file format error: {0}")]
    FileFormat(String),
}

impl FridaError {
    /// Errors caused by the user's configuration rather than a single variant.
    ///
    /// These abort a batch; everything else is recorded against the variant.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FridaError::PdkDeviceMissing { .. }
                | FridaError::NetlistFormat(_)
                | FridaError::Config(_)
                | FridaError::SimulatorUnavailable(_)
        )
    }

    pub fn param_invalid(block: impl Into<ArcStr>, reason: impl Into<String>) -> Self {
        FridaError::ParameterInvalid {
            block: block.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FridaError>;
