//! Fatal assembly errors.
//!
//! Plugin failures are not here: they are per file, recorded in `Diagnostics` and
//! never abort a run.

use legacymap_model::RegistryError;

#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    /// A required graph section is missing or malformed.
    #[error("structural error in `{section}`: {reason}")]
    Structural { section: String, reason: String },

    /// A computed metric is below its configured minimum.
    #[error("validation gate failed: {metric} = {actual:.4} is below the required minimum {minimum:.4}")]
    ValidationGate {
        metric: String,
        actual: f64,
        minimum: f64,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("failed to build the JSP classifier: {0}")]
    Classifier(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] crate::ConfigError),
}

impl AssemblyError {
    pub fn structural(section: impl Into<String>, reason: impl Into<String>) -> Self {
        AssemblyError::Structural {
            section: section.into(),
            reason: reason.into(),
        }
    }

    pub fn is_gate_failure(&self) -> bool {
        matches!(self, AssemblyError::ValidationGate { .. })
    }
}
