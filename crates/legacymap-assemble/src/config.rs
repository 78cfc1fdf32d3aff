//! Assembly configuration.
//!
//! Every field has a default, so an empty TOML document (or no file at all) is a
//! valid configuration. Confidence constants are named and overridable.

use legacymap_ingest::{LinkConfidence, LinkerKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {message}")]
    Read { path: String, message: String },
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("{field} must be within [0, 1], got {value}")]
    OutOfRange { field: &'static str, value: f64 },
    #[error("max_chain_hops must be at least 1")]
    ZeroHops,
    #[error("linker `{0}` is listed more than once")]
    DuplicateLinker(LinkerKind),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Relations with `confidence < min_relation_confidence` are dropped.
    pub min_relation_confidence: f64,
    /// Linker plugins, in execution order.
    pub linkers: Vec<LinkerKind>,
    /// Hop limit for JSP chain expansion in traces.
    pub max_chain_hops: usize,
    pub gates: GateConfig,
    pub skew: SkewConfig,
    pub link_confidence: LinkConfidence,
    pub trace_confidence: TraceConfidence,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            min_relation_confidence: 0.5,
            linkers: LinkerKind::default_order(),
            max_chain_hops: 5,
            gates: GateConfig::default(),
            skew: SkewConfig::default(),
            link_confidence: LinkConfidence::default(),
            trace_confidence: TraceConfidence::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub min_config_parse_success_pct: f64,
    /// Optional second gate on `route_resolution_rate`.
    pub min_route_resolution_rate: Option<f64>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_config_parse_success_pct: 0.5,
            min_route_resolution_rate: None,
        }
    }
}

/// Skew warnings (diagnostics only, never gating).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkewConfig {
    /// Warn when one bucket holds more than this share of the population.
    pub max_share: f64,
    /// Smaller populations are never reported.
    pub min_population: usize,
}

impl Default for SkewConfig {
    fn default() -> Self {
        Self {
            max_share: 0.8,
            min_population: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfidence {
    /// Route with a screen but no handler.
    pub screen_only: f64,
    pub handler_without_crud: f64,
    pub handler_with_crud: f64,
}

impl Default for TraceConfidence {
    fn default() -> Self {
        Self {
            screen_only: 0.6,
            handler_without_crud: 0.65,
            handler_with_crud: 0.7,
        }
    }
}

impl AssemblyConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AssemblyConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let lc = &self.link_confidence;
        let tc = &self.trace_confidence;
        let mut unit_values = vec![
            ("min_relation_confidence", self.min_relation_confidence),
            ("gates.min_config_parse_success_pct", self.gates.min_config_parse_success_pct),
            ("skew.max_share", self.skew.max_share),
            ("link_confidence.handles_route", lc.handles_route),
            ("link_confidence.mounted_under", lc.mounted_under),
            ("link_confidence.validated_by", lc.validated_by),
            ("link_confidence.renders", lc.renders),
            ("link_confidence.view_link", lc.view_link),
            ("link_confidence.data_access", lc.data_access),
            ("link_confidence.procedure", lc.procedure),
            ("link_confidence.secured_by", lc.secured_by),
            ("trace_confidence.screen_only", tc.screen_only),
            ("trace_confidence.handler_without_crud", tc.handler_without_crud),
            ("trace_confidence.handler_with_crud", tc.handler_with_crud),
        ];
        if let Some(rate) = self.gates.min_route_resolution_rate {
            unit_values.push(("gates.min_route_resolution_rate", rate));
        }
        for (field, value) in unit_values {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { field, value });
            }
        }

        if self.max_chain_hops == 0 {
            return Err(ConfigError::ZeroHops);
        }

        let mut seen = BTreeSet::new();
        for kind in &self.linkers {
            if !seen.insert(*kind) {
                return Err(ConfigError::DuplicateLinker(*kind));
            }
        }
        Ok(())
    }
}
