//! Runtime configuration
//!
//! [`AnnotationsConfig`] is built in code with `with_*` methods or read from
//! a TOML document.

use crate::error::VaranResult;
use serde::{Deserialize, Serialize};

/// Log output format used by [`crate::telemetry::init_tracing`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Annotation runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationsConfig {
    /// Expose each target's live bucket through [`varan_metadata::Target::mirrored`]
    pub mirror_metadata: bool,
    /// Ask a custom resolver for the owner's variant on every queued attachment
    pub eager_resolution: bool,
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl AnnotationsConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With metadata mirroring
    #[inline]
    #[must_use]
    pub fn with_mirror_metadata(mut self, mirror: bool) -> Self {
        self.mirror_metadata = mirror;
        self
    }

    /// With eager resolution
    #[inline]
    #[must_use]
    pub fn with_eager_resolution(mut self, eager: bool) -> Self {
        self.eager_resolution = eager;
        self
    }

    /// With log filter directive
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// With log format
    #[inline]
    #[must_use]
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    /// Parse from a TOML document; missing keys take their defaults
    ///
    /// # Errors
    /// Returns error if the document is not valid TOML for this shape
    pub fn from_toml_str(source: &str) -> VaranResult<Self> {
        Ok(toml::from_str(source)?)
    }
}

impl Default for AnnotationsConfig {
    fn default() -> Self {
        Self {
            mirror_metadata: false,
            eager_resolution: true,
            log_filter: "warn".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
