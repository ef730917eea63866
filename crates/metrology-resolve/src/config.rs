//! Resolution configuration.

use metrology_decl::StackingMode;
use serde::{Deserialize, Serialize};

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid resolve configuration: {0}")]
    InvalidConfig(String),
}

/// Settings for one resolution pass.
///
/// None of these settings change which declarations are valid, except
/// `default_stacking_mode` (filters without a mode are ignored unless it is
/// set) and `warnings_as_errors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Minimum number of types in a stage to resolve them in parallel.
    /// Below this threshold types resolve sequentially to avoid overhead.
    pub parallel_threshold: usize,
    /// Stacking mode for filters that omit one.
    pub default_stacking_mode: Option<StackingMode>,
    /// Longest signature whose permutations are expanded.
    pub max_permutation_arity: usize,
    /// Report every warning as a blocking error.
    pub warnings_as_errors: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 2,
            default_stacking_mode: None,
            max_permutation_arity: 6,
            warnings_as_errors: false,
        }
    }
}

impl ResolveConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel_threshold == 0 {
            return Err(ConfigError::InvalidConfig(
                "parallel_threshold must be > 0".to_string(),
            ));
        }
        if self.max_permutation_arity == 0 {
            return Err(ConfigError::InvalidConfig(
                "max_permutation_arity must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the stacking mode used by filters that omit one.
    pub fn with_default_stacking_mode(mut self, mode: StackingMode) -> Self {
        self.default_stacking_mode = Some(mode);
        self
    }
}
