//! Compiler configuration
//!
//! Per-compilation settings handed to the code-generation event. The
//! struct can be built programmatically or deserialized from TOML:
//!
//! ```toml
//! target = "c"
//! emit_comments = true
//! ```

use serde::{Deserialize, Serialize};

/// Code-generation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// Portable C99 source
    C,
    /// Human-readable SSA-like IR
    #[default]
    Ir,
}

impl Target {
    /// Conventional file extension for emitted artifacts.
    pub fn extension(self) -> &'static str {
        match self {
            Target::C => "c",
            Target::Ir => "ll",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub target: Target,
    /// Prepend a generated-by comment to the emitted artifact.
    pub emit_comments: bool,
    /// Accepted for configuration compatibility; the current emitters
    /// always pretty-print.
    pub pretty_print: bool,
    /// Run the pipeline in strict fault mode (stop at the first failing
    /// phase). When false, failures are recorded and later phases still
    /// run.
    pub stop_on_first_error: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            target: Target::default(),
            emit_comments: false,
            pretty_print: true,
            stop_on_first_error: true,
        }
    }
}

impl CompilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    pub fn with_comments(mut self, emit_comments: bool) -> Self {
        self.emit_comments = emit_comments;
        self
    }

    pub fn with_stop_on_first_error(mut self, stop: bool) -> Self {
        self.stop_on_first_error = stop;
        self
    }

    /// Load a configuration from TOML text. Missing fields fall back to
    /// their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| format!("Invalid compiler configuration: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::default();
        assert_eq!(config.target, Target::Ir);
        assert!(!config.emit_comments);
        assert!(config.stop_on_first_error);
    }

    #[test]
    fn test_builder() {
        let config = CompilerConfig::new()
            .with_target(Target::C)
            .with_comments(true)
            .with_stop_on_first_error(false);
        assert_eq!(config.target, Target::C);
        assert!(config.emit_comments);
        assert!(!config.stop_on_first_error);
    }

    #[test]
    fn test_from_toml() {
        let config = CompilerConfig::from_toml_str(
            r#"
            target = "c"
            emit_comments = true
            "#,
        )
        .unwrap();
        assert_eq!(config.target, Target::C);
        assert!(config.emit_comments);
        // Unspecified fields keep their defaults.
        assert!(config.stop_on_first_error);
    }

    #[test]
    fn test_from_toml_rejects_unknown_target() {
        assert!(CompilerConfig::from_toml_str("target = \"fortran\"").is_err());
    }

    #[test]
    fn test_extensions() {
        assert_eq!(Target::C.extension(), "c");
        assert_eq!(Target::Ir.extension(), "ll");
    }
}
