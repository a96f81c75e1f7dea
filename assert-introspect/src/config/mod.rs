//! `introspect.toml` configuration
//!
//! ```toml
//! [rewrite]
//! functions = []            # empty = every function
//! color = true
//! buffer_size = 1024
//! fail_function = "__assert_fail"
//!
//! [primitives]
//! print = "printf"
//! format = "snprintf"
//! terminate = "abort"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CompileError, Result};

/// Default file name looked up next to the input
pub const CONFIG_FILE: &str = "introspect.toml";

/// Smallest buffer that still holds a useful report
const MIN_BUFFER_SIZE: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub rewrite: RewriteConfig,
    #[serde(default)]
    pub primitives: PrimitiveNames,
}

/// Options of the rewriting pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RewriteConfig {
    /// Only rewrite assertions in these functions; empty means all
    pub functions: Vec<String>,
    /// Use the ANSI palette
    pub color: bool,
    /// Capacity of each repr buffer in the generated code
    pub buffer_size: usize,
    /// Function the assertion macro reports failures through
    pub fail_function: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            functions: Vec::new(),
            color: true,
            buffer_size: 1024,
            fail_function: crate::sema::ASSERT_FAIL.to_string(),
        }
    }
}

impl RewriteConfig {
    /// Whether assertions in `function` are rewritten
    pub fn covers(&self, function: &str) -> bool {
        self.functions.is_empty() || self.functions.iter().any(|f| f == function)
    }
}

/// Names of the runtime primitives generated code calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrimitiveNames {
    /// Variadic formatted print
    pub print: String,
    /// Variadic bounded-buffer formatted write
    pub format: String,
    /// No-argument process termination
    pub terminate: String,
}

impl Default for PrimitiveNames {
    fn default() -> Self {
        Self {
            print: "printf".to_string(),
            format: "snprintf".to_string(),
            terminate: "abort".to_string(),
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| CompileError::config_error(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CompileError::io_error(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Load `path` if given, else `introspect.toml` in `dir` if present, else defaults
    pub fn discover(path: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_path(path);
        }
        let candidate = dir.join(CONFIG_FILE);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading configuration");
            return Self::from_path(&candidate);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.rewrite.buffer_size < MIN_BUFFER_SIZE {
            return Err(CompileError::config_error(format!(
                "rewrite.buffer_size must be at least {MIN_BUFFER_SIZE}, got {}",
                self.rewrite.buffer_size
            )));
        }
        let names = [
            ("rewrite.fail_function", &self.rewrite.fail_function),
            ("primitives.print", &self.primitives.print),
            ("primitives.format", &self.primitives.format),
            ("primitives.terminate", &self.primitives.terminate),
        ];
        for (key, name) in names {
            if !is_identifier(name) {
                return Err(CompileError::config_error(format!("{key} is not a function name: {name:?}")));
            }
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::from_toml("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_toml(
            r#"
            [rewrite]
            color = false
            functions = ["test"]

            [primitives]
            terminate = "my_abort"
            "#,
        )
        .unwrap();
        assert!(!config.rewrite.color);
        assert_eq!(config.rewrite.buffer_size, 1024);
        assert!(config.rewrite.covers("test"));
        assert!(!config.rewrite.covers("other"));
        assert_eq!(config.primitives.terminate, "my_abort");
        assert_eq!(config.primitives.print, "printf");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Config::from_toml("[rewrite]\ncolour = true\n").unwrap_err();
        assert!(matches!(err, CompileError::Config { .. }));
    }

    #[test]
    fn test_tiny_buffer_rejected() {
        assert!(Config::from_toml("[rewrite]\nbuffer_size = 4\n").is_err());
    }

    #[test]
    fn test_bad_primitive_name_rejected() {
        assert!(Config::from_toml("[primitives]\nprint = \"not a name\"\n").is_err());
    }

    #[test]
    fn test_empty_function_list_covers_everything() {
        assert!(RewriteConfig::default().covers("anything"));
    }
}
