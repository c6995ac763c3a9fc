//! Synthesis and dispatch configuration.

use serde::Deserialize;
use std::path::Path;

/// Configuration applied at synthesis time and carried by the routines it
/// produces.
#[derive(Debug, Clone, Default)]
pub struct DispatchConfig {
    /// Trace synthesis decisions to stderr.
    pub trace_synthesis: bool,
    /// Trace phase transitions and advice invocations to stderr.
    pub trace_dispatch: bool,
    /// Disable the fast path even where it applies; the general path with
    /// zero around advice must behave identically.
    pub force_general_path: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    dispatch: DispatchSection,
}

#[derive(Debug, Default, Deserialize)]
struct DispatchSection {
    #[serde(default)]
    trace_synthesis: bool,
    #[serde(default)]
    trace_dispatch: bool,
    #[serde(default)]
    force_general_path: bool,
}

impl DispatchConfig {
    /// Parse a `weft.toml` document.
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| format!("failed to parse config: {}", e))?;
        Ok(Self {
            trace_synthesis: file.dispatch.trace_synthesis,
            trace_dispatch: file.dispatch.trace_dispatch,
            force_general_path: file.dispatch.force_general_path,
        })
    }

    /// Load a `weft.toml` file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config() {
        let config = DispatchConfig::from_toml_str("[dispatch]\ntrace_dispatch = true\n").unwrap();
        assert!(config.trace_dispatch);
        assert!(!config.force_general_path);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = DispatchConfig::from_toml_str("").unwrap();
        assert!(!config.trace_dispatch);
        assert!(!config.trace_synthesis);
    }

    #[test]
    fn test_malformed_config_is_an_error() {
        assert!(DispatchConfig::from_toml_str("[dispatch\n").is_err());
    }
}
