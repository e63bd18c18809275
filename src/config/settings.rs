//! Adapter-wide settings

use serde::{Deserialize, Serialize};

use crate::services::InvocationOptions;

/// Default bound on the diagnostic turn sent on retry
pub const DEFAULT_DIAGNOSTIC_MAX_CHARS: usize = 256;

/// Smallest diagnostic bound that still leaves room for the failure text
pub const MIN_DIAGNOSTIC_MAX_CHARS: usize = 40;

/// Settings shared by every adapter built from the config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterSettings {
    /// Maximum characters of the diagnostic turn built from a backend failure
    #[serde(default = "default_diagnostic_max_chars")]
    pub diagnostic_max_chars: usize,

    /// Options used by the CLI when none are given on the command line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_options: Option<InvocationOptions>,

    /// Verbose logging enabled
    #[serde(default)]
    pub verbose: bool,
}

fn default_diagnostic_max_chars() -> usize {
    DEFAULT_DIAGNOSTIC_MAX_CHARS
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            diagnostic_max_chars: DEFAULT_DIAGNOSTIC_MAX_CHARS,
            default_options: None,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = AdapterSettings::default();
        assert_eq!(settings.diagnostic_max_chars, 256);
        assert!(settings.default_options.is_none());
        assert!(!settings.verbose);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: AdapterSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, AdapterSettings::default());
    }
}
