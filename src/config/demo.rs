//! Demonstration component settings

use serde::Deserialize;

/// Whether the built-in demo components are registered at boot
#[derive(Debug, Clone, PartialEq)]
pub struct DemoConfig {
    pub enabled: bool,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Demo settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
pub struct FileDemo {
    pub enabled: Option<bool>,
}

impl DemoConfig {
    /// Create from file config; `env` is the raw `WIREBOUND_DEMO` value
    pub fn from_file(file: Option<FileDemo>, env: Option<String>) -> Self {
        let file = file.unwrap_or_default();

        let enabled = env
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .or(file.enabled)
            .unwrap_or(Self::default().enabled);

        Self { enabled }
    }
}
