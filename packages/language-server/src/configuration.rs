//! Client Configuration
//!
//! The settings section received from `workspace/didChangeConfiguration`.
//! Unknown fields are ignored; camel-case spellings follow the client
//! side.

use serde::Deserialize;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub debug: bool,
    pub formatting: FormattingSettings,
    #[serde(default = "default_true")]
    pub type_checking: bool,
    pub suppress_future_warnings: bool,
    pub files: FilesSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            debug: false,
            formatting: FormattingSettings::default(),
            type_checking: true,
            suppress_future_warnings: false,
            files: FilesSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FormattingSettings {
    pub harshil_alignment: bool,
    pub mahesh_form: bool,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct FilesSettings {
    pub exclude: Vec<String>,
}

impl Settings {
    /// Extract the settings section from a `didChangeConfiguration`
    /// payload, accepting both `{nextflow: {...}}` and a bare section.
    pub fn from_payload(value: &serde_json::Value) -> Settings {
        let section = value.get("nextflow").unwrap_or(value);
        serde_json::from_value(section.clone()).unwrap_or_default()
    }

    /// Whether analysis-relevant options differ, requiring a full
    /// re-analysis of the workspace.
    pub fn analysis_changed(&self, other: &Settings) -> bool {
        self.type_checking != other.type_checking
            || self.suppress_future_warnings != other.suppress_future_warnings
            || self.files.exclude != other.files.exclude
    }

    pub fn is_excluded(&self, uri: &str) -> bool {
        self.files.exclude.iter().any(|pattern| uri.contains(pattern.as_str()))
    }
}
