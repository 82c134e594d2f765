//! The in-memory configuration document.
//!
//! A document is a set of independent sections, each a flat mapping from key
//! to scalar (or list) value. Values are kept as `serde_json::Value` so that
//! YAML, JSON and typed settings all share one representation.

use crate::error::{FatalError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::path::Path;

/// Application name used for directories and default file names.
pub const APP_NAME: &str = "checkconnect";

/// File name looked up at each candidate location.
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// One section of the document.
pub type Section = BTreeMap<String, Value>;

/// Section name -> key -> value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument {
    sections: BTreeMap<String, Section>,
}

impl ConfigDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML document.
    ///
    /// The top level must be a mapping of mappings. Empty input and empty
    /// sections (`logger:` with nothing below it) are accepted.
    pub fn from_yaml(content: &str, origin: &Path) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::new());
        }

        let value: Value =
            serde_yaml::from_str(content).map_err(|e| FatalError::syntax(origin, e))?;
        Self::from_value(value, origin)
    }

    /// Build a document from an already parsed value.
    pub fn from_value(value: Value, origin: &Path) -> Result<Self> {
        let top = match value {
            Value::Null => return Ok(Self::new()),
            Value::Object(map) => map,
            other => {
                return Err(FatalError::syntax(
                    origin,
                    format!("expected a mapping of sections, found {}", type_name(&other)),
                ));
            }
        };

        let mut sections = BTreeMap::new();
        for (name, body) in top {
            let section = match body {
                Value::Null => Section::new(),
                Value::Object(map) => map.into_iter().collect(),
                other => {
                    return Err(FatalError::syntax(
                        origin,
                        format!(
                            "section '{}' must be a mapping, found {}",
                            name,
                            type_name(&other)
                        ),
                    ));
                }
            };
            sections.insert(name, section);
        }

        Ok(Self { sections })
    }

    /// Serialize to YAML for persisting.
    pub fn to_yaml(&self) -> std::result::Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// Look up a value. Null values count as missing.
    pub fn get(&self, section: &str, key: &str) -> Option<&Value> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .filter(|v| !v.is_null())
    }

    pub fn section(&self, section: &str) -> Option<&Section> {
        self.sections.get(section)
    }

    /// Insert or replace a value, creating the section if needed.
    pub fn set(&mut self, section: &str, key: &str, value: Value) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// The section as a JSON object, for typed deserialization. Null
    /// values are left out so they fall back to field defaults.
    pub fn section_value(&self, section: &str) -> Value {
        match self.sections.get(section) {
            Some(s) => Value::Object(
                s.iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            None => Value::Object(Default::default()),
        }
    }

    /// The built-in document used when no configuration file exists.
    pub fn builtin_default() -> Self {
        let log_dir = dirs::data_local_dir()
            .map(|d| d.join(APP_NAME).join("logs"))
            .unwrap_or_else(|| Path::new("logs").to_path_buf());
        let data_dir = dirs::data_dir()
            .map(|d| d.join(APP_NAME))
            .unwrap_or_else(|| Path::new("data").to_path_buf());

        let value = json!({
            "logger": {
                "level": "INFO",
                "format": "%(asctime)s - %(name)s - %(levelname)s - %(message)s",
                "log_directory": log_dir.to_string_lossy(),
                "output_format": "console",
            },
            "console_handler": { "enabled": false },
            "file_handler": {
                "enabled": true,
                "file_name": format!("{}.log", APP_NAME),
            },
            "limited_file_handler": {
                "enabled": true,
                "file_name": format!("limited_{}.log", APP_NAME),
                "max_bytes": 1024,
                "backup_count": 5,
            },
            "gui": { "enabled": true },
            "reports": { "directory": data_dir.to_string_lossy() },
            "data": { "directory": data_dir.to_string_lossy() },
            "network": {
                "timeout": 5,
                "ntp_servers": ["pool.ntp.org"],
                "urls": ["https://example.com"],
            },
        });

        // The literal above is always a mapping of mappings.
        Self::from_value(value, Path::new("<builtin>")).unwrap_or_default()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sections() {
        let yaml = r#"
logger:
  level: DEBUG
  log_directory: /tmp/logs
file_handler:
  enabled: true
network:
  ntp_servers: [pool.ntp.org, time.example.com]
"#;
        let doc = ConfigDocument::from_yaml(yaml, Path::new("t.yaml")).unwrap();
        assert_eq!(doc.get("logger", "level"), Some(&json!("DEBUG")));
        assert_eq!(doc.get("file_handler", "enabled"), Some(&json!(true)));
        assert_eq!(
            doc.get("network", "ntp_servers"),
            Some(&json!(["pool.ntp.org", "time.example.com"]))
        );
        assert_eq!(doc.get("logger", "missing"), None);
        assert_eq!(doc.get("missing", "level"), None);
    }

    #[test]
    fn empty_input_and_empty_section() {
        let doc = ConfigDocument::from_yaml("   \n", Path::new("t.yaml")).unwrap();
        assert!(doc.is_empty());

        let doc = ConfigDocument::from_yaml("logger:\n", Path::new("t.yaml")).unwrap();
        assert!(doc.section("logger").unwrap().is_empty());
    }

    #[test]
    fn rejects_non_mapping_documents() {
        let err = ConfigDocument::from_yaml("- a\n- b\n", Path::new("list.yaml")).unwrap_err();
        assert!(err.to_string().contains("list.yaml"));

        let err = ConfigDocument::from_yaml("logger: 5\n", Path::new("s.yaml")).unwrap_err();
        assert!(err.to_string().contains("section 'logger'"));

        let err =
            ConfigDocument::from_yaml("logger: [unclosed\n", Path::new("bad.yaml")).unwrap_err();
        assert!(matches!(err, FatalError::ConfigurationSyntax { .. }));
    }

    #[test]
    fn null_values_count_as_missing() {
        let doc = ConfigDocument::from_yaml("logger:\n  level: ~\n", Path::new("t.yaml")).unwrap();
        assert_eq!(doc.get("logger", "level"), None);
    }

    #[test]
    fn builtin_default_contract() {
        let doc = ConfigDocument::builtin_default();
        assert_eq!(doc.get("logger", "level"), Some(&json!("INFO")));
        assert_eq!(doc.get("logger", "output_format"), Some(&json!("console")));
        assert!(doc.get("logger", "log_directory").is_some());
        assert_eq!(doc.get("console_handler", "enabled"), Some(&json!(false)));
        assert_eq!(doc.get("file_handler", "enabled"), Some(&json!(true)));
        assert_eq!(
            doc.get("limited_file_handler", "max_bytes"),
            Some(&json!(1024))
        );
        assert_eq!(
            doc.get("limited_file_handler", "backup_count"),
            Some(&json!(5))
        );
        assert_eq!(doc.get("network", "timeout"), Some(&json!(5)));
    }

    #[test]
    fn yaml_roundtrip_preserves_types() {
        let mut doc = ConfigDocument::new();
        doc.set("limited_file_handler", "max_bytes", json!(2048));
        doc.set("console_handler", "enabled", json!(true));
        doc.set("network", "urls", json!(["https://a.example"]));

        let yaml = doc.to_yaml().unwrap();
        let back = ConfigDocument::from_yaml(&yaml, Path::new("rt.yaml")).unwrap();
        assert_eq!(back, doc);
    }
}
