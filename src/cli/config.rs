//! Config subcommand for checkconnect CLI
//!
//! Shows, queries and updates the resolved configuration document.

use clap::{Args, Subcommand};
use serde_json::Value;

/// Arguments for the config subcommand
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the current document as YAML
    Show,

    /// Print the loaded file and the candidate locations
    Path,

    /// Print one value as JSON (null if missing)
    Get {
        #[arg(value_name = "SECTION")]
        section: String,
        #[arg(value_name = "KEY")]
        key: String,
    },

    /// Set one value and save the file
    Set {
        #[arg(value_name = "SECTION")]
        section: String,
        #[arg(value_name = "KEY")]
        key: String,
        /// Parsed as YAML, so `true`, `5` and `[a, b]` keep their types
        #[arg(value_name = "VALUE")]
        value: String,
    },
}

/// Parse a command-line value as a YAML scalar or list.
///
/// Anything that does not parse is kept as a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_value_keeps_types() {
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("2048"), json!(2048));
        assert_eq!(parse_value("DEBUG"), json!("DEBUG"));
        assert_eq!(
            parse_value("[pool.ntp.org, time.example.com]"),
            json!(["pool.ntp.org", "time.example.com"])
        );
        assert_eq!(parse_value("null"), Value::Null);
        assert_eq!(parse_value("key: [unclosed"), json!("key: [unclosed"));
    }
}
