//! Configuration resolver: locate, load and persist the configuration document.
//!
//! Loading order:
//! 1. An explicit path (CLI or `CHECKCONNECT_CONFIG_PATH`) must exist and parse.
//! 2. Otherwise the first existing candidate location is used.
//! 3. Otherwise the built-in defaults are used and written to the first
//!    candidate location that accepts the write.
//!
//! A file that exists but does not parse is always fatal; the resolver never
//! skips to the next candidate.

use super::document::{ConfigDocument, Section};
use super::paths::ConfigPaths;
use crate::error::{FatalError, Result};
use crate::guard::Managed;
use crate::lock_unpoisoned;
use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Loads, serves and persists the configuration document.
#[derive(Debug)]
pub struct ConfigResolver {
    /// Ordered candidate locations
    paths: ConfigPaths,
    /// Path the caller insisted on, if any
    explicit_path: Option<PathBuf>,
    /// Current document; snapshots handed out stay unchanged
    document: ArcSwap<ConfigDocument>,
    /// File the document was loaded from or last written to
    loaded_file: Mutex<Option<PathBuf>>,
    /// Non-fatal diagnostics from the most recent load
    errors: Mutex<Vec<String>>,
}

impl ConfigResolver {
    /// Create a resolver without loading anything yet.
    pub fn new(paths: ConfigPaths, explicit_path: Option<PathBuf>) -> Self {
        Self {
            paths,
            explicit_path,
            document: ArcSwap::from_pointee(ConfigDocument::new()),
            loaded_file: Mutex::new(None),
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Discover the standard locations and load.
    ///
    /// Without an explicit path, `CHECKCONNECT_CONFIG_PATH` is honoured.
    pub fn open(explicit_path: Option<PathBuf>) -> Result<Self> {
        let explicit_path = explicit_path.or_else(ConfigPaths::env_override);
        let resolver = Self::new(ConfigPaths::discover(), explicit_path);
        resolver.load()?;
        Ok(resolver)
    }

    /// Load the document, replacing whatever is held in memory.
    ///
    /// When no file exists anywhere, the defaults are installed in memory
    /// before persisting is attempted. If no location accepts the write the
    /// error is returned, but the defaults remain available.
    pub fn load(&self) -> Result<Arc<ConfigDocument>> {
        lock_unpoisoned(&self.errors).clear();

        if let Some(path) = &self.explicit_path {
            info!(path = %path.display(), "Loading configuration from explicit path");
            if !path.exists() {
                self.record(format!("Config '{}' not found.", path.display()));
                return Err(FatalError::write_configuration(
                    path,
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        "configuration file does not exist",
                    ),
                ));
            }
            let doc = self.read_file(path)?;
            return Ok(self.install(doc, Some(path.clone())));
        }

        debug!(
            locations = ?self.paths.iter_paths().collect::<Vec<_>>(),
            "Searching for configuration file in candidate locations"
        );
        for path in self.paths.iter_paths() {
            if path.exists() {
                let doc = self.read_file(path)?;
                info!(path = %path.display(), "Loaded configuration");
                return Ok(self.install(doc, Some(path.to_path_buf())));
            }
            debug!(path = %path.display(), "Candidate location does not exist");
        }

        warn!("No configuration file found; using default settings.");
        self.record("No configuration file found; using default settings.");
        let defaults = self.install(ConfigDocument::builtin_default(), None);

        let written = self.write_first_writable(&defaults)?;
        info!(path = %written.display(), "Default configuration written");
        Ok(defaults)
    }

    /// Re-run [`load`](Self::load) in the same explicit/implicit mode.
    pub fn reload(&self) -> Result<()> {
        debug!("Reloading configuration");
        self.load().map(|_| ())
    }

    /// Look up a value, falling back to `default`. Never fails.
    pub fn get(&self, section: &str, key: &str, default: impl Into<Value>) -> Value {
        self.document
            .load()
            .get(section, key)
            .cloned()
            .unwrap_or_else(|| default.into())
    }

    /// Look up a value and deserialize it, falling back to `default` when the
    /// key is missing or has an incompatible type.
    pub fn get_as<T: DeserializeOwned>(&self, section: &str, key: &str, default: T) -> T {
        self.document
            .load()
            .get(section, key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(default)
    }

    /// A copy of one section; empty if the section is absent.
    pub fn get_section(&self, section: &str) -> Section {
        self.document
            .load()
            .section(section)
            .cloned()
            .unwrap_or_default()
    }

    /// Update a value in memory and persist immediately.
    pub fn set(&self, section: &str, key: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        debug!(section, key, value = %value, "Set config value");
        self.document.rcu(|current| {
            let mut next = ConfigDocument::clone(current);
            next.set(section, key, value.clone());
            next
        });
        self.save().map(|_| ())
    }

    /// Persist the current document.
    ///
    /// Writes to the loaded file when known, otherwise to the first candidate
    /// location that accepts the write. Returns the path written.
    pub fn save(&self) -> Result<PathBuf> {
        let doc = self.document.load_full();
        let target = lock_unpoisoned(&self.loaded_file).clone();

        match target {
            Some(path) => {
                write_document(&path, &doc)
                    .map_err(|e| FatalError::write_configuration(&path, e))?;
                info!(path = %path.display(), "Configuration saved");
                Ok(path)
            }
            None => {
                info!("Searching for a writable location to save configuration");
                self.write_first_writable(&doc)
            }
        }
    }

    /// Shared snapshot of the current document.
    pub fn as_dict(&self) -> Arc<ConfigDocument> {
        self.document.load_full()
    }

    /// Owned deep copy of the current document.
    pub fn copy(&self) -> ConfigDocument {
        ConfigDocument::clone(&self.document.load())
    }

    /// File the current document came from, if any.
    pub fn loaded_config_file(&self) -> Option<PathBuf> {
        lock_unpoisoned(&self.loaded_file).clone()
    }

    /// Path given by `--config` or the environment; it must exist.
    pub fn explicit_path(&self) -> Option<&Path> {
        self.explicit_path.as_deref()
    }

    /// Candidate locations searched when no explicit path is set.
    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Non-fatal diagnostics from the most recent load.
    pub fn instance_errors(&self) -> Vec<String> {
        lock_unpoisoned(&self.errors).clone()
    }

    fn read_file(&self, path: &Path) -> Result<ConfigDocument> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            self.record(format!(
                "OS error accessing config file '{}': {}",
                path.display(),
                e
            ));
            FatalError::ConfigurationUnreadable {
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        ConfigDocument::from_yaml(&content, path).inspect_err(|e| {
            self.record(format!("Decoding failed for '{}': {}", path.display(), e));
        })
    }

    fn install(&self, doc: ConfigDocument, origin: Option<PathBuf>) -> Arc<ConfigDocument> {
        let doc = Arc::new(doc);
        self.document.store(Arc::clone(&doc));
        *lock_unpoisoned(&self.loaded_file) = origin;
        doc
    }

    /// Try each candidate in order; the first successful write becomes the
    /// loaded file.
    fn write_first_writable(&self, doc: &ConfigDocument) -> Result<PathBuf> {
        let mut last_failure: Option<(PathBuf, io::Error)> = None;

        for path in self.paths.iter_paths() {
            match write_document(path, doc) {
                Ok(()) => {
                    *lock_unpoisoned(&self.loaded_file) = Some(path.to_path_buf());
                    return Ok(path.to_path_buf());
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Unable to write configuration to this location");
                    self.record(format!(
                        "Failed to save config to '{}': {}",
                        path.display(),
                        e
                    ));
                    last_failure = Some((path.to_path_buf(), e));
                }
            }
        }

        let (path, source) = last_failure.unwrap_or_else(|| {
            (
                PathBuf::new(),
                io::Error::new(io::ErrorKind::NotFound, "no candidate locations configured"),
            )
        });
        Err(FatalError::write_configuration(path, source))
    }

    fn record(&self, message: impl Into<String>) {
        lock_unpoisoned(&self.errors).push(message.into());
    }
}

/// Construction inputs when the resolver is held by a guard.
#[derive(Debug, Clone, Default)]
pub struct ResolverArgs {
    /// Explicit file; falls back to `CHECKCONNECT_CONFIG_PATH`.
    pub explicit_path: Option<PathBuf>,
    /// Candidate list; the standard locations when absent.
    pub paths: Option<ConfigPaths>,
}

impl ResolverArgs {
    pub fn new(explicit_path: Option<PathBuf>) -> Self {
        Self {
            explicit_path,
            paths: None,
        }
    }

    pub fn with_paths(mut self, paths: ConfigPaths) -> Self {
        self.paths = Some(paths);
        self
    }
}

impl Managed for ConfigResolver {
    type Args = ResolverArgs;
    const NAME: &'static str = "SettingsManager";

    fn construct(args: &Self::Args) -> Result<Self> {
        let paths = args.paths.clone().unwrap_or_else(ConfigPaths::discover);
        let explicit = args
            .explicit_path
            .clone()
            .or_else(ConfigPaths::env_override);
        Ok(Self::new(paths, explicit))
    }

    /// Load (or on retry, reload) the document.
    fn configure(&self, _args: Self::Args) -> Result<()> {
        self.load().map(|_| ())
    }

    fn instance_errors(&self) -> Vec<String> {
        ConfigResolver::instance_errors(self)
    }
}

fn write_document(path: &Path, doc: &ConfigDocument) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let yaml = doc.to_yaml().map_err(io::Error::other)?;
    std::fs::write(path, yaml)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn resolver_in(temp: &TempDir) -> ConfigResolver {
        let paths = ConfigPaths::with_candidates([
            temp.path().join("cwd/config.yaml"),
            temp.path().join("user/config.yaml"),
        ]);
        ConfigResolver::new(paths, None)
    }

    #[test]
    fn get_with_default_never_fails() {
        let temp = TempDir::new().unwrap();
        let resolver = resolver_in(&temp);
        resolver.load().unwrap();

        assert_eq!(resolver.get("logger", "level", "X"), json!("INFO"));
        assert_eq!(resolver.get("nope", "level", 7), json!(7));
        assert_eq!(resolver.get_as("network", "timeout", 0u64), 5);
        // Type mismatch falls back to the default
        assert_eq!(resolver.get_as("logger", "level", 42u32), 42);
        assert!(resolver.get_section("nope").is_empty());
    }

    #[test]
    fn snapshots_are_isolated_from_set() {
        let temp = TempDir::new().unwrap();
        let resolver = resolver_in(&temp);
        resolver.load().unwrap();

        let shallow = resolver.as_dict();
        let deep = resolver.copy();
        resolver.set("logger", "level", "DEBUG").unwrap();

        assert_eq!(shallow.get("logger", "level"), Some(&json!("INFO")));
        assert_eq!(deep.get("logger", "level"), Some(&json!("INFO")));
        assert_eq!(resolver.get("logger", "level", ""), json!("DEBUG"));
    }

    #[test]
    fn save_without_loaded_file_searches_candidates() {
        let temp = TempDir::new().unwrap();
        let resolver = resolver_in(&temp);
        assert_eq!(resolver.loaded_config_file(), None);

        let written = resolver.save().unwrap();
        assert_eq!(written, temp.path().join("cwd/config.yaml"));
        assert_eq!(resolver.loaded_config_file(), Some(written));
    }

    #[test]
    fn errors_cleared_on_each_load() {
        let temp = TempDir::new().unwrap();
        let resolver = resolver_in(&temp);
        resolver.load().unwrap();
        assert_eq!(resolver.instance_errors().len(), 1);

        // Second load finds the written defaults; nothing to report.
        resolver.load().unwrap();
        assert!(resolver.instance_errors().is_empty());
    }
}
