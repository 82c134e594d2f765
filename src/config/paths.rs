//! Candidate locations for the configuration file.

use super::document::{APP_NAME, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_PATH_ENV: &str = "CHECKCONNECT_CONFIG_PATH";

/// Where a candidate location comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LocationKind {
    /// `./config.yaml`
    WorkingDirectory = 0,
    /// Per-user config directory
    User = 1,
    /// System-wide config directory
    Site = 2,
    /// Shipped next to the executable
    Packaged = 3,
    /// Supplied by a test or embedding application
    Custom = 4,
}

impl std::fmt::Display for LocationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            LocationKind::WorkingDirectory => "working directory",
            LocationKind::User => "user",
            LocationKind::Site => "site",
            LocationKind::Packaged => "packaged",
            LocationKind::Custom => "custom",
        })
    }
}

/// One entry of the candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLocation {
    pub kind: LocationKind,
    pub path: PathBuf,
}

/// Ordered candidate list, used for loading (first existing file wins)
/// and for writing defaults (first writable location wins).
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    candidates: Vec<CandidateLocation>,
}

impl Default for ConfigPaths {
    fn default() -> Self {
        Self::discover()
    }
}

impl ConfigPaths {
    /// Discover the standard candidate locations.
    pub fn discover() -> Self {
        let mut candidates = vec![CandidateLocation {
            kind: LocationKind::WorkingDirectory,
            path: PathBuf::from(CONFIG_FILE_NAME),
        }];

        if let Some(dir) = dirs::config_dir() {
            candidates.push(CandidateLocation {
                kind: LocationKind::User,
                path: dir.join(APP_NAME).join(CONFIG_FILE_NAME),
            });
        }

        if let Some(dir) = site_config_dir() {
            candidates.push(CandidateLocation {
                kind: LocationKind::Site,
                path: dir.join(APP_NAME).join(CONFIG_FILE_NAME),
            });
        }

        if let Some(dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            candidates.push(CandidateLocation {
                kind: LocationKind::Packaged,
                path: dir.join(CONFIG_FILE_NAME),
            });
        }

        Self { candidates }
    }

    /// Use an explicit candidate list, in the given order.
    pub fn with_candidates<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            candidates: paths
                .into_iter()
                .map(|p| CandidateLocation {
                    kind: LocationKind::Custom,
                    path: p.into(),
                })
                .collect(),
        }
    }

    pub fn candidates(&self) -> &[CandidateLocation] {
        &self.candidates
    }

    pub fn iter_paths(&self) -> impl Iterator<Item = &Path> {
        self.candidates.iter().map(|c| c.path.as_path())
    }

    /// Explicit path from the environment, if set and non-empty.
    pub fn env_override() -> Option<PathBuf> {
        std::env::var_os(CONFIG_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }
}

#[cfg(windows)]
fn site_config_dir() -> Option<PathBuf> {
    std::env::var_os("PROGRAMDATA").map(PathBuf::from)
}

#[cfg(not(windows))]
fn site_config_dir() -> Option<PathBuf> {
    // First entry of XDG_CONFIG_DIRS, falling back to the XDG default.
    let from_env = std::env::var("XDG_CONFIG_DIRS").ok().and_then(|dirs| {
        dirs.split(':')
            .find(|d| !d.is_empty())
            .map(PathBuf::from)
    });
    Some(from_env.unwrap_or_else(|| PathBuf::from("/etc/xdg")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_order() {
        let paths = ConfigPaths::discover();
        let kinds: Vec<LocationKind> = paths.candidates().iter().map(|c| c.kind).collect();

        assert_eq!(kinds.first(), Some(&LocationKind::WorkingDirectory));
        assert_eq!(paths.candidates()[0].path, PathBuf::from("config.yaml"));

        // Whatever subset the platform provides, the order is fixed.
        let mut sorted = kinds.clone();
        sorted.sort();
        assert_eq!(kinds, sorted);
    }

    #[test]
    fn with_candidates_keeps_order() {
        let paths = ConfigPaths::with_candidates(["b/config.yaml", "a/config.yaml"]);
        let got: Vec<&Path> = paths.iter_paths().collect();
        assert_eq!(
            got,
            vec![Path::new("b/config.yaml"), Path::new("a/config.yaml")]
        );
        assert!(
            paths
                .candidates()
                .iter()
                .all(|c| c.kind == LocationKind::Custom)
        );
    }
}
