//! Configuration discovery, loading and persistence.
//!
//! A single YAML file (`config.yaml`) holds independent sections. The file is
//! looked up at these locations, first existing wins:
//! 1. **Working directory** - `./config.yaml`
//! 2. **User** - `<user config dir>/checkconnect/config.yaml`
//! 3. **Site** - `<site config dir>/checkconnect/config.yaml`
//! 4. **Packaged** - next to the executable
//!
//! When none exists, built-in defaults are used and written to the first
//! writable location.
//!
//! ## Environment Variables
//! - `CHECKCONNECT_CONFIG_PATH` - Explicit config file (overrides all)

mod document;
mod paths;
mod resolver;
mod types;

pub use document::{APP_NAME, CONFIG_FILE_NAME, ConfigDocument, Section};
pub use paths::{CONFIG_PATH_ENV, CandidateLocation, ConfigPaths, LocationKind};
pub use resolver::{ConfigResolver, ResolverArgs};
pub use types::*;
