//! Layered registry configuration.
//!
//! Sources, later ones winning:
//!
//! | Source                     | Example                             |
//! |----------------------------|-------------------------------------|
//! | built-in defaults          | `RegistryConfig::default()`         |
//! | optional TOML file         | `optimization = "memory"`           |
//! | `CLAIMS_*` environment     | `CLAIMS_OPTIMIZATION=process`       |
//!
//! Only `optimization` changes registry behaviour (and only at load time);
//! the remaining keys are passed through to collaborators.

use crate::types::RegistryConfig;
use config::{Config, ConfigError, Environment, File, FileFormat};
use std::path::Path;

pub const ENV_PREFIX: &str = "CLAIMS";

/// Build a [`RegistryConfig`] from defaults, `path` (if given) and the
/// environment.
pub fn load(path: Option<&Path>) -> Result<RegistryConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        let name = path.to_string_lossy();
        builder = builder.add_source(File::new(&name, FileFormat::Toml).required(true));
    }
    builder
        .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()?
        .try_deserialize()
}
