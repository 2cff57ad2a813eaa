//! Configuration types for `bnd-cython.toml`.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Root configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    /// C++ headers (or sources) to wrap. Each one is parsed on its own and
    /// becomes one `cdef extern from` include in the declarations.
    #[serde(default)]
    pub headers: Vec<PathBuf>,
    /// Additional directories to search when resolving header paths.  Each
    /// entry is tried in order after `base_dir` (the TOML file's parent
    /// directory).  Also injected as `-I` flags for clang.
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,
    /// Extra clang arguments (e.g. `-std=c++17`, `-DFOO`).
    #[serde(default)]
    pub clang_args: Vec<String>,
    /// C++ operator → special method name, layered over the defaults.
    #[serde(default)]
    pub operators: HashMap<String, String>,
    /// C++ operator → identifier it is declared and called under.
    #[serde(default)]
    pub call_operators: HashMap<String, String>,
}

/// Output settings.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Extension module name. Optional when exactly one header is wrapped.
    #[serde(default)]
    pub module: Option<String>,
    /// Directory the artifacts are written to.
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            module: None,
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// The module name for this run; see [`module_name`].
    pub fn module_name(&self) -> Result<String, ConfigError> {
        module_name(self.output.module.as_deref(), &self.headers)
    }
}

/// Resolve the module name: the explicit one if given, otherwise the base
/// name of the only input file (`include/vector3.hpp` → `vector3`).
///
/// Several inputs without an explicit name is a configuration error.
pub fn module_name(explicit: Option<&str>, inputs: &[PathBuf]) -> Result<String, ConfigError> {
    if inputs.is_empty() {
        return Err(ConfigError::NoInputFiles);
    }
    if let Some(name) = explicit.filter(|n| !n.is_empty()) {
        return Ok(name.to_string());
    }
    match inputs {
        [only] => derive_module_name(only).ok_or_else(|| ConfigError::InvalidModuleName {
            file: only.display().to_string(),
        }),
        _ => Err(ConfigError::MissingModuleName {
            count: inputs.len(),
        }),
    }
}

/// Base name of `path`, stripped of directories and every extension.
fn derive_module_name(path: &Path) -> Option<String> {
    let file_name = path.file_name()?.to_str()?;
    let stem = file_name.split('.').next()?;
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

/// Resolve a header path by searching `base_dir` first, then each
/// `include_paths` entry.  Absolute paths are returned as-is.  If the
/// file is not found anywhere, falls back to `base_dir.join(path)` so
/// that the caller gets a meaningful error from clang.
pub fn resolve_header(path: &Path, base_dir: &Path, include_paths: &[PathBuf]) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let candidate = base_dir.join(path);
    if candidate.exists() {
        return candidate;
    }
    for inc in include_paths {
        let candidate = inc.join(path);
        if candidate.exists() {
            return candidate;
        }
    }
    // Fall back; clang will report the error with context.
    base_dir.join(path)
}

/// Load and parse a `bnd-cython.toml` configuration file.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {}", path.display(), e))?;
    parse_config(&content)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {}", path.display(), e))
}

/// Parse configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}
