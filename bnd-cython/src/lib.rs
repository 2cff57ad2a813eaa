//! bnd-cython: C++ header → Cython binding generator.
//!
//! Parses C++ headers via libclang and emits two Cython sources: a
//! declaration file (`_declarations.pxd`) mirroring the native interface and
//! an implementation file (`<module>.pyx`) with the wrapper classes and
//! functions. Compiling them into an extension module is left to Cython.
//!
//! # Quick start
//!
//! Generate and write both files from a config:
//!
//! ```no_run
//! use std::path::Path;
//!
//! // Reads config TOML, parses headers, writes the .pxd and .pyx files.
//! bnd_cython::run(Path::new("bnd-cython.toml"), None, None).unwrap();
//! ```
//!
//! Or work on an entity tree directly, without libclang:
//!
//! ```
//! use bnd_cython::model::{ClassDef, FieldDef, Item, Unit};
//! use bnd_cython::naming::NameRules;
//!
//! let mut class = ClassDef::new("Vector3");
//! class.fields.push(FieldDef::new("Vector3", "x", "double"));
//! let unit = Unit {
//!     header: "vector3.hpp".into(),
//!     items: vec![Item::Class(class)],
//! };
//!
//! let out = bnd_cython::generate_from_units("vector3", &[unit], &NameRules::default()).unwrap();
//! assert!(out.implementation.content.contains("cpdef get_x(Vector3 self):"));
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

pub mod callable;
pub mod config;
pub mod convert;
pub mod error;
pub mod extract;
pub mod model;
pub mod naming;
pub mod outline;
pub mod pxd;
pub mod pyx;
pub mod text;
pub mod types;

use error::Warning;
use model::{GeneratedArtifact, SymbolTable, Unit};
use naming::NameRules;

/// Output of one generation run.
#[derive(Debug, Clone)]
pub struct Generated {
    /// `_declarations.pxd`
    pub declaration: GeneratedArtifact,
    /// `<module>.pyx`
    pub implementation: GeneratedArtifact,
    /// Members dropped from the implementation, constructor conflicts.
    pub warnings: Vec<Warning>,
}

impl Generated {
    pub fn artifacts(&self) -> [&GeneratedArtifact; 2] {
        [&self.declaration, &self.implementation]
    }
}

/// Run the full pipeline: load config, parse C++ headers, emit both
/// artifacts and write them out.
///
/// `config_path` is the path to a `bnd-cython.toml` configuration file.
/// `output_dir` optionally overrides the output directory from the config,
/// `module` the module name.
///
/// Nothing is written unless generation succeeds as a whole.
///
/// Returns the paths of the written files.
pub fn run(
    config_path: &Path,
    output_dir: Option<&Path>,
    module: Option<&str>,
) -> Result<Vec<PathBuf>> {
    let mut cfg = config::load_config(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    if let Some(module) = module {
        cfg.output.module = Some(module.to_string());
    }

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    let generated = generate_from_config(&cfg, base_dir)?;

    let dir = match output_dir {
        Some(p) => p.to_path_buf(),
        None => base_dir.join(&cfg.output.dir),
    };
    write_artifacts(&generated, &dir)
}

/// Parse a `bnd-cython.toml` config file, extract declarations from the
/// referenced headers, and return the generated artifacts without writing
/// to disk.
pub fn generate(config_path: &Path) -> Result<Generated> {
    let cfg = config::load_config(config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    generate_from_config(&cfg, base_dir)
}

/// Generate artifacts from an already-loaded [`config::Config`].
///
/// `base_dir` is the directory relative to which header paths in the config
/// are resolved (typically the parent directory of the TOML file). The module
/// name is resolved before any header is parsed.
pub fn generate_from_config(cfg: &config::Config, base_dir: &Path) -> Result<Generated> {
    let module = cfg.module_name()?;
    info!(
        module = %module,
        headers = cfg.headers.len(),
        "loaded configuration"
    );

    // Initialize clang
    let clang =
        clang::Clang::new().map_err(|e| anyhow::anyhow!("failed to initialize libclang: {e}"))?;
    let index = clang::Index::new(&clang, false, false);

    let mut units = Vec::new();
    for header in &cfg.headers {
        let unit = extract::extract_unit(
            &index,
            header,
            base_dir,
            &cfg.include_paths,
            &cfg.clang_args,
        )
        .with_context(|| format!("extracting {}", header.display()))?;
        units.push(unit);
    }

    let rules = NameRules::with_overrides(&cfg.operators, &cfg.call_operators);
    generate_from_units(&module, &units, &rules)
}

/// Run both emission passes over an entity tree.
///
/// Builds the symbol table, runs the declaration and implementation passes
/// and checks that every wrapped member is declared.
pub fn generate_from_units(module: &str, units: &[Unit], rules: &NameRules) -> Result<Generated> {
    let symbols = SymbolTable::build(units);
    info!(
        classes = symbols.class_count(),
        typedefs = symbols.typedef_count(),
        "built symbol table"
    );

    let declarations = pxd::emit_declarations(units, rules);
    let implementation = pyx::emit_implementation(module, units, &symbols, rules);

    outline::check_outlines(&declarations.outline, &implementation.outline)?;

    info!(
        module = %module,
        warnings = implementation.warnings.len(),
        "generated bindings"
    );

    Ok(Generated {
        declaration: declarations.artifact,
        implementation: implementation.artifact,
        warnings: implementation.warnings,
    })
}

/// Write both artifacts into `dir`, creating it if needed.
pub fn write_artifacts(generated: &Generated, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;

    let mut written = Vec::new();
    for artifact in generated.artifacts() {
        let path = dir.join(&artifact.name);
        std::fs::write(&path, &artifact.content)
            .with_context(|| format!("writing output to {}", path.display()))?;
        info!(
            path = %path.display(),
            size = artifact.content.len(),
            "wrote artifact"
        );
        written.push(path);
    }
    Ok(written)
}
