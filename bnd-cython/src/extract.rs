//! Extraction: clang `Entity` tree → intermediate model types.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clang::{Accessibility, Entity, EntityKind, Index, diagnostic::Severity};
use tracing::{debug, trace, warn};

use crate::config;
use crate::model::*;

/// Parse one header as C++ and extract the declarations it contains.
///
/// Only entities located in the header itself are extracted; whatever it
/// includes is parsed for type resolution but not wrapped.
pub fn extract_unit(
    index: &Index,
    header: &Path,
    base_dir: &Path,
    include_paths: &[PathBuf],
    clang_args: &[String],
) -> Result<Unit> {
    let header_path = config::resolve_header(header, base_dir, include_paths);
    debug!(header = %header_path.display(), "parsing header");

    // Headers are parsed as C++ regardless of their extension.
    let mut all_args: Vec<String> = vec!["-x".into(), "c++".into(), "-std=c++11".into()];
    all_args.extend(clang_args.iter().cloned());
    for inc in include_paths {
        let flag = format!("-I{}", inc.display());
        if !all_args.contains(&flag) {
            all_args.push(flag);
        }
    }

    let path_str = header_path
        .to_str()
        .with_context(|| format!("header path is not UTF-8: {}", header_path.display()))?;
    let tu = index
        .parser(path_str)
        .arguments(&all_args.iter().map(|s| s.as_str()).collect::<Vec<_>>())
        .parse()
        .map_err(|e| anyhow::anyhow!("failed to parse {}: {:?}", header_path.display(), e))?;

    let errors: Vec<String> = tu
        .get_diagnostics()
        .iter()
        .filter(|d| matches!(d.get_severity(), Severity::Error | Severity::Fatal))
        .map(|d| d.get_text())
        .collect();
    if !errors.is_empty() {
        anyhow::bail!(
            "clang reported {} error(s) in {}:\n  {}",
            errors.len(),
            header_path.display(),
            errors.join("\n  ")
        );
    }

    let mut items = Vec::new();
    collect_items(
        &tu.get_entity().get_children(),
        &header_path,
        &[],
        &mut items,
    );

    let unit = Unit {
        header: header.display().to_string(),
        items,
    };

    tracing::info!(
        header = %unit.header,
        items = unit.items.len(),
        "header extraction complete"
    );

    Ok(unit)
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

fn collect_items(entities: &[Entity], header: &Path, namespace: &[String], items: &mut Vec<Item>) {
    for entity in entities {
        if !is_in_header(entity, header) {
            continue;
        }
        match entity.get_kind() {
            EntityKind::Namespace => {
                let mut nested = namespace.to_vec();
                if let Some(name) = entity.get_name().filter(|n| !n.is_empty()) {
                    nested.push(name);
                }
                collect_items(&entity.get_children(), header, &nested, items);
            }
            EntityKind::ClassDecl | EntityKind::StructDecl => {
                if !entity.is_definition() {
                    continue;
                }
                let name = match entity.get_name() {
                    Some(n) if !n.is_empty() => n,
                    _ => continue,
                };
                let class = extract_class(entity, &name, namespace);
                debug!(
                    name = %class.name,
                    fields = class.fields.len(),
                    ctors = class.constructors.len(),
                    methods = class.methods.len(),
                    "extracted class"
                );
                items.push(Item::Class(class));
            }
            EntityKind::FunctionDecl => {
                let name = entity.get_name().unwrap_or_default();
                if name.starts_with("operator") {
                    debug!(name = %name, "skipping free operator");
                    continue;
                }
                if entity.is_variadic() {
                    warn!(name = %name, "skipping variadic function");
                    continue;
                }
                match extract_function(entity, None, namespace) {
                    Ok(f) => {
                        debug!(name = %f.name, params = f.params.len(), "extracted function");
                        items.push(Item::Function(f));
                    }
                    Err(e) => warn!(name = %name, err = %e, "skipping function"),
                }
            }
            EntityKind::EnumDecl => match extract_enum(entity, namespace) {
                Some(en) => {
                    debug!(name = %en.name, values = en.values.len(), "extracted enum");
                    items.push(Item::Enum(en));
                }
                None => trace!("skipping anonymous enum"),
            },
            EntityKind::TypedefDecl | EntityKind::TypeAliasDecl => {
                match extract_typedef(entity, namespace) {
                    Some(td) => {
                        debug!(alias = %td.alias, "extracted typedef");
                        items.push(Item::Typedef(td));
                    }
                    None => trace!("skipping typedef without underlying type"),
                }
            }
            other => trace!(kind = ?other, "ignoring entity"),
        }
    }
}

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

fn extract_class(entity: &Entity, name: &str, namespace: &[String]) -> ClassDef {
    let mut class = ClassDef {
        name: name.to_string(),
        namespace: namespace.to_vec(),
        ..Default::default()
    };

    for child in entity.get_children() {
        let kind = child.get_kind();
        if !matches!(
            kind,
            EntityKind::FieldDecl | EntityKind::Constructor | EntityKind::Method
        ) {
            continue;
        }
        if child.get_accessibility() != Some(Accessibility::Public) {
            trace!(class = %name, member = ?child.get_name(), "skipping non-public member");
            continue;
        }
        let member = child.get_name().unwrap_or_default();

        match kind {
            EntityKind::FieldDecl => match child.get_type() {
                Some(ty) => {
                    class
                        .fields
                        .push(FieldDef::new(name, &member, &ty.get_display_name()));
                }
                None => warn!(class = %name, field = %member, "skipping field without type"),
            },
            EntityKind::Constructor => {
                if child.is_copy_constructor() || child.is_move_constructor() {
                    trace!(class = %name, "skipping copy/move constructor");
                    continue;
                }
                if child.is_variadic() {
                    warn!(class = %name, "skipping variadic constructor");
                    continue;
                }
                let params = extract_params(&child);
                class.constructors.push(FunctionDef {
                    namespace: namespace.to_vec(),
                    ..FunctionDef::constructor(name, params)
                });
            }
            EntityKind::Method => {
                if child.is_static_method() {
                    debug!(class = %name, method = %member, "skipping static method");
                    continue;
                }
                if child.is_variadic() {
                    warn!(class = %name, method = %member, "skipping variadic method");
                    continue;
                }
                match extract_function(&child, Some(name), namespace) {
                    Ok(m) => class.methods.push(m),
                    Err(e) => warn!(class = %name, method = %member, err = %e, "skipping method"),
                }
            }
            _ => {}
        }
    }

    class
}

// ---------------------------------------------------------------------------
// Functions and methods
// ---------------------------------------------------------------------------

fn extract_function(
    entity: &Entity,
    owning_class: Option<&str>,
    namespace: &[String],
) -> Result<FunctionDef> {
    let name = entity.get_name().context("function has no name")?;
    let result = entity
        .get_result_type()
        .context("function has no return type")?;

    Ok(FunctionDef {
        name,
        owning_class: owning_class.map(str::to_string),
        namespace: namespace.to_vec(),
        params: extract_params(entity),
        result_type: result.get_display_name(),
    })
}

fn extract_params(entity: &Entity) -> Vec<ParamDef> {
    entity
        .get_arguments()
        .unwrap_or_default()
        .iter()
        .enumerate()
        .map(|(i, arg)| {
            let name = arg
                .get_name()
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| format!("param{}", i));
            let ty = arg
                .get_type()
                .map(|t| t.get_display_name())
                .unwrap_or_default();
            ParamDef { name, ty }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Enums and typedefs
// ---------------------------------------------------------------------------

fn extract_enum(entity: &Entity, namespace: &[String]) -> Option<EnumDef> {
    let name = entity.get_name().filter(|n| !n.is_empty())?;
    let values = entity
        .get_children()
        .iter()
        .filter(|c| c.get_kind() == EntityKind::EnumConstantDecl)
        .map(|c| EnumValue {
            name: c.get_name().unwrap_or_default(),
            value: c.get_enum_constant_value().map(|(s, _)| s).unwrap_or(0),
        })
        .collect();
    Some(EnumDef {
        name,
        namespace: namespace.to_vec(),
        values,
    })
}

fn extract_typedef(entity: &Entity, namespace: &[String]) -> Option<TypedefDef> {
    let alias = entity.get_name().filter(|n| !n.is_empty())?;
    let underlying = entity.get_typedef_underlying_type()?;
    Some(TypedefDef {
        alias,
        underlying_type: underlying.get_display_name(),
        namespace: namespace.to_vec(),
    })
}

// ---------------------------------------------------------------------------
// Source-location filtering
// ---------------------------------------------------------------------------

fn is_in_header(entity: &Entity, header: &Path) -> bool {
    let location = match entity.get_location() {
        Some(loc) => loc,
        None => return false,
    };
    let file = match location.get_file_location().file {
        Some(f) => f,
        None => return false,
    };
    let file_path = file.get_path();
    file_path == header || file_path.ends_with(header)
}
