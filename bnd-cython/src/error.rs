//! Error and warning types.
//!
//! Conversion failures are recovered per callable and turned into
//! [`Warning`]s; configuration and structural errors abort the run before any
//! file is written.

use std::fmt;

use thiserror::Error;
use tracing::warn;

/// Where an unsupported type was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Site {
    Argument(String),
    ReturnType,
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Site::Argument(name) => write!(f, "argument `{name}`"),
            Site::ReturnType => f.write_str("return type"),
        }
    }
}

/// Converter selection failed for one type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error("type `{type_name}` of {site} is not supported")]
    UnsupportedType { type_name: String, site: Site },

    #[error("parameter name `{name}` is reserved in generated code")]
    ReservedName { name: String },
}

impl ConvertError {
    pub fn unsupported(type_name: &str, site: Site) -> Self {
        ConvertError::UnsupportedType {
            type_name: type_name.to_string(),
            site,
        }
    }
}

/// Fatal configuration problems, detected before extraction starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error(
        "a module name is required when wrapping {count} input files; \
         set `output.module` or pass `--module`"
    )]
    MissingModuleName { count: usize },

    #[error("cannot derive a module name from `{file}`")]
    InvalidModuleName { file: String },

    #[error("no input files given; add at least one entry to `headers`")]
    NoInputFiles,
}

/// The implementation artifact wraps something the declaration artifact
/// does not declare.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    #[error("class `{class}` is wrapped but has no declaration block")]
    UndeclaredClass { class: String },

    #[error("member `{member}` of class `{class}` is wrapped but not declared")]
    UndeclaredMember { class: String, member: String },
}

/// Kind of a recoverable problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A callable or field was dropped from the implementation artifact.
    UnsupportedType,
    /// A class declares several constructors; only the last one is kept.
    MultipleConstructors,
    /// A generated name is already taken in the same scope.
    NameClash,
}

/// A recoverable problem recorded during generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Qualified name of the affected entity, e.g. `Vector3::normalize`.
    pub subject: String,
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    /// A callable or field whose conversion failed.
    pub fn skipped(subject: &str, err: &ConvertError) -> Self {
        let kind = match err {
            ConvertError::UnsupportedType { .. } => WarningKind::UnsupportedType,
            ConvertError::ReservedName { .. } => WarningKind::NameClash,
        };
        Self {
            subject: subject.to_string(),
            kind,
            message: format!("{err}; ignoring `{subject}`"),
        }
    }

    pub fn name_clash(subject: &str, name: &str) -> Self {
        Self {
            subject: subject.to_string(),
            kind: WarningKind::NameClash,
            message: format!("`{name}` is already defined; ignoring `{subject}`"),
        }
    }

    pub fn multiple_constructors(class: &str, count: usize) -> Self {
        Self {
            subject: class.to_string(),
            kind: WarningKind::MultipleConstructors,
            message: format!(
                "class `{class}` has {count} constructors; only one initializer can be \
                 exposed, the last one overwrites all others"
            ),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Warnings recorded by one pass. Every warning is logged as it is recorded.
#[derive(Debug, Default)]
pub struct Warnings {
    items: Vec<Warning>,
}

impl Warnings {
    pub fn record(&mut self, warning: Warning) {
        warn!(subject = %warning.subject, kind = ?warning.kind, "{}", warning.message);
        self.items.push(warning);
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.items
    }
}
