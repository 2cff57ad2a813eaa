//! Text helpers shared by both emission passes.

use std::collections::BTreeSet;

use crate::types::TypeDescriptor;

const INDENT: &str = "    ";
const HEADER_WIDTH: usize = 78;

/// Join lines with `\n`.
pub fn lines<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Indent every non-empty line of `block` by `level` steps.
pub fn indent_block(block: &str, level: usize) -> String {
    let prefix = INDENT.repeat(level);
    block
        .split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Boxed banner used at the top of generated files.
pub fn make_header(title: &str) -> String {
    let rule = format!("+{}+", "=".repeat(HEADER_WIDTH));
    let body = format!("| {title:<width$}|", width = HEADER_WIDTH - 1);
    lines(&[rule.as_str(), body.as_str(), rule.as_str()])
}

/// Same banner, commented out.
pub fn comment_header(title: &str) -> String {
    make_header(title)
        .split('\n')
        .map(|line| format!("# {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A Cython import a generated file depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Import {
    Bool,
    String,
    Vector,
    Map,
    Deref,
    Numpy,
}

impl Import {
    fn statement(self) -> &'static str {
        match self {
            Import::Bool => "from libcpp cimport bool",
            Import::String => "from libcpp.string cimport string",
            Import::Vector => "from libcpp.vector cimport vector",
            Import::Map => "from libcpp.map cimport map",
            Import::Deref => "from cython.operator cimport dereference as deref",
            Import::Numpy => "cimport numpy as np\nimport numpy as np",
        }
    }
}

/// Ordered set of imports accumulated while a pass runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Imports {
    set: BTreeSet<Import>,
}

impl Imports {
    pub fn add(&mut self, import: Import) {
        self.set.insert(import);
    }

    pub fn merge(&mut self, other: Imports) {
        self.set.extend(other.set);
    }

    /// Record the library types a declared type mentions.
    pub fn note_type(&mut self, ty: &TypeDescriptor) {
        match ty.base_name.as_str() {
            "bool" => self.add(Import::Bool),
            "string" => self.add(Import::String),
            "vector" => self.add(Import::Vector),
            "map" => self.add(Import::Map),
            _ => {}
        }
        for arg in &ty.template_args {
            self.note_type(arg);
        }
    }

    pub fn render(&self) -> String {
        self.set
            .iter()
            .map(|i| i.statement())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}
