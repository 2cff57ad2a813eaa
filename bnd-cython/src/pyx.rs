//! Implementation pass: entity tree → `<module>.pyx`.
//!
//! Walks the same tree as the declaration pass, in the same order, and wraps
//! every callable it can convert. A callable with an unsupported argument or
//! result type is dropped with a warning; a field is dropped as a whole when
//! either accessor fails. A wrapper whose managed name is already taken in
//! its scope is dropped the same way; the first definition wins.

use std::collections::HashSet;

use tracing::debug;

use crate::callable::{self, Callable, CallableDef};
use crate::error::{ConvertError, Warning, Warnings};
use crate::model::{
    ClassDef, EnumDef, FieldDef, FunctionDef, GeneratedArtifact, Item, SymbolTable, Unit,
};
use crate::naming::{NameRules, from_camel_case};
use crate::outline::Outline;
use crate::pxd::DECLARATIONS_MODULE;
use crate::text::{Import, Imports, comment_header, indent_block, lines};

/// Module-level names bound by the generated imports.
const MODULE_RESERVED: &[&str] = &["cpp", "np", "deref", "bool", "string", "vector", "map"];

/// Names every wrapper class defines before its members.
const CLASS_RESERVED: &[&str] = &[
    "thisptr",
    "delete_thisptr",
    "__cinit__",
    "__dealloc__",
    "__init__",
];

/// Result of the implementation pass.
#[derive(Debug)]
pub struct ImplementationOutput {
    pub artifact: GeneratedArtifact,
    pub outline: Outline,
    pub warnings: Vec<Warning>,
}

/// Per-class accumulators, owned by a single class fold.
#[derive(Debug)]
struct ClassBuffers {
    ctor: Option<String>,
    methods: Vec<String>,
    fields: Vec<String>,
    /// Managed names defined in the class body so far.
    taken: HashSet<String>,
}

impl ClassBuffers {
    fn new() -> Self {
        Self {
            ctor: None,
            methods: Vec::new(),
            fields: Vec::new(),
            taken: CLASS_RESERVED.iter().map(|n| n.to_string()).collect(),
        }
    }

    /// Claim all of `names`, or none of them. Returns the first taken name.
    fn claim(&mut self, names: &[&str]) -> Result<(), String> {
        if let Some(taken) = names.iter().find(|n| self.taken.contains(**n)) {
            return Err(taken.to_string());
        }
        self.taken.extend(names.iter().map(|n| n.to_string()));
        Ok(())
    }
}

struct ImplementationPass<'a> {
    symbols: &'a SymbolTable,
    rules: &'a NameRules,
    imports: Imports,
    outline: Outline,
    warnings: Warnings,
    /// Module-level names: imports, classes, enums and emitted functions.
    module_names: HashSet<String>,
}

/// Run the implementation pass over every unit, in order.
pub fn emit_implementation(
    module: &str,
    units: &[Unit],
    symbols: &SymbolTable,
    rules: &NameRules,
) -> ImplementationOutput {
    let mut module_names: HashSet<String> =
        MODULE_RESERVED.iter().map(|n| n.to_string()).collect();
    for item in units.iter().flat_map(|u| &u.items) {
        match item {
            Item::Class(c) => module_names.insert(c.name.clone()),
            Item::Enum(e) => module_names.insert(e.name.clone()),
            Item::Function(_) | Item::Typedef(_) => false,
        };
    }

    let mut pass = ImplementationPass {
        symbols,
        rules,
        imports: Imports::default(),
        outline: Outline::default(),
        warnings: Warnings::default(),
        module_names,
    };

    let mut blocks = Vec::new();
    for unit in units {
        for item in &unit.items {
            if let Some(block) = pass.item(item) {
                blocks.push(block);
            }
        }
    }

    let mut content = comment_header(&format!(
        "Module `{module}` generated by bnd-cython. Do not edit."
    ));
    content.push('\n');
    content.push_str(&format!("cimport {DECLARATIONS_MODULE} as cpp\n"));
    if !pass.imports.is_empty() {
        content.push_str(&pass.imports.render());
        content.push('\n');
    }
    for block in &blocks {
        content.push_str("\n\n");
        content.push_str(block);
        content.push('\n');
    }

    debug!(module = %module, blocks = blocks.len(), "implementation pass complete");
    ImplementationOutput {
        artifact: GeneratedArtifact {
            name: format!("{module}.pyx"),
            content,
        },
        outline: pass.outline,
        warnings: pass.warnings.into_vec(),
    }
}

impl ImplementationPass<'_> {
    fn item(&mut self, item: &Item) -> Option<String> {
        match item {
            Item::Class(c) => Some(self.class(c)),
            Item::Function(f) => self.function(f),
            Item::Enum(e) => Some(enum_def(e)),
            Item::Typedef(_) => None,
        }
    }

    /// Build a wrapper; imports are merged by the caller once it is kept.
    fn build(&mut self, subject: &str, callable: &Callable) -> Option<CallableDef> {
        match callable::build(callable, self.symbols, self.rules) {
            Ok(def) => Some(def),
            Err(e) => {
                self.skip(subject, &e);
                None
            }
        }
    }

    fn skip(&mut self, subject: &str, err: &ConvertError) {
        self.warnings.record(Warning::skipped(subject, err));
    }

    fn function(&mut self, function: &FunctionDef) -> Option<String> {
        let subject = if function.namespace.is_empty() {
            function.name.clone()
        } else {
            format!("{}::{}", function.namespace.join("::"), function.name)
        };
        let def = self.build(&subject, &Callable::function(function))?;
        if !self.module_names.insert(def.name.clone()) {
            self.warnings
                .record(Warning::name_clash(&subject, &def.name));
            return None;
        }
        self.imports.merge(def.imports);
        Some(def.text)
    }

    fn class(&mut self, class: &ClassDef) -> String {
        self.outline.add_class(&class.name);
        self.imports.add(Import::Bool);
        let mut buffers = ClassBuffers::new();

        buffers.ctor = self.constructor(class);

        for method in &class.methods {
            let subject = format!("{}::{}", class.name, method.name);
            let Some(def) = self.build(&subject, &Callable::method(&class.name, method)) else {
                continue;
            };
            if let Err(name) = buffers.claim(&[def.name.as_str()]) {
                self.warnings.record(Warning::name_clash(&subject, &name));
                continue;
            }
            self.imports.merge(def.imports);
            buffers.methods.push(def.text);
            self.outline.add_member(&class.name, &method.name);
        }

        for field in &class.fields {
            self.field(class, field, &mut buffers);
        }

        debug!(
            class = %class.name,
            fields = buffers.fields.len(),
            methods = buffers.methods.len(),
            "wrapped class"
        );

        let mut members = vec![lifecycle(&class.name)];
        members.extend(buffers.ctor);
        members.extend(buffers.methods);
        members.extend(buffers.fields);
        format!(
            "cdef class {}:\n{}",
            class.name,
            indent_block(&members.join("\n\n"), 1)
        )
    }

    /// `__init__` from the last declared constructor. A default is
    /// synthesized only for a class that declares none; if the last
    /// declared one cannot be converted there is no initializer at all.
    fn constructor(&mut self, class: &ClassDef) -> Option<String> {
        let Some(last) = class.constructors.last() else {
            return Some(callable::default_constructor(&class.name));
        };
        let count = class.constructors.len();
        if count > 1 {
            self.warnings
                .record(Warning::multiple_constructors(&class.name, count));
        }
        let subject = format!("{}::{}", class.name, class.name);
        let def = self.build(&subject, &Callable::constructor(&class.name, last))?;
        self.imports.merge(def.imports);
        self.outline.add_member(&class.name, &class.name);
        Some(def.text)
    }

    /// Getter, setter and property for one field, or nothing.
    fn field(&mut self, class: &ClassDef, field: &FieldDef, buffers: &mut ClassBuffers) {
        let subject = format!("{}::{}", class.name, field.name);
        let accessors = callable::build(&Callable::getter(field), self.symbols, self.rules)
            .and_then(|getter| {
                callable::build(&Callable::setter(field), self.symbols, self.rules)
                    .map(|setter| (getter, setter))
            });
        let (getter, setter) = match accessors {
            Ok(pair) => pair,
            Err(e) => return self.skip(&subject, &e),
        };

        let property = from_camel_case(&field.name);
        let names = [getter.name.as_str(), setter.name.as_str(), property.as_str()];
        if let Err(name) = buffers.claim(&names) {
            self.warnings.record(Warning::name_clash(&subject, &name));
            return;
        }
        self.imports.merge(getter.imports);
        self.imports.merge(setter.imports);
        let binding = format!("{property} = property({}, {})", getter.name, setter.name);
        buffers
            .fields
            .push(lines(&[getter.text, setter.text, binding]));
        self.outline.add_member(&class.name, &field.name);
    }
}

/// Owned pointer plus allocation/deallocation hooks.
fn lifecycle(class: &str) -> String {
    lines(&[
        format!("cdef cpp.{class} * thisptr"),
        "cdef bool delete_thisptr".to_string(),
        String::new(),
        "def __cinit__(self):".to_string(),
        "    self.thisptr = NULL".to_string(),
        "    self.delete_thisptr = True".to_string(),
        String::new(),
        "def __dealloc__(self):".to_string(),
        "    if self.delete_thisptr and self.thisptr != NULL:".to_string(),
        "        del self.thisptr".to_string(),
    ])
}

/// Enumerators re-exported as class attributes.
fn enum_def(en: &EnumDef) -> String {
    let body = if en.values.is_empty() {
        "pass".to_string()
    } else {
        lines(
            &en.values
                .iter()
                .map(|v| format!("{} = cpp.{}", v.name, v.name))
                .collect::<Vec<_>>(),
        )
    };
    format!("class {}:\n{}", en.name, indent_block(&body, 1))
}
