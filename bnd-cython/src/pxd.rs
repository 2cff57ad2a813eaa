//! Declaration pass: entity tree → `_declarations.pxd`.
//!
//! Shape only: every member is declared with its normalized type, whether or
//! not the implementation pass can convert it.

use tracing::debug;

use crate::model::{
    ClassDef, EnumDef, FunctionDef, GeneratedArtifact, Item, ParamDef, TypedefDef, Unit,
};
use crate::naming::NameRules;
use crate::outline::Outline;
use crate::text::{Imports, comment_header, indent_block, lines};
use crate::types::TypeDescriptor;

/// Module name the implementation artifact cimports the declarations as.
pub const DECLARATIONS_MODULE: &str = "_declarations";

/// Result of the declaration pass.
#[derive(Debug)]
pub struct DeclarationOutput {
    pub artifact: GeneratedArtifact,
    pub outline: Outline,
}

/// Per-class accumulators, owned by a single class fold.
#[derive(Debug, Default)]
struct ClassBuffers {
    fields: Vec<String>,
    ctors: Vec<String>,
    methods: Vec<String>,
}

impl ClassBuffers {
    fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.ctors.is_empty() && self.methods.is_empty()
    }
}

/// Pass-wide state: imports and the structural outline.
struct DeclarationPass<'a> {
    rules: &'a NameRules,
    imports: Imports,
    outline: Outline,
}

/// Run the declaration pass over every unit, in order.
pub fn emit_declarations(units: &[Unit], rules: &NameRules) -> DeclarationOutput {
    let mut pass = DeclarationPass {
        rules,
        imports: Imports::default(),
        outline: Outline::default(),
    };

    let mut blocks = Vec::new();
    for unit in units {
        for item in &unit.items {
            blocks.push(pass.item(&unit.header, item));
        }
    }

    let mut content = comment_header("Declarations generated by bnd-cython. Do not edit.");
    content.push('\n');
    if !pass.imports.is_empty() {
        content.push_str(&pass.imports.render());
        content.push('\n');
    }
    for block in &blocks {
        content.push('\n');
        content.push_str(block);
        content.push('\n');
    }

    debug!(blocks = blocks.len(), "declaration pass complete");
    DeclarationOutput {
        artifact: GeneratedArtifact {
            name: format!("{DECLARATIONS_MODULE}.pxd"),
            content,
        },
        outline: pass.outline,
    }
}

impl DeclarationPass<'_> {
    fn item(&mut self, header: &str, item: &Item) -> String {
        match item {
            Item::Class(c) => self.class(header, c),
            Item::Function(f) => self.function(header, f),
            Item::Enum(e) => enum_decl(header, e),
            Item::Typedef(td) => self.typedef(header, td),
        }
    }

    fn class(&mut self, header: &str, class: &ClassDef) -> String {
        self.outline.add_class(&class.name);
        let mut buffers = ClassBuffers::default();

        for field in &class.fields {
            let ty = self.declare_type(&field.ty);
            buffers.fields.push(format!("{ty} {}", field.name));
            self.outline.add_member(&class.name, &field.name);
        }
        for ctor in &class.constructors {
            let args = self.params(&ctor.params);
            buffers.ctors.push(format!("{}({args})", class.name));
            self.outline.add_member(&class.name, &class.name);
        }
        for method in &class.methods {
            let result = self.declare_type(&method.result_type);
            let args = self.params(&method.params);
            let name = self.rules.declared_name(&method.name);
            buffers.methods.push(format!("{result} {name}({args})"));
            self.outline.add_member(&class.name, &method.name);
        }

        let body = if buffers.is_empty() {
            "pass".to_string()
        } else {
            let ClassBuffers {
                fields,
                ctors,
                methods,
            } = buffers;
            lines(&[fields, ctors, methods].concat())
        };

        debug!(class = %class.name, "declared class");
        lines(&[
            extern_block_header(header, &class.namespace),
            indent_block(&format!("cdef cppclass {}:", class.name), 1),
            indent_block(&body, 2),
        ])
    }

    fn function(&mut self, header: &str, function: &FunctionDef) -> String {
        let result = self.declare_type(&function.result_type);
        let args = self.params(&function.params);
        lines(&[
            extern_block_header(header, &function.namespace),
            indent_block(&format!("{result} {}({args})", function.name), 1),
        ])
    }

    fn typedef(&mut self, header: &str, td: &TypedefDef) -> String {
        let underlying = self.declare_type(&td.underlying_type);
        lines(&[
            extern_block_header(header, &td.namespace),
            indent_block(&format!("ctypedef {underlying} {}", td.alias), 1),
        ])
    }

    fn params(&mut self, params: &[ParamDef]) -> String {
        params
            .iter()
            .map(|p| format!("{} {}", self.declare_type(&p.ty), p.name))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Normalized spelling of a declared type; void stays `void`.
    fn declare_type(&mut self, raw: &str) -> String {
        let ty = TypeDescriptor::parse(raw);
        if ty.is_void() {
            return "void".to_string();
        }
        self.imports.note_type(&ty);
        ty.decl_spelling()
    }
}

fn enum_decl(header: &str, en: &EnumDef) -> String {
    let body = if en.values.is_empty() {
        "pass".to_string()
    } else {
        lines(
            &en.values
                .iter()
                .map(|v| format!("{} = {}", v.name, v.value))
                .collect::<Vec<_>>(),
        )
    };
    lines(&[
        extern_block_header(header, &en.namespace),
        indent_block(&format!("cdef enum {}:", en.name), 1),
        indent_block(&body, 2),
    ])
}

/// `cdef extern from` line, with a namespace clause when there is one.
fn extern_block_header(header: &str, namespace: &[String]) -> String {
    if namespace.is_empty() {
        format!("cdef extern from \"{header}\":")
    } else {
        format!(
            "cdef extern from \"{header}\" namespace \"{}\":",
            namespace.join("::")
        )
    }
}
