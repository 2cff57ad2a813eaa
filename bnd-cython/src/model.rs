//! Intermediate model types: the bridge between clang extraction and the
//! two emission passes.
//!
//! These types are clang-independent, so the passes can be tested on
//! hand-built entity trees. Type spellings are kept raw; they are normalized
//! on demand through [`TypeDescriptor`](crate::types::TypeDescriptor).

use std::collections::{HashMap, HashSet};

/// Everything extracted from one input file.
#[derive(Debug, Clone, Default)]
pub struct Unit {
    /// Header path as written into `cdef extern from` lines.
    pub header: String,
    /// Declarations in source order.
    pub items: Vec<Item>,
}

/// A top-level declaration.
#[derive(Debug, Clone)]
pub enum Item {
    Class(ClassDef),
    Function(FunctionDef),
    Enum(EnumDef),
    Typedef(TypedefDef),
}

/// A C++ class or struct.
#[derive(Debug, Clone, Default)]
pub struct ClassDef {
    pub name: String,
    pub namespace: Vec<String>,
    pub fields: Vec<FieldDef>,
    pub constructors: Vec<FunctionDef>,
    pub methods: Vec<FunctionDef>,
}

impl ClassDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// A public data member.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: String,
    pub owning_class: String,
}

impl FieldDef {
    pub fn new(owning_class: &str, name: &str, ty: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.to_string(),
            owning_class: owning_class.to_string(),
        }
    }
}

/// A free function, method or constructor.
///
/// Constructors carry the class name as `name` and an empty result type.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub name: String,
    pub owning_class: Option<String>,
    pub namespace: Vec<String>,
    pub params: Vec<ParamDef>,
    pub result_type: String,
}

impl FunctionDef {
    pub fn free(name: &str, params: Vec<ParamDef>, result_type: &str) -> Self {
        Self {
            name: name.to_string(),
            owning_class: None,
            namespace: Vec::new(),
            params,
            result_type: result_type.to_string(),
        }
    }

    pub fn method(class: &str, name: &str, params: Vec<ParamDef>, result_type: &str) -> Self {
        Self {
            name: name.to_string(),
            owning_class: Some(class.to_string()),
            namespace: Vec::new(),
            params,
            result_type: result_type.to_string(),
        }
    }

    pub fn constructor(class: &str, params: Vec<ParamDef>) -> Self {
        Self {
            name: class.to_string(),
            owning_class: Some(class.to_string()),
            namespace: Vec::new(),
            params,
            result_type: String::new(),
        }
    }
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDef {
    pub name: String,
    pub ty: String,
}

impl ParamDef {
    pub fn new(name: &str, ty: &str) -> Self {
        Self {
            name: name.to_string(),
            ty: ty.to_string(),
        }
    }
}

/// A C++ enum.
#[derive(Debug, Clone, Default)]
pub struct EnumDef {
    pub name: String,
    pub namespace: Vec<String>,
    pub values: Vec<EnumValue>,
}

/// A single enumerator.
#[derive(Debug, Clone)]
pub struct EnumValue {
    pub name: String,
    pub value: i64,
}

/// A `typedef` or `using` alias.
#[derive(Debug, Clone, Default)]
pub struct TypedefDef {
    pub alias: String,
    pub underlying_type: String,
    pub namespace: Vec<String>,
}

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    /// File name, e.g. `_declarations.pxd`.
    pub name: String,
    pub content: String,
}

/// Global symbol table: recognized class names and typedef expansions.
///
/// Built once from every unit before either pass runs, then read-only.
#[derive(Debug, Default)]
pub struct SymbolTable {
    classes: HashSet<String>,
    typedefs: HashMap<String, String>,
}

impl SymbolTable {
    pub fn build(units: &[Unit]) -> Self {
        let mut table = Self::default();
        for unit in units {
            for item in &unit.items {
                match item {
                    Item::Class(c) => table.register_class(&c.name),
                    Item::Typedef(td) => table.register_typedef(&td.alias, &td.underlying_type),
                    Item::Function(_) | Item::Enum(_) => {}
                }
            }
        }
        table
    }

    pub fn register_class(&mut self, name: &str) {
        self.classes.insert(name.to_string());
    }

    /// First definition of an alias wins.
    pub fn register_typedef(&mut self, alias: &str, underlying: &str) {
        self.typedefs
            .entry(alias.to_string())
            .or_insert_with(|| underlying.to_string());
    }

    pub fn is_class(&self, name: &str) -> bool {
        self.classes.contains(name)
    }

    pub fn typedef(&self, alias: &str) -> Option<&str> {
        self.typedefs.get(alias).map(String::as_str)
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn typedef_count(&self) -> usize {
        self.typedefs.len()
    }
}

