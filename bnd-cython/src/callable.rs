//! Callable builders: free functions, methods, constructors and field
//! accessors, all assembled by the same algorithm.
//!
//! 1. derive the managed name (case conversion, then operator rename);
//! 2. pick the binding keyword (`def` for special methods, else `cpdef`);
//! 3. select one input converter per managed argument (windowed scan);
//! 4. emit signature, pre-call conversions, native call and return handling.
//!
//! Getters and setters are ordinary 0- and 1-argument callables; only their
//! native call expression differs.

use crate::convert::{self, InputConverter, OutputConverter, Ownership};
use crate::error::{ConvertError, Site};
use crate::model::{FieldDef, FunctionDef, ParamDef, SymbolTable};
use crate::naming::{self, NameRules};
use crate::text::{Imports, indent_block, lines};

/// What kind of native entity a callable wraps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallableKind {
    Function,
    Method { class: String },
    Constructor { class: String },
    Getter { class: String, field: String },
    Setter { class: String, field: String },
}

/// Input to the builder: a native callable viewed uniformly.
#[derive(Debug, Clone)]
pub struct Callable {
    pub kind: CallableKind,
    /// Native name before case conversion (`get_<field>` for accessors).
    pub native_name: String,
    pub params: Vec<ParamDef>,
    pub result_type: String,
}

impl Callable {
    pub fn function(f: &FunctionDef) -> Self {
        Self {
            kind: CallableKind::Function,
            native_name: f.name.clone(),
            params: f.params.clone(),
            result_type: f.result_type.clone(),
        }
    }

    pub fn method(class: &str, m: &FunctionDef) -> Self {
        Self {
            kind: CallableKind::Method {
                class: class.to_string(),
            },
            native_name: m.name.clone(),
            params: m.params.clone(),
            result_type: m.result_type.clone(),
        }
    }

    pub fn constructor(class: &str, ctor: &FunctionDef) -> Self {
        Self {
            kind: CallableKind::Constructor {
                class: class.to_string(),
            },
            native_name: "__init__".to_string(),
            params: ctor.params.clone(),
            result_type: String::new(),
        }
    }

    pub fn getter(field: &FieldDef) -> Self {
        Self {
            kind: CallableKind::Getter {
                class: field.owning_class.clone(),
                field: field.name.clone(),
            },
            native_name: format!("get_{}", field.name),
            params: Vec::new(),
            result_type: field.ty.clone(),
        }
    }

    pub fn setter(field: &FieldDef) -> Self {
        Self {
            kind: CallableKind::Setter {
                class: field.owning_class.clone(),
                field: field.name.clone(),
            },
            native_name: format!("set_{}", field.name),
            params: vec![ParamDef::new(&field.name, &field.ty)],
            result_type: "void".to_string(),
        }
    }

    fn class(&self) -> Option<&str> {
        match &self.kind {
            CallableKind::Function => None,
            CallableKind::Method { class }
            | CallableKind::Constructor { class }
            | CallableKind::Getter { class, .. }
            | CallableKind::Setter { class, .. } => Some(class.as_str()),
        }
    }

    /// Getters hand out references to the field; everything else copies.
    fn preferred_ownership(&self) -> Ownership {
        match self.kind {
            CallableKind::Getter { .. } => Ownership::Reference,
            _ => Ownership::Copy,
        }
    }
}

/// A built wrapper.
#[derive(Debug, Clone)]
pub struct CallableDef {
    /// Managed-side name, e.g. `squared_length` or `__call__`.
    pub name: String,
    /// `def` or `cpdef`.
    pub keyword: &'static str,
    pub inputs: Vec<InputConverter>,
    pub output: OutputConverter,
    pub text: String,
    pub imports: Imports,
}

/// Build the wrapper text for `callable`.
///
/// Fails with the first unsupported argument or result type; nothing is
/// emitted for a callable that fails.
pub fn build(
    callable: &Callable,
    symbols: &SymbolTable,
    rules: &NameRules,
) -> Result<CallableDef, ConvertError> {
    let name = rules.managed_name(&callable.native_name);
    let keyword = naming::binding_keyword(&name);

    let inputs = convert::convert_params(&callable.params, symbols)?;
    let output = convert::select_output(
        &callable.result_type,
        callable.preferred_ownership(),
        symbols,
    )?;

    let mut signature: Vec<String> = Vec::new();
    if let Some(class) = callable.class() {
        signature.push(format!("{class} self"));
    }
    signature.extend(inputs.iter().map(InputConverter::managed_decl));

    let mut body: Vec<String> = inputs.iter().flat_map(|i| i.conversions()).collect();
    let call_args: Vec<String> = inputs.iter().flat_map(|i| i.call_args()).collect();
    let call = native_call(callable, &call_args, rules)?;
    body.push(output.bind(&call));
    body.extend(output.return_statements());

    let mut imports = Imports::default();
    for input in &inputs {
        input.add_imports(&mut imports);
    }
    output.add_imports(&mut imports);

    let text = format!(
        "{keyword} {name}({}):\n{}",
        signature.join(", "),
        indent_block(&lines(&body), 1)
    );

    Ok(CallableDef {
        name,
        keyword,
        inputs,
        output,
        text,
        imports,
    })
}

fn native_call(
    callable: &Callable,
    call_args: &[String],
    rules: &NameRules,
) -> Result<String, ConvertError> {
    let args = call_args.join(", ");
    Ok(match &callable.kind {
        CallableKind::Function => format!("cpp.{}({args})", callable.native_name),
        CallableKind::Method { .. } => {
            format!(
                "self.thisptr.{}({args})",
                rules.call_alias(&callable.native_name)
            )
        }
        CallableKind::Constructor { class } => format!("self.thisptr = new cpp.{class}({args})"),
        CallableKind::Getter { field, .. } => format!("self.thisptr.{field}"),
        CallableKind::Setter { field, .. } => match call_args {
            [arg] => format!("self.thisptr.{field} = {arg}"),
            _ => {
                let ty = callable.params.first().map(|p| p.ty.as_str()).unwrap_or("");
                return Err(ConvertError::unsupported(ty, Site::Argument(field.clone())));
            }
        },
    })
}

/// Default initializer for a class that exposes no constructor.
pub fn default_constructor(class: &str) -> String {
    format!("def __init__({class} self):\n    self.thisptr = new cpp.{class}()")
}
