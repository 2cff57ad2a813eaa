//! Type converters: how a value crosses the native/managed boundary.
//!
//! Input converters are selected by a windowed scan over a callable's
//! parameters: the array+length pattern spans two adjacent parameters, so
//! selection looks at the current parameter and the one after it, and the
//! scan advances by however many raw parameters the chosen converter
//! consumes.

use crate::error::{ConvertError, Site};
use crate::model::{ParamDef, SymbolTable};
use crate::text::{Import, Imports};
use crate::types::TypeDescriptor;

/// Integer and floating-point types passed through unchanged.
pub const PRIMITIVES: &[&str] = &[
    "short",
    "unsigned short",
    "int",
    "unsigned int",
    "long",
    "unsigned long",
    "long long",
    "unsigned long long",
    "size_t",
    "float",
    "double",
];

/// Types the binding compiler converts implicitly.
pub const AUTO_CONVERTIBLE: &[&str] = &["bool", "string"];

/// Typedef chains longer than this are treated as unresolvable.
const MAX_TYPEDEF_DEPTH: usize = 16;

/// Local holding the native result inside a generated wrapper.
pub const RESULT_VAR: &str = "_result";
/// Local holding the managed wrapper around a class result.
pub const RETURN_VAR: &str = "_ret";
/// Prefix of the locals holding array data pointers.
pub const ARRAY_VAR_PREFIX: &str = "_cpp_";

/// Parameter names that would shadow a module-level import or the receiver.
const RESERVED_PARAMS: &[&str] = &["self", "cpp", "np", "deref", RESULT_VAR, RETURN_VAR];

/// Whether a native parameter name collides with a name generated code
/// relies on.
pub fn is_reserved_param(name: &str) -> bool {
    RESERVED_PARAMS.contains(&name) || name.starts_with(ARRAY_VAR_PREFIX)
}

fn is_plain(ty: &TypeDescriptor) -> bool {
    !ty.is_pointer && ty.template_args.is_empty()
}

pub fn is_scalar(ty: &TypeDescriptor) -> bool {
    is_plain(ty) && PRIMITIVES.contains(&ty.base_name.as_str())
}

pub fn is_integral(ty: &TypeDescriptor) -> bool {
    is_scalar(ty) && !matches!(ty.base_name.as_str(), "float" | "double")
}

pub fn is_auto_convertible(ty: &TypeDescriptor) -> bool {
    is_plain(ty) && AUTO_CONVERTIBLE.contains(&ty.base_name.as_str())
}

/// Normalize a raw spelling and expand typedef aliases.
///
/// Qualifiers of the alias use are merged into the expansion; an alias of a
/// pointer used through a pointer ends up as a pointer-to-pointer, which no
/// converter accepts.
pub fn resolve(raw: &str, symbols: &SymbolTable) -> TypeDescriptor {
    let mut ty = TypeDescriptor::parse(raw);
    for _ in 0..MAX_TYPEDEF_DEPTH {
        if !ty.template_args.is_empty() {
            break;
        }
        let Some(underlying) = symbols.typedef(&ty.base_name) else {
            break;
        };
        let mut expanded = TypeDescriptor::parse(underlying);
        if ty.is_pointer && expanded.is_pointer {
            expanded.base_name = format!("{} *", expanded.base_name);
        }
        expanded.is_pointer |= ty.is_pointer;
        expanded.is_const |= ty.is_const;
        expanded.is_reference |= ty.is_reference;
        ty = expanded;
    }
    ty
}

/// Converter variant, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterKind {
    Scalar,
    AutoConvertible,
    ArrayPointer,
    OpaqueClass,
}

/// Conversion of one managed-side argument into native call arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputConverter {
    Scalar {
        name: String,
        ty: TypeDescriptor,
    },
    AutoConvertible {
        name: String,
        ty: TypeDescriptor,
    },
    /// Pointer-to-scalar followed by an integral count parameter.
    ArrayPointer {
        name: String,
        element: TypeDescriptor,
        /// Name of the consumed count parameter.
        length: String,
    },
    OpaqueClass {
        name: String,
        class: String,
        by_pointer: bool,
    },
}

impl InputConverter {
    pub fn kind(&self) -> ConverterKind {
        match self {
            InputConverter::Scalar { .. } => ConverterKind::Scalar,
            InputConverter::AutoConvertible { .. } => ConverterKind::AutoConvertible,
            InputConverter::ArrayPointer { .. } => ConverterKind::ArrayPointer,
            InputConverter::OpaqueClass { .. } => ConverterKind::OpaqueClass,
        }
    }

    /// Number of declared native parameters this converter consumes.
    pub fn raw_arity(&self) -> usize {
        match self {
            InputConverter::ArrayPointer { .. } => 2,
            _ => 1,
        }
    }

    /// Managed-side parameter name.
    pub fn name(&self) -> &str {
        match self {
            InputConverter::Scalar { name, .. }
            | InputConverter::AutoConvertible { name, .. }
            | InputConverter::ArrayPointer { name, .. }
            | InputConverter::OpaqueClass { name, .. } => name,
        }
    }

    /// Declaration in the managed-side signature.
    pub fn managed_decl(&self) -> String {
        match self {
            InputConverter::Scalar { name, ty } | InputConverter::AutoConvertible { name, ty } => {
                format!("{} {name}", ty.decl_spelling())
            }
            InputConverter::ArrayPointer { name, element, .. } => {
                format!(
                    "np.ndarray[{}, ndim=1, mode=\"c\"] {name}",
                    element.decl_spelling()
                )
            }
            InputConverter::OpaqueClass { name, class, .. } => format!("{class} {name}"),
        }
    }

    /// Statements that must run before the native call.
    ///
    /// An empty array is passed as `NULL`; indexing it would raise.
    pub fn conversions(&self) -> Vec<String> {
        match self {
            InputConverter::ArrayPointer { name, element, .. } => vec![format!(
                "cdef {} * {ARRAY_VAR_PREFIX}{name} = &{name}[0] if {name}.shape[0] else NULL",
                element.decl_spelling()
            )],
            _ => Vec::new(),
        }
    }

    /// Expressions passed to the native call, one per consumed parameter.
    pub fn call_args(&self) -> Vec<String> {
        match self {
            InputConverter::Scalar { name, .. } | InputConverter::AutoConvertible { name, .. } => {
                vec![name.clone()]
            }
            InputConverter::ArrayPointer { name, .. } => {
                vec![format!("{ARRAY_VAR_PREFIX}{name}"), format!("{name}.shape[0]")]
            }
            InputConverter::OpaqueClass {
                name, by_pointer, ..
            } => {
                if *by_pointer {
                    vec![format!("{name}.thisptr")]
                } else {
                    vec![format!("deref({name}.thisptr)")]
                }
            }
        }
    }

    pub fn add_imports(&self, imports: &mut Imports) {
        match self {
            InputConverter::Scalar { .. } => {}
            InputConverter::AutoConvertible { ty, .. } => imports.note_type(ty),
            InputConverter::ArrayPointer { .. } => imports.add(Import::Numpy),
            InputConverter::OpaqueClass { by_pointer, .. } => {
                if !by_pointer {
                    imports.add(Import::Deref);
                }
            }
        }
    }
}

/// Select the converter for `param`, looking ahead at `next` for the
/// array+length pattern.
pub fn select_input(
    param: &ParamDef,
    next: Option<&ParamDef>,
    symbols: &SymbolTable,
) -> Result<InputConverter, ConvertError> {
    if is_reserved_param(&param.name) {
        return Err(ConvertError::ReservedName {
            name: param.name.clone(),
        });
    }
    let ty = resolve(&param.ty, symbols);
    let name = param.name.clone();

    if is_scalar(&ty) {
        return Ok(InputConverter::Scalar { name, ty });
    }
    if is_auto_convertible(&ty) {
        return Ok(InputConverter::AutoConvertible { name, ty });
    }
    if ty.is_pointer && is_scalar(&ty.pointee()) {
        if let Some(next) = next
            && is_integral(&resolve(&next.ty, symbols))
        {
            return Ok(InputConverter::ArrayPointer {
                name,
                element: ty.pointee(),
                length: next.name.clone(),
            });
        }
        return Err(ConvertError::unsupported(&param.ty, Site::Argument(name)));
    }
    if ty.template_args.is_empty() && symbols.is_class(&ty.base_name) {
        return Ok(InputConverter::OpaqueClass {
            name,
            class: ty.base_name,
            by_pointer: ty.is_pointer,
        });
    }
    Err(ConvertError::unsupported(&param.ty, Site::Argument(name)))
}

/// Windowed scan over a parameter list.
///
/// The summed [`raw_arity`](InputConverter::raw_arity) of the result equals
/// `params.len()`.
pub fn convert_params(
    params: &[ParamDef],
    symbols: &SymbolTable,
) -> Result<Vec<InputConverter>, ConvertError> {
    let mut converters = Vec::new();
    let mut rest = params;
    while let Some((param, tail)) = rest.split_first() {
        let converter = select_input(param, tail.first(), symbols)?;
        rest = rest.get(converter.raw_arity()..).unwrap_or(&[]);
        converters.push(converter);
    }
    debug_assert_eq!(total_arity(&converters), params.len());
    Ok(converters)
}

pub fn total_arity(converters: &[InputConverter]) -> usize {
    converters.iter().map(InputConverter::raw_arity).sum()
}

/// Whether a returned class instance is copied or aliased.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The wrapper owns a heap copy and deletes it.
    Copy,
    /// The wrapper aliases native storage; ownership stays native.
    Reference,
}

/// Conversion of a native result into the managed return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputConverter {
    Void,
    Scalar(TypeDescriptor),
    AutoConvertible(TypeDescriptor),
    OpaqueClass {
        class: String,
        ownership: Ownership,
        by_pointer: bool,
    },
}

impl OutputConverter {
    pub fn kind(&self) -> Option<ConverterKind> {
        match self {
            OutputConverter::Void => None,
            OutputConverter::Scalar(_) => Some(ConverterKind::Scalar),
            OutputConverter::AutoConvertible(_) => Some(ConverterKind::AutoConvertible),
            OutputConverter::OpaqueClass { .. } => Some(ConverterKind::OpaqueClass),
        }
    }

    /// Declared type of the temporary the result is bound to; `None` for void.
    ///
    /// Class results always live behind a pointer: a stack value would need
    /// a nullary constructor the class may not declare.
    pub fn temp_decl(&self) -> Option<String> {
        match self {
            OutputConverter::Void => None,
            OutputConverter::Scalar(ty) | OutputConverter::AutoConvertible(ty) => {
                Some(ty.decl_spelling())
            }
            OutputConverter::OpaqueClass { class, .. } => Some(format!("cpp.{class} *")),
        }
    }

    /// Bind the native call to the result temporary (or leave it bare).
    pub fn bind(&self, call: &str) -> String {
        let Some(decl) = self.temp_decl() else {
            return call.to_string();
        };
        match self {
            OutputConverter::OpaqueClass {
                class,
                ownership: Ownership::Copy,
                ..
            } => format!("cdef {decl} {RESULT_VAR} = new cpp.{class}({call})"),
            OutputConverter::OpaqueClass {
                ownership: Ownership::Reference,
                by_pointer: false,
                ..
            } => format!("cdef {decl} {RESULT_VAR} = &{call}"),
            _ => format!("cdef {decl} {RESULT_VAR} = {call}"),
        }
    }

    /// Statements turning the temporary into the managed return value.
    pub fn return_statements(&self) -> Vec<String> {
        match self {
            OutputConverter::Void => Vec::new(),
            OutputConverter::Scalar(_) | OutputConverter::AutoConvertible(_) => {
                vec![format!("return {RESULT_VAR}")]
            }
            OutputConverter::OpaqueClass {
                class, ownership, ..
            } => {
                let mut out = vec![
                    format!("cdef {class} {RETURN_VAR} = {class}.__new__({class})"),
                    format!("{RETURN_VAR}.thisptr = {RESULT_VAR}"),
                ];
                if *ownership == Ownership::Reference {
                    out.push(format!("{RETURN_VAR}.delete_thisptr = False"));
                }
                out.push(format!("return {RETURN_VAR}"));
                out
            }
        }
    }

    pub fn add_imports(&self, imports: &mut Imports) {
        if let OutputConverter::AutoConvertible(ty) = self {
            imports.note_type(ty);
        }
    }
}

/// Select the converter for a result type.
///
/// `preferred` applies to class values; pointer results are always
/// references.
pub fn select_output(
    result_type: &str,
    preferred: Ownership,
    symbols: &SymbolTable,
) -> Result<OutputConverter, ConvertError> {
    let ty = resolve(result_type, symbols);
    if ty.is_void() {
        return Ok(OutputConverter::Void);
    }
    if is_scalar(&ty) {
        return Ok(OutputConverter::Scalar(ty));
    }
    if is_auto_convertible(&ty) {
        return Ok(OutputConverter::AutoConvertible(ty));
    }
    if ty.template_args.is_empty() && symbols.is_class(&ty.base_name) {
        let ownership = if ty.is_pointer {
            Ownership::Reference
        } else {
            preferred
        };
        return Ok(OutputConverter::OpaqueClass {
            class: ty.base_name,
            ownership,
            by_pointer: ty.is_pointer,
        });
    }
    Err(ConvertError::unsupported(result_type, Site::ReturnType))
}
