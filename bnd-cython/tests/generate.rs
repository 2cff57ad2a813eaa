//! Both emission passes over a hand-built entity tree (no libclang needed).

use std::sync::LazyLock;

use bnd_cython::Generated;
use bnd_cython::callable::{self, Callable};
use bnd_cython::convert;
use bnd_cython::error::WarningKind;
use bnd_cython::model::{
    ClassDef, EnumDef, EnumValue, FieldDef, FunctionDef, Item, ParamDef, SymbolTable, TypedefDef,
    Unit,
};
use bnd_cython::naming::NameRules;

fn ns() -> Vec<String> {
    vec!["geo".to_string()]
}

fn p(name: &str, ty: &str) -> ParamDef {
    ParamDef::new(name, ty)
}

fn geometry() -> Unit {
    let vector = ClassDef {
        name: "Vector3".to_string(),
        namespace: ns(),
        fields: vec![
            FieldDef::new("Vector3", "x", "double"),
            FieldDef::new("Vector3", "y", "double"),
            FieldDef::new("Vector3", "z", "double"),
        ],
        constructors: vec![FunctionDef::constructor(
            "Vector3",
            vec![p("x", "double"), p("y", "double"), p("z", "double")],
        )],
        methods: vec![
            FunctionDef::method("Vector3", "length", vec![], "double"),
            FunctionDef::method("Vector3", "squaredLength", vec![], "double"),
            FunctionDef::method(
                "Vector3",
                "dot",
                vec![p("other", "const geo::Vector3 &")],
                "double",
            ),
            FunctionDef::method("Vector3", "scaled", vec![p("factor", "real")], "geo::Vector3"),
            FunctionDef::method(
                "Vector3",
                "operator+",
                vec![p("other", "const geo::Vector3 &")],
                "geo::Vector3",
            ),
            FunctionDef::method("Vector3", "operator()", vec![p("i", "int")], "double"),
            FunctionDef::method("Vector3", "toList", vec![], "std::vector<double>"),
            FunctionDef::method(
                "Vector3",
                "setFromArray",
                vec![p("values", "const double *"), p("n", "int")],
                "void",
            ),
        ],
    };

    let particle = ClassDef {
        name: "Particle".to_string(),
        namespace: ns(),
        fields: vec![
            FieldDef::new("Particle", "position", "geo::Vector3"),
            FieldDef::new("Particle", "mass", "double"),
            FieldDef::new("Particle", "label", "std::string"),
            FieldDef::new("Particle", "tags", "std::vector<std::string>"),
        ],
        constructors: vec![
            FunctionDef::constructor("Particle", vec![]),
            FunctionDef::constructor("Particle", vec![p("mass", "double")]),
        ],
        methods: vec![],
    };

    let empty = ClassDef {
        name: "Empty".to_string(),
        namespace: ns(),
        ..Default::default()
    };

    let axis = EnumDef {
        name: "Axis".to_string(),
        namespace: ns(),
        values: ["X", "Y", "Z"]
            .iter()
            .enumerate()
            .map(|(i, v)| EnumValue {
                name: v.to_string(),
                value: i as i64,
            })
            .collect(),
    };

    let real = TypedefDef {
        alias: "real".to_string(),
        underlying_type: "double".to_string(),
        namespace: ns(),
    };

    let dot_product = FunctionDef {
        namespace: ns(),
        ..FunctionDef::free(
            "dotProduct",
            vec![
                p("a", "const double *"),
                p("n", "int"),
                p("b", "const double *"),
                p("m", "int"),
            ],
            "double",
        )
    };
    let histogram = FunctionDef {
        namespace: ns(),
        ..FunctionDef::free("histogram", vec![], "std::map<int, int>")
    };
    let origin = FunctionDef::free("origin", vec![], "geo::Vector3 *");

    Unit {
        header: "geometry.hpp".to_string(),
        items: vec![
            Item::Typedef(real),
            Item::Class(vector),
            Item::Class(particle),
            Item::Class(empty),
            Item::Enum(axis),
            Item::Function(dot_product),
            Item::Function(histogram),
            Item::Function(origin),
        ],
    }
}

static GENERATED: LazyLock<Generated> = LazyLock::new(|| {
    bnd_cython::generate_from_units("geometry", &[geometry()], &NameRules::default())
        .expect("generation failed")
});

fn pxd() -> &'static str {
    &GENERATED.declaration.content
}

fn pyx() -> &'static str {
    &GENERATED.implementation.content
}

/// Top-level block of the implementation that starts with `head`.
fn pyx_block(head: &str) -> &'static str {
    pyx()
        .split("\n\n\n")
        .map(str::trim)
        .find(|b| b.starts_with(head))
        .unwrap_or_else(|| panic!("no block starting with {head:?} in:\n{}", pyx()))
}

/// Top-level block of the declarations containing `needle`.
fn pxd_block(needle: &str) -> &'static str {
    pxd()
        .split("\n\n")
        .find(|b| b.contains(needle))
        .unwrap_or_else(|| panic!("no block containing {needle:?} in:\n{}", pxd()))
}

// ---------------------------------------------------------------------------
// Artifacts
// ---------------------------------------------------------------------------

#[test]
fn artifact_names() {
    assert_eq!(GENERATED.declaration.name, "_declarations.pxd");
    assert_eq!(GENERATED.implementation.name, "geometry.pyx");
}

#[test]
fn implementation_cimports_declarations() {
    let first_code_line = pyx()
        .lines()
        .find(|l| !l.starts_with('#') && !l.is_empty())
        .unwrap();
    assert_eq!(first_code_line, "cimport _declarations as cpp");
    assert!(pyx().contains("cimport numpy as np"));
    assert!(pyx().contains("from cython.operator cimport dereference as deref"));
    assert!(pyx().contains("from libcpp cimport bool"));
}

#[test]
fn generation_is_deterministic() {
    let again =
        bnd_cython::generate_from_units("geometry", &[geometry()], &NameRules::default()).unwrap();
    assert_eq!(again.declaration, GENERATED.declaration);
    assert_eq!(again.implementation, GENERATED.implementation);
    assert_eq!(again.warnings, GENERATED.warnings);
}

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

#[test]
fn declarations_use_namespaced_extern_blocks() {
    let block = pxd_block("cdef cppclass Vector3:");
    assert!(
        block.starts_with("cdef extern from \"geometry.hpp\" namespace \"geo\":"),
        "{block}"
    );
    assert!(block.contains("        double x\n"));
    assert!(block.contains("        Vector3(double x, double y, double z)\n"));
    assert!(block.contains("        double squaredLength()\n"));
    assert!(block.contains("        double dot(Vector3 other)\n"));
}

#[test]
fn declarations_keep_unconvertible_members() {
    let vector = pxd_block("cdef cppclass Vector3:");
    assert!(vector.contains("vector[double] toList()"));
    assert!(vector.contains("void setFromArray(double * values, int n)"));

    let particle = pxd_block("cdef cppclass Particle:");
    assert!(particle.contains("vector[std::string] tags"));
    assert!(particle.contains("Particle()"));
    assert!(particle.contains("Particle(double mass)"));

    assert!(pxd().contains("map[int, int] histogram()"));
    assert!(pxd().contains("from libcpp.map cimport map"));
    assert!(pxd().contains("from libcpp.vector cimport vector"));
    assert!(pxd().contains("from libcpp.string cimport string"));
}

#[test]
fn operators_are_declared_under_aliases() {
    let vector = pxd_block("cdef cppclass Vector3:");
    assert!(vector.contains("Vector3 add \"operator+\"(Vector3 other)"));
    assert!(vector.contains("double call \"operator()\"(int i)"));
}

#[test]
fn empty_class_declares_pass() {
    let block = pxd_block("cdef cppclass Empty:");
    assert!(block.ends_with("    cdef cppclass Empty:\n        pass"), "{block}");
}

#[test]
fn enums_and_typedefs_are_declared() {
    assert!(
        pxd_block("cdef enum Axis:")
            .contains("    cdef enum Axis:\n        X = 0\n        Y = 1\n        Z = 2")
    );
    assert!(pxd().contains("    ctypedef double real"));
}

// ---------------------------------------------------------------------------
// Implementation
// ---------------------------------------------------------------------------

#[test]
fn wrapper_owns_the_native_pointer() {
    let block = pyx_block("cdef class Vector3:");
    assert!(block.contains("    cdef cpp.Vector3 * thisptr"));
    assert!(block.contains("    cdef bool delete_thisptr"));
    assert!(block.contains("    def __cinit__(self):"));
    assert!(block.contains("    def __dealloc__(self):"));
    assert!(block.contains("            del self.thisptr"));
}

#[test]
fn constructor_forwards_arguments() {
    let block = pyx_block("cdef class Vector3:");
    assert!(block.contains(
        "    def __init__(Vector3 self, double x, double y, double z):\n        \
         self.thisptr = new cpp.Vector3(x, y, z)"
    ));
}

#[test]
fn missing_constructor_is_synthesized() {
    let block = pyx_block("cdef class Empty:");
    assert_eq!(block.matches("def __init__(").count(), 1);
    assert!(block.contains(
        "    def __init__(Empty self):\n        self.thisptr = new cpp.Empty()"
    ));
}

#[test]
fn last_constructor_wins() {
    let block = pyx_block("cdef class Particle:");
    assert_eq!(block.matches("def __init__(").count(), 1);
    assert!(block.contains("def __init__(Particle self, double mass):"));

    let conflicts: Vec<_> = GENERATED
        .warnings
        .iter()
        .filter(|w| w.kind == WarningKind::MultipleConstructors)
        .collect();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].subject, "Particle");
}

#[test]
fn fields_become_properties() {
    let block = pyx_block("cdef class Vector3:");
    assert!(block.contains(
        "    cpdef get_x(Vector3 self):\n        \
         cdef double _result = self.thisptr.x\n        \
         return _result"
    ));
    assert!(block.contains("    cpdef set_x(Vector3 self, double x):\n        self.thisptr.x = x"));
    assert!(block.contains("    x = property(get_x, set_x)"));
}

#[test]
fn class_field_getter_aliases_native_storage() {
    let block = pyx_block("cdef class Particle:");
    assert!(block.contains("cdef cpp.Vector3 * _result = &self.thisptr.position"));
    assert!(block.contains("_ret.delete_thisptr = False"));
    assert!(block.contains("cpdef set_position(Particle self, Vector3 position):"));
    assert!(block.contains("self.thisptr.position = deref(position.thisptr)"));
    assert!(block.contains("cdef string _result = self.thisptr.label"));
}

#[test]
fn unconvertible_field_is_dropped_whole() {
    let block = pyx_block("cdef class Particle:");
    assert!(!block.contains("get_tags"));
    assert!(!block.contains("set_tags"));
    assert!(!block.contains("tags = property"));
    assert!(block.contains("mass = property(get_mass, set_mass)"));
}

#[test]
fn methods_use_snake_case_and_cpdef() {
    let block = pyx_block("cdef class Vector3:");
    assert!(block.contains(
        "    cpdef squared_length(Vector3 self):\n        \
         cdef double _result = self.thisptr.squaredLength()\n        \
         return _result"
    ));
    assert!(block.contains("cdef double _result = self.thisptr.dot(deref(other.thisptr))"));
}

#[test]
fn class_results_are_copied() {
    let block = pyx_block("cdef class Vector3:");
    assert!(block.contains(
        "    cpdef scaled(Vector3 self, double factor):\n        \
         cdef cpp.Vector3 * _result = new cpp.Vector3(self.thisptr.scaled(factor))\n        \
         cdef Vector3 _ret = Vector3.__new__(Vector3)\n        \
         _ret.thisptr = _result\n        \
         return _ret"
    ));
}

#[test]
fn operators_map_to_special_methods() {
    let block = pyx_block("cdef class Vector3:");
    assert!(block.contains("    def __add__(Vector3 self, Vector3 other):"));
    assert!(block.contains("cdef cpp.Vector3 * _result = new cpp.Vector3(self.thisptr.add(deref(other.thisptr)))"));
    assert!(block.contains("    def __call__(Vector3 self, int i):"));
    assert!(block.contains("cdef double _result = self.thisptr.call(i)"));
}

#[test]
fn array_arguments_take_numpy_arrays() {
    let block = pyx_block("cdef class Vector3:");
    assert!(block.contains(
        "    cpdef set_from_array(Vector3 self, np.ndarray[double, ndim=1, mode=\"c\"] values):\n        \
         cdef double * _cpp_values = &values[0] if values.shape[0] else NULL\n        \
         self.thisptr.setFromArray(_cpp_values, values.shape[0])"
    ));

    let function = pyx_block("cpdef dot_product(");
    assert!(function.starts_with(
        "cpdef dot_product(np.ndarray[double, ndim=1, mode=\"c\"] a, \
         np.ndarray[double, ndim=1, mode=\"c\"] b):"
    ));
    assert!(function.contains("cdef double _result = cpp.dotProduct(_cpp_a, a.shape[0], _cpp_b, b.shape[0])"));
}

#[test]
fn pointer_results_are_not_owned() {
    let function = pyx_block("cpdef origin(");
    assert!(function.contains("cdef cpp.Vector3 * _result = cpp.origin()"));
    assert!(function.contains("_ret.delete_thisptr = False"));
}

#[test]
fn unconvertible_callables_are_dropped_with_warnings() {
    assert!(!pyx().contains("to_list"));
    assert!(!pyx().contains("histogram"));

    let unsupported: Vec<&str> = GENERATED
        .warnings
        .iter()
        .filter(|w| w.kind == WarningKind::UnsupportedType)
        .map(|w| w.subject.as_str())
        .collect();
    assert_eq!(
        unsupported,
        vec!["Vector3::toList", "Particle::tags", "geo::histogram"]
    );

    let to_list = GENERATED
        .warnings
        .iter()
        .find(|w| w.subject == "Vector3::toList")
        .unwrap();
    assert!(to_list.message.contains("std::vector<double>"), "{}", to_list.message);
}

#[test]
fn enums_are_reexported() {
    let block = pyx_block("class Axis:");
    assert_eq!(block, "class Axis:\n    X = cpp.X\n    Y = cpp.Y\n    Z = cpp.Z");
}

#[test]
fn every_wrapped_class_is_declared() {
    let declared: Vec<&str> = pxd()
        .lines()
        .filter_map(|l| l.trim().strip_prefix("cdef cppclass "))
        .map(|l| l.trim_end_matches(':'))
        .collect();
    let wrapped: Vec<&str> = pyx()
        .lines()
        .filter_map(|l| l.strip_prefix("cdef class "))
        .map(|l| l.trim_end_matches(':'))
        .collect();
    assert_eq!(wrapped, vec!["Vector3", "Particle", "Empty"]);
    for class in wrapped {
        assert!(declared.contains(&class), "{class} not declared");
    }
}

#[test]
fn converters_consume_every_declared_parameter() {
    let unit = geometry();
    let symbols = SymbolTable::build(std::slice::from_ref(&unit));
    let rules = NameRules::default();

    let mut callables = Vec::new();
    for item in &unit.items {
        match item {
            Item::Class(c) => {
                callables.extend(c.constructors.iter().map(|f| Callable::constructor(&c.name, f)));
                callables.extend(c.methods.iter().map(|f| Callable::method(&c.name, f)));
                callables.extend(c.fields.iter().map(Callable::getter));
                callables.extend(c.fields.iter().map(Callable::setter));
            }
            Item::Function(f) => callables.push(Callable::function(f)),
            _ => {}
        }
    }

    let mut built = 0;
    for c in &callables {
        if let Ok(def) = callable::build(c, &symbols, &rules) {
            assert_eq!(
                convert::total_arity(&def.inputs),
                c.params.len(),
                "{}",
                c.native_name
            );
            built += 1;
        }
    }
    assert!(built > 0);
}

#[test]
fn operator_overrides_apply_to_both_artifacts() {
    let ops = std::collections::HashMap::from([(
        "operator()".to_string(),
        "__getitem__".to_string(),
    )]);
    let calls = std::collections::HashMap::from([("operator()".to_string(), "at".to_string())]);
    let rules = NameRules::with_overrides(&ops, &calls);
    let out = bnd_cython::generate_from_units("geometry", &[geometry()], &rules).unwrap();

    assert!(out.declaration.content.contains("double at \"operator()\"(int i)"));
    assert!(out.implementation.content.contains("def __getitem__(Vector3 self, int i):"));
    assert!(out.implementation.content.contains("self.thisptr.at(i)"));
}

// ---------------------------------------------------------------------------
// Constructor policy and name clashes
// ---------------------------------------------------------------------------

fn generate_class(class: ClassDef) -> Generated {
    let unit = Unit {
        header: "widgets.hpp".to_string(),
        items: vec![Item::Class(class)],
    };
    bnd_cython::generate_from_units("widgets", &[unit], &NameRules::default())
        .expect("generation failed")
}

fn kinds_for<'a>(generated: &'a Generated, subject: &str) -> Vec<&'a WarningKind> {
    generated
        .warnings
        .iter()
        .filter(|w| w.subject == subject)
        .map(|w| &w.kind)
        .collect()
}

#[test]
fn unconvertible_last_constructor_omits_init() {
    let generated = generate_class(ClassDef {
        name: "Sensor".to_string(),
        constructors: vec![
            FunctionDef::constructor("Sensor", vec![p("scale", "double")]),
            FunctionDef::constructor("Sensor", vec![p("name", "const char *")]),
        ],
        ..Default::default()
    });
    let pyx = &generated.implementation.content;
    assert!(!pyx.contains("__init__"), "{pyx}");
    assert!(!pyx.contains("new cpp.Sensor("), "{pyx}");
    assert_eq!(kinds_for(&generated, "Sensor"), vec![&WarningKind::MultipleConstructors]);
    assert_eq!(kinds_for(&generated, "Sensor::Sensor"), vec![&WarningKind::UnsupportedType]);
}

#[test]
fn no_default_is_synthesized_when_constructors_are_declared() {
    let generated = generate_class(ClassDef {
        name: "Logger".to_string(),
        constructors: vec![FunctionDef::constructor(
            "Logger",
            vec![p("path", "const char *")],
        )],
        ..Default::default()
    });
    let pyx = &generated.implementation.content;
    assert!(!pyx.contains("new cpp.Logger()"), "{pyx}");
    assert!(!pyx.contains("__init__"), "{pyx}");
    assert_eq!(kinds_for(&generated, "Logger"), Vec::<&WarningKind>::new());
    assert_eq!(kinds_for(&generated, "Logger::Logger"), vec![&WarningKind::UnsupportedType]);
}

#[test]
fn accessor_clashing_with_method_drops_the_field() {
    let generated = generate_class(ClassDef {
        name: "Box".to_string(),
        fields: vec![FieldDef::new("Box", "x", "double")],
        methods: vec![FunctionDef::method("Box", "getX", vec![], "double")],
        ..Default::default()
    });
    let pyx = &generated.implementation.content;
    assert_eq!(pyx.matches("cpdef get_x(").count(), 1, "{pyx}");
    assert!(pyx.contains("self.thisptr.getX()"), "{pyx}");
    assert!(!pyx.contains("set_x"), "{pyx}");
    assert!(!pyx.contains("x = property"), "{pyx}");
    assert_eq!(kinds_for(&generated, "Box::x"), vec![&WarningKind::NameClash]);
}

#[test]
fn parameter_named_like_a_temporary_compiles() {
    let generated = generate_class(ClassDef {
        name: "Gauge".to_string(),
        methods: vec![FunctionDef::method(
            "Gauge",
            "scale",
            vec![p("result", "double")],
            "double",
        )],
        ..Default::default()
    });
    let pyx = &generated.implementation.content;
    assert!(pyx.contains("cpdef scale(Gauge self, double result):"), "{pyx}");
    assert!(pyx.contains("cdef double _result = self.thisptr.scale(result)"), "{pyx}");
    assert!(pyx.contains("return _result"), "{pyx}");
    assert!(generated.warnings.is_empty(), "{:?}", generated.warnings);
}

#[test]
fn reserved_parameter_name_drops_the_callable() {
    let generated = generate_class(ClassDef {
        name: "Gauge".to_string(),
        methods: vec![FunctionDef::method("Gauge", "reset", vec![p("self", "int")], "void")],
        ..Default::default()
    });
    assert!(!generated.implementation.content.contains("cpdef reset("));
    assert_eq!(kinds_for(&generated, "Gauge::reset"), vec![&WarningKind::NameClash]);
}

#[test]
fn overloaded_functions_keep_the_first() {
    let unit = Unit {
        header: "math.hpp".to_string(),
        items: vec![
            Item::Function(FunctionDef::free("clamp", vec![p("v", "double")], "double")),
            Item::Function(FunctionDef::free("clamp", vec![p("v", "int")], "int")),
        ],
    };
    let generated =
        bnd_cython::generate_from_units("math", &[unit], &NameRules::default()).unwrap();
    let pyx = &generated.implementation.content;
    assert_eq!(pyx.matches("cpdef clamp(").count(), 1, "{pyx}");
    assert!(pyx.contains("cpdef clamp(double v):"), "{pyx}");
    assert_eq!(kinds_for(&generated, "clamp"), vec![&WarningKind::NameClash]);
}
