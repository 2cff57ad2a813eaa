//! Round-trip integration test: parse geometry.hpp with libclang → emit
//! `.pxd`/`.pyx` → verify contents.

use std::path::Path;
use std::sync::LazyLock;

use bnd_cython::Generated;
use bnd_cython::error::WarningKind;

static GEOMETRY: LazyLock<Generated> = LazyLock::new(|| {
    let path =
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../tests/fixtures/geometry/bnd-cython.toml");
    bnd_cython::generate(&path).expect("generate geometry bindings")
});

fn pxd() -> &'static str {
    &GEOMETRY.declaration.content
}

fn pyx() -> &'static str {
    &GEOMETRY.implementation.content
}

#[test]
fn roundtrip_module_name_from_header() {
    assert_eq!(GEOMETRY.implementation.name, "geometry.pyx");
    assert_eq!(GEOMETRY.declaration.name, "_declarations.pxd");
}

#[test]
fn roundtrip_extern_blocks() {
    assert!(
        pxd().contains("cdef extern from \"geometry.hpp\" namespace \"geo\":"),
        "missing namespaced extern block:\n{}",
        pxd()
    );
    for class in ["Vector3", "Particle", "Empty"] {
        assert!(
            pxd().contains(&format!("    cdef cppclass {class}:")),
            "{class} not declared:\n{}",
            pxd()
        );
    }
    assert!(pxd().contains("ctypedef double real"));
    assert!(pxd().contains("    cdef enum Axis:\n        AXIS_X = 0\n        AXIS_Y = 1\n        AXIS_Z = 2"));
}

#[test]
fn roundtrip_public_members_only() {
    assert!(pxd().contains("        double x\n"));
    assert!(pxd().contains("        Vector3(double x, double y, double z)\n"));
    assert!(!pxd().contains("cachedLength"), "private field leaked");
    assert!(!pxd().contains("zero()"), "static method leaked");
    assert!(!pxd().contains("checksum"), "variadic function leaked");
    assert!(!pxd().contains("Vector3(Vector3 other)"), "copy constructor leaked");
}

#[test]
fn roundtrip_declarations_keep_unconvertible_members() {
    assert!(pxd().contains("char * describe()"));
    assert!(pxd().contains("void setFromArray(double * values, int n)"));
    assert!(pxd().contains("Vector3 add \"operator+\"(Vector3 other)"));
    assert!(pxd().contains("double call \"operator()\"(int i)"));
}

#[test]
fn roundtrip_wrappers() {
    assert!(pyx().starts_with("# +"));
    assert!(pyx().contains("cimport _declarations as cpp"));
    assert!(pyx().contains("cdef class Vector3:"));
    assert!(pyx().contains("    cpdef squared_length(Vector3 self):"));
    assert!(pyx().contains("    cpdef scaled(Vector3 self, double factor):"));
    assert!(pyx().contains("    def __add__(Vector3 self, Vector3 other):"));
    assert!(pyx().contains("    def __call__(Vector3 self, int i):"));
    assert!(
        pyx().contains("    cpdef set_from_array(Vector3 self, np.ndarray[double, ndim=1, mode=\"c\"] values):")
    );
    assert!(pyx().contains(
        "cpdef dot_product(np.ndarray[double, ndim=1, mode=\"c\"] a, \
         np.ndarray[double, ndim=1, mode=\"c\"] b):"
    ));
    assert!(pyx().contains("    x = property(get_x, set_x)"));
    assert!(pyx().contains("    active = property(get_active, set_active)"));
    assert!(pyx().contains("    def __init__(Empty self):\n        self.thisptr = new cpp.Empty()"));
    assert!(pyx().contains("class Axis:\n    AXIS_X = cpp.AXIS_X"));
}

#[test]
fn roundtrip_warnings() {
    let subjects: Vec<(&str, WarningKind)> = GEOMETRY
        .warnings
        .iter()
        .map(|w| (w.subject.as_str(), w.kind))
        .collect();
    assert_eq!(
        subjects,
        vec![
            ("Vector3::describe", WarningKind::UnsupportedType),
            ("Particle", WarningKind::MultipleConstructors),
        ]
    );
    assert!(!pyx().contains("describe"));
}
