//! Naming rules: identifier case conversion and operator mapping.

use std::collections::HashMap;

/// Operator → (special method, declaration alias) defaults.
const DEFAULT_OPERATORS: &[(&str, &str, &str)] = &[
    ("operator()", "__call__", "call"),
    ("operator[]", "__getitem__", "getitem"),
    ("operator+", "__add__", "add"),
    ("operator-", "__sub__", "sub"),
    ("operator*", "__mul__", "mul"),
    ("operator/", "__truediv__", "div"),
    ("operator==", "__eq__", "eq"),
    ("operator!=", "__ne__", "ne"),
    ("operator<", "__lt__", "lt"),
    ("operator<=", "__le__", "le"),
    ("operator>", "__gt__", "gt"),
    ("operator>=", "__ge__", "ge"),
];

/// Convert a camel-case identifier to snake case.
///
/// `MyFunctionName` and `myFunctionName` both become `my_function_name`;
/// runs of capitals are treated as one word (`HTTPServer` → `http_server`).
/// Already converted identifiers are returned unchanged.
pub fn from_camel_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Names of the form `__name__` are special methods of the managed runtime.
pub fn is_special_method(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

/// Binding keyword for a managed-side callable: special methods can only be
/// plain `def`s, everything else is callable from both sides.
pub fn binding_keyword(name: &str) -> &'static str {
    if is_special_method(name) {
        "def"
    } else {
        "cpdef"
    }
}

/// Immutable operator lookup tables, passed into both emission passes.
#[derive(Debug, Clone)]
pub struct NameRules {
    /// C++ operator → special method name on the wrapper class.
    operators: HashMap<String, String>,
    /// C++ operator → identifier it is declared under (`call "operator()"`).
    call_operators: HashMap<String, String>,
}

impl Default for NameRules {
    fn default() -> Self {
        let mut operators = HashMap::new();
        let mut call_operators = HashMap::new();
        for (op, special, alias) in DEFAULT_OPERATORS {
            operators.insert(op.to_string(), special.to_string());
            call_operators.insert(op.to_string(), alias.to_string());
        }
        Self {
            operators,
            call_operators,
        }
    }
}

impl NameRules {
    /// Defaults with user-supplied entries layered on top.
    pub fn with_overrides(
        operators: &HashMap<String, String>,
        call_operators: &HashMap<String, String>,
    ) -> Self {
        let mut rules = Self::default();
        rules
            .operators
            .extend(operators.iter().map(|(k, v)| (k.clone(), v.clone())));
        rules
            .call_operators
            .extend(call_operators.iter().map(|(k, v)| (k.clone(), v.clone())));
        rules
    }

    /// Managed-side identifier for a native callable name.
    pub fn managed_name(&self, native: &str) -> String {
        let converted = from_camel_case(native);
        match self.operators.get(&converted) {
            Some(special) => special.clone(),
            None => converted,
        }
    }

    /// Identifier under which an operator is declared and called.
    pub fn call_alias<'a>(&'a self, native: &'a str) -> &'a str {
        self.call_operators
            .get(native)
            .map(String::as_str)
            .unwrap_or(native)
    }

    /// Declared method name: operators get a cname string so that the alias
    /// resolves to the real C++ symbol.
    pub fn declared_name(&self, native: &str) -> String {
        match self.call_operators.get(native) {
            Some(alias) => format!("{alias} \"{native}\""),
            None => native.to_string(),
        }
    }
}
