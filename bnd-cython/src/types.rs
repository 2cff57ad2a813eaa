//! Type descriptors: the canonical form of a C++ type spelling.
//!
//! Raw spellings come straight from clang (`const geo::Vector3 &`,
//! `std::vector<double>`, `unsigned int *`). Converter selection and the
//! declaration pass only ever look at the normalized [`TypeDescriptor`].

use std::fmt;

/// Canonical form of a C++ type string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Unqualified name, e.g. `double`, `unsigned int`, `Vector3`, `vector`.
    pub base_name: String,
    pub is_const: bool,
    pub is_reference: bool,
    pub is_pointer: bool,
    /// Namespace qualification that was stripped from the base name.
    pub namespace_path: Vec<String>,
    pub template_args: Vec<TypeDescriptor>,
}

impl TypeDescriptor {
    /// Normalize a raw C++ type spelling.
    ///
    /// Rules, in order: drop a leading `const`, drop a trailing reference
    /// marker, strip namespace qualification down to the final segment and
    /// rewrite template angle brackets to bracket notation. A trailing `*`
    /// marks a pointer. Bracket notation is accepted on input as well, so
    /// normalizing an already rendered spelling is a no-op.
    ///
    /// Never fails; unrecognized shapes are rejected by converter selection.
    pub fn parse(raw: &str) -> Self {
        let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut s = collapsed.as_str();

        let is_const = match s.strip_prefix("const ") {
            Some(rest) => {
                s = rest;
                true
            }
            None => false,
        };

        let is_reference = match s.strip_suffix("&&").or_else(|| s.strip_suffix('&')) {
            Some(rest) => {
                s = rest.trim_end();
                true
            }
            None => false,
        };

        let is_pointer = match s.strip_suffix('*') {
            Some(rest) => {
                s = rest.trim_end();
                true
            }
            None => false,
        };

        let (head, template_args, tail) = split_template(s);

        let mut segments: Vec<String> = head
            .split("::")
            .map(str::trim)
            .filter(|seg| !seg.is_empty())
            .map(str::to_string)
            .collect();
        let mut base_name = segments.pop().unwrap_or_default();
        base_name.push_str(tail);

        TypeDescriptor {
            base_name,
            is_const,
            is_reference,
            is_pointer,
            namespace_path: segments,
            template_args,
        }
    }

    /// `true` for `void` (not `void *`) and for an empty spelling.
    pub fn is_void(&self) -> bool {
        !self.is_pointer && (self.base_name.is_empty() || self.base_name == "void")
    }

    /// Name with bracketed template arguments: `vector[double]`.
    pub fn cython_name(&self) -> String {
        if self.template_args.is_empty() {
            return self.base_name.clone();
        }
        let args: Vec<String> = self
            .template_args
            .iter()
            .map(TypeDescriptor::qualified_spelling)
            .collect();
        format!("{}[{}]", self.base_name, args.join(", "))
    }

    /// Spelling used in declarations: the Cython name plus ` *` for pointers.
    pub fn decl_spelling(&self) -> String {
        if self.is_pointer {
            format!("{} *", self.cython_name())
        } else {
            self.cython_name()
        }
    }

    /// The pointee of a pointer type; any other type is returned unchanged.
    pub fn pointee(&self) -> TypeDescriptor {
        TypeDescriptor {
            is_pointer: false,
            ..self.clone()
        }
    }

    /// Template arguments keep their namespace qualification when rendered:
    /// `std::vector<std::string>` becomes `vector[std::string]`.
    fn qualified_spelling(&self) -> String {
        let mut out = String::new();
        for ns in &self.namespace_path {
            out.push_str(ns);
            out.push_str("::");
        }
        out.push_str(&self.decl_spelling());
        out
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.decl_spelling())
    }
}

/// Split `ns::name<args>tail` into the head, the parsed arguments and
/// whatever follows the closing bracket.
fn split_template(s: &str) -> (&str, Vec<TypeDescriptor>, &str) {
    let Some(open) = s.find(['<', '[']) else {
        return (s, Vec::new(), "");
    };

    let mut depth = 0usize;
    let mut close = None;
    for (i, c) in s.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '<' | '[' => depth += 1,
            '>' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            _ => {}
        }
    }

    // Unbalanced brackets: keep the spelling as an opaque name.
    let Some(close) = close else {
        return (s, Vec::new(), "");
    };

    let args = split_top_level(&s[open + 1..close])
        .into_iter()
        .map(TypeDescriptor::parse)
        .collect();
    (s[..open].trim_end(), args, s[close + 1..].trim())
}

fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' | '[' | '(' => depth += 1,
            '>' | ']' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = s[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}
