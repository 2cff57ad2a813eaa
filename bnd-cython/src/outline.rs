//! Structural outlines of the two artifacts and the check that keeps them
//! parallel.
//!
//! The declaration pass is shape-only and never drops a member; the
//! implementation pass drops members it cannot convert. The invariant is
//! one-directional: every class the implementation wraps is declared, and
//! every member it wraps is declared in that class.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::GenerateError;

/// Class name → native member names, as emitted by one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    classes: BTreeMap<String, BTreeSet<String>>,
}

impl Outline {
    /// Register a class; members are added with [`Outline::add_member`].
    pub fn add_class(&mut self, class: &str) {
        self.classes.entry(class.to_string()).or_default();
    }

    pub fn add_member(&mut self, class: &str, member: &str) {
        self.classes
            .entry(class.to_string())
            .or_default()
            .insert(member.to_string());
    }
}

/// Verify that `implemented` is structurally contained in `declared`.
pub fn check_outlines(declared: &Outline, implemented: &Outline) -> Result<(), GenerateError> {
    for (class, members) in &implemented.classes {
        let Some(declared_members) = declared.classes.get(class) else {
            return Err(GenerateError::UndeclaredClass {
                class: class.clone(),
            });
        };
        if let Some(member) = members.difference(declared_members).next() {
            return Err(GenerateError::UndeclaredMember {
                class: class.clone(),
                member: member.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subset_passes() {
        let mut declared = Outline::default();
        declared.add_member("Vector3", "x");
        declared.add_member("Vector3", "length");
        let mut implemented = Outline::default();
        implemented.add_member("Vector3", "x");
        assert!(check_outlines(&declared, &implemented).is_ok());
    }

    #[test]
    fn undeclared_member_is_reported() {
        let mut declared = Outline::default();
        declared.add_class("Vector3");
        let mut implemented = Outline::default();
        implemented.add_member("Vector3", "x");
        assert_eq!(
            check_outlines(&declared, &implemented),
            Err(GenerateError::UndeclaredMember {
                class: "Vector3".into(),
                member: "x".into(),
            })
        );
    }

    #[test]
    fn undeclared_class_is_reported() {
        let mut implemented = Outline::default();
        implemented.add_class("Ghost");
        assert_eq!(
            check_outlines(&Outline::default(), &implemented),
            Err(GenerateError::UndeclaredClass {
                class: "Ghost".into()
            })
        );
    }
}
