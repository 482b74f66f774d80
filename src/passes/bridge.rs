//! Cross-unit bridge
//!
//! Exposes the completed name table of an already-resolved unit as a
//! read-only view, keyed by import path. This is the only channel through
//! which one unit sees another: the depended-upon unit's resolution pass
//! must have run to completion first, which the scheduler's ordering
//! guarantees.

use indexmap::IndexMap;

use crate::passes::PassResults;
use crate::types::TypeId;
use crate::utils::{Error, Result};

/// Read-only view over one published unit's resolved names.
#[derive(Debug)]
pub struct UnitExports<'a> {
    defined: &'a IndexMap<String, TypeId>,
}

impl<'a> UnitExports<'a> {
    /// The unit's full name table, in definition order.
    pub fn members(&self) -> &'a IndexMap<String, TypeId> {
        self.defined
    }
}

/// Look up the published table for an import path.
pub fn exports<'a>(results: &'a PassResults, path: &str) -> Result<UnitExports<'a>> {
    match results.types(path) {
        Some(types) => Ok(UnitExports {
            defined: &types.defined,
        }),
        None => Err(Error::PackageNotFound {
            path: path.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::{PassKind, PassOutput, PassResults};
    use crate::resolve::DefinedTypes;
    use crate::types::TypeArena;

    #[test]
    fn unknown_path_is_package_not_found() {
        let results = PassResults::new();
        let err = exports(&results, "ghost").unwrap_err();
        assert_eq!(
            err,
            Error::PackageNotFound {
                path: "ghost".to_string()
            }
        );
    }

    #[test]
    fn members_reflect_the_published_table() {
        let arena = TypeArena::new();
        let int_ty = arena.builtin("int").unwrap();
        let mut types = DefinedTypes::default();
        types.defined.insert("Answer".to_string(), int_ty);

        let mut results = PassResults::new();
        results
            .publish(PassKind::TypeResolution, "lib", PassOutput::Types(types))
            .unwrap();

        let view = exports(&results, "lib").unwrap();
        assert_eq!(view.members().get("Answer"), Some(&int_ty));
    }
}
