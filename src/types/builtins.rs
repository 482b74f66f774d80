//! Builtin type table
//!
//! Process-wide immutable configuration: the fixed set of primitive type
//! names, literal aliases, and builtin functions that every compilation
//! unit can resolve without declaring them. Initialized once before any
//! resolution run and never mutated; each session arena seeds its own
//! entries from this table.
//!
//! The dynamic allocation builtin (`make`) is deliberately absent: its
//! result type depends on its argument expression, so it is handled at the
//! expression-typing layer instead.

use once_cell::sync::Lazy;

/// One builtin definition. Aliases and functions may only refer to names
/// seeded earlier in the table.
#[derive(Debug, Clone, Copy)]
pub enum BuiltinDef {
    /// A primitive leaf type
    Leaf(&'static str),
    /// A second name for an already-seeded builtin
    Alias {
        name: &'static str,
        target: &'static str,
    },
    /// A builtin function with a fixed result list
    Func {
        name: &'static str,
        results: &'static [&'static str],
    },
}

pub static BUILTINS: Lazy<Vec<BuiltinDef>> = Lazy::new(|| {
    let mut defs: Vec<BuiltinDef> = [
        "int8", "int16", "int32", "int64", "uint8", "uint16", "uint32", "uint64", "int", "uint",
        "uintptr", "float32", "float64", "complex64", "complex128", "string", "bool",
    ]
    .iter()
    .copied()
    .map(BuiltinDef::Leaf)
    .collect();

    defs.extend([
        BuiltinDef::Alias {
            name: "byte",
            target: "uint8",
        },
        BuiltinDef::Alias {
            name: "rune",
            target: "int32",
        },
        BuiltinDef::Alias {
            name: "true",
            target: "bool",
        },
        BuiltinDef::Alias {
            name: "false",
            target: "bool",
        },
        BuiltinDef::Alias {
            name: "iota",
            target: "int",
        },
        BuiltinDef::Func {
            name: "len",
            results: &["int"],
        },
    ]);

    defs
});
