//! The fixed table of supported methods
//!
//! Built once on first use and never modified afterwards.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::SortResult;
use crate::method::{split_reverse_prefix, MethodArg};
use crate::primitives::Primitive;
use crate::resolver::{self, Built};

/// Global method table
static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// How a method orders elements and which arguments it takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Fully orders any two elements
    Unambiguous,
    /// May tie on distinct elements and consults a backup chain
    Ambiguous,
    /// Compares elements piece by piece
    Split,
    /// Compares selected fields of elements
    Partial,
}

/// Constructor turning a method's arguments into a comparator node
pub(crate) type Builder = fn(&str, &[MethodArg]) -> SortResult<Built>;

/// One registered method
#[derive(Clone, Copy)]
pub struct MethodEntry {
    pub name: &'static str,
    pub category: Category,
    /// Argument shape, for help output
    pub usage: &'static str,
    pub(crate) build: Builder,
}

impl std::fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodEntry")
            .field("name", &self.name)
            .field("category", &self.category)
            .finish()
    }
}

/// Registered methods in declaration order, indexed by name
pub struct Registry {
    entries: Vec<MethodEntry>,
    by_name: HashMap<&'static str, usize>,
}

impl Registry {
    fn init() -> Self {
        let entries = builtin_methods();
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(idx, entry)| (entry.name, idx))
            .collect();
        Self { entries, by_name }
    }

    /// Get the global registry
    pub fn get() -> &'static Registry {
        REGISTRY.get_or_init(Self::init)
    }

    /// Find a method by its exact, unprefixed name
    pub fn find(&self, name: &str) -> Option<&MethodEntry> {
        self.by_name.get(name).map(|&idx| &self.entries[idx])
    }

    pub fn entries(&self) -> &[MethodEntry] {
        &self.entries
    }
}

/// Check a method name, accepting one optional `rev_` prefix
pub fn is_valid_method(name: &str) -> bool {
    let (name, _) = split_reverse_prefix(name);
    Registry::get().find(name).is_some()
}

/// Names of every supported method, without prefixes
pub fn method_names() -> Vec<&'static str> {
    Registry::get().entries().iter().map(|e| e.name).collect()
}

fn entry(name: &'static str, category: Category, usage: &'static str, build: Builder) -> MethodEntry {
    MethodEntry {
        name,
        category,
        usage,
        build,
    }
}

fn builtin_methods() -> Vec<MethodEntry> {
    use Category::*;

    const LEAF: &str = "[LOOKUP]";
    const ALIAS: &str = "[SEPARATOR] [LOOKUP]";
    const LINE: &str = "FIELD [SEPARATOR] [LOOKUP]";

    vec![
        entry("numerical", Unambiguous, LEAF, |m, a| resolver::build_leaf(m, a, Primitive::Numerical)),
        entry("alphabetic", Unambiguous, LEAF, |m, a| resolver::build_leaf(m, a, Primitive::Alphabetic)),
        entry("alphanumeric", Unambiguous, LEAF, |m, a| resolver::build_leaf(m, a, Primitive::Alphanumeric)),
        entry("random", Unambiguous, LEAF, |m, a| resolver::build_leaf(m, a, Primitive::Random)),
        entry("version", Unambiguous, LEAF, |m, a| resolver::build_leaf(m, a, Primitive::Version)),
        entry("date", Unambiguous, LEAF, |m, a| resolver::build_leaf(m, a, Primitive::Date)),
        entry("ip", Unambiguous, LEAF, |m, a| resolver::build_leaf(m, a, Primitive::Ip)),
        entry("nosort", Unambiguous, LEAF, |m, a| resolver::build_leaf(m, a, Primitive::NoSort)),
        entry("function", Unambiguous, "FUNCTION [LOOKUP]", resolver::build_function),
        entry("length", Ambiguous, "[LOOKUP] [BACKUP METHODS]", resolver::build_length),
        entry(
            "split",
            Split,
            "[lms|rms] [SEPARATOR] [LOOKUP] [SUB METHODS]",
            resolver::build_split,
        ),
        entry("domain", Split, ALIAS, |m, a| resolver::build_split_alias(m, a, "rms", r"\.", "alphabetic")),
        entry("numdomain", Split, ALIAS, |m, a| {
            resolver::build_split_alias(m, a, "rms", r"\.", "alphanumeric")
        }),
        entry("path", Split, ALIAS, |m, a| resolver::build_split_alias(m, a, "lms", "/", "alphabetic")),
        entry("numpath", Split, ALIAS, |m, a| resolver::build_split_alias(m, a, "lms", "/", "alphanumeric")),
        entry(
            "partial",
            Partial,
            "[SEPARATOR] FIELD [LOOKUP] [SUB METHODS] ...",
            resolver::build_partial,
        ),
        entry("line", Partial, LINE, |m, a| resolver::build_line_alias(m, a, "alphabetic")),
        entry("numline", Partial, LINE, |m, a| resolver::build_line_alias(m, a, "numerical")),
    ]
}
