//! Method specifications: a method name plus its method-specific arguments
//!
//! A [`MethodSpec`] is the caller-facing description of how to order elements.
//! It is not validated until it is resolved into a
//! [`Comparator`](crate::comparator::Comparator).

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::SortError;

/// Prefix that requests the reverse of a method's ordering
pub const REVERSE_PREFIX: &str = "rev_";

/// External table translating an element into the value it is compared by
pub trait KeyLookup: Send + Sync {
    /// Returns the comparison value for `element`, or `None` if it is not a key
    fn lookup(&self, element: &str) -> Option<&str>;
}

impl<K, V> KeyLookup for HashMap<K, V>
where
    K: Borrow<str> + Hash + Eq + Send + Sync,
    V: AsRef<str> + Send + Sync,
{
    fn lookup(&self, element: &str) -> Option<&str> {
        self.get(element).map(|v| v.as_ref())
    }
}

impl<K, V> KeyLookup for BTreeMap<K, V>
where
    K: Borrow<str> + Ord + Send + Sync,
    V: AsRef<str> + Send + Sync,
{
    fn lookup(&self, element: &str) -> Option<&str> {
        self.get(element).map(|v| v.as_ref())
    }
}

/// Error type returned by caller-supplied comparison functions
pub type FunctionError = Box<dyn std::error::Error + Send + Sync>;

/// Caller-supplied binary comparison function used by the `function` method
#[derive(Clone)]
pub struct UserFn(Arc<dyn Fn(&str, &str) -> Result<Ordering, FunctionError> + Send + Sync>);

impl UserFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, &str) -> Result<Ordering, FunctionError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub(crate) fn call(&self, a: &str, b: &str) -> Result<Ordering, FunctionError> {
        (self.0)(a, b)
    }
}

impl fmt::Debug for UserFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserFn(..)")
    }
}

/// One positional argument of a method
///
/// Methods accept their arguments by shape, the way a dynamically typed
/// caller would pass scalars, tables and nested method lists.
#[derive(Clone)]
pub enum MethodArg {
    /// Free text: a priority flag, a separator pattern or a field index
    Text(String),
    /// Field index for partial-element methods (0-based)
    Field(usize),
    /// Lookup table applied to the operands before comparing
    Lookup(Arc<dyn KeyLookup>),
    /// Backup chain or sub-method chain
    Methods(Vec<MethodSpec>),
    /// Comparison function for the `function` method
    Function(UserFn),
}

impl MethodArg {
    pub fn text(value: impl Into<String>) -> Self {
        MethodArg::Text(value.into())
    }

    pub fn lookup(table: impl KeyLookup + 'static) -> Self {
        MethodArg::Lookup(Arc::new(table))
    }

    /// Short name of the argument's shape, used in error messages
    pub fn shape(&self) -> &'static str {
        match self {
            MethodArg::Text(_) => "text",
            MethodArg::Field(_) => "field index",
            MethodArg::Lookup(_) => "lookup table",
            MethodArg::Methods(_) => "method list",
            MethodArg::Function(_) => "function",
        }
    }
}

impl fmt::Debug for MethodArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodArg::Text(text) => f.debug_tuple("Text").field(text).finish(),
            MethodArg::Field(index) => f.debug_tuple("Field").field(index).finish(),
            MethodArg::Lookup(_) => f.write_str("Lookup(..)"),
            MethodArg::Methods(methods) => f.debug_tuple("Methods").field(methods).finish(),
            MethodArg::Function(func) => f.debug_tuple("Function").field(func).finish(),
        }
    }
}

impl From<&str> for MethodArg {
    fn from(value: &str) -> Self {
        MethodArg::Text(value.to_string())
    }
}

impl From<usize> for MethodArg {
    fn from(index: usize) -> Self {
        MethodArg::Field(index)
    }
}

impl From<Vec<MethodSpec>> for MethodArg {
    fn from(methods: Vec<MethodSpec>) -> Self {
        MethodArg::Methods(methods)
    }
}

impl From<UserFn> for MethodArg {
    fn from(func: UserFn) -> Self {
        MethodArg::Function(func)
    }
}

/// A method name, its reverse flag and its arguments
#[derive(Debug, Clone)]
pub struct MethodSpec {
    /// Method name without the `rev_` prefix
    pub name: String,
    /// Set when the name carried the `rev_` prefix
    pub reversed: bool,
    pub args: Vec<MethodArg>,
}

impl MethodSpec {
    /// Create a spec from a method name, honouring a leading `rev_`
    pub fn new(name: &str) -> Self {
        let (name, reversed) = split_reverse_prefix(name);
        Self {
            name: name.to_string(),
            reversed,
            args: Vec::new(),
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<MethodArg>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a lookup table argument
    pub fn with_lookup(mut self, table: impl KeyLookup + 'static) -> Self {
        self.args.push(MethodArg::lookup(table));
        self
    }

    /// Append a shared lookup table argument
    pub fn with_shared_lookup(mut self, table: Arc<dyn KeyLookup>) -> Self {
        self.args.push(MethodArg::Lookup(table));
        self
    }

    /// Append a backup or sub-method chain given by names
    pub fn with_methods<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let methods = names
            .into_iter()
            .map(|name| MethodSpec::new(name.as_ref()))
            .collect();
        self.args.push(MethodArg::Methods(methods));
        self
    }

    /// Toggle the reverse flag
    pub fn reverse(mut self) -> Self {
        self.reversed = !self.reversed;
        self
    }
}

impl fmt::Display for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reversed {
            write!(f, "{REVERSE_PREFIX}{}", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl FromStr for MethodSpec {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() {
            return Err(SortError::invalid_method(s));
        }
        Ok(MethodSpec::new(name))
    }
}

/// Strip one `rev_` prefix, reporting whether it was present
pub fn split_reverse_prefix(name: &str) -> (&str, bool) {
    match name.strip_prefix(REVERSE_PREFIX) {
        Some(rest) => (rest, true),
        None => (name, false),
    }
}
