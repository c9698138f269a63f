//! Turns a [`MethodSpec`] into a [`Comparator`] tree
//!
//! All argument validation happens here, before any element is compared.
//! Backup chains and sub-method chains are resolved recursively, and the
//! legacy alias methods are rewritten into the split or partial forms they
//! stand for.

use std::sync::Arc;

use regex::Regex;

use crate::comparator::{
    Ambiguous, AmbiguousKind, Chain, Comparator, FieldSpec, NodeKind, PartialElement, Priority,
    Separator, SplitElement,
};
use crate::error::{SortError, SortResult};
use crate::method::{KeyLookup, MethodArg, MethodSpec, UserFn};
use crate::primitives::Primitive;
use crate::registry::Registry;

/// Output of a method constructor: the node body and its element lookup
pub struct Built {
    pub kind: NodeKind,
    pub lookup: Option<Arc<dyn KeyLookup>>,
}

impl Built {
    fn new(kind: NodeKind) -> Self {
        Self { kind, lookup: None }
    }

    fn with_lookup(mut self, lookup: Option<Arc<dyn KeyLookup>>) -> Self {
        self.lookup = lookup;
        self
    }
}

/// Resolve a method and its arguments into a comparator tree
pub fn resolve(spec: &MethodSpec) -> SortResult<Comparator> {
    let entry = Registry::get()
        .find(&spec.name)
        .ok_or_else(|| SortError::invalid_method(&spec.to_string()))?;

    let built = (entry.build)(&spec.name, &spec.args)?;
    tracing::debug!(
        method = %spec,
        category = ?entry.category,
        args = spec.args.len(),
        "resolved method"
    );
    Ok(Comparator::new(built.kind, built.lookup, spec.reversed))
}

/// Resolve a backup or sub-method chain, defaulting to `[alphabetic]`
pub fn resolve_chain(methods: Option<&[MethodSpec]>) -> SortResult<Chain> {
    match methods {
        Some(methods) if !methods.is_empty() => {
            let links = methods.iter().map(resolve).collect::<SortResult<Vec<_>>>()?;
            Ok(Chain::new(links))
        }
        _ => Ok(Chain::new(vec![default_comparator()])),
    }
}

fn default_comparator() -> Comparator {
    Comparator::new(NodeKind::Primitive(Primitive::Alphabetic), None, false)
}

/// Cursor over a method's positional arguments
struct Args<'a> {
    method: &'a str,
    args: &'a [MethodArg],
    pos: usize,
}

impl<'a> Args<'a> {
    fn new(method: &'a str, args: &'a [MethodArg]) -> Self {
        Self { method, args, pos: 0 }
    }

    fn peek(&self) -> Option<&'a MethodArg> {
        self.args.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn next_text(&mut self) -> Option<&'a str> {
        match self.peek() {
            Some(MethodArg::Text(text)) => {
                self.advance();
                Some(text.as_str())
            }
            _ => None,
        }
    }

    fn next_lookup(&mut self) -> Option<Arc<dyn KeyLookup>> {
        match self.peek() {
            Some(MethodArg::Lookup(table)) => {
                self.advance();
                Some(Arc::clone(table))
            }
            _ => None,
        }
    }

    fn next_methods(&mut self) -> Option<&'a [MethodSpec]> {
        match self.peek() {
            Some(MethodArg::Methods(methods)) => {
                self.advance();
                Some(methods.as_slice())
            }
            _ => None,
        }
    }

    fn next_function(&mut self) -> Option<&'a UserFn> {
        match self.peek() {
            Some(MethodArg::Function(func)) => {
                self.advance();
                Some(func)
            }
            _ => None,
        }
    }

    /// Fail if any argument was not consumed
    fn finish(self) -> SortResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(arg) => Err(SortError::invalid_arity(
                self.method,
                &format!("unexpected {} argument at position {}", arg.shape(), self.pos + 1),
            )),
        }
    }
}

/// Compile a separator pattern; a single space means runs of whitespace
fn compile_separator(method: &str, pattern: &str) -> SortResult<Separator> {
    if pattern.is_empty() {
        return Err(SortError::invalid_argument(method, "empty separator pattern"));
    }
    if pattern == " " {
        return Ok(Separator::Whitespace);
    }
    Regex::new(pattern)
        .map(Separator::Pattern)
        .map_err(|e| SortError::invalid_argument(method, &format!("invalid separator pattern: {e}")))
}

/// Optionally signed run of digits
fn looks_like_index(text: &str) -> bool {
    let text = text.trim();
    let digits = text.strip_prefix(['-', '+']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn parse_field_index(method: &str, text: &str) -> SortResult<usize> {
    text.trim()
        .parse::<usize>()
        .map_err(|_| SortError::invalid_argument(method, &format!("invalid field index: {text}")))
}

/// Unambiguous primitive: `[LOOKUP]`
pub(crate) fn build_leaf(method: &str, args: &[MethodArg], primitive: Primitive) -> SortResult<Built> {
    let mut args = Args::new(method, args);
    let lookup = args.next_lookup();
    args.finish()?;
    Ok(Built::new(NodeKind::Primitive(primitive)).with_lookup(lookup))
}

/// `function`: `FUNCTION [LOOKUP]`
pub(crate) fn build_function(method: &str, args: &[MethodArg]) -> SortResult<Built> {
    let mut args = Args::new(method, args);
    let func = args
        .next_function()
        .cloned()
        .ok_or_else(|| SortError::invalid_arity(method, "expects a comparison function"))?;
    let lookup = args.next_lookup();
    args.finish()?;
    Ok(Built::new(NodeKind::Primitive(Primitive::Function(func))).with_lookup(lookup))
}

/// `length`: `[LOOKUP] [BACKUP METHODS]`
pub(crate) fn build_length(method: &str, args: &[MethodArg]) -> SortResult<Built> {
    let mut args = Args::new(method, args);
    let lookup = args.next_lookup();
    let backups = resolve_chain(args.next_methods())?;
    args.finish()?;
    Ok(Built::new(NodeKind::Ambiguous(Ambiguous {
        primary: AmbiguousKind::Length,
        backups,
    }))
    .with_lookup(lookup))
}

/// `split`: `[lms|rms] [SEPARATOR] [LOOKUP] [SUB METHODS]`
pub(crate) fn build_split(method: &str, args: &[MethodArg]) -> SortResult<Built> {
    let mut args = Args::new(method, args);
    let mut priority = Priority::default();
    let mut separator = Separator::Whitespace;

    if let Some(text) = args.next_text() {
        match Priority::from_flag(text) {
            Some(flag) => {
                priority = flag;
                if let Some(pattern) = args.next_text() {
                    separator = compile_separator(method, pattern)?;
                }
            }
            None => separator = compile_separator(method, text)?,
        }
    }

    let lookup = args.next_lookup();
    let pieces = resolve_chain(args.next_methods())?;
    args.finish()?;

    Ok(Built::new(NodeKind::Split(SplitElement {
        separator,
        priority,
        pieces,
    }))
    .with_lookup(lookup))
}

/// `partial`: `[SEPARATOR] FIELD [LOOKUP] [SUB METHODS] ...`
///
/// A leading text argument is the separator unless it reads as an integer,
/// in which case it must be a valid field index.
pub(crate) fn build_partial(method: &str, args: &[MethodArg]) -> SortResult<Built> {
    let mut args = Args::new(method, args);

    let separator = match args.peek() {
        Some(MethodArg::Text(text)) if !looks_like_index(text) => {
            args.advance();
            compile_separator(method, text)?
        }
        _ => Separator::Whitespace,
    };

    let mut fields = Vec::new();
    while let Some(arg) = args.peek() {
        let index = match arg {
            MethodArg::Field(index) => *index,
            MethodArg::Text(text) => parse_field_index(method, text)?,
            _ => break,
        };
        args.advance();
        let lookup = args.next_lookup();
        let methods = resolve_chain(args.next_methods())?;
        fields.push(FieldSpec {
            index,
            lookup,
            methods,
        });
    }

    if fields.is_empty() {
        return Err(SortError::invalid_arity(method, "expects at least one field index"));
    }
    args.finish()?;

    Ok(Built::new(NodeKind::Partial(PartialElement { separator, fields })))
}

/// `domain`, `path` and their numeric forms: `[SEPARATOR] [LOOKUP]`
pub(crate) fn build_split_alias(
    method: &str,
    args: &[MethodArg],
    priority: &str,
    default_separator: &str,
    sub_method: &str,
) -> SortResult<Built> {
    let mut cursor = Args::new(method, args);
    let separator = cursor.next_text().unwrap_or(default_separator);
    let lookup = cursor.next_lookup();
    cursor.finish()?;

    let mut rewritten = vec![MethodArg::text(priority), MethodArg::text(separator)];
    rewritten.extend(lookup.map(MethodArg::Lookup));
    rewritten.push(MethodArg::Methods(vec![MethodSpec::new(sub_method)]));

    tracing::trace!(method, priority, separator, sub_method, "rewrote alias as split");
    build_split(method, &rewritten)
}

/// `line` and `numline`: `FIELD [SEPARATOR] [LOOKUP]`
pub(crate) fn build_line_alias(method: &str, args: &[MethodArg], sub_method: &str) -> SortResult<Built> {
    let mut cursor = Args::new(method, args);
    let index = match cursor.peek() {
        Some(MethodArg::Field(index)) => *index,
        Some(MethodArg::Text(text)) => parse_field_index(method, text)?,
        _ => return Err(SortError::invalid_arity(method, "expects a field index")),
    };
    cursor.advance();
    let separator = cursor.next_text();
    let lookup = cursor.next_lookup();
    cursor.finish()?;

    let mut rewritten = Vec::new();
    rewritten.extend(separator.map(MethodArg::text));
    rewritten.push(MethodArg::Field(index));
    rewritten.extend(lookup.map(MethodArg::Lookup));
    rewritten.push(MethodArg::Methods(vec![MethodSpec::new(sub_method)]));

    tracing::trace!(method, index, sub_method, "rewrote alias as partial");
    build_partial(method, &rewritten)
}
