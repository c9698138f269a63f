//! Resolved comparator trees
//!
//! A [`Comparator`] is built once per sort or compare call by the
//! [resolver](crate::resolver) and then evaluated for every pair. Composite
//! nodes (length, split-element, partial-element) hold their sub-comparators
//! as [`Chain`]s, so a tree can nest to any depth.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use itertools::{EitherOrBoth, Itertools};
use regex::Regex;

use crate::date::{DateParser, ParseCache};
use crate::error::{SortError, SortResult};
use crate::method::KeyLookup;
use crate::primitives::Primitive;

/// Per-call state threaded through every comparison
///
/// Holds the date parse cache; a fresh context is created for each sort or
/// compare call and dropped when it returns.
pub struct CompareContext<'a> {
    pub(crate) date_parser: &'a dyn DateParser,
    pub(crate) dates: ParseCache,
}

impl<'a> CompareContext<'a> {
    pub fn new(date_parser: &'a dyn DateParser) -> Self {
        Self {
            date_parser,
            dates: ParseCache::new(),
        }
    }
}

/// A resolved, invocable comparison node
#[derive(Clone)]
pub struct Comparator {
    kind: NodeKind,
    lookup: Option<Arc<dyn KeyLookup>>,
    reversed: bool,
}

impl Comparator {
    pub fn new(kind: NodeKind, lookup: Option<Arc<dyn KeyLookup>>, reversed: bool) -> Self {
        Self {
            kind,
            lookup,
            reversed,
        }
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn lookup(&self) -> Option<&Arc<dyn KeyLookup>> {
        self.lookup.as_ref()
    }

    /// True when the node is the plain `random` method, which sorts lists by shuffling
    pub fn is_shuffle(&self) -> bool {
        matches!(self.kind, NodeKind::Primitive(Primitive::Random))
    }

    /// True when `random` appears anywhere in the tree, so EQUAL says nothing
    /// about whether two elements are alike
    pub fn uses_random(&self) -> bool {
        match &self.kind {
            NodeKind::Primitive(primitive) => matches!(primitive, Primitive::Random),
            NodeKind::Ambiguous(ambiguous) => ambiguous.backups.uses_random(),
            NodeKind::Split(split) => split.pieces.uses_random(),
            NodeKind::Partial(partial) => partial.fields.iter().any(|field| field.methods.uses_random()),
        }
    }

    /// Compare two elements, translating them through the lookup table first
    pub fn compare(&self, a: &str, b: &str, ctx: &mut CompareContext<'_>) -> SortResult<Ordering> {
        let cmp = match &self.lookup {
            Some(table) => {
                let a = lookup_key(table.as_ref(), a)?;
                let b = lookup_key(table.as_ref(), b)?;
                self.kind.compare(a, b, ctx)?
            }
            None => self.kind.compare(a, b, ctx)?,
        };
        Ok(if self.reversed { cmp.reverse() } else { cmp })
    }
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparator")
            .field("kind", &self.kind)
            .field("lookup", &self.lookup.is_some())
            .field("reversed", &self.reversed)
            .finish()
    }
}

/// Translate an element through a lookup table
pub(crate) fn lookup_key<'t>(table: &'t dyn KeyLookup, element: &str) -> SortResult<&'t str> {
    table
        .lookup(element)
        .ok_or_else(|| SortError::missing_key(element))
}

/// The comparison a node performs
#[derive(Debug, Clone)]
pub enum NodeKind {
    Primitive(Primitive),
    Ambiguous(Ambiguous),
    Split(SplitElement),
    Partial(PartialElement),
}

impl NodeKind {
    fn compare(&self, a: &str, b: &str, ctx: &mut CompareContext<'_>) -> SortResult<Ordering> {
        match self {
            NodeKind::Primitive(primitive) => primitive.compare(a, b, ctx),
            NodeKind::Ambiguous(ambiguous) => ambiguous.compare(a, b, ctx),
            NodeKind::Split(split) => split.compare(a, b, ctx),
            NodeKind::Partial(partial) => partial.compare(a, b, ctx),
        }
    }
}

/// Ordered fallback comparators; the first non-equal result wins
#[derive(Debug, Clone)]
pub struct Chain {
    links: Vec<Comparator>,
}

impl Chain {
    pub fn new(links: Vec<Comparator>) -> Self {
        Self { links }
    }

    pub fn links(&self) -> &[Comparator] {
        &self.links
    }

    fn uses_random(&self) -> bool {
        self.links.iter().any(Comparator::uses_random)
    }

    pub fn compare(&self, a: &str, b: &str, ctx: &mut CompareContext<'_>) -> SortResult<Ordering> {
        for link in &self.links {
            match link.compare(a, b, ctx)? {
                Ordering::Equal => continue,
                other => return Ok(other),
            }
        }
        Ok(Ordering::Equal)
    }
}

/// Primary measure of an ambiguous method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmbiguousKind {
    /// Character count
    Length,
}

/// A comparison that can tie on distinct elements and then consults its backups
#[derive(Debug, Clone)]
pub struct Ambiguous {
    pub primary: AmbiguousKind,
    pub backups: Chain,
}

impl Ambiguous {
    fn compare(&self, a: &str, b: &str, ctx: &mut CompareContext<'_>) -> SortResult<Ordering> {
        let cmp = match self.primary {
            AmbiguousKind::Length => a.chars().count().cmp(&b.chars().count()),
        };
        match cmp {
            Ordering::Equal => self.backups.compare(a, b, ctx),
            other => Ok(other),
        }
    }
}

/// How elements are cut into pieces or fields
#[derive(Debug, Clone)]
pub enum Separator {
    /// Runs of whitespace; leading and trailing whitespace is ignored
    Whitespace,
    Pattern(Regex),
}

impl Separator {
    pub fn split<'t>(&self, text: &'t str) -> Vec<&'t str> {
        match self {
            Separator::Whitespace => text.split_whitespace().collect(),
            Separator::Pattern(re) => re.split(text).collect(),
        }
    }
}

/// Which end of a split element is most significant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    /// Left-most significant
    #[default]
    Lms,
    /// Right-most significant
    Rms,
}

impl Priority {
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag.to_ascii_lowercase().as_str() {
            "lms" => Some(Priority::Lms),
            "rms" => Some(Priority::Rms),
            _ => None,
        }
    }
}

/// Compares elements piece by piece after splitting them
#[derive(Debug, Clone)]
pub struct SplitElement {
    pub separator: Separator,
    pub priority: Priority,
    pub pieces: Chain,
}

impl SplitElement {
    fn compare(&self, a: &str, b: &str, ctx: &mut CompareContext<'_>) -> SortResult<Ordering> {
        let mut a_pieces = self.separator.split(a);
        let mut b_pieces = self.separator.split(b);
        if self.priority == Priority::Rms {
            a_pieces.reverse();
            b_pieces.reverse();
        }

        for pair in a_pieces.iter().zip_longest(b_pieces.iter()) {
            let cmp = match pair {
                EitherOrBoth::Both(x, y) => self.pieces.compare(x, y, ctx)?,
                // The side that runs out of pieces first is smaller
                EitherOrBoth::Left(_) => Ordering::Greater,
                EitherOrBoth::Right(_) => Ordering::Less,
            };
            if cmp != Ordering::Equal {
                return Ok(cmp);
            }
        }
        Ok(Ordering::Equal)
    }
}

/// One selected field of a partial-element comparison
#[derive(Clone)]
pub struct FieldSpec {
    pub index: usize,
    pub lookup: Option<Arc<dyn KeyLookup>>,
    pub methods: Chain,
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("index", &self.index)
            .field("lookup", &self.lookup.is_some())
            .field("methods", &self.methods)
            .finish()
    }
}

/// Compares selected fields of each element, in the order given
#[derive(Debug, Clone)]
pub struct PartialElement {
    pub separator: Separator,
    pub fields: Vec<FieldSpec>,
}

impl PartialElement {
    fn compare(&self, a: &str, b: &str, ctx: &mut CompareContext<'_>) -> SortResult<Ordering> {
        let a_fields = self.separator.split(a);
        let b_fields = self.separator.split(b);

        for field in &self.fields {
            let x = *a_fields
                .get(field.index)
                .ok_or_else(|| SortError::missing_field(field.index, a))?;
            let y = *b_fields
                .get(field.index)
                .ok_or_else(|| SortError::missing_field(field.index, b))?;

            let cmp = match &field.lookup {
                Some(table) => {
                    let x = lookup_key(table.as_ref(), x)?;
                    let y = lookup_key(table.as_ref(), y)?;
                    field.methods.compare(x, y, ctx)?
                }
                None => field.methods.compare(x, y, ctx)?,
            };
            if cmp != Ordering::Equal {
                return Ok(cmp);
            }
        }
        Ok(Ordering::Equal)
    }
}
