//! Unambiguous primitive comparators
//!
//! Each primitive orders two already-resolved operands. Primitives that need
//! per-call state (only `date`) receive it through the [`CompareContext`].

use std::cmp::Ordering;

use rand::Rng;

use crate::comparator::CompareContext;
use crate::error::{SortError, SortResult, ValueKind};
use crate::method::UserFn;
use crate::{date, ip, version};

/// Leaf comparison kinds
#[derive(Debug, Clone)]
pub enum Primitive {
    Numerical,
    Alphabetic,
    Alphanumeric,
    Random,
    Version,
    Date,
    Ip,
    NoSort,
    Function(UserFn),
}

impl Primitive {
    pub fn compare(&self, a: &str, b: &str, ctx: &mut CompareContext<'_>) -> SortResult<Ordering> {
        match self {
            Primitive::Numerical => compare_numerical(a, b),
            Primitive::Alphabetic => Ok(compare_alphabetic(a, b)),
            Primitive::Alphanumeric => Ok(compare_alphanumeric(a, b)),
            Primitive::Random => Ok(compare_random()),
            Primitive::Version => Ok(version::compare_versions(a, b)),
            Primitive::Date => date::compare_dates(a, b, ctx),
            Primitive::Ip => ip::compare_ips(a, b),
            Primitive::NoSort => Ok(Ordering::Equal),
            Primitive::Function(func) => func
                .call(a, b)
                .map_err(|e| SortError::user_function(&e.to_string())),
        }
    }
}

/// Parse a number the way the numeric methods accept it
///
/// Surrounding blanks are ignored. `NaN` has no place in an ordering and is
/// rejected; infinities are accepted.
pub fn parse_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(num) if !num.is_nan() => Some(num),
        _ => None,
    }
}

/// Compare as real numbers, failing on non-numeric input
pub fn compare_numerical(a: &str, b: &str) -> SortResult<Ordering> {
    let a_num = parse_number(a).ok_or_else(|| SortError::unparsable(ValueKind::Number, a))?;
    let b_num = parse_number(b).ok_or_else(|| SortError::unparsable(ValueKind::Number, b))?;
    Ok(a_num.partial_cmp(&b_num).unwrap_or(Ordering::Equal))
}

/// Byte-lexicographic comparison of the full string
#[inline]
pub fn compare_alphabetic(a: &str, b: &str) -> Ordering {
    a.as_bytes().cmp(b.as_bytes())
}

/// Numeric when both sides are numbers, lexicographic otherwise
pub fn compare_alphanumeric(a: &str, b: &str) -> Ordering {
    match (parse_number(a), parse_number(b)) {
        (Some(a_num), Some(b_num)) => a_num.partial_cmp(&b_num).unwrap_or(Ordering::Equal),
        _ => compare_alphabetic(a, b),
    }
}

/// Independent random result per call; not antisymmetric
pub fn compare_random() -> Ordering {
    match rand::thread_rng().gen_range(0..3) {
        0 => Ordering::Less,
        1 => Ordering::Equal,
        _ => Ordering::Greater,
    }
}
