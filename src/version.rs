//! Version string ordering
//!
//! A version is split on `.` into levels that are compared leftmost first.
//! Each level falls in one of three classes:
//!
//! * purely numeric (`12`), compared by value;
//! * leading digits followed by other characters (`2a`), compared by the
//!   numeric prefix first, sorting before a purely numeric level with the same
//!   value, and lexicographically against another such level;
//! * anything else (`a`, `rc1`, empty), which sorts before any level starting
//!   with a digit and lexicographically among its own kind.
//!
//! When one version runs out of levels first it is the smaller one.

use std::cmp::Ordering;

use itertools::{EitherOrBoth, Itertools};

/// Classified level of a version string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level<'a> {
    Numeric(&'a str),
    LeadingDigits { digits: &'a str, full: &'a str },
    LeadingLetter(&'a str),
}

impl<'a> Level<'a> {
    fn classify(level: &'a str) -> Self {
        let digit_count = count_leading_digits(level);
        if digit_count == 0 {
            Level::LeadingLetter(level)
        } else if digit_count == level.len() {
            Level::Numeric(level)
        } else {
            Level::LeadingDigits {
                digits: &level[..digit_count],
                full: level,
            }
        }
    }

    /// Numeric prefix of a level that starts with a digit
    fn digits(&self) -> Option<&'a str> {
        match *self {
            Level::Numeric(digits) | Level::LeadingDigits { digits, .. } => Some(digits),
            Level::LeadingLetter(_) => None,
        }
    }
}

/// Compare two version strings level by level
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    for pair in a.split('.').zip_longest(b.split('.')) {
        let cmp = match pair {
            EitherOrBoth::Both(x, y) => compare_levels(Level::classify(x), Level::classify(y)),
            EitherOrBoth::Left(_) => Ordering::Greater,
            EitherOrBoth::Right(_) => Ordering::Less,
        };
        if cmp != Ordering::Equal {
            return cmp;
        }
    }
    Ordering::Equal
}

fn compare_levels(a: Level<'_>, b: Level<'_>) -> Ordering {
    match (a, b) {
        (Level::LeadingLetter(x), Level::LeadingLetter(y)) => x.cmp(y),
        (Level::LeadingLetter(_), _) => Ordering::Less,
        (_, Level::LeadingLetter(_)) => Ordering::Greater,
        _ => {
            let (Some(x_digits), Some(y_digits)) = (a.digits(), b.digits()) else {
                return Ordering::Equal;
            };
            match compare_digit_strings(x_digits, y_digits) {
                Ordering::Equal => match (a, b) {
                    (Level::LeadingDigits { full: x, .. }, Level::LeadingDigits { full: y, .. }) => {
                        x.cmp(y)
                    }
                    (Level::LeadingDigits { .. }, Level::Numeric(_)) => Ordering::Less,
                    (Level::Numeric(_), Level::LeadingDigits { .. }) => Ordering::Greater,
                    _ => Ordering::Equal,
                },
                other => other,
            }
        }
    }
}

/// Compare unsigned digit strings by value without overflow
pub(crate) fn compare_digit_strings(a: &str, b: &str) -> Ordering {
    let a = skip_leading_zeros(a);
    let b = skip_leading_zeros(b);

    // Compare lengths first
    match a.len().cmp(&b.len()) {
        Ordering::Equal => a.cmp(b),
        other => other,
    }
}

fn skip_leading_zeros(digits: &str) -> &str {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0"
    } else {
        trimmed
    }
}

fn count_leading_digits(level: &str) -> usize {
    level.bytes().take_while(|b| b.is_ascii_digit()).count()
}
