//! Type-aware sorting by named, composable methods
//!
//! Elements are strings; a method name such as `version`, `ip` or `domain`
//! (optionally prefixed with `rev_`) picks how two of them compare. Methods
//! compose: `length` falls back to a backup chain, `split` compares elements
//! piece by piece, and `partial` compares selected fields, each piece or
//! field with its own chain of methods.
//!
//! ```
//! use datatype_sort::{sort, MethodSpec};
//!
//! let mut hosts = vec!["b.example.org", "a.example.com", "a.example.org"];
//! sort(&mut hosts, &MethodSpec::new("domain")).unwrap();
//! assert_eq!(hosts, ["a.example.com", "a.example.org", "b.example.org"]);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]

pub mod error;
pub mod method;

// Comparators and method resolution
pub mod comparator;
pub mod date;
pub mod ip;
pub mod primitives;
pub mod registry;
pub mod resolver;
pub mod version;

// Sorting engine and command-line jobs
pub mod config;
pub mod core_sort;
pub mod job;
pub mod zero_copy;

// Re-export commonly used types
pub use comparator::{CompareContext, Comparator};
pub use config::SortConfig;
pub use core_sort::CoreSort;
pub use date::{ChronoDateParser, DateParser};
pub use error::{SortError, SortResult};
pub use job::run;
pub use method::{KeyLookup, MethodArg, MethodSpec, UserFn};
pub use registry::{is_valid_method, method_names};
pub use resolver::resolve;

use std::cmp::Ordering;

/// Exit codes of the `dtsort` binary
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const SORT_FAILURE: i32 = 2;

/// Sort `elements` in place by `method`
///
/// On error the slice is left exactly as it was.
pub fn sort<S: AsRef<str>>(elements: &mut [S], method: &MethodSpec) -> SortResult<()> {
    CoreSort::new().sort(elements, method)
}

/// Compare two elements by `method`
pub fn compare(a: &str, b: &str, method: &MethodSpec) -> SortResult<Ordering> {
    CoreSort::new().compare(a, b, method)
}
