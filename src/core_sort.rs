use crate::comparator::{CompareContext, Comparator};
use crate::date::{ChronoDateParser, DateParser};
use crate::error::SortResult;
use crate::method::MethodSpec;
use crate::resolver::resolve;
use rand::seq::SliceRandom;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Runs below this length are sorted by insertion before merging
const INSERTION_THRESHOLD: usize = 8;

/// Sort and compare engine
///
/// Each call resolves its method into a fresh comparator tree and a fresh
/// [`CompareContext`], so one engine can serve concurrent callers.
#[derive(Clone)]
pub struct CoreSort {
    date_parser: Arc<dyn DateParser>,
}

impl Default for CoreSort {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CoreSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreSort").finish_non_exhaustive()
    }
}

impl CoreSort {
    pub fn new() -> Self {
        Self {
            date_parser: Arc::new(ChronoDateParser),
        }
    }

    /// Use a different date parser for the `date` method
    pub fn with_date_parser(mut self, parser: impl DateParser + 'static) -> Self {
        self.date_parser = Arc::new(parser);
        self
    }

    /// A fresh per-call context
    pub fn context(&self) -> CompareContext<'_> {
        CompareContext::new(self.date_parser.as_ref())
    }

    /// Compare two elements by a method
    pub fn compare(&self, a: &str, b: &str, method: &MethodSpec) -> SortResult<Ordering> {
        let node = resolve(method)?;
        let mut ctx = self.context();
        node.compare(a, b, &mut ctx)
    }

    /// Sort elements in place; on error the slice is left untouched
    pub fn sort<S: AsRef<str>>(&self, elements: &mut [S], method: &MethodSpec) -> SortResult<()> {
        let node = resolve(method)?;
        tracing::debug!(method = %method, elements = elements.len(), "sorting");

        match self.sort_with(elements, &node) {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(method = %method, error = %err, "sort aborted");
                Err(err)
            }
        }
    }

    /// Sort a copy of the elements
    pub fn sorted<S: AsRef<str> + Clone>(&self, elements: &[S], method: &MethodSpec) -> SortResult<Vec<S>> {
        let mut copy = elements.to_vec();
        self.sort(&mut copy, method)?;
        Ok(copy)
    }

    /// Sort in place with an already-resolved comparator
    pub fn sort_with<S: AsRef<str>>(&self, elements: &mut [S], node: &Comparator) -> SortResult<()> {
        let order = self.sorted_order(elements, node)?;
        apply_permutation(elements, order);
        Ok(())
    }

    /// Position of the first element that is out of order, if any
    pub fn is_sorted<S: AsRef<str>>(&self, elements: &[S], method: &MethodSpec) -> SortResult<Option<usize>> {
        let node = resolve(method)?;
        let mut ctx = self.context();

        for (i, pair) in elements.windows(2).enumerate() {
            if node.compare(pair[0].as_ref(), pair[1].as_ref(), &mut ctx)? == Ordering::Greater {
                return Ok(Some(i + 1));
            }
        }
        Ok(None)
    }

    /// Drop elements that compare equal to their predecessor
    ///
    /// EQUAL from a method involving `random` is a coin toss, so those methods
    /// only drop exact repeats, wherever they appear in the list.
    pub fn dedup<S: AsRef<str>>(&self, elements: &mut Vec<S>, method: &MethodSpec) -> SortResult<()> {
        let node = resolve(method)?;

        let keep = if node.uses_random() {
            let mut seen = HashSet::with_capacity(elements.len());
            elements.iter().map(|e| seen.insert(e.as_ref())).collect::<Vec<_>>()
        } else {
            let mut ctx = self.context();
            let mut keep = Vec::with_capacity(elements.len());
            let mut last_kept: Option<usize> = None;
            for i in 0..elements.len() {
                let duplicate = match last_kept {
                    Some(prev) => {
                        node.compare(elements[prev].as_ref(), elements[i].as_ref(), &mut ctx)? == Ordering::Equal
                    }
                    None => false,
                };
                if !duplicate {
                    last_kept = Some(i);
                }
                keep.push(!duplicate);
            }
            keep
        };

        let mut flags = keep.into_iter();
        elements.retain(|_| flags.next().unwrap_or(true));
        Ok(())
    }

    /// Compute the stable sorted order as original indices
    fn sorted_order<S: AsRef<str>>(&self, elements: &[S], node: &Comparator) -> SortResult<Vec<usize>> {
        let mut order: Vec<usize> = (0..elements.len()).collect();
        let mut ctx = self.context();

        // A plain random method shuffles the list instead of comparing pairs
        if node.is_shuffle() {
            if let Some(table) = node.lookup() {
                for element in elements {
                    crate::comparator::lookup_key(table.as_ref(), element.as_ref())?;
                }
            }
            order.shuffle(&mut rand::thread_rng());
            return Ok(order);
        }

        merge_sort_by(&mut order, &mut |i, j| {
            node.compare(elements[i].as_ref(), elements[j].as_ref(), &mut ctx)
        })?;
        Ok(order)
    }
}

/// Stable bottom-up merge sort driven by a fallible comparison
///
/// Tolerates comparisons that are not a total order, such as `random`.
fn merge_sort_by<T, F>(items: &mut [T], cmp: &mut F) -> SortResult<()>
where
    T: Copy,
    F: FnMut(T, T) -> SortResult<Ordering>,
{
    let len = items.len();
    if len < 2 {
        return Ok(());
    }

    for run in items.chunks_mut(INSERTION_THRESHOLD) {
        insertion_sort_by(run, cmp)?;
    }

    let mut buffer = items.to_vec();
    let mut width = INSERTION_THRESHOLD;
    while width < len {
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            merge(&items[start..mid], &items[mid..end], &mut buffer[start..end], cmp)?;
            start = end;
        }
        items.copy_from_slice(&buffer);
        width *= 2;
    }
    Ok(())
}

/// Insertion sort for short runs
fn insertion_sort_by<T, F>(items: &mut [T], cmp: &mut F) -> SortResult<()>
where
    T: Copy,
    F: FnMut(T, T) -> SortResult<Ordering>,
{
    for i in 1..items.len() {
        let key = items[i];
        let mut j = i;

        while j > 0 {
            if cmp(items[j - 1], key)? == Ordering::Greater {
                items[j] = items[j - 1];
                j -= 1;
            } else {
                break;
            }
        }

        items[j] = key;
    }
    Ok(())
}

fn merge<T, F>(left: &[T], right: &[T], out: &mut [T], cmp: &mut F) -> SortResult<()>
where
    T: Copy,
    F: FnMut(T, T) -> SortResult<Ordering>,
{
    let (mut i, mut j) = (0, 0);
    for slot in out.iter_mut() {
        // Ties take from the left run to keep the sort stable
        let take_left = if i < left.len() && j < right.len() {
            cmp(left[i], right[j])? != Ordering::Greater
        } else {
            i < left.len()
        };

        if take_left {
            *slot = left[i];
            i += 1;
        } else {
            *slot = right[j];
            j += 1;
        }
    }
    Ok(())
}

/// Reorder so that position `k` receives the element originally at `order[k]`
fn apply_permutation<S>(elements: &mut [S], mut order: Vec<usize>) {
    for start in 0..order.len() {
        if order[start] == start {
            continue;
        }
        let mut current = start;
        loop {
            let source = order[current];
            order[current] = current;
            if source == start {
                break;
            }
            elements.swap(current, source);
            current = source;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SortError;
    use crate::method::{MethodArg, UserFn};
    use chrono::NaiveDateTime;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn sorted(list: &[&str], method: &MethodSpec) -> Vec<String> {
        let mut owned: Vec<String> = list.iter().map(|s| s.to_string()).collect();
        CoreSort::new().sort(&mut owned, method).expect("Failed to sort");
        owned
    }

    fn assert_sorts_to(expected: &[&str], method: &MethodSpec) {
        let mut shuffled: Vec<&str> = expected.to_vec();
        shuffled.reverse();
        shuffled.rotate_left(expected.len() / 2);
        assert_eq!(sorted(&shuffled, method), expected);
    }

    #[test]
    fn test_version_sort() {
        assert_sorts_to(
            &["1.a", "1.01a", "1.1a", "1.1.x", "1.2a", "1.2", "1.2.x", "1.03a"],
            &MethodSpec::new("version"),
        );
    }

    #[test]
    fn test_ip_sort() {
        assert_sorts_to(
            &["9.255.0.1", "10.20.30.40", "10.20.30.40/4", "10.20.30.40/16", "10.20.30.41"],
            &MethodSpec::new("ip"),
        );
    }

    #[test]
    fn test_path_sort() {
        assert_sorts_to(&["a/b", "a/b/c", "a/z", "aa/b", "aa/z", "b/b"], &MethodSpec::new("path"));
    }

    #[test]
    fn test_domain_sort() {
        assert_sorts_to(&["a.b", "z.b", "a.bb", "z.bb", "a.c"], &MethodSpec::new("domain"));

        let engine = CoreSort::new();
        let cmp = engine
            .compare("a..c", "a.c.d", &MethodSpec::new("domain"))
            .expect("Failed to compare");
        assert_eq!(cmp, Ordering::Less);
    }

    #[test]
    fn test_numpath_sort() {
        assert_sorts_to(&["lib/2/x", "lib/10/x", "lib/a/x"], &MethodSpec::new("numpath"));
    }

    #[test]
    fn test_split_with_sub_methods() {
        let spec = MethodSpec::new("split")
            .arg("rms")
            .arg("-")
            .with_methods(["rev_numerical"]);
        assert_sorts_to(&["1-30", "5-10", "2-10", "9-2"], &spec);
    }

    #[test]
    fn test_partial_sort() {
        let rows = ["2010-01-30 Smith John", "2010-01-30 Smith Adam"];
        let spec = MethodSpec::new("partial").arg(2usize);
        assert_eq!(
            sorted(&rows, &spec),
            vec!["2010-01-30 Smith Adam", "2010-01-30 Smith John"]
        );

        let spec = MethodSpec::new("partial").arg(0usize).with_methods(["date"]).arg(1usize);
        assert_eq!(sorted(&rows, &spec), rows);
    }

    #[test]
    fn test_partial_field_priority() {
        let rows = ["b 2", "a 10", "a 9"];
        let spec = MethodSpec::new("partial")
            .arg(0usize)
            .arg(1usize)
            .with_methods(["numerical"]);
        assert_eq!(sorted(&rows, &spec), vec!["a 9", "a 10", "b 2"]);

        let spec = MethodSpec::new("partial")
            .arg(1usize)
            .with_methods(["rev_numerical"])
            .arg(0usize);
        assert_eq!(sorted(&rows, &spec), vec!["a 10", "a 9", "b 2"]);
    }

    #[test]
    fn test_line_aliases() {
        let rows = ["x:10", "y:9", "z:100"];
        assert_eq!(
            sorted(&rows, &MethodSpec::new("numline").arg(1usize).arg(":")),
            vec!["y:9", "x:10", "z:100"]
        );
        assert_eq!(
            sorted(&rows, &MethodSpec::new("line").arg(1usize).arg(":")),
            vec!["x:10", "z:100", "y:9"]
        );
    }

    #[test]
    fn test_length_with_backups() {
        let spec = MethodSpec::new("length").with_methods(["rev_alphabetic"]);
        assert_eq!(sorted(&["bb", "a", "aa", "ccc"], &spec), vec!["a", "bb", "aa", "ccc"]);
    }

    #[test]
    fn test_stability_with_nosort() {
        let list = ["delta", "alpha", "charlie", "bravo"];
        assert_eq!(sorted(&list, &MethodSpec::new("nosort")), list);

        let spec = MethodSpec::new("length").with_methods(["nosort"]);
        assert_eq!(
            sorted(&["dd", "b", "cc", "a", "aa"], &spec),
            vec!["b", "a", "dd", "cc", "aa"]
        );
    }

    #[test]
    fn test_stability_across_merge_runs() {
        let list: Vec<String> = (0..50).map(|i| format!("{}:{i}", i % 3)).collect();
        let spec = MethodSpec::new("line").arg(0usize).arg(":");
        let mut result = list.clone();
        CoreSort::new().sort(&mut result, &spec).expect("Failed to sort");

        for pair in result.windows(2) {
            let key = |s: &str| s.split(':').map(str::to_string).collect::<Vec<_>>();
            let (a, b) = (key(&pair[0]), key(&pair[1]));
            if a[0] == b[0] {
                let (x, y): (usize, usize) = (a[1].parse().unwrap(), b[1].parse().unwrap());
                assert!(x < y, "{pair:?} lost input order");
            }
        }
    }

    #[test]
    fn test_idempotence() {
        let spec = MethodSpec::new("version");
        let once = sorted(&["2.0", "1.10", "1.9", "1.9a"], &spec);
        let refs: Vec<&str> = once.iter().map(String::as_str).collect();
        assert_eq!(sorted(&refs, &spec), once);
    }

    #[test]
    fn test_lookup_sort() {
        let table: HashMap<&str, &str> = [("low", "1"), ("mid", "5"), ("high", "10")].into_iter().collect();
        let spec = MethodSpec::new("numerical").with_lookup(table.clone());
        assert_eq!(sorted(&["high", "low", "mid"], &spec), vec!["low", "mid", "high"]);

        let mut list = vec!["high", "unknown", "low"];
        let err = CoreSort::new()
            .sort(&mut list, &MethodSpec::new("numerical").with_lookup(table))
            .unwrap_err();
        assert!(matches!(err, SortError::MissingKey { ref key } if key == "unknown"));
        assert_eq!(list, vec!["high", "unknown", "low"]);
    }

    #[test]
    fn test_partial_field_lookup() {
        let owners: HashMap<&str, &str> = [("u1", "zed"), ("u2", "amy")].into_iter().collect();
        let spec = MethodSpec::new("partial").arg(1usize).with_lookup(owners);
        assert_eq!(sorted(&["f1 u1", "f2 u2"], &spec), vec!["f2 u2", "f1 u1"]);
    }

    #[test]
    fn test_failed_sort_leaves_input() {
        let mut list = vec!["3", "1", "two", "0"];
        let err = CoreSort::new()
            .sort(&mut list, &MethodSpec::new("numerical"))
            .unwrap_err();
        assert!(matches!(err, SortError::Unparsable { .. }));
        assert_eq!(list, vec!["3", "1", "two", "0"]);

        let mut rows = vec!["a b", "a"];
        let err = CoreSort::new()
            .sort(&mut rows, &MethodSpec::new("partial").arg(1usize))
            .unwrap_err();
        assert!(matches!(err, SortError::MissingField { .. }));
        assert_eq!(rows, vec!["a b", "a"]);
    }

    #[test]
    fn test_invalid_method_never_falls_back() {
        let mut list = vec!["b", "a"];
        let err = CoreSort::new().sort(&mut list, &MethodSpec::new("alphabetical")).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(list, vec!["b", "a"]);
    }

    #[test]
    fn test_user_function() {
        let by_last_char = UserFn::new(|a, b| Ok(a.chars().last().cmp(&b.chars().last())));
        let spec = MethodSpec::new("function").arg(by_last_char);
        assert_eq!(sorted(&["ab", "ba", "cc"], &spec), vec!["ba", "ab", "cc"]);

        let failing = UserFn::new(|_, _| Err("boom".into()));
        let mut list = vec!["x", "y"];
        let err = CoreSort::new()
            .sort(&mut list, &MethodSpec::new("function").arg(MethodArg::Function(failing)))
            .unwrap_err();
        assert!(matches!(err, SortError::UserFunction { ref message } if message == "boom"));
    }

    #[test]
    fn test_random_shuffle_is_permutation() {
        let list: Vec<String> = (0..40).map(|i| i.to_string()).collect();
        let engine = CoreSort::new();

        let shuffled = engine.sorted(&list, &MethodSpec::new("random")).expect("Failed to shuffle");
        let mut restored = shuffled.clone();
        restored.sort();
        let mut expected = list.clone();
        expected.sort();
        assert_eq!(restored, expected);
    }

    #[test]
    fn test_random_comparator_inside_tree_does_not_panic() {
        let list: Vec<String> = (0..100).map(|i| format!("{:02}", i % 10)).collect();
        let spec = MethodSpec::new("length").with_methods(["random"]);
        let result = CoreSort::new().sorted(&list, &spec).expect("Failed to sort");
        assert_eq!(result.len(), list.len());
    }

    struct CountingParser {
        calls: AtomicUsize,
    }

    impl DateParser for CountingParser {
        fn parse(&self, value: &str) -> Option<NaiveDateTime> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            ChronoDateParser.parse(value)
        }
    }

    #[test]
    fn test_date_cache_is_per_call() {
        let counter = Arc::new(CountingParser {
            calls: AtomicUsize::new(0),
        });
        let engine = CoreSort {
            date_parser: counter.clone(),
        };
        let list = ["2003-05-01", "2001-01-01", "2002-07-04", "2001-01-01"];
        let spec = MethodSpec::new("date");

        let once = engine.sorted(&list, &spec).expect("Failed to sort");
        assert_eq!(once, vec!["2001-01-01", "2001-01-01", "2002-07-04", "2003-05-01"]);
        assert_eq!(counter.calls.load(AtomicOrdering::SeqCst), 3);

        engine.sorted(&list, &spec).expect("Failed to sort");
        assert_eq!(counter.calls.load(AtomicOrdering::SeqCst), 6);
    }

    #[test]
    fn test_is_sorted_and_dedup() {
        let engine = CoreSort::new();
        let spec = MethodSpec::new("numerical");
        assert_eq!(engine.is_sorted(&["1", "2", "2", "10"], &spec).unwrap(), None);
        assert_eq!(engine.is_sorted(&["1", "10", "2"], &spec).unwrap(), Some(2));

        let mut list = vec!["1", "1.0", "2", "02", "3"];
        engine.dedup(&mut list, &spec).expect("Failed to dedup");
        assert_eq!(list, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_dedup_with_random_keeps_distinct_lines() {
        let engine = CoreSort::new();
        let list: Vec<String> = (0..20).map(|i| format!("line{i}")).collect();

        for method in [MethodSpec::new("random"), MethodSpec::new("length").with_methods(["random"])] {
            for _ in 0..20 {
                let mut out = engine.sorted(&list, &method).expect("Failed to sort");
                engine.dedup(&mut out, &method).expect("Failed to dedup");
                assert_eq!(out.len(), list.len(), "{method}");
            }
        }

        let mut repeats = vec!["a", "b", "a", "a"];
        engine.dedup(&mut repeats, &MethodSpec::new("random")).unwrap();
        assert_eq!(repeats, vec!["a", "b"]);
    }

    #[test]
    fn test_apply_permutation() {
        let mut items = vec!['a', 'b', 'c', 'd', 'e'];
        apply_permutation(&mut items, vec![3, 0, 4, 1, 2]);
        assert_eq!(items, vec!['d', 'a', 'e', 'b', 'c']);
    }

    fn compare(a: &str, b: &str, method: &str) -> Ordering {
        CoreSort::new()
            .compare(a, b, &MethodSpec::new(method))
            .expect("Failed to compare")
    }

    const DETERMINISTIC: &[&str] = &[
        "alphabetic",
        "alphanumeric",
        "version",
        "length",
        "path",
        "domain",
        "numpath",
        "split",
        "nosort",
    ];

    fn compare_with(a: &str, b: &str, method: &MethodSpec) -> Ordering {
        CoreSort::new().compare(a, b, method).expect("Failed to compare")
    }

    /// Antisymmetry and reverse consistency for one pair
    fn check_symmetric(a: &str, b: &str, method: &MethodSpec) -> Result<(), TestCaseError> {
        let forward = compare_with(a, b, method);
        prop_assert_eq!(forward, compare_with(b, a, method).reverse(), "{}", method);
        let reversed = method.clone().reverse();
        prop_assert_eq!(compare_with(a, b, &reversed), forward.reverse(), "{}", reversed);
        Ok(())
    }

    fn number() -> impl Strategy<Value = String> {
        (-500i32..500, 0u8..4).prop_map(|(whole, frac)| format!("{whole}.{frac}"))
    }

    fn address() -> impl Strategy<Value = String> {
        (0u8..3, 0u16..300, proptest::option::of(0u8..=32)).prop_map(|(x, y, mask)| {
            let host = format!("10.{x}.{}.{}", y / 256, y % 256);
            match mask {
                Some(m) => format!("{host}/{m}"),
                None => host,
            }
        })
    }

    fn day() -> impl Strategy<Value = String> {
        (1999i32..2002, 1u32..=12, 1u32..=28, proptest::option::of(0u32..24))
            .prop_map(|(y, m, d, hour)| match hour {
                Some(h) => format!("{y}-{m:02}-{d:02} {h:02}:00:00"),
                None => format!("{y}-{m:02}-{d:02}"),
            })
    }

    proptest! {
        #[test]
        fn prop_typed_leaves_are_symmetric(x in number(), y in number(),
                                           ip_a in address(), ip_b in address(),
                                           day_a in day(), day_b in day()) {
            check_symmetric(&x, &y, &MethodSpec::new("numerical"))?;
            check_symmetric(&ip_a, &ip_b, &MethodSpec::new("ip"))?;
            check_symmetric(&day_a, &day_b, &MethodSpec::new("date"))?;
        }

        #[test]
        fn prop_field_methods_are_symmetric(x in number(), y in number(),
                                            word_a in "[a-c]{1,3}", word_b in "[a-c]{1,3}") {
            let (row_a, row_b) = (format!("{word_a} {x}"), format!("{word_b} {y}"));
            let partial = MethodSpec::new("partial")
                .arg(1usize)
                .with_methods(["rev_numerical"])
                .arg(0usize);
            check_symmetric(&row_a, &row_b, &partial)?;

            let (line_a, line_b) = (format!("{x}:{word_a}"), format!("{y}:{word_b}"));
            check_symmetric(&line_a, &line_b, &MethodSpec::new("numline").arg(0usize).arg(":"))?;
            check_symmetric(&line_a, &line_b, &MethodSpec::new("line").arg(1usize).arg(":"))?;
        }

        #[test]
        fn prop_antisymmetry(a in "[a-c0-9./ ]{0,8}", b in "[a-c0-9./ ]{0,8}") {
            for method in DETERMINISTIC {
                prop_assert_eq!(compare(&a, &b, method), compare(&b, &a, method).reverse(), "{}", method);
            }
        }

        #[test]
        fn prop_reverse_consistency(a in "[a-c0-9./ ]{0,8}", b in "[a-c0-9./ ]{0,8}") {
            for method in DETERMINISTIC {
                let reversed = format!("rev_{method}");
                prop_assert_eq!(compare(&a, &b, &reversed), compare(&a, &b, method).reverse(), "{}", method);
            }
        }

        #[test]
        fn prop_ip_antisymmetry(a in (0u8..4, 0u8..4, proptest::option::of(0u8..=32)),
                                b in (0u8..4, 0u8..4, proptest::option::of(0u8..=32))) {
            let render = |(x, y, mask): (u8, u8, Option<u8>)| match mask {
                Some(m) => format!("10.{x}.0.{y}/{m}"),
                None => format!("10.{x}.0.{y}"),
            };
            let (a, b) = (render(a), render(b));
            prop_assert_eq!(compare(&a, &b, "ip"), compare(&b, &a, "ip").reverse());
        }

        #[test]
        fn prop_sort_is_idempotent(list in proptest::collection::vec("[0-9]{1,2}(\\.[0-9a]{1,2}){0,2}", 0..20)) {
            let engine = CoreSort::new();
            let spec = MethodSpec::new("version");
            let once = engine.sorted(&list, &spec).unwrap();
            let twice = engine.sorted(&once, &spec).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
