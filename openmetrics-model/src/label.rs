use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::slice::Iter;
use std::sync::Arc;

use crate::error::MetricsError;

/// A single name/value pair.
///
/// Label names must match `[a-zA-Z_][a-zA-Z0-9_]*` and must not start with
/// `__`, which is reserved for system labels. Values are arbitrary UTF-8.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    name: String,
    value: String,
}

impl Label {
    /// Creates a label, validating the name.
    pub fn new<N, V>(name: N, value: V) -> Result<Label, MetricsError>
    where
        N: Into<String>,
        V: Into<String>,
    {
        let name = name.into();
        validate_label_name(&name)?;
        Ok(Label { name, value: value.into() })
    }

    /// Name of this label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of this label.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// An ordered, immutable set of labels.
///
/// Labels are sorted ascending by name and unique by name. The hash of the
/// full tuple is computed once at construction, so `Labels` can be used as a
/// hot-path map key without rehashing.
#[derive(Clone, Debug)]
pub struct Labels {
    inner: Arc<LabelsInner>,
}

#[derive(Debug)]
struct LabelsInner {
    pairs: Vec<Label>,
    hash: u64,
}

impl Labels {
    /// The empty label set.
    pub fn empty() -> Labels {
        Labels::from_pairs(Vec::new())
    }

    /// Creates a label set from name/value pairs.
    ///
    /// Pairs are sorted by name; duplicate names fail with
    /// [`MetricsError::InvalidArgument`].
    pub fn new<I, N, V>(pairs: I) -> Result<Labels, MetricsError>
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<String>,
    {
        let mut labels = Vec::new();
        for (name, value) in pairs {
            labels.push(Label::new(name, value)?);
        }
        labels.sort();
        for window in labels.windows(2) {
            if window[0].name == window[1].name {
                return Err(MetricsError::InvalidArgument(format!(
                    "duplicate label name: {}",
                    window[0].name
                )));
            }
        }
        Ok(Labels::from_pairs(labels))
    }

    /// Creates a label set from a flat `name, value, name, value, ...` slice.
    pub fn of(pairs: &[&str]) -> Result<Labels, MetricsError> {
        if pairs.len() % 2 != 0 {
            return Err(MetricsError::InvalidArgument(
                "expected an even number of strings (name/value pairs)".to_string(),
            ));
        }
        Labels::new(pairs.chunks(2).map(|pair| (pair[0], pair[1])))
    }

    // Callers must pass pairs that are already sorted and unique.
    fn from_pairs(pairs: Vec<Label>) -> Labels {
        let mut hasher = DefaultHasher::new();
        pairs.hash(&mut hasher);
        let hash = hasher.finish();
        Labels { inner: Arc::new(LabelsInner { pairs, hash }) }
    }

    /// Merges two label sets, failing on a shared name.
    pub fn merge(&self, other: &Labels) -> Result<Labels, MetricsError> {
        if other.is_empty() {
            return Ok(self.clone());
        }
        if self.is_empty() {
            return Ok(other.clone());
        }
        let mut pairs = self.inner.pairs.clone();
        pairs.extend(other.inner.pairs.iter().cloned());
        pairs.sort();
        for window in pairs.windows(2) {
            if window[0].name == window[1].name {
                return Err(MetricsError::InvalidArgument(format!(
                    "duplicate label name: {}",
                    window[0].name
                )));
            }
        }
        Ok(Labels::from_pairs(pairs))
    }

    /// Gets the value for `name`, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .pairs
            .binary_search_by(|label| label.name.as_str().cmp(name))
            .ok()
            .map(|idx| self.inner.pairs[idx].value())
    }

    /// Whether a label with `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.inner.pairs.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.pairs.is_empty()
    }

    /// Iterates labels in ascending name order.
    pub fn iter(&self) -> Iter<'_, Label> {
        self.inner.pairs.iter()
    }
}

impl PartialEq for Labels {
    fn eq(&self, other: &Self) -> bool {
        self.inner.hash == other.inner.hash && self.inner.pairs == other.inner.pairs
    }
}

impl Eq for Labels {}

impl Hash for Labels {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.inner.hash);
    }
}

impl PartialOrd for Labels {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Labels {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.pairs.cmp(&other.inner.pairs)
    }
}

impl<'a> IntoIterator for &'a Labels {
    type Item = &'a Label;
    type IntoIter = Iter<'a, Label>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Checks a label name against `[a-zA-Z_][a-zA-Z0-9_]*`, rejecting the
/// reserved `__` prefix.
pub fn validate_label_name(name: &str) -> Result<(), MetricsError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) => {
            (c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if !valid {
        return Err(MetricsError::InvalidName(format!("invalid label name: {}", name)));
    }
    if name.starts_with("__") {
        return Err(MetricsError::InvalidName(format!(
            "label name {} is reserved (names starting with __ are for system use)",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{validate_label_name, Labels};

    #[test]
    fn test_sorted_on_construction() {
        let labels = Labels::of(&["status", "200", "path", "/hello"]).unwrap();
        let names: Vec<&str> = labels.iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["path", "status"]);
        assert_eq!(labels.get("status"), Some("200"));
        assert_eq!(labels.get("missing"), None);
    }

    #[test]
    fn test_equality_is_structural() {
        let a = Labels::of(&["a", "1", "b", "2"]).unwrap();
        let b = Labels::of(&["b", "2", "a", "1"]).unwrap();
        assert_eq!(a, b);

        let mut map = HashMap::new();
        map.insert(a, 42);
        assert_eq!(map.get(&b), Some(&42));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        assert!(Labels::of(&["a", "1", "a", "2"]).is_err());

        let left = Labels::of(&["a", "1"]).unwrap();
        let right = Labels::of(&["a", "2"]).unwrap();
        assert!(left.merge(&right).is_err());
    }

    #[test]
    fn test_merge() {
        let left = Labels::of(&["env", "prod"]).unwrap();
        let right = Labels::of(&["path", "/hello", "status", "200"]).unwrap();
        let merged = left.merge(&right).unwrap();
        let names: Vec<&str> = merged.iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["env", "path", "status"]);

        assert_eq!(left.merge(&Labels::empty()).unwrap(), left);
        assert_eq!(Labels::empty().merge(&left).unwrap(), left);
    }

    #[test]
    fn test_label_name_validation() {
        assert!(validate_label_name("status").is_ok());
        assert!(validate_label_name("_private").is_ok());
        assert!(validate_label_name("a1_b2").is_ok());

        assert!(validate_label_name("").is_err());
        assert!(validate_label_name("1status").is_err());
        assert!(validate_label_name("http.status").is_err());
        assert!(validate_label_name("__reserved").is_err());
    }

    #[test]
    fn test_ordering_by_tuple() {
        let a = Labels::of(&["path", "/a"]).unwrap();
        let b = Labels::of(&["path", "/b"]).unwrap();
        let c = Labels::of(&["path", "/a", "status", "200"]).unwrap();
        assert!(a < b);
        assert!(a < c);
    }

    mod properties {
        use proptest::prelude::*;

        use super::super::Labels;

        fn arbitrary_pairs() -> impl Strategy<Value = Vec<(String, String)>> {
            // Distinct valid names with arbitrary values.
            prop::collection::btree_map("[a-z][a-z0-9_]{0,12}", ".*", 0..8)
                .prop_map(|map| map.into_iter().collect())
        }

        proptest! {
            // Rebuilding a label set from its own pairs round-trips, in any
            // input order.
            #[test]
            fn round_trip(mut pairs in arbitrary_pairs()) {
                let labels = Labels::new(pairs.clone()).unwrap();
                pairs.reverse();
                let reversed = Labels::new(pairs).unwrap();
                prop_assert_eq!(&labels, &reversed);

                let rebuilt = Labels::new(
                    labels.iter().map(|l| (l.name().to_string(), l.value().to_string())),
                )
                .unwrap();
                prop_assert_eq!(&labels, &rebuilt);
            }

            // Iteration order is always sorted ascending by name.
            #[test]
            fn iteration_is_sorted(pairs in arbitrary_pairs()) {
                let labels = Labels::new(pairs).unwrap();
                let names: Vec<&str> = labels.iter().map(|l| l.name()).collect();
                let mut sorted = names.clone();
                sorted.sort();
                prop_assert_eq!(names, sorted);
            }
        }
    }
}
