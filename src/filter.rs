//! Metadata filter algebra shared by the vector store and keyword index.
//!
//! A [`MetadataFilter`] is a small, immutable expression tree over string
//! key/value metadata: equality leaves composed with `AND`/`OR`. Both
//! stores translate the same tree into their native predicate at query
//! time, so a filter written once behaves identically against either
//! index.
//!
//! # Examples
//!
//! ```
//! use quarry::filter::MetadataFilter;
//! use std::collections::HashMap;
//!
//! let filter = MetadataFilter::equals("lang", "rust")
//!     .and(MetadataFilter::equals("kind", "guide"));
//!
//! let mut metadata = HashMap::new();
//! metadata.insert("lang".to_string(), "rust".to_string());
//! metadata.insert("kind".to_string(), "guide".to_string());
//! assert!(filter.matches(&metadata));
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A composable predicate over string key/value metadata.
///
/// Filter evaluation is a pure function of a record's metadata map: it
/// never inspects content or embeddings and has no side effects.
/// `and`/`or` build new filter values without mutating their operands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataFilter {
    /// Matches records whose metadata maps `key` to exactly `value`.
    Equals {
        /// Metadata key to look up.
        key: String,
        /// Value the key must map to.
        value: String,
    },
    /// Matches records satisfying both operands.
    And(Box<MetadataFilter>, Box<MetadataFilter>),
    /// Matches records satisfying either operand.
    Or(Box<MetadataFilter>, Box<MetadataFilter>),
}

impl MetadataFilter {
    /// Create an equality filter on a single metadata key.
    pub fn equals<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        MetadataFilter::Equals {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Combine this filter with another; both must match.
    pub fn and(self, other: MetadataFilter) -> Self {
        MetadataFilter::And(Box::new(self), Box::new(other))
    }

    /// Combine this filter with another; either may match.
    pub fn or(self, other: MetadataFilter) -> Self {
        MetadataFilter::Or(Box::new(self), Box::new(other))
    }

    /// Evaluate this filter against a metadata map.
    pub fn matches(&self, metadata: &HashMap<String, String>) -> bool {
        match self {
            MetadataFilter::Equals { key, value } => {
                metadata.get(key).map(|v| v == value).unwrap_or(false)
            }
            MetadataFilter::And(left, right) => left.matches(metadata) && right.matches(metadata),
            MetadataFilter::Or(left, right) => left.matches(metadata) || right.matches(metadata),
        }
    }

    /// Translate this filter into the stores' native predicate form.
    ///
    /// The compiled form flattens the tree into postfix instructions so a
    /// store can evaluate it per candidate record without re-walking the
    /// boxed tree. Translation is deterministic, preserves short-circuit
    /// semantics, and never drops sub-filters.
    pub fn compile(&self) -> CompiledFilter {
        let mut ops = Vec::new();
        self.compile_into(&mut ops);
        CompiledFilter { ops }
    }

    fn compile_into(&self, ops: &mut Vec<FilterOp>) {
        match self {
            MetadataFilter::Equals { key, value } => {
                ops.push(FilterOp::Equals {
                    key: key.clone(),
                    value: value.clone(),
                });
            }
            MetadataFilter::And(left, right) => {
                left.compile_into(ops);
                right.compile_into(ops);
                ops.push(FilterOp::And);
            }
            MetadataFilter::Or(left, right) => {
                left.compile_into(ops);
                right.compile_into(ops);
                ops.push(FilterOp::Or);
            }
        }
    }
}

/// One postfix instruction of a compiled filter.
#[derive(Debug, Clone)]
enum FilterOp {
    Equals { key: String, value: String },
    And,
    Or,
}

/// A [`MetadataFilter`] translated into the stores' native predicate form.
///
/// Evaluation runs the postfix instruction list over a small boolean
/// stack. Produced by [`MetadataFilter::compile`].
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    ops: Vec<FilterOp>,
}

impl CompiledFilter {
    /// Evaluate the compiled predicate against a metadata map.
    pub fn matches(&self, metadata: &HashMap<String, String>) -> bool {
        let mut stack: Vec<bool> = Vec::with_capacity(4);
        for op in &self.ops {
            match op {
                FilterOp::Equals { key, value } => {
                    stack.push(metadata.get(key).map(|v| v == value).unwrap_or(false));
                }
                FilterOp::And => {
                    let right = stack.pop().unwrap_or(false);
                    let left = stack.pop().unwrap_or(false);
                    stack.push(left && right);
                }
                FilterOp::Or => {
                    let right = stack.pop().unwrap_or(false);
                    let left = stack.pop().unwrap_or(false);
                    stack.push(left || right);
                }
            }
        }
        stack.pop().unwrap_or(true)
    }
}

/// Compile an optional filter; `None` matches everything.
pub fn compile_optional(filter: Option<&MetadataFilter>) -> Option<CompiledFilter> {
    filter.map(MetadataFilter::compile)
}

/// Evaluate an optional compiled filter; `None` matches everything.
pub fn matches_optional(compiled: Option<&CompiledFilter>, metadata: &HashMap<String, String>) -> bool {
    compiled.map(|c| c.matches(metadata)).unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_equals_filter() {
        let filter = MetadataFilter::equals("lang", "rust");

        assert!(filter.matches(&meta(&[("lang", "rust")])));
        assert!(!filter.matches(&meta(&[("lang", "go")])));
        assert!(!filter.matches(&meta(&[])));
    }

    #[test]
    fn test_and_requires_both() {
        let filter =
            MetadataFilter::equals("a", "1").and(MetadataFilter::equals("b", "x"));

        assert!(filter.matches(&meta(&[("a", "1"), ("b", "x")])));
        assert!(!filter.matches(&meta(&[("a", "1")])));
        assert!(!filter.matches(&meta(&[("b", "x")])));
    }

    #[test]
    fn test_or_accepts_either() {
        let filter =
            MetadataFilter::equals("a", "1").or(MetadataFilter::equals("b", "x"));

        assert!(filter.matches(&meta(&[("a", "1")])));
        assert!(filter.matches(&meta(&[("b", "x")])));
        assert!(!filter.matches(&meta(&[("c", "z")])));
    }

    #[test]
    fn test_nested_composition() {
        // (kind=guide AND lang=rust) OR author=jane
        let filter = MetadataFilter::equals("kind", "guide")
            .and(MetadataFilter::equals("lang", "rust"))
            .or(MetadataFilter::equals("author", "jane"));

        assert!(filter.matches(&meta(&[("kind", "guide"), ("lang", "rust")])));
        assert!(filter.matches(&meta(&[("author", "jane")])));
        assert!(!filter.matches(&meta(&[("kind", "guide"), ("lang", "go")])));
    }

    #[test]
    fn test_builders_do_not_mutate_operands() {
        let base = MetadataFilter::equals("a", "1");
        let composed = base.clone().and(MetadataFilter::equals("b", "2"));

        assert_eq!(base, MetadataFilter::equals("a", "1"));
        assert_ne!(base, composed);
    }

    #[test]
    fn test_compiled_agrees_with_tree() {
        let filter = MetadataFilter::equals("kind", "guide")
            .and(MetadataFilter::equals("lang", "rust"))
            .or(MetadataFilter::equals("author", "jane"));
        let compiled = filter.compile();

        for metadata in [
            meta(&[("kind", "guide"), ("lang", "rust")]),
            meta(&[("author", "jane")]),
            meta(&[("kind", "guide")]),
            meta(&[]),
        ] {
            assert_eq!(filter.matches(&metadata), compiled.matches(&metadata));
        }
    }

    #[test]
    fn test_absent_filter_matches_everything() {
        assert!(matches_optional(None, &meta(&[("anything", "at all")])));
        assert!(matches_optional(None, &meta(&[])));
    }
}
