//! Subtype-tag computation over the inheritance DAG.
//!
//! Every class gets an `i32` tag: reserved values for the root and the
//! hijacked boxes, then a preorder DFS numbering for the rest. Because the
//! numbering is preorder, the descendant set of a class covers few intervals
//! of the tag space, so a subtype test compiles down to a handful of range
//! comparisons or, past a threshold, one indexed lookup.

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::errors::EmitterError;
use crate::ir::definitions::RESERVED_TYPE_TAGS;
use crate::ir::LinkingUnit;

/// Tags, per-class descendant intervals, and the materialization policy for
/// one run. Recomputed from scratch each run.
#[derive(Debug, Default)]
pub struct TypeTags {
    tags: FxHashMap<String, i32>,
    intervals: FxHashMap<String, Vec<(i32, i32)>>,
    needs_array: FxHashSet<String>,
}

impl TypeTags {
    /// Assigns one tag per class and derives the interval lists.
    pub fn compute(unit: &LinkingUnit) -> Result<TypeTags, EmitterError> {
        let present: FxHashSet<&str> =
            unit.classes.iter().map(|c| c.encoded_name.as_str()).collect();

        let mut children: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
        let mut stack: VecDeque<&str> = VecDeque::new();
        for class in &unit.classes {
            match &class.super_class {
                Some(sup) if present.contains(sup.as_str()) => {
                    children
                        .entry(sup.as_str())
                        .or_default()
                        .push(class.encoded_name.as_str());
                }
                // Roots and orphans seed the traversal in unit order.
                _ => stack.push_back(class.encoded_name.as_str()),
            }
        }

        let mut next_tag = RESERVED_TYPE_TAGS.values().copied().max().unwrap_or(0) + 1;
        let mut tags: FxHashMap<String, i32> = FxHashMap::default();
        while let Some(name) = stack.pop_front() {
            let tag = match RESERVED_TYPE_TAGS.get(name) {
                Some(&reserved) => reserved,
                None => {
                    let tag = next_tag;
                    next_tag += 1;
                    tag
                }
            };
            if tags.insert(name.to_owned(), tag).is_some() {
                return Err(EmitterError::InvalidInput(format!(
                    "class {name} visited twice during tag assignment"
                )));
            }
            if let Some(kids) = children.get(name) {
                for kid in kids.iter().rev() {
                    stack.push_front(kid);
                }
            }
        }

        if tags.len() != unit.classes.len() {
            return Err(EmitterError::InvalidInput(
                "tag assignment did not cover the linking unit".to_string(),
            ));
        }

        let mut subtype_tags: FxHashMap<&str, Vec<i32>> = FxHashMap::default();
        for class in &unit.classes {
            let tag = tags[&class.encoded_name];
            for ancestor in &class.ancestors {
                subtype_tags.entry(ancestor.as_str()).or_default().push(tag);
            }
        }

        let mut intervals = FxHashMap::default();
        let mut needs_array = FxHashSet::default();
        for (name, mut class_tags) in subtype_tags {
            class_tags.sort_unstable();
            class_tags.dedup();
            let merged = merge_intervals(&class_tags);
            if ncomparisons(&merged) > 5 {
                needs_array.insert(name.to_owned());
            }
            intervals.insert(name.to_owned(), merged);
        }

        Ok(TypeTags {
            tags,
            intervals,
            needs_array,
        })
    }

    pub fn tag_of(&self, class_name: &str) -> Option<i32> {
        self.tags.get(class_name).copied()
    }

    /// The maximally merged, strictly ordered descendant intervals.
    pub fn intervals_of(&self, class_name: &str) -> &[(i32, i32)] {
        self.intervals
            .get(class_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether the subtype test should be a materialized array lookup rather
    /// than inline comparisons.
    pub fn needs_subtype_array(&self, class_name: &str) -> bool {
        self.needs_array.contains(class_name)
    }
}

fn merge_intervals(sorted_tags: &[i32]) -> Vec<(i32, i32)> {
    let mut merged: Vec<(i32, i32)> = Vec::new();
    for &tag in sorted_tags {
        match merged.last_mut() {
            Some((_, hi)) if *hi + 1 == tag => *hi = tag,
            _ => merged.push((tag, tag)),
        }
    }
    merged
}

fn ncomparisons(intervals: &[(i32, i32)]) -> usize {
    intervals
        .iter()
        .map(|(lo, hi)| if lo == hi { 1 } else { 2 })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::definitions::{OBJECT_CLASS, RESERVED_TYPE_TAGS};
    use crate::ir::{ClassKind, LinkedClass};

    fn class(name: &str, sup: Option<&str>, ancestors: &[&str]) -> LinkedClass {
        LinkedClass {
            encoded_name: name.to_string(),
            original_name: None,
            kind: ClassKind::Class,
            super_class: sup.map(str::to_owned),
            ancestors: ancestors.iter().map(|s| s.to_string()).collect(),
            js_name: None,
            fields: vec![],
            static_methods: vec![],
            member_methods: vec![],
            exported_members: vec![],
            class_exports: vec![],
            has_instances: true,
            has_instance_tests: false,
            has_runtime_type_info: false,
            version: None,
        }
    }

    fn first_free_tag() -> i32 {
        RESERVED_TYPE_TAGS.values().copied().max().unwrap_or(0) + 1
    }

    /// Chain A < B < C < D with sibling E < B.
    fn chain_unit() -> LinkingUnit {
        LinkingUnit::new(vec![
            class("A", None, &["A"]),
            class("B", Some("A"), &["B", "A"]),
            class("C", Some("B"), &["C", "B", "A"]),
            class("D", Some("C"), &["D", "C", "B", "A"]),
            class("E", Some("B"), &["E", "B", "A"]),
        ])
    }

    #[test]
    fn preorder_assignment() {
        let tags = TypeTags::compute(&chain_unit()).unwrap();
        let base = first_free_tag();
        assert_eq!(tags.tag_of("A"), Some(base));
        assert_eq!(tags.tag_of("B"), Some(base + 1));
        assert_eq!(tags.tag_of("C"), Some(base + 2));
        assert_eq!(tags.tag_of("D"), Some(base + 3));
        assert_eq!(tags.tag_of("E"), Some(base + 4));
    }

    #[test]
    fn descendants_form_one_interval() {
        let tags = TypeTags::compute(&chain_unit()).unwrap();
        let base = first_free_tag();
        assert_eq!(tags.intervals_of("B"), &[(base + 1, base + 4)]);
        assert!(!tags.needs_subtype_array("B"));
        assert_eq!(tags.intervals_of("D"), &[(base + 3, base + 3)]);
    }

    #[test]
    fn reserved_tags_are_honored() {
        let unit = LinkingUnit::new(vec![
            class(OBJECT_CLASS, None, &[OBJECT_CLASS]),
            class("Foo", Some(OBJECT_CLASS), &["Foo", OBJECT_CLASS]),
        ]);
        let tags = TypeTags::compute(&unit).unwrap();
        assert_eq!(tags.tag_of(OBJECT_CLASS), Some(1));
        // Reserved tags do not consume DFS numbers.
        assert_eq!(tags.tag_of("Foo"), Some(first_free_tag()));
    }

    #[test]
    fn orphans_are_tagged() {
        let unit = LinkingUnit::new(vec![class("Foo", Some("Missing"), &["Foo"])]);
        let tags = TypeTags::compute(&unit).unwrap();
        assert!(tags.tag_of("Foo").is_some());
    }

    #[test]
    fn tags_are_total_and_unique() {
        let tags = TypeTags::compute(&chain_unit()).unwrap();
        let mut seen = FxHashSet::default();
        for name in ["A", "B", "C", "D", "E"] {
            let tag = tags.tag_of(name).expect("every class is tagged");
            assert!(seen.insert(tag), "tag {tag} assigned twice");
        }
    }

    #[test]
    fn interval_minimality() {
        // Two separate subtrees under A: B(+children) and F, with a gap
        // created by ordering.
        let unit = LinkingUnit::new(vec![
            class("A", None, &["A"]),
            class("B", Some("A"), &["B", "A"]),
            class("C", Some("B"), &["C", "B", "A"]),
            class("F", Some("A"), &["F", "A"]),
            class("G", Some("F"), &["G", "F", "A"]),
        ]);
        let tags = TypeTags::compute(&unit).unwrap();
        for name in ["A", "B", "F"] {
            let intervals = tags.intervals_of(name);
            for pair in intervals.windows(2) {
                assert!(
                    pair[0].1 + 1 < pair[1].0,
                    "adjacent intervals must have been merged: {intervals:?}"
                );
            }
        }
        // A covers its whole subtree contiguously.
        let base = first_free_tag();
        assert_eq!(tags.intervals_of("A"), &[(base, base + 4)]);
    }

    #[test]
    fn subtype_array_threshold() {
        // Preorder keeps superclass subtrees contiguous, so fragmentation
        // comes from interfaces: every second subclass of R implements I,
        // scattering I's descendant tags into singletons.
        let mut classes = vec![class("R", None, &["R"])];
        for i in 0..12 {
            let name = format!("A{i}");
            let mut ancestors = vec![name.clone(), "R".to_string()];
            if i % 2 == 0 {
                ancestors.push("I".to_string());
            }
            classes.push(LinkedClass {
                ancestors,
                ..class(&name, Some("R"), &[])
            });
        }
        classes.push(class("I", None, &["I"]));
        let tags = TypeTags::compute(&LinkingUnit::new(classes)).unwrap();

        let intervals = tags.intervals_of("I");
        assert!(
            intervals.len() > 5,
            "expected fragmented intervals, got {intervals:?}"
        );
        assert!(tags.needs_subtype_array("I"));
        assert!(!tags.needs_subtype_array("R"));
    }
}
