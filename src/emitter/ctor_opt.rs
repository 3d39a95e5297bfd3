//! Cross-run tracking of the JS-constructor optimization.
//!
//! A class is a candidate when its constructor can be fused into the emitted
//! JS constructor. Call sites desugar differently depending on the callee's
//! candidacy, so every query is recorded; when a class's candidacy flips
//! between runs, the recorded callers are invalidated before the caches are
//! consulted again.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ir::definitions::is_constructor_name;
use crate::ir::{ClassKind, LinkedClass, LinkingUnit};

/// Identifies the method whose desugaring asked a ctor-opt question.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub class_name: String,
    pub method_name: String,
    pub is_static: bool,
}

impl MethodRef {
    pub fn new(class_name: impl Into<String>, method_name: impl Into<String>, is_static: bool) -> Self {
        MethodRef {
            class_name: class_name.into(),
            method_name: method_name.into(),
            is_static,
        }
    }
}

/// Sentinel method names routing invalidation to one-shot class slots
/// instead of method caches.
pub(crate) const CONSTRUCTOR_EXPORT_SENTINEL: &str = "ConstructorExportDef";
pub(crate) const EXPORTED_MEMBER_SENTINEL: &str = "ExportedMember";
pub(crate) const MODULE_ACCESSOR_SENTINEL: &str = "ModuleAccessor";

/// Whether the emitter fuses this class's constructor into the JS ctor.
pub(crate) fn candidate_for_js_ctor_opt(class: &LinkedClass) -> bool {
    matches!(class.kind, ClassKind::Class | ClassKind::ModuleClass)
        && class.has_instances
        && class
            .member_methods
            .iter()
            .filter(|m| is_constructor_name(&m.name))
            .count()
            == 1
}

#[derive(Debug, Default)]
pub(crate) struct CtorOptTracker {
    current: FxHashSet<String>,
    last: FxHashSet<String>,
    /// class name → methods desugared under an assumption about it.
    dependees: FxHashMap<String, FxHashSet<MethodRef>>,
}

impl CtorOptTracker {
    /// Computes the run's candidate set and invalidates every recorded
    /// caller of a class whose candidacy changed since the previous run.
    pub(crate) fn begin_run(&mut self, unit: &LinkingUnit, mut invalidate: impl FnMut(&MethodRef)) {
        self.current = unit
            .classes
            .iter()
            .filter(|c| candidate_for_js_ctor_opt(c))
            .map(|c| c.encoded_name.clone())
            .collect();
        let changed: FxHashSet<&String> =
            self.last.symmetric_difference(&self.current).collect();
        if changed.is_empty() {
            return;
        }
        let changed: FxHashSet<String> = changed.into_iter().cloned().collect();
        self.dependees.retain(|class_name, callers| {
            if changed.contains(class_name) {
                for caller in callers.iter() {
                    invalidate(caller);
                }
                false
            } else {
                true
            }
        });
    }

    /// Promotes the current set to "last".
    pub(crate) fn end_run(&mut self) {
        self.last = std::mem::take(&mut self.current);
    }

    /// Answers the candidacy question for `target` and records that `caller`
    /// depends on the answer.
    pub(crate) fn uses_js_constructor_opt(&mut self, target: &str, caller: &MethodRef) -> bool {
        self.dependees
            .entry(target.to_owned())
            .or_default()
            .insert(caller.clone());
        self.current.contains(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Expr, MethodDef};

    fn class(name: &str, ctors: usize) -> LinkedClass {
        LinkedClass {
            encoded_name: name.to_string(),
            original_name: None,
            kind: ClassKind::Class,
            super_class: None,
            ancestors: vec![name.to_string()],
            js_name: None,
            fields: vec![],
            static_methods: vec![],
            member_methods: (0..ctors)
                .map(|i| MethodDef {
                    name: format!("init___{i}"),
                    params: vec![],
                    body: Expr::Skip,
                    version: Some("v".to_string()),
                })
                .collect(),
            exported_members: vec![],
            class_exports: vec![],
            has_instances: true,
            has_instance_tests: false,
            has_runtime_type_info: false,
            version: Some("v".to_string()),
        }
    }

    #[test]
    fn candidate_needs_exactly_one_ctor() {
        assert!(!candidate_for_js_ctor_opt(&class("A", 0)));
        assert!(candidate_for_js_ctor_opt(&class("A", 1)));
        assert!(!candidate_for_js_ctor_opt(&class("A", 2)));
    }

    #[test]
    fn flip_invalidates_recorded_callers() {
        let mut tracker = CtorOptTracker::default();
        let unit1 = LinkingUnit::new(vec![class("X", 1), class("Y", 0)]);
        tracker.begin_run(&unit1, |_| panic!("nothing recorded yet"));
        let caller = MethodRef::new("Y", "m__V", false);
        assert!(tracker.uses_js_constructor_opt("X", &caller));
        tracker.end_run();

        // X loses its ctor-opt status.
        let unit2 = LinkingUnit::new(vec![class("X", 2), class("Y", 0)]);
        let mut invalidated = Vec::new();
        tracker.begin_run(&unit2, |m| invalidated.push(m.clone()));
        assert_eq!(invalidated, vec![caller.clone()]);

        // The entry was dropped: a second flip has nothing to invalidate.
        tracker.end_run();
        let unit3 = LinkingUnit::new(vec![class("X", 1), class("Y", 0)]);
        tracker.begin_run(&unit3, |_| panic!("entry should have been dropped"));
    }

    #[test]
    fn stable_membership_keeps_entries() {
        let mut tracker = CtorOptTracker::default();
        let unit = LinkingUnit::new(vec![class("X", 1), class("Y", 0)]);
        tracker.begin_run(&unit, |_| {});
        let caller = MethodRef::new("Y", "m__V", false);
        tracker.uses_js_constructor_opt("X", &caller);
        tracker.end_run();

        tracker.begin_run(&unit, |_| panic!("no change, no invalidation"));
        tracker.end_run();

        // Entry kept: a later flip still reaches the caller.
        let unit3 = LinkingUnit::new(vec![class("X", 0), class("Y", 0)]);
        let mut invalidated = Vec::new();
        tracker.begin_run(&unit3, |m| invalidated.push(m.clone()));
        assert_eq!(invalidated.len(), 1);
    }

    #[test]
    fn query_answers_from_current_set() {
        let mut tracker = CtorOptTracker::default();
        let unit = LinkingUnit::new(vec![class("X", 1)]);
        tracker.begin_run(&unit, |_| {});
        let caller = MethodRef::new("X", "m__V", true);
        assert!(tracker.uses_js_constructor_opt("X", &caller));
        assert!(!tracker.uses_js_constructor_opt("Z", &caller));
    }
}
