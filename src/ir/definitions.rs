//! Fixed tables about the runtime class hierarchy.
//!
//! Reserved type tags, the hijacked primitive boxes and their ancestors, and
//! the name predicates are closed constants: the linker guarantees the
//! runtime library these describe, so the emitter treats them as facts.

use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHashSet};

/// `java.lang.Object`.
pub const OBJECT_CLASS: &str = "O";
/// `java.lang.String`, hijacked to primitive JS strings.
pub const STRING_CLASS: &str = "T";
/// `scala.runtime.Nothing$`.
pub const NOTHING_CLASS: &str = "sr_Nothing$";
/// The error class thrown by `Fatal` checked behaviors.
pub const UNDEFINED_BEHAVIOR_ERROR_CLASS: &str = "sjsr_UndefinedBehaviorError";
/// Its string constructor.
pub const UNDEFINED_BEHAVIOR_ERROR_CTOR: &str = "init___T";

/// Hijacked primitive boxes, in reserved-tag order.
pub const HIJACKED_BOXED_CLASSES: &[&str] = &[
    "sr_BoxedUnit",
    "jl_Boolean",
    "jl_Byte",
    "jl_Short",
    "jl_Integer",
    "jl_Long",
    "jl_Float",
    "jl_Double",
];

/// Reserved type tags: the root, the hijacked boxes, and String occupy the
/// low range; DFS assignment starts above them.
pub static RESERVED_TYPE_TAGS: Lazy<FxHashMap<&'static str, i32>> = Lazy::new(|| {
    let mut tags = FxHashMap::default();
    tags.insert(OBJECT_CLASS, 1);
    for (i, name) in HIJACKED_BOXED_CLASSES.iter().enumerate() {
        tags.insert(*name, 2 + i as i32);
    }
    tags.insert(STRING_CLASS, 2 + HIJACKED_BOXED_CLASSES.len() as i32);
    tags
});

/// `typeof` tests accepted by the instance test of a hijacked box itself.
pub static HIJACKED_TYPEOF: Lazy<FxHashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = FxHashMap::default();
    map.insert("jl_Boolean", "boolean");
    map.insert("jl_Byte", "number");
    map.insert("jl_Short", "number");
    map.insert("jl_Integer", "number");
    map.insert("jl_Long", "number");
    map.insert("jl_Float", "number");
    map.insert("jl_Double", "number");
    map.insert(STRING_CLASS, "string");
    map
});

/// Supertypes of hijacked classes whose instance tests must accept
/// primitive-representation values.
pub static ANCESTORS_OF_HIJACKED_CLASSES: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    ["jl_Comparable", "jl_Number", "jl_CharSequence"]
        .into_iter()
        .collect()
});

/// The `typeof` results an ancestor-of-hijacked instance test must accept.
pub fn hijacked_ancestor_typeofs(encoded_name: &str) -> &'static [&'static str] {
    match encoded_name {
        "jl_Number" => &["number"],
        "jl_CharSequence" => &["string"],
        "jl_Comparable" => &["number", "string", "boolean"],
        _ => &[],
    }
}

/// Supertypes of array types; their instance tests accept any array value.
pub static PSEUDO_ARRAY_ANCESTORS: Lazy<FxHashSet<&'static str>> =
    Lazy::new(|| ["jl_Cloneable", "s_Serializable"].into_iter().collect());

/// Classes whose type data refers to their instance tests, so the `is_`
/// function must exist whenever the type data does.
pub static CLASSES_WHOSE_DATA_REFER_TO_THEIR_INSTANCE_TESTS: Lazy<FxHashSet<&'static str>> =
    Lazy::new(|| {
        let mut set: FxHashSet<&'static str> = ANCESTORS_OF_HIJACKED_CLASSES.iter().copied().collect();
        set.insert(OBJECT_CLASS);
        set.insert(STRING_CLASS);
        set
    });

/// Whether an encoded method name names a constructor.
pub fn is_constructor_name(name: &str) -> bool {
    name.starts_with("init___")
}

/// Mask of the element-class tag bits inside an array type tag.
pub const ARRAY_TAG_ELEMENT_MASK: i32 = (1 << 23) - 1;
/// Shift of the array-depth bits inside an array type tag.
pub const ARRAY_TAG_DEPTH_SHIFT: i32 = 23;
/// Mask of the array-depth bits once shifted down.
pub const ARRAY_TAG_DEPTH_MASK: i32 = 0xff;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_tags_are_unique_and_low() {
        let mut seen = FxHashSet::default();
        for (_, &tag) in RESERVED_TYPE_TAGS.iter() {
            assert!(tag >= 1);
            assert!(seen.insert(tag), "duplicate reserved tag {tag}");
        }
        assert_eq!(RESERVED_TYPE_TAGS[OBJECT_CLASS], 1);
    }

    #[test]
    fn constructor_name_predicate() {
        assert!(is_constructor_name("init___"));
        assert!(is_constructor_name("init___T__I"));
        assert!(!is_constructor_name("toString__T"));
    }

    #[test]
    fn data_refer_set_includes_object_and_string() {
        let set = &*CLASSES_WHOSE_DATA_REFER_TO_THEIR_INSTANCE_TESTS;
        assert!(set.contains(OBJECT_CLASS));
        assert!(set.contains(STRING_CLASS));
        assert!(set.contains("jl_Number"));
    }
}
