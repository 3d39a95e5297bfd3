//! Compliance knobs for emitted runtime checks.

/// How strictly an emitted runtime check enforces the language semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckedBehavior {
    /// Full check, observable fallback behavior.
    Compliant,
    /// Full check, violations throw an `UndefinedBehaviorError`.
    Fatal,
    /// No check emitted.
    Unchecked,
}

/// Semantics configuration threaded through the emitter.
///
/// Each field selects the emitted shape of one category of runtime check; the
/// choices are baked into the output, not consulted at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Semantics {
    /// Behavior of `as`-casts (`as_C` bodies and cast call sites).
    pub as_instance_ofs: CheckedBehavior,
    /// Behavior of module accessors under re-entrant initialization.
    pub module_init: CheckedBehavior,
}

impl Default for Semantics {
    fn default() -> Self {
        Semantics {
            as_instance_ofs: CheckedBehavior::Compliant,
            module_init: CheckedBehavior::Unchecked,
        }
    }
}

impl Semantics {
    /// All checks at their strictest setting.
    pub fn compliant() -> Self {
        Semantics {
            as_instance_ofs: CheckedBehavior::Compliant,
            module_init: CheckedBehavior::Compliant,
        }
    }
}
