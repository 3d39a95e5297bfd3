//! Target dialect registry.

/// The JavaScript dialect the emitter produces.
///
/// The historical default is [`OutputMode::ES5Global`]; constructors that do
/// not take an output mode use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Plain ES5 writing into the global scope.
    #[default]
    ES5Global,
    /// ES5 wrapped in an IIFE so nothing leaks into the global scope.
    ES5Isolated,
    /// ES6 with `class` constructs and `let` declarations.
    ES6,
    /// ES6 strong mode: `'use strong'`, flat `$`-prefixed bindings, output
    /// spliced into a pre-rendered core library at marker lines.
    ES6StrongMode,
}

impl OutputMode {
    /// Strong mode splices into the core library instead of emitting it as a
    /// prelude, and uses flat `$`-prefixed names.
    pub fn is_strong(self) -> bool {
        matches!(self, OutputMode::ES6StrongMode)
    }

    /// Whether classes are emitted as `class` constructs rather than
    /// function-plus-prototype chains.
    pub fn uses_classes(self) -> bool {
        matches!(self, OutputMode::ES6 | OutputMode::ES6StrongMode)
    }

    /// Whether declarations use `let` instead of `var`.
    pub fn uses_let(self) -> bool {
        self.uses_classes()
    }

    /// Whether the output is wrapped in a scope-isolating function.
    pub fn is_isolated(self) -> bool {
        !matches!(self, OutputMode::ES5Global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_es5_global() {
        assert_eq!(OutputMode::default(), OutputMode::ES5Global);
    }

    #[test]
    fn feature_predicates() {
        assert!(!OutputMode::ES5Global.is_isolated());
        assert!(OutputMode::ES5Isolated.is_isolated());
        assert!(!OutputMode::ES5Isolated.uses_classes());
        assert!(OutputMode::ES6.uses_classes());
        assert!(!OutputMode::ES6.is_strong());
        assert!(OutputMode::ES6StrongMode.is_strong());
        assert!(OutputMode::ES6StrongMode.uses_let());
    }
}
