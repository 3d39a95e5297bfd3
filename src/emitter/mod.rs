//! The emitter driver: orders classes, runs the caches, assembles output.

pub mod builders;
pub(crate) mod caches;
pub(crate) mod class_emitter;
pub mod core_lib;
pub(crate) mod ctor_opt;
pub(crate) mod desugar;
pub(crate) mod env;
pub mod type_tags;

use std::cell::RefCell;

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::emitter::builders::{JsFileBuilder, JsTreeBuilder};
use crate::emitter::caches::ClassCache;
use crate::emitter::class_emitter::ClassGen;
use crate::emitter::core_lib::{CoreJsLib, SpliceMarker};
use crate::emitter::ctor_opt::{
    CtorOptTracker, MethodRef, CONSTRUCTOR_EXPORT_SENTINEL, EXPORTED_MEMBER_SENTINEL,
    MODULE_ACCESSOR_SENTINEL,
};
use crate::emitter::desugar::DesugarCtx;
use crate::emitter::type_tags::TypeTags;
use crate::errors::EmitterError;
use crate::ir::definitions::is_constructor_name;
use crate::ir::{LinkedClass, LinkingUnit};
use crate::output_mode::OutputMode;
use crate::semantics::Semantics;

/// Reuse/invalidation counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub classes_reused: usize,
    pub classes_invalidated: usize,
    pub methods_reused: usize,
    pub methods_invalidated: usize,
}

/// The incremental JavaScript emitter.
///
/// One value owns all incremental state; repeated [`Emitter::emit`] calls on
/// the same value reuse cached trees across runs. `&mut self` rules out
/// overlapping runs.
pub struct Emitter {
    semantics: Semantics,
    mode: OutputMode,
    core_lib: CoreJsLib,
    class_caches: FxHashMap<Vec<String>, ClassCache>,
    tracker: RefCell<CtorOptTracker>,
}

impl Emitter {
    /// Creates an emitter with the historical default output mode
    /// (ES5 global).
    pub fn new(semantics: Semantics, core_lib: CoreJsLib) -> Self {
        Self::with_output_mode(semantics, OutputMode::default(), core_lib)
    }

    pub fn with_output_mode(
        semantics: Semantics,
        mode: OutputMode,
        core_lib: CoreJsLib,
    ) -> Self {
        Emitter {
            semantics,
            mode,
            core_lib,
            class_caches: FxHashMap::default(),
            tracker: RefCell::new(CtorOptTracker::default()),
        }
    }

    pub fn output_mode(&self) -> OutputMode {
        self.mode
    }

    pub fn semantics(&self) -> &Semantics {
        &self.semantics
    }

    /// Prelude + `emit` + postlude.
    pub fn emit_all(
        &mut self,
        unit: &LinkingUnit,
        builder: &mut dyn JsFileBuilder,
    ) -> Result<RunStats, EmitterError> {
        self.emit_prelude(builder);
        let stats = self.emit(unit, as_tree_builder(builder))?;
        self.emit_postlude(builder);
        Ok(stats)
    }

    /// Emits the unit's classes. Strong mode requires a file builder (the
    /// core library is spliced line by line) and fails with
    /// [`EmitterError::DialectMismatch`] otherwise.
    pub fn emit(
        &mut self,
        unit: &LinkingUnit,
        builder: &mut dyn JsTreeBuilder,
    ) -> Result<RunStats, EmitterError> {
        let mut stats = RunStats::default();
        for cache in self.class_caches.values_mut() {
            cache.start_run();
        }

        let tags = TypeTags::compute(unit)?;
        let classes_by_name: FxHashMap<&str, &LinkedClass> = unit
            .classes
            .iter()
            .map(|c| (c.encoded_name.as_str(), c))
            .collect();

        {
            let caches = &mut self.class_caches;
            self.tracker.get_mut().begin_run(unit, |caller| {
                invalidate_caller(caches, &classes_by_name, caller);
            });
        }

        let mut sorted: Vec<&LinkedClass> = unit.classes.iter().collect();
        sorted.sort_by(|a, b| {
            a.ancestors
                .len()
                .cmp(&b.ancestors.len())
                .then_with(|| a.encoded_name.cmp(&b.encoded_name))
        });

        let ctx = DesugarCtx {
            mode: self.mode,
            semantics: &self.semantics,
            classes: &classes_by_name,
            tracker: &self.tracker,
        };

        if self.mode.is_strong() {
            let Some(file_builder) = builder.as_file_builder() else {
                return Err(EmitterError::DialectMismatch);
            };
            splice_strong(
                &self.core_lib,
                &mut self.class_caches,
                &ctx,
                &tags,
                &sorted,
                &mut stats,
                file_builder,
            )?;
        } else {
            for &class in &sorted {
                trace!(class = %class.encoded_name, "emitting class");
                let cache = self.class_caches.entry(class.ancestors.clone()).or_default();
                let mut r#gen = ClassGen {
                    ctx: &ctx,
                    tags: &tags,
                    class,
                    cache,
                    stats: &mut stats,
                };
                for tree in r#gen.emit_class()? {
                    builder.add_js_tree(&tree);
                }
            }
        }

        self.tracker.get_mut().end_run();
        self.class_caches.retain(|_, cache| cache.clean_after_run());
        debug!(
            classes_reused = stats.classes_reused,
            classes_invalidated = stats.classes_invalidated,
            methods_reused = stats.methods_reused,
            methods_invalidated = stats.methods_invalidated,
            "emitter run finished"
        );
        Ok(stats)
    }

    pub fn emit_prelude(&self, builder: &mut dyn JsFileBuilder) {
        match self.mode {
            OutputMode::ES5Global => {
                builder.add_line("'use strict';");
                builder.add_lines(self.core_lib.text());
            }
            OutputMode::ES5Isolated | OutputMode::ES6 => {
                builder.add_line("(function(){");
                builder.add_line("'use strict';");
                builder.add_lines(self.core_lib.text());
            }
            OutputMode::ES6StrongMode => {
                builder.add_line(
                    "(function(__this, __ScalaJSEnv, __global, $jsSelect, $jsAssign, \
                     $jsDelete, $propertiesOf, $weakFun) {",
                );
                builder.add_line("'use strict';");
                builder.add_line("'use strong';");
            }
        }
    }

    pub fn emit_postlude(&self, builder: &mut dyn JsFileBuilder) {
        match self.mode {
            OutputMode::ES5Global => {}
            OutputMode::ES5Isolated | OutputMode::ES6 => builder.add_line("}).call(this);"),
            OutputMode::ES6StrongMode => builder.add_line(STRONG_MODE_POSTLUDE),
        }
    }

    pub fn emit_custom_header(&self, custom_header: &str, builder: &mut dyn JsFileBuilder) {
        builder.add_lines(custom_header);
    }

    pub fn emit_custom_footer(&self, custom_footer: &str, builder: &mut dyn JsFileBuilder) {
        builder.add_lines(custom_footer);
    }
}

const STRONG_MODE_POSTLUDE: &str = "})(this, (typeof __ScalaJSEnv !== 'undefined') ? __ScalaJSEnv : void 0, (typeof global !== 'undefined') ? global : void 0, function(x,p){'use strict'; return x[p];}, function(x,p,v){'use strict'; x[p]=v;}, function(x,p){'use strict'; delete x[p];}, function(x){'use strict'; const r=[]; for (const p in x) r['push'](p); return r;}, function(f){'use strict'; return function(...args){ return f['apply'](void 0, args); }});";

fn as_tree_builder(builder: &mut dyn JsFileBuilder) -> &mut dyn JsTreeBuilder {
    builder
}

/// Routes a tracker invalidation to the right cache entry. Sentinel method
/// names target one-shot class slots; constructor-named methods also reset
/// the constructor piece, whose optimized form inlines their body.
fn invalidate_caller(
    caches: &mut FxHashMap<Vec<String>, ClassCache>,
    classes_by_name: &FxHashMap<&str, &LinkedClass>,
    caller: &MethodRef,
) {
    let Some(class) = classes_by_name.get(caller.class_name.as_str()) else {
        return;
    };
    let Some(cache) = caches.get_mut(&class.ancestors) else {
        return;
    };
    trace!(
        class = %caller.class_name,
        method = %caller.method_name,
        "invalidating after ctor-opt change"
    );
    match caller.method_name.as_str() {
        CONSTRUCTOR_EXPORT_SENTINEL => cache.invalidate_class_exports(),
        EXPORTED_MEMBER_SENTINEL => cache.invalidate_exported_members(),
        MODULE_ACCESSOR_SENTINEL => cache.invalidate_module_accessor(),
        method_name => {
            cache.invalidate_method(method_name, caller.is_static);
            if is_constructor_name(method_name) {
                cache.invalidate_constructor();
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn splice_strong(
    core_lib: &CoreJsLib,
    caches: &mut FxHashMap<Vec<String>, ClassCache>,
    ctx: &DesugarCtx<'_>,
    tags: &TypeTags,
    sorted: &[&LinkedClass],
    stats: &mut RunStats,
    builder: &mut dyn JsFileBuilder,
) -> Result<(), EmitterError> {
    for line in core_lib.lines() {
        let Some(marker) = SpliceMarker::of_line(line) else {
            builder.add_line(line);
            continue;
        };
        for &class in sorted {
            let cache = caches.entry(class.ancestors.clone()).or_default();
            let mut r#gen = ClassGen {
                ctx,
                tags,
                class,
                cache,
                stats: &mut *stats,
            };
            let trees = match marker {
                SpliceMarker::DeclareTypeData => r#gen.strong_type_data_decls(),
                SpliceMarker::DeclareModules => r#gen.strong_module_decls(),
                SpliceMarker::IsAsFunctions => r#gen.strong_is_as()?,
                SpliceMarker::Classes => r#gen.strong_classes()?,
                SpliceMarker::CreateTypeData => r#gen.strong_create_type_data()?,
                SpliceMarker::Exports => r#gen.strong_exports()?,
                SpliceMarker::TheEnd => Vec::new(),
            };
            for tree in trees {
                builder.add_js_tree(&tree);
            }
        }
    }
    Ok(())
}
