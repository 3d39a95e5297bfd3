//! Incremental JavaScript emitter for the sjsc linker.
//!
//! This crate is the backend of the linker: it takes a fully linked program
//! (a [`ir::LinkingUnit`] of [`ir::LinkedClass`]es) and emits a single
//! JavaScript output in one of four target dialects (ES5 global, ES5
//! isolated, ES6, ES6 strong mode).
//!
//! The crate provides:
//! - A JavaScript tree vocabulary ([`js::Tree`]) and a printer for it
//! - Desugaring of IR method bodies into JS trees per dialect
//! - Subtype tests via integer tag intervals computed from the inheritance DAG
//! - A two-level incremental cache (per-class + per-method) with
//!   cross-reference invalidation for the JS-constructor optimization
//!
//! The entry point is [`Emitter`]; see `emit_all` for the one-shot driver.

pub mod emitter;
pub mod errors;
pub mod ir;
pub mod js;
pub mod output_mode;
pub mod semantics;

pub use emitter::builders::{JsFileBuilder, JsStringWriter, JsTreeBuilder};
pub use emitter::core_lib::CoreJsLib;
pub use emitter::{Emitter, RunStats};
pub use errors::EmitterError;
pub use output_mode::OutputMode;
pub use semantics::{CheckedBehavior, Semantics};
