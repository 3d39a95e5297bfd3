//! Output builders the emitter appends to.
//!
//! The emitter is builder-agnostic: it hands over finished JS trees and, for
//! file-shaped outputs, raw lines (prelude, postlude, core library). Source
//! map aware builders live with the callers; [`JsStringWriter`] is the plain
//! in-memory implementation used by tests and simple pipelines.

use crate::js::printer::Printer;
use crate::js::Tree;
use crate::output_mode::OutputMode;

/// Accepts finished JS trees in emission order.
pub trait JsTreeBuilder {
    fn add_js_tree(&mut self, tree: &Tree);

    /// Strong mode splices the core library line by line and therefore needs
    /// a file-shaped builder; others return `None`.
    fn as_file_builder(&mut self) -> Option<&mut dyn JsFileBuilder> {
        None
    }
}

/// A tree builder backed by a text file: also accepts raw lines.
pub trait JsFileBuilder: JsTreeBuilder {
    fn add_line(&mut self, line: &str);

    fn add_lines(&mut self, text: &str) {
        for line in text.lines() {
            self.add_line(line);
        }
    }
}

/// Prints every tree/line into an in-memory string.
pub struct JsStringWriter {
    mode: OutputMode,
    out: String,
}

impl JsStringWriter {
    pub fn new(mode: OutputMode) -> Self {
        JsStringWriter {
            mode,
            out: String::with_capacity(4096),
        }
    }

    pub fn output(&self) -> &str {
        &self.out
    }

    pub fn into_output(self) -> String {
        self.out
    }
}

impl JsTreeBuilder for JsStringWriter {
    fn add_js_tree(&mut self, tree: &Tree) {
        let mut printer = Printer::new(self.mode);
        printer.print_stat(tree);
        self.out.push_str(&printer.into_output());
    }

    fn as_file_builder(&mut self) -> Option<&mut dyn JsFileBuilder> {
        Some(self)
    }
}

impl JsFileBuilder for JsStringWriter {
    fn add_line(&mut self, line: &str) {
        self.out.push_str(line);
        self.out.push('\n');
    }
}

/// A tree-only builder; used in tests to exercise the strong-mode
/// `DialectMismatch` path.
pub struct JsTreeOnlyWriter {
    mode: OutputMode,
    out: String,
}

impl JsTreeOnlyWriter {
    pub fn new(mode: OutputMode) -> Self {
        JsTreeOnlyWriter {
            mode,
            out: String::new(),
        }
    }

    pub fn output(&self) -> &str {
        &self.out
    }
}

impl JsTreeBuilder for JsTreeOnlyWriter {
    fn add_js_tree(&mut self, tree: &Tree) {
        let mut printer = Printer::new(self.mode);
        printer.print_stat(tree);
        self.out.push_str(&printer.into_output());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_writer_interleaves_lines_and_trees() {
        let mut writer = JsStringWriter::new(OutputMode::ES5Global);
        writer.add_line("'use strict';");
        writer.add_js_tree(&Tree::assign(Tree::ident("x"), Tree::Int(1)));
        writer.add_lines("a\nb");
        assert_eq!(writer.output(), "'use strict';\nx = 1;\na\nb\n");
    }

    #[test]
    fn tree_only_writer_has_no_file_view() {
        let mut writer = JsTreeOnlyWriter::new(OutputMode::ES5Global);
        assert!(writer.as_file_builder().is_none());
    }
}
