//! The pre-rendered core JS library and its splice markers.

/// Marker lines the strong-mode emitter splices generated code at. Matched by
/// literal line equality; the marker lines themselves are never emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpliceMarker {
    DeclareTypeData,
    DeclareModules,
    IsAsFunctions,
    Classes,
    CreateTypeData,
    Exports,
    TheEnd,
}

impl SpliceMarker {
    pub fn of_line(line: &str) -> Option<SpliceMarker> {
        match line {
            "///INSERT DECLARE TYPE DATA HERE///" => Some(SpliceMarker::DeclareTypeData),
            "///INSERT DECLARE MODULES HERE///" => Some(SpliceMarker::DeclareModules),
            "///INSERT IS AND AS FUNCTIONS HERE///" => Some(SpliceMarker::IsAsFunctions),
            "///INSERT CLASSES HERE///" => Some(SpliceMarker::Classes),
            "///INSERT CREATE TYPE DATA HERE///" => Some(SpliceMarker::CreateTypeData),
            "///INSERT EXPORTS HERE///" => Some(SpliceMarker::Exports),
            "///THE END///" => Some(SpliceMarker::TheEnd),
            _ => None,
        }
    }
}

/// The runtime support library, consumed as a pre-rendered string.
///
/// Non-strong modes emit the whole text as part of the prelude; strong mode
/// walks it line by line and splices generated code at the markers.
#[derive(Debug, Clone)]
pub struct CoreJsLib {
    text: String,
}

impl CoreJsLib {
    pub fn new(text: impl Into<String>) -> Self {
        CoreJsLib { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_match_literally() {
        assert_eq!(
            SpliceMarker::of_line("///INSERT CLASSES HERE///"),
            Some(SpliceMarker::Classes)
        );
        assert_eq!(SpliceMarker::of_line("///THE END///"), Some(SpliceMarker::TheEnd));
        assert_eq!(SpliceMarker::of_line(" ///INSERT CLASSES HERE///"), None);
        assert_eq!(SpliceMarker::of_line("var x = 1;"), None);
    }
}
