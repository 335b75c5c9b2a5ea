//! Source positions attached to every AST node.

use serde::Serialize;

/// A line/column position in the original script source (1-based lines,
/// 0-based columns; `0:0` marks synthesized nodes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A half-open source range. Diagnostics report the `start` location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: Location,
    pub end: Location,
}

impl Span {
    pub fn new(start: Location, end: Location) -> Self {
        Self { start, end }
    }

    /// A zero-width span at the given position.
    pub fn point(line: u32, column: u32) -> Self {
        let loc = Location::new(line, column);
        Self {
            start: loc,
            end: loc,
        }
    }

    /// Span for nodes synthesized by the compiler rather than read from
    /// source (bool literal globals, exec-function call sites).
    pub fn synthesized() -> Self {
        Self::default()
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}
