//! Opaque source locations attached to declarations.
//!
//! The annotation parser hands every raw declaration (and most of their
//! arguments) a [`Span`]. Resolution never interprets a span; it only copies
//! it onto diagnostics so that a caller holding the matching [`SourceMap`]
//! can render file, line and a snippet.
//!
//! # Examples
//!
//! ```
//! # use metrology_foundation::span::*;
//! # use std::path::PathBuf;
//! let mut map = SourceMap::new();
//! let file_id = map.add_file(
//!     PathBuf::from("Speed.cs"),
//!     "[Derivation(\"id\", \"{0} / {1}\")]".to_string(),
//! );
//! let span = Span::new(file_id, 12, 16, 1);
//!
//! assert_eq!(map.snippet(&span), Some("\"id\""));
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Compact source location reference.
///
/// Points to a byte range in a source file with a cached line number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Index into `SourceMap` files
    pub file_id: u16,
    /// Byte offset of start position
    pub start: u32,
    /// Byte offset of end position (exclusive)
    pub end: u32,
    /// Cached line number (1-based) for the start position
    pub start_line: u16,
}

/// Collection of the source files declarations were parsed from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

/// A single source file with line indexing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path the file was read from
    pub path: PathBuf,
    /// Original source text
    pub source: String,
    /// Byte offsets of each line start, followed by an EOF sentinel
    pub line_starts: Vec<u32>,
}

impl Span {
    /// Create a new span.
    pub fn new(file_id: u16, start: u32, end: u32, start_line: u16) -> Self {
        Self {
            file_id,
            start,
            end,
            start_line,
        }
    }

    /// Create a zero-length span at the start of a file.
    pub fn zero(file_id: u16) -> Self {
        Self::new(file_id, 0, 0, 1)
    }

    /// Check if this span is zero-length.
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Length of this span in bytes. Inverted spans count as empty.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }
}

impl SourceMap {
    /// Create an empty source map.
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Add a source file and return its ID.
    pub fn add_file(&mut self, path: PathBuf, source: String) -> u16 {
        let file_id = self.files.len();
        assert!(file_id < u16::MAX as usize, "too many source files");

        self.files.push(SourceFile::new(path, source));
        file_id as u16
    }

    /// Get the source file a span points into, if it was registered.
    pub fn file(&self, span: &Span) -> Option<&SourceFile> {
        self.files.get(span.file_id as usize)
    }

    /// Get the file path for a span.
    pub fn file_path(&self, span: &Span) -> Option<&Path> {
        self.file(span).map(|file| file.path.as_path())
    }

    /// Get the source text covered by a span.
    ///
    /// Returns `None` when the span does not fall inside a registered file.
    pub fn snippet(&self, span: &Span) -> Option<&str> {
        let file = self.file(span)?;
        file.source.get(span.start as usize..span.end as usize)
    }

    /// Get the 1-based (line, column) position for a span's start.
    pub fn line_col(&self, span: &Span) -> Option<(u32, u32)> {
        self.file(span).and_then(|file| file.line_col(span.start))
    }

    /// Get the number of files in this map.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl SourceFile {
    /// Create a new source file with precomputed line starts.
    pub fn new(path: PathBuf, source: String) -> Self {
        let line_starts = compute_line_starts(&source);
        Self {
            path,
            source,
            line_starts,
        }
    }

    /// Get the 1-based (line, column) for a byte offset, or `None` past EOF.
    pub fn line_col(&self, offset: u32) -> Option<(u32, u32)> {
        if offset as usize > self.source.len() {
            return None;
        }

        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx.max(1) - 1,
        };

        let line = (line_idx + 1) as u32;
        let col = (offset - self.line_starts[line_idx]) + 1;
        Some((line, col))
    }

    /// Get the text of a specific line (1-based), without its line break.
    pub fn line_text(&self, line: u32) -> Option<&str> {
        if line == 0 || line as usize >= self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[(line - 1) as usize] as usize;
        let end = self.line_starts[line as usize] as usize;
        self.source
            .get(start..end)
            .map(|text| text.trim_end_matches(['\n', '\r']))
    }
}

/// Byte offsets of line starts; the last entry is the EOF sentinel.
fn compute_line_starts(source: &str) -> Vec<u32> {
    let mut line_starts = vec![0];

    for (idx, ch) in source.char_indices() {
        if ch == '\n' {
            line_starts.push((idx + 1) as u32);
        }
    }

    if line_starts.last() != Some(&(source.len() as u32)) {
        line_starts.push(source.len() as u32);
    }

    line_starts
}
