//! Debug locations attached to instructions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source position of an instruction, as recorded by the front end.
///
/// `original` is the location the code was inlined from (or expanded from,
/// for macro bodies). Front ends frequently leave `file` empty on the
/// immediate location of expanded code and only fill in the original.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugLoc {
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original: Option<Box<DebugLoc>>,
}

impl DebugLoc {
    /// Create a location without an inlined-from chain.
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column: 0,
            original: None,
        }
    }

    /// Attach the location this one was inlined from.
    #[must_use]
    pub fn inlined_from(mut self, original: Self) -> Self {
        self.original = Some(Box::new(original));
        self
    }

    /// Set the column.
    #[must_use]
    pub const fn with_column(mut self, column: u32) -> Self {
        self.column = column;
        self
    }

    /// Location this one was inlined from, if any.
    #[must_use]
    pub fn original(&self) -> Option<&Self> {
        self.original.as_deref()
    }

    /// Check if this location names a file.
    #[must_use]
    pub fn has_file(&self) -> bool {
        !self.file.is_empty()
    }

    /// Resolve to a (file, line) pair.
    #[must_use]
    pub fn source_loc(&self) -> SourceLoc {
        SourceLoc::new(&self.file, self.line)
    }
}

impl fmt::Display for DebugLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)?;
        if self.column != 0 {
            write!(f, ":{}", self.column)?;
        }
        if let Some(orig) = &self.original {
            write!(f, " @ {orig}")?;
        }
        Ok(())
    }
}

/// Resolved source location.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceLoc {
    /// Source file name, possibly a full path.
    pub file: String,
    /// Line number (0 if unknown).
    pub line: u32,
}

impl SourceLoc {
    /// Create a new source location.
    #[must_use]
    pub fn new(file: &str, line: u32) -> Self {
        Self {
            file: file.to_string(),
            line,
        }
    }

    /// Check if this location names a real file.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.file.is_empty() && self.file != "??"
    }
}
