use serde::{Deserialize, Serialize};

/// Represents a source location identified by file name and line number.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct LineRef {
    /// The line number within the file.
    pub line_number: usize,
    /// The file name associated with the diagnostic.
    pub file_name:   String,
}

impl LineRef {
    /// Creates a new reference to `line_number` in `file_name`.
    pub fn new(file_name: impl Into<String>, line_number: usize) -> Self {
        Self {
            line_number,
            file_name: file_name.into(),
        }
    }

    /// Returns the file name for this reference.
    pub fn file_name(&self) -> &str {
        self.file_name.as_ref()
    }
}

impl std::fmt::Display for LineRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file_name, self.line_number)
    }
}
