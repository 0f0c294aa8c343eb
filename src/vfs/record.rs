//! File records
//!
//! A record is one file as the WASI host sees it: an absolute path, a text or
//! binary payload, and the three POSIX-style timestamps. Records never change
//! after construction. "Editing" a record means building a new one.

use std::fmt;
use thiserror::Error;

/// Path separator used by every record path
pub const SEPARATOR: char = '/';

/// Errors constructing a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The path is empty, relative, or names the root directory
    #[error("invalid record path: {0:?}")]
    InvalidPath(String),
}

/// How the payload should be presented to the guest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingMode {
    /// User-authored source text
    Text,
    /// Raw bytes (archive contents, stage outputs)
    Binary,
}

impl fmt::Display for EncodingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingMode::Text => write!(f, "text"),
            EncodingMode::Binary => write!(f, "binary"),
        }
    }
}

/// File payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Binary(Vec<u8>),
}

impl Content {
    /// The encoding this payload was constructed with
    pub fn mode(&self) -> EncodingMode {
        match self {
            Content::Text(_) => EncodingMode::Text,
            Content::Binary(_) => EncodingMode::Binary,
        }
    }

    /// Raw bytes regardless of encoding
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(s) => s.as_bytes(),
            Content::Binary(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Access, change and modification times in milliseconds since the epoch
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Timestamps {
    pub accessed: f64,
    pub changed: f64,
    pub modified: f64,
}

impl Timestamps {
    /// All three fields set to the same instant
    pub fn uniform(ms: f64) -> Self {
        Self {
            accessed: ms,
            changed: ms,
            modified: ms,
        }
    }
}

/// An immutable file in a filesystem snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    path: String,
    content: Content,
    timestamps: Timestamps,
}

impl FileRecord {
    /// Build a record, validating the path
    ///
    /// The encoding is whatever `content` was built as; it is never sniffed
    /// from the bytes.
    pub fn new(
        path: impl Into<String>,
        content: Content,
        timestamps: Timestamps,
    ) -> Result<Self, RecordError> {
        let path = path.into();
        validate_path(&path)?;
        Ok(Self {
            path,
            content,
            timestamps,
        })
    }

    /// A user-authored text file
    pub fn text(
        path: impl Into<String>,
        text: impl Into<String>,
        timestamps: Timestamps,
    ) -> Result<Self, RecordError> {
        Self::new(path, Content::Text(text.into()), timestamps)
    }

    /// A binary file
    pub fn binary(
        path: impl Into<String>,
        bytes: Vec<u8>,
        timestamps: Timestamps,
    ) -> Result<Self, RecordError> {
        Self::new(path, Content::Binary(bytes), timestamps)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn encoding(&self) -> EncodingMode {
        self.content.mode()
    }

    pub fn timestamps(&self) -> Timestamps {
        self.timestamps
    }

    /// Copy of this record with a new payload, stamped as modified at `now`
    pub fn with_content(&self, content: Content, now: f64) -> Self {
        Self {
            path: self.path.clone(),
            content,
            timestamps: Timestamps {
                accessed: self.timestamps.accessed,
                changed: now,
                modified: now,
            },
        }
    }

    /// Consume the record, keeping only its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        match self.content {
            Content::Text(s) => s.into_bytes(),
            Content::Binary(b) => b,
        }
    }
}

fn validate_path(path: &str) -> Result<(), RecordError> {
    if !path.starts_with(SEPARATOR) || path.len() == 1 {
        return Err(RecordError::InvalidPath(path.to_string()));
    }
    Ok(())
}

/// Ensure a name has exactly one leading separator
///
/// Also drops a leading `./`, which tar tools emit for relative members.
pub fn normalize_path(name: &str) -> String {
    let trimmed = name.strip_prefix("./").unwrap_or(name);
    let trimmed = trimmed.trim_start_matches(SEPARATOR);
    format!("{}{}", SEPARATOR, trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_record() {
        let rec = FileRecord::text("/main.cpp", "int main() {}", Timestamps::uniform(5.0)).unwrap();
        assert_eq!(rec.path(), "/main.cpp");
        assert_eq!(rec.encoding(), EncodingMode::Text);
        assert_eq!(rec.content().as_bytes(), b"int main() {}");
        assert_eq!(rec.timestamps().modified, 5.0);
    }

    #[test]
    fn test_invalid_paths_rejected() {
        for bad in ["", "main.cpp", "/"] {
            let err = FileRecord::binary(bad, vec![], Timestamps::default()).unwrap_err();
            assert_eq!(err, RecordError::InvalidPath(bad.to_string()));
        }
    }

    #[test]
    fn test_encoding_is_caller_supplied() {
        // Valid UTF-8 stays binary if built as binary
        let rec = FileRecord::binary("/a.txt", b"hello".to_vec(), Timestamps::default()).unwrap();
        assert_eq!(rec.encoding(), EncodingMode::Binary);
    }

    #[test]
    fn test_with_content_leaves_original() {
        let rec = FileRecord::text("/a", "one", Timestamps::uniform(1.0)).unwrap();
        let updated = rec.with_content(Content::Text("two".into()), 9.0);

        assert_eq!(rec.content(), &Content::Text("one".into()));
        assert_eq!(updated.content(), &Content::Text("two".into()));
        assert_eq!(updated.timestamps().accessed, 1.0);
        assert_eq!(updated.timestamps().modified, 9.0);
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("sys/include/stdio.h"), "/sys/include/stdio.h");
        assert_eq!(normalize_path("/sys/lib"), "/sys/lib");
        assert_eq!(normalize_path("//sys/lib"), "/sys/lib");
        assert_eq!(normalize_path("./sys/lib/crt1.o"), "/sys/lib/crt1.o");
    }
}
