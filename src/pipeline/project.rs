//! Project file map
//!
//! What the user edits: file name to content. It only becomes part of an
//! execution filesystem when a run starts, at which point each file turns
//! into a text record at `/<name>`.

use crate::vfs::{FileRecord, FsSnapshot, RecordError, SEPARATOR, Timestamps};
use std::collections::BTreeMap;

/// One user file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectFile {
    pub name: String,
    pub content: String,
}

/// The user's files, keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFiles {
    files: BTreeMap<String, ProjectFile>,
}

impl ProjectFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a file
    pub fn insert(&mut self, name: &str, content: &str) {
        self.files.insert(
            name.to_string(),
            ProjectFile {
                name: name.to_string(),
                content: content.to_string(),
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&ProjectFile> {
        self.files.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// File names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Text records for every file, all stamped with `now`
    pub fn to_snapshot(&self, now: f64) -> Result<FsSnapshot, RecordError> {
        let stamp = Timestamps::uniform(now);
        let records = self
            .files
            .values()
            .map(|f| FileRecord::text(format!("{}{}", SEPARATOR, f.name), f.content.clone(), stamp))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FsSnapshot::from_records(records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::EncodingMode;

    #[test]
    fn test_insert_replaces() {
        let mut project = ProjectFiles::new();
        project.insert("main.cpp", "v1");
        project.insert("main.cpp", "v2");
        assert_eq!(project.len(), 1);
        assert_eq!(project.get("main.cpp").unwrap().content, "v2");
    }

    #[test]
    fn test_to_snapshot() {
        let mut project = ProjectFiles::new();
        project.insert("main.cpp", "int main() {}");
        project.insert("test.txt", "Ada");

        let snapshot = project.to_snapshot(1234.0).unwrap();
        let paths: Vec<_> = snapshot.paths().collect();
        assert_eq!(paths, vec!["/main.cpp", "/test.txt"]);

        let main = snapshot.get("/main.cpp").unwrap();
        assert_eq!(main.encoding(), EncodingMode::Text);
        assert_eq!(main.timestamps(), Timestamps::uniform(1234.0));
    }

    #[test]
    fn test_empty_name_rejected_at_run() {
        let mut project = ProjectFiles::new();
        project.insert("", "x");
        assert!(project.to_snapshot(0.0).is_err());
    }
}
