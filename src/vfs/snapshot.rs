//! Filesystem snapshots
//!
//! A snapshot is the complete file set one stage sees. Snapshots are values:
//! `set` and `merge` build new snapshots and leave their inputs untouched.
//! Records are shared behind `Rc`, so copying a snapshot copies pointers, not
//! file contents.

use super::record::FileRecord;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::rc::Rc;

/// Immutable mapping from absolute path to file record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FsSnapshot {
    files: BTreeMap<String, Rc<FileRecord>>,
}

impl FsSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from records; later records win on path collision
    pub fn from_records(records: impl IntoIterator<Item = FileRecord>) -> Self {
        let files = records
            .into_iter()
            .map(|r| (r.path().to_string(), Rc::new(r)))
            .collect();
        Self { files }
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path).map(Rc::as_ref)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// New snapshot with `record` stored at its own path
    pub fn set(&self, record: FileRecord) -> Self {
        let mut files = self.files.clone();
        files.insert(record.path().to_string(), Rc::new(record));
        Self { files }
    }

    /// New snapshot without `path`
    pub fn remove(&self, path: &str) -> Self {
        let mut files = self.files.clone();
        files.remove(path);
        Self { files }
    }

    /// Right-biased merge: `other` wins wherever both have a path
    pub fn merge(&self, other: &FsSnapshot) -> Self {
        let mut files = self.files.clone();
        for (path, record) in &other.files {
            files.insert(path.clone(), Rc::clone(record));
        }
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Paths in sorted order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter {
            inner: self.files.values(),
        }
    }
}

/// Iterator over the records of a snapshot, in path order
pub struct Iter<'a> {
    inner: btree_map::Values<'a, String, Rc<FileRecord>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a FileRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(Rc::as_ref)
    }
}

impl<'a> IntoIterator for &'a FsSnapshot {
    type Item = &'a FileRecord;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Fold snapshots left to right with [`FsSnapshot::merge`]
///
/// The last snapshot to mention a path decides its record.
pub fn merge_all<'a>(snapshots: impl IntoIterator<Item = &'a FsSnapshot>) -> FsSnapshot {
    snapshots
        .into_iter()
        .fold(FsSnapshot::new(), |acc, next| acc.merge(next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vfs::record::{Content, Timestamps};

    fn text(path: &str, body: &str) -> FileRecord {
        FileRecord::text(path, body, Timestamps::default()).unwrap()
    }

    fn snap(entries: &[(&str, &str)]) -> FsSnapshot {
        FsSnapshot::from_records(entries.iter().map(|(p, b)| text(p, b)))
    }

    #[test]
    fn test_get_and_set() {
        let empty = FsSnapshot::new();
        let one = empty.set(text("/a", "1"));

        assert!(empty.get("/a").is_none());
        assert_eq!(one.get("/a").unwrap().content(), &Content::Text("1".into()));
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn test_set_replaces_without_touching_source() {
        let base = snap(&[("/a", "old")]);
        let next = base.set(text("/a", "new"));

        assert_eq!(base.get("/a").unwrap().content().as_bytes(), b"old");
        assert_eq!(next.get("/a").unwrap().content().as_bytes(), b"new");
    }

    #[test]
    fn test_merge_is_right_biased() {
        let a = snap(&[("/shared", "left"), ("/only-a", "a")]);
        let b = snap(&[("/shared", "right"), ("/only-b", "b")]);
        let merged = a.merge(&b);

        assert_eq!(merged.get("/shared").unwrap().content().as_bytes(), b"right");
        assert!(merged.contains("/only-a"));
        assert!(merged.contains("/only-b"));
        assert_eq!(a.get("/shared").unwrap().content().as_bytes(), b"left");
    }

    #[test]
    fn test_merge_all_order_matters() {
        let user = snap(&[("/sys/include/stdio.h", "user")]);
        let sysroot = snap(&[("/sys/include/stdio.h", "system")]);

        let merged = merge_all([&user, &sysroot]);
        assert_eq!(
            merged.get("/sys/include/stdio.h").unwrap().content().as_bytes(),
            b"system"
        );

        let reversed = merge_all([&sysroot, &user]);
        assert_eq!(
            reversed.get("/sys/include/stdio.h").unwrap().content().as_bytes(),
            b"user"
        );
    }

    #[test]
    fn test_merge_all_empty() {
        assert!(merge_all(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_remove_and_paths() {
        let s = snap(&[("/b", ""), ("/a", ""), ("/c", "")]);
        let paths: Vec<_> = s.remove("/b").paths().map(str::to_string).collect();
        assert_eq!(paths, vec!["/a", "/c"]);
        assert_eq!(s.len(), 3);
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod proptests {
    use super::*;
    use crate::vfs::record::Timestamps;
    use proptest::prelude::*;

    /// Snapshots over a handful of paths so merges collide often
    fn snapshot() -> impl Strategy<Value = FsSnapshot> {
        prop::collection::btree_map("/[a-e]", "[a-z]{0,3}", 0..6).prop_map(|files| {
            FsSnapshot::from_records(files.into_iter().map(|(path, body)| {
                FileRecord::text(path, body, Timestamps::default()).unwrap()
            }))
        })
    }

    proptest! {
        #[test]
        fn merge_is_associative(a in snapshot(), b in snapshot(), c in snapshot()) {
            prop_assert_eq!(a.merge(&b).merge(&c), a.merge(&b.merge(&c)));
        }

        /// Every path of either side survives, and the right side wins
        #[test]
        fn merge_is_right_biased(a in snapshot(), b in snapshot()) {
            let merged = a.merge(&b);
            for path in a.paths().chain(b.paths()) {
                prop_assert_eq!(merged.get(path), b.get(path).or_else(|| a.get(path)));
            }
            let union: std::collections::BTreeSet<_> = a.paths().chain(b.paths()).collect();
            prop_assert_eq!(merged.len(), union.len());
        }

        #[test]
        fn merge_all_matches_pairwise_fold(a in snapshot(), b in snapshot(), c in snapshot()) {
            prop_assert_eq!(merge_all([&a, &b, &c]), a.merge(&b).merge(&c));
        }
    }
}
