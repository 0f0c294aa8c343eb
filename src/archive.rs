//! Sysroot archive loader
//!
//! Turns a (possibly compressed) tar stream into a filesystem snapshot.
//!
//! Decompression is best effort: gzip first, then a zlib-wrapped deflate
//! stream, and if neither decoder accepts the bytes they are taken as a plain
//! tar. Some deployments serve the archive already inflated, so a failed
//! decompression is not an error. Failing to parse the tar is.
//!
//! Only regular files are imported. Directories, links and other entry types
//! are skipped. Every imported file becomes a binary record whose three
//! timestamps all equal the entry's recorded mtime.

use crate::console_log;
use crate::fetch::{FetchError, Fetcher};
use crate::vfs::{FileRecord, FsSnapshot, Timestamps, normalize_path};
use flate2::read::{GzDecoder, ZlibDecoder};
use std::io::{Cursor, Read};
use std::rc::Rc;
use thiserror::Error;

/// Archive loading errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    /// The archive could not be retrieved
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The (decompressed) bytes are not a readable tar stream
    #[error("invalid archive: {0}")]
    Format(String),
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Which decoder produced the tar bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Zlib,
    /// Decompression failed; bytes used as-is
    None,
}

/// Inflate `bytes` if they are gzip or zlib, otherwise return them unchanged
pub fn decompress(bytes: &[u8]) -> (Vec<u8>, Compression) {
    let mut out = Vec::new();
    if GzDecoder::new(bytes).read_to_end(&mut out).is_ok() {
        return (out, Compression::Gzip);
    }

    out.clear();
    if ZlibDecoder::new(bytes).read_to_end(&mut out).is_ok() {
        return (out, Compression::Zlib);
    }

    (bytes.to_vec(), Compression::None)
}

/// Extract every regular file from an archive
///
/// Either the whole archive is imported or an error is returned; there is
/// no partial snapshot.
pub fn extract(bytes: &[u8]) -> ArchiveResult<FsSnapshot> {
    if bytes.is_empty() {
        return Err(ArchiveError::Format("empty archive".to_string()));
    }

    let (tar_bytes, compression) = decompress(bytes);
    if compression == Compression::None {
        console_log!("[archive] Not compressed, reading as plain tar");
    }

    let records = read_tar(&tar_bytes)?;
    Ok(FsSnapshot::from_records(records))
}

fn read_tar(bytes: &[u8]) -> ArchiveResult<Vec<FileRecord>> {
    let format = |what: &str, e: std::io::Error| ArchiveError::Format(format!("{}: {}", what, e));

    let mut archive = tar::Archive::new(Cursor::new(bytes));
    let mut records = Vec::new();

    for entry in archive.entries().map_err(|e| format("read tar entries", e))? {
        let mut entry = entry.map_err(|e| format("read tar entry", e))?;

        if !entry.header().entry_type().is_file() {
            continue;
        }

        let name = entry
            .path()
            .map_err(|e| format("read tar entry path", e))?
            .to_string_lossy()
            .into_owned();
        let mtime = entry
            .header()
            .mtime()
            .map_err(|e| format("read tar entry mtime", e))?;

        let mut content = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut content)
            .map_err(|e| format("read tar entry bytes", e))?;

        let record = FileRecord::binary(
            normalize_path(&name),
            content,
            Timestamps::uniform(mtime as f64 * 1000.0),
        )
        .map_err(|e| ArchiveError::Format(e.to_string()))?;
        records.push(record);
    }

    Ok(records)
}

/// Fetches archives and extracts them into snapshots
///
/// Nothing is cached: every `load` fetches and extracts afresh.
#[derive(Clone)]
pub struct ArchiveLoader {
    fetcher: Rc<dyn Fetcher>,
}

impl ArchiveLoader {
    pub fn new(fetcher: Rc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    /// Retrieve `uri` and extract it
    pub async fn load(&self, uri: &str) -> ArchiveResult<FsSnapshot> {
        console_log!("[archive] Loading {}", uri);
        let bytes = self.fetcher.fetch(uri).await?;
        let snapshot = extract(&bytes)?;
        console_log!("[archive] {} files from {}", snapshot.len(), uri);
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::StaticFetcher;
    use crate::vfs::EncodingMode;
    use flate2::Compression as Level;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use futures::executor::block_on;
    use std::io::Write;

    fn file_header(size: usize, mtime: u64) -> tar::Header {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(size as u64);
        header.set_mode(0o644);
        header.set_mtime(mtime);
        header.set_cksum();
        header
    }

    fn build_tar() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());

        let mut dir = tar::Header::new_gnu();
        dir.set_entry_type(tar::EntryType::Directory);
        dir.set_size(0);
        dir.set_mode(0o755);
        dir.set_cksum();
        builder.append_data(&mut dir, "sys/include/", std::io::empty()).unwrap();

        let stdio = b"int printf(const char *, ...);\n";
        builder
            .append_data(&mut file_header(stdio.len(), 1_600_000_000), "sys/include/stdio.h", &stdio[..])
            .unwrap();

        let crt = [0u8, 97, 115, 109];
        builder
            .append_data(&mut file_header(crt.len(), 42), "./sys/lib/wasm32-wasi/crt1.o", &crt[..])
            .unwrap();

        let mut link = tar::Header::new_gnu();
        link.set_entry_type(tar::EntryType::Symlink);
        link.set_size(0);
        link.set_cksum();
        builder
            .append_link(&mut link, "sys/include/alias.h", "stdio.h")
            .unwrap();

        builder.into_inner().unwrap()
    }

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Level::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn test_extract_gzip_archive() {
        let snapshot = extract(&gzip(&build_tar())).unwrap();

        let paths: Vec<_> = snapshot.paths().collect();
        assert_eq!(paths, vec!["/sys/include/stdio.h", "/sys/lib/wasm32-wasi/crt1.o"]);

        let stdio = snapshot.get("/sys/include/stdio.h").unwrap();
        assert_eq!(stdio.encoding(), EncodingMode::Binary);
        assert_eq!(stdio.content().as_bytes(), b"int printf(const char *, ...);\n");
        assert_eq!(stdio.timestamps(), Timestamps::uniform(1_600_000_000_000.0));
    }

    #[test]
    fn test_extract_plain_tar_fallback() {
        let tar_bytes = build_tar();
        assert_eq!(decompress(&tar_bytes).1, Compression::None);

        let snapshot = extract(&tar_bytes).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.contains("/sys/lib/wasm32-wasi/crt1.o"));
    }

    #[test]
    fn test_extract_zlib_archive() {
        let mut enc = ZlibEncoder::new(Vec::new(), Level::default());
        enc.write_all(&build_tar()).unwrap();
        let bytes = enc.finish().unwrap();

        assert_eq!(decompress(&bytes).1, Compression::Zlib);
        assert_eq!(extract(&bytes).unwrap().len(), 2);
    }

    #[test]
    fn test_extract_is_idempotent() {
        let bytes = gzip(&build_tar());
        assert_eq!(extract(&bytes).unwrap(), extract(&bytes).unwrap());
    }

    #[test]
    fn test_garbage_is_format_error() {
        let garbage = vec![0x5a; 700];
        assert!(matches!(extract(&garbage), Err(ArchiveError::Format(_))));
        assert!(matches!(extract(&[]), Err(ArchiveError::Format(_))));
    }

    #[test]
    fn test_loader_fetches_and_extracts() {
        let fetcher = Rc::new(StaticFetcher::new());
        fetcher.insert("/clang-fs.tar.gz", gzip(&build_tar()));
        let loader = ArchiveLoader::new(fetcher.clone());

        let snapshot = block_on(loader.load("/clang-fs.tar.gz")).unwrap();
        assert_eq!(snapshot.len(), 2);

        let err = block_on(loader.load("/nope.tar.gz")).unwrap_err();
        assert!(matches!(err, ArchiveError::Fetch(FetchError::Status { status: 404, .. })));
    }
}
