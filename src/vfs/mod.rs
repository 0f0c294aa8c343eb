//! Virtual File System
//!
//! The filesystem handed to every toolchain process. There is no open/read/
//! write layer here: the WASI host owns file descriptors for the duration of a
//! process and hands back a whole new snapshot when it exits.
//!
//! Design: immutable values. A stage receives a snapshot and returns a new
//! one, so no stage can observe another stage's writes in progress.

pub mod record;
pub mod snapshot;

pub use record::{
    Content, EncodingMode, FileRecord, RecordError, SEPARATOR, Timestamps, normalize_path,
};
pub use snapshot::{FsSnapshot, merge_all};

/// Current wall clock in milliseconds since the epoch
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

/// Current wall clock in milliseconds since the epoch
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}
