//! scratchide - a scratch C++ IDE that builds and runs entirely in the browser
//!
//! Pressing Run compiles `main.cpp` with a WebAssembly build of clang, links
//! it with wasm-ld against a bundled sysroot, and runs the result in a WASI
//! host. Nothing leaves the page.
//!
//! ```text
//! workspace ──> pipeline ──> stage runner ──> WASI host (JS worker)
//!                  │              │
//!                  │              └── fetch (toolchain binaries)
//!                  └── archive (sysroot tarball) ──> vfs snapshots
//! ```
//!
//! Design principles:
//! - Immutable filesystem snapshots threaded explicitly between stages
//! - Every wait is bounded: stage timeouts, stdin timeouts, cancellation
//! - Platform glue stays at the edge; the core is tested natively
//!
//! Platform support:
//! - Browser (wasm32-unknown-unknown): the IDE itself
//! - Native: tests and the `serve` dev server

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub mod archive;
pub mod config;
pub mod fetch;
pub mod pipeline;
pub mod platform;
pub mod stage;
pub mod terminal;
pub mod vfs;
pub mod workspace;

#[cfg(target_arch = "wasm32")]
mod boot;

/// Initialize panic hook for better error messages in browser console
#[cfg(target_arch = "wasm32")]
fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// WASM entry point
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn main() {
    init_panic_hook();
    if let Err(e) = boot::boot() {
        web_sys::console::error_1(&e);
    }
}

/// Console logging helper
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    fn log(s: &str);
}

/// Log to browser console (WASM)
#[cfg(target_arch = "wasm32")]
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => {
        $crate::log(&format!($($t)*))
    };
}

/// Log to stderr (native)
#[cfg(not(target_arch = "wasm32"))]
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => {
        eprintln!($($t)*)
    };
}
