//! Stage execution
//!
//! A stage is one process invocation (compile, link, or run). This module
//! provides the [`StageRunner`] and the contract it expects from the
//! external WASI host.
//!
//! State transitions of a single stage:
//! ```text
//! RESOLVING -> VALIDATING -> RUNNING -> EXITED(code)
//!     |             |           |
//!     +-------------+-----------+-- LaunchError / Aborted / TimedOut / Cancelled
//! ```
//!
//! `stdin` requests are the only other suspension point besides waiting for
//! the host; both are bounded (by the stdin policy and the stage timeout).

mod cancel;
mod descriptor;
mod error;
mod host;
mod module;
mod runner;
mod stdin;
mod timer;

pub use cancel::*;
pub use descriptor::*;
pub use error::*;
pub use host::*;
pub use module::*;
pub use runner::*;
pub use stdin::*;
pub use timer::*;
