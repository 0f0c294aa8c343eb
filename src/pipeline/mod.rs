//! Compile, link, run
//!
//! The three-stage pipeline behind the Run button:
//!
//! ```text
//! ┌──────┐ run  ┌───────────┐ 0 ┌─────────┐ 0 ┌─────────┐ 0 ┌───────────┐
//! │ Idle │ ───> │ Compiling │ ─>│ Linking │ ─>│ Running │ ─>│ Succeeded │
//! └──────┘      └───────────┘   └─────────┘   └─────────┘   └───────────┘
//!                     │ !0 / error   │             │
//!                     └──────────────┴─────────────┴──────> Failed(stage)
//! ```
//!
//! Strictly sequential: each stage's filesystem is the input of the next,
//! so nothing here runs concurrently.

mod error;
mod orchestrator;
mod project;
mod state;
pub mod toolchain;

pub use error::*;
pub use orchestrator::*;
pub use project::*;
pub use state::*;
