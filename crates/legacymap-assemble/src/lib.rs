//! Graph assembly for legacymap.
//!
//! `assemble` runs the configured linker plugins over a source inventory, folds
//! their output into a single registry, classifies JSP screens, applies the
//! confidence filter, derives request traces and enforces the quality gates. The
//! result is a `GraphDocument`.
//!
//! Everything here is a synchronous, in-memory batch pass with deterministic
//! output: identical input yields identical ids, ordering and digest.

pub mod assemble;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod quality;
pub mod trace;

pub use assemble::*;
pub use config::*;
pub use diagnostics::*;
pub use document::*;
pub use error::*;
pub use quality::*;
pub use trace::*;
