//! Linker plugins and JSP classification for legacymap.
//!
//! Linkers read the normalized source inventory plus the routes discovered so far
//! and emit new entities/relations. Each one is an independent, additive strategy
//! for one category of evidence (servlet/struts routing, JAX-RS, view wiring, data
//! access, security, validation rules).
//!
//! Output of this crate is *inferred* structure: every relation carries a
//! confidence, evidence pointers and a short rationale, and is filtered later by
//! the quality gate in `legacymap-assemble`.

pub mod classifier;
pub mod diagnostics;
pub mod linkers;

pub use classifier::*;
pub use diagnostics::*;
pub use linkers::*;
