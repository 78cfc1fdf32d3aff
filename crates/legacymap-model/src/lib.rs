//! Core model for legacymap.
//!
//! This crate holds the pieces every other stage agrees on:
//!
//! - the typed entity/relation model (`Entity`, `Relation`) with evidence pointers,
//! - the stable id derivations (`ids`), which must never depend on run order,
//! - the append-only `GraphRegistry` used during a single assembly pass,
//! - the normalized source inventory records produced by the upstream parsers.
//!
//! Nothing here performs IO. Parsing raw Java/JSP/XML is out of scope; the
//! inventory types only describe facts that were already extracted.

pub mod digest;
pub mod entity;
pub mod evidence;
pub mod ids;
pub mod inventory;
pub mod registry;
pub mod relation;

pub use digest::*;
pub use entity::*;
pub use evidence::*;
pub use ids::*;
pub use inventory::*;
pub use registry::*;
pub use relation::*;
