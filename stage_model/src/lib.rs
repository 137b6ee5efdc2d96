//! # Stage Model
//!
//! The data side of the Blockstage runtime: entities and their variables, the
//! global variable store, and the per-entity block graphs (scripts).
//! This crate holds state and its invariants only; executing scripts is the
//! job of `block_runtime`.

pub mod blocks;
pub mod entities;
pub mod error;
pub mod stage;

pub use blocks::*;
pub use entities::*;
pub use error::*;
pub use stage::*;
