//! Row access per aggregate, all as `impl ProgressDb` blocks.
//!
//! Writes that the completion transaction must see atomically run on
//! the one shared connection; the engine opens the transaction, these
//! methods just execute inside it.

pub mod enrollment;
pub mod lesson;
pub mod module;
pub mod xp;
