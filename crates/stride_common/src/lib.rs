//! Stride Common - Shared types and schemas for the Stride learning platform
//!
//! Domain records, leveling math, the progression error taxonomy and the
//! view DTOs shared between the progression engine and its callers.

pub mod error;
pub mod events;
pub mod leveling;
pub mod types;
pub mod view;

pub use error::*;
pub use events::*;
pub use leveling::*;
pub use types::*;
pub use view::*;
