//! Stride Engine - Learning progression state machine
//!
//! Decides, for a learner and course, which lesson is current, which
//! lessons and modules are locked, and how completing a lesson cascades
//! into module completion, course completion, XP gain and leveling.
//!
//! Two unlock layers, by design: fine-grained sequential lesson
//! unlocking nested inside coarse-grained, explicitly-gated module
//! unlocking. Crossing a module boundary always takes an explicit
//! learner action.

pub mod config;
pub mod content;
pub mod db;
pub mod engine;
pub mod notify;
pub mod ordering;
pub mod roadmap;
pub mod store;


pub use config::EngineConfig;
pub use content::{ContentTree, CourseCatalog, OrderedLesson};
pub use db::ProgressDb;
pub use engine::{CompleteLesson, ProgressionEngine};
pub use notify::{BufferNotifier, LogNotifier, Notifier};
