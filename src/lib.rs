//! Replays a Death Knight's combat log for one fight and scores the play.
//!
//! The entry point is [`engine::analyze_fight`]; everything else is the
//! machinery it composes.

pub mod analyzers;
pub mod annotation;
pub mod buffs;
pub mod config;
pub mod dead_zone;
pub mod engine;
pub mod error;
pub mod event;
pub mod items;
pub mod logging;
pub mod pets;
pub mod rune;
pub mod scorer;
pub mod specs;
pub mod window;

pub use config::AnalysisConfig;
pub use engine::{analyze_fight, AnalysisResult};
pub use error::{AnalysisError, Result};
pub use event::{Event, Fight};
