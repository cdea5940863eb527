//! Environment traits and wrappers.
//!
//! Provides the core `MarlEnv` trait that all environments implement, plus
//! a wrapper for episode statistics.

mod traits;
mod wrappers;

pub use traits::{AgentId, EnvInfo, HostCommand, MarlEnv, TickResult};
pub use wrappers::EpisodeStats;
