//! # ArenaLib
//!
//! A host-independent toolkit for multi-agent reinforcement-learning
//! environments.
//!
//! ## Overview
//!
//! ArenaLib provides:
//! - The `MarlEnv` trait for tick-driven multi-agent environments
//! - Continuous observation/action spaces
//! - A tagged contact-event stream for host physics integration
//! - Host commands for mirroring entity lifecycle into a renderer/physics
//!   backend
//!
//! The environments themselves never simulate collisions. A host engine
//! detects contacts between tagged entities and reports them once per tick;
//! the environment maps those contacts to rewards and state transitions and
//! replies with observations plus any entity lifecycle instructions.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use arenalib::prelude::*;
//! use arenalib_envs::Warehouse;
//!
//! let mut env = Warehouse::new();
//! let (obs, _) = env.reset(Some(42));
//!
//! // Step with per-agent actions and the host's contact events.
//! let result = env.step(&actions, &contacts);
//! ```

pub mod env;
pub mod error;
pub mod events;
pub mod spaces;
pub mod utils;

pub use error::ConfigError;

/// Commonly used types, for glob import.
pub mod prelude {
    pub use crate::env::{
        AgentId, EnvInfo, EpisodeStats, HostCommand, MarlEnv, TickResult,
    };
    pub use crate::error::ConfigError;
    pub use crate::events::{Category, ContactEvent, ContactPhase, EntityId};
    pub use crate::spaces::{Box as BoxSpace, Space};
    pub use crate::utils::Vec2;
}
