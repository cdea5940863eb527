//! Core environment trait definitions.

use crate::events::{Category, ContactEvent, EntityId};
use crate::spaces::Box as BoxSpace;
use crate::utils::Vec2;
use ndarray::ArrayD;
use std::collections::HashMap;

/// Identifier for one agent within an environment.
pub type AgentId = u32;

/// Information returned from environment steps
#[derive(Clone, Debug, Default)]
pub struct EnvInfo {
    /// Mean episode return across agents (if done)
    pub episode_return: Option<f32>,
    /// Episode length (if done)
    pub episode_length: Option<f32>,
    /// Custom metrics (kept minimal for performance)
    pub extra: smallvec::SmallVec<[(&'static str, f32); 4]>,
}

impl EnvInfo {
    /// Create empty info
    pub fn new() -> Self {
        Self::default()
    }

    /// Add episode stats
    pub fn with_episode_stats(mut self, ret: f32, len: u32) -> Self {
        self.episode_return = Some(ret);
        self.episode_length = Some(len as f32);
        self
    }

    /// Add a custom metric (use rarely)
    pub fn with_extra(mut self, key: &'static str, value: f32) -> Self {
        self.extra.push((key, value));
        self
    }

    /// Get a value by key (including defaults)
    pub fn get(&self, key: &str) -> Option<f32> {
        match key {
            "episode_return" => self.episode_return,
            "episode_length" => self.episode_length,
            _ => self.extra.iter().find(|(k, _)| k == &key).map(|(_, v)| *v),
        }
    }
}

/// An instruction to the host engine, emitted whenever the episode manager
/// changes entity lifecycle or placement. Hosts that mirror the simulation
/// (renderer, physics scene) apply these in order; headless training can
/// ignore them.
#[derive(Clone, Debug, PartialEq)]
pub enum HostCommand {
    /// Move an existing entity.
    Reposition { entity: EntityId, position: Vec2 },
    /// Create an entity with the given tag.
    Spawn {
        entity: EntityId,
        category: Category,
        position: Vec2,
    },
    /// Remove an entity permanently (until respawned under a fresh id).
    Destroy { entity: EntityId },
    /// Exclude an entity from simulation until reactivated.
    Deactivate { entity: EntityId },
    /// Re-include a previously deactivated entity.
    Reactivate { entity: EntityId },
    /// The agent's episode ended; the trainer should cut its trajectory.
    EndEpisode { agent: AgentId },
}

/// Result from a multi-agent environment tick.
#[derive(Clone, Debug)]
pub struct TickResult {
    /// Observations for each active agent
    pub observations: HashMap<AgentId, ArrayD<f32>>,
    /// Reward accrued this tick for each active agent
    pub rewards: HashMap<AgentId, f32>,
    /// Whether the episode terminated (win condition met)
    pub terminated: HashMap<AgentId, bool>,
    /// Whether the episode truncated (step bound reached)
    pub truncated: HashMap<AgentId, bool>,
    /// Entity lifecycle instructions for the host
    pub commands: Vec<HostCommand>,
    /// Additional info
    pub info: EnvInfo,
}

impl TickResult {
    /// Check if the episode ended this tick for any agent.
    pub fn done(&self) -> bool {
        self.terminated.values().any(|&t| t)
            || self.truncated.values().any(|&t| t)
    }
}

/// Core trait for tick-driven multi-agent environments.
///
/// One call to [`MarlEnv::step`] is one atomic simulation round: every
/// active agent decodes its action against the same frozen snapshot of
/// world state, motion integrates, the tick's contact events apply in
/// canonical order, and fresh observations are encoded. There is no
/// concurrency within a tick and no suspension point; the step-count bound
/// is the only timeout.
///
/// Environments own their episode lifecycle: when a termination or
/// truncation condition fires, the environment resets itself in place
/// (re-randomizing spawns, zeroing counters) and the returned observations
/// come from the fresh episode. The `terminated`/`truncated` flags and
/// `EndEpisode` commands tell the trainer where the trajectory cut.
pub trait MarlEnv: Send {
    /// Per-agent observation bounds
    fn observation_space(&self) -> BoxSpace;

    /// Per-agent action bounds.
    ///
    /// Components are semantically in `[-1, 1]` but out-of-range values are
    /// never clamped: they scale motion deltas proportionally. A wrong
    /// action *dimensionality* is a fatal configuration error and panics.
    fn action_space(&self) -> BoxSpace;

    /// Total number of agents (max population)
    fn num_agents(&self) -> usize;

    /// Ids of currently active agents
    fn active_agents(&self) -> Vec<AgentId> {
        (0..self.num_agents() as AgentId).collect()
    }

    /// Reset the environment and start a new episode.
    ///
    /// # Arguments
    /// * `seed` - Optional random seed for reproducibility
    fn reset(&mut self, seed: Option<u64>) -> (HashMap<AgentId, ArrayD<f32>>, EnvInfo);

    /// Advance one tick.
    ///
    /// # Arguments
    /// * `actions` - Per-agent continuous action vectors. Agents without an
    ///   entry sit still this tick.
    /// * `contacts` - Contact events the host detected since the previous
    ///   tick. Order does not matter; the environment re-sorts them.
    fn step(
        &mut self,
        actions: &HashMap<AgentId, ArrayD<f32>>,
        contacts: &[ContactEvent],
    ) -> TickResult;

    /// Optional: Render the environment
    fn render(&self) -> Option<String> {
        None
    }

    /// Check if the previous tick ended the episode
    fn is_done(&self) -> bool {
        false
    }
}
