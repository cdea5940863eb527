//! Environment wrappers for common functionality.

use super::{AgentId, EnvInfo, MarlEnv, TickResult};
use crate::events::ContactEvent;
use crate::spaces::Box as BoxSpace;
use ndarray::ArrayD;
use std::collections::HashMap;

/// Wrapper that tracks per-agent episode statistics.
///
/// Adds `episode_return` (mean across agents) and `episode_length` to info
/// when an episode completes.
pub struct EpisodeStats<E: MarlEnv> {
    env: E,
    returns: HashMap<AgentId, f32>,
    episode_length: u32,
}

impl<E: MarlEnv> EpisodeStats<E> {
    /// Wrap an environment with episode statistics tracking
    pub fn new(env: E) -> Self {
        Self {
            env,
            returns: HashMap::new(),
            episode_length: 0,
        }
    }

    /// Get a reference to the inner environment
    pub fn inner(&self) -> &E {
        &self.env
    }

    /// Get a mutable reference to the inner environment
    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.env
    }

    /// Return accrued so far this episode for one agent.
    pub fn agent_return(&self, agent: AgentId) -> f32 {
        self.returns.get(&agent).copied().unwrap_or(0.0)
    }
}

impl<E: MarlEnv> MarlEnv for EpisodeStats<E> {
    fn observation_space(&self) -> BoxSpace {
        self.env.observation_space()
    }

    fn action_space(&self) -> BoxSpace {
        self.env.action_space()
    }

    fn num_agents(&self) -> usize {
        self.env.num_agents()
    }

    fn active_agents(&self) -> Vec<AgentId> {
        self.env.active_agents()
    }

    fn reset(&mut self, seed: Option<u64>) -> (HashMap<AgentId, ArrayD<f32>>, EnvInfo) {
        self.returns.clear();
        self.episode_length = 0;
        self.env.reset(seed)
    }

    fn step(
        &mut self,
        actions: &HashMap<AgentId, ArrayD<f32>>,
        contacts: &[ContactEvent],
    ) -> TickResult {
        let mut result = self.env.step(actions, contacts);

        self.episode_length += 1;
        for (&agent, &r) in &result.rewards {
            *self.returns.entry(agent).or_insert(0.0) += r;
        }

        if result.done() {
            let mean_return = if self.returns.is_empty() {
                0.0
            } else {
                self.returns.values().sum::<f32>() / self.returns.len() as f32
            };
            result.info = result
                .info
                .with_episode_stats(mean_return, self.episode_length);

            // The inner env already reset itself; start fresh counters.
            self.returns.clear();
            self.episode_length = 0;
        }

        result
    }

    fn render(&self) -> Option<String> {
        self.env.render()
    }

    fn is_done(&self) -> bool {
        self.env.is_done()
    }
}
