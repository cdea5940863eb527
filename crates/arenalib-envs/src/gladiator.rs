//! Gladiator sword-and-shield combat environment.

use arenalib::env::{AgentId, EnvInfo, HostCommand, MarlEnv, TickResult};
use arenalib::events::{sort_contacts, ContactEvent, ContactPhase, EntityId};
use arenalib::spaces::Box as BoxSpace;
use arenalib::utils::{deg_to_rad, push_angle, Vec2};
use arenalib::ConfigError;
use ndarray::{ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Observation layout: own heading, position, enemy heading, delta to
/// enemy, both shield yaws, own sword yaw+pitch, enemy sword yaw+pitch,
/// every angle as a sin/cos pair.
pub const OBS_DIM: usize = 20;
/// [move_x, move_z, turn, sword_pitch, sword_yaw, shield_orbit]
pub const ACTION_DIM: usize = 6;

const STEP_PENALTY: f32 = -0.001;
const RANGE_PENALTY_SCALE: f32 = -0.003;
const OWN_SWORD_PENALTY: f32 = -0.1;
const STRUCK_PENALTY: f32 = -2.0;
const SHIELD_HIT_ATTACKER_PENALTY: f32 = -0.2;
const WALL_PENALTY: f32 = -0.25;
const BLOCK_DEFENDER_REWARD: f32 = 1.0;
const BLOCK_ATTACKER_PENALTY: f32 = -0.75;
const BLOCK_GLOBAL_BONUS: f32 = 0.1;
const HIT_GLOBAL_BONUS: f32 = 1.0;

/// Configuration for the gladiator arena.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GladiatorConfig {
    /// Agent move speed (units/s)
    pub move_speed: f32,
    /// Body and sword turn rate at full action deflection (deg/s)
    pub turn_rate: f32,
    /// Shield orbital rate at full action deflection (deg/s)
    pub shield_orbit_rate: f32,
    /// Radius of the shield's orbit around the agent
    pub shield_radius: f32,
    /// Position normalization divisor for observations
    pub norm_size: f32,
    /// Engagement radius; no distance penalty inside it
    pub penalty_radius: f32,
    /// Arena half-size; spawns are drawn within it
    pub half_size: f32,
    /// Minimum spawn offset from the center line
    pub spawn_offset: f32,
    /// Step bound before the episode truncates
    pub max_steps: u32,
    /// Fixed timestep (s)
    pub timestep: f32,
}

impl Default for GladiatorConfig {
    fn default() -> Self {
        Self {
            move_speed: 1.0,
            turn_rate: 200.0,
            shield_orbit_rate: 300.0,
            shield_radius: 0.8,
            norm_size: 4.5,
            penalty_radius: 4.0,
            half_size: 4.0,
            spawn_offset: 1.0,
            max_steps: 2000,
            timestep: 0.02,
        }
    }
}

impl GladiatorConfig {
    /// Validate once at construction; per-tick inputs are never re-checked.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("move_speed", self.move_speed),
            ("turn_rate", self.turn_rate),
            ("shield_orbit_rate", self.shield_orbit_rate),
            ("shield_radius", self.shield_radius),
            ("norm_size", self.norm_size),
            ("penalty_radius", self.penalty_radius),
            ("half_size", self.half_size),
            ("spawn_offset", self.spawn_offset),
            ("timestep", self.timestep),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if self.max_steps == 0 {
            return Err(ConfigError::ZeroCount { name: "max_steps" });
        }
        if self.spawn_offset >= self.half_size {
            return Err(ConfigError::PaddingTooLarge {
                padding: self.spawn_offset,
                half_size: self.half_size,
            });
        }
        Ok(())
    }
}

/// Per-gladiator mutable state.
///
/// Sword angles and the shield orbit angle deliberately survive episode
/// resets, matching the source rig: only heading, shield yaw, velocity and
/// the blocking flag are re-randomized or cleared.
#[derive(Clone, Debug, Default)]
struct Fighter {
    pos: Vec2,
    vel: Vec2,
    heading: f32,
    sword_pitch: f32,
    sword_yaw: f32,
    shield_yaw: f32,
    shield_orbit: f32,
    blocking: bool,
}

/// Body part resolved from an entity id.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Part {
    Body(usize),
    Sword(usize),
    Shield(usize),
    Wall,
}

/// Two-agent arena combat.
///
/// Each gladiator commands planar movement, body yaw, a two-axis sword and
/// an orbiting shield. A clean sword hit on an unshielded body ends the
/// bout; a shield block rewards the defender and flips its blocking state
/// for as long as the contact persists.
pub struct Gladiator {
    config: GladiatorConfig,
    fighters: [Fighter; 2],
    steps: u32,
    done: bool,
    rng: StdRng,
}

impl Gladiator {
    /// Create with default configuration
    pub fn new() -> Self {
        Self::with_config(GladiatorConfig::default()).expect("default config is valid")
    }

    /// Create with a custom configuration
    pub fn with_config(config: GladiatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut env = Self {
            config,
            fighters: [Fighter::default(), Fighter::default()],
            steps: 0,
            done: false,
            rng: StdRng::from_entropy(),
        };
        env.start_new_episode();
        Ok(env)
    }

    /// Entity id of an agent's body
    pub fn body_id(agent: AgentId) -> EntityId {
        EntityId(agent)
    }

    /// Entity id of an agent's sword
    pub fn sword_id(agent: AgentId) -> EntityId {
        EntityId(2 + agent)
    }

    /// Entity id of an agent's shield
    pub fn shield_id(agent: AgentId) -> EntityId {
        EntityId(4 + agent)
    }

    /// Entity ids of the four arena walls
    pub fn wall_ids() -> [EntityId; 4] {
        [EntityId(6), EntityId(7), EntityId(8), EntityId(9)]
    }

    /// Current planar position of an agent
    pub fn position(&self, agent: AgentId) -> Vec2 {
        self.fighters[agent as usize].pos
    }

    /// Derived shield position on the orbit circle
    pub fn shield_position(&self, agent: AgentId) -> Vec2 {
        let f = &self.fighters[agent as usize];
        let rad = deg_to_rad(f.shield_orbit);
        f.pos + Vec2::new(rad.cos(), rad.sin()) * self.config.shield_radius
    }

    /// Shield orbit angle in degrees, kept in [0, 360)
    pub fn shield_orbit(&self, agent: AgentId) -> f32 {
        self.fighters[agent as usize].shield_orbit
    }

    /// Whether the agent's shield is currently absorbing a sword contact
    pub fn is_blocking(&self, agent: AgentId) -> bool {
        self.fighters[agent as usize].blocking
    }

    /// Steps elapsed in the current episode
    pub fn steps(&self) -> u32 {
        self.steps
    }

    fn classify(id: EntityId) -> Option<Part> {
        match id.0 {
            0 | 1 => Some(Part::Body(id.0 as usize)),
            2 | 3 => Some(Part::Sword(id.0 as usize - 2)),
            4 | 5 => Some(Part::Shield(id.0 as usize - 4)),
            6..=9 => Some(Part::Wall),
            _ => None,
        }
    }

    /// Reposition both fighters on opposite half-planes and clear
    /// per-episode state. Returns the host commands describing the reset.
    fn start_new_episode(&mut self) -> Vec<HostCommand> {
        let s = self.config.half_size;
        let off = self.config.spawn_offset;
        let mut commands = Vec::new();

        for i in 0..2 {
            let z = if i == 0 {
                self.rng.gen_range(off..s)
            } else {
                self.rng.gen_range(-s..-off)
            };
            let f = &mut self.fighters[i];
            f.pos = Vec2::new(self.rng.gen_range(-s..s), z);
            f.vel = Vec2::ZERO;
            f.heading = self.rng.gen_range(0.0..360.0);
            f.shield_yaw = self.rng.gen_range(0.0..360.0);
            f.blocking = false;

            commands.push(HostCommand::Reposition {
                entity: Self::body_id(i as AgentId),
                position: f.pos,
            });
            commands.push(HostCommand::EndEpisode {
                agent: i as AgentId,
            });
        }

        self.steps = 0;
        info!("gladiator arena reset");
        commands
    }

    fn observe(&self, agent: usize) -> ArrayD<f32> {
        let norm = self.config.norm_size;
        let me = &self.fighters[agent];
        let foe = &self.fighters[1 - agent];
        let mut obs = Vec::with_capacity(OBS_DIM);

        push_angle(&mut obs, me.heading);
        obs.push(me.pos.x / norm);
        obs.push(me.pos.z / norm);

        push_angle(&mut obs, foe.heading);
        let delta = foe.pos - me.pos;
        obs.push(delta.x / norm);
        obs.push(delta.z / norm);

        push_angle(&mut obs, me.shield_yaw);
        push_angle(&mut obs, foe.shield_yaw);
        push_angle(&mut obs, me.sword_yaw);
        push_angle(&mut obs, me.sword_pitch);
        push_angle(&mut obs, foe.sword_yaw);
        push_angle(&mut obs, foe.sword_pitch);

        ArrayD::from_shape_vec(IxDyn(&[OBS_DIM]), obs).expect("observation length is fixed")
    }

    /// Apply one oriented rule; returns true if it consumed the event.
    fn apply_rule(
        &mut self,
        x: Part,
        y: Part,
        phase: ContactPhase,
        rewards: &mut [f32; 2],
        sword_hit: &mut bool,
    ) -> bool {
        match (x, y) {
            (Part::Sword(i), Part::Body(j)) => {
                if phase != ContactPhase::Enter {
                    return true;
                }
                if i == j {
                    // Own sword grinding against the owner's body.
                    rewards[i] += OWN_SWORD_PENALTY;
                } else if !self.fighters[j].blocking {
                    rewards[j] += STRUCK_PENALTY;
                    *sword_hit = true;
                    debug!(victim = j, striker = i, "gladiator struck by enemy sword");
                }
                true
            }
            (Part::Sword(i), Part::Shield(j)) if i != j => {
                match phase {
                    ContactPhase::Enter => {
                        // Attacker's own contact penalty, the symmetric
                        // manager bonus, and the shield dispatcher all fire
                        // on the same contact. They stack; none replaces
                        // another.
                        rewards[i] += SHIELD_HIT_ATTACKER_PENALTY;
                        rewards[0] += BLOCK_GLOBAL_BONUS;
                        rewards[1] += BLOCK_GLOBAL_BONUS;
                        rewards[j] += BLOCK_DEFENDER_REWARD;
                        rewards[i] += BLOCK_ATTACKER_PENALTY;
                        self.fighters[j].blocking = true;
                        debug!(defender = j, attacker = i, "sword blocked by shield");
                    }
                    ContactPhase::Exit => {
                        self.fighters[j].blocking = false;
                    }
                }
                true
            }
            (Part::Body(i), Part::Wall) => {
                if phase == ContactPhase::Enter {
                    rewards[i] += WALL_PENALTY;
                }
                true
            }
            _ => false,
        }
    }

    fn apply_contact(
        &mut self,
        event: &ContactEvent,
        rewards: &mut [f32; 2],
        sword_hit: &mut bool,
    ) {
        let (Some(a), Some(b)) = (Self::classify(event.a), Self::classify(event.b)) else {
            return;
        };
        // The pair is unordered; try the rule both ways.
        if !self.apply_rule(a, b, event.phase, rewards, sword_hit) {
            self.apply_rule(b, a, event.phase, rewards, sword_hit);
        }
    }
}

impl Default for Gladiator {
    fn default() -> Self {
        Self::new()
    }
}

impl MarlEnv for Gladiator {
    fn observation_space(&self) -> BoxSpace {
        // Loose bounds: normalized deltas can reach ~1.8 across the arena
        BoxSpace::symmetric(OBS_DIM, 2.0)
    }

    fn action_space(&self) -> BoxSpace {
        BoxSpace::symmetric(ACTION_DIM, 1.0)
    }

    fn num_agents(&self) -> usize {
        2
    }

    fn reset(&mut self, seed: Option<u64>) -> (HashMap<AgentId, ArrayD<f32>>, EnvInfo) {
        if let Some(s) = seed {
            self.rng = StdRng::seed_from_u64(s);
        }
        self.start_new_episode();
        self.done = false;

        let obs = (0..2).map(|i| (i as AgentId, self.observe(i))).collect();
        (obs, EnvInfo::new())
    }

    fn step(
        &mut self,
        actions: &HashMap<AgentId, ArrayD<f32>>,
        contacts: &[ContactEvent],
    ) -> TickResult {
        let dt = self.config.timestep;
        let mut rewards = [0.0f32; 2];
        let mut commands = Vec::new();

        // Decode actions and integrate motion, agents in id order.
        for i in 0..2 {
            let f = &mut self.fighters[i];
            if let Some(action) = actions.get(&(i as AgentId)) {
                assert_eq!(
                    action.len(),
                    ACTION_DIM,
                    "gladiator action must have {} components",
                    ACTION_DIM
                );
                let a: Vec<f32> = action.iter().copied().collect();
                f.vel = Vec2::new(a[0], a[1]).normalize_or_zero() * self.config.move_speed;
                f.heading += a[2] * self.config.turn_rate * dt;
                f.sword_pitch += a[3] * self.config.turn_rate * dt;
                f.sword_yaw += a[4] * self.config.turn_rate * dt;
                f.shield_orbit =
                    (f.shield_orbit + a[5] * self.config.shield_orbit_rate * dt).rem_euclid(360.0);
            } else {
                f.vel = Vec2::ZERO;
            }
            f.pos = f.pos + f.vel * dt;
        }

        // Passive shaping: step penalty plus a disengagement penalty once
        // the fighters drift outside the engagement radius.
        let dist = self.fighters[0].pos.distance(self.fighters[1].pos);
        for r in &mut rewards {
            *r += STEP_PENALTY;
            if dist > self.config.penalty_radius {
                *r += RANGE_PENALTY_SCALE * (dist - self.config.penalty_radius);
            }
        }

        // Contact events in canonical order.
        let mut batch = contacts.to_vec();
        sort_contacts(&mut batch);
        let mut sword_hit = false;
        for event in &batch {
            self.apply_contact(event, &mut rewards, &mut sword_hit);
        }

        // Episode manager.
        self.steps += 1;
        let terminated = sword_hit;
        let truncated = !terminated && self.steps >= self.config.max_steps;

        let mut info = EnvInfo::new();
        if terminated {
            // Symmetric bonus on top of the struck/striking rewards.
            rewards[0] += HIT_GLOBAL_BONUS;
            rewards[1] += HIT_GLOBAL_BONUS;
            info = info.with_extra("sword_hit", 1.0);
        }

        self.done = terminated || truncated;
        if self.done {
            commands.extend(self.start_new_episode());
        }

        let observations = (0..2).map(|i| (i as AgentId, self.observe(i))).collect();
        TickResult {
            observations,
            rewards: (0..2).map(|i| (i as AgentId, rewards[i as usize])).collect(),
            terminated: (0..2).map(|i| (i, terminated)).collect(),
            truncated: (0..2).map(|i| (i, truncated)).collect(),
            commands,
            info,
        }
    }

    fn render(&self) -> Option<String> {
        let a = &self.fighters[0];
        let b = &self.fighters[1];
        Some(format!(
            "g0 ({:.2},{:.2}) {}| g1 ({:.2},{:.2}) {}",
            a.pos.x,
            a.pos.z,
            if a.blocking { "[block] " } else { "" },
            b.pos.x,
            b.pos.z,
            if b.blocking { "[block] " } else { "" },
        ))
    }

    fn is_done(&self) -> bool {
        self.done
    }
}
