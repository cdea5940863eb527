//! Warehouse pick-and-deliver environment.

use arenalib::env::{AgentId, EnvInfo, HostCommand, MarlEnv, TickResult};
use arenalib::events::{sort_contacts, Category, ContactEvent, ContactPhase, EntityId};
use arenalib::spaces::Box as BoxSpace;
use arenalib::utils::{heading_forward, heading_right, push_angle, Vec2};
use arenalib::ConfigError;
use ndarray::{ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Observation layout: heading sin/cos, normalized position, agent-local
/// planar velocity, then the goal delta (dx, dz, magnitude).
pub const OBS_DIM: usize = 9;
/// [move_x, move_z, turn]
pub const ACTION_DIM: usize = 3;

const STEP_PENALTY: f32 = -0.002;
const PROGRESS_REWARD: f32 = 0.01;
const REGRESS_PENALTY: f32 = -0.005;
const COLLISION_PENALTY: f32 = -5.0;
const PICKUP_REWARD: f32 = 2.0;
const DELIVERY_REWARD: f32 = 4.0;

/// Parking spot for agents deactivated after the last pickup.
const PARKED: Vec2 = Vec2 { x: 999.0, z: 999.0 };

/// Configuration for the warehouse floor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Floor half-size; spawns are drawn within it
    pub half_size: f32,
    /// Agent move speed (units/s)
    pub move_speed: f32,
    /// Turn rate at full action deflection (deg/s)
    pub turn_rate: f32,
    /// Minimum spawn separation from the drop-off tiles
    pub padding: f32,
    /// Number of courier agents
    pub num_agents: usize,
    /// Number of wall obstacles regenerated each episode
    pub num_walls: usize,
    /// Number of targets spawned each episode
    pub num_targets: usize,
    /// Step bound before the episode truncates
    pub max_steps: u32,
    /// Fixed timestep (s)
    pub timestep: f32,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            half_size: 9.5,
            move_speed: 3.0,
            turn_rate: 200.0,
            padding: 1.5,
            num_agents: 4,
            num_walls: 4,
            num_targets: 16,
            max_steps: 1500,
            timestep: 0.02,
        }
    }
}

impl WarehouseConfig {
    /// Targets are sensed within twice the floor half-size.
    pub fn sensing_radius(&self) -> f32 {
        self.half_size * 2.0
    }

    /// Validate once at construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("half_size", self.half_size),
            ("move_speed", self.move_speed),
            ("turn_rate", self.turn_rate),
            ("padding", self.padding),
            ("timestep", self.timestep),
        ] {
            if value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if self.num_agents == 0 {
            return Err(ConfigError::ZeroCount { name: "num_agents" });
        }
        if self.max_steps == 0 {
            return Err(ConfigError::ZeroCount { name: "max_steps" });
        }
        if self.padding >= self.half_size {
            return Err(ConfigError::PaddingTooLarge {
                padding: self.padding,
                half_size: self.half_size,
            });
        }
        Ok(())
    }
}

/// What a courier is carrying.
///
/// Transitions only through contact events: a target pickup sets it, a
/// matching tile delivery clears it, an episode reset clears it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Holding {
    #[default]
    None,
    Red,
    Yellow,
}

/// Target color tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetColor {
    Red,
    Yellow,
}

#[derive(Clone, Debug, Default)]
struct Courier {
    pos: Vec2,
    vel: Vec2,
    heading: f32,
    holding: Holding,
    /// Progress-shaping baseline; `None` is the sentinel meaning "do not
    /// compare this tick" (fresh episode or a `holding` change).
    prev_distance: Option<f32>,
    /// Last measured goal distance. Kept when no target is in sensing
    /// range, so the comparison degrades to "no progress" instead of
    /// chasing a stale goal.
    last_goal_distance: f32,
    active: bool,
}

#[derive(Clone, Debug)]
struct Target {
    id: EntityId,
    color: TargetColor,
    pos: Vec2,
    alive: bool,
}

#[derive(Clone, Debug)]
struct Obstacle {
    id: EntityId,
    pos: Vec2,
}

/// Entity resolved from an id.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Slot {
    Agent(usize),
    RedTile,
    YellowTile,
    Wall,
    Target(usize),
}

/// Multi-agent pick-and-deliver task.
///
/// Couriers roam a square floor scattered with colored targets, walls and
/// two fixed drop-off tiles. Touching a target while empty-handed picks it
/// up and destroys it; entering the matching tile's trigger zone delivers.
/// The episode ends when every target has been returned or the step bound
/// runs out. Once the last target is picked up, any courier still holding
/// nothing is parked out of bounds until the reset.
pub struct Warehouse {
    config: WarehouseConfig,
    agents: Vec<Courier>,
    targets: Vec<Target>,
    walls: Vec<Obstacle>,
    red_tile: Vec2,
    yellow_tile: Vec2,
    /// Fresh ids for walls/targets; never reused, so a destroyed target's
    /// id stays dead for the rest of the run.
    next_id: u32,
    steps: u32,
    targets_collected: usize,
    targets_returned: usize,
    done: bool,
    rng: StdRng,
}

impl Warehouse {
    /// Create with default configuration
    pub fn new() -> Self {
        Self::with_config(WarehouseConfig::default()).expect("default config is valid")
    }

    /// Create with a custom configuration
    pub fn with_config(config: WarehouseConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let num_agents = config.num_agents;
        let mut env = Self {
            next_id: num_agents as u32 + 2,
            config,
            agents: vec![Courier::default(); num_agents],
            targets: Vec::new(),
            walls: Vec::new(),
            red_tile: Vec2::ZERO,
            yellow_tile: Vec2::ZERO,
            steps: 0,
            targets_collected: 0,
            targets_returned: 0,
            done: false,
            rng: StdRng::from_entropy(),
        };
        env.start_new_episode();
        Ok(env)
    }

    /// Entity id of a courier's body
    pub fn body_id(&self, agent: AgentId) -> EntityId {
        EntityId(agent)
    }

    /// Entity id of the red drop-off tile
    pub fn red_tile_id(&self) -> EntityId {
        EntityId(self.config.num_agents as u32)
    }

    /// Entity id of the yellow drop-off tile
    pub fn yellow_tile_id(&self) -> EntityId {
        EntityId(self.config.num_agents as u32 + 1)
    }

    /// Position of the red drop-off tile
    pub fn red_tile_position(&self) -> Vec2 {
        self.red_tile
    }

    /// Position of the yellow drop-off tile
    pub fn yellow_tile_position(&self) -> Vec2 {
        self.yellow_tile
    }

    /// Current planar position of a courier
    pub fn agent_position(&self, agent: AgentId) -> Vec2 {
        self.agents[agent as usize].pos
    }

    /// What the courier is carrying
    pub fn holding(&self, agent: AgentId) -> Holding {
        self.agents[agent as usize].holding
    }

    /// Whether the courier is still in play this episode
    pub fn is_active(&self, agent: AgentId) -> bool {
        self.agents[agent as usize].active
    }

    /// Live (not yet collected) targets: id, color, position
    pub fn live_targets(&self) -> Vec<(EntityId, TargetColor, Vec2)> {
        self.targets
            .iter()
            .filter(|t| t.alive)
            .map(|t| (t.id, t.color, t.pos))
            .collect()
    }

    /// Wall obstacle ids for the current episode
    pub fn wall_ids(&self) -> Vec<EntityId> {
        self.walls.iter().map(|w| w.id).collect()
    }

    /// Targets picked up this episode
    pub fn targets_collected(&self) -> usize {
        self.targets_collected
    }

    /// Targets delivered this episode
    pub fn targets_returned(&self) -> usize {
        self.targets_returned
    }

    /// Steps elapsed in the current episode
    pub fn steps(&self) -> u32 {
        self.steps
    }

    fn alloc_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    fn slot(&self, id: EntityId) -> Option<Slot> {
        let n = self.config.num_agents as u32;
        if id.0 < n {
            return Some(Slot::Agent(id.0 as usize));
        }
        if id == self.red_tile_id() {
            return Some(Slot::RedTile);
        }
        if id == self.yellow_tile_id() {
            return Some(Slot::YellowTile);
        }
        if self.walls.iter().any(|w| w.id == id) {
            return Some(Slot::Wall);
        }
        self.targets
            .iter()
            .position(|t| t.id == id)
            .map(Slot::Target)
    }

    /// Random position at least `padding` away from both tiles.
    fn valid_random_position(&mut self) -> Vec2 {
        let s = self.config.half_size;
        loop {
            let pos = Vec2::new(self.rng.gen_range(-s..s), self.rng.gen_range(-s..s));
            if pos.distance(self.red_tile) >= self.config.padding
                && pos.distance(self.yellow_tile) >= self.config.padding
            {
                return pos;
            }
        }
    }

    /// Reposition tiles, regenerate walls and targets, respawn couriers,
    /// zero every counter. Returns the host commands describing the reset.
    fn start_new_episode(&mut self) -> Vec<HostCommand> {
        let mut commands = Vec::new();

        // Destructible entities from the previous episode go away first.
        for wall in self.walls.drain(..) {
            commands.push(HostCommand::Destroy { entity: wall.id });
        }
        let stale: Vec<Target> = self.targets.drain(..).collect();
        for target in stale {
            if target.alive {
                commands.push(HostCommand::Destroy { entity: target.id });
            }
        }

        // Tiles: the yellow tile keeps a minimum separation from the red.
        let s = self.config.half_size;
        self.red_tile = Vec2::new(self.rng.gen_range(-s..s), self.rng.gen_range(-s..s));
        loop {
            let pos = Vec2::new(self.rng.gen_range(-s..s), self.rng.gen_range(-s..s));
            if pos.distance(self.red_tile) >= self.config.padding {
                self.yellow_tile = pos;
                break;
            }
        }
        commands.push(HostCommand::Reposition {
            entity: self.red_tile_id(),
            position: self.red_tile,
        });
        commands.push(HostCommand::Reposition {
            entity: self.yellow_tile_id(),
            position: self.yellow_tile,
        });

        for _ in 0..self.config.num_walls {
            let pos = self.valid_random_position();
            let id = self.alloc_id();
            self.walls.push(Obstacle { id, pos });
            commands.push(HostCommand::Spawn {
                entity: id,
                category: Category::Wall,
                position: pos,
            });
        }

        for _ in 0..self.config.num_targets {
            let pos = self.valid_random_position();
            let color = if self.rng.gen_range(0..2) == 0 {
                TargetColor::Red
            } else {
                TargetColor::Yellow
            };
            let id = self.alloc_id();
            self.targets.push(Target {
                id,
                color,
                pos,
                alive: true,
            });
            commands.push(HostCommand::Spawn {
                entity: id,
                category: match color {
                    TargetColor::Red => Category::RedTarget,
                    TargetColor::Yellow => Category::YellowTarget,
                },
                position: pos,
            });
        }

        let lo = -s + self.config.padding;
        let hi = s - self.config.padding;
        for i in 0..self.config.num_agents {
            let pos = Vec2::new(self.rng.gen_range(lo..hi), self.rng.gen_range(lo..hi));
            let heading = self.rng.gen_range(0.0..360.0);
            let agent = &mut self.agents[i];
            let was_parked = !agent.active;
            *agent = Courier {
                pos,
                vel: Vec2::ZERO,
                heading,
                holding: Holding::None,
                prev_distance: None,
                last_goal_distance: 0.0,
                active: true,
            };
            if was_parked {
                commands.push(HostCommand::Reactivate {
                    entity: self.body_id(i as AgentId),
                });
            }
            commands.push(HostCommand::Reposition {
                entity: self.body_id(i as AgentId),
                position: pos,
            });
            commands.push(HostCommand::EndEpisode {
                agent: i as AgentId,
            });
        }

        self.steps = 0;
        self.targets_collected = 0;
        self.targets_returned = 0;
        info!(
            targets = self.config.num_targets,
            walls = self.config.num_walls,
            "warehouse episode reset"
        );
        commands
    }

    /// Nearest live target within sensing radius; first minimum in scan
    /// order wins ties. Shared by observation and reward shaping so the two
    /// can never disagree.
    fn nearest_target(&self, from: Vec2) -> Option<&Target> {
        let radius = self.config.sensing_radius();
        let mut best: Option<&Target> = None;
        let mut best_dist = f32::MAX;
        for target in &self.targets {
            if !target.alive {
                continue;
            }
            let dist = from.distance(target.pos);
            if dist <= radius && dist < best_dist {
                best_dist = dist;
                best = Some(target);
            }
        }
        best
    }

    /// The point the agent should be closing on: nearest visible target
    /// when empty-handed (its own position when nothing is in range), else
    /// the matching tile.
    fn goal_point(&self, agent: usize) -> Vec2 {
        let me = &self.agents[agent];
        match me.holding {
            Holding::Red => self.red_tile,
            Holding::Yellow => self.yellow_tile,
            Holding::None => self.nearest_target(me.pos).map(|t| t.pos).unwrap_or(me.pos),
        }
    }

    fn observe(&self, agent: usize) -> ArrayD<f32> {
        let me = &self.agents[agent];
        let half = self.config.half_size;
        let mut obs = Vec::with_capacity(OBS_DIM);

        push_angle(&mut obs, me.heading);
        obs.push(me.pos.x / half);
        obs.push(me.pos.z / half);

        // Velocity in the agent's own frame. Motion is planar, so two
        // components carry everything.
        obs.push(me.vel.dot(heading_right(me.heading)));
        obs.push(me.vel.dot(heading_forward(me.heading)));

        let delta = self.goal_point(agent) - me.pos;
        let denom = half * 2.0;
        obs.push(delta.x / denom);
        obs.push(delta.z / denom);
        obs.push(delta.length() / denom);

        ArrayD::from_shape_vec(IxDyn(&[OBS_DIM]), obs).expect("observation length is fixed")
    }

    /// Step penalty plus progress shaping against the previous tick's goal
    /// distance.
    fn shaping_reward(&mut self, agent: usize) -> f32 {
        let mut reward = STEP_PENALTY;

        let me = &self.agents[agent];
        let measured = match me.holding {
            Holding::Red => Some(me.pos.distance(self.red_tile)),
            Holding::Yellow => Some(me.pos.distance(self.yellow_tile)),
            Holding::None => self.nearest_target(me.pos).map(|t| me.pos.distance(t.pos)),
        };

        let me = &mut self.agents[agent];
        if let Some(dist) = measured {
            me.last_goal_distance = dist;
        }
        let current = me.last_goal_distance;
        if let Some(prev) = me.prev_distance {
            reward += if current < prev {
                PROGRESS_REWARD
            } else {
                REGRESS_PENALTY
            };
        }
        me.prev_distance = Some(current);
        reward
    }

    fn apply_contact(
        &mut self,
        event: &ContactEvent,
        rewards: &mut HashMap<AgentId, f32>,
        commands: &mut Vec<HostCommand>,
    ) {
        if event.phase != ContactPhase::Enter {
            return;
        }
        let (Some(a), Some(b)) = (self.slot(event.a), self.slot(event.b)) else {
            return;
        };
        if !self.apply_rule(a, b, rewards, commands) {
            self.apply_rule(b, a, rewards, commands);
        }
    }

    /// Apply one oriented rule; returns true if it consumed the event.
    /// Contacts naming a parked courier are stale host reports and ignored.
    fn apply_rule(
        &mut self,
        x: Slot,
        y: Slot,
        rewards: &mut HashMap<AgentId, f32>,
        commands: &mut Vec<HostCommand>,
    ) -> bool {
        let Slot::Agent(i) = x else {
            return false;
        };
        if !self.agents[i].active {
            return true;
        }
        let id = i as AgentId;
        match y {
            Slot::Agent(j) => {
                if self.agents[j].active {
                    *rewards.entry(id).or_insert(0.0) += COLLISION_PENALTY;
                    *rewards.entry(j as AgentId).or_insert(0.0) += COLLISION_PENALTY;
                }
                true
            }
            Slot::Wall => {
                *rewards.entry(id).or_insert(0.0) += COLLISION_PENALTY;
                true
            }
            Slot::Target(t) => {
                if self.targets[t].alive && self.agents[i].holding == Holding::None {
                    let target_id = self.targets[t].id;
                    let color = self.targets[t].color;
                    self.targets[t].alive = false;
                    self.targets_collected += 1;
                    self.agents[i].holding = match color {
                        TargetColor::Red => Holding::Red,
                        TargetColor::Yellow => Holding::Yellow,
                    };
                    self.agents[i].prev_distance = None;
                    *rewards.entry(id).or_insert(0.0) += PICKUP_REWARD;
                    commands.push(HostCommand::Destroy { entity: target_id });
                    debug!(agent = i, color = ?color, "target collected");
                }
                true
            }
            Slot::RedTile | Slot::YellowTile => {
                let wanted = if y == Slot::RedTile {
                    Holding::Red
                } else {
                    Holding::Yellow
                };
                if self.agents[i].holding == wanted {
                    self.agents[i].holding = Holding::None;
                    self.agents[i].prev_distance = None;
                    self.targets_returned += 1;
                    *rewards.entry(id).or_insert(0.0) += DELIVERY_REWARD;
                    debug!(agent = i, tile = ?wanted, "target delivered");
                }
                true
            }
        }
    }
}

impl Default for Warehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl MarlEnv for Warehouse {
    fn observation_space(&self) -> BoxSpace {
        // Loose bounds: local velocity is unnormalized, up to move_speed
        BoxSpace::symmetric(OBS_DIM, 4.0)
    }

    fn action_space(&self) -> BoxSpace {
        BoxSpace::symmetric(ACTION_DIM, 1.0)
    }

    fn num_agents(&self) -> usize {
        self.config.num_agents
    }

    fn active_agents(&self) -> Vec<AgentId> {
        (0..self.config.num_agents)
            .filter(|&i| self.agents[i].active)
            .map(|i| i as AgentId)
            .collect()
    }

    fn reset(&mut self, seed: Option<u64>) -> (HashMap<AgentId, ArrayD<f32>>, EnvInfo) {
        if let Some(s) = seed {
            self.rng = StdRng::seed_from_u64(s);
        }
        self.start_new_episode();
        self.done = false;

        let obs = (0..self.config.num_agents)
            .map(|i| (i as AgentId, self.observe(i)))
            .collect();
        (obs, EnvInfo::new())
    }

    fn step(
        &mut self,
        actions: &HashMap<AgentId, ArrayD<f32>>,
        contacts: &[ContactEvent],
    ) -> TickResult {
        let dt = self.config.timestep;
        let mut commands = Vec::new();
        let mut rewards: HashMap<AgentId, f32> = self
            .active_agents()
            .into_iter()
            .map(|i| (i, 0.0))
            .collect();

        // Decode actions and integrate motion, agents in id order.
        for i in 0..self.config.num_agents {
            if !self.agents[i].active {
                continue;
            }
            let agent = &mut self.agents[i];
            if let Some(action) = actions.get(&(i as AgentId)) {
                assert_eq!(
                    action.len(),
                    ACTION_DIM,
                    "warehouse action must have {} components",
                    ACTION_DIM
                );
                let a: Vec<f32> = action.iter().copied().collect();
                agent.vel = Vec2::new(a[0], a[1]).normalize_or_zero() * self.config.move_speed;
                agent.heading += a[2] * self.config.turn_rate * dt;
            } else {
                agent.vel = Vec2::ZERO;
            }
            agent.pos = agent.pos + agent.vel * dt;
        }

        // Passive shaping.
        for i in 0..self.config.num_agents {
            if self.agents[i].active {
                let r = self.shaping_reward(i);
                *rewards.entry(i as AgentId).or_insert(0.0) += r;
            }
        }

        // Contact events in canonical order.
        let mut batch = contacts.to_vec();
        sort_contacts(&mut batch);
        for event in &batch {
            self.apply_contact(event, &mut rewards, &mut commands);
        }

        // Episode manager.
        self.steps += 1;

        // Every target is off the floor: park the empty-handed couriers so
        // only carriers keep playing out their deliveries.
        if self.targets_collected >= self.config.num_targets {
            for i in 0..self.config.num_agents {
                let agent = &mut self.agents[i];
                if agent.active && agent.holding == Holding::None {
                    agent.active = false;
                    agent.pos = PARKED;
                    agent.vel = Vec2::ZERO;
                    let entity = EntityId(i as u32);
                    commands.push(HostCommand::Reposition {
                        entity,
                        position: PARKED,
                    });
                    commands.push(HostCommand::Deactivate { entity });
                    commands.push(HostCommand::EndEpisode {
                        agent: i as AgentId,
                    });
                    debug!(agent = i, "courier parked until reset");
                }
            }
        }

        let terminated = self.targets_returned >= self.config.num_targets;
        let truncated = !terminated && self.steps >= self.config.max_steps;

        let mut info = EnvInfo::new();
        self.done = terminated || truncated;
        if self.done {
            info = info
                .with_extra("targets_collected", self.targets_collected as f32)
                .with_extra("targets_returned", self.targets_returned as f32);
            commands.extend(self.start_new_episode());
        }

        let observations = self
            .active_agents()
            .into_iter()
            .map(|i| (i, self.observe(i as usize)))
            .collect();
        let agent_ids: Vec<AgentId> = rewards.keys().copied().collect();
        TickResult {
            observations,
            terminated: agent_ids.iter().map(|&i| (i, terminated)).collect(),
            truncated: agent_ids.iter().map(|&i| (i, truncated)).collect(),
            rewards,
            commands,
            info,
        }
    }

    fn render(&self) -> Option<String> {
        // Coarse ASCII floor plan: couriers, targets, tiles, walls.
        let cells = 21usize;
        let half = self.config.half_size;
        let mut grid = vec![vec!['.'; cells]; cells];
        let plot = |grid: &mut Vec<Vec<char>>, pos: Vec2, ch: char| {
            let to_cell = |v: f32| {
                (((v + half) / (2.0 * half) * (cells as f32 - 1.0)).round() as i32)
                    .clamp(0, cells as i32 - 1) as usize
            };
            grid[to_cell(pos.z)][to_cell(pos.x)] = ch;
        };
        plot(&mut grid, self.red_tile, 'R');
        plot(&mut grid, self.yellow_tile, 'Y');
        for wall in &self.walls {
            plot(&mut grid, wall.pos, '#');
        }
        for target in self.targets.iter().filter(|t| t.alive) {
            let ch = match target.color {
                TargetColor::Red => 'r',
                TargetColor::Yellow => 'y',
            };
            plot(&mut grid, target.pos, ch);
        }
        for agent in self.agents.iter().filter(|a| a.active) {
            plot(&mut grid, agent.pos, 'A');
        }
        Some(
            grid.into_iter()
                .map(|row| row.into_iter().collect::<String>())
                .collect::<Vec<_>>()
                .join("\n"),
        )
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn still() -> HashMap<AgentId, ArrayD<f32>> {
        HashMap::new()
    }

    fn move_action(agent: AgentId, dir: Vec2) -> HashMap<AgentId, ArrayD<f32>> {
        let arr = ArrayD::from_shape_vec(IxDyn(&[ACTION_DIM]), vec![dir.x, dir.z, 0.0]).unwrap();
        [(agent, arr)].into_iter().collect()
    }

    fn small_config(num_targets: usize) -> WarehouseConfig {
        WarehouseConfig {
            num_targets,
            ..WarehouseConfig::default()
        }
    }

    #[test]
    fn test_reset_invariant() {
        let mut env = Warehouse::new();
        env.reset(Some(42));

        assert_eq!(env.steps(), 0);
        assert_eq!(env.targets_collected(), 0);
        assert_eq!(env.targets_returned(), 0);
        assert_eq!(env.live_targets().len(), 16);
        assert_eq!(env.wall_ids().len(), 4);
        assert_eq!(env.active_agents().len(), 4);
        for i in 0..4 {
            assert_eq!(env.holding(i), Holding::None);
        }
        // Tiles keep their minimum separation and everything spawned away
        // from them.
        let red = env.red_tile_position();
        let yellow = env.yellow_tile_position();
        assert!(red.distance(yellow) >= 1.5);
        for (_, _, pos) in env.live_targets() {
            assert!(pos.distance(red) >= 1.5);
            assert!(pos.distance(yellow) >= 1.5);
        }
    }

    #[test]
    fn test_observation_matches_nearest_target() {
        let mut env = Warehouse::new();
        let (obs, _) = env.reset(Some(42));

        for agent in 0..4u32 {
            let me = env.agent_position(agent);
            // Recompute the nearest live target independently.
            let mut best: Option<(f32, Vec2)> = None;
            for (_, _, pos) in env.live_targets() {
                let d = me.distance(pos);
                if d <= 19.0 && best.map_or(true, |(bd, _)| d < bd) {
                    best = Some((d, pos));
                }
            }
            let goal = best.map(|(_, p)| p).unwrap_or(me);
            let delta = goal - me;
            let o = obs[&agent].as_slice().unwrap();
            assert!((o[6] - delta.x / 19.0).abs() < 1e-5);
            assert!((o[7] - delta.z / 19.0).abs() < 1e-5);
            assert!((o[8] - delta.length() / 19.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_goal_vector_zero_without_targets() {
        let mut env = Warehouse::with_config(small_config(0)).unwrap();
        let (obs, _) = env.reset(Some(3));
        let o = obs[&0].as_slice().unwrap();
        assert_eq!(o[6], 0.0);
        assert_eq!(o[7], 0.0);
        assert_eq!(o[8], 0.0);

        // First tick sets the baseline without comparing; from the second
        // tick on the unchanged distance counts as no progress.
        // (With zero targets every pickup already happened, so couriers
        // park and the episode terminates immediately; use the rewards of
        // that first tick only.)
        let result = env.step(&still(), &[]);
        assert!((result.rewards[&0] - STEP_PENALTY).abs() < 1e-6);
    }

    #[test]
    fn test_pickup_sets_holding_and_destroys_target() {
        let mut env = Warehouse::new();
        env.reset(Some(42));

        let (target_id, color, _) = env.live_targets()[0];
        let contact = ContactEvent::enter(env.body_id(0), target_id);
        let result = env.step(&still(), &[contact]);

        let expected_holding = match color {
            TargetColor::Red => Holding::Red,
            TargetColor::Yellow => Holding::Yellow,
        };
        assert_eq!(env.holding(0), expected_holding);
        assert_eq!(env.targets_collected(), 1);
        assert_eq!(env.live_targets().len(), 15);
        assert!(result.rewards[&0] > 1.9);
        assert!(result
            .commands
            .contains(&HostCommand::Destroy { entity: target_id }));
    }

    #[test]
    fn test_pickup_ignored_while_holding() {
        let mut env = Warehouse::new();
        env.reset(Some(42));

        let (first, _, _) = env.live_targets()[0];
        env.step(&still(), &[ContactEvent::enter(env.body_id(0), first)]);
        let held = env.holding(0);

        let (second, _, _) = env.live_targets()[0];
        env.step(&still(), &[ContactEvent::enter(env.body_id(0), second)]);
        assert_eq!(env.holding(0), held);
        assert_eq!(env.targets_collected(), 1);
        assert_eq!(env.live_targets().len(), 15);
    }

    #[test]
    fn test_delivery_requires_matching_tile() {
        let mut env = Warehouse::new();
        env.reset(Some(42));

        let (target_id, color, _) = env
            .live_targets()
            .into_iter()
            .find(|(_, c, _)| *c == TargetColor::Red)
            .expect("seeded episode has a red target");
        assert_eq!(color, TargetColor::Red);
        env.step(&still(), &[ContactEvent::enter(env.body_id(0), target_id)]);
        assert_eq!(env.holding(0), Holding::Red);

        // Wrong tile: nothing happens.
        let wrong = ContactEvent::enter(env.body_id(0), env.yellow_tile_id());
        env.step(&still(), &[wrong]);
        assert_eq!(env.holding(0), Holding::Red);
        assert_eq!(env.targets_returned(), 0);

        // Matching tile: delivery.
        let right = ContactEvent::enter(env.body_id(0), env.red_tile_id());
        let result = env.step(&still(), &[right]);
        assert_eq!(env.holding(0), Holding::None);
        assert_eq!(env.targets_returned(), 1);
        assert!(result.rewards[&0] > 3.9);
    }

    #[test]
    fn test_collision_penalties() {
        let mut env = Warehouse::new();
        env.reset(Some(8));

        // Agent-agent: both sides penalized from a single event.
        let bump = ContactEvent::enter(env.body_id(0), env.body_id(1));
        let result = env.step(&still(), &[bump]);
        assert!(result.rewards[&0] < -4.9);
        assert!(result.rewards[&1] < -4.9);

        // Agent-wall.
        let wall = env.wall_ids()[0];
        let result = env.step(&still(), &[ContactEvent::enter(env.body_id(2), wall)]);
        assert!(result.rewards[&2] < -4.9);
        assert!(result.rewards[&3] > -1.0);
    }

    #[test]
    fn test_progress_shaping_sign() {
        let mut env = Warehouse::new();
        env.reset(Some(42));

        // Carry a red target so the goal is pinned to the red tile.
        let (target_id, _, _) = env
            .live_targets()
            .into_iter()
            .find(|(_, c, _)| *c == TargetColor::Red)
            .unwrap();
        env.step(&still(), &[ContactEvent::enter(env.body_id(0), target_id)]);
        assert_eq!(env.holding(0), Holding::Red);

        // The pickup cleared the baseline: the next tick never compares
        // against the pre-pickup goal.
        let away = (env.agent_position(0) - env.red_tile_position()).normalize_or_zero();
        let result = env.step(&move_action(0, away), &[]);
        assert!((result.rewards[&0] - STEP_PENALTY).abs() < 1e-6);

        // Moving away from the tile: regress penalty.
        let result = env.step(&move_action(0, away), &[]);
        assert!((result.rewards[&0] - (STEP_PENALTY + REGRESS_PENALTY)).abs() < 1e-6);

        // Moving toward the tile: progress reward.
        let toward = (env.red_tile_position() - env.agent_position(0)).normalize_or_zero();
        let result = env.step(&move_action(0, toward), &[]);
        assert!((result.rewards[&0] - (STEP_PENALTY + PROGRESS_REWARD)).abs() < 1e-6);
    }

    #[test]
    fn test_idle_agent_regresses() {
        let mut env = Warehouse::new();
        env.reset(Some(42));

        // Tick 1 sets the baseline; tick 2 compares equal distances, which
        // counts as no progress.
        env.step(&still(), &[]);
        let result = env.step(&still(), &[]);
        assert!((result.rewards[&1] - (STEP_PENALTY + REGRESS_PENALTY)).abs() < 1e-6);
    }

    #[test]
    fn test_empty_handed_couriers_park_after_last_pickup() {
        let mut env = Warehouse::with_config(small_config(1)).unwrap();
        env.reset(Some(21));

        let (target_id, color, _) = env.live_targets()[0];
        let result = env.step(&still(), &[ContactEvent::enter(env.body_id(0), target_id)]);

        // The carrier stays; the three empty-handed couriers park.
        assert_eq!(env.active_agents(), vec![0]);
        assert!(!env.is_active(3));
        assert!(result
            .commands
            .iter()
            .any(|c| matches!(c, HostCommand::Deactivate { entity } if entity.0 == 1)));
        assert!(!result.done());

        // Delivery terminates and the reset reactivates everyone.
        let tile = match color {
            TargetColor::Red => env.red_tile_id(),
            TargetColor::Yellow => env.yellow_tile_id(),
        };
        let result = env.step(&still(), &[ContactEvent::enter(env.body_id(0), tile)]);
        assert!(result.terminated[&0]);
        assert_eq!(env.active_agents().len(), 4);
        assert_eq!(env.targets_returned(), 0);
        assert!(result
            .commands
            .iter()
            .any(|c| matches!(c, HostCommand::Reactivate { .. })));
    }

    #[test]
    fn test_step_bound_truncates() {
        let mut env = Warehouse::with_config(WarehouseConfig {
            max_steps: 2,
            ..WarehouseConfig::default()
        })
        .unwrap();
        env.reset(Some(2));

        assert!(!env.step(&still(), &[]).done());
        let result = env.step(&still(), &[]);
        assert!(result.truncated[&0]);
        assert!(!result.terminated[&0]);
        assert_eq!(env.steps(), 0);
    }

    #[test]
    fn test_determinism() {
        let mut env1 = Warehouse::new();
        let mut env2 = Warehouse::new();
        env1.reset(Some(42));
        env2.reset(Some(42));

        let actions = move_action(0, Vec2::new(1.0, 0.5));
        for _ in 0..10 {
            let r1 = env1.step(&actions, &[]);
            let r2 = env2.step(&actions, &[]);
            assert_eq!(r1.observations[&0], r2.observations[&0]);
            assert_eq!(r1.observations[&3], r2.observations[&3]);
        }
    }

    #[test]
    #[should_panic(expected = "warehouse action must have")]
    fn test_wrong_action_dim_is_fatal() {
        let mut env = Warehouse::new();
        env.reset(Some(1));
        let bad = ArrayD::zeros(IxDyn(&[6]));
        let actions = [(0, bad)].into_iter().collect();
        env.step(&actions, &[]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = WarehouseConfig {
            num_agents: 0,
            ..WarehouseConfig::default()
        };
        assert!(matches!(
            Warehouse::with_config(config),
            Err(ConfigError::ZeroCount { name: "num_agents" })
        ));

        let config = WarehouseConfig {
            padding: 20.0,
            ..WarehouseConfig::default()
        };
        assert!(matches!(
            Warehouse::with_config(config),
            Err(ConfigError::PaddingTooLarge { .. })
        ));
    }
}
