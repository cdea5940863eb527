//! Built-in arena environments.
//!
//! Two multi-agent training tasks sharing the same tick/contact structure:
//! - `Gladiator` - 2-agent sword-and-shield arena combat
//! - `Warehouse` - 4-agent pick-and-deliver with colored targets and tiles

mod gladiator;
mod warehouse;

pub use gladiator::{Gladiator, GladiatorConfig};
pub use warehouse::{Holding, TargetColor, Warehouse, WarehouseConfig};
