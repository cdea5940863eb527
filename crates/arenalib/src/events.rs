//! Contact-event stream types.
//!
//! Collision detection is the host engine's job. Each tick the host reports
//! the contacts that started or ended as a flat list of `ContactEvent`s;
//! environments re-sort that list into a canonical order before applying it
//! so reward accrual stays reproducible regardless of how the host happened
//! to enumerate its collision pairs.

/// Stable handle for a simulated entity (agent body, sword, wall, target...).
///
/// Ids are allocated by the environment and never reused within a run, so a
/// destroyed target's id stays dead until the host drops it too.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

/// Semantic category of a tagged entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Agent,
    Wall,
    Sword,
    Shield,
    RedTarget,
    YellowTarget,
    RedTile,
    YellowTile,
}

/// Contact phase reported by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContactPhase {
    /// The two entities started touching this tick.
    Enter,
    /// The two entities stopped touching this tick.
    Exit,
}

/// A single contact notification between two tagged entities.
///
/// The pair is unordered: rule matching must accept either operand order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContactEvent {
    pub a: EntityId,
    pub b: EntityId,
    pub phase: ContactPhase,
}

impl ContactEvent {
    /// Contact-start event.
    pub fn enter(a: EntityId, b: EntityId) -> Self {
        Self {
            a,
            b,
            phase: ContactPhase::Enter,
        }
    }

    /// Contact-end event.
    pub fn exit(a: EntityId, b: EntityId) -> Self {
        Self {
            a,
            b,
            phase: ContactPhase::Exit,
        }
    }

    /// Canonical processing order: by entity-id pair (lower id first), with
    /// enters ahead of exits for the same pair.
    pub fn sort_key(&self) -> (EntityId, EntityId, u8) {
        let lo = self.a.min(self.b);
        let hi = self.a.max(self.b);
        let phase = match self.phase {
            ContactPhase::Enter => 0,
            ContactPhase::Exit => 1,
        };
        (lo, hi, phase)
    }

    /// Whether the event touches the given entity.
    pub fn involves(&self, id: EntityId) -> bool {
        self.a == id || self.b == id
    }

    /// The other endpoint, if `id` is one of the pair.
    pub fn other(&self, id: EntityId) -> Option<EntityId> {
        if self.a == id {
            Some(self.b)
        } else if self.b == id {
            Some(self.a)
        } else {
            None
        }
    }
}

/// Sort a tick's contact batch into canonical processing order.
pub fn sort_contacts(contacts: &mut [ContactEvent]) {
    contacts.sort_by_key(|c| c.sort_key());
}
