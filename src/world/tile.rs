use crate::entities::creature::CreatureId;
use crate::world::position::Position;

/// A single map cell. The tile owns the ordered list of creatures standing
/// on it; the protocol addresses occupants by their index in that stacking
/// order rather than by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub position: Position,
    pub walkable: bool,
    /// Number of non-creature things (ground items) below the creatures.
    pub item_count: u8,
    pub creatures: Vec<CreatureId>,
}

impl Tile {
    pub fn new(position: Position, walkable: bool) -> Self {
        Self {
            position,
            walkable,
            item_count: 0,
            creatures: Vec::new(),
        }
    }

    pub fn is_walkable(&self) -> bool {
        self.walkable
    }

    /// Stacking order: ground at 0, then items, then creatures in arrival
    /// order.
    pub fn stack_position(&self, id: CreatureId) -> Option<u8> {
        let index = self.creatures.iter().position(|&c| c == id)?;
        Some(1u8.saturating_add(self.item_count).saturating_add(index as u8))
    }

    pub fn add_creature(&mut self, id: CreatureId) {
        if !self.creatures.contains(&id) {
            self.creatures.push(id);
        }
    }

    pub fn remove_creature(&mut self, id: CreatureId) -> bool {
        let before = self.creatures.len();
        self.creatures.retain(|&c| c != id);
        self.creatures.len() != before
    }
}
