use crate::entities::player::PlayerLocal;
use crate::world::position::{Direction, Position};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CreatureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outfit {
    pub look_type: u16,
    pub head: u8,
    pub body: u8,
    pub legs: u8,
    pub feet: u8,
    pub addons: u8,
    pub look_item: u16,
}

pub const DEFAULT_OUTFIT: Outfit = Outfit {
    look_type: 128,
    head: 40,
    body: 40,
    legs: 40,
    feet: 40,
    addons: 0,
    look_item: 0,
};

impl Default for Outfit {
    fn default() -> Self {
        DEFAULT_OUTFIT
    }
}

/// What a creature is, and the capabilities that come with it. Connected
/// players carry their session state here; everything else (NPCs, spawned
/// monsters) shares the plain variant.
#[derive(Debug)]
pub enum CreatureKind {
    Player(PlayerLocal),
    NonPlayer,
}

/// A creature currently instantiated in the world. The position doubles as
/// the back-reference to its tile; the tile's occupant list is the owning
/// side of that relation.
#[derive(Debug)]
pub struct Creature {
    pub id: CreatureId,
    pub name: String,
    pub position: Position,
    pub direction: Direction,
    pub health: u16,
    pub max_health: u16,
    pub outfit: Outfit,
    pub kind: CreatureKind,
}

impl Creature {
    pub fn new_non_player(id: CreatureId, name: String, position: Position) -> Self {
        Self {
            id,
            name,
            position,
            direction: Direction::South,
            health: 100,
            max_health: 100,
            outfit: DEFAULT_OUTFIT,
            kind: CreatureKind::NonPlayer,
        }
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, CreatureKind::Player(_))
    }

    pub fn player(&self) -> Option<&PlayerLocal> {
        match &self.kind {
            CreatureKind::Player(player) => Some(player),
            CreatureKind::NonPlayer => None,
        }
    }

    pub fn player_mut(&mut self) -> Option<&mut PlayerLocal> {
        match &mut self.kind {
            CreatureKind::Player(player) => Some(player),
            CreatureKind::NonPlayer => None,
        }
    }

    /// Health as the 0-100 percentage carried by the wire protocol.
    pub fn health_percent(&self) -> u8 {
        if self.max_health == 0 {
            return 0;
        }
        let percent = u32::from(self.health) * 100 / u32::from(self.max_health);
        percent.min(100) as u8
    }
}
