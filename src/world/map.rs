use crate::world::position::Position;
use crate::world::tile::Tile;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// The spatial index of the world: one `Tile` per known position.
/// Positions without a tile are void and can never be entered.
#[derive(Debug, Default)]
pub struct Map {
    tiles: HashMap<Position, Tile>,
}

#[derive(Debug, Deserialize)]
struct MapFile {
    tiles: Vec<TileEntry>,
}

#[derive(Debug, Deserialize)]
struct TileEntry {
    x: u16,
    y: u16,
    z: u8,
    #[serde(default = "default_walkable")]
    walkable: bool,
    #[serde(default)]
    item_count: u8,
}

fn default_walkable() -> bool {
    true
}

impl Map {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let data = std::fs::read_to_string(path)
            .map_err(|err| format!("map read failed for {}: {}", path.display(), err))?;
        Self::parse(&data)
            .map_err(|err| format!("map parse failed for {}: {}", path.display(), err))
    }

    pub fn parse(data: &str) -> Result<Self, String> {
        let file: MapFile =
            serde_yaml::from_str(data).map_err(|err| format!("invalid map yaml: {}", err))?;
        let mut map = Map::new();
        for entry in file.tiles {
            let position = Position::new(entry.x, entry.y, entry.z);
            let mut tile = Tile::new(position, entry.walkable);
            tile.item_count = entry.item_count;
            map.insert_tile(tile);
        }
        Ok(map)
    }

    pub fn insert_tile(&mut self, tile: Tile) {
        self.tiles.insert(tile.position, tile);
    }

    pub fn tile(&self, position: Position) -> Option<&Tile> {
        self.tiles.get(&position)
    }

    pub fn tile_mut(&mut self, position: Position) -> Option<&mut Tile> {
        self.tiles.get_mut(&position)
    }

    pub fn has_tile(&self, position: Position) -> bool {
        self.tiles.contains_key(&position)
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}
