use serde::{Deserialize, Serialize};

/// Highest floor index that still counts as surface. Floors below
/// (z > 7) are underground and follow stricter visibility rules.
pub const GROUND_FLOOR: u8 = 7;

/// How many floors apart two underground positions may be and still
/// see each other.
const UNDERGROUND_FLOOR_BAND: i32 = 2;

// Client viewport half extents: 18x14 tiles centered on the player.
const VIEWPORT_LEFT: i32 = 8;
const VIEWPORT_RIGHT: i32 = 9;
const VIEWPORT_UP: i32 = 6;
const VIEWPORT_DOWN: i32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: u16,
    pub y: u16,
    pub z: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    East,
    South,
    West,
    Southwest,
    Southeast,
    Northwest,
    Northeast,
}

impl Position {
    pub fn new(x: u16, y: u16, z: u8) -> Self {
        Self { x, y, z }
    }

    /// One step toward `direction`, or `None` when the step would leave
    /// the coordinate space.
    pub fn step(self, direction: Direction) -> Option<Self> {
        let (dx, dy) = direction.delta();
        let x = i32::from(self.x) + i32::from(dx);
        let y = i32::from(self.y) + i32::from(dy);
        if x < 0 || y < 0 || x > i32::from(u16::MAX) || y > i32::from(u16::MAX) {
            return None;
        }
        Some(Self {
            x: x as u16,
            y: y as u16,
            z: self.z,
        })
    }

    /// Whether an observer standing here is shown what happens at `other`.
    ///
    /// Surface floors never see underground and vice versa; underground
    /// observers see at most two floors apart. Within the allowed band the
    /// client viewport is shifted by the floor offset.
    pub fn can_see(self, other: Position) -> bool {
        if self.z <= GROUND_FLOOR {
            if other.z > GROUND_FLOOR {
                return false;
            }
        } else {
            if other.z <= GROUND_FLOOR {
                return false;
            }
            if (i32::from(self.z) - i32::from(other.z)).abs() > UNDERGROUND_FLOOR_BAND {
                return false;
            }
        }

        let offset_z = i32::from(self.z) - i32::from(other.z);
        let x = i32::from(self.x);
        let y = i32::from(self.y);
        let ox = i32::from(other.x);
        let oy = i32::from(other.y);
        x >= ox - VIEWPORT_LEFT + offset_z
            && x <= ox + VIEWPORT_RIGHT + offset_z
            && y >= oy - VIEWPORT_UP + offset_z
            && y <= oy + VIEWPORT_DOWN + offset_z
    }

    /// Euclidean 2D radius test used for speech reach. With `same_floor`
    /// set, positions on different floors are never in range.
    pub fn is_in_range(self, other: Position, same_floor: bool, radius: f64) -> bool {
        if same_floor && self.z != other.z {
            return false;
        }
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt() <= radius
    }
}

impl Direction {
    pub fn delta(self) -> (i8, i8) {
        match self {
            Direction::North => (0, -1),
            Direction::East => (1, 0),
            Direction::South => (0, 1),
            Direction::West => (-1, 0),
            Direction::Southwest => (-1, 1),
            Direction::Southeast => (1, 1),
            Direction::Northwest => (-1, -1),
            Direction::Northeast => (1, -1),
        }
    }

    pub fn wire_code(self) -> u8 {
        match self {
            Direction::North => 0,
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
            Direction::Southwest => 4,
            Direction::Southeast => 5,
            Direction::Northwest => 6,
            Direction::Northeast => 7,
        }
    }

    pub fn from_wire_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Direction::North),
            1 => Some(Direction::East),
            2 => Some(Direction::South),
            3 => Some(Direction::West),
            4 => Some(Direction::Southwest),
            5 => Some(Direction::Southeast),
            6 => Some(Direction::Northwest),
            7 => Some(Direction::Northeast),
            _ => None,
        }
    }

    pub fn is_diagonal(self) -> bool {
        matches!(
            self,
            Direction::Southwest
                | Direction::Southeast
                | Direction::Northwest
                | Direction::Northeast
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opposite(direction: Direction) -> Direction {
        match direction {
            Direction::North => Direction::South,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::Southwest => Direction::Northeast,
            Direction::Southeast => Direction::Northwest,
            Direction::Northwest => Direction::Southeast,
            Direction::Northeast => Direction::Southwest,
        }
    }

    #[test]
    fn step_roundtrip_with_opposites() {
        let origin = Position::new(100, 100, 7);
        let directions = [
            Direction::North,
            Direction::East,
            Direction::South,
            Direction::West,
            Direction::Southwest,
            Direction::Southeast,
            Direction::Northwest,
            Direction::Northeast,
        ];
        for direction in directions {
            let next = origin.step(direction).expect("step");
            let back = next.step(opposite(direction)).expect("step back");
            assert_eq!(back, origin);
        }
    }

    #[test]
    fn step_refuses_to_leave_coordinate_space() {
        assert_eq!(Position::new(0, 10, 7).step(Direction::West), None);
        assert_eq!(Position::new(10, 0, 7).step(Direction::North), None);
        assert_eq!(Position::new(u16::MAX, 10, 7).step(Direction::East), None);
    }

    #[test]
    fn can_see_within_same_floor_viewport() {
        let a = Position::new(100, 100, 7);
        assert!(a.can_see(Position::new(100, 100, 7)));
        assert!(a.can_see(Position::new(108, 106, 7)));
        assert!(a.can_see(Position::new(92, 94, 7)));
        assert!(!a.can_see(Position::new(110, 100, 7)));
        assert!(!a.can_see(Position::new(100, 109, 7)));
    }

    #[test]
    fn can_see_is_symmetric_on_one_floor() {
        let pairs = [
            (Position::new(100, 100, 7), Position::new(104, 103, 7)),
            (Position::new(50, 50, 7), Position::new(60, 50, 7)),
            (Position::new(200, 200, 7), Position::new(208, 206, 7)),
        ];
        for (a, b) in pairs {
            assert_eq!(a.can_see(b), b.can_see(a), "{:?} vs {:?}", a, b);
        }
    }

    #[test]
    fn surface_never_sees_underground() {
        let surface = Position::new(100, 100, 7);
        let below = Position::new(100, 100, 8);
        assert!(!surface.can_see(below));
        assert!(!below.can_see(surface));
    }

    #[test]
    fn underground_band_is_two_floors() {
        let a = Position::new(100, 100, 10);
        assert!(a.can_see(Position::new(100, 100, 12)));
        assert!(!a.can_see(Position::new(100, 100, 13)));
    }

    #[test]
    fn whisper_range_includes_diagonal_neighbours_only() {
        let center = Position::new(100, 100, 7);
        assert!(center.is_in_range(Position::new(101, 101, 7), true, 1.42));
        assert!(center.is_in_range(Position::new(100, 99, 7), true, 1.42));
        assert!(!center.is_in_range(Position::new(102, 100, 7), true, 1.42));
        assert!(!center.is_in_range(Position::new(100, 100, 8), true, 1.42));
    }

    #[test]
    fn yell_range_reaches_fifty_tiles() {
        let center = Position::new(100, 100, 7);
        assert!(center.is_in_range(Position::new(150, 100, 7), false, 50.0));
        assert!(!center.is_in_range(Position::new(151, 100, 7), false, 50.0));
        assert!(center.is_in_range(Position::new(130, 100, 6), false, 50.0));
    }
}
