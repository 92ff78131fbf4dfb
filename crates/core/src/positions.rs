//! Tile coordinates and facing directions

use serde::{Deserialize, Serialize};

/// Facing / movement direction. Discriminants match the wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    Down = 0,
    Left = 1,
    Up = 2,
    Right = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Down, Direction::Left, Direction::Up, Direction::Right];

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Down),
            1 => Some(Self::Left),
            2 => Some(Self::Up),
            3 => Some(Self::Right),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Up => Self::Down,
            Self::Right => Self::Left,
        }
    }

    /// Next direction turning clockwise as seen on screen (up, right, down, left).
    pub fn clockwise(self) -> Self {
        match self {
            Self::Up => Self::Right,
            Self::Right => Self::Down,
            Self::Down => Self::Left,
            Self::Left => Self::Up,
        }
    }

    /// Either of the two directions at a right angle to this one.
    pub fn is_perpendicular_to(self, other: Direction) -> bool {
        self != other && self != other.opposite()
    }

    /// Unit step for this direction; y grows downwards.
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Up => (0, -1),
            Self::Right => (1, 0),
        }
    }
}

/// Tile-based position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TilePosition {
    pub x: i32,
    pub y: i32,
}

impl TilePosition {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring tile one step in `direction`.
    pub const fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Self { x: self.x + dx, y: self.y + dy }
    }

    /// Manhattan distance in tiles
    pub fn distance_to(self, other: TilePosition) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// True when `other` is one of the four orthogonal neighbours.
    pub fn is_adjacent_to(self, other: TilePosition) -> bool {
        self.distance_to(other) == 1
    }

    /// Both axes within `range` tiles (square visibility window).
    pub fn in_range(self, other: TilePosition, range: i32) -> bool {
        (self.x - other.x).abs() <= range && (self.y - other.y).abs() <= range
    }

    /// Direction along the axis with the greatest delta towards `target`.
    /// Ties prefer the horizontal axis. `None` when both positions coincide.
    pub fn direction_towards(self, target: TilePosition) -> Option<Direction> {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        if dx == 0 && dy == 0 {
            return None;
        }
        if dx.abs() >= dy.abs() {
            Some(if dx > 0 { Direction::Right } else { Direction::Left })
        } else {
            Some(if dy > 0 { Direction::Down } else { Direction::Up })
        }
    }

    /// Direction towards `target` along the secondary axis, if it differs there.
    pub fn secondary_direction_towards(self, target: TilePosition) -> Option<Direction> {
        let dx = target.x - self.x;
        let dy = target.y - self.y;
        if dx.abs() >= dy.abs() {
            match dy {
                0 => None,
                d if d > 0 => Some(Direction::Down),
                _ => Some(Direction::Up),
            }
        } else {
            match dx {
                0 => None,
                d if d > 0 => Some(Direction::Right),
                _ => Some(Direction::Left),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_and_adjacency() {
        let pos = TilePosition::new(5, 5);
        assert_eq!(pos.step(Direction::Up), TilePosition::new(5, 4));
        assert_eq!(pos.step(Direction::Right), TilePosition::new(6, 5));
        assert!(pos.is_adjacent_to(TilePosition::new(5, 6)));
        assert!(!pos.is_adjacent_to(TilePosition::new(6, 6)));
    }

    #[test]
    fn test_direction_towards_prefers_greatest_delta() {
        let pos = TilePosition::new(0, 0);
        assert_eq!(pos.direction_towards(TilePosition::new(3, 1)), Some(Direction::Right));
        assert_eq!(pos.direction_towards(TilePosition::new(1, -4)), Some(Direction::Up));
        assert_eq!(pos.secondary_direction_towards(TilePosition::new(3, 1)), Some(Direction::Down));
        assert_eq!(pos.direction_towards(pos), None);
    }

    #[test]
    fn test_clockwise_cycle() {
        let mut dir = Direction::Up;
        for _ in 0..4 {
            dir = dir.clockwise();
        }
        assert_eq!(dir, Direction::Up);
        assert_eq!(Direction::Up.clockwise(), Direction::Right);
        assert!(Direction::Up.is_perpendicular_to(Direction::Left));
        assert!(!Direction::Up.is_perpendicular_to(Direction::Down));
    }

    #[test]
    fn test_range_window() {
        let pos = TilePosition::new(10, 10);
        assert!(pos.in_range(TilePosition::new(21, 0), 11));
        assert!(!pos.in_range(TilePosition::new(22, 10), 11));
    }
}
