//! Voxel coordinates and the six faces of a voxel.

use serde::{Deserialize, Serialize};

/// Exact integer address of one voxel slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub dimension: i32,
}

impl Coordinate {
    pub const fn new(x: i32, y: i32, z: i32, dimension: i32) -> Self {
        Self { x, y, z, dimension }
    }

    /// The neighboring coordinate across `face`. The dimension never changes.
    pub fn offset(&self, face: Face) -> Self {
        let [dx, dy, dz] = face.normal();
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
            dimension: self.dimension,
        }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}, {}", self.x, self.y, self.z)?;
        if self.dimension != 0 {
            write!(f, " @{}", self.dimension)?;
        }
        Ok(())
    }
}

/// Coordinate axis of a face normal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X = 0,
    Y = 1,
    Z = 2,
}

/// One of the six faces of a voxel.
///
/// The declaration order is the face index order used by every bitfield in
/// this crate (occupied ports, connect faces, ported sides).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Face {
    North,
    East,
    South,
    West,
    Up,
    Down,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::North,
        Face::East,
        Face::South,
        Face::West,
        Face::Up,
        Face::Down,
    ];

    pub const HORIZONTALS: [Face; 4] = [Face::North, Face::East, Face::South, Face::West];

    /// Horizontal faces ordered by increasing yaw, starting at east.
    const ANGLE_ORDER: [Face; 4] = [Face::East, Face::North, Face::West, Face::South];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Face> {
        Self::ALL.get(index).copied()
    }

    /// Single-bit mask of this face.
    pub fn flag(self) -> u8 {
        1 << self.index()
    }

    pub fn opposite(self) -> Face {
        match self {
            Face::North => Face::South,
            Face::East => Face::West,
            Face::South => Face::North,
            Face::West => Face::East,
            Face::Up => Face::Down,
            Face::Down => Face::Up,
        }
    }

    /// Unit offset towards the neighbor. North is -z, east is +x.
    pub fn normal(self) -> [i32; 3] {
        match self {
            Face::North => [0, 0, -1],
            Face::East => [1, 0, 0],
            Face::South => [0, 0, 1],
            Face::West => [-1, 0, 0],
            Face::Up => [0, 1, 0],
            Face::Down => [0, -1, 0],
        }
    }

    pub fn from_normal(normal: [i32; 3]) -> Option<Face> {
        Self::ALL.into_iter().find(|face| face.normal() == normal)
    }

    pub fn axis(self) -> Axis {
        match self {
            Face::East | Face::West => Axis::X,
            Face::Up | Face::Down => Axis::Y,
            Face::North | Face::South => Axis::Z,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, Face::Up | Face::Down)
    }

    pub fn is_horizontal(self) -> bool {
        !self.is_vertical()
    }

    pub fn code(self) -> &'static str {
        match self {
            Face::North => "north",
            Face::East => "east",
            Face::South => "south",
            Face::West => "west",
            Face::Up => "up",
            Face::Down => "down",
        }
    }

    pub fn from_code(code: &str) -> Option<Face> {
        Self::ALL.into_iter().find(|face| face.code().eq_ignore_ascii_case(code))
    }

    /// The horizontal face a player looks at for a yaw given in radians.
    pub fn horizontal_from_yaw(yaw: f32) -> Face {
        let quarter = (yaw.to_degrees() / 90.0).round() as i32;
        Self::ANGLE_ORDER[quarter.rem_euclid(4) as usize]
    }

    /// Rotates a horizontal face by `degrees` (a multiple of 90) around the
    /// vertical axis. Vertical faces are returned unchanged.
    pub fn rotate_horizontal(self, degrees: i32) -> Face {
        let Some(current) = Self::ANGLE_ORDER.iter().position(|&face| face == self) else {
            return self;
        };
        let index = current as i32 + degrees / 90;
        Self::ANGLE_ORDER[index.rem_euclid(4) as usize]
    }
}

impl std::fmt::Display for Face {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
