//! Edges a node exposes towards its neighbors.

use serde::{Deserialize, Serialize};

use super::coord::Face;

/// A directional connector of a node.
///
/// Face edges point at the neighboring voxel across one face. `Source` never
/// leads anywhere: it only marks a node template as a root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Edge {
    #[serde(rename = "north-center")]
    NorthCenter,
    #[serde(rename = "east-center")]
    EastCenter,
    #[serde(rename = "south-center")]
    SouthCenter,
    #[serde(rename = "west-center")]
    WestCenter,
    #[serde(rename = "up-center")]
    UpCenter,
    #[serde(rename = "down-center")]
    DownCenter,
    #[serde(rename = "source")]
    Source,
}

impl Edge {
    /// Face-center edges in face index order.
    pub const FACE_CENTERS: [Edge; 6] = [
        Edge::NorthCenter,
        Edge::EastCenter,
        Edge::SouthCenter,
        Edge::WestCenter,
        Edge::UpCenter,
        Edge::DownCenter,
    ];

    pub fn face_center(face: Face) -> Edge {
        Self::FACE_CENTERS[face.index()]
    }

    /// The face this edge crosses, `None` for `Source`.
    pub fn face(self) -> Option<Face> {
        match self {
            Edge::NorthCenter => Some(Face::North),
            Edge::EastCenter => Some(Face::East),
            Edge::SouthCenter => Some(Face::South),
            Edge::WestCenter => Some(Face::West),
            Edge::UpCenter => Some(Face::Up),
            Edge::DownCenter => Some(Face::Down),
            Edge::Source => None,
        }
    }

    /// The reciprocal edge a neighbor must declare. `Source` has none.
    pub fn opposite(self) -> Option<Edge> {
        self.face().map(|face| Edge::face_center(face.opposite()))
    }

    pub fn is_face_center(self) -> bool {
        self != Edge::Source
    }

    pub fn code(self) -> &'static str {
        match self {
            Edge::NorthCenter => "north-center",
            Edge::EastCenter => "east-center",
            Edge::SouthCenter => "south-center",
            Edge::WestCenter => "west-center",
            Edge::UpCenter => "up-center",
            Edge::DownCenter => "down-center",
            Edge::Source => "source",
        }
    }

    pub fn from_code(code: &str) -> Option<Edge> {
        Self::FACE_CENTERS
            .into_iter()
            .chain(std::iter::once(Edge::Source))
            .find(|edge| edge.code() == code)
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
