//! Orientation choice for voxel types with rotational variants.
//!
//! The geometric variant follows the clicked face, the hit position and the
//! player's yaw. Unless the player is sneaking, a variant that pairs with a
//! neighbor replaces a geometric choice that does not.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Placement;
use crate::model::{Axis, Coordinate, Face};
use crate::network::{NetworkManager, PairState};
use crate::storage::NodeAccessor;
use crate::template::BlockNodeTemplate;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationMode {
    /// Faces the clicked voxel, or the nearest edge of the hit face when
    /// the hit is off-center.
    #[default]
    Slab,
    AllFaces,
    /// Vertical choices are replaced by the player's facing.
    Horizontals,
}

/// Orientation options of one voxel type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrientOptions {
    /// Variant group that holds the orientation.
    pub facing_code: String,
    pub mode: OrientationMode,
    pub flip: bool,
    /// Extra rotation around the vertical axis, in degrees.
    pub rotate_y: i32,
    /// Variants are axes (`we`, `ud`, `ns`) rather than faces.
    pub pillar: bool,
    /// Look at every neighbor when nothing pairs on the preferred face.
    pub pair_to_any: bool,
}

impl Default for OrientOptions {
    fn default() -> Self {
        Self {
            facing_code: "rot".to_string(),
            mode: OrientationMode::Slab,
            flip: false,
            rotate_y: 0,
            pillar: false,
            pair_to_any: true,
        }
    }
}

/// Off-center band of a slab hit, in block units.
const CENTER_LOW: f64 = 0.3;
const CENTER_HIGH: f64 = 0.7;

impl OrientOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The face the new voxel points at, from geometry alone.
    pub fn geometric_face(&self, placement: &Placement) -> Face {
        let mut face = placement.face.opposite();
        match self.mode {
            OrientationMode::Slab => {
                let axis = placement.face.axis() as usize;
                let axis1 = placement.hit_position[(axis + 1) % 3];
                let axis2 = placement.hit_position[(axis + 2) % 3];
                let axis1_primary = (axis1 - 0.5).abs() > (axis2 - 0.5).abs();
                let primary = if axis1_primary { axis1 } else { axis2 };
                if primary <= CENTER_LOW || primary >= CENTER_HIGH {
                    let mut normal = [0; 3];
                    let index = (axis + if axis1_primary { 1 } else { 2 }) % 3;
                    normal[index] = if primary < 0.5 { -1 } else { 1 };
                    face = Face::from_normal(normal).unwrap_or(face);
                }
            }
            OrientationMode::Horizontals if face.is_vertical() => {
                face = Face::horizontal_from_yaw(placement.yaw);
            }
            _ => {}
        }
        if self.flip {
            face = face.opposite();
        }
        face.rotate_horizontal(self.rotate_y)
    }

    /// Variant code naming `face`.
    pub fn variant_code(&self, face: Face) -> &'static str {
        if !self.pillar {
            return face.code();
        }
        match face.axis() {
            Axis::X => "we",
            Axis::Y => "ud",
            Axis::Z => "ns",
        }
    }

    /// Every variant code of this voxel type, in candidate order.
    pub fn variant_codes(&self) -> Vec<&'static str> {
        match (self.mode, self.pillar) {
            (OrientationMode::Horizontals, true) => vec!["we", "ns"],
            (OrientationMode::Horizontals, false) => Face::HORIZONTALS.iter().map(|face| face.code()).collect(),
            (_, true) => vec!["we", "ud", "ns"],
            (_, false) => Face::ALL.iter().map(|face| face.code()).collect(),
        }
    }

    /// Pair state of every candidate placed at `coord`, looking at the
    /// `preferred` neighbor first.
    pub fn connected_orientations<A>(
        &self,
        manager: &NetworkManager,
        accessor: &A,
        coord: Coordinate,
        preferred: Face,
        candidates: &[Arc<BlockNodeTemplate>],
    ) -> Vec<PairState>
    where
        A: NodeAccessor + ?Sized,
    {
        let mut states = manager.pair_state(accessor, candidates, coord, preferred);
        if self.pair_to_any && states.iter().all(|&state| state == PairState::Unpaired) {
            for face in Face::ALL.into_iter().filter(|&face| face != preferred) {
                let other = manager.pair_state(accessor, candidates, coord, face);
                for (state, found) in states.iter_mut().zip(other) {
                    *state = (*state).max(found);
                }
            }
        }
        states
    }

    /// Index into `candidates` (ordered like `variant_codes`) of the
    /// variant to place.
    pub fn choose<A>(
        &self,
        manager: &NetworkManager,
        accessor: &A,
        coord: Coordinate,
        placement: &Placement,
        candidates: &[Arc<BlockNodeTemplate>],
    ) -> Option<usize>
    where
        A: NodeAccessor + ?Sized,
    {
        let code = self.variant_code(self.geometric_face(placement));
        let mut chosen = self
            .variant_codes()
            .iter()
            .position(|&variant| variant == code)
            .filter(|&index| index < candidates.len());
        if placement.sneaking {
            return chosen;
        }

        let states =
            self.connected_orientations(manager, accessor, coord, placement.face.opposite(), candidates);
        let geometric = chosen.and_then(|index| states.get(index).copied()).unwrap_or_default();
        if geometric == PairState::Unpaired {
            let mut best = PairState::Unpaired;
            for (index, &state) in states.iter().enumerate() {
                if state > best {
                    best = state;
                    chosen = Some(index);
                }
            }
            debug!(%coord, ?chosen, ?best, "orientation overridden by pairing");
        }
        chosen
    }

    /// Chooses a variant and places it.
    pub fn place<A>(
        &self,
        manager: &NetworkManager,
        accessor: &mut A,
        coord: Coordinate,
        placement: &Placement,
        candidates: &[Arc<BlockNodeTemplate>],
    ) -> Result<usize>
    where
        A: NodeAccessor + ?Sized,
    {
        let index = self
            .choose(manager, accessor, coord, placement, candidates)
            .ok_or_else(|| Error::Config(format!("no '{}' variant for this placement", self.facing_code)))?;
        manager.place_block(accessor, coord, candidates[index].clone())?;
        Ok(index)
    }
}
