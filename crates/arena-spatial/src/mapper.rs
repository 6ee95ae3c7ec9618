//! The spatial mapper: typed placement on top of the grid transform.
//!
//! [`SpatialMapper`] combines a [`GridTransform`] with a [`TypeCatalog`] to
//! answer three questions:
//!
//! - where a given entity type should be drawn for a server cell
//!   ([`grid_to_world`](SpatialMapper::grid_to_world)),
//! - how it should be oriented ([`placement`](SpatialMapper::placement)),
//! - which cell a pointer hit refers to
//!   ([`world_to_grid`](SpatialMapper::world_to_grid)).
//!
//! The mapper holds no mutable state. It is built once and shared by the
//! reconciler (placement) and the input path (inverse transform).

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::calibration::{GridCalibration, GridCell, GridTransform};
use crate::catalog::{EntityTypeDescriptor, TypeCatalog};
use crate::SpatialError;

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// World transform for a freshly spawned visual.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    pub rotation: Quat,
}

// ---------------------------------------------------------------------------
// BoardSide
// ---------------------------------------------------------------------------

/// Which half of the board a player deploys on.
///
/// `Near` owns rows `0 .. rows / 2`, `Far` owns rows `rows / 2 .. rows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardSide {
    #[default]
    Near,
    Far,
}

// ---------------------------------------------------------------------------
// SpatialMapper
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SpatialMapper {
    transform: GridTransform,
    catalog: TypeCatalog,
}

impl SpatialMapper {
    pub fn new(transform: GridTransform, catalog: TypeCatalog) -> Self {
        Self { transform, catalog }
    }

    /// Build from raw calibration and descriptor list.
    ///
    /// # Errors
    ///
    /// Propagates calibration and duplicate-descriptor errors.
    pub fn from_parts(
        calibration: &GridCalibration,
        descriptors: impl IntoIterator<Item = EntityTypeDescriptor>,
    ) -> Result<Self, SpatialError> {
        Ok(Self::new(
            GridTransform::new(calibration)?,
            TypeCatalog::from_descriptors(descriptors)?,
        ))
    }

    /// World position for `type_id` at `cell`, with pivot and vertical
    /// offsets applied. Unknown types contribute zero offsets.
    pub fn grid_to_world(&self, type_id: &str, cell: GridCell) -> Vec3 {
        if !self.catalog.contains(type_id) {
            trace!(type_id, "no descriptor, placing with zero offsets");
        }
        let base = self.transform.cell_center(cell);
        let pivot = self.catalog.pivot_offset(type_id);
        Vec3::new(
            base.x + pivot.x,
            self.catalog.vertical_offset(type_id),
            base.z + pivot.y,
        )
    }

    /// Position plus orientation for a spawn.
    ///
    /// Structures in the far half (`row > rows / 2`) are turned 180 degrees
    /// about +Y so both sides' towers face the middle of the board.
    pub fn placement(&self, type_id: &str, cell: GridCell) -> Placement {
        let position = self.grid_to_world(type_id, cell);
        let rotation = if self.catalog.is_structure(type_id) && self.is_far_half(cell.row) {
            Quat::from_rotation_y(std::f32::consts::PI)
        } else {
            Quat::IDENTITY
        };
        Placement { position, rotation }
    }

    /// Cell under a world point, rounded and clamped onto the board.
    pub fn world_to_grid(&self, world: Vec3) -> GridCell {
        self.transform.world_to_grid(world)
    }

    /// Whether a player on `side` may deploy into `cell`.
    pub fn is_playable(&self, side: BoardSide, cell: GridCell) -> bool {
        if !self.transform.contains(cell) {
            return false;
        }
        let half = (self.transform.rows() / 2) as i32;
        match side {
            BoardSide::Near => cell.row < half,
            BoardSide::Far => cell.row >= half,
        }
    }

    fn is_far_half(&self, row: i32) -> bool {
        row > (self.transform.rows() / 2) as i32
    }

    // -- accessors ----------------------------------------------------------

    pub fn transform(&self) -> &GridTransform {
        &self.transform
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
