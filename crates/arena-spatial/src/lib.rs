//! Arena Spatial -- grid <-> world mapping for the arena board.
//!
//! The server simulates the match on an integer grid of `rows x cols` cells.
//! The client renders a continuous 3D scene. This crate owns the conversion
//! between the two:
//!
//! - [`calibration`]: measured board corners and the offset-free affine
//!   [`GridTransform`](calibration::GridTransform).
//! - [`catalog`]: per-archetype placement metadata
//!   ([`EntityTypeDescriptor`](catalog::EntityTypeDescriptor)).
//! - [`mapper`]: [`SpatialMapper`](mapper::SpatialMapper), combining both for
//!   spawn placement, structure orientation, pointer input and side checks.
//!
//! # Quick Start
//!
//! ```
//! use arena_spatial::prelude::*;
//!
//! let mapper = SpatialMapper::from_parts(
//!     &GridCalibration::default(),
//!     vec![EntityTypeDescriptor::unit("caveman", "caveman", 1.7)],
//! )
//! .unwrap();
//!
//! let cell = GridCell::new(5, 3);
//! let world = mapper.grid_to_world("caveman", cell);
//! assert_eq!(mapper.world_to_grid(world), cell);
//! ```

#![deny(unsafe_code)]

pub mod calibration;
pub mod catalog;
pub mod mapper;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while building the spatial mapper.
///
/// Runtime lookups never fail; only construction from configuration does.
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// The board needs at least two cells per axis to derive a cell size.
    #[error("grid must have at least 2 rows and 2 columns, got {rows}x{cols}")]
    DegenerateGrid { rows: u32, cols: u32 },

    /// Calibration corners are unusable (non-finite or zero extent).
    #[error("invalid board calibration: {0}")]
    InvalidCalibration(String),

    /// Two descriptors share a type id.
    #[error("duplicate entity type descriptor for '{0}'")]
    DuplicateDescriptor(String),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::calibration::{GridCalibration, GridCell, GridTransform};
    pub use crate::catalog::{default_descriptors, EntityTypeDescriptor, TypeCatalog};
    pub use crate::mapper::{BoardSide, Placement, SpatialMapper};
    pub use crate::SpatialError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use glam::Vec3;

    #[test]
    fn every_default_cell_round_trips() {
        let mapper =
            SpatialMapper::from_parts(&GridCalibration::default(), default_descriptors()).unwrap();
        for row in 0..30 {
            for col in 0..18 {
                let cell = GridCell::new(row, col);
                let world = mapper.transform().cell_center(cell);
                assert_eq!(mapper.world_to_grid(world), cell, "cell {cell}");
            }
        }
    }

    #[test]
    fn descending_axes_round_trip() {
        // Boards measured from the opposite corner have negative cell sizes.
        let cal = GridCalibration {
            rows: 10,
            cols: 6,
            origin: glam::Vec2::new(20.0, 5.0),
            last_row_x: -7.0,
            last_col_z: -10.0,
        };
        let mapper = SpatialMapper::from_parts(&cal, Vec::new()).unwrap();
        assert!(mapper.transform().cell_size_row() < 0.0);
        for row in 0..10 {
            for col in 0..6 {
                let cell = GridCell::new(row, col);
                let world = mapper.grid_to_world("any", cell);
                assert_eq!(mapper.world_to_grid(world), cell);
            }
        }
        assert_eq!(
            mapper.world_to_grid(Vec3::new(1e6, 0.0, 1e6)),
            GridCell::new(0, 0)
        );
    }

    #[test]
    fn error_messages_name_the_problem() {
        let err = SpatialError::DegenerateGrid { rows: 1, cols: 18 };
        assert!(err.to_string().contains("1x18"));
    }
}
