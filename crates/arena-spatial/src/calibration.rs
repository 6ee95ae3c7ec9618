//! Board calibration and the offset-free grid transform.
//!
//! The server addresses the board as integer cells `(row, col)`. The rendered
//! board is measured once: the world position of cell `(0, 0)`, the world X of
//! the last row `(rows - 1, 0)` and the world Z of the last column
//! `(0, cols - 1)`. Cell sizes are derived from those corners so they always
//! agree with the grid dimensions.
//!
//! Rows run along world X and columns along world Z. The transform has no
//! rotation term, so each axis maps independently.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::SpatialError;

// ---------------------------------------------------------------------------
// GridCell
// ---------------------------------------------------------------------------

/// An integer cell address on the server board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridCell {
    pub row: i32,
    pub col: i32,
}

impl GridCell {
    #[inline]
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for GridCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

// ---------------------------------------------------------------------------
// GridCalibration
// ---------------------------------------------------------------------------

/// Measured corner coordinates of the rendered board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCalibration {
    /// Number of server rows (mapped to world X).
    pub rows: u32,
    /// Number of server columns (mapped to world Z).
    pub cols: u32,
    /// World (x, z) of cell `(0, 0)`.
    pub origin: Vec2,
    /// World X of cell `(rows - 1, 0)`.
    pub last_row_x: f32,
    /// World Z of cell `(0, cols - 1)`.
    pub last_col_z: f32,
}

impl Default for GridCalibration {
    /// The 30 x 18 arena board as measured in the shipped scene.
    fn default() -> Self {
        Self {
            rows: 30,
            cols: 18,
            origin: Vec2::new(-47.9, 41.79),
            last_row_x: -14.98,
            last_col_z: 57.48,
        }
    }
}

// ---------------------------------------------------------------------------
// GridTransform
// ---------------------------------------------------------------------------

/// Affine grid <-> world transform derived from a [`GridCalibration`].
///
/// Constructed once at startup and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct GridTransform {
    rows: u32,
    cols: u32,
    origin: Vec2,
    cell_size_row: f32,
    cell_size_col: f32,
}

impl GridTransform {
    /// Derive cell sizes from the calibration corners.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::DegenerateGrid`] if either dimension has fewer
    /// than two cells, and [`SpatialError::InvalidCalibration`] if a corner is
    /// not finite or an axis has zero extent.
    pub fn new(calibration: &GridCalibration) -> Result<Self, SpatialError> {
        let GridCalibration {
            rows,
            cols,
            origin,
            last_row_x,
            last_col_z,
        } = *calibration;

        if rows < 2 || cols < 2 {
            return Err(SpatialError::DegenerateGrid { rows, cols });
        }
        if !origin.is_finite() || !last_row_x.is_finite() || !last_col_z.is_finite() {
            return Err(SpatialError::InvalidCalibration(
                "corner coordinates must be finite".to_owned(),
            ));
        }

        let cell_size_row = (last_row_x - origin.x) / (rows - 1) as f32;
        let cell_size_col = (last_col_z - origin.y) / (cols - 1) as f32;

        if cell_size_row == 0.0 || cell_size_col == 0.0 {
            return Err(SpatialError::InvalidCalibration(format!(
                "zero board extent (row step {cell_size_row}, col step {cell_size_col})"
            )));
        }

        Ok(Self {
            rows,
            cols,
            origin,
            cell_size_row,
            cell_size_col,
        })
    }

    // -- forward ------------------------------------------------------------

    /// World position of a cell with no per-type offsets applied (`y = 0`).
    ///
    /// Cells outside the board are extrapolated, not clamped: the server is
    /// authoritative on where its entities are.
    pub fn cell_center(&self, cell: GridCell) -> Vec3 {
        Vec3::new(
            self.origin.x + cell.row as f32 * self.cell_size_row,
            0.0,
            self.origin.y + cell.col as f32 * self.cell_size_col,
        )
    }

    // -- inverse ------------------------------------------------------------

    /// Nearest cell to a world position, clamped onto the board.
    ///
    /// The Y component is ignored. Non-finite coordinates resolve to the
    /// lower bound of their axis.
    pub fn world_to_grid(&self, world: Vec3) -> GridCell {
        let row_f = (world.x - self.origin.x) / self.cell_size_row;
        let col_f = (world.z - self.origin.y) / self.cell_size_col;
        GridCell {
            row: round_clamped(row_f, self.rows),
            col: round_clamped(col_f, self.cols),
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// World distance between adjacent rows (along X). May be negative.
    pub fn cell_size_row(&self) -> f32 {
        self.cell_size_row
    }

    /// World distance between adjacent columns (along Z). May be negative.
    pub fn cell_size_col(&self) -> f32 {
        self.cell_size_col
    }

    /// Whether `cell` lies on the board.
    pub fn contains(&self, cell: GridCell) -> bool {
        cell.row >= 0
            && cell.col >= 0
            && (cell.row as u32) < self.rows
            && (cell.col as u32) < self.cols
    }
}

/// Round to the nearest integer and clamp into `[0, count - 1]`.
fn round_clamped(value: f32, count: u32) -> i32 {
    let max = (count - 1) as f32;
    if !value.is_finite() {
        return if value == f32::INFINITY { max as i32 } else { 0 };
    }
    value.round().clamp(0.0, max) as i32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
