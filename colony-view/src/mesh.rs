//! Demo tessellation: a jittered pointy-top hex grid in odd-row offset
//! layout, split into horizontal bands that act as media.
//!
//! Coordinates follow screen orientation: `y` grows downward, so row 0 is
//! the top of the mesh.

use colony_core::{graph::CellSpec, types::MediumId};
use glam::Vec2;
use rand::Rng;

/// Neighbor offsets `(dcol, drow)` for even and odd rows.
const ODDR_DIRECTIONS: [[(i32, i32); 6]; 2] = [
    [(1, 0), (0, -1), (-1, -1), (-1, 0), (-1, 1), (0, 1)],
    [(1, 0), (1, -1), (0, -1), (-1, 0), (0, 1), (1, 1)],
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshParams {
    pub cols: usize,
    pub rows: usize,
    /// Hexagon circumradius in world units.
    pub radius: f32,
    /// Maximum center displacement along each axis.
    pub jitter: f32,
    pub bands: usize,
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            cols: 48,
            rows: 40,
            radius: 8.0,
            jitter: 1.5,
            bands: 3,
        }
    }
}

impl MeshParams {
    #[inline]
    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.cols + col
    }

    /// Index of the cell closest to the middle of the grid.
    pub fn center_index(&self) -> usize {
        self.index(self.cols / 2, self.rows / 2)
    }

    /// Unjittered center of `(col, row)`.
    pub fn offset_to_pixel(&self, col: usize, row: usize) -> Vec2 {
        let x = self.radius * 3f32.sqrt() * (col as f32 + 0.5 * (row % 2) as f32);
        let y = self.radius * 1.5 * row as f32;
        Vec2::new(x, y)
    }

    /// Midpoint of the unjittered mesh.
    pub fn extent_center(&self) -> Vec2 {
        let far = self.offset_to_pixel(
            self.cols.saturating_sub(1),
            self.rows.saturating_sub(1),
        );
        far * 0.5
    }

    fn medium_of(&self, row: usize) -> MediumId {
        let bands = self.bands.clamp(1, self.rows.max(1));
        (row * bands / self.rows.max(1)) as MediumId
    }

    fn neighbors_of(&self, col: usize, row: usize) -> Vec<usize> {
        ODDR_DIRECTIONS[row % 2]
            .iter()
            .filter_map(|&(dc, dr)| {
                let c = col.checked_add_signed(dc as isize)?;
                let r = row.checked_add_signed(dr as isize)?;
                (c < self.cols && r < self.rows).then(|| self.index(c, r))
            })
            .collect()
    }
}

/// Pointy-top hexagon around `center`.
pub fn hexagon(center: Vec2, radius: f32) -> Vec<[f32; 2]> {
    (0..6)
        .map(|i| {
            let angle = (60.0 * i as f32 - 30.0).to_radians();
            (center + Vec2::new(angle.cos(), angle.sin()) * radius).to_array()
        })
        .collect()
}

/// Builds every cell of the mesh, in index order.
///
/// ### Parameters
/// - `params` - Grid size, cell radius, jitter and band count.
/// - `rng` - Source of the center jitter.
///
/// ### Returns
/// One [`CellSpec`] per cell with a hexagon polygon and symmetric neighbor
/// lists, ready to be streamed as `addCell` commands.
pub fn hex_mesh(params: &MeshParams, rng: &mut impl Rng) -> Vec<CellSpec> {
    let mut specs = Vec::with_capacity(params.cols * params.rows);
    for row in 0..params.rows {
        for col in 0..params.cols {
            let mut center = params.offset_to_pixel(col, row);
            if params.jitter > 0.0 {
                center += Vec2::new(
                    rng.random_range(-params.jitter..=params.jitter),
                    rng.random_range(-params.jitter..=params.jitter),
                );
            }
            specs.push(CellSpec {
                x: center.x,
                y: center.y,
                index: params.index(col, row),
                polygon: hexagon(center, params.radius),
                neighbors: params.neighbors_of(col, row),
                medium: params.medium_of(row),
            });
        }
    }
    specs
}
