use crate::cell::{CellId, Latitude, Longitude};

/// Geometry of one shard's world: a square grid of sectors, each a square
/// sub-grid of cells, imaged by one fixed-size tile per sector.
///
/// All pixel math below is in scaled-canvas coordinates (base pixels times
/// `zoom`) unless a method says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldGrid {
    /// Sectors per axis.
    pub world_size: u32,
    /// Cells per sector axis.
    pub sector_cells: u32,
    /// Cell side length in pixels at base zoom.
    pub cell_pixels: u32,
    /// Integer upscale factor applied to the assembled canvas.
    pub zoom: u32,
}

impl Default for WorldGrid {
    fn default() -> Self {
        Self {
            world_size: 14,
            sector_cells: 10,
            cell_pixels: 20,
            zoom: 2,
        }
    }
}

impl WorldGrid {
    pub fn cells_per_axis(&self) -> u32 {
        self.world_size * self.sector_cells
    }

    pub fn half_cells(&self) -> u32 {
        self.cells_per_axis() / 2
    }

    /// Sector tile side length in base pixels.
    pub fn sector_pixels(&self) -> u32 {
        self.sector_cells * self.cell_pixels
    }

    /// Assembled canvas side length before upscaling.
    pub fn base_pixels(&self) -> u32 {
        self.world_size * self.sector_pixels()
    }

    pub fn scaled_cell_pixels(&self) -> u32 {
        self.cell_pixels * self.zoom
    }

    /// Final canvas side length.
    pub fn canvas_pixels(&self) -> u32 {
        self.base_pixels() * self.zoom
    }

    /// Maps a pixel position on the scaled canvas to the cell containing it.
    ///
    /// Each axis resolves independently via `code = half − pixel/cell_side`:
    /// a non-positive code falls in the east/south half with magnitude
    /// `floor(−code)`, a positive one in the west/north half with magnitude
    /// `floor(code − 1)`. The `code == 0` boundary always lands on E0/S0.
    pub fn pixel_to_cell(&self, x: u32, y: u32) -> CellId {
        let half = f64::from(self.half_cells());
        let cell_side = f64::from(self.scaled_cell_pixels());
        let x_code = half - f64::from(x) / cell_side;
        let y_code = half - f64::from(y) / cell_side;
        CellId {
            lon: if x_code <= 0.0 {
                Longitude::East((-x_code).floor() as u32)
            } else {
                Longitude::West((x_code - 1.0).floor().max(0.0) as u32)
            },
            lat: if y_code <= 0.0 {
                Latitude::South((-y_code).floor() as u32)
            } else {
                Latitude::North((y_code - 1.0).floor().max(0.0) as u32)
            },
        }
    }

    /// Top-left pixel of a cell on the scaled canvas. Exact inverse of
    /// [`Self::pixel_to_cell`] for in-world cells; out-of-range magnitudes
    /// land outside the canvas and are the caller's to reject.
    pub fn cell_to_pixel(&self, cell: CellId) -> (i64, i64) {
        let half = self.half_cells();
        let cell_side = i64::from(self.scaled_cell_pixels());
        (
            cell.lon.index(half) * cell_side,
            cell.lat.index(half) * cell_side,
        )
    }

    /// Corner cell naming the sector at grid position `(ix, iy)`.
    pub fn sector_corner(&self, ix: u32, iy: u32) -> CellId {
        let half = self.half_cells();
        CellId {
            lon: Longitude::from_index(ix * self.sector_cells, half),
            lat: Latitude::from_index(iy * self.sector_cells, half),
        }
    }

    /// All sector grid positions with their corner cells, column-major.
    pub fn sector_corners(&self) -> impl Iterator<Item = (u32, u32, CellId)> + '_ {
        let size = self.world_size;
        (0..size).flat_map(move |ix| (0..size).map(move |iy| (ix, iy, self.sector_corner(ix, iy))))
    }

    /// Every cell in the world, in a fixed column-major order.
    pub fn all_cells(&self) -> Vec<CellId> {
        let half = self.half_cells();
        let per_axis = self.cells_per_axis();
        let mut cells = Vec::with_capacity((per_axis * per_axis) as usize);
        for ix in 0..per_axis {
            for iy in 0..per_axis {
                cells.push(CellId {
                    lon: Longitude::from_index(ix, half),
                    lat: Latitude::from_index(iy, half),
                });
            }
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geometry_matches_the_live_world() {
        let grid = WorldGrid::default();
        assert_eq!(grid.cells_per_axis(), 140);
        assert_eq!(grid.half_cells(), 70);
        assert_eq!(grid.sector_pixels(), 200);
        assert_eq!(grid.base_pixels(), 2800);
        assert_eq!(grid.scaled_cell_pixels(), 40);
        assert_eq!(grid.canvas_pixels(), 5600);
    }

    #[test]
    fn corner_pixels_invert_exactly_for_every_cell() {
        let grid = WorldGrid::default();
        for cell in grid.all_cells() {
            let (x, y) = grid.cell_to_pixel(cell);
            assert!(x >= 0 && y >= 0);
            let back = grid.pixel_to_cell(x as u32, y as u32);
            assert_eq!(back, cell, "corner ({x}, {y}) should map back to {cell}");
        }
    }

    #[test]
    fn known_positions() {
        let grid = WorldGrid::default();
        assert_eq!(grid.pixel_to_cell(0, 0).to_string(), "W69N69");
        assert_eq!(grid.pixel_to_cell(1400, 1400).to_string(), "W34N34");
        assert_eq!(grid.pixel_to_cell(5560, 5560).to_string(), "E69S69");
    }

    #[test]
    fn half_world_boundary_resolves_east_south() {
        let grid = WorldGrid::default();
        // code == 0 on both axes
        assert_eq!(grid.pixel_to_cell(2800, 2800).to_string(), "E0S0");
        // one pixel to either side of the boundary
        assert_eq!(grid.pixel_to_cell(2799, 2800).to_string(), "W0S0");
        assert_eq!(grid.pixel_to_cell(2800, 2799).to_string(), "E0N0");
    }

    #[test]
    fn non_corner_pixels_follow_the_signed_code_formula() {
        let grid = WorldGrid::default();
        // interiors resolve per the floor arithmetic, not containment; the
        // last west/north column clamps at magnitude 0
        for (x, y, expect) in [
            (17, 39, "W68N68"),
            (2799, 2799, "W0N0"),
            (2801, 2815, "E0S0"),
            (5599, 5599, "E69S69"),
        ] {
            assert_eq!(grid.pixel_to_cell(x, y).to_string(), expect);
        }
    }

    #[test]
    fn sector_corners_match_the_tile_naming_scheme() {
        let grid = WorldGrid::default();
        assert_eq!(grid.sector_corner(0, 0).to_string(), "W69N69");
        assert_eq!(grid.sector_corner(6, 6).to_string(), "W9N9");
        assert_eq!(grid.sector_corner(7, 7).to_string(), "E0S0");
        assert_eq!(grid.sector_corner(13, 13).to_string(), "E60S60");
        assert_eq!(
            grid.sector_corners().count() as u32,
            grid.world_size * grid.world_size
        );
    }

    #[test]
    fn out_of_range_cells_land_outside_the_canvas() {
        let grid = WorldGrid::default();
        let far: CellId = "E200N0".parse().expect("cell id should parse");
        let (x, _) = grid.cell_to_pixel(far);
        assert!(x >= i64::from(grid.canvas_pixels()));
    }

    #[test]
    fn all_cells_covers_the_world_once() {
        let grid = WorldGrid::default();
        let cells = grid.all_cells();
        assert_eq!(cells.len(), 140 * 140);
        let unique: std::collections::HashSet<_> = cells.iter().collect();
        assert_eq!(unique.len(), cells.len());
    }
}
