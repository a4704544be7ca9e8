//! Immutable tile grid that backs every geometric query in the arena.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Aabb, TileCoord};

/// Tolerance used to decide that a ray crosses both axes through a lattice corner.
const CORNER_EPSILON: f32 = 1e-6;

/// Classification of a single tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TileKind {
    /// Perimeter tile that always blocks.
    Border,
    /// Interior blocking tile placed by the map generator.
    Obstacle,
    /// Open floor that blocks nothing.
    Empty,
}

impl TileKind {
    /// Reports whether tanks and bullets are stopped by this tile.
    #[must_use]
    pub const fn blocks_movement(self) -> bool {
        matches!(self, Self::Border | Self::Obstacle)
    }

    /// Reports whether this tile hides whatever lies behind it.
    #[must_use]
    pub const fn blocks_line_of_sight(self) -> bool {
        matches!(self, Self::Border | Self::Obstacle)
    }
}

/// Discrete grid cell with its coordinates and classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Tile {
    coord: TileCoord,
    kind: TileKind,
}

impl Tile {
    /// Creates a new tile.
    #[must_use]
    pub const fn new(coord: TileCoord, kind: TileKind) -> Self {
        Self { coord, kind }
    }

    /// Location of the tile within the grid.
    #[must_use]
    pub const fn coord(&self) -> TileCoord {
        self.coord
    }

    /// Classification assigned at map-build time.
    #[must_use]
    pub const fn kind(&self) -> TileKind {
        self.kind
    }

    /// Reports whether the tile stops tanks and bullets.
    #[must_use]
    pub const fn blocks_movement(&self) -> bool {
        self.kind.blocks_movement()
    }

    /// Reports whether the tile blocks visibility.
    #[must_use]
    pub const fn blocks_line_of_sight(&self) -> bool {
        self.kind.blocks_line_of_sight()
    }
}

/// Dimensions and scale of a tile grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    columns: u32,
    rows: u32,
    tile_length: f32,
}

impl GridConfig {
    /// Creates a new grid configuration.
    #[must_use]
    pub const fn new(columns: u32, rows: u32, tile_length: f32) -> Self {
        Self {
            columns,
            rows,
            tile_length,
        }
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Side length of a square tile in world units.
    #[must_use]
    pub const fn tile_length(&self) -> f32 {
        self.tile_length
    }

    /// Total number of tiles described by the configuration.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        let columns = usize::try_from(self.columns).unwrap_or(0);
        let rows = usize::try_from(self.rows).unwrap_or(0);
        columns.saturating_mul(rows)
    }

    /// Reports whether the coordinate lies on the outermost ring of tiles.
    #[must_use]
    pub const fn is_perimeter(&self, coord: TileCoord) -> bool {
        coord.row() == 0
            || coord.column() == 0
            || coord.row() + 1 == self.rows
            || coord.column() + 1 == self.columns
    }

    fn validate(&self) -> Result<(), GridError> {
        if self.columns < 3 || self.rows < 3 {
            return Err(GridError::InvalidDimensions {
                columns: self.columns,
                rows: self.rows,
            });
        }
        if !(self.tile_length.is_finite() && self.tile_length > 0.0) {
            return Err(GridError::InvalidTileLength {
                tile_length: self.tile_length,
            });
        }
        Ok(())
    }
}

/// Failures raised by grid construction and coordinate lookups.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum GridError {
    /// The requested tile lies beyond the grid dimensions.
    #[error("tile {coord} lies outside a {columns}x{rows} grid")]
    OutOfBounds {
        /// Coordinate that was requested.
        coord: TileCoord,
        /// Number of columns in the grid.
        columns: u32,
        /// Number of rows in the grid.
        rows: u32,
    },
    /// The world-space point does not fall on any tile.
    #[error("point ({x}, {y}) lies outside the grid")]
    PointOutsideGrid {
        /// Horizontal world coordinate.
        x: f32,
        /// Vertical world coordinate.
        y: f32,
    },
    /// A grid needs at least one interior tile inside its border.
    #[error("grid must be at least 3x3 tiles, got {columns}x{rows}")]
    InvalidDimensions {
        /// Requested number of columns.
        columns: u32,
        /// Requested number of rows.
        rows: u32,
    },
    /// Tiles must have a positive, finite side length.
    #[error("tile length must be positive and finite, got {tile_length}")]
    InvalidTileLength {
        /// Rejected side length.
        tile_length: f32,
    },
    /// The supplied tile kinds do not match the configured dimensions.
    #[error("expected {expected} tiles, got {actual}")]
    DimensionMismatch {
        /// Tile count implied by the configuration.
        expected: usize,
        /// Tile count supplied by the caller.
        actual: usize,
    },
    /// A perimeter tile was not marked as a border.
    #[error("perimeter tile {coord} is not a border tile")]
    MissingBorder {
        /// Offending perimeter coordinate.
        coord: TileCoord,
    },
}

/// Rectangular, row-major tile array with coordinate conversion helpers.
///
/// A grid is fully built before a match starts and never changes afterwards.
/// Every perimeter tile is guaranteed to be [`TileKind::Border`].
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    config: GridConfig,
    tiles: Vec<Tile>,
}

impl Grid {
    /// Builds a grid whose perimeter is border and whose interior is empty.
    pub fn bordered(config: GridConfig) -> Result<Self, GridError> {
        config.validate()?;
        let kinds = (0..config.rows())
            .flat_map(|row| (0..config.columns()).map(move |column| TileCoord::new(row, column)))
            .map(|coord| {
                if config.is_perimeter(coord) {
                    TileKind::Border
                } else {
                    TileKind::Empty
                }
            })
            .collect();
        Self::from_kinds(config, kinds)
    }

    /// Builds a grid from row-major tile kinds, validating the border invariant.
    pub fn from_kinds(config: GridConfig, kinds: Vec<TileKind>) -> Result<Self, GridError> {
        config.validate()?;
        let expected = config.tile_count();
        if kinds.len() != expected {
            return Err(GridError::DimensionMismatch {
                expected,
                actual: kinds.len(),
            });
        }

        let columns = config.columns();
        let mut tiles = Vec::with_capacity(expected);
        for (index, kind) in kinds.into_iter().enumerate() {
            let index = u32::try_from(index).unwrap_or(u32::MAX);
            let coord = TileCoord::new(index / columns, index % columns);
            if config.is_perimeter(coord) && kind != TileKind::Border {
                return Err(GridError::MissingBorder { coord });
            }
            tiles.push(Tile::new(coord, kind));
        }

        Ok(Self { config, tiles })
    }

    /// Configuration the grid was built from.
    #[must_use]
    pub const fn config(&self) -> GridConfig {
        self.config
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.config.columns()
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.config.rows()
    }

    /// Side length of a tile in world units.
    #[must_use]
    pub const fn tile_length(&self) -> f32 {
        self.config.tile_length()
    }

    /// Total width of the grid in world units.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.columns() as f32 * self.tile_length()
    }

    /// Total height of the grid in world units.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.rows() as f32 * self.tile_length()
    }

    /// All tiles in row-major order.
    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Reports whether the coordinate addresses a tile of this grid.
    #[must_use]
    pub const fn contains(&self, coord: TileCoord) -> bool {
        coord.row() < self.rows() && coord.column() < self.columns()
    }

    /// Looks up the tile at the provided coordinate.
    pub fn tile_at(&self, coord: TileCoord) -> Result<&Tile, GridError> {
        self.index(coord)
            .and_then(|index| self.tiles.get(index))
            .ok_or(GridError::OutOfBounds {
                coord,
                columns: self.columns(),
                rows: self.rows(),
            })
    }

    /// Reports whether the tile blocks movement. Coordinates outside the grid block.
    #[must_use]
    pub fn blocks_movement(&self, coord: TileCoord) -> bool {
        self.tile_at(coord).map_or(true, Tile::blocks_movement)
    }

    /// Reports whether the tile blocks visibility. Coordinates outside the grid block.
    #[must_use]
    pub fn blocks_line_of_sight(&self, coord: TileCoord) -> bool {
        self.tile_at(coord).map_or(true, Tile::blocks_line_of_sight)
    }

    /// Signed variant of [`Grid::blocks_movement`] for geometry that may probe
    /// past the grid edge; negative indices count as blocking.
    #[must_use]
    pub fn blocks_movement_at(&self, row: i64, column: i64) -> bool {
        self.coord_from_signed(row, column)
            .map_or(true, |coord| self.blocks_movement(coord))
    }

    /// Index of the tile row or column containing the world-space scalar.
    #[must_use]
    pub fn axis_index(&self, value: f32) -> i64 {
        (value / self.tile_length()).floor() as i64
    }

    /// Converts a world-space point into the coordinate of the tile containing it.
    pub fn world_to_tile(&self, point: Vec2) -> Result<TileCoord, GridError> {
        self.coord_from_signed(self.axis_index(point.y), self.axis_index(point.x))
            .ok_or(GridError::PointOutsideGrid {
                x: point.x,
                y: point.y,
            })
    }

    /// World-space center of the tile at `coord`.
    #[must_use]
    pub fn tile_to_world_center(&self, coord: TileCoord) -> Vec2 {
        let length = self.tile_length();
        Vec2::new(
            (coord.column() as f32 + 0.5) * length,
            (coord.row() as f32 + 0.5) * length,
        )
    }

    /// World-space rectangle covered by the tile at `coord`.
    #[must_use]
    pub fn tile_bounds(&self, coord: TileCoord) -> Aabb {
        let length = self.tile_length();
        let min = Vec2::new(coord.column() as f32 * length, coord.row() as f32 * length);
        Aabb::new(min, min + Vec2::splat(length))
    }

    /// Ordered tiles touched by the segment from `from` to `to`.
    ///
    /// Uses a supercover traversal: when the segment passes exactly through a
    /// lattice corner both side tiles are reported. The traversal always runs in
    /// a canonical endpoint order, so swapping the endpoints yields exactly the
    /// reversed sequence. Tiles outside the grid are omitted.
    #[must_use]
    pub fn raycast_tiles(&self, from: Vec2, to: Vec2) -> Vec<TileCoord> {
        let reversed = (to.x, to.y) < (from.x, from.y);
        let (start, end) = if reversed { (to, from) } else { (from, to) };

        let mut tiles = Vec::new();
        self.supercover(start, end, |row, column| {
            if let Some(coord) = self.coord_from_signed(row, column) {
                tiles.push(coord);
            }
        });

        if reversed {
            tiles.reverse();
        }
        tiles
    }

    fn supercover<F>(&self, start: Vec2, end: Vec2, mut visit: F)
    where
        F: FnMut(i64, i64),
    {
        let length = self.tile_length();
        let origin = start / length;
        let target = end / length;
        let delta = target - origin;

        let mut column = origin.x.floor() as i64;
        let mut row = origin.y.floor() as i64;
        let end_column = target.x.floor() as i64;
        let end_row = target.y.floor() as i64;

        let step_column = axis_step(delta.x);
        let step_row = axis_step(delta.y);
        let t_delta_x = crossing_interval(delta.x);
        let t_delta_y = crossing_interval(delta.y);
        let mut t_max_x = first_crossing(origin.x, column, delta.x);
        let mut t_max_y = first_crossing(origin.y, row, delta.y);

        visit(row, column);

        let budget = end_column.abs_diff(column) + end_row.abs_diff(row);
        let mut steps = 0_u64;
        while (row, column) != (end_row, end_column) && steps < budget {
            if (t_max_x - t_max_y).abs() <= CORNER_EPSILON {
                let beside = (row, column + step_column);
                let below = (row + step_row, column);
                visit(beside.0, beside.1);
                visit(below.0, below.1);
                if beside == (end_row, end_column) || below == (end_row, end_column) {
                    break;
                }
                column += step_column;
                row += step_row;
                t_max_x += t_delta_x;
                t_max_y += t_delta_y;
                steps += 2;
            } else if t_max_x < t_max_y {
                column += step_column;
                t_max_x += t_delta_x;
                steps += 1;
            } else {
                row += step_row;
                t_max_y += t_delta_y;
                steps += 1;
            }
            visit(row, column);
        }
    }

    fn coord_from_signed(&self, row: i64, column: i64) -> Option<TileCoord> {
        let row = u32::try_from(row).ok()?;
        let column = u32::try_from(column).ok()?;
        let coord = TileCoord::new(row, column);
        self.contains(coord).then_some(coord)
    }

    fn index(&self, coord: TileCoord) -> Option<usize> {
        if !self.contains(coord) {
            return None;
        }
        let row = usize::try_from(coord.row()).ok()?;
        let column = usize::try_from(coord.column()).ok()?;
        let width = usize::try_from(self.columns()).ok()?;
        row.checked_mul(width)?.checked_add(column)
    }
}

fn axis_step(delta: f32) -> i64 {
    if delta > 0.0 {
        1
    } else if delta < 0.0 {
        -1
    } else {
        0
    }
}

fn crossing_interval(delta: f32) -> f32 {
    if delta == 0.0 {
        f32::INFINITY
    } else {
        1.0 / delta.abs()
    }
}

fn first_crossing(origin: f32, cell: i64, delta: f32) -> f32 {
    if delta > 0.0 {
        ((cell + 1) as f32 - origin) / delta
    } else if delta < 0.0 {
        (origin - cell as f32) / -delta
    } else {
        f32::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_grid(columns: u32, rows: u32) -> Grid {
        Grid::bordered(GridConfig::new(columns, rows, 10.0)).expect("valid grid")
    }

    #[test]
    fn tile_bounds_cover_one_tile_length() {
        let grid = open_grid(5, 4);
        let bounds = grid.tile_bounds(TileCoord::new(2, 3));
        assert_eq!(bounds.min(), Vec2::new(30.0, 20.0));
        assert_eq!(bounds.max(), Vec2::new(40.0, 30.0));
        let center = grid.tile_to_world_center(TileCoord::new(2, 3));
        assert_eq!((bounds.min() + bounds.max()) * 0.5, center);
    }

    #[test]
    fn bordered_grid_marks_perimeter_only() {
        let grid = open_grid(5, 4);
        for tile in grid.tiles() {
            let expected = if grid.config().is_perimeter(tile.coord()) {
                TileKind::Border
            } else {
                TileKind::Empty
            };
            assert_eq!(tile.kind(), expected, "unexpected kind at {:?}", tile.coord());
        }
    }

    #[test]
    fn tile_at_rejects_out_of_range_coordinates() {
        let grid = open_grid(5, 4);
        assert!(grid.tile_at(TileCoord::new(3, 4)).is_ok());
        assert_eq!(
            grid.tile_at(TileCoord::new(4, 0)),
            Err(GridError::OutOfBounds {
                coord: TileCoord::new(4, 0),
                columns: 5,
                rows: 4,
            })
        );
        assert!(grid.tile_at(TileCoord::new(0, 5)).is_err());
    }

    #[test]
    fn from_kinds_requires_border_on_perimeter() {
        let config = GridConfig::new(3, 3, 1.0);
        let mut kinds = vec![TileKind::Border; 9];
        kinds[4] = TileKind::Obstacle;
        assert!(Grid::from_kinds(config, kinds.clone()).is_ok());

        kinds[1] = TileKind::Empty;
        assert_eq!(
            Grid::from_kinds(config, kinds),
            Err(GridError::MissingBorder {
                coord: TileCoord::new(0, 1)
            })
        );
    }

    #[test]
    fn from_kinds_rejects_wrong_tile_count() {
        let config = GridConfig::new(3, 3, 1.0);
        assert_eq!(
            Grid::from_kinds(config, vec![TileKind::Border; 8]),
            Err(GridError::DimensionMismatch {
                expected: 9,
                actual: 8
            })
        );
    }

    #[test]
    fn degenerate_configurations_are_rejected() {
        assert!(matches!(
            Grid::bordered(GridConfig::new(2, 5, 1.0)),
            Err(GridError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            Grid::bordered(GridConfig::new(4, 4, 0.0)),
            Err(GridError::InvalidTileLength { .. })
        ));
    }

    #[test]
    fn world_and_tile_coordinates_convert_consistently() {
        let grid = open_grid(6, 5);
        let coord = TileCoord::new(2, 3);
        let center = grid.tile_to_world_center(coord);
        assert_eq!(center, Vec2::new(35.0, 25.0));
        assert_eq!(grid.world_to_tile(center), Ok(coord));
        assert_eq!(grid.world_to_tile(Vec2::new(30.0, 20.0)), Ok(coord));
        assert_eq!(
            grid.world_to_tile(Vec2::new(39.99, 29.99)),
            Ok(TileCoord::new(2, 3))
        );
        assert!(grid.world_to_tile(Vec2::new(-0.1, 5.0)).is_err());
        assert!(grid.world_to_tile(Vec2::new(60.0, 5.0)).is_err());
    }

    #[test]
    fn raycast_along_a_row_visits_each_column_once() {
        let grid = open_grid(8, 3);
        let tiles = grid.raycast_tiles(Vec2::new(5.0, 15.0), Vec2::new(45.0, 15.0));
        let expected: Vec<_> = (0..=4).map(|column| TileCoord::new(1, column)).collect();
        assert_eq!(tiles, expected);
    }

    #[test]
    fn raycast_through_corner_reports_both_side_tiles() {
        let grid = open_grid(5, 5);
        let tiles = grid.raycast_tiles(Vec2::new(5.0, 5.0), Vec2::new(25.0, 25.0));
        assert_eq!(
            tiles,
            vec![
                TileCoord::new(0, 0),
                TileCoord::new(0, 1),
                TileCoord::new(1, 0),
                TileCoord::new(1, 1),
                TileCoord::new(1, 2),
                TileCoord::new(2, 1),
                TileCoord::new(2, 2),
            ]
        );
    }

    #[test]
    fn raycast_shallow_diagonal_steps_through_adjacent_tiles() {
        let grid = open_grid(6, 4);
        let tiles = grid.raycast_tiles(Vec2::new(5.0, 12.0), Vec2::new(35.0, 24.0));
        assert_eq!(tiles.first(), Some(&TileCoord::new(1, 0)));
        assert_eq!(tiles.last(), Some(&TileCoord::new(2, 3)));
        for pair in tiles.windows(2) {
            assert_eq!(
                pair[0].manhattan_distance(pair[1]),
                1,
                "traversal must move between edge-adjacent tiles"
            );
        }
    }

    #[test]
    fn raycast_reversed_endpoints_yield_reversed_sequence() {
        let grid = open_grid(9, 9);
        let points = [
            Vec2::new(12.5, 17.0),
            Vec2::new(71.0, 33.3),
            Vec2::new(40.0, 40.0),
            Vec2::new(20.0, 80.0),
            Vec2::new(85.0, 5.0),
        ];
        for &a in &points {
            for &b in &points {
                let mut backwards = grid.raycast_tiles(b, a);
                backwards.reverse();
                assert_eq!(grid.raycast_tiles(a, b), backwards);
            }
        }
    }

    #[test]
    fn raycast_omits_tiles_outside_the_grid() {
        let grid = open_grid(4, 4);
        let tiles = grid.raycast_tiles(Vec2::new(-15.0, 15.0), Vec2::new(15.0, 15.0));
        assert_eq!(tiles, vec![TileCoord::new(1, 0), TileCoord::new(1, 1)]);
    }

    #[test]
    fn blocks_movement_treats_outside_as_solid() {
        let grid = open_grid(4, 4);
        assert!(grid.blocks_movement_at(-1, 2));
        assert!(grid.blocks_movement_at(1, 4));
        assert!(grid.blocks_movement_at(0, 1));
        assert!(!grid.blocks_movement_at(1, 1));
    }
}
