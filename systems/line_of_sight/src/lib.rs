#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Visibility queries between world-space points.

use glam::Vec2;
use tank_arena_core::Grid;

/// Reports whether nothing blocks the straight segment between `from` and `to`.
///
/// The tiles containing the endpoints are ignored, so an observer standing in
/// a doorway or a target pressed against a wall remain visible. The answer is
/// symmetric because [`Grid::raycast_tiles`] traverses both directions over
/// the same tiles.
#[must_use]
pub fn has_line_of_sight(from: Vec2, to: Vec2, grid: &Grid) -> bool {
    let origin = grid.world_to_tile(from).ok();
    let target = grid.world_to_tile(to).ok();

    grid.raycast_tiles(from, to)
        .into_iter()
        .filter(|tile| Some(*tile) != origin && Some(*tile) != target)
        .all(|tile| !grid.blocks_line_of_sight(tile))
}
