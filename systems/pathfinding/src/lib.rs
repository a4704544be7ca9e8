#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic A* search over the tile grid.
//!
//! The search graph is the set of tiles that do not block movement, connected
//! through their four edge neighbours with a uniform step cost. Ties between
//! frontier nodes of equal estimated cost are broken by the lower row and then
//! the lower column, so identical queries always yield identical paths.

use std::{cmp::Reverse, collections::BinaryHeap};

use tank_arena_core::{Grid, Path, TileCoord};

/// Result of a path query. An unreachable goal is a regular outcome.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathOutcome {
    /// Waypoints from start to goal, both inclusive.
    Found(Path),
    /// No path connects the start and goal tiles.
    NotFound,
}

impl PathOutcome {
    /// Reports whether a path was found.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Converts the outcome into an optional path.
    #[must_use]
    pub fn into_path(self) -> Option<Path> {
        match self {
            Self::Found(path) => Some(path),
            Self::NotFound => None,
        }
    }
}

/// Reusable A* planner that keeps its scratch buffers between queries.
#[derive(Debug, Default)]
pub struct Pathfinder {
    open: BinaryHeap<Reverse<(u32, TileCoord)>>,
    g_score: Vec<u32>,
    came_from: Vec<Option<TileCoord>>,
    closed: Vec<bool>,
}

impl Pathfinder {
    /// Creates a planner with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the shortest 4-connected path from `start` to `goal`.
    ///
    /// Returns [`PathOutcome::NotFound`] when either endpoint lies outside the
    /// grid or on a blocking tile, or when no route exists.
    pub fn find_path(&mut self, grid: &Grid, start: TileCoord, goal: TileCoord) -> PathOutcome {
        if grid.blocks_movement(start) || grid.blocks_movement(goal) {
            return PathOutcome::NotFound;
        }
        if start == goal {
            return PathOutcome::Found(Path::new(vec![start]));
        }

        self.reset(grid);
        let columns = grid.columns();

        self.g_score[slot(start, columns)] = 0;
        self.open
            .push(Reverse((start.manhattan_distance(goal), start)));

        while let Some(Reverse((_, current))) = self.open.pop() {
            let current_slot = slot(current, columns);
            if self.closed[current_slot] {
                continue;
            }
            if current == goal {
                return PathOutcome::Found(self.reconstruct(goal, columns));
            }
            self.closed[current_slot] = true;

            let tentative = self.g_score[current_slot].saturating_add(1);
            for neighbor in neighbors(current) {
                if grid.blocks_movement(neighbor) {
                    continue;
                }
                let neighbor_slot = slot(neighbor, columns);
                if self.closed[neighbor_slot] || tentative >= self.g_score[neighbor_slot] {
                    continue;
                }
                self.g_score[neighbor_slot] = tentative;
                self.came_from[neighbor_slot] = Some(current);
                let estimate = tentative.saturating_add(neighbor.manhattan_distance(goal));
                self.open.push(Reverse((estimate, neighbor)));
            }
        }

        PathOutcome::NotFound
    }

    /// Reports whether `goal` can be reached from `start`.
    pub fn is_reachable(&mut self, grid: &Grid, start: TileCoord, goal: TileCoord) -> bool {
        self.find_path(grid, start, goal).is_found()
    }

    fn reset(&mut self, grid: &Grid) {
        let tiles = grid.config().tile_count();
        self.open.clear();
        self.g_score.clear();
        self.g_score.resize(tiles, u32::MAX);
        self.came_from.clear();
        self.came_from.resize(tiles, None);
        self.closed.clear();
        self.closed.resize(tiles, false);
    }

    fn reconstruct(&self, goal: TileCoord, columns: u32) -> Path {
        let mut waypoints = vec![goal];
        let mut cursor = goal;
        while let Some(previous) = self.came_from[slot(cursor, columns)] {
            waypoints.push(previous);
            cursor = previous;
        }
        waypoints.reverse();
        Path::new(waypoints)
    }
}

/// Convenience wrapper that runs a single query with fresh scratch buffers.
#[must_use]
pub fn find_path(grid: &Grid, start: TileCoord, goal: TileCoord) -> PathOutcome {
    Pathfinder::new().find_path(grid, start, goal)
}

fn slot(coord: TileCoord, columns: u32) -> usize {
    coord.row() as usize * columns as usize + coord.column() as usize
}

fn neighbors(coord: TileCoord) -> impl Iterator<Item = TileCoord> {
    let row = coord.row();
    let column = coord.column();
    [
        row.checked_sub(1).map(|up| TileCoord::new(up, column)),
        column.checked_sub(1).map(|left| TileCoord::new(row, left)),
        column.checked_add(1).map(|right| TileCoord::new(row, right)),
        row.checked_add(1).map(|down| TileCoord::new(down, column)),
    ]
    .into_iter()
    .flatten()
}
