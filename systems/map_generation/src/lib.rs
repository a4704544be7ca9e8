#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Seeded arena generation with a reachability guarantee between spawn points.
//!
//! Every attempt fills the interior with obstacles drawn independently from a
//! ChaCha stream, keeps each spawn tile and its eight neighbours open, and then
//! verifies with the A* planner that all spawn points can reach each other.
//! Failed attempts are re-rolled from a seed derived from the configured seed
//! and the attempt index, so a given configuration always produces the same
//! arena or the same error.

use log::{debug, warn};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tank_arena_core::{Grid, GridConfig, GridError, TileCoord, TileKind};
use tank_arena_system_pathfinding::Pathfinder;
use thiserror::Error;

/// Number of layouts tried before generation gives up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 32;

const RNG_STREAM_ATTEMPT: &str = "map-attempt";

/// Parameters of a single arena generation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Dimensions and scale of the produced grid.
    pub grid: GridConfig,
    /// Probability in `[0, 1]` that an unprotected interior tile becomes an obstacle.
    pub obstacle_density: f64,
    /// Seed controlling obstacle placement.
    pub seed: u64,
    /// Tiles where tanks start. Every pair must stay mutually reachable.
    pub spawn_points: Vec<TileCoord>,
    /// Upper bound on the number of layouts rolled.
    pub max_attempts: u32,
}

impl MapConfig {
    /// Creates a configuration that uses [`DEFAULT_MAX_ATTEMPTS`].
    #[must_use]
    pub fn new(
        grid: GridConfig,
        obstacle_density: f64,
        seed: u64,
        spawn_points: Vec<TileCoord>,
    ) -> Self {
        Self {
            grid,
            obstacle_density,
            seed,
            spawn_points,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Overrides the retry budget.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Failures that abort arena generation.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum GenerationError {
    /// The grid configuration itself is unusable.
    #[error("invalid grid dimensions: {0}")]
    InvalidDimensions(#[from] GridError),
    /// The obstacle density is not a probability.
    #[error("obstacle density must lie within [0, 1], got {density}")]
    InvalidDensity {
        /// Rejected density.
        density: f64,
    },
    /// A spawn point lies outside the grid.
    #[error("spawn point {spawn} lies outside the grid")]
    SpawnOutOfBounds {
        /// Offending spawn tile.
        spawn: TileCoord,
    },
    /// A spawn point lies on the border ring.
    #[error("spawn point {spawn} lies on the border")]
    SpawnOnBorder {
        /// Offending spawn tile.
        spawn: TileCoord,
    },
    /// Every attempt produced a layout that separated some spawn points.
    #[error("no layout connected every spawn point after {attempts} attempts")]
    Unreachable {
        /// Number of layouts that were rolled.
        attempts: u32,
    },
}

/// Generates a bordered arena with seeded obstacles.
///
/// The returned grid always keeps every pair of configured spawn points
/// connected. When no such layout is found within the retry budget the call
/// fails with [`GenerationError::Unreachable`] rather than returning an
/// unplayable arena.
pub fn generate(config: &MapConfig) -> Result<Grid, GenerationError> {
    validate(config)?;

    let attempts = config.max_attempts.max(1);
    let mut pathfinder = Pathfinder::new();

    for attempt in 0..attempts {
        let grid = roll_layout(config, attempt)?;
        if let Some((from, to)) = first_disconnected_pair(&mut pathfinder, &grid, config) {
            debug!(
                "map attempt {attempt} for seed {} separates {from} from {to}, re-rolling",
                config.seed
            );
            continue;
        }
        debug!(
            "map for seed {} accepted after {} attempt(s)",
            config.seed,
            attempt + 1
        );
        return Ok(grid);
    }

    warn!(
        "map generation for seed {} exhausted {attempts} attempts",
        config.seed
    );
    Err(GenerationError::Unreachable { attempts })
}

fn validate(config: &MapConfig) -> Result<(), GenerationError> {
    let density = config.obstacle_density;
    if !(0.0..=1.0).contains(&density) {
        return Err(GenerationError::InvalidDensity { density });
    }

    let grid = config.grid;
    let _ = Grid::bordered(grid)?;
    for &spawn in &config.spawn_points {
        if spawn.row() >= grid.rows() || spawn.column() >= grid.columns() {
            return Err(GenerationError::SpawnOutOfBounds { spawn });
        }
        if grid.is_perimeter(spawn) {
            return Err(GenerationError::SpawnOnBorder { spawn });
        }
    }
    Ok(())
}

fn roll_layout(config: &MapConfig, attempt: u32) -> Result<Grid, GenerationError> {
    let mut rng = ChaCha8Rng::seed_from_u64(attempt_seed(config.seed, attempt));
    let grid = config.grid;

    let mut kinds = Vec::with_capacity(grid.tile_count());
    for row in 0..grid.rows() {
        for column in 0..grid.columns() {
            let coord = TileCoord::new(row, column);
            let kind = if grid.is_perimeter(coord) {
                TileKind::Border
            } else if is_protected(coord, &config.spawn_points) {
                TileKind::Empty
            } else if rng.gen_bool(config.obstacle_density) {
                TileKind::Obstacle
            } else {
                TileKind::Empty
            };
            kinds.push(kind);
        }
    }

    Ok(Grid::from_kinds(grid, kinds)?)
}

fn is_protected(coord: TileCoord, spawn_points: &[TileCoord]) -> bool {
    spawn_points
        .iter()
        .any(|spawn| spawn.chebyshev_distance(coord) <= 1)
}

fn first_disconnected_pair(
    pathfinder: &mut Pathfinder,
    grid: &Grid,
    config: &MapConfig,
) -> Option<(TileCoord, TileCoord)> {
    let spawns = &config.spawn_points;
    for (index, &from) in spawns.iter().enumerate() {
        for &to in &spawns[index + 1..] {
            if !pathfinder.is_reachable(grid, from, to) {
                return Some((from, to));
            }
        }
    }
    None
}

/// The first attempt uses the configured seed verbatim so single-attempt
/// layouts stay reproducible from the seed alone.
fn attempt_seed(seed: u64, attempt: u32) -> u64 {
    if attempt == 0 {
        return seed;
    }
    let mut hasher = Sha256::new();
    hasher.update(seed.to_le_bytes());
    hasher.update(RNG_STREAM_ATTEMPT.as_bytes());
    hasher.update(attempt.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
