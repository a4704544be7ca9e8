#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the tank arena engine.
//!
//! This crate defines the tile grid and the message surface that connects
//! adapters, the authoritative match world, and pure systems. Adapters submit
//! [`Command`] values describing per-tick intent, the world executes those
//! commands via its `apply` entry point, and then broadcasts [`Event`] values
//! describing what happened. Systems query immutable snapshots and respond
//! exclusively with new command batches.

use std::{fmt, time::Duration};

use glam::Vec2;
use serde::{Deserialize, Serialize};

mod grid;

pub use grid::{Grid, GridConfig, GridError, Tile, TileKind};

/// Commands that express all permissible match mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Queues the input a tank should act on during the next tick.
    SubmitInput {
        /// Tank receiving the input.
        tank: TankId,
        /// Movement, facing, and fire intent for the tick.
        input: TankInput,
    },
    /// Stores or clears the advisory waypoint path of an AI-controlled tank.
    AssignPath {
        /// Tank the path belongs to.
        tank: TankId,
        /// Waypoints to follow, or `None` to drop the current path.
        path: Option<Path>,
    },
    /// Advances the simulation by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Reports that a tank changed position during movement resolution.
    TankMoved {
        /// Tank that moved.
        tank: TankId,
        /// Position before the move.
        from: Vec2,
        /// Position after collision resolution.
        to: Vec2,
    },
    /// Confirms that a tank fired a bullet.
    BulletFired {
        /// Identifier allocated to the new bullet.
        bullet: BulletId,
        /// Tank that fired.
        owner: TankId,
        /// Muzzle position the bullet starts from.
        position: Vec2,
    },
    /// Reports that a bullet reflected off a blocking tile.
    BulletBounced {
        /// Bullet that bounced.
        bullet: BulletId,
        /// Position the bullet was clamped to at the wall.
        position: Vec2,
        /// Bounces recorded so far, including this one.
        bounces: u32,
    },
    /// Reports that a bullet ran out of bounces or lifetime.
    BulletExpired {
        /// Bullet that was removed.
        bullet: BulletId,
    },
    /// Reports that a bullet destroyed a tank.
    TankDestroyed {
        /// Tank that was destroyed.
        tank: TankId,
        /// Bullet that struck the tank.
        bullet: BulletId,
        /// Tank that fired the bullet.
        by: TankId,
        /// Whether the tank was struck by its own bullet.
        self_inflicted: bool,
    },
    /// Announces the terminal outcome of the match. Emitted exactly once.
    MatchConcluded {
        /// Terminal status the match settled in.
        status: MatchStatus,
    },
}

/// Per-tick intent supplied by an input provider for a single tank.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct TankInput {
    /// Desired direction of travel. Lengths above one are clamped to one.
    pub throttle: Vec2,
    /// Absolute facing in radians. When absent the tank faces its direction of travel.
    pub facing: Option<f32>,
    /// Whether the tank attempts to fire this tick.
    pub fire: bool,
}

/// Unique identifier assigned to a tank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TankId(u32);

impl TankId {
    /// Creates a new tank identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for TankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier assigned to a bullet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BulletId(u32);

impl BulletId {
    /// Creates a new bullet identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Team tag carried by a tank. Purely informational for the win rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(u32);

impl TeamId {
    /// Creates a new team tag.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the team tag.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Location of a single tile expressed as row and column indices.
///
/// Ordering compares the row first and the column second, which is the
/// tie-breaking order used wherever a deterministic choice between tiles is
/// required.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    row: u32,
    column: u32,
}

impl TileCoord {
    /// Creates a new tile coordinate.
    #[must_use]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }

    /// Zero-based row index of the tile.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Zero-based column index of the tile.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Computes the Manhattan distance between two tile coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: TileCoord) -> u32 {
        self.column.abs_diff(other.column) + self.row.abs_diff(other.row)
    }

    /// Computes the Chebyshev (king-move) distance between two tile coordinates.
    #[must_use]
    pub fn chebyshev_distance(self, other: TileCoord) -> u32 {
        self.column
            .abs_diff(other.column)
            .max(self.row.abs_diff(other.row))
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}

/// Ordered tile waypoints from a start tile to a goal tile, both inclusive.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Path {
    waypoints: Vec<TileCoord>,
}

impl Path {
    /// Creates a path from the provided waypoints.
    #[must_use]
    pub fn new(waypoints: Vec<TileCoord>) -> Self {
        Self { waypoints }
    }

    /// Waypoints in travel order.
    #[must_use]
    pub fn waypoints(&self) -> &[TileCoord] {
        &self.waypoints
    }

    /// Number of waypoints, including start and goal.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Reports whether the path holds no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// First waypoint of the path.
    #[must_use]
    pub fn start(&self) -> Option<TileCoord> {
        self.waypoints.first().copied()
    }

    /// Final waypoint of the path.
    #[must_use]
    pub fn goal(&self) -> Option<TileCoord> {
        self.waypoints.last().copied()
    }

    /// Returns the remainder of the path after dropping `count` leading waypoints.
    #[must_use]
    pub fn skip(&self, count: usize) -> Self {
        Self {
            waypoints: self.waypoints.iter().skip(count).copied().collect(),
        }
    }
}

/// Axis-aligned bounding box in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    min: Vec2,
    max: Vec2,
}

impl Aabb {
    /// Creates a box from its minimum and maximum corners.
    #[must_use]
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Creates a box centered on `center` extending `half_extents` along each axis.
    #[must_use]
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Minimum (top-left) corner.
    #[must_use]
    pub const fn min(&self) -> Vec2 {
        self.min
    }

    /// Maximum (bottom-right) corner.
    #[must_use]
    pub const fn max(&self) -> Vec2 {
        self.max
    }


    /// Reports whether the two boxes share interior area. Touching edges do not count.
    #[must_use]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Reports whether the segment from `from` to `to` passes through the box
    /// interior. Grazing an edge does not count.
    #[must_use]
    pub fn intersects_segment(&self, from: Vec2, to: Vec2) -> bool {
        let delta = to - from;
        let mut enter = 0.0_f32;
        let mut exit = 1.0_f32;
        for (start, step, min, max) in [
            (from.x, delta.x, self.min.x, self.max.x),
            (from.y, delta.y, self.min.y, self.max.y),
        ] {
            if step == 0.0 {
                if start <= min || start >= max {
                    return false;
                }
                continue;
            }
            let first = (min - start) / step;
            let second = (max - start) / step;
            enter = enter.max(first.min(second));
            exit = exit.min(first.max(second));
        }
        enter < exit
    }
}

/// Running tally of a tank's combat record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct TankStats {
    /// Opponents destroyed by this tank's bullets.
    pub kills: u32,
    /// Times this tank was destroyed.
    pub deaths: u32,
    /// Times this tank was destroyed by its own bullet.
    pub suicides: u32,
}

/// Mutable tank actor owned by the match world.
#[derive(Clone, Debug, PartialEq)]
pub struct Tank {
    /// Identifier allocated at match setup.
    pub id: TankId,
    /// Team tag.
    pub team: TeamId,
    /// Center of the tank in world units.
    pub position: Vec2,
    /// Facing in radians, measured from the +x axis toward +y.
    pub facing: f32,
    /// Side length of the tank's square bounding box.
    pub size: f32,
    /// Whether the tank is still in play. Dead tanks stay in the collection.
    pub alive: bool,
    /// Advisory waypoints followed when AI-controlled.
    pub path: Option<Path>,
    /// Time remaining before the tank may fire again.
    pub fire_cooldown: Duration,
    /// Combat record accumulated during the match.
    pub stats: TankStats,
}

impl Tank {
    /// Creates a live tank at rest.
    #[must_use]
    pub fn new(id: TankId, team: TeamId, position: Vec2, facing: f32, size: f32) -> Self {
        Self {
            id,
            team,
            position,
            facing,
            size,
            alive: true,
            path: None,
            fire_cooldown: Duration::ZERO,
            stats: TankStats::default(),
        }
    }

    /// Half of the tank's side length.
    #[must_use]
    pub fn half_extent(&self) -> f32 {
        self.size * 0.5
    }

    /// Bounding box at the tank's current position.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.position, Vec2::splat(self.half_extent()))
    }

    /// Unit vector pointing along the tank's facing.
    #[must_use]
    pub fn heading(&self) -> Vec2 {
        heading_from_angle(self.facing)
    }
}

/// Mutable projectile owned by the match world.
#[derive(Clone, Debug, PartialEq)]
pub struct Bullet {
    /// Identifier allocated when the bullet was fired.
    pub id: BulletId,
    /// Tank that fired the bullet.
    pub owner: TankId,
    /// Center of the bullet in world units.
    pub position: Vec2,
    /// Velocity in world units per second.
    pub velocity: Vec2,
    /// Half extent of the bullet's square hit box.
    pub radius: f32,
    /// Bounces recorded so far. Never exceeds `bounce_limit`.
    pub bounces: u32,
    /// Maximum number of bounces the bullet survives.
    pub bounce_limit: u32,
    /// Time the bullet has been in flight.
    pub age: Duration,
    /// Maximum time the bullet may remain in flight.
    pub lifetime: Duration,
}

impl Bullet {
    /// Bounding box at the bullet's current position.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center(self.position, Vec2::splat(self.radius))
    }
}

/// Converts an angle in radians into a unit direction vector.
#[must_use]
pub fn heading_from_angle(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Tunable parameters of a match.
///
/// Defaults follow the classic arena tuning: 30-unit tanks at 300 units per
/// second, bullets at 600 units per second that survive four bounces, a half
/// second fire cooldown and at most three live bullets per tank.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchRules {
    /// Side length of every tank's bounding box.
    pub tank_size: f32,
    /// Top tank speed in world units per second.
    pub tank_speed: f32,
    /// Bullet speed in world units per second.
    pub bullet_speed: f32,
    /// Half extent of a bullet's hit box.
    pub bullet_radius: f32,
    /// Number of bounces a bullet survives.
    pub bounce_limit: u32,
    /// Maximum time a bullet stays in flight.
    pub bullet_lifetime: Duration,
    /// Delay between consecutive shots of one tank.
    pub fire_cooldown: Duration,
    /// Maximum number of live bullets a tank may own.
    pub max_active_bullets: u32,
    /// Distance from the tank center to the muzzle.
    pub muzzle_offset: f32,
    /// Optional cap on match duration.
    pub time_limit: Option<Duration>,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            tank_size: 30.0,
            tank_speed: 300.0,
            bullet_speed: 600.0,
            bullet_radius: 3.0,
            bounce_limit: 4,
            bullet_lifetime: Duration::from_secs(5),
            fire_cooldown: Duration::from_millis(500),
            max_active_bullets: 3,
            muzzle_offset: 30.0,
            time_limit: None,
        }
    }
}

/// Lifecycle state of a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStatus {
    /// The match is still being played.
    InProgress,
    /// The match ended with a single surviving winner.
    WonBy(TankId),
    /// The match ended without a winner.
    NoWinner,
}

impl MatchStatus {
    /// Reports whether the status is final.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }

    /// Winning tank, if the match was won.
    #[must_use]
    pub const fn winner(&self) -> Option<TankId> {
        match self {
            Self::WonBy(tank) => Some(*tank),
            Self::InProgress | Self::NoWinner => None,
        }
    }
}

/// Immutable representation of a single tank's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct TankSnapshot {
    /// Unique identifier assigned to the tank.
    pub id: TankId,
    /// Team tag.
    pub team: TeamId,
    /// Center of the tank in world units.
    pub position: Vec2,
    /// Facing in radians.
    pub facing: f32,
    /// Side length of the tank's bounding box.
    pub size: f32,
    /// Whether the tank is still in play.
    pub alive: bool,
    /// Advisory path currently assigned to the tank.
    pub path: Option<Path>,
    /// Time remaining before the tank may fire again.
    pub fire_cooldown: Duration,
    /// Combat record.
    pub stats: TankStats,
}

impl From<&Tank> for TankSnapshot {
    fn from(tank: &Tank) -> Self {
        Self {
            id: tank.id,
            team: tank.team,
            position: tank.position,
            facing: tank.facing,
            size: tank.size,
            alive: tank.alive,
            path: tank.path.clone(),
            fire_cooldown: tank.fire_cooldown,
            stats: tank.stats,
        }
    }
}

/// Read-only snapshot describing all tanks in the match.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TankView {
    snapshots: Vec<TankSnapshot>,
}

impl TankView {
    /// Creates a new tank view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<TankSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured tank snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &TankSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot of a specific tank.
    #[must_use]
    pub fn get(&self, tank: TankId) -> Option<&TankSnapshot> {
        self.snapshots
            .binary_search_by_key(&tank, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Number of tanks still alive.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.snapshots.iter().filter(|snapshot| snapshot.alive).count()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<TankSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of a single bullet's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BulletSnapshot {
    /// Unique identifier assigned to the bullet.
    pub id: BulletId,
    /// Tank that fired the bullet.
    pub owner: TankId,
    /// Center of the bullet in world units.
    pub position: Vec2,
    /// Velocity in world units per second.
    pub velocity: Vec2,
    /// Half extent of the bullet's hit box.
    pub radius: f32,
    /// Bounces recorded so far.
    pub bounces: u32,
}

impl From<&Bullet> for BulletSnapshot {
    fn from(bullet: &Bullet) -> Self {
        Self {
            id: bullet.id,
            owner: bullet.owner,
            position: bullet.position,
            velocity: bullet.velocity,
            radius: bullet.radius,
            bounces: bullet.bounces,
        }
    }
}

/// Read-only snapshot describing all bullets in flight.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BulletView {
    snapshots: Vec<BulletSnapshot>,
}

impl BulletView {
    /// Creates a new bullet view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<BulletSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured bullet snapshots in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &BulletSnapshot> {
        self.snapshots.iter()
    }

    /// Number of bullets in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether no bullets are in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
