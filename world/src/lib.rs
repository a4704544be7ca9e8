#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative match state and the tick that drives it.
//!
//! The [`World`] owns the grid, the tanks, and the bullets of a single match.
//! Adapters and systems never touch it directly: they submit [`Command`]
//! values through [`apply`] and observe the resulting [`Event`] stream and the
//! read-only [`query`] functions.

use std::{collections::BTreeMap, time::Duration};

use glam::Vec2;
use log::{debug, info, trace};
use tank_arena_core::{
    Aabb, Bullet, BulletId, Command, Event, Grid, MatchRules, MatchStatus, Tank, TankId, TankInput,
    TeamId, TileCoord,
};
use tank_arena_system_ballistics::{step as step_bullet, BulletOutcome};
use tank_arena_system_collision::{overlaps_blocking, resolve_tank_move};
use thiserror::Error;

/// Placement of a tank at match start.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TankSpawn {
    /// Identifier of the tank.
    pub id: TankId,
    /// Team tag of the tank.
    pub team: TeamId,
    /// Tile whose centre the tank starts on.
    pub tile: TileCoord,
    /// Initial facing in radians.
    pub facing: f32,
}

impl TankSpawn {
    /// Creates a spawn description.
    #[must_use]
    pub const fn new(id: TankId, team: TeamId, tile: TileCoord, facing: f32) -> Self {
        Self {
            id,
            team,
            tile,
            facing,
        }
    }
}

/// Failures that prevent a match from starting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SetupError {
    /// A match needs at least two tanks.
    #[error("a match needs at least two tanks, got {count}")]
    NotEnoughTanks {
        /// Number of spawns supplied.
        count: usize,
    },
    /// Two spawns share an identifier.
    #[error("tank {tank} is spawned more than once")]
    DuplicateTank {
        /// Repeated identifier.
        tank: TankId,
    },
    /// A spawn tile lies outside the grid.
    #[error("tank {tank} spawns outside the grid at {tile}")]
    SpawnOutOfBounds {
        /// Tank being placed.
        tank: TankId,
        /// Requested tile.
        tile: TileCoord,
    },
    /// The tank's bounding box would overlap a blocking tile.
    #[error("tank {tank} cannot fit at {tile}")]
    SpawnBlocked {
        /// Tank being placed.
        tank: TankId,
        /// Requested tile.
        tile: TileCoord,
    },
}

/// Represents the authoritative state of one tank match.
#[derive(Debug)]
pub struct World {
    grid: Grid,
    rules: MatchRules,
    tanks: Vec<Tank>,
    bullets: Vec<Bullet>,
    pending_inputs: BTreeMap<TankId, TankInput>,
    next_bullet: u32,
    elapsed: Duration,
    tick_index: u64,
    status: MatchStatus,
}

impl World {
    /// Creates a match on `grid` with tanks placed at the centres of their spawn tiles.
    pub fn new(grid: Grid, rules: MatchRules, spawns: &[TankSpawn]) -> Result<Self, SetupError> {
        if spawns.len() < 2 {
            return Err(SetupError::NotEnoughTanks {
                count: spawns.len(),
            });
        }

        let mut tanks: Vec<Tank> = Vec::with_capacity(spawns.len());
        for spawn in spawns {
            if tanks.iter().any(|tank| tank.id == spawn.id) {
                return Err(SetupError::DuplicateTank { tank: spawn.id });
            }
            if !grid.contains(spawn.tile) {
                return Err(SetupError::SpawnOutOfBounds {
                    tank: spawn.id,
                    tile: spawn.tile,
                });
            }

            let position = grid.tile_to_world_center(spawn.tile);
            let bounds = Aabb::from_center(position, Vec2::splat(rules.tank_size * 0.5));
            if overlaps_blocking(bounds, &grid) {
                return Err(SetupError::SpawnBlocked {
                    tank: spawn.id,
                    tile: spawn.tile,
                });
            }

            tanks.push(Tank::new(
                spawn.id,
                spawn.team,
                position,
                spawn.facing,
                rules.tank_size,
            ));
        }
        tanks.sort_by_key(|tank| tank.id);

        debug!(
            "match created on a {}x{} grid with {} tanks",
            grid.columns(),
            grid.rows(),
            tanks.len()
        );

        Ok(Self {
            grid,
            rules,
            tanks,
            bullets: Vec::new(),
            pending_inputs: BTreeMap::new(),
            next_bullet: 0,
            elapsed: Duration::ZERO,
            tick_index: 0,
            status: MatchStatus::InProgress,
        })
    }

    fn tank_mut(&mut self, id: TankId) -> Option<&mut Tank> {
        self.tanks
            .binary_search_by_key(&id, |tank| tank.id)
            .ok()
            .and_then(|index| self.tanks.get_mut(index))
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.status.is_terminal() {
            return;
        }

        self.tick_index = self.tick_index.saturating_add(1);
        self.elapsed = self.elapsed.saturating_add(dt);
        out_events.push(Event::TimeAdvanced { dt });

        let inputs = std::mem::take(&mut self.pending_inputs);
        for index in 0..self.tanks.len() {
            if !self.tanks[index].alive {
                continue;
            }
            let input = inputs
                .get(&self.tanks[index].id)
                .copied()
                .unwrap_or_default();
            self.drive_tank(index, input, dt, out_events);
            if input.fire {
                self.fire(index, out_events);
            }
        }

        let eliminations = self.advance_bullets(dt, out_events);
        self.evaluate_status(eliminations);

        if self.status.is_terminal() {
            info!(
                "match concluded after {} ticks ({:?}): {:?}",
                self.tick_index, self.elapsed, self.status
            );
            out_events.push(Event::MatchConcluded {
                status: self.status,
            });
        }
    }

    fn drive_tank(&mut self, index: usize, input: TankInput, dt: Duration, out: &mut Vec<Event>) {
        let speed = self.rules.tank_speed;
        let tank = &mut self.tanks[index];
        tank.fire_cooldown = tank.fire_cooldown.saturating_sub(dt);

        let throttle = if input.throttle.is_finite() {
            input.throttle.clamp_length_max(1.0)
        } else {
            Vec2::ZERO
        };
        if let Some(facing) = input.facing.filter(|facing| facing.is_finite()) {
            tank.facing = facing;
        } else if throttle != Vec2::ZERO {
            tank.facing = throttle.y.atan2(throttle.x);
        }

        let desired = throttle * speed * dt.as_secs_f32();
        let from = tank.position;
        let to = resolve_tank_move(tank, desired, &self.grid);
        if to != from {
            tank.position = to;
            out.push(Event::TankMoved {
                tank: tank.id,
                from,
                to,
            });
        }
    }

    fn fire(&mut self, index: usize, out: &mut Vec<Event>) {
        let tank = &self.tanks[index];
        if !tank.fire_cooldown.is_zero() {
            trace!("tank {} shot suppressed by cooldown", tank.id.get());
            return;
        }
        let live = self
            .bullets
            .iter()
            .filter(|bullet| bullet.owner == tank.id)
            .count();
        if live >= self.rules.max_active_bullets as usize {
            trace!("tank {} already has {live} bullets in flight", tank.id.get());
            return;
        }

        let heading = tank.heading();
        let muzzle = tank.position + heading * self.rules.muzzle_offset;
        let muzzle_open = self
            .grid
            .world_to_tile(muzzle)
            .map_or(false, |tile| !self.grid.blocks_movement(tile));
        if !muzzle_open {
            trace!("tank {} muzzle is obstructed", tank.id.get());
            return;
        }

        let id = BulletId::new(self.next_bullet);
        self.next_bullet = self.next_bullet.wrapping_add(1);
        let owner = tank.id;
        self.bullets.push(Bullet {
            id,
            owner,
            position: muzzle,
            velocity: heading * self.rules.bullet_speed,
            radius: self.rules.bullet_radius,
            bounces: 0,
            bounce_limit: self.rules.bounce_limit,
            age: Duration::ZERO,
            lifetime: self.rules.bullet_lifetime,
        });
        self.tanks[index].fire_cooldown = self.rules.fire_cooldown;
        out.push(Event::BulletFired {
            bullet: id,
            owner,
            position: muzzle,
        });
    }

    /// Steps every bullet and applies the tick's hits together. Returns the
    /// number of tanks destroyed.
    fn advance_bullets(&mut self, dt: Duration, out: &mut Vec<Event>) -> usize {
        let mut hits = Vec::new();
        let grid = &self.grid;
        let tanks = &self.tanks;

        self.bullets.retain_mut(|bullet| {
            match step_bullet(bullet, dt, grid, tanks) {
                BulletOutcome::Continuing => true,
                BulletOutcome::Bounced => {
                    out.push(Event::BulletBounced {
                        bullet: bullet.id,
                        position: bullet.position,
                        bounces: bullet.bounces,
                    });
                    true
                }
                BulletOutcome::Expired => {
                    out.push(Event::BulletExpired { bullet: bullet.id });
                    false
                }
                BulletOutcome::HitTank(tank) => {
                    hits.push((tank, bullet.id, bullet.owner));
                    false
                }
            }
        });

        let mut eliminations = 0;
        for (victim, bullet, shooter) in hits {
            let Some(tank) = self.tank_mut(victim) else {
                continue;
            };
            if !tank.alive {
                continue;
            }
            let self_inflicted = victim == shooter;
            tank.alive = false;
            tank.path = None;
            tank.stats.deaths += 1;
            if self_inflicted {
                tank.stats.suicides += 1;
            } else if let Some(shooter) = self.tank_mut(shooter) {
                shooter.stats.kills += 1;
            }
            eliminations += 1;
            debug!(
                "tank {} destroyed by bullet {} of tank {}",
                victim.get(),
                bullet.get(),
                shooter.get()
            );
            out.push(Event::TankDestroyed {
                tank: victim,
                bullet,
                by: shooter,
                self_inflicted,
            });
        }
        eliminations
    }

    fn evaluate_status(&mut self, eliminations: usize) {
        if eliminations > 0 {
            let mut alive = self.tanks.iter().filter(|tank| tank.alive);
            self.status = match (alive.next(), alive.next()) {
                (Some(survivor), None) => MatchStatus::WonBy(survivor.id),
                (None, _) => MatchStatus::NoWinner,
                (Some(_), Some(_)) => MatchStatus::InProgress,
            };
        }

        if self.status.is_terminal() {
            return;
        }
        if let Some(limit) = self.rules.time_limit {
            if self.elapsed >= limit {
                self.status = self.time_limit_outcome();
            }
        }
    }

    /// The alive tank with strictly the most kills wins when time runs out.
    fn time_limit_outcome(&self) -> MatchStatus {
        let alive = || self.tanks.iter().filter(|tank| tank.alive);
        let Some(best) = alive().map(|tank| tank.stats.kills).max() else {
            return MatchStatus::NoWinner;
        };
        if best == 0 {
            return MatchStatus::NoWinner;
        }
        let mut leaders = alive().filter(|tank| tank.stats.kills == best);
        match (leaders.next(), leaders.next()) {
            (Some(leader), None) => MatchStatus::WonBy(leader.id),
            _ => MatchStatus::NoWinner,
        }
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::SubmitInput { tank, input } => {
            if world.status.is_terminal() {
                return;
            }
            if world
                .tanks
                .binary_search_by_key(&tank, |candidate| candidate.id)
                .is_ok()
            {
                let _ = world.pending_inputs.insert(tank, input);
            }
        }
        Command::AssignPath { tank, path } => {
            if let Some(target) = world.tank_mut(tank) {
                if target.alive {
                    target.path = path.filter(|path| !path.is_empty());
                }
            }
        }
        Command::Tick { dt } => world.tick(dt, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use super::World;
    use tank_arena_core::{
        BulletSnapshot, BulletView, Grid, MatchRules, MatchStatus, Path, TankId, TankSnapshot,
        TankView,
    };

    /// Provides read-only access to the arena grid.
    #[must_use]
    pub fn grid(world: &World) -> &Grid {
        &world.grid
    }

    /// Rules the match was created with.
    #[must_use]
    pub fn rules(world: &World) -> &MatchRules {
        &world.rules
    }

    /// Current lifecycle state of the match.
    #[must_use]
    pub fn status(world: &World) -> MatchStatus {
        world.status
    }

    /// Simulated time elapsed since the match started.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Captures a read-only view of every tank, dead or alive.
    #[must_use]
    pub fn tank_view(world: &World) -> TankView {
        TankView::from_snapshots(world.tanks.iter().map(TankSnapshot::from).collect())
    }

    /// Captures a read-only view of the bullets in flight.
    #[must_use]
    pub fn bullet_view(world: &World) -> BulletView {
        BulletView::from_snapshots(world.bullets.iter().map(BulletSnapshot::from).collect())
    }

    /// Path currently assigned to the tank, if any.
    #[must_use]
    pub fn tank_path(world: &World, tank: TankId) -> Option<&Path> {
        world
            .tanks
            .iter()
            .find(|candidate| candidate.id == tank)
            .and_then(|candidate| candidate.path.as_ref())
    }

    /// Complete per-tick picture of the match for renderers and tooling.
    #[must_use]
    pub fn snapshot(world: &World) -> WorldSnapshot<'_> {
        WorldSnapshot {
            grid: &world.grid,
            tanks: tank_view(world),
            bullets: bullet_view(world),
            status: world.status,
            elapsed: world.elapsed,
        }
    }

    /// Consistent view of the match between two ticks.
    #[derive(Clone, Debug)]
    pub struct WorldSnapshot<'a> {
        /// Arena grid, immutable for the whole match.
        pub grid: &'a Grid,
        /// Tanks in identifier order.
        pub tanks: TankView,
        /// Bullets in identifier order.
        pub bullets: BulletView,
        /// Match lifecycle state.
        pub status: MatchStatus,
        /// Simulated time elapsed.
        pub elapsed: Duration,
    }
}
