#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bullet flight: integration, wall reflection, expiry, and tank hits.
//!
//! Bullets collide with tiles as points and with tanks as small boxes. The
//! displacement of a tick is split into sub-steps of at most half a tile, so a
//! sub-step crosses at most one column boundary and one row boundary. The first
//! blocking boundary reflects the velocity and ends the bullet's motion for the
//! tick.

use std::time::Duration;

use glam::Vec2;
use log::trace;
use tank_arena_core::{Bullet, Grid, Tank, TankId};
use tank_arena_system_collision::tank_bullet_sweep;

/// Tolerance on the crossing parameter for treating two crossings as one corner hit.
const CORNER_EPSILON: f32 = 1e-6;

/// Fraction of a tile a reflected bullet is kept away from the wall it struck.
const WALL_INSET: f32 = 1e-3;

/// Result of advancing a bullet by one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BulletOutcome {
    /// The bullet is still in flight and touched nothing.
    Continuing,
    /// The bullet reflected off a blocking tile and remains in flight.
    Bounced,
    /// The bullet struck a live tank, possibly its own owner, and is spent.
    HitTank(TankId),
    /// The bullet ran out of bounces or lifetime and is spent.
    Expired,
}

/// Advances `bullet` by `dt`, resolving at most one wall reflection.
///
/// Each sub-step's travel is swept against every live tank, including the
/// bullet's owner. When one sub-step passes through several tanks, the one
/// with the lowest identifier is reported. A reflection that would exceed the bounce limit
/// expires the bullet without counting the bounce.
pub fn step(bullet: &mut Bullet, dt: Duration, grid: &Grid, tanks: &[Tank]) -> BulletOutcome {
    bullet.age = bullet.age.saturating_add(dt);
    if bullet.age > bullet.lifetime {
        trace!("bullet {} expired after {:?}", bullet.id.get(), bullet.age);
        return BulletOutcome::Expired;
    }

    let displacement = bullet.velocity * dt.as_secs_f32();
    if !displacement.is_finite() {
        return BulletOutcome::Expired;
    }

    let max_step = grid.tile_length() * 0.5;
    let substeps = (displacement.abs().max_element() / max_step)
        .ceil()
        .max(1.0) as u32;
    let step = displacement / substeps as f32;

    let mut bounced = false;
    for _ in 0..substeps {
        let from = bullet.position;
        match advance(from, step, grid) {
            Travel::Clear(next) => bullet.position = next,
            Travel::Wall {
                position,
                reflection,
            } => {
                bullet.position = position;
                if bullet.bounces >= bullet.bounce_limit {
                    trace!(
                        "bullet {} exhausted {} bounces",
                        bullet.id.get(),
                        bullet.bounce_limit
                    );
                    return BulletOutcome::Expired;
                }
                bullet.velocity = reflection.apply(bullet.velocity);
                bullet.bounces += 1;
                bounced = true;
            }
        }

        if let Some(tank) = first_hit(bullet, from, tanks) {
            return BulletOutcome::HitTank(tank);
        }
        if bounced {
            break;
        }
    }

    if bounced {
        BulletOutcome::Bounced
    } else {
        BulletOutcome::Continuing
    }
}

fn first_hit(bullet: &Bullet, from: Vec2, tanks: &[Tank]) -> Option<TankId> {
    tanks
        .iter()
        .filter(|tank| tank.alive && tank_bullet_sweep(tank, bullet, from))
        .map(|tank| tank.id)
        .min()
}

/// Velocity mirror applied when a bullet strikes a wall.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Reflection {
    /// A vertical wall face: the horizontal component flips.
    Vertical,
    /// A horizontal wall face: the vertical component flips.
    Horizontal,
    /// A corner: both components flip.
    Corner,
}

impl Reflection {
    fn apply(self, velocity: Vec2) -> Vec2 {
        match self {
            Self::Vertical => Vec2::new(-velocity.x, velocity.y),
            Self::Horizontal => Vec2::new(velocity.x, -velocity.y),
            Self::Corner => -velocity,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Travel {
    Clear(Vec2),
    Wall { position: Vec2, reflection: Reflection },
}

/// Moves a point by `step`, which must not exceed half a tile along either axis.
fn advance(from: Vec2, step: Vec2, grid: &Grid) -> Travel {
    let to = from + step;
    let length = grid.tile_length();

    let column = grid.axis_index(from.x);
    let row = grid.axis_index(from.y);
    let next_column = grid.axis_index(to.x);
    let next_row = grid.axis_index(to.y);

    let crosses_x = next_column != column;
    let crosses_y = next_row != row;
    if !crosses_x && !crosses_y {
        return Travel::Clear(to);
    }

    let walls = Vec2::new(
        boundary(column, step.x, length),
        boundary(row, step.y, length),
    );
    let tx = if crosses_x {
        (walls.x - from.x) / step.x
    } else {
        f32::INFINITY
    };
    let ty = if crosses_y {
        (walls.y - from.y) / step.y
    } else {
        f32::INFINITY
    };

    let side_x = crosses_x && grid.blocks_movement_at(row, next_column);
    let side_y = crosses_y && grid.blocks_movement_at(next_row, column);
    let diagonal = crosses_x && crosses_y && grid.blocks_movement_at(next_row, next_column);

    let wall = |t: f32, reflection: Reflection| {
        let mut position = from + step * t;
        let inset = length * WALL_INSET;
        if matches!(reflection, Reflection::Vertical | Reflection::Corner) {
            position.x = walls.x - step.x.signum() * inset;
        }
        if matches!(reflection, Reflection::Horizontal | Reflection::Corner) {
            position.y = walls.y - step.y.signum() * inset;
        }
        Travel::Wall {
            position,
            reflection,
        }
    };

    if crosses_x && crosses_y && (tx - ty).abs() <= CORNER_EPSILON {
        let reflection = match (side_x, side_y) {
            (true, false) => Some(Reflection::Vertical),
            (false, true) => Some(Reflection::Horizontal),
            (true, true) => Some(Reflection::Corner),
            (false, false) => diagonal.then_some(Reflection::Corner),
        };
        return match reflection {
            Some(reflection) => wall(tx.min(ty), reflection),
            None => Travel::Clear(to),
        };
    }

    if tx < ty {
        if side_x {
            return wall(tx, Reflection::Vertical);
        }
        if diagonal {
            return wall(ty, Reflection::Horizontal);
        }
    } else {
        if side_y {
            return wall(ty, Reflection::Horizontal);
        }
        if diagonal {
            return wall(tx, Reflection::Vertical);
        }
    }
    Travel::Clear(to)
}

fn boundary(cell: i64, delta: f32, length: f32) -> f32 {
    if delta > 0.0 {
        (cell + 1) as f32 * length
    } else {
        cell as f32 * length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tank_arena_core::{BulletId, GridConfig, TeamId, TileKind};

    const TENTH: Duration = Duration::from_millis(100);

    fn grid(columns: u32, rows: u32, obstacles: &[(u32, u32)]) -> Grid {
        let config = GridConfig::new(columns, rows, 32.0);
        let kinds = Grid::bordered(config)
            .expect("valid grid")
            .tiles()
            .iter()
            .map(|tile| {
                let coord = tile.coord();
                if obstacles.contains(&(coord.row(), coord.column())) {
                    TileKind::Obstacle
                } else {
                    tile.kind()
                }
            })
            .collect();
        Grid::from_kinds(config, kinds).expect("valid layout")
    }

    fn bullet(position: Vec2, velocity: Vec2) -> Bullet {
        Bullet {
            id: BulletId::new(0),
            owner: TankId::new(0),
            position,
            velocity,
            radius: 2.0,
            bounces: 0,
            bounce_limit: 4,
            age: Duration::ZERO,
            lifetime: Duration::from_secs(5),
        }
    }

    fn tank(id: u32, position: Vec2) -> Tank {
        Tank::new(TankId::new(id), TeamId::new(id), position, 0.0, 16.0)
    }

    #[test]
    fn open_flight_integrates_velocity() {
        let grid = grid(8, 5, &[]);
        let mut shot = bullet(Vec2::new(80.0, 80.0), Vec2::new(100.0, -50.0));
        assert_eq!(step(&mut shot, TENTH, &grid, &[]), BulletOutcome::Continuing);
        assert!((shot.position - Vec2::new(90.0, 75.0)).length() < 1e-4);
        assert_eq!(shot.age, TENTH);
    }

    #[test]
    fn vertical_wall_flips_only_horizontal_velocity() {
        let grid = grid(8, 5, &[]);
        let mut shot = bullet(Vec2::new(216.0, 80.0), Vec2::new(320.0, 40.0));
        assert_eq!(step(&mut shot, TENTH, &grid, &[]), BulletOutcome::Bounced);
        assert_eq!(shot.velocity, Vec2::new(-320.0, 40.0));
        assert_eq!(shot.bounces, 1);
        assert!(shot.position.x < 224.0 && shot.position.x > 223.0);
        assert!((shot.position.y - 81.0).abs() < 1e-3);
    }

    #[test]
    fn horizontal_wall_flips_only_vertical_velocity() {
        let grid = grid(8, 5, &[]);
        let mut shot = bullet(Vec2::new(80.0, 112.0), Vec2::new(40.0, 320.0));
        assert_eq!(step(&mut shot, TENTH, &grid, &[]), BulletOutcome::Bounced);
        assert_eq!(shot.velocity, Vec2::new(40.0, -320.0));
        assert!(shot.position.y < 128.0 && shot.position.y > 127.0);
    }

    #[test]
    fn exact_corner_of_lone_obstacle_flips_both_components() {
        let grid = grid(8, 8, &[(3, 3)]);
        let mut shot = bullet(Vec2::new(88.0, 88.0), Vec2::new(80.0, 80.0));
        assert_eq!(step(&mut shot, TENTH, &grid, &[]), BulletOutcome::Bounced);
        assert_eq!(shot.velocity, Vec2::new(-80.0, -80.0));
        assert!(shot.position.x < 96.0 && shot.position.y < 96.0);
    }

    #[test]
    fn corner_grazing_past_open_tiles_keeps_flying() {
        let grid = grid(8, 8, &[]);
        let mut shot = bullet(Vec2::new(88.0, 88.0), Vec2::new(80.0, 80.0));
        assert_eq!(step(&mut shot, TENTH, &grid, &[]), BulletOutcome::Continuing);
        assert_eq!(shot.velocity, Vec2::new(80.0, 80.0));
    }

    #[test]
    fn bounce_beyond_limit_expires_without_counting() {
        let grid = grid(8, 5, &[]);
        let mut shot = bullet(Vec2::new(216.0, 80.0), Vec2::new(320.0, 0.0));
        shot.bounces = shot.bounce_limit;
        assert_eq!(step(&mut shot, TENTH, &grid, &[]), BulletOutcome::Expired);
        assert_eq!(shot.bounces, shot.bounce_limit);
    }

    #[test]
    fn lifetime_expiry_precedes_movement() {
        let grid = grid(8, 5, &[]);
        let mut shot = bullet(Vec2::new(80.0, 80.0), Vec2::new(100.0, 0.0));
        shot.age = Duration::from_millis(4_950);
        assert_eq!(step(&mut shot, TENTH, &grid, &[]), BulletOutcome::Expired);
        assert_eq!(shot.position, Vec2::new(80.0, 80.0));
    }

    #[test]
    fn owner_is_not_immune_to_its_bullet() {
        let grid = grid(8, 5, &[]);
        let owner = tank(0, Vec2::new(98.0, 80.0));
        let mut shot = bullet(Vec2::new(80.0, 80.0), Vec2::new(100.0, 0.0));
        assert_eq!(
            step(&mut shot, TENTH, &grid, &[owner]),
            BulletOutcome::HitTank(TankId::new(0))
        );
    }

    #[test]
    fn overlapping_tanks_resolve_to_lowest_identifier() {
        let grid = grid(8, 5, &[]);
        let tanks = [
            tank(5, Vec2::new(92.0, 80.0)),
            tank(2, Vec2::new(94.0, 80.0)),
            tank(9, Vec2::new(90.0, 80.0)),
        ];
        let mut shot = bullet(Vec2::new(80.0, 80.0), Vec2::new(100.0, 0.0));
        assert_eq!(
            step(&mut shot, TENTH, &grid, &tanks),
            BulletOutcome::HitTank(TankId::new(2))
        );
    }

    #[test]
    fn dead_tanks_do_not_absorb_bullets() {
        let grid = grid(8, 5, &[]);
        let mut wreck = tank(1, Vec2::new(90.0, 80.0));
        wreck.alive = false;
        let mut shot = bullet(Vec2::new(80.0, 80.0), Vec2::new(100.0, 0.0));
        assert_eq!(
            step(&mut shot, TENTH, &grid, &[wreck]),
            BulletOutcome::Continuing
        );
    }

    #[test]
    fn fast_bullets_hit_tanks_they_pass_through() {
        let grid = grid(12, 5, &[]);
        let target = tank(3, Vec2::new(150.0, 80.0));
        let mut shot = bullet(Vec2::new(60.0, 80.0), Vec2::new(2_000.0, 0.0));
        assert_eq!(
            step(&mut shot, TENTH, &grid, &[target]),
            BulletOutcome::HitTank(TankId::new(3))
        );
    }

    #[test]
    fn small_tanks_cannot_be_skipped_by_fast_bullets() {
        let grid = grid(16, 5, &[]);
        let scout = Tank::new(
            TankId::new(4),
            TeamId::new(4),
            Vec2::new(300.0, 80.0),
            0.0,
            4.0,
        );
        let mut shot = bullet(Vec2::new(100.0, 80.0), Vec2::new(1_400.0, 0.0));
        assert_eq!(
            step(&mut shot, Duration::from_millis(250), &grid, &[scout]),
            BulletOutcome::HitTank(TankId::new(4))
        );
    }

}
