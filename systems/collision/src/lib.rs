#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Axis-aligned collision resolution between tanks, bullets, and blocking tiles.

use glam::Vec2;
use tank_arena_core::{Aabb, Bullet, Grid, Tank};

/// Moves `tank` by `desired` and returns the corrected centre position.
///
/// The motion is split into sub-steps no longer than half a tile so that a
/// single call can never skip over a blocking tile. A sub-step that collides
/// is retried along the horizontal axis and then the vertical axis, letting the
/// tank slide along walls. A blocked axis advances the tank until it sits flush
/// against the wall. Blocked movement is a regular outcome and never an error.
#[must_use]
pub fn resolve_tank_move(tank: &Tank, desired: Vec2, grid: &Grid) -> Vec2 {
    let mut position = tank.position;
    if !desired.is_finite() || desired == Vec2::ZERO {
        return position;
    }

    let half = tank.half_extent();
    let max_step = grid.tile_length() * 0.5;
    let substeps = (desired.abs().max_element() / max_step).ceil().max(1.0) as u32;
    let step = desired / substeps as f32;

    for _ in 0..substeps {
        let candidate = position + step;
        if !box_blocked(candidate, half, grid) {
            position = candidate;
            continue;
        }

        if step.x != 0.0 {
            position.x = advance_axis(position, Axis::Horizontal, step.x, half, grid);
        }
        if step.y != 0.0 {
            position.y = advance_axis(position, Axis::Vertical, step.y, half, grid);
        }
    }

    position
}

/// Reports whether the bullet's hit box overlaps the tank's bounding box.
#[must_use]
pub fn tank_bullet_hit(tank: &Tank, bullet: &Bullet) -> bool {
    tank.bounds().intersects(&bullet.bounds())
}

/// Reports whether a bullet that travelled from `from` to its current position
/// passed through the tank's bounding box.
///
/// The tank box is grown by the bullet's radius and tested against the swept
/// segment, so a bullet cannot skip over a tank narrower than its step.
#[must_use]
pub fn tank_bullet_sweep(tank: &Tank, bullet: &Bullet, from: Vec2) -> bool {
    let reach = Aabb::from_center(
        tank.position,
        Vec2::splat(tank.half_extent() + bullet.radius),
    );
    tank_bullet_hit(tank, bullet) || reach.intersects_segment(from, bullet.position)
}

/// Reports whether the box shares area with any tile that blocks movement.
///
/// Only the tiles spanned by the box extents are inspected. Area outside the
/// grid counts as blocking.
#[must_use]
pub fn overlaps_blocking(bounds: Aabb, grid: &Grid) -> bool {
    let length = grid.tile_length();
    let first_column = (bounds.min().x / length).floor() as i64;
    let last_column = (bounds.max().x / length).ceil() as i64 - 1;
    let first_row = (bounds.min().y / length).floor() as i64;
    let last_row = (bounds.max().y / length).ceil() as i64 - 1;

    (first_row..=last_row).any(|row| {
        (first_column..=last_column).any(|column| grid.blocks_movement_at(row, column))
    })
}

#[derive(Clone, Copy, Debug)]
enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    fn component(self, point: Vec2) -> f32 {
        match self {
            Self::Horizontal => point.x,
            Self::Vertical => point.y,
        }
    }

    fn with_component(self, point: Vec2, value: f32) -> Vec2 {
        match self {
            Self::Horizontal => Vec2::new(value, point.y),
            Self::Vertical => Vec2::new(point.x, value),
        }
    }
}

/// Advances a single axis by `delta`, stopping flush against the first blocking tile.
fn advance_axis(position: Vec2, axis: Axis, delta: f32, half: f32, grid: &Grid) -> f32 {
    let current = axis.component(position);
    let target = current + delta;
    if !box_blocked(axis.with_component(position, target), half, grid) {
        return target;
    }

    let length = grid.tile_length();
    let flush = if delta > 0.0 {
        let wall = ((target + half) / length).ceil() - 1.0;
        (wall * length - half).max(current)
    } else {
        let wall = ((target - half) / length).floor();
        ((wall + 1.0) * length + half).min(current)
    };

    if box_blocked(axis.with_component(position, flush), half, grid) {
        current
    } else {
        flush
    }
}

fn box_blocked(center: Vec2, half: f32, grid: &Grid) -> bool {
    overlaps_blocking(Aabb::from_center(center, Vec2::splat(half)), grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tank_arena_core::{BulletId, GridConfig, TankId, TeamId, TileKind};

    fn grid_with_obstacles(obstacles: &[(u32, u32)]) -> Grid {
        let config = GridConfig::new(10, 10, 32.0);
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

    fn tank_at(position: Vec2) -> Tank {
        Tank::new(TankId::new(0), TeamId::new(0), position, 0.0, 16.0)
    }

    #[test]
    fn open_floor_applies_the_full_delta() {
        let grid = grid_with_obstacles(&[]);
        let tank = tank_at(Vec2::new(80.0, 80.0));
        assert_eq!(
            resolve_tank_move(&tank, Vec2::new(32.0, -16.0), &grid),
            Vec2::new(112.0, 64.0)
        );
    }

    #[test]
    fn blocked_move_stops_flush_against_the_wall() {
        let grid = grid_with_obstacles(&[(2, 5)]);
        let tank = tank_at(Vec2::new(80.0, 80.0));
        let resolved = resolve_tank_move(&tank, Vec2::new(100.0, 0.0), &grid);
        assert_eq!(resolved, Vec2::new(152.0, 80.0));
    }

    #[test]
    fn diagonal_contact_slides_along_the_wall() {
        let grid = grid_with_obstacles(&[(2, 3)]);
        let tank = tank_at(Vec2::new(80.0, 80.0));
        let resolved = resolve_tank_move(&tank, Vec2::new(20.0, 20.0), &grid);
        assert_eq!(resolved, Vec2::new(88.0, 100.0));
    }

    #[test]
    fn border_stops_movement_toward_the_edge() {
        let grid = grid_with_obstacles(&[]);
        let tank = tank_at(Vec2::new(48.0, 48.0));
        let resolved = resolve_tank_move(&tank, Vec2::new(-30.0, -30.0), &grid);
        assert_eq!(resolved, Vec2::new(40.0, 40.0));
    }

    #[test]
    fn single_tile_obstacle_cannot_be_tunnelled() {
        let grid = grid_with_obstacles(&[(2, 4)]);
        let tank = tank_at(Vec2::new(80.0, 80.0));
        let resolved = resolve_tank_move(&tank, Vec2::new(150.0, 0.0), &grid);
        assert!(resolved.x <= 120.0, "tank passed the obstacle: {resolved}");
    }

    #[test]
    fn non_finite_delta_is_ignored() {
        let grid = grid_with_obstacles(&[]);
        let tank = tank_at(Vec2::new(80.0, 80.0));
        assert_eq!(
            resolve_tank_move(&tank, Vec2::new(f32::NAN, 1.0), &grid),
            tank.position
        );
    }

    #[test]
    fn touching_edges_do_not_count_as_overlap() {
        let grid = grid_with_obstacles(&[]);
        let touching = Aabb::new(Vec2::new(32.0, 32.0), Vec2::new(64.0, 64.0));
        assert!(!overlaps_blocking(touching, &grid));
        let into_border = Aabb::new(Vec2::new(31.0, 32.0), Vec2::new(64.0, 64.0));
        assert!(overlaps_blocking(into_border, &grid));
    }

    #[test]
    fn bullet_hit_uses_box_overlap() {
        let tank = tank_at(Vec2::new(80.0, 80.0));
        let mut bullet = Bullet {
            id: BulletId::new(0),
            owner: TankId::new(1),
            position: Vec2::new(89.0, 80.0),
            velocity: Vec2::ZERO,
            radius: 2.0,
            bounces: 0,
            bounce_limit: 4,
            age: Duration::ZERO,
            lifetime: Duration::from_secs(5),
        };
        assert!(tank_bullet_hit(&tank, &bullet));
        bullet.position.x = 90.0;
        assert!(!tank_bullet_hit(&tank, &bullet));
    }

    #[test]
    fn bullet_sweep_catches_tanks_between_samples() {
        let tank = tank_at(Vec2::new(80.0, 80.0));
        let mut bullet = Bullet {
            id: BulletId::new(0),
            owner: TankId::new(1),
            position: Vec2::new(120.0, 80.0),
            velocity: Vec2::ZERO,
            radius: 2.0,
            bounces: 0,
            bounce_limit: 4,
            age: Duration::ZERO,
            lifetime: Duration::from_secs(5),
        };
        assert!(!tank_bullet_hit(&tank, &bullet));
        assert!(tank_bullet_sweep(&tank, &bullet, Vec2::new(40.0, 80.0)));
        assert!(!tank_bullet_sweep(&tank, &bullet, Vec2::new(100.0, 80.0)));

        bullet.position = Vec2::new(120.0, 90.0);
        assert!(!tank_bullet_sweep(&tank, &bullet, Vec2::new(40.0, 90.0)));
    }
}
