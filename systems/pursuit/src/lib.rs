#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that drives computer-controlled tanks toward their opponents.
//!
//! Each controlled tank hunts the nearest live opponent. With a clear line of
//! sight inside the engage range it turns toward the target and fires;
//! otherwise it follows an A* path toward the target's tile, re-planning on a
//! fixed tick interval or whenever its path runs out. Tanks react in identifier
//! order: each holds its first shot for `reaction_ticks` per tank ahead of it.

use std::collections::BTreeMap;

use glam::Vec2;
use log::trace;
use tank_arena_core::{Command, Event, Grid, Path, TankId, TankInput, TankSnapshot, TankView};
use tank_arena_system_line_of_sight::has_line_of_sight;
use tank_arena_system_pathfinding::{PathOutcome, Pathfinder};

/// Tuning of the pursuit behaviour.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PursuitConfig {
    /// Maximum distance at which a visible target is engaged.
    pub engage_range: f32,
    /// Ticks between path re-plans while a path is still being followed.
    pub repath_interval: u32,
    /// Distance at which a waypoint counts as reached.
    pub arrival_radius: f32,
    /// Ticks of sighting added to the first-shot delay per controlled tank rank.
    pub reaction_ticks: u32,
}

impl Default for PursuitConfig {
    fn default() -> Self {
        Self {
            engage_range: 600.0,
            repath_interval: 30,
            arrival_radius: 6.0,
            reaction_ticks: 6,
        }
    }
}

/// Emits per-tick inputs and advisory paths for the tanks it controls.
#[derive(Debug)]
pub struct Pursuit {
    config: PursuitConfig,
    controlled: Vec<TankId>,
    ticks_since_plan: BTreeMap<TankId, u32>,
    ticks_in_sight: BTreeMap<TankId, u32>,
    pathfinder: Pathfinder,
    finished: bool,
}

impl Pursuit {
    /// Creates a controller for the given tanks.
    #[must_use]
    pub fn new(config: PursuitConfig, mut controlled: Vec<TankId>) -> Self {
        controlled.sort();
        controlled.dedup();
        Self {
            config,
            controlled,
            ticks_since_plan: BTreeMap::new(),
            ticks_in_sight: BTreeMap::new(),
            pathfinder: Pathfinder::new(),
            finished: false,
        }
    }

    /// Consumes the previous tick's events and emits commands for the next tick.
    pub fn handle(
        &mut self,
        events: &[Event],
        tanks: &TankView,
        grid: &Grid,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::TankDestroyed { tank, .. } => {
                    let _ = self.ticks_since_plan.remove(tank);
                    let _ = self.ticks_in_sight.remove(tank);
                }
                Event::MatchConcluded { .. } => self.finished = true,
                _ => {}
            }
        }
        if self.finished {
            return;
        }

        for index in 0..self.controlled.len() {
            let id = self.controlled[index];
            let Some(tank) = tanks.get(id).filter(|tank| tank.alive) else {
                continue;
            };
            let Some(target) = nearest_opponent(tank, tanks) else {
                continue;
            };
            let delay = self.config.reaction_ticks.saturating_mul(index as u32);
            self.steer(tank, target, delay, grid, out);
        }
    }

    fn steer(
        &mut self,
        tank: &TankSnapshot,
        target: &TankSnapshot,
        delay: u32,
        grid: &Grid,
        out: &mut Vec<Command>,
    ) {
        let offset = target.position - tank.position;
        if offset.length() <= self.config.engage_range
            && has_line_of_sight(tank.position, target.position, grid)
        {
            let seen = self.ticks_in_sight.entry(tank.id).or_insert(0);
            *seen = seen.saturating_add(1);
            out.push(Command::SubmitInput {
                tank: tank.id,
                input: TankInput {
                    throttle: Vec2::ZERO,
                    facing: Some(offset.y.atan2(offset.x)),
                    fire: *seen > delay,
                },
            });
            return;
        }
        let _ = self.ticks_in_sight.remove(&tank.id);

        let Some(path) = self.current_path(tank, target, grid, out) else {
            trace!("tank {} has no route to tank {}", tank.id, target.id);
            return;
        };

        let heading = path
            .start()
            .map(|waypoint| grid.tile_to_world_center(waypoint) - tank.position)
            .unwrap_or(offset);
        out.push(Command::SubmitInput {
            tank: tank.id,
            input: TankInput {
                throttle: heading.normalize_or_zero(),
                facing: None,
                fire: false,
            },
        });
    }

    /// Returns the remaining waypoints, re-planning or trimming reached ones.
    /// Emits an `AssignPath` command whenever the stored path changes.
    fn current_path(
        &mut self,
        tank: &TankSnapshot,
        target: &TankSnapshot,
        grid: &Grid,
        out: &mut Vec<Command>,
    ) -> Option<Path> {
        let ticks = self.ticks_since_plan.entry(tank.id).or_insert(0);
        let stale = *ticks >= self.config.repath_interval;
        *ticks = ticks.saturating_add(1);

        let (mut path, mut changed) = match tank.path.clone() {
            Some(path) if !stale && !path.is_empty() => (path, false),
            _ => {
                let _ = self.ticks_since_plan.insert(tank.id, 1);
                let from = grid.world_to_tile(tank.position).ok()?;
                let to = grid.world_to_tile(target.position).ok()?;
                match self.pathfinder.find_path(grid, from, to) {
                    PathOutcome::Found(path) => (path, true),
                    PathOutcome::NotFound => {
                        if tank.path.is_some() {
                            out.push(Command::AssignPath {
                                tank: tank.id,
                                path: None,
                            });
                        }
                        return None;
                    }
                }
            }
        };

        let reached = path
            .waypoints()
            .iter()
            .take_while(|waypoint| {
                grid.tile_to_world_center(**waypoint)
                    .distance(tank.position)
                    <= self.config.arrival_radius
            })
            .count();
        if reached > 0 {
            path = path.skip(reached);
            changed = true;
        }

        if changed {
            out.push(Command::AssignPath {
                tank: tank.id,
                path: Some(path.clone()),
            });
        }
        Some(path)
    }
}

/// Nearest live tank from another team; ties go to the lower identifier.
fn nearest_opponent<'a>(tank: &TankSnapshot, tanks: &'a TankView) -> Option<&'a TankSnapshot> {
    tanks
        .iter()
        .filter(|other| other.alive && other.team != tank.team)
        .min_by(|left, right| {
            let left_distance = left.position.distance_squared(tank.position);
            let right_distance = right.position.distance_squared(tank.position);
            left_distance
                .total_cmp(&right_distance)
                .then(left.id.cmp(&right.id))
        })
}
