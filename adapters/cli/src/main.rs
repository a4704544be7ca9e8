#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a headless tank arena match.

mod config;
mod terminal;

use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;
use log::{debug, info};
use tank_arena_core::{Command, Event, MatchStatus, TankId, TeamId};
use tank_arena_rendering::{
    AssetProvider, Color, FrameControl, NoAssets, Presentation, RenderingBackend, Scene,
    SpriteManifest,
};
use tank_arena_system_map_generation::{generate, MapConfig};
use tank_arena_system_pursuit::{Pursuit, PursuitConfig};
use tank_arena_world::{self as world, query, TankSpawn, World};

use crate::{
    config::{CliArgs, MatchSettings},
    terminal::TerminalBackend,
};

/// Entry point for the tank arena command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = MatchSettings::resolve(CliArgs::parse())?;
    let assets: Box<dyn AssetProvider> = match &settings.sprites {
        Some(path) => Box::new(SpriteManifest::from_path(path)?),
        None => Box::new(NoAssets),
    };

    let mut world = build_world(&settings)?;
    play(&mut world, &settings, assets.as_ref())?;
    report(&world);
    Ok(())
}

fn build_world(settings: &MatchSettings) -> Result<World> {
    let spawn_tiles = settings.spawn_tiles();
    let map = MapConfig::new(
        settings.grid,
        settings.density,
        settings.seed,
        spawn_tiles.clone(),
    );
    let grid = generate(&map).context("failed to generate the arena")?;

    let center = Vec2::new(grid.width(), grid.height()) * 0.5;
    let spawns: Vec<TankSpawn> = spawn_tiles
        .into_iter()
        .zip(0..)
        .map(|(tile, index)| {
            let toward_center = center - grid.tile_to_world_center(tile);
            TankSpawn::new(
                TankId::new(index),
                TeamId::new(index),
                tile,
                toward_center.y.atan2(toward_center.x),
            )
        })
        .collect();
    info!(
        "arena {}x{} seeded with {}, {} tanks",
        grid.columns(),
        grid.rows(),
        settings.seed,
        spawns.len()
    );
    World::new(grid, settings.rules, &spawns).context("failed to set up the match")
}

fn play(world: &mut World, settings: &MatchSettings, assets: &dyn AssetProvider) -> Result<()> {
    let controlled = query::tank_view(world)
        .iter()
        .map(|tank| tank.id)
        .collect();
    let mut pursuit = Pursuit::new(PursuitConfig::default(), controlled);
    let mut events: Vec<Event> = Vec::new();
    let mut commands: Vec<Command> = Vec::new();

    let presentation = Presentation::new(
        format!("tank arena (seed {})", settings.seed),
        Color::from_rgb_u8(0, 0, 0),
        build_scene(world, assets),
    );
    let backend = TerminalBackend::new(io::stdout().lock(), settings.tick(), settings.max_ticks);

    backend.run(presentation, |dt, scene| {
        commands.clear();
        pursuit.handle(
            &events,
            &query::tank_view(world),
            query::grid(world),
            &mut commands,
        );

        events.clear();
        for command in commands.drain(..) {
            world::apply(world, command, &mut events);
        }
        world::apply(world, Command::Tick { dt }, &mut events);

        for event in &events {
            if let Event::TankDestroyed { tank, by, .. } = event {
                debug!("tank {tank} destroyed by tank {by}");
            }
        }

        *scene = build_scene(world, assets);
        if query::status(world).is_terminal() {
            FrameControl::Exit
        } else {
            FrameControl::Continue
        }
    })
}

fn build_scene(world: &World, assets: &dyn AssetProvider) -> Scene {
    let snapshot = query::snapshot(world);
    Scene::build(
        snapshot.grid,
        &snapshot.tanks,
        &snapshot.bullets,
        snapshot.status,
        assets,
    )
}

fn report(world: &World) {
    let elapsed = query::elapsed(world).as_secs_f32();
    match query::status(world) {
        MatchStatus::WonBy(tank) => println!("tank {tank} wins after {elapsed:.2}s"),
        MatchStatus::NoWinner => println!("no winner after {elapsed:.2}s"),
        MatchStatus::InProgress => println!("match abandoned after {elapsed:.2}s"),
    }

    println!("{:>6} {:>6} {:>6} {:>9}", "tank", "kills", "deaths", "suicides");
    for tank in query::tank_view(world).iter() {
        println!(
            "{:>6} {:>6} {:>6} {:>9}",
            tank.id, tank.stats.kills, tank.stats.deaths, tank.stats.suicides
        );
    }
}
