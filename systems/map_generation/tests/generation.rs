use tank_arena_core::{GridConfig, TileCoord, TileKind};
use tank_arena_system_map_generation::{generate, GenerationError, MapConfig};
use tank_arena_system_pathfinding::Pathfinder;

fn arena(density: f64, seed: u64) -> MapConfig {
    MapConfig::new(
        GridConfig::new(24, 14, 32.0),
        density,
        seed,
        vec![
            TileCoord::new(2, 2),
            TileCoord::new(11, 21),
            TileCoord::new(2, 21),
            TileCoord::new(11, 2),
        ],
    )
}

#[test]
fn identical_seeds_produce_identical_layouts() {
    for seed in [0, 1, 7, 42, 9_001, u64::MAX] {
        let first = generate(&arena(0.3, seed)).expect("playable arena");
        let second = generate(&arena(0.3, seed)).expect("playable arena");
        assert_eq!(first, second, "seed {seed} diverged");
    }
}

#[test]
fn different_seeds_produce_different_layouts() {
    let first = generate(&arena(0.3, 1)).expect("playable arena");
    let second = generate(&arena(0.3, 2)).expect("playable arena");
    assert_ne!(first, second);
}

#[test]
fn every_generated_arena_connects_all_spawn_points() {
    let mut pathfinder = Pathfinder::new();
    for seed in 0..64 {
        let config = arena(0.35, seed);
        let grid = match generate(&config) {
            Ok(grid) => grid,
            Err(GenerationError::Unreachable { .. }) => continue,
            Err(error) => panic!("unexpected error for seed {seed}: {error}"),
        };
        for &from in &config.spawn_points {
            for &to in &config.spawn_points {
                assert!(
                    pathfinder.is_reachable(&grid, from, to),
                    "seed {seed}: {from} cannot reach {to}"
                );
            }
        }
    }
}

#[test]
fn perimeter_is_border_and_spawns_stay_open() {
    let config = arena(0.35, 23);
    let grid = generate(&config).expect("playable arena");
    for tile in grid.tiles() {
        let coord = tile.coord();
        if grid.config().is_perimeter(coord) {
            assert_eq!(tile.kind(), TileKind::Border, "{coord} must be border");
        } else {
            assert_ne!(tile.kind(), TileKind::Border, "{coord} must not be border");
        }
        if config
            .spawn_points
            .iter()
            .any(|spawn| spawn.chebyshev_distance(coord) <= 1)
        {
            assert_eq!(tile.kind(), TileKind::Empty, "{coord} must stay open");
        }
    }
}

#[test]
fn zero_density_leaves_the_interior_empty() {
    let grid = generate(&arena(0.0, 5)).expect("open arena");
    assert!(grid
        .tiles()
        .iter()
        .all(|tile| tile.kind() != TileKind::Obstacle));
}

#[test]
fn full_density_with_isolated_spawns_exhausts_retries() {
    let config = arena(1.0, 5).with_max_attempts(4);
    assert_eq!(
        generate(&config),
        Err(GenerationError::Unreachable { attempts: 4 })
    );
}

#[test]
fn full_density_with_adjacent_spawns_succeeds() {
    let config = MapConfig::new(
        GridConfig::new(10, 8, 32.0),
        1.0,
        3,
        vec![TileCoord::new(3, 3), TileCoord::new(3, 5)],
    );
    let grid = generate(&config).expect("protected zones overlap");
    assert_eq!(grid.tile_at(TileCoord::new(3, 4)).map(|t| t.kind()), Ok(TileKind::Empty));
    assert_eq!(
        grid.tile_at(TileCoord::new(3, 7)).map(|t| t.kind()),
        Ok(TileKind::Obstacle)
    );
}
