use std::{fs, path::PathBuf, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use tank_arena_core::{GridConfig, MatchRules, TileCoord};

const DEFAULT_SEED: u64 = 1;
const DEFAULT_COLUMNS: u32 = 27;
const DEFAULT_ROWS: u32 = 22;
const DEFAULT_TILE_LENGTH: f32 = 48.0;
const DEFAULT_DENSITY: f64 = 0.08;
const DEFAULT_TANKS: u32 = 2;
const DEFAULT_TICK_HZ: u32 = 60;
const DEFAULT_MAX_TICKS: u64 = 60 * 180;
const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(90);
const MAX_TANKS: u32 = 4;

/// Runs a headless match between computer-controlled tanks.
#[derive(Debug, Default, Parser)]
#[command(name = "tank-arena", version, about)]
pub(crate) struct CliArgs {
    /// TOML file with match settings; flags override its values.
    #[arg(long, value_name = "FILE")]
    pub(crate) config: Option<PathBuf>,
    /// Seed for arena generation.
    #[arg(long)]
    pub(crate) seed: Option<u64>,
    /// Number of tile columns, border included.
    #[arg(long)]
    pub(crate) columns: Option<u32>,
    /// Number of tile rows, border included.
    #[arg(long)]
    pub(crate) rows: Option<u32>,
    /// Probability that an interior tile becomes an obstacle.
    #[arg(long)]
    pub(crate) density: Option<f64>,
    /// Number of tanks, one per corner (2 to 4).
    #[arg(long)]
    pub(crate) tanks: Option<u32>,
    /// Ticks simulated before the match is abandoned.
    #[arg(long)]
    pub(crate) max_ticks: Option<u64>,
    /// Simulation ticks per second.
    #[arg(long)]
    pub(crate) tick_hz: Option<u32>,
    /// Sprite manifest consulted for available textures.
    #[arg(long, value_name = "FILE")]
    pub(crate) sprites: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    seed: Option<u64>,
    columns: Option<u32>,
    rows: Option<u32>,
    tile_length: Option<f32>,
    density: Option<f64>,
    tanks: Option<u32>,
    max_ticks: Option<u64>,
    tick_hz: Option<u32>,
    sprites: Option<PathBuf>,
    rules: RulesConfig,
}

/// Match rules as written in the settings file, durations in seconds.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RulesConfig {
    tank_size: Option<f32>,
    tank_speed: Option<f32>,
    bullet_speed: Option<f32>,
    bullet_radius: Option<f32>,
    bounce_limit: Option<u32>,
    bullet_lifetime: Option<f32>,
    fire_cooldown: Option<f32>,
    max_active_bullets: Option<u32>,
    muzzle_offset: Option<f32>,
    time_limit: Option<f32>,
}

impl RulesConfig {
    fn apply(self, mut rules: MatchRules) -> Result<MatchRules> {
        if let Some(value) = self.tank_size {
            rules.tank_size = value;
        }
        if let Some(value) = self.tank_speed {
            rules.tank_speed = value;
        }
        if let Some(value) = self.bullet_speed {
            rules.bullet_speed = value;
        }
        if let Some(value) = self.bullet_radius {
            rules.bullet_radius = value;
        }
        if let Some(value) = self.bounce_limit {
            rules.bounce_limit = value;
        }
        if let Some(value) = self.bullet_lifetime {
            rules.bullet_lifetime = seconds("rules.bullet_lifetime", value)?;
        }
        if let Some(value) = self.fire_cooldown {
            rules.fire_cooldown = seconds("rules.fire_cooldown", value)?;
        }
        if let Some(value) = self.max_active_bullets {
            rules.max_active_bullets = value;
        }
        if let Some(value) = self.muzzle_offset {
            rules.muzzle_offset = value;
        }
        if let Some(value) = self.time_limit {
            rules.time_limit = Some(seconds("rules.time_limit", value)?);
        }
        Ok(rules)
    }
}

fn seconds(field: &str, value: f32) -> Result<Duration> {
    Duration::try_from_secs_f32(value)
        .with_context(|| format!("`{field}` must be a non-negative number of seconds"))
}

/// Fully resolved settings of one headless match.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct MatchSettings {
    pub(crate) grid: GridConfig,
    pub(crate) density: f64,
    pub(crate) seed: u64,
    pub(crate) tanks: u32,
    pub(crate) max_ticks: u64,
    pub(crate) tick_hz: u32,
    pub(crate) rules: MatchRules,
    pub(crate) sprites: Option<PathBuf>,
}

impl MatchSettings {
    /// Layers the command line over the optional settings file over defaults.
    pub(crate) fn resolve(args: CliArgs) -> Result<Self> {
        let file = match &args.config {
            Some(path) => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("failed to read settings at {}", path.display()))?;
                parse_file(&contents)
                    .with_context(|| format!("invalid settings in {}", path.display()))?
            }
            None => FileConfig::default(),
        };
        Self::layer(args, file)
    }

    fn layer(args: CliArgs, file: FileConfig) -> Result<Self> {
        let grid = GridConfig::new(
            args.columns.or(file.columns).unwrap_or(DEFAULT_COLUMNS),
            args.rows.or(file.rows).unwrap_or(DEFAULT_ROWS),
            file.tile_length.unwrap_or(DEFAULT_TILE_LENGTH),
        );
        let tanks = args.tanks.or(file.tanks).unwrap_or(DEFAULT_TANKS);
        if !(2..=MAX_TANKS).contains(&tanks) {
            bail!("a match needs between 2 and {MAX_TANKS} tanks, got {tanks}");
        }
        let tick_hz = args.tick_hz.or(file.tick_hz).unwrap_or(DEFAULT_TICK_HZ);
        if tick_hz == 0 {
            bail!("tick rate must be positive");
        }

        Ok(Self {
            grid,
            density: args.density.or(file.density).unwrap_or(DEFAULT_DENSITY),
            seed: args.seed.or(file.seed).unwrap_or(DEFAULT_SEED),
            tanks,
            max_ticks: args.max_ticks.or(file.max_ticks).unwrap_or(DEFAULT_MAX_TICKS),
            tick_hz,
            rules: file.rules.apply(MatchRules {
                time_limit: Some(DEFAULT_TIME_LIMIT),
                ..MatchRules::default()
            })?,
            sprites: args.sprites.or(file.sprites),
        })
    }

    /// Simulated duration of one tick.
    pub(crate) fn tick(&self) -> Duration {
        Duration::from_secs(1) / self.tick_hz
    }

    /// Spawn tiles in tank order: opposite corners first, then the remaining two.
    pub(crate) fn spawn_tiles(&self) -> Vec<TileCoord> {
        let last_row = self.grid.rows().saturating_sub(3);
        let last_column = self.grid.columns().saturating_sub(3);
        [
            TileCoord::new(2, 2),
            TileCoord::new(last_row, last_column),
            TileCoord::new(2, last_column),
            TileCoord::new(last_row, 2),
        ]
        .into_iter()
        .take(self.tanks as usize)
        .collect()
    }
}

fn parse_file(contents: &str) -> Result<FileConfig> {
    toml::from_str(contents).context("failed to parse settings toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags_or_file() {
        let settings =
            MatchSettings::layer(CliArgs::default(), FileConfig::default()).expect("defaults");
        assert_eq!(settings.grid, GridConfig::new(27, 22, 48.0));
        assert_eq!(settings.tanks, 2);
        assert_eq!(
            settings.rules,
            MatchRules {
                time_limit: Some(Duration::from_secs(90)),
                ..MatchRules::default()
            }
        );
        assert_eq!(settings.tick(), Duration::from_secs(1) / 60);
        assert_eq!(
            settings.spawn_tiles(),
            vec![TileCoord::new(2, 2), TileCoord::new(19, 24)]
        );
    }

    #[test]
    fn flags_override_the_settings_file() {
        let file = parse_file(
            r#"
                seed = 9
                columns = 30
                rows = 18
                density = 0.2

                [rules]
                fire_cooldown = 0.25
                time_limit = 45
            "#,
        )
        .expect("valid settings");
        let args = CliArgs {
            seed: Some(4),
            rows: Some(12),
            ..CliArgs::default()
        };

        let settings = MatchSettings::layer(args, file).expect("valid layering");
        assert_eq!(settings.seed, 4);
        assert_eq!(settings.grid, GridConfig::new(30, 12, 48.0));
        assert!((settings.density - 0.2).abs() < f64::EPSILON);
        assert_eq!(settings.rules.fire_cooldown, Duration::from_millis(250));
        assert_eq!(settings.rules.time_limit, Some(Duration::from_secs(45)));
        assert_eq!(settings.rules.bounce_limit, 4);
    }

    #[test]
    fn four_tanks_fill_every_corner() {
        let args = CliArgs {
            columns: Some(10),
            rows: Some(8),
            tanks: Some(4),
            ..CliArgs::default()
        };
        let settings = MatchSettings::layer(args, FileConfig::default()).expect("valid");
        assert_eq!(
            settings.spawn_tiles(),
            vec![
                TileCoord::new(2, 2),
                TileCoord::new(5, 7),
                TileCoord::new(2, 7),
                TileCoord::new(5, 2),
            ]
        );
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let too_many = CliArgs {
            tanks: Some(5),
            ..CliArgs::default()
        };
        assert!(MatchSettings::layer(too_many, FileConfig::default()).is_err());

        let frozen = CliArgs {
            tick_hz: Some(0),
            ..CliArgs::default()
        };
        assert!(MatchSettings::layer(frozen, FileConfig::default()).is_err());

        assert!(parse_file("colour = \"red\"").is_err());
        let negative = parse_file("[rules]\nfire_cooldown = -1.0").expect("parses");
        assert!(negative.rules.apply(MatchRules::default()).is_err());
    }
}
