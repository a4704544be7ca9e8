#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Shared rendering contracts for tank arena adapters.
//!
//! The simulation carries no visual resources. Adapters build a [`Scene`] from
//! the world's read-only views and resolve every tile, tank and bullet to a
//! sprite when the [`AssetProvider`] has one, or to a palette color otherwise.

mod assets;

pub use assets::{AssetProvider, NoAssets, SpriteKey, SpriteManifest};

use anyhow::Result as AnyResult;
use glam::Vec2;
use std::time::Duration;
use tank_arena_core::{
    BulletId, BulletView, Grid, MatchStatus, TankId, TankView, TeamId, TileCoord, TileKind,
};

/// RGBA color used when presenting frames.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Returns a new color lightened towards white by the provided amount.
    #[must_use]
    pub fn lighten(self, amount: f32) -> Self {
        let amount = amount.clamp(0.0, 1.0);

        Self {
            red: lighten_channel(self.red, amount),
            green: lighten_channel(self.green, amount),
            blue: lighten_channel(self.blue, amount),
            alpha: self.alpha,
        }
    }
}

fn lighten_channel(channel: f32, amount: f32) -> f32 {
    channel + (1.0 - channel) * amount
}

/// Fallback fill for border tiles.
pub const BORDER_COLOR: Color = Color::from_rgb_u8(64, 64, 72);
/// Fallback fill for obstacle tiles.
pub const OBSTACLE_COLOR: Color = Color::from_rgb_u8(128, 96, 64);
/// Fallback fill for open floor.
pub const EMPTY_COLOR: Color = Color::from_rgb_u8(200, 200, 180);
/// Fallback fill for bullets.
pub const BULLET_COLOR: Color = Color::from_rgb_u8(20, 20, 20);

const TEAM_PALETTE: [Color; 4] = [
    Color::from_rgb_u8(200, 40, 40),
    Color::from_rgb_u8(40, 80, 200),
    Color::from_rgb_u8(40, 160, 60),
    Color::from_rgb_u8(220, 180, 30),
];

/// Fallback fill for a tile of the given kind.
#[must_use]
pub const fn tile_color(kind: TileKind) -> Color {
    match kind {
        TileKind::Border => BORDER_COLOR,
        TileKind::Obstacle => OBSTACLE_COLOR,
        TileKind::Empty => EMPTY_COLOR,
    }
}

/// Fallback fill for tanks of the given team.
///
/// Teams past the base palette reuse it, lightened once per wrap.
#[must_use]
pub fn team_color(team: TeamId) -> Color {
    let index = team.get() as usize;
    let wraps = index / TEAM_PALETTE.len();
    TEAM_PALETTE[index % TEAM_PALETTE.len()].lighten(0.25 * wraps as f32)
}

/// How a backend should draw a scene element.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Visual {
    /// Draw the named texture.
    Sprite(SpriteKey),
    /// Fill the element's shape with a solid color.
    Fill(Color),
}

impl Visual {
    /// Resolves `key` to its sprite when available, else to `fallback`.
    #[must_use]
    pub fn resolve(assets: &dyn AssetProvider, key: SpriteKey, fallback: Color) -> Self {
        if assets.has_sprite(key) {
            Visual::Sprite(key)
        } else {
            Visual::Fill(fallback)
        }
    }
}

/// Tile as it should be drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneTile {
    /// Location of the tile.
    pub coord: TileCoord,
    /// Kind of the tile.
    pub kind: TileKind,
    /// Resolved visual.
    pub visual: Visual,
}

/// Live tank as it should be drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneTank {
    /// Identifier of the tank.
    pub id: TankId,
    /// Team of the tank.
    pub team: TeamId,
    /// Center in world units.
    pub position: Vec2,
    /// Facing in radians.
    pub facing: f32,
    /// Side length of the tank's square.
    pub size: f32,
    /// Resolved visual.
    pub visual: Visual,
}

/// Bullet in flight as it should be drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneBullet {
    /// Identifier of the bullet.
    pub id: BulletId,
    /// Center in world units.
    pub position: Vec2,
    /// Half extent of the bullet.
    pub radius: f32,
    /// Resolved visual.
    pub visual: Visual,
}

/// Scene description combining the arena tiles and its inhabitants.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    /// Number of tile columns.
    pub columns: u32,
    /// Number of tile rows.
    pub rows: u32,
    /// Length of a tile edge in world units.
    pub tile_length: f32,
    /// Tiles in row-major order.
    pub tiles: Vec<SceneTile>,
    /// Live tanks in identifier order.
    pub tanks: Vec<SceneTank>,
    /// Bullets in identifier order.
    pub bullets: Vec<SceneBullet>,
    /// Outcome of the match at the time the scene was built.
    pub status: MatchStatus,
}

impl Scene {
    /// Builds a scene from the world's read-only views.
    #[must_use]
    pub fn build(
        grid: &Grid,
        tanks: &TankView,
        bullets: &BulletView,
        status: MatchStatus,
        assets: &dyn AssetProvider,
    ) -> Self {
        let tiles = grid
            .tiles()
            .iter()
            .map(|tile| SceneTile {
                coord: tile.coord(),
                kind: tile.kind(),
                visual: Visual::resolve(
                    assets,
                    SpriteKey::Tile(tile.kind()),
                    tile_color(tile.kind()),
                ),
            })
            .collect();

        let tanks = tanks
            .iter()
            .filter(|tank| tank.alive)
            .map(|tank| SceneTank {
                id: tank.id,
                team: tank.team,
                position: tank.position,
                facing: tank.facing,
                size: tank.size,
                visual: Visual::resolve(assets, SpriteKey::Tank, team_color(tank.team)),
            })
            .collect();

        let bullets = bullets
            .iter()
            .map(|bullet| SceneBullet {
                id: bullet.id,
                position: bullet.position,
                radius: bullet.radius,
                visual: Visual::resolve(assets, SpriteKey::Bullet, BULLET_COLOR),
            })
            .collect();

        Self {
            columns: grid.columns(),
            rows: grid.rows(),
            tile_length: grid.tile_length(),
            tiles,
            tanks,
            bullets,
            status,
        }
    }

    /// Width of the arena in world units.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.columns as f32 * self.tile_length
    }

    /// Height of the arena in world units.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.rows as f32 * self.tile_length
    }

    /// Tile under a world position, if it lies inside the arena.
    #[must_use]
    pub fn tile_under(&self, position: Vec2) -> Option<TileCoord> {
        if position.x < 0.0 || position.y < 0.0 {
            return None;
        }
        let column = (position.x / self.tile_length).floor() as u32;
        let row = (position.y / self.tile_length).floor() as u32;
        (column < self.columns && row < self.rows).then(|| TileCoord::new(row, column))
    }
}

/// Presentation descriptor consumed by rendering backends.
#[derive(Clone, Debug, PartialEq)]
pub struct Presentation {
    /// Title used by the created window or report.
    pub title: String,
    /// Solid color used to clear each frame.
    pub clear_color: Color,
    /// Scene content that should be displayed.
    pub scene: Scene,
}

impl Presentation {
    /// Constructs a new presentation descriptor.
    #[must_use]
    pub fn new<T>(title: T, clear_color: Color, scene: Scene) -> Self
    where
        T: Into<String>,
    {
        Self {
            title: title.into(),
            clear_color,
            scene,
        }
    }
}

/// Decision returned by the per-frame update closure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameControl {
    /// Keep presenting frames.
    Continue,
    /// Stop after presenting the current frame.
    Exit,
}

/// Rendering backend capable of presenting tank arena scenes.
pub trait RenderingBackend {
    /// Runs the rendering backend until the update closure asks it to exit.
    ///
    /// The provided `update_scene` closure receives the simulated frame delta
    /// and may mutate the scene before it is presented.
    fn run<F>(self, presentation: Presentation, update_scene: F) -> AnyResult<()>
    where
        F: FnMut(Duration, &mut Scene) -> FrameControl;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tank_arena_core::{BulletSnapshot, GridConfig, Tank, TankSnapshot};

    fn arena() -> Grid {
        Grid::bordered(GridConfig::new(5, 4, 10.0)).expect("valid grid")
    }

    fn tank(id: u32, team: u32, alive: bool) -> TankSnapshot {
        let mut tank = Tank::new(
            TankId::new(id),
            TeamId::new(team),
            Vec2::new(25.0, 15.0),
            0.0,
            6.0,
        );
        tank.alive = alive;
        TankSnapshot::from(&tank)
    }

    #[test]
    fn missing_assets_fall_back_to_palette_colors() {
        let grid = arena();
        let scene = Scene::build(
            &grid,
            &TankView::default(),
            &BulletView::default(),
            MatchStatus::InProgress,
            &NoAssets,
        );

        assert_eq!(scene.tiles.len(), 20);
        assert_eq!(scene.tiles[0].visual, Visual::Fill(BORDER_COLOR));
        let floor = scene
            .tiles
            .iter()
            .find(|tile| tile.coord == TileCoord::new(1, 1))
            .expect("interior tile");
        assert_eq!(floor.visual, Visual::Fill(EMPTY_COLOR));
        assert_eq!((scene.width(), scene.height()), (50.0, 40.0));
    }

    #[test]
    fn available_sprites_replace_fallbacks() {
        let manifest = SpriteManifest::parse(
            "version = 1\n[sprites]\nBorder = \"wall.png\"\nBullet = \"shell.png\"\n",
            Path::new("."),
        )
        .expect("valid manifest");
        let bullets = BulletView::from_snapshots(vec![BulletSnapshot {
            id: BulletId::new(0),
            owner: TankId::new(0),
            position: Vec2::new(20.0, 20.0),
            velocity: Vec2::X,
            radius: 1.0,
            bounces: 0,
        }]);
        let tanks = TankView::from_snapshots(vec![tank(0, 1, true)]);
        let scene = Scene::build(
            &arena(),
            &tanks,
            &bullets,
            MatchStatus::InProgress,
            &manifest,
        );

        assert_eq!(
            scene.tiles[0].visual,
            Visual::Sprite(SpriteKey::Tile(TileKind::Border))
        );
        assert_eq!(scene.bullets[0].visual, Visual::Sprite(SpriteKey::Bullet));
        assert_eq!(
            scene.tanks[0].visual,
            Visual::Fill(team_color(TeamId::new(1)))
        );
    }

    #[test]
    fn destroyed_tanks_are_not_drawn() {
        let tanks = TankView::from_snapshots(vec![tank(0, 0, true), tank(1, 1, false)]);
        let scene = Scene::build(
            &arena(),
            &tanks,
            &BulletView::default(),
            MatchStatus::WonBy(TankId::new(0)),
            &NoAssets,
        );
        let ids: Vec<TankId> = scene.tanks.iter().map(|tank| tank.id).collect();
        assert_eq!(ids, vec![TankId::new(0)]);
        assert_eq!(scene.tile_under(scene.tanks[0].position), Some(TileCoord::new(1, 2)));
        assert_eq!(scene.tile_under(Vec2::new(-1.0, 5.0)), None);
        assert_eq!(scene.tile_under(Vec2::new(5.0, 40.0)), None);
    }

    #[test]
    fn team_colors_wrap_by_lightening() {
        let first = team_color(TeamId::new(0));
        let wrapped = team_color(TeamId::new(4));
        assert_ne!(first, wrapped);
        assert_eq!(wrapped, first.lighten(0.25));
        assert_ne!(team_color(TeamId::new(0)), team_color(TeamId::new(1)));
    }
}
