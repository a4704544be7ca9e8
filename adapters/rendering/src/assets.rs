use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tank_arena_core::TileKind;

const SUPPORTED_MANIFEST_VERSION: u32 = 1;

/// Named visual resource a rendering backend may provide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpriteKey {
    /// Texture for a tile of the given kind.
    Tile(TileKind),
    /// Texture for a tank body.
    Tank,
    /// Texture for a bullet.
    Bullet,
}

impl SpriteKey {
    /// Every key a sprite manifest may name.
    pub const ALL: [SpriteKey; 5] = [
        SpriteKey::Tile(TileKind::Border),
        SpriteKey::Tile(TileKind::Obstacle),
        SpriteKey::Tile(TileKind::Empty),
        SpriteKey::Tank,
        SpriteKey::Bullet,
    ];

    /// Name used for the key inside a sprite manifest.
    #[must_use]
    pub const fn manifest_name(self) -> &'static str {
        match self {
            SpriteKey::Tile(TileKind::Border) => "Border",
            SpriteKey::Tile(TileKind::Obstacle) => "Obstacle",
            SpriteKey::Tile(TileKind::Empty) => "Empty",
            SpriteKey::Tank => "Tank",
            SpriteKey::Bullet => "Bullet",
        }
    }

    fn from_manifest_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.manifest_name() == name)
    }
}

/// Answers whether a texture is available for a sprite key.
pub trait AssetProvider {
    /// Returns `true` when the backend can draw the sprite.
    fn has_sprite(&self, key: SpriteKey) -> bool;
}

/// Provider without any textures; every visual falls back to a fill color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoAssets;

impl AssetProvider for NoAssets {
    fn has_sprite(&self, _key: SpriteKey) -> bool {
        false
    }
}

/// Sprite paths declared by a TOML manifest.
///
/// Entries are optional: a key missing from the manifest is rendered with its
/// fallback color.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpriteManifest {
    sprites: BTreeMap<SpriteKey, PathBuf>,
}

impl SpriteManifest {
    /// Reads and parses the manifest at `path`; sprite paths resolve relative to its directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let manifest_path = path.as_ref();
        let contents = fs::read_to_string(manifest_path).with_context(|| {
            format!(
                "failed to read sprite manifest at {}",
                manifest_path.display()
            )
        })?;
        let base = manifest_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::parse(&contents, &base)
    }

    /// Parses manifest contents, resolving sprite paths against `base_path`.
    pub fn parse(contents: &str, base_path: &Path) -> Result<Self> {
        let manifest: Manifest =
            toml::from_str(contents).context("failed to parse sprite manifest toml contents")?;
        if manifest.version != SUPPORTED_MANIFEST_VERSION {
            bail!(
                "unsupported sprite manifest version {}; expected {}",
                manifest.version,
                SUPPORTED_MANIFEST_VERSION
            );
        }

        let mut sprites = BTreeMap::new();
        for (name, relative_path) in manifest.sprites {
            let Some(key) = SpriteKey::from_manifest_name(&name) else {
                bail!("unknown sprite key `{name}` in manifest");
            };
            let _ = sprites.insert(key, base_path.join(relative_path));
        }
        Ok(Self { sprites })
    }

    /// Path of the texture declared for `key`.
    #[must_use]
    pub fn path(&self, key: SpriteKey) -> Option<&Path> {
        self.sprites.get(&key).map(PathBuf::as_path)
    }

    /// Number of sprites declared by the manifest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    /// Whether the manifest declares no sprites.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}

impl AssetProvider for SpriteManifest {
    fn has_sprite(&self, key: SpriteKey) -> bool {
        self.sprites.contains_key(&key)
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    version: u32,
    #[serde(default)]
    sprites: HashMap<String, String>,
}
