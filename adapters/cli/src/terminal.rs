use std::{io::Write, time::Duration};

use anyhow::{Context, Result};
use tank_arena_core::TileKind;
use tank_arena_rendering::{FrameControl, Presentation, RenderingBackend, Scene};

/// Backend that advances frames without pacing and prints the last one as text.
#[derive(Debug)]
pub(crate) struct TerminalBackend<W> {
    output: W,
    frame_dt: Duration,
    max_frames: u64,
}

impl<W: Write> TerminalBackend<W> {
    pub(crate) fn new(output: W, frame_dt: Duration, max_frames: u64) -> Self {
        Self {
            output,
            frame_dt,
            max_frames,
        }
    }
}

impl<W: Write> RenderingBackend for TerminalBackend<W> {
    fn run<F>(mut self, presentation: Presentation, mut update_scene: F) -> Result<()>
    where
        F: FnMut(Duration, &mut Scene) -> FrameControl,
    {
        let Presentation {
            title, mut scene, ..
        } = presentation;
        for _ in 0..self.max_frames {
            if update_scene(self.frame_dt, &mut scene) == FrameControl::Exit {
                break;
            }
        }

        writeln!(self.output, "{title}").context("failed to write scene title")?;
        self.output
            .write_all(ascii_map(&scene).as_bytes())
            .context("failed to write scene")?;
        self.output.flush().context("failed to flush scene output")
    }
}

/// Renders the scene as one character per tile.
///
/// Live tanks show the last digit of their id, bullets show as `*`.
pub(crate) fn ascii_map(scene: &Scene) -> String {
    let columns = scene.columns as usize;
    let mut cells: Vec<char> = scene
        .tiles
        .iter()
        .map(|tile| match tile.kind {
            TileKind::Border => '#',
            TileKind::Obstacle => 'X',
            TileKind::Empty => '.',
        })
        .collect();

    let mut mark = |position, symbol| {
        if let Some(coord) = scene.tile_under(position) {
            let index = coord.row() as usize * columns + coord.column() as usize;
            if let Some(cell) = cells.get_mut(index) {
                *cell = symbol;
            }
        }
    };
    for bullet in &scene.bullets {
        mark(bullet.position, '*');
    }
    for tank in &scene.tanks {
        let digit = char::from_digit(tank.id.get() % 10, 10).unwrap_or('T');
        mark(tank.position, digit);
    }

    let mut map = String::with_capacity(cells.len() + scene.rows as usize);
    for row in cells.chunks(columns.max(1)) {
        map.extend(row);
        map.push('\n');
    }
    map
}
