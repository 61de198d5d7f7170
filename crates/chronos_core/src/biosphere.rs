//! Cellular-automaton world generation.
//!
//! Cells are seeded by a small linear congruential generator and then
//! smoothed a fixed number of times. The same seed and dimensions always
//! produce the same grid.

use serde::Serialize;
use tracing::debug;

pub const DEFAULT_FILL_PERCENT: u32 = 45;
pub const DEFAULT_DIMENSION: usize = 50;
pub const SMOOTHING_PASSES: usize = 5;

const LCG_MULTIPLIER: u64 = 9301;
const LCG_INCREMENT: u64 = 49297;
const LCG_MODULUS: u64 = 233280;

pub const WALL: u8 = 1;
pub const FLOOR: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BiosphereGenerator {
    width: usize,
    height: usize,
}

impl BiosphereGenerator {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn generate(&self, seed: u64, fill_percent: u32) -> Biosphere {
        let mut cells = self.random_fill(seed, fill_percent);
        for _ in 0..SMOOTHING_PASSES {
            cells = self.smooth(&cells);
        }
        let biosphere = Biosphere { cells };
        debug!(
            target: "chronos_core.biosphere",
            seed,
            width = self.width,
            height = self.height,
            walls = biosphere.wall_count(),
            "biosphere generated"
        );
        biosphere
    }

    fn random_fill(&self, seed: u64, fill_percent: u32) -> Vec<Vec<u8>> {
        let threshold = f64::from(fill_percent);
        let mut state = seed % LCG_MODULUS;
        (0..self.height)
            .map(|_| {
                (0..self.width)
                    .map(|_| {
                        state = (state * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS;
                        let roll = state as f64 / LCG_MODULUS as f64 * 100.0;
                        if roll < threshold {
                            WALL
                        } else {
                            FLOOR
                        }
                    })
                    .collect()
            })
            .collect()
    }

    fn smooth(&self, cells: &[Vec<u8>]) -> Vec<Vec<u8>> {
        let mut next = cells.to_vec();
        for (y, row) in next.iter_mut().enumerate() {
            for (x, cell) in row.iter_mut().enumerate() {
                let walls = self.surrounding_walls(cells, x, y);
                if walls > 4 {
                    *cell = WALL;
                } else if walls < 4 {
                    *cell = FLOOR;
                }
            }
        }
        next
    }

    /// Wall count over the 8 neighbours; cells off the edge count as walls.
    fn surrounding_walls(&self, cells: &[Vec<u8>], x: usize, y: usize) -> u32 {
        let mut walls = 0;
        for ny in y as isize - 1..=y as isize + 1 {
            for nx in x as isize - 1..=x as isize + 1 {
                if nx == x as isize && ny == y as isize {
                    continue;
                }
                let inside = nx >= 0
                    && ny >= 0
                    && (nx as usize) < self.width
                    && (ny as usize) < self.height;
                walls += if inside {
                    u32::from(cells[ny as usize][nx as usize])
                } else {
                    1
                };
            }
        }
        walls
    }
}

impl Default for BiosphereGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION, DEFAULT_DIMENSION)
    }
}

/// Row-major grid; `1` is a wall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Biosphere {
    cells: Vec<Vec<u8>>,
}

impl Biosphere {
    pub fn cells(&self) -> &[Vec<u8>] {
        &self.cells
    }

    pub fn height(&self) -> usize {
        self.cells.len()
    }

    pub fn width(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    pub fn wall_count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&cell| cell == WALL).count()
    }

    /// `#` for walls, `.` for open ground.
    pub fn render_rows(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&cell| if cell == WALL { '#' } else { '.' })
                    .collect()
            })
            .collect()
    }
}

/// Shorthand for a one-off grid.
pub fn generate_biosphere(width: usize, height: usize, seed: u64, fill_percent: u32) -> Biosphere {
    BiosphereGenerator::new(width, height).generate(seed, fill_percent)
}
