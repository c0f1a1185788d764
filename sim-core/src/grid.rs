//! Uniform spatial grid over the torus, rebuilt every step.
//!
//! The grid is an arena: `cell_start[c]..cell_start[c + 1]` is the slice of
//! `indices` holding the particles of cell `c`. Rebuilding is a counting
//! sort, so no per-cell vectors are allocated and particles inside a cell
//! are always in ascending index order.

use glam::DVec2;

use crate::space::Bounds;
use crate::types::ParticleId;

/// Cell budget per particle. Sparse worlds get coarser cells instead of a
/// huge, mostly empty arena.
const CELLS_PER_PARTICLE: usize = 4;
/// Cell budget that is always allowed, whatever the particle count.
const MIN_CELL_BUDGET: usize = 4096;

/// Integer cell coordinate, always within the grid dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

#[derive(Debug)]
pub struct SpatialGrid {
    bounds: Bounds,
    /// Number of cells along x and y.
    dims: (usize, usize),
    /// Actual cell extent, `world / dims`; never smaller than the requested size.
    cell_size: DVec2,
    cell_start: Vec<usize>,
    indices: Vec<ParticleId>,
    // Scratch reused across rebuilds.
    particle_cell: Vec<usize>,
    cursor: Vec<usize>,
}

impl Default for SpatialGrid {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialGrid {
    /// Creates an empty grid. Call [`SpatialGrid::rebuild`] before querying.
    pub fn new() -> Self {
        Self {
            bounds: Bounds::new(1.0, 1.0),
            dims: (1, 1),
            cell_size: DVec2::ONE,
            cell_start: vec![0, 0],
            indices: Vec::new(),
            particle_cell: Vec::new(),
            cursor: Vec::new(),
        }
    }

    /// Clears the grid and inserts every particle index into its cell.
    ///
    /// The world is split into `max(1, floor(world / cell_size))` cells per
    /// axis, which stretches cells so that each is at least `cell_size` wide.
    /// With `cell_size` set to the maximum interaction radius, every pair in
    /// range lands in the same or in adjacent (wrapped) cells.
    ///
    /// The total cell count is capped at
    /// `max(MIN_CELL_BUDGET, CELLS_PER_PARTICLE * positions.len())`. Both
    /// axes are halved until the grid fits, which only makes cells larger.
    ///
    /// The result depends only on `positions`, so calling this twice in a
    /// row yields the same grid.
    pub fn rebuild(&mut self, positions: &[DVec2], cell_size: f64, bounds: &Bounds) {
        self.bounds = *bounds;
        let budget = (CELLS_PER_PARTICLE * positions.len()).max(MIN_CELL_BUDGET);
        self.dims = capped_dims(
            cells_along(bounds.size.x, cell_size),
            cells_along(bounds.size.y, cell_size),
            budget,
        );
        self.cell_size = DVec2::new(
            bounds.size.x / self.dims.0 as f64,
            bounds.size.y / self.dims.1 as f64,
        );
        let cells = self.dims.0 * self.dims.1;

        // Count particles per cell, shifted by one for the prefix sum.
        self.cell_start.clear();
        self.cell_start.resize(cells + 1, 0);
        self.particle_cell.clear();
        for &p in positions {
            let c = self.cell_index(self.cell_of(p));
            self.particle_cell.push(c);
            self.cell_start[c + 1] += 1;
        }

        for c in 0..cells {
            self.cell_start[c + 1] += self.cell_start[c];
        }

        self.cursor.clear();
        self.cursor.extend_from_slice(&self.cell_start[..cells]);
        self.indices.clear();
        self.indices.resize(positions.len(), 0);
        for (id, &c) in self.particle_cell.iter().enumerate() {
            self.indices[self.cursor[c]] = id;
            self.cursor[c] += 1;
        }
    }

    /// Number of cells along x and y.
    pub fn dims(&self) -> (usize, usize) {
        self.dims
    }

    pub fn cell_size(&self) -> DVec2 {
        self.cell_size
    }

    /// Number of particle indices stored by the last rebuild.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Cell containing `pos`, computed as `floor(pos / cell_size) mod dims`.
    ///
    /// Positions outside the world are wrapped first. A position that
    /// rounds onto the far edge is kept in the last cell.
    pub fn cell_of(&self, pos: DVec2) -> Cell {
        let p = self.bounds.wrap(pos);
        Cell {
            x: axis_cell(p.x, self.cell_size.x, self.dims.0),
            y: axis_cell(p.y, self.cell_size.y, self.dims.1),
        }
    }

    /// Particles stored in exactly this cell.
    pub fn cell_particles(&self, cell: Cell) -> &[ParticleId] {
        let c = self.cell_index(cell);
        &self.indices[self.cell_start[c]..self.cell_start[c + 1]]
    }

    /// The cell itself and its eight wrapped neighbours.
    ///
    /// On an axis with fewer than three cells the wrapped neighbours
    /// coincide; each distinct cell is yielded once.
    pub fn neighbor_cells(&self, cell: Cell) -> impl Iterator<Item = Cell> + use<> {
        let (nx, ny) = self.dims;
        let xs = axis_offsets(nx);
        let ys = axis_offsets(ny);
        ys.iter().flat_map(move |&oy| {
            xs.iter().map(move |&ox| Cell {
                x: wrap_cell(cell.x, ox, nx),
                y: wrap_cell(cell.y, oy, ny),
            })
        })
    }

    /// Particle indices in `cell` and its wrapped neighbours.
    ///
    /// Every particle within one cell width of the cell appears exactly
    /// once. Farther particles may appear too and must be filtered by
    /// distance.
    pub fn neighbors_of(&self, cell: Cell) -> impl Iterator<Item = ParticleId> + '_ {
        self.neighbor_cells(cell)
            .flat_map(move |c| self.cell_particles(c).iter().copied())
    }

    #[inline]
    fn cell_index(&self, cell: Cell) -> usize {
        cell.y * self.dims.0 + cell.x
    }
}

fn cells_along(world: f64, cell_size: f64) -> usize {
    let n = (world / cell_size).floor();
    if n.is_finite() && n >= 1.0 {
        n as usize
    } else {
        1
    }
}

fn capped_dims(mut nx: usize, mut ny: usize, budget: usize) -> (usize, usize) {
    while nx.saturating_mul(ny) > budget {
        nx = (nx / 2).max(1);
        ny = (ny / 2).max(1);
    }
    (nx, ny)
}

#[inline]
fn axis_cell(p: f64, size: f64, dims: usize) -> usize {
    ((p / size).floor().max(0.0) as usize).min(dims - 1)
}

#[inline]
fn axis_offsets(dims: usize) -> &'static [isize] {
    match dims {
        1 => &[0],
        2 => &[0, 1],
        _ => &[-1, 0, 1],
    }
}

#[inline]
fn wrap_cell(c: usize, offset: isize, dims: usize) -> usize {
    (c as isize + offset).rem_euclid(dims as isize) as usize
}
