use rand::distributions::uniform::SampleRange;
use rand::Rng;

use crate::basic::{GridDim, GridPoint};

/// Row-major indices of the occupied cells, sorted and deduplicated
pub fn occupied_indices<'a>(cells: impl IntoIterator<Item = &'a GridPoint>, dim: GridDim) -> Vec<usize> {
    let mut indices = cells
        .into_iter()
        .filter(|cell| dim.contains(**cell))
        .map(|cell| (cell.y * dim.side() + cell.x) as usize)
        .collect::<Vec<_>>();
    indices.sort_unstable();
    indices.dedup();
    indices
}

/// Pick a cell uniformly at random among the cells not in `occupied`
pub fn random_free_spot(occupied: &[usize], dim: GridDim, rng: &mut impl Rng) -> Option<GridPoint> {
    let free_spaces = dim.cell_count() - occupied.len();
    if free_spaces == 0 {
        return None;
    }

    // the n-th free cell, skip over occupied ones in order
    let mut new_idx = (0..free_spaces).sample_single(rng);
    for &idx in occupied {
        if idx <= new_idx {
            new_idx += 1;
        }
    }

    debug_assert!(new_idx < dim.cell_count());
    Some(GridPoint {
        x: new_idx as isize % dim.side(),
        y: new_idx as isize / dim.side(),
    })
}
