//! Tiled Monitor Placement
//!
//! Large panels that present as several connectors (one per tile)
//! declare their tile geometry; every member of a tile group must be
//! placed so the tiles reassemble the panel. Offsets accumulate from
//! each tile's declared pixel size, not from the chosen modes, since a
//! tile can run a smaller mode letterboxed inside its slot.

use tracing::debug;

use crate::topology::{OutputId, TileInfo, Topology};

/// Positions for every member of one tile group, anchored at `origin`.
///
/// Returned pairs are `(output, (x, y))`. Tiles sharing an `h_loc`
/// column get the column's cumulative width; rows likewise. Missing
/// grid slots simply leave gaps.
pub fn tile_positions(
    topology: &Topology,
    group: &[OutputId],
    origin: (i32, i32),
) -> Vec<(OutputId, (i32, i32))> {
    let tiles: Vec<(OutputId, TileInfo)> = group
        .iter()
        .filter_map(|&id| topology.outputs[id.0].tile.map(|t| (id, t)))
        .collect();
    if tiles.is_empty() {
        return group.iter().map(|&id| (id, origin)).collect();
    }

    let num_h = tiles.iter().map(|(_, t)| t.num_h).max().unwrap_or(1) as usize;
    let num_v = tiles.iter().map(|(_, t)| t.num_v).max().unwrap_or(1) as usize;

    // Column widths and row heights from the declared tile sizes; a
    // slot nobody fills keeps zero extent.
    let mut col_width = vec![0u32; num_h];
    let mut row_height = vec![0u32; num_v];
    for (_, t) in &tiles {
        let col = (t.h_loc as usize).min(num_h - 1);
        let row = (t.v_loc as usize).min(num_v - 1);
        col_width[col] = col_width[col].max(t.width);
        row_height[row] = row_height[row].max(t.height);
    }

    let placed: Vec<(OutputId, (i32, i32))> = tiles
        .iter()
        .map(|&(id, t)| {
            let x: u32 = col_width[..(t.h_loc as usize).min(num_h)].iter().sum();
            let y: u32 = row_height[..(t.v_loc as usize).min(num_v)].iter().sum();
            (id, (origin.0 + x as i32, origin.1 + y as i32))
        })
        .collect();
    debug!(group = tiles[0].1.group, tiles = placed.len(), "tile group placed");
    placed
}

/// Total pixel size of a tile group, from declared tile extents.
pub fn tile_group_size(topology: &Topology, group: &[OutputId]) -> (u32, u32) {
    let tiles: Vec<TileInfo> = group
        .iter()
        .filter_map(|&id| topology.outputs[id.0].tile)
        .collect();
    if tiles.is_empty() {
        return (0, 0);
    }
    let width = tiles
        .iter()
        .filter(|t| t.v_loc == 0)
        .map(|t| t.width)
        .sum();
    let height = tiles
        .iter()
        .filter(|t| t.h_loc == 0)
        .map(|t| t.height)
        .sum();
    (width, height)
}
