use geo::{BoundingRect, Contains, Point, Polygon};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::model::{Building, ElevationGrid};

/// Flat indices of the valid cells whose centers lie strictly inside `footprint`.
pub fn footprint_cells(grid: &ElevationGrid, footprint: &Polygon<f64>) -> Vec<usize> {
    let Some(window) = footprint.bounding_rect().and_then(|r| grid.window(&r)) else {
        return Vec::new();
    };

    let mut cells = Vec::new();
    for row in window.row_start..=window.row_end {
        for col in window.col_start..=window.col_end {
            let idx = grid.index(row, col);
            if !grid.is_valid(grid.values[idx]) {
                continue;
            }
            let (x, y) = grid.cell_center(row, col);
            if footprint.contains(&Point::new(x, y)) {
                cells.push(idx);
            }
        }
    }
    cells
}

/// Surface value of one building over its cells.
#[derive(Debug, Clone)]
struct Burn {
    order: usize,
    height: f64,
    value: f32,
    cells: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct RasterizeOutcome {
    pub dsm: ElevationGrid,
    pub burned: usize,
    /// Buildings without a height or without any cell under their footprint.
    pub skipped: usize,
}

/// Burns each building's mean ground elevation plus its height onto a copy of `dem`.
///
/// Ground means always come from the bare DEM. Where footprints overlap the
/// taller building wins; equal heights go to the later building.
pub fn rasterize_buildings(dem: &ElevationGrid, buildings: &[Building]) -> RasterizeOutcome {
    let mut burns: Vec<Burn> = buildings
        .par_iter()
        .enumerate()
        .filter_map(|(order, building)| {
            let height = building.height?;
            let cells = footprint_cells(dem, &building.footprint);
            if cells.is_empty() {
                return None;
            }
            let ground = cells.iter().map(|&c| dem.values[c] as f64).sum::<f64>()
                / cells.len() as f64;
            Some(Burn {
                order,
                height,
                value: (ground + height) as f32,
                cells,
            })
        })
        .collect();

    burns.sort_by(|a, b| a.height.total_cmp(&b.height).then(a.order.cmp(&b.order)));

    let mut dsm = dem.clone();
    for burn in &burns {
        for &c in &burn.cells {
            dsm.values[c] = burn.value;
        }
    }

    let skipped = buildings.len() - burns.len();
    debug!("{} buildings had no height or no cells to burn", skipped);
    info!("Burned {} buildings into the DSM", burns.len());

    RasterizeOutcome {
        dsm,
        burned: burns.len(),
        skipped,
    }
}
