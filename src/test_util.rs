use geo::{polygon, Polygon};

use crate::model::{Building, ElevationGrid};

/// Grid of `rows` x `cols` unit cells whose lower-left corner sits at the origin.
pub fn flat_grid(rows: usize, cols: usize, value: f32) -> ElevationGrid {
    ElevationGrid {
        rows,
        cols,
        geo_transform: [0.0, 1.0, 0.0, rows as f64, 0.0, -1.0],
        values: vec![value; rows * cols],
        no_data: Some(-9999.0),
        crs_wkt: String::new(),
    }
}

pub fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
    polygon![
        (x: x, y: y),
        (x: x + size, y: y),
        (x: x + size, y: y + size),
        (x: x, y: y + size),
    ]
}

pub fn building(footprint: Polygon<f64>, height_m: Option<f64>, category: Option<&str>) -> Building {
    let mut b = Building::municipal(footprint, None, category.map(str::to_string), 1.0);
    b.height = height_m;
    b
}
