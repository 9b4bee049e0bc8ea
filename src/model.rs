use geo::{BoundingRect, Contains, Geometry, Polygon, Rect};

use crate::error::{DsmError, Result};

/// North-up elevation raster held in memory, row-major.
///
/// Rotation terms of the geo-transform are never read; [`crate::dem::load_dem`]
/// rejects rasters that carry them.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationGrid {
    pub rows: usize,
    pub cols: usize,
    /// GDAL order: `[origin_x, pixel_w, row_rot, origin_y, col_rot, pixel_h]`.
    pub geo_transform: [f64; 6],
    pub values: Vec<f32>,
    pub no_data: Option<f32>,
    /// Coordinate system as WKT (empty when unknown).
    pub crs_wkt: String,
}

/// Inclusive row/column bounds of a sub-window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl Window {
    pub fn rows(&self) -> usize {
        self.row_end - self.row_start + 1
    }

    pub fn cols(&self) -> usize {
        self.col_end - self.col_start + 1
    }
}

impl ElevationGrid {
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.values[self.index(row, col)]
    }

    pub fn is_valid(&self, value: f32) -> bool {
        !value.is_nan() && self.no_data != Some(value)
    }

    pub fn is_north_up(&self) -> bool {
        self.geo_transform[2] == 0.0 && self.geo_transform[4] == 0.0
    }

    pub fn cell_center(&self, row: usize, col: usize) -> (f64, f64) {
        let gt = &self.geo_transform;
        (
            gt[0] + (col as f64 + 0.5) * gt[1],
            gt[3] + (row as f64 + 0.5) * gt[5],
        )
    }

    /// Smallest window holding every cell whose center lies inside `rect`.
    pub fn window(&self, rect: &Rect<f64>) -> Option<Window> {
        let (min, max) = (rect.min(), rect.max());
        let gt = &self.geo_transform;

        let cols: Vec<usize> = (0..self.cols)
            .filter(|&c| {
                let x = gt[0] + (c as f64 + 0.5) * gt[1];
                x >= min.x && x <= max.x
            })
            .collect();
        let rows: Vec<usize> = (0..self.rows)
            .filter(|&r| {
                let y = gt[3] + (r as f64 + 0.5) * gt[5];
                y >= min.y && y <= max.y
            })
            .collect();

        Some(Window {
            row_start: *rows.first()?,
            row_end: *rows.last()?,
            col_start: *cols.first()?,
            col_end: *cols.last()?,
        })
    }

    /// Crops to the cells whose centers fall inside `rect` (raster CRS).
    pub fn crop_to(&self, rect: &Rect<f64>) -> Result<ElevationGrid> {
        let window = self.window(rect).ok_or(DsmError::EmptyWindow)?;

        let mut values = Vec::with_capacity(window.rows() * window.cols());
        for row in window.row_start..=window.row_end {
            let start = self.index(row, window.col_start);
            values.extend_from_slice(&self.values[start..start + window.cols()]);
        }

        let gt = &self.geo_transform;
        let (c, r) = (window.col_start as f64, window.row_start as f64);
        let geo_transform = [gt[0] + c * gt[1], gt[1], 0.0, gt[3] + r * gt[5], 0.0, gt[5]];

        Ok(ElevationGrid {
            rows: window.rows(),
            cols: window.cols(),
            geo_transform,
            values,
            no_data: self.no_data,
            crs_wkt: self.crs_wkt.clone(),
        })
    }

    /// Raster footprint as a rectangle in its own CRS.
    pub fn bounds(&self) -> Rect<f64> {
        let gt = &self.geo_transform;
        let x1 = gt[0] + self.cols as f64 * gt[1];
        let y1 = gt[3] + self.rows as f64 * gt[5];
        Rect::new((gt[0], gt[3]), (x1, y1))
    }

    pub fn valid_range(&self) -> Option<(f32, f32)> {
        self.values
            .iter()
            .copied()
            .filter(|&v| self.is_valid(v))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Area of interest, reduced to its rectangular envelope.
#[derive(Debug, Clone)]
pub struct Extent {
    pub polygon: Polygon<f64>,
    pub crs_wkt: String,
}

impl Extent {
    pub fn from_geometry(geometry: &Geometry<f64>, crs_wkt: String) -> Result<Self> {
        let rect = geometry
            .bounding_rect()
            .ok_or_else(|| DsmError::UnsupportedGeometry("empty extent geometry".to_string()))?;
        Ok(Self {
            polygon: rect.to_polygon(),
            crs_wkt,
        })
    }

    pub fn envelope(&self) -> Rect<f64> {
        // always built from a rect, so never empty
        self.polygon
            .bounding_rect()
            .unwrap_or_else(|| Rect::new((0.0, 0.0), (0.0, 0.0)))
    }

    pub fn contains(&self, footprint: &Polygon<f64>) -> bool {
        self.polygon.contains(footprint)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FootprintSource {
    Municipal,
    OpenStreetMap,
}

#[derive(Debug, Clone)]
pub struct Building {
    pub footprint: Polygon<f64>,
    /// Height attribute as stored in the footprint file (feet).
    pub raw_height: Option<f64>,
    pub category: Option<String>,
    /// Height in meters; `None` while unknown.
    pub height: Option<f64>,
    pub imputed: bool,
    /// Standard deviation of the category the height was imputed from.
    pub std_dev: Option<f64>,
    pub source: FootprintSource,
}

impl Building {
    /// A record from the municipal footprint file. Non-positive heights count as missing.
    pub fn municipal(
        footprint: Polygon<f64>,
        raw_height: Option<f64>,
        category: Option<String>,
        unit_factor: f64,
    ) -> Self {
        let height = raw_height
            .filter(|h| *h > 0.0)
            .map(|h| crate::footprints::feet_to_meters(h, unit_factor));
        Self {
            footprint,
            raw_height,
            category,
            height,
            imputed: false,
            std_dev: None,
            source: FootprintSource::Municipal,
        }
    }

    /// A footprint only present in the supplementary source.
    pub fn supplementary(footprint: Polygon<f64>) -> Self {
        Self {
            footprint,
            raw_height: None,
            category: None,
            height: None,
            imputed: true,
            std_dev: None,
            source: FootprintSource::OpenStreetMap,
        }
    }

    pub fn has_height(&self) -> bool {
        self.height.is_some()
    }
}

/// Flattens any geometry into its member polygons; other kinds are dropped.
pub fn polygons_of(geometry: Geometry<f64>) -> Vec<Polygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => vec![p],
        Geometry::MultiPolygon(mp) => mp.0,
        Geometry::Rect(r) => vec![r.to_polygon()],
        Geometry::GeometryCollection(gc) => gc.0.into_iter().flat_map(polygons_of).collect(),
        _ => Vec::new(),
    }
}
