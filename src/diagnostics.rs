//! PNG figures written alongside the DSM for visual inspection.

use geo::{BoundingRect, Contains, Point, Polygon, Rect};
use image::{Rgb, RgbImage, Rgba, RgbaImage};
use std::path::Path;
use tracing::info;

use crate::colormap::terrain_color;
use crate::config::HistogramConfig;
use crate::error::Result;
use crate::model::{Building, ElevationGrid, FootprintSource};

const THUMBNAIL_MAX_DIM: usize = 1024;
const MAP_WIDTH: u32 = 1200;
const HIST_WIDTH: u32 = 600;
const HIST_HEIGHT: u32 = 400;
const HIST_MARGIN: u32 = 40;

/// Terrain-colored rendering of a raster; no-data cells are transparent.
pub fn write_raster_thumbnail(grid: &ElevationGrid, path: &Path) -> Result<()> {
    let step = grid.rows.max(grid.cols).div_ceil(THUMBNAIL_MAX_DIM).max(1);
    let width = grid.cols.div_ceil(step).max(1) as u32;
    let height = grid.rows.div_ceil(step).max(1) as u32;
    let range = grid.valid_range();

    let image = RgbaImage::from_fn(width, height, |x, y| {
        let row = (y as usize * step).min(grid.rows.saturating_sub(1));
        let col = (x as usize * step).min(grid.cols.saturating_sub(1));
        match (range, grid.values.get(grid.index(row, col))) {
            (Some((lo, hi)), Some(&v)) if grid.is_valid(v) => {
                let [r, g, b] = terrain_color(v, lo, hi);
                Rgba([r, g, b, 255])
            }
            _ => Rgba([0, 0, 0, 0]),
        }
    });

    image.save(path)?;
    info!("Written thumbnail: {:?}", path);
    Ok(())
}

/// Counts of heights in `[0, max_height)` over equal-width bins.
pub fn histogram_counts(heights: impl IntoIterator<Item = f64>, config: &HistogramConfig) -> Vec<usize> {
    let bins = config.bins.max(1);
    let mut counts = vec![0usize; bins];
    for h in heights {
        if !(0.0..config.max_height).contains(&h) {
            continue;
        }
        let bin = (h * bins as f64 / config.max_height) as usize;
        counts[bin.min(bins - 1)] += 1;
    }
    counts
}

pub fn write_height_histogram(
    buildings: &[Building],
    config: &HistogramConfig,
    path: &Path,
) -> Result<()> {
    // buildings still lacking a height are plotted at 0 m
    let counts = histogram_counts(buildings.iter().map(|b| b.height.unwrap_or(0.0)), config);
    let peak = counts.iter().copied().max().unwrap_or(0).max(1);

    let mut image = RgbImage::from_pixel(HIST_WIDTH, HIST_HEIGHT, Rgb([255, 255, 255]));
    let plot_w = HIST_WIDTH - 2 * HIST_MARGIN;
    let plot_h = HIST_HEIGHT - 2 * HIST_MARGIN;
    let base = HIST_HEIGHT - HIST_MARGIN;
    let bins = counts.len() as u64;
    let bar_x = |i: usize| HIST_MARGIN + (i as u64 * plot_w as u64 / bins) as u32;

    for (i, &count) in counts.iter().enumerate() {
        let bar_h = (count as f64 / peak as f64 * plot_h as f64).round() as u32;
        let (x0, x1) = (bar_x(i), bar_x(i + 1));
        // one pixel gap between bars wide enough to afford it
        let x1 = if x1 > x0 + 1 { x1 - 1 } else { x0 + 1 };
        for x in x0..x1 {
            for y in base - bar_h..base {
                image.put_pixel(x, y, Rgb([100, 149, 237]));
            }
        }
    }

    for x in HIST_MARGIN..HIST_WIDTH - HIST_MARGIN {
        image.put_pixel(x, base, Rgb([0, 0, 0]));
    }
    for y in HIST_MARGIN..=base {
        image.put_pixel(HIST_MARGIN - 1, y, Rgb([0, 0, 0]));
    }

    image.save(path)?;
    info!("Written height histogram: {:?} (peak bin {})", path, peak);
    Ok(())
}

/// How a footprint got its height, as colored on the footprint map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FootprintClass {
    Original,
    Imputed,
    Missing,
    Supplementary,
}

impl FootprintClass {
    pub fn of(building: &Building) -> Self {
        match (building.source, building.has_height(), building.imputed) {
            (FootprintSource::OpenStreetMap, _, _) => Self::Supplementary,
            (_, false, _) => Self::Missing,
            (_, true, true) => Self::Imputed,
            (_, true, false) => Self::Original,
        }
    }

    pub fn color(self) -> Rgb<u8> {
        match self {
            Self::Original => Rgb([0, 0, 0]),
            Self::Imputed => Rgb([0, 0, 255]),
            Self::Missing => Rgb([255, 0, 0]),
            Self::Supplementary => Rgb([255, 0, 255]),
        }
    }
}

/// Maps world coordinates of `extent` onto a `width` x `height` pixel grid.
struct MapFrame {
    extent: Rect<f64>,
    width: u32,
    height: u32,
}

impl MapFrame {
    fn new(extent: Rect<f64>, width: u32) -> Self {
        let aspect = extent.height() / extent.width().max(f64::EPSILON);
        let height = ((width as f64 * aspect).round() as u32).clamp(1, 4 * width);
        Self {
            extent,
            width,
            height,
        }
    }

    fn pixel_center(&self, px: u32, py: u32) -> Point<f64> {
        let sx = self.extent.width() / self.width as f64;
        let sy = self.extent.height() / self.height as f64;
        Point::new(
            self.extent.min().x + (px as f64 + 0.5) * sx,
            self.extent.max().y - (py as f64 + 0.5) * sy,
        )
    }

    fn pixel_range(&self, rect: &Rect<f64>) -> (u32, u32, u32, u32) {
        let to_px = |x: f64| {
            ((x - self.extent.min().x) / self.extent.width() * self.width as f64)
                .floor()
                .clamp(0.0, self.width as f64 - 1.0) as u32
        };
        let to_py = |y: f64| {
            ((self.extent.max().y - y) / self.extent.height() * self.height as f64)
                .floor()
                .clamp(0.0, self.height as f64 - 1.0) as u32
        };
        (
            to_px(rect.min().x),
            to_px(rect.max().x),
            to_py(rect.max().y),
            to_py(rect.min().y),
        )
    }

    fn fill(&self, image: &mut RgbImage, polygon: &Polygon<f64>, color: Rgb<u8>) {
        let Some(rect) = polygon.bounding_rect() else {
            return;
        };
        let (x0, x1, y0, y1) = self.pixel_range(&rect);
        let mut painted = false;
        for py in y0..=y1 {
            for px in x0..=x1 {
                if polygon.contains(&self.pixel_center(px, py)) {
                    image.put_pixel(px, py, color);
                    painted = true;
                }
            }
        }
        // footprints smaller than a pixel still show up as a dot
        if !painted {
            image.put_pixel(x0, y0, color);
        }
    }
}

/// Footprints over the extent, colored by [`FootprintClass`].
pub fn write_footprint_map(extent: &Rect<f64>, buildings: &[Building], path: &Path) -> Result<()> {
    let frame = MapFrame::new(*extent, MAP_WIDTH);
    let mut image = RgbImage::from_pixel(frame.width, frame.height, Rgb([255, 255, 255]));

    let mut ordered: Vec<(FootprintClass, &Building)> =
        buildings.iter().map(|b| (FootprintClass::of(b), b)).collect();
    ordered.sort_by_key(|(class, _)| *class);

    for (class, building) in ordered {
        frame.fill(&mut image, &building.footprint, class.color());
    }

    image.save(path)?;
    info!("Written footprint map: {:?}", path);
    Ok(())
}
