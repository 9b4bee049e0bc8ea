use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use geo::{BoundingRect, Coord, LineString, Point, Polygon, Rect};

use crate::error::{DsmError, Result};

/// Builds a spatial reference from an EPSG code, WKT or PROJ string, in x/y (lon/lat) order.
pub fn spatial_ref(definition: &str) -> Result<SpatialRef> {
    let mut srs = SpatialRef::from_definition(definition)?;
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

/// Moves geometries between two coordinate systems.
pub struct Reprojector {
    transform: Option<CoordTransform>,
}

impl Reprojector {
    pub fn new(source: &str, target: &str) -> Result<Self> {
        let source = spatial_ref(source)?;
        let target = spatial_ref(target)?;
        if source == target {
            return Ok(Self::identity());
        }
        let transform = CoordTransform::new(&source, &target)?;
        Ok(Self {
            transform: Some(transform),
        })
    }

    pub fn identity() -> Self {
        Self { transform: None }
    }

    pub fn is_identity(&self) -> bool {
        self.transform.is_none()
    }

    fn transform_coords(&self, coords: &[Coord<f64>]) -> Result<Vec<Coord<f64>>> {
        let Some(transform) = &self.transform else {
            return Ok(coords.to_vec());
        };

        let mut xs: Vec<f64> = coords.iter().map(|c| c.x).collect();
        let mut ys: Vec<f64> = coords.iter().map(|c| c.y).collect();
        let mut zs = vec![0.0; coords.len()];
        transform
            .transform_coords(&mut xs, &mut ys, &mut zs)
            .map_err(|e| DsmError::Projection(e.to_string()))?;

        Ok(xs
            .into_iter()
            .zip(ys)
            .map(|(x, y)| Coord { x, y })
            .collect())
    }

    pub fn point(&self, point: Point<f64>) -> Result<Point<f64>> {
        let coords = self.transform_coords(&[point.0])?;
        Ok(Point(coords[0]))
    }

    pub fn polygon(&self, polygon: &Polygon<f64>) -> Result<Polygon<f64>> {
        if self.is_identity() {
            return Ok(polygon.clone());
        }
        let exterior = LineString(self.transform_coords(&polygon.exterior().0)?);
        let interiors = polygon
            .interiors()
            .iter()
            .map(|ring| self.transform_coords(&ring.0).map(LineString))
            .collect::<Result<Vec<_>>>()?;
        Ok(Polygon::new(exterior, interiors))
    }

    pub fn polygons(&self, polygons: &[Polygon<f64>]) -> Result<Vec<Polygon<f64>>> {
        polygons.iter().map(|p| self.polygon(p)).collect()
    }

    /// Bounding rectangle of the transformed corners.
    pub fn rect(&self, rect: &Rect<f64>) -> Result<Rect<f64>> {
        let polygon = self.polygon(&rect.to_polygon())?;
        polygon
            .bounding_rect()
            .ok_or_else(|| DsmError::Projection("rectangle collapsed".to_string()))
    }
}
