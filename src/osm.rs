//! Supplementary building footprints from OpenStreetMap.
//!
//! Footprints are fetched through the Overpass API with `out geom`, which
//! inlines node coordinates into each way. Only closed ways become polygons;
//! nodes, open ways and relations are dropped.

use geo::{Coord, LineString, Polygon};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DsmError, Result};

/// A source of building polygons around a point, in geographic lon/lat.
pub trait SupplementarySource {
    fn fetch(&self, lat: f64, lon: f64, radius_m: f64) -> Result<Vec<Polygon<f64>>>;
}

pub struct OverpassClient {
    client: reqwest::blocking::Client,
    url: String,
}

impl OverpassClient {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(300))
            .user_agent(concat!("building-dsm/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

impl SupplementarySource for OverpassClient {
    fn fetch(&self, lat: f64, lon: f64, radius_m: f64) -> Result<Vec<Polygon<f64>>> {
        let query = building_query(lat, lon, radius_m);
        info!(
            "Querying Overpass for buildings within {} m of ({:.6}, {:.6})",
            radius_m, lat, lon
        );
        debug!("Overpass query: {}", query);

        let response = self
            .client
            .post(&self.url)
            .form(&[("data", query.as_str())])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(DsmError::OverpassStatus(status.as_u16()));
        }

        let polygons = building_polygons(response.json::<OverpassResponse>()?);
        info!("Overpass returned {} building polygons", polygons.len());
        Ok(polygons)
    }
}

pub fn building_query(lat: f64, lon: f64, radius_m: f64) -> String {
    format!(
        "[out:json][timeout:180];\
         (way[\"building\"](around:{radius},{lat},{lon});\
         relation[\"building\"](around:{radius},{lat},{lon}););\
         out geom;",
        radius = radius_m,
        lat = lat,
        lon = lon,
    )
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    #[serde(default)]
    geometry: Vec<Option<LatLon>>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
struct LatLon {
    lat: f64,
    lon: f64,
}

/// Decodes an Overpass JSON body into polygons of closed building ways.
pub fn parse_building_polygons(body: &str) -> Result<Vec<Polygon<f64>>> {
    Ok(building_polygons(serde_json::from_str(body)?))
}

fn building_polygons(response: OverpassResponse) -> Vec<Polygon<f64>> {
    let mut polygons = Vec::new();
    for element in response.elements {
        if element.kind != "way" {
            debug!("Skipping {} {}", element.kind, element.id);
            continue;
        }
        // ways clipped by the query area carry null vertices
        let Some(coords) = element
            .geometry
            .iter()
            .map(|p| p.map(|p| Coord { x: p.lon, y: p.lat }))
            .collect::<Option<Vec<_>>>()
        else {
            continue;
        };

        if coords.len() < 4 || coords.first() != coords.last() {
            debug!("Skipping open way {}", element.id);
            continue;
        }
        polygons.push(Polygon::new(LineString(coords), vec![]));
    }
    polygons
}
