//! Height imputation for buildings lacking a height.
//!
//! Strategies run in order over the same building slice; each only fills
//! heights that are still missing, so known heights are never overwritten.
//! Geometric strategies read the `metric` footprints, a slice parallel to the
//! buildings holding their footprints in a projected CRS.

use geo::Polygon;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::error::{DsmError, Result};
use crate::model::Building;
use crate::spatial::FootprintIndex;

pub trait ImputationStrategy {
    fn name(&self) -> &'static str;

    /// Fills missing heights, returning how many were filled.
    fn impute(&self, buildings: &mut [Building], metric: &[Polygon<f64>]) -> usize;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImputationReport {
    pub strategy: &'static str,
    pub imputed: usize,
    pub remaining: usize,
}

pub fn count_missing(buildings: &[Building]) -> usize {
    buildings.iter().filter(|b| !b.has_height()).count()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryStats {
    pub mean: f64,
    /// Sample standard deviation; `None` for single-building categories.
    pub std_dev: Option<f64>,
    pub count: usize,
}

/// Mean and standard deviation of known heights per category.
pub fn category_stats(buildings: &[Building]) -> BTreeMap<String, CategoryStats> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for b in buildings {
        if let (Some(category), Some(height)) = (&b.category, b.height) {
            groups.entry(category.clone()).or_default().push(height);
        }
    }

    groups
        .into_iter()
        .map(|(category, heights)| {
            let n = heights.len() as f64;
            let mean = heights.iter().sum::<f64>() / n;
            let std_dev = (heights.len() > 1).then(|| {
                let ss: f64 = heights.iter().map(|h| (h - mean).powi(2)).sum();
                (ss / (n - 1.0)).sqrt()
            });
            (
                category,
                CategoryStats {
                    mean,
                    std_dev,
                    count: heights.len(),
                },
            )
        })
        .collect()
}

/// Assigns the category mean to buildings of a known category.
#[derive(Debug, Default, Clone, Copy)]
pub struct CategoryMean;

impl ImputationStrategy for CategoryMean {
    fn name(&self) -> &'static str {
        "category mean"
    }

    fn impute(&self, buildings: &mut [Building], _metric: &[Polygon<f64>]) -> usize {
        let stats = category_stats(buildings);
        let mut imputed = 0;

        for b in buildings.iter_mut().filter(|b| !b.has_height()) {
            let Some(s) = b.category.as_ref().and_then(|c| stats.get(c)) else {
                continue;
            };
            b.height = Some(s.mean);
            b.std_dev = s.std_dev;
            b.imputed = true;
            imputed += 1;
        }
        imputed
    }
}

/// Copies the height of the closest building that has one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NearestNeighbor;

impl ImputationStrategy for NearestNeighbor {
    fn name(&self) -> &'static str {
        "nearest neighbor"
    }

    fn impute(&self, buildings: &mut [Building], metric: &[Polygon<f64>]) -> usize {
        let known = buildings
            .iter()
            .enumerate()
            .filter(|(_, b)| b.has_height())
            .map(|(i, _)| i);
        let index = FootprintIndex::new(metric, known);

        // resolve every neighbor first so heights filled here never feed later lookups
        let assignments: Vec<(usize, f64)> = buildings
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.has_height())
            .filter_map(|(i, _)| {
                let (neighbor, _) = index.nearest(&metric[i], None)?;
                Some((i, buildings[neighbor].height?))
            })
            .collect();

        for &(i, height) in &assignments {
            buildings[i].height = Some(height);
            buildings[i].imputed = true;
        }
        assignments.len()
    }
}

/// Ordered list of imputation strategies.
pub struct ImputationPlan {
    strategies: Vec<Box<dyn ImputationStrategy>>,
}

impl Default for ImputationPlan {
    fn default() -> Self {
        Self::new(vec![Box::new(CategoryMean), Box::new(NearestNeighbor)])
    }
}

impl ImputationPlan {
    pub fn new(strategies: Vec<Box<dyn ImputationStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn run(
        &self,
        buildings: &mut [Building],
        metric: &[Polygon<f64>],
    ) -> Result<Vec<ImputationReport>> {
        if buildings.len() != metric.len() {
            return Err(DsmError::FootprintCountMismatch {
                buildings: buildings.len(),
                footprints: metric.len(),
            });
        }

        let mut reports = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            let imputed = strategy.impute(buildings, metric);
            let remaining = count_missing(buildings);
            info!(
                "Imputed {} heights by {}; {} buildings lack height data",
                imputed,
                strategy.name(),
                remaining
            );
            reports.push(ImputationReport {
                strategy: strategy.name(),
                imputed,
                remaining,
            });
        }

        if let Some(last) = reports.last() {
            if last.remaining > 0 && self.strategies.len() > 1 {
                warn!("{} buildings remain without a height", last.remaining);
            }
        }
        Ok(reports)
    }
}

/// Indices of supplementary footprints missing from the primary set.
///
/// A supplementary footprint is considered already present when its nearest
/// primary footprint within `max_distance` lies at distance zero (touching or
/// overlapping). Everything else is returned, including footprints with no
/// primary neighbor in range.
pub fn select_missing_footprints(
    supplementary: &[Polygon<f64>],
    primary: &[Polygon<f64>],
    max_distance: f64,
) -> Vec<usize> {
    let index = FootprintIndex::new(primary, 0..primary.len());

    supplementary
        .iter()
        .enumerate()
        .filter(|(_, footprint)| {
            !matches!(index.nearest(footprint, Some(max_distance)), Some((_, d)) if d == 0.0)
        })
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FootprintSource;
    use crate::test_util::{building, square};

    fn metric(buildings: &[Building]) -> Vec<Polygon<f64>> {
        buildings.iter().map(|b| b.footprint.clone()).collect()
    }

    #[test]
    fn test_category_stats_mean_and_sample_std() {
        let buildings = vec![
            building(square(0.0, 0.0, 1.0), Some(4.0), Some("res")),
            building(square(2.0, 0.0, 1.0), Some(8.0), Some("res")),
            building(square(4.0, 0.0, 1.0), Some(10.0), Some("shop")),
            building(square(6.0, 0.0, 1.0), None, Some("res")),
        ];
        let stats = category_stats(&buildings);

        let res = stats["res"];
        assert_eq!(res.mean, 6.0);
        assert_eq!(res.count, 2);
        assert!((res.std_dev.unwrap() - 8f64.sqrt()).abs() < 1e-12);
        assert_eq!(stats["shop"].std_dev, None);
    }

    #[test]
    fn test_category_mean_fills_known_categories_only() {
        let mut buildings = vec![
            building(square(0.0, 0.0, 1.0), Some(4.0), Some("res")),
            building(square(2.0, 0.0, 1.0), Some(8.0), Some("res")),
            building(square(4.0, 0.0, 1.0), None, Some("res")),
            building(square(6.0, 0.0, 1.0), None, Some("barn")),
            building(square(8.0, 0.0, 1.0), None, None),
        ];
        let m = metric(&buildings);

        let imputed = CategoryMean.impute(&mut buildings, &m);

        assert_eq!(imputed, 1);
        assert_eq!(buildings[2].height, Some(6.0));
        assert!(buildings[2].imputed);
        assert!(buildings[2].std_dev.is_some());
        assert_eq!(buildings[3].height, None);
        assert_eq!(buildings[4].height, None);
        // known heights untouched
        assert_eq!(buildings[0].height, Some(4.0));
        assert!(!buildings[0].imputed);
    }

    #[test]
    fn test_nearest_neighbor_copies_closest_known_height() {
        let mut buildings = vec![
            building(square(0.0, 0.0, 1.0), Some(3.0), None),
            building(square(100.0, 0.0, 1.0), Some(12.0), None),
            building(square(2.0, 0.0, 1.0), None, None),
            building(square(97.0, 0.0, 1.0), None, None),
        ];
        let m = metric(&buildings);

        let imputed = NearestNeighbor.impute(&mut buildings, &m);

        assert_eq!(imputed, 2);
        assert_eq!(buildings[2].height, Some(3.0));
        assert_eq!(buildings[3].height, Some(12.0));
        assert_eq!(count_missing(&buildings), 0);
    }

    #[test]
    fn test_nearest_neighbor_without_known_heights_is_noop() {
        let mut buildings = vec![
            building(square(0.0, 0.0, 1.0), None, None),
            building(square(2.0, 0.0, 1.0), None, None),
        ];
        let m = metric(&buildings);
        assert_eq!(NearestNeighbor.impute(&mut buildings, &m), 0);
        assert_eq!(count_missing(&buildings), 2);
    }

    #[test]
    fn test_default_plan_leaves_no_missing_heights() {
        let mut buildings = vec![
            building(square(0.0, 0.0, 1.0), Some(5.0), Some("res")),
            building(square(2.0, 0.0, 1.0), None, Some("res")),
            building(square(4.0, 0.0, 1.0), None, Some("unknown")),
            Building::supplementary(square(50.0, 0.0, 1.0)),
        ];
        let m = metric(&buildings);

        let reports = ImputationPlan::default().run(&mut buildings, &m).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].strategy, "category mean");
        assert_eq!(reports[0].imputed, 1);
        assert_eq!(reports[1].imputed, 2);
        assert_eq!(reports[1].remaining, 0);
        assert!(buildings.iter().all(|b| b.has_height()));
        assert_eq!(buildings[3].source, FootprintSource::OpenStreetMap);
    }

    #[test]
    fn test_plan_rejects_unpaired_metric_footprints() {
        let mut buildings = vec![
            building(square(0.0, 0.0, 1.0), Some(5.0), None),
            building(square(2.0, 0.0, 1.0), None, None),
        ];
        let m = vec![square(0.0, 0.0, 1.0)];

        let err = ImputationPlan::default().run(&mut buildings, &m).unwrap_err();

        assert!(matches!(
            err,
            DsmError::FootprintCountMismatch {
                buildings: 2,
                footprints: 1
            }
        ));
        assert_eq!(buildings[1].height, None);
    }

    #[test]
    fn test_select_missing_drops_only_coincident_footprints() {
        let primary = vec![square(0.0, 0.0, 10.0), square(100.0, 0.0, 10.0)];
        let supplementary = vec![
            square(1.0, 1.0, 5.0),     // overlaps a primary footprint
            square(20.0, 0.0, 5.0),    // 10 m away: near duplicate still added
            square(5000.0, 0.0, 10.0), // nothing within range
        ];

        let selected = select_missing_footprints(&supplementary, &primary, 300.0);
        assert_eq!(selected, vec![1, 2]);
    }
}
