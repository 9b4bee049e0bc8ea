use geo::{BoundingRect, EuclideanDistance, Polygon};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{Envelope, RTree, AABB};

type Entry = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// R-tree over footprint envelopes answering exact polygon-to-polygon nearest queries.
pub struct FootprintIndex<'a> {
    polygons: &'a [Polygon<f64>],
    tree: RTree<Entry>,
}

impl<'a> FootprintIndex<'a> {
    /// Indexes `polygons[i]` for every `i` in `members`.
    pub fn new(polygons: &'a [Polygon<f64>], members: impl IntoIterator<Item = usize>) -> Self {
        let entries = members
            .into_iter()
            .filter_map(|i| {
                let rect = polygons[i].bounding_rect()?;
                let (min, max) = (rect.min(), rect.max());
                Some(GeomWithData::new(
                    Rectangle::from_corners([min.x, min.y], [max.x, max.y]),
                    i,
                ))
            })
            .collect();
        Self {
            polygons,
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Nearest indexed polygon and its distance (`0` when touching or overlapping).
    ///
    /// Equal distances resolve to the lowest index. With `max_distance`, only
    /// polygons at most that far away are considered.
    pub fn nearest(&self, query: &Polygon<f64>, max_distance: Option<f64>) -> Option<(usize, f64)> {
        if self.is_empty() {
            return None;
        }
        let rect = query.bounding_rect()?;
        let (min, max) = (rect.min(), rect.max());
        let all = self.tree.root().envelope();

        // Any polygon within `radius` has an envelope intersecting the query
        // envelope grown by `radius`, so the search widens until the best
        // candidate is no farther than the current radius.
        let diagonal = ((max.x - min.x).powi(2) + (max.y - min.y).powi(2)).sqrt();
        let mut radius = (diagonal * 0.5).max(1.0);
        if let Some(limit) = max_distance {
            radius = radius.min(limit);
        }

        loop {
            let search = AABB::from_corners(
                [min.x - radius, min.y - radius],
                [max.x + radius, max.y + radius],
            );

            let best = self
                .tree
                .locate_in_envelope_intersecting(&search)
                .map(|entry| (entry.data, query.euclidean_distance(&self.polygons[entry.data])))
                .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

            if let Some((_, d)) = best {
                if d <= radius {
                    return best.filter(|(_, d)| max_distance.map_or(true, |m| *d <= m));
                }
            }

            let exhausted = search.contains_envelope(&all);
            match max_distance {
                Some(limit) if radius >= limit => return None,
                _ if exhausted => {
                    return best.filter(|(_, d)| max_distance.map_or(true, |m| *d <= m))
                }
                _ => {}
            }

            radius *= 2.0;
            if let Some(limit) = max_distance {
                radius = radius.min(limit);
            }
        }
    }
}
