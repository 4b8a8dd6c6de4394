use std::collections::{BTreeMap, BTreeSet};

use aabb_quadtree::QuadTree;
use geo::prelude::ClosestPoint;

use crate::{Bounds, Distance, Pt2D};

/// A quadtree-backed index answering "closest point on any indexed polyline" queries.
pub struct FindClosest<K> {
    // TODO maybe any type of geo:: thing
    geometries: BTreeMap<K, geo::LineString>,
    quadtree: QuadTree<K>,
}

impl<K> FindClosest<K>
where
    K: Clone + Ord + std::fmt::Debug,
{
    /// `bounds` must cover all geometries that'll be added, padded by the largest query distance.
    pub fn new(bounds: &Bounds) -> FindClosest<K> {
        FindClosest {
            geometries: BTreeMap::new(),
            quadtree: QuadTree::default(bounds.as_bbox()),
        }
    }

    pub fn add(&mut self, key: K, pts: &[Pt2D]) {
        let geometry: geo::LineString = pts
            .iter()
            .map(|pt| geo::Coord {
                x: pt.x(),
                y: pt.y(),
            })
            .collect::<Vec<_>>()
            .into();
        self.geometries.insert(key.clone(), geometry);
        // Zero-area bboxes confuse the quadtree
        let bbox = Bounds::from(pts).pad(Distance::meters(0.01)).as_bbox();
        self.quadtree.insert_with_box(key, bbox);
    }

    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }

    /// Finds the closest point on any geometry within `max_dist` of the query point. Ties break
    /// by key order, so results are deterministic.
    pub fn closest_pt(&self, query: Pt2D, max_dist: Distance) -> Option<(K, Pt2D)> {
        let query_bbox = Bounds::from(&[query]).pad(max_dist).as_bbox();
        let mut candidates: BTreeSet<K> = BTreeSet::new();
        for (key, _, _) in self.quadtree.query(query_bbox) {
            candidates.insert(key.clone());
        }

        let mut best: Option<(K, Pt2D, Distance)> = None;
        for key in candidates {
            let hit = match self.geometries[&key].closest_point(&geo::Point::new(query.x(), query.y()))
            {
                geo::Closest::Intersection(hit) | geo::Closest::SinglePoint(hit) => {
                    Pt2D::new(hit.x(), hit.y())
                }
                geo::Closest::Indeterminate => {
                    continue;
                }
            };
            let dist = query.dist_to(hit);
            if dist > max_dist {
                continue;
            }
            if best.as_ref().map(|(_, _, d)| dist < *d).unwrap_or(true) {
                best = Some((key, hit, dist));
            }
        }
        best.map(|(key, hit, _)| (key, hit))
    }

    /// Just the distance to the closest geometry, if any is within `max_dist`.
    pub fn closest_dist(&self, query: Pt2D, max_dist: Distance) -> Option<Distance> {
        self.closest_pt(query, max_dist)
            .map(|(_, hit)| query.dist_to(hit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_nearest() {
        let mut bounds = Bounds::new();
        bounds.update(Pt2D::new(0.0, 0.0));
        bounds.update(Pt2D::new(100.0, 100.0));
        let mut closest: FindClosest<usize> = FindClosest::new(&bounds.pad(Distance::meters(10.0)));
        closest.add(1, &[Pt2D::new(0.0, 0.0), Pt2D::new(100.0, 0.0)]);
        closest.add(2, &[Pt2D::new(0.0, 10.0), Pt2D::new(100.0, 10.0)]);

        let (key, hit) = closest
            .closest_pt(Pt2D::new(50.0, 4.0), Distance::meters(50.0))
            .unwrap();
        assert_eq!(key, 1);
        assert_eq!(hit, Pt2D::new(50.0, 0.0));

        assert!(closest
            .closest_pt(Pt2D::new(50.0, 50.0), Distance::meters(5.0))
            .is_none());
    }
}
