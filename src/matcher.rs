use geo::{EuclideanDistance, Point};

use crate::overpass::ExistingNode;

// degree-space, fine at a 20m radius. ties go to the earlier candidate
pub fn select_closest(target: Point, candidates: &[ExistingNode]) -> Option<&ExistingNode> {
    candidates.iter().min_by(|a, b| {
        target
            .euclidean_distance(&a.point)
            .total_cmp(&target.euclidean_distance(&b.point))
    })
}
