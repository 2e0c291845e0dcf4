//! Nearest/furthest selection by planar distance

use glam::Vec3;
use ordered_float::OrderedFloat;

use crate::core::types::{planar_distance_squared, EntityId};

/// Candidates paired with their squared planar distance to `origin`, in
/// ascending order. A candidate listed twice is kept once; equal distances
/// keep their encounter order.
///
/// Ties are kept on purpose: several units standing on the same spot must
/// all stay eligible, so only repeated ids are dropped, never equal distances.
pub fn by_distance(
    origin: Vec3,
    candidates: impl IntoIterator<Item = (EntityId, Vec3)>,
) -> Vec<(EntityId, f32)> {
    let mut ranked: Vec<(EntityId, f32)> = Vec::new();
    for (id, position) in candidates {
        if ranked.iter().any(|(seen, _)| *seen == id) {
            continue;
        }
        ranked.push((id, planar_distance_squared(origin, position)));
    }
    ranked.sort_by_key(|(_, d)| OrderedFloat(*d));
    ranked
}

/// The `n` candidates closest to `origin`, closest first
pub fn closest(
    origin: Vec3,
    candidates: impl IntoIterator<Item = (EntityId, Vec3)>,
    n: usize,
) -> Vec<EntityId> {
    by_distance(origin, candidates)
        .into_iter()
        .take(n)
        .map(|(id, _)| id)
        .collect()
}

/// The `n` candidates furthest from `origin`, furthest first
pub fn furthest(
    origin: Vec3,
    candidates: impl IntoIterator<Item = (EntityId, Vec3)>,
    n: usize,
) -> Vec<EntityId> {
    by_distance(origin, candidates)
        .into_iter()
        .rev()
        .take(n)
        .map(|(id, _)| id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(id: u64, x: f32, z: f32) -> (EntityId, Vec3) {
        (EntityId(id), Vec3::new(x, 0.0, z))
    }

    #[test]
    fn test_closest_ignores_height() {
        let candidates = vec![
            (EntityId(1), Vec3::new(5.0, 100.0, 0.0)),
            at(2, 6.0, 0.0),
            at(3, 1.0, 1.0),
        ];
        assert_eq!(
            closest(Vec3::ZERO, candidates, 2),
            vec![EntityId(3), EntityId(1)]
        );
    }

    #[test]
    fn test_furthest_descending() {
        let candidates = vec![at(1, 1.0, 0.0), at(2, 9.0, 0.0), at(3, 4.0, 0.0)];
        assert_eq!(
            furthest(Vec3::ZERO, candidates, 2),
            vec![EntityId(2), EntityId(3)]
        );
    }

    #[test]
    fn test_ties_keep_encounter_order() {
        let candidates = vec![at(4, 0.0, 0.0), at(2, 0.0, 0.0), at(9, 0.0, 0.0)];
        assert_eq!(
            closest(Vec3::ZERO, candidates, 3),
            vec![EntityId(4), EntityId(2), EntityId(9)]
        );
    }

    #[test]
    fn test_duplicate_candidates_counted_once() {
        let candidates = vec![at(1, 1.0, 0.0), at(1, 1.0, 0.0), at(2, 2.0, 0.0)];
        assert_eq!(by_distance(Vec3::ZERO, candidates).len(), 2);
    }

    #[test]
    fn test_n_larger_than_pool() {
        let candidates = vec![at(1, 1.0, 0.0)];
        assert_eq!(closest(Vec3::ZERO, candidates, 5), vec![EntityId(1)]);
    }
}
