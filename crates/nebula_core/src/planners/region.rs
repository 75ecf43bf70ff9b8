//! Region partitioning: groups star systems into `k` regions by k-means over
//! galaxy position. Centroids are seeded by k-means++ (distance-squared
//! weighted) from a caller-supplied RNG, so the partition is reproducible
//! for a given seed but not an artifact of system id order. Empty clusters
//! that result from a refinement pass steal the point farthest from its
//! current center rather than sitting empty.

use std::collections::BTreeMap;

use rand::Rng;

use crate::id::Id;
use crate::state::StarSystem;
use crate::vec2::Vec2;

const MAX_ITERATIONS: u32 = 25;
const WEIGHT_EPS: f64 = 1e-9;

fn nearest_center_idx(point: Vec2, centers: &[Vec2]) -> usize {
    centers
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| point.sub(**a).length_sq().total_cmp(&point.sub(**b).length_sq()))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn kmeans_plus_plus_init(points: &[Vec2], k: usize, rng: &mut impl Rng) -> Vec<Vec2> {
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.gen_range(0..points.len())]);

    while centers.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|&p| p.sub(centers[nearest_center_idx(p, &centers)]).length_sq().max(0.0))
            .collect();
        let sum: f64 = weights.iter().sum();

        if sum <= WEIGHT_EPS {
            centers.push(points[rng.gen_range(0..points.len())]);
            continue;
        }

        let pick = rng.gen_range(0.0..sum);
        let mut acc = 0.0;
        let mut chosen = points.len() - 1;
        for (i, &w) in weights.iter().enumerate() {
            acc += w;
            if acc + 1e-12 >= pick {
                chosen = i;
                break;
            }
        }
        centers.push(points[chosen]);
    }
    centers
}

pub fn partition_into_regions(systems: &BTreeMap<Id, StarSystem>, k: usize, rng: &mut impl Rng) -> BTreeMap<Id, usize> {
    let ids: Vec<Id> = systems.keys().copied().collect();
    if ids.is_empty() || k == 0 {
        return BTreeMap::new();
    }
    let k = k.min(ids.len());
    let points: Vec<Vec2> = ids.iter().map(|id| systems[id].galaxy_pos).collect();

    let mut centroids = kmeans_plus_plus_init(&points, k, rng);
    let mut cluster_of: Vec<usize> = vec![usize::MAX; points.len()];

    for _ in 0..MAX_ITERATIONS {
        let mut changed = false;
        for (i, &p) in points.iter().enumerate() {
            let best = nearest_center_idx(p, &centroids);
            if cluster_of[i] != best {
                cluster_of[i] = best;
                changed = true;
            }
        }

        let mut sums = vec![Vec2::ZERO; k];
        let mut counts = vec![0usize; k];
        for (i, &p) in points.iter().enumerate() {
            sums[cluster_of[i]] = sums[cluster_of[i]].add(p);
            counts[cluster_of[i]] += 1;
        }

        // Empty clusters steal the point farthest from its current center,
        // instead of keeping a centroid with nothing assigned to it.
        for c in 0..k {
            if counts[c] > 0 {
                continue;
            }
            let far_i = (0..points.len())
                .max_by(|&a, &b| {
                    let da = points[a].sub(centroids[cluster_of[a]]).length_sq();
                    let db = points[b].sub(centroids[cluster_of[b]]).length_sq();
                    da.total_cmp(&db)
                })
                .unwrap();
            cluster_of[far_i] = c;
            centroids[c] = points[far_i];
            sums[c] = points[far_i];
            counts[c] = 1;
            changed = true;
        }

        for c in 0..k {
            if counts[c] > 0 {
                centroids[c] = sums[c].scale(1.0 / counts[c] as f64);
            }
        }

        if !changed {
            break;
        }
    }

    ids.into_iter().zip(cluster_of).collect()
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    fn sys(id: u64, x: f64, y: f64) -> StarSystem {
        StarSystem {
            id: Id(id),
            name: format!("s{id}"),
            galaxy_pos: Vec2::new(x, y),
            bodies: Vec::new(),
            ships: Vec::new(),
            jump_points: Vec::new(),
            region_id: Id::INVALID,
            nebula_density: 0.0,
        }
    }

    #[test]
    fn two_distant_clusters_separate() {
        let mut systems = BTreeMap::new();
        systems.insert(Id(1), sys(1, 0.0, 0.0));
        systems.insert(Id(2), sys(2, 1.0, 0.0));
        systems.insert(Id(3), sys(3, 1000.0, 0.0));
        systems.insert(Id(4), sys(4, 1001.0, 0.0));

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let assignment = partition_into_regions(&systems, 2, &mut rng);
        assert_eq!(assignment[&Id(1)], assignment[&Id(2)]);
        assert_eq!(assignment[&Id(3)], assignment[&Id(4)]);
        assert_ne!(assignment[&Id(1)], assignment[&Id(3)]);
    }

    #[test]
    fn same_seed_gives_same_partition() {
        let mut systems = BTreeMap::new();
        systems.insert(Id(1), sys(1, 0.0, 0.0));
        systems.insert(Id(2), sys(2, 5.0, 0.0));
        systems.insert(Id(3), sys(3, 500.0, 0.0));
        systems.insert(Id(4), sys(4, 505.0, 10.0));
        systems.insert(Id(5), sys(5, 250.0, 250.0));

        let mut rng1 = ChaCha8Rng::seed_from_u64(42);
        let a = partition_into_regions(&systems, 3, &mut rng1);
        let mut rng2 = ChaCha8Rng::seed_from_u64(42);
        let b = partition_into_regions(&systems, 3, &mut rng2);
        assert_eq!(a, b);
    }

    #[test]
    fn every_system_gets_assigned_even_with_more_clusters_than_natural_groups() {
        let mut systems = BTreeMap::new();
        systems.insert(Id(1), sys(1, 0.0, 0.0));
        systems.insert(Id(2), sys(2, 0.0, 0.0));
        systems.insert(Id(3), sys(3, 0.0, 0.0));

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let assignment = partition_into_regions(&systems, 3, &mut rng);
        assert_eq!(assignment.len(), 3);
    }
}
