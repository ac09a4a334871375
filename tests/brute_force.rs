use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vptree::{
    Euclidean, Metric, Neighbors, PointStore, VantageSelection, VpTree, VpTreeConfig,
};

fn random_points(n: usize, dim: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.random::<f64>()).collect())
        .collect()
}

/// Sort every point by (distance, index) and keep the first `k`.
fn naive<M: Metric<f64>>(points: &[Vec<f64>], metric: &M, query: &[f64], k: usize) -> Neighbors<f64> {
    let mut all: Vec<(f64, usize)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (metric.distance(query, p), i))
        .collect();
    all.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)));
    all.truncate(k);
    Neighbors {
        distances: all.iter().map(|x| x.0).collect(),
        indices: all.iter().map(|x| x.1).collect(),
    }
}

#[test]
fn simple_case() {
    let points = vec![
        vec![0.0, 0.0, 1.0],
        vec![1.0, 1.0, 1.0],
        vec![2.0, 0.0, 0.0],
        vec![-1.0, -1.0, 0.0],
        vec![10.0, 0.0, 5.0],
    ];
    let tree = VpTree::<f64>::new(&points).unwrap();

    let (distances, indices) = tree.nearest_neighbors(&[0.0, 0.0, 0.0], 3).unwrap().into_parts();
    assert_eq!(distances.len(), 3);
    assert_eq!(indices.len(), 3);

    assert_eq!(indices[0], 0);
    assert_eq!(distances[0], 1.0);

    assert_eq!(indices[1], 3);
    assert_eq!(distances[1], 2f64.sqrt());

    assert_eq!(indices[2], 1);
    assert_eq!(distances[2], 3f64.sqrt());
}

const REFERENCE: [[f64; 3]; 5] = [
    [0.0, 1.0, 2.0],
    [2.0, 2.0, 2.0],
    [3.5, 0.0, -1.0],
    [0.0, 0.0, 0.5],
    [-0.5, -0.5, 0.5],
];

#[test]
fn reference_query_double() {
    let tree = VpTree::<f64>::new(&REFERENCE).unwrap();
    let nn = tree.nearest_neighbors(&[0.0, 0.0, 0.5], 3).unwrap();
    assert_eq!(nn.distances, vec![0.0, 0.5f64.sqrt(), 3.25f64.sqrt()]);
    assert_eq!(nn.indices, vec![3, 4, 0]);
}

#[test]
fn reference_query_single() {
    let rows: Vec<[f32; 3]> = REFERENCE
        .iter()
        .map(|p| [p[0] as f32, p[1] as f32, p[2] as f32])
        .collect();
    let tree = VpTree::<f32>::new(&rows).unwrap();
    let nn = tree.nearest_neighbors(&[0.0, 0.0, 0.5], 3).unwrap();
    assert_eq!(nn.distances, vec![0.0, 0.5f32.sqrt(), 3.25f32.sqrt()]);
    assert_eq!(nn.indices, vec![3, 4, 0]);

    // f32 input in an f64 tree
    let widened = VpTree::<f64>::new(&rows).unwrap();
    let nn = widened.nearest_neighbors(&[0.0, 0.0, 0.5], 3).unwrap();
    assert_eq!(nn.distances, vec![0.0, 0.5f64.sqrt(), 3.25f64.sqrt()]);
    assert_eq!(nn.indices, vec![3, 4, 0]);
}

#[test]
fn reference_query_flat_buffer() {
    let flat: Vec<f64> = REFERENCE.iter().flatten().copied().collect();
    let tree = VpTree::<f64>::from_flat(&flat, 3).unwrap();
    assert_eq!(tree.len(), 5);
    assert_eq!(tree.dim(), 3);
    let nn = tree.nearest_neighbors(&[0.0, 0.0, 0.5], 3).unwrap();
    assert_eq!(nn.indices, vec![3, 4, 0]);
}

#[test]
fn matches_naive_for_a_larger_case() {
    let points = random_points(1000, 100, 0);
    let tree = VpTree::<f64>::new(&points).unwrap();

    for p in &points {
        let neighbors_count = 10;
        let from_tree = tree.nearest_neighbors(p, neighbors_count).unwrap();
        let from_naive = naive(&points, &Euclidean, p, neighbors_count);
        assert_eq!(from_tree, from_naive);
    }
}

#[test]
fn matches_naive_across_configs() {
    let points = random_points(700, 3, 17);
    let queries = random_points(50, 3, 18);
    let configs = [
        VpTreeConfig::default(),
        VpTreeConfig::default().with_leaf_capacity(1),
        VpTreeConfig::default().with_leaf_capacity(32),
        VpTreeConfig::default()
            .with_vantage(VantageSelection::Random)
            .with_seed(3),
    ];

    for config in configs {
        let store = PointStore::<f64>::from_rows(&points).unwrap();
        let tree = VpTree::build(store, Euclidean, config).unwrap();
        for q in &queries {
            for k in [1, 2, 7, 50] {
                let from_tree = tree.nearest_neighbors(q, k).unwrap();
                assert_eq!(from_tree.len(), k);
                for w in from_tree.distances.windows(2) {
                    assert!(w[0] <= w[1]);
                }
                let from_naive = naive(&points, &Euclidean, q, k);
                assert_eq!(from_tree.indices, from_naive.indices);
                for (a, b) in from_tree.distances.iter().zip(&from_naive.distances) {
                    assert_relative_eq!(*a, *b, epsilon = 1e-12);
                }
            }
        }
    }
}

#[test]
fn pruned_equals_exhaustive() {
    let points = random_points(2000, 4, 99);
    let queries = random_points(100, 4, 100);
    let tree = VpTree::<f64>::new(&points).unwrap();

    for q in queries.iter().chain(points.iter().take(100)) {
        for k in [1, 5, 40] {
            let pruned = tree.nearest_neighbors(q, k).unwrap();
            let exhaustive = tree.nearest_neighbors_exhaustive(q, k).unwrap();
            assert_eq!(pruned, exhaustive);
        }
    }
}

#[test]
fn pruned_equals_exhaustive_with_ties() {
    // integer lattice in 3-D: many equal distances
    let points: Vec<[i32; 3]> = (0..8)
        .flat_map(|x| (0..8).flat_map(move |y| (0..8).map(move |z| [x, y, z])))
        .collect();
    for leaf_capacity in [1, 3, 8] {
        let store = PointStore::<f64>::from_rows(&points).unwrap();
        let config = VpTreeConfig::default().with_leaf_capacity(leaf_capacity);
        let tree = VpTree::build(store, Euclidean, config).unwrap();
        let as_f64: Vec<Vec<f64>> = points
            .iter()
            .map(|p| p.iter().map(|&c| c as f64).collect())
            .collect();

        for q in [[3.5, 3.5, 3.5], [0.0, 0.0, 0.0], [2.0, 5.5, 7.0], [-1.0, 4.0, 4.0]] {
            for k in [1, 6, 8, 27] {
                let pruned = tree.nearest_neighbors(&q, k).unwrap();
                assert_eq!(pruned, tree.nearest_neighbors_exhaustive(&q, k).unwrap());
                assert_eq!(pruned, naive(&as_f64, &Euclidean, &q, k));
            }
        }
    }
}

#[test]
fn k_larger_than_n_is_clipped() {
    let points = random_points(13, 2, 4);
    let tree = VpTree::<f64>::new(&points).unwrap();
    let nn = tree.nearest_neighbors(&[0.5, 0.5], 100).unwrap();
    assert_eq!(nn.len(), 13);
    let mut indices = nn.indices.clone();
    indices.sort();
    assert_eq!(indices, (0..13).collect::<Vec<_>>());

    let single = VpTree::<f64>::new(&[[1.0, 2.0]]).unwrap();
    let nn = single.nearest_neighbors(&[0.0, 0.0], 3).unwrap();
    assert_eq!(nn.indices, vec![0]);
    assert_eq!(nn.distances, vec![5f64.sqrt()]);
}

#[test]
fn dataset_point_is_its_own_nearest() {
    let points = random_points(500, 8, 5);
    let tree = VpTree::<f64>::new(&points).unwrap();
    for (i, p) in points.iter().enumerate() {
        let nn = tree.nearest_neighbor(p).unwrap();
        assert_eq!(nn.index, i);
        assert_eq!(nn.distance, 0.0);
    }
}

#[test]
fn permuted_dataset_gives_mapped_results() {
    let points = random_points(400, 5, 6);
    let mut rng = StdRng::seed_from_u64(7);
    let mut permutation: Vec<usize> = (0..points.len()).collect();
    for i in (1..permutation.len()).rev() {
        permutation.swap(i, rng.random_range(0..=i));
    }
    // permuted[j] = points[permutation[j]]
    let permuted: Vec<Vec<f64>> = permutation.iter().map(|&i| points[i].clone()).collect();

    let tree = VpTree::<f64>::new(&points).unwrap();
    let permuted_tree = VpTree::<f64>::new(&permuted).unwrap();

    for q in random_points(30, 5, 8) {
        let a = tree.nearest_neighbors(&q, 12).unwrap();
        let b = permuted_tree.nearest_neighbors(&q, 12).unwrap();
        assert_eq!(a.distances, b.distances);
        let mapped: Vec<usize> = b.indices.iter().map(|&j| permutation[j]).collect();
        assert_eq!(a.indices, mapped);
    }
}

#[test]
fn manhattan_metric() {
    let manhattan = |a: &[f64], b: &[f64]| a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum::<f64>();
    let points = random_points(600, 6, 12);
    let tree = VpTree::<f64, _>::with_metric(&points, manhattan).unwrap();

    for q in random_points(20, 6, 13) {
        let from_tree = tree.nearest_neighbors(&q, 9).unwrap();
        let from_naive = naive(&points, &manhattan, &q, 9);
        assert_eq!(from_tree.indices, from_naive.indices);
        assert_eq!(tree.nearest_neighbors_exhaustive(&q, 9).unwrap(), from_tree);
    }
}

#[test]
fn duplicate_points() {
    let mut points = random_points(50, 2, 14);
    let copies: Vec<Vec<f64>> = points.iter().take(25).cloned().collect();
    points.extend(copies);
    let tree = VpTree::<f64>::new(&points).unwrap();

    // each duplicated point has two matches at distance zero, lowest index first
    for i in 0..25 {
        let nn = tree.nearest_neighbors(&points[i], 2).unwrap();
        assert_eq!(nn.indices, vec![i, i + 50]);
        assert_eq!(nn.distances, vec![0.0, 0.0]);
    }
}
