//! Vantage-Point Trees are a data structure for fast
//! k-nearest-neighbor searches.
use std::cmp::Ordering;
use std::fmt;
use std::time::Instant;

use log::{debug, trace};
use num::{NumCast, ToPrimitive};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::ThreadPool;

use crate::batch::{install, worker_pool};
use crate::config::{VantageSelection, VpTreeConfig};
use crate::error::{Result, VpTreeError};
use crate::median::quick_select_by;
use crate::metric::{Euclidean, Metric, Scalar};
use crate::neighbors::{BoundedResultSet, Neighbor, Neighbors};
use crate::store::PointStore;

enum Node<F> {
    /// Unpartitioned points, at most `leaf_capacity` of them.
    Leaf { indices: Vec<usize> },
    /// Points in `inside` are within `threshold` of the vantage point and
    /// points in `outside` are at least `threshold` away. `outside` is empty
    /// only when a single point was left after taking out the vantage point.
    Internal {
        vantage: usize,
        threshold: F,
        inside: Box<Node<F>>,
        outside: Option<Box<Node<F>>>,
    },
}

/// Shape of a built tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeStats {
    pub points: usize,
    pub internal_nodes: usize,
    pub leaves: usize,
    /// Depth of the deepest node; the root is at depth 0.
    pub max_depth: usize,
}

/// Work done by a single query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchStats {
    pub nodes_visited: usize,
    pub distance_computations: usize,
}

/// Rounding allowance, in units of machine epsilon, applied to the
/// pruning bounds so that a point at exactly the current worst distance
/// is never skipped because of floating-point error.
const PRUNING_ULPS: u32 = 4;

/// A (distance to vantage point, point index) pair considered while
/// splitting a node.
type Candidate<F> = (F, usize);

fn by_distance<F: Scalar>(a: &Candidate<F>, b: &Candidate<F>) -> Ordering {
    a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal)
}

struct Builder<'a, F: Scalar, M: Metric<F>> {
    store: &'a PointStore<F>,
    metric: &'a M,
    leaf_capacity: usize,
    vantage: VantageSelection,
    /// Subtrees above this depth are built with `rayon::join`.
    parallel_depth: usize,
}

impl<F: Scalar, M: Metric<F>> Builder<'_, F, M> {
    fn build(&self, mut indices: Vec<usize>, depth: usize, seed: u64) -> Node<F> {
        if indices.len() <= self.leaf_capacity {
            return Node::Leaf { indices };
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let pos = match self.vantage {
            VantageSelection::First => 0,
            VantageSelection::Random => rng.random_range(0..indices.len()),
        };
        let vantage = indices.swap_remove(pos);
        let vp = self.store.point(vantage);

        let mut candidates: Vec<Candidate<F>> = indices
            .into_iter()
            .map(|i| (self.metric.distance(vp, self.store.point(i)), i))
            .collect();

        let median = (candidates.len() - 1) / 2;
        quick_select_by(&mut candidates, median, &by_distance::<F>, &mut rng);
        let threshold = candidates[median].0;

        let (inside, outside) = self.split(candidates, median, threshold, depth);

        // Draw both seeds before recursing so the tree does not depend on
        // whether the children are built in parallel.
        let seed_inside: u64 = rng.random();
        let seed_outside: u64 = rng.random();

        let build_inside = || Box::new(self.build(inside, depth + 1, seed_inside));
        let build_outside = || {
            if outside.is_empty() {
                None
            } else {
                Some(Box::new(self.build(outside, depth + 1, seed_outside)))
            }
        };
        let (inside, outside) = if depth < self.parallel_depth {
            rayon::join(build_inside, build_outside)
        } else {
            (build_inside(), build_outside())
        };

        Node::Internal {
            vantage,
            threshold,
            inside,
            outside,
        }
    }

    /// Split the candidates at the median position.
    ///
    /// After selection everything up to `median` is at most `threshold` and
    /// everything after it is at least `threshold`, so the halves satisfy
    /// the ring bounds even when distances tie at `threshold`. Candidates
    /// tied with the median may land on either side.
    fn split(
        &self,
        mut candidates: Vec<Candidate<F>>,
        median: usize,
        threshold: F,
        depth: usize,
    ) -> (Vec<usize>, Vec<usize>) {
        let outside = candidates.split_off(median + 1);

        if outside.iter().any(|c| c.0 <= threshold) {
            trace!(
                "ties at threshold {} split by position ({} candidates, depth {})",
                threshold,
                candidates.len() + outside.len(),
                depth
            );
        }

        (
            candidates.into_iter().map(|c| c.1).collect(),
            outside.into_iter().map(|c| c.1).collect(),
        )
    }
}

/// Branch-and-bound state for one query.
struct Searcher<'a, F: Scalar, M: Metric<F>> {
    store: &'a PointStore<F>,
    metric: &'a M,
    query: &'a [F],
    results: BoundedResultSet<F>,
    prune: bool,
    tolerance: F,
    stats: SearchStats,
}

impl<F: Scalar, M: Metric<F>> Searcher<'_, F, M> {
    #[inline]
    fn offer(&mut self, index: usize) -> F {
        let d = self.metric.distance(self.query, self.store.point(index));
        self.stats.distance_computations += 1;
        self.results.offer(d, index);
        d
    }

    fn search_node(&mut self, node: &Node<F>) {
        self.stats.nodes_visited += 1;

        match node {
            Node::Leaf { indices } => {
                for &i in indices {
                    self.offer(i);
                }
            }
            Node::Internal {
                vantage,
                threshold,
                inside,
                outside,
            } => {
                let d = self.offer(*vantage);
                let mu = *threshold;

                // Traverse the outer node first if we're outside the ring.
                if d <= mu {
                    self.search_node(inside);
                    if let Some(outside) = outside {
                        if self.may_reach_outside(d, mu) {
                            self.search_node(outside);
                        }
                    }
                } else {
                    if let Some(outside) = outside {
                        self.search_node(outside);
                    }
                    if self.may_reach_inside(d, mu) {
                        self.search_node(inside);
                    }
                }
            }
        }
    }

    /// Whether a point within `mu` of the vantage point can be within
    /// `tau` of the query.
    #[inline]
    fn may_reach_inside(&self, d: F, mu: F) -> bool {
        let tau = self.results.tau();
        !self.prune || d - tau <= mu + self.slack(d, tau, mu)
    }

    /// Whether a point at least `mu` from the vantage point can be within
    /// `tau` of the query.
    #[inline]
    fn may_reach_outside(&self, d: F, mu: F) -> bool {
        let tau = self.results.tau();
        !self.prune || d + tau + self.slack(d, tau, mu) >= mu
    }

    #[inline]
    fn slack(&self, d: F, tau: F, mu: F) -> F {
        (d + tau + mu) * self.tolerance
    }
}

/// An immutable vantage point tree over a fixed point set.
///
/// Queries take `&self`, so one tree can serve any number of threads.
pub struct VpTree<F: Scalar, M: Metric<F> = Euclidean> {
    store: PointStore<F>,
    metric: M,
    root: Node<F>,
    config: VpTreeConfig,
    pool: Option<ThreadPool>,
}

impl<F: Scalar> VpTree<F, Euclidean> {
    /// Construct a Euclidean tree from rows of coordinates with the default
    /// configuration.
    pub fn new<R, T>(rows: &[R]) -> Result<Self>
    where
        R: AsRef<[T]>,
        T: ToPrimitive + Copy,
    {
        Self::build(PointStore::from_rows(rows)?, Euclidean, VpTreeConfig::default())
    }

    /// Construct a Euclidean tree from a dense row-major buffer.
    pub fn from_flat<T>(data: &[T], dim: usize) -> Result<Self>
    where
        T: ToPrimitive + Copy,
    {
        Self::build(PointStore::from_flat(data, dim)?, Euclidean, VpTreeConfig::default())
    }
}

impl<F: Scalar, M: Metric<F>> VpTree<F, M> {
    /// Construct a tree using a custom distance function.
    pub fn with_metric<R, T>(rows: &[R], metric: M) -> Result<Self>
    where
        R: AsRef<[T]>,
        T: ToPrimitive + Copy,
    {
        Self::build(PointStore::from_rows(rows)?, metric, VpTreeConfig::default())
    }

    /// Build a tree over `store`.
    pub fn build(store: PointStore<F>, metric: M, config: VpTreeConfig) -> Result<Self> {
        config.validate()?;
        if store.is_empty() {
            return Err(VpTreeError::InvalidInput("point set is empty".into()));
        }
        let pool = worker_pool(&config)?;

        let start = Instant::now();
        let root = install(pool.as_ref(), || {
            let parallel_depth = if config.parallel_build {
                (rayon::current_num_threads() as f64).log2().ceil() as usize
            } else {
                0
            };
            let builder = Builder {
                store: &store,
                metric: &metric,
                leaf_capacity: config.leaf_capacity,
                vantage: config.vantage,
                parallel_depth,
            };
            builder.build((0..store.len()).collect(), 0, config.seed)
        });

        let tree = VpTree {
            store,
            metric,
            root,
            config,
            pool,
        };

        let stats = tree.stats();
        debug!(
            "built vp-tree over {} points of dimension {}: {} internal nodes, {} leaves, depth {} in {:?}",
            stats.points,
            tree.dim(),
            stats.internal_nodes,
            stats.leaves,
            stats.max_depth,
            start.elapsed()
        );

        Ok(tree)
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Dimension of the indexed points.
    pub fn dim(&self) -> usize {
        self.store.dim()
    }

    pub fn points(&self) -> &PointStore<F> {
        &self.store
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    pub fn config(&self) -> &VpTreeConfig {
        &self.config
    }

    pub(crate) fn pool(&self) -> Option<&ThreadPool> {
        self.pool.as_ref()
    }

    /// Find the nearest neighbor of `query`.
    pub fn nearest_neighbor(&self, query: &[F]) -> Result<Neighbor<F>> {
        self.nearest_neighbors(query, 1)?
            .get(0)
            .ok_or_else(|| VpTreeError::InvalidInput("point set is empty".into()))
    }

    /// Find the `k` nearest neighbors of `query`, closest first.
    ///
    /// Returns `min(k, self.len())` neighbors.
    pub fn nearest_neighbors(&self, query: &[F], k: usize) -> Result<Neighbors<F>> {
        self.check_query(query, k)?;
        Ok(self.search(query, k, true).0)
    }

    /// Like `nearest_neighbors`, also reporting how much of the tree was
    /// examined.
    pub fn nearest_neighbors_with_stats(
        &self,
        query: &[F],
        k: usize,
    ) -> Result<(Neighbors<F>, SearchStats)> {
        self.check_query(query, k)?;
        Ok(self.search(query, k, true))
    }

    /// Visit every node without pruning. Returns the same neighbors as
    /// `nearest_neighbors` at the cost of a full scan.
    pub fn nearest_neighbors_exhaustive(&self, query: &[F], k: usize) -> Result<Neighbors<F>> {
        self.check_query(query, k)?;
        Ok(self.search(query, k, false).0)
    }

    pub(crate) fn check_k(&self, k: usize) -> Result<()> {
        if k == 0 {
            return Err(VpTreeError::InvalidArgument(
                "number of neighbors must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn check_query(&self, query: &[F], k: usize) -> Result<()> {
        self.check_k(k)?;
        if query.len() != self.dim() {
            return Err(VpTreeError::DimensionMismatch {
                expected: self.dim(),
                actual: query.len(),
            });
        }
        if query.iter().any(|x| !x.is_finite()) {
            return Err(VpTreeError::InvalidInput(
                "query has a non-finite coordinate".into(),
            ));
        }
        Ok(())
    }

    /// Run a query that has already been validated.
    pub(crate) fn search(&self, query: &[F], k: usize, prune: bool) -> (Neighbors<F>, SearchStats) {
        let mut searcher = Searcher {
            store: &self.store,
            metric: &self.metric,
            query,
            results: BoundedResultSet::new(k.min(self.len())),
            prune,
            tolerance: <F as NumCast>::from(PRUNING_ULPS)
                .map_or(F::epsilon(), |ulps| ulps * F::epsilon()),
            stats: SearchStats::default(),
        };
        searcher.search_node(&self.root);

        let stats = searcher.stats;
        (searcher.results.into_neighbors(), stats)
    }

    pub fn stats(&self) -> TreeStats {
        fn walk<F>(node: &Node<F>, depth: usize, stats: &mut TreeStats) {
            stats.max_depth = stats.max_depth.max(depth);
            match node {
                Node::Leaf { indices } => {
                    stats.leaves += 1;
                    stats.points += indices.len();
                }
                Node::Internal {
                    inside, outside, ..
                } => {
                    stats.internal_nodes += 1;
                    stats.points += 1;
                    walk(inside, depth + 1, stats);
                    if let Some(outside) = outside {
                        walk(outside, depth + 1, stats);
                    }
                }
            }
        }

        let mut stats = TreeStats::default();
        walk(&self.root, 0, &mut stats);
        stats
    }

    /// Render the tree structure, one node per line.
    pub fn dump(&self) -> String {
        Dump(&self.root).to_string()
    }
}

impl<F: Scalar, M: Metric<F>> fmt::Debug for VpTree<F, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VpTree")
            .field("len", &self.len())
            .field("dim", &self.dim())
            .field("config", &self.config)
            .finish()
    }
}

struct Dump<'a, F>(&'a Node<F>);

impl<F: Scalar> fmt::Display for Dump<'_, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn node<F: Scalar>(n: &Node<F>, depth: usize, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let pad = depth * 2;
            match n {
                Node::Leaf { indices } => writeln!(f, "{:pad$}leaf {:?}", "", indices, pad = pad),
                Node::Internal {
                    vantage,
                    threshold,
                    inside,
                    outside,
                } => {
                    writeln!(f, "{:pad$}vp {} mu {}", "", vantage, threshold, pad = pad)?;
                    node(inside, depth + 1, f)?;
                    match outside {
                        Some(outside) => node(outside, depth + 1, f),
                        None => writeln!(f, "{:pad$}-", "", pad = pad + 2),
                    }
                }
            }
        }
        node(self.0, 0, f)
    }
}
