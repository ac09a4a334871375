//! Distance functions over coordinate slices.
use std::fmt::{Debug, Display};

pub use num::Float;

/// Working precision of a tree: `f32` or `f64`.
pub trait Scalar: Float + Debug + Display + Send + Sync + 'static {}
impl<T: Float + Debug + Display + Send + Sync + 'static> Scalar for T {}

/// A metric over points of equal dimension.
///
/// Implementations must be non-negative, symmetric, return zero for
/// identical points and satisfy the triangle inequality. Search pruning
/// relies on the triangle inequality; a function that violates it yields
/// wrong neighbors, not an error.
///
/// Any `Fn(&[F], &[F]) -> F` closure that is `Send + Sync` is a metric:
///
/// ```
/// use vptree::{VpTree, VpTreeConfig, PointStore};
///
/// let manhattan = |a: &[f64], b: &[f64]| {
///     a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum::<f64>()
/// };
/// let store = PointStore::<f64>::from_rows(&[[0.0, 0.0], [1.0, 1.0], [3.0, 0.0]]).unwrap();
/// let tree = VpTree::build(store, manhattan, VpTreeConfig::default()).unwrap();
///
/// let nn = tree.nearest_neighbor(&[2.0, 0.0]).unwrap();
/// assert_eq!(nn.index, 1);
/// assert_eq!(nn.distance, 2.0);
/// ```
pub trait Metric<F: Scalar>: Send + Sync {
    fn distance(&self, a: &[F], b: &[F]) -> F;
}

/// Euclidean (L2) distance, computed in the tree's working precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euclidean;

impl<F: Scalar> Metric<F> for Euclidean {
    #[inline]
    fn distance(&self, a: &[F], b: &[F]) -> F {
        a.iter()
            .zip(b)
            .fold(F::zero(), |acc, (&x, &y)| {
                let d = x - y;
                acc + d * d
            })
            .sqrt()
    }
}

impl<F, G> Metric<F> for G
where
    F: Scalar,
    G: Fn(&[F], &[F]) -> F + Send + Sync,
{
    #[inline]
    fn distance(&self, a: &[F], b: &[F]) -> F {
        self(a, b)
    }
}
