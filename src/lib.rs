//! Exact k-nearest-neighbor search with vantage point trees.
//!
//! A [`VpTree`] indexes a fixed set of points once and answers single or
//! batched k-NN queries under a metric chosen at build time (Euclidean by
//! default).
//!
//! ```
//! use vptree::VpTree;
//!
//! let points = vec![
//!     vec![0.0, 1.0, 2.0],
//!     vec![2.0, 2.0, 2.0],
//!     vec![3.5, 0.0, -1.0],
//!     vec![0.0, 0.0, 0.5],
//!     vec![-0.5, -0.5, 0.5],
//! ];
//! let tree = VpTree::<f64>::new(&points).unwrap();
//!
//! let (distances, indices) = tree.nearest_neighbors(&[0.0, 0.0, 0.5], 3).unwrap().into_parts();
//! assert_eq!(indices, vec![3, 4, 0]);
//! assert_eq!(distances, vec![0.0, 0.5f64.sqrt(), 3.25f64.sqrt()]);
//!
//! let batch = tree.nearest_neighbors_batch(&points, 2).unwrap();
//! assert_eq!(batch[4].indices, vec![4, 3]);
//! ```
mod batch;
pub mod config;
pub mod error;
pub mod median;
pub mod metric;
pub mod neighbors;
pub mod store;
pub mod vptree;

pub use config::{VantageSelection, VpTreeConfig};
pub use error::{Result, VpTreeError};
pub use median::{quick_select_by, small_median};
pub use metric::{Euclidean, Float, Metric, Scalar};
pub use neighbors::{BoundedResultSet, Neighbor, Neighbors};
pub use store::PointStore;
pub use vptree::{SearchStats, TreeStats, VpTree};
