//! Query-scoped candidate tracking and the result types handed back to
//! callers.
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::metric::Scalar;

/// A single (distance, point index) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<F> {
    pub distance: F,
    pub index: usize,
}

impl<F: Scalar> Neighbor<F> {
    pub fn new(distance: F, index: usize) -> Self {
        Neighbor { distance, index }
    }
}

// Ordered by distance, then by index. Distances are never NaN for finite
// input and a well-behaved metric; NaN compares equal so the heap stays
// consistent either way.
impl<F: Scalar> PartialOrd for Neighbor<F> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<F: Scalar> Eq for Neighbor<F> {}

impl<F: Scalar> Ord for Neighbor<F> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then(self.index.cmp(&other.index))
    }
}

/// Keeps the `capacity` smallest candidates offered during one query.
///
/// Backed by a max-heap so the current worst candidate is always at the
/// top. A new candidate evicts the worst one only if it orders strictly
/// before it: an equal distance with a larger index never evicts.
#[derive(Debug, Clone)]
pub struct BoundedResultSet<F: Scalar> {
    heap: BinaryHeap<Neighbor<F>>,
    capacity: usize,
}

impl<F: Scalar> BoundedResultSet<F> {
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "result set capacity must be positive");
        BoundedResultSet {
            heap: BinaryHeap::with_capacity(capacity),
            capacity,
        }
    }

    /// Offer a candidate. Returns true if it was kept.
    pub fn offer(&mut self, distance: F, index: usize) -> bool {
        let elem = Neighbor::new(distance, index);

        // Push the element on if it is closer than the current furthest element.
        if self.heap.len() < self.capacity {
            self.heap.push(elem);
            return true;
        }
        match self.heap.peek_mut() {
            Some(mut worst) if elem < *worst => {
                *worst = elem;
                true
            }
            _ => false,
        }
    }

    /// Distance of the worst kept candidate, or infinity while the set is
    /// not yet full.
    #[inline]
    pub fn tau(&self) -> F {
        if self.is_full() {
            self.heap.peek().map_or(F::infinity(), |n| n.distance)
        } else {
            F::infinity()
        }
    }

    pub fn worst(&self) -> Option<&Neighbor<F>> {
        self.heap.peek()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.heap.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drain into ascending (distance, index) order.
    pub fn into_neighbors(self) -> Neighbors<F> {
        let sorted = self.heap.into_sorted_vec();
        let mut neighbors = Neighbors::with_capacity(sorted.len());
        for n in sorted {
            neighbors.distances.push(n.distance);
            neighbors.indices.push(n.index);
        }
        neighbors
    }
}

/// The result of a k-NN query: index-aligned distances and point indices,
/// ascending by distance with ties broken by ascending index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Neighbors<F> {
    pub distances: Vec<F>,
    pub indices: Vec<usize>,
}

impl<F: Scalar> Neighbors<F> {
    fn with_capacity(n: usize) -> Self {
        Neighbors {
            distances: Vec::with_capacity(n),
            indices: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<Neighbor<F>> {
        Some(Neighbor::new(*self.distances.get(i)?, *self.indices.get(i)?))
    }

    pub fn iter(&self) -> impl Iterator<Item = Neighbor<F>> + '_ {
        self.distances
            .iter()
            .zip(&self.indices)
            .map(|(&d, &i)| Neighbor::new(d, i))
    }

    /// Split into `(distances, indices)`.
    pub fn into_parts(self) -> (Vec<F>, Vec<usize>) {
        (self.distances, self.indices)
    }
}
