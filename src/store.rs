//! Contiguous, immutable storage for the indexed points.
use num::{NumCast, ToPrimitive};

use crate::error::{Result, VpTreeError};
use crate::metric::Scalar;

/// N points of dimension D, stored row-major in one buffer.
///
/// Points are converted once to the working precision `F` and are only
/// addressed by index afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PointStore<F> {
    coords: Vec<F>,
    dim: usize,
}

impl<F: Scalar> PointStore<F> {
    /// Load points from a sequence of rows.
    ///
    /// Fails if there are no rows, the rows are empty or of different
    /// lengths, or any coordinate is not finite in precision `F`.
    pub fn from_rows<R, T>(rows: &[R]) -> Result<Self>
    where
        R: AsRef<[T]>,
        T: ToPrimitive + Copy,
    {
        let dim = match rows.first() {
            Some(row) => row.as_ref().len(),
            None => return Err(VpTreeError::InvalidInput("point set is empty".into())),
        };
        if dim == 0 {
            return Err(VpTreeError::InvalidInput("points have no coordinates".into()));
        }

        let mut coords = Vec::with_capacity(rows.len() * dim);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != dim {
                return Err(VpTreeError::InvalidInput(format!(
                    "point {} has {} coordinates, expected {}",
                    i,
                    row.len(),
                    dim
                )));
            }
            for &x in row {
                coords.push(convert(x, i)?);
            }
        }

        Ok(PointStore { coords, dim })
    }

    /// Load points from a dense row-major buffer of `data.len() / dim` rows.
    pub fn from_flat<T>(data: &[T], dim: usize) -> Result<Self>
    where
        T: ToPrimitive + Copy,
    {
        if data.is_empty() {
            return Err(VpTreeError::InvalidInput("point set is empty".into()));
        }
        if dim == 0 {
            return Err(VpTreeError::InvalidInput("points have no coordinates".into()));
        }
        if data.len() % dim != 0 {
            return Err(VpTreeError::InvalidInput(format!(
                "buffer of {} values is not a whole number of {}-dimensional points",
                data.len(),
                dim
            )));
        }

        let coords = data
            .iter()
            .enumerate()
            .map(|(i, &x)| convert(x, i / dim))
            .collect::<Result<Vec<F>>>()?;

        Ok(PointStore { coords, dim })
    }

    /// Coordinates of point `index`.
    ///
    /// Panics if `index >= self.len()`.
    #[inline]
    pub fn point(&self, index: usize) -> &[F] {
        let start = index * self.dim;
        &self.coords[start..start + self.dim]
    }

    /// Number of points. Never zero.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len() / self.dim
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Iterate over all points in index order.
    pub fn iter(&self) -> std::slice::ChunksExact<'_, F> {
        self.coords.chunks_exact(self.dim)
    }
}

fn convert<F: Scalar, T: ToPrimitive + Copy>(x: T, point: usize) -> Result<F> {
    match <F as NumCast>::from(x) {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(VpTreeError::InvalidInput(format!(
            "point {} has a non-finite coordinate",
            point
        ))),
    }
}
