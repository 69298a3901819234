// Common traits for spaces

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;

use crate::utils::rng::rng_from_seed;

/// A trait implemented by all spaces.
///
/// `Element` is the value type that lives in the space (e.g., `u32` for
/// `Discrete`, `ArrayD<f64>` for `BoxSpace`). Besides sampling and membership,
/// every space carries a codec between its elements and flat `f64` vectors of
/// length `flat_dim()`.
pub trait Space {
    type Element;

    /// Draw a sample from the space using the provided RNG.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element;

    /// Return true if the given element is a valid member of the space.
    fn contains(&self, elem: &Self::Element) -> bool;

    /// Length of the flat encoding of one element.
    fn flat_dim(&self) -> usize;

    /// Encode one element as a flat vector of length `flat_dim()`.
    fn flatten(&self, elem: &Self::Element) -> Array1<f64>;

    /// Decode a flat vector produced by `flatten`.
    ///
    /// A vector whose length differs from `flat_dim()` is a caller error.
    fn unflatten(&self, flat: ArrayView1<'_, f64>) -> Self::Element;

    /// Encode a batch of elements into a `(batch, flat_dim)` matrix.
    fn flatten_n(&self, elems: &[Self::Element]) -> Array2<f64> {
        let mut out = Array2::zeros((elems.len(), self.flat_dim()));
        for (mut row, elem) in out.rows_mut().into_iter().zip(elems) {
            row.assign(&self.flatten(elem));
        }
        out
    }

    /// Decode each row of a `(batch, flat_dim)` matrix.
    fn unflatten_n(&self, flat: ArrayView2<'_, f64>) -> Vec<Self::Element> {
        flat.rows().into_iter().map(|row| self.unflatten(row)).collect()
    }

    /// Draw `n` independent samples.
    fn sample_n<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<Self::Element> {
        (0..n).map(|_| self.sample(rng)).collect()
    }

    /// Draw one sample from a fresh RNG stream seeded with `seed`.
    fn sample_seeded(&self, seed: u64) -> Self::Element {
        let mut rng = rng_from_seed(seed);
        self.sample(&mut rng)
    }
}
