use ndarray::{Array1, Array2, ArrayView1};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use crate::core::{Result, SpaceError};
use crate::spaces::Space;

/// A discrete space of integers in [0, n).
///
/// Flattens to a one-hot vector of length `n`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "DiscreteRepr"))]
pub struct Discrete {
    n: u32,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct DiscreteRepr {
    n: u32,
}

#[cfg(feature = "serde")]
impl TryFrom<DiscreteRepr> for Discrete {
    type Error = SpaceError;

    fn try_from(repr: DiscreteRepr) -> Result<Self> {
        Self::try_new(repr.n)
    }
}

impl Discrete {
    pub fn new(n: u32) -> Self {
        assert!(n > 0, "Discrete space requires n > 0");
        Self { n }
    }

    /// Fallible twin of [`Discrete::new`].
    pub fn try_new(n: u32) -> Result<Self> {
        if n == 0 {
            return Err(SpaceError::InvalidBounds("Discrete space requires n > 0".into()));
        }
        Ok(Self { n })
    }

    pub fn n(&self) -> u32 { self.n }

    /// The documented default element of every discrete space.
    pub const fn default_value() -> u32 { 0 }

    /// Whether a signed integer lies in [0, n).
    pub fn contains_int(&self, x: i64) -> bool {
        x >= 0 && x < self.n as i64
    }

    /// Draw an index according to unnormalized non-negative `weights` (one per element).
    ///
    /// The weights are normalized by their sum and scanned cumulatively; the
    /// result is clamped to `n - 1` so floating-point overshoot at the top of
    /// the distribution never yields an out-of-range index.
    pub fn weighted_sample<R: Rng + ?Sized>(&self, weights: &[f64], rng: &mut R) -> Result<u32> {
        if weights.len() != self.n as usize {
            return Err(SpaceError::ShapeMismatch(format!(
                "expected {} weights, got {}",
                self.n,
                weights.len()
            )));
        }
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(SpaceError::InvalidBounds("weights must be finite and non-negative".into()));
        }
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            return Err(SpaceError::InvalidBounds("weights must not all be zero".into()));
        }

        let threshold: f64 = rng.gen_range(0.0..1.0);
        let mut cumulative = 0.0;
        let mut idx = 0u32;
        for w in weights {
            cumulative += w / total;
            if cumulative > threshold {
                break;
            }
            idx += 1;
        }
        Ok(idx.min(self.n - 1))
    }
}

impl Space for Discrete {
    type Element = u32;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element {
        // Uniform over [0, n)
        if self.n == 1 { return 0; }
        let dist = Uniform::from(0..self.n);
        dist.sample(rng)
    }

    fn contains(&self, elem: &Self::Element) -> bool { *elem < self.n }

    fn flat_dim(&self) -> usize { self.n as usize }

    fn flatten(&self, elem: &Self::Element) -> Array1<f64> {
        let mut out = Array1::zeros(self.n as usize);
        if let Some(slot) = out.get_mut(*elem as usize) {
            *slot = 1.0;
        }
        out
    }

    fn unflatten(&self, flat: ArrayView1<'_, f64>) -> Self::Element {
        // Index of the first set entry; a vector with none decodes to the default.
        flat.iter()
            .position(|&v| v != 0.0)
            .map(|i| i as u32)
            .unwrap_or(Self::default_value())
    }

    fn flatten_n(&self, elems: &[Self::Element]) -> Array2<f64> {
        let mut out = Array2::zeros((elems.len(), self.n as usize));
        for (row, &x) in elems.iter().enumerate() {
            if x < self.n {
                out[[row, x as usize]] = 1.0;
            }
        }
        out
    }
}
