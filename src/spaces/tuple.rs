use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;

use crate::core::{Result, SpaceError};
use crate::spaces::{DynSpace, Space, Value};

/// A fixed-length, ordered product of component spaces.
///
/// Samples are `Vec<Value>` with one entry per component. The flat encoding
/// concatenates the component encodings in component order.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "TupleRepr"))]
pub struct Tuple {
    spaces: Vec<DynSpace>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct TupleRepr {
    spaces: Vec<DynSpace>,
}

#[cfg(feature = "serde")]
impl TryFrom<TupleRepr> for Tuple {
    type Error = SpaceError;

    fn try_from(repr: TupleRepr) -> Result<Self> {
        Self::new(repr.spaces)
    }
}

impl Tuple {
    /// Build from any sequence of component spaces (a `Vec`, an array, an iterator).
    pub fn new<I, S>(spaces: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<DynSpace>,
    {
        let spaces: Vec<DynSpace> = spaces.into_iter().map(Into::into).collect();
        if spaces.is_empty() {
            return Err(SpaceError::EmptyComposite);
        }
        let tuple = Self { spaces };
        tracing::debug!(components = tuple.len(), flat_dim = tuple.flat_dim(), "built tuple space");
        Ok(tuple)
    }

    pub fn components(&self) -> &[DynSpace] { &self.spaces }
    pub fn len(&self) -> usize { self.spaces.len() }
    pub fn is_empty(&self) -> bool { self.spaces.is_empty() }
    pub fn get(&self, index: usize) -> Option<&DynSpace> { self.spaces.get(index) }

    /// Start offset of each component's chunk in the flat encoding.
    fn offsets(&self) -> impl Iterator<Item = (usize, &DynSpace)> {
        self.spaces.iter().scan(0usize, |off, space| {
            let start = *off;
            *off += space.flat_dim();
            Some((start, space))
        })
    }

    /// Concatenate the component encodings of `elem` in component order.
    ///
    /// # Panics
    /// If `elem` is shorter than the tuple or a value does not match its component.
    pub fn flatten_slice(&self, elem: &[Value]) -> Array1<f64> {
        let mut out = Array1::zeros(self.flat_dim());
        for (i, (start, space)) in self.offsets().enumerate() {
            out.slice_mut(s![start..start + space.flat_dim()]).assign(&space.flatten(&elem[i]));
        }
        out
    }

    /// Batched flatten over borrowed rows.
    ///
    /// # Panics
    /// If a row is shorter than the tuple.
    pub(crate) fn flatten_rows(&self, rows: &[&[Value]]) -> Array2<f64> {
        let mut out = Array2::zeros((rows.len(), self.flat_dim()));
        for (i, (start, space)) in self.offsets().enumerate() {
            let column: Vec<&Value> = rows.iter().map(|row| &row[i]).collect();
            let part = space.flatten_refs(&column);
            out.slice_mut(s![.., start..start + space.flat_dim()]).assign(&part);
        }
        out
    }
}

impl Space for Tuple {
    type Element = Vec<Value>;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element {
        self.spaces.iter().map(|s| s.sample(rng)).collect()
    }

    fn contains(&self, elem: &Self::Element) -> bool {
        elem.len() == self.spaces.len() && self.spaces.iter().zip(elem).all(|(s, v)| s.contains(v))
    }

    fn flat_dim(&self) -> usize {
        self.spaces.iter().map(|s| s.flat_dim()).sum()
    }

    fn flatten(&self, elem: &Self::Element) -> Array1<f64> {
        self.flatten_slice(elem)
    }

    fn unflatten(&self, flat: ArrayView1<'_, f64>) -> Self::Element {
        self.offsets()
            .map(|(start, space)| space.unflatten(flat.slice(s![start..start + space.flat_dim()])))
            .collect()
    }

    fn flatten_n(&self, elems: &[Self::Element]) -> Array2<f64> {
        let rows: Vec<&[Value]> = elems.iter().map(Vec::as_slice).collect();
        self.flatten_rows(&rows)
    }

    fn unflatten_n(&self, flat: ArrayView2<'_, f64>) -> Vec<Self::Element> {
        // Split along the feature axis, decode per component, then zip back per sample.
        let mut samples: Vec<Vec<Value>> =
            (0..flat.nrows()).map(|_| Vec::with_capacity(self.len())).collect();
        for (start, space) in self.offsets() {
            let part = space.unflatten_n(flat.slice(s![.., start..start + space.flat_dim()]));
            for (sample, value) in samples.iter_mut().zip(part) {
                sample.push(value);
            }
        }
        samples
    }
}
