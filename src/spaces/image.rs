use std::ops::Deref;

use ndarray::{Array1, Array2, ArrayD, ArrayView1};
use rand::Rng;

use crate::core::{Result, SpaceError};
use crate::spaces::{BoxSpace, DType, Space};

/// Highest number of dimensions an image may have (height, width, channels).
pub const MAX_IMAGE_DIMS: usize = 3;

/// A `uint8` box of at most three dimensions with pixel bounds [0, 255].
///
/// Derefs to the underlying [`BoxSpace`]; the codec is the box codec unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "ImageRepr"))]
pub struct Image {
    inner: BoxSpace,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct ImageRepr {
    inner: BoxSpace,
}

#[cfg(feature = "serde")]
impl TryFrom<ImageRepr> for Image {
    type Error = SpaceError;

    fn try_from(repr: ImageRepr) -> Result<Self> {
        Self::from_box(repr.inner)
    }
}

impl Image {
    pub fn new(shape: &[usize]) -> Result<Self> {
        check_dims(shape)?;
        let inner = BoxSpace::uniform_with_dtype(0.0, 255.0, shape, DType::U8)?;
        Ok(Self { inner })
    }

    /// Wrap an existing box, which must already look like an image.
    pub fn from_box(inner: BoxSpace) -> Result<Self> {
        check_dims(inner.shape())?;
        if inner.dtype() != DType::U8 {
            return Err(SpaceError::InvalidDType { expected: DType::U8, found: inner.dtype() });
        }
        let (low, high) = inner.bounds();
        let not_pixel = |&(&l, &h): &(&f64, &f64)| l != 0.0 || h != 255.0;
        if let Some((&l, &h)) = low.iter().zip(high.iter()).find(not_pixel) {
            return Err(SpaceError::ImageBounds { low: l, high: h });
        }
        Ok(Self { inner })
    }

    pub fn as_box(&self) -> &BoxSpace { &self.inner }
    pub fn into_box(self) -> BoxSpace { self.inner }
}

fn check_dims(shape: &[usize]) -> Result<()> {
    if shape.len() > MAX_IMAGE_DIMS {
        return Err(SpaceError::InvalidShape(format!(
            "images must have at most {MAX_IMAGE_DIMS} dimensions, got {:?}",
            shape
        )));
    }
    Ok(())
}

impl Deref for Image {
    type Target = BoxSpace;

    fn deref(&self) -> &Self::Target { &self.inner }
}

impl Space for Image {
    type Element = ArrayD<f64>;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element { self.inner.sample(rng) }
    fn contains(&self, elem: &Self::Element) -> bool { self.inner.contains(elem) }
    fn flat_dim(&self) -> usize { self.inner.flat_dim() }
    fn flatten(&self, elem: &Self::Element) -> Array1<f64> { self.inner.flatten(elem) }
    fn unflatten(&self, flat: ArrayView1<'_, f64>) -> Self::Element { self.inner.unflatten(flat) }
    fn flatten_n(&self, elems: &[Self::Element]) -> Array2<f64> { self.inner.flatten_n(elems) }
}
