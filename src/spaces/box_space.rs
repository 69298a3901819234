use std::hash::{Hash, Hasher};

use approx::{AbsDiffEq, RelativeEq};
use ndarray::{Array1, Array2, ArrayD, ArrayView1, ArrayView2, ArrayViewD, IxDyn, Zip};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use rand_distr::{Exp1, StandardNormal};

use crate::core::{Result, SpaceError};
use crate::spaces::{DType, Space};

/// Relative/absolute tolerances used by `BoxSpace` equality.
const RTOL: f64 = 1e-5;
const ATOL: f64 = 1e-8;

/// An n-dimensional box with per-element inclusive lower/upper bounds.
///
/// Elements are `ArrayD<f64>` of the declared shape; `dtype` records the
/// element type the data stands for and drives sampling (integer dtypes draw
/// whole numbers). Flattening is a row-major reshape with no value change.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "BoxRepr"))]
pub struct BoxSpace {
    low: ArrayD<f64>,
    high: ArrayD<f64>,
    dtype: DType,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct BoxRepr {
    low: ArrayD<f64>,
    high: ArrayD<f64>,
    dtype: DType,
}

#[cfg(feature = "serde")]
impl TryFrom<BoxRepr> for BoxSpace {
    type Error = SpaceError;

    fn try_from(repr: BoxRepr) -> Result<Self> {
        Self::with_dtype(repr.low, repr.high, repr.dtype)
    }
}

impl BoxSpace {
    /// Build a `float32` box from two bound arrays of identical shape.
    pub fn new(low: ArrayD<f64>, high: ArrayD<f64>) -> Result<Self> {
        Self::with_dtype(low, high, DType::F32)
    }

    pub fn with_dtype(low: ArrayD<f64>, high: ArrayD<f64>, dtype: DType) -> Result<Self> {
        if low.shape() != high.shape() {
            return Err(SpaceError::ShapeMismatch(format!(
                "low has shape {:?} but high has shape {:?}",
                low.shape(),
                high.shape()
            )));
        }
        // Validate low <= high elementwise
        let inverted = |(l, h): (&f64, &f64)| l.is_nan() || h.is_nan() || l > h;
        if let Some(i) = low.iter().zip(high.iter()).position(inverted) {
            return Err(SpaceError::InvalidBounds(format!("low[{i}] > high[{i}] or bound is NaN")));
        }
        // Integer dtypes need at least one representable whole number per element
        if let Some((min, max)) = dtype.integer_range() {
            let empty = |&(_, (l, h)): &(usize, (&f64, &f64))| {
                l.max(min).ceil() > h.min(max).floor()
            };
            if let Some((i, (l, h))) = low.iter().zip(high.iter()).enumerate().find(empty) {
                return Err(SpaceError::InvalidBounds(format!(
                    "no {dtype} value lies in [{l}, {h}] at index {i}"
                )));
            }
        }

        let space = Self { low, high, dtype };
        if space.looks_like_image() && dtype != DType::U8 {
            tracing::warn!(
                dtype = %dtype,
                shape = ?space.shape(),
                "Box bounds are [0, 255] but dtype is not uint8; an Image space may be intended"
            );
        }
        Ok(space)
    }

    /// Broadcast scalar bounds over `shape` (`float32`).
    pub fn uniform(low: f64, high: f64, shape: &[usize]) -> Result<Self> {
        Self::uniform_with_dtype(low, high, shape, DType::F32)
    }

    pub fn uniform_with_dtype(low: f64, high: f64, shape: &[usize], dtype: DType) -> Result<Self> {
        Self::with_dtype(
            ArrayD::from_elem(IxDyn(shape), low),
            ArrayD::from_elem(IxDyn(shape), high),
            dtype,
        )
    }

    pub fn low(&self) -> &ArrayD<f64> { &self.low }
    pub fn high(&self) -> &ArrayD<f64> { &self.high }
    pub fn shape(&self) -> &[usize] { self.low.shape() }
    pub fn ndim(&self) -> usize { self.low.ndim() }
    pub fn dtype(&self) -> DType { self.dtype }

    /// The `(low, high)` pair.
    pub fn bounds(&self) -> (&ArrayD<f64>, &ArrayD<f64>) {
        (&self.low, &self.high)
    }

    /// Whether every bound is exactly [0, 255].
    pub fn looks_like_image(&self) -> bool {
        !self.low.is_empty()
            && self.low.iter().all(|&l| l == 0.0)
            && self.high.iter().all(|&h| h == 255.0)
    }

    /// Flatten a stacked `(N, *shape)` batch into `(N, flat_dim)`.
    pub fn flatten_n_stacked(&self, batch: ArrayViewD<'_, f64>) -> Array2<f64> {
        let rows = batch.shape().first().copied().unwrap_or(0);
        let mut out = Array2::zeros((rows, self.flat_dim()));
        for (dst, src) in out.iter_mut().zip(batch.iter()) {
            *dst = *src;
        }
        out
    }

    /// Unflatten `(N, flat_dim)` into one stacked `(N, *shape)` array.
    pub fn unflatten_n_stacked(&self, flat: ArrayView2<'_, f64>) -> ArrayD<f64> {
        let mut shape = Vec::with_capacity(self.ndim() + 1);
        shape.push(flat.nrows());
        shape.extend_from_slice(self.shape());
        let mut out = ArrayD::zeros(IxDyn(&shape));
        for (dst, src) in out.iter_mut().zip(flat.iter()) {
            *dst = *src;
        }
        out
    }

    fn sample_element<R: Rng + ?Sized>(&self, low: f64, high: f64, rng: &mut R) -> f64 {
        if let Some((min, max)) = self.dtype.integer_range() {
            let lo = low.max(min).ceil();
            let hi = high.min(max).floor();
            if lo >= hi {
                return lo;
            }
            return rng.gen_range(lo as i64..=hi as i64) as f64;
        }

        let v = match (low.is_finite(), high.is_finite()) {
            (true, true) if low == high => low,
            (true, true) => Uniform::new_inclusive(low, high).sample(rng),
            (true, false) => low + Distribution::<f64>::sample(&Exp1, rng),
            (false, true) => high - Distribution::<f64>::sample(&Exp1, rng),
            (false, false) => Distribution::<f64>::sample(&StandardNormal, rng),
        };
        let v = if self.dtype == DType::F32 { v as f32 as f64 } else { v };
        v.clamp(low, high)
    }
}

impl AbsDiffEq for BoxSpace {
    type Epsilon = f64;

    fn default_epsilon() -> f64 { ATOL }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.shape() == other.shape()
            && self.low.abs_diff_eq(&other.low, epsilon)
            && self.high.abs_diff_eq(&other.high, epsilon)
    }
}

impl RelativeEq for BoxSpace {
    fn default_max_relative() -> f64 { RTOL }

    fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
        self.shape() == other.shape()
            && self.low.relative_eq(&other.low, epsilon, max_relative)
            && self.high.relative_eq(&other.high, epsilon, max_relative)
    }
}

/// Approximate equality on the bounds; mismatched shapes are unequal. The
/// dtype does not take part.
impl PartialEq for BoxSpace {
    fn eq(&self, other: &Self) -> bool {
        self.relative_eq(other, ATOL, RTOL)
    }
}

impl Eq for BoxSpace {}

/// Hashes one corner of each bound plus the shape.
///
/// # Notes
/// Equality is approximate but the hash uses exact bits, so two boxes that
/// compare equal (bounds `0.0` and `1e-10`, say) can hash differently. Do not
/// rely on a `HashSet<BoxSpace>` or `HashMap` key to merge nearly equal boxes.
impl Hash for BoxSpace {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // -0.0 and 0.0 hash alike
        let corner = |a: &ArrayD<f64>| {
            a.first().map(|v| if *v == 0.0 { 0u64 } else { v.to_bits() })
        };
        corner(&self.low).hash(state);
        corner(&self.high).hash(state);
        self.shape().hash(state);
    }
}

impl Space for BoxSpace {
    type Element = ArrayD<f64>;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element {
        let mut out = ArrayD::zeros(self.low.raw_dim());
        Zip::from(&mut out)
            .and(&self.low)
            .and(&self.high)
            .for_each(|o, &l, &h| *o = self.sample_element(l, h, rng));
        out
    }

    fn contains(&self, elem: &Self::Element) -> bool {
        elem.shape() == self.shape()
            && elem
                .iter()
                .zip(self.low.iter().zip(self.high.iter()))
                .all(|(&x, (&l, &h))| l <= x && x <= h)
    }

    fn flat_dim(&self) -> usize { self.low.len() }

    fn flatten(&self, elem: &Self::Element) -> Array1<f64> {
        elem.iter().copied().collect()
    }

    fn unflatten(&self, flat: ArrayView1<'_, f64>) -> Self::Element {
        let mut out = ArrayD::zeros(self.low.raw_dim());
        for (dst, src) in out.iter_mut().zip(flat.iter()) {
            *dst = *src;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_relative_eq, assert_relative_ne};
    use ndarray::{array, Array};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn arange(shape: &[usize]) -> ArrayD<f64> {
        let n: usize = shape.iter().product();
        Array::from_iter((1..=n).map(|v| v as f64)).into_shape(IxDyn(shape)).unwrap()
    }

    #[test]
    fn flat_dim_is_product_of_shape() {
        let b = BoxSpace::uniform(0.0, 1.0, &[3, 4]).unwrap();
        assert_eq!(b.flat_dim(), 12);
        assert_eq!(b.shape(), &[3, 4]);
        assert_eq!(b.dtype(), DType::F32);
    }

    #[test]
    fn bounds_are_broadcast() {
        let b = BoxSpace::uniform(0.0, 1.0, &[3, 4]).unwrap();
        let (low, high) = b.bounds();
        assert_eq!(low.shape(), &[3, 4]);
        assert_eq!(high.shape(), &[3, 4]);
        assert!(low.iter().all(|&v| v == 0.0));
        assert!(high.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn mismatched_bounds_are_rejected() {
        let low = array![-1.0, -2.0].into_dyn();
        let high = array![[1.0, 2.0], [1.0, 2.0]].into_dyn();
        assert!(matches!(BoxSpace::new(low, high), Err(SpaceError::ShapeMismatch(_))));
        let low = array![1.0, 0.0].into_dyn();
        let high = array![0.0, 1.0].into_dyn();
        assert!(matches!(BoxSpace::new(low, high), Err(SpaceError::InvalidBounds(_))));
    }

    #[test]
    fn flatten_is_row_major_and_round_trips() {
        let b = BoxSpace::uniform(0.0, 20.0, &[3, 4]).unwrap();
        let x = arange(&[3, 4]);
        let flat = b.flatten(&x);
        assert_eq!(flat.len(), 12);
        assert_eq!(flat[0], 1.0);
        assert_eq!(flat[4], 5.0);
        assert_eq!(b.unflatten(flat.view()), x);
    }

    #[test]
    fn batched_codec_shapes() {
        let b = BoxSpace::uniform(0.0, 20.0, &[3, 4]).unwrap();
        let xs = vec![arange(&[3, 4]), arange(&[3, 4]), arange(&[3, 4])];
        let flat = b.flatten_n(&xs);
        assert_eq!(flat.shape(), &[3, 12]);
        let back = b.unflatten_n(flat.view());
        assert_eq!(back, xs);
        let stacked = b.unflatten_n_stacked(flat.view());
        assert_eq!(stacked.shape(), &[3, 3, 4]);
        assert_eq!(b.flatten_n_stacked(stacked.view()), flat);
    }

    #[test]
    fn samples_are_contained() {
        let mut rng = StdRng::seed_from_u64(3);
        let b = BoxSpace::uniform(-1.0, 1.0, &[3, 4]).unwrap();
        for _ in 0..100 {
            let s = b.sample(&mut rng);
            assert!(b.contains(&s));
        }
    }

    #[test]
    fn unbounded_samples_are_finite() {
        let mut rng = StdRng::seed_from_u64(5);
        let low = array![f64::NEG_INFINITY, 0.0, f64::NEG_INFINITY].into_dyn();
        let high = array![f64::INFINITY, f64::INFINITY, 1.0].into_dyn();
        let b = BoxSpace::with_dtype(low, high, DType::F64).unwrap();
        for _ in 0..100 {
            let s = b.sample(&mut rng);
            assert!(s.iter().all(|v| v.is_finite()));
            assert!(b.contains(&s));
        }
    }

    #[test]
    fn integer_dtype_samples_whole_numbers() {
        let mut rng = StdRng::seed_from_u64(9);
        let b = BoxSpace::uniform_with_dtype(0.0, 255.0, &[4, 4], DType::U8).unwrap();
        let mut saw_top = false;
        for _ in 0..200 {
            let s = b.sample(&mut rng);
            assert!(b.contains(&s));
            assert!(s.iter().all(|v| v.fract() == 0.0));
            saw_top |= s.iter().any(|&v| v == 255.0);
        }
        assert!(saw_top);
    }

    #[test]
    fn contains_checks_shape_and_bounds() {
        let b = BoxSpace::uniform(0.0, 1.0, &[2]).unwrap();
        assert!(b.contains(&array![0.0, 1.0].into_dyn()));
        assert!(!b.contains(&array![0.0, 1.5].into_dyn()));
        assert!(!b.contains(&array![0.0, 0.5, 0.5].into_dyn()));
        assert!(!b.contains(&array![[0.0, 0.5]].into_dyn()));
        assert!(!b.contains(&array![0.0, f64::NAN].into_dyn()));
    }

    #[test]
    fn equality_is_approximate() {
        let a = BoxSpace::uniform(0.0, 1.0, &[2, 2]).unwrap();
        let b = BoxSpace::uniform(1e-10, 1.0 + 1e-9, &[2, 2]).unwrap();
        let c = BoxSpace::uniform(0.0, 1.1, &[2, 2]).unwrap();
        let d = BoxSpace::uniform(0.0, 1.0, &[4]).unwrap();
        assert_relative_eq!(a, b);
        assert_relative_ne!(a, c);
        assert_relative_ne!(a, d);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn equality_ignores_dtype() {
        let a = BoxSpace::uniform_with_dtype(0.0, 10.0, &[2], DType::F64).unwrap();
        let b = BoxSpace::uniform_with_dtype(0.0, 10.0, &[2], DType::I32).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn integer_box_without_whole_numbers_is_rejected() {
        let err = BoxSpace::uniform_with_dtype(0.2, 0.8, &[1], DType::U8).unwrap_err();
        assert!(matches!(err, SpaceError::InvalidBounds(_)));
        let low = array![0.0, 300.0].into_dyn();
        let high = array![10.0, 400.0].into_dyn();
        assert!(matches!(
            BoxSpace::with_dtype(low, high, DType::U8),
            Err(SpaceError::InvalidBounds(_))
        ));
        // The same bounds are fine for a float box
        assert!(BoxSpace::uniform_with_dtype(0.2, 0.8, &[1], DType::F32).is_ok());
    }

    #[test]
    fn narrow_integer_box_samples_are_contained() {
        let mut rng = StdRng::seed_from_u64(11);
        let b = BoxSpace::uniform_with_dtype(0.2, 1.5, &[3], DType::U8).unwrap();
        for _ in 0..50 {
            let s = b.sample(&mut rng);
            assert!(b.contains(&s));
            assert!(s.iter().all(|&v| v == 1.0));
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserializing_invalid_bounds_fails() {
        let good = BoxSpace::uniform(0.0, 1.0, &[2]).unwrap();
        let json = serde_json::to_string(&good).unwrap();
        let back: BoxSpace = serde_json::from_str(&json).unwrap();
        assert_eq!(back, good);

        let mut no_integers = serde_json::to_value(&good).unwrap();
        no_integers["low"] = serde_json::to_value(ArrayD::from_elem(IxDyn(&[2]), 0.2)).unwrap();
        no_integers["high"] = serde_json::to_value(ArrayD::from_elem(IxDyn(&[2]), 0.8)).unwrap();
        no_integers["dtype"] = serde_json::to_value(DType::U8).unwrap();
        assert!(serde_json::from_value::<BoxSpace>(no_integers).is_err());

        let mut shapes = serde_json::to_value(&good).unwrap();
        shapes["high"] = serde_json::to_value(ArrayD::<f64>::zeros(IxDyn(&[3]))).unwrap();
        assert!(serde_json::from_value::<BoxSpace>(shapes).is_err());

        let mut inverted = serde_json::to_value(&good).unwrap();
        inverted["low"] = serde_json::to_value(ArrayD::from_elem(IxDyn(&[2]), 5.0)).unwrap();
        assert!(serde_json::from_value::<BoxSpace>(inverted).is_err());
    }

    #[test]
    fn hash_matches_for_identical_boxes() {
        use std::collections::hash_map::DefaultHasher;
        let h = |b: &BoxSpace| {
            let mut s = DefaultHasher::new();
            b.hash(&mut s);
            s.finish()
        };
        let a = BoxSpace::uniform(0.0, 1.0, &[3, 4]).unwrap();
        let b = BoxSpace::uniform(0.0, 1.0, &[3, 4]).unwrap();
        let c = BoxSpace::uniform(0.0, 1.0, &[4, 3]).unwrap();
        assert_eq!(h(&a), h(&b));
        assert_ne!(h(&a), h(&c));
    }

    #[test]
    fn image_like_bounds_are_detected() {
        let b = BoxSpace::uniform(0.0, 255.0, &[2, 2]).unwrap();
        assert!(b.looks_like_image());
        let b = BoxSpace::uniform(0.0, 1.0, &[2, 2]).unwrap();
        assert!(!b.looks_like_image());
    }
}
