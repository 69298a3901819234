use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;

use crate::spaces::{BoxSpace, Dict, Discrete, Image, Space, Tuple, Value};

/// The closed set of space kinds, used wherever spaces compose.
///
/// Elements are [`Value`]s. The codec methods panic when handed a value of the
/// wrong kind for the space (e.g. an array for a `Discrete`); `contains` never
/// panics and returns `false` instead.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DynSpace {
    Discrete(Discrete),
    Box(BoxSpace),
    Image(Image),
    Tuple(Tuple),
    Dict(Dict),
}

impl DynSpace {
    /// Name of the space kind ("Discrete", "Box", ...).
    pub fn kind(&self) -> &'static str {
        match self {
            DynSpace::Discrete(_) => "Discrete",
            DynSpace::Box(_) => "Box",
            DynSpace::Image(_) => "Image",
            DynSpace::Tuple(_) => "Tuple",
            DynSpace::Dict(_) => "Dict",
        }
    }

    /// Shape of one element, for leaf spaces. `Discrete` is a scalar.
    pub fn shape(&self) -> Option<&[usize]> {
        match self {
            DynSpace::Discrete(_) => Some(&[]),
            DynSpace::Box(b) => Some(b.shape()),
            DynSpace::Image(i) => Some(i.shape()),
            DynSpace::Tuple(_) | DynSpace::Dict(_) => None,
        }
    }

    /// Batched flatten over borrowed values; composites delegate per component.
    pub(crate) fn flatten_refs(&self, elems: &[&Value]) -> Array2<f64> {
        match self {
            DynSpace::Discrete(d) => {
                let idx: Vec<u32> = elems.iter().map(|v| discrete_index(d, v)).collect();
                d.flatten_n(&idx)
            }
            DynSpace::Tuple(t) => {
                let rows: Vec<&[Value]> = elems.iter().map(|v| expect_tuple(v)).collect();
                t.flatten_rows(&rows)
            }
            DynSpace::Dict(d) => {
                let maps: Vec<_> = elems.iter().map(|v| expect_dict(v)).collect();
                d.flatten_maps(&maps)
            }
            DynSpace::Box(_) | DynSpace::Image(_) => {
                let mut out = Array2::zeros((elems.len(), self.flat_dim()));
                for (mut row, v) in out.rows_mut().into_iter().zip(elems) {
                    row.assign(&self.flatten(v));
                }
                out
            }
        }
    }
}

fn mismatch(space: &str, value: &Value) -> ! {
    panic!("{space} space cannot encode a {} value", value.kind())
}

fn discrete_index(d: &Discrete, value: &Value) -> u32 {
    match value {
        // Out-of-range indices map past `n` and encode as an all-zero row.
        Value::Int(i) => u32::try_from(*i).unwrap_or(d.n()),
        other => mismatch("Discrete", other),
    }
}

fn expect_array<'a>(space: &str, value: &'a Value) -> &'a ndarray::ArrayD<f64> {
    match value {
        Value::Array(a) => a,
        other => mismatch(space, other),
    }
}

fn expect_tuple(value: &Value) -> &[Value] {
    match value {
        Value::Tuple(t) => t,
        other => mismatch("Tuple", other),
    }
}

fn expect_dict(value: &Value) -> &std::collections::BTreeMap<String, Value> {
    match value {
        Value::Dict(d) => d,
        other => mismatch("Dict", other),
    }
}

impl Space for DynSpace {
    type Element = Value;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element {
        match self {
            DynSpace::Discrete(d) => Value::from(d.sample(rng)),
            DynSpace::Box(b) => Value::Array(b.sample(rng)),
            DynSpace::Image(i) => Value::Array(i.sample(rng)),
            DynSpace::Tuple(t) => Value::Tuple(t.sample(rng)),
            DynSpace::Dict(d) => Value::Dict(d.sample(rng)),
        }
    }

    fn contains(&self, elem: &Self::Element) -> bool {
        match (self, elem) {
            (DynSpace::Discrete(d), Value::Int(i)) => d.contains_int(*i),
            (DynSpace::Box(b), Value::Array(a)) => b.contains(a),
            (DynSpace::Image(img), Value::Array(a)) => img.contains(a),
            (DynSpace::Tuple(t), Value::Tuple(v)) => t.contains(v),
            (DynSpace::Dict(d), Value::Dict(m)) => d.contains(m),
            _ => false,
        }
    }

    fn flat_dim(&self) -> usize {
        match self {
            DynSpace::Discrete(d) => d.flat_dim(),
            DynSpace::Box(b) => b.flat_dim(),
            DynSpace::Image(i) => i.flat_dim(),
            DynSpace::Tuple(t) => t.flat_dim(),
            DynSpace::Dict(d) => d.flat_dim(),
        }
    }

    fn flatten(&self, elem: &Self::Element) -> Array1<f64> {
        match self {
            DynSpace::Discrete(d) => d.flatten(&discrete_index(d, elem)),
            DynSpace::Box(b) => b.flatten(expect_array("Box", elem)),
            DynSpace::Image(i) => i.flatten(expect_array("Image", elem)),
            DynSpace::Tuple(t) => t.flatten_slice(expect_tuple(elem)),
            DynSpace::Dict(d) => d.flatten(expect_dict(elem)),
        }
    }

    fn unflatten(&self, flat: ArrayView1<'_, f64>) -> Self::Element {
        match self {
            DynSpace::Discrete(d) => Value::from(d.unflatten(flat)),
            DynSpace::Box(b) => Value::Array(b.unflatten(flat)),
            DynSpace::Image(i) => Value::Array(i.unflatten(flat)),
            DynSpace::Tuple(t) => Value::Tuple(t.unflatten(flat)),
            DynSpace::Dict(d) => Value::Dict(d.unflatten(flat)),
        }
    }

    fn flatten_n(&self, elems: &[Self::Element]) -> Array2<f64> {
        let refs: Vec<&Value> = elems.iter().collect();
        self.flatten_refs(&refs)
    }

    fn unflatten_n(&self, flat: ArrayView2<'_, f64>) -> Vec<Self::Element> {
        match self {
            DynSpace::Discrete(d) => d.unflatten_n(flat).into_iter().map(Value::from).collect(),
            DynSpace::Box(b) => b.unflatten_n(flat).into_iter().map(Value::Array).collect(),
            DynSpace::Image(i) => i.unflatten_n(flat).into_iter().map(Value::Array).collect(),
            DynSpace::Tuple(t) => t.unflatten_n(flat).into_iter().map(Value::Tuple).collect(),
            DynSpace::Dict(d) => d.unflatten_n(flat).into_iter().map(Value::Dict).collect(),
        }
    }
}

impl From<Discrete> for DynSpace { fn from(s: Discrete) -> Self { DynSpace::Discrete(s) } }
impl From<BoxSpace> for DynSpace { fn from(s: BoxSpace) -> Self { DynSpace::Box(s) } }
impl From<Image> for DynSpace { fn from(s: Image) -> Self { DynSpace::Image(s) } }
impl From<Tuple> for DynSpace { fn from(s: Tuple) -> Self { DynSpace::Tuple(s) } }
impl From<Dict> for DynSpace { fn from(s: Dict) -> Self { DynSpace::Dict(s) } }
