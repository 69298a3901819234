use std::collections::BTreeMap;

use ndarray::ArrayD;

/// A sample drawn from (or checked against) a [`DynSpace`](crate::spaces::DynSpace).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Element of a `Discrete` space. Signed so that negative input can be rejected.
    Int(i64),
    /// Element of a `Box` or `Image` space.
    Array(ArrayD<f64>),
    /// Element of a `Tuple` space, one value per component in order.
    Tuple(Vec<Value>),
    /// Element of a `Dict` space, keyed like the space.
    Dict(BTreeMap<String, Value>),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Array(_) => "array",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayD<f64>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }
}

impl From<u32> for Value { fn from(v: u32) -> Self { Value::Int(v as i64) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<i32> for Value { fn from(v: i32) -> Self { Value::Int(v as i64) } }
impl From<ArrayD<f64>> for Value { fn from(v: ArrayD<f64>) -> Self { Value::Array(v) } }
impl From<Vec<Value>> for Value { fn from(v: Vec<Value>) -> Self { Value::Tuple(v) } }
impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self { Value::Dict(v) }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Value::Dict(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
