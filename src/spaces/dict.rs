use std::collections::{BTreeMap, BTreeSet};

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};
use rand::Rng;

use crate::core::{Result, SpaceError};
use crate::spaces::{DynSpace, Space, Value};

/// A keyed product of component spaces.
///
/// Components are stored in sorted key order regardless of the order they were
/// supplied in; that order drives iteration, sampling and the flat encoding.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "DictRepr"))]
pub struct Dict {
    spaces: BTreeMap<String, DynSpace>,
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct DictRepr {
    spaces: BTreeMap<String, DynSpace>,
}

#[cfg(feature = "serde")]
impl TryFrom<DictRepr> for Dict {
    type Error = SpaceError;

    fn try_from(repr: DictRepr) -> Result<Self> {
        Self::new(repr.spaces)
    }
}

impl Dict {
    /// Build from key/space pairs in any order (a `HashMap`, a `Vec` of pairs, ...).
    ///
    /// Fails with [`SpaceError::DuplicateKey`] if a key appears twice.
    pub fn new<I, K, S>(spaces: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, S)>,
        K: Into<String>,
        S: Into<DynSpace>,
    {
        let mut map = BTreeMap::new();
        for (key, space) in spaces {
            let key = key.into();
            if map.contains_key(&key) {
                return Err(SpaceError::DuplicateKey(key));
            }
            map.insert(key, space.into());
        }
        let dict = Self { spaces: map };
        tracing::debug!(keys = dict.spaces.len(), flat_dim = dict.flat_dim(), "built dict space");
        Ok(dict)
    }

    pub fn len(&self) -> usize { self.spaces.len() }
    pub fn is_empty(&self) -> bool { self.spaces.is_empty() }
    pub fn get(&self, key: &str) -> Option<&DynSpace> { self.spaces.get(key) }

    /// Keys in declared (sorted) order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.spaces.keys().map(String::as_str)
    }

    /// Key/space pairs in declared (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DynSpace)> {
        self.spaces.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Restrict to `keys`, keeping the declared order rather than the order given.
    fn select<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<(&str, &DynSpace)>> {
        let wanted: BTreeSet<&str> = keys.iter().map(AsRef::as_ref).collect();
        if let Some(unknown) = wanted.iter().find(|k| !self.spaces.contains_key(**k)) {
            return Err(SpaceError::UnknownKey((*unknown).to_string()));
        }
        Ok(self.iter().filter(|(k, _)| wanted.contains(k)).collect())
    }

    pub fn flat_dim_with_keys<K: AsRef<str>>(&self, keys: &[K]) -> Result<usize> {
        Ok(self.select(keys)?.iter().map(|(_, s)| s.flat_dim()).sum())
    }

    /// Flatten only the selected keys, concatenated in declared order.
    ///
    /// # Panics
    /// If `elem` lacks one of the selected keys.
    pub fn flatten_with_keys<K: AsRef<str>>(
        &self,
        elem: &BTreeMap<String, Value>,
        keys: &[K],
    ) -> Result<Array1<f64>> {
        let selected = self.select(keys)?;
        Ok(flatten_entries(&selected, elem))
    }

    pub fn unflatten_with_keys<K: AsRef<str>>(
        &self,
        flat: ArrayView1<'_, f64>,
        keys: &[K],
    ) -> Result<BTreeMap<String, Value>> {
        let selected = self.select(keys)?;
        Ok(unflatten_entries(&selected, flat))
    }

    /// Batched flatten over borrowed samples.
    ///
    /// # Panics
    /// If a sample lacks a declared key.
    pub(crate) fn flatten_maps(&self, elems: &[&BTreeMap<String, Value>]) -> Array2<f64> {
        let mut out = Array2::zeros((elems.len(), self.flat_dim()));
        let mut start = 0;
        for (key, space) in self.iter() {
            let column: Vec<&Value> = elems.iter().map(|e| lookup(e, key)).collect();
            let end = start + space.flat_dim();
            out.slice_mut(s![.., start..end]).assign(&space.flatten_refs(&column));
            start = end;
        }
        out
    }
}

fn lookup<'a>(elem: &'a BTreeMap<String, Value>, key: &str) -> &'a Value {
    elem.get(key)
        .unwrap_or_else(|| panic!("dict sample is missing key `{key}`"))
}

fn flatten_entries(entries: &[(&str, &DynSpace)], elem: &BTreeMap<String, Value>) -> Array1<f64> {
    let dim: usize = entries.iter().map(|(_, s)| s.flat_dim()).sum();
    let mut out = Array1::zeros(dim);
    let mut start = 0;
    for (key, space) in entries {
        let end = start + space.flat_dim();
        out.slice_mut(s![start..end]).assign(&space.flatten(lookup(elem, key)));
        start = end;
    }
    out
}

fn unflatten_entries(
    entries: &[(&str, &DynSpace)],
    flat: ArrayView1<'_, f64>,
) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    let mut start = 0;
    for (key, space) in entries {
        let end = start + space.flat_dim();
        out.insert(key.to_string(), space.unflatten(flat.slice(s![start..end])));
        start = end;
    }
    out
}

impl Space for Dict {
    type Element = BTreeMap<String, Value>;

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Self::Element {
        self.spaces.iter().map(|(k, s)| (k.clone(), s.sample(rng))).collect()
    }

    /// Present keys must be declared and their values contained; keys may be missing.
    fn contains(&self, elem: &Self::Element) -> bool {
        elem.iter().all(|(k, v)| self.spaces.get(k).is_some_and(|s| s.contains(v)))
    }

    fn flat_dim(&self) -> usize {
        self.spaces.values().map(|s| s.flat_dim()).sum()
    }

    /// # Panics
    /// If `elem` lacks a declared key.
    fn flatten(&self, elem: &Self::Element) -> Array1<f64> {
        let entries: Vec<_> = self.iter().collect();
        flatten_entries(&entries, elem)
    }

    fn unflatten(&self, flat: ArrayView1<'_, f64>) -> Self::Element {
        let entries: Vec<_> = self.iter().collect();
        unflatten_entries(&entries, flat)
    }

    fn flatten_n(&self, elems: &[Self::Element]) -> Array2<f64> {
        let refs: Vec<&BTreeMap<String, Value>> = elems.iter().collect();
        self.flatten_maps(&refs)
    }

    fn unflatten_n(&self, flat: ArrayView2<'_, f64>) -> Vec<Self::Element> {
        let mut samples: Vec<Self::Element> = vec![BTreeMap::new(); flat.nrows()];
        let mut start = 0;
        for (key, space) in self.iter() {
            let end = start + space.flat_dim();
            let part = space.unflatten_n(flat.slice(s![.., start..end]));
            for (sample, value) in samples.iter_mut().zip(part) {
                sample.insert(key.to_string(), value);
            }
            start = end;
        }
        samples
    }
}
