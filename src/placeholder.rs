//! Symbolic tensor placeholders for spaces.
//!
//! Placeholders are plain descriptors (name, shape with unknown batch axes, and
//! dtype) that a numeric framework backend turns into its own input tensors.
//! Which backends exist is injected through [`Backends`]; asking for one that
//! is not installed fails with [`SpaceError::BackendUnavailable`].

use std::collections::{BTreeMap, BTreeSet};

use crate::core::{Result, SpaceError};
use crate::spaces::{DType, DynSpace};

/// The optional numeric framework backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Backend {
    /// Graph-building framework; discrete inputs use its default 64-bit integer.
    Graph,
    /// Symbolic-expression framework; discrete inputs use the narrowest unsigned width.
    Symbolic,
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Graph => "graph",
            Backend::Symbolic => "symbolic",
        }
    }

    fn discrete_dtype(&self, n: u32) -> DType {
        match self {
            Backend::Graph => DType::I64,
            Backend::Symbolic => {
                DType::smallest_unsigned_for(n.saturating_sub(1) as u64).unwrap_or(DType::I64)
            }
        }
    }
}

/// The set of backends installed in this process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Backends {
    installed: BTreeSet<Backend>,
}

impl Backends {
    /// No backend installed.
    pub fn none() -> Self { Self::default() }

    pub fn all() -> Self {
        Self::none().with(Backend::Graph).with(Backend::Symbolic)
    }

    pub fn with(mut self, backend: Backend) -> Self {
        self.installed.insert(backend);
        self
    }

    pub fn is_installed(&self, backend: Backend) -> bool {
        self.installed.contains(&backend)
    }

    pub fn require(&self, backend: Backend) -> Result<()> {
        if self.is_installed(backend) {
            Ok(())
        } else {
            Err(SpaceError::BackendUnavailable(backend.name()))
        }
    }
}

/// One input tensor. `None` axes are batch axes of unknown size.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Placeholder {
    pub name: String,
    pub shape: Vec<Option<usize>>,
    pub dtype: DType,
}

/// Placeholders mirroring the structure of a space.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PlaceholderTree {
    Leaf(Placeholder),
    Tuple(Vec<PlaceholderTree>),
    Dict(BTreeMap<String, PlaceholderTree>),
}

impl PlaceholderTree {
    pub fn as_leaf(&self) -> Option<&Placeholder> {
        match self {
            PlaceholderTree::Leaf(p) => Some(p),
            _ => None,
        }
    }

    /// All leaves in flatten order.
    pub fn leaves(&self) -> Vec<&Placeholder> {
        match self {
            PlaceholderTree::Leaf(p) => vec![p],
            PlaceholderTree::Tuple(items) => items.iter().flat_map(|t| t.leaves()).collect(),
            PlaceholderTree::Dict(items) => items.values().flat_map(|t| t.leaves()).collect(),
        }
    }
}

fn leaf(name: &str, batch_dims: usize, shape: &[usize], dtype: DType) -> PlaceholderTree {
    let shape = std::iter::repeat(None)
        .take(batch_dims)
        .chain(shape.iter().map(|&d| Some(d)))
        .collect();
    PlaceholderTree::Leaf(Placeholder { name: name.to_string(), shape, dtype })
}

impl DynSpace {
    /// Describe the input tensor(s) for this space under `backend`.
    ///
    /// Leaves get `batch_dims` unknown leading axes followed by the element
    /// shape (`[n]` for a discrete space). Components of composites are named
    /// `"<Kind>-<name>"`.
    pub fn to_placeholder(
        &self,
        name: &str,
        batch_dims: usize,
        backend: Backend,
        backends: &Backends,
    ) -> Result<PlaceholderTree> {
        backends.require(backend)?;
        tracing::debug!(
            space = self.kind(),
            name,
            batch_dims,
            backend = backend.name(),
            "building placeholder"
        );
        Ok(self.placeholder_unchecked(name, batch_dims, backend))
    }

    fn placeholder_unchecked(
        &self,
        name: &str,
        batch_dims: usize,
        backend: Backend,
    ) -> PlaceholderTree {
        let component = |s: &DynSpace| {
            s.placeholder_unchecked(&format!("{}-{}", s.kind(), name), batch_dims, backend)
        };
        match self {
            DynSpace::Discrete(d) => {
                leaf(name, batch_dims, &[d.n() as usize], backend.discrete_dtype(d.n()))
            }
            DynSpace::Box(b) => leaf(name, batch_dims, b.shape(), b.dtype()),
            DynSpace::Image(i) => leaf(name, batch_dims, i.shape(), i.dtype()),
            DynSpace::Tuple(t) => {
                PlaceholderTree::Tuple(t.components().iter().map(component).collect())
            }
            DynSpace::Dict(d) => PlaceholderTree::Dict(
                d.iter().map(|(k, s)| (k.to_string(), component(s))).collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spaces::{BoxSpace, Dict, Discrete, Image, Tuple};

    #[test]
    fn unavailable_backend_is_a_distinct_error() {
        let space = DynSpace::from(Discrete::new(10));
        let err = space.to_placeholder("obs", 1, Backend::Graph, &Backends::none()).unwrap_err();
        assert_eq!(err, SpaceError::BackendUnavailable("graph"));
        let only_graph = Backends::none().with(Backend::Graph);
        assert!(space.to_placeholder("obs", 1, Backend::Symbolic, &only_graph).is_err());
        assert!(space.to_placeholder("obs", 1, Backend::Graph, &only_graph).is_ok());
    }

    #[test]
    fn box_placeholder_keeps_shape_and_dtype() {
        let space = DynSpace::from(BoxSpace::uniform(0.0, 1.0, &[3, 4]).unwrap());
        let tree = space.to_placeholder("test", 1, Backend::Graph, &Backends::all()).unwrap();
        let p = tree.as_leaf().unwrap();
        assert_eq!(p.name, "test");
        assert_eq!(p.shape, vec![None, Some(3), Some(4)]);
        assert_eq!(p.dtype, DType::F32);
    }

    #[test]
    fn discrete_placeholder_dtype_depends_on_backend() {
        let backends = Backends::all();
        let small = DynSpace::from(Discrete::new(10));
        let graph = small.to_placeholder("a", 1, Backend::Graph, &backends).unwrap();
        assert_eq!(graph.as_leaf().unwrap().shape, vec![None, Some(10)]);
        assert_eq!(graph.as_leaf().unwrap().dtype, DType::I64);

        let symbolic = small.to_placeholder("a", 2, Backend::Symbolic, &backends).unwrap();
        assert_eq!(symbolic.as_leaf().unwrap().shape, vec![None, None, Some(10)]);
        assert_eq!(symbolic.as_leaf().unwrap().dtype, DType::U8);

        let wide = DynSpace::from(Discrete::new(257));
        let symbolic = wide.to_placeholder("a", 0, Backend::Symbolic, &backends).unwrap();
        assert_eq!(symbolic.as_leaf().unwrap().dtype, DType::U16);
    }

    #[test]
    fn composite_placeholders_are_named_by_kind() {
        let tup = DynSpace::from(
            Tuple::new([
                DynSpace::from(BoxSpace::uniform(0.0, 1.0, &[3, 4]).unwrap()),
                Discrete::new(2).into(),
            ])
            .unwrap(),
        );
        let tree = tup.to_placeholder("test", 1, Backend::Graph, &Backends::all()).unwrap();
        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].name, "Box-test");
        assert_eq!(leaves[0].shape, vec![None, Some(3), Some(4)]);
        assert_eq!(leaves[1].name, "Discrete-test");
        assert_eq!(leaves[1].shape, vec![None, Some(2)]);
        assert_eq!(
            leaves.iter().map(|p| p.dtype).collect::<Vec<_>>(),
            vec![DType::F32, DType::I64]
        );

        let dict = DynSpace::from(
            Dict::new([
                ("velocity", DynSpace::from(Discrete::new(3))),
                ("frame", Image::new(&[8, 8]).unwrap().into()),
            ])
            .unwrap(),
        );
        match dict.to_placeholder("obs", 1, Backend::Symbolic, &Backends::all()).unwrap() {
            PlaceholderTree::Dict(items) => {
                assert_eq!(items.keys().collect::<Vec<_>>(), vec!["frame", "velocity"]);
                assert_eq!(items["frame"].as_leaf().unwrap().dtype, DType::U8);
                assert_eq!(items["velocity"].as_leaf().unwrap().name, "Discrete-obs");
            }
            other => panic!("expected Dict placeholders, got {other:?}"),
        }
    }
}
