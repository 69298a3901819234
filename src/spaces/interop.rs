//! Conversion between externally described spaces and [`DynSpace`].
//!
//! Other environment libraries describe their spaces in their own types. They
//! are expected to lower those into a [`SpaceDescription`] at the boundary; the
//! core never depends on a foreign space type.

use ndarray::{ArrayD, IxDyn};

use crate::core::{Result, SpaceError};
use crate::spaces::{BoxSpace, DType, Dict, Discrete, DynSpace, Image, Tuple};

/// A space as described by an external environment library.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpaceDescription {
    /// Bounded box; `low`/`high` are row-major and hold `product(shape)` values each.
    Box { low: Vec<f64>, high: Vec<f64>, shape: Vec<usize>, dtype: DType },
    Discrete { n: u32 },
    Tuple(Vec<SpaceDescription>),
    Dict(Vec<(String, SpaceDescription)>),
    /// Any other kind the external library knows about; never convertible.
    Other { kind: String },
}

impl SpaceDescription {
    fn kind(&self) -> &str {
        match self {
            SpaceDescription::Box { .. } => "Box",
            SpaceDescription::Discrete { .. } => "Discrete",
            SpaceDescription::Tuple(_) => "Tuple",
            SpaceDescription::Dict(_) => "Dict",
            SpaceDescription::Other { kind } => kind,
        }
    }
}

fn bounds_array(values: &[f64], shape: &[usize], which: &str) -> Result<ArrayD<f64>> {
    ArrayD::from_shape_vec(IxDyn(shape), values.to_vec()).map_err(|_| {
        SpaceError::ShapeMismatch(format!(
            "{which} has {} values but shape {:?} needs {}",
            values.len(),
            shape,
            shape.iter().product::<usize>()
        ))
    })
}

impl DynSpace {
    /// Build a space from an external description.
    ///
    /// With `is_image`, a box description must have bounds of exactly [0, 255]
    /// and becomes an [`Image`]. Composite components are converted as plain
    /// spaces.
    pub fn from_description(desc: &SpaceDescription, is_image: bool) -> Result<Self> {
        tracing::debug!(kind = desc.kind(), is_image, "converting external space");
        match desc {
            SpaceDescription::Box { low, high, shape, dtype } => {
                let low = bounds_array(low, shape, "low")?;
                let high = bounds_array(high, shape, "high")?;
                if is_image {
                    let not_pixel = |&(&l, &h): &(&f64, &f64)| l != 0.0 || h != 255.0;
                    if let Some((&l, &h)) = low.iter().zip(high.iter()).find(not_pixel) {
                        return Err(SpaceError::ImageBounds { low: l, high: h });
                    }
                    return Ok(Image::new(shape)?.into());
                }
                Ok(BoxSpace::with_dtype(low, high, *dtype)?.into())
            }
            SpaceDescription::Discrete { n } => Ok(Discrete::try_new(*n)?.into()),
            SpaceDescription::Tuple(parts) => {
                let spaces = parts
                    .iter()
                    .map(|p| Self::from_description(p, false))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Tuple::new(spaces)?.into())
            }
            SpaceDescription::Dict(entries) => {
                let spaces = entries
                    .iter()
                    .map(|(k, p)| -> Result<(String, DynSpace)> {
                        Ok((k.clone(), Self::from_description(p, false)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Dict::new(spaces)?.into())
            }
            SpaceDescription::Other { kind } => Err(SpaceError::UnsupportedSpace(kind.clone())),
        }
    }

    /// Describe this space for an external library. Images lower to a `uint8` box.
    pub fn to_description(&self) -> SpaceDescription {
        let describe_box = |b: &BoxSpace| SpaceDescription::Box {
            low: b.low().iter().copied().collect(),
            high: b.high().iter().copied().collect(),
            shape: b.shape().to_vec(),
            dtype: b.dtype(),
        };
        match self {
            DynSpace::Discrete(d) => SpaceDescription::Discrete { n: d.n() },
            DynSpace::Box(b) => describe_box(b),
            DynSpace::Image(i) => describe_box(i.as_box()),
            DynSpace::Tuple(t) => {
                SpaceDescription::Tuple(t.components().iter().map(Self::to_description).collect())
            }
            DynSpace::Dict(d) => SpaceDescription::Dict(
                d.iter().map(|(k, s)| (k.to_string(), s.to_description())).collect(),
            ),
        }
    }
}

impl TryFrom<&SpaceDescription> for DynSpace {
    type Error = SpaceError;

    fn try_from(desc: &SpaceDescription) -> Result<Self> {
        Self::from_description(desc, false)
    }
}
