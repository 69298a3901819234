//! Space descriptors and their flatten/unflatten codec.
//!
//! `Discrete` and `BoxSpace` (with its `Image` specialization) are the leaves;
//! `Tuple` and `Dict` compose any [`DynSpace`] and stitch the component
//! encodings together in component (resp. sorted key) order.

pub mod space;
pub mod dtype;
pub mod discrete;
pub mod box_space;
pub mod image;
pub mod value;
pub mod tuple;
pub mod dict;
pub mod dyn_space;
pub mod interop;

pub use space::Space;
pub use dtype::DType;
pub use discrete::Discrete;
pub use box_space::BoxSpace;
pub use image::{Image, MAX_IMAGE_DIMS};
pub use value::Value;
pub use tuple::Tuple;
pub use dict::Dict;
pub use dyn_space::DynSpace;
pub use interop::SpaceDescription;
