pub mod core;
pub mod spaces;
pub mod placeholder;
pub mod utils;

pub use crate::core::{Result, SpaceError};
pub use crate::spaces::{
    BoxSpace, DType, Dict, Discrete, DynSpace, Image, Space, SpaceDescription, Tuple, Value,
};
pub use crate::placeholder::{Backend, Backends, Placeholder, PlaceholderTree};
pub use crate::utils::{rng_from_seed, split_n, RngStream, SeedSequence};
