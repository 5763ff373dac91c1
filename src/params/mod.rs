//! Named parameters
//!
//! The static descriptor table and the lock-free store the host writes into.

pub mod descriptors;
pub mod store;

pub use descriptors::{
    descriptors_for, find, index_of, ParameterDescriptor, ParameterKind, PARAMETERS,
};
pub use store::ParameterStore;
