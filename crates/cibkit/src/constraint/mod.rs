//! Order and colocation constraints.

pub mod codec;
pub mod repository;

pub use codec::{ConstraintFields, decode, encode, removal_element};
pub use repository::ConstraintMap;
