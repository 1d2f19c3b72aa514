//! Resume document schema, invariants and paths.

mod model;
mod normalize;
mod path;

pub use model::*;
pub use path::{FieldPath, ListPath, STRING_ITEM_FIELD};
