mod document;
mod query;

pub use document::{Document, CREATED_AT, UPDATED_AT};
pub use query::{FieldFilter, FilterOp, QueryOptions, QueryPlan, RANGE_EPSILON};
