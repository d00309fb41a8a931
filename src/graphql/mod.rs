pub mod mutation;
pub mod query;
pub mod schema;
pub mod types;

pub use schema::{build_schema, AppSchema, ClientMeta};
