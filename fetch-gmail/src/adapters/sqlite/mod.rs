pub mod pool;
pub mod schema;
pub mod catalog;
pub mod export;

pub use catalog::{Backlog, Catalog, CountFilter};
pub use pool::DbPool;
