mod bulk;
mod cache;
mod error;
mod repository;

pub use bulk::{BulkOrders, CACHE_GROUP, LoadedOrder};
pub use cache::{Cache, NoopCache};
pub use error::LoadError;
pub use repository::Repository;
