mod collection;
mod error;
mod key;
mod relation;
mod sort;
mod value;

pub use bson::{Bson, Document};
pub use collection::{Collection, Projection};
pub use error::CollectionError;
pub use key::Key;
pub use relation::{ForeignKey, Relation, RelationKind};
pub use sort::{Sort, SortDirection};
