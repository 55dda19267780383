pub mod kind;
pub mod messages;
pub mod services;
pub mod store;

pub use kind::RelationKind;
pub use services::{add_relation, remove_relation};
pub use store::{PgRelationStore, RelationStore};
