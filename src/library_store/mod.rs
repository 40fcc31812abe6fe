//! Per-listener library data: ratings, shelves, tags, listening history and
//! the entity metadata side channel used to label rated/shelved items.

mod models;
mod schema;
mod store;
mod trait_def;

pub use models::{EntityKind, HourEntry, RatedEntry, ShelfEntry, ShelfStatus};
pub use store::SqliteLibraryStore;
pub use trait_def::LibraryStore;
