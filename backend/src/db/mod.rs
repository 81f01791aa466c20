//! SQLite persistence: schema bootstrap, the [`SqliteStore`] used by the import pipeline,
//! and the plain CRUD queries behind the reference-data endpoints.

pub mod availability;
pub mod departments;
pub mod instructors;
pub mod schema;
pub mod store;
pub mod subjects;

pub use store::SqliteStore;
