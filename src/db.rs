//! Storage layer

pub mod memory;
pub mod postgres;
pub mod store;

pub use memory::{MemoryStore, Table};
pub use postgres::PgStore;
pub use store::{Store, StoreTx};
