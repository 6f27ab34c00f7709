mod schema;
mod seen;
mod types;

pub use schema::Database;
pub use seen::EntryStore;
pub use types::{DatabaseError, SeenEntry};
