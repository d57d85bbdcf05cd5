pub mod postgres;
pub mod traits;

pub use postgres::{PgConnector, PgDocumentStore};
pub use traits::{DocumentStore, StoreConnector};
