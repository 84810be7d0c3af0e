pub mod models;

pub use models::credential::PgCredentialStore;
pub use models::operation::{Operation, OperationStatus, PgOperationStore};
