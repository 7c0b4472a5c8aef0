pub mod check;
pub mod error;
pub mod types;

pub use check::{check_internal, WriteIndex};
pub use error::Error;
pub use types::{Event, EventId, Session, Transaction, TransactionId};
