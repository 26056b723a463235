//! Entity group transactions.
//!
//! A transaction groups create, update, upsert and delete operations that
//! share one partition key into a single multipart `$batch` request. The
//! service applies them atomically: either every operation succeeds or none
//! does.
//!
//! - [`actions`] - queued action types and the [`TableTransaction`] builder
//! - [`serializer`] - rendering of actions as changeset parts
//! - [`session`] - per-transaction state and the multipart envelope
//! - [`coordinator`] - dispatch and submission
//! - [`response`] - decoding of the multipart response
//! - [`errors`] - failure classification

pub mod actions;
pub mod coordinator;
pub mod errors;
pub mod response;
pub mod serializer;
pub mod session;

pub use actions::{ActionKind, TableTransaction, TransactionAction};
pub use coordinator::{TransactionCoordinator, TransactionOptions, batch_url};
pub use errors::TransactionError;
pub use response::{TransactionEntityResponse, TransactionResponse, parse_transaction_response};
pub use serializer::{ServiceFlavor, SubRequest, SubRequestSerializer};
pub use session::{PendingOperation, TransactionIds, TransactionSession};
