//! State of one transaction attempt and the multipart envelope around it.

use super::actions::ActionKind;
use super::errors::TransactionError;
use super::serializer::{STORAGE_API_VERSION, TRANSACTION_LINE_ENDING};
use uuid::Uuid;

/// Boundary identifiers for one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionIds {
    /// Keys the outer `batch_` boundary.
    pub transaction_id: String,
    /// Keys the inner `changeset_` boundary.
    pub changeset_id: String,
}

impl TransactionIds {
    pub fn new(transaction_id: impl Into<String>, changeset_id: impl Into<String>) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            changeset_id: changeset_id.into(),
        }
    }

    /// Fresh random identifiers.
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string(), Uuid::new_v4().to_string())
    }
}

/// Record of one dispatched action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOperation {
    pub kind: ActionKind,
    pub row_key: String,
}

/// Mutable state of a transaction under construction.
///
/// Body parts are append-only. The preamble is written on creation and the
/// closing boundaries exactly once, by [`TransactionSession::into_body`].
#[derive(Debug, Clone)]
pub struct TransactionSession {
    ids: TransactionIds,
    partition_key: String,
    pending_operations: Vec<PendingOperation>,
    body_parts: Vec<String>,
}

impl TransactionSession {
    pub fn new(ids: TransactionIds, partition_key: impl Into<String>) -> Self {
        let body_parts = vec![
            format!("--batch_{}", ids.transaction_id),
            format!(
                "Content-Type: multipart/mixed; boundary=changeset_{}",
                ids.changeset_id
            ),
            String::new(),
        ];

        Self {
            ids,
            partition_key: partition_key.into(),
            pending_operations: Vec::new(),
            body_parts,
        }
    }

    pub fn transaction_id(&self) -> &str {
        &self.ids.transaction_id
    }

    pub fn changeset_id(&self) -> &str {
        &self.ids.changeset_id
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn pending_operations(&self) -> &[PendingOperation] {
        &self.pending_operations
    }

    pub fn check_partition_key(&self, partition_key: &str) -> Result<(), TransactionError> {
        if self.partition_key != partition_key {
            return Err(TransactionError::PartitionKeyMismatch {
                expected: self.partition_key.clone(),
                actual: partition_key.to_string(),
            });
        }
        Ok(())
    }

    pub fn push(&mut self, operation: PendingOperation, body_part: String) {
        self.body_parts.push(body_part);
        self.pending_operations.push(operation);
    }

    /// Headers for the outer batch request.
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("x-ms-version".to_string(), STORAGE_API_VERSION.to_string()),
            ("DataServiceVersion".to_string(), "3.0;".to_string()),
            ("MaxDataServiceVersion".to_string(), "3.0;NetFx".to_string()),
            (
                "Content-Type".to_string(),
                format!("multipart/mixed; boundary=batch_{}", self.ids.transaction_id),
            ),
        ]
    }

    /// Closes the changeset and batch envelopes and joins the body.
    pub fn into_body(mut self) -> String {
        self.body_parts
            .push(format!("--changeset_{}--", self.ids.changeset_id));
        self.body_parts
            .push(format!("--batch_{}--", self.ids.transaction_id));
        self.body_parts.join(TRANSACTION_LINE_ENDING)
    }
}
