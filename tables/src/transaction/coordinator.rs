use super::actions::TransactionAction;
use super::errors::TransactionError;
use super::response::{TransactionResponse, parse_transaction_response};
use super::serializer::SubRequestSerializer;
use super::session::{PendingOperation, TransactionIds, TransactionSession};
use crate::config::{CredentialKind, TableServiceConfig};
use crate::http::{HttpRequest, HttpSender};
use crate::model::{DeleteEntityOptions, TableEntity, UpdateEntityOptions, UpdateMode};
use std::sync::Arc;
use tracing::Instrument;

/// Per-submission options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    /// Sent as `x-ms-client-request-id` on the batch request.
    pub client_request_id: Option<String>,
}

/// Collects entity operations for one partition and submits them as a single
/// batch request.
///
/// Every dispatch call validates the partition key and appends the
/// operation's rendered sub-request to the session body right away, so the
/// body order is the call order. Nothing is sent until
/// [`submit_transaction`](Self::submit_transaction), which consumes the
/// coordinator: a session cannot be submitted twice.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use tables::config::TableServiceConfig;
/// use tables::http::ReqwestSender;
/// use tables::model::{TableEntity, UpdateMode};
/// use tables::transaction::{TransactionCoordinator, TransactionIds, TransactionOptions};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = TableServiceConfig::new("https://acct.table.core.windows.net/?sig=x", "orders");
/// let sender = Arc::new(ReqwestSender::new(config.request_timeout())?);
/// let mut transaction =
///     TransactionCoordinator::new(&config, "customer-1", TransactionIds::generate(), sender)?;
///
/// transaction.create_entity(TableEntity::new("customer-1", "order-1"))?;
/// transaction.upsert_entity(TableEntity::new("customer-1", "order-2"), UpdateMode::Merge)?;
///
/// let response = transaction.submit_transaction(TransactionOptions::default()).await?;
/// println!("{} operations committed", response.len());
/// # Ok(())
/// # }
/// ```
pub struct TransactionCoordinator {
    url: String,
    serializer: SubRequestSerializer,
    session: TransactionSession,
    sender: Arc<dyn HttpSender>,
    allow_insecure_connection: bool,
}

impl TransactionCoordinator {
    pub fn new(
        config: &TableServiceConfig,
        partition_key: impl Into<String>,
        ids: TransactionIds,
        sender: Arc<dyn HttpSender>,
    ) -> Result<Self, TransactionError> {
        let serializer = SubRequestSerializer::new(&config.account_url, &config.table_name)?;
        let url = batch_url(&config.account_url, config.credential);
        let session = TransactionSession::new(ids, partition_key);

        log::debug!(
            "Opened transaction {} for partition '{}' ({:?} endpoint)",
            session.transaction_id(),
            session.partition_key(),
            serializer.flavor()
        );

        Ok(Self {
            url,
            serializer,
            session,
            sender,
            allow_insecure_connection: config.allow_insecure_connection,
        })
    }

    /// The `$batch` URL the transaction will be posted to.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn partition_key(&self) -> &str {
        self.session.partition_key()
    }

    pub fn pending_operations(&self) -> &[PendingOperation] {
        self.session.pending_operations()
    }

    /// Validates and appends one action to the transaction body.
    ///
    /// On error nothing is appended.
    pub fn add_action(&mut self, action: &TransactionAction) -> Result<(), TransactionError> {
        self.session.check_partition_key(action.partition_key())?;

        let body_part = self
            .serializer
            .to_body_part(action, self.session.changeset_id())?;

        log::debug!(
            "Queued {} of row '{}' as operation {}",
            action.kind(),
            action.row_key(),
            self.session.pending_operations().len()
        );

        self.session.push(
            PendingOperation {
                kind: action.kind(),
                row_key: action.row_key().to_string(),
            },
            body_part,
        );
        Ok(())
    }

    pub fn create_entity(&mut self, entity: TableEntity) -> Result<(), TransactionError> {
        self.add_action(&TransactionAction::Create(entity))
    }

    /// Queues a create per entity, stopping at the first invalid one.
    ///
    /// Entities before the failing one stay queued.
    pub fn create_entities(
        &mut self,
        entities: impl IntoIterator<Item = TableEntity>,
    ) -> Result<(), TransactionError> {
        for entity in entities {
            self.create_entity(entity)?;
        }
        Ok(())
    }

    pub fn delete_entity(
        &mut self,
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
        options: DeleteEntityOptions,
    ) -> Result<(), TransactionError> {
        self.add_action(&TransactionAction::Delete {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            options,
        })
    }

    pub fn update_entity(
        &mut self,
        entity: TableEntity,
        mode: UpdateMode,
        options: UpdateEntityOptions,
    ) -> Result<(), TransactionError> {
        self.add_action(&TransactionAction::Update {
            entity,
            mode,
            options,
        })
    }

    pub fn upsert_entity(
        &mut self,
        entity: TableEntity,
        mode: UpdateMode,
    ) -> Result<(), TransactionError> {
        self.add_action(&TransactionAction::Upsert { entity, mode })
    }

    /// Sends the batch and decodes the per-operation results.
    ///
    /// This is the only network round-trip of the transaction. The response
    /// must account for every queued operation; a different count is reported
    /// as a malformed response.
    pub async fn submit_transaction(
        self,
        options: TransactionOptions,
    ) -> Result<TransactionResponse, TransactionError> {
        let span = tracing::info_span!(
            "TableTransaction.submitTransaction",
            transaction_id = %self.session.transaction_id(),
            operations = self.session.pending_operations().len(),
        );

        async move {
            let expected = self.session.pending_operations().len();
            let mut headers = self.session.headers();
            if let Some(request_id) = options.client_request_id {
                headers.push(("x-ms-client-request-id".to_string(), request_id));
            }

            let request = HttpRequest {
                method: "POST".to_string(),
                url: self.url,
                headers,
                body: self.session.into_body(),
                allow_insecure_connection: self.allow_insecure_connection,
            };

            let response = self.sender.send(request).await?;
            tracing::debug!(status = response.status, "Received transaction response");

            let parsed = parse_transaction_response(&response)?;
            if parsed.sub_responses.len() != expected {
                log::warn!(
                    "Transaction response has {} sub-responses for {} operations",
                    parsed.sub_responses.len(),
                    expected
                );
                return Err(TransactionError::malformed(
                    format!(
                        "expected {expected} sub-responses, found {}",
                        parsed.sub_responses.len()
                    ),
                    response.body,
                ));
            }

            Ok(parsed)
        }
        .instrument(span)
        .await
    }
}

/// Points the account URL at the `$batch` endpoint.
///
/// A shared access signature travels in the query string and has to follow
/// the `$batch` segment; with other credentials the URL is used as given.
pub fn batch_url(account_url: &str, credential: CredentialKind) -> String {
    if credential.is_sas_url() {
        let (base, sas) = match account_url.split_once('?') {
            Some((base, query)) => (base, format!("?{query}")),
            None => (account_url, String::new()),
        };
        format!("{}$batch{}", with_trailing_slash(base), sas)
    } else {
        format!("{}$batch", with_trailing_slash(account_url))
    }
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}
