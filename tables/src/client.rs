use crate::config::TableServiceConfig;
use crate::http::{HttpSender, ReqwestSender};
use crate::transaction::{
    TransactionAction, TransactionCoordinator, TransactionError, TransactionIds,
    TransactionOptions, TransactionResponse,
};
use std::sync::Arc;

/// Client for one table, exposing transactional batch submission.
///
/// # Examples
///
/// ```no_run
/// use tables::TableClient;
/// use tables::config::TableServiceConfig;
/// use tables::model::TableEntity;
/// use tables::transaction::TableTransaction;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = TableClient::from_config(TableServiceConfig::from_env()?)?;
///
/// let mut transaction = TableTransaction::new();
/// transaction.create_entity(TableEntity::new("p1", "r1"));
/// transaction.delete_entity("p1", "r0");
///
/// let response = client.submit_transaction(&transaction.actions).await?;
/// if let Some(created) = response.get_response_for_entity("r1") {
///     println!("r1 created with etag {:?}", created.etag);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TableClient {
    config: TableServiceConfig,
    sender: Arc<dyn HttpSender>,
}

impl TableClient {
    pub fn new(config: TableServiceConfig, sender: Arc<dyn HttpSender>) -> Self {
        Self { config, sender }
    }

    /// Builds a client that sends through [`ReqwestSender`].
    pub fn from_config(config: TableServiceConfig) -> Result<Self, TransactionError> {
        let sender = ReqwestSender::new(config.request_timeout())?;
        Ok(Self::new(config, Arc::new(sender)))
    }

    pub fn config(&self) -> &TableServiceConfig {
        &self.config
    }

    pub fn table_name(&self) -> &str {
        &self.config.table_name
    }

    /// Opens a transaction for direct dispatch of operations on `partition_key`.
    pub fn transaction(
        &self,
        partition_key: impl Into<String>,
    ) -> Result<TransactionCoordinator, TransactionError> {
        TransactionCoordinator::new(
            &self.config,
            partition_key,
            TransactionIds::generate(),
            Arc::clone(&self.sender),
        )
    }

    /// Submits `actions` as one transaction.
    ///
    /// The partition key of the first action applies to all of them.
    pub async fn submit_transaction(
        &self,
        actions: &[TransactionAction],
    ) -> Result<TransactionResponse, TransactionError> {
        self.submit_transaction_with_options(actions, TransactionOptions::default())
            .await
    }

    pub async fn submit_transaction_with_options(
        &self,
        actions: &[TransactionAction],
        options: TransactionOptions,
    ) -> Result<TransactionResponse, TransactionError> {
        let first = actions.first().ok_or(TransactionError::EmptyTransaction)?;

        let mut transaction = self.transaction(first.partition_key())?;
        for action in actions {
            transaction.add_action(action)?;
        }

        transaction.submit_transaction(options).await
    }
}
