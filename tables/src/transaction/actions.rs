//! Queued transaction actions and the [`TableTransaction`] list builder.

use crate::model::{DeleteEntityOptions, TableEntity, UpdateEntityOptions, UpdateMode};
use std::fmt;

/// One entity operation queued for a transaction.
///
/// The position of an action in its list is the order in which the service
/// executes it.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionAction {
    Create(TableEntity),
    Delete {
        partition_key: String,
        row_key: String,
        options: DeleteEntityOptions,
    },
    Update {
        entity: TableEntity,
        mode: UpdateMode,
        options: UpdateEntityOptions,
    },
    Upsert {
        entity: TableEntity,
        mode: UpdateMode,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Create,
    Delete,
    Update,
    Upsert,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Create => "create",
            ActionKind::Delete => "delete",
            ActionKind::Update => "update",
            ActionKind::Upsert => "upsert",
        };
        f.write_str(name)
    }
}

impl TransactionAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            TransactionAction::Create(_) => ActionKind::Create,
            TransactionAction::Delete { .. } => ActionKind::Delete,
            TransactionAction::Update { .. } => ActionKind::Update,
            TransactionAction::Upsert { .. } => ActionKind::Upsert,
        }
    }

    pub fn partition_key(&self) -> &str {
        match self {
            TransactionAction::Create(entity)
            | TransactionAction::Update { entity, .. }
            | TransactionAction::Upsert { entity, .. } => &entity.partition_key,
            TransactionAction::Delete { partition_key, .. } => partition_key,
        }
    }

    pub fn row_key(&self) -> &str {
        match self {
            TransactionAction::Create(entity)
            | TransactionAction::Update { entity, .. }
            | TransactionAction::Upsert { entity, .. } => &entity.row_key,
            TransactionAction::Delete { row_key, .. } => row_key,
        }
    }
}

/// Ordered list of actions to submit as one transaction.
///
/// Building the list never fails and never touches the network; validation
/// happens when the list is submitted.
///
/// # Examples
///
/// ```no_run
/// use tables::model::{TableEntity, UpdateMode};
/// use tables::transaction::TableTransaction;
///
/// let mut transaction = TableTransaction::new();
/// transaction.create_entity(TableEntity::new("orders", "1").with_property("qty", 3));
/// transaction.upsert_entity(TableEntity::new("orders", "2"), UpdateMode::Replace);
/// transaction.delete_entity("orders", "3");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableTransaction {
    pub actions: Vec<TransactionAction>,
}

impl TableTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_actions(actions: Vec<TransactionAction>) -> Self {
        Self { actions }
    }

    pub fn create_entity(&mut self, entity: TableEntity) {
        self.actions.push(TransactionAction::Create(entity));
    }

    pub fn delete_entity(&mut self, partition_key: impl Into<String>, row_key: impl Into<String>) {
        self.actions.push(TransactionAction::Delete {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            options: DeleteEntityOptions::default(),
        });
    }

    /// Adds an update in [`UpdateMode::Merge`] mode with default options.
    pub fn update_entity(&mut self, entity: TableEntity) {
        self.update_entity_with_mode(entity, UpdateMode::Merge, UpdateEntityOptions::default());
    }

    pub fn update_entity_with_mode(
        &mut self,
        entity: TableEntity,
        mode: UpdateMode,
        options: UpdateEntityOptions,
    ) {
        self.actions.push(TransactionAction::Update {
            entity,
            mode,
            options,
        });
    }

    /// Adds an insert-or-update action.
    pub fn upsert_entity(&mut self, entity: TableEntity, mode: UpdateMode) {
        self.actions.push(TransactionAction::Upsert { entity, mode });
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl From<TableTransaction> for Vec<TransactionAction> {
    fn from(transaction: TableTransaction) -> Self {
        transaction.actions
    }
}
